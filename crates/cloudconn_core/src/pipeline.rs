//! The decorator chain every facade call runs through.
//!
//! Layers compose in a fixed order:
//!
//! ```text
//! validation  ->  retry  ->  translation + backend call
//! ```
//!
//! A request rejected by validation never reaches the retry loop, and the
//! retry loop only ever sees errors that have already been translated.

use crate::error::{ConnectorError, ConnectorResult};
use crate::native::{NativeError, NativeResult};
use crate::provider::ProviderId;
use crate::retry::RetryLayer;
use crate::translate::Translator;
use crate::validate::{Request, ValidationRules};
use std::io;
use std::sync::Arc;
use tracing::debug;

/// Validation, retry and translation for one provider.
#[derive(Debug, Clone)]
pub struct Pipeline {
    provider: ProviderId,
    validation: ValidationRules,
    retry: RetryLayer,
    translator: Arc<Translator>,
}

impl Pipeline {
    /// Composes the layers for `provider`.
    pub fn new(
        provider: ProviderId,
        validation: ValidationRules,
        retry: RetryLayer,
        translator: Arc<Translator>,
    ) -> Self {
        Self {
            provider,
            validation,
            retry,
            translator,
        }
    }

    /// Provider whose errors this pipeline translates.
    #[must_use]
    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    /// The retry layer.
    #[must_use]
    pub fn retry(&self) -> &RetryLayer {
        &self.retry
    }

    /// The validation rules.
    #[must_use]
    pub fn validation(&self) -> &ValidationRules {
        &self.validation
    }

    /// The translator.
    #[must_use]
    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// Runs the full chain: validate `request`, then retry the translated call.
    pub fn execute<T>(
        &self,
        request: &Request<'_>,
        call: impl FnMut() -> NativeResult<T>,
    ) -> ConnectorResult<T> {
        self.validate(request)?;
        self.invoke(request.operation(), call)
    }

    /// Runs only the validation layer.
    pub fn validate(&self, request: &Request<'_>) -> ConnectorResult<()> {
        self.validation
            .check(request)
            .map_err(|err| err.with_provider(self.provider))
    }

    /// Runs retry and translation around an already validated call.
    pub fn invoke<T>(
        &self,
        operation: &'static str,
        mut call: impl FnMut() -> NativeResult<T>,
    ) -> ConnectorResult<T> {
        debug!(provider = %self.provider, operation, "dispatching");
        self.retry
            .run(operation, || {
                call().map_err(|native| self.translator.translate(native, self.provider))
            })
            .map_err(|err| err.with_operation(operation))
    }

    /// Translates a failure of the local filesystem around a transfer.
    #[must_use]
    pub fn local_error(&self, operation: &'static str, err: io::Error) -> ConnectorError {
        self.translator
            .translate(NativeError::from(err), ProviderId::Local)
            .with_operation(operation)
            .with_attempts(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::native::VendorError;
    use crate::retry::RetryPolicy;
    use crate::translate::{ErrorTable, Rule};
    use std::borrow::Cow;
    use std::cell::Cell;
    use std::time::Duration;
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("{0}")]
    struct Status(u16);

    impl VendorError for Status {
        fn code(&self) -> Option<Cow<'_, str>> {
            None
        }

        fn status(&self) -> Option<u16> {
            Some(self.0)
        }
    }

    static RULES: &[Rule] = &[
        Rule::status(404, ErrorKind::NotFound),
        Rule::status(503, ErrorKind::Transient),
    ];

    fn pipeline(max_attempts: u32) -> Pipeline {
        let translator = Translator::new()
            .with_table(ErrorTable::from_static(ProviderId::Gcp, RULES))
            .with_table(ErrorTable::io());
        Pipeline::new(
            ProviderId::Gcp,
            ValidationRules::default(),
            RetryLayer::new(RetryPolicy::new(max_attempts)).with_sleeper(|_| {}),
            Arc::new(translator),
        )
    }

    #[test]
    fn validation_failure_skips_the_call() {
        let calls = Cell::new(0);
        let err = pipeline(3)
            .execute::<()>(&Request::Get { key: "" }, || {
                calls.set(calls.get() + 1);
                Ok(())
            })
            .unwrap_err();

        assert_eq!(calls.get(), 0);
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.attempts(), 0);
        assert_eq!(err.provider(), Some(ProviderId::Gcp));
        assert_eq!(err.operation(), Some("get"));
    }

    #[test]
    fn translated_transient_errors_are_retried() {
        let calls = Cell::new(0);
        let err = pipeline(3)
            .execute::<()>(&Request::Get { key: "k" }, || {
                calls.set(calls.get() + 1);
                Err(NativeError::new(Status(503)))
            })
            .unwrap_err();

        assert_eq!(calls.get(), 3);
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert_eq!(err.attempts(), 3);
        assert_eq!(err.native_status(), Some(503));
        assert_eq!(err.operation(), Some("get"));
    }

    #[test]
    fn other_kinds_surface_after_one_call() {
        let calls = Cell::new(0);
        let err = pipeline(3)
            .execute::<()>(&Request::Delete { key: "k" }, || {
                calls.set(calls.get() + 1);
                Err(NativeError::new(Status(404)))
            })
            .unwrap_err();

        assert_eq!(calls.get(), 1);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.attempts(), 1);
    }

    #[test]
    fn success_passes_through_unchanged() {
        let value = pipeline(1)
            .execute(&Request::Get { key: "k" }, || Ok(vec![1_u8, 2, 3]))
            .unwrap();
        assert_eq!(value, vec![1, 2, 3]);
    }

    #[test]
    fn local_errors_use_the_io_table() {
        let err = pipeline(3).local_error(
            "upload",
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.provider(), Some(ProviderId::Local));
        assert_eq!(err.operation(), Some("upload"));
    }

    #[test]
    fn invoke_skips_validation() {
        let p = pipeline(2);
        let calls = Cell::new(0);
        let _ = p.invoke("list", || {
            calls.set(calls.get() + 1);
            Err::<(), _>(NativeError::new(Status(503)))
        });
        assert_eq!(calls.get(), 2);
        assert_eq!(p.retry().policy().max_attempts(), 2);
        assert_eq!(p.validation().keys.max_len, 1024);
        assert!(p.retry().policy().base_delay() > Duration::ZERO);
    }
}
