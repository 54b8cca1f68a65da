//! Untranslated backend errors.
//!
//! Backends report failures as [`NativeError`]s: an envelope holding the
//! vendor's own identifiers (error code, HTTP-like status) and the vendor
//! error itself. Backends never classify their failures; that is the job of
//! the [`Translator`](crate::Translator).

use std::borrow::Cow;
use std::error::Error as StdError;
use std::io;
use thiserror::Error;

/// Result type for backend calls.
pub type NativeResult<T> = Result<T, NativeError>;

/// Native identifiers exposed by a vendor client error.
pub trait VendorError: StdError + Send + Sync + 'static {
    /// Vendor error code or class name (`NoSuchKey`, `rateLimitExceeded`, ...).
    fn code(&self) -> Option<Cow<'_, str>>;

    /// HTTP-like status code, when the vendor reports one.
    fn status(&self) -> Option<u16> {
        None
    }
}

impl VendorError for io::Error {
    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Owned(format!("{:?}", self.kind())))
    }
}

/// A backend failure that has not been classified yet.
#[derive(Debug, Error)]
#[error("{}{message}", describe_ids(.code, .status))]
pub struct NativeError {
    code: Option<String>,
    status: Option<u16>,
    message: String,
    #[source]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

fn describe_ids(code: &Option<String>, status: &Option<u16>) -> String {
    match (code, status) {
        (Some(code), Some(status)) => format!("[{code} {status}] "),
        (Some(code), None) => format!("[{code}] "),
        (None, Some(status)) => format!("[{status}] "),
        (None, None) => String::new(),
    }
}

impl NativeError {
    /// Wraps a vendor error, capturing its native identifiers.
    pub fn new<E: VendorError>(err: E) -> Self {
        Self {
            code: err.code().map(Cow::into_owned),
            status: err.status(),
            message: err.to_string(),
            source: Box::new(err),
        }
    }

    /// Native error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Native status, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Vendor message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The wrapped vendor error.
    #[must_use]
    pub fn vendor(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.source.as_ref()
    }

    /// Downcasts the wrapped vendor error.
    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.source.downcast_ref::<E>()
    }
}

impl From<io::Error> for NativeError {
    fn from(err: io::Error) -> Self {
        Self::new(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("{message}")]
    struct Throttled {
        message: String,
    }

    impl VendorError for Throttled {
        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed("SlowDown"))
        }

        fn status(&self) -> Option<u16> {
            Some(503)
        }
    }

    #[test]
    fn identifiers_are_captured() {
        let native = NativeError::new(Throttled {
            message: "reduce your request rate".into(),
        });

        assert_eq!(native.code(), Some("SlowDown"));
        assert_eq!(native.status(), Some(503));
        assert_eq!(native.message(), "reduce your request rate");
        assert_eq!(native.to_string(), "[SlowDown 503] reduce your request rate");
    }

    #[test]
    fn vendor_error_can_be_recovered() {
        let native = NativeError::new(Throttled {
            message: "x".into(),
        });
        assert!(native.downcast_ref::<Throttled>().is_some());
        assert!(native.downcast_ref::<io::Error>().is_none());
        assert_eq!(native.vendor().to_string(), "x");
    }

    #[test]
    fn io_errors_use_kind_as_code() {
        let native: NativeError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert_eq!(native.code(), Some("NotFound"));
        assert_eq!(native.status(), None);
        assert_eq!(native.to_string(), "[NotFound] gone");
    }
}
