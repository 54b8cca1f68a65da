//! Unified error taxonomy.
//!
//! Every failure that leaves the facade is a [`ConnectorError`]. Its
//! [`ErrorKind`] is one of a closed set of cross-provider categories and
//! decides whether the retry layer may re-invoke the operation.

use crate::native::NativeError;
use crate::provider::ProviderId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Result type for facade operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Cross-provider failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The addressed object, record, bucket or table does not exist.
    NotFound,
    /// Credentials are missing, invalid, or lack the required grant.
    PermissionDenied,
    /// The request collides with the current state of the resource.
    Conflict,
    /// Throttling, timeouts, temporary unavailability.
    Transient,
    /// The request was rejected as malformed.
    InvalidInput,
    /// Catch-all for failures no table recognizes.
    Unknown,
}

impl ErrorKind {
    /// All kinds, in declaration order.
    pub const ALL: [ErrorKind; 6] = [
        ErrorKind::NotFound,
        ErrorKind::PermissionDenied,
        ErrorKind::Conflict,
        ErrorKind::Transient,
        ErrorKind::InvalidInput,
        ErrorKind::Unknown,
    ];

    /// Returns true if an operation failing with this kind may succeed on retry.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Transient)
    }

    /// Stable snake_case name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Transient => "transient",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized [`ErrorKind`] name.
#[derive(Debug, Error)]
#[error("unknown error kind: {0}")]
pub struct ParseErrorKindError(String);

impl FromStr for ErrorKind {
    type Err = ParseErrorKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseErrorKindError(s.to_string()))
    }
}

/// The normalized error every consumer-facing failure is expressed as.
///
/// The original backend error, when there was one, is kept as the chained
/// [`source`](std::error::Error::source) and is never discarded.
#[derive(Debug, Error)]
#[error("{kind}: {message}{}", attempts_note(.attempts))]
pub struct ConnectorError {
    kind: ErrorKind,
    message: String,
    provider: Option<ProviderId>,
    operation: Option<&'static str>,
    attempts: u32,
    #[source]
    source: Option<NativeError>,
}

fn attempts_note(attempts: &u32) -> String {
    if *attempts > 1 {
        format!(" (after {attempts} attempts)")
    } else {
        String::new()
    }
}

impl ConnectorError {
    /// Creates an error of the given kind with no native cause.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            provider: None,
            operation: None,
            attempts: 0,
            source: None,
        }
    }

    /// Creates an `InvalidInput` error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    /// Creates a `NotFound` error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Creates a `Conflict` error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Attaches the provider the failure came from.
    #[must_use]
    pub fn with_provider(mut self, provider: ProviderId) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Attaches the facade operation that failed.
    #[must_use]
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Records how many times the operation was invoked.
    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Chains the untranslated backend error as the cause.
    #[must_use]
    pub fn with_source(mut self, source: NativeError) -> Self {
        self.source = Some(source);
        self
    }

    /// The error category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Whether the failure is worth retrying at a higher level.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Human-readable description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Provider that produced the failure, if any.
    #[must_use]
    pub fn provider(&self) -> Option<ProviderId> {
        self.provider
    }

    /// Facade operation that failed, if known.
    #[must_use]
    pub fn operation(&self) -> Option<&'static str> {
        self.operation
    }

    /// Number of invocations performed before the error was surfaced.
    ///
    /// Zero when the request was rejected before any backend call.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The chained native error, if the failure came from a backend.
    #[must_use]
    pub fn native(&self) -> Option<&NativeError> {
        self.source.as_ref()
    }

    /// Native error code of the chained cause.
    #[must_use]
    pub fn native_code(&self) -> Option<&str> {
        self.source.as_ref().and_then(NativeError::code)
    }

    /// Native status of the chained cause.
    #[must_use]
    pub fn native_status(&self) -> Option<u16> {
        self.source.as_ref().and_then(NativeError::status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn only_transient_is_retryable() {
        for kind in ErrorKind::ALL {
            assert_eq!(kind.is_retryable(), kind == ErrorKind::Transient, "{kind}");
        }
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in ErrorKind::ALL {
            assert_eq!(kind.as_str().parse::<ErrorKind>().unwrap(), kind);
        }
        assert!("throttled".parse::<ErrorKind>().is_err());
    }

    #[test]
    fn kind_serde_uses_snake_case() {
        let json = serde_json::to_string(&ErrorKind::PermissionDenied).unwrap();
        assert_eq!(json, "\"permission_denied\"");
        let kind: ErrorKind = serde_json::from_str("\"transient\"").unwrap();
        assert_eq!(kind, ErrorKind::Transient);
    }

    #[test]
    fn display_mentions_attempts_only_when_retried() {
        let err = ConnectorError::new(ErrorKind::Transient, "slow down");
        assert_eq!(err.to_string(), "transient: slow down");

        let err = err.with_attempts(3);
        assert_eq!(err.to_string(), "transient: slow down (after 3 attempts)");
    }

    #[test]
    fn context_is_attached() {
        let err = ConnectorError::not_found("object 'a' not found")
            .with_provider(ProviderId::Gcp)
            .with_operation("get")
            .with_attempts(1);

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.provider(), Some(ProviderId::Gcp));
        assert_eq!(err.operation(), Some("get"));
        assert_eq!(err.attempts(), 1);
        assert!(!err.is_retryable());
        assert!(err.source().is_none());
        assert!(err.native_code().is_none());
    }

    #[test]
    fn native_cause_is_chained() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let native = NativeError::new(io);
        let err = ConnectorError::new(ErrorKind::PermissionDenied, native.to_string())
            .with_source(native);

        assert_eq!(err.native_code(), Some("PermissionDenied"));
        let cause = err.source().expect("cause");
        assert!(cause.to_string().contains("denied"));
        assert!(cause.source().is_some(), "vendor error stays reachable");
    }
}
