//! Translation table for Google Cloud API errors.

use cloudconn_core::{ErrorKind, ErrorTable, ProviderId, Rule};

/// GCP error reasons, gRPC status names and HTTP statuses, mapped to unified kinds.
pub static GCP_ERROR_RULES: &[Rule] = &[
    // Cloud Storage JSON API reasons
    Rule::code("notFound", ErrorKind::NotFound),
    Rule::code("forbidden", ErrorKind::PermissionDenied),
    Rule::code("insufficientPermissions", ErrorKind::PermissionDenied),
    Rule::code("authError", ErrorKind::PermissionDenied),
    Rule::code("conflict", ErrorKind::Conflict),
    Rule::code("conditionNotMet", ErrorKind::Conflict),
    Rule::code("rateLimitExceeded", ErrorKind::Transient),
    Rule::code("userRateLimitExceeded", ErrorKind::Transient),
    Rule::code("backendError", ErrorKind::Transient),
    Rule::code("internalError", ErrorKind::Transient),
    Rule::code("invalid", ErrorKind::InvalidInput),
    Rule::code("invalidArgument", ErrorKind::InvalidInput),
    Rule::code("required", ErrorKind::InvalidInput),
    // Firestore canonical codes
    Rule::code("NOT_FOUND", ErrorKind::NotFound),
    Rule::code("PERMISSION_DENIED", ErrorKind::PermissionDenied),
    Rule::code("UNAUTHENTICATED", ErrorKind::PermissionDenied),
    Rule::code("ALREADY_EXISTS", ErrorKind::Conflict),
    Rule::code("ABORTED", ErrorKind::Conflict),
    Rule::code("FAILED_PRECONDITION", ErrorKind::Conflict),
    Rule::code("RESOURCE_EXHAUSTED", ErrorKind::Transient),
    Rule::code("UNAVAILABLE", ErrorKind::Transient),
    Rule::code("DEADLINE_EXCEEDED", ErrorKind::Transient),
    Rule::code("INTERNAL", ErrorKind::Transient),
    Rule::code("INVALID_ARGUMENT", ErrorKind::InvalidInput),
    Rule::code("OUT_OF_RANGE", ErrorKind::InvalidInput),
    Rule::message("quota exceeded", ErrorKind::Transient),
    Rule::status(400, ErrorKind::InvalidInput),
    Rule::status(401, ErrorKind::PermissionDenied),
    Rule::status(403, ErrorKind::PermissionDenied),
    Rule::status(404, ErrorKind::NotFound),
    Rule::status(409, ErrorKind::Conflict),
    Rule::status(412, ErrorKind::Conflict),
    Rule::status(429, ErrorKind::Transient),
    Rule::status(408, ErrorKind::Transient),
    Rule::status_range(500, 599, ErrorKind::Transient),
];

/// The GCP translation table.
#[must_use]
pub fn gcp_error_table() -> ErrorTable {
    ErrorTable::from_static(ProviderId::Gcp, GCP_ERROR_RULES)
}
