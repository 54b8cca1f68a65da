//! Translation table for AWS service errors.

use cloudconn_core::{ErrorKind, ErrorTable, ProviderId, Rule};

/// AWS error codes and statuses, mapped to unified kinds.
pub static AWS_ERROR_RULES: &[Rule] = &[
    // S3
    Rule::code("NoSuchKey", ErrorKind::NotFound),
    Rule::code("NoSuchBucket", ErrorKind::NotFound),
    Rule::code("NotFound", ErrorKind::NotFound),
    Rule::code("AccessDenied", ErrorKind::PermissionDenied),
    Rule::code("AllAccessDisabled", ErrorKind::PermissionDenied),
    Rule::code("InvalidAccessKeyId", ErrorKind::PermissionDenied),
    Rule::code("SignatureDoesNotMatch", ErrorKind::PermissionDenied),
    Rule::code("ExpiredToken", ErrorKind::PermissionDenied),
    Rule::code("BucketAlreadyExists", ErrorKind::Conflict),
    Rule::code("BucketAlreadyOwnedByYou", ErrorKind::Conflict),
    Rule::code("OperationAborted", ErrorKind::Conflict),
    Rule::code("PreconditionFailed", ErrorKind::Conflict),
    Rule::code("SlowDown", ErrorKind::Transient),
    Rule::code("RequestTimeout", ErrorKind::Transient),
    Rule::code("ServiceUnavailable", ErrorKind::Transient),
    Rule::code("InternalError", ErrorKind::Transient),
    Rule::code("InvalidArgument", ErrorKind::InvalidInput),
    Rule::code("InvalidBucketName", ErrorKind::InvalidInput),
    Rule::code("KeyTooLongError", ErrorKind::InvalidInput),
    Rule::code("EntityTooLarge", ErrorKind::InvalidInput),
    // DynamoDB
    Rule::code("ResourceNotFoundException", ErrorKind::NotFound),
    Rule::code("AccessDeniedException", ErrorKind::PermissionDenied),
    Rule::code("UnrecognizedClientException", ErrorKind::PermissionDenied),
    Rule::code("ConditionalCheckFailedException", ErrorKind::Conflict),
    Rule::code("TransactionConflictException", ErrorKind::Conflict),
    Rule::code("ResourceInUseException", ErrorKind::Conflict),
    Rule::code("ThrottlingException", ErrorKind::Transient),
    Rule::code("Throttling", ErrorKind::Transient),
    Rule::code("ProvisionedThroughputExceededException", ErrorKind::Transient),
    Rule::code("RequestLimitExceeded", ErrorKind::Transient),
    Rule::code("InternalServerError", ErrorKind::Transient),
    Rule::code("ValidationException", ErrorKind::InvalidInput),
    Rule::code("ItemCollectionSizeLimitExceededException", ErrorKind::InvalidInput),
    // Anything else the services reply with
    Rule::message("throttl", ErrorKind::Transient),
    Rule::message("rate exceeded", ErrorKind::Transient),
    Rule::status(400, ErrorKind::InvalidInput),
    Rule::status(401, ErrorKind::PermissionDenied),
    Rule::status(403, ErrorKind::PermissionDenied),
    Rule::status(404, ErrorKind::NotFound),
    Rule::status(409, ErrorKind::Conflict),
    Rule::status(412, ErrorKind::Conflict),
    Rule::status(429, ErrorKind::Transient),
    Rule::status_range(500, 599, ErrorKind::Transient),
];

/// The AWS translation table.
#[must_use]
pub fn aws_error_table() -> ErrorTable {
    ErrorTable::from_static(ProviderId::Aws, AWS_ERROR_RULES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::AwsServiceError;
    use cloudconn_core::{NativeError, Translator};

    fn classify(code: &str, status: u16, message: &str) -> ErrorKind {
        Translator::new()
            .with_table(aws_error_table())
            .classify(
                &NativeError::new(AwsServiceError::new(code, status, message)),
                ProviderId::Aws,
            )
    }

    #[test]
    fn codes_win_over_statuses() {
        assert_eq!(classify("NoSuchKey", 404, "x"), ErrorKind::NotFound);
        assert_eq!(classify("AccessDenied", 404, "x"), ErrorKind::PermissionDenied);
        assert_eq!(classify("ConditionalCheckFailedException", 400, "x"), ErrorKind::Conflict);
        assert_eq!(
            classify("ProvisionedThroughputExceededException", 400, "x"),
            ErrorKind::Transient
        );
    }

    #[test]
    fn unknown_codes_fall_back_to_status() {
        assert_eq!(classify("Mystery", 503, "x"), ErrorKind::Transient);
        assert_eq!(classify("Mystery", 404, "x"), ErrorKind::NotFound);
        assert_eq!(classify("Mystery", 400, "x"), ErrorKind::InvalidInput);
    }

    #[test]
    fn throttling_messages_are_transient() {
        assert_eq!(classify("Mystery", 400, "Request was Throttled"), ErrorKind::Transient);
    }

    #[test]
    fn unmapped_errors_are_unknown() {
        assert_eq!(classify("Mystery", 302, "moved"), ErrorKind::Unknown);
    }
}
