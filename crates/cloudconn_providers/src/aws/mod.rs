//! Amazon Web Services backend.

mod api;
mod backend;
mod errors;
mod sim;

pub use api::{
    AttributeValue, AwsApi, AwsResult, AwsServiceError, HeadObjectOutput, Item,
    ListObjectsV2Output, S3Object, ScanOutput,
};
pub use backend::{AwsBackend, DEFAULT_PAGE_SIZE};
pub use errors::{aws_error_table, AWS_ERROR_RULES};
pub use sim::SimulatedAws;
