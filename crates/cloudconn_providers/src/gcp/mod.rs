//! Google Cloud Platform backend.

mod api;
mod backend;
mod errors;
mod sim;

pub use api::{
    Document, Fields, FirestoreValue, GcpApi, GcpApiError, GcpResult, GcsObject, ObjectList,
    QueryPage,
};
pub use backend::{GcpBackend, DEFAULT_PAGE_SIZE};
pub use errors::{gcp_error_table, GCP_ERROR_RULES};
pub use sim::SimulatedGcp;
