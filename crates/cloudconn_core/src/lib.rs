//! # cloudconn core
//!
//! Provider-agnostic adapter core for cloud object storage and managed
//! databases.
//!
//! This crate provides:
//! - A closed error taxonomy ([`ErrorKind`], [`ConnectorError`])
//! - The capability contracts every provider backend implements
//! - An error translator driven by per-provider tables of data
//! - Validation, retry and translation layers composed in a fixed order
//! - Backend registration and the unified [`Connector`] facade
//!
//! ## Layering
//!
//! ```text
//! Connector::storage()/database()
//!     -> validation   (InvalidInput, never retried)
//!     -> retry        (Transient only, bounded, backoff + jitter)
//!     -> translation  (NativeError -> ConnectorError)
//!     -> ProviderBackend
//! ```
//!
//! Backends report failures as [`NativeError`]s and never see the
//! taxonomy. Consumers only ever see [`ConnectorError`]s.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod facade;
mod native;
mod pipeline;
mod provider;
pub mod registry;
mod retry;
mod sequence;
mod translate;
mod types;
mod validate;

pub use backend::{DatabaseCapability, ProviderBackend, StorageCapability};
pub use error::{ConnectorError, ConnectorResult, ErrorKind, ParseErrorKindError};
pub use facade::{Connector, ConnectorBuilder, Database, Storage};
pub use native::{NativeError, NativeResult, VendorError};
pub use pipeline::Pipeline;
pub use provider::{ParseProviderError, ProviderId};
pub use registry::BackendRegistry;
pub use retry::{RetryLayer, RetryPolicy, RetryPolicyError};
pub use sequence::{Sequence, SequenceIter};
pub use translate::{ErrorTable, Matcher, Rule, Translator, IO_ERROR_RULES};
pub use types::{CompareOp, Condition, Filter, ObjectMeta, Page, Record, Row};
pub use validate::{KeyRules, Request, ValidationRules};
