#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # cloudconn providers
//!
//! Concrete backends for the cloudconn facade:
//!
//! - [`aws`]: S3 objects and DynamoDB items
//! - [`gcp`]: Cloud Storage objects and Firestore documents
//! - [`local`]: a directory on the local filesystem
//!
//! Each cloud backend talks to its service through a narrow client trait
//! ([`aws::AwsApi`], [`gcp::GcpApi`]) and ships an in-process simulator
//! implementing it, with fault injection for exercising retries.
//!
//! ## Example
//!
//! ```rust
//! use cloudconn_providers::{connect, ConnectorConfig};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let connector = connect(&ConnectorConfig::local(dir.path())).unwrap();
//!
//! connector.storage().put("hello.txt", b"hello").unwrap();
//! assert_eq!(connector.storage().get("hello.txt").unwrap(), b"hello");
//! ```

pub mod aws;
mod config;
mod factory;
mod faults;
pub mod gcp;
pub mod local;

pub use config::{
    AwsConfig, ConfigError, ConfigResult, ConnectorConfig, GcpConfig, LocalConfig, AWS_REGIONS,
    ENV_BASE_DELAY, ENV_JITTER, ENV_MAX_ATTEMPTS, ENV_MULTIPLIER, ENV_PROVIDER,
};
pub use factory::{connect, default_translator, BackendFactory};
pub use faults::FaultPlan;
