//! # cloudconn Testkit
//!
//! Test utilities for cloudconn.
//!
//! This crate provides:
//! - Connector fixtures for every provider, backed by temporary directories
//!   and in-process simulators
//! - A scripted backend that counts calls and fails them on demand
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use cloudconn_testkit::prelude::*;
//!
//! let (connector, backend) = scripted(ProviderId::Aws, fast_retry(3));
//! backend.fail_times(Method::Get, 5, ScriptedError::throttled());
//!
//! let err = connector.storage().get("report.csv").unwrap_err();
//! assert_eq!(err.attempts(), 3);
//! assert_eq!(backend.calls(Method::Get), 3);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mock;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::mock::*;
    pub use cloudconn_core::{ErrorKind, ProviderId};
}

pub use fixtures::*;
pub use generators::*;
pub use mock::*;
