//! Test fixtures and connector helpers.
//!
//! Provides ready-to-use connectors for every provider, each backed by
//! something that needs no network: a temporary directory for the local
//! provider and the in-process simulators for the cloud providers.

use crate::mock::ScriptedBackend;
use cloudconn_core::{Connector, ProviderBackend, ProviderId, RetryPolicy};
use cloudconn_providers::aws::{AwsBackend, SimulatedAws};
use cloudconn_providers::gcp::{GcpBackend, SimulatedGcp};
use cloudconn_providers::local::LocalBackend;
use cloudconn_providers::{default_translator, ConnectorConfig};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Bucket used by the simulated cloud fixtures.
pub const TEST_BUCKET: &str = "cloudconn-test";

/// Page size used by every fixture, small enough that a handful of
/// entries spans several pages.
pub const TEST_PAGE_SIZE: usize = 2;

/// A retry policy with short, jitter-free waits.
#[must_use]
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts)
        .with_base_delay(Duration::from_millis(10))
        .with_jitter(Duration::ZERO)
}

fn bind(provider: ProviderId, retry: RetryPolicy, backend: Arc<dyn ProviderBackend>) -> Connector {
    Connector::builder(provider)
        .retry_policy(retry)
        .translator(default_translator(&ConnectorConfig::default()))
        .sleeper(|_| {})
        .bind(backend)
}

/// A connector bound to a throwaway backend.
///
/// Retries do not sleep. Whatever backs the connector stays reachable for
/// inspection and fault injection.
pub struct TestConnector {
    /// The connector under test.
    pub connector: Connector,
    /// The simulated AWS account, for the AWS fixture.
    pub aws: Option<Arc<SimulatedAws>>,
    /// The simulated GCP project, for the GCP fixture.
    pub gcp: Option<Arc<SimulatedGcp>>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestConnector {
    /// A connector on a local backend in a temporary directory.
    pub fn local() -> Self {
        Self::local_with_retry(fast_retry(3))
    }

    /// A local connector with a custom retry policy.
    pub fn local_with_retry(retry: RetryPolicy) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let backend = LocalBackend::open(temp_dir.path())
            .expect("Failed to open local backend")
            .with_page_size(TEST_PAGE_SIZE);
        Self {
            connector: bind(ProviderId::Local, retry, Arc::new(backend)),
            aws: None,
            gcp: None,
            _temp_dir: Some(temp_dir),
        }
    }

    /// A connector on a simulated AWS account.
    pub fn aws() -> Self {
        Self::aws_with_retry(fast_retry(3))
    }

    /// An AWS connector with a custom retry policy.
    pub fn aws_with_retry(retry: RetryPolicy) -> Self {
        let client = Arc::new(SimulatedAws::with_bucket(TEST_BUCKET));
        let backend = AwsBackend::new(client.clone(), TEST_BUCKET).with_page_size(TEST_PAGE_SIZE);
        Self {
            connector: bind(ProviderId::Aws, retry, Arc::new(backend)),
            aws: Some(client),
            gcp: None,
            _temp_dir: None,
        }
    }

    /// A connector on a simulated GCP project.
    pub fn gcp() -> Self {
        Self::gcp_with_retry(fast_retry(3))
    }

    /// A GCP connector with a custom retry policy.
    pub fn gcp_with_retry(retry: RetryPolicy) -> Self {
        let client = Arc::new(SimulatedGcp::with_bucket(TEST_BUCKET));
        let backend = GcpBackend::new(client.clone(), TEST_BUCKET).with_page_size(TEST_PAGE_SIZE);
        Self {
            connector: bind(ProviderId::Gcp, retry, Arc::new(backend)),
            aws: None,
            gcp: Some(client),
            _temp_dir: None,
        }
    }

    /// The fixture for `provider`.
    pub fn for_provider(provider: ProviderId) -> Self {
        match provider {
            ProviderId::Aws => Self::aws(),
            ProviderId::Gcp => Self::gcp(),
            ProviderId::Local => Self::local(),
        }
    }

    /// One fixture per provider.
    pub fn all() -> Vec<Self> {
        ProviderId::ALL.into_iter().map(Self::for_provider).collect()
    }

    /// The temporary root directory, for the local fixture.
    pub fn root(&self) -> Option<&std::path::Path> {
        self._temp_dir.as_ref().map(TempDir::path)
    }
}

impl std::ops::Deref for TestConnector {
    type Target = Connector;

    fn deref(&self) -> &Self::Target {
        &self.connector
    }
}

/// Runs a test once against every provider.
///
/// # Example
///
/// ```rust
/// use cloudconn_testkit::with_each_provider;
///
/// with_each_provider(|connector| {
///     connector.storage().put("k", b"v").unwrap();
///     assert_eq!(connector.storage().get("k").unwrap(), b"v");
/// });
/// ```
pub fn with_each_provider<F>(mut f: F)
where
    F: FnMut(&TestConnector),
{
    for fixture in TestConnector::all() {
        f(&fixture);
    }
}

/// A connector bound to a fresh [`ScriptedBackend`] reporting `provider`.
///
/// Retries do not sleep.
pub fn scripted(provider: ProviderId, retry: RetryPolicy) -> (Connector, Arc<ScriptedBackend>) {
    let backend = Arc::new(ScriptedBackend::new(provider));
    let connector = bind(provider, retry, backend.clone());
    (connector, backend)
}
