//! Building backends and connectors from configuration.

use crate::aws::{aws_error_table, AwsApi, AwsBackend, SimulatedAws};
use crate::config::{ConfigError, ConfigResult, ConnectorConfig};
use crate::gcp::{gcp_error_table, GcpApi, GcpBackend, SimulatedGcp};
use crate::local::LocalBackend;
use cloudconn_core::{
    BackendRegistry, Connector, ErrorTable, ProviderBackend, ProviderId, Translator,
};
use std::sync::Arc;
use tracing::info;

/// Builds provider backends from a [`ConnectorConfig`].
///
/// Cloud backends need a client. Real SDK clients are injected with
/// [`with_aws_client`](Self::with_aws_client) and
/// [`with_gcp_client`](Self::with_gcp_client); [`simulated`](Self::simulated)
/// substitutes in-process simulators holding the configured buckets.
#[derive(Default, Clone)]
pub struct BackendFactory {
    aws_client: Option<Arc<dyn AwsApi>>,
    gcp_client: Option<Arc<dyn GcpApi>>,
    simulated: bool,
}

impl std::fmt::Debug for BackendFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendFactory")
            .field("aws_client", &self.aws_client.is_some())
            .field("gcp_client", &self.gcp_client.is_some())
            .field("simulated", &self.simulated)
            .finish()
    }
}

impl BackendFactory {
    /// Creates a factory that can only build the local backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory backing cloud providers with simulators.
    #[must_use]
    pub fn simulated() -> Self {
        Self {
            simulated: true,
            ..Self::default()
        }
    }

    /// Uses `client` for the AWS backend.
    #[must_use]
    pub fn with_aws_client(mut self, client: Arc<dyn AwsApi>) -> Self {
        self.aws_client = Some(client);
        self
    }

    /// Uses `client` for the GCP backend.
    #[must_use]
    pub fn with_gcp_client(mut self, client: Arc<dyn GcpApi>) -> Self {
        self.gcp_client = Some(client);
        self
    }

    /// Builds a registry holding the backend of every configured section.
    ///
    /// The selected provider must have a section; other sections are built
    /// when present, so a registry may hold more than the active backend.
    pub fn build(&self, config: &ConnectorConfig) -> ConfigResult<BackendRegistry> {
        config.validate()?;

        let mut registry = BackendRegistry::new();
        for provider in ProviderId::ALL {
            let configured = match provider {
                ProviderId::Aws => config.aws.is_some(),
                ProviderId::Gcp => config.gcp.is_some(),
                ProviderId::Local => config.local.is_some(),
            };
            if !configured {
                continue;
            }
            // Non-active cloud sections without a client are skipped.
            if provider != config.provider && !self.can_build(provider) {
                continue;
            }
            registry.register_with(provider, || self.backend(provider, config))?;
        }
        Ok(registry)
    }

    /// Builds the registry and binds a connector to the selected provider.
    pub fn connect(&self, config: &ConnectorConfig) -> ConfigResult<Connector> {
        let registry = self.build(config)?;
        let connector = Connector::builder(config.provider)
            .retry_policy(config.retry.clone())
            .validation_rules(config.validation.clone())
            .translator(default_translator(config))
            .build(&registry)?;
        Ok(connector)
    }

    fn can_build(&self, provider: ProviderId) -> bool {
        match provider {
            ProviderId::Aws => self.simulated || self.aws_client.is_some(),
            ProviderId::Gcp => self.simulated || self.gcp_client.is_some(),
            ProviderId::Local => true,
        }
    }

    fn backend(
        &self,
        provider: ProviderId,
        config: &ConnectorConfig,
    ) -> ConfigResult<Arc<dyn ProviderBackend>> {
        let backend: Arc<dyn ProviderBackend> = match provider {
            ProviderId::Aws => {
                let section = config
                    .aws
                    .as_ref()
                    .ok_or(ConfigError::MissingSection(provider))?;
                let client = match (&self.aws_client, self.simulated) {
                    (Some(client), _) => Arc::clone(client),
                    (None, true) => Arc::new(SimulatedAws::with_bucket(&section.bucket)),
                    (None, false) => return Err(ConfigError::NoClient(provider)),
                };
                let mut backend = AwsBackend::new(client, section.bucket.clone());
                if let Some(page_size) = section.page_size {
                    backend = backend.with_page_size(page_size);
                }
                Arc::new(backend)
            }
            ProviderId::Gcp => {
                let section = config
                    .gcp
                    .as_ref()
                    .ok_or(ConfigError::MissingSection(provider))?;
                let client = match (&self.gcp_client, self.simulated) {
                    (Some(client), _) => Arc::clone(client),
                    (None, true) => Arc::new(SimulatedGcp::with_bucket(&section.bucket)),
                    (None, false) => return Err(ConfigError::NoClient(provider)),
                };
                let mut backend = GcpBackend::new(client, section.bucket.clone());
                if let Some(page_size) = section.page_size {
                    backend = backend.with_page_size(page_size);
                }
                Arc::new(backend)
            }
            ProviderId::Local => {
                let section = config
                    .local
                    .as_ref()
                    .ok_or(ConfigError::MissingSection(provider))?;
                let mut backend =
                    LocalBackend::open(&section.root).map_err(|source| ConfigError::Io {
                        path: section.root.clone(),
                        source,
                    })?;
                if let Some(page_size) = section.page_size {
                    backend = backend.with_page_size(page_size);
                }
                Arc::new(backend)
            }
        };
        info!("Built {} backend: {}", provider, backend.describe());
        Ok(backend)
    }
}

/// The built-in error tables with the configured overrides placed first.
#[must_use]
pub fn default_translator(config: &ConnectorConfig) -> Translator {
    let mut translator = Translator::new()
        .with_table(aws_error_table())
        .with_table(gcp_error_table())
        .with_table(ErrorTable::io());
    for table in &config.error_tables {
        translator.override_rules(table.provider, table.rules.iter().cloned());
    }
    translator
}

/// Builds a connector for `config` with a default [`BackendFactory`].
///
/// Only the local provider can be built this way; cloud providers need a
/// factory with a client.
pub fn connect(config: &ConnectorConfig) -> ConfigResult<Connector> {
    BackendFactory::new().connect(config)
}
