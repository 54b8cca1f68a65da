//! Backend registration.
//!
//! A [`BackendRegistry`] is filled once at startup and only read afterwards.
//! A backend is either fully constructed and registered or absent: the
//! fallible [`BackendRegistry::register_with`] inserts nothing when the
//! constructor fails.

use crate::backend::ProviderBackend;
use crate::error::{ConnectorError, ConnectorResult};
use crate::provider::ProviderId;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Mapping from provider identifier to a constructed backend.
#[derive(Debug, Default, Clone)]
pub struct BackendRegistry {
    backends: BTreeMap<ProviderId, Arc<dyn ProviderBackend>>,
}

impl BackendRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructed backend under `provider`.
    ///
    /// Fails with `Conflict` if the id is taken and with `InvalidInput` if
    /// the backend belongs to another provider.
    pub fn register(
        &mut self,
        provider: ProviderId,
        backend: Arc<dyn ProviderBackend>,
    ) -> ConnectorResult<()> {
        self.ensure_vacant(provider)?;
        if backend.provider() != provider {
            return Err(ConnectorError::invalid_input(format!(
                "backend for '{}' cannot be registered as '{provider}'",
                backend.provider()
            ))
            .with_operation("register"));
        }
        debug!(%provider, backend = %backend.describe(), "registered backend");
        self.backends.insert(provider, backend);
        Ok(())
    }

    /// Runs `construct` and registers its result.
    ///
    /// The constructor is not run when the id is already taken.
    pub fn register_with<E>(
        &mut self,
        provider: ProviderId,
        construct: impl FnOnce() -> Result<Arc<dyn ProviderBackend>, E>,
    ) -> Result<(), E>
    where
        E: From<ConnectorError>,
    {
        self.ensure_vacant(provider)?;
        let backend = construct()?;
        self.register(provider, backend)?;
        Ok(())
    }

    /// Returns the backend registered under `provider`.
    pub fn get_active(&self, provider: ProviderId) -> ConnectorResult<Arc<dyn ProviderBackend>> {
        self.backends.get(&provider).cloned().ok_or_else(|| {
            ConnectorError::not_found(format!("no backend registered for '{provider}'"))
                .with_operation("get_active")
        })
    }

    /// Whether a backend is registered under `provider`.
    #[must_use]
    pub fn contains(&self, provider: ProviderId) -> bool {
        self.backends.contains_key(&provider)
    }

    /// Number of registered backends.
    #[must_use]
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Whether no backend is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Registered provider ids in ascending order.
    pub fn providers(&self) -> impl Iterator<Item = ProviderId> + '_ {
        self.backends.keys().copied()
    }

    fn ensure_vacant(&self, provider: ProviderId) -> ConnectorResult<()> {
        if self.contains(provider) {
            return Err(ConnectorError::conflict(format!(
                "a backend is already registered for '{provider}'"
            ))
            .with_operation("register"));
        }
        Ok(())
    }
}

static INSTALLED: OnceLock<BackendRegistry> = OnceLock::new();

/// Freezes `registry` as the process-wide registration.
///
/// Can succeed only once per process.
pub fn install(registry: BackendRegistry) -> ConnectorResult<&'static BackendRegistry> {
    INSTALLED.set(registry).map_err(|_| {
        ConnectorError::conflict("a backend registry is already installed").with_operation("install")
    })?;
    installed().ok_or_else(|| ConnectorError::not_found("backend registry vanished"))
}

/// The process-wide registration, if one was installed.
#[must_use]
pub fn installed() -> Option<&'static BackendRegistry> {
    INSTALLED.get()
}
