//! The unified facade.
//!
//! A [`Connector`] is bound to exactly one active backend taken from a
//! [`BackendRegistry`]. Consumers reach the capability sets through
//! [`Connector::storage`] and [`Connector::database`]; every call runs
//! through the [`Pipeline`].
//!
//! ## Example
//!
//! ```rust,ignore
//! let connector = Connector::builder(ProviderId::Local)
//!     .retry_policy(RetryPolicy::new(5))
//!     .build(&registry)?;
//!
//! connector.storage().put("reports/today.csv", b"a,b\n1,2\n")?;
//! for row in &connector.database().query("users", Filter::all().equals("active", true))? {
//!     println!("{}", row?.key);
//! }
//! ```

use crate::backend::ProviderBackend;
use crate::error::{ConnectorResult, ErrorKind};
use crate::pipeline::Pipeline;
use crate::provider::ProviderId;
use crate::registry::BackendRegistry;
use crate::retry::{RetryLayer, RetryPolicy};
use crate::sequence::Sequence;
use crate::translate::{ErrorTable, Translator};
use crate::types::{Filter, ObjectMeta, Record, Row};
use crate::validate::{Request, ValidationRules};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Builds a [`Connector`].
pub struct ConnectorBuilder {
    provider: ProviderId,
    retry: RetryPolicy,
    validation: ValidationRules,
    translator: Translator,
    sleeper: Option<Box<dyn Fn(Duration) + Send + Sync>>,
}

impl ConnectorBuilder {
    /// Starts a builder for the backend registered under `provider`.
    #[must_use]
    pub fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            retry: RetryPolicy::default(),
            validation: ValidationRules::default(),
            translator: Translator::new(),
            sleeper: None,
        }
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Sets the validation rules.
    #[must_use]
    pub fn validation_rules(mut self, rules: ValidationRules) -> Self {
        self.validation = rules;
        self
    }

    /// Sets the error translator.
    #[must_use]
    pub fn translator(mut self, translator: Translator) -> Self {
        self.translator = translator;
        self
    }

    /// Replaces the function used to wait between retries.
    #[must_use]
    pub fn sleeper(mut self, sleeper: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleeper = Some(Box::new(sleeper));
        self
    }

    /// Binds the connector to the active backend.
    ///
    /// Fails with `NotFound` when no backend is registered for the provider.
    pub fn build(self, registry: &BackendRegistry) -> ConnectorResult<Connector> {
        let backend = registry.get_active(self.provider)?;
        Ok(self.bind(backend))
    }

    /// Binds the connector to `backend` directly.
    #[must_use]
    pub fn bind(self, backend: Arc<dyn ProviderBackend>) -> Connector {
        let mut translator = self.translator;
        if translator.table(ProviderId::Local).is_none() {
            translator.insert(ErrorTable::io());
        }
        let mut retry = RetryLayer::new(self.retry);
        if let Some(sleeper) = self.sleeper {
            retry = retry.with_sleeper(sleeper);
        }
        Connector {
            pipeline: Arc::new(Pipeline::new(
                self.provider,
                self.validation,
                retry,
                Arc::new(translator),
            )),
            backend,
        }
    }
}

/// Single entry point to the active backend.
#[derive(Debug, Clone)]
pub struct Connector {
    backend: Arc<dyn ProviderBackend>,
    pipeline: Arc<Pipeline>,
}

impl Connector {
    /// Starts a builder.
    #[must_use]
    pub fn builder(provider: ProviderId) -> ConnectorBuilder {
        ConnectorBuilder::new(provider)
    }

    /// The active provider.
    #[must_use]
    pub fn provider(&self) -> ProviderId {
        self.pipeline.provider()
    }

    /// The retry policy in force.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        self.pipeline.retry().policy()
    }

    /// The validation rules in force.
    #[must_use]
    pub fn validation_rules(&self) -> &ValidationRules {
        self.pipeline.validation()
    }

    /// Object storage operations.
    #[must_use]
    pub fn storage(&self) -> Storage<'_> {
        Storage { connector: self }
    }

    /// Table operations.
    #[must_use]
    pub fn database(&self) -> Database<'_> {
        Database { connector: self }
    }
}

/// Storage capability of a [`Connector`].
#[derive(Debug, Clone, Copy)]
pub struct Storage<'a> {
    connector: &'a Connector,
}

impl Storage<'_> {
    fn backend(&self) -> &dyn ProviderBackend {
        self.connector.backend.as_ref()
    }

    fn pipeline(&self) -> &Pipeline {
        &self.connector.pipeline
    }

    /// Stores `data` under `key`.
    pub fn put(&self, key: &str, data: &[u8]) -> ConnectorResult<()> {
        let request = Request::Put {
            key,
            size: data.len() as u64,
        };
        self.pipeline()
            .execute(&request, || self.backend().put(key, data))
    }

    /// Reads the object stored under `key`.
    pub fn get(&self, key: &str) -> ConnectorResult<Vec<u8>> {
        self.pipeline()
            .execute(&Request::Get { key }, || self.backend().get(key))
    }

    /// Returns metadata of the object stored under `key`.
    pub fn head(&self, key: &str) -> ConnectorResult<ObjectMeta> {
        self.pipeline()
            .execute(&Request::Head { key }, || self.backend().head(key))
    }

    /// Whether an object is stored under `key`.
    pub fn exists(&self, key: &str) -> ConnectorResult<bool> {
        match self.head(key) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.with_operation("exists")),
        }
    }

    /// Deletes the object stored under `key`; a missing key is `NotFound`.
    pub fn delete(&self, key: &str) -> ConnectorResult<()> {
        self.pipeline()
            .execute(&Request::Delete { key }, || self.backend().delete(key))
    }

    /// Deletes several objects, stopping at the first failure.
    ///
    /// The whole batch is validated before the first deletion.
    pub fn delete_many(&self, keys: &[String]) -> ConnectorResult<()> {
        self.pipeline().validate(&Request::DeleteMany { keys })?;
        for key in keys {
            self.pipeline()
                .invoke("delete_many", || self.backend().delete(key))?;
        }
        Ok(())
    }

    /// Copies an object within the store.
    pub fn copy(&self, source: &str, destination: &str) -> ConnectorResult<()> {
        let request = Request::Copy {
            source,
            destination,
        };
        self.pipeline()
            .execute(&request, || self.backend().copy(source, destination))
    }

    /// Moves an object: copy, then delete the source.
    pub fn rename(&self, source: &str, destination: &str) -> ConnectorResult<()> {
        self.pipeline().validate(&Request::Rename {
            source,
            destination,
        })?;
        self.pipeline()
            .invoke("rename", || self.backend().copy(source, destination))?;
        self.pipeline()
            .invoke("rename", || self.backend().delete(source))
    }

    /// Lazily lists the keys under `prefix` in ascending order.
    pub fn list(&self, prefix: &str) -> ConnectorResult<Sequence<String>> {
        Ok(self.list_with_sizes(prefix)?.map(|meta| meta.key))
    }

    /// Lazily lists the objects under `prefix` with their sizes.
    pub fn list_with_sizes(&self, prefix: &str) -> ConnectorResult<Sequence<ObjectMeta>> {
        self.pipeline().validate(&Request::List { prefix })?;
        let backend = Arc::clone(&self.connector.backend);
        let pipeline = Arc::clone(&self.connector.pipeline);
        let prefix = prefix.to_string();
        Ok(Sequence::new(move |token| {
            pipeline.invoke("list", || backend.list_page(&prefix, token))
        }))
    }

    /// Stores the contents of a local file under `key`, returning its size.
    pub fn upload(&self, path: impl AsRef<Path>, key: &str) -> ConnectorResult<u64> {
        let path = path.as_ref();
        let local = |err| self.pipeline().local_error("upload", err);
        let size = fs::metadata(path).map_err(local)?.len();
        self.pipeline().validate(&Request::Put { key, size })?;
        let data = fs::read(path).map_err(local)?;
        self.pipeline()
            .invoke("upload", || self.backend().put(key, &data))?;
        Ok(data.len() as u64)
    }

    /// Writes the object stored under `key` to a local file, returning its size.
    ///
    /// The destination directory must exist.
    pub fn download(&self, key: &str, path: impl AsRef<Path>) -> ConnectorResult<u64> {
        let path = path.as_ref();
        let local = |err| self.pipeline().local_error("download", err);
        self.pipeline().validate(&Request::Get { key })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::metadata(parent).map_err(local)?;
        }
        let data = self
            .pipeline()
            .invoke("download", || self.backend().get(key))?;
        fs::write(path, &data).map_err(local)?;
        Ok(data.len() as u64)
    }
}

/// Database capability of a [`Connector`].
#[derive(Debug, Clone, Copy)]
pub struct Database<'a> {
    connector: &'a Connector,
}

impl Database<'_> {
    fn backend(&self) -> &dyn ProviderBackend {
        self.connector.backend.as_ref()
    }

    fn pipeline(&self) -> &Pipeline {
        &self.connector.pipeline
    }

    /// Reads one record; a missing record is `NotFound`.
    pub fn read(&self, table: &str, key: &str) -> ConnectorResult<Record> {
        self.pipeline()
            .execute(&Request::Read { table, key }, || self.backend().read(table, key))
    }

    /// Writes one record, replacing any previous one.
    pub fn write(&self, table: &str, key: &str, record: &Record) -> ConnectorResult<()> {
        let request = Request::Write { table, key, record };
        self.pipeline()
            .execute(&request, || self.backend().write(table, key, record))
    }

    /// Removes one record; a missing record is `NotFound`.
    pub fn remove(&self, table: &str, key: &str) -> ConnectorResult<()> {
        self.pipeline()
            .execute(&Request::Remove { table, key }, || {
                self.backend().remove(table, key)
            })
    }

    /// Lazily yields the rows matching `filter` in ascending key order.
    pub fn query(&self, table: &str, filter: Filter) -> ConnectorResult<Sequence<Row>> {
        self.pipeline().validate(&Request::Query {
            table,
            filter: &filter,
        })?;
        let backend = Arc::clone(&self.connector.backend);
        let pipeline = Arc::clone(&self.connector.pipeline);
        let table = table.to_string();
        let limit = filter.max_results();
        Ok(Sequence::new(move |token| {
            pipeline.invoke("query", || backend.query_page(&table, &filter, token))
        })
        .with_limit(limit))
    }
}
