//! A scripted in-memory backend.
//!
//! [`ScriptedBackend`] stores objects and records in memory, counts every
//! call per [`Method`] and fails calls on demand with [`ScriptedError`]s.
//! It reports whatever provider it is created for, so the failures are
//! translated with that provider's table.

use cloudconn_core::{
    DatabaseCapability, Filter, NativeError, NativeResult, ObjectMeta, Page, ProviderBackend,
    ProviderId, Record, Row, StorageCapability, VendorError,
};
use cloudconn_providers::FaultPlan;
use parking_lot::Mutex;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::ops::Bound;
use thiserror::Error;

/// Backend methods, as counted by [`ScriptedBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `StorageCapability::put`
    Put,
    /// `StorageCapability::get`
    Get,
    /// `StorageCapability::head`
    Head,
    /// `StorageCapability::delete`
    Delete,
    /// `StorageCapability::copy`
    Copy,
    /// `StorageCapability::list_page`
    ListPage,
    /// `DatabaseCapability::read`
    Read,
    /// `DatabaseCapability::write`
    Write,
    /// `DatabaseCapability::remove`
    Remove,
    /// `DatabaseCapability::query_page`
    QueryPage,
}

impl Method {
    /// Every method.
    pub const ALL: [Method; 10] = [
        Method::Put,
        Method::Get,
        Method::Head,
        Method::Delete,
        Method::Copy,
        Method::ListPage,
        Method::Read,
        Method::Write,
        Method::Remove,
        Method::QueryPage,
    ];

    /// The trait method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Method::Put => "put",
            Method::Get => "get",
            Method::Head => "head",
            Method::Delete => "delete",
            Method::Copy => "copy",
            Method::ListPage => "list_page",
            Method::Read => "read",
            Method::Write => "write",
            Method::Remove => "remove",
            Method::QueryPage => "query_page",
        }
    }
}

/// A vendor-style error with optional code and status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ScriptedError {
    /// Native code.
    pub code: Option<String>,
    /// Native status.
    pub status: Option<u16>,
    /// Message.
    pub message: String,
}

impl ScriptedError {
    /// Creates an error with a code and a status.
    pub fn new(code: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            status: Some(status),
            message: message.into(),
        }
    }

    /// An error carrying only a status and a message.
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            code: None,
            status: Some(status),
            message: message.into(),
        }
    }

    /// An error carrying only a message.
    pub fn bare(message: impl Into<String>) -> Self {
        Self {
            code: None,
            status: None,
            message: message.into(),
        }
    }

    /// `503 throttled`, transient for the cloud providers.
    #[must_use]
    pub fn throttled() -> Self {
        Self::with_status(503, "503 throttled")
    }

    /// `403 access denied`, permanent for the cloud providers.
    #[must_use]
    pub fn denied() -> Self {
        Self::with_status(403, "access denied")
    }

    /// `404 not found`.
    #[must_use]
    pub fn missing(what: &str) -> Self {
        Self::with_status(404, format!("{what} not found"))
    }
}

impl VendorError for ScriptedError {
    fn code(&self) -> Option<Cow<'_, str>> {
        self.code.as_deref().map(Cow::Borrowed)
    }

    fn status(&self) -> Option<u16> {
        self.status
    }
}

impl From<ScriptedError> for NativeError {
    fn from(err: ScriptedError) -> Self {
        NativeError::new(err)
    }
}

/// In-memory backend with call counters and scripted failures.
///
/// Listing and query pages hold at most `page_size` entries (2 by default)
/// so small fixtures still paginate.
#[derive(Debug)]
pub struct ScriptedBackend {
    provider: ProviderId,
    page_size: usize,
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    tables: Mutex<BTreeMap<String, BTreeMap<String, Record>>>,
    faults: FaultPlan<ScriptedError>,
}

impl ScriptedBackend {
    /// Creates an empty backend reporting `provider`.
    #[must_use]
    pub fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            page_size: 2,
            objects: Mutex::new(BTreeMap::new()),
            tables: Mutex::new(BTreeMap::new()),
            faults: FaultPlan::new(),
        }
    }

    /// Sets the page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Fails the next call of `method` with `err`.
    pub fn fail_next(&self, method: Method, err: ScriptedError) {
        self.faults.fail_next(method.as_str(), err);
    }

    /// Fails the next `times` calls of `method` with `err`.
    pub fn fail_times(&self, method: Method, times: usize, err: ScriptedError) {
        self.faults.fail_times(method.as_str(), times, err);
    }

    /// Drops every scripted failure.
    pub fn clear_failures(&self) {
        self.faults.clear();
    }

    /// Number of calls of `method`, failed ones included.
    #[must_use]
    pub fn calls(&self, method: Method) -> usize {
        self.faults.calls(method.as_str())
    }

    /// Number of calls of any method.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.faults.total_calls()
    }

    /// Zeroes the call counters.
    pub fn reset_calls(&self) {
        self.faults.reset_calls();
    }

    fn check(&self, method: Method) -> NativeResult<()> {
        Ok(self.faults.check(method.as_str())?)
    }
}

fn page_after<'a, V: 'a, T>(
    mut entries: impl Iterator<Item = (&'a String, &'a V)>,
    page_size: usize,
    convert: impl Fn(&String, &V) -> T,
) -> Page<T> {
    let mut items = Vec::new();
    let mut last = None;
    for (key, value) in entries.by_ref().take(page_size) {
        items.push(convert(key, value));
        last = Some(key.clone());
    }
    match entries.next() {
        Some(_) => Page::new(items, last),
        None => Page::last(items),
    }
}

fn after(token: Option<&str>) -> (Bound<String>, Bound<String>) {
    let start = token.map_or(Bound::Unbounded, |t| Bound::Excluded(t.to_string()));
    (start, Bound::Unbounded)
}

impl StorageCapability for ScriptedBackend {
    fn put(&self, key: &str, data: &[u8]) -> NativeResult<()> {
        self.check(Method::Put)?;
        self.objects.lock().insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> NativeResult<Vec<u8>> {
        self.check(Method::Get)?;
        let objects = self.objects.lock();
        Ok(objects
            .get(key)
            .cloned()
            .ok_or_else(|| ScriptedError::missing(key))?)
    }

    fn head(&self, key: &str) -> NativeResult<ObjectMeta> {
        self.check(Method::Head)?;
        let objects = self.objects.lock();
        let data = objects.get(key).ok_or_else(|| ScriptedError::missing(key))?;
        Ok(ObjectMeta::new(key, data.len() as u64))
    }

    fn delete(&self, key: &str) -> NativeResult<()> {
        self.check(Method::Delete)?;
        match self.objects.lock().remove(key) {
            Some(_) => Ok(()),
            None => Err(ScriptedError::missing(key).into()),
        }
    }

    fn copy(&self, source: &str, destination: &str) -> NativeResult<()> {
        self.check(Method::Copy)?;
        let mut objects = self.objects.lock();
        let data = objects
            .get(source)
            .cloned()
            .ok_or_else(|| ScriptedError::missing(source))?;
        objects.insert(destination.to_string(), data);
        Ok(())
    }

    fn list_page(&self, prefix: &str, token: Option<&str>) -> NativeResult<Page<ObjectMeta>> {
        self.check(Method::ListPage)?;
        let objects = self.objects.lock();
        let matching = objects
            .range(after(token))
            .filter(|(key, _)| key.starts_with(prefix));
        Ok(page_after(matching, self.page_size, |key, data: &Vec<u8>| {
            ObjectMeta::new(key.clone(), data.len() as u64)
        }))
    }
}

impl DatabaseCapability for ScriptedBackend {
    fn read(&self, table: &str, key: &str) -> NativeResult<Record> {
        self.check(Method::Read)?;
        let tables = self.tables.lock();
        Ok(tables
            .get(table)
            .and_then(|rows| rows.get(key))
            .cloned()
            .ok_or_else(|| ScriptedError::missing(&format!("{table}/{key}")))?)
    }

    fn write(&self, table: &str, key: &str, record: &Record) -> NativeResult<()> {
        self.check(Method::Write)?;
        self.tables
            .lock()
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string(), record.clone());
        Ok(())
    }

    fn remove(&self, table: &str, key: &str) -> NativeResult<()> {
        self.check(Method::Remove)?;
        let removed = self
            .tables
            .lock()
            .get_mut(table)
            .and_then(|rows| rows.remove(key));
        match removed {
            Some(_) => Ok(()),
            None => Err(ScriptedError::missing(&format!("{table}/{key}")).into()),
        }
    }

    fn query_page(
        &self,
        table: &str,
        filter: &Filter,
        token: Option<&str>,
    ) -> NativeResult<Page<Row>> {
        self.check(Method::QueryPage)?;
        let tables = self.tables.lock();
        let Some(rows) = tables.get(table) else {
            return Ok(Page::empty());
        };
        let matching = rows
            .range(after(token))
            .filter(|(_, record)| filter.matches(record));
        Ok(page_after(matching, self.page_size, |key, record: &Record| {
            Row::new(key.clone(), record.clone())
        }))
    }
}

impl ProviderBackend for ScriptedBackend {
    fn provider(&self) -> ProviderId {
        self.provider
    }

    fn describe(&self) -> String {
        format!("scripted({})", self.provider)
    }
}
