//! Provider backend capability contracts.

use crate::native::NativeResult;
use crate::provider::ProviderId;
use crate::types::{Filter, ObjectMeta, Page, Record, Row};
use std::fmt;

/// Object storage operations a backend must implement.
///
/// Every method either returns its result or the vendor's own error wrapped
/// in a [`NativeError`](crate::NativeError). Backends never classify
/// failures and never swallow them.
///
/// # Invariants
///
/// - `get` returns exactly the bytes last `put` under the key
/// - `delete` of a missing key fails with the vendor's not-found error
/// - `list_page` yields keys in ascending order and ends with `next == None`
pub trait StorageCapability: Send + Sync {
    /// Stores `data` under `key`, replacing any previous object.
    fn put(&self, key: &str, data: &[u8]) -> NativeResult<()>;

    /// Reads the object stored under `key`.
    fn get(&self, key: &str) -> NativeResult<Vec<u8>>;

    /// Returns metadata of the object stored under `key`.
    fn head(&self, key: &str) -> NativeResult<ObjectMeta>;

    /// Deletes the object stored under `key`.
    fn delete(&self, key: &str) -> NativeResult<()>;

    /// Copies an object within the store.
    fn copy(&self, source: &str, destination: &str) -> NativeResult<()>;

    /// Lists objects whose key starts with `prefix`, one page at a time.
    ///
    /// `token` is `None` for the first page and the previous page's `next`
    /// afterwards.
    fn list_page(&self, prefix: &str, token: Option<&str>) -> NativeResult<Page<ObjectMeta>>;
}

/// Table operations a backend must implement.
///
/// # Invariants
///
/// - `read` returns exactly the record last `write`n under the key
/// - `read` and `remove` of a missing record fail with the vendor's not-found error
/// - a table that holds no records queries as empty
/// - `query_page` yields rows in ascending key order
pub trait DatabaseCapability: Send + Sync {
    /// Reads one record.
    fn read(&self, table: &str, key: &str) -> NativeResult<Record>;

    /// Writes one record, replacing any previous one.
    fn write(&self, table: &str, key: &str, record: &Record) -> NativeResult<()>;

    /// Removes one record.
    fn remove(&self, table: &str, key: &str) -> NativeResult<()>;

    /// Returns one page of the rows matching `filter`.
    ///
    /// Backends evaluate the filter conditions; the result limit is
    /// enforced by the caller.
    fn query_page(&self, table: &str, filter: &Filter, token: Option<&str>)
        -> NativeResult<Page<Row>>;
}

/// A provider backend: both capability sets for one vendor.
pub trait ProviderBackend: StorageCapability + DatabaseCapability {
    /// The provider this backend talks to.
    fn provider(&self) -> ProviderId;

    /// Short description used in logs (bucket, root directory, ...).
    fn describe(&self) -> String {
        self.provider().to_string()
    }
}

impl fmt::Debug for dyn ProviderBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProviderBackend({})", self.describe())
    }
}
