//! Provider backend over [`GcpApi`]: objects in one Cloud Storage bucket,
//! records as Firestore documents, one collection per table.

use super::api::{Fields, FirestoreValue, GcpApi, GcpApiError};
use cloudconn_core::{
    DatabaseCapability, Filter, NativeError, NativeResult, ObjectMeta, Page, ProviderBackend,
    ProviderId, Record, Row, StorageCapability,
};
use serde_json::Value;
use std::sync::Arc;

/// Default number of entries requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Backend for Cloud Storage and Firestore.
#[derive(Clone)]
pub struct GcpBackend {
    client: Arc<dyn GcpApi>,
    bucket: String,
    page_size: usize,
}

impl GcpBackend {
    /// Creates a backend storing objects in `bucket`.
    pub fn new(client: Arc<dyn GcpApi>, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets how many entries a listing or query page asks for.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// The bucket objects are stored in.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn to_fields(record: &Record) -> Result<Fields, GcpApiError> {
    record
        .iter()
        .map(|(field, value)| Ok((field.clone(), FirestoreValue::try_from(value)?)))
        .collect()
}

fn to_record(fields: &Fields) -> Record {
    fields
        .iter()
        .map(|(field, value)| (field.clone(), Value::from(value)))
        .collect()
}

impl StorageCapability for GcpBackend {
    fn put(&self, key: &str, data: &[u8]) -> NativeResult<()> {
        Ok(self.client.insert_object(&self.bucket, key, data)?)
    }

    fn get(&self, key: &str) -> NativeResult<Vec<u8>> {
        Ok(self.client.download_object(&self.bucket, key)?)
    }

    fn head(&self, key: &str) -> NativeResult<ObjectMeta> {
        let object = self.client.object_metadata(&self.bucket, key)?;
        Ok(ObjectMeta::new(object.name, object.size))
    }

    fn delete(&self, key: &str) -> NativeResult<()> {
        Ok(self.client.delete_object(&self.bucket, key)?)
    }

    fn copy(&self, source: &str, destination: &str) -> NativeResult<()> {
        Ok(self.client.rewrite_object(&self.bucket, source, destination)?)
    }

    fn list_page(&self, prefix: &str, token: Option<&str>) -> NativeResult<Page<ObjectMeta>> {
        let list = self
            .client
            .list_objects(&self.bucket, prefix, token, self.page_size)?;
        let items = list
            .items
            .into_iter()
            .map(|object| ObjectMeta::new(object.name, object.size))
            .collect();
        Ok(Page::new(items, list.next_page_token))
    }
}

impl DatabaseCapability for GcpBackend {
    fn read(&self, table: &str, key: &str) -> NativeResult<Record> {
        let document = self.client.get_document(table, key)?;
        Ok(to_record(&document.fields))
    }

    fn write(&self, table: &str, key: &str, record: &Record) -> NativeResult<()> {
        Ok(self.client.set_document(table, key, to_fields(record)?)?)
    }

    fn remove(&self, table: &str, key: &str) -> NativeResult<()> {
        Ok(self.client.delete_document(table, key, true)?)
    }

    fn query_page(
        &self,
        table: &str,
        filter: &Filter,
        token: Option<&str>,
    ) -> NativeResult<Page<Row>> {
        let page = self.client.run_query(table, token, self.page_size)?;
        let rows = page
            .documents
            .iter()
            .map(|doc| Row::new(doc.id.clone(), to_record(&doc.fields)))
            .filter(|row| filter.matches(&row.record))
            .collect();
        Ok(Page::new(rows, page.next_start_after))
    }
}

impl ProviderBackend for GcpBackend {
    fn provider(&self) -> ProviderId {
        ProviderId::Gcp
    }

    fn describe(&self) -> String {
        format!("gcp(gs://{})", self.bucket)
    }
}

impl From<GcpApiError> for NativeError {
    fn from(err: GcpApiError) -> Self {
        NativeError::new(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcp::SimulatedGcp;

    fn backend() -> GcpBackend {
        GcpBackend::new(Arc::new(SimulatedGcp::with_bucket("bucket")), "bucket").with_page_size(2)
    }

    #[test]
    fn objects_round_trip() {
        let backend = backend();
        backend.put("a", b"xyz").unwrap();
        assert_eq!(backend.get("a").unwrap(), b"xyz");
        assert_eq!(backend.head("a").unwrap(), ObjectMeta::new("a", 3));
        backend.copy("a", "b").unwrap();
        let page = backend.list_page("", None).unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.next.is_none());
    }

    #[test]
    fn missing_things_are_native_not_found() {
        let backend = backend();
        assert_eq!(backend.delete("ghost").unwrap_err().code(), Some("notFound"));
        assert_eq!(backend.read("t", "1").unwrap_err().code(), Some("NOT_FOUND"));
        assert_eq!(backend.remove("t", "1").unwrap_err().status(), Some(404));
    }

    #[test]
    fn records_round_trip_and_query() {
        let backend = backend();
        let record = Record::new().with("name", "grace").with("tags", serde_json::json!(["a"]));
        backend.write("people", "g", &record).unwrap();
        assert_eq!(backend.read("people", "g").unwrap(), record);

        let rows = backend
            .query_page("people", &Filter::all().exists("tags"), None)
            .unwrap();
        assert_eq!(rows.items, vec![Row::new("g", record)]);
        assert_eq!(backend.describe(), "gcp(gs://bucket)");
    }

    #[test]
    fn unrepresentable_numbers_are_rejected_not_rounded() {
        let backend = backend();
        let record = Record::new().with("big", u64::MAX);
        let err = backend.write("nums", "k", &record).unwrap_err();
        assert_eq!(err.code(), Some("INVALID_ARGUMENT"));
        assert_eq!(err.status(), Some(400));
        assert_eq!(backend.read("nums", "k").unwrap_err().code(), Some("NOT_FOUND"));
    }
}
