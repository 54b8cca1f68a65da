//! Provider backend over [`AwsApi`]: objects in one S3 bucket, records in
//! DynamoDB tables keyed by a single string partition key.

use super::api::{AttributeValue, AwsApi, AwsServiceError, Item};
use cloudconn_core::{
    DatabaseCapability, Filter, NativeError, NativeResult, ObjectMeta, Page, ProviderBackend,
    ProviderId, Record, Row, StorageCapability,
};
use serde_json::Value;
use std::sync::Arc;

/// Default number of keys requested per listing page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Backend for Amazon S3 and DynamoDB.
#[derive(Clone)]
pub struct AwsBackend {
    client: Arc<dyn AwsApi>,
    bucket: String,
    page_size: usize,
}

impl AwsBackend {
    /// Creates a backend storing objects in `bucket`.
    pub fn new(client: Arc<dyn AwsApi>, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets how many entries a listing or scan page asks for.
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

    // DynamoDB answers a missing item with an empty response, not an error.
    fn missing_item(table: &str, key: &str) -> NativeError {
        NativeError::new(AwsServiceError::new(
            "ItemNotFound",
            404,
            format!("no item with key '{key}' in table '{table}'"),
        ))
    }
}

fn to_item(record: &Record) -> Item {
    record
        .iter()
        .map(|(field, value)| (field.clone(), AttributeValue::from(value)))
        .collect()
}

fn to_record(item: &Item) -> Record {
    item.iter()
        .map(|(field, attr)| (field.clone(), Value::from(attr)))
        .collect()
}

impl StorageCapability for AwsBackend {
    fn put(&self, key: &str, data: &[u8]) -> NativeResult<()> {
        Ok(self.client.put_object(&self.bucket, key, data)?)
    }

    fn get(&self, key: &str) -> NativeResult<Vec<u8>> {
        Ok(self.client.get_object(&self.bucket, key)?)
    }

    fn head(&self, key: &str) -> NativeResult<ObjectMeta> {
        let head = self.client.head_object(&self.bucket, key)?;
        Ok(ObjectMeta::new(key, head.content_length))
    }

    fn delete(&self, key: &str) -> NativeResult<()> {
        // DeleteObject is silent for missing keys
        self.client.head_object(&self.bucket, key)?;
        Ok(self.client.delete_object(&self.bucket, key)?)
    }

    fn copy(&self, source: &str, destination: &str) -> NativeResult<()> {
        Ok(self.client.copy_object(&self.bucket, source, destination)?)
    }

    fn list_page(&self, prefix: &str, token: Option<&str>) -> NativeResult<Page<ObjectMeta>> {
        let output = self
            .client
            .list_objects_v2(&self.bucket, prefix, token, self.page_size)?;
        let items = output
            .contents
            .into_iter()
            .map(|object| ObjectMeta::new(object.key, object.size))
            .collect();
        Ok(Page::new(items, output.next_continuation_token))
    }
}

impl DatabaseCapability for AwsBackend {
    fn read(&self, table: &str, key: &str) -> NativeResult<Record> {
        self.client
            .get_item(table, key)?
            .map(|item| to_record(&item))
            .ok_or_else(|| Self::missing_item(table, key))
    }

    fn write(&self, table: &str, key: &str, record: &Record) -> NativeResult<()> {
        Ok(self.client.put_item(table, key, to_item(record))?)
    }

    fn remove(&self, table: &str, key: &str) -> NativeResult<()> {
        if self.client.get_item(table, key)?.is_none() {
            return Err(Self::missing_item(table, key));
        }
        Ok(self.client.delete_item(table, key)?)
    }

    fn query_page(
        &self,
        table: &str,
        filter: &Filter,
        token: Option<&str>,
    ) -> NativeResult<Page<Row>> {
        let output = self.client.scan(table, token, self.page_size)?;
        let rows = output
            .items
            .iter()
            .map(|(key, item)| Row::new(key.clone(), to_record(item)))
            .filter(|row| filter.matches(&row.record))
            .collect();
        Ok(Page::new(rows, output.last_evaluated_key))
    }
}

impl ProviderBackend for AwsBackend {
    fn provider(&self) -> ProviderId {
        ProviderId::Aws
    }

    fn describe(&self) -> String {
        format!("aws(s3://{})", self.bucket)
    }
}

impl From<AwsServiceError> for NativeError {
    fn from(err: AwsServiceError) -> Self {
        NativeError::new(err)
    }
}
