//! In-process stand-in for the AWS services.

use super::api::{
    AwsApi, AwsResult, AwsServiceError, HeadObjectOutput, Item, ListObjectsV2Output, S3Object,
    ScanOutput,
};
use crate::faults::FaultPlan;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

/// A simulated AWS account with buckets, tables and fault injection.
///
/// Behaves like the services where the backend depends on it: deletes of
/// missing objects and items succeed silently, missing items read as
/// `None`, listings are in key order. Tables exist on first use.
///
/// # Example
///
/// ```rust
/// use cloudconn_providers::aws::{AwsApi, AwsServiceError, SimulatedAws};
///
/// let aws = SimulatedAws::with_bucket("data");
/// aws.faults().fail_next("get_object", AwsServiceError::new("SlowDown", 503, "slow down"));
/// assert!(aws.get_object("data", "k").is_err());
/// ```
#[derive(Debug, Default)]
pub struct SimulatedAws {
    buckets: RwLock<HashMap<String, BTreeMap<String, Vec<u8>>>>,
    tables: RwLock<HashMap<String, BTreeMap<String, Item>>>,
    faults: FaultPlan<AwsServiceError>,
}

impl SimulatedAws {
    /// Creates an account with no buckets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an account holding one empty bucket.
    #[must_use]
    pub fn with_bucket(bucket: &str) -> Self {
        let aws = Self::new();
        aws.create_bucket(bucket);
        aws
    }

    /// Creates an empty bucket, keeping an existing one untouched.
    pub fn create_bucket(&self, bucket: &str) {
        self.buckets.write().entry(bucket.to_string()).or_default();
    }

    /// The fault plan; call names are the snake_case API method names.
    #[must_use]
    pub fn faults(&self) -> &FaultPlan<AwsServiceError> {
        &self.faults
    }

    fn no_such_bucket(bucket: &str) -> AwsServiceError {
        AwsServiceError::new(
            "NoSuchBucket",
            404,
            format!("The specified bucket does not exist: {bucket}"),
        )
    }

    fn no_such_key(key: &str) -> AwsServiceError {
        AwsServiceError::new(
            "NoSuchKey",
            404,
            format!("The specified key does not exist: {key}"),
        )
    }

    fn with_bucket_mut<T>(
        &self,
        bucket: &str,
        f: impl FnOnce(&mut BTreeMap<String, Vec<u8>>) -> AwsResult<T>,
    ) -> AwsResult<T> {
        let mut buckets = self.buckets.write();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| Self::no_such_bucket(bucket))?;
        f(objects)
    }

    fn with_bucket_ref<T>(
        &self,
        bucket: &str,
        f: impl FnOnce(&BTreeMap<String, Vec<u8>>) -> AwsResult<T>,
    ) -> AwsResult<T> {
        let buckets = self.buckets.read();
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| Self::no_such_bucket(bucket))?;
        f(objects)
    }
}

impl AwsApi for SimulatedAws {
    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> AwsResult<()> {
        self.faults.check("put_object")?;
        self.with_bucket_mut(bucket, |objects| {
            objects.insert(key.to_string(), body.to_vec());
            Ok(())
        })
    }

    fn get_object(&self, bucket: &str, key: &str) -> AwsResult<Vec<u8>> {
        self.faults.check("get_object")?;
        self.with_bucket_ref(bucket, |objects| {
            objects.get(key).cloned().ok_or_else(|| Self::no_such_key(key))
        })
    }

    fn head_object(&self, bucket: &str, key: &str) -> AwsResult<HeadObjectOutput> {
        self.faults.check("head_object")?;
        self.with_bucket_ref(bucket, |objects| {
            objects
                .get(key)
                .map(|body| HeadObjectOutput {
                    content_length: body.len() as u64,
                })
                // HEAD responses carry no body, hence no specific code
                .ok_or_else(|| AwsServiceError::new("NotFound", 404, "Not Found"))
        })
    }

    fn delete_object(&self, bucket: &str, key: &str) -> AwsResult<()> {
        self.faults.check("delete_object")?;
        self.with_bucket_mut(bucket, |objects| {
            objects.remove(key);
            Ok(())
        })
    }

    fn copy_object(&self, bucket: &str, source_key: &str, destination_key: &str) -> AwsResult<()> {
        self.faults.check("copy_object")?;
        self.with_bucket_mut(bucket, |objects| {
            let body = objects
                .get(source_key)
                .cloned()
                .ok_or_else(|| Self::no_such_key(source_key))?;
            objects.insert(destination_key.to_string(), body);
            Ok(())
        })
    }

    fn list_objects_v2(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
        max_keys: usize,
    ) -> AwsResult<ListObjectsV2Output> {
        self.faults.check("list_objects_v2")?;
        self.with_bucket_ref(bucket, |objects| {
            let start = continuation_token.map_or(Bound::Unbounded, |t| Bound::Excluded(t.to_string()));
            let mut matching = objects
                .range((start, Bound::Unbounded))
                .filter(|(key, _)| key.starts_with(prefix));
            let contents: Vec<S3Object> = matching
                .by_ref()
                .take(max_keys.max(1))
                .map(|(key, body)| S3Object {
                    key: key.clone(),
                    size: body.len() as u64,
                })
                .collect();
            let truncated = matching.next().is_some();
            let next_continuation_token = if truncated {
                contents.last().map(|object| object.key.clone())
            } else {
                None
            };
            Ok(ListObjectsV2Output {
                contents,
                next_continuation_token,
            })
        })
    }

    fn get_item(&self, table: &str, key: &str) -> AwsResult<Option<Item>> {
        self.faults.check("get_item")?;
        Ok(self
            .tables
            .read()
            .get(table)
            .and_then(|items| items.get(key).cloned()))
    }

    fn put_item(&self, table: &str, key: &str, item: Item) -> AwsResult<()> {
        self.faults.check("put_item")?;
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string(), item);
        Ok(())
    }

    fn delete_item(&self, table: &str, key: &str) -> AwsResult<()> {
        self.faults.check("delete_item")?;
        if let Some(items) = self.tables.write().get_mut(table) {
            items.remove(key);
        }
        Ok(())
    }

    fn scan(
        &self,
        table: &str,
        exclusive_start_key: Option<&str>,
        limit: usize,
    ) -> AwsResult<ScanOutput> {
        self.faults.check("scan")?;
        let tables = self.tables.read();
        let Some(items) = tables.get(table) else {
            return Ok(ScanOutput::default());
        };
        let start = exclusive_start_key.map_or(Bound::Unbounded, |k| Bound::Excluded(k.to_string()));
        let mut remaining = items.range((start, Bound::Unbounded));
        let page: Vec<(String, Item)> = remaining
            .by_ref()
            .take(limit.max(1))
            .map(|(key, item)| (key.clone(), item.clone()))
            .collect();
        let last_evaluated_key = if remaining.next().is_some() {
            page.last().map(|(key, _)| key.clone())
        } else {
            None
        };
        Ok(ScanOutput {
            items: page,
            last_evaluated_key,
        })
    }
}
