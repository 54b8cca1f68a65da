//! The slice of the AWS object-store and key/value-table APIs the backend uses.
//!
//! [`AwsApi`] mirrors the SDK calls one to one so that a real SDK client can
//! be adapted to it without reshaping requests. Errors are the service's own
//! [`AwsServiceError`]s, untranslated.

use cloudconn_core::VendorError;
use serde_json::{Number, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;
use thiserror::Error;

/// Result type of [`AwsApi`] calls.
pub type AwsResult<T> = Result<T, AwsServiceError>;

/// An error returned by an AWS service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{code} ({status}): {message}")]
pub struct AwsServiceError {
    /// Service error code (`NoSuchKey`, `ThrottlingException`, ...).
    pub code: String,
    /// HTTP status of the response.
    pub status: u16,
    /// Service message.
    pub message: String,
}

impl AwsServiceError {
    /// Creates a service error.
    pub fn new(code: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            status,
            message: message.into(),
        }
    }
}

impl VendorError for AwsServiceError {
    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(&self.code))
    }

    fn status(&self) -> Option<u16> {
        Some(self.status)
    }
}

/// Response of `HeadObject`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadObjectOutput {
    /// Object size in bytes.
    pub content_length: u64,
}

/// One entry of a `ListObjectsV2` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Object {
    /// Object key.
    pub key: String,
    /// Object size in bytes.
    pub size: u64,
}

/// Response of `ListObjectsV2`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectsV2Output {
    /// Objects in key order.
    pub contents: Vec<S3Object>,
    /// Token for the next page, if truncated.
    pub next_continuation_token: Option<String>,
}

/// A typed attribute of a table item.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// String.
    S(String),
    /// Number, in its decimal string form.
    N(String),
    /// Boolean.
    Bool(bool),
    /// Null.
    Null,
    /// List.
    L(Vec<AttributeValue>),
    /// Map.
    M(BTreeMap<String, AttributeValue>),
}

/// A table item: attribute name to value.
pub type Item = BTreeMap<String, AttributeValue>;

impl From<&Value> for AttributeValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => AttributeValue::Null,
            Value::Bool(b) => AttributeValue::Bool(*b),
            Value::Number(n) => AttributeValue::N(n.to_string()),
            Value::String(s) => AttributeValue::S(s.clone()),
            Value::Array(items) => AttributeValue::L(items.iter().map(Into::into).collect()),
            Value::Object(map) => AttributeValue::M(
                map.iter()
                    .map(|(k, v)| (k.clone(), AttributeValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&AttributeValue> for Value {
    fn from(attr: &AttributeValue) -> Self {
        match attr {
            AttributeValue::Null => Value::Null,
            AttributeValue::Bool(b) => Value::Bool(*b),
            AttributeValue::S(s) => Value::String(s.clone()),
            AttributeValue::N(n) => parse_number(n).map_or(Value::Null, Value::Number),
            AttributeValue::L(items) => Value::Array(items.iter().map(Into::into).collect()),
            AttributeValue::M(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

fn parse_number(n: &str) -> Option<Number> {
    if let Ok(i) = n.parse::<i64>() {
        return Some(i.into());
    }
    if let Ok(u) = n.parse::<u64>() {
        return Some(u.into());
    }
    n.parse::<f64>().ok().and_then(Number::from_f64)
}

/// Response of `Scan`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutput {
    /// Items with their partition keys, in key order.
    pub items: Vec<(String, Item)>,
    /// Key to resume after, if the scan stopped early.
    pub last_evaluated_key: Option<String>,
}

/// AWS client calls used by [`AwsBackend`](super::AwsBackend).
///
/// Object calls take a bucket; item calls take a table and the value of
/// its single string partition key.
pub trait AwsApi: Send + Sync {
    /// `PutObject`.
    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> AwsResult<()>;

    /// `GetObject`.
    fn get_object(&self, bucket: &str, key: &str) -> AwsResult<Vec<u8>>;

    /// `HeadObject`.
    fn head_object(&self, bucket: &str, key: &str) -> AwsResult<HeadObjectOutput>;

    /// `DeleteObject`. Succeeds for missing keys, like the service.
    fn delete_object(&self, bucket: &str, key: &str) -> AwsResult<()>;

    /// `CopyObject` within one bucket.
    fn copy_object(&self, bucket: &str, source_key: &str, destination_key: &str) -> AwsResult<()>;

    /// `ListObjectsV2`.
    fn list_objects_v2(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
        max_keys: usize,
    ) -> AwsResult<ListObjectsV2Output>;

    /// `GetItem`. A missing item is `Ok(None)`, like the service.
    fn get_item(&self, table: &str, key: &str) -> AwsResult<Option<Item>>;

    /// `PutItem`.
    fn put_item(&self, table: &str, key: &str, item: Item) -> AwsResult<()>;

    /// `DeleteItem`. Succeeds for missing items, like the service.
    fn delete_item(&self, table: &str, key: &str) -> AwsResult<()>;

    /// `Scan`, resuming after `exclusive_start_key`.
    fn scan(
        &self,
        table: &str,
        exclusive_start_key: Option<&str>,
        limit: usize,
    ) -> AwsResult<ScanOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudconn_core::NativeError;
    use serde_json::json;

    #[test]
    fn service_errors_expose_code_and_status() {
        let native = NativeError::new(AwsServiceError::new("SlowDown", 503, "reduce rate"));
        assert_eq!(native.code(), Some("SlowDown"));
        assert_eq!(native.status(), Some(503));
        assert!(native.to_string().contains("reduce rate"));
    }

    #[test]
    fn json_values_convert_to_attributes_and_back() {
        let value = json!({
            "name": "ada",
            "age": 36,
            "score": 9.5,
            "big": u64::MAX,
            "tags": ["a", null, true],
            "nested": {"k": -1}
        });
        let attr = AttributeValue::from(&value);
        assert!(matches!(&attr, AttributeValue::M(map) if map["age"] == AttributeValue::N("36".into())));
        assert_eq!(Value::from(&attr), value);
    }

    #[test]
    fn malformed_numbers_become_null() {
        assert_eq!(Value::from(&AttributeValue::N("NaN".into())), Value::Null);
    }
}
