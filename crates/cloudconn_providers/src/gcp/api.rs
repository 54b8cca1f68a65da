//! The slice of the Cloud Storage JSON API and Firestore the backend uses.

use cloudconn_core::VendorError;
use serde_json::{Number, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;
use thiserror::Error;

/// Result type of [`GcpApi`] calls.
pub type GcpResult<T> = Result<T, GcpApiError>;

/// An error returned by a Google Cloud API.
///
/// Cloud Storage reports a JSON API `reason` (`notFound`, `rateLimitExceeded`);
/// Firestore reports a canonical gRPC status name (`NOT_FOUND`, `UNAVAILABLE`).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{status} {reason}: {message}")]
pub struct GcpApiError {
    /// HTTP status.
    pub status: u16,
    /// Error reason or gRPC status name.
    pub reason: String,
    /// API message.
    pub message: String,
}

impl GcpApiError {
    /// Creates an API error.
    pub fn new(status: u16, reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            message: message.into(),
        }
    }
}

impl VendorError for GcpApiError {
    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(&self.reason))
    }

    fn status(&self) -> Option<u16> {
        Some(self.status)
    }
}

/// Cloud Storage object resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcsObject {
    /// Object name.
    pub name: String,
    /// Object size in bytes.
    pub size: u64,
}

/// Response of `objects.list`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectList {
    /// Objects in name order.
    pub items: Vec<GcsObject>,
    /// Token for the next page.
    pub next_page_token: Option<String>,
}

/// A Firestore field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FirestoreValue {
    /// Null.
    Null,
    /// Boolean.
    Boolean(bool),
    /// 64-bit integer.
    Integer(i64),
    /// Double.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Array.
    Array(Vec<FirestoreValue>),
    /// Map.
    Map(BTreeMap<String, FirestoreValue>),
}

/// Document fields.
pub type Fields = BTreeMap<String, FirestoreValue>;

/// A Firestore document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document id within its collection.
    pub id: String,
    /// Document fields.
    pub fields: Fields,
}

/// One page of `runQuery` results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    /// Documents in id order.
    pub documents: Vec<Document>,
    /// Id to start after for the next page.
    pub next_start_after: Option<String>,
}

/// Converts a JSON value the way the Firestore client encodes it.
///
/// Integers outside the signed 64-bit range have no Firestore encoding and
/// are rejected with `INVALID_ARGUMENT` rather than rounded to a double.
impl TryFrom<&Value> for FirestoreValue {
    type Error = GcpApiError;

    fn try_from(value: &Value) -> GcpResult<Self> {
        Ok(match value {
            Value::Null => FirestoreValue::Null,
            Value::Bool(b) => FirestoreValue::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FirestoreValue::Integer(i),
                None if n.is_f64() => FirestoreValue::Double(n.as_f64().unwrap_or(f64::NAN)),
                None => {
                    return Err(GcpApiError::new(
                        400,
                        "INVALID_ARGUMENT",
                        format!("integer value {n} is outside the 64-bit signed range"),
                    ))
                }
            },
            Value::String(s) => FirestoreValue::String(s.clone()),
            Value::Array(items) => FirestoreValue::Array(
                items
                    .iter()
                    .map(FirestoreValue::try_from)
                    .collect::<GcpResult<_>>()?,
            ),
            Value::Object(map) => FirestoreValue::Map(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), FirestoreValue::try_from(v)?)))
                    .collect::<GcpResult<_>>()?,
            ),
        })
    }
}

impl From<&FirestoreValue> for Value {
    fn from(value: &FirestoreValue) -> Self {
        match value {
            FirestoreValue::Null => Value::Null,
            FirestoreValue::Boolean(b) => Value::Bool(*b),
            FirestoreValue::Integer(i) => Value::Number((*i).into()),
            FirestoreValue::Double(d) => Number::from_f64(*d).map_or(Value::Null, Value::Number),
            FirestoreValue::String(s) => Value::String(s.clone()),
            FirestoreValue::Array(items) => Value::Array(items.iter().map(Into::into).collect()),
            FirestoreValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Google Cloud client calls used by [`GcpBackend`](super::GcpBackend).
pub trait GcpApi: Send + Sync {
    /// `objects.insert`.
    fn insert_object(&self, bucket: &str, name: &str, data: &[u8]) -> GcpResult<()>;

    /// `objects.get?alt=media`.
    fn download_object(&self, bucket: &str, name: &str) -> GcpResult<Vec<u8>>;

    /// `objects.get`.
    fn object_metadata(&self, bucket: &str, name: &str) -> GcpResult<GcsObject>;

    /// `objects.delete`. A missing object is `notFound`.
    fn delete_object(&self, bucket: &str, name: &str) -> GcpResult<()>;

    /// `objects.rewrite` within one bucket.
    fn rewrite_object(&self, bucket: &str, source: &str, destination: &str) -> GcpResult<()>;

    /// `objects.list`.
    fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        page_token: Option<&str>,
        max_results: usize,
    ) -> GcpResult<ObjectList>;

    /// `GetDocument`. A missing document is `NOT_FOUND`.
    fn get_document(&self, collection: &str, id: &str) -> GcpResult<Document>;

    /// `CommitDocument` with an update write.
    fn set_document(&self, collection: &str, id: &str, fields: Fields) -> GcpResult<()>;

    /// `DeleteDocument`. With `must_exist`, a missing document is `NOT_FOUND`.
    fn delete_document(&self, collection: &str, id: &str, must_exist: bool) -> GcpResult<()>;

    /// `RunQuery` over a whole collection, ordered by document id.
    fn run_query(
        &self,
        collection: &str,
        start_after: Option<&str>,
        limit: usize,
    ) -> GcpResult<QueryPage>;
}
