//! In-process stand-in for Cloud Storage and Firestore.

use super::api::{
    Document, Fields, GcpApi, GcpApiError, GcpResult, GcsObject, ObjectList, QueryPage,
};
use crate::faults::FaultPlan;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

type Bucket = BTreeMap<String, Vec<u8>>;
type Collection = BTreeMap<String, Fields>;

/// A simulated Google Cloud project with buckets, collections and fault
/// injection. Collections exist on first use.
#[derive(Debug, Default)]
pub struct SimulatedGcp {
    buckets: RwLock<HashMap<String, Bucket>>,
    collections: RwLock<HashMap<String, Collection>>,
    faults: FaultPlan<GcpApiError>,
}

fn bucket_not_found(bucket: &str) -> GcpApiError {
    GcpApiError::new(404, "notFound", format!("The specified bucket does not exist: {bucket}"))
}

fn object_not_found(name: &str) -> GcpApiError {
    GcpApiError::new(404, "notFound", format!("No such object: {name}"))
}

fn document_not_found(collection: &str, id: &str) -> GcpApiError {
    GcpApiError::new(404, "NOT_FOUND", format!("Document {collection}/{id} not found"))
}

impl SimulatedGcp {
    /// Creates a project with no buckets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a project holding one empty bucket.
    #[must_use]
    pub fn with_bucket(bucket: &str) -> Self {
        let gcp = Self::new();
        gcp.create_bucket(bucket);
        gcp
    }

    /// Creates an empty bucket, keeping an existing one untouched.
    pub fn create_bucket(&self, bucket: &str) {
        self.buckets.write().entry(bucket.to_string()).or_default();
    }

    /// The fault plan; call names are the snake_case API method names.
    #[must_use]
    pub fn faults(&self) -> &FaultPlan<GcpApiError> {
        &self.faults
    }

    fn read_bucket<T>(&self, bucket: &str, f: impl FnOnce(&Bucket) -> GcpResult<T>) -> GcpResult<T> {
        let buckets = self.buckets.read();
        f(buckets.get(bucket).ok_or_else(|| bucket_not_found(bucket))?)
    }

    fn write_bucket<T>(
        &self,
        bucket: &str,
        f: impl FnOnce(&mut Bucket) -> GcpResult<T>,
    ) -> GcpResult<T> {
        let mut buckets = self.buckets.write();
        f(buckets
            .get_mut(bucket)
            .ok_or_else(|| bucket_not_found(bucket))?)
    }
}

impl GcpApi for SimulatedGcp {
    fn insert_object(&self, bucket: &str, name: &str, data: &[u8]) -> GcpResult<()> {
        self.faults.check("insert_object")?;
        self.write_bucket(bucket, |objects| {
            objects.insert(name.to_string(), data.to_vec());
            Ok(())
        })
    }

    fn download_object(&self, bucket: &str, name: &str) -> GcpResult<Vec<u8>> {
        self.faults.check("download_object")?;
        self.read_bucket(bucket, |objects| {
            objects.get(name).cloned().ok_or_else(|| object_not_found(name))
        })
    }

    fn object_metadata(&self, bucket: &str, name: &str) -> GcpResult<GcsObject> {
        self.faults.check("object_metadata")?;
        self.read_bucket(bucket, |objects| {
            objects
                .get(name)
                .map(|data| GcsObject {
                    name: name.to_string(),
                    size: data.len() as u64,
                })
                .ok_or_else(|| object_not_found(name))
        })
    }

    fn delete_object(&self, bucket: &str, name: &str) -> GcpResult<()> {
        self.faults.check("delete_object")?;
        self.write_bucket(bucket, |objects| {
            objects
                .remove(name)
                .map(drop)
                .ok_or_else(|| object_not_found(name))
        })
    }

    fn rewrite_object(&self, bucket: &str, source: &str, destination: &str) -> GcpResult<()> {
        self.faults.check("rewrite_object")?;
        self.write_bucket(bucket, |objects| {
            let data = objects
                .get(source)
                .cloned()
                .ok_or_else(|| object_not_found(source))?;
            objects.insert(destination.to_string(), data);
            Ok(())
        })
    }

    fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        page_token: Option<&str>,
        max_results: usize,
    ) -> GcpResult<ObjectList> {
        self.faults.check("list_objects")?;
        self.read_bucket(bucket, |objects| {
            let start = page_token.map_or(Bound::Unbounded, |t| Bound::Excluded(t.to_string()));
            let mut matching = objects
                .range((start, Bound::Unbounded))
                .filter(|(name, _)| name.starts_with(prefix));
            let items: Vec<GcsObject> = matching
                .by_ref()
                .take(max_results.max(1))
                .map(|(name, data)| GcsObject {
                    name: name.clone(),
                    size: data.len() as u64,
                })
                .collect();
            let next_page_token = match matching.next() {
                Some(_) => items.last().map(|object| object.name.clone()),
                None => None,
            };
            Ok(ObjectList {
                items,
                next_page_token,
            })
        })
    }

    fn get_document(&self, collection: &str, id: &str) -> GcpResult<Document> {
        self.faults.check("get_document")?;
        self.collections
            .read()
            .get(collection)
            .and_then(|documents| documents.get(id))
            .map(|fields| Document {
                id: id.to_string(),
                fields: fields.clone(),
            })
            .ok_or_else(|| document_not_found(collection, id))
    }

    fn set_document(&self, collection: &str, id: &str, fields: Fields) -> GcpResult<()> {
        self.faults.check("set_document")?;
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        Ok(())
    }

    fn delete_document(&self, collection: &str, id: &str, must_exist: bool) -> GcpResult<()> {
        self.faults.check("delete_document")?;
        let removed = self
            .collections
            .write()
            .get_mut(collection)
            .and_then(|documents| documents.remove(id));
        if removed.is_none() && must_exist {
            return Err(document_not_found(collection, id));
        }
        Ok(())
    }

    fn run_query(
        &self,
        collection: &str,
        start_after: Option<&str>,
        limit: usize,
    ) -> GcpResult<QueryPage> {
        self.faults.check("run_query")?;
        let collections = self.collections.read();
        let Some(documents) = collections.get(collection) else {
            return Ok(QueryPage::default());
        };
        let start = start_after.map_or(Bound::Unbounded, |id| Bound::Excluded(id.to_string()));
        let mut remaining = documents.range((start, Bound::Unbounded));
        let page: Vec<Document> = remaining
            .by_ref()
            .take(limit.max(1))
            .map(|(id, fields)| Document {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect();
        let next_start_after = match remaining.next() {
            Some(_) => page.last().map(|doc| doc.id.clone()),
            None => None,
        };
        Ok(QueryPage {
            documents: page,
            next_start_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcp::FirestoreValue;

    #[test]
    fn delete_of_missing_object_is_not_found() {
        let gcp = SimulatedGcp::with_bucket("b");
        let err = gcp.delete_object("b", "ghost").unwrap_err();
        assert_eq!(err.reason, "notFound");
        assert_eq!(err.status, 404);
    }

    #[test]
    fn unknown_bucket_is_not_found() {
        let gcp = SimulatedGcp::new();
        assert_eq!(gcp.insert_object("b", "k", b"").unwrap_err().status, 404);
    }

    #[test]
    fn rewrite_copies_data() {
        let gcp = SimulatedGcp::with_bucket("b");
        gcp.insert_object("b", "a", b"1").unwrap();
        gcp.rewrite_object("b", "a", "c").unwrap();
        assert_eq!(gcp.download_object("b", "c").unwrap(), b"1");
        assert_eq!(gcp.object_metadata("b", "c").unwrap().size, 1);
    }

    #[test]
    fn documents_and_queries() {
        let gcp = SimulatedGcp::new();
        assert!(gcp.run_query("users", None, 5).unwrap().documents.is_empty());

        let fields: Fields = [("a".to_string(), FirestoreValue::Integer(1))].into();
        for id in ["3", "1", "2"] {
            gcp.set_document("users", id, fields.clone()).unwrap();
        }
        let page = gcp.run_query("users", None, 2).unwrap();
        let ids: Vec<_> = page.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        let page = gcp.run_query("users", page.next_start_after.as_deref(), 2).unwrap();
        assert_eq!(page.documents.len(), 1);
        assert!(page.next_start_after.is_none());

        assert!(gcp.delete_document("users", "9", false).is_ok());
        assert_eq!(
            gcp.delete_document("users", "9", true).unwrap_err().reason,
            "NOT_FOUND"
        );
    }
}
