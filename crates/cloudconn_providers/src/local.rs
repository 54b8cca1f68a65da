//! Local filesystem backend.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/objects/<name>.obj                 object bytes
//! <root>/tables/<table>/<name>.json         one JSON document per record
//! <root>/staging/                           temporary files, renamed into place
//! ```
//!
//! `<name>` is the hex encoding of the key, so distinct keys never share a
//! file and `/` has no meaning on disk. Encodings longer than
//! [`CHUNK_LEN`] digits are split into nested `<chunk>.d` directories,
//! keeping every path component within filesystem name limits.
//!
//! Writes go through a temporary file that is renamed into place, so readers
//! never observe a partially written object or record. Native errors are the
//! plain `std::io::Error`s of the failing call.

use cloudconn_core::{
    DatabaseCapability, Filter, NativeResult, ObjectMeta, Page, ProviderBackend, ProviderId,
    Record, Row, StorageCapability,
};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Default number of entries returned per page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Hex digits per path component of an encoded key.
pub const CHUNK_LEN: usize = 128;

const OBJECTS_DIR: &str = "objects";
const TABLES_DIR: &str = "tables";
const STAGING_DIR: &str = "staging";

const CHUNK_SUFFIX: &str = ".d";
const OBJECT_SUFFIX: &str = ".obj";
const RECORD_SUFFIX: &str = ".json";

/// Backend storing objects and records under a local directory.
///
/// # Example
///
/// ```rust
/// use cloudconn_core::StorageCapability;
/// use cloudconn_providers::local::LocalBackend;
///
/// let dir = tempfile::tempdir().unwrap();
/// let backend = LocalBackend::open(dir.path()).unwrap();
/// backend.put("docs/readme.txt", b"hello").unwrap();
/// assert_eq!(backend.get("docs/readme.txt").unwrap(), b"hello");
/// ```
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
    page_size: usize,
}

impl LocalBackend {
    /// Opens a backend rooted at `root`, creating the directory layout.
    pub fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        for dir in [OBJECTS_DIR, TABLES_DIR, STAGING_DIR] {
            fs::create_dir_all(root.join(dir))?;
        }
        Ok(Self {
            root,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Sets how many entries a page holds.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn objects(&self) -> PathBuf {
        self.root.join(OBJECTS_DIR)
    }

    fn object_path(&self, key: &str) -> PathBuf {
        encoded_path(&self.objects(), key, OBJECT_SUFFIX)
    }

    fn table_dir(&self, table: &str) -> PathBuf {
        self.root.join(TABLES_DIR).join(table)
    }

    fn record_path(&self, table: &str, key: &str) -> PathBuf {
        encoded_path(&self.table_dir(table), key, RECORD_SUFFIX)
    }

    fn write_atomically(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut staged = NamedTempFile::new_in(self.root.join(STAGING_DIR))?;
        staged.write_all(data)?;
        staged.as_file().sync_all()?;
        staged.persist(path).map_err(|err| err.error)?;
        Ok(())
    }

    fn read_record(path: &Path) -> io::Result<Record> {
        let data = fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }
}

/// Removes `path`, then the chunk directories it leaves empty up to `base`.
fn remove_encoded(base: &Path, path: &Path) -> io::Result<()> {
    fs::remove_file(path)?;
    let mut dir = path.parent();
    while let Some(current) = dir {
        if current == base || fs::remove_dir(current).is_err() {
            break;
        }
        dir = current.parent();
    }
    Ok(())
}

fn encode_key(key: &str) -> String {
    key.bytes().map(|b| format!("{b:02x}")).collect()
}

fn decode_key(hex: &str) -> Option<String> {
    if hex.len() % 2 != 0 {
        return None;
    }
    let bytes = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect::<Option<Vec<u8>>>()?;
    String::from_utf8(bytes).ok()
}

fn encoded_path(base: &Path, key: &str, suffix: &str) -> PathBuf {
    let hex = encode_key(key);
    let mut path = base.to_path_buf();
    let mut rest = hex.as_str();
    while rest.len() > CHUNK_LEN {
        let (chunk, tail) = rest.split_at(CHUNK_LEN);
        path.push(format!("{chunk}{CHUNK_SUFFIX}"));
        rest = tail;
    }
    path.push(format!("{rest}{suffix}"));
    path
}

/// Collects `(key, size)` of every entry ending in `suffix` below `dir`
/// whose encoded key starts with `wanted`.
fn collect_encoded(
    dir: &Path,
    encoded: &str,
    wanted: &str,
    suffix: &str,
    out: &mut Vec<(String, u64)>,
) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(chunk) = name.strip_suffix(CHUNK_SUFFIX) {
            let encoded = format!("{encoded}{chunk}");
            if encoded.starts_with(wanted) || wanted.starts_with(&encoded) {
                collect_encoded(&entry.path(), &encoded, wanted, suffix, out)?;
            }
        } else if let Some(chunk) = name.strip_suffix(suffix) {
            let encoded = format!("{encoded}{chunk}");
            if !encoded.starts_with(wanted) {
                continue;
            }
            if let Some(key) = decode_key(&encoded) {
                out.push((key, entry.metadata()?.len()));
            }
        }
    }
    Ok(())
}

/// Slices one page out of sorted `items`, resuming after `token`.
fn paginate<T>(
    items: Vec<T>,
    key: impl Fn(&T) -> &str,
    token: Option<&str>,
    page_size: usize,
) -> (Vec<T>, Option<String>) {
    let mut rest = items
        .into_iter()
        .skip_while(|item| token.is_some_and(|t| key(item) <= t))
        .peekable();
    let page: Vec<T> = rest.by_ref().take(page_size).collect();
    let next = match rest.peek() {
        Some(_) => page.last().map(|item| key(item).to_string()),
        None => None,
    };
    (page, next)
}

impl StorageCapability for LocalBackend {
    fn put(&self, key: &str, data: &[u8]) -> NativeResult<()> {
        Ok(self.write_atomically(&self.object_path(key), data)?)
    }

    fn get(&self, key: &str) -> NativeResult<Vec<u8>> {
        Ok(fs::read(self.object_path(key))?)
    }

    fn head(&self, key: &str) -> NativeResult<ObjectMeta> {
        let metadata = fs::metadata(self.object_path(key))?;
        Ok(ObjectMeta::new(key, metadata.len()))
    }

    fn delete(&self, key: &str) -> NativeResult<()> {
        Ok(remove_encoded(&self.objects(), &self.object_path(key))?)
    }

    fn copy(&self, source: &str, destination: &str) -> NativeResult<()> {
        let data = fs::read(self.object_path(source))?;
        Ok(self.write_atomically(&self.object_path(destination), &data)?)
    }

    fn list_page(&self, prefix: &str, token: Option<&str>) -> NativeResult<Page<ObjectMeta>> {
        let mut keys = Vec::new();
        collect_encoded(&self.objects(), "", &encode_key(prefix), OBJECT_SUFFIX, &mut keys)?;
        keys.sort();
        let (page, next) = paginate(keys, |(key, _)| key.as_str(), token, self.page_size);
        let items = page
            .into_iter()
            .map(|(key, size)| ObjectMeta::new(key, size))
            .collect();
        Ok(Page::new(items, next))
    }
}

impl DatabaseCapability for LocalBackend {
    fn read(&self, table: &str, key: &str) -> NativeResult<Record> {
        Ok(Self::read_record(&self.record_path(table, key))?)
    }

    fn write(&self, table: &str, key: &str, record: &Record) -> NativeResult<()> {
        let data = serde_json::to_vec(record).map_err(io::Error::from)?;
        Ok(self.write_atomically(&self.record_path(table, key), &data)?)
    }

    fn remove(&self, table: &str, key: &str) -> NativeResult<()> {
        Ok(remove_encoded(&self.table_dir(table), &self.record_path(table, key))?)
    }

    fn query_page(
        &self,
        table: &str,
        filter: &Filter,
        token: Option<&str>,
    ) -> NativeResult<Page<Row>> {
        let mut entries = Vec::new();
        match collect_encoded(&self.table_dir(table), "", "", RECORD_SUFFIX, &mut entries) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Page::empty()),
            Err(err) => return Err(err.into()),
        }
        let mut keys: Vec<String> = entries.into_iter().map(|(key, _)| key).collect();
        keys.sort();
        let (page, next) = paginate(keys, String::as_str, token, self.page_size);
        let mut rows = Vec::new();
        for key in page {
            let record = Self::read_record(&self.record_path(table, &key))?;
            if filter.matches(&record) {
                rows.push(Row::new(key, record));
            }
        }
        Ok(Page::new(rows, next))
    }
}

impl ProviderBackend for LocalBackend {
    fn provider(&self) -> ProviderId {
        ProviderId::Local
    }

    fn describe(&self) -> String {
        format!("local({})", self.root.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn backend() -> (TempDir, LocalBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::open(dir.path()).unwrap().with_page_size(2);
        (dir, backend)
    }

    #[test]
    fn key_encoding_round_trips() {
        for key in ["", "a", "user/42", "a//b", "ünïcode", "with space"] {
            assert_eq!(decode_key(&encode_key(key)).as_deref(), Some(key));
        }
        assert!(decode_key("zz").is_none());
        assert!(decode_key("abc").is_none());
    }

    #[test]
    fn long_keys_split_into_bounded_components() {
        let base = Path::new("/base");
        assert_eq!(encoded_path(base, "ab", ".obj"), base.join("6162.obj"));

        let key = "k".repeat(1024);
        let path = encoded_path(base, &key, ".obj");
        let components: Vec<_> = path.strip_prefix(base).unwrap().iter().collect();
        assert_eq!(components.len(), 2048 / CHUNK_LEN);
        assert!(components.iter().all(|c| c.len() <= CHUNK_LEN + OBJECT_SUFFIX.len()));
    }

    #[test]
    fn objects_round_trip_and_nest() {
        let (_dir, backend) = backend();
        backend.put("a/b/c.txt", b"deep").unwrap();
        assert_eq!(backend.get("a/b/c.txt").unwrap(), b"deep");
        assert_eq!(backend.head("a/b/c.txt").unwrap().size, 4);
        assert_eq!(backend.head("a/b").unwrap_err().code(), Some("NotFound"));
    }

    #[test]
    fn missing_objects_are_io_not_found() {
        let (_dir, backend) = backend();
        assert_eq!(backend.get("nope").unwrap_err().code(), Some("NotFound"));
        assert_eq!(backend.delete("nope").unwrap_err().code(), Some("NotFound"));
        assert_eq!(backend.copy("nope", "x").unwrap_err().code(), Some("NotFound"));
    }

    #[test]
    fn key_prefixes_of_stored_keys_are_not_found() {
        let (_dir, backend) = backend();
        backend.put("a/b", b"child").unwrap();
        for missing in ["a", "a/"] {
            assert_eq!(backend.get(missing).unwrap_err().code(), Some("NotFound"));
            assert_eq!(backend.delete(missing).unwrap_err().code(), Some("NotFound"));
            assert_eq!(backend.head(missing).unwrap_err().code(), Some("NotFound"));
        }
    }

    #[test]
    fn keys_and_their_children_coexist() {
        let (_dir, backend) = backend();
        backend.put("a", b"parent").unwrap();
        backend.put("a/b", b"child").unwrap();
        backend.put("a//b", b"double").unwrap();

        assert_eq!(backend.get("a").unwrap(), b"parent");
        assert_eq!(backend.get("a/b").unwrap(), b"child");
        assert_eq!(backend.get("a//b").unwrap(), b"double");

        let keys: Vec<_> = backend
            .list_page("a/", None)
            .unwrap()
            .items
            .into_iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(keys, vec!["a//b", "a/b"]);
    }

    #[test]
    fn longest_keys_are_stored() {
        let (_dir, backend) = backend();
        let key = "x/".repeat(511) + "yz";
        assert_eq!(key.len(), 1024);
        backend.put(&key, b"long").unwrap();
        assert_eq!(backend.get(&key).unwrap(), b"long");
        assert_eq!(backend.list_page("x/", None).unwrap().items[0].key, key);

        let record = Record::new().with("n", 1);
        backend.write("t", &key, &record).unwrap();
        assert_eq!(backend.read("t", &key).unwrap(), record);
        let rows = backend.query_page("t", &Filter::all(), None).unwrap();
        assert_eq!(rows.items, vec![Row::new(key.clone(), record)]);
    }

    #[test]
    fn delete_prunes_empty_chunk_directories() {
        let (dir, backend) = backend();
        let key = "z".repeat(200);
        backend.put(&key, b"1").unwrap();
        backend.delete(&key).unwrap();
        assert_eq!(fs::read_dir(dir.path().join("objects")).unwrap().count(), 0);
        assert!(dir.path().join("objects").exists());
    }

    #[test]
    fn listing_is_sorted_and_paged() {
        let (_dir, backend) = backend();
        for key in ["b/2", "a", "b/1", "c"] {
            backend.put(key, key.as_bytes()).unwrap();
        }
        let first = backend.list_page("", None).unwrap();
        let keys: Vec<_> = first.items.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b/1"]);

        let second = backend.list_page("", first.next.as_deref()).unwrap();
        let keys: Vec<_> = second.items.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, vec!["b/2", "c"]);
        assert!(second.next.is_none());

        let only_b = backend.list_page("b/", None).unwrap();
        assert_eq!(only_b.items.len(), 2);
        assert!(only_b.next.is_none());
    }

    #[test]
    fn staging_leaves_no_files_behind() {
        let (dir, backend) = backend();
        backend.put("k", b"v").unwrap();
        backend.write("t", "k", &Record::new().with("a", 1)).unwrap();
        assert_eq!(fs::read_dir(dir.path().join("staging")).unwrap().count(), 0);
    }

    #[test]
    fn records_round_trip_and_remove() {
        let (_dir, backend) = backend();
        let record = Record::new().with("name", "ada");
        backend.write("users", "u/1", &record).unwrap();
        assert_eq!(backend.read("users", "u/1").unwrap(), record);
        backend.remove("users", "u/1").unwrap();
        assert_eq!(backend.remove("users", "u/1").unwrap_err().code(), Some("NotFound"));
    }

    #[test]
    fn missing_table_queries_as_empty() {
        let (_dir, backend) = backend();
        let page = backend.query_page("nothing", &Filter::all(), None).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next.is_none());
    }

    #[test]
    fn corrupt_records_surface_as_invalid_data() {
        let (dir, backend) = backend();
        backend.write("t", "k", &Record::new()).unwrap();
        let path = dir.path().join("tables/t").join(format!("{}.json", encode_key("k")));
        fs::write(path, b"not json").unwrap();
        assert_eq!(backend.read("t", "k").unwrap_err().code(), Some("InvalidData"));
    }

    #[test]
    fn query_pages_by_key() {
        let (_dir, backend) = backend();
        for (key, n) in [("c", 3), ("a", 1), ("b", 2)] {
            backend.write("nums", key, &Record::new().with("n", n)).unwrap();
        }
        let filter = Filter::all();
        let first = backend.query_page("nums", &filter, None).unwrap();
        let keys: Vec<_> = first.items.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        let second = backend.query_page("nums", &filter, first.next.as_deref()).unwrap();
        assert_eq!(second.items[0].key, "c");
    }
}
