//! Structural request validation.
//!
//! Validation is the outermost layer of the pipeline: a rejected request
//! never reaches a backend and is never retried.

use crate::error::{ConnectorError, ConnectorResult};
use crate::types::{CompareOp, Filter, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A facade call, described for validation.
#[derive(Debug, Clone, Copy)]
pub enum Request<'a> {
    /// Store an object.
    Put {
        /// Object key.
        key: &'a str,
        /// Payload size in bytes.
        size: u64,
    },
    /// Read an object.
    Get {
        /// Object key.
        key: &'a str,
    },
    /// Read object metadata.
    Head {
        /// Object key.
        key: &'a str,
    },
    /// Delete an object.
    Delete {
        /// Object key.
        key: &'a str,
    },
    /// Delete several objects.
    DeleteMany {
        /// Object keys.
        keys: &'a [String],
    },
    /// Copy an object.
    Copy {
        /// Source key.
        source: &'a str,
        /// Destination key.
        destination: &'a str,
    },
    /// Move an object.
    Rename {
        /// Source key.
        source: &'a str,
        /// Destination key.
        destination: &'a str,
    },
    /// List objects under a prefix.
    List {
        /// Key prefix, possibly empty.
        prefix: &'a str,
    },
    /// Read a record.
    Read {
        /// Table name.
        table: &'a str,
        /// Record key.
        key: &'a str,
    },
    /// Write a record.
    Write {
        /// Table name.
        table: &'a str,
        /// Record key.
        key: &'a str,
        /// Record fields.
        record: &'a Record,
    },
    /// Remove a record.
    Remove {
        /// Table name.
        table: &'a str,
        /// Record key.
        key: &'a str,
    },
    /// Query a table.
    Query {
        /// Table name.
        table: &'a str,
        /// Query filter.
        filter: &'a Filter,
    },
}

impl Request<'_> {
    /// Operation name used in errors and logs.
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Request::Put { .. } => "put",
            Request::Get { .. } => "get",
            Request::Head { .. } => "head",
            Request::Delete { .. } => "delete",
            Request::DeleteMany { .. } => "delete_many",
            Request::Copy { .. } => "copy",
            Request::Rename { .. } => "rename",
            Request::List { .. } => "list",
            Request::Read { .. } => "read",
            Request::Write { .. } => "write",
            Request::Remove { .. } => "remove",
            Request::Query { .. } => "query",
        }
    }
}

/// Constraints on object keys and prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyRules {
    /// Maximum key length in bytes.
    pub max_len: usize,
    /// Whether keys may start with `/`.
    pub allow_leading_slash: bool,
    /// Whether keys may contain `.` or `..` path segments.
    pub allow_dot_segments: bool,
}

impl Default for KeyRules {
    fn default() -> Self {
        Self {
            max_len: 1024,
            allow_leading_slash: false,
            allow_dot_segments: false,
        }
    }
}

/// Per-operation constraint sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    /// Rules for object keys, record keys and list prefixes.
    pub keys: KeyRules,
    /// Maximum object size in bytes.
    pub max_object_size: u64,
    /// Maximum table name length.
    pub max_table_len: usize,
    /// Maximum number of fields in a record.
    pub max_record_fields: usize,
    /// Maximum number of conditions in a filter.
    pub max_filter_conditions: usize,
    /// Maximum number of keys in one batch delete.
    pub max_batch_keys: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            keys: KeyRules::default(),
            max_object_size: 5 * 1024 * 1024 * 1024, // 5 GiB
            max_table_len: 255,
            max_record_fields: 400,
            max_filter_conditions: 32,
            max_batch_keys: 1000,
        }
    }
}

impl ValidationRules {
    /// Sets the maximum object size.
    #[must_use]
    pub fn with_max_object_size(mut self, size: u64) -> Self {
        self.max_object_size = size;
        self
    }

    /// Sets the maximum key length.
    #[must_use]
    pub fn with_max_key_len(mut self, len: usize) -> Self {
        self.keys.max_len = len;
        self
    }

    /// Sets the maximum number of keys per batch.
    #[must_use]
    pub fn with_max_batch_keys(mut self, count: usize) -> Self {
        self.max_batch_keys = count;
        self
    }

    /// Checks a request, failing fast with `InvalidInput`.
    pub fn check(&self, request: &Request<'_>) -> ConnectorResult<()> {
        self.check_request(request)
            .map_err(|err| err.with_operation(request.operation()))
    }

    fn check_request(&self, request: &Request<'_>) -> ConnectorResult<()> {
        match *request {
            Request::Put { key, size } => {
                self.check_key(key)?;
                if size > self.max_object_size {
                    return Err(ConnectorError::invalid_input(format!(
                        "object of {size} bytes exceeds the {} byte limit",
                        self.max_object_size
                    )));
                }
                Ok(())
            }
            Request::Get { key } | Request::Head { key } | Request::Delete { key } => {
                self.check_key(key)
            }
            Request::DeleteMany { keys } => {
                if keys.len() > self.max_batch_keys {
                    return Err(ConnectorError::invalid_input(format!(
                        "batch of {} keys exceeds the limit of {}",
                        keys.len(),
                        self.max_batch_keys
                    )));
                }
                keys.iter().try_for_each(|key| self.check_key(key))
            }
            Request::Copy {
                source,
                destination,
            }
            | Request::Rename {
                source,
                destination,
            } => {
                self.check_key(source)?;
                self.check_key(destination)?;
                if source == destination {
                    return Err(ConnectorError::invalid_input(format!(
                        "source and destination are the same key '{source}'"
                    )));
                }
                Ok(())
            }
            Request::List { prefix } => {
                if prefix.is_empty() {
                    Ok(())
                } else {
                    self.check_text("prefix", prefix)
                }
            }
            Request::Read { table, key } | Request::Remove { table, key } => {
                self.check_table(table)?;
                self.check_key(key)
            }
            Request::Write { table, key, record } => {
                self.check_table(table)?;
                self.check_key(key)?;
                self.check_record(record)
            }
            Request::Query { table, filter } => {
                self.check_table(table)?;
                self.check_filter(filter)
            }
        }
    }

    fn check_text(&self, what: &str, value: &str) -> ConnectorResult<()> {
        if value.len() > self.keys.max_len {
            return Err(ConnectorError::invalid_input(format!(
                "{what} is {} bytes long, limit is {}",
                value.len(),
                self.keys.max_len
            )));
        }
        if value.chars().any(char::is_control) {
            return Err(ConnectorError::invalid_input(format!(
                "{what} {value:?} contains control characters"
            )));
        }
        if !self.keys.allow_leading_slash && value.starts_with('/') {
            return Err(ConnectorError::invalid_input(format!(
                "{what} '{value}' must not start with '/'"
            )));
        }
        if !self.keys.allow_dot_segments && value.split('/').any(|s| s == "." || s == "..") {
            return Err(ConnectorError::invalid_input(format!(
                "{what} '{value}' must not contain '.' or '..' segments"
            )));
        }
        Ok(())
    }

    fn check_key(&self, key: &str) -> ConnectorResult<()> {
        if key.is_empty() {
            return Err(ConnectorError::invalid_input("key must not be empty"));
        }
        if key.ends_with('/') {
            return Err(ConnectorError::invalid_input(format!(
                "key '{key}' must not end with '/'"
            )));
        }
        self.check_text("key", key)
    }

    fn check_table(&self, table: &str) -> ConnectorResult<()> {
        let mut chars = table.chars();
        let starts_alphanumeric = chars.next().is_some_and(|c| c.is_ascii_alphanumeric());
        if !starts_alphanumeric {
            return Err(ConnectorError::invalid_input(format!(
                "table name '{table}' must start with a letter or digit"
            )));
        }
        if table.len() > self.max_table_len {
            return Err(ConnectorError::invalid_input(format!(
                "table name is {} characters long, limit is {}",
                table.len(),
                self.max_table_len
            )));
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')) {
            return Err(ConnectorError::invalid_input(format!(
                "table name '{table}' may only contain [A-Za-z0-9_.-]"
            )));
        }
        Ok(())
    }

    fn check_record(&self, record: &Record) -> ConnectorResult<()> {
        if record.len() > self.max_record_fields {
            return Err(ConnectorError::invalid_input(format!(
                "record has {} fields, limit is {}",
                record.len(),
                self.max_record_fields
            )));
        }
        if record.iter().any(|(field, _)| field.is_empty()) {
            return Err(ConnectorError::invalid_input("record field names must not be empty"));
        }
        Ok(())
    }

    fn check_filter(&self, filter: &Filter) -> ConnectorResult<()> {
        let conditions = filter.conditions();
        if conditions.len() > self.max_filter_conditions {
            return Err(ConnectorError::invalid_input(format!(
                "filter has {} conditions, limit is {}",
                conditions.len(),
                self.max_filter_conditions
            )));
        }
        if filter.max_results() == Some(0) {
            return Err(ConnectorError::invalid_input("filter limit must be positive"));
        }
        for condition in conditions {
            if condition.field.is_empty() {
                return Err(ConnectorError::invalid_input(
                    "filter condition field must not be empty",
                ));
            }
            let scalar = matches!(condition.value, Value::Number(_) | Value::String(_));
            if condition.op.is_ordering() && !scalar {
                return Err(ConnectorError::invalid_input(format!(
                    "ordering comparison on '{}' needs a number or string operand",
                    condition.field
                )));
            }
            if condition.op == CompareOp::Exists && !condition.value.is_null() {
                return Err(ConnectorError::invalid_input(format!(
                    "existence check on '{}' takes no operand",
                    condition.field
                )));
            }
        }
        Ok(())
    }
}
