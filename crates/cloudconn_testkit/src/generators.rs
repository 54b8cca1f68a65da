//! Property-based test generators using proptest.
//!
//! Every strategy produces input the validation layer accepts.

use cloudconn_core::{Filter, Record};
use proptest::prelude::*;
use serde_json::Value;

/// Strategy for generating valid object keys: one to four path segments.
pub fn object_key_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::string::string_regex("[a-z0-9][a-z0-9_-]{0,11}").expect("Invalid regex"),
        1..4,
    )
    .prop_map(|segments| segments.join("/"))
}

/// Strategy for generating object contents.
pub fn object_data_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..1024)
}

/// Strategy for generating valid table names.
pub fn table_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for generating valid record keys.
pub fn record_key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9][A-Za-z0-9_.-]{0,23}").expect("Invalid regex")
}

/// Strategy for generating scalar field values.
///
/// Numbers span the signed 64-bit range, the widest every backend stores
/// exactly.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        prop::string::string_regex("[ -~]{0,16}")
            .expect("Invalid regex")
            .prop_map(Value::String),
    ]
}

/// Strategy for generating field values, nested up to two levels.
pub fn field_value_strategy() -> impl Strategy<Value = Value> {
    scalar_value_strategy().prop_recursive(2, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|fields| Value::Object(fields.into_iter().collect())),
        ]
    })
}

/// Strategy for generating records with one to eight fields.
pub fn record_strategy() -> impl Strategy<Value = Record> {
    prop::collection::btree_map("[a-z][a-z0-9_]{0,9}", field_value_strategy(), 1..8)
        .prop_map(|fields| {
            fields
                .into_iter()
                .fold(Record::new(), |record, (field, value)| record.with(field, value))
        })
}

/// Strategy for generating equality filters over a small value space, so
/// generated records match them now and then.
pub fn filter_strategy() -> impl Strategy<Value = Filter> {
    (
        prop::collection::vec(("[a-c]", 0i64..3), 0..3),
        prop::option::of(1usize..10),
    )
        .prop_map(|(conditions, limit)| {
            let filter = conditions
                .into_iter()
                .fold(Filter::all(), |filter, (field, value)| filter.equals(field, value));
            match limit {
                Some(limit) => filter.limit(limit),
                None => filter,
            }
        })
}

/// Strategy for generating a number of consecutive failures.
pub fn failure_count_strategy() -> impl Strategy<Value = usize> {
    0usize..8
}
