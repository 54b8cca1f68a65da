//! Record commands: read, write and query.

use super::{CliError, CliResult};
use cloudconn_core::{Connector, Filter, Record};
use serde_json::Value;
use std::io::Write;
use tracing::info;

/// Prints the record under `table`/`key` as pretty JSON.
pub fn read(connector: &Connector, table: &str, key: &str, out: &mut impl Write) -> CliResult<()> {
    let record = connector.database().read(table, key)?;
    let json = serde_json::to_string_pretty(&record)
        .map_err(|err| CliError::Usage(format!("cannot render record: {err}")))?;
    writeln!(out, "{json}")?;
    Ok(())
}

/// Stores `json`, which must be a JSON object, under `table`/`key`.
pub fn write(connector: &Connector, table: &str, key: &str, json: &str) -> CliResult<()> {
    let record = parse_record(json)?;
    connector.database().write(table, key, &record)?;
    info!("Wrote '{}' to table '{}' ({} fields)", key, table, record.len());
    Ok(())
}

/// Prints the rows of `table` matching every condition, one JSON object
/// (`{"key": ..., "record": ...}`) per line.
pub fn query(
    connector: &Connector,
    table: &str,
    conditions: Vec<(String, Value)>,
    limit: Option<usize>,
    out: &mut impl Write,
) -> CliResult<()> {
    let mut filter = conditions
        .into_iter()
        .fold(Filter::all(), |filter, (field, value)| filter.equals(field, value));
    if let Some(limit) = limit {
        filter = filter.limit(limit);
    }

    let mut count = 0usize;
    for row in &connector.database().query(table, filter)? {
        let row = row?;
        let line = serde_json::to_string(&row)
            .map_err(|err| CliError::Usage(format!("cannot render row: {err}")))?;
        writeln!(out, "{line}")?;
        count += 1;
    }
    info!("{} rows from table '{}'", count, table);
    Ok(())
}

fn parse_record(json: &str) -> CliResult<Record> {
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(fields)) => Ok(fields.into_iter().collect()),
        Ok(_) => Err(CliError::Usage("record must be a JSON object".to_string())),
        Err(err) => Err(CliError::Usage(format!("invalid record JSON: {err}"))),
    }
}
