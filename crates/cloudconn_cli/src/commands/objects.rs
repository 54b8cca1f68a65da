//! Object commands: put, get, delete, ls, cp and mv.

use super::CliResult;
use cloudconn_core::Connector;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Uploads `file` under `key`.
pub fn put(connector: &Connector, key: &str, file: &Path) -> CliResult<()> {
    let size = connector.storage().upload(file, key)?;
    info!("Stored {:?} as '{}' ({} bytes)", file, key, size);
    Ok(())
}

/// Writes the object under `key` to `out_file`, or to `out` when no file
/// is given.
pub fn get(
    connector: &Connector,
    key: &str,
    out_file: Option<&Path>,
    out: &mut impl Write,
) -> CliResult<()> {
    match out_file {
        Some(path) => {
            let size = connector.storage().download(key, path)?;
            info!("Wrote '{}' to {:?} ({} bytes)", key, path, size);
        }
        None => {
            let data = connector.storage().get(key)?;
            out.write_all(&data)?;
            out.flush()?;
        }
    }
    Ok(())
}

/// Deletes the object under `key`.
pub fn delete(connector: &Connector, key: &str) -> CliResult<()> {
    connector.storage().delete(key)?;
    info!("Deleted '{}'", key);
    Ok(())
}

/// Prints the keys under `prefix`, one per line, optionally with sizes.
pub fn ls(connector: &Connector, prefix: &str, sizes: bool, out: &mut impl Write) -> CliResult<()> {
    if sizes {
        for meta in &connector.storage().list_with_sizes(prefix)? {
            let meta = meta?;
            writeln!(out, "{:>12}  {}", meta.size, meta.key)?;
        }
    } else {
        for key in &connector.storage().list(prefix)? {
            writeln!(out, "{}", key?)?;
        }
    }
    Ok(())
}

/// Copies `source` to `destination`.
pub fn cp(connector: &Connector, source: &str, destination: &str) -> CliResult<()> {
    connector.storage().copy(source, destination)?;
    info!("Copied '{}' to '{}'", source, destination);
    Ok(())
}

/// Moves `source` to `destination`.
pub fn mv(connector: &Connector, source: &str, destination: &str) -> CliResult<()> {
    connector.storage().rename(source, destination)?;
    info!("Moved '{}' to '{}'", source, destination);
    Ok(())
}
