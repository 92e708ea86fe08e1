//! Dump command implementation.

use super::{display_bytes, open_store, CommandResult};
use flatdb_core::{EffectiveKey, OpenMode};
use serde::Serialize;
use std::path::Path;

/// Stored pair representation for output.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct EntryRow {
    /// Namespace of the key (if any).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Key, lossily decoded as UTF-8.
    pub key: String,
    /// First value, lossily decoded as UTF-8.
    pub value: String,
}

impl EntryRow {
    /// Builds a row from a stored pair.
    pub fn new(key: &EffectiveKey, value: &[u8]) -> Self {
        Self {
            namespace: key.namespace().map(str::to_string),
            key: display_bytes(key.key()),
            value: display_bytes(value),
        }
    }
}

/// Runs the dump command.
///
/// With a namespace selected only its keys are listed, otherwise every key
/// of the database.
pub fn run(path: &Path, driver: &str, namespace: &str, format: &str) -> CommandResult {
    let store = open_store(path, driver, namespace, OpenMode::READ)?;

    let rows: Vec<EntryRow> = store
        .entries()
        .iter()
        .filter(|(key, _)| namespace.is_empty() || key.namespace() == Some(namespace))
        .map(|(key, value)| EntryRow::new(key, value))
        .collect();
    store.close()?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&rows)?),
        _ => print_text_output(&rows),
    }
    Ok(())
}

fn print_text_output(rows: &[EntryRow]) {
    for row in rows {
        match &row.namespace {
            Some(ns) => println!("[{ns}] {}\t{}", row.key, row.value),
            None => println!("{}\t{}", row.key, row.value),
        }
    }
}
