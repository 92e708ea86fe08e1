//! Drivers command implementation.

use super::CommandResult;
use flatdb_engine::{drivers, DriverInfo};
use serde::Serialize;

/// Driver description for output.
#[derive(Debug, Serialize)]
pub struct DriverRow {
    /// Driver name.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Accepted access tiers, as control-string characters.
    pub tiers: String,
    /// Stores several values per key.
    pub duplicates: bool,
    /// Iterates in key order.
    pub sorted: bool,
    /// Writes appear only after reopening.
    pub deferred_writes: bool,
}

impl From<&DriverInfo> for DriverRow {
    fn from(info: &DriverInfo) -> Self {
        Self {
            name: info.name,
            description: info.description,
            tiers: info.tiers.iter().map(|t| t.as_char()).collect(),
            duplicates: info.capabilities.duplicates,
            sorted: info.capabilities.sorted_keys,
            deferred_writes: info.capabilities.deferred_writes,
        }
    }
}

/// Runs the drivers command.
pub fn run(format: &str) -> CommandResult {
    let rows: Vec<DriverRow> = drivers().iter().map(DriverRow::from).collect();

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&rows)?),
        _ => {
            for row in &rows {
                let mut flags = Vec::new();
                if row.duplicates {
                    flags.push("duplicates");
                }
                if row.sorted {
                    flags.push("sorted");
                }
                if row.deferred_writes {
                    flags.push("deferred");
                }
                println!(
                    "{:10} [{:4}] {:28} {}",
                    row.name,
                    row.tiers,
                    flags.join(","),
                    row.description
                );
            }
        }
    }

    Ok(())
}
