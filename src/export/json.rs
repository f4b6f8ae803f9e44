//! JSON export.

use std::path::Path;

use anyhow::{Context, Result};

use crate::models::CheckRecord;

/// Writes records as pretty-printed JSON to `output`, or stdout when no
/// path is given.
pub fn write_json(records: &[CheckRecord], output: Option<&Path>) -> Result<usize> {
    match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            serde_json::to_writer_pretty(file, records).context("Failed to serialize records")?;
        }
        None => {
            serde_json::to_writer_pretty(std::io::stdout().lock(), records)
                .context("Failed to serialize records")?;
            println!();
        }
    }
    Ok(records.len())
}
