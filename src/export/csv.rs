//! CSV export: one flattened row per target.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use csv::Writer;

use crate::models::CheckRecord;

const HEADER: [&str; 13] = [
    "raw",
    "fmt",
    "is_cdn",
    "cdn_provider",
    "is_waf",
    "waf_provider",
    "is_cloud",
    "cloud_provider",
    "address_count_exceeded",
    "address_count",
    "addresses",
    "cnames",
    "locations",
];

/// Writes records as CSV to `output`, or stdout when no path is given.
/// Set-valued columns are joined with `|`.
pub fn write_csv(records: &[CheckRecord], output: Option<&Path>) -> Result<usize> {
    match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_csv_to(records, file)
        }
        None => write_csv_to(records, std::io::stdout().lock()),
    }
}

fn write_csv_to(records: &[CheckRecord], sink: impl Write) -> Result<usize> {
    let mut writer = Writer::from_writer(sink);
    writer.write_record(HEADER).context("Failed to write CSV header")?;

    for record in records {
        let classification = &record.classification;
        let addresses: Vec<&str> = record
            .a
            .iter()
            .chain(record.aaaa.iter())
            .map(String::as_str)
            .collect();
        writer
            .write_record([
                record.raw.as_str(),
                record.fmt.as_str(),
                bool_str(classification.is_cdn),
                classification.cdn_provider.as_str(),
                bool_str(classification.is_waf),
                classification.waf_provider.as_str(),
                bool_str(classification.is_cloud),
                classification.cloud_provider.as_str(),
                bool_str(classification.address_count_exceeded),
                &classification.address_count.to_string(),
                &addresses.join("|"),
                &join(&record.cname),
                &join(&record.locations),
            ])
            .context("Failed to write CSV row")?;
    }

    writer.flush().context("Failed to flush CSV output")?;
    Ok(records.len())
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn join(values: &std::collections::BTreeSet<String>) -> String {
    values
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("|")
}
