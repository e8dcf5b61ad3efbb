//! Tabular export of joined records.

use std::io::Write;

use anyhow::{Context, Result};

use crate::data::model::Record;

/// Union of the record fields in first-seen order.
pub fn columns(records: &[Record]) -> Vec<String> {
    let mut cols: Vec<String> = Vec::with_capacity(records.first().map_or(0, Record::len));
    for rec in records {
        for key in rec.keys() {
            if !cols.iter().any(|c| c == key) {
                cols.push(key.to_string());
            }
        }
    }
    cols
}

/// Write `records` as CSV; absent and null fields become empty cells.
pub fn write_csv<W: Write>(records: &[Record], out: W) -> Result<()> {
    let cols = columns(records);
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(&cols).context("writing CSV header")?;
    for (i, rec) in records.iter().enumerate() {
        let row = cols
            .iter()
            .map(|c| rec.get(c).map(|v| v.to_cell()).unwrap_or_default());
        writer
            .write_record(row)
            .with_context(|| format!("writing CSV row {i}"))?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

/// Write `records` as a pretty JSON array of objects.
pub fn write_json<W: Write>(records: &[Record], out: W) -> Result<()> {
    serde_json::to_writer_pretty(out, records).context("writing JSON")?;
    Ok(())
}
