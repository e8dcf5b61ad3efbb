use std::path::Path;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, UInt16Type,
    UInt32Type, UInt64Type, UInt8Type,
};
use arrow::util::display::array_value_to_string;
use geojson::{FeatureCollection, GeoJson};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Record, Table, Value};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a statistics extract from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – columnar extract as written by pandas / geopandas (recommended)
/// * `.json`    – `[{ "code": "...", "depcom_2018": "...", ... }, ...]`
/// * `.csv`     – header row, one record per line
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!(
        "Loaded {} records with columns {:?} from {}",
        table.len(),
        table.column_names,
        path.display()
    );
    Ok(table)
}

/// Load an îlot geometry file (a GeoJSON `FeatureCollection`).
pub fn load_geometry(path: &Path) -> Result<FeatureCollection> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading GeoJSON file {}", path.display()))?;
    let geojson: GeoJson = text.parse().context("parsing GeoJSON")?;
    let collection =
        FeatureCollection::try_from(geojson).context("expected a GeoJSON FeatureCollection")?;

    log::info!(
        "Loaded {} features from {}",
        collection.features.len(),
        path.display()
    );
    Ok(collection)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "code": "0001", "depcom_2018": "97101", "year": 2020, "area_building": 1520.4 },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let rows = root.as_array().context("Expected top-level JSON array")?;

    let records = rows
        .iter()
        .enumerate()
        .map(|(i, row)| -> Result<Record> {
            let obj = row
                .as_object()
                .with_context(|| format!("Row {i} is not a JSON object"))?;
            Ok(obj.iter().map(|(k, v)| (k.as_str(), Value::from(v))).collect())
        })
        .collect::<Result<Vec<Record>>>()?;

    Ok(Table::from_records(records))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, cell types guessed per value.
fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut records = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("CSV row {row_no}"))?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .map(|(col, cell)| (col.as_str(), guess_value_type(cell)))
            .collect();
        records.push(record);
    }

    Ok(Table::from_records(records))
}

/// Integers are only recognised when they print back identically, so codes
/// with leading zeros (`"0012"`) stay strings.
fn guess_value_type(s: &str) -> Value {
    if s.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        if i.to_string() == s {
            return Value::Integer(i);
        }
        return Value::String(s.to_string());
    }
    if let Ok(f) = s.parse::<f64>() {
        return Value::Float(f);
    }
    if s == "true" || s == "false" {
        return Value::Bool(s == "true");
    }
    Value::String(s.to_string())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a parquet extract, one record per row and one field per column.
///
/// Works with files written by **pandas** (`df.to_parquet()`, which may add
/// an `__index_level_0__` column) and **geopandas**.
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        for row in 0..batch.num_rows() {
            let record: Record = schema
                .fields()
                .iter()
                .zip(batch.columns())
                .map(|(field, col)| (field.name().as_str(), extract_value(col, row)))
                .collect();
            records.push(record);
        }
    }

    Ok(Table::from_records(records))
}

// -- Arrow helpers --

fn integer(v: impl Into<i64>) -> Value {
    Value::Integer(v.into())
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &ArrayRef, row: usize) -> Value {
    if col.is_null(row) {
        return Value::Null;
    }
    match col.data_type() {
        DataType::Utf8 => Value::String(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int8 => integer(col.as_primitive::<Int8Type>().value(row)),
        DataType::Int16 => integer(col.as_primitive::<Int16Type>().value(row)),
        DataType::Int32 => integer(col.as_primitive::<Int32Type>().value(row)),
        DataType::Int64 => integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => integer(col.as_primitive::<UInt8Type>().value(row)),
        DataType::UInt16 => integer(col.as_primitive::<UInt16Type>().value(row)),
        DataType::UInt32 => integer(col.as_primitive::<UInt32Type>().value(row)),
        DataType::UInt64 => {
            let v = col.as_primitive::<UInt64Type>().value(row);
            i64::try_from(v).map_or(Value::Float(v as f64), Value::Integer)
        }
        DataType::Float32 => Value::Float(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => Value::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => Value::Bool(col.as_boolean().value(row)),
        // Dictionary-encoded strings, dates, ... are kept as their display text.
        _ => match array_value_to_string(col, row) {
            Ok(text) => Value::String(text),
            Err(e) => {
                log::warn!("Unreadable {:?} cell at row {row}: {e}", col.data_type());
                Value::Null
            }
        },
    }
}
