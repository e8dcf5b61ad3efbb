use super::model::{Record, Table};

/// Project `record` onto `keys_to_keep`.
///
/// Fields are emitted in `keys_to_keep` order; keys the record does not
/// carry are skipped and fields not listed are dropped.
pub fn filter_object<S: AsRef<str>>(record: &Record, keys_to_keep: &[S]) -> Record {
    keys_to_keep
        .iter()
        .filter_map(|key| {
            let key = key.as_ref();
            record.get(key).map(|val| (key, val.clone()))
        })
        .collect()
}

/// Whether `record[column]` holds `year` (integer or numeric string).
fn has_year(record: &Record, column: &str, year: i64) -> bool {
    record
        .get(column)
        .and_then(|v| v.as_year())
        .is_some_and(|y| y == year)
}

/// Level snapshot records for one reporting year, in table order.
pub fn records_for_year(table: &Table, year: i64) -> Vec<&Record> {
    table
        .records
        .iter()
        .filter(|rec| has_year(rec, "year", year))
        .collect()
}

/// Evolution records covering exactly `year_start → year_end`, in table order.
pub fn records_for_period(table: &Table, year_start: i64, year_end: i64) -> Vec<&Record> {
    table
        .records
        .iter()
        .filter(|rec| has_year(rec, "year_start", year_start) && has_year(rec, "year_end", year_end))
        .collect()
}
