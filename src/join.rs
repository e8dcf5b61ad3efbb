//! Level / evolution join for the îlot statistics.
//!
//! The level extract holds one snapshot of building metrics per îlot and per
//! year; the evolution extract holds deltas between two years. For a period
//! `year_start → year_end` every level row of `year_end` is enriched with the
//! matching evolution row and its measurements are renamed after the year.

use std::collections::HashMap;

use crate::data::filter::{records_for_period, records_for_year};
use crate::data::model::{Record, Table, Value, YearMeasures};

/// Fields forming the îlot composite key.
pub const KEY_FIELDS: [&str; 2] = ["code", "depcom_2018"];

/// Index column pandas leaves behind when writing parquet.
const PANDAS_INDEX: &str = "__index_level_0__";

/// `(code, depcom_2018)` compared as text.
pub type IlotKey = (Option<String>, Option<String>);

/// Key field as text, so `"97101"` from parquet and `97101` guessed from a
/// CSV cell line up. Null reads as absent.
pub fn key_text(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(v) => Some(v.to_string()),
    }
}

pub fn ilot_key(record: &Record) -> IlotKey {
    (
        key_text(record.get(KEY_FIELDS[0])),
        key_text(record.get(KEY_FIELDS[1])),
    )
}

/// Join `level` and `evol` for the period `year_start → year_end`.
///
/// One output record per level record of `year_end`, in level order. When
/// several evolution rows share a key the first one wins. Level rows without
/// an evolution row pass through with only the year renaming applied.
pub fn join_level_evol(level: &Table, evol: &Table, year_start: i64, year_end: i64) -> Vec<Record> {
    let mut evol_by_key: HashMap<IlotKey, &Record> = HashMap::new();
    for rec in records_for_period(evol, year_start, year_end) {
        evol_by_key.entry(ilot_key(rec)).or_insert(rec);
    }

    let level_rows = records_for_year(level, year_end);
    let mut matched = 0usize;

    let joined: Vec<Record> = level_rows
        .into_iter()
        .map(|level_rec| {
            let mut merged = level_rec.clone();
            if let Some(evol_rec) = evol_by_key.get(&ilot_key(level_rec)) {
                merged.merge(evol_rec);
                matched += 1;
            }
            reshape(merged, year_end)
        })
        .collect();

    log::debug!(
        "Joined {} level rows for {year_end} with {matched} evolution rows ({year_start}→{year_end})",
        joined.len()
    );
    joined
}

/// Replace `year`, `area_building` and `pct_building` by their year-qualified
/// counterparts and drop the pandas index column.
fn reshape(mut record: Record, year: i64) -> Record {
    record.remove(PANDAS_INDEX);
    record.remove("year");
    let measures = YearMeasures {
        year,
        aire: record.remove("area_building").unwrap_or(Value::Null),
        pourcentage_bati: record.remove("pct_building").unwrap_or(Value::Null),
    };
    measures.write_into(&mut record);
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(fields: &[(&str, Value)]) -> Record {
        fields.iter().cloned().collect()
    }

    fn level_row(code: &str, year: i64, area: i64, pct: i64) -> Record {
        rec(&[
            ("code", Value::from(code)),
            ("depcom_2018", Value::from("12345")),
            ("year", Value::Integer(year)),
            ("area_building", Value::Integer(area)),
            ("pct_building", Value::Integer(pct)),
        ])
    }

    fn evol_row(code: &str, start: i64, end: i64, change: i64) -> Record {
        rec(&[
            ("code", Value::from(code)),
            ("depcom_2018", Value::from("12345")),
            ("year_start", Value::Integer(start)),
            ("year_end", Value::Integer(end)),
            ("area_building_change_absolute", Value::Integer(change)),
        ])
    }

    #[test]
    fn merges_matching_evolution_and_renames_measures() {
        let level = Table::from_records(vec![level_row("A1", 2020, 100, 10)]);
        let evol = Table::from_records(vec![evol_row("A1", 2018, 2020, 20)]);

        let out = join_level_evol(&level, &evol, 2018, 2020);

        assert_eq!(out.len(), 1);
        let row = &out[0];
        assert_eq!(row.get("code"), Some(&Value::from("A1")));
        assert_eq!(row.get("depcom_2018"), Some(&Value::from("12345")));
        assert_eq!(row.get("area_building_change_absolute"), Some(&Value::Integer(20)));
        assert_eq!(row.get("aire_2020"), Some(&Value::Integer(100)));
        assert_eq!(row.get("pourcentage_bati_2020"), Some(&Value::Integer(10)));
        assert!(!row.contains_key("year"));
        assert!(!row.contains_key("area_building"));
        assert!(!row.contains_key("pct_building"));
        // period columns of the evolution row pass through
        assert_eq!(row.get("year_start"), Some(&Value::Integer(2018)));
    }

    #[test]
    fn unmatched_level_rows_pass_through_reshaped() {
        let level = Table::from_records(vec![level_row("A1", 2020, 100, 10)]);
        let evol = Table::from_records(vec![evol_row("Z9", 2018, 2020, 20)]);

        let out = join_level_evol(&level, &evol, 2018, 2020);

        let keys: Vec<&str> = out[0].keys().collect();
        assert_eq!(keys, ["code", "depcom_2018", "aire_2020", "pourcentage_bati_2020"]);
    }

    #[test]
    fn filters_level_by_end_year_and_evol_by_period() {
        let level = Table::from_records(vec![
            level_row("A1", 2018, 80, 8),
            level_row("A1", 2020, 100, 10),
            level_row("B2", 2020, 50, 5),
        ]);
        let evol = Table::from_records(vec![
            evol_row("A1", 2019, 2020, 99),
            evol_row("A1", 2018, 2020, 20),
        ]);

        let out = join_level_evol(&level, &evol, 2018, 2020);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].get("area_building_change_absolute"), Some(&Value::Integer(20)));
        assert_eq!(out[1].get("code"), Some(&Value::from("B2")));
        assert!(!out[1].contains_key("area_building_change_absolute"));
        assert!(out.iter().all(|r| !r.contains_key("aire_2018")));
    }

    #[test]
    fn first_duplicate_evolution_row_wins() {
        let level = Table::from_records(vec![level_row("A1", 2020, 100, 10)]);
        let evol = Table::from_records(vec![
            evol_row("A1", 2018, 2020, 1),
            evol_row("A1", 2018, 2020, 2),
        ]);

        let out = join_level_evol(&level, &evol, 2018, 2020);

        assert_eq!(out[0].get("area_building_change_absolute"), Some(&Value::Integer(1)));
    }

    #[test]
    fn keys_match_across_cell_types() {
        let mut level_rec = level_row("A1", 2020, 100, 10);
        level_rec.insert("depcom_2018", Value::Integer(12345));

        let out = join_level_evol(
            &Table::from_records(vec![level_rec]),
            &Table::from_records(vec![evol_row("A1", 2018, 2020, 20)]),
            2018,
            2020,
        );

        assert_eq!(out[0].get("area_building_change_absolute"), Some(&Value::Integer(20)));
        // evolution fields win, key included
        assert_eq!(out[0].get("depcom_2018"), Some(&Value::from("12345")));
    }

    #[test]
    fn evolution_overrides_level_fields() {
        let mut level_rec = level_row("A1", 2020, 100, 10);
        level_rec.insert("dep", Value::from("971"));
        let mut evol_rec = evol_row("A1", 2018, 2020, 20);
        evol_rec.insert("dep", Value::from("972"));

        let out = join_level_evol(
            &Table::from_records(vec![level_rec]),
            &Table::from_records(vec![evol_rec]),
            2018,
            2020,
        );

        assert_eq!(out[0].get("dep"), Some(&Value::from("972")));
    }

    #[test]
    fn drops_pandas_index_and_fills_missing_measures() {
        let level = Table::from_records(vec![rec(&[
            ("__index_level_0__", Value::Integer(7)),
            ("code", Value::from("A1")),
            ("depcom_2018", Value::from("12345")),
            ("year", Value::from("2020")),
        ])]);

        let out = join_level_evol(&level, &Table::default(), 2018, 2020);

        assert!(!out[0].contains_key("__index_level_0__"));
        assert_eq!(out[0].get("aire_2020"), Some(&Value::Null));
        assert_eq!(out[0].get("pourcentage_bati_2020"), Some(&Value::Null));
    }

    #[test]
    fn empty_inputs_give_empty_output() {
        assert!(join_level_evol(&Table::default(), &Table::default(), 2018, 2020).is_empty());
    }
}
