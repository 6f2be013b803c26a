//! Load savings ledgers from delimited sheets
//!
//! Expected header: `period;contribution;total_value` (the older
//! `year;saving;total_value` naming is accepted as well). Rows whose period
//! field is blank or starts with `#` are skipped.

use super::{Ledger, PeriodRecord};
use crate::error::{FundError, FundResult};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::Path;

/// Default field delimiter of savings sheets
pub const DEFAULT_DELIMITER: u8 = b';';

/// Marker that comments out a ledger row
pub const COMMENT_MARKER: char = '#';

const PERIOD_COLUMNS: [&str; 2] = ["period", "year"];
const CONTRIBUTION_COLUMNS: [&str; 2] = ["contribution", "saving"];
const VALUE_COLUMNS: [&str; 1] = ["total_value"];

/// Column positions resolved from the header row
#[derive(Debug, Clone, Copy)]
struct Columns {
    period: usize,
    contribution: usize,
    total_value: usize,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> FundResult<Self> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
        };
        let missing = |name: &str| FundError::malformed(0, format!("header has no '{}' column", name));

        Ok(Self {
            period: find(&PERIOD_COLUMNS).ok_or_else(|| missing("period"))?,
            contribution: find(&CONTRIBUTION_COLUMNS).ok_or_else(|| missing("contribution"))?,
            total_value: find(&VALUE_COLUMNS).ok_or_else(|| missing("total_value"))?,
        })
    }
}

/// Load a ledger from a sheet on disk
pub fn load_ledger<P: AsRef<Path>>(path: P, delimiter: u8) -> FundResult<Ledger> {
    let path = path.as_ref();
    log::debug!("Loading ledger from {}", path.display());
    let file = std::fs::File::open(path)?;
    load_ledger_from_reader(file, delimiter)
}

/// Load a ledger from any reader (e.g., string buffer)
pub fn load_ledger_from_reader<R: std::io::Read>(reader: R, delimiter: u8) -> FundResult<Ledger> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let columns = Columns::from_headers(csv_reader.headers()?)?;
    let mut records: Vec<PeriodRecord> = Vec::new();

    for (index, result) in csv_reader.records().enumerate() {
        let row = index + 1;
        let record = result?;

        let period_field = record.get(columns.period).unwrap_or("");
        if period_field.is_empty() || period_field.starts_with(COMMENT_MARKER) {
            continue;
        }

        let period_index: u32 = period_field
            .parse()
            .map_err(|_| FundError::malformed(row, format!("period '{}' is not a non-negative integer", period_field)))?;
        let contribution = parse_amount(&record, columns.contribution, "contribution", row)?;
        let total_value = parse_amount(&record, columns.total_value, "total_value", row)?;

        if let Some(prev) = records.last() {
            if period_index <= prev.period_index {
                return Err(FundError::malformed(
                    row,
                    format!("period {} does not follow period {}", period_index, prev.period_index),
                ));
            }
        }

        records.push(PeriodRecord::new(period_index, contribution, total_value));
    }

    log::debug!("Loaded {} ledger records", records.len());
    Ledger::from_records(records)
}

fn parse_amount(record: &StringRecord, column: usize, name: &str, row: usize) -> FundResult<f64> {
    let field = record.get(column).unwrap_or("");
    if field.is_empty() {
        return Err(FundError::malformed(row, format!("missing {}", name)));
    }
    let value: f64 = field
        .parse()
        .map_err(|_| FundError::malformed(row, format!("{} '{}' is not numeric", name, field)))?;
    if !value.is_finite() {
        return Err(FundError::malformed(row, format!("{} '{}' is not finite", name, field)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(sheet: &str) -> FundResult<Ledger> {
        load_ledger_from_reader(sheet.as_bytes(), DEFAULT_DELIMITER)
    }

    #[test]
    fn test_load_skips_comments_and_blank_periods() {
        let sheet = "\
period;contribution;total_value
# opening balance below
0;1000;1000
;;
1;100;1150
#2;100;9999
2;100;1307.5
";
        let ledger = load(sheet).expect("Failed to load ledger");
        assert_eq!(ledger.initial_investment(), 1000.0);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.periods()[1], PeriodRecord::new(2, 100.0, 1307.5));
    }

    #[test]
    fn test_load_accepts_legacy_column_names() {
        let sheet = "year;saving;total_value;note\n0;500;500;start\n1;50;560;\n";
        let ledger = load(sheet).unwrap();
        assert_eq!(ledger.initial_investment(), 500.0);
        assert_eq!(ledger.periods()[0].total_value, 560.0);
    }

    #[test]
    fn test_non_numeric_value_reports_row() {
        let sheet = "period;contribution;total_value\n0;1000;1000\n# skipped\n2;abc;1200\n";
        match load(sheet) {
            Err(FundError::MalformedRecord { row, reason }) => {
                assert_eq!(row, 3);
                assert!(reason.contains("contribution"));
            }
            other => panic!("Expected MalformedRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let sheet = "period;contribution;total_value\n1;100\n";
        assert!(matches!(load(sheet), Err(FundError::MalformedRecord { row: 1, .. })));
    }

    #[test]
    fn test_missing_column_is_malformed() {
        let sheet = "period;contribution\n1;100\n";
        assert!(matches!(load(sheet), Err(FundError::MalformedRecord { row: 0, .. })));
    }

    #[test]
    fn test_out_of_order_periods_rejected() {
        let sheet = "period;contribution;total_value\n1;100;100\n3;100;210\n2;100;320\n";
        assert!(matches!(load(sheet), Err(FundError::MalformedRecord { row: 3, .. })));

        let late_seed = "period;contribution;total_value\n1;100;100\n0;1000;1000\n";
        assert!(load(late_seed).is_err());
    }

    #[test]
    fn test_comma_delimited_sheet() {
        let sheet = "period,contribution,total_value\n0,1000,1000\n1,100,1210\n";
        let ledger = load_ledger_from_reader(sheet.as_bytes(), b',').unwrap();
        assert_eq!(ledger.len(), 1);
    }
}
