//! Write solved rates and projection tables to disk

use crate::error::FundResult;
use crate::projection::{InterestSeries, Projection, RunReport};
use csv::Writer;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Header of the rates artifact
pub const RATES_HEADER: &str = "interest";

/// Header of the projection table
pub const PROJECTION_HEADER: [&str; 4] = ["period", "contribution", "projected_value", "cumulative_contribution"];

/// Write every artifact the report carries; returns the written paths
pub fn export_report(report: &RunReport, output_dir: &Path) -> FundResult<Vec<PathBuf>> {
    let mut written = vec![write_rates(output_dir, &report.ledger_id, &report.interests)?];

    if let (Some(projection), Some(period)) = (&report.projection, report.current_period) {
        written.push(write_projection(output_dir, &report.ledger_id, period, projection)?);
    }

    Ok(written)
}

/// Rates file: one 4-decimal rate per period; unavailable periods are left blank
pub fn write_rates(output_dir: &Path, ledger_id: &str, interests: &InterestSeries) -> FundResult<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format!("{}.csv", ledger_id));
    let mut file = BufWriter::new(File::create(&path)?);

    writeln!(file, "{}", RATES_HEADER)?;
    for entry in interests.entries() {
        match entry.rate {
            Some(rate) => writeln!(file, "{:.4}", rate)?,
            None => writeln!(file)?,
        }
    }
    file.flush()?;

    log::info!("Rates written to {}", path.display());
    Ok(path)
}

/// File name of a projection table, keyed for traceability
pub fn projection_file_name(ledger_id: &str, current_period: u32, rate: f64) -> String {
    format!("Projected-{}-{}-{:.5}.csv", ledger_id, current_period, rate)
}

/// Projection table: header, anchor row, one row per projected period
pub fn write_projection(
    output_dir: &Path,
    ledger_id: &str,
    current_period: u32,
    projection: &Projection,
) -> FundResult<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(projection_file_name(ledger_id, current_period, projection.rate));
    let mut writer = Writer::from_path(&path)?;

    writer.write_record(PROJECTION_HEADER)?;
    for row in &projection.rows {
        writer.write_record(&[
            row.period.to_string(),
            format!("{:.2}", row.contribution),
            format!("{:.2}", row.projected_value),
            format!("{:.2}", row.cumulative_contribution),
        ])?;
    }
    writer.flush()?;

    log::info!("Projection written to {}", path.display());
    Ok(path)
}
