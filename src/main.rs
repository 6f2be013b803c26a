//! Fund IRR CLI
//!
//! Solves the realized per-period IRR of a savings sheet, checks it and
//! projects the portfolio forward.

use anyhow::{Context, Result};
use clap::Parser;
use fund_irr::config::{Parameters, DEFAULT_PARAMETERS_PATH};
use fund_irr::ledger::load_ledger;
use fund_irr::projection::{Confidence, RateSource, RunReport};
use fund_irr::{PipelineSteps, Scenario, ScenarioRunner};
use std::io;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "fund_irr", version, about = "Realized IRR and growth projection of a savings plan")]
struct Cli {
    /// Ledger identifier (sheet name without .csv); overrides the parameter file
    ledger: Option<String>,

    /// Parameter file (JSON)
    #[arg(long, default_value = DEFAULT_PARAMETERS_PATH)]
    params: PathBuf,

    /// Directory holding the sheets
    #[arg(long)]
    sheets_dir: Option<PathBuf>,

    /// Directory receiving the results
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Projection horizon in periods
    #[arg(long)]
    years: Option<u32>,

    /// Per-period contribution growth factor (e.g. 1.05)
    #[arg(long)]
    growth: Option<f64>,

    /// Book contributions at the start of each period
    #[arg(long)]
    early_booking: bool,

    /// Also report the opposite booking convention
    #[arg(long)]
    compare_booking: bool,

    /// Skip the projection
    #[arg(long)]
    no_projection: bool,

    /// Do not write result files
    #[arg(long)]
    no_export: bool,

    /// Do not write results that failed the consistency check
    #[arg(long)]
    strict: bool,

    /// Print the reports as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut params = Parameters::load_or_default(&cli.params)
        .with_context(|| format!("Failed to read parameters from {}", cli.params.display()))?;
    params.apply_env();

    if let Some(ledger) = cli.ledger {
        params.ledger = Some(ledger);
    }
    if let Some(dir) = cli.sheets_dir {
        params.sheets_dir = dir;
    }
    if let Some(dir) = cli.output_dir {
        params.output_dir = dir;
    }
    if cli.years.is_some() {
        params.years = cli.years;
    }
    if cli.growth.is_some() {
        params.contribution_growth_factor = cli.growth;
    }
    params.early_booking |= cli.early_booking;

    let with_projection = !cli.no_projection;
    if with_projection {
        params.prompt_missing(&mut io::stdin().lock(), &mut io::stdout())?;
    }

    let ledger_path = params.ledger_path()?;
    let ledger = load_ledger(&ledger_path, params.delimiter_byte()?)
        .with_context(|| format!("Failed to load ledger {}", ledger_path.display()))?;
    let context = params.context_for(&ledger, with_projection)?;

    let steps = PipelineSteps {
        check: true,
        project: with_projection,
        export: !cli.no_export,
        export_low_confidence: !cli.strict,
    };

    let runner = ScenarioRunner::new(context);
    let scenarios = if cli.compare_booking {
        runner.booking_comparison(steps)
    } else {
        vec![Scenario::new(runner.context().mode, steps)]
    };

    let reports = runner
        .run_scenarios(&ledger, &scenarios)
        .with_context(|| format!("Failed to process ledger '{}'", runner.context().ledger_id))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_report(report);
        }
    }

    Ok(())
}

fn print_report(report: &RunReport) {
    println!("Ledger: {} ({})", report.ledger_id, report.mode.label());
    println!("  Initial investment: {:.2}", report.initial_investment);
    println!("  Periods: {}", report.interests.len());

    println!("{:>8} {:>10} {:>12}", "Period", "Rate", "Source");
    println!("{}", "-".repeat(32));
    for entry in report.interests.entries() {
        let rate = entry.rate.map(|r| format!("{:.4}", r)).unwrap_or_else(|| "n/a".to_string());
        let source = match entry.source {
            RateSource::Solved => "solved",
            RateSource::FlatGrowth => "flat",
            RateSource::Unavailable => "unavailable",
        };
        println!("{:>8} {:>10} {:>12}", entry.period, rate, source);
    }

    match report.final_rate() {
        Some(rate) => println!("\nCurrent internal rate of return: {:.5}", rate),
        None => println!("\nNo current internal rate of return"),
    }
    if let Some(rate) = report.compound_rate {
        println!("Closed-form compounding rate: {:.5}", rate);
    }
    if let Some(twr) = report.time_weighted.last() {
        println!("Time-weighted rate of return: {:.5}", twr);
    }

    if let Some(check) = &report.consistency {
        let verdict = match report.confidence {
            Confidence::High => "passed",
            Confidence::Low => "FAILED (low confidence)",
            Confidence::Unchecked => "not run",
        };
        println!(
            "Consistency check {}: replayed {:.2}, actual {:.2}, ratio {:.4}",
            verdict, check.replayed, check.actual, check.ratio
        );
    }

    if let Some(projection) = &report.projection {
        println!("\nProjection at {:.5}:", projection.rate);
        println!("{:>8} {:>14} {:>16} {:>16}", "Period", "Contribution", "Value", "Paid in");
        for row in &projection.rows {
            println!(
                "{:>8} {:>14.2} {:>16.2} {:>16.2}",
                row.period, row.contribution, row.projected_value, row.cumulative_contribution
            );
        }
    }

    for path in &report.exported {
        println!("Written: {}", path.display());
    }
    println!();
}
