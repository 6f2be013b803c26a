//! Run parameters: JSON parameter file, environment overrides and interactive prompting
//!
//! Recognised environment variables:
//!   FUND_LEDGER, FUND_YEARS, FUND_GROWTH_FACTOR

use crate::error::{FundError, FundResult};
use crate::ledger::{AccountingMode, Ledger, DEFAULT_DELIMITER};
use crate::projection::{NonConvergencePolicy, ProjectionSettings, RunContext};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Default location of the parameter file
pub const DEFAULT_PARAMETERS_PATH: &str = "parameters.json";

fn default_sheets_dir() -> PathBuf {
    PathBuf::from("sheets")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("sheets/out")
}

fn default_delimiter() -> char {
    DEFAULT_DELIMITER as char
}

fn default_contribution_precision() -> u32 {
    2
}

/// Parameters of a run as read from the parameter file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Ledger identifier: sheet file name without extension
    #[serde(default)]
    pub ledger: Option<String>,

    /// Projection horizon in periods
    #[serde(default)]
    pub years: Option<u32>,

    /// Per-period contribution growth (1.05 = +5%)
    #[serde(default)]
    pub contribution_growth_factor: Option<f64>,

    #[serde(default = "default_sheets_dir")]
    pub sheets_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Seed capital when the sheet has no period-0 row
    #[serde(default)]
    pub initial_investment: Option<f64>,

    /// Book contributions at period start (monthly sheets only)
    #[serde(default)]
    pub early_booking: bool,

    #[serde(default = "default_contribution_precision")]
    pub contribution_precision: u32,

    /// Keep going when a period's IRR does not converge
    #[serde(default)]
    pub allow_unavailable_periods: bool,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            ledger: None,
            years: None,
            contribution_growth_factor: None,
            sheets_dir: default_sheets_dir(),
            output_dir: default_output_dir(),
            delimiter: default_delimiter(),
            initial_investment: None,
            early_booking: false,
            contribution_precision: default_contribution_precision(),
            allow_unavailable_periods: false,
        }
    }
}

impl Parameters {
    /// Read parameters from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> FundResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> FundResult<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Read parameters from `path` if it exists, defaults otherwise
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> FundResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            log::debug!("Reading parameters from {}", path.display());
            Self::from_file(path)
        } else {
            log::info!("No parameter file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Override values from the environment
    pub fn apply_env(&mut self) {
        if let Ok(ledger) = env::var("FUND_LEDGER") {
            if !ledger.is_empty() {
                self.ledger = Some(ledger);
            }
        }
        if let Some(years) = env::var("FUND_YEARS").ok().and_then(|s| s.parse().ok()) {
            self.years = Some(years);
        }
        if let Some(factor) = env::var("FUND_GROWTH_FACTOR").ok().and_then(|s| s.parse().ok()) {
            self.contribution_growth_factor = Some(factor);
        }
    }

    /// Ask for the projection horizon and contribution growth if they are still missing
    pub fn prompt_missing<R: BufRead, W: Write>(&mut self, input: &mut R, output: &mut W) -> FundResult<()> {
        if self.years.is_none() {
            let answer = prompt(input, output, "How many years should the fund be projected?: ")?;
            let years = answer
                .parse()
                .map_err(|_| FundError::Config(format!("'{}' is not a number of years", answer)))?;
            self.years = Some(years);
        }

        if self.contribution_growth_factor.is_none() {
            let answer = prompt(
                input,
                output,
                "What is the yearly increase of the savings in per cent? (e.g. 5 %): ",
            )?;
            let percent: f64 = answer
                .trim_end_matches('%')
                .trim()
                .parse()
                .map_err(|_| FundError::Config(format!("'{}' is not a percentage", answer)))?;
            self.contribution_growth_factor = Some(1.0 + percent / 100.0);
        }

        Ok(())
    }

    /// Field delimiter as a byte
    pub fn delimiter_byte(&self) -> FundResult<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(FundError::Config(format!("delimiter '{}' is not ASCII", self.delimiter)))
        }
    }

    /// Ledger identifier, required for every run
    pub fn ledger_id(&self) -> FundResult<&str> {
        self.ledger
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| FundError::Config("no ledger given".into()))
    }

    /// Path of the ledger sheet
    pub fn ledger_path(&self) -> FundResult<PathBuf> {
        Ok(self.sheets_dir.join(format!("{}.csv", self.ledger_id()?)))
    }

    /// Projection settings; horizon and growth must be known by now
    pub fn projection_settings(&self) -> FundResult<ProjectionSettings> {
        let years = self
            .years
            .ok_or_else(|| FundError::Config("projection horizon (years) not set".into()))?;
        let contribution_growth_factor = self
            .contribution_growth_factor
            .ok_or_else(|| FundError::Config("contribution growth factor not set".into()))?;

        Ok(ProjectionSettings {
            years,
            contribution_growth_factor,
            contribution_precision: self.contribution_precision,
        })
    }

    /// Build the run context for a loaded ledger
    pub fn context_for(&self, ledger: &Ledger, with_projection: bool) -> FundResult<RunContext> {
        let ledger_id = self.ledger_id()?;
        let mode = AccountingMode::from_ledger_id(ledger_id, self.early_booking);

        let initial_investment = match (ledger.initial_investment(), self.initial_investment) {
            (seed, _) if seed != 0.0 => seed,
            (_, Some(configured)) => configured,
            _ => {
                log::warn!("Ledger '{}' has no seed capital; solving without initial investment", ledger_id);
                0.0
            }
        };

        let policy = if self.allow_unavailable_periods {
            NonConvergencePolicy::MarkUnavailable
        } else {
            NonConvergencePolicy::Abort
        };

        let mut context = RunContext::new(ledger_id, mode, initial_investment)
            .with_policy(policy)
            .with_output_dir(&self.output_dir);
        if with_projection {
            context = context.with_projection(self.projection_settings()?);
        }

        Ok(context)
    }
}

fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> FundResult<String> {
    write!(output, "{}", question)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    writeln!(output)?;

    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::PeriodRecord;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_parameter_file() {
        let params = Parameters::from_json(
            r#"{ "ledger": "etf-y", "years": 15, "contribution_growth_factor": 1.03, "delimiter": "," }"#,
        )
        .unwrap();
        assert_eq!(params.ledger.as_deref(), Some("etf-y"));
        assert_eq!(params.years, Some(15));
        assert_eq!(params.delimiter_byte().unwrap(), b',');
        assert_eq!(params.sheets_dir, PathBuf::from("sheets"));
        assert_eq!(params.ledger_path().unwrap(), PathBuf::from("sheets/etf-y.csv"));
        assert_eq!(params.contribution_precision, 2);
    }

    #[test]
    fn test_empty_parameter_file_uses_defaults() {
        assert_eq!(Parameters::from_json("{}").unwrap(), Parameters::default());
    }

    #[test]
    fn test_prompt_missing_values() {
        let mut params = Parameters::default();
        let mut input = "20\n5 %\n".as_bytes();
        let mut output = Vec::new();
        params.prompt_missing(&mut input, &mut output).unwrap();

        assert_eq!(params.years, Some(20));
        assert_relative_eq!(params.contribution_growth_factor.unwrap(), 1.05, epsilon = 1e-12);
        assert!(String::from_utf8(output).unwrap().contains("How many years"));
    }

    #[test]
    fn test_prompt_skips_known_values() {
        let mut params = Parameters {
            years: Some(3),
            contribution_growth_factor: Some(1.0),
            ..Default::default()
        };
        let mut input = "".as_bytes();
        let mut output = Vec::new();
        params.prompt_missing(&mut input, &mut output).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_bad_prompt_answer() {
        let mut params = Parameters::default();
        let mut input = "many\n".as_bytes();
        let mut output = Vec::new();
        assert!(matches!(params.prompt_missing(&mut input, &mut output), Err(FundError::Config(_))));
    }

    #[test]
    fn test_context_for_ledger() {
        let ledger = Ledger::from_records(vec![PeriodRecord::new(1, 100.0, 100.0)]).unwrap();
        let params = Parameters {
            ledger: Some("depot".into()),
            early_booking: true,
            initial_investment: Some(2500.0),
            ..Default::default()
        };
        let context = params.context_for(&ledger, false).unwrap();
        assert_eq!(context.mode, AccountingMode::MonthlyEarly);
        assert_eq!(context.initial_investment, 2500.0);

        let seeded = Ledger::from_records(vec![PeriodRecord::new(0, 1000.0, 1000.0)]).unwrap();
        assert_eq!(params.context_for(&seeded, false).unwrap().initial_investment, 1000.0);

        // projection requested but horizon unknown
        assert!(params.context_for(&seeded, true).is_err());
    }

    #[test]
    fn test_missing_ledger_is_config_error() {
        assert!(matches!(Parameters::default().ledger_id(), Err(FundError::Config(_))));
    }
}
