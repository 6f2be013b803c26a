//! Pipeline engine: per-period IRR solves, consistency check, projection and export

use super::cashflows::{initial_investment_for, CashFlowSeries};
use super::consistency::{check_consistency, ConsistencyReport};
use super::irr::{solve_compound_rate, solve_irr_with, CashFlowSolver, NewtonBisection};
use super::projector::{project, Projection, ProjectionSettings};
use super::twr::time_weighted_returns;
use crate::error::{FundError, FundResult};
use crate::export;
use crate::ledger::{AccountingMode, Ledger};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What to do when a period's IRR solve does not converge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NonConvergencePolicy {
    /// Abort processing of the whole ledger
    #[default]
    Abort,
    /// Record the period as unavailable and carry on
    MarkUnavailable,
}

/// Everything a run needs to know about the ledger being processed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    /// Ledger identifier (sheet name), keys the output artifacts
    pub ledger_id: String,

    pub mode: AccountingMode,

    /// Seed capital before any early-booking pull-forward
    pub initial_investment: f64,

    pub projection: ProjectionSettings,

    pub on_non_convergence: NonConvergencePolicy,

    /// Directory receiving the exported artifacts
    pub output_dir: PathBuf,
}

impl RunContext {
    pub fn new(ledger_id: impl Into<String>, mode: AccountingMode, initial_investment: f64) -> Self {
        Self {
            ledger_id: ledger_id.into(),
            mode,
            initial_investment,
            projection: ProjectionSettings::default(),
            on_non_convergence: NonConvergencePolicy::default(),
            output_dir: PathBuf::from("out"),
        }
    }

    pub fn with_projection(mut self, projection: ProjectionSettings) -> Self {
        self.projection = projection;
        self
    }

    pub fn with_policy(mut self, policy: NonConvergencePolicy) -> Self {
        self.on_non_convergence = policy;
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Same context under another accounting mode
    pub fn for_mode(&self, mode: AccountingMode) -> Self {
        Self { mode, ..self.clone() }
    }
}

/// Downstream steps enabled for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSteps {
    /// Replay the final rate against the ledger
    pub check: bool,
    /// Extrapolate the portfolio with the final rate
    pub project: bool,
    /// Write rates (and projection) files
    pub export: bool,
    /// Export even when the consistency check failed
    pub export_low_confidence: bool,
}

impl Default for PipelineSteps {
    fn default() -> Self {
        Self {
            check: true,
            project: false,
            export: false,
            export_low_confidence: true,
        }
    }
}

impl PipelineSteps {
    /// Solve and check only
    pub fn check_only() -> Self {
        Self::default()
    }

    /// Solve, check and project without writing files
    pub fn full_without_export() -> Self {
        Self {
            project: true,
            ..Self::default()
        }
    }

    /// Solve, check, project and export
    pub fn full() -> Self {
        Self {
            check: true,
            project: true,
            export: true,
            export_low_confidence: true,
        }
    }
}

/// How a period's rate was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateSource {
    /// Root-finder solution
    Solved,
    /// Observed value equals money paid in; rate is exactly 0 without solving
    FlatGrowth,
    /// Solver did not converge and the run policy kept going
    Unavailable,
}

/// Solved rate of one regular period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodRate {
    pub period: u32,
    pub rate: Option<f64>,
    pub source: RateSource,
}

/// Per-period rates in ledger order, one entry per regular period processed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterestSeries {
    entries: Vec<PeriodRate>,
}

impl InterestSeries {
    pub fn push(&mut self, entry: PeriodRate) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[PeriodRate] {
        &self.entries
    }

    /// Rate of the most recent period, if it was obtained
    pub fn last_rate(&self) -> Option<f64> {
        self.entries.last().and_then(|e| e.rate)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Trust in the final rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    /// Consistency check passed
    High,
    /// Consistency check failed; rate returned but flagged
    Low,
    /// Check disabled or no final rate to check
    Unchecked,
}

/// Result of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub ledger_id: String,
    pub mode: AccountingMode,

    /// Seed capital used in the IRR equation (after early-booking pull-forward)
    pub initial_investment: f64,

    /// Index of the last reported period
    pub current_period: Option<u32>,

    pub interests: InterestSeries,
    pub consistency: Option<ConsistencyReport>,
    pub confidence: Confidence,
    pub projection: Option<Projection>,

    /// Constant rate reproducing the final value via the closed-form compounding
    pub compound_rate: Option<f64>,

    /// Time-weighted per-period returns
    pub time_weighted: Vec<f64>,

    /// Files written by the export step
    pub exported: Vec<PathBuf>,
}

impl RunReport {
    /// Final per-period rate
    pub fn final_rate(&self) -> Option<f64> {
        self.interests.last_rate()
    }
}

/// Main IRR engine
pub struct IrrEngine<S: CashFlowSolver = NewtonBisection> {
    context: RunContext,
    solver: S,
}

impl IrrEngine<NewtonBisection> {
    /// Engine with the default Newton/bisection solver
    pub fn new(context: RunContext) -> Self {
        Self::with_solver(context, NewtonBisection::default())
    }
}

impl<S: CashFlowSolver> IrrEngine<S> {
    pub fn with_solver(context: RunContext, solver: S) -> Self {
        Self { context, solver }
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Run the pipeline for one ledger
    pub fn run(&self, ledger: &Ledger, steps: PipelineSteps) -> FundResult<RunReport> {
        let ctx = &self.context;
        let series = CashFlowSeries::with_seed(ledger, ctx.mode, ctx.initial_investment);
        let initial_investment = initial_investment_for(ctx.initial_investment, &series);

        log::info!(
            "Processing '{}' ({}): {} periods, initial investment {:.2}",
            ctx.ledger_id,
            ctx.mode.label(),
            series.len(),
            initial_investment
        );

        let interests = self.solve_series(&series, initial_investment)?;
        let final_rate = interests.last_rate();

        let mut consistency = None;
        let mut confidence = Confidence::Unchecked;
        if steps.check {
            match final_rate {
                Some(rate) => {
                    let report = check_consistency(&series, initial_investment, rate);
                    confidence = if report.passed { Confidence::High } else { Confidence::Low };
                    consistency = Some(report);
                }
                None if series.is_empty() => {
                    consistency = Some(check_consistency(&series, initial_investment, 0.0));
                    confidence = Confidence::High;
                }
                None => log::warn!("No final rate for '{}', consistency check skipped", ctx.ledger_id),
            }
        }

        if let Some(rate) = final_rate {
            let booking = if ctx.mode.books_early() { " with early booking" } else { "" };
            log::info!("Current internal rate of return{}: {:.5}", booking, rate);
        }

        let projection = match final_rate {
            Some(rate) if steps.project => project(&series, rate, &ctx.projection),
            _ => None,
        };

        let compound_rate = series.last().and_then(|last| {
            let mut contributions = Vec::with_capacity(series.len() + 1);
            if ctx.initial_investment != 0.0 {
                contributions.push(ctx.initial_investment);
            }
            contributions.extend(series.contributions());
            solve_compound_rate(&contributions, last.total_value)
        });

        let mut report = RunReport {
            ledger_id: ctx.ledger_id.clone(),
            mode: ctx.mode,
            initial_investment,
            current_period: ledger.current_period(),
            interests,
            consistency,
            confidence,
            projection,
            compound_rate,
            time_weighted: time_weighted_returns(series.flows()),
            exported: Vec::new(),
        };

        if steps.export {
            if report.confidence == Confidence::Low && !steps.export_low_confidence {
                log::warn!("Skipping export of low-confidence results for '{}'", ctx.ledger_id);
            } else {
                report.exported = export::export_report(&report, &ctx.output_dir)?;
            }
        }

        Ok(report)
    }

    /// Solve every period's IRR, each on a growing prefix of the series
    fn solve_series(&self, series: &CashFlowSeries, initial_investment: f64) -> FundResult<InterestSeries> {
        let results: Vec<FundResult<PeriodRate>> = (0..series.len())
            .into_par_iter()
            .map(|index| self.solve_period(series, index, initial_investment))
            .collect();

        let mut interests = InterestSeries::default();
        for result in results {
            match result {
                Ok(entry) => interests.push(entry),
                Err(FundError::NonConvergence { period, iterations, residual }) => match self.context.on_non_convergence {
                    NonConvergencePolicy::Abort => {
                        return Err(FundError::NonConvergence { period, iterations, residual });
                    }
                    NonConvergencePolicy::MarkUnavailable => {
                        log::warn!("Period {}: IRR did not converge, marked unavailable", period);
                        interests.push(PeriodRate {
                            period,
                            rate: None,
                            source: RateSource::Unavailable,
                        });
                    }
                },
                Err(err) => return Err(err),
            }
        }

        Ok(interests)
    }

    fn solve_period(&self, series: &CashFlowSeries, index: usize, initial_investment: f64) -> FundResult<PeriodRate> {
        let flow = &series.flows()[index];

        if flow.is_flat() {
            log::info!("Period {}: no growth since inception, rate set to 0", flow.period_index);
            return Ok(PeriodRate {
                period: flow.period_index,
                rate: Some(0.0),
                source: RateSource::FlatGrowth,
            });
        }

        let prefix = series.solve_prefix(index);
        let rate = solve_irr_with(&self.solver, &prefix, initial_investment)?;
        log::debug!("Period {}: rate {:.5}", flow.period_index, rate);

        Ok(PeriodRate {
            period: flow.period_index,
            rate: Some(rate),
            source: RateSource::Solved,
        })
    }
}
