//! Scenario runner for comparing booking conventions
//!
//! Runs the same ledger under several accounting modes without reloading it,
//! e.g. late and early booking side by side.

use crate::error::FundResult;
use crate::ledger::{AccountingMode, Ledger};
use crate::projection::{IrrEngine, PipelineSteps, RunContext, RunReport};

/// One mode to evaluate and the steps to run for it
#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    pub mode: AccountingMode,
    pub steps: PipelineSteps,
}

impl Scenario {
    pub fn new(mode: AccountingMode, steps: PipelineSteps) -> Self {
        Self { mode, steps }
    }
}

/// Runs scenarios against a shared base context
///
/// # Example
/// ```ignore
/// let runner = ScenarioRunner::new(context);
/// let reports = runner.run_scenarios(&ledger, &[
///     Scenario::new(AccountingMode::MonthlyLate, PipelineSteps::full()),
///     Scenario::new(AccountingMode::MonthlyEarly, PipelineSteps::check_only()),
/// ])?;
/// ```
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    base_context: RunContext,
}

impl ScenarioRunner {
    pub fn new(base_context: RunContext) -> Self {
        Self { base_context }
    }

    /// Run a single scenario
    pub fn run(&self, ledger: &Ledger, scenario: Scenario) -> FundResult<RunReport> {
        let engine = IrrEngine::new(self.base_context.for_mode(scenario.mode));
        engine.run(ledger, scenario.steps)
    }

    /// Run several scenarios in order; the first failure aborts
    pub fn run_scenarios(&self, ledger: &Ledger, scenarios: &[Scenario]) -> FundResult<Vec<RunReport>> {
        scenarios.iter().map(|s| self.run(ledger, *s)).collect()
    }

    /// Base scenario plus the opposite booking convention for monthly ledgers
    pub fn booking_comparison(&self, steps: PipelineSteps) -> Vec<Scenario> {
        let base = self.base_context.mode;
        let mut scenarios = vec![Scenario::new(base, steps)];
        let other = match base {
            AccountingMode::MonthlyLate => Some(AccountingMode::MonthlyEarly),
            AccountingMode::MonthlyEarly => Some(AccountingMode::MonthlyLate),
            AccountingMode::Yearly => None,
        };
        if let Some(mode) = other {
            scenarios.push(Scenario::new(mode, PipelineSteps::check_only()));
        }
        scenarios
    }

    pub fn context(&self) -> &RunContext {
        &self.base_context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::PeriodRecord;
    use approx::assert_relative_eq;

    #[test]
    fn test_late_and_early_side_by_side() {
        let ledger = Ledger::from_records(vec![
            PeriodRecord::new(0, 1000.0, 1000.0),
            PeriodRecord::new(1, 100.0, 1210.0),
        ]).unwrap();
        let runner = ScenarioRunner::new(RunContext::new("etf", AccountingMode::MonthlyLate, 1000.0));
        let scenarios = runner.booking_comparison(PipelineSteps::check_only());
        assert_eq!(scenarios.len(), 2);

        let reports = runner.run_scenarios(&ledger, &scenarios).unwrap();
        assert_eq!(reports[0].mode, AccountingMode::MonthlyLate);
        assert_relative_eq!(reports[0].final_rate().unwrap(), 0.11, epsilon = 1e-9);
        assert_eq!(reports[1].mode, AccountingMode::MonthlyEarly);
        assert_relative_eq!(reports[1].final_rate().unwrap(), 0.10, epsilon = 1e-9);
    }

    #[test]
    fn test_yearly_has_no_alternative() {
        let runner = ScenarioRunner::new(RunContext::new("etf-y", AccountingMode::Yearly, 0.0));
        assert_eq!(runner.booking_comparison(PipelineSteps::full()).len(), 1);
    }
}
