//! Portfolio state tracking for forward compounding

use crate::ledger::AccountingMode;

/// State of the account at a point in time during a forward replay or projection
#[derive(Debug, Clone, Copy)]
pub struct PortfolioState {
    /// Current period index
    pub period: u32,

    /// Contribution paid in during the current period
    pub contribution: f64,

    /// Portfolio value at the end of the current period
    pub portfolio: f64,

    /// Total money paid in so far
    pub cumulative_contribution: f64,
}

impl PortfolioState {
    pub fn new(period: u32, contribution: f64, portfolio: f64, cumulative_contribution: f64) -> Self {
        Self {
            period,
            contribution,
            portfolio,
            cumulative_contribution,
        }
    }

    /// Advance to the next period with a new contribution, compounding at `rate`
    pub fn advance(&mut self, mode: AccountingMode, rate: f64, contribution: f64) {
        self.period += 1;
        self.contribution = contribution;
        self.cumulative_contribution += contribution;
        self.portfolio = mode.step(self.portfolio, rate, contribution);
    }
}
