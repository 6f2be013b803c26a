//! Per-period cash-flow derivation for the IRR equation

use crate::ledger::{AccountingMode, Ledger};
use serde::{Deserialize, Serialize};

/// Derived cash-flow data for one regular period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodFlow {
    pub period_index: u32,

    /// New money paid in during the period
    pub contribution: f64,

    /// Outflow entering the IRR equation (negative contribution at risk).
    /// Placeholder 0.0 for the last period.
    pub net_cash_flow: f64,

    /// Portfolio value used as terminal inflow when solving up to this period
    pub cash_out_value: f64,

    /// Running sum of contributions including period 0
    pub cumulative_contribution: f64,

    /// Observed portfolio value
    pub total_value: f64,
}

impl PeriodFlow {
    /// No growth at all since inception: observed value equals money paid in
    pub fn is_flat(&self) -> bool {
        self.total_value == self.cumulative_contribution
    }
}

/// Ordered cash-flow series for one ledger under one accounting mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowSeries {
    pub mode: AccountingMode,
    flows: Vec<PeriodFlow>,
}

impl CashFlowSeries {
    /// Derive the series from a ledger, seeded by its period-0 row
    pub fn build(ledger: &Ledger, mode: AccountingMode) -> Self {
        Self::with_seed(ledger, mode, ledger.initial_investment())
    }

    /// Derive the series with seed capital supplied from outside the ledger
    pub fn with_seed(ledger: &Ledger, mode: AccountingMode, seed: f64) -> Self {
        let periods = ledger.periods();
        let mut cumulative = seed;
        let mut flows = Vec::with_capacity(periods.len());

        for (i, record) in periods.iter().enumerate() {
            cumulative += record.contribution;

            let cash_out_value = if mode.excludes_contribution_from_cash_out() {
                // new money arrives at period end and has not earned anything yet
                record.total_value - record.contribution
            } else {
                record.total_value
            };

            let net_cash_flow = match periods.get(i + 1) {
                Some(next) if mode.books_early() => -next.contribution,
                Some(_) => -record.contribution,
                None => 0.0,
            };

            flows.push(PeriodFlow {
                period_index: record.period_index,
                contribution: record.contribution,
                net_cash_flow,
                cash_out_value,
                cumulative_contribution: cumulative,
                total_value: record.total_value,
            });
        }

        Self { mode, flows }
    }

    pub fn flows(&self) -> &[PeriodFlow] {
        &self.flows
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn last(&self) -> Option<&PeriodFlow> {
        self.flows.last()
    }

    /// Cash flows for the solve ending at position `index`, with the final
    /// entry replaced by that period's cash-out value
    pub fn solve_prefix(&self, index: usize) -> Vec<(u32, f64)> {
        let mut prefix: Vec<(u32, f64)> = self.flows[..=index]
            .iter()
            .map(|f| (f.period_index, f.net_cash_flow))
            .collect();
        if let Some(last) = prefix.last_mut() {
            last.1 = self.flows[index].cash_out_value;
        }
        prefix
    }

    /// Contributions of all regular periods
    pub fn contributions(&self) -> Vec<f64> {
        self.flows.iter().map(|f| f.contribution).collect()
    }
}

/// Seed capital for the IRR equation.
/// Under early booking the first regular contribution is pulled forward into the seed.
pub fn initial_investment_for(seed: f64, series: &CashFlowSeries) -> f64 {
    match series.flows().first() {
        Some(first) if series.mode.books_early() => seed + first.contribution,
        _ => seed,
    }
}
