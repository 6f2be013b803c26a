//! Extrapolate contributions and portfolio value at the last solved rate

use super::cashflows::CashFlowSeries;
use super::irr::{compound_growth, round_to};
use super::state::PortfolioState;
use serde::{Deserialize, Serialize};

/// Projection horizon and contribution growth
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSettings {
    /// Number of future periods to project
    pub years: u32,

    /// Per-period growth of the contribution (1.05 = +5% per period)
    pub contribution_growth_factor: f64,

    /// Decimal places of projected contributions (currency minor unit)
    pub contribution_precision: u32,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            years: 10,
            contribution_growth_factor: 1.0,
            contribution_precision: 2,
        }
    }
}

/// One row of the projection table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRow {
    pub period: u32,
    pub contribution: f64,
    pub projected_value: f64,
    pub cumulative_contribution: f64,
}

impl From<&PortfolioState> for ProjectionRow {
    fn from(state: &PortfolioState) -> Self {
        Self {
            period: state.period,
            contribution: state.contribution,
            projected_value: state.portfolio,
            cumulative_contribution: state.cumulative_contribution,
        }
    }
}

/// Complete projection: anchor row followed by one row per projected period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projection {
    /// Rate the projection was compounded at
    pub rate: f64,
    pub rows: Vec<ProjectionRow>,
    /// Closed-form value of the projected contributions alone over the horizon
    pub closed_form_contribution_value: f64,
}

impl Projection {
    /// The as-of row taken from the last real period
    pub fn anchor(&self) -> Option<&ProjectionRow> {
        self.rows.first()
    }

    /// Rows strictly after the anchor
    pub fn projected(&self) -> &[ProjectionRow] {
        self.rows.get(1..).unwrap_or(&[])
    }

    pub fn final_value(&self) -> Option<f64> {
        self.rows.last().map(|r| r.projected_value)
    }
}

/// Project the series forward; `None` when the ledger has no regular period to anchor on
pub fn project(series: &CashFlowSeries, rate: f64, settings: &ProjectionSettings) -> Option<Projection> {
    let last = series.last()?;
    let mode = series.mode;

    let mut state = PortfolioState::new(
        last.period_index,
        last.contribution,
        last.total_value,
        last.cumulative_contribution,
    );

    let mut rows = Vec::with_capacity(settings.years as usize + 1);
    rows.push(ProjectionRow::from(&state));

    let mut contributions = Vec::with_capacity(settings.years as usize);
    for _ in 0..settings.years {
        let contribution = round_to(
            state.contribution * settings.contribution_growth_factor,
            settings.contribution_precision,
        );
        state.advance(mode, rate, contribution);
        contributions.push(contribution);
        rows.push(ProjectionRow::from(&state));
    }

    log::info!(
        "Projected {} periods at {:.5}: final value {:.2}",
        settings.years,
        rate,
        state.portfolio
    );

    Some(Projection {
        rate,
        rows,
        closed_form_contribution_value: compound_growth(&contributions, 1.0 + rate),
    })
}
