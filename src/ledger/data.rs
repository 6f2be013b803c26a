//! Ledger data structures matching the savings sheet format

use crate::error::{FundError, FundResult};
use serde::{Deserialize, Serialize};

/// One reporting period of the savings sheet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodRecord {
    /// Period index (0 = initial lump sum)
    pub period_index: u32,
    /// New money paid in during the period
    pub contribution: f64,
    /// Observed portfolio value at the end of the period
    pub total_value: f64,
}

impl PeriodRecord {
    pub fn new(period_index: u32, contribution: f64, total_value: f64) -> Self {
        Self {
            period_index,
            contribution,
            total_value,
        }
    }

    /// Whether this is the period-0 seed record
    pub fn is_initial(&self) -> bool {
        self.period_index == 0
    }
}

/// Booking convention for contributions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountingMode {
    /// Monthly cadence, contributions booked at period end
    MonthlyLate,
    /// Monthly cadence, contributions booked at period start
    MonthlyEarly,
    /// Yearly cadence, contributions booked at period end
    Yearly,
}

impl AccountingMode {
    /// Derive the mode from the sheet naming convention.
    /// A `-y` marker in the identifier selects yearly cadence.
    pub fn from_ledger_id(ledger_id: &str, early_booking: bool) -> Self {
        if ledger_id.contains("-y") {
            AccountingMode::Yearly
        } else if early_booking {
            AccountingMode::MonthlyEarly
        } else {
            AccountingMode::MonthlyLate
        }
    }

    /// New money starts compounding in the period it is declared
    pub fn books_early(&self) -> bool {
        matches!(self, AccountingMode::MonthlyEarly)
    }

    /// Whether the period's own contribution is removed from the cash-out value
    pub fn excludes_contribution_from_cash_out(&self) -> bool {
        !self.books_early()
    }

    /// Advance a portfolio value by one period at `rate` with a new `contribution`
    pub fn step(&self, portfolio: f64, rate: f64, contribution: f64) -> f64 {
        if self.books_early() {
            (portfolio + contribution) * (1.0 + rate)
        } else {
            portfolio * (1.0 + rate) + contribution
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AccountingMode::MonthlyLate => "monthly, late booking",
            AccountingMode::MonthlyEarly => "monthly, early booking",
            AccountingMode::Yearly => "yearly",
        }
    }
}

/// Normalized savings ledger: the optional seed record plus the regular periods
#[derive(Debug, Clone, Default, Serialize)]
pub struct Ledger {
    initial: Option<PeriodRecord>,
    periods: Vec<PeriodRecord>,
}

impl Ledger {
    /// Build a ledger from records in strictly ascending period order.
    ///
    /// A period-0 record is the seed only when it comes first.
    pub fn from_records(records: Vec<PeriodRecord>) -> FundResult<Self> {
        if let Some(pair) = records.windows(2).find(|w| w[1].period_index <= w[0].period_index) {
            return Err(FundError::InvalidInput(format!(
                "period {} does not follow period {}",
                pair[1].period_index, pair[0].period_index
            )));
        }

        let mut records = records.into_iter().peekable();
        let initial = records.next_if(|r| r.is_initial());
        Ok(Self {
            initial,
            periods: records.collect(),
        })
    }

    /// The period-0 record, if the sheet has one
    pub fn initial_record(&self) -> Option<&PeriodRecord> {
        self.initial.as_ref()
    }

    /// Regular (return-bearing) periods in ascending order
    pub fn periods(&self) -> &[PeriodRecord] {
        &self.periods
    }

    /// Seed capital from the period-0 row (0 when absent)
    pub fn initial_investment(&self) -> f64 {
        self.initial.map(|r| r.contribution).unwrap_or(0.0)
    }

    /// Index of the last reported period
    pub fn current_period(&self) -> Option<u32> {
        self.periods
            .last()
            .or(self.initial.as_ref())
            .map(|r| r.period_index)
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}
