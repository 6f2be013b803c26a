//! Time-weighted rate of return

use super::cashflows::PeriodFlow;

/// Geometric-mean per-period time-weighted return after each period.
///
/// Leading periods without any invested value are skipped. Each later
/// period's return is its value before the new contribution divided by the
/// previous period's value, so contributions do not count as performance.
pub fn time_weighted_returns(flows: &[PeriodFlow]) -> Vec<f64> {
    let Some(start) = flows.iter().position(|f| f.total_value - f.contribution != 0.0) else {
        return Vec::new();
    };

    let mut chained = 1.0;
    let mut previous_value = flows[start].total_value;
    let mut returns = Vec::with_capacity(flows.len() - start - 1);

    for (count, flow) in flows[start + 1..].iter().enumerate() {
        chained *= (flow.total_value - flow.contribution) / previous_value;
        previous_value = flow.total_value;
        returns.push(chained.powf(1.0 / (count + 1) as f64) - 1.0);
    }

    returns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{AccountingMode, Ledger, PeriodRecord};
    use crate::projection::cashflows::CashFlowSeries;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_growth() {
        let ledger = Ledger::from_records(vec![
            PeriodRecord::new(0, 1000.0, 1000.0),
            PeriodRecord::new(1, 100.0, 1150.0),
            PeriodRecord::new(2, 100.0, 1307.5),
            PeriodRecord::new(3, 100.0, 1472.875),
        ]).unwrap();
        let series = CashFlowSeries::build(&ledger, AccountingMode::MonthlyLate);
        let returns = time_weighted_returns(series.flows());
        assert_eq!(returns.len(), 2);
        assert_relative_eq!(returns[0], 0.05, epsilon = 1e-12);
        assert_relative_eq!(returns[1], 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_skips_empty_leading_periods() {
        let ledger = Ledger::from_records(vec![
            PeriodRecord::new(1, 100.0, 100.0),
            PeriodRecord::new(2, 100.0, 200.0),
            PeriodRecord::new(3, 100.0, 320.0),
            PeriodRecord::new(4, 0.0, 288.0),
        ]).unwrap();
        let series = CashFlowSeries::build(&ledger, AccountingMode::MonthlyLate);
        let returns = time_weighted_returns(series.flows());
        // start at period 2 (100 invested), then 220/200 = 1.1, then 288/320 = 0.9
        assert_eq!(returns.len(), 2);
        assert_relative_eq!(returns[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(returns[1], (1.1f64 * 0.9).sqrt() - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_no_invested_value() {
        let ledger = Ledger::from_records(vec![PeriodRecord::new(1, 100.0, 100.0)]).unwrap();
        let series = CashFlowSeries::build(&ledger, AccountingMode::MonthlyLate);
        assert!(time_weighted_returns(series.flows()).is_empty());
    }
}
