//! Internal Rate of Return (IRR) calculation
//!
//! Solves the savings-plan equation
//!
//! `Σ_{k=1..n} cf_k / r^k = initial_investment`
//!
//! for the per-period growth multiplier `r`, where the last cash flow is the
//! cash-out value of the period being solved and the others are (negative)
//! contributions. The reported rate is `r - 1`.

use crate::error::{FundError, FundResult};

/// Decimal places kept on solved multipliers
pub const DECIMAL_PRECISION: u32 = 5;

/// Seed used when outflows exceed the terminal value (losing or low-growth account)
pub const LOW_SEED: f64 = 0.9;

/// Seed used otherwise
pub const HIGH_SEED: f64 = 1.1;

/// Initial factor by which the fallback bracket widens around the seed
const BRACKET_STEP: f64 = 1.05;

/// Configuration for the root-finder
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    /// Convergence tolerance on the multiplier
    pub tolerance: f64,
    /// Iteration cap for each phase (Newton, bracket search, bisection)
    pub max_iterations: u32,
    /// Outer limits for the multiplier; Newton iterates and the bracket stay inside
    pub bracket: (f64, f64),
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iterations: 200,
            bracket: (0.01, 10.0),
        }
    }
}

/// Root-finder gave up
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveFailure {
    pub iterations: u32,
    pub residual: f64,
}

/// Capability to solve a one-dimensional equation with a single root from a seed.
///
/// Any univariate root-finder honouring that contract can be plugged into the engine.
pub trait CashFlowSolver: Send + Sync {
    /// Find `x` with `f(x) = 0`, given the derivative `df` and a starting point
    fn find_root<F, D>(&self, f: F, df: D, seed: f64) -> Result<f64, SolveFailure>
    where
        F: Fn(f64) -> f64,
        D: Fn(f64) -> f64;

    fn name(&self) -> &'static str;
}

/// Newton-Raphson from the seed, falling back to bisection on a bracket grown around it
#[derive(Debug, Clone, Copy, Default)]
pub struct NewtonBisection {
    pub config: SolverConfig,
}

impl NewtonBisection {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }
}

impl CashFlowSolver for NewtonBisection {
    fn find_root<F, D>(&self, f: F, df: D, seed: f64) -> Result<f64, SolveFailure>
    where
        F: Fn(f64) -> f64,
        D: Fn(f64) -> f64,
    {
        let tolerance = self.config.tolerance;
        let (min, max) = self.config.bracket;
        let mut r = seed;
        let mut fx = f(r);

        for _ in 0..self.config.max_iterations {
            let dfx = df(r);

            if !fx.is_finite() || !dfx.is_finite() || dfx.abs() < 1e-20 {
                // Derivative unusable, try bisection instead
                break;
            }

            let next = r - fx / dfx;

            if !next.is_finite() || next < min || next > max {
                break;
            }

            if (next - r).abs() < tolerance * r.abs().max(1.0) {
                return Ok(next);
            }

            // Step moved away from the root
            let f_next = f(next);
            if !(f_next.abs() <= fx.abs()) {
                break;
            }

            r = next;
            fx = f_next;
        }

        log::debug!("Newton did not converge from seed {}, falling back to bisection", seed);
        let bracket = expand_bracket(&f, seed, &self.config)?;
        bisection(&f, bracket, &self.config)
    }

    fn name(&self) -> &'static str {
        "Newton-Raphson (bisection fallback)"
    }
}

/// One end of a bracket under construction
#[derive(Debug, Clone, Copy)]
struct Edge {
    x: f64,
    fx: f64,
    step: f64,
}

impl Edge {
    fn new(x: f64, fx: f64) -> Self {
        Self { x, fx, step: BRACKET_STEP }
    }

    /// Move one step towards `limit`. The step squares after every move and
    /// shrinks back when the next point does not evaluate to a finite value.
    /// Returns false once the edge cannot move any further.
    fn advance<F: Fn(f64) -> f64>(&mut self, f: &F, limit: f64) -> bool {
        if self.x == limit || self.step <= 1.0 + 1e-12 {
            return false;
        }

        let candidate = if limit < self.x {
            (self.x / self.step).max(limit)
        } else {
            (self.x * self.step).min(limit)
        };

        let value = f(candidate);
        if value.is_finite() {
            self.x = candidate;
            self.fx = value;
            self.step *= self.step;
        } else {
            self.step = self.step.sqrt();
        }
        true
    }
}

fn straddles(low: &Edge, high: &Edge) -> bool {
    low.fx == 0.0 || high.fx == 0.0 || low.fx.signum() != high.fx.signum()
}

/// Widen an interval around the seed until `f` changes sign across it.
///
/// Both ends move geometrically inside the configured limits, so long cash-flow
/// series never get evaluated where `r^k` leaves the floating-point range.
fn expand_bracket<F: Fn(f64) -> f64>(
    f: &F,
    seed: f64,
    config: &SolverConfig,
) -> Result<(Edge, Edge), SolveFailure> {
    let (min, max) = config.bracket;
    let start = seed.clamp(min, max);
    let f_start = f(start);
    if !f_start.is_finite() {
        return Err(SolveFailure {
            iterations: 0,
            residual: f_start.abs(),
        });
    }

    let mut low = Edge::new(start, f_start);
    let mut high = Edge::new(start, f_start);

    for _ in 0..config.max_iterations {
        if straddles(&low, &high) {
            return Ok((low, high));
        }
        let moved_down = low.advance(f, min);
        let moved_up = high.advance(f, max);
        if !moved_down && !moved_up {
            break;
        }
    }

    if straddles(&low, &high) {
        return Ok((low, high));
    }

    Err(SolveFailure {
        iterations: config.max_iterations,
        residual: low.fx.abs().min(high.fx.abs()),
    })
}

/// Fallback bracketing solve
fn bisection<F: Fn(f64) -> f64>(f: &F, bracket: (Edge, Edge), config: &SolverConfig) -> Result<f64, SolveFailure> {
    let (lower, upper) = bracket;
    if lower.fx == 0.0 {
        return Ok(lower.x);
    }
    if upper.fx == 0.0 {
        return Ok(upper.x);
    }

    let (mut low, mut high) = (lower.x, upper.x);
    let mut f_low = lower.fx;

    for _ in 0..config.max_iterations {
        let mid = (low + high) / 2.0;
        let f_mid = f(mid);

        if f_mid == 0.0 || (high - low) / 2.0 < config.tolerance {
            return Ok(mid);
        }

        if f_mid.signum() != f_low.signum() {
            high = mid;
        } else {
            low = mid;
            f_low = f_mid;
        }
    }

    Err(SolveFailure {
        iterations: config.max_iterations,
        residual: f((low + high) / 2.0).abs(),
    })
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Pick the starting multiplier for a cash-flow prefix.
///
/// If the contributions (all entries but the last) outweigh the terminal value
/// the account is losing or barely growing, so start below 1.
pub fn select_seed(cash_flows: &[(u32, f64)]) -> f64 {
    let Some((&(_, terminal), contributions)) = cash_flows.split_last() else {
        return HIGH_SEED;
    };
    let outflow: f64 = contributions.iter().map(|(_, cf)| cf.abs()).sum();
    if outflow > terminal {
        LOW_SEED
    } else {
        HIGH_SEED
    }
}

/// Discounted value of the cash flows and its derivative at multiplier `r`
fn weighted_cashflow_and_derivative(cash_flows: &[(u32, f64)], r: f64) -> (f64, f64) {
    let mut value = 0.0;
    let mut derivative = 0.0;

    for (position, &(_, cf)) in cash_flows.iter().enumerate() {
        let k = (position + 1) as i32;
        value += cf / r.powi(k);
        derivative -= k as f64 * cf / r.powi(k + 1);
    }

    (value, derivative)
}

/// Solve the per-period IRR with the default solver
pub fn solve_irr(cash_flows: &[(u32, f64)], initial_investment: f64) -> FundResult<f64> {
    solve_irr_with(&NewtonBisection::default(), cash_flows, initial_investment)
}

/// Solve the per-period IRR for a prefix whose last entry already holds the cash-out value.
///
/// Returns the rate (`r - 1`) with the multiplier rounded to [`DECIMAL_PRECISION`] places.
pub fn solve_irr_with<S: CashFlowSolver>(
    solver: &S,
    cash_flows: &[(u32, f64)],
    initial_investment: f64,
) -> FundResult<f64> {
    let Some(&(period, _)) = cash_flows.last() else {
        return Err(FundError::InvalidInput("cannot solve IRR of an empty cash-flow series".into()));
    };

    let seed = select_seed(cash_flows);
    let f = |r: f64| weighted_cashflow_and_derivative(cash_flows, r).0 - initial_investment;
    let df = |r: f64| weighted_cashflow_and_derivative(cash_flows, r).1;

    let multiplier = solver
        .find_root(f, df, seed)
        .map_err(|failure| FundError::NonConvergence {
            period,
            iterations: failure.iterations,
            residual: failure.residual,
        })?;

    log::trace!("Period {}: multiplier {:.8} from seed {} ({})", period, multiplier, seed, solver.name());
    Ok(round_to(multiplier - 1.0, DECIMAL_PRECISION))
}

/// Closed-form value of a contribution history compounded at a constant multiplier `r`.
///
/// Contribution `k` of `n` grows for `n - k` periods and receives a half-period
/// correction `½·c·(r-1)·r^(n-k)` for mid-period arrival.
pub fn compound_growth(contributions: &[f64], r: f64) -> f64 {
    let n = contributions.len();
    contributions
        .iter()
        .enumerate()
        .map(|(k, &c)| {
            let growth = r.powi((n - k - 1) as i32);
            c * growth + 0.5 * c * (r - 1.0) * growth
        })
        .sum()
}

fn compound_growth_derivative(contributions: &[f64], r: f64) -> f64 {
    let n = contributions.len();
    contributions
        .iter()
        .enumerate()
        .map(|(k, &c)| {
            let m = (n - k - 1) as i32;
            let dgrowth = if m == 0 { 0.0 } else { m as f64 * r.powi(m - 1) };
            c * dgrowth * (1.0 + 0.5 * (r - 1.0)) + 0.5 * c * r.powi(m)
        })
        .sum()
}

/// Constant rate at which the closed form reproduces `value`.
///
/// Alternate estimator to the IRR; `None` if no solution is found.
pub fn solve_compound_rate(contributions: &[f64], value: f64) -> Option<f64> {
    if contributions.is_empty() || contributions.iter().all(|c| c.abs() < 1e-10) {
        return None;
    }

    let f = |r: f64| compound_growth(contributions, r) - value;
    let df = |r: f64| compound_growth_derivative(contributions, r);

    NewtonBisection::default()
        .find_root(f, df, HIGH_SEED)
        .ok()
        .map(|r| round_to(r - 1.0, DECIMAL_PRECISION))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_period_matches_closed_form() {
        // 1000 seed, 100 paid in at period end, 1210 observed => cash-out 1110
        let rate = solve_irr(&[(1, 1110.0)], 1000.0).unwrap();
        assert_relative_eq!(rate, 0.11, epsilon = 1e-9);

        // early booking: 1100 seed, 1210 observed
        let rate = solve_irr(&[(1, 1210.0)], 1100.0).unwrap();
        assert_relative_eq!(rate, 0.10, epsilon = 1e-9);
    }

    #[test]
    fn test_losing_single_period() {
        let rate = solve_irr(&[(1, 900.0)], 1000.0).unwrap();
        assert_relative_eq!(rate, -0.10, epsilon = 1e-9);
    }

    #[test]
    fn test_two_period_five_percent() {
        // 1000 * 1.05 + 100 = 1150; 1150 * 1.05 + 100 = 1307.5 (late booking)
        let flows = [(1, -100.0), (2, 1207.5)];
        let rate = solve_irr(&flows, 1000.0).unwrap();
        assert_relative_eq!(rate, 0.05, epsilon = 1e-9);
    }

    #[test]
    fn test_rate_is_stored_rounded() {
        assert_eq!(solve_irr(&[(1, 1050.0)], 1000.0).unwrap(), 0.05);
        assert_eq!(solve_irr(&[(1, 1234.5678)], 1000.0).unwrap(), 0.23457);
    }

    #[test]
    fn test_long_monthly_series() {
        // 1000 seed, 100 paid in at every period end, 0.5% per period
        for n in [155u32, 300, 480] {
            let mut value = 1000.0;
            for _ in 0..n {
                value = value * 1.005 + 100.0;
            }
            let mut flows: Vec<(u32, f64)> = (1..n).map(|k| (k, -100.0)).collect();
            flows.push((n, value - 100.0));

            // the high seed lies where the equation rises with r
            assert_eq!(select_seed(&flows), HIGH_SEED);
            let rate = solve_irr(&flows, 1000.0).unwrap();
            assert_eq!(rate, 0.005, "n = {}", n);
        }
    }

    #[test]
    fn test_bracket_avoids_overflow() {
        // 1/r^400 leaves the f64 range for r below ~0.17
        let mut flows: Vec<(u32, f64)> = (1..400).map(|k| (k, -10.0)).collect();
        flows.push((400, 50.0));
        let rate = solve_irr(&flows, 100.0).unwrap();
        assert!(rate < 0.0 && rate > -1.0, "Expected a loss, got {}", rate);
    }

    #[test]
    fn test_seed_selection() {
        // outflows 1000 exceed terminal 900
        assert_eq!(select_seed(&[(1, -500.0), (2, -500.0), (3, 900.0)]), LOW_SEED);
        // terminal dominates
        assert_eq!(select_seed(&[(1, -100.0), (2, 1207.5)]), HIGH_SEED);
        // single entry: nothing flows out
        assert_eq!(select_seed(&[(1, 1110.0)]), HIGH_SEED);
    }

    #[test]
    fn test_low_seed_scenario_solves() {
        // 1000 seed, 500 paid in twice, only 900 left after three periods
        let flows = [(1, -500.0), (2, -500.0), (3, 900.0)];
        let rate = solve_irr(&flows, 1000.0).unwrap();
        assert!(rate < 0.0 && rate > -1.0, "Expected a loss, got {}", rate);

        let r = 1.0 + rate;
        let residual = -500.0 / r - 500.0 / r.powi(2) + 900.0 / r.powi(3) - 1000.0;
        // multiplier rounded to 5 places
        assert!(residual.abs() < 1.0, "residual {}", residual);
    }

    #[test]
    fn test_result_is_rounded() {
        let rate = solve_irr(&[(1, 1234.5678)], 1000.0).unwrap();
        assert_relative_eq!(rate, 0.23457, epsilon = 1e-12);
    }

    #[test]
    fn test_non_convergence_is_reported() {
        // no inflow at all: no multiplier balances the equation
        let flows = [(1, -100.0), (7, -50.0)];
        match solve_irr(&flows, 1000.0) {
            Err(FundError::NonConvergence { period, .. }) => assert_eq!(period, 7),
            other => panic!("Expected NonConvergence, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_series_rejected() {
        assert!(matches!(solve_irr(&[], 1000.0), Err(FundError::InvalidInput(_))));
    }

    #[test]
    fn test_bisection_fallback() {
        let solver = NewtonBisection::new(SolverConfig {
            max_iterations: 1,
            ..Default::default()
        });
        // one Newton step is not enough, bisection cap of 1 is not either
        assert!(solver.find_root(|x| x * x - 2.0, |x| 2.0 * x, 1.1).is_err());

        let solver = NewtonBisection::new(SolverConfig {
            max_iterations: 100,
            ..Default::default()
        });
        let root = solver.find_root(|x| x * x - 2.0, |_| 0.0, 1.1).unwrap();
        assert_relative_eq!(root, std::f64::consts::SQRT_2, epsilon = 1e-10);
    }

    #[test]
    fn test_compound_growth() {
        assert_relative_eq!(compound_growth(&[100.0], 1.1), 105.0, epsilon = 1e-9);
        assert_relative_eq!(compound_growth(&[100.0, 100.0], 1.1), 220.5, epsilon = 1e-9);
        // no growth: value equals money paid in
        assert_relative_eq!(compound_growth(&[100.0, 250.0, 50.0], 1.0), 400.0, epsilon = 1e-9);
    }

    #[test]
    fn test_solve_compound_rate() {
        let rate = solve_compound_rate(&[100.0, 100.0], 220.5).unwrap();
        assert_relative_eq!(rate, 0.10, epsilon = 1e-9);
        assert!(solve_compound_rate(&[], 100.0).is_none());
        assert!(solve_compound_rate(&[0.0, 0.0], 100.0).is_none());
    }
}
