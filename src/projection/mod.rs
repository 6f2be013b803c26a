//! IRR engine: cash-flow derivation, rate solving, consistency check and projection

mod state;
mod engine;
mod cashflows;
pub mod irr;
pub mod consistency;
pub mod projector;
pub mod twr;

pub use state::PortfolioState;
pub use engine::{
    Confidence, InterestSeries, IrrEngine, NonConvergencePolicy, PeriodRate, PipelineSteps, RateSource,
    RunContext, RunReport,
};
pub use cashflows::{initial_investment_for, CashFlowSeries, PeriodFlow};
pub use irr::{compound_growth, solve_compound_rate, solve_irr, CashFlowSolver, NewtonBisection, SolverConfig};
pub use consistency::{check_consistency, ConsistencyReport};
pub use projector::{project, Projection, ProjectionRow, ProjectionSettings};
pub use twr::time_weighted_returns;
