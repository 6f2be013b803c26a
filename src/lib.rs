//! Fund IRR - realized return and growth projection for periodically funded accounts
//!
//! This library provides:
//! - Savings ledger loading from delimited sheets
//! - Cash-flow derivation under late, early and yearly booking conventions
//! - Per-period internal rate of return solving
//! - Consistency check of the solved rate by forward compounding
//! - Projection of contributions and portfolio value
//! - Time-weighted returns and a closed-form compounding estimate

pub mod error;
pub mod ledger;
pub mod projection;
pub mod config;
pub mod export;
pub mod scenario;

// Re-export commonly used types
pub use error::{FundError, FundResult};
pub use ledger::{AccountingMode, Ledger, PeriodRecord};
pub use projection::{IrrEngine, PipelineSteps, RunContext, RunReport};
pub use config::Parameters;
pub use scenario::{Scenario, ScenarioRunner};
