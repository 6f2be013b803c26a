//! Savings ledger data structures and sheet loading

mod data;
pub mod loader;

pub use data::{AccountingMode, Ledger, PeriodRecord};
pub use loader::{load_ledger, load_ledger_from_reader, DEFAULT_DELIMITER};
