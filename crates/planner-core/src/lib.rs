//! Core portfolio model and abstractions for planner-rs
//!
//! This crate defines the portfolio snapshot consumed by every analyzer, the
//! user preference record, the policy tables the formulas read from, and the
//! [`Analyzer`] trait that concrete analyzers implement.

pub mod allocation;
pub mod analyzer;
pub mod error;
pub mod numeric;
pub mod policy;
pub mod portfolio;
pub mod preferences;

pub use allocation::{asset_class_values, current_allocation};
pub use analyzer::Analyzer;
pub use error::{Error, Result};
pub use policy::AssetClass;
pub use portfolio::{Account, AccountType, AllocationMap, Instrument, PortfolioSnapshot, Position};
pub use preferences::UserPreferences;
