//! Core Analyzer trait definition

use serde::Serialize;

use crate::{PortfolioSnapshot, Result, UserPreferences};

/// Core trait that all portfolio analyzers implement
///
/// An analyzer is a pure function of its inputs: it holds only its own policy
/// values, never mutates the snapshot and keeps no state between calls, so
/// calling it twice with the same arguments yields identical reports.
pub trait Analyzer: Send + Sync {
    /// Metrics bundle produced by this analyzer
    type Report: Serialize;

    /// Stable identifier, used as the tool name
    fn name(&self) -> &'static str;

    /// One-line summary of what the analyzer reports
    fn description(&self) -> &'static str;

    /// Produce a complete report, or fail the whole call
    fn analyze(
        &self,
        snapshot: &PortfolioSnapshot,
        preferences: &UserPreferences,
    ) -> Result<Self::Report>;
}
