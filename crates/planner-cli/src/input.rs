//! Loading request files from disk

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use planner_core::{PortfolioSnapshot, UserPreferences};
use serde_json::Value;

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Load and validate a portfolio snapshot
pub fn load_snapshot(path: &Path) -> Result<PortfolioSnapshot> {
    let json = read(path)?;
    PortfolioSnapshot::from_json(&json)
        .with_context(|| format!("Invalid portfolio in {}", path.display()))
}

/// Load and validate preferences, or use the defaults when no file is given
pub fn load_preferences(path: Option<&Path>) -> Result<UserPreferences> {
    let Some(path) = path else {
        return Ok(UserPreferences::default());
    };
    let json = read(path)?;
    UserPreferences::from_json(&json)
        .with_context(|| format!("Invalid preferences in {}", path.display()))
}

/// Load an arbitrary JSON document
pub fn load_json(path: &Path) -> Result<Value> {
    let json = read(path)?;
    serde_json::from_str(&json).with_context(|| format!("Invalid JSON in {}", path.display()))
}
