//! Configuration management utilities

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Unknown log format: {0} (expected text or json)")]
    UnknownLogFormat(String),
}

impl ConfigError {
    fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnknownLogFormat(other.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Json => "json",
        })
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Application name
    pub app_name: String,
    /// Environment (dev, prod, etc.)
    pub environment: String,
    pub log_format: LogFormat,
    /// Flat cost charged per rebalancing trade
    pub cost_per_trade: f64,
    /// Confidence level for Value-at-Risk
    pub var_confidence: f64,
    /// Years covered by the withdrawal plan
    pub withdrawal_years: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "planner-rs".to_string(),
            environment: "development".to_string(),
            log_format: LogFormat::Text,
            cost_per_trade: 0.0,
            var_confidence: 0.95,
            withdrawal_years: 10,
        }
    }
}

impl Config {
    /// Create a new configuration builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Apply `PLANNER_*` environment overrides
    pub fn with_env(self) -> Result<Self> {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(environment) = lookup("PLANNER_ENV") {
            self.environment = environment;
        }
        if let Some(format) = lookup("PLANNER_LOG_FORMAT") {
            self.log_format = format.parse()?;
        }
        if let Some(cost) = lookup("PLANNER_COST_PER_TRADE") {
            self.cost_per_trade = parse_var("PLANNER_COST_PER_TRADE", &cost)?;
        }
        if let Some(confidence) = lookup("PLANNER_VAR_CONFIDENCE") {
            self.var_confidence = parse_var("PLANNER_VAR_CONFIDENCE", &confidence)?;
        }
        if let Some(years) = lookup("PLANNER_WITHDRAWAL_YEARS") {
            self.withdrawal_years = parse_var("PLANNER_WITHDRAWAL_YEARS", &years)?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.cost_per_trade.is_finite() || self.cost_per_trade < 0.0 {
            return Err(ConfigError::invalid(
                "cost_per_trade",
                "must be a non-negative number",
            ));
        }

        if !(self.var_confidence > 0.0 && self.var_confidence < 1.0) {
            return Err(ConfigError::invalid(
                "var_confidence",
                "must be between 0 and 1 (exclusive)",
            ));
        }

        if self.withdrawal_years == 0 {
            return Err(ConfigError::invalid(
                "withdrawal_years",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid(key, e.to_string()))
}

/// Builder for Config
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    app_name: Option<String>,
    environment: Option<String>,
    log_format: Option<LogFormat>,
    cost_per_trade: Option<f64>,
    var_confidence: Option<f64>,
    withdrawal_years: Option<u32>,
}

impl ConfigBuilder {
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.log_format = Some(format);
        self
    }

    /// Set the flat cost per trade
    pub fn cost_per_trade(mut self, cost: f64) -> Self {
        self.cost_per_trade = Some(cost);
        self
    }

    /// Set the Value-at-Risk confidence level
    pub fn var_confidence(mut self, confidence: f64) -> Self {
        self.var_confidence = Some(confidence);
        self
    }

    /// Set the withdrawal plan length
    pub fn withdrawal_years(mut self, years: u32) -> Self {
        self.withdrawal_years = Some(years);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<Config> {
        let defaults = Config::default();

        let config = Config {
            app_name: self.app_name.unwrap_or(defaults.app_name),
            environment: self.environment.unwrap_or(defaults.environment),
            log_format: self.log_format.unwrap_or(defaults.log_format),
            cost_per_trade: self.cost_per_trade.unwrap_or(defaults.cost_per_trade),
            var_confidence: self.var_confidence.unwrap_or(defaults.var_confidence),
            withdrawal_years: self.withdrawal_years.unwrap_or(defaults.withdrawal_years),
        };

        config.validate()?;
        Ok(config)
    }
}
