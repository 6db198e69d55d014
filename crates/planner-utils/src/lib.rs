//! Shared utilities for planner-rs
//!
//! Logging setup and the runtime configuration that the CLI and tool layer
//! feed into the analyzers.

pub mod config;
pub mod logging;

pub use config::{Config, ConfigBuilder, ConfigError, LogFormat};
pub use logging::{init_tracing, init_tracing_with};
