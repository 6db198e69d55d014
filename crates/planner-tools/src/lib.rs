//! Tool management and execution framework for planner-rs
//!
//! Every analyzer is exposed as a [`Tool`]: a named operation that accepts a
//! JSON request and returns its report as JSON. The [`ToolRegistry`] looks
//! tools up by name so callers (the CLI, or any JSON transport) can dispatch
//! requests without knowing the concrete analyzer types.

pub mod analyzer_tool;
pub mod error;
pub mod registry;
pub mod tool;

pub use analyzer_tool::{AnalysisRequest, AnalyzerTool};
pub use error::{Result, ToolError};
pub use registry::{ToolRegistry, default_registry};
pub use tool::Tool;
