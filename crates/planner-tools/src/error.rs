//! Error types for tool dispatch

use thiserror::Error;

/// Result type alias for tool execution
pub type Result<T> = std::result::Result<T, ToolError>;

/// Errors raised while dispatching or executing a tool
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The request did not have the shape the tool expects
    #[error("Invalid parameters for {tool}: {reason}")]
    InvalidParameters { tool: String, reason: String },

    #[error(transparent)]
    Analysis(#[from] planner_core::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
