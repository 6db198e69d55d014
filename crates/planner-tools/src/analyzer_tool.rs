//! Adapter that exposes any [`Analyzer`] as a [`Tool`]

use planner_core::{Analyzer, PortfolioSnapshot, UserPreferences};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::{Result, Tool, ToolError};

/// Request accepted by every analyzer tool
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRequest {
    pub portfolio: Value,
    /// Missing or `null` means all preference defaults
    #[serde(default)]
    pub preferences: Option<Value>,
}

impl AnalysisRequest {
    /// Validate both halves of the request
    pub fn into_inputs(self) -> Result<(PortfolioSnapshot, UserPreferences)> {
        let snapshot = PortfolioSnapshot::from_value(self.portfolio)?;
        let preferences = match self.preferences {
            Some(Value::Null) | None => UserPreferences::default(),
            Some(value) => UserPreferences::from_value(value)?,
        };
        Ok((snapshot, preferences))
    }
}

/// Tool wrapper around an analyzer
pub struct AnalyzerTool<A> {
    analyzer: A,
}

impl<A: Analyzer> AnalyzerTool<A> {
    pub fn new(analyzer: A) -> Self {
        Self { analyzer }
    }
}

impl<A: Analyzer> Tool for AnalyzerTool<A> {
    fn execute(&self, params: Value) -> Result<Value> {
        let request: AnalysisRequest =
            serde_json::from_value(params).map_err(|e| ToolError::InvalidParameters {
                tool: self.name().to_string(),
                reason: e.to_string(),
            })?;
        let (snapshot, preferences) = request.into_inputs()?;

        debug!(
            tool = self.name(),
            accounts = snapshot.accounts.len(),
            positions = snapshot.position_count(),
            "Executing analyzer tool"
        );

        let report = self.analyzer.analyze(&snapshot, &preferences)?;
        Ok(serde_json::to_value(report)?)
    }

    fn name(&self) -> &str {
        self.analyzer.name()
    }

    fn description(&self) -> &str {
        self.analyzer.description()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "portfolio": {
                    "type": "object",
                    "description": "Portfolio snapshot: accounts with cash balances and positions",
                    "properties": {
                        "accounts": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "id": { "type": "string" },
                                    "name": { "type": "string" },
                                    "account_type": {
                                        "type": "string",
                                        "description": "taxable, tax_deferred, or any other tag"
                                    },
                                    "cash_balance": { "type": "number", "minimum": 0 },
                                    "positions": {
                                        "type": "array",
                                        "items": {
                                            "type": "object",
                                            "properties": {
                                                "symbol": { "type": "string" },
                                                "quantity": { "type": "number", "minimum": 0 },
                                                "cost_basis": { "type": "number", "minimum": 0 },
                                                "instrument": { "type": "object" }
                                            },
                                            "required": ["symbol"]
                                        }
                                    }
                                }
                            }
                        }
                    }
                },
                "preferences": {
                    "type": "object",
                    "description": "User preferences; omitted fields take their defaults"
                }
            },
            "required": ["portfolio"]
        })
    }
}
