//! Tool registry for managing available tools

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use planner_analytics::{Rebalancer, RiskAnalyzer, TaxOptimizer};
use planner_utils::Config;
use serde_json::Value;
use tracing::{debug, info};

use crate::{AnalyzerTool, Result, Tool, ToolError};

/// Registry for managing tools
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
        }
    }
}

impl ToolRegistry {
    /// Create a new tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&self, tool: Arc<dyn Tool>) {
        let mut tools = self.tools.write().unwrap_or_else(PoisonError::into_inner);
        debug!(tool = tool.name(), "Registering tool");
        tools.insert(tool.name().to_string(), tool);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        tools.get(name).cloned()
    }

    /// List all registered tools, sorted by name
    pub fn list_tools(&self) -> Vec<Arc<dyn Tool>> {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        let mut list: Vec<_> = tools.values().cloned().collect();
        list.sort_by(|a, b| a.name().cmp(b.name()));
        list
    }

    /// Execute a tool by name
    pub fn execute(&self, name: &str, params: Value) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        info!(tool = name, "Executing tool");
        tool.execute(params)
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        tools.is_empty()
    }
}

/// Registry holding the three portfolio analyzers, configured from `config`
pub fn default_registry(config: &Config) -> ToolRegistry {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(AnalyzerTool::new(Rebalancer::new(
        config.cost_per_trade,
    ))));
    registry.register(Arc::new(AnalyzerTool::new(RiskAnalyzer::new(
        config.var_confidence,
    ))));
    registry.register(Arc::new(AnalyzerTool::new(TaxOptimizer::new(
        config.withdrawal_years,
    ))));
    registry
}
