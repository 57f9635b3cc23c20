//! Uniform tool capability and per-request registry.
//!
//! Every operation the engine exposes to external shells is a [`Tool`]:
//! a name, a description, a JSON input schema, and an execute method
//! returning the uniform envelope. The registry is a plain name-to-tool
//! mapping constructed once per request; no exception escapes a tool.

mod diagnostics;

pub use diagnostics::{
    DiagnoseSystemTool, HardwareDiagnosticsTool, QueryTool, RecommendationsTool,
};

use std::collections::BTreeMap;
use std::sync::Arc;

use sl_common::{Attrs, ToolEnvelope};

use crate::system::SystemInterface;

/// One externally invocable operation.
pub trait Tool: Send + Sync {
    /// Stable tool name.
    fn name(&self) -> &'static str;

    /// Human-readable description.
    fn description(&self) -> &'static str;

    /// JSON schema of the accepted parameters.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute with the given parameters. Always returns an envelope;
    /// validation failures become `success=false` envelopes.
    fn execute(&self, parameters: &serde_json::Value) -> ToolEnvelope;
}

/// Name-to-tool mapping for one request.
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Build the standard registry over one system handle.
    pub fn new(system: Arc<dyn SystemInterface>) -> Self {
        let mut tools: BTreeMap<&'static str, Box<dyn Tool>> = BTreeMap::new();
        let all: [Box<dyn Tool>; 4] = [
            Box::new(DiagnoseSystemTool::new(system.clone())),
            Box::new(QueryTool::new(system.clone())),
            Box::new(RecommendationsTool::new(system.clone())),
            Box::new(HardwareDiagnosticsTool::new(system)),
        ];
        for tool in all {
            tools.insert(tool.name(), tool);
        }
        ToolRegistry { tools }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|tool| &**tool)
    }

    /// Tool names in stable order.
    pub fn names(&self) -> Vec<&'static str> {
        self.tools.keys().copied().collect()
    }

    /// Execute a named tool; an unknown name yields an error envelope.
    pub fn execute(&self, name: &str, parameters: &serde_json::Value) -> ToolEnvelope {
        match self.get(name) {
            Some(tool) => tool.execute(parameters),
            None => ToolEnvelope::err(format!("unknown tool: {name}"), Attrs::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::MockSystem;

    #[test]
    fn test_registry_lists_all_tools() {
        let registry = ToolRegistry::new(Arc::new(MockSystem::new()));
        assert_eq!(
            registry.names(),
            vec![
                "diagnose_system",
                "generate_recommendations",
                "process_query",
                "run_hardware_diagnostics",
            ]
        );
    }

    #[test]
    fn test_unknown_tool_yields_error_envelope() {
        let registry = ToolRegistry::new(Arc::new(MockSystem::new()));
        let envelope = registry.execute("frobnicate", &serde_json::json!({}));
        assert!(!envelope.success);
        assert!(envelope.error.unwrap().contains("unknown tool"));
    }

    #[test]
    fn test_every_tool_has_schema() {
        let registry = ToolRegistry::new(Arc::new(MockSystem::new()));
        for name in registry.names() {
            let tool = registry.get(name).unwrap();
            let schema = tool.input_schema();
            assert!(schema.is_object(), "{name} schema not an object");
            assert!(!tool.description().is_empty());
        }
    }
}
