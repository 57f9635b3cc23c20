//! The four standard tool providers wrapping the engine façade.

use std::sync::Arc;

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::json;

use sl_common::{Attrs, Error, ToolEnvelope};

use crate::engine::{diagnostic_payload, DiagnoseOptions, DiagnosticsEngine};
use crate::system::SystemInterface;

use super::Tool;

/// Comprehensive diagnostics: hardware, kernel configuration, and logs.
pub struct DiagnoseSystemTool {
    engine: DiagnosticsEngine,
}

impl DiagnoseSystemTool {
    pub fn new(system: Arc<dyn SystemInterface>) -> Self {
        DiagnoseSystemTool {
            engine: DiagnosticsEngine::new(system),
        }
    }
}

impl Tool for DiagnoseSystemTool {
    fn name(&self) -> &'static str {
        "diagnose_system"
    }

    fn description(&self) -> &'static str {
        "Perform comprehensive system diagnostics including hardware analysis, kernel configuration review, and log analysis"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::to_value(schema_for!(DiagnoseOptions)).unwrap_or_else(|_| json!({}))
    }

    fn execute(&self, parameters: &serde_json::Value) -> ToolEnvelope {
        let options: DiagnoseOptions = match serde_json::from_value(parameters.clone()) {
            Ok(options) => options,
            Err(e) => {
                return invalid_argument("options", &e.to_string());
            }
        };
        let diagnostic = self.engine.diagnose(&options);
        let mut payload = diagnostic_payload(&diagnostic, options.generate_recommendations);
        payload.insert(
            "analysis_metadata".into(),
            json!({
                "included_hardware": options.include_hardware,
                "included_kernel": options.include_kernel,
                "included_logs": options.include_logs,
                "log_sources": if options.include_logs { options.log_sources.clone() } else { Vec::new() },
            }),
        );
        ToolEnvelope::ok(payload)
    }
}

/// Parameters for the query tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct QueryParams {
    /// Free-form English question about the system.
    pub query: String,
}

/// Free-form query interpretation.
pub struct QueryTool {
    engine: DiagnosticsEngine,
}

impl QueryTool {
    pub fn new(system: Arc<dyn SystemInterface>) -> Self {
        QueryTool {
            engine: DiagnosticsEngine::new(system),
        }
    }
}

impl Tool for QueryTool {
    fn name(&self) -> &'static str {
        "process_query"
    }

    fn description(&self) -> &'static str {
        "Interpret a natural language query about the system and extract its intent and parameters"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::to_value(schema_for!(QueryParams)).unwrap_or_else(|_| json!({}))
    }

    fn execute(&self, parameters: &serde_json::Value) -> ToolEnvelope {
        let params: QueryParams = match serde_json::from_value(parameters.clone()) {
            Ok(params) => params,
            Err(e) => return invalid_argument("query", &e.to_string()),
        };
        if params.query.trim().is_empty() {
            return invalid_argument("query", "query cannot be empty");
        }
        let interpretation = self.engine.interpret_query(&params.query);
        ToolEnvelope::ok(Attrs::new()).with("interpretation", interpretation)
    }
}

/// Parameters for the recommendation tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct RecommendationParams {
    /// Areas to keep: hardware, kernel, logs, system, security,
    /// performance, maintenance, or all.
    pub focus_areas: Vec<String>,
    /// Priorities to keep: critical, high, medium, low.
    pub priority_filter: Vec<String>,
    /// Cap on the prioritized list.
    pub max_recommendations: usize,
    /// Include step-by-step implementation guides.
    pub include_implementation_guides: bool,
}

impl Default for RecommendationParams {
    fn default() -> Self {
        RecommendationParams {
            focus_areas: vec!["all".to_string()],
            priority_filter: vec![
                "critical".to_string(),
                "high".to_string(),
                "medium".to_string(),
                "low".to_string(),
            ],
            max_recommendations: 20,
            include_implementation_guides: true,
        }
    }
}

/// Recommendation generation over a fresh diagnostic.
pub struct RecommendationsTool {
    engine: DiagnosticsEngine,
}

impl RecommendationsTool {
    pub fn new(system: Arc<dyn SystemInterface>) -> Self {
        RecommendationsTool {
            engine: DiagnosticsEngine::new(system),
        }
    }
}

impl Tool for RecommendationsTool {
    fn name(&self) -> &'static str {
        "generate_recommendations"
    }

    fn description(&self) -> &'static str {
        "Generate prioritized recommendations for system optimization, security, and stability improvements"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::to_value(schema_for!(RecommendationParams)).unwrap_or_else(|_| json!({}))
    }

    fn execute(&self, parameters: &serde_json::Value) -> ToolEnvelope {
        let params: RecommendationParams = match serde_json::from_value(parameters.clone()) {
            Ok(params) => params,
            Err(e) => return invalid_argument("parameters", &e.to_string()),
        };
        if params.max_recommendations == 0 {
            return invalid_argument("max_recommendations", "must be at least 1");
        }

        let diagnostic = self.engine.diagnose(&DiagnoseOptions {
            generate_recommendations: false,
            ..DiagnoseOptions::default()
        });
        let mut report = self.engine.generate_recommendations(&diagnostic);
        filter_report(&mut report, &params);

        ToolEnvelope::ok(Attrs::new())
            .with("recommendations", report)
            .with(
                "filter_criteria",
                json!({
                    "focus_areas": params.focus_areas,
                    "priority_filter": params.priority_filter,
                    "max_recommendations": params.max_recommendations,
                }),
            )
    }
}

/// Apply focus/priority/count filters to a generated report in place.
fn filter_report(report: &mut Attrs, params: &RecommendationParams) {
    if !params.focus_areas.iter().any(|a| a == "all") {
        if let Some(serde_json::Value::Object(by_category)) = report.get_mut("recommendations") {
            by_category.retain(|category, _| params.focus_areas.iter().any(|a| a == category));
        }
    }

    if let Some(serde_json::Value::Array(prioritized)) = report.get_mut("prioritized") {
        prioritized.retain(|rec| {
            rec.get("priority")
                .and_then(|p| p.as_str())
                .map(|p| params.priority_filter.iter().any(|f| f == p))
                .unwrap_or(false)
        });
        prioritized.truncate(params.max_recommendations);
    }

    if !params.include_implementation_guides {
        report.remove("implementation_guides");
    }
}

/// Parameters for the hardware diagnostics tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct HardwareDiagnosticsParams {
    /// Components to check: all, cpu, memory, storage, network, graphics.
    pub components: Vec<String>,
}

impl Default for HardwareDiagnosticsParams {
    fn default() -> Self {
        HardwareDiagnosticsParams {
            components: vec!["all".to_string()],
        }
    }
}

const VALID_COMPONENTS: [&str; 6] = ["all", "cpu", "memory", "storage", "network", "graphics"];

/// Targeted hardware health checks.
pub struct HardwareDiagnosticsTool {
    engine: DiagnosticsEngine,
}

impl HardwareDiagnosticsTool {
    pub fn new(system: Arc<dyn SystemInterface>) -> Self {
        HardwareDiagnosticsTool {
            engine: DiagnosticsEngine::new(system),
        }
    }
}

impl Tool for HardwareDiagnosticsTool {
    fn name(&self) -> &'static str {
        "run_hardware_diagnostics"
    }

    fn description(&self) -> &'static str {
        "Run hardware health checks covering temperatures, resource usage, and link state"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::to_value(schema_for!(HardwareDiagnosticsParams)).unwrap_or_else(|_| json!({}))
    }

    fn execute(&self, parameters: &serde_json::Value) -> ToolEnvelope {
        let params: HardwareDiagnosticsParams = match serde_json::from_value(parameters.clone()) {
            Ok(params) => params,
            Err(e) => return invalid_argument("components", &e.to_string()),
        };
        if let Some(bad) = params
            .components
            .iter()
            .find(|c| !VALID_COMPONENTS.contains(&c.as_str()))
        {
            return invalid_argument("components", bad);
        }
        let report = self.engine.run_hardware_diagnostics(&params.components);
        ToolEnvelope::ok(report)
    }
}

fn invalid_argument(name: &str, value: &str) -> ToolEnvelope {
    let err = Error::InvalidArgument {
        name: name.to_string(),
        value: value.to_string(),
    };
    ToolEnvelope::err(err.to_string(), Attrs::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::MockSystem;

    fn system() -> Arc<dyn SystemInterface> {
        Arc::new(MockSystem::new())
    }

    #[test]
    fn test_diagnose_tool_defaults() {
        let tool = DiagnoseSystemTool::new(system());
        let envelope = tool.execute(&json!({}));
        assert!(envelope.success);
        assert!(envelope.payload.contains_key("diagnostic_summary"));
        assert!(envelope.payload.contains_key("hardware_analysis"));
        let meta = &envelope.payload["analysis_metadata"];
        assert_eq!(meta["included_hardware"], true);
    }

    #[test]
    fn test_diagnose_tool_rejects_bad_options() {
        let tool = DiagnoseSystemTool::new(system());
        let envelope = tool.execute(&json!({"include_hardware": "yes please"}));
        assert!(!envelope.success);
        assert!(envelope.error.unwrap().contains("invalid argument"));
    }

    #[test]
    fn test_query_tool_requires_query() {
        let tool = QueryTool::new(system());
        let envelope = tool.execute(&json!({}));
        assert!(!envelope.success);

        let envelope = tool.execute(&json!({"query": "   "}));
        assert!(!envelope.success);

        let envelope = tool.execute(&json!({"query": "What is my CPU temperature?"}));
        assert!(envelope.success);
        assert_eq!(
            envelope.payload["interpretation"]["query_type"],
            "hardware"
        );
    }

    #[test]
    fn test_recommendations_tool_filters() {
        let tool = RecommendationsTool::new(system());
        let envelope = tool.execute(&json!({
            "priority_filter": ["low"],
            "max_recommendations": 2,
            "include_implementation_guides": false,
        }));
        assert!(envelope.success);
        let report = envelope.payload["recommendations"].as_object().unwrap();
        let prioritized = report["prioritized"].as_array().unwrap();
        assert!(prioritized.len() <= 2);
        assert!(prioritized.iter().all(|r| r["priority"] == "low"));
        assert!(!report.contains_key("implementation_guides"));
    }

    #[test]
    fn test_recommendations_tool_rejects_zero_cap() {
        let tool = RecommendationsTool::new(system());
        let envelope = tool.execute(&json!({"max_recommendations": 0}));
        assert!(!envelope.success);
    }

    #[test]
    fn test_hardware_diagnostics_tool_validates_components() {
        let tool = HardwareDiagnosticsTool::new(system());
        let envelope = tool.execute(&json!({"components": ["warp_core"]}));
        assert!(!envelope.success);

        let envelope = tool.execute(&json!({"components": ["memory"]}));
        assert!(envelope.success);
        assert!(envelope.payload.contains_key("status"));
    }
}
