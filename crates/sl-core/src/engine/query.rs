//! Free-form query interpretation.
//!
//! Classifies an English query into one of a closed set of types and
//! extracts component / timeframe / severity parameters by keyword match.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sl_common::Attrs;

/// Query types, tried in declaration order; first keyword hit wins.
const QUERY_TYPES: [(&str, &[&str]); 5] = [
    (
        "diagnostic",
        &["health", "diagnose", "diagnostic", "status", "check system"],
    ),
    (
        "kernel",
        &["kernel", "module", "boot parameter", "sysctl", "config"],
    ),
    ("logs", &["log", "error", "warning", "journal", "message"]),
    (
        "performance",
        &["slow", "performance", "optimize", "speed", "lag", "bottleneck"],
    ),
    (
        "hardware",
        &["cpu", "memory", "ram", "disk", "storage", "temperature", "gpu", "graphics", "usb", "network", "hardware", "device"],
    ),
];

/// Components recognized in queries.
const COMPONENTS: [(&str, &[&str]); 6] = [
    ("cpu", &["cpu", "processor"]),
    ("memory", &["memory", "ram", "swap"]),
    ("storage", &["disk", "storage", "ssd", "drive", "filesystem"]),
    ("network", &["network", "wifi", "ethernet", "interface"]),
    ("graphics", &["gpu", "graphics", "display", "video"]),
    ("usb", &["usb"]),
];

/// Structured interpretation of a free-form query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryInterpretation {
    pub original_query: String,
    /// One of hardware, kernel, logs, performance, diagnostic, general.
    pub query_type: String,
    pub parameters: Attrs,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

/// Interpret one query.
pub fn interpret(query: &str) -> QueryInterpretation {
    let query_type = classify(query);
    let parameters = extract_parameters(query, query_type);
    QueryInterpretation {
        original_query: query.to_string(),
        query_type: query_type.to_string(),
        response: response_template(query_type).to_string(),
        parameters,
        timestamp: Utc::now(),
    }
}

/// Classify a query into its type.
pub fn classify(query: &str) -> &'static str {
    let lower = query.to_lowercase();
    QUERY_TYPES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(kind, _)| *kind)
        .unwrap_or("general")
}

/// Extract component / timeframe / severity parameters.
pub fn extract_parameters(query: &str, query_type: &str) -> Attrs {
    let lower = query.to_lowercase();
    let mut parameters = Attrs::new();

    if let Some((component, _)) = COMPONENTS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
    {
        parameters.insert("component".into(), serde_json::json!(component));
    }

    if query_type == "logs" || query_type == "diagnostic" {
        if lower.contains("recent") || lower.contains("today") || lower.contains("latest") {
            parameters.insert("timeframe".into(), serde_json::json!("recent"));
        }
        if lower.contains("critical") || lower.contains("error") {
            parameters.insert("severity".into(), serde_json::json!("high"));
        } else if lower.contains("warning") {
            parameters.insert("severity".into(), serde_json::json!("medium"));
        }
    }

    parameters
}

fn response_template(query_type: &str) -> &'static str {
    match query_type {
        "hardware" => "Gathering hardware information for your query.",
        "kernel" => "Reviewing the kernel configuration for your query.",
        "logs" => "Searching system logs for matching entries.",
        "performance" => "Analyzing system performance characteristics.",
        "diagnostic" => "Running system diagnostics to assess overall health.",
        _ => "Interpreting your query against available system data.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_query_types() {
        assert_eq!(classify("cpu temperature"), "hardware");
        assert_eq!(classify("memory usage"), "hardware");
        assert_eq!(classify("disk space"), "hardware");
        assert_eq!(classify("kernel version"), "kernel");
        assert_eq!(classify("is the nvidia module loaded"), "kernel");
        assert_eq!(classify("show errors"), "logs");
        assert_eq!(classify("warning messages"), "logs");
        assert_eq!(classify("why is my system slow"), "performance");
        assert_eq!(classify("optimize performance"), "performance");
        assert_eq!(classify("check system health"), "diagnostic");
        assert_eq!(classify("diagnose issues"), "diagnostic");
        assert_eq!(classify("hello world"), "general");
    }

    #[test]
    fn test_interpret_hardware_query() {
        let result = interpret("What is my CPU temperature?");
        assert_eq!(result.original_query, "What is my CPU temperature?");
        assert_eq!(result.query_type, "hardware");
        assert_eq!(result.parameters["component"], "cpu");
        assert!(!result.response.is_empty());
    }

    #[test]
    fn test_interpret_logs_query_parameters() {
        let result = interpret("Show me recent errors in logs");
        assert_eq!(result.query_type, "logs");
        assert_eq!(result.parameters["timeframe"], "recent");
        assert_eq!(result.parameters["severity"], "high");

        let result = interpret("any warning messages today");
        assert_eq!(result.parameters["severity"], "medium");
        assert_eq!(result.parameters["timeframe"], "recent");
    }

    #[test]
    fn test_component_extraction() {
        assert_eq!(
            extract_parameters("memory usage", "hardware")["component"],
            "memory"
        );
        assert_eq!(
            extract_parameters("disk space", "hardware")["component"],
            "storage"
        );
        assert!(extract_parameters("hello", "general").is_empty());
    }

    #[test]
    fn test_kernel_response_mentions_kernel() {
        let result = interpret("Check my kernel configuration");
        assert_eq!(result.query_type, "kernel");
        assert!(result.response.to_lowercase().contains("kernel"));
    }
}
