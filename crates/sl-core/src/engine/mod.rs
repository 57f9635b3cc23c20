//! Request-scoped engine façade.
//!
//! One [`DiagnosticsEngine`] instance serves one logical operation:
//! gather the requested subsystems, analyze the kernel configuration,
//! run the log pipeline, and produce the recommendation report. All
//! cross-subsystem reasoning happens downstream of here, in the
//! recommendation engine.

mod health;
mod query;

pub use query::QueryInterpretation;

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use sl_common::{Attrs, Diagnostic, HardwareInfo, KernelConfig, LogAnalysis};

use crate::hardware::DeviceAnalyzer;
use crate::kernel::{KernelConfigAnalyzer, KernelConfigParser, KernelOptimizer};
use crate::logs::LogAnalyzer;
use crate::recommend::{derive_profile, RecommendationGenerator};
use crate::system::{LinuxSystem, SystemInterface};

/// Options for a diagnose request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct DiagnoseOptions {
    /// Include hardware analysis.
    pub include_hardware: bool,
    /// Include kernel configuration analysis.
    pub include_kernel: bool,
    /// Include log analysis.
    pub include_logs: bool,
    /// Log sources to analyze.
    pub log_sources: Vec<String>,
    /// Generate actionable recommendations.
    pub generate_recommendations: bool,
}

impl Default for DiagnoseOptions {
    fn default() -> Self {
        DiagnoseOptions {
            include_hardware: true,
            include_kernel: true,
            include_logs: true,
            log_sources: vec![
                "journald".to_string(),
                "syslog".to_string(),
                "kern.log".to_string(),
            ],
            generate_recommendations: true,
        }
    }
}

/// The engine façade.
pub struct DiagnosticsEngine {
    system: Arc<dyn SystemInterface>,
}

impl DiagnosticsEngine {
    pub fn new(system: Arc<dyn SystemInterface>) -> Self {
        DiagnosticsEngine { system }
    }

    /// Engine over the real host.
    pub fn linux() -> Self {
        DiagnosticsEngine::new(Arc::new(LinuxSystem::new()))
    }

    pub fn system(&self) -> &dyn SystemInterface {
        &*self.system
    }

    /// Run a full diagnostic per the options. Always returns a
    /// diagnostic; degraded subsystems carry `<probe>_error` entries.
    pub fn diagnose(&self, options: &DiagnoseOptions) -> Diagnostic {
        let hardware = if options.include_hardware {
            DeviceAnalyzer::new(&*self.system).all_hardware_info()
        } else {
            HardwareInfo::default()
        };

        let kernel_config = if options.include_kernel {
            self.analyzed_kernel_config(&hardware)
        } else {
            None
        };

        let log_analysis = if options.include_logs {
            Some(LogAnalyzer::new(&*self.system).analyze_logs(&options.log_sources, None))
        } else {
            None
        };

        let mut diagnostic = Diagnostic {
            explanation: explanation(&hardware, kernel_config.as_ref(), log_analysis.as_ref()),
            hardware,
            kernel_config,
            log_analysis,
            recommendations: Attrs::new(),
        };

        if options.generate_recommendations {
            diagnostic.recommendations = RecommendationGenerator::new().generate(&diagnostic);
        }
        diagnostic
    }

    fn analyzed_kernel_config(&self, hardware: &HardwareInfo) -> Option<KernelConfig> {
        let mut config = KernelConfigParser::new(&*self.system).parse()?;
        KernelConfigAnalyzer::new().analyze(&mut config);
        let profile = derive_profile(hardware);
        KernelOptimizer::new().recommendations(&mut config, &profile);
        Some(config)
    }

    /// Interpret a free-form English query about the system.
    pub fn interpret_query(&self, query: &str) -> QueryInterpretation {
        query::interpret(query)
    }

    /// Produce the recommendation report for an existing diagnostic.
    pub fn generate_recommendations(&self, diagnostic: &Diagnostic) -> Attrs {
        RecommendationGenerator::new().generate(diagnostic)
    }

    /// Run targeted hardware health checks.
    pub fn run_hardware_diagnostics(&self, components: &[String]) -> Attrs {
        health::run_diagnostics(&*self.system, components)
    }
}

fn explanation(
    hardware: &HardwareInfo,
    kernel: Option<&KernelConfig>,
    logs: Option<&LogAnalysis>,
) -> String {
    let mut parts = Vec::new();

    let subsystems = [
        (!hardware.cpu.is_empty(), "cpu"),
        (!hardware.memory.is_empty(), "memory"),
        (!hardware.storage.is_empty(), "storage"),
        (!hardware.pci_devices.is_empty(), "pci"),
        (!hardware.usb_devices.is_empty(), "usb"),
        (!hardware.network.is_empty(), "network"),
        (!hardware.graphics.is_empty(), "graphics"),
    ];
    let analyzed: Vec<&str> = subsystems
        .iter()
        .filter(|(present, _)| *present)
        .map(|(_, name)| *name)
        .collect();
    if analyzed.is_empty() {
        parts.push("Hardware analysis was not performed.".to_string());
    } else {
        parts.push(format!(
            "Analyzed hardware subsystems: {}.",
            analyzed.join(", ")
        ));
    }

    match kernel {
        Some(config) => {
            let scores = (
                config.analysis.get("security_score").and_then(|v| v.as_u64()),
                config
                    .analysis
                    .get("performance_score")
                    .and_then(|v| v.as_u64()),
            );
            match scores {
                (Some(sec), Some(perf)) => parts.push(format!(
                    "Kernel {} configuration has {} options (security score {sec}, performance score {perf}).",
                    config.version,
                    config.options.len()
                )),
                _ => parts.push(format!(
                    "Kernel {} configuration has {} options.",
                    config.version,
                    config.options.len()
                )),
            }
        }
        None => parts.push("Kernel configuration was not analyzed.".to_string()),
    }

    match logs {
        Some(analysis) => {
            let health = analysis
                .summary
                .get("health")
                .and_then(|h| h.get("health_score"))
                .and_then(|v| v.as_i64())
                .unwrap_or(100);
            parts.push(format!(
                "Log analysis covered {} entries (health score {health}).",
                analysis.entries.len()
            ));
        }
        None => parts.push("Logs were not analyzed.".to_string()),
    }

    parts.join(" ")
}

/// Serialize a diagnostic into the wire payload used by the tool layer.
pub fn diagnostic_payload(diagnostic: &Diagnostic, include_recommendations: bool) -> Attrs {
    let mut payload = Attrs::new();
    payload.insert("diagnostic_summary".into(), json!(diagnostic.explanation));
    payload.insert("hardware_analysis".into(), json!(diagnostic.hardware));
    payload.insert(
        "kernel_analysis".into(),
        match &diagnostic.kernel_config {
            Some(config) => json!({
                "version": config.version,
                "options_count": config.options.len(),
                "analysis": config.analysis,
                "recommendations": config.recommendations,
            }),
            None => json!(null),
        },
    );
    payload.insert(
        "log_analysis".into(),
        match &diagnostic.log_analysis {
            Some(analysis) => json!({
                "total_entries": analysis.entries.len(),
                "sample_entries": analysis.entries.iter().take(50).collect::<Vec<_>>(),
                "patterns": analysis.patterns,
                "issues": analysis.issues,
                "summary": analysis.summary,
            }),
            None => json!(null),
        },
    );
    payload.insert(
        "recommendations".into(),
        if include_recommendations {
            json!(diagnostic.recommendations)
        } else {
            json!({})
        },
    );
    payload
}
