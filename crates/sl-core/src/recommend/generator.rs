//! Recommendation generation pipeline.
//!
//! Seven generators run in isolation over the diagnostic snapshot; a
//! panicking generator contributes an empty list instead of failing the
//! request. The combined output is prioritized (stable), deduplicated,
//! explained, and capped with implementation guides for the top five.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::Utc;
use serde_json::json;
use tracing::warn;

use sl_common::{
    Attrs, Diagnostic, KernelConfig, LogAnalysis, Recommendation, RecommendationCategory,
    RecommendationPriority, Urgency,
};

use super::guides::implementation_guide;
use super::thresholds;

/// Guides are produced for this many top recommendations.
const GUIDE_COUNT: usize = 5;

/// Generator identifiers, in report order.
const GENERATORS: [&str; 7] = [
    "hardware",
    "kernel",
    "logs",
    "system",
    "security",
    "performance",
    "maintenance",
];

pub struct RecommendationGenerator;

impl RecommendationGenerator {
    pub fn new() -> Self {
        RecommendationGenerator
    }

    /// Produce the full recommendation report for a diagnostic snapshot.
    ///
    /// Never fails: generator faults degrade to empty contributions, and a
    /// report is always returned.
    pub fn generate(&self, diagnostic: &Diagnostic) -> Attrs {
        let mut by_category: BTreeMap<&'static str, Vec<Recommendation>> = BTreeMap::new();
        for name in GENERATORS {
            let recs = run_isolated(name, || match name {
                "hardware" => hardware_recommendations(diagnostic),
                "kernel" => kernel_recommendations(diagnostic.kernel_config.as_ref()),
                "logs" => log_recommendations(diagnostic.log_analysis.as_ref()),
                "system" => system_recommendations(diagnostic),
                "security" => security_recommendations(diagnostic),
                "performance" => performance_recommendations(diagnostic),
                _ => maintenance_recommendations(),
            });
            if !recs.is_empty() {
                by_category.insert(name, recs);
            }
        }

        // Flatten in generator order, then stable-sort by composite weight.
        let mut prioritized: Vec<Recommendation> = GENERATORS
            .iter()
            .filter_map(|name| by_category.get(name))
            .flatten()
            .cloned()
            .collect();
        prioritized.sort_by(|a, b| b.sort_weight().cmp(&a.sort_weight()));

        let deduplicated = deduplicate(prioritized);
        let explained = add_explanations(deduplicated);

        let guides: Vec<Attrs> = explained
            .iter()
            .take(GUIDE_COUNT)
            .map(implementation_guide)
            .collect();

        let mut report = Attrs::new();
        report.insert("recommendations".into(), json!(by_category));
        report.insert("summary".into(), json!(summary(&explained)));
        report.insert("statistics".into(), json!(statistics(&explained)));
        report.insert("implementation_guides".into(), json!(guides));
        report.insert("prioritized".into(), json!(explained));
        report.insert("timestamp".into(), json!(Utc::now().to_rfc3339()));
        report
    }
}

impl Default for RecommendationGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one generator, trapping panics into an empty contribution.
fn run_isolated<F>(name: &str, generator: F) -> Vec<Recommendation>
where
    F: FnOnce() -> Vec<Recommendation>,
{
    match catch_unwind(AssertUnwindSafe(generator)) {
        Ok(recs) => recs,
        Err(_) => {
            warn!(generator = name, "recommendation generator failed");
            Vec::new()
        }
    }
}

fn rec(
    component: &str,
    category: RecommendationCategory,
    priority: RecommendationPriority,
    action: impl Into<String>,
    details: impl Into<String>,
    impact: impl Into<String>,
    urgency: Urgency,
) -> Recommendation {
    Recommendation {
        component: component.to_string(),
        category,
        priority,
        action: action.into(),
        details: details.into(),
        impact: impact.into(),
        urgency,
        explanation: None,
    }
}

fn get_f64(attrs: &Attrs, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| attrs.get(*k).and_then(|v| v.as_f64()))
}

fn get_str<'a>(attrs: &'a Attrs, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| attrs.get(*k).and_then(|v| v.as_str()))
}

fn hardware_recommendations(diagnostic: &Diagnostic) -> Vec<Recommendation> {
    let hardware = &diagnostic.hardware;
    let mut recs = Vec::new();

    // CPU: temperature, governor, load.
    let cpu = &hardware.cpu;
    if let Some(temp) = get_f64(cpu, &["temperature"]) {
        if temp >= thresholds::CPU_TEMP_CRITICAL {
            recs.push(rec(
                "cpu",
                RecommendationCategory::Stability,
                RecommendationPriority::Critical,
                "Immediate CPU cooling required",
                format!("CPU temperature is critically high at {temp}°C. System may throttle or shutdown."),
                "System stability at risk",
                Urgency::Immediate,
            ));
        } else if temp > thresholds::CPU_TEMP_HIGH {
            recs.push(rec(
                "cpu",
                RecommendationCategory::Performance,
                RecommendationPriority::High,
                "Improve CPU cooling",
                format!("CPU temperature is high at {temp}°C. Consider cleaning fans or improving airflow."),
                "Performance degradation possible",
                Urgency::Soon,
            ));
        }
    }

    if let Some(governor) = get_str(cpu, &["governor", "current_governor"]) {
        if governor != "performance" && governor != "schedutil" {
            recs.push(rec(
                "cpu",
                RecommendationCategory::Performance,
                RecommendationPriority::Medium,
                "Optimize CPU frequency scaling",
                format!(
                    "Current governor \"{governor}\" may not provide optimal performance. Consider \"performance\" or \"schedutil\"."
                ),
                "CPU performance optimization",
                Urgency::WhenConvenient,
            ));
        }
    }

    if let (Some(load), Some(cores)) = (
        get_f64(cpu, &["load_avg_1min"]),
        get_f64(cpu, &["cores", "logical_cpus"]),
    ) {
        if cores > 0.0 && load / cores > thresholds::CPU_LOAD_PER_CORE_HIGH {
            recs.push(rec(
                "cpu",
                RecommendationCategory::Performance,
                RecommendationPriority::High,
                "Investigate high CPU load",
                format!(
                    "CPU load is very high ({load:.2} on {cores:.0} cores). Check for resource-intensive processes."
                ),
                "System responsiveness affected",
                Urgency::Soon,
            ));
        }
    }

    // Memory: usage and swap.
    let memory = &hardware.memory;
    if let Some(usage) = get_f64(memory, &["usage_percent", "memory_usage_percent"]) {
        if usage >= thresholds::MEMORY_USAGE_CRITICAL {
            recs.push(rec(
                "memory",
                RecommendationCategory::Stability,
                RecommendationPriority::Critical,
                "Address critical memory shortage",
                format!("Memory usage is critically high at {usage}%. System may become unstable."),
                "System stability at risk",
                Urgency::Immediate,
            ));
        } else if usage > thresholds::MEMORY_USAGE_HIGH {
            recs.push(rec(
                "memory",
                RecommendationCategory::Performance,
                RecommendationPriority::High,
                "Address high memory usage",
                format!("Memory usage is high at {usage}%. Consider adding more RAM or closing applications."),
                "Performance degradation likely",
                Urgency::Soon,
            ));
        }
    }
    if let Some(swap) = get_f64(memory, &["swap_usage_percent"]) {
        if swap > thresholds::SWAP_USAGE_HIGH {
            recs.push(rec(
                "memory",
                RecommendationCategory::Performance,
                RecommendationPriority::Medium,
                "Reduce swap usage",
                format!("Swap usage is high at {swap}%. This can significantly slow down the system."),
                "System performance degradation",
                Urgency::WhenConvenient,
            ));
        }
    }

    // Storage: per-device usage and SMART findings.
    recs.extend(storage_recommendations(&hardware.storage));

    // Network: interfaces that are down.
    if let Some(interfaces) = hardware
        .network
        .get("detailed_interfaces")
        .and_then(|v| v.as_array())
    {
        for iface in interfaces {
            let status = iface.get("status").and_then(|v| v.as_str());
            let kind = iface.get("type").and_then(|v| v.as_str());
            if status == Some("DOWN") && kind != Some("loopback") {
                let name = iface.get("name").and_then(|v| v.as_str()).unwrap_or("unknown");
                recs.push(rec(
                    "network",
                    RecommendationCategory::Stability,
                    RecommendationPriority::Medium,
                    format!("Check network interface {name}"),
                    "Network interface is down. Check cable connections and configuration.",
                    "Network connectivity issues",
                    Urgency::WhenConvenient,
                ));
            }
        }
    }

    // Graphics: nouveau on NVIDIA hardware.
    if let Some(gpus) = hardware.graphics.get("gpus").and_then(|v| v.as_array()) {
        let has_nvidia = gpus
            .iter()
            .any(|g| g.get("vendor").and_then(|v| v.as_str()) == Some("NVIDIA"));
        let drivers = hardware
            .graphics
            .get("graphics_drivers")
            .and_then(|v| v.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();
        let nouveau_loaded = drivers
            .iter()
            .any(|d| d.get("name").and_then(|v| v.as_str()) == Some("nouveau"));
        if has_nvidia && nouveau_loaded {
            recs.push(rec(
                "graphics",
                RecommendationCategory::Performance,
                RecommendationPriority::Medium,
                "Consider proprietary NVIDIA drivers",
                "Using open-source Nouveau driver. Proprietary NVIDIA drivers may provide better performance.",
                "Graphics performance improvement",
                Urgency::WhenConvenient,
            ));
        }
    }

    recs
}

fn storage_recommendations(storage: &Attrs) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    // Prefer explicit device records; fall back to df-derived filesystems.
    let devices = storage
        .get("devices")
        .or_else(|| storage.get("filesystems"))
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    for device in devices {
        let usage = device
            .get("usage_percent")
            .or_else(|| device.get("use_percent"))
            .and_then(|v| v.as_f64());
        let Some(usage) = usage else { continue };
        let target = device
            .get("mount_point")
            .or_else(|| device.get("mountpoint"))
            .or_else(|| device.get("device"))
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown");

        if usage > thresholds::DISK_USAGE_CRITICAL {
            recs.push(rec(
                "storage",
                RecommendationCategory::Stability,
                RecommendationPriority::Critical,
                format!("Free up space on {target}"),
                format!("Disk usage is critically high at {usage}%. System may become unstable."),
                "System stability at risk",
                Urgency::Immediate,
            ));
        } else if usage > thresholds::DISK_USAGE_HIGH {
            recs.push(rec(
                "storage",
                RecommendationCategory::Maintenance,
                RecommendationPriority::High,
                format!("Clean up disk space on {target}"),
                format!("Disk usage is high at {usage}%. Consider removing unnecessary files."),
                "Prevent future storage issues",
                Urgency::Soon,
            ));
        }
    }

    if let Some(issues) = storage.get("smart_issues").and_then(|v| v.as_array()) {
        for issue in issues {
            let device = issue
                .get("device")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown device");
            let critical = issue.get("severity").and_then(|v| v.as_str()) == Some("critical");
            recs.push(rec(
                "storage",
                RecommendationCategory::Stability,
                if critical {
                    RecommendationPriority::Critical
                } else {
                    RecommendationPriority::High
                },
                format!("Address SMART warnings on {device}"),
                format!(
                    "SMART monitoring detected potential issues with {device}. Backup data and consider replacement."
                ),
                "Data loss risk",
                if critical { Urgency::Immediate } else { Urgency::Soon },
            ));
        }
    }

    recs
}

fn kernel_recommendations(kernel_config: Option<&KernelConfig>) -> Vec<Recommendation> {
    let Some(config) = kernel_config else {
        return Vec::new();
    };
    let mut recs = Vec::new();

    let critical_security: [(&str, &str, &str); 5] = [
        ("CONFIG_SECURITY", "y", "Enable kernel security framework"),
        ("CONFIG_SECURITY_DMESG_RESTRICT", "y", "Restrict dmesg access to privileged users"),
        ("CONFIG_SECURITY_YAMA", "y", "Enable Yama security module"),
        ("CONFIG_HARDENED_USERCOPY", "y", "Enable hardened usercopy"),
        ("CONFIG_FORTIFY_SOURCE", "y", "Enable FORTIFY_SOURCE"),
    ];
    for (option, recommended, description) in critical_security {
        if let Some(current) = config.options.get(option) {
            if current.value != recommended {
                recs.push(rec(
                    "kernel",
                    RecommendationCategory::Security,
                    RecommendationPriority::High,
                    format!("Enable {option}"),
                    format!("{description}. Current: {}, Recommended: {recommended}", current.value),
                    "Enhanced system security",
                    Urgency::Soon,
                ));
            }
        }
    }

    let optional_security: [(&str, &str, &str); 3] = [
        ("CONFIG_SECURITY_SELINUX", "y", "Enable SELinux mandatory access control"),
        ("CONFIG_SECURITY_APPARMOR", "y", "Enable AppArmor application security"),
        ("CONFIG_SECURITY_TOMOYO", "y", "Enable TOMOYO security module"),
    ];
    for (option, recommended, description) in optional_security {
        if let Some(current) = config.options.get(option) {
            if current.value != recommended {
                recs.push(rec(
                    "kernel",
                    RecommendationCategory::Security,
                    RecommendationPriority::Medium,
                    format!("Consider enabling {option}"),
                    format!("{description}. Current: {}, Recommended: {recommended}", current.value),
                    "Additional security layer",
                    Urgency::WhenConvenient,
                ));
            }
        }
    }

    let performance: [(&str, &str, &str); 4] = [
        ("CONFIG_PREEMPT", "y", "Enable preemptible kernel for better responsiveness"),
        ("CONFIG_NO_HZ", "y", "Enable tickless system for power efficiency"),
        ("CONFIG_HIGH_RES_TIMERS", "y", "Enable high resolution timers"),
        ("CONFIG_SMP", "y", "Enable symmetric multiprocessing"),
    ];
    for (option, recommended, description) in performance {
        if let Some(current) = config.options.get(option) {
            if current.value != recommended {
                recs.push(rec(
                    "kernel",
                    RecommendationCategory::Performance,
                    RecommendationPriority::Medium,
                    format!("Optimize {option}"),
                    format!("{description}. Current: {}, Recommended: {recommended}", current.value),
                    "System performance improvement",
                    Urgency::WhenConvenient,
                ));
            }
        }
    }

    let stability: [(&str, &str, &str); 3] = [
        ("CONFIG_PANIC_ON_OOPS", "n", "Disable panic on oops for better debugging"),
        ("CONFIG_DEBUG_KERNEL", "n", "Disable debug kernel for production systems"),
        ("CONFIG_KASAN", "n", "Disable KASAN for production (performance impact)"),
    ];
    for (option, recommended, description) in stability {
        if let Some(current) = config.options.get(option) {
            if current.value != recommended {
                recs.push(rec(
                    "kernel",
                    RecommendationCategory::Stability,
                    RecommendationPriority::Low,
                    format!("Adjust {option}"),
                    format!("{description}. Current: {}, Recommended: {recommended}", current.value),
                    "System stability optimization",
                    Urgency::WhenConvenient,
                ));
            }
        }
    }

    recs
}

fn log_recommendations(log_analysis: Option<&LogAnalysis>) -> Vec<Recommendation> {
    let Some(analysis) = log_analysis else {
        return Vec::new();
    };
    let mut recs = Vec::new();

    let mut high_count = 0usize;
    for (level, priority) in [
        ("critical", RecommendationPriority::Critical),
        ("high", RecommendationPriority::High),
        ("medium", RecommendationPriority::Medium),
        ("low", RecommendationPriority::Low),
    ] {
        let Some(items) = analysis
            .issues
            .get(level)
            .and_then(|b| b.get("items"))
            .and_then(|v| v.as_array())
        else {
            continue;
        };
        if level == "high" {
            high_count = items.len();
        }
        for issue in items {
            let description = issue
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown issue");
            let kind = issue.get("type").and_then(|v| v.as_str()).unwrap_or("system");
            let lower = description.to_lowercase();
            let urgent = matches!(
                priority,
                RecommendationPriority::Critical | RecommendationPriority::High
            );

            let (action, impact): (String, &str) =
                if lower.contains("memory") || lower.contains("oom") || kind.contains("oom") {
                    ("Address memory issues".into(), "System stability at risk")
                } else if lower.contains("disk") || lower.contains("i/o") || lower.contains("storage") {
                    ("Investigate storage issues".into(), "Data integrity at risk")
                } else if lower.contains("network") || lower.contains("connection") {
                    ("Check network connectivity".into(), "Network functionality affected")
                } else {
                    (format!("Address {kind} issue"), "System stability may be affected")
                };

            recs.push(rec(
                "system",
                RecommendationCategory::Stability,
                priority,
                action,
                description,
                impact,
                if urgent { Urgency::Soon } else { Urgency::WhenConvenient },
            ));
        }
    }

    if high_count > thresholds::ERROR_FREQUENCY_THRESHOLD {
        recs.push(rec(
            "system",
            RecommendationCategory::Stability,
            RecommendationPriority::Medium,
            "Investigate recurring errors",
            format!(
                "Detected {high_count} high-severity log findings in the analysis window. This may indicate a systemic issue."
            ),
            "System reliability concern",
            Urgency::Soon,
        ));
    }

    recs
}

fn system_recommendations(diagnostic: &Diagnostic) -> Vec<Recommendation> {
    let mut recs = Vec::new();
    if diagnostic.kernel_config.is_none() {
        return recs;
    }

    // Hardware/kernel cross-checks: dedicated GPUs need driver attention.
    if let Some(gpus) = diagnostic.hardware.graphics.get("gpus").and_then(|v| v.as_array()) {
        for vendor in ["NVIDIA", "AMD"] {
            if gpus
                .iter()
                .any(|g| g.get("vendor").and_then(|v| v.as_str()) == Some(vendor))
            {
                recs.push(rec(
                    "kernel",
                    RecommendationCategory::Performance,
                    RecommendationPriority::Medium,
                    format!("Verify {vendor} driver configuration"),
                    format!("Ensure appropriate {vendor} drivers are configured for optimal performance"),
                    "Graphics subsystem performance",
                    Urgency::WhenConvenient,
                ));
            }
        }
    }

    recs
}

fn security_recommendations(diagnostic: &Diagnostic) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    if let Some(analysis) = &diagnostic.log_analysis {
        let mut seen_security_event = false;
        for bucket in analysis.issues.values() {
            let Some(items) = bucket.get("items").and_then(|v| v.as_array()) else {
                continue;
            };
            for issue in items {
                let description = issue
                    .get("description")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_lowercase();
                if ["authentication", "failed login", "security", "breach"]
                    .iter()
                    .any(|term| description.contains(term))
                {
                    seen_security_event = true;
                }
            }
        }
        if seen_security_event {
            recs.push(rec(
                "security",
                RecommendationCategory::Security,
                RecommendationPriority::High,
                "Review security logs",
                "Security-related events were detected in the analysis window.",
                "Security posture assessment needed",
                Urgency::Soon,
            ));
        }
    }

    recs.push(rec(
        "security",
        RecommendationCategory::Security,
        RecommendationPriority::Medium,
        "Regular security updates",
        "Ensure system packages are regularly updated to patch security vulnerabilities.",
        "Maintain security posture",
        Urgency::Ongoing,
    ));

    recs
}

fn performance_recommendations(diagnostic: &Diagnostic) -> Vec<Recommendation> {
    let mut recs = Vec::new();
    let cpu = &diagnostic.hardware.cpu;

    if let (Some(load), Some(cores)) = (
        get_f64(cpu, &["load_avg_1min"]),
        get_f64(cpu, &["cores", "logical_cpus"]),
    ) {
        if cores > 0.0 && load / cores > thresholds::CPU_LOAD_PER_CORE_ADVISORY {
            recs.push(rec(
                "performance",
                RecommendationCategory::Performance,
                RecommendationPriority::Medium,
                "Optimize CPU usage",
                format!("High CPU load detected ({load:.2} on {cores:.0} cores). Consider process optimization."),
                "System responsiveness improvement",
                Urgency::WhenConvenient,
            ));
        }
    }

    if let Some(usage) = get_f64(
        &diagnostic.hardware.memory,
        &["usage_percent", "memory_usage_percent"],
    ) {
        if usage > thresholds::MEMORY_USAGE_ADVISORY {
            recs.push(rec(
                "performance",
                RecommendationCategory::Performance,
                RecommendationPriority::Medium,
                "Optimize memory usage",
                format!("Memory usage is {usage}%. Consider memory optimization or upgrade."),
                "System performance improvement",
                Urgency::WhenConvenient,
            ));
        }
    }

    recs
}

fn maintenance_recommendations() -> Vec<Recommendation> {
    vec![
        rec(
            "maintenance",
            RecommendationCategory::Maintenance,
            RecommendationPriority::Low,
            "Schedule regular system cleanup",
            "Regularly clean temporary files, logs, and package cache to maintain system health.",
            "Prevent storage issues and maintain performance",
            Urgency::Ongoing,
        ),
        rec(
            "maintenance",
            RecommendationCategory::Maintenance,
            RecommendationPriority::Low,
            "Monitor system logs regularly",
            "Regular log monitoring helps identify issues before they become critical.",
            "Proactive issue detection",
            Urgency::Ongoing,
        ),
        rec(
            "maintenance",
            RecommendationCategory::Maintenance,
            RecommendationPriority::Low,
            "Backup important data",
            "Regular backups protect against data loss from hardware failures or security incidents.",
            "Data protection",
            Urgency::Ongoing,
        ),
    ]
}

/// Drop duplicates on (component, action, category, priority), keeping
/// the higher-priority-weight item on collision. Idempotent.
pub fn deduplicate(recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    let mut out: Vec<Recommendation> = Vec::new();

    for rec in recommendations {
        let (component, action, category, priority) = rec.dedup_key();
        let key = format!("{component}\u{1f}{action}\u{1f}{category}\u{1f}{priority}");
        match seen.get(&key) {
            None => {
                seen.insert(key, out.len());
                out.push(rec);
            }
            Some(&index) => {
                if rec.priority.weight() > out[index].priority.weight() {
                    out[index] = rec;
                }
            }
        }
    }
    out
}

/// Attach an explanation paragraph to every recommendation lacking one.
fn add_explanations(mut recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
    for rec in &mut recommendations {
        if rec.explanation.is_none() {
            rec.explanation = Some(explanation_for(rec));
        }
    }
    recommendations
}

fn explanation_for(rec: &Recommendation) -> String {
    let mut parts = vec![format!(
        "This recommendation addresses {} optimization.",
        rec.component
    )];
    if !rec.details.is_empty() {
        parts.push(format!("Issue: {}", rec.details));
    }
    if !rec.impact.is_empty() {
        parts.push(format!("Impact: {}", rec.impact));
    }
    parts.push(rec.urgency.closing_sentence().to_string());
    parts.join(" ")
}

fn summary(recommendations: &[Recommendation]) -> String {
    if recommendations.is_empty() {
        return "No specific recommendations at this time. System appears to be running well."
            .to_string();
    }
    let count_of = |priority: RecommendationPriority| {
        recommendations
            .iter()
            .filter(|r| r.priority == priority)
            .count()
    };
    let mut parts = Vec::new();
    let critical = count_of(RecommendationPriority::Critical);
    if critical > 0 {
        parts.push(format!(
            "{critical} critical-priority issues require immediate attention"
        ));
    }
    let high = count_of(RecommendationPriority::High);
    if high > 0 {
        parts.push(format!("{high} high-priority issues require immediate attention"));
    }
    let medium = count_of(RecommendationPriority::Medium);
    if medium > 0 {
        parts.push(format!("{medium} medium-priority optimizations available"));
    }
    let low = count_of(RecommendationPriority::Low);
    if low > 0 {
        parts.push(format!("{low} low-priority improvements suggested"));
    }
    parts.join("; ")
}

fn statistics(recommendations: &[Recommendation]) -> Attrs {
    let mut stats = Attrs::new();
    if recommendations.is_empty() {
        return stats;
    }

    let mut by_priority: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut by_category: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut by_component: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_urgency: BTreeMap<&'static str, usize> = BTreeMap::new();
    for rec in recommendations {
        *by_priority.entry(rec.priority.name()).or_default() += 1;
        *by_category.entry(rec.category.name()).or_default() += 1;
        *by_component.entry(rec.component.clone()).or_default() += 1;
        *by_urgency.entry(rec.urgency.name()).or_default() += 1;
    }

    stats.insert("total_recommendations".into(), json!(recommendations.len()));
    stats.insert(
        "critical_count".into(),
        json!(by_priority.get("critical").copied().unwrap_or(0)),
    );
    stats.insert(
        "high_priority_count".into(),
        json!(by_priority.get("high").copied().unwrap_or(0)),
    );
    stats.insert("by_priority".into(), json!(by_priority));
    stats.insert("by_category".into(), json!(by_category));
    stats.insert("by_component".into(), json!(by_component));
    stats.insert("by_urgency".into(), json!(by_urgency));
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sl_common::HardwareInfo;

    fn diagnostic_with_cpu(cpu: serde_json::Value) -> Diagnostic {
        Diagnostic {
            hardware: HardwareInfo {
                cpu: cpu.as_object().cloned().unwrap_or_default(),
                ..HardwareInfo::default()
            },
            kernel_config: None,
            log_analysis: None,
            recommendations: Attrs::new(),
            explanation: String::new(),
        }
    }

    #[test]
    fn test_critical_temperature_recommendation() {
        let diagnostic = diagnostic_with_cpu(json!({
            "temperature": 86.0,
            "cores": 4,
            "load_avg_1min": 0.5,
            "governor": "performance",
        }));
        let recs = hardware_recommendations(&diagnostic);
        let cooling: Vec<_> = recs
            .iter()
            .filter(|r| r.action.starts_with("Immediate CPU cooling required"))
            .collect();
        assert_eq!(cooling.len(), 1);
        let rec = cooling[0];
        assert_eq!(rec.component, "cpu");
        assert_eq!(rec.category, RecommendationCategory::Stability);
        assert_eq!(rec.priority, RecommendationPriority::Critical);
        assert_eq!(rec.urgency, Urgency::Immediate);
        // Governor is fine and load is low, so nothing else fires.
        assert_eq!(recs.len(), 1);
    }

    #[test]
    fn test_load_thresholds_split_between_generators() {
        // 1.6/core: advisory only, not the hardware rule.
        let diagnostic = diagnostic_with_cpu(json!({
            "cores": 4, "load_avg_1min": 6.4, "governor": "performance",
        }));
        assert!(hardware_recommendations(&diagnostic)
            .iter()
            .all(|r| r.action != "Investigate high CPU load"));
        assert!(performance_recommendations(&diagnostic)
            .iter()
            .any(|r| r.action == "Optimize CPU usage"));

        // 2.5/core: both fire.
        let diagnostic = diagnostic_with_cpu(json!({
            "cores": 4, "load_avg_1min": 10.0, "governor": "performance",
        }));
        assert!(hardware_recommendations(&diagnostic)
            .iter()
            .any(|r| r.action == "Investigate high CPU load"));
    }

    #[test]
    fn test_dedup_keeps_one_of_identical() {
        let mk = || {
            rec(
                "cpu",
                RecommendationCategory::Performance,
                RecommendationPriority::High,
                "Improve CPU cooling",
                "details",
                "impact",
                Urgency::Soon,
            )
        };
        let out = deduplicate(vec![mk(), mk()]);
        assert_eq!(out.len(), 1);
        // Idempotent.
        assert_eq!(deduplicate(out.clone()).len(), out.len());
    }

    #[test]
    fn test_generate_report_shape() {
        let diagnostic = diagnostic_with_cpu(json!({"temperature": 86.0, "cores": 4}));
        let report = RecommendationGenerator::new().generate(&diagnostic);
        assert!(report.contains_key("recommendations"));
        assert!(report.contains_key("prioritized"));
        assert!(report.contains_key("summary"));
        assert!(report.contains_key("implementation_guides"));
        assert!(report.contains_key("statistics"));

        let prioritized = report["prioritized"].as_array().unwrap();
        assert!(!prioritized.is_empty());
        // Every item carries the mandatory fields and an explanation.
        for item in prioritized {
            for field in ["component", "category", "priority", "action", "urgency"] {
                assert!(item.get(field).is_some(), "missing {field}");
            }
            assert!(item["explanation"].as_str().unwrap().ends_with('.'));
        }
        // The critical cooling item sorts first.
        assert_eq!(prioritized[0]["action"], "Immediate CPU cooling required");
    }

    #[test]
    fn test_statistics_category_counts_sum_to_total() {
        let diagnostic = diagnostic_with_cpu(json!({"temperature": 78.0, "cores": 8}));
        let report = RecommendationGenerator::new().generate(&diagnostic);
        let stats = report["statistics"].as_object().unwrap();
        let total = stats["total_recommendations"].as_u64().unwrap();
        let sum: u64 = stats["by_category"]
            .as_object()
            .unwrap()
            .values()
            .map(|v| v.as_u64().unwrap())
            .sum();
        assert_eq!(total, sum);
    }

    #[test]
    fn test_empty_diagnostic_still_reports() {
        let diagnostic = Diagnostic {
            hardware: HardwareInfo::default(),
            kernel_config: None,
            log_analysis: None,
            recommendations: Attrs::new(),
            explanation: String::new(),
        };
        let report = RecommendationGenerator::new().generate(&diagnostic);
        // Security and maintenance generators always contribute.
        let prioritized = report["prioritized"].as_array().unwrap();
        assert!(!prioritized.is_empty());
        assert!(report["summary"].as_str().unwrap().contains("priority"));
    }

    #[test]
    fn test_explanation_closing_sentences() {
        let item = rec(
            "cpu",
            RecommendationCategory::Stability,
            RecommendationPriority::Critical,
            "act",
            "details",
            "impact",
            Urgency::Immediate,
        );
        let explained = add_explanations(vec![item]);
        assert!(explained[0]
            .explanation
            .as_deref()
            .unwrap()
            .ends_with("This should be addressed immediately to prevent system issues."));
    }
}
