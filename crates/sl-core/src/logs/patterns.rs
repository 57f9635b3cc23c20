//! Stage L3: pattern detection.
//!
//! Hardware detectors group findings per subsystem; kernel detectors
//! track panics, oopses, warnings, bugs, taint events, and call traces.
//! Every finding carries the triggering entry as evidence.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sl_common::{LogEntry, Severity};

/// Window after a warning within which a call trace upgrades it.
const CALL_TRACE_WINDOW_SECS: i64 = 5;

/// One detected pattern with its evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternFinding {
    /// Pattern identifier, e.g. `machine_check_exception`.
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub recommendation: String,
    pub evidence: Vec<LogEntry>,
}

impl PatternFinding {
    fn new(
        kind: &str,
        severity: Severity,
        description: &str,
        recommendation: &str,
        entry: &LogEntry,
    ) -> Self {
        PatternFinding {
            kind: kind.to_string(),
            severity,
            timestamp: entry.timestamp,
            description: description.to_string(),
            recommendation: recommendation.to_string(),
            evidence: vec![entry.clone()],
        }
    }
}

struct HardwareRule {
    kind: &'static str,
    bucket: &'static str,
    severity: Severity,
    pattern: &'static str,
    description: &'static str,
    recommendation: &'static str,
}

const HARDWARE_RULES: [HardwareRule; 7] = [
    HardwareRule {
        kind: "machine_check_exception",
        bucket: "cpu_issues",
        severity: Severity::Critical,
        pattern: r"(?i)machine check exception",
        description: "Machine Check Exception detected",
        recommendation: "Check CPU, memory, and power supply health",
    },
    HardwareRule {
        kind: "io_error",
        bucket: "storage_issues",
        severity: Severity::Error,
        pattern: r"(?i)(ata\d*.*i/o error|blk_update_request|i/o error.*dev)",
        description: "Storage I/O error detected",
        recommendation: "Check storage devices and cables; review SMART data",
    },
    HardwareRule {
        kind: "oom_killer",
        bucket: "memory_issues",
        severity: Severity::Error,
        pattern: r"(?i)(out of memory: kill|oom-killer|oom killer)",
        description: "Out-of-memory killer activated",
        recommendation: "Investigate memory consumers; consider adding RAM",
    },
    HardwareRule {
        kind: "package_temp_threshold",
        bucket: "temperature_issues",
        severity: Severity::Warning,
        pattern: r"(?i)package temperature above threshold",
        description: "CPU package temperature above threshold",
        recommendation: "Check cooling and airflow",
    },
    HardwareRule {
        kind: "thermal_throttling",
        bucket: "temperature_issues",
        severity: Severity::Error,
        pattern: r"(?i)thermal throttling",
        description: "Thermal throttling engaged",
        recommendation: "Improve cooling before sustained load",
    },
    HardwareRule {
        kind: "usb_disconnect_unexpected",
        bucket: "storage_issues",
        severity: Severity::Warning,
        pattern: r"(?i)usb .*disconnect",
        description: "USB device disconnected unexpectedly",
        recommendation: "Check USB cabling and power delivery",
    },
    HardwareRule {
        kind: "power_failure",
        bucket: "power_issues",
        severity: Severity::Error,
        pattern: r"(?i)(under-?voltage|power supply failure|power failure)",
        description: "Power delivery problem detected",
        recommendation: "Check power supply and connections",
    },
];

/// Hardware pattern buckets, always all present.
const HARDWARE_BUCKETS: [&str; 6] = [
    "cpu_issues",
    "memory_issues",
    "storage_issues",
    "network_issues",
    "temperature_issues",
    "power_issues",
];

/// Detect per-subsystem hardware patterns.
pub fn detect_hardware_patterns(entries: &[LogEntry]) -> BTreeMap<String, Vec<PatternFinding>> {
    let rules: Vec<(Regex, &HardwareRule)> = HARDWARE_RULES
        .iter()
        .map(|rule| (Regex::new(rule.pattern).expect("static regex"), rule))
        .collect();

    let mut buckets: BTreeMap<String, Vec<PatternFinding>> = HARDWARE_BUCKETS
        .iter()
        .map(|b| (b.to_string(), Vec::new()))
        .collect();

    for entry in entries {
        for (regex, rule) in &rules {
            if regex.is_match(&entry.message) {
                buckets
                    .get_mut(rule.bucket)
                    .expect("bucket preallocated")
                    .push(PatternFinding::new(
                        rule.kind,
                        rule.severity,
                        rule.description,
                        rule.recommendation,
                        entry,
                    ));
            }
        }
    }
    buckets
}

/// Detect kernel-level patterns. A warning is upgraded from low to medium
/// urgency when a call trace follows within the `[t, t+5s)` window.
pub fn detect_kernel_patterns(entries: &[LogEntry]) -> BTreeMap<String, Vec<PatternFinding>> {
    let panic_re = Regex::new(r"(?i)kernel panic").expect("static regex");
    let oops_re = Regex::new(r"(?i)\boops\b").expect("static regex");
    let warning_re = Regex::new(r"(?i)(warn_on|\bwarning\b)").expect("static regex");
    let bug_re = Regex::new(r"(?i)(kernel bug|\bBUG:)").expect("static regex");
    let tainted_re = Regex::new(r"(?i)tainted").expect("static regex");
    let call_trace_re = Regex::new(r"(?i)call trace").expect("static regex");

    let call_trace_times: Vec<DateTime<Utc>> = entries
        .iter()
        .filter(|e| call_trace_re.is_match(&e.message))
        .map(|e| e.timestamp)
        .collect();

    let mut buckets: BTreeMap<String, Vec<PatternFinding>> = [
        "kernel_panics",
        "oops",
        "warnings",
        "bugs",
        "tainted",
        "call_traces",
    ]
    .iter()
    .map(|b| (b.to_string(), Vec::new()))
    .collect();

    for entry in entries {
        if panic_re.is_match(&entry.message) {
            buckets.get_mut("kernel_panics").expect("bucket").push(
                PatternFinding::new(
                    "kernel_panic",
                    Severity::Critical,
                    "Kernel panic detected",
                    "Check hardware health and update the kernel",
                    entry,
                ),
            );
        }
        if oops_re.is_match(&entry.message) {
            buckets.get_mut("oops").expect("bucket").push(PatternFinding::new(
                "oops",
                Severity::Error,
                "Kernel oops detected",
                "Review the oops trace; check drivers and hardware",
                entry,
            ));
        }
        if bug_re.is_match(&entry.message) {
            buckets.get_mut("bugs").expect("bucket").push(PatternFinding::new(
                "kernel_bug",
                Severity::Error,
                "Kernel BUG assertion hit",
                "Report to the kernel or distribution bug tracker",
                entry,
            ));
        }
        if tainted_re.is_match(&entry.message) {
            buckets.get_mut("tainted").expect("bucket").push(PatternFinding::new(
                "tainted_kernel",
                Severity::Warning,
                "Kernel is tainted",
                "Identify the tainting module before debugging further",
                entry,
            ));
        }
        if call_trace_re.is_match(&entry.message) {
            buckets.get_mut("call_traces").expect("bucket").push(
                PatternFinding::new(
                    "call_trace",
                    Severity::Warning,
                    "Kernel call trace emitted",
                    "Correlate with the surrounding warning or bug",
                    entry,
                ),
            );
        }
        if warning_re.is_match(&entry.message) && !call_trace_re.is_match(&entry.message) {
            let window_end = entry.timestamp + Duration::seconds(CALL_TRACE_WINDOW_SECS);
            let followed_by_trace = call_trace_times
                .iter()
                .any(|t| *t >= entry.timestamp && *t < window_end);
            let severity = if followed_by_trace {
                Severity::Warning
            } else {
                Severity::Notice
            };
            buckets.get_mut("warnings").expect("bucket").push(PatternFinding::new(
                "kernel_warning",
                severity,
                "Kernel warning emitted",
                "Review the warning context",
                entry,
            ));
        }
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry_at(secs: i64, severity: Severity, message: &str) -> LogEntry {
        LogEntry {
            timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            facility: "kernel".to_string(),
            severity,
            message: message.to_string(),
            source: "kern".to_string(),
        }
    }

    #[test]
    fn test_hardware_patterns() {
        let entries = vec![
            entry_at(0, Severity::Error, "Machine Check Exception: CPU 0 Bank 1"),
            entry_at(10, Severity::Error, "ata1: I/O error, dev sda, sector 123"),
            entry_at(20, Severity::Warning, "Out of memory: Kill process 42 (chrome)"),
            entry_at(30, Severity::Warning, "CPU0: Package temperature above threshold"),
            entry_at(40, Severity::Info, "Service started"),
        ];
        let patterns = detect_hardware_patterns(&entries);
        assert_eq!(patterns["cpu_issues"].len(), 1);
        assert_eq!(patterns["cpu_issues"][0].kind, "machine_check_exception");
        assert_eq!(patterns["cpu_issues"][0].severity, Severity::Critical);
        assert_eq!(patterns["storage_issues"].len(), 1);
        assert_eq!(patterns["memory_issues"].len(), 1);
        assert_eq!(patterns["temperature_issues"].len(), 1);
        assert!(patterns["network_issues"].is_empty());
        assert_eq!(patterns["cpu_issues"][0].evidence.len(), 1);
    }

    #[test]
    fn test_kernel_panic_and_oops_severities() {
        let entries = vec![
            entry_at(0, Severity::Emergency, "Kernel panic - not syncing: Fatal exception"),
            entry_at(5, Severity::Error, "Oops: 0002 [#1] SMP"),
        ];
        let patterns = detect_kernel_patterns(&entries);
        assert_eq!(patterns["kernel_panics"].len(), 1);
        assert_eq!(patterns["kernel_panics"][0].severity, Severity::Critical);
        assert_eq!(patterns["oops"].len(), 1);
        assert_eq!(patterns["oops"][0].severity, Severity::Error);
    }

    #[test]
    fn test_warning_upgraded_by_following_call_trace() {
        let entries = vec![
            entry_at(0, Severity::Warning, "WARNING: CPU: 2 PID: 1 at kernel/fork.c"),
            entry_at(2, Severity::Warning, "Call Trace:"),
            entry_at(100, Severity::Warning, "warning: lone deprecation"),
        ];
        let patterns = detect_kernel_patterns(&entries);
        let warnings = &patterns["warnings"];
        assert_eq!(warnings.len(), 2);
        // First warning has a trace within 5 s, second does not.
        assert_eq!(warnings[0].severity, Severity::Warning);
        assert_eq!(warnings[1].severity, Severity::Notice);
        assert_eq!(patterns["call_traces"].len(), 1);
    }

    #[test]
    fn test_call_trace_window_is_half_open() {
        let entries = vec![
            entry_at(0, Severity::Warning, "WARNING: at drivers/gpu/drm"),
            entry_at(5, Severity::Warning, "Call Trace:"),
        ];
        let patterns = detect_kernel_patterns(&entries);
        // Trace at exactly t+5s falls outside [t, t+5).
        assert_eq!(patterns["warnings"][0].severity, Severity::Notice);
    }
}
