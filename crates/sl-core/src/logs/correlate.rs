//! Stage L4: temporal correlation of detected patterns.
//!
//! Correlation windows are half-open `[t, t+Δ)`. Three causal chains are
//! recognized: thermal escalation ending in a panic, OOM storms, and a
//! failing disk (SMART complaint plus I/O error).

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sl_common::{LogEntry, Severity};

use super::patterns::PatternFinding;

/// Thermal chain window.
const THERMAL_WINDOW_MINS: i64 = 5;
/// OOM storm window.
const OOM_STORM_WINDOW_SECS: i64 = 60;
/// Minimum OOM events to call a storm.
const OOM_STORM_MIN_EVENTS: usize = 3;
/// Disk-failing window.
const DISK_FAILING_WINDOW_HOURS: i64 = 24;

/// A higher-level finding produced by combining temporally-related
/// patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelatedFinding {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub recommendation: String,
    pub evidence: Vec<LogEntry>,
}

/// Run all correlators over the detected patterns and raw entries.
pub fn correlate_findings(
    entries: &[LogEntry],
    hardware: &BTreeMap<String, Vec<PatternFinding>>,
    kernel: &BTreeMap<String, Vec<PatternFinding>>,
) -> Vec<CorrelatedFinding> {
    let mut findings = Vec::new();
    findings.extend(thermal_chain(hardware, kernel));
    findings.extend(oom_storm(hardware));
    findings.extend(disk_failing(entries, hardware));
    findings
}

/// Temperature threshold event, then throttling, then a kernel panic,
/// all inside a five-minute window.
fn thermal_chain(
    hardware: &BTreeMap<String, Vec<PatternFinding>>,
    kernel: &BTreeMap<String, Vec<PatternFinding>>,
) -> Option<CorrelatedFinding> {
    let temperature = hardware.get("temperature_issues")?;
    let panics = kernel.get("kernel_panics")?;

    let window = Duration::minutes(THERMAL_WINDOW_MINS);
    for temp in temperature.iter().filter(|f| f.kind != "thermal_throttling") {
        let window_end = temp.timestamp + window;
        let Some(throttle) = temperature.iter().find(|f| {
            f.kind == "thermal_throttling"
                && f.timestamp >= temp.timestamp
                && f.timestamp < window_end
        }) else {
            continue;
        };
        if let Some(panic) = panics
            .iter()
            .find(|p| p.timestamp >= throttle.timestamp && p.timestamp < window_end)
        {
            let mut evidence = temp.evidence.clone();
            evidence.extend(throttle.evidence.clone());
            evidence.extend(panic.evidence.clone());
            return Some(CorrelatedFinding {
                kind: "thermal_shutdown_chain".to_string(),
                severity: Severity::Critical,
                timestamp: temp.timestamp,
                description:
                    "Overheating escalated through throttling into a kernel panic".to_string(),
                recommendation:
                    "Fix cooling before further load; inspect fans, heatsink seating, and airflow"
                        .to_string(),
                evidence,
            });
        }
    }
    None
}

/// Three or more OOM-killer events within sixty seconds of the first.
fn oom_storm(hardware: &BTreeMap<String, Vec<PatternFinding>>) -> Option<CorrelatedFinding> {
    let memory = hardware.get("memory_issues")?;
    let mut oom: Vec<&PatternFinding> = memory
        .iter()
        .filter(|f| f.kind == "oom_killer")
        .collect();
    oom.sort_by_key(|f| f.timestamp);

    for (i, first) in oom.iter().enumerate() {
        let window_end = first.timestamp + Duration::seconds(OOM_STORM_WINDOW_SECS);
        let in_window: Vec<&&PatternFinding> = oom[i..]
            .iter()
            .take_while(|f| f.timestamp < window_end)
            .collect();
        if in_window.len() >= OOM_STORM_MIN_EVENTS {
            let evidence = in_window
                .iter()
                .flat_map(|f| f.evidence.iter().cloned())
                .collect();
            return Some(CorrelatedFinding {
                kind: "oom_storm".to_string(),
                severity: Severity::Critical,
                timestamp: first.timestamp,
                description: format!(
                    "{} OOM-killer activations within {} seconds",
                    in_window.len(),
                    OOM_STORM_WINDOW_SECS
                ),
                recommendation:
                    "The system is badly short of memory; stop the offending workload or add RAM"
                        .to_string(),
                evidence,
            });
        }
    }
    None
}

/// A SMART-related complaint plus a storage I/O error within 24 hours.
fn disk_failing(
    entries: &[LogEntry],
    hardware: &BTreeMap<String, Vec<PatternFinding>>,
) -> Option<CorrelatedFinding> {
    let io_errors: Vec<&PatternFinding> = hardware
        .get("storage_issues")?
        .iter()
        .filter(|f| f.kind == "io_error")
        .collect();
    if io_errors.is_empty() {
        return None;
    }

    let smart_re = Regex::new(r"(?i)(smart|smartd).*(fail|error|prefail|pending sector)")
        .expect("static regex");
    let smart_entry = entries.iter().find(|e| smart_re.is_match(&e.message))?;

    let window = Duration::hours(DISK_FAILING_WINDOW_HOURS);
    let io = io_errors.iter().find(|f| {
        let delta = f.timestamp - smart_entry.timestamp;
        delta > Duration::hours(-DISK_FAILING_WINDOW_HOURS) && delta < window
    })?;

    let mut evidence = vec![smart_entry.clone()];
    evidence.extend(io.evidence.clone());
    Some(CorrelatedFinding {
        kind: "disk_failing".to_string(),
        severity: Severity::Critical,
        timestamp: smart_entry.timestamp,
        description: "SMART complaints coincide with storage I/O errors".to_string(),
        recommendation: "Back up the data and replace the disk".to_string(),
        evidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::patterns::{detect_hardware_patterns, detect_kernel_patterns};
    use chrono::TimeZone;

    fn entry_at(secs: i64, message: &str) -> LogEntry {
        LogEntry {
            timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            facility: "kernel".to_string(),
            severity: Severity::Error,
            message: message.to_string(),
            source: "kern".to_string(),
        }
    }

    #[test]
    fn test_oom_storm_detected() {
        let entries = vec![
            entry_at(0, "Out of memory: Kill process 100 (java)"),
            entry_at(20, "Out of memory: Kill process 101 (java)"),
            entry_at(40, "Out of memory: Kill process 102 (java)"),
        ];
        let hardware = detect_hardware_patterns(&entries);
        let kernel = detect_kernel_patterns(&entries);
        let findings = correlate_findings(&entries, &hardware, &kernel);
        let storm = findings.iter().find(|f| f.kind == "oom_storm").unwrap();
        assert_eq!(storm.severity, Severity::Critical);
        assert_eq!(storm.evidence.len(), 3);
    }

    #[test]
    fn test_oom_events_spread_out_do_not_storm() {
        let entries = vec![
            entry_at(0, "Out of memory: Kill process 100 (java)"),
            entry_at(60, "Out of memory: Kill process 101 (java)"),
            entry_at(120, "Out of memory: Kill process 102 (java)"),
        ];
        let hardware = detect_hardware_patterns(&entries);
        let kernel = detect_kernel_patterns(&entries);
        let findings = correlate_findings(&entries, &hardware, &kernel);
        assert!(findings.iter().all(|f| f.kind != "oom_storm"));
    }

    #[test]
    fn test_thermal_chain_detected() {
        let entries = vec![
            entry_at(0, "CPU2: Package temperature above threshold, cpu clock throttled"),
            entry_at(60, "CPU thermal throttling enabled"),
            entry_at(120, "Kernel panic - not syncing: overheating"),
        ];
        let hardware = detect_hardware_patterns(&entries);
        let kernel = detect_kernel_patterns(&entries);
        let findings = correlate_findings(&entries, &hardware, &kernel);
        let chain = findings
            .iter()
            .find(|f| f.kind == "thermal_shutdown_chain")
            .unwrap();
        assert_eq!(chain.severity, Severity::Critical);
        assert_eq!(chain.evidence.len(), 3);
    }

    #[test]
    fn test_thermal_chain_outside_window_ignored() {
        let entries = vec![
            entry_at(0, "CPU2: Package temperature above threshold"),
            entry_at(600, "CPU thermal throttling enabled"),
            entry_at(1200, "Kernel panic - not syncing: overheating"),
        ];
        let hardware = detect_hardware_patterns(&entries);
        let kernel = detect_kernel_patterns(&entries);
        let findings = correlate_findings(&entries, &hardware, &kernel);
        assert!(findings.iter().all(|f| f.kind != "thermal_shutdown_chain"));
    }

    #[test]
    fn test_disk_failing_correlation() {
        let entries = vec![
            entry_at(0, "smartd[833]: Device: /dev/sda, 8 Currently unreadable (pending sector) sectors"),
            entry_at(3600, "ata1: I/O error, dev sda, sector 999"),
        ];
        let hardware = detect_hardware_patterns(&entries);
        let kernel = detect_kernel_patterns(&entries);
        let findings = correlate_findings(&entries, &hardware, &kernel);
        let disk = findings.iter().find(|f| f.kind == "disk_failing").unwrap();
        assert_eq!(disk.severity, Severity::Critical);
        assert!(disk.recommendation.contains("replace"));
    }
}
