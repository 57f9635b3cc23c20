//! Log pipeline orchestration: run the four stages, bucket issues by
//! severity, and compute summary statistics and a health score.

use std::collections::BTreeMap;

use chrono::{DateTime, Timelike, Utc};
use serde_json::json;
use sl_common::{Attrs, LogAnalysis, LogEntry, Severity};

use crate::system::SystemInterface;

use super::classify::{classify_entry, urgency_for};
use super::correlate::correlate_findings;
use super::parser::LogParser;
use super::patterns::{detect_hardware_patterns, detect_kernel_patterns, PatternFinding};

/// Issues reported per severity bucket.
const ISSUE_BUCKET_LIMIT: usize = 50;

/// Health score deductions per issue severity.
const DEDUCTION_CRITICAL: i64 = 30;
const DEDUCTION_HIGH: i64 = 10;
const DEDUCTION_MEDIUM: i64 = 3;
const DEDUCTION_LOW: i64 = 1;

pub struct LogAnalyzer<'a> {
    system: &'a dyn SystemInterface,
}

impl<'a> LogAnalyzer<'a> {
    pub fn new(system: &'a dyn SystemInterface) -> Self {
        LogAnalyzer { system }
    }

    /// Parse and analyze the named sources.
    pub fn analyze_logs(&self, sources: &[String], since: Option<&str>) -> LogAnalysis {
        let entries = LogParser::new(self.system).parse_logs(sources, since);
        self.analyze_entries(entries)
    }

    /// Analyze pre-parsed entries. Entries are sorted ascending by
    /// timestamp before any window-based stage runs.
    pub fn analyze_entries(&self, mut entries: Vec<LogEntry>) -> LogAnalysis {
        entries.sort_by_key(|e| e.timestamp);

        let hardware = detect_hardware_patterns(&entries);
        let kernel = detect_kernel_patterns(&entries);
        let correlated = correlate_findings(&entries, &hardware, &kernel);
        let issues = bucket_issues(&hardware, &kernel, &correlated);

        let mut summary = Attrs::new();
        summary.insert("statistics".into(), json!(statistics(&entries)));
        summary.insert("health".into(), json!(health_assessment(&issues)));

        let mut patterns = Attrs::new();
        patterns.insert("hardware".into(), json!(hardware));
        patterns.insert("kernel".into(), json!(kernel));
        patterns.insert("correlated".into(), json!(correlated));

        LogAnalysis {
            entries,
            patterns,
            issues,
            summary,
        }
    }

    /// Detailed, single-entry analysis: classification plus context.
    pub fn analyze_entry(&self, entry: &LogEntry) -> Attrs {
        self.analyze_entry_at(entry, Utc::now())
    }

    fn analyze_entry_at(&self, entry: &LogEntry, now: DateTime<Utc>) -> Attrs {
        let classification = classify_entry(entry);
        let age_hours = (now - entry.timestamp).num_minutes() as f64 / 60.0;

        let mut context = Attrs::new();
        context.insert(
            "timestamp_info".into(),
            json!({
                "formatted": entry.timestamp.to_rfc3339(),
                "age_hours": (age_hours * 100.0).round() / 100.0,
                "time_of_day": time_of_day(entry.timestamp),
            }),
        );
        context.insert(
            "source_info".into(),
            json!({
                "facility": entry.facility,
                "source": entry.source,
                "is_kernel": entry.facility == "kernel",
            }),
        );
        context.insert(
            "message_info".into(),
            json!({
                "length": entry.message.len(),
                "word_count": entry.message.split_whitespace().count(),
            }),
        );

        let mut out = Attrs::new();
        out.insert("entry".into(), json!(entry));
        out.insert("classification".into(), json!(classification));
        out.insert("context".into(), json!(context));
        out
    }
}

/// Bucket pattern and correlation findings by severity level with counts
/// and a bounded item list per bucket.
fn bucket_issues(
    hardware: &BTreeMap<String, Vec<PatternFinding>>,
    kernel: &BTreeMap<String, Vec<PatternFinding>>,
    correlated: &[super::correlate::CorrelatedFinding],
) -> Attrs {
    let mut buckets: BTreeMap<&'static str, Vec<serde_json::Value>> = BTreeMap::new();
    for level in ["critical", "high", "medium", "low"] {
        buckets.insert(level, Vec::new());
    }

    let mut push = |severity: Severity, value: serde_json::Value| {
        buckets
            .get_mut(urgency_for(severity))
            .expect("bucket preallocated")
            .push(value);
    };

    for finding in hardware.values().flatten() {
        push(finding.severity, json!(finding));
    }
    for finding in kernel.values().flatten() {
        push(finding.severity, json!(finding));
    }
    for finding in correlated {
        push(finding.severity, json!(finding));
    }

    let mut issues = Attrs::new();
    for (level, mut items) in buckets {
        let count = items.len();
        items.truncate(ISSUE_BUCKET_LIMIT);
        issues.insert(
            level.to_string(),
            json!({ "count": count, "items": items }),
        );
    }
    issues
}

fn statistics(entries: &[LogEntry]) -> Attrs {
    let mut severity_distribution: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut facility_distribution: BTreeMap<String, usize> = BTreeMap::new();
    let mut source_distribution: BTreeMap<String, usize> = BTreeMap::new();
    for entry in entries {
        *severity_distribution.entry(entry.severity.name()).or_default() += 1;
        *facility_distribution.entry(entry.facility.clone()).or_default() += 1;
        *source_distribution.entry(entry.source.clone()).or_default() += 1;
    }

    let time_range = match (entries.first(), entries.last()) {
        (Some(first), Some(last)) => json!({
            "start": first.timestamp.to_rfc3339(),
            "end": last.timestamp.to_rfc3339(),
        }),
        _ => json!(null),
    };

    let mut stats = Attrs::new();
    stats.insert("total_entries".into(), json!(entries.len()));
    stats.insert("severity_distribution".into(), json!(severity_distribution));
    stats.insert("facility_distribution".into(), json!(facility_distribution));
    stats.insert("source_distribution".into(), json!(source_distribution));
    stats.insert("time_range".into(), time_range);
    stats
}

/// Health score: `max(0, 100 - 30*crit - 10*high - 3*medium - 1*low)`.
fn health_assessment(issues: &Attrs) -> Attrs {
    let count = |level: &str| -> i64 {
        issues
            .get(level)
            .and_then(|b| b.get("count"))
            .and_then(|c| c.as_i64())
            .unwrap_or(0)
    };
    let critical = count("critical");
    let high = count("high");
    let medium = count("medium");
    let low = count("low");

    let score = (100
        - DEDUCTION_CRITICAL * critical
        - DEDUCTION_HIGH * high
        - DEDUCTION_MEDIUM * medium
        - DEDUCTION_LOW * low)
        .max(0);

    let status = match score {
        90..=100 => "healthy",
        70..=89 => "fair",
        40..=69 => "degraded",
        _ => "critical",
    };

    let mut health = Attrs::new();
    health.insert("health_score".into(), json!(score));
    health.insert("health_status".into(), json!(status));
    health.insert("total_issues".into(), json!(critical + high + medium + low));
    health.insert("critical_issues".into(), json!(critical));
    health
}

fn time_of_day(timestamp: DateTime<Utc>) -> &'static str {
    match timestamp.hour() {
        5..=11 => "morning",
        12..=17 => "afternoon",
        18..=22 => "evening",
        _ => "night",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::MockSystem;
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
    fn test_entries_sorted_ascending() {
        let sys = MockSystem::new();
        let analysis = LogAnalyzer::new(&sys).analyze_entries(vec![
            entry_at(100, Severity::Info, "later"),
            entry_at(0, Severity::Info, "earlier"),
            entry_at(50, Severity::Info, "middle"),
        ]);
        let times: Vec<_> = analysis.entries.iter().map(|e| e.timestamp).collect();
        let mut sorted = times.clone();
        sorted.sort();
        assert_eq!(times, sorted);
    }

    #[test]
    fn test_issue_buckets_and_health_score() {
        let sys = MockSystem::new();
        let analysis = LogAnalyzer::new(&sys).analyze_entries(vec![
            entry_at(0, Severity::Emergency, "Kernel panic - not syncing"),
            entry_at(10, Severity::Error, "ata1: I/O error, dev sda, sector 5"),
        ]);
        let critical = &analysis.issues["critical"];
        assert_eq!(critical["count"], 1);
        let high = &analysis.issues["high"];
        assert_eq!(high["count"], 1);

        // 100 - 30*1 - 10*1 = 60 -> degraded.
        let health = &analysis.summary["health"];
        assert_eq!(health["health_score"], 60);
        assert_eq!(health["health_status"], "degraded");
    }

    #[test]
    fn test_statistics_distributions() {
        let sys = MockSystem::new();
        let analysis = LogAnalyzer::new(&sys).analyze_entries(vec![
            entry_at(0, Severity::Error, "one"),
            entry_at(1, Severity::Error, "two"),
            entry_at(2, Severity::Info, "three"),
        ]);
        let stats = &analysis.summary["statistics"];
        assert_eq!(stats["total_entries"], 3);
        assert_eq!(stats["severity_distribution"]["error"], 2);
        assert_eq!(stats["severity_distribution"]["info"], 1);
        assert_eq!(stats["facility_distribution"]["kernel"], 3);
        assert!(stats["time_range"]["start"].is_string());
    }

    #[test]
    fn test_empty_analysis_is_healthy() {
        let sys = MockSystem::new();
        let analysis = LogAnalyzer::new(&sys).analyze_entries(Vec::new());
        let health = &analysis.summary["health"];
        assert_eq!(health["health_score"], 100);
        assert_eq!(health["health_status"], "healthy");
        assert_eq!(analysis.summary["statistics"]["time_range"], json!(null));
    }

    #[test]
    fn test_analyze_entry_context() {
        let sys = MockSystem::new();
        let entry = entry_at(0, Severity::Critical, "kernel panic - not syncing");
        let analyzer = LogAnalyzer::new(&sys);
        let now = Utc.timestamp_opt(1_700_000_000 + 7200, 0).unwrap();
        let result = analyzer.analyze_entry_at(&entry, now);
        assert_eq!(result["classification"]["category"], "kernel");
        assert_eq!(result["classification"]["urgency"], "critical");
        assert_eq!(result["context"]["timestamp_info"]["age_hours"], 2.0);
        assert_eq!(result["context"]["source_info"]["is_kernel"], true);
        assert!(result["context"]["message_info"]["word_count"].as_u64().unwrap() > 0);
    }
}
