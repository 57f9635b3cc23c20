//! Log pipeline integration: ordering, OOM storm correlation, and
//! degraded-source behavior.

use chrono::{TimeZone, Utc};
use sl_common::{LogEntry, Severity};
use sl_core::logs::LogAnalyzer;
use sl_core::system::MockSystem;

fn entry_at(secs: i64, severity: Severity, message: &str) -> LogEntry {
    LogEntry {
        timestamp: Utc.timestamp_opt(1_701_684_000 + secs, 0).unwrap(),
        facility: "kernel".to_string(),
        severity,
        message: message.to_string(),
        source: "kern".to_string(),
    }
}

#[test]
fn oom_storm_correlates_three_kills_into_one_critical_finding() {
    let sys = MockSystem::new();
    let analysis = LogAnalyzer::new(&sys).analyze_entries(vec![
        entry_at(0, Severity::Error, "Out of memory: Kill process 2001 (chrome)"),
        entry_at(20, Severity::Error, "Out of memory: Kill process 2002 (chrome)"),
        entry_at(40, Severity::Error, "Out of memory: Kill process 2003 (chrome)"),
    ]);

    let correlated = analysis.patterns["correlated"].as_array().unwrap();
    let storms: Vec<_> = correlated
        .iter()
        .filter(|f| f["type"] == "oom_storm")
        .collect();
    assert_eq!(storms.len(), 1);
    let storm = storms[0];
    assert_eq!(storm["severity"], "critical");
    assert_eq!(storm["evidence"].as_array().unwrap().len(), 3);
}

#[test]
fn entries_are_returned_sorted_ascending() {
    let sys = MockSystem::new();
    let analysis = LogAnalyzer::new(&sys).analyze_entries(vec![
        entry_at(300, Severity::Info, "third"),
        entry_at(100, Severity::Info, "first"),
        entry_at(200, Severity::Info, "second"),
    ]);
    let messages: Vec<&str> = analysis.entries.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["first", "second", "third"]);
}

#[test]
fn issues_bucketed_with_counts_and_health_score() {
    let sys = MockSystem::new();
    let analysis = LogAnalyzer::new(&sys).analyze_entries(vec![
        entry_at(0, Severity::Emergency, "Kernel panic - not syncing: Attempted to kill init"),
        entry_at(10, Severity::Error, "ata3: I/O error, dev sdb, sector 100"),
        entry_at(20, Severity::Error, "ata3: I/O error, dev sdb, sector 101"),
    ]);

    assert_eq!(analysis.issues["critical"]["count"], 1);
    assert_eq!(analysis.issues["high"]["count"], 2);
    // 100 - 30 - 10*2 = 50.
    assert_eq!(analysis.summary["health"]["health_score"], 50);
    assert_eq!(analysis.summary["health"]["health_status"], "degraded");
}

#[test]
fn pipeline_over_mock_sources_end_to_end() {
    let syslog = "\
Dec  4 10:30:45 host sshd[1234]: Accepted password for user
Dec  4 10:31:00 host kernel: [100.000] ata1: I/O error, dev sda, sector 12345
Dec  4 10:31:10 host systemd[1]: Started session.
";
    let sys = MockSystem::new()
        .with_file("/var/log/syslog", syslog)
        .with_file("/proc/stat", "cpu 1 2 3\nbtime 1701684000\n");

    let analysis = LogAnalyzer::new(&sys).analyze_logs(&["syslog".to_string()], None);
    assert_eq!(analysis.entries.len(), 3);
    let stats = &analysis.summary["statistics"];
    assert_eq!(stats["total_entries"], 3);
    assert_eq!(stats["facility_distribution"]["syslog"], 3);

    let hardware = &analysis.patterns["hardware"];
    assert_eq!(hardware["storage_issues"].as_array().unwrap().len(), 1);
}

#[test]
fn unavailable_sources_yield_empty_but_valid_analysis() {
    let sys = MockSystem::new();
    let analysis = LogAnalyzer::new(&sys).analyze_logs(
        &["journald".to_string(), "syslog".to_string(), "dmesg".to_string()],
        None,
    );
    assert!(analysis.entries.is_empty());
    assert_eq!(analysis.summary["health"]["health_score"], 100);
}

#[test]
fn disk_failure_correlation_spans_smart_and_io_errors() {
    let sys = MockSystem::new();
    let analysis = LogAnalyzer::new(&sys).analyze_entries(vec![
        entry_at(
            0,
            Severity::Warning,
            "smartd[900]: Device: /dev/sda [SAT], 16 Currently unreadable (pending sector) sectors",
        ),
        entry_at(7200, Severity::Error, "ata1.00: I/O error, dev sda, sector 5555"),
    ]);
    let correlated = analysis.patterns["correlated"].as_array().unwrap();
    assert!(correlated.iter().any(|f| f["type"] == "disk_failing"));
}
