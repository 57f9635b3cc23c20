//! Stage L1: log source parsing.
//!
//! Sources: journald, syslog, kern.log, auth.log, mail.log, daemon.log,
//! cron.log, dmesg. Each source maps to one collector (a journalctl or
//! dmesg invocation, or a /var/log file read) and a pure line parser.
//!
//! Timestamp formats are tried in order: RFC3164 (`Dec  4 10:30:45`,
//! year inferred), ISO 8601, `YYYY-MM-DD HH:MM:SS`, and kernel boot-time
//! `[12345.678]` offsets converted through the boot epoch. Boot-relative
//! lines are dropped when the boot epoch is unavailable, keeping the
//! timeline on a single clock.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use tracing::debug;

use sl_common::{LogEntry, Severity};

use crate::collect::parse_stat_btime;
use crate::system::SystemInterface;

/// Default journald lookback when no since filter is given.
const DEFAULT_SINCE: &str = "24 hours ago";

pub struct LogParser<'a> {
    system: &'a dyn SystemInterface,
}

impl<'a> LogParser<'a> {
    pub fn new(system: &'a dyn SystemInterface) -> Self {
        LogParser { system }
    }

    /// Parse the named sources into one entry list. Unknown sources are
    /// skipped with a debug event; a since filter like `"2 hours ago"`
    /// prunes entries older than the window.
    pub fn parse_logs(&self, sources: &[String], since: Option<&str>) -> Vec<LogEntry> {
        self.parse_logs_at(sources, since, Utc::now())
    }

    /// `parse_logs` with an injected `now` for deterministic tests.
    pub fn parse_logs_at(
        &self,
        sources: &[String],
        since: Option<&str>,
        now: DateTime<Utc>,
    ) -> Vec<LogEntry> {
        let btime = self.boot_epoch();
        let mut entries = Vec::new();

        for source in sources {
            match source.as_str() {
                "journald" => entries.extend(self.parse_journald(since)),
                "dmesg" => entries.extend(self.parse_dmesg(btime, now)),
                "syslog" => entries.extend(self.parse_log_file("/var/log/syslog", btime, now)),
                "kern.log" | "auth.log" | "mail.log" | "daemon.log" | "cron.log" => {
                    entries.extend(self.parse_log_file(&format!("/var/log/{source}"), btime, now));
                }
                other => debug!(source = other, "unknown log source skipped"),
            }
        }

        if let Some(delta) = since.and_then(parse_since) {
            let cutoff = now - delta;
            entries.retain(|e| e.timestamp >= cutoff);
        }

        entries
    }

    fn boot_epoch(&self) -> Option<i64> {
        let raw = self.system.read_file("/proc/stat")?;
        parse_stat_btime(&raw).ok()
    }

    fn parse_journald(&self, since: Option<&str>) -> Vec<LogEntry> {
        let since = since.unwrap_or(DEFAULT_SINCE);
        let result = self.system.run_command(&[
            "journalctl",
            "--output=json",
            "--no-pager",
            "--since",
            since,
        ]);
        if !result.success {
            debug!(reason = %result.reason(), "journalctl unavailable");
            return Vec::new();
        }
        result
            .stdout
            .lines()
            .filter_map(parse_journald_line)
            .collect()
    }

    fn parse_dmesg(&self, btime: Option<i64>, now: DateTime<Utc>) -> Vec<LogEntry> {
        let result = self.system.run_command(&["dmesg", "-T"]);
        let result = if result.success {
            result
        } else {
            self.system.run_command(&["dmesg"])
        };
        if !result.success {
            debug!(reason = %result.reason(), "dmesg unavailable");
            return Vec::new();
        }
        result
            .stdout
            .lines()
            .filter_map(|line| parse_dmesg_line(line, btime, now))
            .collect()
    }

    fn parse_log_file(
        &self,
        path: &str,
        btime: Option<i64>,
        now: DateTime<Utc>,
    ) -> Vec<LogEntry> {
        let Some(content) = self.system.read_file(path) else {
            debug!(path = path, "log file unavailable");
            return Vec::new();
        };
        content
            .lines()
            .filter_map(|line| parse_syslog_line(line, path, btime, now))
            .collect()
    }
}

/// Parse a since filter of the form `"<N> (second|minute|hour|day)[s] ago"`.
pub fn parse_since(text: &str) -> Option<Duration> {
    let re = Regex::new(r"^(\d+)\s+(second|minute|hour|day)s?\s+ago$").expect("static regex");
    let caps = re.captures(text.trim())?;
    let amount: i64 = caps[1].parse().ok()?;
    Some(match &caps[2] {
        "second" => Duration::seconds(amount),
        "minute" => Duration::minutes(amount),
        "hour" => Duration::hours(amount),
        _ => Duration::days(amount),
    })
}

/// Parse one syslog-family line. Handles RFC3164 lines and bare kernel
/// boot-time lines; anything else is skipped.
pub fn parse_syslog_line(
    line: &str,
    path: &str,
    btime: Option<i64>,
    now: DateTime<Utc>,
) -> Option<LogEntry> {
    let line = line.trim_end();
    if line.is_empty() {
        return None;
    }

    // Bare kernel line: "[12345.678] message".
    if let Some((timestamp, message)) = split_boot_offset(line) {
        let timestamp = boot_offset_to_wall(timestamp, btime)?;
        return Some(LogEntry {
            timestamp,
            facility: "kernel".to_string(),
            severity: kernel_severity(message),
            message: message.to_string(),
            source: "kern".to_string(),
        });
    }

    // RFC3164: "Dec  4 10:30:45 host source[pid]: message".
    let re = Regex::new(
        r"^([A-Z][a-z]{2})\s+(\d{1,2})\s+(\d{2}:\d{2}:\d{2})\s+(\S+)\s+([^\s:]+):\s*(.*)$",
    )
    .expect("static regex");
    let caps = re.captures(line)?;
    let timestamp = parse_rfc3164(&caps[1], &caps[2], &caps[3], now)?;
    let source = caps[5].to_string();
    let message = caps[6].to_string();

    let facility = facility_from_path(path);
    let severity = if facility == "kernel" || source == "kernel" {
        kernel_severity(&message)
    } else {
        Severity::Info
    };

    Some(LogEntry {
        timestamp,
        facility,
        severity,
        message,
        source,
    })
}

/// Parse one journald JSON line. Malformed lines yield no entry.
pub fn parse_journald_line(line: &str) -> Option<LogEntry> {
    let value: serde_json::Value = serde_json::from_str(line.trim()).ok()?;
    let message = value.get("MESSAGE")?.as_str()?.to_string();

    let micros: i64 = value
        .get("__REALTIME_TIMESTAMP")
        .and_then(|v| v.as_str())
        .and_then(|v| v.parse().ok())?;
    let timestamp = Utc.timestamp_micros(micros).single()?;

    let severity = value
        .get("PRIORITY")
        .and_then(|v| v.as_str())
        .and_then(|v| v.parse::<u8>().ok())
        .map(Severity::from_priority)
        .unwrap_or(Severity::Info);

    let facility = value
        .get("SYSLOG_FACILITY")
        .and_then(|v| v.as_str())
        .and_then(facility_from_number)
        .unwrap_or("unknown")
        .to_string();

    let source = value
        .get("_SYSTEMD_UNIT")
        .or_else(|| value.get("SYSLOG_IDENTIFIER"))
        .and_then(|v| v.as_str())
        .unwrap_or("journald")
        .to_string();

    Some(LogEntry {
        timestamp,
        facility,
        severity,
        message,
        source,
    })
}

/// Parse one dmesg line, either `[Mon Dec  4 10:30:45 2023] message`
/// (dmesg -T) or a raw boot offset.
pub fn parse_dmesg_line(line: &str, btime: Option<i64>, now: DateTime<Utc>) -> Option<LogEntry> {
    let line = line.trim_end();
    if line.is_empty() {
        return None;
    }

    let (timestamp, message) = if let Some(rest) = line.strip_prefix('[') {
        let (stamp, message) = rest.split_once(']')?;
        let message = message.trim();
        if let Ok(naive) = NaiveDateTime::parse_from_str(stamp.trim(), "%a %b %e %H:%M:%S %Y") {
            (Utc.from_utc_datetime(&naive), message)
        } else if let Ok(offset) = stamp.trim().parse::<f64>() {
            (boot_offset_to_wall(offset, btime)?, message)
        } else {
            return None;
        }
    } else {
        // Untimestamped ring buffer line; anchor to the current moment.
        (now, line)
    };

    Some(LogEntry {
        timestamp,
        facility: "kernel".to_string(),
        severity: kernel_severity(message),
        message: message.to_string(),
        source: "dmesg".to_string(),
    })
}

/// Parse a standalone timestamp using the supported formats in order.
pub fn parse_timestamp(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let text = text.trim();

    // RFC3164: "Dec  4 10:30:45".
    let re = Regex::new(r"^([A-Z][a-z]{2})\s+(\d{1,2})\s+(\d{2}:\d{2}:\d{2})$")
        .expect("static regex");
    if let Some(caps) = re.captures(text) {
        return parse_rfc3164(&caps[1], &caps[2], &caps[3], now);
    }

    // ISO 8601 with timezone.
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    // ISO 8601 Zulu without fractional-second strictness.
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%SZ") {
        return Some(Utc.from_utc_datetime(&naive));
    }

    // Plain "YYYY-MM-DD HH:MM:SS".
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }

    // Kernel boot offset cannot be resolved without the boot epoch here.
    None
}

/// RFC3164 lacks a year: use the current one, rolling back a year when the
/// result lands more than a month in the future.
fn parse_rfc3164(month: &str, day: &str, time: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let month = match month {
        "Jan" => 1,
        "Feb" => 2,
        "Mar" => 3,
        "Apr" => 4,
        "May" => 5,
        "Jun" => 6,
        "Jul" => 7,
        "Aug" => 8,
        "Sep" => 9,
        "Oct" => 10,
        "Nov" => 11,
        "Dec" => 12,
        _ => return None,
    };
    let day: u32 = day.parse().ok()?;
    let mut parts = time.split(':');
    let hour: u32 = parts.next()?.parse().ok()?;
    let minute: u32 = parts.next()?.parse().ok()?;
    let second: u32 = parts.next()?.parse().ok()?;

    let build = |year: i32| {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, minute, second))
            .map(|naive| Utc.from_utc_datetime(&naive))
    };

    let candidate = build(now.year())?;
    if candidate > now + Duration::days(31) {
        return build(now.year() - 1);
    }
    Some(candidate)
}

fn split_boot_offset(line: &str) -> Option<(f64, &str)> {
    let rest = line.strip_prefix('[')?;
    let (stamp, message) = rest.split_once(']')?;
    let offset = stamp.trim().parse::<f64>().ok()?;
    Some((offset, message.trim()))
}

fn boot_offset_to_wall(offset: f64, btime: Option<i64>) -> Option<DateTime<Utc>> {
    let btime = btime?;
    let millis = btime
        .checked_mul(1000)?
        .checked_add((offset * 1000.0) as i64)?;
    Utc.timestamp_millis_opt(millis).single()
}

/// Infer the syslog facility from a log file path.
pub fn facility_from_path(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name {
        n if n.starts_with("kern") => "kernel",
        n if n.starts_with("auth") => "auth",
        n if n.starts_with("mail") => "mail",
        n if n.starts_with("daemon") => "daemon",
        n if n.starts_with("cron") => "cron",
        n if n.starts_with("syslog") => "syslog",
        _ => "user",
    }
    .to_string()
}

fn facility_from_number(number: &str) -> Option<&'static str> {
    Some(match number {
        "0" => "kernel",
        "1" => "user",
        "2" => "mail",
        "3" => "daemon",
        "4" | "10" => "auth",
        "5" => "syslog",
        "9" | "15" => "cron",
        _ => return None,
    })
}

/// Severity inferred from kernel message keywords.
pub fn kernel_severity(message: &str) -> Severity {
    let lower = message.to_lowercase();
    if lower.contains("panic") || lower.contains("oops") {
        Severity::Emergency
    } else if lower.contains("error") || lower.contains("failed") || lower.contains("failure") {
        Severity::Error
    } else if lower.contains("warn") {
        Severity::Warning
    } else if lower.contains("notice") {
        Severity::Notice
    } else if lower.contains("debug") {
        Severity::Debug
    } else {
        Severity::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::MockSystem;
    use chrono::Timelike;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 12, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_syslog_line_rfc3164() {
        let line = "Dec  4 10:30:45 hostname sshd[1234]: Accepted password for user from 192.168.1.100";
        let entry = parse_syslog_line(line, "/var/log/syslog", None, now()).unwrap();
        assert_eq!(entry.facility, "syslog");
        assert_eq!(entry.severity, Severity::Info);
        assert_eq!(entry.source, "sshd[1234]");
        assert!(entry.message.contains("Accepted password"));
        assert_eq!(entry.timestamp.month(), 12);
        assert_eq!(entry.timestamp.day(), 4);
        assert_eq!(entry.timestamp.hour(), 10);
    }

    #[test]
    fn test_parse_syslog_line_kernel_boot_offset() {
        let line = "[12345.678] usb 1-1: new high-speed USB device number 2 using ehci-pci";
        let btime = Some(1_701_600_000);
        let entry = parse_syslog_line(line, "/var/log/kern.log", btime, now()).unwrap();
        assert_eq!(entry.facility, "kernel");
        assert_eq!(entry.source, "kern");
        assert_eq!(entry.severity, Severity::Info);
        assert_eq!(entry.timestamp.timestamp(), 1_701_600_000 + 12_345);
    }

    #[test]
    fn test_boot_offset_dropped_without_btime() {
        let line = "[12345.678] error: device initialization failed";
        assert!(parse_syslog_line(line, "/var/log/kern.log", None, now()).is_none());
    }

    #[test]
    fn test_rfc3164_year_rollback() {
        // Parsing a December date in January must land in the previous year.
        let january = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        let entry = parse_syslog_line(
            "Dec 30 23:59:59 host cron[1]: session opened",
            "/var/log/syslog",
            None,
            january,
        )
        .unwrap();
        assert_eq!(entry.timestamp.year(), 2023);
    }

    #[test]
    fn test_parse_journald_line() {
        let line = r#"{"__REALTIME_TIMESTAMP":"1701684645123456","PRIORITY":"6","MESSAGE":"Test message","SYSLOG_IDENTIFIER":"test-service","_SYSTEMD_UNIT":"test.service"}"#;
        let entry = parse_journald_line(line).unwrap();
        assert_eq!(entry.severity, Severity::Info);
        assert_eq!(entry.message, "Test message");
        assert_eq!(entry.source, "test.service");
        assert_eq!(entry.facility, "unknown");
        assert_eq!(entry.timestamp.timestamp_micros(), 1_701_684_645_123_456);
    }

    #[test]
    fn test_parse_journald_malformed_skipped() {
        assert!(parse_journald_line("{not json").is_none());
        assert!(parse_journald_line(r#"{"PRIORITY":"3"}"#).is_none());
    }

    #[test]
    fn test_parse_dmesg_line_wall_clock() {
        let line = "[Mon Dec  4 10:30:45 2023] usb 1-1: new high-speed USB device";
        let entry = parse_dmesg_line(line, None, now()).unwrap();
        assert_eq!(entry.facility, "kernel");
        assert_eq!(entry.source, "dmesg");
        assert_eq!(entry.timestamp.year(), 2023);
        assert!(entry.message.contains("USB device"));

        let boot = "[12345.678] error: device initialization failed";
        let entry = parse_dmesg_line(boot, Some(1_701_600_000), now()).unwrap();
        assert_eq!(entry.severity, Severity::Error);
    }

    #[test]
    fn test_kernel_severity_keywords() {
        assert_eq!(kernel_severity("kernel panic: bad"), Severity::Emergency);
        assert_eq!(kernel_severity("error: device not found"), Severity::Error);
        assert_eq!(kernel_severity("warning: deprecated"), Severity::Warning);
        assert_eq!(kernel_severity("notice: config changed"), Severity::Notice);
        assert_eq!(kernel_severity("debug: entering"), Severity::Debug);
        assert_eq!(kernel_severity("normal message"), Severity::Info);
    }

    #[test]
    fn test_facility_from_path() {
        assert_eq!(facility_from_path("/var/log/kern.log"), "kernel");
        assert_eq!(facility_from_path("/var/log/auth.log"), "auth");
        assert_eq!(facility_from_path("/var/log/mail.log"), "mail");
        assert_eq!(facility_from_path("/var/log/daemon.log"), "daemon");
        assert_eq!(facility_from_path("/var/log/cron.log"), "cron");
        assert_eq!(facility_from_path("/var/log/syslog"), "syslog");
        assert_eq!(facility_from_path("/var/log/custom.log"), "user");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let now = now();
        assert!(parse_timestamp("Dec  4 10:30:45", now).is_some());
        let iso = parse_timestamp("2023-12-04T10:30:45Z", now).unwrap();
        assert_eq!(iso.year(), 2023);
        let simple = parse_timestamp("2023-12-04 10:30:45", now).unwrap();
        assert_eq!(simple.day(), 4);
        assert!(parse_timestamp("garbage", now).is_none());
    }

    #[test]
    fn test_parse_since() {
        assert_eq!(parse_since("30 seconds ago"), Some(Duration::seconds(30)));
        assert_eq!(parse_since("1 minute ago"), Some(Duration::minutes(1)));
        assert_eq!(parse_since("2 hours ago"), Some(Duration::hours(2)));
        assert_eq!(parse_since("7 days ago"), Some(Duration::days(7)));
        assert_eq!(parse_since("yesterday"), None);
    }

    #[test]
    fn test_parse_logs_filters_by_since() {
        let sys = MockSystem::new().with_file(
            "/var/log/syslog",
            "Dec 10 11:00:00 host app[1]: recent event\nDec  1 08:00:00 host app[1]: old event\n",
        );
        let parser = LogParser::new(&sys);
        let entries = parser.parse_logs_at(
            &["syslog".to_string()],
            Some("1 day ago"),
            now(),
        );
        assert_eq!(entries.len(), 1);
        assert!(entries[0].message.contains("recent"));
    }

    #[test]
    fn test_unknown_source_skipped() {
        let sys = MockSystem::new();
        let parser = LogParser::new(&sys);
        assert!(parser
            .parse_logs_at(&["wtmp".to_string()], None, now())
            .is_empty());
    }
}
