//! Stage L2: per-entry classification.
//!
//! Each entry gets a category from a closed set, an optional component
//! when the category maps one-to-one onto a subsystem, and an urgency
//! derived from its severity.

use serde::{Deserialize, Serialize};
use sl_common::{LogEntry, Severity};

/// The closed category set. Keyword matching runs in this declaration
/// order; the first hit wins, and facility is the fallback.
const CATEGORY_KEYWORDS: [(&str, &[&str]); 8] = [
    (
        "kernel",
        &["panic", "oops", "call trace", "kernel bug", "tainted", "segfault"],
    ),
    (
        "storage",
        &["ata", "i/o error", "blk_update_request", "sda", "nvme", "filesystem", "ext4", "xfs", "btrfs", "smart"],
    ),
    ("memory", &["out of memory", "oom", "swap", "page allocation"]),
    ("cpu", &["mce", "machine check", "thermal", "throttl", "cpu"]),
    (
        "security",
        &["security violation", "unauthorized", "breach", "selinux", "apparmor", "audit"],
    ),
    (
        "auth",
        &["authentication", "login", "sshd", "sudo", "password", "session opened"],
    ),
    ("network", &["network", "eth0", "enp", "wlan", "dhcp", "dns", "link down", "carrier"]),
    ("application", &[]),
];

/// Categories that map one-to-one onto a hardware component.
const COMPONENT_CATEGORIES: [&str; 4] = ["storage", "memory", "cpu", "network"];

/// Classification attached to one log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    pub urgency: String,
}

/// Classify one entry by message keywords, falling back to its facility.
pub fn classify_entry(entry: &LogEntry) -> Classification {
    let message = entry.message.to_lowercase();

    let category = CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| message.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or_else(|| match entry.facility.as_str() {
            "kernel" => "kernel",
            "auth" => "auth",
            _ => "application",
        })
        .to_string();

    let component = COMPONENT_CATEGORIES
        .contains(&category.as_str())
        .then(|| category.clone());

    Classification {
        category,
        component,
        urgency: urgency_for(entry.severity).to_string(),
    }
}

/// Severity-to-urgency mapping shared with the issue bucketing.
pub fn urgency_for(severity: Severity) -> &'static str {
    if severity.at_least(Severity::Critical) {
        "critical"
    } else if severity.at_least(Severity::Error) {
        "high"
    } else if severity.at_least(Severity::Warning) {
        "medium"
    } else {
        "low"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(facility: &str, severity: Severity, message: &str) -> LogEntry {
        LogEntry {
            timestamp: Utc::now(),
            facility: facility.to_string(),
            severity,
            message: message.to_string(),
            source: "test".to_string(),
        }
    }

    #[test]
    fn test_kernel_panic_classified_kernel_critical() {
        let c = classify_entry(&entry(
            "kernel",
            Severity::Critical,
            "kernel panic - not syncing: Fatal exception",
        ));
        assert_eq!(c.category, "kernel");
        assert_eq!(c.component, None);
        assert_eq!(c.urgency, "critical");
    }

    #[test]
    fn test_io_error_classified_storage_with_component() {
        let c = classify_entry(&entry(
            "kernel",
            Severity::Error,
            "ata1: I/O error, dev sda, sector 12345",
        ));
        assert_eq!(c.category, "storage");
        assert_eq!(c.component.as_deref(), Some("storage"));
        assert_eq!(c.urgency, "high");
    }

    #[test]
    fn test_oom_classified_memory() {
        let c = classify_entry(&entry(
            "kernel",
            Severity::Warning,
            "Out of memory: Kill process 1234 (firefox)",
        ));
        assert_eq!(c.category, "memory");
        assert_eq!(c.component.as_deref(), Some("memory"));
        assert_eq!(c.urgency, "medium");
    }

    #[test]
    fn test_facility_fallback() {
        let c = classify_entry(&entry("auth", Severity::Info, "something unrelated"));
        assert_eq!(c.category, "auth");
        assert_eq!(c.component, None);
        assert_eq!(c.urgency, "low");

        let c = classify_entry(&entry("daemon", Severity::Info, "service reloaded"));
        assert_eq!(c.category, "application");
    }

    #[test]
    fn test_urgency_levels() {
        assert_eq!(urgency_for(Severity::Emergency), "critical");
        assert_eq!(urgency_for(Severity::Alert), "critical");
        assert_eq!(urgency_for(Severity::Critical), "critical");
        assert_eq!(urgency_for(Severity::Error), "high");
        assert_eq!(urgency_for(Severity::Warning), "medium");
        assert_eq!(urgency_for(Severity::Notice), "low");
        assert_eq!(urgency_for(Severity::Debug), "low");
    }
}
