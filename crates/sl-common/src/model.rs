//! Core data model for syslens.
//!
//! All entities here are plain values with request-scoped lifecycles: a
//! probe or analyzer constructs them, the recommendation engine consumes
//! them read-only, and they are discarded when the operation returns.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Heterogeneous attribute map produced by analyzers.
///
/// Keys are snake_case field names; an absent key means the backing probe
/// was unavailable or failed (never silently zero). Probe failures appear
/// as `<probe>_error` string entries.
pub type Attrs = serde_json::Map<String, serde_json::Value>;

/// Outcome of invoking an external utility.
///
/// Invariant: when `success` is true, `return_code == 0` and `error` is
/// `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub return_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResult {
    /// A successful invocation with captured output.
    pub fn ok(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        CommandResult {
            success: true,
            stdout: stdout.into(),
            stderr: stderr.into(),
            return_code: 0,
            error: None,
        }
    }

    /// A failed invocation with a reason.
    pub fn failed(return_code: i32, stderr: impl Into<String>, error: impl Into<String>) -> Self {
        CommandResult {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
            return_code,
            error: Some(error.into()),
        }
    }

    /// The error text, falling back to stderr for nonzero exits.
    pub fn reason(&self) -> String {
        match &self.error {
            Some(e) => e.clone(),
            None => self.stderr.trim().to_string(),
        }
    }
}

/// Syslog severity, canonical names, ordered emergency (0) through debug (7).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
}

impl Severity {
    /// Map a journald PRIORITY digit (0-7) to a severity.
    pub fn from_priority(priority: u8) -> Self {
        match priority {
            0 => Severity::Emergency,
            1 => Severity::Alert,
            2 => Severity::Critical,
            3 => Severity::Error,
            4 => Severity::Warning,
            5 => Severity::Notice,
            6 => Severity::Info,
            _ => Severity::Debug,
        }
    }

    /// The syslog priority value for this severity.
    pub fn priority(&self) -> u8 {
        *self as u8
    }

    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Emergency => "emergency",
            Severity::Alert => "alert",
            Severity::Critical => "critical",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Notice => "notice",
            Severity::Info => "info",
            Severity::Debug => "debug",
        }
    }

    /// Whether this severity is at least as urgent as `other`.
    pub fn at_least(&self, other: Severity) -> bool {
        self.priority() <= other.priority()
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single immutable log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub facility: String,
    pub severity: Severity,
    pub message: String,
    pub source: String,
}

/// A kernel configuration option, optionally annotated by the analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelConfigOption {
    pub name: String,
    pub value: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_impact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_impact: Option<String>,
}

impl KernelConfigOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>, description: impl Into<String>) -> Self {
        KernelConfigOption {
            name: name.into(),
            value: value.into(),
            description: description.into(),
            recommended: None,
            security_impact: None,
            performance_impact: None,
        }
    }
}

/// Parsed kernel configuration with lazily-populated analysis results.
///
/// Options are keyed by name in a BTreeMap so that iteration (and therefore
/// every derived report) is deterministic across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KernelConfig {
    pub version: String,
    pub options: BTreeMap<String, KernelConfigOption>,
    pub analysis: Attrs,
    pub recommendations: Attrs,
}

/// Aggregate hardware information, one attribute map per subsystem.
///
/// An empty map means the subsystem's probes were not run or all failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HardwareInfo {
    pub cpu: Attrs,
    pub memory: Attrs,
    pub storage: Attrs,
    pub pci_devices: Attrs,
    pub usb_devices: Attrs,
    pub network: Attrs,
    pub graphics: Attrs,
}

/// Log analysis results.
///
/// `entries` is ordered ascending by timestamp; `issues` is bucketed by
/// severity level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogAnalysis {
    pub entries: Vec<LogEntry>,
    pub patterns: Attrs,
    pub issues: Attrs,
    pub summary: Attrs,
}

/// A complete system diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub hardware: HardwareInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel_config: Option<KernelConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_analysis: Option<LogAnalysis>,
    pub recommendations: Attrs,
    pub explanation: String,
}
