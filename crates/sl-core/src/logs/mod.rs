//! Log pipeline: parse, classify, pattern-detect, correlate.
//!
//! The four stages compose in order. Parsing turns raw source text into
//! [`sl_common::LogEntry`] values on a single wall-clock timeline;
//! classification attaches a category and urgency per entry; pattern
//! detection recognizes known failure signatures; correlation combines
//! temporally-related patterns into higher-level findings. The analyzer
//! orchestrates all four and buckets the results by severity.

mod analyzer;
mod classify;
mod correlate;
mod parser;
mod patterns;

pub use analyzer::LogAnalyzer;
pub use classify::{classify_entry, Classification};
pub use correlate::{correlate_findings, CorrelatedFinding};
pub use parser::{parse_since, parse_timestamp, LogParser};
pub use patterns::{detect_hardware_patterns, detect_kernel_patterns, PatternFinding};
