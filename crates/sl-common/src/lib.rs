//! syslens shared types, errors, and result envelopes.
//!
//! This crate provides the foundational types shared across sl-core modules:
//! - The normalized data model (hardware, kernel config, log analysis)
//! - Recommendation and hardware-profile taxonomies
//! - Common error types
//! - The uniform tool result envelope

pub mod envelope;
pub mod error;
pub mod model;
pub mod recommend;

pub use envelope::ToolEnvelope;
pub use error::{Error, ErrorCategory, Result};
pub use model::{
    Attrs, CommandResult, Diagnostic, HardwareInfo, KernelConfig, KernelConfigOption, LogAnalysis,
    LogEntry, Severity,
};
pub use recommend::{
    CpuCoreClass, GraphicsClass, HardwareProfile, MemoryClass, NetworkClass, Recommendation,
    RecommendationCategory, RecommendationPriority, StorageClass, SystemClass, Urgency,
};
