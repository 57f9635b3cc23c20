//! syslens core: Linux hardware, kernel, and log introspection.
//!
//! The crate is layered leaves-first and acyclic:
//!
//! ```text
//! system ──► collect ──► hardware/kernel analyzers ──┐
//!                                                    ├──► recommend ──► engine
//!                                 logs pipeline ─────┘
//! ```
//!
//! - [`system`] is the only place that touches the host (subprocesses and
//!   file reads); it is polymorphic over a real Linux host and a mock.
//! - [`collect`] holds pure parsers from raw probe text to typed records.
//! - [`hardware`] and [`kernel`] analyzers sequence probes and normalize
//!   their output into attribute maps; analyzers never call each other.
//! - [`logs`] parses, classifies, pattern-detects, and correlates
//!   timestamped events.
//! - [`recommend`] combines analyzer output and a derived hardware profile
//!   against a declarative rule base.
//! - [`engine`] is the request-scoped façade; [`tools`] exposes it through
//!   a uniform tool capability.

pub mod collect;
pub mod engine;
pub mod hardware;
pub mod kernel;
pub mod logs;
pub mod recommend;
pub mod system;
pub mod tools;

pub use engine::{DiagnosticsEngine, DiagnoseOptions, QueryInterpretation};
pub use system::{LinuxSystem, MockSystem, SystemInterface};
