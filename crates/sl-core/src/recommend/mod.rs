//! Recommendation engine: thresholds, hardware profiling, fault-isolated
//! generators, and the prioritize/dedup/explain/guide pipeline.

mod generator;
mod guides;
mod profile;
pub mod thresholds;

pub use generator::{deduplicate, RecommendationGenerator};
pub use guides::implementation_guide;
pub use profile::derive_profile;
