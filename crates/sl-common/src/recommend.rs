//! Recommendation and hardware-profile taxonomies.
//!
//! These closed sets are wire-stable: the string forms below are part of
//! the external contract and must not drift.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Recommendation categories.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    Security,
    Performance,
    Stability,
    Optimization,
    Maintenance,
}

impl RecommendationCategory {
    /// Sort weight: security outranks stability outranks the rest.
    pub fn weight(&self) -> u8 {
        match self {
            RecommendationCategory::Security => 4,
            RecommendationCategory::Stability => 3,
            RecommendationCategory::Performance => 2,
            RecommendationCategory::Optimization => 2,
            RecommendationCategory::Maintenance => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RecommendationCategory::Security => "security",
            RecommendationCategory::Performance => "performance",
            RecommendationCategory::Stability => "stability",
            RecommendationCategory::Optimization => "optimization",
            RecommendationCategory::Maintenance => "maintenance",
        }
    }
}

impl std::fmt::Display for RecommendationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Recommendation priority levels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl RecommendationPriority {
    /// Sort weight: critical=4 down to low=1.
    pub fn weight(&self) -> u8 {
        match self {
            RecommendationPriority::Critical => 4,
            RecommendationPriority::High => 3,
            RecommendationPriority::Medium => 2,
            RecommendationPriority::Low => 1,
        }
    }

    pub fn all() -> &'static [RecommendationPriority] {
        &[
            RecommendationPriority::Critical,
            RecommendationPriority::High,
            RecommendationPriority::Medium,
            RecommendationPriority::Low,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            RecommendationPriority::Critical => "critical",
            RecommendationPriority::High => "high",
            RecommendationPriority::Medium => "medium",
            RecommendationPriority::Low => "low",
        }
    }
}

impl std::fmt::Display for RecommendationPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How soon a recommendation should be acted upon.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Immediate,
    Soon,
    WhenConvenient,
    Ongoing,
}

impl Urgency {
    pub fn name(&self) -> &'static str {
        match self {
            Urgency::Immediate => "immediate",
            Urgency::Soon => "soon",
            Urgency::WhenConvenient => "when_convenient",
            Urgency::Ongoing => "ongoing",
        }
    }

    /// The closing sentence appended to a recommendation's explanation.
    pub fn closing_sentence(&self) -> &'static str {
        match self {
            Urgency::Immediate => {
                "This should be addressed immediately to prevent system issues."
            }
            Urgency::Soon => {
                "This should be addressed in the near future to maintain system health."
            }
            Urgency::WhenConvenient => {
                "This can be addressed when convenient as part of regular maintenance."
            }
            Urgency::Ongoing => {
                "This is an ongoing maintenance task that should be performed regularly."
            }
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A ranked, actionable recommendation targeted at one component.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Recommendation {
    /// Subsystem the action targets (cpu, memory, storage, kernel, ...).
    pub component: String,
    pub category: RecommendationCategory,
    pub priority: RecommendationPriority,
    /// Short imperative, e.g. "Immediate CPU cooling required".
    pub action: String,
    pub details: String,
    pub impact: String,
    pub urgency: Urgency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Recommendation {
    /// The deduplication key: two recommendations with equal keys describe
    /// the same action and collapse to one.
    pub fn dedup_key(&self) -> (String, String, RecommendationCategory, RecommendationPriority) {
        (
            self.component.clone(),
            self.action.clone(),
            self.category,
            self.priority,
        )
    }

    /// Composite sort weight, higher first.
    pub fn sort_weight(&self) -> (u8, u8) {
        (self.priority.weight(), self.category.weight())
    }
}

/// CPU core count class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CpuCoreClass {
    Single,
    Few,
    Multi,
    Many,
}

/// Installed memory class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MemoryClass {
    Small,
    Medium,
    Large,
    VeryLarge,
}

/// Primary storage technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StorageClass {
    Hdd,
    Ssd,
    Nvme,
}

/// Primary network attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NetworkClass {
    Ethernet,
    Wireless,
}

/// Graphics adapter class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum GraphicsClass {
    Integrated,
    Dedicated,
}

/// Overall machine role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SystemClass {
    Desktop,
    Laptop,
    Server,
}

/// Six-field categorical summary of a host, used to select rule overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HardwareProfile {
    pub system_type: SystemClass,
    pub cpu_cores: CpuCoreClass,
    pub memory_size: MemoryClass,
    pub storage_type: StorageClass,
    pub network_type: NetworkClass,
    pub graphics_type: GraphicsClass,
}

impl Default for HardwareProfile {
    fn default() -> Self {
        HardwareProfile {
            system_type: SystemClass::Desktop,
            cpu_cores: CpuCoreClass::Multi,
            memory_size: MemoryClass::Medium,
            storage_type: StorageClass::Hdd,
            network_type: NetworkClass::Ethernet,
            graphics_type: GraphicsClass::Integrated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_weights_descend() {
        let weights: Vec<u8> = RecommendationPriority::all()
            .iter()
            .map(|p| p.weight())
            .collect();
        assert_eq!(weights, vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_category_wire_names() {
        assert_eq!(
            serde_json::to_string(&RecommendationCategory::Security).unwrap(),
            "\"security\""
        );
        assert_eq!(
            serde_json::to_string(&Urgency::WhenConvenient).unwrap(),
            "\"when_convenient\""
        );
    }

    #[test]
    fn test_dedup_key_ignores_details() {
        let mk = |details: &str| Recommendation {
            component: "cpu".into(),
            category: RecommendationCategory::Performance,
            priority: RecommendationPriority::High,
            action: "Improve CPU cooling".into(),
            details: details.into(),
            impact: "Performance degradation possible".into(),
            urgency: Urgency::Soon,
            explanation: None,
        };
        assert_eq!(mk("a").dedup_key(), mk("b").dedup_key());
    }
}
