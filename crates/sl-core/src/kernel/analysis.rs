//! Kernel configuration rule analysis: security and performance rule
//! sets, compliance checking, and scoring.

use serde_json::json;
use sl_common::{Attrs, KernelConfig};

/// One configuration rule: the recommended value and why it matters.
struct ConfigRule {
    category: &'static str,
    option: &'static str,
    recommended: &'static str,
    description: &'static str,
    impact: &'static str,
}

const SECURITY_RULES: [ConfigRule; 22] = [
    // kernel_hardening
    ConfigRule { category: "kernel_hardening", option: "CONFIG_SECURITY", recommended: "y", description: "Enable different security models", impact: "high" },
    ConfigRule { category: "kernel_hardening", option: "CONFIG_SECURITY_SELINUX", recommended: "y", description: "NSA SELinux Support", impact: "high" },
    ConfigRule { category: "kernel_hardening", option: "CONFIG_SECURITY_SMACK", recommended: "y", description: "Simplified Mandatory Access Control Kernel Support", impact: "medium" },
    ConfigRule { category: "kernel_hardening", option: "CONFIG_SECURITY_APPARMOR", recommended: "y", description: "AppArmor support", impact: "high" },
    ConfigRule { category: "kernel_hardening", option: "CONFIG_SECURITY_YAMA", recommended: "y", description: "Yama support", impact: "medium" },
    ConfigRule { category: "kernel_hardening", option: "CONFIG_HARDENED_USERCOPY", recommended: "y", description: "Hardened usercopy", impact: "high" },
    ConfigRule { category: "kernel_hardening", option: "CONFIG_SLAB_FREELIST_RANDOM", recommended: "y", description: "Randomize slab freelist", impact: "medium" },
    ConfigRule { category: "kernel_hardening", option: "CONFIG_SLAB_FREELIST_HARDENED", recommended: "y", description: "Harden slab freelist metadata", impact: "medium" },
    // memory_protection
    ConfigRule { category: "memory_protection", option: "CONFIG_PAGE_TABLE_ISOLATION", recommended: "y", description: "Kernel page table isolation (KPTI)", impact: "high" },
    ConfigRule { category: "memory_protection", option: "CONFIG_RANDOMIZE_BASE", recommended: "y", description: "Randomize the address of the kernel image (KASLR)", impact: "high" },
    ConfigRule { category: "memory_protection", option: "CONFIG_RANDOMIZE_MEMORY", recommended: "y", description: "Randomize the memory layout", impact: "medium" },
    ConfigRule { category: "memory_protection", option: "CONFIG_STRICT_KERNEL_RWX", recommended: "y", description: "Make kernel text and rodata read-only", impact: "high" },
    ConfigRule { category: "memory_protection", option: "CONFIG_STRICT_MODULE_RWX", recommended: "y", description: "Set loadable kernel module data as NX and text as RO", impact: "high" },
    // exploit_mitigations
    ConfigRule { category: "exploit_mitigations", option: "CONFIG_STACKPROTECTOR", recommended: "y", description: "Stack Protector buffer overflow detection", impact: "high" },
    ConfigRule { category: "exploit_mitigations", option: "CONFIG_STACKPROTECTOR_STRONG", recommended: "y", description: "Strong Stack Protector", impact: "high" },
    ConfigRule { category: "exploit_mitigations", option: "CONFIG_VMAP_STACK", recommended: "y", description: "Use a virtually mapped stack", impact: "medium" },
    ConfigRule { category: "exploit_mitigations", option: "CONFIG_REFCOUNT_FULL", recommended: "y", description: "Full reference count validation", impact: "medium" },
    ConfigRule { category: "exploit_mitigations", option: "CONFIG_FORTIFY_SOURCE", recommended: "y", description: "Detect buffer overflows", impact: "high" },
    // network_security
    ConfigRule { category: "network_security", option: "CONFIG_SYN_COOKIES", recommended: "y", description: "TCP SYN cookie protection", impact: "high" },
    ConfigRule { category: "network_security", option: "CONFIG_INET_DIAG", recommended: "n", description: "INET socket monitoring interface", impact: "low" },
    ConfigRule { category: "network_security", option: "CONFIG_PACKET_DIAG", recommended: "n", description: "Packet socket monitoring interface", impact: "low" },
    ConfigRule { category: "network_security", option: "CONFIG_UNIX_DIAG", recommended: "n", description: "UNIX socket monitoring interface", impact: "low" },
];

const PERFORMANCE_RULES: [ConfigRule; 18] = [
    // cpu_scheduling
    ConfigRule { category: "cpu_scheduling", option: "CONFIG_PREEMPT", recommended: "y", description: "Preemptible Kernel (Low-Latency Desktop)", impact: "high" },
    ConfigRule { category: "cpu_scheduling", option: "CONFIG_HZ", recommended: "1000", description: "Timer frequency", impact: "medium" },
    ConfigRule { category: "cpu_scheduling", option: "CONFIG_HZ_1000", recommended: "y", description: "1000 Hz tick rate", impact: "medium" },
    ConfigRule { category: "cpu_scheduling", option: "CONFIG_SCHED_AUTOGROUP", recommended: "y", description: "Automatic process group scheduling", impact: "medium" },
    // memory_management
    ConfigRule { category: "memory_management", option: "CONFIG_TRANSPARENT_HUGEPAGE", recommended: "y", description: "Transparent Hugepage Support", impact: "high" },
    ConfigRule { category: "memory_management", option: "CONFIG_TRANSPARENT_HUGEPAGE_ALWAYS", recommended: "n", description: "Transparent Hugepage: always", impact: "medium" },
    ConfigRule { category: "memory_management", option: "CONFIG_TRANSPARENT_HUGEPAGE_MADVISE", recommended: "y", description: "Transparent Hugepage: madvise", impact: "medium" },
    ConfigRule { category: "memory_management", option: "CONFIG_CLEANCACHE", recommended: "y", description: "Enable cleancache driver to cache clean pages", impact: "medium" },
    ConfigRule { category: "memory_management", option: "CONFIG_FRONTSWAP", recommended: "y", description: "Enable frontswap to cache swap pages", impact: "medium" },
    // io_performance
    ConfigRule { category: "io_performance", option: "CONFIG_BLK_CGROUP", recommended: "y", description: "Block IO controller", impact: "medium" },
    ConfigRule { category: "io_performance", option: "CONFIG_BFQ_GROUP_IOSCHED", recommended: "y", description: "BFQ I/O scheduler cgroup support", impact: "medium" },
    ConfigRule { category: "io_performance", option: "CONFIG_IOSCHED_BFQ", recommended: "y", description: "BFQ I/O scheduler", impact: "medium" },
    ConfigRule { category: "io_performance", option: "CONFIG_MQ_IOSCHED_DEADLINE", recommended: "y", description: "MQ deadline I/O scheduler", impact: "medium" },
    ConfigRule { category: "io_performance", option: "CONFIG_MQ_IOSCHED_KYBER", recommended: "y", description: "Kyber I/O scheduler", impact: "medium" },
    // power_management
    ConfigRule { category: "power_management", option: "CONFIG_CPU_FREQ", recommended: "y", description: "CPU frequency scaling", impact: "high" },
    ConfigRule { category: "power_management", option: "CONFIG_CPU_FREQ_DEFAULT_GOV_PERFORMANCE", recommended: "y", description: "Performance governor as default", impact: "high" },
    ConfigRule { category: "power_management", option: "CONFIG_CPU_FREQ_GOV_ONDEMAND", recommended: "y", description: "Ondemand governor", impact: "medium" },
    ConfigRule { category: "power_management", option: "CONFIG_CPU_FREQ_GOV_SCHEDUTIL", recommended: "y", description: "Schedutil governor", impact: "high" },
];

/// Check whether a current option value satisfies its recommended form.
///
/// Accepts exact matches, the `y`/`n` alias sets, and `>=N` / `<=N`
/// integer constraints.
pub fn value_compliant(current: &str, recommended: &str) -> bool {
    if current == recommended {
        return true;
    }
    match recommended {
        "y" => matches!(current, "y" | "1" | "yes" | "true"),
        "n" => matches!(current, "n" | "0" | "no" | "false"),
        _ => {
            if let Some(min) = recommended.strip_prefix(">=") {
                if let (Ok(min), Ok(value)) = (min.parse::<i64>(), current.parse::<i64>()) {
                    return value >= min;
                }
            }
            if let Some(max) = recommended.strip_prefix("<=") {
                if let (Ok(max), Ok(value)) = (max.parse::<i64>(), current.parse::<i64>()) {
                    return value <= max;
                }
            }
            false
        }
    }
}

/// Analyzer scoring a kernel configuration against the security and
/// performance rule sets.
pub struct KernelConfigAnalyzer;

impl KernelConfigAnalyzer {
    pub fn new() -> Self {
        KernelConfigAnalyzer
    }

    /// Analyze the configuration, annotating option impacts and storing
    /// the results on `config.analysis`. Returns the analysis map.
    pub fn analyze(&self, config: &mut KernelConfig) -> Attrs {
        let security = self.check_rules(config, &SECURITY_RULES, RuleKind::Security);
        let performance = self.check_rules(config, &PERFORMANCE_RULES, RuleKind::Performance);

        let mut analysis = Attrs::new();
        analysis.insert("security_score".into(), json!(score(&security)));
        analysis.insert("performance_score".into(), json!(score(&performance)));
        analysis.insert("security".into(), json!(security.into_attrs()));
        analysis.insert("performance".into(), json!(performance.into_attrs()));

        config.analysis = analysis.clone();
        analysis
    }

    fn check_rules(
        &self,
        config: &mut KernelConfig,
        rules: &'static [ConfigRule],
        kind: RuleKind,
    ) -> RuleOutcome {
        let mut outcome = RuleOutcome::default();
        for rule in rules {
            match config.options.get_mut(rule.option) {
                Some(option) => {
                    match kind {
                        RuleKind::Security => {
                            option.security_impact = Some(rule.impact.to_string());
                        }
                        RuleKind::Performance => {
                            option.performance_impact = Some(rule.impact.to_string());
                        }
                    }
                    option.recommended = Some(rule.recommended.to_string());

                    if value_compliant(&option.value, rule.recommended) {
                        outcome.good_practices.push(json!({
                            "option": rule.option,
                            "value": option.value,
                            "description": rule.description,
                            "category": rule.category,
                        }));
                    } else {
                        outcome.push_issue(rule, &option.value.clone(), kind);
                    }
                }
                None => outcome.push_issue(rule, "missing", kind),
            }
        }
        outcome
    }
}

impl Default for KernelConfigAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
enum RuleKind {
    Security,
    Performance,
}

#[derive(Default)]
struct RuleOutcome {
    issues: Vec<serde_json::Value>,
    recommendations: Vec<serde_json::Value>,
    good_practices: Vec<serde_json::Value>,
}

impl RuleOutcome {
    fn push_issue(&mut self, rule: &ConfigRule, current: &str, kind: RuleKind) {
        self.issues.push(json!({
            "option": rule.option,
            "current_value": current,
            "recommended_value": rule.recommended,
            "description": rule.description,
            "impact": rule.impact,
            "category": rule.category,
        }));
        let verb = if current == "missing" { "Add" } else { "Set" };
        let goal = match kind {
            RuleKind::Security => "security",
            RuleKind::Performance => "performance",
        };
        self.recommendations.push(json!({
            "option": rule.option,
            "current_value": current,
            "recommended_value": rule.recommended,
            "description": format!(
                "{verb} {}={} for better {goal}: {}",
                rule.option, rule.recommended, rule.description
            ),
            "impact": rule.impact,
            "category": rule.category,
        }));
    }

    fn into_attrs(self) -> Attrs {
        let mut attrs = Attrs::new();
        attrs.insert("issues".into(), json!(self.issues));
        attrs.insert("recommendations".into(), json!(self.recommendations));
        attrs.insert("good_practices".into(), json!(self.good_practices));
        attrs
    }
}

/// Integer score: good / (good + issues) × 100, 0 when the base is zero.
fn score(outcome: &RuleOutcome) -> u32 {
    let good = outcome.good_practices.len();
    let total = good + outcome.issues.len();
    if total == 0 {
        return 0;
    }
    (good as f64 / total as f64 * 100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use sl_common::KernelConfigOption;

    fn config_with(options: &[(&str, &str)]) -> KernelConfig {
        let mut config = KernelConfig::default();
        config.version = "6.8.0".into();
        for (name, value) in options {
            config
                .options
                .insert(name.to_string(), KernelConfigOption::new(*name, *value, ""));
        }
        config
    }

    #[test]
    fn test_value_compliant_aliases() {
        for (current, recommended) in [
            ("y", "y"),
            ("1", "y"),
            ("yes", "y"),
            ("true", "y"),
            ("n", "n"),
            ("0", "n"),
        ] {
            assert!(value_compliant(current, recommended), "{current} vs {recommended}");
        }
        assert!(!value_compliant("n", "y"));
        assert!(!value_compliant("499", ">=500"));
        assert!(value_compliant("500", ">=500"));
        assert!(!value_compliant("1001", "<=1000"));
        assert!(value_compliant("1000", "<=1000"));
        assert!(!value_compliant("abc", ">=500"));
    }

    #[test]
    fn test_noncompliant_option_becomes_issue_and_recommendation() {
        let mut config = config_with(&[("CONFIG_HARDENED_USERCOPY", "n")]);
        let analysis = KernelConfigAnalyzer::new().analyze(&mut config);
        let security = &analysis["security"];
        let issue = security["issues"]
            .as_array()
            .unwrap()
            .iter()
            .find(|i| i["option"] == "CONFIG_HARDENED_USERCOPY")
            .unwrap();
        assert_eq!(issue["current_value"], "n");
        assert_eq!(issue["recommended_value"], "y");
        assert!(analysis["security_score"].as_u64().unwrap() < 100);

        // The option is annotated in place.
        let option = &config.options["CONFIG_HARDENED_USERCOPY"];
        assert_eq!(option.security_impact.as_deref(), Some("high"));
        assert_eq!(option.recommended.as_deref(), Some("y"));
    }

    #[test]
    fn test_missing_options_counted_as_issues() {
        let mut config = config_with(&[]);
        let analysis = KernelConfigAnalyzer::new().analyze(&mut config);
        assert_eq!(analysis["security_score"], 0);
        let issues = analysis["security"]["issues"].as_array().unwrap();
        assert_eq!(issues.len(), SECURITY_RULES.len());
        assert!(issues.iter().all(|i| i["current_value"] == "missing"));
    }

    #[test]
    fn test_scores_bounded() {
        let mut config = config_with(&[
            ("CONFIG_SECURITY", "y"),
            ("CONFIG_SYN_COOKIES", "y"),
            ("CONFIG_PREEMPT", "y"),
        ]);
        let analysis = KernelConfigAnalyzer::new().analyze(&mut config);
        let sec = analysis["security_score"].as_u64().unwrap();
        let perf = analysis["performance_score"].as_u64().unwrap();
        assert!(sec <= 100);
        assert!(perf <= 100);
        assert!(sec > 0);
    }
}
