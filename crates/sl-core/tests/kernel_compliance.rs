//! Kernel configuration analysis scenarios: compliance table, hardening
//! gaps, and score bounds.

use std::collections::BTreeMap;

use sl_common::{KernelConfig, KernelConfigOption};
use sl_core::kernel::{value_compliant, KernelConfigAnalyzer};

fn config_with(options: &[(&str, &str)]) -> KernelConfig {
    let mut map = BTreeMap::new();
    for (name, value) in options {
        map.insert(name.to_string(), KernelConfigOption::new(*name, *value, ""));
    }
    KernelConfig {
        version: "6.8.0-45-generic".to_string(),
        options: map,
        analysis: Default::default(),
        recommendations: Default::default(),
    }
}

#[test]
fn value_compliance_table() {
    for (current, recommended) in [
        ("y", "y"),
        ("1", "y"),
        ("yes", "y"),
        ("true", "y"),
        ("n", "n"),
        ("0", "n"),
    ] {
        assert!(
            value_compliant(current, recommended),
            "{current} should satisfy {recommended}"
        );
    }
    assert!(!value_compliant("n", "y"));
    assert!(!value_compliant("499", ">=500"));
    assert!(!value_compliant("1001", "<=1000"));
}

#[test]
fn hardening_gap_reported_with_score_below_hundred() {
    let mut config = config_with(&[("CONFIG_HARDENED_USERCOPY", "n")]);
    let analysis = KernelConfigAnalyzer::new().analyze(&mut config);

    let recommendations = analysis["security"]["recommendations"].as_array().unwrap();
    let gap = recommendations
        .iter()
        .find(|r| r["option"] == "CONFIG_HARDENED_USERCOPY")
        .expect("hardening gap reported");
    assert_eq!(gap["current_value"], "n");
    assert_eq!(gap["recommended_value"], "y");

    let score = analysis["security_score"].as_u64().unwrap();
    assert!(score < 100);
}

#[test]
fn scores_are_integers_in_range() {
    let mut fully_hardened = config_with(&[
        ("CONFIG_SECURITY", "y"),
        ("CONFIG_SECURITY_SELINUX", "y"),
        ("CONFIG_SECURITY_SMACK", "y"),
        ("CONFIG_SECURITY_APPARMOR", "y"),
        ("CONFIG_SECURITY_YAMA", "y"),
        ("CONFIG_HARDENED_USERCOPY", "y"),
        ("CONFIG_SLAB_FREELIST_RANDOM", "y"),
        ("CONFIG_SLAB_FREELIST_HARDENED", "y"),
        ("CONFIG_PAGE_TABLE_ISOLATION", "y"),
        ("CONFIG_RANDOMIZE_BASE", "y"),
        ("CONFIG_RANDOMIZE_MEMORY", "y"),
        ("CONFIG_STRICT_KERNEL_RWX", "y"),
        ("CONFIG_STRICT_MODULE_RWX", "y"),
        ("CONFIG_STACKPROTECTOR", "y"),
        ("CONFIG_STACKPROTECTOR_STRONG", "y"),
        ("CONFIG_VMAP_STACK", "y"),
        ("CONFIG_REFCOUNT_FULL", "y"),
        ("CONFIG_FORTIFY_SOURCE", "y"),
        ("CONFIG_SYN_COOKIES", "y"),
        ("CONFIG_INET_DIAG", "n"),
        ("CONFIG_PACKET_DIAG", "n"),
        ("CONFIG_UNIX_DIAG", "n"),
    ]);
    let analysis = KernelConfigAnalyzer::new().analyze(&mut fully_hardened);
    assert_eq!(analysis["security_score"], 100);

    let mut empty = config_with(&[]);
    let analysis = KernelConfigAnalyzer::new().analyze(&mut empty);
    assert_eq!(analysis["security_score"], 0);
    assert_eq!(analysis["performance_score"], 0);
}

#[test]
fn aliases_count_as_good_practices() {
    let mut config = config_with(&[("CONFIG_SECURITY", "1"), ("CONFIG_INET_DIAG", "0")]);
    let analysis = KernelConfigAnalyzer::new().analyze(&mut config);
    let good = analysis["security"]["good_practices"].as_array().unwrap();
    assert!(good.iter().any(|g| g["option"] == "CONFIG_SECURITY"));
    assert!(good.iter().any(|g| g["option"] == "CONFIG_INET_DIAG"));
}

#[test]
fn analysis_is_stored_on_the_config() {
    let mut config = config_with(&[("CONFIG_SECURITY", "y")]);
    KernelConfigAnalyzer::new().analyze(&mut config);
    assert!(config.analysis.contains_key("security_score"));
    assert_eq!(
        config.options["CONFIG_SECURITY"].security_impact.as_deref(),
        Some("high")
    );
}
