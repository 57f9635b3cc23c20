//! Implementation guides for top recommendations.
//!
//! Step templates are selected by (component, action keywords), time
//! estimates by (priority, component), and difficulty by component.

use serde_json::json;
use sl_common::{Attrs, Recommendation, RecommendationPriority};

/// Build the implementation guide for one recommendation.
pub fn implementation_guide(rec: &Recommendation) -> Attrs {
    let mut guide = Attrs::new();
    guide.insert("recommendation_id".into(), json!(guide_id(rec)));
    guide.insert("title".into(), json!(rec.action));
    guide.insert("steps".into(), json!(steps_for(rec)));
    guide.insert("estimated_time".into(), json!(estimated_time(rec)));
    guide.insert("difficulty".into(), json!(difficulty(rec)));
    guide.insert("prerequisites".into(), json!(prerequisites(rec)));
    guide.insert("risks".into(), json!(risks(rec)));
    guide
}

fn guide_id(rec: &Recommendation) -> String {
    format!(
        "{}_{}",
        rec.component,
        rec.action.to_lowercase().replace(' ', "_")
    )
}

fn steps_for(rec: &Recommendation) -> Vec<&'static str> {
    let action = rec.action.to_lowercase();
    if rec.component == "cpu" && action.contains("cooling") {
        vec![
            "1. Monitor CPU temperature using sensors or system monitoring tools",
            "2. Check CPU fan operation and clean if necessary",
            "3. Verify thermal paste application on CPU",
            "4. Ensure proper case airflow and ventilation",
            "5. Consider upgrading CPU cooler if temperatures remain high",
        ]
    } else if rec.component == "memory" && action.contains("usage") {
        vec![
            "1. Identify memory-intensive processes using top or htop",
            "2. Close unnecessary applications and services",
            "3. Check for memory leaks in running applications",
            "4. Consider adding more RAM if usage consistently high",
            "5. Optimize system services and startup programs",
        ]
    } else if rec.component == "storage" && (action.contains("space") || action.contains("disk")) {
        vec![
            "1. Identify large files and directories using du command",
            "2. Clean temporary files and system cache",
            "3. Remove old log files and rotate logs properly",
            "4. Uninstall unused packages and clean package cache",
            "5. Consider moving large files to external storage",
        ]
    } else {
        vec![
            "1. Review the specific issue details",
            "2. Research appropriate solutions for your system",
            "3. Test changes in a safe environment if possible",
            "4. Implement the recommended changes",
            "5. Monitor system behavior after changes",
        ]
    }
}

fn estimated_time(rec: &Recommendation) -> &'static str {
    match rec.priority {
        RecommendationPriority::Critical => "15-30 minutes",
        RecommendationPriority::High => "30-60 minutes",
        _ if rec.component == "kernel" || rec.component == "security" => "1-2 hours",
        _ => "15-45 minutes",
    }
}

fn difficulty(rec: &Recommendation) -> &'static str {
    let action = rec.action.to_lowercase();
    if rec.component == "kernel" || action.contains("configuration") {
        "Advanced"
    } else if rec.component == "hardware"
        || rec.component == "security"
        || rec.component == "performance"
    {
        "Intermediate"
    } else {
        "Beginner"
    }
}

fn prerequisites(rec: &Recommendation) -> Vec<&'static str> {
    let mut prereqs = vec!["Administrative/root access to the system"];
    match rec.component.as_str() {
        "kernel" => prereqs.extend([
            "Understanding of kernel configuration",
            "Ability to recompile kernel (if needed)",
            "System backup before making changes",
        ]),
        "security" => prereqs.extend([
            "Understanding of security implications",
            "Knowledge of system security policies",
        ]),
        c if c.contains("hardware") || c == "cpu" || c == "storage" => prereqs.extend([
            "Physical access to the system",
            "Basic hardware troubleshooting knowledge",
        ]),
        _ => {}
    }
    prereqs
}

fn risks(rec: &Recommendation) -> Vec<&'static str> {
    match rec.component.as_str() {
        "kernel" => vec![
            "System may fail to boot if kernel configuration is incorrect",
            "Some hardware may not function properly with new configuration",
            "Performance impact during kernel recompilation",
        ],
        "security" => vec![
            "Some applications may be blocked by enhanced security",
            "User workflow may be affected by security changes",
            "System access may be restricted",
        ],
        _ if rec.priority == RecommendationPriority::Critical => {
            vec!["Delaying implementation may lead to system instability"]
        }
        _ => vec!["Minimal risk - changes can typically be reverted if needed"],
    }
}
