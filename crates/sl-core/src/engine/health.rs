//! Targeted hardware health checks.
//!
//! Each check strategy inspects one area (temperatures, resource usage,
//! network link state) and reports per-component results plus issues.
//! The thresholds here are the quick-check tables, intentionally tighter
//! than the recommendation engine's.

use serde_json::json;
use sl_common::Attrs;

use crate::collect::{parse_df, parse_loadavg, parse_meminfo};
use crate::system::SystemInterface;

/// Thermal zone thresholds in °C.
const TEMP_WARNING: f64 = 70.0;
const TEMP_CRITICAL: f64 = 80.0;

/// Memory usage thresholds in percent.
const MEMORY_WARNING: f64 = 80.0;
const MEMORY_CRITICAL: f64 = 90.0;

/// Disk usage thresholds in percent.
const DISK_WARNING: u8 = 85;
const DISK_CRITICAL: u8 = 95;

/// Load-per-core thresholds.
const LOAD_WARNING: f64 = 1.5;
const LOAD_CRITICAL: f64 = 2.0;

/// Run the health checks for the requested components. `all` (or an
/// empty list) selects everything.
pub fn run_diagnostics(system: &dyn SystemInterface, components: &[String]) -> Attrs {
    let wants = |component: &str| {
        components.is_empty()
            || components.iter().any(|c| c == "all")
            || components.iter().any(|c| c == component)
    };

    let mut results = Attrs::new();
    let mut issues: Vec<serde_json::Value> = Vec::new();

    if wants("cpu") {
        let mut cpu = Attrs::new();
        if let Some(temp) = cpu_temperature(system) {
            cpu.insert("temperature".into(), json!(temp));
            if temp > TEMP_CRITICAL {
                issues.push(issue("cpu", "critical", format!("CPU temperature critical: {temp}°C")));
            } else if temp > TEMP_WARNING {
                issues.push(issue("cpu", "warning", format!("CPU temperature high: {temp}°C")));
            }
        }
        if let Some((load, per_core)) = cpu_load(system) {
            cpu.insert("load_avg_1min".into(), json!(load));
            cpu.insert("load_per_core".into(), json!((per_core * 100.0).round() / 100.0));
            if per_core > LOAD_CRITICAL {
                issues.push(issue("cpu", "critical", format!("CPU load critical: {load:.2}")));
            } else if per_core > LOAD_WARNING {
                issues.push(issue("cpu", "warning", format!("CPU load high: {load:.2}")));
            }
        }
        results.insert("cpu".into(), json!(cpu));
    }

    if wants("memory") {
        let mut memory = Attrs::new();
        if let Some(usage) = memory_usage(system) {
            memory.insert("usage_percent".into(), json!(usage));
            if usage > MEMORY_CRITICAL {
                issues.push(issue("memory", "critical", format!("Memory usage critical: {usage}%")));
            } else if usage > MEMORY_WARNING {
                issues.push(issue("memory", "warning", format!("Memory usage high: {usage}%")));
            }
        }
        results.insert("memory".into(), json!(memory));
    }

    if wants("storage") {
        let mut storage = Attrs::new();
        let df = system.run_command(&["df", "-h"]);
        if df.success {
            let mut usage = Attrs::new();
            for fs in parse_df(&df.stdout, false) {
                usage.insert(fs.mountpoint.clone(), json!(fs.use_percent));
                if fs.use_percent > DISK_CRITICAL {
                    issues.push(issue(
                        "storage",
                        "critical",
                        format!("Disk usage critical on {}: {}%", fs.mountpoint, fs.use_percent),
                    ));
                } else if fs.use_percent > DISK_WARNING {
                    issues.push(issue(
                        "storage",
                        "warning",
                        format!("Disk usage high on {}: {}%", fs.mountpoint, fs.use_percent),
                    ));
                }
            }
            storage.insert("disk_usage".into(), json!(usage));
        }
        results.insert("storage".into(), json!(storage));
    }

    if wants("network") {
        let mut network = Attrs::new();
        let states = interface_states(system);
        let down: Vec<&String> = states
            .iter()
            .filter(|(name, state)| state.as_str() == Some("DOWN") && name.as_str() != "lo")
            .map(|(name, _)| name)
            .collect();
        if !down.is_empty() {
            let names: Vec<String> = down.iter().map(|n| n.to_string()).collect();
            issues.push(issue(
                "network",
                "warning",
                format!("Network interfaces down: {}", names.join(", ")),
            ));
        }
        network.insert("interfaces".into(), json!(states));
        results.insert("network".into(), json!(network));
    }

    let has_critical = issues
        .iter()
        .any(|i| i.get("severity").and_then(|s| s.as_str()) == Some("critical"));
    let status = if has_critical { "failed" } else { "passed" };

    let recommendations: Vec<String> = issues
        .iter()
        .filter_map(|i| {
            let component = i.get("component")?.as_str()?;
            Some(match component {
                "cpu" => "Check CPU cooling and investigate heavy processes".to_string(),
                "memory" => "Close memory-hungry applications or add RAM".to_string(),
                "storage" => "Free disk space on the affected filesystems".to_string(),
                "network" => "Check cabling and configuration of down interfaces".to_string(),
                other => format!("Investigate the reported {other} issue"),
            })
        })
        .collect();

    let mut report = Attrs::new();
    report.insert("status".into(), json!(status));
    report.insert("results".into(), json!(results));
    report.insert("issues".into(), json!(issues));
    report.insert("recommendations".into(), json!(recommendations));
    report.insert("timestamp".into(), json!(chrono::Utc::now().to_rfc3339()));
    report
}

fn issue(component: &str, severity: &str, message: String) -> serde_json::Value {
    json!({ "component": component, "severity": severity, "message": message })
}

/// First CPU-ish thermal zone temperature in °C.
fn cpu_temperature(system: &dyn SystemInterface) -> Option<f64> {
    let ls = system.run_command(&["ls", "/sys/class/thermal/"]);
    if !ls.success {
        return None;
    }
    for zone in ls.stdout.split_whitespace() {
        if !zone.starts_with("thermal_zone") {
            continue;
        }
        let base = format!("/sys/class/thermal/{zone}");
        let Some(zone_type) = system.read_file(&format!("{base}/type")) else {
            continue;
        };
        let zone_type = zone_type.to_lowercase();
        if !["cpu", "x86", "acpi"].iter().any(|t| zone_type.contains(t)) {
            continue;
        }
        if let Some(millidegrees) = system
            .read_file(&format!("{base}/temp"))
            .and_then(|v| v.trim().parse::<f64>().ok())
        {
            return Some(millidegrees / 1000.0);
        }
    }
    None
}

/// Memory usage percent, computed without MemAvailable for portability to
/// older kernels: used = total - free - buffers - cached.
fn memory_usage(system: &dyn SystemInterface) -> Option<f64> {
    let raw = system.read_file("/proc/meminfo")?;
    let mem = parse_meminfo(&raw).ok()?;
    let total = *mem.get("MemTotal")? as f64;
    let free = *mem.get("MemFree")? as f64;
    let buffers = *mem.get("Buffers")? as f64;
    let cached = *mem.get("Cached")? as f64;
    if total <= 0.0 {
        return None;
    }
    let used = total - free - buffers - cached;
    Some((used / total * 1000.0).round() / 10.0)
}

fn cpu_load(system: &dyn SystemInterface) -> Option<(f64, f64)> {
    let raw = system.read_file("/proc/loadavg")?;
    let load = parse_loadavg(&raw).ok()?;
    let nproc = system.run_command(&["nproc"]);
    let cores: f64 = if nproc.success {
        nproc.stdout.trim().parse().unwrap_or(1.0)
    } else {
        1.0
    };
    Some((load.load1, load.load1 / cores.max(1.0)))
}

fn interface_states(system: &dyn SystemInterface) -> Attrs {
    let mut states = Attrs::new();
    let ip = system.run_command(&["ip", "link", "show"]);
    if !ip.success {
        return states;
    }
    let re = regex::Regex::new(r"^\d+: ([^:@]+)[@:].*state (\w+)").expect("static regex");
    for line in ip.stdout.lines() {
        if let Some(caps) = re.captures(line) {
            states.insert(caps[1].to_string(), json!(caps[2].to_string()));
        }
    }
    states
}
