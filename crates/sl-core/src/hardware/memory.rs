//! Memory analyzer: capacity, DIMM inventory, VM statistics, pressure,
//! NUMA, EDAC, and local optimization findings.

use serde_json::json;
use sl_common::Attrs;

use crate::collect::{
    parse_buddyinfo, parse_memory_array, parse_memory_devices, parse_meminfo,
    parse_memory_pressure, parse_numactl, parse_vmstat,
};
use crate::system::SystemInterface;

use super::{probe_error, put};

/// A zone is flagged fragmented when its order>=4 free blocks fall below
/// this many pages.
const FRAGMENTATION_PAGE_THRESHOLD: u64 = 100;

/// Swap usage percentage above which a finding is emitted.
const SWAP_USAGE_HIGH_PERCENT: f64 = 50.0;

pub struct MemoryAnalyzer<'a> {
    system: &'a dyn SystemInterface,
}

impl<'a> MemoryAnalyzer<'a> {
    pub fn new(system: &'a dyn SystemInterface) -> Self {
        MemoryAnalyzer { system }
    }

    pub fn analyze(&self) -> Attrs {
        let mut info = Attrs::new();
        self.basic_info(&mut info);
        self.hardware_info(&mut info);
        self.performance_info(&mut info);
        self.timing_info(&mut info);
        self.optimization(&mut info);
        info
    }

    fn basic_info(&self, info: &mut Attrs) {
        match self.system.read_file("/proc/meminfo") {
            Some(raw) => match parse_meminfo(&raw) {
                Ok(mem) => {
                    let gb = |kb: u64| (kb as f64 / 1024.0 / 1024.0 * 100.0).round() / 100.0;
                    let total = mem["MemTotal"];
                    put(info, "memory_total_kb", total);
                    put(info, "memory_total_gb", gb(total));
                    if let Some(&free) = mem.get("MemFree") {
                        put(info, "memory_free_kb", free);
                        put(info, "memory_free_gb", gb(free));
                    }
                    if let Some(&available) = mem.get("MemAvailable") {
                        put(info, "memory_available_kb", available);
                        put(info, "memory_available_gb", gb(available));
                        let used = total.saturating_sub(available);
                        let percent = used as f64 / total as f64 * 100.0;
                        put(info, "memory_usage_percent", (percent * 100.0).round() / 100.0);
                    }
                    if let Some(&buffers) = mem.get("Buffers") {
                        put(info, "buffers_kb", buffers);
                    }
                    if let Some(&cached) = mem.get("Cached") {
                        put(info, "cached_kb", cached);
                    }
                    if let Some(&swap_total) = mem.get("SwapTotal") {
                        put(info, "swap_total_kb", swap_total);
                        put(info, "swap_total_gb", gb(swap_total));
                        if let Some(&swap_free) = mem.get("SwapFree") {
                            let used = swap_total.saturating_sub(swap_free);
                            put(info, "swap_free_kb", swap_free);
                            put(info, "swap_used_kb", used);
                            if swap_total > 0 {
                                let percent = used as f64 / swap_total as f64 * 100.0;
                                put(
                                    info,
                                    "swap_usage_percent",
                                    (percent * 100.0).round() / 100.0,
                                );
                            }
                        }
                    }
                }
                Err(e) => probe_error(info, "proc_meminfo", e),
            },
            None => probe_error(info, "proc_meminfo", "Failed to read /proc/meminfo"),
        }

        let free = self.system.run_command(&["free", "-h"]);
        if free.success {
            if let Some(row) = parse_free_row(&free.stdout) {
                put(info, "free_output", row);
            }
        } else {
            probe_error(info, "free", free.reason());
        }
    }

    fn hardware_info(&self, info: &mut Attrs) {
        let dmi = self.system.run_command(&["dmidecode", "-t", "memory"]);
        if dmi.success {
            let devices = parse_memory_devices(&dmi.stdout);
            if !devices.is_empty() {
                let total_mb: u64 = devices.iter().filter_map(|d| d.size_mb).sum();
                put(info, "memory_device_count", devices.len());
                put(info, "memory_devices", &devices);
                if total_mb > 0 {
                    put(info, "total_installed_memory_mb", total_mb);
                    put(
                        info,
                        "total_installed_memory_gb",
                        (total_mb as f64 / 1024.0 * 100.0).round() / 100.0,
                    );
                }
            }
        } else {
            probe_error(info, "dmidecode_memory", dmi.reason());
        }

        let array = self.system.run_command(&["dmidecode", "-t", "16"]);
        if array.success {
            if let Ok(parsed) = parse_memory_array(&array.stdout) {
                put(info, "max_capacity", &parsed.max_capacity);
                if let Some(slots) = parsed.slot_count {
                    put(info, "max_memory_devices", slots);
                }
            }
        }
    }

    fn performance_info(&self, info: &mut Attrs) {
        if let Some(raw) = self.system.read_file("/proc/vmstat") {
            let stats = parse_vmstat(&raw);
            for (stat, key) in [
                ("pgfault", "page_faults"),
                ("pgmajfault", "major_page_faults"),
                ("pswpin", "swap_in_pages"),
                ("pswpout", "swap_out_pages"),
            ] {
                if let Some(&value) = stats.get(stat) {
                    put(info, key, value);
                }
            }
        }

        if let Some(raw) = self.system.read_file("/proc/pressure/memory") {
            if let Ok(psi) = parse_memory_pressure(&raw) {
                put(
                    info,
                    "memory_pressure",
                    json!({
                        "avg10": psi.avg10,
                        "avg60": psi.avg60,
                        "avg300": psi.avg300,
                    }),
                );
            }
        }

        if self.system.file_exists("/sys/devices/system/node") {
            let numactl = self.system.run_command(&["numactl", "--hardware"]);
            if numactl.success {
                if let Some((nodes, distances)) = parse_numactl(&numactl.stdout) {
                    let mut numa = Attrs::new();
                    numa.insert("numa_nodes".into(), json!(nodes));
                    if let Some(d) = distances {
                        numa.insert("node_distances".into(), json!(d));
                    }
                    put(info, "numa_info", numa);
                }
            }
        }
    }

    fn timing_info(&self, info: &mut Attrs) {
        if !self.system.file_exists("/sys/devices/system/edac") {
            return;
        }
        let mut controllers = Vec::new();
        for mc in 0..10 {
            let base = format!("/sys/devices/system/edac/mc/mc{mc}");
            if !self.system.file_exists(&base) {
                continue;
            }
            let mut entry = Attrs::new();
            if let Some(size) = self
                .system
                .read_file(&format!("{base}/size_mb"))
                .and_then(|v| v.trim().parse::<u64>().ok())
            {
                entry.insert("size_mb".into(), json!(size));
            }
            if let Some(name) = self.system.read_file(&format!("{base}/mc_name")) {
                entry.insert("name".into(), json!(name.trim()));
            }
            controllers.push(entry);
        }
        if !controllers.is_empty() {
            put(info, "edac_info", json!({ "memory_controllers": controllers }));
        }
    }

    fn optimization(&self, info: &mut Attrs) {
        let mut recommendations = Vec::new();

        if let Some(raw) = self.system.read_file("/proc/meminfo") {
            if let Ok(mem) = parse_meminfo(&raw) {
                if let (Some(&total), Some(&free)) = (mem.get("SwapTotal"), mem.get("SwapFree")) {
                    if total > 0 {
                        let used_percent =
                            total.saturating_sub(free) as f64 / total as f64 * 100.0;
                        if used_percent > SWAP_USAGE_HIGH_PERCENT {
                            recommendations.push(json!({
                                "type": "performance",
                                "issue": format!("High swap usage: {used_percent:.1}%"),
                                "recommendation": "Consider adding more RAM or optimizing memory usage",
                                "severity": if used_percent > 80.0 { "high" } else { "medium" },
                            }));
                        }
                    }
                }
            }
        }

        if let Some(raw) = self.system.read_file("/proc/buddyinfo") {
            if let Ok(zones) = parse_buddyinfo(&raw) {
                let fragmented: Vec<_> = zones
                    .iter()
                    .filter(|z| z.high_order_pages() < FRAGMENTATION_PAGE_THRESHOLD)
                    .collect();
                if !fragmented.is_empty() {
                    recommendations.push(json!({
                        "type": "performance",
                        "issue": "Memory fragmentation detected",
                        "recommendation": "Consider enabling memory compaction or restarting services",
                        "severity": "medium",
                    }));
                }
            }
        }

        if let Some(thp) = self
            .system
            .read_file("/sys/kernel/mm/transparent_hugepage/enabled")
        {
            if thp.contains("[never]") || thp.trim() == "never" {
                recommendations.push(json!({
                    "type": "performance",
                    "issue": "Transparent Huge Pages disabled",
                    "recommendation": "Consider enabling THP for better memory performance",
                    "command": "echo madvise | sudo tee /sys/kernel/mm/transparent_hugepage/enabled",
                }));
            }
        }

        put(info, "optimization_recommendations", recommendations);
    }
}

/// Pick the Mem: row out of `free -h` output.
fn parse_free_row(raw: &str) -> Option<Attrs> {
    let row = raw.lines().find(|l| l.starts_with("Mem:"))?;
    let parts: Vec<&str> = row.split_whitespace().collect();
    if parts.len() < 7 {
        return None;
    }
    let mut out = Attrs::new();
    for (key, value) in [
        ("total", parts[1]),
        ("used", parts[2]),
        ("free", parts[3]),
        ("shared", parts[4]),
        ("buff_cache", parts[5]),
        ("available", parts[6]),
    ] {
        out.insert(key.into(), json!(value));
    }
    Some(out)
}
