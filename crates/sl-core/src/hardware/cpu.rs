//! CPU analyzer: identity, features, frequency, topology, cache, and
//! vulnerability state.

use serde_json::json;
use sl_common::Attrs;

use crate::collect::{parse_cpuinfo, parse_lscpu};
use crate::system::SystemInterface;

use super::{probe_error, put};

/// Vulnerability files checked under
/// /sys/devices/system/cpu/vulnerabilities/.
const VULNERABILITY_FILES: [&str; 9] = [
    "spectre_v1",
    "spectre_v2",
    "meltdown",
    "spec_store_bypass",
    "l1tf",
    "mds",
    "tsx_async_abort",
    "itlb_multihit",
    "srbds",
];

/// Security-relevant flags: cpuinfo flag name, output key.
const SECURITY_FLAGS: [(&str, &str); 6] = [
    ("nx", "nx_bit"),
    ("smep", "smep"),
    ("smap", "smap"),
    ("intel_pt", "intel_pt"),
    ("cet_ss", "cet_ss"),
    ("cet_ibt", "cet_ibt"),
];

/// Performance-relevant flags. `pni` is the cpuinfo name for SSE3.
const PERFORMANCE_FLAGS: [(&str, &str); 12] = [
    ("sse", "sse"),
    ("sse2", "sse2"),
    ("pni", "sse3"),
    ("ssse3", "ssse3"),
    ("sse4_1", "sse4_1"),
    ("sse4_2", "sse4_2"),
    ("avx", "avx"),
    ("avx2", "avx2"),
    ("avx512f", "avx512f"),
    ("aes", "aes"),
    ("rdrand", "rdrand"),
    ("rdseed", "rdseed"),
];

/// Virtualization flags.
const VIRTUALIZATION_FLAGS: [(&str, &str); 4] =
    [("vmx", "vmx"), ("svm", "svm"), ("ept", "ept"), ("vpid", "vpid")];

const CPUFREQ_BASE: &str = "/sys/devices/system/cpu/cpu0/cpufreq";

/// CPU analyzer with feature detection and local optimization rules.
pub struct CpuAnalyzer<'a> {
    system: &'a dyn SystemInterface,
}

impl<'a> CpuAnalyzer<'a> {
    pub fn new(system: &'a dyn SystemInterface) -> Self {
        CpuAnalyzer { system }
    }

    pub fn analyze(&self) -> Attrs {
        let mut info = Attrs::new();
        self.basic_info(&mut info);
        self.features(&mut info);
        self.frequency_info(&mut info);
        self.topology_info(&mut info);
        self.cache_info(&mut info);
        self.optimization(&mut info);
        info
    }

    fn basic_info(&self, info: &mut Attrs) {
        match self.system.read_file("/proc/cpuinfo") {
            Some(raw) => match parse_cpuinfo(&raw) {
                Ok(cpu) => {
                    put(info, "model_name", &cpu.model_name);
                    if let Some(v) = &cpu.vendor_id {
                        put(info, "vendor_id", v);
                    }
                    if let Some(v) = &cpu.cpu_family {
                        put(info, "cpu_family", v);
                    }
                    if let Some(v) = &cpu.model {
                        put(info, "model", v);
                    }
                    if let Some(v) = &cpu.stepping {
                        put(info, "stepping", v);
                    }
                }
                Err(e) => probe_error(info, "proc_cpuinfo", e),
            },
            None => probe_error(info, "proc_cpuinfo", "Failed to read /proc/cpuinfo"),
        }

        let lscpu = self.system.run_command(&["lscpu"]);
        if lscpu.success {
            match parse_lscpu(&lscpu.stdout) {
                Ok(parsed) => {
                    put(info, "architecture", &parsed.architecture);
                    if let Some(v) = &parsed.cpu_op_modes {
                        put(info, "cpu_op_modes", v);
                    }
                    if let Some(v) = &parsed.byte_order {
                        put(info, "byte_order", v);
                    }
                }
                Err(e) => probe_error(info, "lscpu", e),
            }
        } else {
            probe_error(info, "lscpu", lscpu.reason());
        }
    }

    fn features(&self, info: &mut Attrs) {
        if let Some(raw) = self.system.read_file("/proc/cpuinfo") {
            if let Ok(cpu) = parse_cpuinfo(&raw) {
                put(info, "cpu_flags", &cpu.flags);
                put(info, "security_features", flag_map(&cpu.flags, &SECURITY_FLAGS));
                put(
                    info,
                    "performance_features",
                    flag_map(&cpu.flags, &PERFORMANCE_FLAGS),
                );
                put(
                    info,
                    "virtualization_features",
                    flag_map(&cpu.flags, &VIRTUALIZATION_FLAGS),
                );
            }
        }
        let vulns = self.vulnerabilities();
        if !vulns.is_empty() {
            put(info, "vulnerabilities", &vulns);
        }
    }

    fn vulnerabilities(&self) -> Attrs {
        let mut vulns = Attrs::new();
        for name in VULNERABILITY_FILES {
            let path = format!("/sys/devices/system/cpu/vulnerabilities/{name}");
            if let Some(status) = self.system.read_file(&path) {
                vulns.insert(name.to_string(), json!(status.trim()));
            }
        }
        vulns
    }

    fn frequency_info(&self, info: &mut Attrs) {
        let freq = |file: &str| -> Option<u64> {
            self.system
                .read_file(&format!("{CPUFREQ_BASE}/{file}"))
                .and_then(|v| v.trim().parse().ok())
        };

        for (file, khz_key, mhz_key) in [
            ("scaling_cur_freq", "current_frequency_khz", "current_frequency_mhz"),
            ("scaling_min_freq", "min_frequency_khz", "min_frequency_mhz"),
            ("scaling_max_freq", "max_frequency_khz", "max_frequency_mhz"),
        ] {
            if let Some(khz) = freq(file) {
                put(info, khz_key, khz);
                put(info, mhz_key, (khz as f64 / 1000.0 * 100.0).round() / 100.0);
            }
        }

        if let Some(governors) = self
            .system
            .read_file(&format!("{CPUFREQ_BASE}/scaling_available_governors"))
        {
            let list: Vec<&str> = governors.split_whitespace().collect();
            put(info, "available_governors", list);
        }
        if let Some(governor) = self
            .system
            .read_file(&format!("{CPUFREQ_BASE}/scaling_governor"))
        {
            put(info, "current_governor", governor.trim());
        }
    }

    fn topology_info(&self, info: &mut Attrs) {
        let nproc = self.system.run_command(&["nproc"]);
        if nproc.success {
            if let Ok(n) = nproc.stdout.trim().parse::<u32>() {
                put(info, "logical_cpus", n);
            }
        }

        if let Some(packages) = self.count_unique_topology_values("physical_package_id") {
            put(info, "physical_cpus", packages);
        }
        if let Some(cores) = self.count_unique_topology_values("core_id") {
            put(info, "cores_per_socket", cores);
        }
    }

    /// Walk cpuN directories until the first gap, counting distinct values
    /// of one topology attribute.
    fn count_unique_topology_values(&self, attribute: &str) -> Option<usize> {
        let mut seen = std::collections::BTreeSet::new();
        let mut cpu = 0u32;
        loop {
            let path = format!("/sys/devices/system/cpu/cpu{cpu}/topology/{attribute}");
            match self.system.read_file(&path) {
                Some(value) => seen.insert(value.trim().to_string()),
                None => break,
            };
            cpu += 1;
        }
        (!seen.is_empty()).then_some(seen.len())
    }

    fn cache_info(&self, info: &mut Attrs) {
        let mut cache = Attrs::new();
        for index in 0..4 {
            let base = format!("/sys/devices/system/cpu/cpu0/cache/index{index}");
            if !self.system.file_exists(&format!("{base}/size")) {
                continue;
            }
            let size = self.system.read_file(&format!("{base}/size"));
            let kind = self.system.read_file(&format!("{base}/type"));
            let level = self.system.read_file(&format!("{base}/level"));
            if let (Some(size), Some(kind), Some(level)) = (size, kind, level) {
                cache.insert(
                    format!("L{}", level.trim()),
                    json!({ "size": size.trim(), "type": kind.trim() }),
                );
            }
        }
        if !cache.is_empty() {
            put(info, "cache", cache);
        }
    }

    fn optimization(&self, info: &mut Attrs) {
        let mut recommendations = Vec::new();

        let governor = self
            .system
            .read_file(&format!("{CPUFREQ_BASE}/scaling_governor"))
            .map(|g| g.trim().to_string());
        if governor.as_deref() == Some("powersave") {
            recommendations.push(json!({
                "type": "performance",
                "issue": "CPU governor set to powersave",
                "recommendation": "Consider using performance or schedutil governor for better performance",
                "command": "echo performance | sudo tee /sys/devices/system/cpu/cpu*/cpufreq/scaling_governor",
            }));
        }

        let vulnerable_count = self
            .vulnerabilities()
            .values()
            .filter(|status| status.as_str().is_some_and(|s| s.contains("Vulnerable")))
            .count();
        if vulnerable_count > 0 {
            recommendations.push(json!({
                "type": "security",
                "issue": format!("{vulnerable_count} CPU vulnerabilities detected"),
                "recommendation": "Update kernel and microcode to mitigate CPU vulnerabilities",
                "command": "sudo apt update && sudo apt upgrade linux-generic intel-microcode",
            }));
        }

        put(info, "optimization_recommendations", recommendations);
    }
}

/// Fixed-key boolean record mapping cpuinfo flags to named features.
fn flag_map(flags: &[String], mapping: &[(&str, &str)]) -> Attrs {
    mapping
        .iter()
        .map(|(flag, key)| {
            (
                key.to_string(),
                json!(flags.iter().any(|f| f == flag)),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::MockSystem;

    const CPUINFO: &str = "\
vendor_id\t: GenuineIntel
model name\t: Intel(R) Core(TM) i7-9700K CPU @ 3.60GHz
flags\t\t: fpu sse sse2 pni avx avx2 aes nx smep vmx
";

    fn seeded_mock() -> MockSystem {
        MockSystem::new()
            .with_file("/proc/cpuinfo", CPUINFO)
            .with_command("lscpu", "Architecture: x86_64\nCPU op-mode(s): 32-bit, 64-bit\nByte Order: Little Endian\n")
            .with_command("nproc", "8\n")
            .with_file("/sys/devices/system/cpu/cpu0/cpufreq/scaling_cur_freq", "3600000")
            .with_file("/sys/devices/system/cpu/cpu0/cpufreq/scaling_governor", "powersave")
            .with_file(
                "/sys/devices/system/cpu/vulnerabilities/meltdown",
                "Vulnerable",
            )
            .with_file(
                "/sys/devices/system/cpu/vulnerabilities/spectre_v1",
                "Mitigation: usercopy/swapgs barriers",
            )
            .with_file("/sys/devices/system/cpu/cpu0/topology/physical_package_id", "0")
            .with_file("/sys/devices/system/cpu/cpu1/topology/physical_package_id", "0")
            .with_file("/sys/devices/system/cpu/cpu0/topology/core_id", "0")
            .with_file("/sys/devices/system/cpu/cpu1/topology/core_id", "1")
    }

    #[test]
    fn test_analyze_basic_fields() {
        let sys = seeded_mock();
        let info = CpuAnalyzer::new(&sys).analyze();
        assert_eq!(info["model_name"], "Intel(R) Core(TM) i7-9700K CPU @ 3.60GHz");
        assert_eq!(info["architecture"], "x86_64");
        assert_eq!(info["logical_cpus"], 8);
        assert_eq!(info["physical_cpus"], 1);
        assert_eq!(info["cores_per_socket"], 2);
        assert_eq!(info["current_frequency_khz"], 3_600_000);
        assert_eq!(info["current_frequency_mhz"], 3600.0);
    }

    #[test]
    fn test_feature_maps_follow_canonical_mapping() {
        let sys = seeded_mock();
        let info = CpuAnalyzer::new(&sys).analyze();
        let sec = &info["security_features"];
        assert_eq!(sec["nx_bit"], true);
        assert_eq!(sec["smep"], true);
        assert_eq!(sec["smap"], false);
        let perf = &info["performance_features"];
        assert_eq!(perf["sse3"], true); // pni flag
        assert_eq!(perf["avx512f"], false);
        let virt = &info["virtualization_features"];
        assert_eq!(virt["vmx"], true);
        assert_eq!(virt["svm"], false);
    }

    #[test]
    fn test_optimization_rules_fire() {
        let sys = seeded_mock();
        let info = CpuAnalyzer::new(&sys).analyze();
        let recs = info["optimization_recommendations"].as_array().unwrap();
        assert_eq!(recs.len(), 2);
        assert!(recs.iter().any(|r| r["type"] == "performance"));
        assert!(recs
            .iter()
            .any(|r| r["issue"] == "1 CPU vulnerabilities detected"));
    }

    #[test]
    fn test_missing_probes_degrade_to_sentinels() {
        let sys = MockSystem::new();
        let info = CpuAnalyzer::new(&sys).analyze();
        assert!(info.contains_key("proc_cpuinfo_error"));
        assert!(info.contains_key("lscpu_error"));
        assert!(!info.contains_key("model_name"));
    }
}
