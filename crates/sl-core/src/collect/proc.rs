//! Parsers for /proc pseudo-files and lscpu.
//!
//! # Files parsed
//! - `/proc/cpuinfo` - CPU identity and feature flags
//! - `/proc/meminfo` - memory accounting in kB
//! - `/proc/vmstat` - VM event counters
//! - `/proc/buddyinfo` - free-page orders per node/zone
//! - `/proc/pressure/memory` - PSI memory pressure averages
//! - `/proc/cmdline` - kernel boot parameters
//! - `/proc/loadavg` - load averages
//! - `/proc/stat` - boot epoch (`btime`)

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sl_common::{Error, Result};

/// CPU identity extracted from /proc/cpuinfo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuInfo {
    pub model_name: String,
    pub vendor_id: Option<String>,
    pub cpu_family: Option<String>,
    pub model: Option<String>,
    pub stepping: Option<String>,
    /// Feature flags from the first `flags` line.
    pub flags: Vec<String>,
}

/// Parse /proc/cpuinfo. `model name` is required; everything else is
/// best-effort.
pub fn parse_cpuinfo(raw: &str) -> Result<CpuInfo> {
    let field = |name: &str| -> Option<String> {
        raw.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
    };

    let model_name = field("model name").ok_or_else(|| Error::missing_field("model name", raw))?;

    let flags = field("flags")
        .map(|f| f.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    Ok(CpuInfo {
        model_name,
        vendor_id: field("vendor_id"),
        cpu_family: field("cpu family"),
        model: field("model"),
        stepping: field("stepping"),
        flags,
    })
}

/// lscpu summary fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LscpuInfo {
    pub architecture: String,
    pub cpu_op_modes: Option<String>,
    pub byte_order: Option<String>,
}

/// Parse `lscpu` output. `Architecture` is required.
pub fn parse_lscpu(raw: &str) -> Result<LscpuInfo> {
    let field = |name: &str| -> Option<String> {
        raw.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
    };

    Ok(LscpuInfo {
        architecture: field("Architecture")
            .ok_or_else(|| Error::missing_field("Architecture", raw))?,
        cpu_op_modes: field("CPU op-mode(s)"),
        byte_order: field("Byte Order"),
    })
}

/// Parse /proc/meminfo into a map of all `Name: N kB` (and bare `Name: N`)
/// lines, values in kB. `MemTotal` is required.
pub fn parse_meminfo(raw: &str) -> Result<BTreeMap<String, u64>> {
    let mut values = BTreeMap::new();
    for line in raw.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let number = rest.trim().split_whitespace().next().unwrap_or_default();
        if let Ok(kb) = number.parse::<u64>() {
            values.insert(key.trim().to_string(), kb);
        }
    }
    if !values.contains_key("MemTotal") {
        return Err(Error::missing_field("MemTotal", raw));
    }
    Ok(values)
}

/// Parse /proc/vmstat key/count pairs.
pub fn parse_vmstat(raw: &str) -> BTreeMap<String, u64> {
    raw.lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let key = parts.next()?;
            let value = parts.next()?.parse::<u64>().ok()?;
            Some((key.to_string(), value))
        })
        .collect()
}

/// Free-page availability for one node/zone row of /proc/buddyinfo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuddyZone {
    pub node: u32,
    pub zone: String,
    /// Free block counts for orders 0..N (typically 11).
    pub orders: Vec<u64>,
}

impl BuddyZone {
    /// Sum of free blocks at order >= 4, the fragmentation signal.
    pub fn high_order_pages(&self) -> u64 {
        self.orders.iter().skip(4).sum()
    }
}

/// Parse /proc/buddyinfo. At least one node row is required.
pub fn parse_buddyinfo(raw: &str) -> Result<Vec<BuddyZone>> {
    // Row shape: "Node 0, zone   Normal   123 45 ..."
    let re = Regex::new(r"^Node\s+(\d+),\s+zone\s+(\S+)\s+(.*)$").expect("static regex");
    let zones: Vec<BuddyZone> = raw
        .lines()
        .filter_map(|line| {
            let caps = re.captures(line.trim())?;
            let orders = caps[3]
                .split_whitespace()
                .filter_map(|n| n.parse().ok())
                .collect::<Vec<u64>>();
            Some(BuddyZone {
                node: caps[1].parse().ok()?,
                zone: caps[2].to_string(),
                orders,
            })
        })
        .collect();
    if zones.is_empty() {
        return Err(Error::missing_field("Node", raw));
    }
    Ok(zones)
}

/// PSI memory pressure averages from the `some` line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MemoryPressure {
    pub avg10: f64,
    pub avg60: f64,
    pub avg300: f64,
}

/// Parse /proc/pressure/memory. The `some avg10=` field is required.
pub fn parse_memory_pressure(raw: &str) -> Result<MemoryPressure> {
    let some_line = raw
        .lines()
        .find(|l| l.starts_with("some"))
        .ok_or_else(|| Error::missing_field("some", raw))?;

    let field = |name: &str| -> Option<f64> {
        some_line.split_whitespace().find_map(|part| {
            let (key, value) = part.split_once('=')?;
            (key == name).then(|| value.parse().ok()).flatten()
        })
    };

    Ok(MemoryPressure {
        avg10: field("avg10").ok_or_else(|| Error::missing_field("avg10", some_line))?,
        avg60: field("avg60").unwrap_or(0.0),
        avg300: field("avg300").unwrap_or(0.0),
    })
}

/// Parse /proc/cmdline into boot parameter tokens.
pub fn parse_cmdline(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

/// Load averages from /proc/loadavg.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LoadAvg {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
}

/// Parse /proc/loadavg. The 1-minute average is required.
pub fn parse_loadavg(raw: &str) -> Result<LoadAvg> {
    let mut parts = raw.split_whitespace();
    let load1 = parts
        .next()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| Error::missing_field("load1", raw))?;
    Ok(LoadAvg {
        load1,
        load5: parts.next().and_then(|v| v.parse().ok()).unwrap_or(load1),
        load15: parts.next().and_then(|v| v.parse().ok()).unwrap_or(load1),
    })
}

/// Extract the boot epoch (`btime`, seconds since the Unix epoch) from
/// /proc/stat. Required for converting boot-relative kernel timestamps to
/// wall clock.
pub fn parse_stat_btime(raw: &str) -> Result<i64> {
    raw.lines()
        .find_map(|line| {
            let rest = line.strip_prefix("btime ")?;
            rest.trim().parse::<i64>().ok()
        })
        .ok_or_else(|| Error::missing_field("btime", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CPUINFO: &str = "\
processor\t: 0
vendor_id\t: GenuineIntel
cpu family\t: 6
model\t\t: 158
model name\t: Intel(R) Core(TM) i7-9700K CPU @ 3.60GHz
stepping\t: 12
flags\t\t: fpu vme sse sse2 ssse3 sse4_1 sse4_2 avx avx2 aes nx smep smap vmx
processor\t: 1
model name\t: Intel(R) Core(TM) i7-9700K CPU @ 3.60GHz
";

    #[test]
    fn test_parse_cpuinfo() {
        let info = parse_cpuinfo(CPUINFO).unwrap();
        assert_eq!(info.model_name, "Intel(R) Core(TM) i7-9700K CPU @ 3.60GHz");
        assert_eq!(info.vendor_id.as_deref(), Some("GenuineIntel"));
        assert_eq!(info.cpu_family.as_deref(), Some("6"));
        assert_eq!(info.stepping.as_deref(), Some("12"));
        assert!(info.flags.iter().any(|f| f == "avx2"));
    }

    #[test]
    fn test_parse_cpuinfo_missing_model() {
        let err = parse_cpuinfo("processor : 0\nflags : fpu\n").unwrap_err();
        assert!(matches!(err, Error::ParseError { .. }));
    }

    #[test]
    fn test_parse_lscpu() {
        let raw = "Architecture:        x86_64\nCPU op-mode(s):      32-bit, 64-bit\nByte Order:          Little Endian\n";
        let info = parse_lscpu(raw).unwrap();
        assert_eq!(info.architecture, "x86_64");
        assert_eq!(info.cpu_op_modes.as_deref(), Some("32-bit, 64-bit"));
        assert_eq!(info.byte_order.as_deref(), Some("Little Endian"));
    }

    #[test]
    fn test_parse_meminfo() {
        let raw = "MemTotal:       16384000 kB\nMemFree:         2048000 kB\nMemAvailable:    8192000 kB\nHugePages_Total:       0\n";
        let mem = parse_meminfo(raw).unwrap();
        assert_eq!(mem["MemTotal"], 16_384_000);
        assert_eq!(mem["MemAvailable"], 8_192_000);
        assert_eq!(mem["HugePages_Total"], 0);
    }

    #[test]
    fn test_parse_meminfo_requires_total() {
        assert!(parse_meminfo("MemFree: 100 kB\n").is_err());
    }

    #[test]
    fn test_parse_vmstat() {
        let stats = parse_vmstat("pgfault 123456\npgmajfault 789\npswpin 10\npswpout 20\n");
        assert_eq!(stats["pgfault"], 123_456);
        assert_eq!(stats["pswpout"], 20);
    }

    #[test]
    fn test_parse_buddyinfo() {
        let raw = "Node 0, zone      DMA      1      1      1      0      2      1      1      0      1      1      3
Node 0, zone   Normal   2543   1585    968    468     86      9      0      0      0      0      0
";
        let zones = parse_buddyinfo(raw).unwrap();
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[1].zone, "Normal");
        assert_eq!(zones[1].high_order_pages(), 86 + 9);
        assert_eq!(zones[0].high_order_pages(), 2 + 1 + 1 + 1 + 1 + 3);
    }

    #[test]
    fn test_parse_memory_pressure() {
        let raw = "some avg10=1.25 avg60=0.80 avg300=0.10 total=12345678\nfull avg10=0.00 avg60=0.00 avg300=0.00 total=0\n";
        let psi = parse_memory_pressure(raw).unwrap();
        assert!((psi.avg10 - 1.25).abs() < f64::EPSILON);
        assert!((psi.avg300 - 0.10).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_cmdline_and_loadavg() {
        assert_eq!(
            parse_cmdline("BOOT_IMAGE=/boot/vmlinuz quiet splash"),
            vec!["BOOT_IMAGE=/boot/vmlinuz", "quiet", "splash"]
        );
        let load = parse_loadavg("2.50 2.00 1.80 1/150 12345").unwrap();
        assert!((load.load1 - 2.5).abs() < f64::EPSILON);
        assert!((load.load15 - 1.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_stat_btime() {
        let raw = "cpu  1 2 3 4\nbtime 1701684000\nprocesses 999\n";
        assert_eq!(parse_stat_btime(raw).unwrap(), 1_701_684_000);
        assert!(parse_stat_btime("cpu 1 2 3\n").is_err());
    }
}
