//! Parsers for dmidecode memory tables and numactl topology output.

use regex::Regex;
use serde::{Deserialize, Serialize};
use sl_common::{Error, Result};

/// One installed DIMM from a DMI type 17 record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryDevice {
    /// Raw size string, e.g. "8 GB".
    pub size: String,
    /// Size normalized to MB when the unit is recognized.
    pub size_mb: Option<u64>,
    pub mem_type: Option<String>,
    pub speed: Option<String>,
    pub manufacturer: Option<String>,
    pub part_number: Option<String>,
    pub locator: Option<String>,
}

/// Parse `dmidecode -t memory` output into populated memory devices.
/// Empty slots ("No Module Installed") are skipped.
pub fn parse_memory_devices(raw: &str) -> Vec<MemoryDevice> {
    let header = Regex::new(r"Handle 0x[0-9A-Fa-f]+, DMI type 17,").expect("static regex");
    header
        .split(raw)
        .skip(1)
        .filter_map(parse_device_section)
        .collect()
}

fn parse_device_section(section: &str) -> Option<MemoryDevice> {
    let field = |name: &str| -> Option<String> {
        section.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
    };

    let size = field("Size")?;
    if size.contains("No Module Installed") || size == "0" {
        return None;
    }

    let size_mb = parse_size_mb(&size);
    Some(MemoryDevice {
        size,
        size_mb,
        mem_type: field("Type"),
        speed: field("Speed"),
        manufacturer: field("Manufacturer"),
        part_number: field("Part Number"),
        locator: field("Locator"),
    })
}

fn parse_size_mb(size: &str) -> Option<u64> {
    let number: u64 = size
        .split_whitespace()
        .next()
        .and_then(|n| n.parse().ok())?;
    if size.contains("GB") {
        Some(number * 1024)
    } else if size.contains("MB") {
        Some(number)
    } else {
        None
    }
}

/// Physical memory array limits from a DMI type 16 record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryArray {
    pub max_capacity: String,
    pub slot_count: Option<u32>,
}

/// Parse `dmidecode -t 16` output. `Maximum Capacity` is required.
pub fn parse_memory_array(raw: &str) -> Result<MemoryArray> {
    let field = |name: &str| -> Option<String> {
        raw.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
    };

    Ok(MemoryArray {
        max_capacity: field("Maximum Capacity")
            .ok_or_else(|| Error::missing_field("Maximum Capacity", raw))?,
        slot_count: field("Number Of Devices").and_then(|v| v.parse().ok()),
    })
}

/// Parse `numactl --hardware` output into node count and the raw distance
/// table.
pub fn parse_numactl(raw: &str) -> Option<(u32, Option<String>)> {
    let nodes_re = Regex::new(r"available: (\d+) nodes").expect("static regex");
    let nodes = nodes_re.captures(raw)?[1].parse().ok()?;

    let distances = raw
        .split_once("node distances:")
        .map(|(_, rest)| rest.trim().to_string())
        .filter(|s| !s.is_empty());

    Some((nodes, distances))
}
