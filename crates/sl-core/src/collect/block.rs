//! Parsers for block device and filesystem probes: lsblk, df, smartctl,
//! hdparm, udevadm, tune2fs, e4defrag, mount, iostat.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use sl_common::{Error, Result};

/// One node of the lsblk block-device tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LsblkDevice {
    pub name: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub mountpoint: Option<String>,
    #[serde(default)]
    pub fstype: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    /// Rotational flag; lsblk emits a bool or "0"/"1" depending on version.
    #[serde(default, deserialize_with = "de_flexible_bool")]
    pub rota: Option<bool>,
    #[serde(default)]
    pub tran: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub children: Vec<LsblkDevice>,
}

fn de_flexible_bool<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Option<bool>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(de)?;
    Ok(match value {
        Some(serde_json::Value::Bool(b)) => Some(b),
        Some(serde_json::Value::String(s)) => match s.trim() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        },
        Some(serde_json::Value::Number(n)) => n.as_i64().map(|v| v != 0),
        _ => None,
    })
}

#[derive(Deserialize)]
struct LsblkRoot {
    #[serde(default)]
    blockdevices: Vec<LsblkDevice>,
}

/// Parse `lsblk -J -o ...` JSON output into the device tree.
pub fn parse_lsblk_json(raw: &str) -> Result<Vec<LsblkDevice>> {
    let root: LsblkRoot = serde_json::from_str(raw)
        .map_err(|_| Error::missing_field("blockdevices", raw))?;
    Ok(root.blockdevices)
}

/// One `df` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DfEntry {
    pub filesystem: String,
    /// Filesystem type, present only for `df -T`.
    pub fs_type: Option<String>,
    pub size: String,
    pub used: String,
    pub available: String,
    pub use_percent: u8,
    pub mountpoint: String,
}

/// Parse `df -h` (or `df -T` when `typed` is set) output. Rows with a
/// non-numeric use% column are skipped.
pub fn parse_df(raw: &str, typed: bool) -> Vec<DfEntry> {
    let want = if typed { 7 } else { 6 };
    raw.lines()
        .skip(1)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < want {
                return None;
            }
            let offset = if typed { 1 } else { 0 };
            let use_percent = parts[4 + offset].trim_end_matches('%').parse().ok()?;
            Some(DfEntry {
                filesystem: parts[0].to_string(),
                fs_type: typed.then(|| parts[1].to_string()),
                size: parts[1 + offset].to_string(),
                used: parts[2 + offset].to_string(),
                available: parts[3 + offset].to_string(),
                use_percent,
                mountpoint: parts[5 + offset].to_string(),
            })
        })
        .collect()
}

/// Drive identity from `smartctl -i`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartIdentity {
    pub model_family: Option<String>,
    pub device_model: Option<String>,
    pub serial_number: Option<String>,
    pub firmware_version: Option<String>,
    pub capacity: Option<String>,
    pub rotation_rate: Option<String>,
    pub sata_version: Option<String>,
    /// Derived: rotation rate reports "Solid State Device".
    pub is_ssd: bool,
}

/// Parse `smartctl -i` output.
pub fn parse_smart_identity(raw: &str) -> SmartIdentity {
    let field = |name: &str| -> Option<String> {
        raw.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
    };

    let rotation_rate = field("Rotation Rate");
    let is_ssd = rotation_rate
        .as_deref()
        .is_some_and(|r| r.contains("Solid State Device"));
    SmartIdentity {
        model_family: field("Model Family"),
        device_model: field("Device Model"),
        serial_number: field("Serial Number"),
        firmware_version: field("Firmware Version"),
        capacity: field("User Capacity"),
        rotation_rate,
        sata_version: field("SATA Version is"),
        is_ssd,
    }
}

/// Overall SMART self-assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SmartHealth {
    Passed,
    Failed,
    Unknown,
}

/// Parse `smartctl -H` output.
pub fn parse_smart_health(raw: &str) -> SmartHealth {
    if raw.contains("PASSED") {
        SmartHealth::Passed
    } else if raw.contains("FAILED") {
        SmartHealth::Failed
    } else {
        SmartHealth::Unknown
    }
}

/// One row of the SMART attribute table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartAttribute {
    pub id: u16,
    pub name: String,
    pub value: u16,
    pub worst: u16,
    pub threshold: u16,
    pub raw: String,
}

/// Parse the `smartctl -A` attribute table. Rows that do not fit the
/// table shape are skipped.
pub fn parse_smart_attributes(raw: &str) -> Vec<SmartAttribute> {
    let Some(table_start) = raw.find("ID# ATTRIBUTE_NAME") else {
        return Vec::new();
    };
    raw[table_start..]
        .lines()
        .skip(1)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 10 {
                return None;
            }
            Some(SmartAttribute {
                id: parts[0].parse().ok()?,
                name: parts[1].to_string(),
                value: parts[3].parse().ok()?,
                worst: parts[4].parse().ok()?,
                threshold: parts[5].parse().ok()?,
                raw: parts[9].to_string(),
            })
        })
        .collect()
}

/// Parse `hdparm -i` identity fields (model, serial, firmware).
pub fn parse_hdparm(raw: &str) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    let patterns = [
        ("model", r"Model=([^,\n]+)"),
        ("serial", r"SerialNo=([^,\n]+)"),
        ("firmware", r"FwRev=([^,\n]+)"),
    ];
    for (key, pattern) in patterns {
        let re = Regex::new(pattern).expect("static regex");
        if let Some(caps) = re.captures(raw) {
            fields.insert(key.to_string(), caps[1].trim().to_string());
        }
    }
    fields
}

/// Parse `udevadm info --query=property` output, keeping the identity keys.
pub fn parse_udevadm(raw: &str) -> BTreeMap<String, String> {
    const KEEP: [(&str, &str); 5] = [
        ("ID_MODEL", "udev_model"),
        ("ID_SERIAL", "udev_serial"),
        ("ID_TYPE", "udev_type"),
        ("ID_BUS", "udev_bus"),
        ("ID_PATH", "udev_path"),
    ];
    raw.lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let out = KEEP.iter().find(|(k, _)| *k == key)?.1;
            Some((out.to_string(), value.to_string()))
        })
        .collect()
}

/// One mounted filesystem from `mount` output
/// (`device on /mount type fstype (options)`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountEntry {
    pub device: String,
    pub mountpoint: String,
    pub fstype: String,
    pub options: Vec<String>,
}

/// Parse `mount` output lines.
pub fn parse_mount_lines(raw: &str) -> Vec<MountEntry> {
    let re = Regex::new(r"^(\S+) on (\S+) type (\S+) \(([^)]*)\)").expect("static regex");
    raw.lines()
        .filter_map(|line| {
            let caps = re.captures(line)?;
            Some(MountEntry {
                device: caps[1].to_string(),
                mountpoint: caps[2].to_string(),
                fstype: caps[3].to_string(),
                options: caps[4].split(',').map(str::to_string).collect(),
            })
        })
        .collect()
}

/// Parse `tune2fs -l` output into feature list and block/inode accounting
/// with derived usage percentages.
pub fn parse_tune2fs(raw: &str) -> BTreeMap<String, serde_json::Value> {
    let field = |name: &str| -> Option<String> {
        raw.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
    };
    let int_field = |name: &str| field(name).and_then(|v| v.parse::<u64>().ok());

    let mut out = BTreeMap::new();
    if let Some(features) = field("Filesystem features") {
        let list: Vec<String> = features.split_whitespace().map(str::to_string).collect();
        out.insert("features".into(), serde_json::json!(list));
    }
    let inode_count = int_field("Inode count");
    let block_count = int_field("Block count");
    let free_blocks = int_field("Free blocks");
    let free_inodes = int_field("Free inodes");
    for (key, value) in [
        ("inode_count", inode_count),
        ("block_count", block_count),
        ("free_blocks", free_blocks),
        ("free_inodes", free_inodes),
    ] {
        if let Some(v) = value {
            out.insert(key.into(), serde_json::json!(v));
        }
    }
    if let (Some(total), Some(free)) = (block_count, free_blocks) {
        if total > 0 {
            let pct = (total - free) as f64 / total as f64 * 100.0;
            out.insert(
                "block_usage_percent".into(),
                serde_json::json!((pct * 100.0).round() / 100.0),
            );
        }
    }
    if let (Some(total), Some(free)) = (inode_count, free_inodes) {
        if total > 0 {
            let pct = (total - free) as f64 / total as f64 * 100.0;
            out.insert(
                "inode_usage_percent".into(),
                serde_json::json!((pct * 100.0).round() / 100.0),
            );
        }
    }
    out
}

/// Extract the fragmentation score from `e4defrag -c` output.
pub fn parse_e4defrag_score(raw: &str) -> u32 {
    let re = Regex::new(r"Fragmentation score:\s*(\d+)").expect("static regex");
    re.captures(raw)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

/// Parse `iostat -x -d` extended device rows keyed by column header.
pub fn parse_iostat(raw: &str) -> Vec<BTreeMap<String, String>> {
    let lines: Vec<&str> = raw.lines().collect();
    let Some(header_idx) = lines
        .iter()
        .position(|l| l.contains("Device") && l.contains("r/s"))
    else {
        return Vec::new();
    };
    let headers: Vec<&str> = lines[header_idx].split_whitespace().collect();

    lines[header_idx + 1..]
        .iter()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| {
            let values: Vec<&str> = line.split_whitespace().collect();
            if values.len() < headers.len() {
                return None;
            }
            let mut row = BTreeMap::new();
            row.insert("device".to_string(), values[0].to_string());
            for (header, value) in headers.iter().zip(values.iter()).skip(1) {
                row.insert(header.to_string(), value.to_string());
            }
            Some(row)
        })
        .collect()
}
