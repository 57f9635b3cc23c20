//! Parsers for display and GPU probes: xrandr and nvidia-smi.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A display from `xrandr --verbose` output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayInfo {
    pub name: String,
    /// `connected` or `disconnected`.
    pub status: String,
    pub primary: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub x: Option<u32>,
    pub y: Option<u32>,
    /// Concatenated EDID hex when present.
    pub edid: Option<String>,
}

/// Parse `xrandr --verbose` output into per-display records.
pub fn parse_xrandr(raw: &str) -> Vec<DisplayInfo> {
    let head_re =
        Regex::new(r"^(\S+) (connected|disconnected)").expect("static regex");
    let geometry_re = Regex::new(r"(\d+)x(\d+)\+(\d+)\+(\d+)").expect("static regex");

    let mut displays: Vec<DisplayInfo> = Vec::new();
    let mut in_edid = false;
    for line in raw.lines() {
        if let Some(caps) = head_re.captures(line) {
            in_edid = false;
            let mut display = DisplayInfo {
                name: caps[1].to_string(),
                status: caps[2].to_string(),
                primary: line.contains(" primary "),
                ..DisplayInfo::default()
            };
            if let Some(geo) = geometry_re.captures(line) {
                display.width = geo[1].parse().ok();
                display.height = geo[2].parse().ok();
                display.x = geo[3].parse().ok();
                display.y = geo[4].parse().ok();
            }
            displays.push(display);
            continue;
        }
        let Some(current) = displays.last_mut() else {
            continue;
        };
        let trimmed = line.trim();
        if trimmed == "EDID:" {
            in_edid = true;
            current.edid = Some(String::new());
            continue;
        }
        if in_edid {
            // EDID payload lines are 32 hex chars, deeply indented.
            if trimmed.len() == 32 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
                if let Some(edid) = &mut current.edid {
                    edid.push_str(trimmed);
                }
                continue;
            }
            in_edid = false;
        }
    }
    displays
}

/// Parse `nvidia-smi -q` output into one key map per GPU.
///
/// Known keys are normalized (`Product Name` → `model`); everything else in
/// a GPU block is ignored.
pub fn parse_nvidia_smi_query(raw: &str) -> Vec<BTreeMap<String, String>> {
    const KEYMAP: [(&str, &str); 8] = [
        ("Product Name", "model"),
        ("GPU UUID", "uuid"),
        ("Serial Number", "serial"),
        ("VBIOS Version", "vbios_version"),
        ("Driver Version", "driver_version"),
        ("Total", "memory_total"),
        ("Used", "memory_used"),
        ("Free", "memory_free"),
    ];

    // Section headers look like "GPU 00000000:01:00.0".
    let header_re = Regex::new(r"^GPU [0-9a-fA-F:.]+$").expect("static regex");

    let mut gpus: Vec<BTreeMap<String, String>> = Vec::new();
    for line in raw.lines() {
        let trimmed = line.trim();
        if header_re.is_match(trimmed) {
            gpus.push(BTreeMap::new());
            continue;
        }
        let Some(current) = gpus.last_mut() else {
            continue;
        };
        let Some((key, value)) = trimmed.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if let Some((_, normalized)) = KEYMAP.iter().find(|(k, _)| *k == key) {
            // Memory rows repeat in several sections; first one wins
            // (FB memory usage comes first in -q output).
            current
                .entry(normalized.to_string())
                .or_insert_with(|| value.to_string());
        }
    }
    gpus
}

/// Parse `nvidia-smi --query-gpu=... --format=csv,noheader` metric rows.
/// Column order: gpu util, memory util, temperature, power draw, graphics
/// clock, memory clock.
pub fn parse_nvidia_smi_metrics(raw: &str) -> Option<BTreeMap<String, String>> {
    let values: Vec<&str> = raw.trim().lines().next()?.split(',').collect();
    if values.len() < 6 {
        return None;
    }
    let keys = [
        "gpu_utilization",
        "memory_utilization",
        "temperature",
        "power_draw",
        "graphics_clock",
        "memory_clock",
    ];
    Some(
        keys.iter()
            .zip(values.iter())
            .map(|(k, v)| (k.to_string(), v.trim().to_string()))
            .collect(),
    )
}
