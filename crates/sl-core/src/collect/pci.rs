//! Parsers for lspci output in machine-readable and verbose forms.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A PCI device from `lspci -mm` machine-readable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PciDevice {
    pub slot: String,
    pub class: String,
    pub vendor: String,
    pub device: String,
    pub subsystem_vendor: Option<String>,
    pub subsystem_device: Option<String>,
}

/// Parse `lspci -mm` output. Each line carries quoted fields:
/// slot "class" "vendor" "device" [-rXX] ["svendor" "sdevice"].
pub fn parse_lspci_mm(raw: &str) -> Vec<PciDevice> {
    let quoted = Regex::new(r#""([^"]*)""#).expect("static regex");
    raw.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let slot = line.split_whitespace().next()?.to_string();
            let fields: Vec<String> = quoted
                .captures_iter(line)
                .map(|c| c[1].to_string())
                .collect();
            if fields.len() < 3 {
                return None;
            }
            Some(PciDevice {
                slot,
                class: fields[0].clone(),
                vendor: fields[1].clone(),
                device: fields[2].clone(),
                subsystem_vendor: fields.get(3).cloned(),
                subsystem_device: fields.get(4).cloned(),
            })
        })
        .collect()
}

/// A PCI device section from `lspci -vvv` / `lspci -k`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PciDeviceDetail {
    pub slot: String,
    pub description: String,
    pub subsystem: Option<String>,
    /// Driver from `Kernel driver in use`.
    pub driver: Option<String>,
    /// Candidate modules from `Kernel modules`.
    pub modules: Vec<String>,
    /// Capability descriptions, id and text.
    pub capabilities: Vec<(String, String)>,
}

/// Slot grammar per lspci(8): optional domain, bus:dev.func. The domain is
/// four (or more, for SR-IOV setups) hex digits.
fn slot_regex() -> Regex {
    Regex::new(r"(?m)^((?:[0-9a-fA-F]{4,}:)?[0-9a-fA-F]{2}:[0-9a-fA-F]{2}\.[0-7])\s+(.+)$")
        .expect("static regex")
}

/// Parse `lspci -vvv` (or `-k`) output into per-device sections.
pub fn parse_lspci_verbose(raw: &str) -> Vec<PciDeviceDetail> {
    let slot_re = slot_regex();
    let driver_re = Regex::new(r"(?m)^\s+Kernel driver in use:\s*(.+)$").expect("static regex");
    let modules_re = Regex::new(r"(?m)^\s+Kernel modules:\s*(.+)$").expect("static regex");
    let subsystem_re = Regex::new(r"(?m)^\s+Subsystem:\s*(.+)$").expect("static regex");
    let cap_re = Regex::new(r"(?m)^\s+Capabilities:\s*\[([0-9a-fA-F]+)\]\s*(.*)$")
        .expect("static regex");

    let mut sections: Vec<(String, String, usize)> = Vec::new();
    for caps in slot_re.captures_iter(raw) {
        let whole = caps.get(0).expect("match 0");
        sections.push((
            caps[1].to_string(),
            caps[2].trim_end_matches(':').to_string(),
            whole.start(),
        ));
    }

    let mut devices = Vec::new();
    for (i, (slot, description, start)) in sections.iter().enumerate() {
        let end = sections
            .get(i + 1)
            .map(|(_, _, next)| *next)
            .unwrap_or(raw.len());
        let body = &raw[*start..end];

        devices.push(PciDeviceDetail {
            slot: slot.clone(),
            description: description.clone(),
            subsystem: subsystem_re
                .captures(body)
                .map(|c| c[1].trim().to_string()),
            driver: driver_re.captures(body).map(|c| c[1].trim().to_string()),
            modules: modules_re
                .captures(body)
                .map(|c| {
                    c[1].split(',')
                        .map(|m| m.trim().to_string())
                        .filter(|m| !m.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            capabilities: cap_re
                .captures_iter(body)
                .map(|c| (c[1].to_string(), c[2].trim().to_string()))
                .collect(),
        });
    }
    devices
}

/// A device line from `lspci -nn` output, carrying numeric ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PciNumericDevice {
    pub slot: String,
    pub description: String,
    pub vendor_id: String,
    pub device_id: String,
}

/// Parse `lspci -nn` (or `-nn -v`) device lines. The numeric ids sit in the
/// trailing `[vvvv:dddd]` bracket of each unindented line.
pub fn parse_lspci_nn(raw: &str) -> Vec<PciNumericDevice> {
    let re = Regex::new(
        r"^((?:[0-9a-fA-F]{4,}:)?[0-9a-fA-F]{2}:[0-9a-fA-F]{2}\.[0-7])\s+(.+)\s\[([0-9a-f]{4}):([0-9a-f]{4})\]",
    )
    .expect("static regex");
    raw.lines()
        .filter_map(|line| {
            let caps = re.captures(line)?;
            Some(PciNumericDevice {
                slot: caps[1].to_string(),
                description: caps[2].trim().to_string(),
                vendor_id: caps[3].to_lowercase(),
                device_id: caps[4].to_lowercase(),
            })
        })
        .collect()
}

/// Devices from `lspci -k` output with no `Kernel driver in use` line.
pub fn devices_without_driver(raw: &str) -> Vec<PciDeviceDetail> {
    parse_lspci_verbose(raw)
        .into_iter()
        .filter(|d| d.driver.is_none())
        .collect()
}
