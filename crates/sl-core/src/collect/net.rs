//! Parsers for network probes: ip, iwconfig, ethtool, modinfo, and the
//! sysfs netdev attribute conventions.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// An address attached to an interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpAddress {
    /// Address family, `inet` or `inet6`.
    pub family: String,
    /// Address with prefix length, e.g. `192.168.1.10/24`.
    pub address: String,
}

/// An interface block from `ip -s addr` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpInterface {
    pub name: String,
    pub state: Option<String>,
    pub mac: Option<String>,
    pub addresses: Vec<IpAddress>,
}

/// Parse `ip -s addr` output into per-interface records.
pub fn parse_ip_addr(raw: &str) -> Vec<IpInterface> {
    let head_re = Regex::new(r"^\d+: ([^:@]+)(?:@[^:]+)?:").expect("static regex");
    let state_re = Regex::new(r"state (\w+)").expect("static regex");
    let mac_re = Regex::new(r"link/\S+ ([0-9a-f:]{17})").expect("static regex");
    let v4_re = Regex::new(r"inet (\d+\.\d+\.\d+\.\d+/\d+)").expect("static regex");
    let v6_re = Regex::new(r"inet6 ([0-9a-f:]+/\d+)").expect("static regex");

    let mut interfaces: Vec<IpInterface> = Vec::new();
    for line in raw.lines() {
        if let Some(caps) = head_re.captures(line) {
            interfaces.push(IpInterface {
                name: caps[1].to_string(),
                state: state_re.captures(line).map(|c| c[1].to_string()),
                mac: None,
                addresses: Vec::new(),
            });
            continue;
        }
        let Some(current) = interfaces.last_mut() else {
            continue;
        };
        if current.mac.is_none() {
            if let Some(caps) = mac_re.captures(line) {
                current.mac = Some(caps[1].to_string());
            }
        }
        if let Some(caps) = v4_re.captures(line) {
            current.addresses.push(IpAddress {
                family: "inet".to_string(),
                address: caps[1].to_string(),
            });
        } else if let Some(caps) = v6_re.captures(line) {
            current.addresses.push(IpAddress {
                family: "inet6".to_string(),
                address: caps[1].to_string(),
            });
        }
    }
    interfaces
}

/// RX/TX counters for one interface from `ip -s link`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LinkStats {
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub rx_errors: u64,
    pub rx_dropped: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errors: u64,
    pub tx_dropped: u64,
}

/// Parse `ip -s link` output into per-interface counters. The value rows
/// follow the `RX:`/`TX:` header lines.
pub fn parse_ip_link_stats(raw: &str) -> BTreeMap<String, LinkStats> {
    let head_re = Regex::new(r"^\d+: ([^:@]+)(?:@[^:]+)?:").expect("static regex");

    let mut stats: BTreeMap<String, LinkStats> = BTreeMap::new();
    let mut current: Option<String> = None;
    let mut expecting: Option<&str> = None;

    for line in raw.lines() {
        if let Some(caps) = head_re.captures(line) {
            current = Some(caps[1].to_string());
            stats.insert(caps[1].to_string(), LinkStats::default());
            expecting = None;
            continue;
        }
        let trimmed = line.trim();
        if trimmed.starts_with("RX:") {
            expecting = Some("rx");
            continue;
        }
        if trimmed.starts_with("TX:") {
            expecting = Some("tx");
            continue;
        }
        let (Some(name), Some(direction)) = (&current, expecting) else {
            continue;
        };
        let values: Vec<u64> = trimmed
            .split_whitespace()
            .map_while(|v| v.parse().ok())
            .collect();
        if values.len() >= 4 {
            let entry = stats.entry(name.clone()).or_default();
            if direction == "rx" {
                entry.rx_bytes = values[0];
                entry.rx_packets = values[1];
                entry.rx_errors = values[2];
                entry.rx_dropped = values[3];
            } else {
                entry.tx_bytes = values[0];
                entry.tx_packets = values[1];
                entry.tx_errors = values[2];
                entry.tx_dropped = values[3];
            }
        }
        expecting = None;
    }
    stats
}

/// Map the sysfs `type` number of a net device to a name.
pub fn interface_type_name(type_number: &str) -> String {
    match type_number.trim() {
        "1" => "ethernet",
        "772" => "loopback",
        "801" => "wireless",
        "24" => "firewire",
        "32" => "infiniband",
        other => return other.to_string(),
    }
    .to_string()
}

/// Decode the sysfs `flags` bitmask into names (IFF_* subset).
pub fn decode_interface_flags(flags: u32) -> Vec<&'static str> {
    const FLAGS: [(u32, &str); 13] = [
        (0x1, "UP"),
        (0x2, "BROADCAST"),
        (0x4, "DEBUG"),
        (0x8, "LOOPBACK"),
        (0x10, "POINTOPOINT"),
        (0x40, "RUNNING"),
        (0x80, "NOARP"),
        (0x100, "PROMISC"),
        (0x200, "ALLMULTI"),
        (0x400, "MASTER"),
        (0x800, "SLAVE"),
        (0x1000, "MULTICAST"),
        (0x10000, "LOWER_UP"),
    ];
    FLAGS
        .iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, name)| *name)
        .collect()
}

/// A wireless interface from `iwconfig` output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WirelessInterface {
    pub name: String,
    pub essid: Option<String>,
    pub mode: Option<String>,
    pub frequency_ghz: Option<f64>,
    pub access_point: Option<String>,
    pub bit_rate: Option<String>,
    pub signal_level_dbm: Option<i32>,
}

/// Parse `iwconfig` output, skipping interfaces without wireless
/// extensions.
pub fn parse_iwconfig(raw: &str) -> Vec<WirelessInterface> {
    let essid_re = Regex::new(r#"ESSID:"([^"]*)""#).expect("static regex");
    let mode_re = Regex::new(r"Mode:(\S+)").expect("static regex");
    let freq_re = Regex::new(r"Frequency[=:]\s*(\d+\.\d+)\s*GHz").expect("static regex");
    let ap_re = Regex::new(r"Access Point:\s*([0-9A-Fa-f:]{17})").expect("static regex");
    let rate_re = Regex::new(r"Bit Rate[=:]\s*(\d+\.?\d*\s*[GMk]b/s)").expect("static regex");
    let signal_re = Regex::new(r"Signal level[=:]\s*(-?\d+)\s*dBm").expect("static regex");

    let mut interfaces: Vec<WirelessInterface> = Vec::new();
    let mut skipping = false;
    for line in raw.lines() {
        if !line.starts_with(' ') && !line.trim().is_empty() {
            if line.contains("no wireless extensions") {
                skipping = true;
                continue;
            }
            skipping = false;
            let name = line.split_whitespace().next().unwrap_or_default();
            interfaces.push(WirelessInterface {
                name: name.to_string(),
                essid: essid_re.captures(line).map(|c| c[1].to_string()),
                mode: mode_re.captures(line).map(|c| c[1].to_string()),
                ..WirelessInterface::default()
            });
            continue;
        }
        if skipping {
            continue;
        }
        let Some(current) = interfaces.last_mut() else {
            continue;
        };
        if current.mode.is_none() {
            current.mode = mode_re.captures(line).map(|c| c[1].to_string());
        }
        if let Some(caps) = freq_re.captures(line) {
            current.frequency_ghz = caps[1].parse().ok();
        }
        if let Some(caps) = ap_re.captures(line) {
            current.access_point = Some(caps[1].to_string());
        }
        if let Some(caps) = rate_re.captures(line) {
            current.bit_rate = Some(caps[1].trim().to_string());
        }
        if let Some(caps) = signal_re.captures(line) {
            current.signal_level_dbm = caps[1].parse().ok();
        }
    }
    interfaces
}

/// Extract the driver name from `ethtool -i` output.
pub fn parse_ethtool_driver(raw: &str) -> Option<String> {
    raw.lines().find_map(|line| {
        let rest = line.strip_prefix("driver:")?;
        let driver = rest.trim();
        (!driver.is_empty()).then(|| driver.to_string())
    })
}

/// Parse `ethtool -S` counter output into a name/value map.
pub fn parse_ethtool_stats(raw: &str) -> BTreeMap<String, i64> {
    raw.lines()
        .filter_map(|line| {
            let (key, value) = line.trim().split_once(':')?;
            let value = value.trim().parse().ok()?;
            Some((key.trim().to_string(), value))
        })
        .collect()
}

/// Kernel module metadata from `modinfo`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub version: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub license: Option<String>,
    pub firmware: Vec<String>,
}

/// Parse `modinfo <module>` output.
pub fn parse_modinfo(raw: &str) -> ModuleInfo {
    let mut info = ModuleInfo::default();
    for line in raw.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "version" if info.version.is_none() => info.version = Some(value),
            "author" if info.author.is_none() => info.author = Some(value),
            "description" if info.description.is_none() => info.description = Some(value),
            "license" if info.license.is_none() => info.license = Some(value),
            "firmware" => info.firmware.push(value),
            _ => {}
        }
    }
    info
}
