//! Hardware ID database parser for the hwdata `pci.ids` / `usb.ids` format.
//!
//! Both files share one grammar: an unindented `vvvv  Vendor Name` line
//! opens a vendor block, and single-tab `\tdddd  Device Name` lines list
//! its devices. Deeper indentation (subsystems, interfaces) is ignored.

use std::collections::HashMap;

/// In-memory vendor/device name database, loaded lazily once per request.
#[derive(Debug, Default, Clone)]
pub struct IdDatabase {
    vendors: HashMap<String, String>,
    devices: HashMap<(String, String), String>,
}

impl IdDatabase {
    /// Parse an ids file body. Unrecognized lines are skipped.
    pub fn parse(raw: &str) -> Self {
        let mut db = IdDatabase::default();
        let mut current_vendor: Option<String> = None;

        for line in raw.lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(rest) = line.strip_prefix("\t\t") {
                let _ = rest; // subsystem / interface level, not tracked
                continue;
            }
            if let Some(rest) = line.strip_prefix('\t') {
                let Some(vendor) = &current_vendor else {
                    continue;
                };
                if let Some((id, name)) = split_id_line(rest) {
                    db.devices.insert((vendor.clone(), id), name);
                }
            } else if let Some((id, name)) = split_id_line(line) {
                current_vendor = Some(id.clone());
                db.vendors.insert(id, name);
            } else {
                // Class list and other trailing sections end vendor blocks.
                current_vendor = None;
            }
        }
        db
    }

    pub fn is_empty(&self) -> bool {
        self.vendors.is_empty()
    }

    /// Vendor name for a 4-hex-digit id.
    pub fn vendor(&self, vendor_id: &str) -> Option<&str> {
        self.vendors.get(vendor_id).map(String::as_str)
    }

    /// Device name for a (vendor, device) id pair.
    pub fn device(&self, vendor_id: &str, device_id: &str) -> Option<&str> {
        self.devices
            .get(&(vendor_id.to_string(), device_id.to_string()))
            .map(String::as_str)
    }
}

fn split_id_line(line: &str) -> Option<(String, String)> {
    let (id, name) = line.split_once("  ")?;
    let id = id.trim();
    if id.len() != 4 || !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some((id.to_lowercase(), name.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDS: &str = "\
# PCI id list
8086  Intel Corporation
\t1237  440FX - 82441FX PMC [Natoma]
\t7000  82371SB PIIX3 ISA [Natoma/Triton II]
10de  NVIDIA Corporation
\t2484  GA104 [GeForce RTX 3070]
\t\t1458 4082  Some subsystem name
C 03  Display controller
";

    #[test]
    fn test_parse_vendors_and_devices() {
        let db = IdDatabase::parse(IDS);
        assert_eq!(db.vendor("8086"), Some("Intel Corporation"));
        assert_eq!(db.vendor("10de"), Some("NVIDIA Corporation"));
        assert_eq!(db.device("10de", "2484"), Some("GA104 [GeForce RTX 3070]"));
        assert_eq!(db.device("8086", "7000"), Some("82371SB PIIX3 ISA [Natoma/Triton II]"));
        assert_eq!(db.vendor("ffff"), None);
    }

    #[test]
    fn test_subsystem_lines_ignored() {
        let db = IdDatabase::parse(IDS);
        assert_eq!(db.device("10de", "1458"), None);
    }
}
