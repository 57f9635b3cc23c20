//! USB analyzer: enumeration, topology, sysfs attributes, driver
//! bindings, and known firmware-needing devices.

use serde_json::json;
use sl_common::Attrs;

use crate::collect::{parse_lsusb, parse_lsusb_tree, IdDatabase};
use crate::system::SystemInterface;

use super::{probe_error, put};

/// Candidate locations of the hwdata USB ID database.
const USB_IDS_PATHS: [&str; 2] = ["/usr/share/hwdata/usb.ids", "/usr/share/misc/usb.ids"];

/// Realtek WiFi adapters that commonly need extra firmware.
const REALTEK_FIRMWARE_PRODUCTS: [&str; 4] = ["8172", "8192", "8723", "8821"];

pub struct UsbAnalyzer<'a> {
    system: &'a dyn SystemInterface,
}

impl<'a> UsbAnalyzer<'a> {
    pub fn new(system: &'a dyn SystemInterface) -> Self {
        UsbAnalyzer { system }
    }

    pub fn analyze(&self) -> Attrs {
        let mut info = Attrs::new();
        let db = self.load_ids();

        self.enumeration(&mut info, &db);
        self.hierarchy(&mut info);
        self.sysfs_devices(&mut info, &db);
        self.compatibility(&mut info, &db);
        info
    }

    fn load_ids(&self) -> IdDatabase {
        for path in USB_IDS_PATHS {
            if let Some(content) = self.system.read_file(path) {
                return IdDatabase::parse(&content);
            }
        }
        IdDatabase::default()
    }

    fn enumeration(&self, info: &mut Attrs, db: &IdDatabase) {
        let lsusb = self.system.run_command(&["lsusb"]);
        if !lsusb.success {
            probe_error(info, "lsusb", lsusb.reason());
            return;
        }
        let devices: Vec<serde_json::Value> = parse_lsusb(&lsusb.stdout)
            .into_iter()
            .map(|d| {
                let vendor = db.vendor(&d.vendor_id).map(str::to_string);
                let product = db.device(&d.vendor_id, &d.product_id).map(str::to_string);
                json!({
                    "bus": d.bus,
                    "device": d.device,
                    "vendor_id": d.vendor_id,
                    "product_id": d.product_id,
                    "description": d.description,
                    "vendor": vendor,
                    "product": product,
                })
            })
            .collect();
        put(info, "devices", devices);
    }

    fn hierarchy(&self, info: &mut Attrs) {
        let tree_cmd = self.system.run_command(&["lsusb", "-t"]);
        if !tree_cmd.success {
            probe_error(info, "usb_tree", tree_cmd.reason());
            return;
        }
        let tree = parse_lsusb_tree(&tree_cmd.stdout);
        if !tree.is_empty() {
            put(info, "hierarchy", tree);
        }
    }

    fn sysfs_devices(&self, info: &mut Attrs, db: &IdDatabase) {
        let mut devices = Vec::new();
        for name in self.sysfs_device_names() {
            let base = format!("/sys/bus/usb/devices/{name}");
            let mut device = Attrs::new();
            device.insert("syspath".into(), json!(base));

            let vendor_id = self.system.read_file(&format!("{base}/idVendor"));
            if let Some(vid) = &vendor_id {
                device.insert("vendor_id".into(), json!(vid.trim()));
                if let Some(vendor) = db.vendor(vid.trim()) {
                    device.insert("vendor".into(), json!(vendor));
                }
            }
            if let Some(pid) = self.system.read_file(&format!("{base}/idProduct")) {
                device.insert("product_id".into(), json!(pid.trim()));
                if let Some(vid) = &vendor_id {
                    if let Some(product) = db.device(vid.trim(), pid.trim()) {
                        device.insert("product".into(), json!(product));
                    }
                }
            }
            for (file, key) in [
                ("manufacturer", "manufacturer"),
                ("product", "product_name"),
                ("serial", "serial"),
                ("speed", "speed"),
                ("version", "version"),
                ("bDeviceClass", "device_class"),
            ] {
                if let Some(value) = self.system.read_file(&format!("{base}/{file}")) {
                    device.insert(key.into(), json!(value.trim()));
                }
            }
            if let Some(driver) = self.device_driver(&base) {
                device.insert("driver".into(), json!(driver));
            }
            devices.push(device);
        }
        if !devices.is_empty() {
            put(info, "sysfs_devices", devices);
        }
    }

    /// USB device names under /sys/bus/usb/devices, excluding interface
    /// entries (those contain a colon).
    fn sysfs_device_names(&self) -> Vec<String> {
        let ls = self.system.run_command(&["ls", "/sys/bus/usb/devices/"]);
        if !ls.success {
            return Vec::new();
        }
        ls.stdout
            .split_whitespace()
            .filter(|name| !name.contains(':'))
            .map(str::to_string)
            .collect()
    }

    fn device_driver(&self, syspath: &str) -> Option<String> {
        let driver_path = format!("{syspath}/driver");
        if !self.system.file_exists(&driver_path) {
            return None;
        }
        let link = self.system.run_command(&["readlink", "-f", &driver_path]);
        if !link.success {
            return None;
        }
        link.stdout
            .trim()
            .rsplit('/')
            .next()
            .map(str::to_string)
            .filter(|s| !s.is_empty())
    }

    fn compatibility(&self, info: &mut Attrs, db: &IdDatabase) {
        let mut issues = Vec::new();

        if let Some(version) = self.kernel_version() {
            put(info, "kernel_version", version);
        }

        for name in self.sysfs_device_names() {
            let base = format!("/sys/bus/usb/devices/{name}");
            let vendor_id = self
                .system
                .read_file(&format!("{base}/idVendor"))
                .map(|v| v.trim().to_string());
            let product_id = self
                .system
                .read_file(&format!("{base}/idProduct"))
                .map(|v| v.trim().to_string());
            let (Some(vid), Some(pid)) = (vendor_id, product_id) else {
                continue;
            };
            let label = || {
                let product = db
                    .device(&vid, &pid)
                    .map(str::to_string)
                    .or_else(|| {
                        self.system
                            .read_file(&format!("{base}/product"))
                            .map(|p| p.trim().to_string())
                    })
                    .unwrap_or_else(|| "Unknown Device".to_string());
                format!("{vid}:{pid} {product}")
            };

            if self.device_driver(&base).is_none() {
                issues.push(json!({
                    "type": "missing_driver",
                    "device": label(),
                    "recommendation": "Install appropriate driver for this device",
                }));
            }

            if vid == "0bda" && REALTEK_FIRMWARE_PRODUCTS.contains(&pid.as_str()) {
                issues.push(json!({
                    "type": "realtek_wifi",
                    "device": label(),
                    "recommendation": "May need firmware installation or driver update",
                }));
            }

            if vid == "0a5c" {
                issues.push(json!({
                    "type": "broadcom_bluetooth",
                    "device": label(),
                    "recommendation": "May need firmware installation from linux-firmware package",
                }));
            }
        }

        if !issues.is_empty() {
            put(info, "compatibility_issues", issues);
        }
    }

    fn kernel_version(&self) -> Option<String> {
        let uname = self.system.run_command(&["uname", "-r"]);
        uname.success.then(|| uname.stdout.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::MockSystem;

    fn sys_with_device(vid: &str, pid: &str) -> MockSystem {
        MockSystem::new()
            .with_command("ls /sys/bus/usb/devices/", "1-1 1-1:1.0 usb1\n")
            .with_file("/sys/bus/usb/devices/1-1/idVendor", vid)
            .with_file("/sys/bus/usb/devices/1-1/idProduct", pid)
            .with_file("/sys/bus/usb/devices/1-1/product", "Test Adapter")
    }

    #[test]
    fn test_realtek_firmware_hint() {
        let sys = sys_with_device("0bda", "8723");
        let info = UsbAnalyzer::new(&sys).analyze();
        let issues = info["compatibility_issues"].as_array().unwrap();
        assert!(issues.iter().any(|i| i["type"] == "realtek_wifi"));
        // No driver symlink seeded, so the missing-driver finding fires too.
        assert!(issues.iter().any(|i| i["type"] == "missing_driver"));
    }

    #[test]
    fn test_broadcom_bluetooth_hint() {
        let sys = sys_with_device("0a5c", "21e6");
        let info = UsbAnalyzer::new(&sys).analyze();
        let issues = info["compatibility_issues"].as_array().unwrap();
        let bt = issues
            .iter()
            .find(|i| i["type"] == "broadcom_bluetooth")
            .unwrap();
        assert!(bt["device"].as_str().unwrap().contains("0a5c:21e6"));
    }

    #[test]
    fn test_enumeration_with_database() {
        let ids = "8087  Intel Corp.\n\t0024  Integrated Rate Matching Hub\n";
        let sys = MockSystem::new()
            .with_file("/usr/share/hwdata/usb.ids", ids)
            .with_command(
                "lsusb",
                "Bus 001 Device 002: ID 8087:0024 Intel Corp. Integrated Rate Matching Hub\n",
            );
        let info = UsbAnalyzer::new(&sys).analyze();
        let devices = info["devices"].as_array().unwrap();
        assert_eq!(devices[0]["vendor"], "Intel Corp.");
        assert_eq!(devices[0]["product"], "Integrated Rate Matching Hub");
    }

    #[test]
    fn test_interfaces_excluded_from_sysfs_walk() {
        let sys = sys_with_device("046d", "c077");
        let analyzer = UsbAnalyzer::new(&sys);
        assert_eq!(analyzer.sysfs_device_names(), vec!["1-1", "usb1"]);
    }

    #[test]
    fn test_lsusb_failure_degrades() {
        let sys = MockSystem::new();
        let info = UsbAnalyzer::new(&sys).analyze();
        assert!(info.contains_key("lsusb_error"));
        assert!(info.contains_key("usb_tree_error"));
    }
}
