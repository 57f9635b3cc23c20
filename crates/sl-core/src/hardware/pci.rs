//! PCI analyzer: enumeration, driver bindings, ID-database enrichment,
//! and known compatibility issues.

use serde_json::json;
use sl_common::Attrs;

use crate::collect::{
    devices_without_driver, parse_lspci_mm, parse_lspci_nn, parse_lspci_verbose, IdDatabase,
};
use crate::system::SystemInterface;

use super::{probe_error, put};

/// Candidate locations of the hwdata PCI ID database.
const PCI_IDS_PATHS: [&str; 2] = ["/usr/share/hwdata/pci.ids", "/usr/share/misc/pci.ids"];

pub struct PciAnalyzer<'a> {
    system: &'a dyn SystemInterface,
}

impl<'a> PciAnalyzer<'a> {
    pub fn new(system: &'a dyn SystemInterface) -> Self {
        PciAnalyzer { system }
    }

    pub fn analyze(&self) -> Attrs {
        let mut info = Attrs::new();
        let db = self.load_ids();

        self.enumeration(&mut info, &db);
        self.detailed(&mut info);
        self.compatibility(&mut info);
        info
    }

    /// Load pci.ids lazily, once per request.
    fn load_ids(&self) -> IdDatabase {
        for path in PCI_IDS_PATHS {
            if let Some(content) = self.system.read_file(path) {
                return IdDatabase::parse(&content);
            }
        }
        IdDatabase::default()
    }

    fn enumeration(&self, info: &mut Attrs, db: &IdDatabase) {
        let lspci = self.system.run_command(&["lspci", "-mm"]);
        if lspci.success {
            put(info, "devices", parse_lspci_mm(&lspci.stdout));
        } else {
            probe_error(info, "lspci", lspci.reason());
        }

        // Numeric ids for database enrichment.
        let lspci_nn = self.system.run_command(&["lspci", "-nn"]);
        if lspci_nn.success {
            let enriched: Vec<serde_json::Value> = parse_lspci_nn(&lspci_nn.stdout)
                .into_iter()
                .map(|d| {
                    let vendor_name = db.vendor(&d.vendor_id).map(str::to_string);
                    let device_name = db.device(&d.vendor_id, &d.device_id).map(str::to_string);
                    json!({
                        "slot": d.slot,
                        "description": d.description,
                        "vendor_id": d.vendor_id,
                        "device_id": d.device_id,
                        "vendor_name": vendor_name,
                        "device_name": device_name,
                    })
                })
                .collect();
            if !enriched.is_empty() {
                put(info, "identified_devices", enriched);
            }
        }
    }

    fn detailed(&self, info: &mut Attrs) {
        let lspci = self.system.run_command(&["lspci", "-vvv"]);
        if lspci.success {
            put(info, "detailed_devices", parse_lspci_verbose(&lspci.stdout));
        } else {
            probe_error(info, "lspci_detailed", lspci.reason());
        }
    }

    fn compatibility(&self, info: &mut Attrs) {
        let mut issues = Vec::new();

        if let Some(version) = self.kernel_version() {
            put(info, "kernel_version", version);
        }

        let lspci = self.system.run_command(&["lspci", "-k"]);
        if !lspci.success {
            if !issues.is_empty() {
                put(info, "compatibility_issues", issues);
            }
            return;
        }
        let raw = &lspci.stdout;

        for device in devices_without_driver(raw) {
            issues.push(json!({
                "type": "missing_driver",
                "device": format!("{} {}", device.slot, device.description),
                "recommendation": "Install appropriate driver for this device",
            }));
        }

        // Optimus: NVIDIA + Intel with more than one VGA controller.
        if raw.contains("NVIDIA") && raw.contains("Intel") {
            let vga_count = raw.matches("VGA compatible controller").count();
            if vga_count > 1 {
                issues.push(json!({
                    "type": "optimus_system",
                    "description": "Multiple GPUs detected (possibly Optimus)",
                    "recommendation": "Consider installing nvidia-prime or bumblebee for GPU switching",
                }));
            }
        }

        // Broadcom wireless without the wl/b43 driver bound.
        if raw.contains("Broadcom")
            && raw.contains("Network controller")
            && !raw.contains("wl")
            && !raw.contains("b43")
        {
            issues.push(json!({
                "type": "broadcom_wireless",
                "description": "Broadcom wireless card without proper driver",
                "recommendation": "Install broadcom-wl or b43 driver",
            }));
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
