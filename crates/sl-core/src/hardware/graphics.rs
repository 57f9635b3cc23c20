//! Graphics analyzer: GPU detection across vendors, driver state,
//! displays, and session type.

use serde_json::json;
use sl_common::Attrs;

use crate::collect::{
    parse_lspci_nn, parse_modinfo, parse_nvidia_smi_metrics, parse_nvidia_smi_query, parse_xrandr,
};
use crate::system::SystemInterface;

use super::{probe_error, put};

/// PCI vendor ids in sysfs form.
const AMD_VENDOR: &str = "0x1002";
const INTEL_VENDOR: &str = "0x8086";

pub struct GraphicsAnalyzer<'a> {
    system: &'a dyn SystemInterface,
}

impl<'a> GraphicsAnalyzer<'a> {
    pub fn new(system: &'a dyn SystemInterface) -> Self {
        GraphicsAnalyzer { system }
    }

    pub fn analyze(&self) -> Attrs {
        let mut info = Attrs::new();
        self.gpu_enumeration(&mut info);
        self.vendor_details(&mut info);
        self.loaded_drivers(&mut info);
        self.display_info(&mut info);
        self.performance_metrics(&mut info);
        info
    }

    /// Enumerate VGA (class 0300) and 3D controllers (class 0302) and tag
    /// each with a vendor from its description.
    fn gpu_enumeration(&self, info: &mut Attrs) {
        let vga = self
            .system
            .run_command(&["lspci", "-nn", "-v", "-d", "::0300"]);
        let mut gpus = Vec::new();
        if vga.success {
            gpus.extend(gpu_records(&vga.stdout));
        } else {
            probe_error(info, "lspci_vga", vga.reason());
        }

        let three_d = self
            .system
            .run_command(&["lspci", "-nn", "-v", "-d", "::0302"]);
        if three_d.success && !three_d.stdout.trim().is_empty() {
            gpus.extend(gpu_records(&three_d.stdout));
        }

        if !gpus.is_empty() {
            put(info, "gpus", gpus);
        }
    }

    fn vendor_details(&self, info: &mut Attrs) {
        let nvidia = self.nvidia_gpus();
        if !nvidia.is_empty() {
            put(info, "nvidia_gpus", nvidia);
        }
        let amd = self.drm_gpus(AMD_VENDOR, "AMD");
        if !amd.is_empty() {
            put(info, "amd_gpus", amd);
        }
        let intel = self.drm_gpus(INTEL_VENDOR, "Intel");
        if !intel.is_empty() {
            put(info, "intel_gpus", intel);
        }
    }

    fn nvidia_gpus(&self) -> Vec<serde_json::Value> {
        let smi = self.system.run_command(&["nvidia-smi", "-q"]);
        if !smi.success {
            return Vec::new();
        }
        parse_nvidia_smi_query(&smi.stdout)
            .into_iter()
            .map(|mut gpu| {
                gpu.insert("vendor".into(), "NVIDIA".into());
                json!(gpu)
            })
            .collect()
    }

    /// Enumerate /sys/class/drm cards matching one PCI vendor.
    fn drm_gpus(&self, vendor_id: &str, vendor_name: &str) -> Vec<serde_json::Value> {
        let ls = self.system.run_command(&["ls", "/sys/class/drm/"]);
        if !ls.success {
            return Vec::new();
        }
        let mut gpus = Vec::new();
        for card in ls.stdout.split_whitespace() {
            if !card.starts_with("card") || card.contains('-') {
                continue;
            }
            let base = format!("/sys/class/drm/{card}/device");
            let vendor = self.system.read_file(&format!("{base}/vendor"));
            if vendor.as_deref().map(str::trim) != Some(vendor_id) {
                continue;
            }
            let mut gpu = Attrs::new();
            gpu.insert("vendor".into(), json!(vendor_name));
            gpu.insert("card".into(), json!(card));
            if let Some(device_id) = self.system.read_file(&format!("{base}/device")) {
                gpu.insert("device_id".into(), json!(device_id.trim()));
            }
            if let Some(uevent) = self.system.read_file(&format!("{base}/uevent")) {
                if let Some(driver) = uevent.lines().find_map(|l| l.strip_prefix("DRIVER=")) {
                    gpu.insert("driver".into(), json!(driver.trim()));
                }
            }
            if let Some(vram) = self
                .system
                .read_file(&format!("{base}/mem_info_vram_total"))
                .and_then(|v| v.trim().parse::<u64>().ok())
            {
                gpu.insert("memory_total_mb".into(), json!(vram / (1024 * 1024)));
            }
            gpus.push(json!(gpu));
        }
        gpus
    }

    fn loaded_drivers(&self, info: &mut Attrs) {
        let lsmod = self.system.run_command(&["lsmod"]);
        if !lsmod.success {
            return;
        }
        let mut drivers = Vec::new();
        for module in ["nvidia", "amdgpu", "i915", "nouveau"] {
            let loaded = lsmod
                .stdout
                .lines()
                .any(|l| l.split_whitespace().next() == Some(module));
            if !loaded {
                continue;
            }
            let mut entry = Attrs::new();
            entry.insert("name".into(), json!(module));
            let modinfo = self.system.run_command(&["modinfo", module]);
            if modinfo.success {
                let details = parse_modinfo(&modinfo.stdout);
                if let Some(version) = details.version {
                    entry.insert("version".into(), json!(version));
                }
                if let Some(description) = details.description {
                    entry.insert("description".into(), json!(description));
                }
                if let Some(license) = details.license {
                    entry.insert("license".into(), json!(license));
                }
                if !details.firmware.is_empty() {
                    entry.insert("firmware_files".into(), json!(details.firmware));
                }
            }
            drivers.push(entry);
        }
        if !drivers.is_empty() {
            put(info, "graphics_drivers", drivers);
        }
    }

    fn display_info(&self, info: &mut Attrs) {
        let xrandr = self.system.run_command(&["xrandr", "--verbose"]);
        if xrandr.success {
            let displays = parse_xrandr(&xrandr.stdout);
            if !displays.is_empty() {
                put(info, "displays", displays);
            }
        }
        put(info, "wayland_session", self.is_wayland_session());
    }

    /// Wayland detection: session type from the environment (queried via a
    /// subprocess so the mock can seed it), falling back to a process scan.
    fn is_wayland_session(&self) -> bool {
        let session = self.system.run_command(&["printenv", "XDG_SESSION_TYPE"]);
        if session.success && session.stdout.trim().eq_ignore_ascii_case("wayland") {
            return true;
        }
        let ps = self.system.run_command(&["ps", "aux"]);
        ps.success && {
            let lower = ps.stdout.to_lowercase();
            lower.contains("wayland") || lower.contains("weston")
        }
    }

    fn performance_metrics(&self, info: &mut Attrs) {
        let smi = self.system.run_command(&[
            "nvidia-smi",
            "--query-gpu=utilization.gpu,utilization.memory,temperature.gpu,power.draw,clocks.current.graphics,clocks.current.memory",
            "--format=csv,noheader",
        ]);
        if smi.success {
            if let Some(metrics) = parse_nvidia_smi_metrics(&smi.stdout) {
                put(info, "nvidia_metrics", metrics);
            }
        }

        // Intel frequency state lives per-card in sysfs.
        let ls = self.system.run_command(&["ls", "/sys/class/drm/"]);
        if ls.success {
            for card in ls.stdout.split_whitespace() {
                if !card.starts_with("card") || card.contains('-') {
                    continue;
                }
                let base = format!("/sys/class/drm/{card}");
                let vendor = self.system.read_file(&format!("{base}/device/vendor"));
                if vendor.as_deref().map(str::trim) != Some(INTEL_VENDOR) {
                    continue;
                }
                let mut metrics = Attrs::new();
                for (file, key) in [
                    ("gt_cur_freq_mhz", "current_frequency"),
                    ("gt_min_freq_mhz", "min_frequency"),
                    ("gt_max_freq_mhz", "max_frequency"),
                ] {
                    if let Some(freq) = self.system.read_file(&format!("{base}/{file}")) {
                        metrics.insert(key.into(), json!(format!("{} MHz", freq.trim())));
                    }
                }
                if !metrics.is_empty() {
                    put(info, "intel_metrics", metrics);
                }
                break;
            }
        }
    }
}

/// Build vendor-tagged GPU records from lspci class-filtered output.
fn gpu_records(raw: &str) -> Vec<serde_json::Value> {
    parse_lspci_nn(raw)
        .into_iter()
        .map(|device| {
            let vendor = if device.description.contains("NVIDIA") {
                "NVIDIA"
            } else if device.description.contains("AMD") || device.description.contains("ATI") {
                "AMD"
            } else if device.description.contains("Intel") {
                "Intel"
            } else {
                "Unknown"
            };
            json!({
                "address": device.slot,
                "description": device.description,
                "vendor_id": device.vendor_id,
                "device_id": device.device_id,
                "vendor": vendor,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::MockSystem;

    #[test]
    fn test_gpu_enumeration_merges_vga_and_3d() {
        let sys = MockSystem::new()
            .with_command(
                "lspci -nn -v -d ::0300",
                "00:02.0 VGA compatible controller [0300]: Intel Corporation UHD Graphics 630 [8086:3e92]\n",
            )
            .with_command(
                "lspci -nn -v -d ::0302",
                "01:00.0 3D controller [0302]: NVIDIA Corporation GP107M [10de:1c8c]\n",
            );
        let info = GraphicsAnalyzer::new(&sys).analyze();
        let gpus = info["gpus"].as_array().unwrap();
        assert_eq!(gpus.len(), 2);
        assert_eq!(gpus[0]["vendor"], "Intel");
        assert_eq!(gpus[1]["vendor"], "NVIDIA");
    }

    #[test]
    fn test_amd_gpu_from_sysfs() {
        let sys = MockSystem::new()
            .with_command("ls /sys/class/drm/", "card0 card0-DP-1 renderD128\n")
            .with_file("/sys/class/drm/card0/device/vendor", "0x1002")
            .with_file("/sys/class/drm/card0/device/device", "0x731f")
            .with_file("/sys/class/drm/card0/device/uevent", "DRIVER=amdgpu\nPCI_CLASS=30000\n")
            .with_file(
                "/sys/class/drm/card0/device/mem_info_vram_total",
                "8589934592",
            );
        let info = GraphicsAnalyzer::new(&sys).analyze();
        let amd = info["amd_gpus"].as_array().unwrap();
        assert_eq!(amd[0]["vendor"], "AMD");
        assert_eq!(amd[0]["driver"], "amdgpu");
        assert_eq!(amd[0]["memory_total_mb"], 8192);
    }

    #[test]
    fn test_wayland_detection_from_env() {
        let sys = MockSystem::new().with_command("printenv XDG_SESSION_TYPE", "wayland\n");
        let info = GraphicsAnalyzer::new(&sys).analyze();
        assert_eq!(info["wayland_session"], true);
    }

    #[test]
    fn test_wayland_detection_from_process_scan() {
        let sys = MockSystem::new()
            .with_command("printenv XDG_SESSION_TYPE", "x11\n")
            .with_command("ps aux", "user 1234 0.0 weston --backend=drm\n");
        let info = GraphicsAnalyzer::new(&sys).analyze();
        assert_eq!(info["wayland_session"], true);
    }

    #[test]
    fn test_loaded_driver_detection() {
        let sys = MockSystem::new()
            .with_command("lsmod", "Module                  Size  Used by\ni915             3000000  50\nsnd_hda_intel     57344  3\n")
            .with_command("modinfo i915", "license: GPL and additional rights\ndescription: Intel Graphics\n");
        let info = GraphicsAnalyzer::new(&sys).analyze();
        let drivers = info["graphics_drivers"].as_array().unwrap();
        assert_eq!(drivers.len(), 1);
        assert_eq!(drivers[0]["name"], "i915");
        assert_eq!(drivers[0]["description"], "Intel Graphics");
    }

    #[test]
    fn test_lspci_failure_degrades() {
        let sys = MockSystem::new();
        let info = GraphicsAnalyzer::new(&sys).analyze();
        assert!(info.contains_key("lspci_vga_error"));
        assert!(!info.contains_key("gpus"));
    }
}
