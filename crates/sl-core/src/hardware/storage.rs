//! Storage analyzer: block-device tree, filesystems, per-disk identity,
//! SMART health, performance metrics, and optimization findings.

use serde_json::json;
use sl_common::Attrs;

use crate::collect::{
    parse_df, parse_e4defrag_score, parse_hdparm, parse_iostat, parse_lsblk_json,
    parse_mount_lines, parse_smart_attributes, parse_smart_health, parse_smart_identity,
    parse_tune2fs, parse_udevadm, MountEntry, SmartHealth,
};
use crate::system::SystemInterface;

use super::{probe_error, put};

/// Filesystem use% above which a high-usage finding is emitted.
const FS_USAGE_HIGH_PERCENT: u8 = 80;

/// e4defrag score above which the filesystem counts as fragmented.
const FRAGMENTATION_SCORE_THRESHOLD: u32 = 30;

pub struct StorageAnalyzer<'a> {
    system: &'a dyn SystemInterface,
}

impl<'a> StorageAnalyzer<'a> {
    pub fn new(system: &'a dyn SystemInterface) -> Self {
        StorageAnalyzer { system }
    }

    pub fn analyze(&self) -> Attrs {
        let mut info = Attrs::new();
        self.basic_info(&mut info);
        self.disk_details(&mut info);
        self.filesystem_info(&mut info);
        self.performance_metrics(&mut info);
        self.health_info(&mut info);
        self.optimization(&mut info);
        info
    }

    fn basic_info(&self, info: &mut Attrs) {
        let lsblk = self.system.run_command(&[
            "lsblk",
            "-J",
            "-o",
            "NAME,SIZE,TYPE,MOUNTPOINT,FSTYPE,MODEL,SERIAL,VENDOR,ROTA,TRAN",
        ]);
        if lsblk.success {
            match parse_lsblk_json(&lsblk.stdout) {
                Ok(tree) => put(info, "lsblk", &tree),
                Err(_) => probe_error(info, "lsblk", "Failed to parse lsblk JSON output"),
            }
        } else {
            probe_error(info, "lsblk", lsblk.reason());
        }

        let df = self.system.run_command(&["df", "-h"]);
        if df.success {
            put(info, "filesystems", parse_df(&df.stdout, false));
        } else {
            probe_error(info, "df", df.reason());
        }
    }

    fn disk_names(&self) -> Vec<String> {
        let lsblk = self.system.run_command(&["lsblk", "-d", "-n", "-o", "NAME"]);
        if !lsblk.success {
            return Vec::new();
        }
        lsblk
            .stdout
            .lines()
            .map(str::trim)
            .filter(|name| !name.is_empty() && !name.starts_with("loop") && !name.starts_with("ram"))
            .map(str::to_string)
            .collect()
    }

    fn disk_details(&self, info: &mut Attrs) {
        let mut disks = Vec::new();
        for name in self.disk_names() {
            let device = format!("/dev/{name}");
            let mut disk = Attrs::new();
            disk.insert("name".into(), json!(name));

            let hdparm = self.system.run_command(&["hdparm", "-i", &device]);
            if hdparm.success && !hdparm.stderr.contains("bad/missing sense data") {
                for (key, value) in parse_hdparm(&hdparm.stdout) {
                    disk.insert(key, json!(value));
                }
            }

            let smart = self.system.run_command(&["smartctl", "-i", &device]);
            if smart.success {
                let identity = parse_smart_identity(&smart.stdout);
                if let Ok(v) = serde_json::to_value(&identity) {
                    if let serde_json::Value::Object(map) = v {
                        for (key, value) in map {
                            if !value.is_null() {
                                disk.insert(key, value);
                            }
                        }
                    }
                }
            }

            let udevadm =
                self.system
                    .run_command(&["udevadm", "info", "--query=property", &device]);
            if udevadm.success {
                for (key, value) in parse_udevadm(&udevadm.stdout) {
                    disk.insert(key, json!(value));
                }
            }

            // sysfs rotational flag trumps the smartctl-derived hint.
            if let Some(rotational) = self
                .system
                .read_file(&format!("/sys/block/{name}/queue/rotational"))
            {
                disk.insert("is_ssd".into(), json!(rotational.trim() == "0"));
            }

            disks.push(disk);
        }
        if !disks.is_empty() {
            put(info, "disk_count", disks.len());
            put(info, "disks", disks);
        }
    }

    fn filesystem_info(&self, info: &mut Attrs) {
        let mount = self.system.run_command(&["mount"]);
        if mount.success {
            let mounts = parse_mount_lines(&mount.stdout);
            if !mounts.is_empty() {
                put(info, "filesystem_count", mounts.len());
                put(info, "mounted_filesystems", &mounts);
            }
        }

        let df = self.system.run_command(&["df", "-T"]);
        if df.success {
            put(info, "filesystem_usage", parse_df(&df.stdout, true));
        }
    }

    fn performance_metrics(&self, info: &mut Attrs) {
        let iostat = self.system.run_command(&["iostat", "-x", "-d"]);
        if iostat.success {
            let rows = parse_iostat(&iostat.stdout);
            if !rows.is_empty() {
                put(info, "io_stats", rows);
            }
        }

        let mounts = self.mounts();
        if let Some(ext4) = mounts.iter().find(|m| m.fstype == "ext4") {
            let tune2fs = self.system.run_command(&["tune2fs", "-l", &ext4.device]);
            if tune2fs.success {
                put(info, "ext4_metrics", parse_tune2fs(&tune2fs.stdout));
            }
        }
        if mounts.iter().any(|m| m.fstype == "xfs") {
            let xfs = self.system.run_command(&["xfs_info", "/"]);
            if xfs.success {
                put(info, "xfs_metrics", json!({ "xfs_info": xfs.stdout }));
            }
        }
        if mounts.iter().any(|m| m.fstype == "btrfs") {
            let btrfs = self
                .system
                .run_command(&["btrfs", "filesystem", "usage", "/"]);
            if btrfs.success {
                put(info, "btrfs_metrics", json!({ "btrfs_usage": btrfs.stdout }));
            }
        }
    }

    fn health_info(&self, info: &mut Attrs) {
        let mut health = Vec::new();
        for name in self.disk_names() {
            let device = format!("/dev/{name}");
            let smart = self.system.run_command(&["smartctl", "-H", &device]);
            if !smart.success {
                continue;
            }
            let status = parse_smart_health(&smart.stdout);
            let attrs_result = self.system.run_command(&["smartctl", "-A", &device]);
            let attributes = if attrs_result.success {
                parse_smart_attributes(&attrs_result.stdout)
            } else {
                Vec::new()
            };
            health.push(json!({
                "disk": name,
                "health_status": status,
                "smart_attributes": attributes,
            }));
        }
        if !health.is_empty() {
            put(info, "health_info", health);
        }
    }

    fn optimization(&self, info: &mut Attrs) {
        let mut recommendations = Vec::new();

        let df = self.system.run_command(&["df", "-h"]);
        if df.success {
            for fs in parse_df(&df.stdout, false) {
                if fs.use_percent > FS_USAGE_HIGH_PERCENT {
                    recommendations.push(json!({
                        "type": "capacity",
                        "issue": format!(
                            "High usage on {}: {}%",
                            fs.mountpoint, fs.use_percent
                        ),
                        "recommendation": "Consider freeing up space or expanding the filesystem",
                        "severity": if fs.use_percent > 90 { "high" } else { "medium" },
                    }));
                }
            }
        }

        let mounts = self.mounts();
        if mounts.iter().any(|m| m.fstype == "ext4") {
            let e4defrag = self.system.run_command(&["e4defrag", "-c", "/"]);
            if e4defrag.success {
                let score = parse_e4defrag_score(&e4defrag.stdout);
                if score > FRAGMENTATION_SCORE_THRESHOLD {
                    recommendations.push(json!({
                        "type": "performance",
                        "issue": "Fragmentation detected on ext4 filesystem",
                        "recommendation": "Consider defragmenting the ext4 filesystem",
                        "command": "sudo e4defrag /",
                        "severity": "medium",
                    }));
                }
            }
        }

        for mount in &mounts {
            if mount.fstype != "ext4" && mount.fstype != "xfs" {
                continue;
            }
            let has = |option: &str| mount.options.iter().any(|o| o == option);
            if !has("noatime") && !has("relatime") {
                recommendations.push(json!({
                    "type": "performance",
                    "issue": format!("Suboptimal mount options for {}", mount.mountpoint),
                    "recommendation": "Consider adding noatime option",
                    "command": format!("sudo mount -o remount,noatime {}", mount.mountpoint),
                    "severity": "low",
                }));
            }
            if self.is_ssd(&mount.device) && !has("discard") {
                recommendations.push(json!({
                    "type": "performance",
                    "issue": format!("Suboptimal mount options for {}", mount.mountpoint),
                    "recommendation": "Consider adding discard option",
                    "command": format!("sudo mount -o remount,discard {}", mount.mountpoint),
                    "severity": "low",
                }));
            }
        }

        for name in self.disk_names() {
            let device = format!("/dev/{name}");
            let smart = self.system.run_command(&["smartctl", "-H", &device]);
            if smart.success && parse_smart_health(&smart.stdout) == SmartHealth::Failed {
                recommendations.push(json!({
                    "type": "reliability",
                    "issue": format!("Disk {name} is failing"),
                    "recommendation": "Replace the disk as soon as possible",
                    "severity": "critical",
                }));
            }
        }

        put(info, "optimization_recommendations", recommendations);
    }

    fn mounts(&self) -> Vec<MountEntry> {
        let mount = self.system.run_command(&["mount"]);
        if mount.success {
            parse_mount_lines(&mount.stdout)
        } else {
            Vec::new()
        }
    }

    /// SSD check via the sysfs rotational flag of the base device.
    fn is_ssd(&self, device: &str) -> bool {
        let base = device.rsplit('/').next().unwrap_or(device);
        if !base.starts_with("sd") && !base.starts_with("nvme") {
            return false;
        }
        let base: String = if base.starts_with("nvme") {
            // nvme0n1p2 -> nvme0n1
            match base.find('p') {
                Some(idx) if idx > 4 => base[..idx].to_string(),
                _ => base.to_string(),
            }
        } else {
            base.trim_end_matches(|c: char| c.is_ascii_digit()).to_string()
        };
        self.system
            .read_file(&format!("/sys/block/{base}/queue/rotational"))
            .is_some_and(|r| r.trim() == "0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::MockSystem;

    const DF_H: &str = "\
Filesystem      Size  Used Avail Use% Mounted on
/dev/sda2       234G  222G   12G  95% /
/dev/sda1       511M  5.3M  506M   2% /boot/efi
";

    const MOUNT: &str = "\
/dev/sda2 on / type ext4 (rw,errors=remount-ro)
/dev/sda1 on /boot/efi type vfat (rw,relatime)
";

    #[test]
    fn test_high_usage_and_mount_option_findings() {
        let sys = MockSystem::new()
            .with_command("df -h", DF_H)
            .with_command("mount", MOUNT)
            .with_command("lsblk -d -n -o NAME", "sda\nloop0\n")
            .with_file("/sys/block/sda/queue/rotational", "0");
        let info = StorageAnalyzer::new(&sys).analyze();
        let recs = info["optimization_recommendations"].as_array().unwrap();

        let usage = recs
            .iter()
            .find(|r| r["issue"].as_str().unwrap().starts_with("High usage on /:"))
            .unwrap();
        assert_eq!(usage["severity"], "high");

        // / is ext4 without noatime/relatime and on an SSD without discard.
        let missing: Vec<&str> = recs
            .iter()
            .filter(|r| r["issue"].as_str().unwrap().contains("Suboptimal"))
            .map(|r| r["recommendation"].as_str().unwrap())
            .collect();
        assert!(missing.iter().any(|m| m.contains("noatime")));
        assert!(missing.iter().any(|m| m.contains("discard")));
    }

    #[test]
    fn test_failing_disk_finding() {
        let sys = MockSystem::new()
            .with_command("lsblk -d -n -o NAME", "sda\n")
            .with_command(
                "smartctl -H /dev/sda",
                "SMART overall-health self-assessment test result: FAILED!",
            )
            .with_command("smartctl -A /dev/sda", "");
        let info = StorageAnalyzer::new(&sys).analyze();
        let recs = info["optimization_recommendations"].as_array().unwrap();
        assert!(recs.iter().any(|r| r["severity"] == "critical"));
        let health = info["health_info"].as_array().unwrap();
        assert_eq!(health[0]["health_status"], "FAILED");
    }

    #[test]
    fn test_disk_details_mark_ssd_from_sysfs() {
        let sys = MockSystem::new()
            .with_command("lsblk -d -n -o NAME", "nvme0n1\n")
            .with_file("/sys/block/nvme0n1/queue/rotational", "0");
        let info = StorageAnalyzer::new(&sys).analyze();
        let disks = info["disks"].as_array().unwrap();
        assert_eq!(disks[0]["name"], "nvme0n1");
        assert_eq!(disks[0]["is_ssd"], true);
    }

    #[test]
    fn test_lsblk_failure_degrades() {
        let sys = MockSystem::new();
        let info = StorageAnalyzer::new(&sys).analyze();
        assert!(info.contains_key("lsblk_error"));
        assert!(info.contains_key("df_error"));
    }

    #[test]
    fn test_loop_and_ram_devices_skipped() {
        let sys = MockSystem::new().with_command("lsblk -d -n -o NAME", "loop0\nram0\nsda\n");
        let analyzer = StorageAnalyzer::new(&sys);
        assert_eq!(analyzer.disk_names(), vec!["sda"]);
    }
}
