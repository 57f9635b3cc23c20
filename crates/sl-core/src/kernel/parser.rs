//! Kernel configuration discovery and parsing.
//!
//! Sources tried in order: /proc/config.gz (via zcat), the running
//! kernel's /boot/config-<version>, the newest /boot/config-* file, and
//! /usr/src/linux/.config. Modprobe directives from /etc/modprobe.d are
//! merged in as MODPROBE_* pseudo-options.

use sl_common::KernelConfig;
use tracing::debug;

use crate::collect::{parse_config_content, parse_modprobe_conf};
use crate::system::SystemInterface;

pub struct KernelConfigParser<'a> {
    system: &'a dyn SystemInterface,
}

impl<'a> KernelConfigParser<'a> {
    pub fn new(system: &'a dyn SystemInterface) -> Self {
        KernelConfigParser { system }
    }

    /// Parse the kernel configuration from the first available source.
    /// Returns `None` when neither a config source nor the kernel version
    /// can be found.
    pub fn parse(&self) -> Option<KernelConfig> {
        let version = self.kernel_version()?;
        let content = self.config_content(&version)?;

        let mut options = parse_config_content(&content);
        for (name, option) in self.modprobe_options() {
            options.insert(name, option);
        }

        Some(KernelConfig {
            version,
            options,
            analysis: Default::default(),
            recommendations: Default::default(),
        })
    }

    fn kernel_version(&self) -> Option<String> {
        let uname = self.system.run_command(&["uname", "-r"]);
        uname.success.then(|| uname.stdout.trim().to_string())
    }

    fn config_content(&self, version: &str) -> Option<String> {
        if self.system.file_exists("/proc/config.gz") {
            let zcat = self.system.run_command(&["zcat", "/proc/config.gz"]);
            if zcat.success {
                return Some(zcat.stdout);
            }
            debug!(reason = %zcat.reason(), "zcat /proc/config.gz failed");
        }

        let boot_config = format!("/boot/config-{version}");
        if self.system.file_exists(&boot_config) {
            if let Some(content) = self.system.read_file(&boot_config) {
                return Some(content);
            }
        }

        // Fall back to the newest config file in /boot.
        let ls = self.system.run_command(&["ls", "/boot"]);
        if ls.success {
            let mut configs: Vec<&str> = ls
                .stdout
                .split_whitespace()
                .filter(|name| name.starts_with("config-"))
                .collect();
            configs.sort_unstable();
            if let Some(newest) = configs.last() {
                if let Some(content) = self.system.read_file(&format!("/boot/{newest}")) {
                    return Some(content);
                }
            }
        }

        self.system.read_file("/usr/src/linux/.config")
    }

    fn modprobe_options(
        &self,
    ) -> std::collections::BTreeMap<String, sl_common::KernelConfigOption> {
        let mut options = std::collections::BTreeMap::new();
        if !self.system.file_exists("/etc/modprobe.d") {
            return options;
        }
        let ls = self.system.run_command(&["ls", "/etc/modprobe.d"]);
        if !ls.success {
            return options;
        }
        for name in ls.stdout.split_whitespace() {
            if !name.ends_with(".conf") {
                continue;
            }
            if let Some(content) = self.system.read_file(&format!("/etc/modprobe.d/{name}")) {
                options.extend(parse_modprobe_conf(&content));
            }
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::MockSystem;

    #[test]
    fn test_parse_from_proc_config_gz() {
        let sys = MockSystem::new()
            .with_command("uname -r", "6.8.0-45-generic\n")
            .with_existing_path("/proc/config.gz")
            .with_command("zcat /proc/config.gz", "CONFIG_SECURITY=y\nCONFIG_HZ=250\n");
        let config = KernelConfigParser::new(&sys).parse().unwrap();
        assert_eq!(config.version, "6.8.0-45-generic");
        assert_eq!(config.options["CONFIG_SECURITY"].value, "y");
        assert_eq!(config.options["CONFIG_HZ"].value, "250");
    }

    #[test]
    fn test_parse_from_boot_config() {
        let sys = MockSystem::new()
            .with_command("uname -r", "6.8.0-45-generic\n")
            .with_file("/boot/config-6.8.0-45-generic", "CONFIG_SMP=y\n");
        let config = KernelConfigParser::new(&sys).parse().unwrap();
        assert_eq!(config.options["CONFIG_SMP"].value, "y");
    }

    #[test]
    fn test_fallback_to_newest_boot_config() {
        let sys = MockSystem::new()
            .with_command("uname -r", "6.9.0-custom\n")
            .with_command("ls /boot", "config-6.8.0-40-generic config-6.8.0-45-generic vmlinuz\n")
            .with_file("/boot/config-6.8.0-45-generic", "CONFIG_PREEMPT=y\n");
        let config = KernelConfigParser::new(&sys).parse().unwrap();
        assert_eq!(config.options["CONFIG_PREEMPT"].value, "y");
    }

    #[test]
    fn test_modprobe_options_merged() {
        let sys = MockSystem::new()
            .with_command("uname -r", "6.8.0\n")
            .with_file("/boot/config-6.8.0", "CONFIG_SMP=y\n")
            .with_existing_path("/etc/modprobe.d")
            .with_command("ls /etc/modprobe.d", "blacklist.conf README\n")
            .with_file("/etc/modprobe.d/blacklist.conf", "blacklist nouveau\n");
        let config = KernelConfigParser::new(&sys).parse().unwrap();
        assert_eq!(config.options["MODPROBE_BLACKLIST_NOUVEAU"].value, "y");
    }

    #[test]
    fn test_no_sources_yields_none() {
        let sys = MockSystem::new().with_command("uname -r", "6.8.0\n");
        assert!(KernelConfigParser::new(&sys).parse().is_none());
        let sys = MockSystem::new();
        assert!(KernelConfigParser::new(&sys).parse().is_none());
    }
}
