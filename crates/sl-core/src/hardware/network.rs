//! Network analyzer: interface state, addresses, counters, wireless
//! details, and driver identification.

use serde_json::json;
use sl_common::Attrs;

use crate::collect::{
    decode_interface_flags, interface_type_name, parse_ethtool_driver, parse_ethtool_stats,
    parse_ip_addr, parse_ip_link_stats, parse_iwconfig, parse_modinfo,
};
use crate::system::SystemInterface;

use super::{probe_error, put};

pub struct NetworkAnalyzer<'a> {
    system: &'a dyn SystemInterface,
}

impl<'a> NetworkAnalyzer<'a> {
    pub fn new(system: &'a dyn SystemInterface) -> Self {
        NetworkAnalyzer { system }
    }

    pub fn analyze(&self) -> Attrs {
        let mut info = Attrs::new();
        self.basic_info(&mut info);
        self.detailed_interfaces(&mut info);
        self.wireless_info(&mut info);
        self.driver_info(&mut info);
        self.statistics(&mut info);
        info
    }

    fn basic_info(&self, info: &mut Attrs) {
        let addr = self.system.run_command(&["ip", "-s", "addr"]);
        if addr.success {
            put(info, "interfaces", parse_ip_addr(&addr.stdout));
        } else {
            probe_error(info, "ip_addr", addr.reason());
        }

        let link = self.system.run_command(&["ip", "-s", "link"]);
        if link.success {
            put(info, "interface_statistics", parse_ip_link_stats(&link.stdout));
        } else {
            probe_error(info, "ip_link", link.reason());
        }
    }

    /// Interface names from /sys/class/net, loopback excluded.
    fn interface_names(&self) -> Vec<String> {
        let ls = self.system.run_command(&["ls", "/sys/class/net/"]);
        if !ls.success {
            return Vec::new();
        }
        ls.stdout
            .split_whitespace()
            .filter(|name| *name != "lo")
            .map(str::to_string)
            .collect()
    }

    fn detailed_interfaces(&self, info: &mut Attrs) {
        let mut interfaces = Vec::new();
        for name in self.interface_names() {
            let base = format!("/sys/class/net/{name}");
            let read = |file: &str| self.system.read_file(&format!("{base}/{file}"));

            let mut iface = Attrs::new();
            iface.insert("name".into(), json!(name));

            if let Some(type_number) = read("type") {
                iface.insert("type".into(), json!(interface_type_name(&type_number)));
            }
            if let Some(speed) = read("speed") {
                let speed = speed.trim();
                if speed != "-1" {
                    iface.insert("speed".into(), json!(format!("{speed} Mbps")));
                }
            }
            if let Some(duplex) = read("duplex") {
                iface.insert("duplex".into(), json!(duplex.trim()));
            }
            if let Some(mtu) = read("mtu").and_then(|v| v.trim().parse::<u32>().ok()) {
                iface.insert("mtu".into(), json!(mtu));
            }
            if let Some(carrier) = read("carrier") {
                iface.insert("carrier".into(), json!(carrier.trim() == "1"));
            }
            if let Some(operstate) = read("operstate") {
                let operstate = operstate.trim().to_string();
                iface.insert(
                    "status".into(),
                    json!(match operstate.as_str() {
                        "up" => "UP",
                        "down" => "DOWN",
                        _ => "UNKNOWN",
                    }),
                );
                iface.insert("operstate".into(), json!(operstate));
            }
            if let Some(mac) = read("address") {
                iface.insert("mac".into(), json!(mac.trim()));
            }
            if let Some(flags) = read("flags") {
                let flags = flags.trim().trim_start_matches("0x");
                if let Ok(bits) = u32::from_str_radix(flags, 16) {
                    iface.insert("flags".into(), json!(bits));
                    iface.insert("decoded_flags".into(), json!(decode_interface_flags(bits)));
                }
            }

            let stats_dir = format!("{base}/statistics");
            if self.system.file_exists(&stats_dir) {
                let ls = self.system.run_command(&["ls", &stats_dir]);
                if ls.success {
                    let mut stats = Attrs::new();
                    for stat in ls.stdout.split_whitespace() {
                        if let Some(value) = self
                            .system
                            .read_file(&format!("{stats_dir}/{stat}"))
                            .and_then(|v| v.trim().parse::<u64>().ok())
                        {
                            stats.insert(stat.to_string(), json!(value));
                        }
                    }
                    if !stats.is_empty() {
                        iface.insert("statistics".into(), json!(stats));
                    }
                }
            }

            interfaces.push(iface);
        }
        if !interfaces.is_empty() {
            put(info, "detailed_interfaces", interfaces);
        }
    }

    fn wireless_info(&self, info: &mut Attrs) {
        let iwconfig = self.system.run_command(&["iwconfig"]);
        if iwconfig.success && !iwconfig.stdout.trim().is_empty() {
            let wireless = parse_iwconfig(&iwconfig.stdout);
            if !wireless.is_empty() {
                put(info, "wireless_interfaces", wireless);
            }
        }

        let iw = self.system.run_command(&["iw", "list"]);
        if iw.success && !iw.stdout.trim().is_empty() {
            put(info, "iw_list", iw.stdout);
        }
    }

    fn driver_info(&self, info: &mut Attrs) {
        let mut drivers = Vec::new();
        for name in self.interface_names() {
            let Some(driver) = self.interface_driver(&name) else {
                continue;
            };
            let mut entry = Attrs::new();
            entry.insert("interface".into(), json!(name));
            entry.insert("driver".into(), json!(driver));

            let modinfo = self.system.run_command(&["modinfo", &driver]);
            if modinfo.success {
                let details = parse_modinfo(&modinfo.stdout);
                if let Ok(v) = serde_json::to_value(&details) {
                    entry.insert("driver_details".into(), v);
                }
            }
            drivers.push(entry);
        }
        if !drivers.is_empty() {
            put(info, "driver_info", drivers);
        }
    }

    /// Resolve the interface driver via the sysfs symlink, falling back to
    /// ethtool -i.
    fn interface_driver(&self, name: &str) -> Option<String> {
        let driver_path = format!("/sys/class/net/{name}/device/driver");
        if self.system.file_exists(&driver_path) {
            let link = self.system.run_command(&["readlink", "-f", &driver_path]);
            if link.success {
                if let Some(driver) = link
                    .stdout
                    .trim()
                    .rsplit('/')
                    .next()
                    .filter(|s| !s.is_empty())
                {
                    return Some(driver.to_string());
                }
            }
        }
        let ethtool = self.system.run_command(&["ethtool", "-i", name]);
        if ethtool.success {
            return parse_ethtool_driver(&ethtool.stdout);
        }
        None
    }

    fn statistics(&self, info: &mut Attrs) {
        let mut all_stats = Attrs::new();
        for name in self.interface_names() {
            let ethtool = self.system.run_command(&["ethtool", "-S", &name]);
            if ethtool.success {
                let stats = parse_ethtool_stats(&ethtool.stdout);
                if !stats.is_empty() {
                    put(&mut all_stats, &name, stats);
                }
            }
        }
        if !all_stats.is_empty() {
            put(info, "ethtool_statistics", all_stats);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::MockSystem;

    fn seeded_mock() -> MockSystem {
        MockSystem::new()
            .with_command("ls /sys/class/net/", "enp3s0 lo wlp2s0\n")
            .with_file("/sys/class/net/enp3s0/type", "1")
            .with_file("/sys/class/net/enp3s0/speed", "1000")
            .with_file("/sys/class/net/enp3s0/duplex", "full")
            .with_file("/sys/class/net/enp3s0/mtu", "1500")
            .with_file("/sys/class/net/enp3s0/carrier", "1")
            .with_file("/sys/class/net/enp3s0/operstate", "up")
            .with_file("/sys/class/net/enp3s0/address", "a4:bb:6d:11:22:33")
            .with_file("/sys/class/net/wlp2s0/type", "801")
            .with_file("/sys/class/net/wlp2s0/operstate", "dormant")
    }

    #[test]
    fn test_loopback_skipped() {
        let sys = seeded_mock();
        let analyzer = NetworkAnalyzer::new(&sys);
        assert_eq!(analyzer.interface_names(), vec!["enp3s0", "wlp2s0"]);
    }

    #[test]
    fn test_detailed_interface_attributes() {
        let sys = seeded_mock();
        let info = NetworkAnalyzer::new(&sys).analyze();
        let interfaces = info["detailed_interfaces"].as_array().unwrap();
        let eth = interfaces.iter().find(|i| i["name"] == "enp3s0").unwrap();
        assert_eq!(eth["type"], "ethernet");
        assert_eq!(eth["speed"], "1000 Mbps");
        assert_eq!(eth["status"], "UP");
        assert_eq!(eth["carrier"], true);
        let wifi = interfaces.iter().find(|i| i["name"] == "wlp2s0").unwrap();
        assert_eq!(wifi["type"], "wireless");
        assert_eq!(wifi["status"], "UNKNOWN");
    }

    #[test]
    fn test_driver_via_ethtool_fallback() {
        let sys = MockSystem::new()
            .with_command("ls /sys/class/net/", "enp3s0\n")
            .with_command("ethtool -i enp3s0", "driver: e1000e\nversion: 6.8\n")
            .with_command("modinfo e1000e", "description: Intel(R) PRO/1000 Network Driver\nlicense: GPL\n");
        let info = NetworkAnalyzer::new(&sys).analyze();
        let drivers = info["driver_info"].as_array().unwrap();
        assert_eq!(drivers[0]["driver"], "e1000e");
        assert_eq!(
            drivers[0]["driver_details"]["license"],
            "GPL"
        );
    }

    #[test]
    fn test_ip_failure_degrades() {
        let sys = MockSystem::new();
        let info = NetworkAnalyzer::new(&sys).analyze();
        assert!(info.contains_key("ip_addr_error"));
        assert!(info.contains_key("ip_link_error"));
    }
}
