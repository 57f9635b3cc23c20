//! Probe parser library.
//!
//! Every probe is a (collector, parser) pair: the collector side lives in
//! the analyzers, which name the exact commands and file paths they need
//! through [`crate::system::SystemInterface`]; the parsers here are pure
//! functions from raw text to typed records and perform no I/O.
//!
//! Parser contract: a required field missing from the raw text fails with
//! [`sl_common::Error::ParseError`]; missing optional fields yield `None`.
//! Callers (the analyzers) convert failures into `<probe>_error` sentinel
//! entries rather than aborting the request.

pub mod block;
pub mod display;
pub mod dmi;
pub mod ids;
pub mod kconfig;
pub mod net;
pub mod pci;
pub mod proc;
pub mod usb;

pub use block::{
    parse_df, parse_e4defrag_score, parse_hdparm, parse_iostat, parse_lsblk_json,
    parse_mount_lines, parse_smart_attributes, parse_smart_health, parse_smart_identity,
    parse_tune2fs, parse_udevadm, DfEntry, LsblkDevice, MountEntry, SmartAttribute, SmartHealth,
    SmartIdentity,
};
pub use display::{parse_nvidia_smi_metrics, parse_nvidia_smi_query, parse_xrandr, DisplayInfo};
pub use dmi::{parse_memory_array, parse_memory_devices, parse_numactl, MemoryArray, MemoryDevice};
pub use ids::IdDatabase;
pub use kconfig::{parse_config_content, parse_modprobe_conf};
pub use net::{
    decode_interface_flags, interface_type_name, parse_ethtool_driver, parse_ethtool_stats,
    parse_ip_addr, parse_ip_link_stats, parse_iwconfig, parse_modinfo, IpAddress, IpInterface,
    LinkStats, ModuleInfo, WirelessInterface,
};
pub use pci::{
    devices_without_driver, parse_lspci_mm, parse_lspci_nn, parse_lspci_verbose, PciDevice,
    PciDeviceDetail, PciNumericDevice,
};
pub use proc::{
    parse_buddyinfo, parse_cmdline, parse_cpuinfo, parse_loadavg, parse_lscpu, parse_meminfo,
    parse_memory_pressure, parse_stat_btime, parse_vmstat, BuddyZone, CpuInfo, LoadAvg, LscpuInfo,
    MemoryPressure,
};
pub use usb::{parse_lsusb, parse_lsusb_tree, UsbDevice, UsbTree, UsbTreeNode};
