//! Subsystem hardware analyzers.
//!
//! Each analyzer holds a read-only handle to the system interface, exposes
//! one `analyze()` entry point returning an attribute map, and sequences
//! its probes internally. A probe failure becomes a `<probe>_error` string
//! entry in the map; it never aborts the analyzer, and analyzers never
//! invoke each other. Cross-subsystem reasoning lives in the
//! recommendation engine only.

mod cpu;
mod graphics;
mod memory;
mod network;
mod pci;
mod storage;
mod usb;

pub use cpu::CpuAnalyzer;
pub use graphics::GraphicsAnalyzer;
pub use memory::MemoryAnalyzer;
pub use network::NetworkAnalyzer;
pub use pci::PciAnalyzer;
pub use storage::StorageAnalyzer;
pub use usb::UsbAnalyzer;

use serde::Serialize;
use sl_common::{Attrs, HardwareInfo};

use crate::system::SystemInterface;

/// Insert a serializable value into an attribute map.
pub(crate) fn put<T: Serialize>(attrs: &mut Attrs, key: &str, value: T) {
    if let Ok(v) = serde_json::to_value(value) {
        attrs.insert(key.to_string(), v);
    }
}

/// Record a probe failure as a `<probe>_error` sentinel.
pub(crate) fn probe_error(attrs: &mut Attrs, probe: &str, reason: impl std::fmt::Display) {
    tracing::debug!(probe = probe, reason = %reason, "probe degraded");
    attrs.insert(
        format!("{probe}_error"),
        serde_json::Value::String(reason.to_string()),
    );
}

/// Aggregate analyzer running all seven subsystems.
pub struct DeviceAnalyzer<'a> {
    system: &'a dyn SystemInterface,
}

impl<'a> DeviceAnalyzer<'a> {
    pub fn new(system: &'a dyn SystemInterface) -> Self {
        DeviceAnalyzer { system }
    }

    /// Collect the full hardware picture. Individual subsystem failures
    /// surface inside the per-subsystem maps, never as errors here.
    pub fn all_hardware_info(&self) -> HardwareInfo {
        HardwareInfo {
            cpu: CpuAnalyzer::new(self.system).analyze(),
            memory: MemoryAnalyzer::new(self.system).analyze(),
            storage: StorageAnalyzer::new(self.system).analyze(),
            pci_devices: PciAnalyzer::new(self.system).analyze(),
            usb_devices: UsbAnalyzer::new(self.system).analyze(),
            network: NetworkAnalyzer::new(self.system).analyze(),
            graphics: GraphicsAnalyzer::new(self.system).analyze(),
        }
    }
}
