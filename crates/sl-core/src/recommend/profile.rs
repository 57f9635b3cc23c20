//! Hardware profile derivation.
//!
//! Classifies a [`HardwareInfo`] into the six-field categorical profile
//! the rule overlays key on. Missing attributes fall back to the default
//! profile field rather than failing.

use sl_common::{
    Attrs, CpuCoreClass, GraphicsClass, HardwareInfo, HardwareProfile, MemoryClass, NetworkClass,
    StorageClass, SystemClass,
};

/// Derive the categorical profile from normalized hardware attributes.
pub fn derive_profile(hardware: &HardwareInfo) -> HardwareProfile {
    HardwareProfile {
        system_type: system_type(&hardware.cpu),
        cpu_cores: cpu_cores(&hardware.cpu),
        memory_size: memory_size(&hardware.memory),
        storage_type: storage_type(&hardware.storage),
        network_type: network_type(&hardware.network),
        graphics_type: graphics_type(&hardware.graphics),
    }
}

fn system_type(cpu: &Attrs) -> SystemClass {
    let model = cpu
        .get("model_name")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_lowercase();
    if model.contains("server") {
        SystemClass::Server
    } else if model.contains("mobile") {
        SystemClass::Laptop
    } else {
        SystemClass::Desktop
    }
}

fn cpu_cores(cpu: &Attrs) -> CpuCoreClass {
    let count = cpu
        .get("logical_cpus")
        .or_else(|| cpu.get("cores"))
        .and_then(|v| v.as_u64())
        .unwrap_or(4);
    match count {
        0 | 1 => CpuCoreClass::Single,
        2..=4 => CpuCoreClass::Few,
        5..=16 => CpuCoreClass::Multi,
        _ => CpuCoreClass::Many,
    }
}

fn memory_size(memory: &Attrs) -> MemoryClass {
    let gb = memory
        .get("memory_total_gb")
        .or_else(|| memory.get("total_gb"))
        .and_then(|v| v.as_f64())
        .unwrap_or(8.0);
    if gb < 4.0 {
        MemoryClass::Small
    } else if gb <= 16.0 {
        MemoryClass::Medium
    } else if gb <= 64.0 {
        MemoryClass::Large
    } else {
        MemoryClass::VeryLarge
    }
}

fn storage_type(storage: &Attrs) -> StorageClass {
    let disks = storage
        .get("disks")
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    let has_nvme = disks.iter().any(|d| {
        d.get("name")
            .and_then(|n| n.as_str())
            .is_some_and(|n| n.to_lowercase().contains("nvme"))
    });
    if has_nvme {
        return StorageClass::Nvme;
    }
    let has_ssd = disks.iter().any(|d| {
        d.get("is_ssd")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    });
    if has_ssd {
        StorageClass::Ssd
    } else {
        StorageClass::Hdd
    }
}

fn network_type(network: &Attrs) -> NetworkClass {
    let wireless = network
        .get("detailed_interfaces")
        .or_else(|| network.get("interfaces"))
        .and_then(|v| v.as_array())
        .is_some_and(|interfaces| {
            interfaces.iter().any(|i| {
                i.get("type")
                    .and_then(|t| t.as_str())
                    .is_some_and(|t| t == "wireless")
            })
        });
    if wireless {
        NetworkClass::Wireless
    } else {
        NetworkClass::Ethernet
    }
}

fn graphics_type(graphics: &Attrs) -> GraphicsClass {
    let dedicated = graphics
        .get("gpus")
        .and_then(|v| v.as_array())
        .is_some_and(|gpus| {
            gpus.iter().any(|g| {
                g.get("vendor")
                    .and_then(|v| v.as_str())
                    .is_some_and(|v| v == "NVIDIA" || v == "AMD")
            })
        });
    if dedicated {
        GraphicsClass::Dedicated
    } else {
        GraphicsClass::Integrated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: serde_json::Value) -> Attrs {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_default_profile_for_empty_hardware() {
        let profile = derive_profile(&HardwareInfo::default());
        assert_eq!(profile.system_type, SystemClass::Desktop);
        assert_eq!(profile.cpu_cores, CpuCoreClass::Few);
        assert_eq!(profile.memory_size, MemoryClass::Medium);
        assert_eq!(profile.storage_type, StorageClass::Hdd);
        assert_eq!(profile.network_type, NetworkClass::Ethernet);
        assert_eq!(profile.graphics_type, GraphicsClass::Integrated);
    }

    #[test]
    fn test_system_type_from_model_name() {
        let mut hw = HardwareInfo::default();
        hw.cpu = attrs(json!({"model_name": "Intel(R) Xeon(R) Server CPU"}));
        assert_eq!(derive_profile(&hw).system_type, SystemClass::Server);
        hw.cpu = attrs(json!({"model_name": "Intel(R) Core(TM) i7 Mobile CPU"}));
        assert_eq!(derive_profile(&hw).system_type, SystemClass::Laptop);
    }

    #[test]
    fn test_cpu_core_classes() {
        let mut hw = HardwareInfo::default();
        for (count, expected) in [
            (1, CpuCoreClass::Single),
            (4, CpuCoreClass::Few),
            (16, CpuCoreClass::Multi),
            (32, CpuCoreClass::Many),
        ] {
            hw.cpu = attrs(json!({"logical_cpus": count}));
            assert_eq!(derive_profile(&hw).cpu_cores, expected, "count {count}");
        }
    }

    #[test]
    fn test_memory_classes() {
        let mut hw = HardwareInfo::default();
        for (gb, expected) in [
            (2.0, MemoryClass::Small),
            (16.0, MemoryClass::Medium),
            (17.0, MemoryClass::Large),
            (128.0, MemoryClass::VeryLarge),
        ] {
            hw.memory = attrs(json!({"memory_total_gb": gb}));
            assert_eq!(derive_profile(&hw).memory_size, expected, "{gb} GiB");
        }
    }

    #[test]
    fn test_storage_nvme_beats_ssd() {
        let mut hw = HardwareInfo::default();
        hw.storage = attrs(json!({"disks": [
            {"name": "sda", "is_ssd": true},
            {"name": "nvme0n1", "is_ssd": true},
        ]}));
        assert_eq!(derive_profile(&hw).storage_type, StorageClass::Nvme);
        hw.storage = attrs(json!({"disks": [{"name": "sda", "is_ssd": true}]}));
        assert_eq!(derive_profile(&hw).storage_type, StorageClass::Ssd);
    }

    #[test]
    fn test_network_and_graphics_classes() {
        let mut hw = HardwareInfo::default();
        hw.network = attrs(json!({"detailed_interfaces": [
            {"name": "wlp2s0", "type": "wireless"},
        ]}));
        hw.graphics = attrs(json!({"gpus": [{"vendor": "NVIDIA"}]}));
        let profile = derive_profile(&hw);
        assert_eq!(profile.network_type, NetworkClass::Wireless);
        assert_eq!(profile.graphics_type, GraphicsClass::Dedicated);
    }
}
