//! Profile-parametric kernel optimization recommendations.
//!
//! A base rule layer is overlaid by per-profile layers (CPU class, memory
//! class, storage class, network class, graphics class, system type, in
//! that order), then checked against the parsed configuration. Sysctl
//! recommendations are appended from the same profile.

use std::collections::BTreeMap;

use serde_json::json;
use sl_common::{
    Attrs, CpuCoreClass, GraphicsClass, HardwareProfile, KernelConfig, MemoryClass, NetworkClass,
    StorageClass, SystemClass,
};

use super::analysis::value_compliant;

/// One best-practice entry: option, recommended value, and rationale.
struct Practice {
    option: &'static str,
    value: &'static str,
    description: &'static str,
    reason: &'static str,
}

macro_rules! practices {
    ($(($option:expr, $value:expr, $description:expr, $reason:expr)),* $(,)?) => {
        &[$(Practice { option: $option, value: $value, description: $description, reason: $reason }),*]
    };
}

const BASE: &[Practice] = practices![
    ("CONFIG_PREEMPT", "y", "Preemptible Kernel (Low-Latency Desktop)", "Improves system responsiveness for desktop and interactive workloads"),
    ("CONFIG_HZ_1000", "y", "1000 Hz tick rate", "Provides better timer resolution for desktop systems"),
    ("CONFIG_HZ", "1000", "Timer frequency", "Higher timer frequency improves responsiveness"),
];

const CPU_SINGLE: &[Practice] = practices![
    ("CONFIG_SMP", "n", "Symmetric multi-processing support", "Disables unnecessary SMP support for single-core systems"),
    ("CONFIG_NR_CPUS", "1", "Maximum number of CPUs", "Optimizes for single-core systems"),
];

const CPU_FEW: &[Practice] = practices![
    ("CONFIG_SMP", "y", "Symmetric multi-processing support", "Enables SMP support for multi-core systems"),
    ("CONFIG_NR_CPUS", "4", "Maximum number of CPUs", "Optimizes for systems with few cores"),
];

const CPU_MULTI: &[Practice] = practices![
    ("CONFIG_SMP", "y", "Symmetric multi-processing support", "Enables SMP support for multi-core systems"),
    ("CONFIG_NR_CPUS", "16", "Maximum number of CPUs", "Optimizes for systems with multiple cores"),
];

const CPU_MANY: &[Practice] = practices![
    ("CONFIG_SMP", "y", "Symmetric multi-processing support", "Enables SMP support for multi-core systems"),
    ("CONFIG_NR_CPUS", "64", "Maximum number of CPUs", "Optimizes for systems with many cores"),
    ("CONFIG_NUMA", "y", "NUMA support", "Enables NUMA support for systems with many cores"),
];

const MEMORY_SMALL: &[Practice] = practices![
    ("CONFIG_CLEANCACHE", "y", "Enable cleancache driver to cache clean pages", "Improves memory efficiency for systems with limited memory"),
    ("CONFIG_FRONTSWAP", "y", "Enable frontswap to cache swap pages", "Improves swap performance for systems with limited memory"),
    ("CONFIG_ZSWAP", "y", "Compressed cache for swap pages", "Improves swap performance for systems with limited memory"),
];

const MEMORY_MEDIUM: &[Practice] = practices![
    ("CONFIG_TRANSPARENT_HUGEPAGE", "y", "Transparent Hugepage Support", "Improves memory performance for systems with moderate memory"),
    ("CONFIG_TRANSPARENT_HUGEPAGE_MADVISE", "y", "Transparent Hugepage: madvise", "Enables application control of Transparent Hugepages"),
];

const MEMORY_LARGE: &[Practice] = practices![
    ("CONFIG_TRANSPARENT_HUGEPAGE", "y", "Transparent Hugepage Support", "Improves memory performance for systems with large memory"),
    ("CONFIG_TRANSPARENT_HUGEPAGE_ALWAYS", "y", "Transparent Hugepage: always", "Enables Transparent Hugepages for all allocations"),
    ("CONFIG_HUGETLBFS", "y", "HugeTLB file system support", "Enables explicit huge page support for applications"),
];

const MEMORY_VERY_LARGE: &[Practice] = practices![
    ("CONFIG_TRANSPARENT_HUGEPAGE", "y", "Transparent Hugepage Support", "Improves memory performance for systems with very large memory"),
    ("CONFIG_TRANSPARENT_HUGEPAGE_ALWAYS", "y", "Transparent Hugepage: always", "Enables Transparent Hugepages for all allocations"),
    ("CONFIG_HUGETLBFS", "y", "HugeTLB file system support", "Enables explicit huge page support for applications"),
    ("CONFIG_NUMA", "y", "NUMA support", "Enables NUMA support for systems with very large memory"),
];

const STORAGE_HDD: &[Practice] = practices![
    ("CONFIG_BLK_DEV_IO_TRACE", "y", "Block layer I/O tracing", "Enables I/O tracing for performance analysis"),
    ("CONFIG_IOSCHED_BFQ", "y", "BFQ I/O scheduler", "Provides good I/O scheduling for HDDs"),
    ("CONFIG_DEFAULT_BFQ", "y", "BFQ as default I/O scheduler", "Sets BFQ as default I/O scheduler for HDDs"),
];

const STORAGE_SSD: &[Practice] = practices![
    ("CONFIG_BLK_DEV_IO_TRACE", "y", "Block layer I/O tracing", "Enables I/O tracing for performance analysis"),
    ("CONFIG_IOSCHED_DEADLINE", "y", "Deadline I/O scheduler", "Provides good I/O scheduling for SSDs"),
    ("CONFIG_DEFAULT_DEADLINE", "y", "Deadline as default I/O scheduler", "Sets Deadline as default I/O scheduler for SSDs"),
];

const STORAGE_NVME: &[Practice] = practices![
    ("CONFIG_BLK_DEV_IO_TRACE", "y", "Block layer I/O tracing", "Enables I/O tracing for performance analysis"),
    ("CONFIG_IOSCHED_DEADLINE", "y", "Deadline I/O scheduler", "Provides good I/O scheduling for NVMe drives"),
    ("CONFIG_DEFAULT_DEADLINE", "y", "Deadline as default I/O scheduler", "Sets Deadline as default I/O scheduler for NVMe drives"),
    ("CONFIG_NVME_MULTIPATH", "y", "NVMe multipath support", "Enables multipath support for NVMe drives"),
];

const NETWORK_ETHERNET: &[Practice] = practices![
    ("CONFIG_NET_SCHED", "y", "QoS and/or fair queueing", "Enables network traffic control for Ethernet"),
    ("CONFIG_NET_SCH_FQ_CODEL", "y", "Fair Queue CoDel packet scheduler", "Provides fair queuing and reduces bufferbloat"),
    ("CONFIG_TCP_CONG_BBR", "y", "BBR TCP congestion control", "Improves TCP performance for high-bandwidth connections"),
];

const NETWORK_WIRELESS: &[Practice] = practices![
    ("CONFIG_NET_SCHED", "y", "QoS and/or fair queueing", "Enables network traffic control for wireless"),
    ("CONFIG_NET_SCH_FQ_CODEL", "y", "Fair Queue CoDel packet scheduler", "Provides fair queuing and reduces bufferbloat"),
    ("CONFIG_MAC80211_RC_MINSTREL", "y", "Minstrel rate control algorithm", "Provides good rate control for wireless connections"),
    ("CONFIG_CFG80211_WEXT", "y", "cfg80211 wireless extensions compatibility", "Enables compatibility with wireless tools"),
];

const GRAPHICS_INTEGRATED: &[Practice] = practices![
    ("CONFIG_DRM", "y", "Direct Rendering Manager", "Enables graphics support for integrated GPUs"),
    ("CONFIG_DRM_I915", "y", "Intel 8xx/9xx/G3x/G4x/HD Graphics", "Enables support for Intel integrated graphics"),
    ("CONFIG_DRM_AMD_DC", "y", "AMD DC - Display Core", "Enables support for AMD integrated graphics"),
];

const GRAPHICS_DEDICATED: &[Practice] = practices![
    ("CONFIG_DRM", "y", "Direct Rendering Manager", "Enables graphics support for dedicated GPUs"),
    ("CONFIG_DRM_NOUVEAU", "y", "Nouveau (NVIDIA) cards", "Enables open-source support for NVIDIA GPUs"),
    ("CONFIG_DRM_AMDGPU", "y", "AMD GPU", "Enables support for AMD GPUs"),
];

const SYSTEM_DESKTOP: &[Practice] = practices![
    ("CONFIG_PREEMPT", "y", "Preemptible Kernel (Low-Latency Desktop)", "Improves system responsiveness for desktop workloads"),
    ("CONFIG_SCHED_AUTOGROUP", "y", "Automatic process group scheduling", "Improves desktop interactivity"),
];

const SYSTEM_LAPTOP: &[Practice] = practices![
    ("CONFIG_PREEMPT", "y", "Preemptible Kernel (Low-Latency Desktop)", "Improves system responsiveness for laptop workloads"),
    ("CONFIG_PM_AUTOSLEEP", "y", "Opportunistic sleep", "Improves power management for laptops"),
    ("CONFIG_SUSPEND", "y", "Suspend to RAM and standby", "Enables suspend functionality for laptops"),
    ("CONFIG_HIBERNATE", "y", "Hibernation (aka suspend to disk)", "Enables hibernation functionality for laptops"),
];

const SYSTEM_SERVER: &[Practice] = practices![
    ("CONFIG_PREEMPT", "n", "No Forced Preemption (Server)", "Optimizes throughput for server workloads"),
    ("CONFIG_HZ_300", "y", "300 Hz tick rate", "Lower timer frequency reduces overhead for server systems"),
    ("CONFIG_HZ", "300", "Timer frequency", "Lower timer frequency reduces overhead for server systems"),
    ("CONFIG_NO_HZ_FULL", "y", "Full dynticks system (tickless)", "Reduces timer interrupts for better performance on server systems"),
];

const CPU_DESKTOP: &[Practice] = practices![
    ("CONFIG_CPU_FREQ_DEFAULT_GOV_PERFORMANCE", "y", "Performance governor as default", "Optimizes for desktop performance"),
    ("CONFIG_CPU_FREQ_GOV_SCHEDUTIL", "y", "Schedutil governor", "Provides good balance between performance and power efficiency"),
];

const CPU_LAPTOP: &[Practice] = practices![
    ("CONFIG_CPU_FREQ_DEFAULT_GOV_ONDEMAND", "y", "Ondemand governor as default", "Optimizes for laptop power efficiency"),
    ("CONFIG_CPU_FREQ_GOV_POWERSAVE", "y", "Powersave governor", "Enables power saving for laptops"),
];

const CPU_SERVER: &[Practice] = practices![
    ("CONFIG_CPU_FREQ_DEFAULT_GOV_PERFORMANCE", "y", "Performance governor as default", "Optimizes for server performance"),
];

const MEMORY_DESKTOP: &[Practice] = practices![
    ("CONFIG_COMPACTION", "y", "Memory compaction", "Improves memory fragmentation for desktop systems"),
];

const MEMORY_LAPTOP: &[Practice] = practices![
    ("CONFIG_COMPACTION", "y", "Memory compaction", "Improves memory fragmentation for laptop systems"),
    ("CONFIG_KSM", "y", "Kernel Samepage Merging", "Reduces memory usage by merging identical pages"),
];

const MEMORY_SERVER: &[Practice] = practices![
    ("CONFIG_COMPACTION", "y", "Memory compaction", "Improves memory fragmentation for server systems"),
    ("CONFIG_KSM", "y", "Kernel Samepage Merging", "Reduces memory usage by merging identical pages"),
    ("CONFIG_MEMORY_FAILURE", "y", "Memory failure recovery", "Enables recovery from memory failures for server systems"),
];

const STORAGE_DESKTOP: &[Practice] = practices![
    ("CONFIG_BLK_CGROUP", "y", "Block IO controller", "Enables I/O control for desktop systems"),
];

const STORAGE_LAPTOP: &[Practice] = practices![
    ("CONFIG_BLK_CGROUP", "y", "Block IO controller", "Enables I/O control for laptop systems"),
    ("CONFIG_BLK_DEV_THROTTLING", "y", "Block device I/O throttling", "Enables I/O throttling for power efficiency"),
];

const STORAGE_SERVER: &[Practice] = practices![
    ("CONFIG_BLK_CGROUP", "y", "Block IO controller", "Enables I/O control for server systems"),
    ("CONFIG_BLK_DEV_INTEGRITY", "y", "Block layer data integrity support", "Enables data integrity for server storage"),
];

const NETWORK_DESKTOP: &[Practice] = practices![
    ("CONFIG_PACKET", "y", "Packet socket", "Enables packet socket support for desktop networking"),
    ("CONFIG_NETFILTER", "y", "Network packet filtering framework", "Enables firewall support for desktop systems"),
];

const NETWORK_LAPTOP: &[Practice] = practices![
    ("CONFIG_PACKET", "y", "Packet socket", "Enables packet socket support for laptop networking"),
    ("CONFIG_NETFILTER", "y", "Network packet filtering framework", "Enables firewall support for laptop systems"),
    ("CONFIG_PM_RUNTIME", "y", "Run-time PM core functionality", "Enables power management for network devices"),
];

const NETWORK_SERVER: &[Practice] = practices![
    ("CONFIG_PACKET", "y", "Packet socket", "Enables packet socket support for server networking"),
    ("CONFIG_NETFILTER", "y", "Network packet filtering framework", "Enables firewall support for server systems"),
    ("CONFIG_NET_RX_BUSY_POLL", "y", "Busy poll for sockets", "Reduces latency for server networking"),
    ("CONFIG_RPS", "y", "Receive Packet Steering", "Distributes network processing across CPUs"),
    ("CONFIG_XPS", "y", "Transmit Packet Steering", "Distributes network transmit across CPUs"),
];

/// Kernel optimization recommendation engine.
pub struct KernelOptimizer;

impl KernelOptimizer {
    pub fn new() -> Self {
        KernelOptimizer
    }

    /// Compare the configuration against the profile's best practices and
    /// append sysctl recommendations. Results are stored on
    /// `config.recommendations` and returned.
    pub fn recommendations(&self, config: &mut KernelConfig, profile: &HardwareProfile) -> Attrs {
        let mut buckets: BTreeMap<&str, Vec<serde_json::Value>> = BTreeMap::new();
        for category in ["general", "cpu", "memory", "storage", "network", "graphics"] {
            buckets.insert(category, Vec::new());
        }

        for (category, practices) in profile_practices(profile) {
            let bucket = buckets.entry(category).or_default();
            for practice in practices.values() {
                match config.options.get(practice.option) {
                    Some(option) if value_compliant(&option.value, practice.value) => {}
                    Some(option) => bucket.push(practice_entry(practice, &option.value)),
                    None => bucket.push(practice_entry(practice, "missing")),
                }
            }
        }

        for (category, recs) in sysctl_recommendations(profile) {
            buckets.entry(category).or_default().extend(recs);
        }

        let mut out = Attrs::new();
        for (category, recs) in buckets {
            out.insert(category.to_string(), json!(recs));
        }
        config.recommendations = out.clone();
        out
    }
}

impl Default for KernelOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

fn practice_entry(practice: &Practice, current: &str) -> serde_json::Value {
    json!({
        "option": practice.option,
        "current_value": current,
        "recommended_value": practice.value,
        "description": practice.description,
        "reason": practice.reason,
        "command": format!(
            "echo '{}={}' | sudo tee -a /etc/modprobe.d/local.conf && sudo update-initramfs -u",
            practice.option, practice.value
        ),
    })
}

/// Resolve the overlay layers for a profile. Within a category, later
/// layers override earlier ones by option name (system-type overlays win).
fn profile_practices(
    profile: &HardwareProfile,
) -> Vec<(&'static str, BTreeMap<&'static str, &'static Practice>)> {
    let system = profile.system_type;

    let merge = |layers: &[&'static [Practice]]| {
        let mut merged: BTreeMap<&'static str, &'static Practice> = BTreeMap::new();
        for layer in layers {
            for practice in layer.iter() {
                merged.insert(practice.option, practice);
            }
        }
        merged
    };

    let system_layer = match system {
        SystemClass::Desktop => SYSTEM_DESKTOP,
        SystemClass::Laptop => SYSTEM_LAPTOP,
        SystemClass::Server => SYSTEM_SERVER,
    };
    let cpu_class_layer = match profile.cpu_cores {
        CpuCoreClass::Single => CPU_SINGLE,
        CpuCoreClass::Few => CPU_FEW,
        CpuCoreClass::Multi => CPU_MULTI,
        CpuCoreClass::Many => CPU_MANY,
    };
    let cpu_system_layer = match system {
        SystemClass::Desktop => CPU_DESKTOP,
        SystemClass::Laptop => CPU_LAPTOP,
        SystemClass::Server => CPU_SERVER,
    };
    let memory_class_layer = match profile.memory_size {
        MemoryClass::Small => MEMORY_SMALL,
        MemoryClass::Medium => MEMORY_MEDIUM,
        MemoryClass::Large => MEMORY_LARGE,
        MemoryClass::VeryLarge => MEMORY_VERY_LARGE,
    };
    let memory_system_layer = match system {
        SystemClass::Desktop => MEMORY_DESKTOP,
        SystemClass::Laptop => MEMORY_LAPTOP,
        SystemClass::Server => MEMORY_SERVER,
    };
    let storage_class_layer = match profile.storage_type {
        StorageClass::Hdd => STORAGE_HDD,
        StorageClass::Ssd => STORAGE_SSD,
        StorageClass::Nvme => STORAGE_NVME,
    };
    let storage_system_layer = match system {
        SystemClass::Desktop => STORAGE_DESKTOP,
        SystemClass::Laptop => STORAGE_LAPTOP,
        SystemClass::Server => STORAGE_SERVER,
    };
    let network_class_layer = match profile.network_type {
        NetworkClass::Ethernet => NETWORK_ETHERNET,
        NetworkClass::Wireless => NETWORK_WIRELESS,
    };
    let network_system_layer = match system {
        SystemClass::Desktop => NETWORK_DESKTOP,
        SystemClass::Laptop => NETWORK_LAPTOP,
        SystemClass::Server => NETWORK_SERVER,
    };
    let graphics_layer = match profile.graphics_type {
        GraphicsClass::Integrated => GRAPHICS_INTEGRATED,
        GraphicsClass::Dedicated => GRAPHICS_DEDICATED,
    };

    vec![
        ("general", merge(&[BASE, system_layer])),
        ("cpu", merge(&[cpu_class_layer, cpu_system_layer])),
        ("memory", merge(&[memory_class_layer, memory_system_layer])),
        ("storage", merge(&[storage_class_layer, storage_system_layer])),
        ("network", merge(&[network_class_layer, network_system_layer])),
        ("graphics", merge(&[graphics_layer])),
    ]
}

fn sysctl_entry(
    option: &str,
    current: &str,
    recommended: &str,
    description: &str,
    reason: &str,
) -> serde_json::Value {
    json!({
        "option": option,
        "current_value": current,
        "recommended_value": recommended,
        "description": description,
        "reason": reason,
        "command": format!(
            "echo \"{option}={recommended}\" | sudo tee -a /etc/sysctl.conf && sudo sysctl -p"
        ),
    })
}

fn sysctl_recommendations(
    profile: &HardwareProfile,
) -> Vec<(&'static str, Vec<serde_json::Value>)> {
    let mut memory = Vec::new();
    match profile.memory_size {
        MemoryClass::Small => {
            memory.push(sysctl_entry(
                "vm.swappiness",
                "60",
                "10",
                "Reduce swappiness for systems with limited memory",
                "Reduces swap usage to improve performance on low-memory systems",
            ));
        }
        MemoryClass::Large | MemoryClass::VeryLarge => {
            memory.push(sysctl_entry(
                "vm.swappiness",
                "60",
                "10",
                "Reduce swappiness for systems with ample memory",
                "Reduces swap usage to improve performance on high-memory systems",
            ));
            memory.push(sysctl_entry(
                "vm.dirty_ratio",
                "20",
                "10",
                "Reduce dirty ratio for systems with ample memory",
                "Reduces the amount of dirty memory before forced writeback",
            ));
            memory.push(sysctl_entry(
                "vm.dirty_background_ratio",
                "10",
                "5",
                "Reduce dirty background ratio for systems with ample memory",
                "Reduces the amount of dirty memory before background writeback",
            ));
        }
        MemoryClass::Medium => {}
    }

    let mut storage = Vec::new();
    if matches!(profile.storage_type, StorageClass::Ssd | StorageClass::Nvme) {
        storage.push(sysctl_entry(
            "vm.vfs_cache_pressure",
            "100",
            "50",
            "Reduce VFS cache pressure for SSD systems",
            "Keeps more VFS caches in memory to reduce disk I/O",
        ));
    }

    let network = vec![
        sysctl_entry(
            "net.core.rmem_max",
            "212992",
            "16777216",
            "Increase maximum receive socket buffer size",
            "Improves network performance for high-bandwidth connections",
        ),
        sysctl_entry(
            "net.core.wmem_max",
            "212992",
            "16777216",
            "Increase maximum send socket buffer size",
            "Improves network performance for high-bandwidth connections",
        ),
    ];

    vec![("memory", memory), ("storage", storage), ("network", network)]
}
