//! Fixed thresholds for the recommendation engine. Callers do not
//! configure these.

/// CPU temperature (°C) above which cooling must be addressed immediately.
pub const CPU_TEMP_CRITICAL: f64 = 85.0;
/// CPU temperature (°C) above which cooling should improve soon.
pub const CPU_TEMP_HIGH: f64 = 75.0;

/// Load per core treated as a critical-path finding.
pub const CPU_LOAD_PER_CORE_HIGH: f64 = 2.0;
/// Load per core that is merely a performance advisory.
pub const CPU_LOAD_PER_CORE_ADVISORY: f64 = 1.5;

/// Memory usage percentage considered critical.
pub const MEMORY_USAGE_CRITICAL: f64 = 95.0;
/// Memory usage percentage considered high.
pub const MEMORY_USAGE_HIGH: f64 = 85.0;
/// Memory usage percentage where optimization is worth suggesting.
pub const MEMORY_USAGE_ADVISORY: f64 = 70.0;

/// Swap usage percentage considered high.
pub const SWAP_USAGE_HIGH: f64 = 50.0;

/// Disk usage percentage considered critical.
pub const DISK_USAGE_CRITICAL: f64 = 95.0;
/// Disk usage percentage considered high.
pub const DISK_USAGE_HIGH: f64 = 85.0;

/// Recurring-error count per analysis window worth a finding.
pub const ERROR_FREQUENCY_THRESHOLD: usize = 10;
