//! Machine-wide numbers shown in the header. These are passed through untouched.

use sysinfo::{LoadAvg, System};

/// Load, memory, and CPU totals sampled once per refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MachineStats {
    /// 1, 5, and 15 minute load averages.
    pub load_avg: [f32; 3],
    pub mem_used: u64,
    pub mem_total: u64,
    pub swap_used: u64,
    pub swap_total: u64,
    /// Seconds since the UNIX epoch.
    pub boot_time: u64,
    /// Overall CPU usage as a percentage.
    pub cpu_percent: f32,
}

impl MachineStats {
    /// Seconds the machine has been up at `now` (seconds since the epoch).
    pub fn uptime_at(&self, now: u64) -> u64 {
        now.saturating_sub(self.boot_time)
    }
}

/// Reads [`MachineStats`] through sysinfo.
pub struct MachineSampler {
    sys: System,
}

impl Default for MachineSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl MachineSampler {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }

    pub fn sample(&mut self) -> MachineStats {
        self.sys.refresh_memory();
        self.sys.refresh_cpu_usage();

        let LoadAvg { one, five, fifteen } = System::load_average();

        MachineStats {
            load_avg: [one as f32, five as f32, fifteen as f32],
            mem_used: self.sys.used_memory(),
            mem_total: self.sys.total_memory(),
            swap_used: self.sys.used_swap(),
            swap_total: self.sys.total_swap(),
            boot_time: System::boot_time(),
            cpu_percent: self.sys.global_cpu_usage(),
        }
    }
}
