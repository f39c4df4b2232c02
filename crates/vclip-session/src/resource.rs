//! CPU/memory admission gate.

use sysinfo::System;

/// Denies task admission when the host is under CPU or memory
/// pressure. Monitoring failures default to allow, since a blind spot
/// in the monitor should never itself become an outage.
pub struct ResourceMonitor {
    max_cpu_percent: f32,
    max_memory_percent: f32,
    system: std::sync::Mutex<System>,
}

impl ResourceMonitor {
    pub fn new(max_cpu_percent: f32, max_memory_percent: f32) -> Self {
        Self {
            max_cpu_percent,
            max_memory_percent,
            system: std::sync::Mutex::new(System::new()),
        }
    }

    pub fn can_start_new_task(&self) -> bool {
        let Ok(mut system) = self.system.lock() else {
            return true;
        };
        system.refresh_cpu_usage();
        system.refresh_memory();

        let cpu_percent = system.global_cpu_usage();
        if cpu_percent > self.max_cpu_percent {
            tracing::warn!(cpu_percent, "resource monitor: cpu pressure, denying admission");
            return false;
        }

        let total = system.total_memory();
        if total == 0 {
            return true;
        }
        let memory_percent = (system.used_memory() as f64 / total as f64) * 100.0;
        if memory_percent as f32 > self.max_memory_percent {
            tracing::warn!(memory_percent, "resource monitor: memory pressure, denying admission");
            return false;
        }

        true
    }
}

impl Default for ResourceMonitor {
    fn default() -> Self {
        Self::new(70.0, 80.0)
    }
}
