use sysinfo::System;

use crate::error::{AuditError, Result};

/// 自适应并行度（类 Spark Adaptive Execution 的简化版）
///
/// 上限为可用核心数，不做超线程超额订阅；系统繁忙时保守降级。
pub struct AdaptiveScheduler {
    cpu_count: usize,
    system: System,
}

impl AdaptiveScheduler {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        Self {
            cpu_count: num_cpus::get().max(1),
            system,
        }
    }

    pub fn cpu_count(&self) -> usize {
        self.cpu_count
    }

    /// 决定本次运行的 worker 数；显式指定优先，但不超过核心数。
    pub fn parallelism(&mut self, requested: Option<usize>) -> Result<usize> {
        if let Some(jobs) = requested {
            if jobs == 0 {
                return Err(AuditError::InvalidArgument(
                    "jobs must be a positive integer, got: 0".to_string(),
                ));
            }
            if jobs > self.cpu_count {
                tracing::warn!(
                    "Requested {} jobs, capping at {} available cores",
                    jobs,
                    self.cpu_count
                );
            }
            return Ok(jobs.min(self.cpu_count));
        }

        self.system.refresh_memory();
        let load = System::load_average().one;
        let total_mem = self.system.total_memory();
        let mem_pressure = if total_mem == 0 {
            0.0
        } else {
            1.0 - (self.system.available_memory() as f64 / total_mem as f64)
        };
        Ok(Self::select(self.cpu_count, load, mem_pressure))
    }

    fn select(cpu_count: usize, load: f64, mem_pressure: f64) -> usize {
        let busy = load > cpu_count as f64 * 0.8 || mem_pressure > 0.8;
        let chosen = if busy { cpu_count / 2 } else { cpu_count };
        let chosen = chosen.max(1);
        if chosen != cpu_count {
            tracing::info!(
                "Adaptive parallelism: {} -> {} (load: {:.2}, mem_pressure: {:.2})",
                cpu_count,
                chosen,
                load,
                mem_pressure
            );
        }
        chosen
    }
}

impl Default for AdaptiveScheduler {
    fn default() -> Self {
        Self::new()
    }
}
