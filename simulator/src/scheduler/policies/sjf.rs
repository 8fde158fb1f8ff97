use std::sync::Arc;

use crate::process::Process;
use crate::scheduler::traits::SchedulingPolicy;

/// Shortest Job First (non-preemptive).
///
/// Dispatches the process with the smallest total CPU demand. Ties keep the
/// earliest position in the ready snapshot.
#[derive(Debug, Default)]
pub struct Sjf;

impl Sjf {
    pub fn new() -> Self {
        Self
    }
}

impl SchedulingPolicy for Sjf {
    fn select_next(&self, ready: &[Arc<Process>]) -> Option<Arc<Process>> {
        ready
            .iter()
            .min_by_key(|p| p.total_cpu_time_needed())
            .cloned()
    }

    fn name(&self) -> &'static str {
        "SJF (Shortest Job First)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{Burst, BurstKind};

    fn cpu_job(pid: &str, demand: u32) -> Arc<Process> {
        Arc::new(Process::new(
            pid,
            0,
            vec![Burst::new(BurstKind::Cpu, demand)],
            1,
            1,
        ))
    }

    #[test]
    fn picks_smallest_total_demand() {
        let policy = Sjf::new();
        let ready = vec![cpu_job("A", 7), cpu_job("B", 2), cpu_job("C", 5)];
        assert_eq!(policy.select_next(&ready).map(|p| p.pid().to_string()), Some("B".into()));
    }

    #[test]
    fn ties_break_by_queue_position() {
        let policy = Sjf::new();
        let ready = vec![cpu_job("A", 3), cpu_job("B", 3)];
        assert_eq!(policy.select_next(&ready).map(|p| p.pid().to_string()), Some("A".into()));
    }
}
