use std::sync::Arc;

use crate::process::Process;
use crate::scheduler::traits::SchedulingPolicy;

/// Round-Robin.
///
/// Selection is identical to FCFS: the head of the ready queue. The rotation
/// behavior comes from the engine, which bounds every dispatch by this
/// policy's quantum and pushes preempted processes to the tail of the queue.
#[derive(Debug)]
pub struct RoundRobin {
    quantum: u32,
}

impl RoundRobin {
    /// `quantum` is clamped to at least 1 tick.
    pub fn new(quantum: u32) -> Self {
        Self {
            quantum: quantum.max(1),
        }
    }

    pub fn quantum(&self) -> u32 {
        self.quantum
    }
}

impl SchedulingPolicy for RoundRobin {
    fn select_next(&self, ready: &[Arc<Process>]) -> Option<Arc<Process>> {
        ready.first().cloned()
    }

    fn name(&self) -> &'static str {
        "Round Robin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{Burst, BurstKind};

    #[test]
    fn quantum_is_clamped_to_one() {
        assert_eq!(RoundRobin::new(0).quantum(), 1);
        assert_eq!(RoundRobin::new(4).quantum(), 4);
    }

    #[test]
    fn picks_queue_head() {
        let policy = RoundRobin::new(2);
        let ready = vec![
            Arc::new(Process::new("A", 0, vec![Burst::new(BurstKind::Cpu, 5)], 1, 1)),
            Arc::new(Process::new("B", 0, vec![Burst::new(BurstKind::Cpu, 3)], 1, 1)),
        ];
        assert_eq!(policy.select_next(&ready).map(|p| p.pid().to_string()), Some("A".into()));
    }
}
