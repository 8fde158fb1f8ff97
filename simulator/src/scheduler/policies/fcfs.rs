use std::sync::Arc;

use crate::process::Process;
use crate::scheduler::traits::SchedulingPolicy;

/// First Come, First Served: always dispatch the head of the ready queue.
#[derive(Debug, Default)]
pub struct Fcfs;

impl Fcfs {
    pub fn new() -> Self {
        Self
    }
}

impl SchedulingPolicy for Fcfs {
    fn select_next(&self, ready: &[Arc<Process>]) -> Option<Arc<Process>> {
        ready.first().cloned()
    }

    fn name(&self) -> &'static str {
        "FCFS (First Come, First Served)"
    }
}
