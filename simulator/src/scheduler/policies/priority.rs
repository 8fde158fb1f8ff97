use std::sync::Arc;

use crate::process::Process;
use crate::scheduler::traits::SchedulingPolicy;

/// Priority scheduling (non-preemptive). Lower numeric priority wins; ties
/// keep the earliest position in the ready snapshot.
#[derive(Debug, Default)]
pub struct Priority;

impl Priority {
    pub fn new() -> Self {
        Self
    }
}

impl SchedulingPolicy for Priority {
    fn select_next(&self, ready: &[Arc<Process>]) -> Option<Arc<Process>> {
        ready.iter().min_by_key(|p| p.priority()).cloned()
    }

    fn name(&self) -> &'static str {
        "Priority Scheduling"
    }
}
