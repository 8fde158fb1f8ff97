use std::sync::Arc;

use crate::process::Process;

/// Scheduling policy trait.
///
/// A policy is consulted with an ordered snapshot of the ready queue
/// (insertion order, so position encodes arrival into the queue) and names
/// the process to dispatch next. Policies never mutate the snapshot or the
/// underlying queue; removing the chosen process is the engine's job.
///
/// Policies are stateless across ticks. The one exception is Round-Robin,
/// which carries its configured quantum; the engine, not the policy,
/// enforces it.
pub trait SchedulingPolicy: Send + Sync {
    /// Choose the next process to dispatch from the ready snapshot.
    ///
    /// Returns `None` when the snapshot is empty.
    fn select_next(&self, ready: &[Arc<Process>]) -> Option<Arc<Process>>;

    /// Policy name for configuration and logging.
    fn name(&self) -> &'static str;
}
