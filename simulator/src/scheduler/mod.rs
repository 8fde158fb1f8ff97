/*
 * Scheduling Subsystem
 *
 * Separates scheduling policy from mechanism: policies implement the
 * SchedulingPolicy trait and decide *which* process runs next; the engine
 * owns the queues, enforces the quantum, and performs the dispatch.
 */

pub mod policies;
pub mod traits;

pub use policies::{Fcfs, Priority, RoundRobin, Sjf};
pub use traits::SchedulingPolicy;
