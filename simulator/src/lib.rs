/*
 * ossim: tick-driven simulator of an operating-system kernel core
 *
 * Couples CPU scheduling with paged virtual-memory management: a fixed set
 * of jobs, each an alternating sequence of CPU and I/O bursts, advances
 * through the classical process states while a bounded pool of physical
 * frames is arbitrated under a pluggable page-replacement policy.
 *
 * Subsystems:
 * - process:   job descriptors and per-run runtime state
 * - scheduler: the SchedulingPolicy trait and its four variants
 * - memory:    frame table, replacement policies, access history
 * - engine:    the per-tick coordination loop, event log and metrics
 * - config:    run options and the process-definition file parser
 */

pub mod config;
pub mod engine;
pub mod memory;
pub mod process;
pub mod scheduler;
pub mod utils;

pub use config::{
    parse_processes, parse_processes_from_file, ReplacementKind, SchedulerKind, SimulationConfig,
};
pub use engine::events::EventLog;
pub use engine::metrics::SystemMetrics;
pub use engine::{SimulationObserver, Simulator};
pub use memory::types::{AccessEvent, AccessKind};
pub use memory::MemoryManager;
pub use process::{Burst, BurstKind, Interval, Process, ProcessState, Tick};
