/*
 * Configuration and Process Definition Parsing
 *
 * SimulationConfig gathers the enumerated run options and builds the
 * concrete policy objects. The process-definition parser reads the simple
 * line format
 *
 *     PID ARRIVAL BURSTS PRIORITY PAGE_COUNT
 *
 * where BURSTS is a comma-separated list of CPU(n) / E/S(n) tokens.
 * Lines with the wrong shape are skipped with a warning; numeric errors
 * abort the load.
 */

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, ensure, Context, Result};

use crate::memory::replacement::{Fifo, Lru, Optimal, ReplacementPolicy};
use crate::process::{Burst, BurstKind, Process, Tick};
use crate::scheduler::{Fcfs, Priority, RoundRobin, SchedulingPolicy, Sjf};

/// Which scheduling policy the engine dispatches with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerKind {
    Fcfs,
    Sjf,
    RoundRobin,
    Priority,
}

impl SchedulerKind {
    pub fn build_policy(self, quantum: u32) -> Box<dyn SchedulingPolicy> {
        match self {
            SchedulerKind::Fcfs => Box::new(Fcfs::new()),
            SchedulerKind::Sjf => Box::new(Sjf::new()),
            SchedulerKind::RoundRobin => Box::new(RoundRobin::new(quantum)),
            SchedulerKind::Priority => Box::new(Priority::new()),
        }
    }
}

impl FromStr for SchedulerKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "FCFS" => Ok(SchedulerKind::Fcfs),
            "SJF" => Ok(SchedulerKind::Sjf),
            "RR" => Ok(SchedulerKind::RoundRobin),
            "PRIORITY" => Ok(SchedulerKind::Priority),
            other => bail!("unknown scheduler {:?} (expected FCFS, SJF, RR or Priority)", other),
        }
    }
}

/// Which page replacement policy the memory manager evicts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementKind {
    Fifo,
    Lru,
    Optimal,
}

impl ReplacementKind {
    pub fn build_policy(self) -> Box<dyn ReplacementPolicy> {
        match self {
            ReplacementKind::Fifo => Box::new(Fifo::new()),
            ReplacementKind::Lru => Box::new(Lru::new()),
            ReplacementKind::Optimal => Box::new(Optimal::new()),
        }
    }
}

impl FromStr for ReplacementKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "FIFO" => Ok(ReplacementKind::Fifo),
            "LRU" => Ok(ReplacementKind::Lru),
            "OPTIMAL" => Ok(ReplacementKind::Optimal),
            other => bail!("unknown replacement policy {:?} (expected FIFO, LRU or Optimal)", other),
        }
    }
}

/// The enumerated run options of a simulation.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub scheduler: SchedulerKind,
    pub page_replacement: ReplacementKind,
    pub total_frames: usize,
    /// Round-Robin quantum; ignored by the other schedulers.
    pub quantum: u32,
    /// Wall-clock delay between ticks; 0 runs as fast as possible.
    pub tick_delay_ms: u64,
    /// Keep frames of terminated processes visible in snapshots.
    pub preserve_frames_on_termination: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerKind::Fcfs,
            page_replacement: ReplacementKind::Fifo,
            total_frames: 8,
            quantum: 2,
            tick_delay_ms: 0,
            preserve_frames_on_termination: false,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.total_frames >= 1, "total_frames must be >= 1");
        ensure!(self.quantum >= 1, "quantum must be >= 1");
        Ok(())
    }
}

/// Reads a process definition file. See the module header for the format.
pub fn parse_processes_from_file(path: impl AsRef<Path>) -> Result<Vec<Arc<Process>>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading process file {}", path.display()))?;
    parse_processes(&text)
}

/// Parses process definitions from in-memory text.
pub fn parse_processes(text: &str) -> Result<Vec<Arc<Process>>> {
    let mut processes = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_process_line(line)
            .with_context(|| format!("process file line {}", idx + 1))?
        {
            Some(process) => processes.push(Arc::new(process)),
            None => log::warn!("skipping malformed process line {}: {:?}", idx + 1, line),
        }
    }
    Ok(processes)
}

/// `Ok(None)` marks a shape failure (skipped); `Err` a numeric failure
/// (aborts the load).
fn parse_process_line(line: &str) -> Result<Option<Process>> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 5 {
        return Ok(None);
    }

    let pid = fields[0];
    let arrival: Tick = fields[1]
        .parse()
        .with_context(|| format!("arrival time {:?}", fields[1]))?;
    let Some(bursts) = parse_bursts(fields[2])? else {
        return Ok(None);
    };
    if bursts.is_empty() {
        return Ok(None);
    }
    let priority: i32 = fields[3]
        .parse()
        .with_context(|| format!("priority {:?}", fields[3]))?;
    let page_count: u32 = fields[4]
        .parse()
        .with_context(|| format!("page count {:?}", fields[4]))?;

    Ok(Some(Process::new(pid, arrival, bursts, priority, page_count)))
}

fn parse_bursts(field: &str) -> Result<Option<Vec<Burst>>> {
    let mut bursts = Vec::new();
    for token in field.split(',') {
        let token = token.trim();
        let (kind, rest) = if let Some(rest) = token.strip_prefix("CPU(") {
            (BurstKind::Cpu, rest)
        } else if let Some(rest) = token.strip_prefix("E/S(") {
            (BurstKind::Io, rest)
        } else {
            return Ok(None);
        };
        let Some(digits) = rest.strip_suffix(')') else {
            return Ok(None);
        };
        let duration: u32 = digits
            .parse()
            .with_context(|| format!("burst duration {:?}", digits))?;
        ensure!(duration >= 1, "burst duration must be >= 1, got {}", duration);
        bursts.push(Burst::new(kind, duration));
    }
    Ok(Some(bursts))
}
