/*
 * Process Model
 *
 * A Process couples an immutable descriptor (identity, arrival time, burst
 * list, priority, page count) with the mutable runtime state the engine
 * advances tick by tick: lifecycle state, burst cursor, accounting counters,
 * and the recorded CPU/IO intervals used to reconstruct the timeline.
 *
 * The runtime block sits behind its own mutex so that observers (UI, CLI,
 * tests) can read a consistent view while the engine thread is mutating it.
 * All interval getters hand out copies; the process is the sole owner of its
 * interval lists.
 */

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Simulated time, in ticks. Tick 0 is the first tick of a run.
pub type Tick = u64;

/// The kind of demand a burst places on the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstKind {
    Cpu,
    Io,
}

/// One contiguous period of CPU or I/O demand. Immutable after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Burst {
    kind: BurstKind,
    duration: u32,
}

impl Burst {
    pub fn new(kind: BurstKind, duration: u32) -> Self {
        Self { kind, duration }
    }

    pub fn kind(&self) -> BurstKind {
        self.kind
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }
}

/// Lifecycle states of a process. `Terminated` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    New,
    Ready,
    Running,
    BlockedIo,
    BlockedMemory,
    Terminated,
}

impl ProcessState {
    pub fn display_name(&self) -> &'static str {
        match self {
            ProcessState::New => "New",
            ProcessState::Ready => "Ready",
            ProcessState::Running => "Running",
            ProcessState::BlockedIo => "Blocked (I/O)",
            ProcessState::BlockedMemory => "Blocked (Memory)",
            ProcessState::Terminated => "Terminated",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A half-open interval `[start, end)` in ticks, as drawn on a Gantt row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: Tick,
    pub end: Tick,
}

impl Interval {
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Mutable per-run state. Only the engine writes here; readers copy out.
#[derive(Debug)]
struct Runtime {
    state: ProcessState,
    current_burst_index: usize,
    /// Remaining ticks of the current burst. Signed so that the engine's
    /// `<= 0` completion check survives over-decrements.
    burst_time_remaining: i64,
    cpu_time_used: u64,
    context_switches: u32,
    start_time: Option<Tick>,
    end_time: Option<Tick>,
    last_access_time: Option<Tick>,
    cpu_intervals: Vec<Interval>,
    io_intervals: Vec<Interval>,
    open_cpu_start: Option<Tick>,
    open_io_start: Option<Tick>,
}

impl Runtime {
    fn initial(first_burst: Option<&Burst>) -> Self {
        Self {
            state: ProcessState::New,
            current_burst_index: 0,
            burst_time_remaining: first_burst.map(|b| i64::from(b.duration())).unwrap_or(0),
            cpu_time_used: 0,
            context_switches: 0,
            start_time: None,
            end_time: None,
            last_access_time: None,
            cpu_intervals: Vec::new(),
            io_intervals: Vec::new(),
            open_cpu_start: None,
            open_io_start: None,
        }
    }
}

/// A simulated job: an alternating sequence of CPU and I/O bursts plus the
/// bookkeeping the engine and the memory manager maintain for it.
///
/// Identity is the pid; the engine and the memory manager share processes by
/// `Arc` and compare them by pid only.
pub struct Process {
    pid: String,
    arrival_time: Tick,
    bursts: Vec<Burst>,
    priority: i32,
    page_count: u32,
    total_cpu_time_needed: u64,
    runtime: Mutex<Runtime>,
}

impl Process {
    pub fn new(
        pid: impl Into<String>,
        arrival_time: Tick,
        bursts: Vec<Burst>,
        priority: i32,
        page_count: u32,
    ) -> Self {
        let total_cpu_time_needed = bursts
            .iter()
            .filter(|b| b.kind() == BurstKind::Cpu)
            .map(|b| u64::from(b.duration()))
            .sum();
        let runtime = Mutex::new(Runtime::initial(bursts.first()));
        Self {
            pid: pid.into(),
            arrival_time,
            bursts,
            priority,
            page_count,
            total_cpu_time_needed,
            runtime,
        }
    }

    fn runtime(&self) -> MutexGuard<'_, Runtime> {
        self.runtime.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---- immutable descriptor ----

    pub fn pid(&self) -> &str {
        &self.pid
    }

    pub fn arrival_time(&self) -> Tick {
        self.arrival_time
    }

    pub fn bursts(&self) -> &[Burst] {
        &self.bursts
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Total CPU demand across all bursts, used by SJF.
    pub fn total_cpu_time_needed(&self) -> u64 {
        self.total_cpu_time_needed
    }

    // ---- lifecycle state ----

    pub fn state(&self) -> ProcessState {
        self.runtime().state
    }

    pub fn set_state(&self, state: ProcessState) {
        self.runtime().state = state;
    }

    pub fn is_complete(&self) -> bool {
        self.state() == ProcessState::Terminated
    }

    // ---- burst cursor ----

    /// The burst currently pointed at, or `None` once the list is exhausted.
    pub fn current_burst(&self) -> Option<Burst> {
        let rt = self.runtime();
        self.bursts.get(rt.current_burst_index).copied()
    }

    pub fn burst_time_remaining(&self) -> i64 {
        self.runtime().burst_time_remaining
    }

    /// Consume `amount` ticks of the current burst. CPU consumption is the
    /// only path that charges `cpu_time_used`.
    pub fn decrement_current_burst_time(&self, amount: u32, is_cpu: bool) {
        let mut rt = self.runtime();
        rt.burst_time_remaining -= i64::from(amount);
        if is_cpu {
            rt.cpu_time_used += u64::from(amount);
        }
    }

    /// Advance to the next burst. Returns whether one exists; when it does,
    /// the remaining-time counter is reloaded from its duration.
    pub fn move_to_next_burst(&self) -> bool {
        let mut rt = self.runtime();
        rt.current_burst_index += 1;
        match self.bursts.get(rt.current_burst_index) {
            Some(next) => {
                rt.burst_time_remaining = i64::from(next.duration());
                true
            }
            None => false,
        }
    }

    // ---- accounting ----

    pub fn cpu_time_used(&self) -> u64 {
        self.runtime().cpu_time_used
    }

    pub fn context_switches(&self) -> u32 {
        self.runtime().context_switches
    }

    pub fn increment_context_switches(&self) {
        self.runtime().context_switches += 1;
    }

    pub fn start_time(&self) -> Option<Tick> {
        self.runtime().start_time
    }

    /// Records the first dispatch time; later calls are no-ops.
    pub fn set_start_time_if_unset(&self, time: Tick) {
        let mut rt = self.runtime();
        if rt.start_time.is_none() {
            rt.start_time = Some(time);
        }
    }

    pub fn end_time(&self) -> Option<Tick> {
        self.runtime().end_time
    }

    pub fn set_end_time(&self, time: Tick) {
        self.runtime().end_time = Some(time);
    }

    pub fn last_access_time(&self) -> Option<Tick> {
        self.runtime().last_access_time
    }

    pub fn set_last_access_time(&self, time: Tick) {
        self.runtime().last_access_time = Some(time);
    }

    /// Ticks spent waiting before the first dispatch, or 0 when the process
    /// never both started and finished.
    pub fn waiting_time(&self) -> u64 {
        let rt = self.runtime();
        match (rt.start_time, rt.end_time) {
            (Some(start), Some(_)) => start,
            _ => 0,
        }
    }

    /// `end_time + 1 - start_time` for a finished process, 0 otherwise.
    pub fn turnaround_time(&self) -> u64 {
        let rt = self.runtime();
        match (rt.start_time, rt.end_time) {
            (Some(start), Some(end)) => (end + 1).saturating_sub(start),
            _ => 0,
        }
    }

    // ---- interval bookkeeping ----

    /// Opens a CPU interval at `time` unless one is already open.
    pub fn start_cpu_interval(&self, time: Tick) {
        let mut rt = self.runtime();
        if rt.open_cpu_start.is_none() {
            rt.open_cpu_start = Some(time);
        }
    }

    /// Closes the open CPU interval, recording `[start, time + 1)` so that a
    /// burst consuming exactly one tick yields an interval of length 1.
    pub fn end_cpu_interval(&self, time: Tick) {
        let mut rt = self.runtime();
        if let Some(start) = rt.open_cpu_start.take() {
            rt.cpu_intervals.push(Interval { start, end: time + 1 });
        }
    }

    pub fn start_io_interval(&self, time: Tick) {
        let mut rt = self.runtime();
        if rt.open_io_start.is_none() {
            rt.open_io_start = Some(time);
        }
    }

    pub fn end_io_interval(&self, time: Tick) {
        let mut rt = self.runtime();
        if let Some(start) = rt.open_io_start.take() {
            rt.io_intervals.push(Interval { start, end: time + 1 });
        }
    }

    /// Closes whatever intervals are still open when the process terminates.
    pub fn close_open_intervals_at_termination(&self, time: Tick) {
        let mut rt = self.runtime();
        if let Some(start) = rt.open_cpu_start.take() {
            rt.cpu_intervals.push(Interval { start, end: time + 1 });
        }
        if let Some(start) = rt.open_io_start.take() {
            rt.io_intervals.push(Interval { start, end: time + 1 });
        }
    }

    pub fn cpu_intervals(&self) -> Vec<Interval> {
        self.runtime().cpu_intervals.clone()
    }

    pub fn io_intervals(&self) -> Vec<Interval> {
        self.runtime().io_intervals.clone()
    }

    /// Restores the runtime block to its initial state so the same process
    /// set can be re-run.
    pub fn reset(&self) {
        *self.runtime() = Runtime::initial(self.bursts.first());
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rt = self.runtime();
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("arrival_time", &self.arrival_time)
            .field("priority", &self.priority)
            .field("page_count", &self.page_count)
            .field("state", &rt.state)
            .field("burst_index", &rt.current_burst_index)
            .field("cpu_time_used", &rt.cpu_time_used)
            .finish()
    }
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.pid, self.state())
    }
}
