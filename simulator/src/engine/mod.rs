/*
 * Simulation Engine
 *
 * The tick-level coordination core. The engine owns the clock, the Ready /
 * IO / MemoryBlocked queues plus the one-tick ReadyNextTick staging queue,
 * the single Running slot and the run metrics, and advances the whole
 * system one tick at a time:
 *
 *   arrivals -> I/O advance -> memory reclaim -> dispatch-if-idle ->
 *   CPU tick (with its page reference) -> drain deferred -> notify
 *
 * Each phase runs to completion before the next begins; no partial tick is
 * ever observable from outside. A worker thread drives the loop; observers
 * read state through snapshot getters and the update callback only.
 *
 * I/O completions are made dispatchable no earlier than the next tick: a
 * process finishing I/O at tick t is staged in ReadyNextTick and drained
 * into Ready at the end of the tick, after the dispatch phase already ran.
 */

pub mod events;
pub mod metrics;

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;

use crate::config::{SchedulerKind, SimulationConfig};
use crate::memory::MemoryManager;
use crate::process::{BurstKind, Process, ProcessState, Tick};
use crate::scheduler::SchedulingPolicy;
use events::EventLog;
use metrics::SystemMetrics;

/// Callbacks fired by the engine after each tick and once at completion.
/// Invoked with no engine or memory lock held; panics are contained.
pub trait SimulationObserver: Send + Sync {
    fn on_update(&self) {}
    fn on_complete(&self) {}
}

struct EngineState {
    clock: Tick,
    ready: VecDeque<Arc<Process>>,
    io: VecDeque<Arc<Process>>,
    memory_blocked: VecDeque<Arc<Process>>,
    ready_next_tick: VecDeque<Arc<Process>>,
    running: Option<Arc<Process>>,
    quantum_remaining: u32,
    context_switches: u64,
    metrics: SystemMetrics,
}

impl EngineState {
    fn new() -> Self {
        Self {
            clock: 0,
            ready: VecDeque::new(),
            io: VecDeque::new(),
            memory_blocked: VecDeque::new(),
            ready_next_tick: VecDeque::new(),
            running: None,
            quantum_remaining: 0,
            context_switches: 0,
            metrics: SystemMetrics::new(),
        }
    }
}

struct EngineInner {
    processes: Vec<Arc<Process>>,
    memory: Arc<MemoryManager>,
    policy: Box<dyn SchedulingPolicy>,
    scheduler_kind: SchedulerKind,
    quantum: u32,
    tick_delay: Duration,
    active: AtomicBool,
    state: Mutex<EngineState>,
    events: Arc<EventLog>,
    observer: Mutex<Option<Arc<dyn SimulationObserver>>>,
}

/// The simulator facade: construction, run control and snapshot getters.
pub struct Simulator {
    inner: Arc<EngineInner>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Simulator {
    /// Builds a simulator for `processes` under `config`. Fails on invalid
    /// configuration; no engine is created in that case.
    pub fn new(processes: Vec<Arc<Process>>, config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        let events = Arc::new(EventLog::new());
        let memory = Arc::new(MemoryManager::new(
            config.total_frames,
            config.page_replacement.build_policy(),
        )?);
        memory.set_event_log(Arc::clone(&events));
        memory.set_preserve_frames_on_termination(config.preserve_frames_on_termination);

        let policy = config.scheduler.build_policy(config.quantum);
        log::info!(
            "simulator initialized: scheduler={}, replacement={}, frames={}, processes={}",
            policy.name(),
            memory.policy_name(),
            config.total_frames,
            processes.len()
        );

        Ok(Self {
            inner: Arc::new(EngineInner {
                processes,
                memory,
                policy,
                scheduler_kind: config.scheduler,
                quantum: config.quantum,
                tick_delay: Duration::from_millis(config.tick_delay_ms),
                active: AtomicBool::new(false),
                state: Mutex::new(EngineState::new()),
                events,
                observer: Mutex::new(None),
            }),
            worker: Mutex::new(None),
        })
    }

    /// Runs the simulation to completion on the calling thread. No-op when
    /// a run is already in flight.
    pub fn run(&self) {
        if self.inner.active.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.run_loop();
    }

    /// Spawns the worker thread and returns immediately. No-op when a run
    /// is already in flight.
    pub fn start(&self) {
        if self.inner.active.swap(true, Ordering::SeqCst) {
            return;
        }
        let inner = Arc::clone(&self.inner);
        let handle = thread::Builder::new()
            .name("ossim-engine".into())
            .spawn(move || inner.run_loop())
            .expect("spawn simulation worker thread");
        *self.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Requests a graceful stop; the loop exits after the current tick and
    /// still finalizes metrics.
    pub fn stop(&self) {
        self.inner.active.store(false, Ordering::SeqCst);
    }

    /// Waits for a `start()`ed run to finish.
    pub fn join(&self) {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub fn set_observer(&self, observer: Arc<dyn SimulationObserver>) {
        *self
            .inner
            .observer
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(observer);
    }

    // ---- snapshot getters ----

    pub fn current_time(&self) -> Tick {
        self.inner.lock_state().clock
    }

    pub fn running_process(&self) -> Option<Arc<Process>> {
        self.inner.lock_state().running.clone()
    }

    pub fn ready_pids(&self) -> Vec<String> {
        let st = self.inner.lock_state();
        st.ready.iter().map(|p| p.pid().to_string()).collect()
    }

    pub fn io_pids(&self) -> Vec<String> {
        let st = self.inner.lock_state();
        st.io.iter().map(|p| p.pid().to_string()).collect()
    }

    pub fn memory_blocked_pids(&self) -> Vec<String> {
        let st = self.inner.lock_state();
        st.memory_blocked.iter().map(|p| p.pid().to_string()).collect()
    }

    pub fn processes(&self) -> Vec<Arc<Process>> {
        self.inner.processes.clone()
    }

    pub fn metrics(&self) -> SystemMetrics {
        self.inner.lock_state().metrics.clone()
    }

    pub fn context_switches(&self) -> u64 {
        self.inner.lock_state().context_switches
    }

    pub fn events(&self) -> Arc<EventLog> {
        Arc::clone(&self.inner.events)
    }

    pub fn memory(&self) -> Arc<MemoryManager> {
        Arc::clone(&self.inner.memory)
    }

    pub fn scheduler_name(&self) -> &'static str {
        self.inner.policy.name()
    }
}

impl EngineInner {
    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, f: impl FnOnce(&dyn SimulationObserver)) {
        let observer = self
            .observer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(observer) = observer {
            if catch_unwind(AssertUnwindSafe(|| f(observer.as_ref()))).is_err() {
                log::warn!("simulation observer panicked; continuing");
            }
        }
    }

    /// Restores every process and the engine state for a fresh run.
    fn prepare(&self) {
        for process in &self.processes {
            process.reset();
        }
        let mut st = self.lock_state();
        *st = EngineState::new();
    }

    fn run_loop(&self) {
        self.prepare();
        self.events.log("Simulator started");

        loop {
            if !self.active.load(Ordering::SeqCst) {
                break;
            }
            let all_done = {
                let mut st = self.lock_state();
                self.tick(&mut st)
            };
            self.notify(|obs| obs.on_update());
            if all_done {
                break;
            }
            self.lock_state().clock += 1;
            if !self.tick_delay.is_zero() {
                thread::sleep(self.tick_delay);
            }
        }

        self.finalize();
        self.active.store(false, Ordering::SeqCst);
        self.notify(|obs| obs.on_complete());
    }

    /// One full tick. Returns whether every process has terminated.
    fn tick(&self, st: &mut EngineState) -> bool {
        let now = st.clock;
        self.memory.set_current_time(now);

        self.handle_arrivals(st, now);

        self.events.log(format!(
            "[T={}] Ready={} IO={} MemBlocked={} Running={}",
            now,
            st.ready.len(),
            st.io.len(),
            st.memory_blocked.len(),
            st.running
                .as_ref()
                .map(|p| p.pid().to_string())
                .unwrap_or_else(|| "idle".to_string())
        ));

        self.handle_io_tick(st, now);
        self.handle_memory_blocked(st, now);
        self.schedule_if_idle(st, now);
        self.execute_cpu_tick(st, now);

        // drain the one-tick staging queue, preserving completion order
        let state = &mut *st;
        state.ready.extend(state.ready_next_tick.drain(..));

        self.all_terminated()
    }

    /// Phase 2: move processes arriving at `now` into Ready, or into the
    /// memory-blocked queue when their initial page cannot be loaded.
    fn handle_arrivals(&self, st: &mut EngineState, now: Tick) {
        for process in &self.processes {
            if process.arrival_time() != now || process.state() != ProcessState::New {
                continue;
            }
            if self.memory.try_load_initial_page(process) {
                process.set_state(ProcessState::Ready);
                st.ready.push_back(Arc::clone(process));
                self.events
                    .log(format!("{} arrived and moved to Ready queue", process.pid()));
            } else {
                process.set_state(ProcessState::BlockedMemory);
                st.memory_blocked.push_back(Arc::clone(process));
                self.events.log(format!(
                    "{} arrived but memory not available -> MemBlocked",
                    process.pid()
                ));
            }
        }
    }

    /// Phase 3: advance every blocked I/O burst by one tick. Completions
    /// are staged for the next tick; exhausted burst lists terminate here.
    fn handle_io_tick(&self, st: &mut EngineState, now: Tick) {
        let io = std::mem::take(&mut st.io);
        for process in io {
            if process.state() != ProcessState::BlockedIo {
                // stale entry, drop it from the queue
                continue;
            }
            process.decrement_current_burst_time(1, false);
            if process.burst_time_remaining() > 0 {
                st.io.push_back(process);
                continue;
            }
            process.end_io_interval(now);
            if process.move_to_next_burst() {
                process.set_state(ProcessState::Ready);
                st.ready_next_tick.push_back(Arc::clone(&process));
                self.events.log(format!(
                    "{} I/O completed, ready at T={}",
                    process.pid(),
                    now + 1
                ));
            } else {
                process.set_state(ProcessState::Terminated);
                process.set_end_time(now);
                process.close_open_intervals_at_termination(now);
                st.metrics.add_completed_process(Arc::clone(&process));
                self.events
                    .log(format!("{} terminated in I/O", process.pid()));
                self.memory.unload_process(&process);
            }
        }
    }

    /// Phase 4: retry the initial page load for memory-blocked processes.
    fn handle_memory_blocked(&self, st: &mut EngineState, _now: Tick) {
        if st.memory_blocked.is_empty() {
            return;
        }
        let snapshot: Vec<Arc<Process>> = st.memory_blocked.iter().cloned().collect();
        for process in snapshot {
            if self.memory.try_load_initial_page(&process) {
                st.memory_blocked.retain(|p| p.pid() != process.pid());
                process.set_state(ProcessState::Ready);
                st.ready.push_back(Arc::clone(&process));
                self.events
                    .log(format!("{} memory loaded, moved to Ready queue", process.pid()));
            } else {
                self.events.log(format!(
                    "{} still cannot allocate pages (freeFrames={})",
                    process.pid(),
                    self.memory.free_frames()
                ));
            }
        }
    }

    /// Phase 5: when the CPU is idle, consult the policy over an ordered
    /// Ready snapshot and dispatch the chosen process.
    fn schedule_if_idle(&self, st: &mut EngineState, now: Tick) {
        if st.running.is_some() || st.ready.is_empty() {
            return;
        }

        let snapshot: Vec<Arc<Process>> = st.ready.iter().cloned().collect();
        let Some(candidate) = self.policy.select_next(&snapshot) else {
            return;
        };
        if let Some(pos) = st.ready.iter().position(|p| p.pid() == candidate.pid()) {
            st.ready.remove(pos);
        }

        // the candidate may have lost its pages while waiting; re-check
        // (idempotent when already resident)
        if !self.memory.try_load_initial_page(&candidate) {
            candidate.set_state(ProcessState::BlockedMemory);
            st.memory_blocked.push_back(Arc::clone(&candidate));
            self.events.log(format!(
                "{} blocked by memory while scheduling -> MemBlocked",
                candidate.pid()
            ));
            return;
        }

        candidate.set_start_time_if_unset(now);
        candidate.set_state(ProcessState::Running);
        candidate.start_cpu_interval(now);
        st.context_switches += 1;
        candidate.increment_context_switches();

        st.quantum_remaining = if self.scheduler_kind == SchedulerKind::RoundRobin {
            self.quantum.max(1)
        } else {
            candidate
                .current_burst()
                .map(|b| b.duration())
                .unwrap_or(1)
        };

        self.events.log(format!(
            "{} started running (burst: {} ticks)",
            candidate.pid(),
            st.quantum_remaining
        ));
        st.running = Some(candidate);
    }

    /// Phase 6: execute one CPU tick for the running process, including its
    /// page reference for this tick.
    fn execute_cpu_tick(&self, st: &mut EngineState, now: Tick) {
        let Some(process) = st.running.clone() else {
            return;
        };
        if process.state() != ProcessState::Running {
            return;
        }

        if process.page_count() > 0 {
            let page = (process.cpu_time_used() % u64::from(process.page_count())) as u32;
            self.memory.access_page(&process, page);
        }

        process.decrement_current_burst_time(1, true);
        st.quantum_remaining = st.quantum_remaining.saturating_sub(1);

        if process.burst_time_remaining() <= 0 {
            self.finish_cpu_burst(st, &process, now);
            return;
        }

        if self.scheduler_kind == SchedulerKind::RoundRobin && st.quantum_remaining == 0 {
            process.end_cpu_interval(now);
            process.set_state(ProcessState::Ready);
            st.ready.push_back(Arc::clone(&process));
            self.events.log(format!(
                "{} quantum expired, moved to Ready queue",
                process.pid()
            ));
            st.running = None;
        }
    }

    /// CPU burst completion: terminate, block on I/O, or go back to Ready,
    /// depending on what the burst list holds next.
    fn finish_cpu_burst(&self, st: &mut EngineState, process: &Arc<Process>, now: Tick) {
        if process.current_burst().map(|b| b.kind()) != Some(BurstKind::Cpu) {
            // burst cursor out of step with the Running slot; drop the slot
            process.end_cpu_interval(now);
            st.running = None;
            return;
        }

        let has_next = process.move_to_next_burst();
        process.end_cpu_interval(now);

        if !has_next {
            process.set_end_time(now);
            process.close_open_intervals_at_termination(now);
            process.set_state(ProcessState::Terminated);
            st.metrics.add_completed_process(Arc::clone(process));
            self.events.log(format!("{} terminated", process.pid()));
            self.memory.unload_process(process);
            st.running = None;
            return;
        }

        match process.current_burst() {
            Some(burst) if burst.kind() == BurstKind::Io => {
                // the I/O interval opens on the next tick so that CPU and
                // I/O never overlap within one tick
                process.start_io_interval(now + 1);
                process.set_state(ProcessState::BlockedIo);
                st.io.push_back(Arc::clone(process));
                self.events.log(format!(
                    "{} blocked for I/O (duration={})",
                    process.pid(),
                    burst.duration()
                ));
            }
            _ => {
                process.set_state(ProcessState::Ready);
                st.ready.push_back(Arc::clone(process));
            }
        }
        st.running = None;
    }

    fn all_terminated(&self) -> bool {
        self.processes.iter().all(|p| p.is_complete())
    }

    /// Final metric pass: CPU total is the sum of per-process CPU time;
    /// idle is the remainder of the `final_tick + 1` ticks that elapsed.
    fn finalize(&self) {
        let total_cpu: u64 = self.processes.iter().map(|p| p.cpu_time_used()).sum();
        let mut st = self.lock_state();
        let elapsed = st.clock + 1;
        st.metrics.set_total_cpu_time(total_cpu);
        st.metrics.set_total_idle_time(elapsed.saturating_sub(total_cpu));
        let switches = st.context_switches;
        st.metrics.set_context_switches(switches);
        drop(st);
        self.events.log("Simulation complete");
    }
}
