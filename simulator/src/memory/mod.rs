/*
 * Memory Manager
 *
 * Owns the physical frame pool: the frame table (frame -> owner, frame ->
 * page), the per-process resident sets, the append-only per-frame access
 * history keyed by a global reference sequence, and the fault/replacement
 * counters. A pluggable replacement policy names eviction victims.
 *
 * Every public operation is atomic with respect to the others: one internal
 * mutex guards the whole state. Event-log lines produced inside the locked
 * region are buffered and flushed after the lock is released, and the
 * optional update callback always runs without the memory lock held.
 */

pub mod replacement;
pub mod types;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{ensure, Result};

use crate::engine::events::EventLog;
use crate::process::{Process, Tick};
use replacement::ReplacementPolicy;
use types::{AccessEvent, AccessKind, FrameOwners, FramePages};

/// Callback fired after any state-changing operation.
pub type UpdateCallback = Arc<dyn Fn() + Send + Sync>;

struct MemoryState {
    total_frames: usize,
    frame_owners: FrameOwners,
    frame_pages: FramePages,
    /// pid -> resident page numbers; always the projection of the frame
    /// table onto that process.
    resident: HashMap<String, BTreeSet<u32>>,
    /// View-only overlay of frames whose owners terminated while the
    /// preserve flag was set. Never consulted for allocation or victims.
    terminated_owners: FrameOwners,
    terminated_pages: FramePages,
    preserve_on_termination: bool,
    policy: Box<dyn ReplacementPolicy>,
    page_faults: u64,
    replacements: u64,
    now: Tick,
    seq: u64,
    history: BTreeMap<usize, Vec<AccessEvent>>,
    /// Lines destined for the shared event log, drained after unlock.
    pending_log: Vec<String>,
}

impl MemoryState {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn free_frames(&self) -> usize {
        self.total_frames - self.frame_owners.len()
    }

    fn trace(&mut self, line: String) {
        self.pending_log.push(line);
    }

    fn record(&mut self, frame: usize, event: AccessEvent) {
        self.history.entry(frame).or_default().push(event);
    }

    /// Looks up the frame currently holding `(process, page)`.
    fn frame_of(&self, process: &Arc<Process>, page: u32) -> Option<usize> {
        self.frame_owners
            .iter()
            .find(|(frame, owner)| {
                owner.pid() == process.pid() && self.frame_pages.get(*frame) == Some(&page)
            })
            .map(|(frame, _)| *frame)
    }

    /// Assigns the lowest-indexed free frame to `(process, page)`. The frame
    /// table and the resident set are updated before the policy hears about
    /// the allocation.
    fn allocate(&mut self, process: &Arc<Process>, page: u32, seq: u64) -> Option<usize> {
        for frame in 0..self.total_frames {
            if self.frame_owners.contains_key(&frame) {
                continue;
            }
            self.frame_owners.insert(frame, Arc::clone(process));
            self.frame_pages.insert(frame, page);
            self.resident
                .entry(process.pid().to_string())
                .or_default()
                .insert(page);
            self.policy.frame_allocated(frame, process, page);
            let now = self.now;
            self.record(
                frame,
                AccessEvent {
                    seq,
                    time: now,
                    page,
                    hit: false,
                    kind: AccessKind::Alloc,
                },
            );
            return Some(frame);
        }
        None
    }

    /// Evicts the frame named by the policy, recording the eviction under
    /// the caller's sequence number. Returns false when the policy refuses.
    fn evict_one(&mut self, seq: u64) -> bool {
        if self.frame_owners.is_empty() {
            return false;
        }
        let victim = self
            .policy
            .select_victim(&self.frame_owners, &self.frame_pages, self.now);
        let Some(frame) = victim else {
            return false;
        };
        let Some(owner) = self.frame_owners.remove(&frame) else {
            // policy named a frame outside the snapshot; treat as refusal
            return false;
        };
        let page = self.frame_pages.remove(&frame);
        if let Some(page) = page {
            if let Some(set) = self.resident.get_mut(owner.pid()) {
                set.remove(&page);
            }
            let now = self.now;
            self.record(
                frame,
                AccessEvent {
                    seq,
                    time: now,
                    page,
                    hit: false,
                    kind: AccessKind::Evict,
                },
            );
        }
        self.policy.frame_freed(frame);
        self.replacements += 1;
        self.trace(format!(
            "Evicted frame {} (process={}, page={})",
            frame,
            owner.pid(),
            page.map(|p| p.to_string()).unwrap_or_else(|| "?".into())
        ));
        true
    }
}

/// Thread-safe frame pool arbiter. See the module header for the ownership
/// picture.
pub struct MemoryManager {
    total_frames: usize,
    state: Mutex<MemoryState>,
    event_log: Mutex<Arc<EventLog>>,
    on_update: Mutex<Option<UpdateCallback>>,
}

impl MemoryManager {
    /// Fails when `total_frames` is zero; a pool with no frames cannot hold
    /// any resident page and the engine would never make progress.
    pub fn new(total_frames: usize, policy: Box<dyn ReplacementPolicy>) -> Result<Self> {
        ensure!(total_frames >= 1, "total_frames must be >= 1");
        Ok(Self {
            total_frames,
            state: Mutex::new(MemoryState {
                total_frames,
                frame_owners: FrameOwners::new(),
                frame_pages: FramePages::new(),
                resident: HashMap::new(),
                terminated_owners: FrameOwners::new(),
                terminated_pages: FramePages::new(),
                preserve_on_termination: false,
                policy,
                page_faults: 0,
                replacements: 0,
                now: 0,
                seq: 0,
                history: BTreeMap::new(),
                pending_log: Vec::new(),
            }),
            event_log: Mutex::new(Arc::new(EventLog::new())),
            on_update: Mutex::new(None),
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Shares the engine's event log so memory lines interleave with the
    /// engine's own.
    pub fn set_event_log(&self, log: Arc<EventLog>) {
        *self
            .event_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = log;
    }

    fn event_log(&self) -> Arc<EventLog> {
        Arc::clone(
            &self
                .event_log
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// Registers the callback fired after every state-changing operation.
    pub fn set_on_update(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self
            .on_update
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    /// Drains buffered log lines and fires the update callback, both with
    /// the memory lock already released.
    fn flush(&self, lines: Vec<String>, changed: bool) {
        if !lines.is_empty() {
            let log = self.event_log();
            for line in lines {
                log.log(line);
            }
        }
        if changed {
            let callback = self
                .on_update
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Some(callback) = callback {
                if catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                    log::warn!("memory update callback panicked; continuing");
                }
            }
        }
    }

    /// Mirrors the engine clock for time-based policies and event stamps.
    pub fn set_current_time(&self, now: Tick) {
        self.lock_state().now = now;
    }

    pub fn current_time(&self) -> Tick {
        self.lock_state().now
    }

    /// Attempts to make page 0 of `process` resident.
    ///
    /// A process that already holds a resident page is left untouched and
    /// the call reports success. An actual load consumes one sequence number
    /// and counts as a page fault. When the pool is full the call fails
    /// without disturbing resident pages of other processes; the engine
    /// keeps the process memory-blocked and retries on later ticks.
    pub fn try_load_initial_page(&self, process: &Arc<Process>) -> bool {
        let (lines, changed, loaded) = {
            let mut st = self.lock_state();
            if st
                .resident
                .get(process.pid())
                .is_some_and(|pages| !pages.is_empty())
            {
                return true;
            }
            if st.free_frames() == 0 {
                st.trace(format!(
                    "{} cannot allocate initial page (RAM full)",
                    process.pid()
                ));
                (std::mem::take(&mut st.pending_log), false, false)
            } else {
                let seq = st.next_seq();
                st.page_faults += 1;
                match st.allocate(process, 0, seq) {
                    Some(frame) => {
                        st.trace(format!(
                            "Loaded initial page for {}: page=0 -> frame={}",
                            process.pid(),
                            frame
                        ));
                        (std::mem::take(&mut st.pending_log), true, true)
                    }
                    None => (std::mem::take(&mut st.pending_log), false, false),
                }
            }
        };
        self.flush(lines, changed);
        loaded
    }

    /// Routes one page reference from the running process.
    ///
    /// Exactly one sequence number is produced per call; the hit, load and
    /// eviction events caused by the reference all carry it. A fault that
    /// finds the pool full asks the policy for a victim; if the policy
    /// refuses, the reference is a logged no-op and no state changes.
    pub fn access_page(&self, process: &Arc<Process>, page: u32) {
        let (lines, changed) = {
            let mut st = self.lock_state();
            let seq = st.next_seq();
            let now = st.now;

            match st.frame_of(process, page) {
                Some(frame) => {
                    st.record(
                        frame,
                        AccessEvent {
                            seq,
                            time: now,
                            page,
                            hit: true,
                            kind: AccessKind::Access,
                        },
                    );
                    st.policy.page_accessed(frame, process, page, now);
                    process.set_last_access_time(now);
                    (std::mem::take(&mut st.pending_log), false)
                }
                None => {
                    st.page_faults += 1;
                    if st.free_frames() == 0 && !st.evict_one(seq) {
                        st.trace(format!(
                            "Page fault but no victim available for {} page {}",
                            process.pid(),
                            page
                        ));
                        (std::mem::take(&mut st.pending_log), false)
                    } else {
                        match st.allocate(process, page, seq) {
                            Some(frame) => {
                                st.trace(format!(
                                    "Page loaded: proc={} page={} -> frame={}",
                                    process.pid(),
                                    page,
                                    frame
                                ));
                                st.record(
                                    frame,
                                    AccessEvent {
                                        seq,
                                        time: now,
                                        page,
                                        hit: false,
                                        kind: AccessKind::Load,
                                    },
                                );
                                st.policy.page_accessed(frame, process, page, now);
                                process.set_last_access_time(now);
                                (std::mem::take(&mut st.pending_log), true)
                            }
                            None => (std::mem::take(&mut st.pending_log), false),
                        }
                    }
                }
            }
        };
        self.flush(lines, changed);
    }

    /// Releases every frame owned by `process` (on termination).
    ///
    /// Each freed frame records an `unload` event under a fresh sequence
    /// number. With the preserve flag set, the old mapping is additionally
    /// kept in a terminated overlay that snapshot getters merge in, so a
    /// post-mortem view can still show the last residency; the frame itself
    /// returns to the allocatable pool either way. A process with no
    /// resident pages is a quiet no-op.
    pub fn unload_process(&self, process: &Arc<Process>) {
        let (lines, changed) = {
            let mut st = self.lock_state();
            let frames: Vec<usize> = st
                .frame_owners
                .iter()
                .filter(|(_, owner)| owner.pid() == process.pid())
                .map(|(frame, _)| *frame)
                .collect();
            if frames.is_empty() {
                st.resident.remove(process.pid());
                return;
            }
            for frame in frames {
                let Some(owner) = st.frame_owners.remove(&frame) else {
                    continue;
                };
                let page = st.frame_pages.remove(&frame);
                if st.preserve_on_termination {
                    st.terminated_owners.insert(frame, Arc::clone(&owner));
                    if let Some(page) = page {
                        st.terminated_pages.insert(frame, page);
                    }
                }
                if let Some(page) = page {
                    let seq = st.next_seq();
                    let now = st.now;
                    st.record(
                        frame,
                        AccessEvent {
                            seq,
                            time: now,
                            page,
                            hit: false,
                            kind: AccessKind::Unload,
                        },
                    );
                }
                st.policy.frame_freed(frame);
            }
            st.resident.remove(process.pid());
            st.trace(format!("Unloaded pages for {}", process.pid()));
            (std::mem::take(&mut st.pending_log), true)
        };
        self.flush(lines, changed);
    }

    // ---- counters and snapshots ----

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    pub fn free_frames(&self) -> usize {
        self.lock_state().free_frames()
    }

    pub fn page_faults(&self) -> u64 {
        self.lock_state().page_faults
    }

    pub fn replacements(&self) -> u64 {
        self.lock_state().replacements
    }

    pub fn max_access_sequence(&self) -> u64 {
        self.lock_state().seq
    }

    pub fn policy_name(&self) -> &'static str {
        self.lock_state().policy.name()
    }

    pub fn set_preserve_frames_on_termination(&self, preserve: bool) {
        self.lock_state().preserve_on_termination = preserve;
    }

    pub fn preserve_frames_on_termination(&self) -> bool {
        self.lock_state().preserve_on_termination
    }

    /// Frame -> owner view, with the terminated overlay merged in (live
    /// entries win).
    pub fn frame_status_snapshot(&self) -> FrameOwners {
        let st = self.lock_state();
        let mut snap = st.frame_owners.clone();
        for (frame, owner) in &st.terminated_owners {
            snap.entry(*frame).or_insert_with(|| Arc::clone(owner));
        }
        snap
    }

    /// Frame -> page view, with the terminated overlay merged in.
    pub fn frame_to_page_snapshot(&self) -> FramePages {
        let st = self.lock_state();
        let mut snap = st.frame_pages.clone();
        for (frame, page) in &st.terminated_pages {
            snap.entry(*frame).or_insert(*page);
        }
        snap
    }

    /// Deep copy of the per-frame access history.
    pub fn frame_access_history_snapshot(&self) -> BTreeMap<usize, Vec<AccessEvent>> {
        self.lock_state().history.clone()
    }

    /// Resident pages of one process.
    pub fn resident_pages(&self, process: &Arc<Process>) -> BTreeSet<u32> {
        self.lock_state()
            .resident
            .get(process.pid())
            .cloned()
            .unwrap_or_default()
    }
}
