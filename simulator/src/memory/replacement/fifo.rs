use std::collections::VecDeque;
use std::sync::Arc;

use crate::memory::replacement::ReplacementPolicy;
use crate::memory::types::{FrameOwners, FramePages};
use crate::process::{Process, Tick};

/// First In, First Out: evict the frame that has been resident the longest.
///
/// Keeps a queue of frames in allocation order. Victim selection walks the
/// queue from the front, discarding entries that are no longer resident, and
/// returns (removing) the first surviving one.
#[derive(Debug, Default)]
pub struct Fifo {
    queue: VecDeque<usize>,
}

impl Fifo {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }
}

impl ReplacementPolicy for Fifo {
    fn page_accessed(&mut self, _frame: usize, _process: &Arc<Process>, _page: u32, _now: Tick) {
        // arrival order is fixed at allocation; accesses don't matter
    }

    fn select_victim(
        &mut self,
        frame_owners: &FrameOwners,
        _frame_pages: &FramePages,
        _now: Tick,
    ) -> Option<usize> {
        while let Some(frame) = self.queue.pop_front() {
            if frame_owners.contains_key(&frame) {
                return Some(frame);
            }
        }
        None
    }

    fn frame_allocated(&mut self, frame: usize, _process: &Arc<Process>, _page: u32) {
        self.queue.push_back(frame);
    }

    fn frame_freed(&mut self, frame: usize) {
        self.queue.retain(|&f| f != frame);
    }

    fn name(&self) -> &'static str {
        "FIFO (First In, First Out)"
    }
}
