use std::collections::HashMap;
use std::sync::Arc;

use crate::memory::replacement::ReplacementPolicy;
use crate::memory::types::{FrameOwners, FramePages};
use crate::process::{Process, Tick};

/// Least Recently Used: evict the frame whose last access lies furthest in
/// the past.
///
/// A freshly allocated frame is stamped `None`, the "not yet accessed"
/// sentinel, which orders before every real tick, so untouched frames are
/// the first candidates. Ties resolve to the smallest frame index.
#[derive(Debug, Default)]
pub struct Lru {
    last_access: HashMap<usize, Option<Tick>>,
}

impl Lru {
    pub fn new() -> Self {
        Self {
            last_access: HashMap::new(),
        }
    }
}

impl ReplacementPolicy for Lru {
    fn page_accessed(&mut self, frame: usize, _process: &Arc<Process>, _page: u32, now: Tick) {
        self.last_access.insert(frame, Some(now));
    }

    fn select_victim(
        &mut self,
        frame_owners: &FrameOwners,
        _frame_pages: &FramePages,
        _now: Tick,
    ) -> Option<usize> {
        // BTreeMap iteration is ascending by frame index, and the strict `<`
        // keeps the first (lowest) frame on equal stamps.
        let mut victim: Option<(usize, Option<Tick>)> = None;
        for &frame in frame_owners.keys() {
            let stamp = self.last_access.get(&frame).copied().flatten();
            match victim {
                Some((_, best)) if stamp >= best => {}
                _ => victim = Some((frame, stamp)),
            }
        }
        victim.map(|(frame, _)| frame)
    }

    fn frame_allocated(&mut self, frame: usize, _process: &Arc<Process>, _page: u32) {
        self.last_access.insert(frame, None);
    }

    fn frame_freed(&mut self, frame: usize) {
        self.last_access.remove(&frame);
    }

    fn name(&self) -> &'static str {
        "LRU (Least Recently Used)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{Burst, BurstKind};

    fn job(pid: &str) -> Arc<Process> {
        Arc::new(Process::new(pid, 0, vec![Burst::new(BurstKind::Cpu, 1)], 1, 1))
    }

    fn resident(frames: &[usize], owner: &Arc<Process>) -> (FrameOwners, FramePages) {
        let mut owners = FrameOwners::new();
        let mut pages = FramePages::new();
        for (i, &frame) in frames.iter().enumerate() {
            owners.insert(frame, Arc::clone(owner));
            pages.insert(frame, i as u32);
        }
        (owners, pages)
    }

    #[test]
    fn evicts_oldest_access() {
        let p = job("P1");
        let mut lru = Lru::new();
        lru.frame_allocated(0, &p, 0);
        lru.frame_allocated(1, &p, 1);
        lru.page_accessed(0, &p, 0, 3);
        lru.page_accessed(1, &p, 1, 7);
        let (owners, pages) = resident(&[0, 1], &p);
        assert_eq!(lru.select_victim(&owners, &pages, 8), Some(0));
    }

    #[test]
    fn never_accessed_frame_is_oldest() {
        let p = job("P1");
        let mut lru = Lru::new();
        lru.frame_allocated(0, &p, 0);
        lru.frame_allocated(1, &p, 1);
        lru.page_accessed(0, &p, 0, 0);
        // frame 1 carries the sentinel and must lose to any real timestamp
        let (owners, pages) = resident(&[0, 1], &p);
        assert_eq!(lru.select_victim(&owners, &pages, 1), Some(1));
    }

    #[test]
    fn ties_resolve_to_smallest_frame_index() {
        let p = job("P1");
        let mut lru = Lru::new();
        lru.frame_allocated(2, &p, 0);
        lru.frame_allocated(1, &p, 1);
        lru.page_accessed(2, &p, 0, 5);
        lru.page_accessed(1, &p, 1, 5);
        let (owners, pages) = resident(&[1, 2], &p);
        assert_eq!(lru.select_victim(&owners, &pages, 6), Some(1));
    }

    #[test]
    fn freeing_unknown_frame_is_a_no_op() {
        let mut lru = Lru::new();
        lru.frame_freed(9);
        assert_eq!(
            lru.select_victim(&FrameOwners::new(), &FramePages::new(), 0),
            None
        );
    }
}
