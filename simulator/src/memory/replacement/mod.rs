/*
 * Page Replacement Policies
 *
 * A replacement policy observes frame allocation, access and freeing, and on
 * demand names a victim frame. The memory manager owns the policy and calls
 * it only under the memory lock, so policies carry no synchronization of
 * their own.
 */

mod fifo;
mod lru;
mod optimal;

pub use fifo::Fifo;
pub use lru::Lru;
pub use optimal::Optimal;

use std::sync::Arc;

use crate::memory::types::{FrameOwners, FramePages};
use crate::process::{Process, Tick};

/// Page replacement policy trait.
pub trait ReplacementPolicy: Send {
    /// A resident page in `frame` was referenced at tick `now`.
    fn page_accessed(&mut self, frame: usize, process: &Arc<Process>, page: u32, now: Tick);

    /// Name a victim among the frames present in the snapshots, or `None`
    /// to refuse. The manager performs the actual eviction.
    fn select_victim(
        &mut self,
        frame_owners: &FrameOwners,
        frame_pages: &FramePages,
        now: Tick,
    ) -> Option<usize>;

    /// `frame` was just assigned to `(process, page)`.
    fn frame_allocated(&mut self, frame: usize, process: &Arc<Process>, page: u32);

    /// `frame` was released. Must tolerate frames the policy never saw
    /// allocated.
    fn frame_freed(&mut self, frame: usize);

    /// Policy name for configuration and logging.
    fn name(&self) -> &'static str;
}
