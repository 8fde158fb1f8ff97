/*
 * Memory Types
 *
 * Value types shared across the memory subsystem: the frame-table snapshot
 * aliases handed to replacement policies and observers, and the access
 * history events aligned on the global reference sequence.
 */

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::process::{Process, Tick};

/// Snapshot of the frame table: frame index -> owning process.
pub type FrameOwners = BTreeMap<usize, Arc<Process>>;

/// Snapshot of frame index -> resident page number.
pub type FramePages = BTreeMap<usize, u32>;

/// What a recorded access event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// A page was brought in to satisfy a fault.
    Load,
    /// The referenced page was already resident.
    Access,
    /// A resident page was pushed out to make room.
    Evict,
    /// A frame was assigned to a page.
    Alloc,
    /// A frame was released because its owner terminated.
    Unload,
}

impl AccessKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessKind::Load => "load",
            AccessKind::Access => "access",
            AccessKind::Evict => "evict",
            AccessKind::Alloc => "alloc",
            AccessKind::Unload => "unload",
        }
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a frame's append-only access history.
///
/// `seq` is the global reference counter: every `access_page` call produces
/// exactly one sequence number, and every sub-event caused by that call
/// (load, eviction) carries the same number, so a visualization can align
/// hits, loads and evictions on one reference column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessEvent {
    pub seq: u64,
    pub time: Tick,
    pub page: u32,
    pub hit: bool,
    pub kind: AccessKind,
}

impl fmt::Display for AccessEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[s={} t={} p={} {} {}]",
            self.seq,
            self.time,
            self.page,
            if self.hit { "HIT" } else { "MISS" },
            self.kind
        )
    }
}
