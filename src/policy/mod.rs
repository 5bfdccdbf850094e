pub mod fifo;
pub mod look;
pub mod nlook;

pub use fifo::Fifo;
pub use look::{Direction, Look};
pub use nlook::Nlook;

use crate::config::{Policy, SimConfig};
use crate::model::{BufferId, BufferPool, IoKind, Track};
use crate::trace::PolicySnapshot;

/// The three request-ordering policies behind one dispatch point. All
/// share the same contract: `add` marks the buffer's pending operation and
/// enqueues it, `next` picks a request given the head position, `complete`
/// clears the mark on the most recently dispatched buffer.
pub enum DiskPolicy {
    Fifo(Fifo),
    Look(Look),
    Nlook(Nlook),
}

impl DiskPolicy {
    pub fn new(kind: Policy, config: &SimConfig) -> Self {
        match kind {
            Policy::Fifo => DiskPolicy::Fifo(Fifo::new()),
            Policy::Look => DiskPolicy::Look(Look::new(config)),
            Policy::Nlook => DiskPolicy::Nlook(Nlook::new(config)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DiskPolicy::Fifo(_) => "FIFO",
            DiskPolicy::Look(_) => "LOOK",
            DiskPolicy::Nlook(_) => "NLOOK",
        }
    }

    pub fn add(&mut self, id: BufferId, op: IoKind, pool: &mut BufferPool) {
        pool.get_mut(id).set_io(Some(op));
        match self {
            DiskPolicy::Fifo(p) => p.add(id),
            DiskPolicy::Look(p) => p.add(id, pool),
            DiskPolicy::Nlook(p) => p.add(id, pool),
        }
    }

    pub fn next(&mut self, head_track: Track, pool: &BufferPool) -> Option<BufferId> {
        match self {
            DiskPolicy::Fifo(p) => p.next(),
            DiskPolicy::Look(p) => p.next(head_track, pool),
            DiskPolicy::Nlook(p) => p.next(head_track, pool),
        }
    }

    pub fn complete(&mut self, pool: &mut BufferPool) {
        match self {
            DiskPolicy::Fifo(p) => p.complete(pool),
            DiskPolicy::Look(p) => p.complete(pool),
            DiskPolicy::Nlook(p) => p.complete(pool),
        }
    }

    pub fn has_pending(&self) -> bool {
        match self {
            DiskPolicy::Fifo(p) => p.has_pending(),
            DiskPolicy::Look(p) => p.has_pending(),
            DiskPolicy::Nlook(p) => p.has_pending(),
        }
    }

    pub fn snapshot(&self, pool: &BufferPool) -> PolicySnapshot {
        match self {
            DiskPolicy::Fifo(p) => p.snapshot(pool),
            DiskPolicy::Look(p) => p.snapshot(pool),
            DiskPolicy::Nlook(p) => p.snapshot(pool),
        }
    }
}

/// Track a queued buffer targets. Buffers handed to a policy are always
/// bound to a sector.
pub(crate) fn track_of(pool: &BufferPool, id: BufferId) -> Track {
    pool.get(id).track().unwrap_or(0)
}

pub(crate) fn bindings(pool: &BufferPool, ids: &[BufferId]) -> Vec<(Track, crate::model::Sector)> {
    ids.iter().filter_map(|&id| pool.get(id).binding()).collect()
}
