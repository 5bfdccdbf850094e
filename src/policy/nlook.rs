use crate::config::SimConfig;
use crate::model::{BufferId, BufferPool, Track};
use crate::trace::PolicySnapshot;

use super::track_of;

/// Bounded-ageing sweeps: requests land in a FIFO of capped sub-queues
/// and only the oldest queue is drained. No request can be postponed
/// beyond the lifetime of its own queue plus one pass of its
/// predecessors.
pub struct Nlook {
    queues: Vec<Vec<BufferId>>,
    active: Option<BufferId>,
    queue_max_len: usize,
}

impl Nlook {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            queues: vec![Vec::new()],
            active: None,
            queue_max_len: config.nlook_queue_max_len,
        }
    }

    /// Appends to the newest queue while it has room, sorted by sector;
    /// a full queue starts a new one.
    pub(crate) fn add(&mut self, id: BufferId, pool: &BufferPool) {
        match self.queues.last_mut() {
            Some(last) if last.len() < self.queue_max_len => {
                last.push(id);
                last.sort_by_key(|&b| pool.get(b).sector());
            }
            _ => self.queues.push(vec![id]),
        }
    }

    /// Drains the oldest queue only: an outward sweep from the head
    /// position, wrapping to the queue front when nothing lies ahead.
    pub(crate) fn next(&mut self, head_track: Track, pool: &BufferPool) -> Option<BufferId> {
        self.queues.retain(|q| !q.is_empty());
        let oldest = self.queues.first_mut()?;
        let pos = oldest
            .iter()
            .position(|&id| track_of(pool, id) >= head_track)
            .unwrap_or(0);
        let id = oldest.remove(pos);
        self.active = Some(id);
        Some(id)
    }

    pub(crate) fn complete(&mut self, pool: &mut BufferPool) {
        if let Some(id) = self.active.take() {
            pool.get_mut(id).set_io(None);
        }
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.queues.iter().any(|q| !q.is_empty()) || self.active.is_some()
    }

    pub(crate) fn snapshot(&self, pool: &BufferPool) -> PolicySnapshot {
        PolicySnapshot {
            name: "NLOOK",
            direction: None,
            active: self.active.and_then(|id| pool.get(id).binding()),
            queues: self
                .queues
                .iter()
                .map(|q| super::bindings(pool, q))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IoKind;

    fn setup(queue_max_len: usize, sectors: &[u32]) -> (Nlook, BufferPool) {
        let config = SimConfig {
            nlook_queue_max_len: queue_max_len,
            ..SimConfig::default()
        };
        let mut pool = BufferPool::new(sectors.len());
        let mut nlook = Nlook::new(&config);
        for (i, &sector) in sectors.iter().enumerate() {
            let id = BufferId(i);
            pool.get_mut(id).load_sector(sector, sector / 500);
            pool.get_mut(id).set_io(Some(IoKind::Read));
            nlook.add(id, &pool);
        }
        (nlook, pool)
    }

    #[test]
    fn full_queue_spills_into_a_new_one() {
        let (nlook, pool) = setup(2, &[100, 3000, 700]);
        let snap = nlook.snapshot(&pool);
        assert_eq!(snap.queues.len(), 2);
        assert_eq!(snap.queues[0], vec![(0, 100), (6, 3000)]);
        assert_eq!(snap.queues[1], vec![(1, 700)]);
    }

    #[test]
    fn never_drains_a_younger_queue_while_an_older_one_holds_requests() {
        let (mut nlook, mut pool) = setup(2, &[3000, 100, 700, 1500]);
        // Queues: [100, 3000] then [700, 1500].
        let mut order = Vec::new();
        let mut head = 0;
        while let Some(id) = nlook.next(head, &pool) {
            order.push(pool.get(id).sector().expect("bound"));
            head = pool.get(id).track().expect("bound");
            nlook.complete(&mut pool);
        }
        // Both first-queue sectors come before any second-queue sector.
        assert_eq!(order, vec![100, 3000, 700, 1500]);
    }

    #[test]
    fn sweep_wraps_to_queue_front_when_nothing_lies_ahead() {
        let (mut nlook, mut pool) = setup(10, &[100, 700]);
        // Head on track 6: both requests are behind, take the front.
        let id = nlook.next(6, &pool).expect("pending");
        assert_eq!(pool.get(id).sector(), Some(100));
        nlook.complete(&mut pool);
        assert!(nlook.has_pending());
    }

    #[test]
    fn empty_sub_queues_do_not_count_as_pending() {
        let (mut nlook, mut pool) = setup(10, &[100]);
        let _id = nlook.next(0, &pool).expect("pending");
        assert!(nlook.has_pending()); // active I/O still outstanding
        nlook.complete(&mut pool);
        assert!(!nlook.has_pending());
        assert_eq!(nlook.next(0, &pool), None);
    }
}
