use std::collections::VecDeque;

use crate::model::{BufferId, BufferPool};
use crate::trace::PolicySnapshot;

/// First-in, first-out: requests are served strictly in arrival order.
/// Never reorders, never optimizes arm movement.
#[derive(Debug, Default)]
pub struct Fifo {
    queue: VecDeque<BufferId>,
    active: Option<BufferId>,
}

impl Fifo {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, id: BufferId) {
        self.queue.push_back(id);
    }

    pub(crate) fn next(&mut self) -> Option<BufferId> {
        let id = self.queue.pop_front()?;
        self.active = Some(id);
        Some(id)
    }

    pub(crate) fn complete(&mut self, pool: &mut BufferPool) {
        if let Some(id) = self.active.take() {
            pool.get_mut(id).set_io(None);
        }
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.queue.is_empty() || self.active.is_some()
    }

    pub(crate) fn snapshot(&self, pool: &BufferPool) -> PolicySnapshot {
        let queue: Vec<BufferId> = self.queue.iter().copied().collect();
        PolicySnapshot {
            name: "FIFO",
            direction: None,
            active: self.active.and_then(|id| pool.get(id).binding()),
            queues: vec![super::bindings(pool, &queue)],
        }
    }
}
