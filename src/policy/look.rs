use crate::config::SimConfig;
use crate::model::{BufferId, BufferPool, Track};
use crate::trace::PolicySnapshot;

use super::track_of;

/// Sweep direction: `Out` toward higher track numbers, `In` toward zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Out,
    In,
}

impl Direction {
    fn flip(self) -> Self {
        match self {
            Direction::Out => Direction::In,
            Direction::In => Direction::Out,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Direction::Out => "OUT",
            Direction::In => "IN",
        }
    }
}

/// Elevator sweep bounded by the outermost pending request, with a
/// per-track budget so a burst on one track cannot starve distant sectors.
pub struct Look {
    queue: Vec<BufferId>,
    active: Option<BufferId>,
    direction: Direction,

    track_read_max: u32,
    budget_track: Option<Track>,
    budget_used: u32,
}

impl Look {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            queue: Vec::new(),
            active: None,
            direction: Direction::Out,
            track_read_max: config.look_track_read_max,
            budget_track: None,
            budget_used: 0,
        }
    }

    /// Enqueues and keeps the queue sorted by sector number.
    pub(crate) fn add(&mut self, id: BufferId, pool: &BufferPool) {
        self.queue.push(id);
        self.queue.sort_by_key(|&b| pool.get(b).sector());
    }

    /// First queued request that matches the sweep direction and has
    /// track budget left; when none does, the sweep reverses.
    pub(crate) fn next(&mut self, head_track: Track, pool: &BufferPool) -> Option<BufferId> {
        if self.queue.is_empty() {
            return None;
        }
        match self.scan(head_track, pool) {
            Some(pos) => {
                let id = self.queue.remove(pos);
                self.spend_budget(track_of(pool, id));
                self.active = Some(id);
                Some(id)
            }
            None => self.reverse_and_take(pool),
        }
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
        PolicySnapshot {
            name: "LOOK",
            direction: Some(self.direction.label()),
            active: self.active.and_then(|id| pool.get(id).binding()),
            queues: vec![super::bindings(pool, &self.queue)],
        }
    }

    fn scan(&self, head_track: Track, pool: &BufferPool) -> Option<usize> {
        self.queue.iter().position(|&id| {
            let track = track_of(pool, id);
            // A saturated track is skipped outright, whatever the direction.
            if Some(track) == self.budget_track && self.budget_used >= self.track_read_max {
                return false;
            }
            match self.direction {
                Direction::Out => track >= head_track,
                Direction::In => track <= head_track,
            }
        })
    }

    fn spend_budget(&mut self, track: Track) {
        if Some(track) == self.budget_track {
            self.budget_used += 1;
        } else {
            self.budget_track = Some(track);
            self.budget_used = 1;
        }
    }

    /// Nothing serviceable ahead: flip direction, forget the budget, and
    /// take the outermost request of the new sweep.
    fn reverse_and_take(&mut self, pool: &BufferPool) -> Option<BufferId> {
        if self.queue.is_empty() {
            return None;
        }
        self.direction = self.direction.flip();
        let pos = match self.direction {
            Direction::Out => 0,
            Direction::In => self.queue.len() - 1,
        };
        let id = self.queue.remove(pos);
        self.budget_track = Some(track_of(pool, id));
        self.budget_used = 1;
        self.active = Some(id);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IoKind;

    fn setup(track_read_max: u32, sectors: &[u32]) -> (Look, BufferPool) {
        let config = SimConfig {
            look_track_read_max: track_read_max,
            ..SimConfig::default()
        };
        let mut pool = BufferPool::new(sectors.len());
        let mut look = Look::new(&config);
        for (i, &sector) in sectors.iter().enumerate() {
            let id = BufferId(i);
            pool.get_mut(id).load_sector(sector, sector / 500);
            pool.get_mut(id).set_io(Some(IoKind::Read));
            look.add(id, &pool);
        }
        (look, pool)
    }

    fn drain_sectors(look: &mut Look, pool: &mut BufferPool, head: Track) -> Vec<u32> {
        let mut order = Vec::new();
        let mut head = head;
        while let Some(id) = look.next(head, pool) {
            let sector = pool.get(id).sector().expect("bound");
            head = pool.get(id).track().expect("bound");
            order.push(sector);
            look.complete(pool);
        }
        order
    }

    #[test]
    fn track_budget_forces_reaching_the_far_request_first() {
        // Tracks 0, 0, 3 with a budget of one access per track: the
        // second track-0 request must wait for the return sweep.
        let (mut look, mut pool) = setup(1, &[100, 110, 1500]);
        assert_eq!(drain_sectors(&mut look, &mut pool, 0), vec![100, 1500, 110]);
    }

    #[test]
    fn budget_of_two_serves_both_track_zero_requests_first() {
        let (mut look, mut pool) = setup(2, &[100, 110, 1500]);
        assert_eq!(drain_sectors(&mut look, &mut pool, 0), vec![100, 110, 1500]);
    }

    #[test]
    fn sweeps_outward_in_sector_order() {
        let (mut look, mut pool) = setup(10, &[2000, 100, 900]);
        assert_eq!(drain_sectors(&mut look, &mut pool, 0), vec![100, 900, 2000]);
    }

    #[test]
    fn reverses_when_no_request_lies_ahead() {
        // Head starts past every request: the outward scan fails, the
        // sweep flips inward and takes the highest sector.
        let (mut look, mut pool) = setup(10, &[100, 900]);
        assert_eq!(drain_sectors(&mut look, &mut pool, 50), vec![900, 100]);
    }
}
