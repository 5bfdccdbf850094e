use std::collections::{HashMap, VecDeque};

use crate::config::SimConfig;
use crate::error::SimError;
use crate::model::{BufferId, BufferPool, Location, Sector};
use crate::trace::CacheSnapshot;

/// Segmented-LFU buffer cache.
///
/// Three ordered segments form a promotion ladder left → middle → right:
/// an accessed buffer moves to the front of `left`, overflow demotes
/// segment tails one step down, and eviction takes the least-counted
/// buffer from `right`. The cache never performs I/O itself; callers of
/// [`LfuCache::get_free`] inspect the victim's dirty bit and schedule the
/// write-back.
pub struct LfuCache {
    left_max: usize,
    middle_max: usize,

    left: VecDeque<BufferId>,
    middle: VecDeque<BufferId>,
    right: VecDeque<BufferId>,

    free: Vec<BufferId>,
    by_sector: HashMap<Sector, BufferId>,
}

impl LfuCache {
    /// All of the pool's buffers start on the free list.
    pub fn new(config: &SimConfig, pool: &BufferPool) -> Self {
        Self {
            left_max: config.lfu_left_max,
            middle_max: config.lfu_middle_max,
            left: VecDeque::new(),
            middle: VecDeque::new(),
            right: VecDeque::new(),
            free: pool.ids().collect(),
            by_sector: HashMap::new(),
        }
    }

    pub fn find(&self, sector: Sector) -> Option<BufferId> {
        self.by_sector.get(&sector).copied()
    }

    /// Hit path: bump the buffer's counter and move it to the front of
    /// the left segment, wherever it currently sits.
    pub fn access(&mut self, sector: Sector, pool: &mut BufferPool) -> Option<BufferId> {
        let id = self.find(sector)?;
        self.remove_from_segment(id, pool);
        pool.get_mut(id).touch();
        self.push_left(id, pool);
        Some(id)
    }

    /// Pops a free buffer, or evicts the coldest evictable buffer from
    /// the right segment. Fails only when every right-segment buffer is
    /// undergoing I/O.
    pub fn get_free(&mut self, pool: &mut BufferPool) -> Result<BufferId, SimError> {
        if let Some(id) = self.free.pop() {
            return Ok(id);
        }
        self.evict_from_right(pool)
    }

    /// Installs a buffer whose READ just completed; it is not yet indexed.
    pub fn insert_completed(&mut self, id: BufferId, pool: &mut BufferPool) {
        let Some(sector) = pool.get(id).sector() else {
            return;
        };
        if self.by_sector.contains_key(&sector) {
            return;
        }
        self.by_sector.insert(sector, id);
        self.push_left(id, pool);
    }

    /// Returns a buffer to the free list after a completed write-back.
    pub fn put_free(&mut self, id: BufferId, pool: &mut BufferPool) {
        pool.get_mut(id).set_location(Location::Free);
        self.free.push(id);
    }

    /// Empties every segment and the index, returning the ids left-to-right.
    /// Used by the shutdown flush.
    pub fn drain_all(&mut self, pool: &mut BufferPool) -> Vec<BufferId> {
        let ids: Vec<BufferId> = self
            .left
            .drain(..)
            .chain(self.middle.drain(..))
            .chain(self.right.drain(..))
            .collect();
        self.by_sector.clear();
        for &id in &ids {
            pool.get_mut(id).set_location(Location::Free);
        }
        ids
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn cached_count(&self) -> usize {
        self.left.len() + self.middle.len() + self.right.len()
    }

    /// Segment contents for the trace, front-to-back.
    pub fn snapshot(&self, pool: &BufferPool) -> CacheSnapshot {
        let bindings = |ids: &VecDeque<BufferId>| {
            ids.iter()
                .filter_map(|&id| pool.get(id).binding())
                .collect::<Vec<_>>()
        };
        CacheSnapshot {
            left: bindings(&self.left),
            middle: bindings(&self.middle),
            right: bindings(&self.right),
        }
    }

    fn remove_from_segment(&mut self, id: BufferId, pool: &BufferPool) {
        let segment = match pool.get(id).location() {
            Location::Left => &mut self.left,
            Location::Middle => &mut self.middle,
            Location::Right => &mut self.right,
            Location::Free | Location::Driver => return,
        };
        if let Some(pos) = segment.iter().position(|&b| b == id) {
            segment.remove(pos);
        }
    }

    fn push_left(&mut self, id: BufferId, pool: &mut BufferPool) {
        pool.get_mut(id).set_location(Location::Left);
        self.left.push_front(id);
        if self.left.len() > self.left_max {
            if let Some(demoted) = self.left.pop_back() {
                self.push_middle(demoted, pool);
            }
        }
    }

    fn push_middle(&mut self, id: BufferId, pool: &mut BufferPool) {
        pool.get_mut(id).set_location(Location::Middle);
        self.middle.push_front(id);
        if self.middle.len() > self.middle_max {
            if let Some(demoted) = self.middle.pop_back() {
                self.push_right(demoted, pool);
            }
        }
    }

    fn push_right(&mut self, id: BufferId, pool: &mut BufferPool) {
        pool.get_mut(id).set_location(Location::Right);
        self.right.push_front(id);
    }

    /// Least-counted buffer with no pending I/O; on ties, the first in
    /// front-to-back order wins.
    fn evict_from_right(&mut self, pool: &mut BufferPool) -> Result<BufferId, SimError> {
        let mut victim: Option<(usize, u32)> = None;
        for (pos, &id) in self.right.iter().enumerate() {
            let buf = pool.get(id);
            if buf.io().is_some() {
                continue;
            }
            match victim {
                Some((_, best)) if buf.access_counter() >= best => {}
                _ => victim = Some((pos, buf.access_counter())),
            }
        }
        let (pos, _) = victim.ok_or(SimError::NoEvictableBuffer)?;
        let Some(id) = self.right.remove(pos) else {
            return Err(SimError::NoEvictableBuffer);
        };
        if let Some(sector) = pool.get(id).sector() {
            self.by_sector.remove(&sector);
        }
        pool.get_mut(id).set_location(Location::Free);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IoKind;

    fn setup(buffers: usize, left_max: usize, middle_max: usize) -> (LfuCache, BufferPool) {
        let config = SimConfig {
            buffers_num: buffers,
            lfu_left_max: left_max,
            lfu_middle_max: middle_max,
            ..SimConfig::default()
        };
        let pool = BufferPool::new(buffers);
        let cache = LfuCache::new(&config, &pool);
        (cache, pool)
    }

    /// Allocates, binds and installs a buffer, as the interrupt path does.
    fn install(cache: &mut LfuCache, pool: &mut BufferPool, sector: Sector) -> BufferId {
        let id = cache.get_free(pool).expect("buffer available");
        pool.get_mut(id).load_sector(sector, sector / 500);
        cache.insert_completed(id, pool);
        id
    }

    #[test]
    fn find_after_install() {
        let (mut cache, mut pool) = setup(4, 3, 2);
        let id = install(&mut cache, &mut pool, 100);
        assert_eq!(cache.find(100), Some(id));
        assert_eq!(cache.find(200), None);
    }

    #[test]
    fn access_promotes_to_left_front_and_counts() {
        let (mut cache, mut pool) = setup(4, 2, 2);
        let a = install(&mut cache, &mut pool, 100);
        let _b = install(&mut cache, &mut pool, 200);

        let hit = cache.access(100, &mut pool).expect("cached");
        assert_eq!(hit, a);
        assert_eq!(pool.get(a).access_counter(), 2);
        assert_eq!(pool.get(a).location(), Location::Left);
        let snap = cache.snapshot(&pool);
        assert_eq!(snap.left.first(), Some(&(0, 100)));
    }

    #[test]
    fn overflow_demotes_tails_down_the_ladder() {
        let (mut cache, mut pool) = setup(6, 2, 1);
        for sector in [100, 200, 300, 400, 500] {
            install(&mut cache, &mut pool, sector);
        }
        let snap = cache.snapshot(&pool);
        // Inserted 100..500; left holds the 2 newest, middle 1, rest right.
        assert_eq!(snap.left.len(), 2);
        assert_eq!(snap.middle.len(), 1);
        assert_eq!(snap.right.len(), 2);
        assert_eq!(snap.left[0], (1, 500));
        assert_eq!(snap.right.last(), Some(&(0, 100)));
    }

    #[test]
    fn eviction_takes_least_counted_from_right() {
        let (mut cache, mut pool) = setup(3, 0, 0);
        // With zero-capped hot segments everything lands in right.
        install(&mut cache, &mut pool, 100);
        install(&mut cache, &mut pool, 200);
        install(&mut cache, &mut pool, 300);
        // Heat up 100 and 300.
        cache.access(100, &mut pool);
        cache.access(300, &mut pool);

        let victim = cache.get_free(&mut pool).expect("evictable");
        assert_eq!(pool.get(victim).sector(), Some(200));
        assert_eq!(cache.find(200), None);
    }

    #[test]
    fn eviction_skips_buffers_in_io() {
        let (mut cache, mut pool) = setup(2, 0, 0);
        let a = install(&mut cache, &mut pool, 100);
        let b = install(&mut cache, &mut pool, 200);
        // 100 is colder but busy.
        cache.access(200, &mut pool);
        pool.get_mut(a).set_io(Some(IoKind::Write));

        let victim = cache.get_free(&mut pool).expect("evictable");
        assert_eq!(victim, b);
    }

    #[test]
    fn eviction_fails_when_every_right_buffer_is_busy() {
        let (mut cache, mut pool) = setup(1, 0, 0);
        let a = install(&mut cache, &mut pool, 100);
        pool.get_mut(a).set_io(Some(IoKind::Read));
        assert_eq!(cache.get_free(&mut pool), Err(SimError::NoEvictableBuffer));
    }

    #[test]
    fn buffer_accounting_is_conserved() {
        let (mut cache, mut pool) = setup(4, 3, 2);
        install(&mut cache, &mut pool, 100);
        install(&mut cache, &mut pool, 200);
        assert_eq!(cache.free_count() + cache.cached_count(), pool.len());

        let id = cache.get_free(&mut pool).expect("free");
        assert_eq!(cache.free_count() + cache.cached_count(), pool.len() - 1);
        pool.get_mut(id).reset();
        cache.put_free(id, &mut pool);
        assert_eq!(cache.free_count() + cache.cached_count(), pool.len());
    }

    #[test]
    fn drain_returns_everything_and_clears_index() {
        let (mut cache, mut pool) = setup(4, 1, 1);
        for sector in [100, 200, 300] {
            install(&mut cache, &mut pool, sector);
        }
        let drained = cache.drain_all(&mut pool);
        assert_eq!(drained.len(), 3);
        assert_eq!(cache.cached_count(), 0);
        assert_eq!(cache.find(100), None);
    }
}
