use std::collections::HashMap;

use crate::model::disk::ms_to_us;
use crate::model::{BufferId, BufferPool, Disk, IoKind, Location, Sector};
use crate::policy::DiskPolicy;
use crate::trace::{TraceEvent, TraceSink};

/// The operation currently on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveIo {
    pub buffer: BufferId,
    pub op: IoKind,
    pub completes_at_us: u64,
}

/// Owns the single active I/O and forwards queued requests to the
/// scheduling policy. Also answers "is this sector already on its way?"
/// for the syscall layer.
pub struct DiskDriver {
    policy: DiskPolicy,
    current: Option<ActiveIo>,
    in_flight: HashMap<Sector, IoKind>,
}

impl DiskDriver {
    pub fn new(policy: DiskPolicy) -> Self {
        Self {
            policy,
            current: None,
            in_flight: HashMap::new(),
        }
    }

    /// Queues `op` for the buffer's sector.
    pub fn schedule(
        &mut self,
        id: BufferId,
        op: IoKind,
        pool: &mut BufferPool,
        trace: &mut dyn TraceSink,
    ) {
        if let Some(sector) = pool.get(id).sector() {
            self.in_flight.entry(sector).or_insert(op);
            trace.emit(TraceEvent::IoScheduled { sector, op });
        }
        pool.get_mut(id).set_location(Location::Driver);
        self.policy.add(id, op, pool);
        trace.emit(TraceEvent::PolicyState(self.policy.snapshot(pool)));
    }

    /// Starts the next queued I/O if the device is idle. The seek to the
    /// target track happens here, as a side effect of dispatch, so the
    /// policy's next pick sees the new head position.
    pub fn start_next(
        &mut self,
        now_us: u64,
        disk: &mut Disk,
        pool: &BufferPool,
        trace: &mut dyn TraceSink,
    ) -> Option<ActiveIo> {
        if self.current.is_some() {
            return None;
        }
        let id = self.policy.next(disk.current_track(), pool)?;
        let buf = pool.get(id);
        let op = buf.io()?;
        let target = buf.track().unwrap_or(0);
        let sector = buf.sector().unwrap_or(0);

        let (direct_ms, rewind_ms) = disk.seek_choice_ms(disk.current_track(), target);
        trace.emit(TraceEvent::SeekDecision {
            from: disk.current_track(),
            to: target,
            direct_us: ms_to_us(direct_ms),
            rewind_us: ms_to_us(rewind_ms),
        });

        let seek_ms = disk.seek_to(target);
        let total_ms = seek_ms + disk.rotation_delay_ms() + disk.sector_access_ms();
        let active = ActiveIo {
            buffer: id,
            op,
            completes_at_us: now_us + ms_to_us(total_ms),
        };
        self.current = Some(active);
        trace.emit(TraceEvent::IoStarted {
            sector,
            op,
            completes_at_us: active.completes_at_us,
        });
        Some(active)
    }

    /// Completes the active operation, releasing its sector and telling
    /// the policy. The buffer stays bound; the interrupt handler decides
    /// whether it enters the cache or the free list.
    pub fn complete(&mut self, pool: &mut BufferPool, trace: &mut dyn TraceSink) -> Option<ActiveIo> {
        let active = self.current.take()?;
        let sector = pool.get(active.buffer).sector();
        if let Some(sector) = sector {
            self.in_flight.remove(&sector);
        }
        self.policy.complete(pool);
        trace.emit(TraceEvent::IoCompleted {
            sector: sector.unwrap_or(0),
            op: active.op,
        });
        trace.emit(TraceEvent::PolicyState(self.policy.snapshot(pool)));
        Some(active)
    }

    pub fn in_flight(&self, sector: Sector) -> bool {
        self.in_flight.contains_key(&sector)
    }

    pub fn busy(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<ActiveIo> {
        self.current
    }

    pub fn has_pending(&self) -> bool {
        self.policy.has_pending()
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Policy, SimConfig};
    use crate::trace::NullSink;

    fn setup() -> (DiskDriver, Disk, BufferPool) {
        let config = SimConfig::default();
        let driver = DiskDriver::new(DiskPolicy::new(Policy::Fifo, &config));
        let disk = Disk::new(&config);
        let pool = BufferPool::new(4);
        (driver, disk, pool)
    }

    #[test]
    fn one_operation_at_a_time() {
        let (mut driver, mut disk, mut pool) = setup();
        let mut sink = NullSink;
        for (i, sector) in [100u32, 700].into_iter().enumerate() {
            let id = BufferId(i);
            pool.get_mut(id).load_sector(sector, sector / 500);
            driver.schedule(id, IoKind::Read, &mut pool, &mut sink);
        }
        assert!(driver.in_flight(100));
        assert!(driver.in_flight(700));

        let first = driver
            .start_next(0, &mut disk, &pool, &mut sink)
            .expect("queued");
        assert_eq!(first.buffer, BufferId(0));
        // Device busy: second dispatch refused until completion.
        assert!(driver.start_next(0, &mut disk, &pool, &mut sink).is_none());

        driver.complete(&mut pool, &mut sink);
        assert!(!driver.in_flight(100));
        let second = driver
            .start_next(first.completes_at_us, &mut disk, &pool, &mut sink)
            .expect("queued");
        assert_eq!(second.buffer, BufferId(1));
    }

    #[test]
    fn completion_time_covers_seek_rotation_and_transfer() {
        let (mut driver, mut disk, mut pool) = setup();
        let mut sink = NullSink;
        let id = BufferId(0);
        // Sector 1500 sits on track 3: 1.5 ms seek from track 0.
        pool.get_mut(id).load_sector(1500, 3);
        driver.schedule(id, IoKind::Read, &mut pool, &mut sink);

        let active = driver
            .start_next(1000, &mut disk, &pool, &mut sink)
            .expect("queued");
        // 1.5 ms seek + 4 ms rotation + 0.016 ms transfer, in µs.
        assert_eq!(active.completes_at_us, 1000 + 1500 + 4000 + 16);
        assert_eq!(disk.current_track(), 3);
        assert_eq!(disk.total_seeks(), 1);
    }
}
