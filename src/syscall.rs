use crate::cache::LfuCache;
use crate::config::SimConfig;
use crate::driver::DiskDriver;
use crate::error::SimError;
use crate::model::{BufferId, BufferPool, Disk, IoKind, Sector};
use crate::trace::{TraceEvent, TraceSink};

/// Outcome of a read/write system call. `time_us` is the nominal in-kernel
/// cost; clock and quantum accounting stay with the caller, which may have
/// charged the time in interrupt-truncated slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallResult {
    pub hit: bool,
    pub time_us: u64,
    pub blocked: bool,
}

/// Borrowed view of the kernel state a system call operates on.
pub struct Kernel<'a> {
    pub config: &'a SimConfig,
    pub cache: &'a mut LfuCache,
    pub driver: &'a mut DiskDriver,
    pub disk: &'a mut Disk,
    pub pool: &'a mut BufferPool,
}

impl Kernel<'_> {
    /// read(): consult the cache; on a miss, arrange for the sector to be
    /// brought in and tell the caller to block the process.
    pub fn sys_read(
        &mut self,
        process: &str,
        sector: Sector,
        trace: &mut dyn TraceSink,
    ) -> Result<SyscallResult, SimError> {
        self.lookup(process, sector, false, self.config.syscall_read_us, trace)
    }

    /// write(): on a hit the buffer is dirtied in place. On a miss the
    /// sector is still read first (read-before-write); the dirty mark
    /// happens when the call is retried after the READ completes.
    pub fn sys_write(
        &mut self,
        process: &str,
        sector: Sector,
        trace: &mut dyn TraceSink,
    ) -> Result<SyscallResult, SimError> {
        self.lookup(process, sector, true, self.config.syscall_write_us, trace)
    }

    fn lookup(
        &mut self,
        process: &str,
        sector: Sector,
        mark_dirty: bool,
        time_us: u64,
        trace: &mut dyn TraceSink,
    ) -> Result<SyscallResult, SimError> {
        if let Some(id) = self.cache.find(sector) {
            trace.emit(TraceEvent::CacheHit { sector });
            self.cache.access(sector, self.pool);
            if mark_dirty {
                self.pool.get_mut(id).mark_dirty();
                trace.emit(TraceEvent::BufferDirtied {
                    process: process.to_string(),
                    sector,
                });
            }
            trace.emit(TraceEvent::CacheState(self.cache.snapshot(self.pool)));
            return Ok(SyscallResult {
                hit: true,
                time_us,
                blocked: false,
            });
        }

        trace.emit(TraceEvent::CacheMiss { sector });

        // The sector may already be on its way in (or out); piggyback on
        // that I/O instead of issuing another.
        if self.driver.in_flight(sector) {
            trace.emit(TraceEvent::AlreadyInFlight { sector });
            return Ok(SyscallResult {
                hit: false,
                time_us,
                blocked: true,
            });
        }

        let Some(id) = self.acquire_buffer(trace)? else {
            // A dirty victim's write-back was scheduled instead; the
            // process blocks and retries once some I/O completes.
            return Ok(SyscallResult {
                hit: false,
                time_us,
                blocked: true,
            });
        };

        let track = self.disk.track_of(sector);
        self.pool.get_mut(id).load_sector(sector, track);
        self.driver.schedule(id, IoKind::Read, self.pool, trace);
        Ok(SyscallResult {
            hit: false,
            time_us,
            blocked: true,
        })
    }

    /// A free buffer, or a clean eviction victim; `None` when the victim
    /// was dirty and had to be written back first.
    fn acquire_buffer(&mut self, trace: &mut dyn TraceSink) -> Result<Option<BufferId>, SimError> {
        let id = self.cache.get_free(self.pool)?;
        let buf = self.pool.get(id);
        let evicted = buf.sector();
        let dirty = buf.dirty();
        if let Some(sector) = evicted {
            trace.emit(TraceEvent::CacheEvicted { sector, dirty });
            trace.emit(TraceEvent::CacheState(self.cache.snapshot(self.pool)));
            if dirty {
                self.driver.schedule(id, IoKind::Write, self.pool, trace);
                return Ok(None);
            }
        }
        Ok(Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Policy;
    use crate::policy::DiskPolicy;
    use crate::trace::RecordingSink;

    struct Parts {
        config: SimConfig,
        cache: LfuCache,
        driver: DiskDriver,
        disk: Disk,
        pool: BufferPool,
    }

    fn setup(config: SimConfig) -> Parts {
        let pool = BufferPool::new(config.buffers_num);
        let cache = LfuCache::new(&config, &pool);
        let driver = DiskDriver::new(DiskPolicy::new(Policy::Fifo, &config));
        let disk = Disk::new(&config);
        Parts {
            config,
            cache,
            driver,
            disk,
            pool,
        }
    }

    fn kernel(parts: &mut Parts) -> Kernel<'_> {
        Kernel {
            config: &parts.config,
            cache: &mut parts.cache,
            driver: &mut parts.driver,
            disk: &mut parts.disk,
            pool: &mut parts.pool,
        }
    }

    #[test]
    fn read_miss_schedules_a_read_and_blocks() {
        let mut parts = setup(SimConfig::default());
        let mut sink = RecordingSink::default();

        let res = kernel(&mut parts).sys_read("yyy", 100, &mut sink).unwrap();
        assert_eq!(
            res,
            SyscallResult {
                hit: false,
                time_us: 150,
                blocked: true
            }
        );
        assert!(parts.driver.in_flight(100));
        assert_eq!(
            sink.count(|e| matches!(e, TraceEvent::IoScheduled { op: IoKind::Read, .. })),
            1
        );
    }

    #[test]
    fn second_caller_piggybacks_on_the_inflight_read() {
        let mut parts = setup(SimConfig::default());
        let mut sink = RecordingSink::default();

        kernel(&mut parts).sys_read("yyy", 100, &mut sink).unwrap();
        let res = kernel(&mut parts).sys_read("qqq", 100, &mut sink).unwrap();
        assert!(res.blocked);
        // Still exactly one scheduled I/O.
        assert_eq!(
            sink.count(|e| matches!(e, TraceEvent::IoScheduled { .. })),
            1
        );
    }

    #[test]
    fn write_hit_marks_dirty() {
        let mut parts = setup(SimConfig::default());
        let mut sink = RecordingSink::default();

        // Install sector 100 by hand, as the interrupt path would.
        let id = parts.cache.get_free(&mut parts.pool).unwrap();
        parts.pool.get_mut(id).load_sector(100, 0);
        parts.cache.insert_completed(id, &mut parts.pool);

        let res = kernel(&mut parts).sys_write("yyy", 100, &mut sink).unwrap();
        assert!(res.hit);
        assert!(!res.blocked);
        assert!(parts.pool.get(id).dirty());
        assert_eq!(parts.pool.get(id).access_counter(), 2);
    }

    #[test]
    fn write_miss_issues_a_read_not_a_write() {
        let mut parts = setup(SimConfig::default());
        let mut sink = RecordingSink::default();

        let res = kernel(&mut parts).sys_write("yyy", 100, &mut sink).unwrap();
        assert!(!res.hit);
        assert!(res.blocked);
        // Read-before-write: the buffer is populated first and not yet dirty.
        assert_eq!(
            sink.count(|e| matches!(e, TraceEvent::IoScheduled { op: IoKind::Read, .. })),
            1
        );
        assert_eq!(
            sink.count(|e| matches!(e, TraceEvent::IoScheduled { op: IoKind::Write, .. })),
            0
        );
    }

    #[test]
    fn dirty_eviction_schedules_write_back_and_blocks() {
        let config = SimConfig {
            buffers_num: 1,
            lfu_left_max: 0,
            lfu_middle_max: 0,
            ..SimConfig::default()
        };
        let mut parts = setup(config);
        let mut sink = RecordingSink::default();

        // One dirty cached sector occupies the only buffer.
        let id = parts.cache.get_free(&mut parts.pool).unwrap();
        parts.pool.get_mut(id).load_sector(100, 0);
        parts.cache.insert_completed(id, &mut parts.pool);
        parts.pool.get_mut(id).mark_dirty();

        let res = kernel(&mut parts).sys_read("yyy", 700, &mut sink).unwrap();
        assert!(res.blocked);
        // The victim's write-back went out; the read for 700 did not yet.
        assert!(parts.driver.in_flight(100));
        assert!(!parts.driver.in_flight(700));
        assert_eq!(
            sink.count(|e| matches!(e, TraceEvent::IoScheduled { op: IoKind::Write, .. })),
            1
        );
    }
}
