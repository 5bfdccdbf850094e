use serde::Serialize;

use crate::cache::LfuCache;
use crate::config::{Policy, SimConfig};
use crate::driver::DiskDriver;
use crate::error::SimError;
use crate::model::{BufferPool, Disk, IoKind, OpKind, ProcId, Process, Sector};
use crate::policy::DiskPolicy;
use crate::scheduler::ProcScheduler;
use crate::syscall::Kernel;
use crate::trace::{TraceEvent, TraceSink};

/// Hard cap on outer-loop iterations; hitting it means the run diverged.
const MAX_ITERATIONS: u32 = 1000;

/// Aggregate results of one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunStats {
    pub elapsed_us: u64,
    pub total_seeks: u64,
    pub seek_time_ms: f64,
}

/// Event-driven simulator of the block-I/O subsystem.
///
/// Owns every component and a virtual clock in µs. Each outer-loop
/// iteration services a due disk interrupt, or picks a process, or runs
/// one phase of the current process. A phase that would run past the next
/// interrupt is cut short: the consumed slice is charged to the clock and
/// quantum, the remainder stays on the process, and the interrupt fires on
/// the next iteration.
pub struct Simulator {
    config: SimConfig,
    disk: Disk,
    pool: BufferPool,
    cache: LfuCache,
    driver: DiskDriver,
    sched: ProcScheduler,
    procs: Vec<Process>,

    now_us: u64,
    next_interrupt_us: Option<u64>,
}

impl Simulator {
    pub fn new(config: SimConfig, policy: Policy) -> Self {
        let disk = Disk::new(&config);
        let pool = BufferPool::new(config.buffers_num);
        let cache = LfuCache::new(&config, &pool);
        let driver = DiskDriver::new(DiskPolicy::new(policy, &config));
        let sched = ProcScheduler::new(config.quantum_us);
        Self {
            config,
            disk,
            pool,
            cache,
            driver,
            sched,
            procs: Vec::new(),
            now_us: 0,
            next_interrupt_us: None,
        }
    }

    pub fn add_process(&mut self, process: Process) -> ProcId {
        let id = ProcId(self.procs.len());
        self.procs.push(process);
        self.sched.add(id, &mut self.procs);
        id
    }

    /// Runs the workload to completion, including the shutdown flush of
    /// dirty buffers, and returns the aggregate statistics.
    pub fn run(&mut self, trace: &mut dyn TraceSink) -> Result<RunStats, SimError> {
        trace.emit(TraceEvent::Settings(Box::new(self.config.clone())));
        for p in &self.procs {
            trace.emit(TraceEvent::ProcessAdded {
                process: p.name.clone(),
                program: p.program.clone(),
            });
        }

        let mut iterations = 0u32;
        loop {
            iterations += 1;
            if iterations > MAX_ITERATIONS {
                return Err(SimError::Runaway { iterations });
            }
            trace.emit(TraceEvent::Iteration { now_us: self.now_us });

            if self.service_interrupt(trace) {
                continue;
            }

            if self.sched.current().is_none() {
                if self.sched.has_ready() {
                    if let Some(id) = self.sched.schedule_next(&mut self.procs) {
                        trace.emit(TraceEvent::ContextSwitch {
                            process: self.procs[id.0].name.clone(),
                        });
                    }
                } else if self.sched.has_live_processes()
                    || self.driver.busy()
                    || self.driver.has_pending()
                {
                    // Everyone is waiting on the disk: sleep to the interrupt.
                    let Some(until) = self.next_interrupt_us else {
                        return Err(SimError::Deadlock);
                    };
                    trace.emit(TraceEvent::Idle { until_us: until });
                    self.now_us = until;
                    continue;
                } else {
                    self.flush(trace)?;
                    break;
                }
            }

            let Some(id) = self.sched.current() else {
                continue;
            };
            let Some((op, sector)) = self.procs[id.0].next_op() else {
                trace.emit(TraceEvent::ProcessTerminated {
                    process: self.procs[id.0].name.clone(),
                });
                self.sched.terminate_current(&mut self.procs);
                continue;
            };
            match op {
                OpKind::Read => self.step_read(id, sector, trace)?,
                OpKind::Write => self.step_write(id, sector, trace)?,
            }
        }

        trace.emit(TraceEvent::Iteration { now_us: self.now_us });
        trace.emit(TraceEvent::NothingToDo);
        Ok(self.stats())
    }

    pub fn stats(&self) -> RunStats {
        RunStats {
            elapsed_us: self.now_us,
            total_seeks: self.disk.total_seeks(),
            seek_time_ms: self.disk.total_seek_time_ms(),
        }
    }

    pub fn now_us(&self) -> u64 {
        self.now_us
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn disk(&self) -> &Disk {
        &self.disk
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    pub fn cache(&self) -> &LfuCache {
        &self.cache
    }

    pub fn processes(&self) -> &[Process] {
        &self.procs
    }

    /// Services a due interrupt. READ completions install the buffer and
    /// wake the processes waiting on that sector; WRITE completions free
    /// the buffer and wake everyone, since any of them may now be able to
    /// acquire it.
    fn service_interrupt(&mut self, trace: &mut dyn TraceSink) -> bool {
        let Some(due) = self.next_interrupt_us else {
            return false;
        };
        if self.now_us < due {
            return false;
        }
        trace.emit(TraceEvent::DiskInterrupt { now_us: self.now_us });
        self.next_interrupt_us = None;

        let Some(active) = self.driver.complete(&mut self.pool, trace) else {
            return true;
        };
        match active.op {
            IoKind::Read => {
                let sector = self.pool.get(active.buffer).sector().unwrap_or(0);
                self.cache.insert_completed(active.buffer, &mut self.pool);
                trace.emit(TraceEvent::CacheInstalled { sector });
                trace.emit(TraceEvent::CacheState(self.cache.snapshot(&self.pool)));
                self.wake_waiters_on(sector, trace);
            }
            IoKind::Write => {
                let sector = self.pool.get(active.buffer).sector().unwrap_or(0);
                self.pool.get_mut(active.buffer).reset();
                self.cache.put_free(active.buffer, &mut self.pool);
                trace.emit(TraceEvent::BufferFreed { sector });
                self.wake_all(trace);
            }
        }

        let handler_us = self.config.disk_intr_us;
        self.now_us += handler_us;
        self.consume_quantum(handler_us, trace);
        trace.emit(TraceEvent::InterruptHandled {
            spent_us: handler_us,
        });

        self.start_next_io(trace);
        true
    }

    fn wake_waiters_on(&mut self, sector: Sector, trace: &mut dyn TraceSink) {
        let waiters: Vec<ProcId> = self
            .sched
            .blocked()
            .iter()
            .copied()
            .filter(|&p| self.procs[p.0].blocked_on == Some(sector))
            .collect();
        for id in waiters {
            self.wake(id, trace);
        }
    }

    fn wake_all(&mut self, trace: &mut dyn TraceSink) {
        let waiters: Vec<ProcId> = self.sched.blocked().to_vec();
        for id in waiters {
            self.wake(id, trace);
        }
    }

    fn wake(&mut self, id: ProcId, trace: &mut dyn TraceSink) {
        self.procs[id.0].blocked_on = None;
        self.sched.unblock(id, &mut self.procs);
        trace.emit(TraceEvent::ProcessUnblocked {
            process: self.procs[id.0].name.clone(),
        });
    }

    fn start_next_io(&mut self, trace: &mut dyn TraceSink) {
        if let Some(active) = self
            .driver
            .start_next(self.now_us, &mut self.disk, &self.pool, trace)
        {
            self.next_interrupt_us = Some(active.completes_at_us);
        }
    }

    /// Consumes up to `want` µs of the current phase, stopping at the next
    /// interrupt. Returns the slice actually consumed and whether the
    /// phase was cut short.
    fn consume_slice(&mut self, want: u64, trace: &mut dyn TraceSink) -> (u64, bool) {
        let take = match self.next_interrupt_us {
            Some(due) if self.now_us + want > due => due.saturating_sub(self.now_us),
            _ => want,
        };
        self.now_us += take;
        self.consume_quantum(take, trace);
        (take, take < want)
    }

    fn consume_quantum(&mut self, dt_us: u64, trace: &mut dyn TraceSink) {
        let running = self.sched.current();
        if self.sched.consume(dt_us, &mut self.procs) {
            if let Some(id) = running {
                trace.emit(TraceEvent::ProcessPreempted {
                    process: self.procs[id.0].name.clone(),
                });
            }
        }
    }

    /// One phase of a read step: the syscall phase, then (on a hit or
    /// after the sector arrived) the user-mode completion phase.
    fn step_read(&mut self, id: ProcId, sector: Sector, trace: &mut dyn TraceSink) -> Result<(), SimError> {
        let name = self.procs[id.0].name.clone();

        // Resume the post-read user phase if one is outstanding.
        let after = self.procs[id.0].after_read_remaining_us;
        if after > 0 {
            trace.emit(TraceEvent::UserMode {
                process: name.clone(),
            });
            let (spent, cut) = self.consume_slice(after, trace);
            self.procs[id.0].after_read_remaining_us = after - spent;
            trace.emit(TraceEvent::UserPhase {
                process: name,
                spent_us: spent,
                completed: !cut,
            });
            if !cut {
                self.procs[id.0].advance();
            }
            return Ok(());
        }

        let mut remaining = self.procs[id.0].syscall_remaining_us;
        if remaining == 0 {
            // Fresh step: enter the kernel.
            trace.emit(TraceEvent::UserMode {
                process: name.clone(),
            });
            trace.emit(TraceEvent::SyscallInvoked {
                process: name.clone(),
                op: OpKind::Read,
                sector,
            });
            remaining = self.config.syscall_read_us;
        }
        trace.emit(TraceEvent::KernelMode {
            process: name.clone(),
        });
        let (spent, cut) = self.consume_slice(remaining, trace);
        self.procs[id.0].syscall_remaining_us = remaining - spent;
        trace.emit(TraceEvent::SyscallPhase {
            process: name.clone(),
            spent_us: spent,
            completed: !cut,
        });
        if cut {
            return Ok(());
        }

        // Kernel work done: consult the cache.
        let result = self.kernel().sys_read(&name, sector, trace)?;
        if result.hit {
            self.procs[id.0].after_read_remaining_us = self.config.after_reading_us;
        } else if result.blocked {
            self.block_current_on(sector, trace);
            self.start_next_io(trace);
        }
        Ok(())
    }

    /// One phase of a write step: the user-mode preparation phase, then
    /// the syscall phase.
    fn step_write(&mut self, id: ProcId, sector: Sector, trace: &mut dyn TraceSink) -> Result<(), SimError> {
        let name = self.procs[id.0].name.clone();

        // A non-zero syscall remainder means preparation already finished.
        let remaining = self.procs[id.0].syscall_remaining_us;
        if remaining > 0 {
            trace.emit(TraceEvent::KernelMode {
                process: name.clone(),
            });
            let (spent, cut) = self.consume_slice(remaining, trace);
            self.procs[id.0].syscall_remaining_us = remaining - spent;
            trace.emit(TraceEvent::SyscallPhase {
                process: name.clone(),
                spent_us: spent,
                completed: !cut,
            });
            if cut {
                return Ok(());
            }

            let result = self.kernel().sys_write(&name, sector, trace)?;
            if result.hit {
                self.procs[id.0].advance();
            } else if result.blocked {
                self.block_current_on(sector, trace);
                self.start_next_io(trace);
            }
            return Ok(());
        }

        // User-mode data preparation, fresh or resumed.
        let mut prep = self.procs[id.0].before_write_remaining_us;
        if prep == 0 {
            prep = self.config.before_writing_us;
        }
        trace.emit(TraceEvent::UserMode {
            process: name.clone(),
        });
        let (spent, cut) = self.consume_slice(prep, trace);
        self.procs[id.0].before_write_remaining_us = prep - spent;
        trace.emit(TraceEvent::UserPhase {
            process: name.clone(),
            spent_us: spent,
            completed: !cut,
        });
        if !cut {
            // Preparation done; the write() call itself runs next.
            trace.emit(TraceEvent::SyscallInvoked {
                process: name,
                op: OpKind::Write,
                sector,
            });
            self.procs[id.0].syscall_remaining_us = self.config.syscall_write_us;
        }
        Ok(())
    }

    /// Blocks the current process on a sector. If the quantum expired on
    /// the very slice that finished the syscall, the process was already
    /// preempted and simply retries the call from the ready queue.
    fn block_current_on(&mut self, sector: Sector, trace: &mut dyn TraceSink) {
        let Some(id) = self.sched.current() else {
            return;
        };
        self.procs[id.0].blocked_on = Some(sector);
        self.sched.block_current(&mut self.procs);
        trace.emit(TraceEvent::ProcessBlocked {
            process: self.procs[id.0].name.clone(),
            sector,
        });
    }

    fn kernel(&mut self) -> Kernel<'_> {
        Kernel {
            config: &self.config,
            cache: &mut self.cache,
            driver: &mut self.driver,
            disk: &mut self.disk,
            pool: &mut self.pool,
        }
    }

    /// Shutdown flush: write back every dirty cached buffer, recycle the
    /// clean ones, then drain the queue to idle.
    fn flush(&mut self, trace: &mut dyn TraceSink) -> Result<(), SimError> {
        debug_assert!(
            self.sched.blocked().is_empty(),
            "flush reached with blocked processes"
        );
        trace.emit(TraceEvent::FlushBegin);

        for id in self.cache.drain_all(&mut self.pool) {
            let buf = self.pool.get(id);
            let Some(sector) = buf.sector() else {
                continue;
            };
            let dirty = buf.dirty();
            trace.emit(TraceEvent::CacheEvicted { sector, dirty });
            if dirty {
                self.driver.schedule(id, IoKind::Write, &mut self.pool, trace);
            } else {
                self.pool.get_mut(id).reset();
                self.cache.put_free(id, &mut self.pool);
            }
        }

        while self.driver.has_pending() || self.driver.busy() {
            self.start_next_io(trace);
            let Some(until) = self.next_interrupt_us else {
                return Err(SimError::Deadlock);
            };
            trace.emit(TraceEvent::Iteration { now_us: self.now_us });
            trace.emit(TraceEvent::Idle { until_us: until });
            self.now_us = until;
            self.next_interrupt_us = None;

            trace.emit(TraceEvent::DiskInterrupt { now_us: self.now_us });
            if let Some(active) = self.driver.complete(&mut self.pool, trace) {
                let sector = self.pool.get(active.buffer).sector().unwrap_or(0);
                self.pool.get_mut(active.buffer).reset();
                self.cache.put_free(active.buffer, &mut self.pool);
                trace.emit(TraceEvent::BufferFreed { sector });
                self.now_us += self.config.disk_intr_us;
                trace.emit(TraceEvent::InterruptHandled {
                    spent_us: self.config.disk_intr_us,
                });
            }
        }
        Ok(())
    }
}
