use crate::config::SimConfig;
use crate::model::{IoKind, OpKind, Sector, Track};

/// Cache segment contents at a point in time, hottest first. Entries are
/// `(track, sector)` bindings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CacheSnapshot {
    pub left: Vec<(Track, Sector)>,
    pub middle: Vec<(Track, Sector)>,
    pub right: Vec<(Track, Sector)>,
}

/// Policy queue contents at a point in time. FIFO and LOOK publish a
/// single queue; NLOOK publishes one entry per sub-queue, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySnapshot {
    pub name: &'static str,
    pub direction: Option<&'static str>,
    pub active: Option<(Track, Sector)>,
    pub queues: Vec<Vec<(Track, Sector)>>,
}

/// A structured trace event. The console sink renders these as the
/// narrative log; tests assert on the variants, never on strings.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    Settings(Box<SimConfig>),
    Iteration { now_us: u64 },

    ProcessAdded { process: String, program: Vec<(OpKind, Sector)> },
    ContextSwitch { process: String },
    UserMode { process: String },
    KernelMode { process: String },
    SyscallInvoked { process: String, op: OpKind, sector: Sector },
    UserPhase { process: String, spent_us: u64, completed: bool },
    SyscallPhase { process: String, spent_us: u64, completed: bool },
    ProcessBlocked { process: String, sector: Sector },
    ProcessUnblocked { process: String },
    ProcessPreempted { process: String },
    ProcessTerminated { process: String },

    CacheHit { sector: Sector },
    CacheMiss { sector: Sector },
    CacheInstalled { sector: Sector },
    CacheEvicted { sector: Sector, dirty: bool },
    BufferDirtied { process: String, sector: Sector },
    BufferFreed { sector: Sector },
    CacheState(CacheSnapshot),

    IoScheduled { sector: Sector, op: IoKind },
    AlreadyInFlight { sector: Sector },
    SeekDecision { from: Track, to: Track, direct_us: u64, rewind_us: u64 },
    IoStarted { sector: Sector, op: IoKind, completes_at_us: u64 },
    IoCompleted { sector: Sector, op: IoKind },
    PolicyState(PolicySnapshot),

    DiskInterrupt { now_us: u64 },
    InterruptHandled { spent_us: u64 },
    Idle { until_us: u64 },
    FlushBegin,
    NothingToDo,
}

/// Where the simulator's narrative goes. Injected so tests can record
/// events and benches can drop them.
pub trait TraceSink {
    fn emit(&mut self, event: TraceEvent);
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NullSink;

impl TraceSink for NullSink {
    fn emit(&mut self, _event: TraceEvent) {}
}

/// Collects events so tests can assert structure without matching strings.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<TraceEvent>,
}

impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&TraceEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl TraceSink for RecordingSink {
    fn emit(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

/// Renders the narrative log on stdout, one line-oriented entry per event,
/// tagged by the subsystem it came from.
#[derive(Debug, Default)]
pub struct ConsoleSink;

fn fmt_binding(b: (Track, Sector)) -> String {
    format!("({}:{})", b.0, b.1)
}

fn fmt_queue(queue: &[(Track, Sector)]) -> String {
    queue
        .iter()
        .map(|&b| fmt_binding(b))
        .collect::<Vec<_>>()
        .join(", ")
}

fn fmt_op(op: IoKind) -> &'static str {
    match op {
        IoKind::Read => "READ",
        IoKind::Write => "WRITE",
    }
}

impl TraceSink for ConsoleSink {
    fn emit(&mut self, event: TraceEvent) {
        match event {
            TraceEvent::Settings(config) => {
                println!("Settings:");
                println!("    syscall_read_time   {}", config.syscall_read_us);
                println!("    syscall_write_time  {}", config.syscall_write_us);
                println!("    disk_intr_time      {}", config.disk_intr_us);
                println!("    quantum_time        {}", config.quantum_us);
                println!("    before_writing_time {}", config.before_writing_us);
                println!("    after_reading_time  {}", config.after_reading_us);
                println!();
                println!("    buffers_num         {}", config.buffers_num);
                println!();
                println!("    tracks_num          {}", config.tracks_num);
                println!("    sectors_per_track   {}", config.sectors_per_track);
                println!("    track_seek_time     {}", crate::model::disk::ms_to_us(config.track_seek_ms));
                println!("    rewind_seek_time    {}", config.rewind_seek_ms as u64);
                println!();
                println!("    rotation_delay_time {}", crate::model::disk::ms_to_us(config.rotation_delay_ms()));
                println!("    sector_access_time  {}", crate::model::disk::ms_to_us(config.sector_access_ms()));
                println!();
            }
            TraceEvent::Iteration { now_us } => {
                println!();
                println!("SCHEDULER: {now_us} us (NEXT ITERATION)");
            }
            TraceEvent::ProcessAdded { process, program } => {
                let ops = program
                    .iter()
                    .map(|(op, sector)| {
                        let tag = match op {
                            OpKind::Read => 'r',
                            OpKind::Write => 'w',
                        };
                        format!("{{'{tag}',{sector}}}")
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                println!("SCHEDULER: Process `{process}` was added");
                println!("    {{{ops}}}");
            }
            TraceEvent::ContextSwitch { process } => {
                println!("SCHEDULER: Switch context to process `{process}`");
            }
            TraceEvent::UserMode { process } => {
                println!("SCHEDULER: User mode for process `{process}`");
            }
            TraceEvent::KernelMode { process } => {
                println!("SCHEDULER: Kernel mode (syscall) for process `{process}`");
            }
            TraceEvent::SyscallInvoked { process, op, sector } => {
                let call = match op {
                    OpKind::Read => "read",
                    OpKind::Write => "write",
                };
                println!("SCHEDULER: Process `{process}` invoked {call}() for sector {sector}");
            }
            TraceEvent::UserPhase { spent_us, completed, .. } => {
                let status = if completed { "completed" } else { "interrupted" };
                println!("... worked for {spent_us} us in user mode ({status})");
            }
            TraceEvent::SyscallPhase { spent_us, completed, .. } => {
                let status = if completed { ", request buffer cache" } else { " (interrupted)" };
                println!("... worked for {spent_us} us in system call{status}");
            }
            TraceEvent::ProcessBlocked { process, sector } => {
                println!("SCHEDULER: Block process `{process}` on sector {sector}");
            }
            TraceEvent::ProcessUnblocked { process } => {
                println!("SCHEDULER: Wake up process `{process}`");
            }
            TraceEvent::ProcessPreempted { process } => {
                println!("SCHEDULER: Quantum expired for process `{process}`, back to RunQ");
            }
            TraceEvent::ProcessTerminated { process } => {
                println!("SCHEDULER: Process `{process}` exited");
            }
            TraceEvent::CacheHit { sector } => {
                println!("CACHE: Buffer for sector {sector} found in cache");
            }
            TraceEvent::CacheMiss { sector } => {
                println!("CACHE: Buffer for sector {sector} not found in cache");
            }
            TraceEvent::CacheInstalled { sector } => {
                println!("CACHE: Buffer for sector {sector} added to cache");
            }
            TraceEvent::CacheEvicted { sector, dirty } => {
                println!("CACHE: Buffer for sector {sector} removed from cache");
                if dirty {
                    println!("SCHEDULER: This buffer was modified, will write it");
                } else {
                    println!("SCHEDULER: This buffer was not modified, will reuse it");
                }
            }
            TraceEvent::BufferDirtied { process, sector } => {
                println!("SCHEDULER: Process `{process}` modified buffer for sector {sector}");
            }
            TraceEvent::BufferFreed { sector } => {
                println!("CACHE: Put free buffer (sector {sector} written)");
            }
            TraceEvent::CacheState(snapshot) => {
                println!("CACHE: Buffer cache LFU:");
                println!("    List 1 (Left)   [{}]", fmt_queue(&snapshot.left));
                println!("    List 2 (Middle) [{}]", fmt_queue(&snapshot.middle));
                println!("    List 3 (Right)  [{}]", fmt_queue(&snapshot.right));
            }
            TraceEvent::IoScheduled { sector, op } => {
                println!("DRIVER: Buffer for sector {sector} scheduled for I/O ({})", fmt_op(op));
            }
            TraceEvent::AlreadyInFlight { sector } => {
                println!("SCHEDULER: But the buffer for sector {sector} is already scheduled for I/O");
            }
            TraceEvent::SeekDecision { from, to, direct_us, rewind_us } => {
                println!("DRIVER: Best move decision for tracks {from} => {to}");
                if direct_us == 0 {
                    println!("    not to move, that is 0 us");
                } else {
                    println!("    direct move time {direct_us} us, move time with rewind {rewind_us} us");
                }
            }
            TraceEvent::IoStarted { sector, op, completes_at_us } => {
                println!(
                    "DRIVER: Started I/O ({}) for sector {sector}, interrupt at {completes_at_us} us",
                    fmt_op(op)
                );
            }
            TraceEvent::IoCompleted { sector, op } => {
                println!("DRIVER: Interrupt from disk");
                println!("DRIVER: Completed I/O ({}) for sector {sector}", fmt_op(op));
            }
            TraceEvent::PolicyState(snapshot) => {
                println!("DRIVER: Device strategy {}:", snapshot.name);
                if let Some(direction) = snapshot.direction {
                    println!("    Direction {direction}");
                }
                let active = snapshot.active.map(fmt_binding).unwrap_or_else(|| "None".into());
                println!("    Active buffer {active}");
                if snapshot.queues.len() == 1 {
                    println!("    Schedule queue [{}]", fmt_queue(&snapshot.queues[0]));
                } else {
                    for (i, queue) in snapshot.queues.iter().enumerate() {
                        println!("    Schedule queue {} [{}]", i + 1, fmt_queue(queue));
                    }
                }
            }
            TraceEvent::DiskInterrupt { .. } => {
                println!("SCHEDULER: Disk interrupt handler was invoked");
            }
            TraceEvent::InterruptHandled { spent_us } => {
                println!("... worked for {spent_us} us in disk interrupt handler");
            }
            TraceEvent::Idle { until_us } => {
                println!("SCHEDULER: RunQ is empty");
                println!("SCHEDULER: Scheduler has nothing to do until {until_us} us");
            }
            TraceEvent::FlushBegin => {
                println!("SCHEDULER: All processes completed");
                println!("SCHEDULER: Flushing buffer cache");
            }
            TraceEvent::NothingToDo => {
                println!("SCHEDULER: Scheduler has nothing to do, exit");
            }
        }
    }
}
