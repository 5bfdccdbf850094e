pub mod buffer;
pub mod disk;
pub mod process;

pub use buffer::{Buffer, BufferId, BufferPool, IoKind, Location};
pub use disk::Disk;
pub use process::{OpKind, ProcId, ProcState, Process};

/// Logical sector number (linear block address).
pub type Sector = u32;
/// Track number, 0 at the outer edge.
pub type Track = u32;
