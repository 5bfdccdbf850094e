use serde::{Deserialize, Serialize};

/// System and drive configuration.
///
/// All times are in the unit their suffix says: `_ms` fields describe the
/// mechanical disk, `_us` fields the CPU-side costs charged to the virtual
/// clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    // Hard disk geometry
    pub tracks_num: u32,
    pub sectors_per_track: u32,
    pub track_seek_ms: f64,
    pub rewind_seek_ms: f64,
    pub rotation_speed_rpm: u32,

    // Buffer cache
    pub buffers_num: usize,

    // System call costs
    pub syscall_read_us: u64,
    pub syscall_write_us: u64,
    pub disk_intr_us: u64,

    // Process scheduler
    pub quantum_us: u64,
    pub before_writing_us: u64,
    pub after_reading_us: u64,

    // Segmented LFU
    pub lfu_left_max: usize,
    pub lfu_middle_max: usize,

    // LOOK
    pub look_track_read_max: u32,

    // NLOOK
    pub nlook_queue_max_len: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tracks_num: 10_000,
            sectors_per_track: 500,
            track_seek_ms: 0.5,
            rewind_seek_ms: 10.0,
            rotation_speed_rpm: 7_500,
            buffers_num: 10,
            syscall_read_us: 150,
            syscall_write_us: 150,
            disk_intr_us: 50,
            quantum_us: 20_000,
            before_writing_us: 7_000,
            after_reading_us: 7_000,
            lfu_left_max: 3,
            lfu_middle_max: 2,
            look_track_read_max: 1,
            nlook_queue_max_len: 10,
        }
    }
}

impl SimConfig {
    /// Average rotational delay in ms (half a revolution).
    pub fn rotation_delay_ms(&self) -> f64 {
        (60_000.0 / f64::from(self.rotation_speed_rpm)) / 2.0
    }

    /// Single-sector transfer time in ms.
    pub fn sector_access_ms(&self) -> f64 {
        (60_000.0 / f64::from(self.rotation_speed_rpm)) / f64::from(self.sectors_per_track)
    }
}

/// Disk scheduling policy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Policy {
    Fifo,
    Look,
    Nlook,
}

impl std::str::FromStr for Policy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fifo" => Ok(Policy::Fifo),
            "look" => Ok(Policy::Look),
            "nlook" => Ok(Policy::Nlook),
            _ => Err(anyhow::anyhow!("Invalid scheduling policy: {}", s)),
        }
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Policy::Fifo => write!(f, "FIFO"),
            Policy::Look => write!(f, "LOOK"),
            Policy::Nlook => write!(f, "NLOOK"),
        }
    }
}
