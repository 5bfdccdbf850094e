use crate::config::SimConfig;

use super::{Sector, Track};

/// Converts a mechanical time in ms to virtual-clock µs.
pub fn ms_to_us(ms: f64) -> u64 {
    (ms * 1000.0).round() as u64
}

/// Single-spindle rotating disk: immutable geometry, the mechanism's
/// current position, and running seek counters.
#[derive(Debug)]
pub struct Disk {
    tracks_num: u32,
    sectors_per_track: u32,
    track_seek_ms: f64,
    rewind_seek_ms: f64,
    rotation_delay_ms: f64,
    sector_access_ms: f64,

    current_track: Track,

    total_seeks: u64,
    total_seek_time_ms: f64,
}

impl Disk {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            tracks_num: config.tracks_num,
            sectors_per_track: config.sectors_per_track,
            track_seek_ms: config.track_seek_ms,
            rewind_seek_ms: config.rewind_seek_ms,
            rotation_delay_ms: config.rotation_delay_ms(),
            sector_access_ms: config.sector_access_ms(),
            current_track: 0,
            total_seeks: 0,
            total_seek_time_ms: 0.0,
        }
    }

    /// Track holding the given logical sector.
    pub fn track_of(&self, sector: Sector) -> Track {
        sector / self.sectors_per_track
    }

    /// Cost of both ways of reaching `to`: stepping the arm directly, or
    /// rewinding to track 0 and stepping out.
    pub fn seek_choice_ms(&self, from: Track, to: Track) -> (f64, f64) {
        let direct = f64::from(from.abs_diff(to)) * self.track_seek_ms;
        let rewind = self.rewind_seek_ms + f64::from(to) * self.track_seek_ms;
        (direct, rewind)
    }

    /// Seek cost in ms; the arm takes whichever way is faster.
    pub fn seek_time_ms(&self, from: Track, to: Track) -> f64 {
        let (direct, rewind) = self.seek_choice_ms(from, to);
        direct.min(rewind)
    }

    /// Moves the mechanism to `track` and returns the seek cost in ms.
    pub fn seek_to(&mut self, track: Track) -> f64 {
        debug_assert!(track < self.tracks_num);
        let cost = self.seek_time_ms(self.current_track, track);
        self.current_track = track;
        self.total_seeks += 1;
        self.total_seek_time_ms += cost;
        cost
    }

    pub fn current_track(&self) -> Track {
        self.current_track
    }

    pub fn tracks_num(&self) -> u32 {
        self.tracks_num
    }

    pub fn rotation_delay_ms(&self) -> f64 {
        self.rotation_delay_ms
    }

    pub fn sector_access_ms(&self) -> f64 {
        self.sector_access_ms
    }

    pub fn total_seeks(&self) -> u64 {
        self.total_seeks
    }

    pub fn total_seek_time_ms(&self) -> f64 {
        self.total_seek_time_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk() -> Disk {
        Disk::new(&SimConfig::default())
    }

    #[test]
    fn sector_maps_to_track_by_integer_division() {
        let d = disk();
        assert_eq!(d.track_of(0), 0);
        assert_eq!(d.track_of(499), 0);
        assert_eq!(d.track_of(500), 1);
        assert_eq!(d.track_of(1500), 3);
    }

    #[test]
    fn seek_picks_rewind_when_it_is_faster() {
        let d = disk();
        // From track 9000 to track 10: direct is 8990 * 0.5 ms,
        // rewind is 10 + 10 * 0.5 ms.
        assert_eq!(d.seek_time_ms(9000, 10), 15.0);
        // Nearby target: direct wins.
        assert_eq!(d.seek_time_ms(10, 12), 1.0);
    }

    #[test]
    fn seek_to_accumulates_counters() {
        let mut d = disk();
        let first = d.seek_to(4);
        let second = d.seek_to(4);
        assert_eq!(first, 2.0);
        assert_eq!(second, 0.0);
        assert_eq!(d.current_track(), 4);
        assert_eq!(d.total_seeks(), 2);
        assert_eq!(d.total_seek_time_ms(), 2.0);
    }

    #[test]
    fn ms_converts_to_rounded_us() {
        assert_eq!(ms_to_us(0.5), 500);
        assert_eq!(ms_to_us(0.016), 16);
        assert_eq!(ms_to_us(4.0), 4000);
    }
}
