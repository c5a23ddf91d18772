const FIXP_SHIFT: u32 = 16;

/// Splits rendering into segments that end on timer ticks.
///
/// Positions are 16.16 fixed point frames so that rates which are not an
/// integer multiple of the tick frequency do not drift.
#[derive(Clone, Copy, Debug)]
pub struct TickClock {
    samples_per_tick: u64,
    next_tick: u64,
}

impl TickClock {
    /// `base_freq_hz` must be in `1..=sample_rate_hz`.
    pub fn new(sample_rate_hz: u32, base_freq_hz: u32) -> Option<Self> {
        if base_freq_hz == 0 || base_freq_hz > sample_rate_hz {
            return None;
        }
        let whole = (sample_rate_hz / base_freq_hz) as u64;
        let rest = (sample_rate_hz % base_freq_hz) as u64;
        let samples_per_tick = (whole << FIXP_SHIFT) + (rest << FIXP_SHIFT) / base_freq_hz as u64;
        Some(Self {
            samples_per_tick,
            // The first tick fires before anything is rendered.
            next_tick: 0,
        })
    }

    /// Frames that can be rendered before the next tick, capped at `max_frames`.
    pub fn frames_until_tick(&self, max_frames: usize) -> usize {
        let whole = (self.next_tick >> FIXP_SHIFT) as usize;
        whole.min(max_frames)
    }

    /// Accounts for `frames` rendered frames. Returns true when a tick is due.
    pub fn advance(&mut self, frames: usize) -> bool {
        self.next_tick = self
            .next_tick
            .saturating_sub((frames as u64) << FIXP_SHIFT);
        if self.next_tick >> FIXP_SHIFT == 0 {
            self.next_tick += self.samples_per_tick;
            return true;
        }
        false
    }

    pub fn samples_per_tick(&self) -> f64 {
        self.samples_per_tick as f64 / (1u64 << FIXP_SHIFT) as f64
    }
}
