use mt32drv_ports::midi::MidiMessage;
use serde::{Deserialize, Serialize};

pub type Tick = i64; // musical time, monotonic within a song

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempoPoint {
    pub tick: Tick,
    pub us_per_quarter: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongEvent {
    pub tick: Tick,
    pub message: MidiMessage,
}

/// All tracks of a Standard MIDI File merged into one time-ordered stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Song {
    pub ppq: u16,
    pub tempo_map: Vec<TempoPoint>,
    pub events: Vec<SongEvent>,
}

impl Song {
    pub fn end_tick(&self) -> Tick {
        self.events.last().map(|event| event.tick).unwrap_or(0)
    }

    pub fn duration_micros(&self) -> i64 {
        TempoMap::new(self.ppq, self.tempo_map.clone()).tick_to_micros(self.end_tick())
    }
}

#[derive(Clone, Debug)]
pub struct TempoMap {
    ppq: u16,
    segments: Vec<TempoSegment>,
}

#[derive(Clone, Copy, Debug)]
struct TempoSegment {
    start_tick: Tick,
    start_us: i64,
    us_per_quarter: u32,
}

impl TempoMap {
    pub fn new(ppq: u16, mut points: Vec<TempoPoint>) -> Self {
        let ppq = ppq.max(1);
        points.sort_by_key(|p| p.tick);
        if points.is_empty() || points[0].tick != 0 {
            points.insert(
                0,
                TempoPoint {
                    tick: 0,
                    us_per_quarter: 500_000,
                },
            );
        }

        let mut segments = Vec::with_capacity(points.len());
        let mut current_us = 0i64;
        for (idx, point) in points.iter().enumerate() {
            if idx > 0 {
                let prev = &points[idx - 1];
                let delta_ticks = point.tick - prev.tick;
                current_us += ticks_to_us(delta_ticks, prev.us_per_quarter, ppq);
            }
            segments.push(TempoSegment {
                start_tick: point.tick,
                start_us: current_us,
                us_per_quarter: point.us_per_quarter.max(1),
            });
        }

        Self { ppq, segments }
    }

    pub fn tick_to_micros(&self, tick: Tick) -> i64 {
        let seg = self.segment_for_tick(tick);
        let delta_ticks = tick - seg.start_tick;
        seg.start_us + ticks_to_us(delta_ticks, seg.us_per_quarter, self.ppq)
    }

    pub fn micros_to_tick(&self, micros: i64) -> Tick {
        let seg = self.segment_for_micros(micros);
        let delta_us = micros - seg.start_us;
        seg.start_tick + us_to_ticks(delta_us, seg.us_per_quarter, self.ppq)
    }

    fn segment_for_tick(&self, tick: Tick) -> TempoSegment {
        let mut current = self.segments[0];
        for seg in &self.segments {
            if seg.start_tick > tick {
                break;
            }
            current = *seg;
        }
        current
    }

    fn segment_for_micros(&self, micros: i64) -> TempoSegment {
        let mut current = self.segments[0];
        for seg in &self.segments {
            if seg.start_us > micros {
                break;
            }
            current = *seg;
        }
        current
    }
}

fn ticks_to_us(ticks: Tick, us_per_quarter: u32, ppq: u16) -> i64 {
    ((ticks as i128 * us_per_quarter as i128) / ppq as i128) as i64
}

fn us_to_ticks(us: i64, us_per_quarter: u32, ppq: u16) -> Tick {
    ((us as i128 * ppq as i128) / us_per_quarter as i128) as Tick
}
