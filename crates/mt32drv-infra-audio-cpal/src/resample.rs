use mt32drv_ports::audio::AudioSource;
use std::sync::Arc;

const PULL_FRAMES: usize = 256;

/// Pulls stereo i16 frames from an [`AudioSource`] and hands them out as f32
/// at the device rate, interpolating linearly between source frames.
pub struct SourceResampler {
    source: Arc<dyn AudioSource>,
    step: f64,
    frac: f64,
    prev: [f32; 2],
    next: [f32; 2],
    block: Vec<i16>,
    cursor: usize,
    primed: bool,
}

impl SourceResampler {
    pub fn new(source: Arc<dyn AudioSource>, device_rate_hz: u32) -> Self {
        let step = source.sample_rate_hz() as f64 / device_rate_hz.max(1) as f64;
        let channels = source.channels().max(1) as usize;
        Self {
            source,
            step,
            frac: 0.0,
            prev: [0.0; 2],
            next: [0.0; 2],
            block: vec![0; PULL_FRAMES * channels],
            cursor: PULL_FRAMES,
            primed: false,
        }
    }

    /// Source frames consumed per device frame.
    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        if !self.primed {
            self.prev = self.pull_frame();
            self.next = self.pull_frame();
            self.primed = true;
        }

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let t = self.frac as f32;
            *l = self.prev[0] + (self.next[0] - self.prev[0]) * t;
            *r = self.prev[1] + (self.next[1] - self.prev[1]) * t;

            self.frac += self.step;
            while self.frac >= 1.0 {
                self.frac -= 1.0;
                self.prev = self.next;
                self.next = self.pull_frame();
            }
        }
    }

    fn pull_frame(&mut self) -> [f32; 2] {
        let channels = self.source.channels().max(1) as usize;
        if self.cursor >= PULL_FRAMES {
            let written = self.source.read_block(&mut self.block).min(PULL_FRAMES);
            self.block[written * channels..].fill(0);
            self.cursor = 0;
        }

        let base = self.cursor * channels;
        self.cursor += 1;
        let l = i16_to_f32(self.block[base]);
        let r = if channels > 1 {
            i16_to_f32(self.block[base + 1])
        } else {
            l
        };
        [l, r]
    }
}

fn i16_to_f32(value: i16) -> f32 {
    value as f32 / i16::MAX as f32
}
