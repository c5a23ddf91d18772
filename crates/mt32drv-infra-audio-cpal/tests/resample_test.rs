use mt32drv_infra_audio_cpal::SourceResampler;
use mt32drv_ports::audio::AudioSource;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicI16, Ordering};
use std::sync::Arc;

/// Stereo ramp: left counts up by 100 per frame, right is its negation.
struct Ramp {
    next: AtomicI16,
    rate: u32,
}

impl Ramp {
    fn new(rate: u32) -> Arc<Self> {
        Arc::new(Self {
            next: AtomicI16::new(0),
            rate,
        })
    }
}

impl AudioSource for Ramp {
    fn channels(&self) -> u16 {
        2
    }

    fn sample_rate_hz(&self) -> u32 {
        self.rate
    }

    fn read_block(&self, out: &mut [i16]) -> usize {
        for frame in out.chunks_exact_mut(2) {
            let value = self.next.fetch_add(100, Ordering::SeqCst);
            frame[0] = value;
            frame[1] = -value;
        }
        out.len() / 2
    }
}

fn to_i16(values: &[f32]) -> Vec<i16> {
    values
        .iter()
        .map(|v| (v * i16::MAX as f32).round() as i16)
        .collect()
}

#[test]
fn matching_rates_pass_frames_through() {
    let mut reader = SourceResampler::new(Ramp::new(32_000), 32_000);
    assert_eq!(reader.step(), 1.0);

    let mut left = vec![0.0; 4];
    let mut right = vec![0.0; 4];
    reader.render(&mut left, &mut right);
    assert_eq!(to_i16(&left), vec![0, 100, 200, 300]);
    assert_eq!(to_i16(&right), vec![0, -100, -200, -300]);
}

#[test]
fn upsampling_interpolates_between_frames() {
    let mut reader = SourceResampler::new(Ramp::new(32_000), 64_000);
    assert_eq!(reader.step(), 0.5);

    let mut left = vec![0.0; 6];
    let mut right = vec![0.0; 6];
    reader.render(&mut left, &mut right);
    assert_eq!(to_i16(&left), vec![0, 50, 100, 150, 200, 250]);
}

#[test]
fn downsampling_skips_frames() {
    let mut reader = SourceResampler::new(Ramp::new(32_000), 16_000);
    let mut left = vec![0.0; 4];
    let mut right = vec![0.0; 4];
    reader.render(&mut left, &mut right);
    assert_eq!(to_i16(&left), vec![0, 200, 400, 600]);
}
