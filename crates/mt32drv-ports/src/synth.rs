use crate::firmware::FirmwareImage;
use std::sync::Arc;

/// The emulated device renders at this rate; rate conversion is the host's job.
pub const ENGINE_SAMPLE_RATE_HZ: u32 = 32_000;

/// Interleaved stereo output.
pub const ENGINE_CHANNELS: u16 = 2;

#[derive(thiserror::Error, Debug)]
pub enum SynthError {
    #[error("rom image rejected: {0}")]
    RomRejected(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Side channel the engine uses to report what return values cannot carry.
///
/// The two `on_error_*` callbacks are fatal: an implementation must record
/// them so that initialization aborts. Everything else is informational and
/// must return promptly; the default bodies ignore the event.
pub trait ReportHandler: Send + Sync {
    fn print_debug(&self, message: &str);

    /// Control ROM image missing or invalid.
    fn on_error_control_rom(&self);
    /// Wave-table (PCM) ROM image missing.
    fn on_error_pcm_rom(&self);

    fn show_lcd_message(&self, _message: &str) {}
    fn on_device_reset(&self) {}
    fn on_device_reconfig(&self) {}
    fn on_new_reverb_mode(&self, _mode: u8) {}
    fn on_new_reverb_time(&self, _time: u8) {}
    fn on_new_reverb_level(&self, _level: u8) {}
    fn on_part_state_changed(&self, _part: u8, _is_active: bool) {}
    fn on_poly_state_changed(&self, _part: u8) {}
    fn on_partial_state_changed(&self, _partial: u16, _old_phase: u8, _new_phase: u8) {}
    fn on_program_changed(&self, _part: u8, _patch_name: &str) {}
}

/// Wave-table synthesis engine, driven by message injection and polled for samples.
///
/// All calls come from whichever context holds the driver's session lock;
/// implementations need not be internally synchronized.
pub trait SynthEngine: Send {
    fn open(&mut self, control: &FirmwareImage, pcm: &FirmwareImage) -> Result<(), SynthError>;
    fn close(&mut self);

    fn play_short_message(&mut self, message: u32);
    /// `message` starts with `0xF0`.
    fn play_sysex(&mut self, message: &[u8]);
    /// `payload` has no `0xF0`/`0xF7` framing.
    fn play_sysex_unframed(&mut self, payload: &[u8]);

    /// Writes `frames` interleaved stereo frames into `out`.
    fn render(&mut self, out: &mut [i16], frames: usize);

    fn set_output_gain(&mut self, gain: f32);
    fn set_reverb_output_gain(&mut self, gain: f32);
}

/// Builds an engine bound to a report channel. Called once per `open()`.
pub trait SynthEngineFactory: Send + Sync {
    fn create(&self, report: Arc<dyn ReportHandler>) -> Box<dyn SynthEngine>;
}

impl<F> SynthEngineFactory for F
where
    F: Fn(Arc<dyn ReportHandler>) -> Box<dyn SynthEngine> + Send + Sync,
{
    fn create(&self, report: Arc<dyn ReportHandler>) -> Box<dyn SynthEngine> {
        (self)(report)
    }
}
