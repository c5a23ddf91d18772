use crate::types::*;
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("unsupported config: {0}")]
    UnsupportedConfig(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Pull-side contract the host mixer sees: fixed channel count, fixed rate.
///
/// `read_block` is called from the audio thread and fills `out` with
/// interleaved signed 16-bit frames. It returns the number of frames written;
/// anything past that is left silent by the caller.
pub trait AudioSource: Send + Sync + 'static {
    fn channels(&self) -> u16;
    fn sample_rate_hz(&self) -> u32;
    fn read_block(&self, out: &mut [i16]) -> usize;
}

pub trait AudioStreamHandle: Send {
    fn close(self: Box<Self>);
}

pub trait AudioOutputPort: Send + Sync {
    fn list_outputs(&self) -> Result<Vec<AudioOutputDevice>, AudioError>;

    fn default_output(&self) -> Result<DeviceId, AudioError>;

    fn open_output(
        &self,
        device_id: &DeviceId,
        buffer_size_frames: Option<u32>,
        source: Arc<dyn AudioSource>,
    ) -> Result<Box<dyn AudioStreamHandle>, AudioError>;
}
