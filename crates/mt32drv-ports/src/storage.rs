use crate::types::*;
use serde::{Deserialize, Serialize};

fn default_midi_gain() -> u32 {
    100
}

fn default_channel_mask() -> ChannelMask {
    ChannelMask::ALL
}

fn default_base_freq_hz() -> u32 {
    10_000
}

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serde(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDto {
    pub selected_midi_in: Option<DeviceId>,
    pub selected_audio_out: Option<DeviceId>,
    pub audio_buffer_size_frames: Option<u32>,
    /// Percent; 100 is unity output gain.
    #[serde(default = "default_midi_gain")]
    pub midi_gain: u32,
    #[serde(default = "default_channel_mask")]
    pub channel_mask: ChannelMask,
    /// Searched for firmware before the working directory.
    pub extra_rom_path: Option<String>,
    /// Queue sends and replay them from the render thread.
    pub threaded_dispatch: bool,
    #[serde(default = "default_base_freq_hz")]
    pub base_freq_hz: u32,
}

impl Default for SettingsDto {
    fn default() -> Self {
        Self {
            selected_midi_in: None,
            selected_audio_out: None,
            audio_buffer_size_frames: None,
            midi_gain: 100,
            channel_mask: ChannelMask::ALL,
            extra_rom_path: None,
            threaded_dispatch: false,
            base_freq_hz: 10_000,
        }
    }
}

pub trait StoragePort: Send + Sync {
    fn load_settings(&self) -> Result<SettingsDto, StorageError>;
    fn save_settings(&self, s: &SettingsDto) -> Result<(), StorageError>;
}
