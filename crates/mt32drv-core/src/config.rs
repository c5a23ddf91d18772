use crate::firmware::RomNames;
use mt32drv_ports::storage::SettingsDto;
use mt32drv_ports::types::ChannelMask;
use serde::{Deserialize, Serialize};

/// Reverb output runs this much quieter than the dry output.
pub const REVERB_GAIN_RATIO: f32 = 0.68;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchMode {
    /// Messages go to the engine on the caller's thread.
    Direct,
    /// Messages are queued and replayed by the render thread.
    Queued,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriverConfig {
    pub output_gain: f32,
    pub reverb_output_gain: f32,
    pub channel_mask: ChannelMask,
    pub dispatch: DispatchMode,
    /// Timer callback frequency; a higher value means shorter render segments.
    pub base_freq_hz: u32,
    pub control_rom: RomNames,
    pub pcm_rom: RomNames,
}

impl DriverConfig {
    pub fn from_settings(settings: &SettingsDto) -> Self {
        let gain = settings.midi_gain as f32 / 100.0;
        Self {
            output_gain: gain,
            reverb_output_gain: REVERB_GAIN_RATIO * gain,
            channel_mask: settings.channel_mask,
            dispatch: if settings.threaded_dispatch {
                DispatchMode::Queued
            } else {
                DispatchMode::Direct
            },
            base_freq_hz: settings.base_freq_hz,
            ..Self::default()
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            output_gain: 1.0,
            reverb_output_gain: REVERB_GAIN_RATIO,
            channel_mask: ChannelMask::ALL,
            dispatch: DispatchMode::Direct,
            base_freq_hz: 10_000,
            control_rom: RomNames::control(),
            pcm_rom: RomNames::pcm(),
        }
    }
}
