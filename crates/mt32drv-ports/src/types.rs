use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of addressable MIDI channels.
pub const CHANNEL_COUNT: usize = 16;

/// Logical channel reserved for percussion.
pub const PERCUSSION_CHANNEL: u8 = 9;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub String);

/// Logical MIDI channel index, always 0..=15.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChannelId(u8);

impl ChannelId {
    pub fn new(index: u8) -> Option<Self> {
        if (index as usize) < CHANNEL_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    pub fn percussion() -> Self {
        Self(PERCUSSION_CHANNEL)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn is_percussion(self) -> bool {
        self.0 == PERCUSSION_CHANNEL
    }
}

/// 16-bit enable set over the logical channels; bit n enables channel n.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelMask(pub u16);

impl ChannelMask {
    pub const ALL: ChannelMask = ChannelMask(0xFFFF);

    pub fn contains(self, channel: ChannelId) -> bool {
        self.0 & (1 << channel.index()) != 0
    }

    pub fn bits(self) -> u16 {
        self.0
    }
}

impl Default for ChannelMask {
    fn default() -> Self {
        Self::ALL
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MidiInputDevice {
    pub id: DeviceId,
    pub name: String,
    pub is_available: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AudioOutputDevice {
    pub id: DeviceId,
    pub name: String,
    pub default_config: AudioConfig,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate_hz: u32,
    pub channels: u16, // driver output is always 2
    pub buffer_size_frames: Option<u32>,
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
