use crate::types::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Explicit System Exclusive start byte.
pub const SYSEX_START: u8 = 0xF0;
/// System Exclusive terminator.
pub const SYSEX_END: u8 = 0xF7;

/// A MIDI performance message as accepted by the driver.
///
/// Short messages are packed little-endian into one word:
/// `status | data1 << 8 | data2 << 16`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidiMessage {
    Short(u32),
    /// Either a framed message starting with `0xF0` or an unframed payload.
    SysEx(Vec<u8>),
}

impl MidiMessage {
    pub fn short(status: u8, data1: u8, data2: u8) -> Self {
        MidiMessage::Short(pack_short(status, data1, data2))
    }
}

pub fn pack_short(status: u8, data1: u8, data2: u8) -> u32 {
    status as u32 | ((data1 & 0x7F) as u32) << 8 | ((data2 & 0x7F) as u32) << 16
}

/// Splits a packed short message back into `(status, data1, data2)`.
pub fn unpack_short(word: u32) -> (u8, u8, u8) {
    (
        (word & 0xFF) as u8,
        ((word >> 8) & 0x7F) as u8,
        ((word >> 16) & 0x7F) as u8,
    )
}

#[derive(thiserror::Error, Debug)]
pub enum MidiError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("rejected message: {0}")]
    Rejected(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Anything that accepts performance messages (the driver, or a test recorder).
pub trait MidiOutput: Send + Sync {
    fn send_message(&self, message: &MidiMessage) -> Result<(), MidiError>;
}

/// Raw input from MIDI devices.
#[derive(Clone, Debug)]
pub struct InputEvent {
    pub at: Instant,
    pub message: MidiMessage,
}

/// MIDI input stream handle: drop closes it.
pub trait MidiInputStream: Send {
    fn close(self: Box<Self>);
}

pub type InputEventCallback = Arc<dyn Fn(InputEvent) + Send + Sync + 'static>;

pub trait MidiInputPort: Send + Sync {
    fn list_inputs(&self) -> Result<Vec<MidiInputDevice>, MidiError>;

    /// Open input stream: implementation should invoke cb from a background thread/callback.
    fn open_input(
        &self,
        device_id: &DeviceId,
        cb: InputEventCallback,
    ) -> Result<Box<dyn MidiInputStream>, MidiError>;
}
