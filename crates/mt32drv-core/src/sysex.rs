use mt32drv_ports::midi::SYSEX_START;

pub const ROLAND_ID: u8 = 0x41;
pub const MT32_MODEL_ID: u8 = 0x16;
pub const CMD_DATA_SET: u8 = 0x12;

/// Highest pitch-bend range (semitones) the device documents.
pub const MAX_PITCH_BEND_RANGE: u8 = 24;

/// Parameter address of the bender range setting.
pub const BENDER_RANGE_ADDRESS: [u8; 3] = [0x00, 0x00, 0x04];

/// Value that brings the sum of `data` to a multiple of 128.
pub fn checksum(data: &[u8]) -> u8 {
    let sum = data.iter().fold(0u32, |acc, byte| acc + *byte as u32);
    ((128 - sum % 128) % 128) as u8
}

/// Roland "data set" frame without `F0`/`F7` framing:
/// manufacturer, device channel, model, command, address, payload, checksum.
pub fn build_control_message(device_channel: u8, address: [u8; 3], payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(8 + payload.len());
    frame.extend_from_slice(&[ROLAND_ID, device_channel, MT32_MODEL_ID, CMD_DATA_SET]);
    frame.extend_from_slice(&address);
    frame.extend_from_slice(payload);
    let checksum = checksum(&frame[4..]);
    frame.push(checksum);
    frame
}

/// Builds the bender range frame. Out-of-range values are logged but still encoded;
/// the device decides whether to accept them.
pub fn pitch_bend_range_message(channel: u8, range: u8) -> Vec<u8> {
    if range > MAX_PITCH_BEND_RANGE {
        tracing::warn!("set_pitch_bend_range() called with range > {}: {}", MAX_PITCH_BEND_RANGE, range);
    }
    build_control_message(channel, BENDER_RANGE_ADDRESS, &[range])
}

/// A SysEx message whose framing has been decided by its first byte.
///
/// Only [`SysEx::classify`] creates these, so a framed message can never reach
/// the unframed entry point or the other way round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SysEx<'a> {
    Framed(&'a [u8]),
    Unframed(&'a [u8]),
}

impl<'a> SysEx<'a> {
    pub fn classify(bytes: &'a [u8]) -> Option<Self> {
        match bytes.first() {
            None => None,
            Some(&SYSEX_START) => Some(SysEx::Framed(bytes)),
            Some(_) => Some(SysEx::Unframed(bytes)),
        }
    }

    pub fn bytes(&self) -> &'a [u8] {
        match self {
            SysEx::Framed(bytes) | SysEx::Unframed(bytes) => bytes,
        }
    }

    pub fn is_framed(&self) -> bool {
        matches!(self, SysEx::Framed(_))
    }

    pub fn into_owned(self) -> OwnedSysEx {
        OwnedSysEx {
            framed: self.is_framed(),
            bytes: self.bytes().into(),
        }
    }
}

/// Heap copy of a classified message, held by the event queue until replay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedSysEx {
    framed: bool,
    bytes: Box<[u8]>,
}

impl OwnedSysEx {
    pub fn as_sysex(&self) -> SysEx<'_> {
        if self.framed {
            SysEx::Framed(&self.bytes)
        } else {
            SysEx::Unframed(&self.bytes)
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
