use crate::driver::{DriverError, Mt32Driver};
use mt32drv_ports::midi::pack_short;
use mt32drv_ports::types::ChannelId;

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const CONTROL_CHANGE: u8 = 0xB0;
const PROGRAM_CHANGE: u8 = 0xC0;
const PITCH_BEND: u8 = 0xE0;

const CC_MODULATION: u8 = 1;
const CC_VOLUME: u8 = 7;
const CC_PANNING: u8 = 10;
const CC_SUSTAIN: u8 = 64;
const CC_ALL_NOTES_OFF: u8 = 123;

/// MPU-401 style operations on one logical channel, encoded and sent through the driver.
pub struct MidiChannel<'a> {
    driver: &'a Mt32Driver,
    channel: ChannelId,
}

impl<'a> MidiChannel<'a> {
    pub(crate) fn new(driver: &'a Mt32Driver, channel: ChannelId) -> Self {
        Self { driver, channel }
    }

    pub fn id(&self) -> ChannelId {
        self.channel
    }

    pub fn number(&self) -> u8 {
        self.channel.index()
    }

    /// Hands the channel back to the allocator.
    pub fn release(self) {
        self.driver.release_channel(self.channel);
    }

    fn send(&self, status: u8, data1: u8, data2: u8) -> Result<(), DriverError> {
        self.driver
            .send(pack_short(status | self.channel.index(), data1, data2))
    }

    pub fn note_off(&self, note: u8) -> Result<(), DriverError> {
        self.send(NOTE_OFF, note, 0)
    }

    pub fn note_on(&self, note: u8, velocity: u8) -> Result<(), DriverError> {
        self.send(NOTE_ON, note, velocity)
    }

    pub fn program_change(&self, program: u8) -> Result<(), DriverError> {
        self.send(PROGRAM_CHANGE, program, 0)
    }

    /// `bend` is signed around centre, -8192..=8191.
    pub fn pitch_bend(&self, bend: i16) -> Result<(), DriverError> {
        let value = (bend.clamp(-8192, 8191) as i32 + 0x2000) as u16;
        self.send(PITCH_BEND, (value & 0x7F) as u8, (value >> 7) as u8)
    }

    pub fn control_change(&self, control: u8, value: u8) -> Result<(), DriverError> {
        self.send(CONTROL_CHANGE, control, value)
    }

    pub fn modulation_wheel(&self, value: u8) -> Result<(), DriverError> {
        self.control_change(CC_MODULATION, value)
    }

    pub fn volume(&self, value: u8) -> Result<(), DriverError> {
        self.control_change(CC_VOLUME, value)
    }

    pub fn panning(&self, value: u8) -> Result<(), DriverError> {
        self.control_change(CC_PANNING, value)
    }

    pub fn sustain(&self, down: bool) -> Result<(), DriverError> {
        self.control_change(CC_SUSTAIN, if down { 127 } else { 0 })
    }

    pub fn all_notes_off(&self) -> Result<(), DriverError> {
        self.control_change(CC_ALL_NOTES_OFF, 0)
    }

    pub fn pitch_bend_factor(&self, range: u8) -> Result<(), DriverError> {
        self.driver.set_pitch_bend_range(self.channel, range)
    }

    // The MT-32 has no effect or chorus send; both are accepted and ignored.
    pub fn effect_level(&self, _value: u8) -> Result<(), DriverError> {
        Ok(())
    }

    pub fn chorus_level(&self, _value: u8) -> Result<(), DriverError> {
        Ok(())
    }
}
