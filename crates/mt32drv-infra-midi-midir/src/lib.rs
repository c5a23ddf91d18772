use mt32drv_ports::midi::{
    InputEvent, InputEventCallback, MidiError, MidiInputPort, MidiInputStream, MidiMessage,
    SYSEX_START,
};
use mt32drv_ports::types::{DeviceId, MidiInputDevice};
use midir::{Ignore, MidiInput};
use std::time::Instant;

pub struct MidirMidiInputPort {
    client_name: String,
}

impl MidirMidiInputPort {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }

    fn create_midi_in(&self) -> Result<MidiInput, MidiError> {
        let midi_in = MidiInput::new(&self.client_name)
            .map_err(|e| MidiError::Backend(e.to_string()))?;
        Ok(midi_in)
    }

    fn device_id(index: usize, name: &str) -> DeviceId {
        DeviceId(format!("midir:{}:{}", index, name))
    }

    /// Channel voice messages and SysEx pass through; realtime and system
    /// common bytes are dropped.
    pub fn parse_message(message: &[u8]) -> Option<MidiMessage> {
        let status = *message.first()?;
        if status == SYSEX_START {
            return Some(MidiMessage::SysEx(message.to_vec()));
        }
        let data_len = match status & 0xF0 {
            0x80 | 0x90 | 0xA0 | 0xB0 | 0xE0 => 2,
            0xC0 | 0xD0 => 1,
            _ => return None,
        };
        if message.len() < 1 + data_len {
            return None;
        }
        let data2 = if data_len == 2 { message[2] } else { 0 };
        Some(MidiMessage::short(status, message[1], data2))
    }
}

impl Default for MidirMidiInputPort {
    fn default() -> Self {
        Self::new("mt32drv")
    }
}

pub struct MidirMidiInputStream {
    connection: Option<midir::MidiInputConnection<InputEventCallback>>,
}

impl MidiInputStream for MidirMidiInputStream {
    fn close(mut self: Box<Self>) {
        if let Some(connection) = self.connection.take() {
            let _ = connection.close();
        }
    }
}

impl MidiInputPort for MidirMidiInputPort {
    fn list_inputs(&self) -> Result<Vec<MidiInputDevice>, MidiError> {
        let midi_in = self.create_midi_in()?;
        let ports = midi_in.ports();
        let mut devices = Vec::new();

        for (index, port) in ports.iter().enumerate() {
            let name = midi_in
                .port_name(port)
                .unwrap_or_else(|_| "Unknown Input".to_string());
            devices.push(MidiInputDevice {
                id: Self::device_id(index, &name),
                name,
                is_available: true,
            });
        }

        Ok(devices)
    }

    fn open_input(
        &self,
        device_id: &DeviceId,
        cb: InputEventCallback,
    ) -> Result<Box<dyn MidiInputStream>, MidiError> {
        let mut midi_in = self.create_midi_in()?;
        midi_in.ignore(Ignore::None);

        let ports = midi_in.ports();
        let mut selected = None;
        for (index, port) in ports.iter().enumerate() {
            let name = midi_in
                .port_name(port)
                .unwrap_or_else(|_| "Unknown Input".to_string());
            let id = Self::device_id(index, &name);
            if &id == device_id {
                selected = Some(port.clone());
                break;
            }
        }

        let port = selected.ok_or_else(|| MidiError::DeviceNotFound(device_id.to_string()))?;
        tracing::info!("opening MIDI input {}", device_id);

        let connection = midi_in
            .connect(
                &port,
                "mt32drv-midi-input",
                move |_stamp, message, callback| match Self::parse_message(message) {
                    Some(message) => (callback)(InputEvent {
                        at: Instant::now(),
                        message,
                    }),
                    None => tracing::trace!("ignored MIDI input {:02X?}", message),
                },
                cb,
            )
            .map_err(|e| MidiError::Backend(e.to_string()))?;

        Ok(Box::new(MidirMidiInputStream {
            connection: Some(connection),
        }))
    }
}
