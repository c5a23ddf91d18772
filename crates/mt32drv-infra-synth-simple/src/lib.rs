use mt32drv_ports::firmware::{FirmwareImage, RomKind};
use mt32drv_ports::midi::{unpack_short, SYSEX_END, SYSEX_START};
use mt32drv_ports::synth::{
    ReportHandler, SynthEngine, SynthEngineFactory, SynthError, ENGINE_SAMPLE_RATE_HZ,
};
use mt32drv_ports::types::CHANNEL_COUNT;
use std::f32::consts::TAU;
use std::sync::Arc;

const ROLAND_ID: u8 = 0x41;
const MT32_MODEL_ID: u8 = 0x16;
const CMD_DATA_SET: u8 = 0x12;

const ADDR_BENDER_RANGE: u32 = 0x00_0004;
const ADDR_SYSTEM: u32 = address(0x10, 0x00, 0x00);
const ADDR_DISPLAY: u32 = address(0x20, 0x00, 0x00);
const ADDR_RESET: u32 = address(0x7F, 0x00, 0x00);

const SYSTEM_REVERB_MODE: u32 = 0x01;
const SYSTEM_REVERB_TIME: u32 = 0x02;
const SYSTEM_REVERB_LEVEL: u32 = 0x03;
const SYSTEM_MASTER_VOLUME: u32 = 0x16;

const MAX_BENDER_RANGE: u8 = 24;

/// Roland addresses are three 7-bit bytes.
const fn address(a0: u8, a1: u8, a2: u8) -> u32 {
    (a0 as u32) << 14 | (a1 as u32) << 7 | a2 as u32
}

/// Creates [`SimpleSynth`] engines.
#[derive(Clone, Copy, Debug)]
pub struct SimpleSynthFactory {
    pub max_voices: usize,
}

impl Default for SimpleSynthFactory {
    fn default() -> Self {
        Self { max_voices: 32 }
    }
}

impl SynthEngineFactory for SimpleSynthFactory {
    fn create(&self, report: Arc<dyn ReportHandler>) -> Box<dyn SynthEngine> {
        Box::new(SimpleSynth::new(report, self.max_voices))
    }
}

/// Sine-voice stand-in for the wave-table engine.
///
/// It understands the same short messages and Roland data-set SysEx the real
/// device does, reports through the same channel, and renders at 32 kHz.
pub struct SimpleSynth {
    report: Arc<dyn ReportHandler>,
    is_open: bool,
    sample_rate_hz: f32,
    max_voices: usize,
    output_gain: f32,
    reverb_output_gain: f32,
    master_volume: u8,
    parts: [PartState; CHANNEL_COUNT],
    voices: Vec<Voice>,
    note_counter: u64,
}

#[derive(Clone, Copy, Debug)]
struct PartState {
    program: u8,
    volume: u8,
    pan: u8,
    sustain_down: bool,
    bend: u16,
    bend_range: u8,
    active: bool,
}

#[derive(Clone, Debug)]
struct Voice {
    part: u8,
    note: u8,
    freq: f32,
    phase: f32,
    velocity: f32,
    key_down: bool,
    sustained: bool,
    release_samples_left: u32,
    release_total_samples: u32,
    age: u64,
}

impl PartState {
    fn new() -> Self {
        Self {
            program: 0,
            volume: 100,
            pan: 64,
            sustain_down: false,
            bend: 0x2000,
            bend_range: 12,
            active: false,
        }
    }

    fn bend_ratio(&self) -> f32 {
        let semitones = (self.bend as f32 - 8192.0) / 8192.0 * self.bend_range as f32;
        2.0_f32.powf(semitones / 12.0)
    }
}

impl SimpleSynth {
    pub fn new(report: Arc<dyn ReportHandler>, max_voices: usize) -> Self {
        Self {
            report,
            is_open: false,
            sample_rate_hz: ENGINE_SAMPLE_RATE_HZ as f32,
            max_voices: max_voices.max(8),
            output_gain: 1.0,
            reverb_output_gain: 0.0,
            master_volume: 100,
            parts: [PartState::new(); CHANNEL_COUNT],
            voices: Vec::new(),
            note_counter: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn output_gain(&self) -> f32 {
        self.output_gain
    }

    pub fn reverb_output_gain(&self) -> f32 {
        self.reverb_output_gain
    }

    pub fn bend_range(&self, part: u8) -> u8 {
        self.parts[(part & 0x0F) as usize].bend_range
    }

    pub fn master_volume(&self) -> u8 {
        self.master_volume
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    fn reset(&mut self) {
        self.parts = [PartState::new(); CHANNEL_COUNT];
        self.voices.clear();
        self.master_volume = 100;
    }

    fn note_on(&mut self, part: u8, note: u8, velocity: u8) {
        self.note_counter = self.note_counter.wrapping_add(1);

        if self.voices.len() >= self.max_voices {
            if let Some((idx, _)) = self
                .voices
                .iter()
                .enumerate()
                .min_by_key(|(_, voice)| voice.age)
            {
                self.voices.swap_remove(idx);
            }
        }

        let freq = 440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0);
        let velocity = (velocity as f32 / 127.0).clamp(0.05, 1.0);
        let release_total_samples = ((self.sample_rate_hz * 0.2) as u32).max(1);
        self.voices.push(Voice {
            part,
            note,
            freq,
            phase: 0.0,
            velocity,
            key_down: true,
            sustained: false,
            release_samples_left: 0,
            release_total_samples,
            age: self.note_counter,
        });

        let state = &mut self.parts[part as usize];
        if !state.active {
            state.active = true;
            self.report.on_part_state_changed(part, true);
        }
    }

    fn note_off(&mut self, part: u8, note: u8) {
        let sustain_down = self.parts[part as usize].sustain_down;
        for voice in &mut self.voices {
            if voice.part == part && voice.note == note && voice.key_down {
                voice.key_down = false;
                if sustain_down {
                    voice.sustained = true;
                } else {
                    voice.release_samples_left = voice.release_total_samples;
                }
            }
        }
    }

    fn sustain(&mut self, part: u8, down: bool) {
        self.parts[part as usize].sustain_down = down;
        if !down {
            for voice in &mut self.voices {
                if voice.part == part && !voice.key_down && voice.sustained {
                    voice.sustained = false;
                    voice.release_samples_left = voice.release_total_samples;
                }
            }
        }
    }

    fn all_notes_off(&mut self, part: u8) {
        for voice in &mut self.voices {
            if voice.part == part && (voice.key_down || voice.sustained) {
                voice.key_down = false;
                voice.sustained = false;
                voice.release_samples_left = voice.release_total_samples;
            }
        }
    }

    fn control_change(&mut self, part: u8, control: u8, value: u8) {
        match control {
            7 => self.parts[part as usize].volume = value,
            10 => self.parts[part as usize].pan = value,
            64 => self.sustain(part, value >= 64),
            121 => {
                self.parts[part as usize].bend = 0x2000;
                self.sustain(part, false);
            }
            123 => self.all_notes_off(part),
            _ => {}
        }
    }

    fn program_change(&mut self, part: u8, program: u8) {
        self.parts[part as usize].program = program;
        self.report
            .on_program_changed(part, &format!("Program {}", program + 1));
    }

    fn write_memory(&mut self, device_channel: u8, start: u32, values: &[u8]) {
        match start {
            ADDR_BENDER_RANGE => {
                let Some(&range) = values.first() else {
                    return;
                };
                if range > MAX_BENDER_RANGE {
                    self.report
                        .print_debug(&format!("bender range {} rejected", range));
                    return;
                }
                self.parts[(device_channel & 0x0F) as usize].bend_range = range;
            }
            ADDR_DISPLAY => {
                let text: String = values
                    .iter()
                    .map(|byte| (*byte).clamp(0x20, 0x7E) as char)
                    .collect();
                self.report.show_lcd_message(text.trim_end());
            }
            ADDR_RESET => {
                self.reset();
                self.report.on_device_reset();
            }
            _ if (ADDR_SYSTEM..ADDR_SYSTEM + 0x80).contains(&start) => {
                for (offset, value) in values.iter().copied().enumerate() {
                    self.write_system(start - ADDR_SYSTEM + offset as u32, value);
                }
            }
            _ => self
                .report
                .print_debug(&format!("unhandled SysEx address 0x{:06X}", start)),
        }
    }

    fn write_system(&mut self, offset: u32, value: u8) {
        match offset {
            SYSTEM_REVERB_MODE => self.report.on_new_reverb_mode(value),
            SYSTEM_REVERB_TIME => self.report.on_new_reverb_time(value),
            SYSTEM_REVERB_LEVEL => self.report.on_new_reverb_level(value),
            SYSTEM_MASTER_VOLUME => {
                self.master_volume = value.min(100);
                self.report.on_device_reconfig();
            }
            _ => {}
        }
    }

    fn render_voices(&mut self, out: &mut [i16], frames: usize) {
        let master = self.master_volume as f32 / 100.0 * self.output_gain * 0.2;

        let mut mix = vec![0.0_f32; frames * 2];
        for voice in &mut self.voices {
            let part = &self.parts[voice.part as usize];
            let phase_step = TAU * voice.freq * part.bend_ratio() / self.sample_rate_hz;
            let part_gain = part.volume as f32 / 127.0 * master;
            let pan = part.pan as f32 / 127.0;
            for i in 0..frames {
                let held = voice.key_down || voice.sustained;
                if !held && voice.release_samples_left == 0 {
                    break;
                }
                let mut gain = voice.velocity * part_gain;
                if !held {
                    gain *= voice.release_samples_left as f32 / voice.release_total_samples as f32;
                    voice.release_samples_left -= 1;
                }
                let sample = voice.phase.sin() * gain;
                mix[i * 2] += sample * (1.0 - pan);
                mix[i * 2 + 1] += sample * pan;
                voice.phase += phase_step;
                if voice.phase >= TAU {
                    voice.phase -= TAU;
                }
            }
        }

        for (dst, src) in out[..frames * 2].iter_mut().zip(mix.iter()) {
            *dst = (src.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        }

        self.voices.retain(|voice| {
            voice.key_down || voice.sustained || voice.release_samples_left > 0
        });

        for part in 0..CHANNEL_COUNT as u8 {
            let state = &mut self.parts[part as usize];
            if state.active && !self.voices.iter().any(|voice| voice.part == part) {
                state.active = false;
                self.report.on_part_state_changed(part, false);
            }
        }
    }
}

fn checksum_ok(data: &[u8], checksum: u8) -> bool {
    let sum = data.iter().fold(checksum as u32, |acc, byte| acc + *byte as u32);
    sum % 128 == 0
}

impl SynthEngine for SimpleSynth {
    fn open(&mut self, control: &FirmwareImage, pcm: &FirmwareImage) -> Result<(), SynthError> {
        if control.kind() != RomKind::Control || !control.is_valid() {
            self.report.on_error_control_rom();
            return Err(SynthError::RomRejected(control.name().to_string()));
        }
        if pcm.kind() != RomKind::Pcm || !pcm.is_valid() {
            self.report.on_error_pcm_rom();
            return Err(SynthError::RomRejected(pcm.name().to_string()));
        }

        self.reset();
        self.is_open = true;
        self.report.print_debug(&format!(
            "using {} ({} bytes) and {} ({} bytes)",
            control.name(),
            control.data().len(),
            pcm.name(),
            pcm.data().len()
        ));
        Ok(())
    }

    fn close(&mut self) {
        self.voices.clear();
        self.is_open = false;
    }

    fn play_short_message(&mut self, message: u32) {
        if !self.is_open {
            return;
        }
        let (status, data1, data2) = unpack_short(message);
        let part = status & 0x0F;
        match status & 0xF0 {
            0x80 => self.note_off(part, data1),
            0x90 if data2 == 0 => self.note_off(part, data1),
            0x90 => self.note_on(part, data1, data2),
            0xB0 => self.control_change(part, data1, data2),
            0xC0 => self.program_change(part, data1),
            0xE0 => self.parts[part as usize].bend = (data2 as u16) << 7 | data1 as u16,
            _ => {}
        }
    }

    fn play_sysex(&mut self, message: &[u8]) {
        let Some(inner) = message.strip_prefix(&[SYSEX_START]) else {
            self.report.print_debug("framed SysEx without 0xF0");
            return;
        };
        let inner = inner.strip_suffix(&[SYSEX_END]).unwrap_or(inner);
        self.play_sysex_unframed(inner);
    }

    fn play_sysex_unframed(&mut self, payload: &[u8]) {
        if !self.is_open {
            return;
        }
        // id, device, model, command, 3 address bytes, at least one data byte, checksum
        if payload.len() < 9 {
            self.report
                .print_debug(&format!("SysEx too short ({} bytes)", payload.len()));
            return;
        }
        if payload[0] != ROLAND_ID || payload[2] != MT32_MODEL_ID {
            self.report.print_debug("SysEx for another device ignored");
            return;
        }
        if payload[3] != CMD_DATA_SET {
            self.report
                .print_debug(&format!("unsupported SysEx command 0x{:02X}", payload[3]));
            return;
        }

        let (body, checksum) = payload[4..].split_at(payload.len() - 5);
        if !checksum_ok(body, checksum[0]) {
            self.report.print_debug("SysEx checksum mismatch");
            return;
        }

        let start = address(body[0], body[1], body[2]);
        self.write_memory(payload[1], start, &body[3..]);
    }

    fn render(&mut self, out: &mut [i16], frames: usize) {
        let frames = frames.min(out.len() / 2);
        if !self.is_open {
            out[..frames * 2].fill(0);
            return;
        }
        self.render_voices(out, frames);
    }

    fn set_output_gain(&mut self, gain: f32) {
        self.output_gain = gain.max(0.0);
    }

    fn set_reverb_output_gain(&mut self, gain: f32) {
        self.reverb_output_gain = gain.max(0.0);
    }
}
