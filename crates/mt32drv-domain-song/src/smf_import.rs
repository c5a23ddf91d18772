use crate::model::{Song, SongEvent, TempoPoint, Tick};
use midly::{Fps, MetaMessage, MidiMessage as SmfMessage, Smf, Timing, TrackEventKind};
use mt32drv_ports::midi::{pack_short, MidiMessage, SYSEX_END, SYSEX_START};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum SongImportError {
    #[error("io error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
}

pub fn import_song_path(path: &Path) -> Result<Song, SongImportError> {
    let data = std::fs::read(path).map_err(|e| SongImportError::Io(e.to_string()))?;
    import_song_bytes(&data)
}

pub fn import_song_bytes(data: &[u8]) -> Result<Song, SongImportError> {
    let smf = Smf::parse(data).map_err(|e| SongImportError::Parse(e.to_string()))?;
    let (ppq, tempo_override) = match smf.header.timing {
        Timing::Metrical(ticks) => (ticks.as_int(), None),
        Timing::Timecode(fps, ticks_per_frame) => {
            let (ppq, us_per_quarter) = timecode_ppq_and_tempo(fps, ticks_per_frame);
            (ppq, Some(us_per_quarter))
        }
    };

    let mut tempo_points: BTreeMap<Tick, u32> = BTreeMap::new();
    // (tick, track, index) keeps same-tick events in file order per track.
    let mut events: Vec<(Tick, usize, usize, MidiMessage)> = Vec::new();

    for (track_index, track) in smf.tracks.iter().enumerate() {
        let mut tick: Tick = 0;
        for (event_index, event) in track.iter().enumerate() {
            tick += event.delta.as_int() as Tick;
            let message = match &event.kind {
                TrackEventKind::Midi { channel, message } => {
                    Some(MidiMessage::Short(encode_short(channel.as_int(), message)))
                }
                TrackEventKind::SysEx(data) => Some(MidiMessage::SysEx(frame_sysex(data))),
                TrackEventKind::Meta(MetaMessage::Tempo(us_per_quarter)) => {
                    tempo_points.insert(tick, us_per_quarter.as_int());
                    None
                }
                _ => None,
            };
            if let Some(message) = message {
                events.push((tick, track_index, event_index, message));
            }
        }
    }

    events.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    Ok(Song {
        ppq,
        tempo_map: build_tempo_map(tempo_points, tempo_override),
        events: events
            .into_iter()
            .map(|(tick, _, _, message)| SongEvent { tick, message })
            .collect(),
    })
}

fn encode_short(channel: u8, message: &SmfMessage) -> u32 {
    match *message {
        SmfMessage::NoteOff { key, vel } => pack_short(0x80 | channel, key.as_int(), vel.as_int()),
        SmfMessage::NoteOn { key, vel } => pack_short(0x90 | channel, key.as_int(), vel.as_int()),
        SmfMessage::Aftertouch { key, vel } => {
            pack_short(0xA0 | channel, key.as_int(), vel.as_int())
        }
        SmfMessage::Controller { controller, value } => {
            pack_short(0xB0 | channel, controller.as_int(), value.as_int())
        }
        SmfMessage::ProgramChange { program } => pack_short(0xC0 | channel, program.as_int(), 0),
        SmfMessage::ChannelAftertouch { vel } => pack_short(0xD0 | channel, vel.as_int(), 0),
        SmfMessage::PitchBend { bend } => {
            let value = bend.0.as_int();
            pack_short(0xE0 | channel, (value & 0x7F) as u8, (value >> 7) as u8)
        }
    }
}

/// SMF stores SysEx without the leading `F0`; restore it and make sure `F7` closes it.
fn frame_sysex(data: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(data.len() + 2);
    framed.push(SYSEX_START);
    framed.extend_from_slice(data);
    if framed.last() != Some(&SYSEX_END) {
        framed.push(SYSEX_END);
    }
    framed
}

fn build_tempo_map(
    tempo_points: BTreeMap<Tick, u32>,
    override_us_per_quarter: Option<u32>,
) -> Vec<TempoPoint> {
    if let Some(us_per_quarter) = override_us_per_quarter {
        return vec![TempoPoint {
            tick: 0,
            us_per_quarter,
        }];
    }

    let mut map: Vec<TempoPoint> = tempo_points
        .into_iter()
        .map(|(tick, us_per_quarter)| TempoPoint {
            tick,
            us_per_quarter,
        })
        .collect();

    if map.is_empty() || map[0].tick != 0 {
        map.insert(
            0,
            TempoPoint {
                tick: 0,
                us_per_quarter: 500_000,
            },
        );
    }
    map
}

fn timecode_ppq_and_tempo(fps: Fps, ticks_per_frame: u8) -> (u16, u32) {
    let ticks_per_frame = ticks_per_frame.max(1) as u16;
    match fps {
        Fps::Fps24 => (24 * ticks_per_frame, 1_000_000),
        Fps::Fps25 => (25 * ticks_per_frame, 1_000_000),
        Fps::Fps30 => (30 * ticks_per_frame, 1_000_000),
        Fps::Fps29 => (30 * ticks_per_frame, 1_001_000),
    }
}
