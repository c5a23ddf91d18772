use midly::num::{u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use mt32drv_domain_song::{import_song_bytes, SongImportError, TempoMap, TempoPoint};
use mt32drv_ports::midi::{self, pack_short};
use pretty_assertions::assert_eq;

fn build_midi(format: Format, tracks: Vec<Vec<TrackEvent<'static>>>) -> Vec<u8> {
    let smf = Smf {
        header: Header {
            format,
            timing: Timing::Metrical(480.into()),
        },
        tracks,
    };
    let mut data = Vec::new();
    smf.write(&mut data).expect("midi write should succeed");
    data
}

fn end_of_track() -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    }
}

const RESET_SYSEX: &[u8] = &[0x41, 0x10, 0x16, 0x12, 0x7F, 0x00, 0x00, 0x01, 0x00, 0xF7];

#[test]
fn merges_tracks_in_time_order_and_frames_sysex() {
    let conductor = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(250_000))),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::SysEx(RESET_SYSEX),
        },
        end_of_track(),
    ];
    let channel = u4::new(1);
    let key = u7::new(60);
    let notes = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOn {
                    key,
                    vel: u7::new(100),
                },
            },
        },
        TrackEvent {
            delta: u28::new(480),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOff {
                    key,
                    vel: u7::new(0),
                },
            },
        },
        end_of_track(),
    ];

    let data = build_midi(Format::Parallel, vec![conductor, notes]);
    let song = import_song_bytes(&data).expect("import should succeed");

    assert_eq!(song.ppq, 480);
    assert_eq!(
        song.tempo_map,
        vec![TempoPoint {
            tick: 0,
            us_per_quarter: 250_000
        }]
    );

    let timeline: Vec<(i64, midi::MidiMessage)> = song
        .events
        .iter()
        .map(|event| (event.tick, event.message.clone()))
        .collect();

    let mut framed = vec![0xF0];
    framed.extend_from_slice(RESET_SYSEX);
    assert_eq!(
        timeline,
        vec![
            (0, midi::MidiMessage::SysEx(framed)),
            (0, midi::MidiMessage::Short(pack_short(0x91, 60, 100))),
            (480, midi::MidiMessage::Short(pack_short(0x81, 60, 0))),
        ]
    );
    assert_eq!(song.duration_micros(), 250_000);
}

#[test]
fn pitch_bend_is_split_into_seven_bit_halves() {
    let track = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel: u4::new(0),
                message: MidiMessage::PitchBend {
                    bend: midly::PitchBend(midly::num::u14::new(0x2000 + 0x81)),
                },
            },
        },
        end_of_track(),
    ];

    let song = import_song_bytes(&build_midi(Format::SingleTrack, vec![track]))
        .expect("import should succeed");
    let value: u16 = 0x2000 + 0x81;
    assert_eq!(
        song.events[0].message,
        midi::MidiMessage::Short(pack_short(0xE0, (value & 0x7F) as u8, (value >> 7) as u8))
    );
}

#[test]
fn missing_tempo_defaults_to_120_bpm() {
    let song = import_song_bytes(&build_midi(Format::SingleTrack, vec![vec![end_of_track()]]))
        .expect("import should succeed");
    assert_eq!(
        song.tempo_map,
        vec![TempoPoint {
            tick: 0,
            us_per_quarter: 500_000
        }]
    );
    assert!(song.events.is_empty());
    assert_eq!(song.duration_micros(), 0);
}

#[test]
fn garbage_is_a_parse_error() {
    let err = import_song_bytes(b"not a midi file").expect_err("import should fail");
    assert!(matches!(err, SongImportError::Parse(_)));
}

#[test]
fn tempo_map_converts_across_tempo_changes() {
    let map = TempoMap::new(
        480,
        vec![
            TempoPoint {
                tick: 0,
                us_per_quarter: 500_000,
            },
            TempoPoint {
                tick: 960,
                us_per_quarter: 250_000,
            },
        ],
    );

    assert_eq!(map.tick_to_micros(480), 500_000);
    assert_eq!(map.tick_to_micros(960), 1_000_000);
    assert_eq!(map.tick_to_micros(1440), 1_250_000);
    assert_eq!(map.micros_to_tick(1_250_000), 1440);
    assert_eq!(map.micros_to_tick(750_000), 720);
}
