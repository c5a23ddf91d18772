use mt32drv_core::{PlayerState, SongPlayer};
use mt32drv_domain_song::{Song, SongEvent, TempoPoint};
use mt32drv_ports::midi::{pack_short, MidiError, MidiMessage, MidiOutput};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

#[derive(Default)]
struct RecordingOutput {
    sent: Mutex<Vec<MidiMessage>>,
}

impl RecordingOutput {
    fn take(&self) -> Vec<MidiMessage> {
        std::mem::take(&mut *self.sent.lock())
    }
}

impl MidiOutput for RecordingOutput {
    fn send_message(&self, message: &MidiMessage) -> Result<(), MidiError> {
        self.sent.lock().push(message.clone());
        Ok(())
    }
}

struct ClosedOutput;

impl MidiOutput for ClosedOutput {
    fn send_message(&self, _message: &MidiMessage) -> Result<(), MidiError> {
        Err(MidiError::DeviceUnavailable("closed".to_string()))
    }
}

fn note_on(tick: i64, key: u8) -> SongEvent {
    SongEvent {
        tick,
        message: MidiMessage::Short(pack_short(0x90, key, 100)),
    }
}

// 480 ppq at 500 ms per quarter: one tick is 1041.67 us.
fn song() -> Song {
    Song {
        ppq: 480,
        tempo_map: vec![TempoPoint {
            tick: 0,
            us_per_quarter: 500_000,
        }],
        events: vec![
            note_on(0, 60),
            SongEvent {
                tick: 0,
                message: MidiMessage::SysEx(vec![0xF0, 0x41, 0xF7]),
            },
            note_on(480, 62),
            note_on(960, 64),
        ],
    }
}

#[test]
fn sends_events_as_they_become_due() {
    let out = RecordingOutput::default();
    let mut player = SongPlayer::new(song());
    assert_eq!(player.on_timer(100, &out).expect("timer"), 0);

    player.play();
    assert_eq!(player.on_timer(100, &out).expect("timer"), 2);
    assert_eq!(
        out.take(),
        vec![
            MidiMessage::Short(pack_short(0x90, 60, 100)),
            MidiMessage::SysEx(vec![0xF0, 0x41, 0xF7]),
        ]
    );

    assert_eq!(player.on_timer(499_800, &out).expect("timer"), 0);
    assert_eq!(player.on_timer(100, &out).expect("timer"), 1);
    assert_eq!(player.position_micros(), 500_000);

    assert_eq!(player.on_timer(500_000, &out).expect("timer"), 1);
    assert!(player.is_finished());
    assert_eq!(player.state(), PlayerState::Finished);
}

#[test]
fn looping_rewinds_at_the_end() {
    let out = RecordingOutput::default();
    let mut player = SongPlayer::new(song());
    player.set_looping(true);
    player.play();

    assert_eq!(player.on_timer(2_000_000, &out).expect("timer"), 4);
    assert_eq!(player.state(), PlayerState::Playing);
    assert_eq!(player.position_micros(), 0);
    assert_eq!(player.on_timer(10, &out).expect("timer"), 2);
}

#[test]
fn stop_rewinds_and_silences_all_channels() {
    let out = RecordingOutput::default();
    let mut player = SongPlayer::new(song());
    player.play();
    player.on_timer(600_000, &out).expect("timer");
    out.take();

    player.stop(&out).expect("stop");
    assert_eq!(player.state(), PlayerState::Stopped);
    assert_eq!(player.position_micros(), 0);

    let expected: Vec<MidiMessage> = (0..16u8)
        .map(|channel| MidiMessage::Short(pack_short(0xB0 | channel, 123, 0)))
        .collect();
    assert_eq!(out.take(), expected);
}

#[test]
fn output_errors_are_returned() {
    let mut player = SongPlayer::new(song());
    player.play();
    assert!(matches!(
        player.on_timer(10, &ClosedOutput),
        Err(MidiError::DeviceUnavailable(_))
    ));
}
