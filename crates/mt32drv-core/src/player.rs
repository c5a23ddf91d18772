use crate::driver::{Mt32Driver, TimerProc};
use mt32drv_domain_song::{Song, TempoMap};
use mt32drv_ports::midi::{pack_short, MidiError, MidiOutput, MidiMessage};
use mt32drv_ports::types::CHANNEL_COUNT;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerState {
    Stopped,
    Playing,
    Finished,
}

/// Plays a [`Song`] by advancing a fixed number of microseconds per timer tick.
pub struct SongPlayer {
    song: Song,
    tempo_map: TempoMap,
    cursor: usize,
    position_us: i64,
    state: PlayerState,
    looping: bool,
}

impl SongPlayer {
    pub fn new(song: Song) -> Self {
        let tempo_map = TempoMap::new(song.ppq, song.tempo_map.clone());
        Self {
            song,
            tempo_map,
            cursor: 0,
            position_us: 0,
            state: PlayerState::Stopped,
            looping: false,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == PlayerState::Finished
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn position_micros(&self) -> i64 {
        self.position_us
    }

    pub fn play(&mut self) {
        if self.state == PlayerState::Finished {
            self.rewind();
        }
        self.state = PlayerState::Playing;
    }

    /// Rewinds and silences every channel.
    pub fn stop(&mut self, out: &dyn MidiOutput) -> Result<(), MidiError> {
        self.state = PlayerState::Stopped;
        self.rewind();
        for channel in 0..CHANNEL_COUNT as u8 {
            out.send_message(&MidiMessage::Short(pack_short(0xB0 | channel, 123, 0)))?;
        }
        Ok(())
    }

    fn rewind(&mut self) {
        self.cursor = 0;
        self.position_us = 0;
    }

    /// Advances by `elapsed_us` and sends every event that became due.
    /// Returns the number of messages sent.
    pub fn on_timer(&mut self, elapsed_us: u32, out: &dyn MidiOutput) -> Result<usize, MidiError> {
        if self.state != PlayerState::Playing {
            return Ok(0);
        }

        self.position_us += elapsed_us as i64;
        let now_tick = self.tempo_map.micros_to_tick(self.position_us);

        let mut sent = 0;
        while let Some(event) = self.song.events.get(self.cursor) {
            if event.tick > now_tick {
                break;
            }
            self.cursor += 1;
            out.send_message(&event.message)?;
            sent += 1;
        }

        if self.cursor >= self.song.events.len() {
            if self.looping {
                self.rewind();
            } else {
                self.state = PlayerState::Finished;
            }
        }
        Ok(sent)
    }
}

/// Timer callback that drives `player` from `driver`'s render loop.
///
/// Holds the driver weakly so the callback does not keep it alive.
pub fn player_timer(driver: &Arc<Mt32Driver>, player: Arc<Mutex<SongPlayer>>) -> TimerProc {
    let weak = Arc::downgrade(driver);
    let elapsed_us = driver.base_tempo();
    Box::new(move || {
        let Some(driver) = weak.upgrade() else {
            return;
        };
        if let Err(err) = player.lock().on_timer(elapsed_us, &*driver) {
            tracing::warn!("song playback: {}", err);
        }
    })
}
