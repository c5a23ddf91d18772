use crate::channels::ChannelAllocator;
use crate::config::{DispatchMode, DriverConfig};
use crate::event_queue::{EventQueue, QueuedEvent};
use crate::firmware::{FirmwareLoader, FirmwareSet};
use crate::midi_channel::MidiChannel;
use crate::report::{DriverReport, FatalReport, ReportEvent};
use crate::sysex::{self, SysEx};
use crate::tick_clock::TickClock;
use mt32drv_ports::audio::AudioSource;
use mt32drv_ports::firmware::{FirmwareError, FirmwareSource};
use mt32drv_ports::midi::{MidiError, MidiMessage, MidiOutput};
use mt32drv_ports::synth::{
    SynthEngine, SynthEngineFactory, SynthError, ENGINE_CHANNELS, ENGINE_SAMPLE_RATE_HZ,
};
use mt32drv_ports::types::{ChannelId, ChannelMask};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum DriverError {
    #[error("driver already open")]
    AlreadyOpen,
    #[error("driver not open")]
    NotOpen,
    #[error("firmware error: {0}")]
    Firmware(#[from] FirmwareError),
    #[error("{0}")]
    Fatal(FatalReport),
    #[error("engine failed to open: {0}")]
    EngineOpen(#[from] SynthError),
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Closed,
    Opening,
    Open,
}

impl DriverState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => DriverState::Opening,
            2 => DriverState::Open,
            _ => DriverState::Closed,
        }
    }
}

/// Keys for [`Mt32Driver::property`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverProperty {
    TimeDelay,
    OldAdLib,
    ChannelMask,
}

/// Called once per timer tick from inside `generate_block`.
pub type TimerProc = Box<dyn FnMut() + Send>;

/// Everything that exists only while the driver is open.
struct Session {
    engine: Box<dyn SynthEngine>,
    firmware: FirmwareSet,
    clock: TickClock,
    replay: Vec<QueuedEvent>,
}

impl Session {
    fn replay_pending(&mut self, queue: &EventQueue) {
        queue.dequeue_into(&mut self.replay);
        let Session { engine, replay, .. } = self;
        for event in replay.drain(..) {
            match event {
                QueuedEvent::Short(message) => engine.play_short_message(message),
                QueuedEvent::SysEx(message) => dispatch_sysex(&mut **engine, message.as_sysex()),
            }
        }
    }
}

fn dispatch_sysex(engine: &mut dyn SynthEngine, message: SysEx<'_>) {
    match message {
        SysEx::Framed(bytes) => engine.play_sysex(bytes),
        SysEx::Unframed(bytes) => engine.play_sysex_unframed(bytes),
    }
}

/// Drives an emulated MT-32 / CM-32L: lifecycle, message routing, block rendering.
///
/// `send`/`sys_ex` may be called from a control thread while the host's audio
/// thread calls `generate_block`. `open`, `close` and rendering serialize on
/// the session lock, so the engine is never rendered into after teardown starts.
pub struct Mt32Driver {
    config: DriverConfig,
    firmware_source: Arc<dyn FirmwareSource>,
    engine_factory: Arc<dyn SynthEngineFactory>,
    state: AtomicU8,
    session: Mutex<Option<Session>>,
    queue: EventQueue,
    channels: Mutex<ChannelAllocator>,
    timer: Mutex<Option<TimerProc>>,
    timer_epoch: AtomicU64,
    last_report: Mutex<Option<Arc<DriverReport>>>,
}

impl Mt32Driver {
    pub fn new(
        config: DriverConfig,
        firmware_source: Arc<dyn FirmwareSource>,
        engine_factory: Arc<dyn SynthEngineFactory>,
    ) -> Self {
        let channels = ChannelAllocator::new(config.channel_mask);
        Self {
            config,
            firmware_source,
            engine_factory,
            state: AtomicU8::new(DriverState::Closed as u8),
            session: Mutex::new(None),
            queue: EventQueue::new(),
            channels: Mutex::new(channels),
            timer: Mutex::new(None),
            timer_epoch: AtomicU64::new(0),
            last_report: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn state(&self) -> DriverState {
        DriverState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state() == DriverState::Open
    }

    /// True when a complete firmware set can be found.
    pub fn check_device(&self) -> bool {
        FirmwareLoader::new(self.firmware_source.as_ref()).check_device()
    }

    pub fn open(&self) -> Result<(), DriverError> {
        let mut slot = self.session.lock();
        if self
            .state
            .compare_exchange(
                DriverState::Closed as u8,
                DriverState::Opening as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Err(DriverError::AlreadyOpen);
        }

        tracing::debug!("Initializing MT-32 Emulator");
        match self.open_session() {
            Ok(session) => {
                tracing::info!(
                    "MT-32 emulator open ({} + {})",
                    session.firmware.control.name(),
                    session.firmware.pcm.name()
                );
                *slot = Some(session);
                self.state.store(DriverState::Open as u8, Ordering::Release);
                Ok(())
            }
            Err(err) => {
                self.state.store(DriverState::Closed as u8, Ordering::Release);
                tracing::error!("MT-32 emulator failed to open: {}", err);
                Err(err)
            }
        }
    }

    fn open_session(&self) -> Result<Session, DriverError> {
        let clock = TickClock::new(ENGINE_SAMPLE_RATE_HZ, self.config.base_freq_hz).ok_or_else(
            || {
                DriverError::InvalidConfig(format!(
                    "base frequency {} Hz must be within 1..={} Hz",
                    self.config.base_freq_hz, ENGINE_SAMPLE_RATE_HZ
                ))
            },
        )?;

        let firmware = FirmwareLoader::new(self.firmware_source.as_ref())
            .load_set(&self.config.control_rom, &self.config.pcm_rom)?;

        let report = Arc::new(DriverReport::new());
        *self.last_report.lock() = Some(report.clone());
        let mut engine = self.engine_factory.create(report.clone());

        let opened = engine.open(&firmware.control, &firmware.pcm);
        if let Some(fatal) = report.fatal() {
            if opened.is_ok() {
                engine.close();
            }
            return Err(DriverError::Fatal(fatal));
        }
        opened?;

        engine.set_output_gain(self.config.output_gain);
        engine.set_reverb_output_gain(self.config.reverb_output_gain);

        Ok(Session {
            engine,
            firmware,
            clock,
            replay: Vec::with_capacity(64),
        })
    }

    /// Stops the engine and releases it together with both firmware images.
    /// Pending queued events are discarded. Calling this while closed does nothing.
    pub fn close(&self) {
        let mut slot = self.session.lock();
        if self.state() != DriverState::Open {
            return;
        }
        self.state.store(DriverState::Closed as u8, Ordering::Release);

        self.detach_timer();
        if let Some(mut session) = slot.take() {
            session.engine.close();
        }

        let discarded = self.queue.dequeue_all().len();
        if discarded > 0 {
            tracing::debug!("discarded {} pending events on close", discarded);
        }
        self.channels.lock().reset();
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(DriverError::NotOpen)
        }
    }

    fn with_engine<T>(&self, f: impl FnOnce(&mut dyn SynthEngine) -> T) -> Result<T, DriverError> {
        let mut slot = self.session.lock();
        let session = slot.as_mut().ok_or(DriverError::NotOpen)?;
        Ok(f(&mut *session.engine))
    }

    /// Sends a packed short message.
    pub fn send(&self, message: u32) -> Result<(), DriverError> {
        self.ensure_open()?;
        match self.config.dispatch {
            DispatchMode::Queued => self.queue.enqueue(QueuedEvent::Short(message)),
            DispatchMode::Direct => {
                self.with_engine(|engine| engine.play_short_message(message))?
            }
        }
        Ok(())
    }

    /// Sends a SysEx message, framed (leading `0xF0`) or unframed.
    pub fn sys_ex(&self, message: &[u8]) -> Result<(), DriverError> {
        self.ensure_open()?;
        let message = SysEx::classify(message)
            .ok_or_else(|| DriverError::InvalidMessage("empty SysEx message".to_string()))?;
        match self.config.dispatch {
            DispatchMode::Queued => self.queue.enqueue(QueuedEvent::SysEx(message.into_owned())),
            DispatchMode::Direct => self.with_engine(|engine| dispatch_sysex(engine, message))?,
        }
        Ok(())
    }

    /// Values above 24 are logged and sent anyway.
    pub fn set_pitch_bend_range(&self, channel: ChannelId, range: u8) -> Result<(), DriverError> {
        self.sys_ex(&sysex::pitch_bend_range_message(channel.index(), range))
    }

    /// Replays pending events, then renders `frames` interleaved stereo frames into `out`.
    ///
    /// Rendering is split at timer ticks; the timer callback runs between
    /// segments without the session lock held, so it may call `send`.
    pub fn generate_block(&self, out: &mut [i16], frames: usize) -> Result<usize, DriverError> {
        self.ensure_open()?;
        let channels = ENGINE_CHANNELS as usize;
        let frames = frames.min(out.len() / channels);

        let mut done = 0;
        while done < frames {
            let tick_due = {
                let mut slot = self.session.lock();
                let Some(session) = slot.as_mut() else {
                    break;
                };
                session.replay_pending(&self.queue);
                let step = session.clock.frames_until_tick(frames - done);
                if step > 0 {
                    session
                        .engine
                        .render(&mut out[done * channels..(done + step) * channels], step);
                }
                done += step;
                session.clock.advance(step)
            };
            if tick_due {
                self.fire_timer();
            }
        }

        // Closed mid-block.
        if done < frames {
            out[done * channels..frames * channels].fill(0);
        }
        Ok(frames)
    }

    /// Microseconds between timer callbacks.
    pub fn base_tempo(&self) -> u32 {
        1_000_000 / self.config.base_freq_hz.max(1)
    }

    pub fn set_timer_callback(&self, timer: Option<TimerProc>) {
        self.timer_epoch.fetch_add(1, Ordering::AcqRel);
        *self.timer.lock() = timer;
    }

    fn detach_timer(&self) {
        self.set_timer_callback(None);
    }

    fn fire_timer(&self) {
        let epoch = self.timer_epoch.load(Ordering::Acquire);
        let taken = self.timer.lock().take();
        if let Some(mut timer) = taken {
            timer();
            // Put it back unless it was replaced or detached while running.
            let mut slot = self.timer.lock();
            if slot.is_none() && self.timer_epoch.load(Ordering::Acquire) == epoch {
                *slot = Some(timer);
            }
        }
    }

    pub fn allocate_channel(&self) -> Option<ChannelId> {
        self.channels.lock().allocate()
    }

    pub fn release_channel(&self, channel: ChannelId) {
        self.channels.lock().release(channel);
    }

    pub fn percussion_channel(&self) -> ChannelId {
        self.channels.lock().percussion()
    }

    pub fn channel_mask(&self) -> ChannelMask {
        self.channels.lock().mask()
    }

    pub fn set_channel_mask(&self, mask: ChannelMask) {
        self.channels.lock().set_mask(mask);
    }

    /// Message helpers bound to one logical channel.
    pub fn channel(&self, channel: ChannelId) -> MidiChannel<'_> {
        MidiChannel::new(self, channel)
    }

    /// Generic property accessor. Returns 1 when the property was handled.
    pub fn property(&self, property: DriverProperty, value: u32) -> u32 {
        match property {
            DriverProperty::ChannelMask => {
                self.set_channel_mask(ChannelMask((value & 0xFFFF) as u16));
                1
            }
            DriverProperty::TimeDelay | DriverProperty::OldAdLib => 0,
        }
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Informational reports from the most recent session.
    pub fn recent_reports(&self) -> Vec<ReportEvent> {
        self.last_report
            .lock()
            .as_ref()
            .map(|report| report.recent_events())
            .unwrap_or_default()
    }
}

impl Drop for Mt32Driver {
    fn drop(&mut self) {
        self.close();
    }
}

impl AudioSource for Mt32Driver {
    fn channels(&self) -> u16 {
        ENGINE_CHANNELS
    }

    fn sample_rate_hz(&self) -> u32 {
        ENGINE_SAMPLE_RATE_HZ
    }

    fn read_block(&self, out: &mut [i16]) -> usize {
        let frames = out.len() / ENGINE_CHANNELS as usize;
        match self.generate_block(out, frames) {
            Ok(frames) => frames,
            Err(_) => {
                out.fill(0);
                0
            }
        }
    }
}

impl MidiOutput for Mt32Driver {
    fn send_message(&self, message: &MidiMessage) -> Result<(), MidiError> {
        let result = match message {
            MidiMessage::Short(word) => self.send(*word),
            MidiMessage::SysEx(bytes) => self.sys_ex(bytes),
        };
        result.map_err(|err| match err {
            DriverError::NotOpen => MidiError::DeviceUnavailable("MT-32 emulator".to_string()),
            other => MidiError::Rejected(other.to_string()),
        })
    }
}
