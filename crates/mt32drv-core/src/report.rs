use mt32drv_ports::synth::ReportHandler;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;

const RECENT_CAPACITY: usize = 64;

/// Fatal engine report; initialization must not continue after one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FatalReport {
    ControlRom,
    PcmRom,
}

impl fmt::Display for FatalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalReport::ControlRom => {
                write!(f, "MT32emu: Init Error - Missing or invalid Control ROM image")
            }
            FatalReport::PcmRom => write!(f, "MT32emu: Init Error - Missing PCM ROM image"),
        }
    }
}

/// Informational reports kept for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ReportEvent {
    LcdMessage(String),
    DeviceReset,
    DeviceReconfig,
    ReverbMode(u8),
    ReverbTime(u8),
    ReverbLevel(u8),
    PartState { part: u8, active: bool },
    PolyState { part: u8 },
    ProgramChanged { part: u8, patch_name: String },
}

/// The driver's report channel. One instance is bound to each engine.
#[derive(Debug, Default)]
pub struct DriverReport {
    fatal: Mutex<Option<FatalReport>>,
    recent: Mutex<VecDeque<ReportEvent>>,
}

impl DriverReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// First fatal report raised since construction, if any.
    pub fn fatal(&self) -> Option<FatalReport> {
        *self.fatal.lock()
    }

    pub fn recent_events(&self) -> Vec<ReportEvent> {
        self.recent.lock().iter().cloned().collect()
    }

    fn raise_fatal(&self, report: FatalReport) {
        tracing::error!("{}", report);
        let mut fatal = self.fatal.lock();
        if fatal.is_none() {
            *fatal = Some(report);
        }
    }

    fn record(&self, event: ReportEvent) {
        tracing::debug!("engine report: {:?}", event);
        let mut recent = self.recent.lock();
        if recent.len() == RECENT_CAPACITY {
            recent.pop_front();
        }
        recent.push_back(event);
    }
}

impl ReportHandler for DriverReport {
    fn print_debug(&self, message: &str) {
        tracing::debug!("MT32emu: {}", message);
    }

    fn on_error_control_rom(&self) {
        self.raise_fatal(FatalReport::ControlRom);
    }

    fn on_error_pcm_rom(&self) {
        self.raise_fatal(FatalReport::PcmRom);
    }

    fn show_lcd_message(&self, message: &str) {
        tracing::info!("MT-32 LCD: {}", message);
        self.record(ReportEvent::LcdMessage(message.to_string()));
    }

    fn on_device_reset(&self) {
        self.record(ReportEvent::DeviceReset);
    }

    fn on_device_reconfig(&self) {
        self.record(ReportEvent::DeviceReconfig);
    }

    fn on_new_reverb_mode(&self, mode: u8) {
        self.record(ReportEvent::ReverbMode(mode));
    }

    fn on_new_reverb_time(&self, time: u8) {
        self.record(ReportEvent::ReverbTime(time));
    }

    fn on_new_reverb_level(&self, level: u8) {
        self.record(ReportEvent::ReverbLevel(level));
    }

    fn on_part_state_changed(&self, part: u8, is_active: bool) {
        self.record(ReportEvent::PartState {
            part,
            active: is_active,
        });
    }

    fn on_poly_state_changed(&self, part: u8) {
        self.record(ReportEvent::PolyState { part });
    }

    // Far too frequent to keep.
    fn on_partial_state_changed(&self, partial: u16, old_phase: u8, new_phase: u8) {
        tracing::trace!("partial {} phase {} -> {}", partial, old_phase, new_phase);
    }

    fn on_program_changed(&self, part: u8, patch_name: &str) {
        self.record(ReportEvent::ProgramChanged {
            part,
            patch_name: patch_name.to_string(),
        });
    }
}
