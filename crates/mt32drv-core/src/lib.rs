pub mod channels;
pub mod config;
pub mod driver;
pub mod event_queue;
pub mod firmware;
pub mod midi_channel;
pub mod player;
pub mod report;
pub mod sysex;
pub mod tick_clock;

pub use channels::*;
pub use config::*;
pub use driver::*;
pub use event_queue::*;
pub use firmware::*;
pub use midi_channel::*;
pub use player::*;
pub use report::*;
pub use sysex::*;
pub use tick_clock::*;
