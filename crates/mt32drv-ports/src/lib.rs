pub mod audio;
pub mod firmware;
pub mod midi;
pub mod storage;
pub mod synth;
pub mod types;

pub use audio::*;
pub use firmware::*;
pub use midi::*;
pub use storage::*;
pub use synth::*;
pub use types::*;
