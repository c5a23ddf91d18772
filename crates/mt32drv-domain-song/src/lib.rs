pub mod model;
pub mod smf_import;

pub use model::*;
pub use smf_import::*;
