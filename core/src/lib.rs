pub mod config;
pub mod drivers;
pub mod engine;
pub mod error;
pub mod midi;
pub mod perform;
pub mod sync;
pub mod time;
pub mod track;
pub mod transport;
pub mod triggers;
