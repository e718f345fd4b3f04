pub mod bars;
pub mod clock;
pub mod drift_correction;
pub mod pulses;
pub mod signature;
pub mod tempo;

pub use self::bars::BarsTime;
pub use self::clock::ClockTime;
pub use self::drift_correction::PulsesDriftCorrection;
pub use self::pulses::{Ppqn, Pulse, DEFAULT_PPQN};
pub use self::signature::Signature;
pub use self::tempo::Tempo;
