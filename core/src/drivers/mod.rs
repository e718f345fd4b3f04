mod input;
mod output;
mod realtime;

pub use self::input::InputDriver;
pub use self::output::OutputDriver;
pub use self::realtime::{RealTimePriority, RealTimePriorityError};

use std::sync::{Arc, Mutex};

use crate::perform::Perform;

/// The performance context shared between the control plane and the driver threads
pub type SharedPerform = Arc<Mutex<Perform>>;

pub enum Protocol {
  /// The playback state changed, the driver has to look at the clock again
  Wake,

  Stop,
}
