use log::{debug, info};

use perform_core::midi::{Message, MidiOutput};
use perform_core::time::Pulse;

/// Events kept between two flushes before the oldest ones are dropped
const CAPACITY: usize = 1024;

/// An output sink that writes the played events into the log
pub struct LogMidiOutput {
  pending: Vec<(Message, Pulse)>,
  dropped: usize,
}

impl LogMidiOutput {
  pub fn new() -> LogMidiOutput {
    LogMidiOutput {
      pending: Vec::with_capacity(CAPACITY),
      dropped: 0,
    }
  }
}

impl MidiOutput for LogMidiOutput {
  fn emit(&mut self, message: &Message, due_tick: Pulse) {
    if self.pending.len() < CAPACITY {
      self.pending.push((*message, due_tick));
    } else {
      self.dropped += 1;
    }
  }

  fn all_notes_off(&mut self) {
    info!("All notes off");
  }

  fn flush(&mut self) {
    for (message, tick) in self.pending.drain(..) {
      debug!("{:>8} {:?}", tick, message);
    }
    if self.dropped > 0 {
      debug!("{} events dropped", self.dropped);
      self.dropped = 0;
    }
  }
}
