use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::midi::messages::Message;
use crate::time::Pulse;

/// Destination of the events played by the output driver.
///
/// Implementations are called from the real-time thread, they must not block for longer
/// than a slice.
pub trait MidiOutput: Send {
  fn emit(&mut self, message: &Message, due_tick: Pulse);

  fn all_notes_off(&mut self);

  fn flush(&mut self);
}

/// Source of incoming events drained by the input driver
pub trait MidiInput: Send {
  /// Waits a bounded amount of time for the next event
  fn poll(&mut self) -> Option<Message>;
}

/// Drops everything, used when no output is connected
pub struct NullOutput;

impl MidiOutput for NullOutput {
  fn emit(&mut self, _message: &Message, _due_tick: Pulse) {}

  fn all_notes_off(&mut self) {}

  fn flush(&mut self) {}
}

pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(10);

pub struct ChannelInput {
  rx: Receiver<Message>,
  timeout: Duration,
}

impl ChannelInput {
  // TODO Bound the channel once the producers can handle back pressure
  pub fn new_channel() -> (Sender<Message>, Receiver<Message>) {
    crossbeam_channel::unbounded::<Message>()
  }

  pub fn new(rx: Receiver<Message>) -> ChannelInput {
    ChannelInput {
      rx,
      timeout: DEFAULT_POLL_TIMEOUT,
    }
  }

  pub fn with_timeout(rx: Receiver<Message>, timeout: Duration) -> ChannelInput {
    ChannelInput { rx, timeout }
  }
}

impl MidiInput for ChannelInput {
  fn poll(&mut self) -> Option<Message> {
    match self.rx.recv_timeout(self.timeout) {
      Ok(message) => Some(message),
      Err(RecvTimeoutError::Timeout) => None,
      Err(RecvTimeoutError::Disconnected) => {
        // avoid spinning once every sender is gone
        std::thread::sleep(self.timeout);
        None
      }
    }
  }
}
