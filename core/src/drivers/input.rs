use std::thread;
use std::thread::JoinHandle;

use log::{info, trace, warn};

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::error::DriverError;
use crate::midi::MidiInput;

use super::{Protocol, SharedPerform};

const THREAD_NAME: &str = "input-driver";

struct InputThread {
  perform: SharedPerform,
  input: Box<dyn MidiInput>,
}

impl InputThread {
  fn handle_messages(&mut self, protocol_rx: Receiver<Protocol>) {
    info!("Handling MIDI input ...");

    loop {
      match protocol_rx.try_recv() {
        Ok(Protocol::Stop) | Err(TryRecvError::Disconnected) => {
          info!("Input driver stopped ...");
          break;
        }
        Ok(Protocol::Wake) | Err(TryRecvError::Empty) => {}
      }

      if let Some(message) = self.input.poll() {
        trace!("Input {:?}", message);
        match self.perform.lock() {
          Ok(mut perform) => {
            perform.route_input(message);
          }
          Err(_) => {
            warn!("The perform lock has been poisoned, stopping the input driver");
            break;
          }
        }
      }
    }
  }
}

/// The thread that routes the incoming events into the performance
pub struct InputDriver {
  handler: JoinHandle<()>,
  protocol_tx: Sender<Protocol>,
}

impl InputDriver {
  pub fn start(perform: SharedPerform, input: Box<dyn MidiInput>) -> Result<InputDriver, DriverError> {
    info!("Spawning the input driver thread ...");

    let (protocol_tx, protocol_rx) = crossbeam_channel::unbounded::<Protocol>();

    thread::Builder::new()
      .name(THREAD_NAME.into())
      .spawn(move || InputThread { perform, input }.handle_messages(protocol_rx))
      .map_err(|err| DriverError::Start {
        name: THREAD_NAME,
        cause: err.to_string(),
      })
      .map(|handler| InputDriver {
        handler,
        protocol_tx,
      })
  }

  pub fn stop(self) -> Result<(), DriverError> {
    info!("Stopping the input driver thread ...");

    self
      .protocol_tx
      .send(Protocol::Stop)
      .map_err(|_| DriverError::Stop { name: THREAD_NAME })
      .and_then(|()| {
        self
          .handler
          .join()
          .map_err(|_| DriverError::Stop { name: THREAD_NAME })
      })
  }
}
