use std::sync::TryLockError;
use std::thread;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::config::Driver as DriverConfig;
use crate::error::DriverError;
use crate::time::ClockTime;

use super::realtime::RealTimePriority;
use super::{Protocol, SharedPerform};

const THREAD_NAME: &str = "output-driver";

/// Shortest slice accepted from the configuration
const MIN_SLICE: Duration = Duration::from_micros(100);

struct OutputThread {
  perform: SharedPerform,
  slice: Duration,
  realtime_priority: bool,
  clocked: bool,
  last_instant: Instant,
  carried: ClockTime,
}

impl OutputThread {
  fn new(perform: SharedPerform, slice: Duration, realtime_priority: bool) -> OutputThread {
    // a bridged perform has to be polled even before any local start
    let clocked = perform
      .lock()
      .map(|perform| perform.needs_clock())
      .unwrap_or(false);
    OutputThread {
      perform,
      slice,
      realtime_priority,
      clocked,
      last_instant: Instant::now(),
      carried: ClockTime::zero(),
    }
  }

  fn handle_messages(&mut self, protocol_rx: Receiver<Protocol>) {
    info!("Handling output slices every {:?} ...", self.slice);

    let _rt_priority = if self.realtime_priority {
      self.promote_to_real_time()
    } else {
      None
    };

    loop {
      let received = if self.clocked {
        match protocol_rx.recv_timeout(self.slice) {
          Ok(message) => Some(message),
          Err(RecvTimeoutError::Timeout) => None,
          Err(RecvTimeoutError::Disconnected) => Some(Protocol::Stop),
        }
      } else {
        Some(protocol_rx.recv().unwrap_or(Protocol::Stop))
      };

      match received {
        Some(Protocol::Stop) => {
          info!("Output driver stopped ...");
          break;
        }
        Some(Protocol::Wake) => {
          if !self.clocked {
            trace!("Output driver woken up");
            self.last_instant = Instant::now();
            self.carried = ClockTime::zero();
            self.clocked = true;
          }
        }
        None => {
          if !self.process_slice() {
            break;
          }
        }
      }
    }
  }

  /// Runs one slice, returns false when the driver can not go on
  fn process_slice(&mut self) -> bool {
    let now = Instant::now();
    self.carried += ClockTime::from(now.duration_since(self.last_instant));
    self.last_instant = now;

    match self.perform.try_lock() {
      Ok(mut perform) => {
        perform.process(self.carried);
        self.carried = ClockTime::zero();
        self.clocked = perform.needs_clock();
        if !self.clocked {
          debug!("Output driver idle");
        }
        true
      }
      Err(TryLockError::WouldBlock) => {
        trace!("Perform busy, carrying {:?} into the next slice", self.carried);
        true
      }
      Err(TryLockError::Poisoned(_)) => {
        warn!("The perform lock has been poisoned, stopping the output driver");
        false
      }
    }
  }

  fn promote_to_real_time(&self) -> Option<RealTimePriority> {
    match RealTimePriority::promote(self.slice) {
      Ok(rt_priority) => {
        debug!("Output driver thread has now real-time priority");
        Some(rt_priority)
      }
      Err(err) => {
        warn!("Couldn't promote the output driver thread into real time: {}", err);
        None
      }
    }
  }
}

/// The thread that advances the performance once per slice
pub struct OutputDriver {
  handler: JoinHandle<()>,
  protocol_tx: Sender<Protocol>,
}

impl OutputDriver {
  pub fn new_channel() -> (Sender<Protocol>, Receiver<Protocol>) {
    crossbeam_channel::unbounded::<Protocol>()
  }

  pub fn start(perform: SharedPerform, config: &DriverConfig) -> Result<OutputDriver, DriverError> {
    info!("Spawning the output driver thread ...");

    let (protocol_tx, protocol_rx) = Self::new_channel();
    let slice = Duration::from_micros(config.slice_micros).max(MIN_SLICE);
    let realtime_priority = config.realtime_priority;

    thread::Builder::new()
      .name(THREAD_NAME.into())
      .spawn(move || {
        OutputThread::new(perform, slice, realtime_priority).handle_messages(protocol_rx)
      })
      .map_err(|err| DriverError::Start {
        name: THREAD_NAME,
        cause: err.to_string(),
      })
      .map(|handler| OutputDriver {
        handler,
        protocol_tx,
      })
  }

  /// Makes an idle driver look at the clock again
  pub fn wake(&self) {
    drop(self.protocol_tx.send(Protocol::Wake));
  }

  pub fn stop(self) -> Result<(), DriverError> {
    info!("Stopping the output driver thread ...");

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

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};
  use std::thread;
  use std::time::{Duration, Instant};

  use super::OutputDriver;
  use crate::config::{Driver as DriverConfig, Engine as EngineConfig};
  use crate::midi::io::test::RecordingOutput;
  use crate::perform::Perform;

  fn driver_config() -> DriverConfig {
    DriverConfig {
      slice_micros: 1_000,
      realtime_priority: false,
    }
  }

  #[test]
  pub fn advances_while_running() {
    let output = RecordingOutput::new();
    let perform = Arc::new(Mutex::new(Perform::new(
      &EngineConfig::default(),
      Box::new(output.clone()),
    )));
    let driver = OutputDriver::start(perform.clone(), &driver_config()).unwrap();

    perform.lock().unwrap().start(true);
    driver.wake();
    thread::sleep(Duration::from_millis(100));
    assert!(perform.lock().unwrap().get_tick() > 0);
    assert!(output.flushes() > 0);

    perform.lock().unwrap().stop();
    driver.stop().unwrap();
  }

  #[test]
  pub fn idle_driver_stops_immediately() {
    let output = RecordingOutput::new();
    let perform = Arc::new(Mutex::new(Perform::new(
      &EngineConfig::default(),
      Box::new(output.clone()),
    )));
    let driver = OutputDriver::start(perform.clone(), &driver_config()).unwrap();
    thread::sleep(Duration::from_millis(10));

    let started = Instant::now();
    driver.stop().unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(perform.lock().unwrap().get_tick(), 0);
    assert_eq!(output.flushes(), 0);
  }
}
