use std::sync::{Arc, Mutex};

use log::{info, warn};

use crate::config::Driver as DriverConfig;
use crate::drivers::{InputDriver, OutputDriver, SharedPerform};
use crate::error::{EditResult, EngineError, EngineResult};
use crate::midi::MidiInput;
use crate::perform::Perform;
use crate::time::Pulse;

///! Owns the performance and the driver threads playing it.
///!
///! Every control operation locks the performance for its duration only, so the output
///! driver at most skips the slice that overlaps it.
pub struct Engine {
  perform: SharedPerform,
  config: DriverConfig,
  output: Option<OutputDriver>,
  input: Option<InputDriver>,
}

impl Engine {
  pub fn new(perform: Perform, config: &DriverConfig) -> Engine {
    Engine {
      perform: Arc::new(Mutex::new(perform)),
      config: config.clone(),
      output: None,
      input: None,
    }
  }

  pub fn perform(&self) -> SharedPerform {
    self.perform.clone()
  }

  pub fn is_launched(&self) -> bool {
    self.output.is_some()
  }

  /// Spawns the output driver, and the input driver when there is an input to drain
  pub fn launch(&mut self, input: Option<Box<dyn MidiInput>>) -> EngineResult<()> {
    if self.is_launched() {
      warn!("The engine was already launched");
      return Ok(());
    }

    let output = OutputDriver::start(self.perform.clone(), &self.config)?;
    if let Some(input) = input {
      match InputDriver::start(self.perform.clone(), input) {
        Ok(input) => self.input = Some(input),
        Err(err) => {
          drop(output.stop());
          return Err(err.into());
        }
      }
    }
    self.output = Some(output);
    info!("Engine launched");
    Ok(())
  }

  /// Stops the playback and joins the driver threads
  pub fn finish(&mut self) -> EngineResult<()> {
    if !self.is_launched() {
      return Ok(());
    }

    let stopped = self.with_perform(|perform| {
      if perform.is_running() || perform.is_paused() {
        perform.stop();
      }
    });

    if let Some(input) = self.input.take() {
      input.stop()?;
    }
    if let Some(output) = self.output.take() {
      output.stop()?;
    }
    info!("Engine finished");
    stopped
  }

  pub fn with_perform<T, F>(&self, f: F) -> EngineResult<T>
  where
    F: FnOnce(&mut Perform) -> T,
  {
    let mut perform = self.perform.lock().map_err(|_| EngineError::PerformLock)?;
    Ok(f(&mut perform))
  }

  /// Runs an edit of the performance, flattening its error
  pub fn edit<T, F>(&self, f: F) -> EngineResult<T>
  where
    F: FnOnce(&mut Perform) -> EditResult<T>,
  {
    self.with_perform(f)?.map_err(EngineError::from)
  }

  fn wake(&self) {
    if let Some(output) = self.output.as_ref() {
      output.wake();
    }
  }

  pub fn start(&self, song_mode: bool) -> EngineResult<()> {
    if !self.is_launched() {
      return Err(EngineError::NotLaunched);
    }
    self.with_perform(|perform| perform.start(song_mode))?;
    self.wake();
    Ok(())
  }

  pub fn stop(&self) -> EngineResult<()> {
    self.with_perform(|perform| perform.stop())?;
    self.wake();
    Ok(())
  }

  pub fn pause(&self) -> EngineResult<bool> {
    self.with_perform(|perform| perform.pause())
  }

  pub fn reposition(&self, tick: Pulse) -> EngineResult<()> {
    self.with_perform(|perform| perform.reposition(tick))
  }

  pub fn set_left_tick(&self, tick: Pulse) -> EngineResult<()> {
    self.with_perform(|perform| perform.set_left_tick(tick))
  }

  pub fn set_right_tick(&self, tick: Pulse) -> EngineResult<()> {
    self.with_perform(|perform| perform.set_right_tick(tick))
  }

  pub fn get_tick(&self) -> EngineResult<Pulse> {
    self.with_perform(|perform| perform.get_tick())
  }

  pub fn is_running(&self) -> EngineResult<bool> {
    self.with_perform(|perform| perform.is_running())
  }

  pub fn is_master(&self) -> EngineResult<bool> {
    self.with_perform(|perform| perform.is_master())
  }
}

impl Drop for Engine {
  fn drop(&mut self) {
    if let Err(err) = self.finish() {
      warn!("Failed to finish the engine: {}", err);
    }
  }
}
