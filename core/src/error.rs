use failure::Fail;

use crate::time::Pulse;

///! Rejections of control plane edits. The timeline is left untouched when returned.
#[derive(Debug, Fail, PartialEq, Eq)]
pub enum EditError {
  #[fail(display = "Track not found: {}", index)]
  TrackNotFound { index: usize },

  #[fail(display = "Invalid length: {}", length)]
  InvalidLength { length: Pulse },

  #[fail(display = "Invalid tick: {}", tick)]
  InvalidTick { tick: Pulse },

  #[fail(display = "No trigger at tick {}", tick)]
  NoTriggerAt { tick: Pulse },

  #[fail(display = "No trigger selected")]
  NothingSelected,

  #[fail(display = "Nothing has been copied")]
  NothingToPaste,
}

pub type EditResult<T> = Result<T, EditError>;

#[derive(Debug, Fail)]
pub enum SyncError {
  #[fail(display = "External transport unavailable: {}", cause)]
  Unavailable { cause: String },

  #[fail(display = "External transport disconnected")]
  Disconnected,
}

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Fail)]
pub enum DriverError {
  #[fail(display = "Failed to create the {} thread: {}", name, cause)]
  Start { name: &'static str, cause: String },

  #[fail(display = "Failed to join the {} thread", name)]
  Stop { name: &'static str },
}

#[derive(Debug, Fail)]
pub enum EngineError {
  #[fail(display = "The perform lock has been poisoned")]
  PerformLock,

  #[fail(display = "The engine has not been launched")]
  NotLaunched,

  #[fail(display = "{}", cause)]
  Driver { cause: DriverError },

  #[fail(display = "{}", cause)]
  Edit { cause: EditError },
}

impl From<DriverError> for EngineError {
  fn from(cause: DriverError) -> Self {
    EngineError::Driver { cause }
  }
}

impl From<EditError> for EngineError {
  fn from(cause: EditError) -> Self {
    EngineError::Edit { cause }
  }
}

pub type EngineResult<T> = Result<T, EngineError>;
