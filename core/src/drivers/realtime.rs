use std::time::Duration;

#[cfg(any(target_os = "macos", target_os = "windows"))]
use audio_thread_priority::{
  demote_current_thread_from_real_time, promote_current_thread_to_real_time, RtPriorityHandle,
};

use failure::Fail;

/// Rate used to express a slice as a buffer of frames for the scheduler
const REFERENCE_RATE: u32 = 48_000;

#[derive(Debug, Fail)]
pub enum RealTimePriorityError {
  #[fail(display = "Thread could not be promoted to real time: {}", cause)]
  Promote { cause: String },
}

///! Real-time scheduling of the current thread, released when dropped
pub struct RealTimePriority {
  #[cfg(any(target_os = "macos", target_os = "windows"))]
  handle: Option<RtPriorityHandle>,
}

impl RealTimePriority {
  /// Promotes the current thread so that it can wake up every `slice`
  pub fn promote(slice: Duration) -> Result<RealTimePriority, RealTimePriorityError> {
    let frames = slice.as_micros() * u128::from(REFERENCE_RATE) / 1_000_000;
    Self::promote_rt(REFERENCE_RATE, (frames as u32).max(1))
  }

  #[cfg(any(target_os = "macos", target_os = "windows"))]
  fn promote_rt(
    sample_rate: u32,
    buffer_size: u32,
  ) -> Result<RealTimePriority, RealTimePriorityError> {
    promote_current_thread_to_real_time(buffer_size, sample_rate)
      .map(|handle| RealTimePriority {
        handle: Some(handle),
      })
      .map_err(|err| RealTimePriorityError::Promote {
        cause: format!("{:?}", err),
      })
  }

  #[cfg(any(target_os = "macos", target_os = "windows"))]
  fn demote_rt(&mut self) {
    self.handle.take().into_iter().for_each(|handle| {
      let _ = demote_current_thread_from_real_time(handle);
    });
  }

  // TODO promote through rtkit on linux
  #[cfg(not(any(target_os = "macos", target_os = "windows")))]
  fn promote_rt(
    _sample_rate: u32,
    _buffer_size: u32,
  ) -> Result<RealTimePriority, RealTimePriorityError> {
    Ok(RealTimePriority {})
  }

  #[cfg(not(any(target_os = "macos", target_os = "windows")))]
  fn demote_rt(&mut self) {}
}

impl Drop for RealTimePriority {
  fn drop(&mut self) {
    self.demote_rt();
  }
}
