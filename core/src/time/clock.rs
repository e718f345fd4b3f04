use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::time::Duration;

use super::{Ppqn, Tempo};

pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

pub type UnitType = u64;
pub const UNITS_PER_SECOND: UnitType = NANOS_PER_SECOND as UnitType;
pub const UNITS_PER_NANO: UnitType = NANOS_PER_SECOND / UNITS_PER_SECOND;

const SECONDS_PER_MINUTE: u64 = 60;
pub const UNITS_PER_MINUTE: u64 = UNITS_PER_SECOND * SECONDS_PER_MINUTE;

///! High resolution wall clock time
#[derive(Debug, PartialOrd, PartialEq, Clone, Copy)]
pub struct ClockTime(UnitType);

impl ClockTime {
  pub fn zero() -> ClockTime {
    ClockTime(0)
  }

  pub fn new(units: UnitType) -> ClockTime {
    ClockTime(units)
  }

  pub fn from_seconds(seconds: f64) -> ClockTime {
    ClockTime((seconds * UNITS_PER_SECOND as f64).round() as UnitType)
  }

  pub fn from_frames(frames: u64, frame_rate: u32) -> ClockTime {
    let units = u128::from(frames) * u128::from(UNITS_PER_SECOND) / u128::from(frame_rate.max(1));
    ClockTime(units as UnitType)
  }

  pub fn units(&self) -> UnitType {
    self.0
  }

  pub fn to_nanos(&self) -> u64 {
    self.0 as u64 / UNITS_PER_NANO
  }

  pub fn to_seconds(&self) -> f64 {
    self.0 as f64 / UNITS_PER_SECOND as f64
  }

  /// Fractional pulses elapsed during this time at the given tempo and resolution
  pub fn to_pulses(&self, ppqn: Ppqn, tempo: Tempo) -> f64 {
    self.0 as f64 * tempo.pulses_per_minute(ppqn) / UNITS_PER_MINUTE as f64
  }
}

impl From<Duration> for ClockTime {
  fn from(duration: Duration) -> Self {
    ClockTime(duration.as_nanos() as UnitType * UNITS_PER_NANO)
  }
}

impl From<ClockTime> for Duration {
  fn from(time: ClockTime) -> Self {
    Duration::from_nanos(time.to_nanos())
  }
}

impl Add for ClockTime {
  type Output = ClockTime;

  fn add(self, rhs: ClockTime) -> ClockTime {
    ClockTime(self.0 + rhs.0)
  }
}

impl AddAssign for ClockTime {
  fn add_assign(&mut self, rhs: ClockTime) {
    *self = *self + rhs;
  }
}

impl Sub for ClockTime {
  type Output = ClockTime;

  fn sub(self, rhs: ClockTime) -> ClockTime {
    ClockTime(self.0.saturating_sub(rhs.0))
  }
}

impl SubAssign for ClockTime {
  fn sub_assign(&mut self, rhs: ClockTime) {
    *self = *self - rhs;
  }
}
