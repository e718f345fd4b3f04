use crate::time::{ClockTime, Ppqn, Pulse, Tempo};

///! Converts wall clock slices into whole pulses without losing the fractional remainder.
///!
///! Each slice rarely lasts an exact number of pulses, so the remainder is carried into
///! the next slice. Otherwise the clock would drift behind the tempo.
#[derive(Debug, Clone)]
pub struct PulsesDriftCorrection {
  pulses_per_second: f64,
  error_accumulated: f64,
  last_correction: f64,
}

impl PulsesDriftCorrection {
  pub fn new(ppqn: Ppqn, tempo: Tempo) -> PulsesDriftCorrection {
    PulsesDriftCorrection {
      pulses_per_second: tempo.pulses_per_minute(ppqn) / 60.0,
      error_accumulated: 0.0,
      last_correction: 0.0,
    }
  }

  pub fn get_pulses_per_second(&self) -> f64 {
    self.pulses_per_second
  }

  pub fn get_error_accumulated(&self) -> f64 {
    self.error_accumulated
  }

  pub fn get_last_correction(&self) -> f64 {
    self.last_correction
  }

  pub fn reset(&mut self) {
    self.error_accumulated = 0.0;
    self.last_correction = 0.0;
  }

  pub fn next(&mut self, elapsed: ClockTime) -> Pulse {
    let exact = self.pulses_per_second * elapsed.to_seconds() + self.error_accumulated;
    let whole = exact.floor();
    self.last_correction = whole - (exact - self.error_accumulated).floor();
    self.error_accumulated = exact - whole;
    whole as Pulse
  }
}

#[cfg(test)]
mod test {

  use super::PulsesDriftCorrection;
  use crate::time::{ClockTime, Tempo};

  #[test]
  pub fn pulses_drift_correction_new() {
    let correction = PulsesDriftCorrection::new(192, Tempo::new(120.0));
    assert_eq!(correction.get_pulses_per_second(), 384.0);
    assert_eq!(correction.get_error_accumulated(), 0.0);
    assert_eq!(correction.get_last_correction(), 0.0);
  }

  #[test]
  pub fn pulses_drift_correction_next() {
    // 1/256 s at 384 pulses per second is 1.5 pulses
    let mut correction = PulsesDriftCorrection::new(192, Tempo::new(120.0));
    let slice = ClockTime::from_seconds(0.003_906_25);
    let total: i64 = (0..1000).map(|_| correction.next(slice)).sum();
    assert_eq!(total, 1500);
  }

  #[test]
  pub fn pulses_drift_correction_carries_remainder() {
    let mut correction = PulsesDriftCorrection::new(192, Tempo::new(120.0));
    let slice = ClockTime::from_seconds(0.003_906_25);
    assert_eq!(correction.next(slice), 1);
    assert_eq!(correction.get_error_accumulated(), 0.5);
    assert_eq!(correction.get_last_correction(), 0.0);
    assert_eq!(correction.next(slice), 2);
    assert_eq!(correction.get_error_accumulated(), 0.0);
    assert_eq!(correction.get_last_correction(), 1.0);
  }
}
