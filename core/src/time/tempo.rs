use super::Ppqn;

pub const MIN_BEATS_PER_MINUTE: f64 = 20.0;
pub const MAX_BEATS_PER_MINUTE: f64 = 500.0;

/// Tempo in quarter notes per minute
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo(f64);

impl Tempo {
  pub fn new(beats_per_minute: f64) -> Tempo {
    Tempo(beats_per_minute.max(MIN_BEATS_PER_MINUTE).min(MAX_BEATS_PER_MINUTE))
  }

  pub fn get_value(&self) -> f64 {
    self.0
  }

  pub fn pulses_per_minute(&self, ppqn: Ppqn) -> f64 {
    self.0 * f64::from(ppqn)
  }
}

impl From<Tempo> for f64 {
  fn from(item: Tempo) -> Self {
    item.0
  }
}

#[cfg(test)]
mod test {

  use super::Tempo;

  #[test]
  pub fn tempo_new() {
    let tempo = Tempo::new(120.0);
    assert_eq!(tempo.get_value(), 120.0);
  }

  #[test]
  pub fn tempo_is_clamped() {
    assert_eq!(Tempo::new(1.0).get_value(), 20.0);
    assert_eq!(Tempo::new(1000.0).get_value(), 500.0);
  }

  #[test]
  pub fn tempo_pulses_per_minute() {
    assert_eq!(Tempo::new(120.0).pulses_per_minute(192), 23_040.0);
  }
}
