use super::pulses::{measure_pulses, Ppqn, Pulse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
  beats_per_bar: u8, // numerator
  beat_width: u8,    // denominator
}

impl Signature {
  pub fn new(beats_per_bar: u8, beat_width: u8) -> Signature {
    Signature {
      beats_per_bar: beats_per_bar.max(1),
      beat_width: if beat_width.is_power_of_two() && beat_width <= 32 {
        beat_width
      } else {
        4
      },
    }
  }

  pub fn get_beats_per_bar(&self) -> u8 {
    self.beats_per_bar
  }

  pub fn get_beat_width(&self) -> u8 {
    self.beat_width
  }

  pub fn beat_pulses(&self, ppqn: Ppqn) -> Pulse {
    Pulse::from(ppqn) * 4 / Pulse::from(self.beat_width)
  }

  pub fn measure_pulses(&self, ppqn: Ppqn) -> Pulse {
    measure_pulses(ppqn, self.beats_per_bar, self.beat_width)
  }
}

impl Default for Signature {
  fn default() -> Self {
    Signature::new(4, 4)
  }
}

#[cfg(test)]
mod test {

  use super::Signature;

  #[test]
  pub fn signature_new() {
    let signature = Signature::new(3, 4);
    assert_eq!(signature.get_beats_per_bar(), 3);
    assert_eq!(signature.get_beat_width(), 4);
  }

  #[test]
  pub fn signature_rejects_odd_widths() {
    let signature = Signature::new(0, 5);
    assert_eq!(signature.get_beats_per_bar(), 1);
    assert_eq!(signature.get_beat_width(), 4);
  }

  #[test]
  pub fn signature_pulses() {
    let signature = Signature::new(6, 8);
    assert_eq!(signature.beat_pulses(192), 96);
    assert_eq!(signature.measure_pulses(192), 576);
  }
}
