use std::fmt;

use crate::time::{Ppqn, Pulse, Signature};

#[derive(PartialEq)]
pub struct BarsTime {
  bars: i64,
  beats: u16,
  pulses: u16,
}

impl BarsTime {
  pub fn new(bars: i64, beats: u16, pulses: u16) -> BarsTime {
    BarsTime {
      bars,
      beats,
      pulses,
    }
  }

  pub fn from_bars(bars: i64) -> BarsTime {
    BarsTime::new(bars, 0, 0)
  }

  pub fn from_pulses(tick: Pulse, signature: Signature, ppqn: Ppqn) -> BarsTime {
    let beat_pulses = signature.beat_pulses(ppqn).max(1);
    let total_beats = tick.div_euclid(beat_pulses);
    let beats_per_bar = Pulse::from(signature.get_beats_per_bar());
    BarsTime {
      bars: total_beats.div_euclid(beats_per_bar),
      beats: total_beats.rem_euclid(beats_per_bar) as u16,
      pulses: tick.rem_euclid(beat_pulses) as u16,
    }
  }

  pub fn get_bars(&self) -> i64 {
    self.bars
  }

  pub fn get_beats(&self) -> u16 {
    self.beats
  }

  pub fn get_pulses(&self) -> u16 {
    self.pulses
  }

  pub fn to_pulses(&self, signature: Signature, ppqn: Ppqn) -> Pulse {
    let beat_pulses = signature.beat_pulses(ppqn);
    self.bars * signature.measure_pulses(ppqn)
      + Pulse::from(self.beats) * beat_pulses
      + Pulse::from(self.pulses)
  }
}

impl fmt::Debug for BarsTime {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(
      f,
      "{:03}:{:02}:{:03}",
      self.bars + 1,
      self.beats + 1,
      self.pulses
    )
  }
}
