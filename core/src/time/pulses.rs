///! Pulses (MIDI ticks) are the smallest unit of musical time the engine counts in.
///!
///! They are signed because offsets and backward moves are computed before being
///! folded back into range.
pub type Pulse = i64;

/// Pulses per quarter note
pub type Ppqn = u32;

pub const DEFAULT_PPQN: Ppqn = 192;

/// The pulses of one measure for a meter of `beats_per_bar` beats of `beat_width` notes
pub fn measure_pulses(ppqn: Ppqn, beats_per_bar: u8, beat_width: u8) -> Pulse {
  Pulse::from(ppqn) * 4 * Pulse::from(beats_per_bar) / Pulse::from(beat_width.max(1))
}

/// Rounds `tick` down to the previous multiple of `snap`
pub fn snap_down(tick: Pulse, snap: Pulse) -> Pulse {
  if snap > 0 {
    tick - tick.rem_euclid(snap)
  } else {
    tick
  }
}

#[cfg(test)]
mod test {
  use super::{measure_pulses, snap_down};

  #[test]
  pub fn measure_pulses_common_time() {
    assert_eq!(measure_pulses(192, 4, 4), 768);
  }

  #[test]
  pub fn measure_pulses_compound_time() {
    assert_eq!(measure_pulses(192, 6, 8), 576);
  }

  #[test]
  pub fn snap_down_rounds_towards_negative() {
    assert_eq!(snap_down(100, 48), 96);
    assert_eq!(snap_down(-1, 48), -48);
    assert_eq!(snap_down(100, 0), 100);
  }
}
