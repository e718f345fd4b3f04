use serde_derive::{Deserialize, Serialize};

use crate::time::Pulse;

/// Which bounds of a trigger an interactive edit changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowEdit {
  Start,
  End,
  Move,
}

/// An interval of the song timeline where a track is audible.
///
/// Both ends are inclusive. The offset is the phase applied when reading the looped
/// track content under this interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
  pub(super) tick_start: Pulse,
  pub(super) tick_end: Pulse,
  pub(super) offset: Pulse,
  pub(super) selected: bool,
}

impl Trigger {
  pub fn new(tick_start: Pulse, tick_end: Pulse, offset: Pulse) -> Trigger {
    Trigger {
      tick_start,
      tick_end,
      offset,
      selected: false,
    }
  }

  pub fn tick_start(&self) -> Pulse {
    self.tick_start
  }

  pub fn tick_end(&self) -> Pulse {
    self.tick_end
  }

  pub fn offset(&self) -> Pulse {
    self.offset
  }

  pub fn is_selected(&self) -> bool {
    self.selected
  }

  pub fn length(&self) -> Pulse {
    self.tick_end - self.tick_start + 1
  }

  pub fn contains(&self, tick: Pulse) -> bool {
    self.tick_start <= tick && tick <= self.tick_end
  }

  /// Whether one of the trigger bounds falls inside `[start_tick, end_tick]`
  pub fn at_transition(&self, start_tick: Pulse, end_tick: Pulse) -> bool {
    (start_tick <= self.tick_start && self.tick_start <= end_tick)
      || (start_tick <= self.tick_end && self.tick_end <= end_tick)
  }

  pub fn overlaps(&self, other: &Trigger) -> bool {
    self.tick_start <= other.tick_end && other.tick_start <= self.tick_end
  }

  pub(super) fn unselected(&self) -> Trigger {
    Trigger {
      selected: false,
      ..*self
    }
  }

  pub fn record(&self) -> TriggerRecord {
    TriggerRecord {
      tick_start: self.tick_start,
      tick_end: self.tick_end,
      offset: self.offset,
    }
  }
}

/// The persisted form of a trigger, as read and written by the song file layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRecord {
  pub tick_start: Pulse,
  pub tick_end: Pulse,
  #[serde(default)]
  pub offset: Pulse,
}

impl TriggerRecord {
  pub fn new(tick_start: Pulse, tick_end: Pulse, offset: Pulse) -> TriggerRecord {
    TriggerRecord {
      tick_start,
      tick_end,
      offset,
    }
  }

  pub fn is_valid(&self) -> bool {
    self.tick_start >= 0 && self.tick_end >= self.tick_start
  }
}

#[cfg(test)]
mod test {
  use super::{Trigger, TriggerRecord};

  #[test]
  pub fn trigger_bounds() {
    let trigger = Trigger::new(10, 19, 3);
    assert_eq!(trigger.length(), 10);
    assert!(trigger.contains(10));
    assert!(trigger.contains(19));
    assert!(!trigger.contains(20));
    assert!(!trigger.is_selected());
  }

  #[test]
  pub fn trigger_overlaps() {
    let trigger = Trigger::new(10, 19, 0);
    assert!(trigger.overlaps(&Trigger::new(19, 30, 0)));
    assert!(trigger.overlaps(&Trigger::new(0, 10, 0)));
    assert!(!trigger.overlaps(&Trigger::new(20, 30, 0)));
  }

  #[test]
  pub fn trigger_transitions() {
    let trigger = Trigger::new(100, 199, 0);
    assert!(trigger.at_transition(50, 100));
    assert!(trigger.at_transition(199, 250));
    assert!(!trigger.at_transition(120, 180));
    assert!(!trigger.at_transition(0, 99));
  }

  #[test]
  pub fn record_validity() {
    assert!(TriggerRecord::new(0, 0, 0).is_valid());
    assert!(!TriggerRecord::new(10, 9, 0).is_valid());
    assert!(!TriggerRecord::new(-1, 9, 0).is_valid());
  }
}
