mod edit;
mod history;
mod play;
mod trigger;

pub use self::play::{PlayStatus, PlayWindow};
pub use self::trigger::{GrowEdit, Trigger, TriggerRecord};

use log::warn;

use crate::error::{EditError, EditResult};
use crate::time::{Ppqn, Pulse, DEFAULT_PPQN};

/// Folds an offset into `[0, length)`
pub fn fold_offset(offset: Pulse, length: Pulse) -> Pulse {
  if length > 0 {
    offset.rem_euclid(length)
  } else {
    offset
  }
}

///! The ordered, non-overlapping trigger timeline of one track.
///!
///! Triggers are kept sorted by their start tick. Every insertion reconciles its neighbours
///! so that no two triggers ever share a tick. It also holds the selection count, one
///! clipboard slot and the undo/redo history of the timeline.
pub struct Triggers {
  triggers: Vec<Trigger>,
  number_selected: usize,
  clipboard: Option<Trigger>,
  paste_tick: Option<Pulse>,
  undo_stack: Vec<Vec<Trigger>>,
  redo_stack: Vec<Vec<Trigger>>,
  ppqn: Ppqn,
  length: Pulse,
}

impl Triggers {
  pub fn new(ppqn: Ppqn, length: Pulse) -> Triggers {
    Triggers {
      triggers: Vec::new(),
      number_selected: 0,
      clipboard: None,
      paste_tick: None,
      undo_stack: Vec::new(),
      redo_stack: Vec::new(),
      ppqn: if ppqn > 0 { ppqn } else { DEFAULT_PPQN },
      length: length.max(1),
    }
  }

  pub fn ppqn(&self) -> Ppqn {
    self.ppqn
  }

  pub fn set_ppqn(&mut self, ppqn: Ppqn) {
    if ppqn > 0 {
      self.ppqn = ppqn;
    }
  }

  /// The length of the looped content the offsets refer to
  pub fn length(&self) -> Pulse {
    self.length
  }

  /// Changes the content length without touching the offsets.
  /// Use `adjust_offsets_to_length` to keep the audible phase.
  pub fn set_length(&mut self, length: Pulse) {
    if length > 0 {
      self.length = length;
    }
  }

  pub fn len(&self) -> usize {
    self.triggers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.triggers.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Trigger> {
    self.triggers.iter()
  }

  pub fn get(&self, index: usize) -> Option<&Trigger> {
    self.triggers.get(index)
  }

  pub fn clear(&mut self) {
    self.triggers.clear();
    self.number_selected = 0;
  }

  pub fn number_selected(&self) -> usize {
    self.number_selected
  }

  pub fn clipboard(&self) -> Option<&Trigger> {
    self.clipboard.as_ref()
  }

  pub fn paste_tick(&self) -> Option<Pulse> {
    self.paste_tick
  }

  /// Sets the tick the next paste lands on, `None` chains it after the clipboard
  pub fn set_paste_tick(&mut self, tick: Option<Pulse>) {
    self.paste_tick = tick;
  }

  pub fn adjust_offset(&self, offset: Pulse) -> Pulse {
    fold_offset(offset, self.length)
  }

  /// Adds a trigger of `length` pulses starting at `tick`.
  ///
  /// Existing triggers fully inside the new one are dropped, partially overlapping ones are
  /// truncated and one covering the whole new interval is split around it.
  pub fn add(
    &mut self,
    tick: Pulse,
    length: Pulse,
    offset: Pulse,
    fix_offset: bool,
  ) -> EditResult<()> {
    if length <= 0 {
      return Err(EditError::InvalidLength { length });
    }
    if tick < 0 {
      return Err(EditError::InvalidTick { tick });
    }
    let offset = if fix_offset {
      self.adjust_offset(offset)
    } else {
      offset
    };
    let tick_end = tick
      .checked_add(length - 1)
      .ok_or(EditError::InvalidTick { tick })?;
    self.insert(Trigger::new(tick, tick_end, offset));
    Ok(())
  }

  pub(crate) fn insert(&mut self, trigger: Trigger) {
    let start = trigger.tick_start;
    let end = trigger.tick_end;

    let mut absorbed_selected = 0;
    self.triggers.retain(|existing| {
      let inside = existing.tick_start >= start && existing.tick_end <= end;
      if inside && existing.selected {
        absorbed_selected += 1;
      }
      !inside
    });
    self.release_selected(absorbed_selected);

    let mut tail = None;
    for existing in self.triggers.iter_mut() {
      if existing.tick_start < start && existing.tick_end > end {
        tail = Some(Trigger::new(end + 1, existing.tick_end, existing.offset));
        existing.tick_end = start - 1;
      } else if existing.tick_start <= end && existing.tick_end > end {
        existing.tick_start = end + 1;
      } else if existing.tick_start < start && existing.tick_end >= start {
        existing.tick_end = start - 1;
      }
    }

    if let Some(tail) = tail {
      self.triggers.push(tail);
    }
    self.triggers.push(trigger.unselected());
    self.triggers.sort_by_key(|trigger| trigger.tick_start);
  }

  pub(crate) fn find(&self, tick: Pulse) -> Option<usize> {
    self
      .triggers
      .iter()
      .position(|trigger| trigger.contains(tick))
  }

  pub fn intersect(&self, tick: Pulse) -> bool {
    self.find(tick).is_some()
  }

  /// The bounds of the trigger containing `tick`
  pub fn intersect_bounds(&self, tick: Pulse) -> Option<(Pulse, Pulse)> {
    self
      .find(tick)
      .map(|index| (self.triggers[index].tick_start, self.triggers[index].tick_end))
  }

  pub fn remove(&mut self, tick: Pulse) -> bool {
    match self.find(tick) {
      Some(index) => {
        let removed = self.triggers.remove(index);
        if removed.selected {
          self.release_selected(1);
        }
        true
      }
      None => false,
    }
  }

  /// Whether the track is audible at `tick` according to its triggers
  pub fn state_at(&self, tick: Pulse) -> bool {
    self.intersect(tick)
  }

  /// The greatest end tick of the timeline, or 0 if it is empty
  pub fn maximum(&self) -> Pulse {
    self
      .triggers
      .iter()
      .map(|trigger| trigger.tick_end)
      .max()
      .unwrap_or(0)
  }

  pub(crate) fn select_index(&mut self, index: usize) -> bool {
    let trigger = &mut self.triggers[index];
    if trigger.selected {
      false
    } else {
      trigger.selected = true;
      self.number_selected += 1;
      true
    }
  }

  pub(crate) fn unselect_index(&mut self, index: usize) -> bool {
    let trigger = &mut self.triggers[index];
    if trigger.selected {
      trigger.selected = false;
      self.release_selected(1);
      true
    } else {
      false
    }
  }

  fn release_selected(&mut self, count: usize) {
    for _ in 0..count {
      if self.number_selected > 0 {
        self.number_selected -= 1;
      } else {
        warn!("Trigger selection count would go below zero");
      }
    }
  }

  pub(crate) fn recount_selected(&mut self) {
    self.number_selected = self.triggers.iter().filter(|t| t.selected).count();
  }

  /// Selects the trigger containing `tick`
  pub fn select(&mut self, tick: Pulse) -> bool {
    match self.find(tick) {
      Some(index) => self.select_index(index),
      None => false,
    }
  }

  /// Unselects the trigger containing `tick`
  pub fn unselect(&mut self, tick: Pulse) -> bool {
    match self.find(tick) {
      Some(index) => self.unselect_index(index),
      None => false,
    }
  }

  pub fn unselect_all(&mut self) {
    for index in 0..self.triggers.len() {
      self.unselect_index(index);
    }
  }

  pub fn select_all(&mut self) {
    for index in 0..self.triggers.len() {
      self.select_index(index);
    }
  }

  /// Start of the first selected trigger
  pub fn selected_start(&self) -> Option<Pulse> {
    self
      .triggers
      .iter()
      .find(|trigger| trigger.selected)
      .map(|trigger| trigger.tick_start)
  }

  /// End of the last selected trigger
  pub fn selected_end(&self) -> Option<Pulse> {
    self
      .triggers
      .iter()
      .rev()
      .find(|trigger| trigger.selected)
      .map(|trigger| trigger.tick_end)
  }

  pub fn remove_selected(&mut self) -> bool {
    match self.triggers.iter().position(|trigger| trigger.selected) {
      Some(index) => {
        self.triggers.remove(index);
        self.release_selected(1);
        true
      }
      None => false,
    }
  }

  /// Puts the first selected trigger into the clipboard and clears the paste tick
  pub fn copy_selected(&mut self) -> EditResult<()> {
    let selected = self
      .triggers
      .iter()
      .find(|trigger| trigger.selected)
      .cloned()
      .ok_or(EditError::NothingSelected)?;
    self.clipboard = Some(selected.unselected());
    self.paste_tick = None;
    Ok(())
  }

  pub fn records(&self) -> Vec<TriggerRecord> {
    self.triggers.iter().map(Trigger::record).collect()
  }

  /// Replaces the timeline with persisted records.
  /// Malformed records are discarded and their number is returned.
  pub fn load(&mut self, records: &[TriggerRecord]) -> usize {
    self.clear();
    let mut discarded = 0;
    for record in records {
      if record.is_valid() {
        let length = record.tick_end - record.tick_start + 1;
        let _ = self.add(record.tick_start, length, record.offset, true);
      } else {
        warn!(
          "Discarding malformed trigger [{}, {}]",
          record.tick_start, record.tick_end
        );
        discarded += 1;
      }
    }
    discarded
  }
}

#[cfg(test)]
pub(crate) mod test {
  use super::{fold_offset, Trigger, TriggerRecord, Triggers};
  use crate::error::EditError;
  use crate::time::Pulse;

  /// Small deterministic generator for property style tests
  pub struct Lcg(u64);

  impl Lcg {
    pub fn new(seed: u64) -> Lcg {
      Lcg(seed)
    }

    pub fn next_in(&mut self, max: u64) -> u64 {
      self.0 = self
        .0
        .wrapping_mul(6_364_136_223_846_793_005)
        .wrapping_add(1_442_695_040_888_963_407);
      (self.0 >> 33) % max
    }
  }

  pub fn assert_well_formed(triggers: &Triggers) {
    let all: Vec<&Trigger> = triggers.iter().collect();
    for trigger in all.iter() {
      assert!(trigger.tick_start() <= trigger.tick_end(), "{:?}", trigger);
      assert!(trigger.offset() >= 0 && trigger.offset() < triggers.length());
    }
    for pair in all.windows(2) {
      assert!(
        pair[0].tick_end() < pair[1].tick_start(),
        "{:?} overlaps {:?}",
        pair[0],
        pair[1]
      );
    }
    let selected = all.iter().filter(|t| t.is_selected()).count();
    assert_eq!(triggers.number_selected(), selected);
  }

  pub fn bounds(triggers: &Triggers) -> Vec<(Pulse, Pulse)> {
    triggers
      .iter()
      .map(|t| (t.tick_start(), t.tick_end()))
      .collect()
  }

  #[test]
  pub fn fold_offset_is_euclidean() {
    assert_eq!(fold_offset(-1, 96), 95);
    assert_eq!(fold_offset(96, 96), 0);
    assert_eq!(fold_offset(-200, 96), 88);
    assert_eq!(fold_offset(5, 0), 5);
  }

  #[test]
  pub fn add_rejects_invalid_arguments() {
    let mut triggers = Triggers::new(192, 768);
    assert_eq!(
      triggers.add(0, 0, 0, true),
      Err(EditError::InvalidLength { length: 0 })
    );
    assert_eq!(
      triggers.add(-5, 10, 0, true),
      Err(EditError::InvalidTick { tick: -5 })
    );
    assert!(triggers.is_empty());
  }

  #[test]
  pub fn add_truncates_overlapping_trigger() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(5, 10, 0, true).unwrap();
    triggers.add(10, 10, 0, true).unwrap();
    assert_eq!(bounds(&triggers), vec![(5, 9), (10, 19)]);
  }

  #[test]
  pub fn add_truncates_following_trigger() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(10, 10, 0, true).unwrap();
    triggers.add(5, 10, 0, true).unwrap();
    assert_eq!(bounds(&triggers), vec![(5, 14), (15, 19)]);
  }

  #[test]
  pub fn add_absorbs_contained_triggers() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(10, 5, 0, true).unwrap();
    triggers.add(20, 5, 0, true).unwrap();
    triggers.select(20);
    triggers.add(0, 100, 0, true).unwrap();
    assert_eq!(bounds(&triggers), vec![(0, 99)]);
    assert_eq!(triggers.number_selected(), 0);
  }

  #[test]
  pub fn add_inside_covering_trigger_keeps_both_sides() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(0, 100, 7, true).unwrap();
    triggers.add(40, 10, 0, true).unwrap();
    assert_eq!(bounds(&triggers), vec![(0, 39), (40, 49), (50, 99)]);
    assert_eq!(triggers.get(2).unwrap().offset(), 7);
  }

  #[test]
  pub fn add_never_overlaps() {
    let mut random = Lcg::new(0x5eed);
    let mut triggers = Triggers::new(192, 768);
    for _ in 0..500 {
      let tick = random.next_in(2_000) as Pulse;
      let length = 1 + random.next_in(300) as Pulse;
      let offset = random.next_in(2_000) as Pulse - 1_000;
      triggers.add(tick, length, offset, true).unwrap();
      if random.next_in(4) == 0 {
        triggers.select(random.next_in(2_300) as Pulse);
      }
      assert_well_formed(&triggers);
    }
  }

  #[test]
  pub fn add_normalizes_offset() {
    let mut triggers = Triggers::new(192, 96);
    triggers.add(0, 10, -10, true).unwrap();
    assert_eq!(triggers.get(0).unwrap().offset(), 86);
    triggers.add(100, 10, 200, false).unwrap();
    assert_eq!(triggers.get(1).unwrap().offset(), 200);
  }

  #[test]
  pub fn intersect_and_remove() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(100, 100, 0, true).unwrap();
    assert!(triggers.intersect(100));
    assert!(triggers.intersect(199));
    assert!(!triggers.intersect(200));
    assert_eq!(triggers.intersect_bounds(150), Some((100, 199)));
    assert_eq!(triggers.intersect_bounds(99), None);
    assert!(!triggers.remove(50));
    assert!(triggers.remove(150));
    assert!(triggers.is_empty());
  }

  #[test]
  pub fn maximum_of_empty_timeline() {
    let mut triggers = Triggers::new(192, 768);
    assert_eq!(triggers.maximum(), 0);
    triggers.add(10, 10, 0, true).unwrap();
    triggers.add(500, 10, 0, true).unwrap();
    assert_eq!(triggers.maximum(), 509);
  }

  #[test]
  pub fn selection_count_follows_flags() {
    let mut random = Lcg::new(42);
    let mut triggers = Triggers::new(192, 768);
    for index in 0..20 {
      triggers.add(index * 100, 50, 0, true).unwrap();
    }
    for _ in 0..1_000 {
      let tick = random.next_in(2_000) as Pulse;
      match random.next_in(5) {
        0 => {
          triggers.unselect(tick);
        }
        1 => triggers.unselect_all(),
        2 => {
          triggers.remove_selected();
        }
        _ => {
          triggers.select(tick);
        }
      }
      assert_well_formed(&triggers);
    }
  }

  #[test]
  pub fn selected_bounds() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(0, 10, 0, true).unwrap();
    triggers.add(100, 10, 0, true).unwrap();
    triggers.add(200, 10, 0, true).unwrap();
    assert_eq!(triggers.selected_start(), None);
    triggers.select(105);
    triggers.select(205);
    assert_eq!(triggers.selected_start(), Some(100));
    assert_eq!(triggers.selected_end(), Some(209));
    assert!(!triggers.select(105));
    assert_eq!(triggers.number_selected(), 2);
  }

  #[test]
  pub fn copy_selected_requires_selection() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(0, 10, 0, true).unwrap();
    assert_eq!(triggers.copy_selected(), Err(EditError::NothingSelected));
    triggers.select(0);
    triggers.set_paste_tick(Some(400));
    triggers.copy_selected().unwrap();
    assert_eq!(triggers.clipboard().map(Trigger::tick_start), Some(0));
    assert_eq!(triggers.paste_tick(), None);
  }

  #[test]
  pub fn load_discards_malformed_records() {
    let mut triggers = Triggers::new(192, 96);
    let records = vec![
      TriggerRecord::new(0, 95, 0),
      TriggerRecord::new(300, 200, 0),
      TriggerRecord::new(-10, 20, 0),
      TriggerRecord::new(96, 191, 150),
    ];
    assert_eq!(triggers.load(&records), 2);
    assert_eq!(
      triggers.records(),
      vec![TriggerRecord::new(0, 95, 0), TriggerRecord::new(96, 191, 54)]
    );
  }
}
