use crate::error::{EditError, EditResult};
use crate::time::Pulse;

use super::{fold_offset, GrowEdit, Trigger, Triggers};

/// The furthest tick an interactive drag can reach when nothing follows the trigger
pub const MAX_TICK: Pulse = 0x07ff_ffff;

impl Triggers {
  /// Cuts the trigger at `index` right before `split_tick` into two adjacent triggers.
  /// Requires `tick_start < split_tick <= tick_end`.
  fn cut(&mut self, index: usize, split_tick: Pulse) {
    let existing = self.triggers[index];
    let tail = Trigger::new(split_tick, existing.tick_end, existing.offset);
    self.triggers[index].tick_end = split_tick - 1;
    self.triggers.insert(index + 1, tail);
  }

  fn cut_at(&mut self, tick: Pulse) {
    let straddling = self
      .triggers
      .iter()
      .position(|trigger| trigger.tick_start < tick && tick <= trigger.tick_end);
    if let Some(index) = straddling {
      self.cut(index, tick);
    }
  }

  /// Splits the trigger at `index` so that the second part starts at `split_tick`.
  ///
  /// Nothing changes when the split would leave a tail of two pulses or less.
  pub fn split_trigger(&mut self, index: usize, split_tick: Pulse) -> bool {
    let splittable = match self.triggers.get(index) {
      Some(trigger) => split_tick > trigger.tick_start && trigger.tick_end - split_tick > 1,
      None => false,
    };
    if splittable {
      self.cut(index, split_tick);
    }
    splittable
  }

  /// Splits the trigger containing `tick`, either exactly at it or at its midpoint
  pub fn split(&mut self, tick: Pulse, exact: bool) -> bool {
    match self.find(tick) {
      Some(index) => {
        let split_tick = if exact {
          tick
        } else {
          let trigger = &self.triggers[index];
          trigger.tick_start + (trigger.tick_end - trigger.tick_start + 1) / 2
        };
        self.split_trigger(index, split_tick)
      }
      None => false,
    }
  }

  pub fn half_split(&mut self, tick: Pulse) -> bool {
    self.split(tick, false)
  }

  pub fn exact_split(&mut self, tick: Pulse) -> bool {
    self.split(tick, true)
  }

  /// Extends the trigger containing `tick_from` so that it also covers `[tick_to, tick_to + length - 1]`
  pub fn grow(&mut self, tick_from: Pulse, tick_to: Pulse, length: Pulse) -> EditResult<()> {
    if length <= 0 {
      return Err(EditError::InvalidLength { length });
    }
    if tick_to < 0 {
      return Err(EditError::InvalidTick { tick: tick_to });
    }
    let index = self
      .find(tick_from)
      .ok_or(EditError::NoTriggerAt { tick: tick_from })?;
    let existing = self.triggers[index];
    let tick_end = tick_to
      .checked_add(length - 1)
      .ok_or(EditError::InvalidTick { tick: tick_to })?;
    let start = existing.tick_start.min(tick_to);
    let end = existing.tick_end.max(tick_end);
    self.insert(Trigger::new(start, end, existing.offset));
    Ok(())
  }

  /// Opens (`forward`) or closes a gap of `distance` pulses at `start_tick`.
  ///
  /// Moving forward cuts any trigger straddling `start_tick` and shifts everything from it on.
  /// Moving backward deletes the region `[start_tick, start_tick + distance - 1]` and pulls the
  /// rest of the timeline into it. Shifted triggers keep their audible phase.
  pub fn move_triggers(
    &mut self,
    start_tick: Pulse,
    distance: Pulse,
    forward: bool,
  ) -> EditResult<()> {
    if distance <= 0 {
      return Err(EditError::InvalidLength { length: distance });
    }
    if start_tick < 0 {
      return Err(EditError::InvalidTick { tick: start_tick });
    }
    let end_tick = start_tick
      .checked_add(distance)
      .ok_or(EditError::InvalidTick { tick: start_tick })?;
    if forward && self.maximum().checked_add(distance).is_none() {
      return Err(EditError::InvalidLength { length: distance });
    }

    let length = self.length;
    if forward {
      self.cut_at(start_tick);
      for trigger in self.triggers.iter_mut() {
        if trigger.tick_start >= start_tick {
          trigger.tick_start += distance;
          trigger.tick_end += distance;
          trigger.offset = fold_offset(trigger.offset + distance, length);
        }
      }
    } else {
      self.cut_at(start_tick);
      self.cut_at(end_tick);

      let mut removed_selected = 0;
      self.triggers.retain(|trigger| {
        let removed = trigger.tick_start >= start_tick && trigger.tick_end < end_tick;
        if removed && trigger.selected {
          removed_selected += 1;
        }
        !removed
      });
      self.release_selected(removed_selected);

      for trigger in self.triggers.iter_mut() {
        if trigger.tick_start >= end_tick {
          trigger.tick_start -= distance;
          trigger.tick_end -= distance;
          trigger.offset = fold_offset(trigger.offset + length - distance % length, length);
        }
      }
    }
    Ok(())
  }

  /// Opens a gap of `distance` pulses at `start_tick` and fills it with a copy of the
  /// triggers that got shifted out of it.
  pub fn copy(&mut self, start_tick: Pulse, distance: Pulse) -> EditResult<()> {
    if start_tick.checked_add(distance.saturating_mul(2)).is_none() {
      return Err(EditError::InvalidTick { tick: start_tick });
    }
    self.move_triggers(start_tick, distance, true)?;

    let from_start = start_tick + distance;
    let from_end = from_start + distance - 1;
    let length = self.length;
    let copies: Vec<Trigger> = self
      .triggers
      .iter()
      .filter(|trigger| trigger.tick_start >= from_start && trigger.tick_start <= from_end)
      .map(|trigger| {
        let tick_end = if trigger.tick_end <= from_end {
          trigger.tick_end - distance
        } else {
          from_start - 1
        };
        let offset = (trigger.offset + (length - distance % length)) % length;
        Trigger::new(
          trigger.tick_start - distance,
          tick_end,
          fold_offset(offset, length),
        )
      })
      .collect();

    self.triggers.extend(copies);
    self.triggers.sort_by_key(|trigger| trigger.tick_start);
    Ok(())
  }

  /// Drags the first selected trigger to `tick` without crossing its neighbours.
  ///
  /// A trigger never shrinks below an eighth of a quarter note while resizing.
  /// Returns whether anything moved.
  pub fn move_selected(&mut self, tick: Pulse, fix_offset: bool, which: GrowEdit) -> bool {
    let index = match self.triggers.iter().position(|trigger| trigger.selected) {
      Some(index) => index,
      None => return false,
    };

    let min_tick = if index > 0 {
      self.triggers[index - 1].tick_end + 1
    } else {
      0
    };
    let max_tick = self
      .triggers
      .get(index + 1)
      .map(|next| next.tick_start - 1)
      .unwrap_or(MAX_TICK);
    let min_size = Pulse::from(self.ppqn / 8);

    let trigger = self.triggers[index];
    let delta = match which {
      GrowEdit::End => {
        let min_end = trigger.tick_start + min_size;
        let mut tick_end = tick.min(max_tick);
        if tick_end < trigger.tick_end {
          // shrinking stops at the minimum size and never turns into growing
          tick_end = tick_end.max(min_end).min(trigger.tick_end);
        }
        tick_end - trigger.tick_end
      }
      GrowEdit::Start => {
        let max_start = trigger.tick_end - min_size;
        let mut tick_start = tick.max(min_tick);
        if tick_start > trigger.tick_start {
          tick_start = tick_start.min(max_start).max(trigger.tick_start);
        }
        tick_start - trigger.tick_start
      }
      GrowEdit::Move => {
        let mut delta = tick - trigger.tick_start;
        if delta < 0 && tick < min_tick {
          delta = min_tick - trigger.tick_start;
        }
        if delta > 0 && trigger.tick_end + delta > max_tick {
          delta = max_tick - trigger.tick_end;
        }
        delta
      }
    };

    let length = self.length;
    let trigger = &mut self.triggers[index];
    if which != GrowEdit::End {
      trigger.tick_start += delta;
    }
    if which != GrowEdit::Start {
      trigger.tick_end += delta;
    }
    if fix_offset {
      trigger.offset = fold_offset(trigger.offset + delta, length);
    }
    delta != 0
  }

  /// Shifts every selected trigger by `delta`.
  ///
  /// The edit is rejected as a whole when it would leave triggers overlapping or out of range.
  pub fn offset_selected(&mut self, delta: Pulse, which: GrowEdit) -> bool {
    if delta == 0 || self.number_selected == 0 {
      return false;
    }
    let length = self.length;
    let mut edited = self.triggers.clone();
    for trigger in edited.iter_mut().filter(|trigger| trigger.selected) {
      if which != GrowEdit::End {
        trigger.tick_start += delta;
      }
      if which != GrowEdit::Start {
        trigger.tick_end += delta;
      }
      if which == GrowEdit::Move {
        trigger.offset = fold_offset(trigger.offset + delta, length);
      }
    }

    let valid = edited
      .iter()
      .all(|trigger| trigger.tick_start >= 0 && trigger.tick_start <= trigger.tick_end)
      && edited
        .windows(2)
        .all(|pair| pair[0].tick_end < pair[1].tick_start);
    if valid {
      self.triggers = edited;
    }
    valid
  }

  /// Pastes the clipboard trigger.
  ///
  /// With an explicit paste tick the copy lands there. Otherwise it is chained right after
  /// the clipboard. In both cases the clipboard advances to the pasted copy so that
  /// repeated pastes keep going forward.
  pub fn paste(&mut self) -> EditResult<()> {
    let clipboard = self.clipboard.ok_or(EditError::NothingToPaste)?;
    let length = clipboard.length();
    let tick = match self.paste_tick {
      Some(tick) if tick < 0 => return Err(EditError::InvalidTick { tick }),
      Some(tick) => tick,
      None => clipboard.tick_end + 1,
    };
    let delta = tick - clipboard.tick_start;
    let pasted = Trigger::new(
      tick,
      tick + length - 1,
      fold_offset(clipboard.offset + delta, self.length),
    );
    self.insert(pasted);
    self.clipboard = Some(pasted);
    self.paste_tick = None;
    Ok(())
  }

  /// Keeps every trigger playing the same material after the content length changes
  /// to `new_length`, then adopts it.
  pub fn adjust_offsets_to_length(&mut self, new_length: Pulse) {
    if new_length <= 0 {
      return;
    }
    let length = self.length;
    for trigger in self.triggers.iter_mut() {
      let offset = length - fold_offset(trigger.offset, length);
      let inverse = length - (trigger.tick_start % length);
      let local = (inverse - offset) % length;
      let new_inverse = new_length - (trigger.tick_start % new_length);
      let new_offset = (new_inverse - local) % new_length;
      trigger.offset = fold_offset(new_length - new_offset, new_length);
    }
    self.length = new_length;
  }
}

#[cfg(test)]
mod test {
  use super::super::test::{assert_well_formed, bounds, Lcg};
  use super::super::{GrowEdit, Triggers};
  use crate::error::EditError;
  use crate::time::Pulse;

  fn offsets(triggers: &Triggers) -> Vec<Pulse> {
    triggers.iter().map(|t| t.offset()).collect()
  }

  #[test]
  pub fn split_reconstructs_interval() {
    for split_tick in 1..20 {
      let mut triggers = Triggers::new(192, 768);
      triggers.add(0, 20, 0, true).unwrap();
      let split = triggers.split_trigger(0, split_tick);
      if 19 - split_tick > 1 {
        assert!(split);
        assert_eq!(bounds(&triggers), vec![(0, split_tick - 1), (split_tick, 19)]);
      } else {
        assert!(!split);
        assert_eq!(bounds(&triggers), vec![(0, 19)]);
      }
    }
  }

  #[test]
  pub fn split_at_start_is_rejected() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(100, 100, 0, true).unwrap();
    assert!(!triggers.exact_split(100));
    assert!(!triggers.exact_split(50));
    assert_eq!(bounds(&triggers), vec![(100, 199)]);
  }

  #[test]
  pub fn half_split_uses_midpoint() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(0, 100, 33, true).unwrap();
    assert!(triggers.half_split(10));
    assert_eq!(bounds(&triggers), vec![(0, 49), (50, 99)]);
    assert_eq!(offsets(&triggers), vec![33, 33]);
  }

  #[test]
  pub fn grow_towards_later_tick() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(0, 100, 0, true).unwrap();
    triggers.add(150, 100, 0, true).unwrap();
    triggers.grow(50, 180, 10).unwrap();
    assert_eq!(bounds(&triggers), vec![(0, 189), (190, 249)]);
  }

  #[test]
  pub fn grow_towards_earlier_tick() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(100, 100, 0, true).unwrap();
    triggers.grow(150, 20, 1).unwrap();
    assert_eq!(bounds(&triggers), vec![(20, 199)]);
  }

  #[test]
  pub fn grow_without_trigger() {
    let mut triggers = Triggers::new(192, 768);
    assert_eq!(
      triggers.grow(10, 20, 1),
      Err(EditError::NoTriggerAt { tick: 10 })
    );
  }

  #[test]
  pub fn move_forward_splits_straddling_trigger() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(0, 200, 0, true).unwrap();
    triggers.move_triggers(100, 50, true).unwrap();
    assert_eq!(bounds(&triggers), vec![(0, 99), (150, 249)]);
    assert_eq!(offsets(&triggers), vec![0, 50]);
  }

  #[test]
  pub fn move_backward_closes_gap() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(0, 100, 0, true).unwrap();
    triggers.add(150, 100, 50, true).unwrap();
    triggers.move_triggers(100, 50, false).unwrap();
    assert_eq!(bounds(&triggers), vec![(0, 99), (100, 199)]);
    assert_eq!(offsets(&triggers), vec![0, 0]);
  }

  #[test]
  pub fn move_backward_deletes_region() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(0, 300, 0, true).unwrap();
    triggers.add(120, 10, 0, true).unwrap();
    triggers.select(125);
    triggers.move_triggers(100, 100, false).unwrap();
    assert_eq!(bounds(&triggers), vec![(0, 99), (100, 199)]);
    assert_eq!(triggers.number_selected(), 0);
    assert_well_formed(&triggers);
  }

  #[test]
  pub fn move_forward_then_backward_restores_timeline() {
    let mut triggers = Triggers::new(192, 96);
    triggers.add(0, 50, 10, true).unwrap();
    triggers.add(300, 50, 20, true).unwrap();
    let before = triggers.records();
    triggers.move_triggers(100, 70, true).unwrap();
    triggers.move_triggers(100, 70, false).unwrap();
    assert_eq!(triggers.records(), before);
  }

  #[test]
  pub fn move_rejects_invalid_distance() {
    let mut triggers = Triggers::new(192, 768);
    assert_eq!(
      triggers.move_triggers(0, 0, true),
      Err(EditError::InvalidLength { length: 0 })
    );
  }

  #[test]
  pub fn copy_duplicates_measure() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(0, 480, 0, true).unwrap();
    triggers.copy(0, 480).unwrap();
    assert_eq!(bounds(&triggers), vec![(0, 479), (480, 959)]);
    assert_eq!(offsets(&triggers), vec![0, 480]);
    assert_well_formed(&triggers);
  }

  #[test]
  pub fn copy_one_measure_of_four_beats() {
    let mut triggers = Triggers::new(120, 480);
    triggers.add(0, 480, 0, true).unwrap();
    triggers.copy(0, 480).unwrap();
    assert_eq!(bounds(&triggers), vec![(0, 479), (480, 959)]);
    assert_eq!(offsets(&triggers), vec![0, 0]);
  }

  #[test]
  pub fn copy_truncates_longer_triggers() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(100, 300, 0, true).unwrap();
    triggers.copy(100, 100).unwrap();
    assert_eq!(bounds(&triggers), vec![(100, 199), (200, 499)]);
    assert_well_formed(&triggers);
  }

  #[test]
  pub fn move_selected_clamps_to_neighbours() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(0, 100, 0, true).unwrap();
    triggers.add(200, 100, 0, true).unwrap();
    triggers.add(400, 100, 0, true).unwrap();
    triggers.select(250);

    assert!(triggers.move_selected(380, true, GrowEdit::Move));
    assert_eq!(bounds(&triggers)[1], (300, 399));
    assert!(triggers.move_selected(0, true, GrowEdit::Move));
    assert_eq!(bounds(&triggers)[1], (100, 199));
    assert!(!triggers.move_selected(100, true, GrowEdit::Move));
    assert_well_formed(&triggers);
  }

  #[test]
  pub fn move_selected_keeps_minimum_size() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(100, 100, 0, true).unwrap();
    triggers.select(100);
    triggers.move_selected(0, false, GrowEdit::End);
    assert_eq!(bounds(&triggers), vec![(100, 124)]);
    triggers.move_selected(500, false, GrowEdit::Start);
    assert_eq!(bounds(&triggers), vec![(100, 124)]);
    triggers.move_selected(10, false, GrowEdit::Start);
    assert_eq!(bounds(&triggers), vec![(10, 124)]);
  }

  #[test]
  pub fn short_trigger_never_grows_over_its_neighbours() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(0, 100, 0, true).unwrap();
    triggers.add(100, 5, 0, true).unwrap();
    triggers.select(100);
    assert!(!triggers.move_selected(101, false, GrowEdit::Start));
    assert_eq!(bounds(&triggers), vec![(0, 99), (100, 104)]);
    assert_well_formed(&triggers);

    let mut triggers = Triggers::new(192, 768);
    triggers.add(100, 5, 0, true).unwrap();
    triggers.add(105, 100, 0, true).unwrap();
    triggers.select(100);
    assert!(!triggers.move_selected(103, false, GrowEdit::End));
    assert_eq!(bounds(&triggers), vec![(100, 104), (105, 204)]);
    assert_well_formed(&triggers);

    assert!(triggers.move_selected(50, false, GrowEdit::Start));
    assert_eq!(bounds(&triggers), vec![(50, 104), (105, 204)]);
  }

  #[test]
  pub fn huge_edits_are_rejected() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(0, 100, 0, true).unwrap();
    assert_eq!(
      triggers.add(Pulse::max_value() - 10, 100, 0, true),
      Err(EditError::InvalidTick {
        tick: Pulse::max_value() - 10
      })
    );
    assert_eq!(
      triggers.grow(10, Pulse::max_value() - 10, 100),
      Err(EditError::InvalidTick {
        tick: Pulse::max_value() - 10
      })
    );
    assert!(triggers.move_triggers(Pulse::max_value() - 10, 100, false).is_err());
    assert!(triggers.move_triggers(50, Pulse::max_value(), true).is_err());
    assert!(triggers.copy(50, Pulse::max_value() / 2).is_err());
    assert_eq!(bounds(&triggers), vec![(0, 99)]);
  }

  #[test]
  pub fn move_selected_without_selection() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(0, 100, 0, true).unwrap();
    assert!(!triggers.move_selected(50, true, GrowEdit::Move));
  }

  #[test]
  pub fn offset_selected_rejects_overlaps() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(0, 100, 0, true).unwrap();
    triggers.add(200, 100, 0, true).unwrap();
    triggers.select(0);
    assert!(triggers.offset_selected(50, GrowEdit::Move));
    assert_eq!(bounds(&triggers), vec![(50, 149), (200, 299)]);
    assert_eq!(offsets(&triggers), vec![50, 0]);
    assert!(!triggers.offset_selected(100, GrowEdit::End));
    assert_eq!(bounds(&triggers), vec![(50, 149), (200, 299)]);
  }

  #[test]
  pub fn paste_chains_after_clipboard() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(0, 100, 0, true).unwrap();
    triggers.select(0);
    triggers.copy_selected().unwrap();
    triggers.paste().unwrap();
    triggers.paste().unwrap();
    assert_eq!(bounds(&triggers), vec![(0, 99), (100, 199), (200, 299)]);
    assert_eq!(offsets(&triggers), vec![0, 100, 200]);
  }

  #[test]
  pub fn paste_at_explicit_tick() {
    let mut triggers = Triggers::new(192, 96);
    triggers.add(0, 50, 0, true).unwrap();
    triggers.select(0);
    triggers.copy_selected().unwrap();
    triggers.set_paste_tick(Some(1000));
    triggers.paste().unwrap();
    assert_eq!(bounds(&triggers), vec![(0, 49), (1000, 1049)]);
    assert_eq!(offsets(&triggers)[1], 1000 % 96);
    assert_eq!(triggers.paste_tick(), None);
  }

  #[test]
  pub fn paste_without_clipboard() {
    let mut triggers = Triggers::new(192, 768);
    assert_eq!(triggers.paste(), Err(EditError::NothingToPaste));
  }

  #[test]
  pub fn adjust_offsets_keeps_phase_at_start() {
    let mut triggers = Triggers::new(192, 768);
    triggers.add(0, 100, 0, true).unwrap();
    triggers.add(1000, 100, 1000 % 768, true).unwrap();
    triggers.adjust_offsets_to_length(384);
    assert_eq!(triggers.length(), 384);
    assert_eq!(offsets(&triggers), vec![0, 1000 % 384]);
  }

  #[test]
  pub fn random_edits_keep_timeline_well_formed() {
    let mut random = Lcg::new(7);
    let mut triggers = Triggers::new(192, 768);
    for _ in 0..400 {
      let tick = random.next_in(3_000) as Pulse;
      let amount = 1 + random.next_in(400) as Pulse;
      match random.next_in(9) {
        0 => {
          let _ = triggers.add(tick, amount, tick, true);
        }
        1 => {
          triggers.split(tick, random.next_in(2) == 0);
        }
        2 => {
          let _ = triggers.grow(tick, tick + amount, 1);
        }
        3 => {
          let _ = triggers.move_triggers(tick, amount, random.next_in(2) == 0);
        }
        4 => {
          let _ = triggers.copy(tick, amount);
        }
        5 => {
          triggers.select(tick);
        }
        6 => {
          let which = match random.next_in(3) {
            0 => GrowEdit::Start,
            1 => GrowEdit::End,
            _ => GrowEdit::Move,
          };
          triggers.move_selected(tick, true, which);
        }
        7 => {
          triggers.offset_selected(amount - 200, GrowEdit::Move);
        }
        _ => {
          let _ = triggers.copy_selected().and_then(|_| triggers.paste());
        }
      }
      assert_well_formed(&triggers);
    }
  }
}
