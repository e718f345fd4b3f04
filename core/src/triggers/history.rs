use std::mem;

use super::{Trigger, Triggers};

impl Triggers {
  /// Saves the timeline, without selection flags, onto the undo stack
  pub fn push_undo(&mut self) {
    let snapshot = self.snapshot();
    self.undo_stack.push(snapshot);
  }

  pub fn pop_undo(&mut self) -> bool {
    match self.undo_stack.pop() {
      Some(previous) => {
        let current = mem::replace(&mut self.triggers, previous);
        self.redo_stack.push(current);
        self.recount_selected();
        true
      }
      None => false,
    }
  }

  pub fn pop_redo(&mut self) -> bool {
    match self.redo_stack.pop() {
      Some(next) => {
        let current = mem::replace(&mut self.triggers, next);
        self.undo_stack.push(current);
        self.recount_selected();
        true
      }
      None => false,
    }
  }

  /// Drops the latest snapshot without restoring it, for edits that ended up changing nothing
  pub fn discard_undo(&mut self) -> bool {
    self.undo_stack.pop().is_some()
  }

  pub fn can_undo(&self) -> bool {
    !self.undo_stack.is_empty()
  }

  pub fn can_redo(&self) -> bool {
    !self.redo_stack.is_empty()
  }

  fn snapshot(&self) -> Vec<Trigger> {
    self.triggers.iter().map(Trigger::unselected).collect()
  }
}
