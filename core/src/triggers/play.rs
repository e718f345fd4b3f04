use log::warn;

use crate::time::Pulse;

use super::Triggers;

/// Playback state a track keeps between two processing slices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayStatus {
  pub playing: bool,
  pub last_tick: Pulse,
  pub trigger_offset: Pulse,
  /// Set when the playing state was overridden by hand during song playback.
  /// The triggers can not change the playing state until the next trigger boundary.
  pub blocked: bool,
}

impl PlayStatus {
  pub fn new() -> PlayStatus {
    PlayStatus::default()
  }
}

/// The part of a processing slice the track content has to be rendered for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayWindow {
  pub start_tick: Pulse,
  pub end_tick: Pulse,
  /// The track has to stop playing once `end_tick` has been rendered
  pub turning_off: bool,
}

impl Triggers {
  /// Evaluates the triggers for the slice `[start_tick, end_tick]`.
  ///
  /// The state of the latest trigger boundary reached before `end_tick` decides whether the
  /// track plays. Turning on moves the window start to the trigger start, turning off moves
  /// the window end to the trigger end. It never allocates.
  pub fn play(&self, status: &mut PlayStatus, start_tick: Pulse, end_tick: Pulse) -> PlayWindow {
    let mut window = PlayWindow {
      start_tick,
      end_tick,
      turning_off: false,
    };

    let mut trigger_state = false;
    let mut trigger_tick = 0;
    let mut trigger_offset = 0;
    let mut previous_start = Pulse::min_value();

    for trigger in self.triggers.iter() {
      if trigger.tick_start < previous_start || trigger.tick_end < trigger.tick_start {
        warn!(
          "Trigger at {} is out of order, skipping evaluation",
          trigger.tick_start
        );
        return window;
      }
      previous_start = trigger.tick_start;

      if status.blocked && trigger.at_transition(start_tick, end_tick) {
        status.blocked = false;
      }

      if trigger.tick_start <= end_tick {
        trigger_state = true;
        trigger_tick = trigger.tick_start;
        trigger_offset = trigger.offset;
      }
      if trigger.tick_end <= end_tick {
        trigger_state = false;
        trigger_tick = trigger.tick_end;
        trigger_offset = trigger.offset;
      }
      if trigger.tick_start > end_tick || trigger.tick_end > end_tick {
        break;
      }
    }

    if trigger_state != status.playing && !status.blocked {
      if trigger_state {
        window.start_tick = trigger_tick.max(start_tick).max(status.last_tick);
        status.playing = true;
      } else {
        window.end_tick = trigger_tick;
        window.turning_off = true;
      }
    }

    if self.triggers.is_empty() && status.playing && !status.blocked {
      status.playing = false;
    }

    status.trigger_offset = trigger_offset;
    window
  }
}
