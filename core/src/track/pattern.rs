use crate::midi::{Buffer, Event, Message, U7};
use crate::time::Pulse;

///! The looped material a track plays under its triggers.
///!
///! Event ticks are local to the content, in `[0, length)`.
pub trait TrackContent: Send {
  fn event_count(&self) -> usize;

  fn length(&self) -> Pulse;

  fn set_length(&mut self, length: Pulse);

  /// Visits the events in `[start, end]` in tick order, without allocating
  fn for_each_in(&self, start: Pulse, end: Pulse, f: &mut dyn FnMut(&Event));

  fn record(&mut self, tick: Pulse, message: Message);
}

pub struct Pattern {
  length: Pulse,
  events: Buffer,
}

impl Pattern {
  pub fn new(length: Pulse) -> Pattern {
    Pattern {
      length: length.max(1),
      events: Buffer::new(),
    }
  }

  /// Adds a note on at `tick` and its note off `duration` pulses later, wrapping around the end
  pub fn add_note(&mut self, tick: Pulse, key: U7, velocity: U7, duration: Pulse) -> &mut Self {
    let on_tick = tick.rem_euclid(self.length);
    let off_tick = (tick + duration.max(1)).rem_euclid(self.length);
    self.events.push(
      on_tick,
      Message::NoteOn {
        channel: 0,
        key,
        velocity,
      },
    );
    self.events.push(
      off_tick,
      Message::NoteOff {
        channel: 0,
        key,
        velocity: 0,
      },
    );
    self
  }

  pub fn events(&self) -> &[Event] {
    self.events.as_slice()
  }
}

impl TrackContent for Pattern {
  fn event_count(&self) -> usize {
    self.events.len()
  }

  fn length(&self) -> Pulse {
    self.length
  }

  fn set_length(&mut self, length: Pulse) {
    if length > 0 {
      self.length = length;
    }
  }

  fn for_each_in(&self, start: Pulse, end: Pulse, f: &mut dyn FnMut(&Event)) {
    let events = self.events.as_slice();
    let first = events
      .binary_search_by(|event| {
        if event.tick < start {
          std::cmp::Ordering::Less
        } else {
          std::cmp::Ordering::Greater
        }
      })
      .unwrap_or_else(|index| index);
    events[first..]
      .iter()
      .take_while(|event| event.tick <= end)
      .filter(|event| event.tick < self.length)
      .for_each(|event| f(event));
  }

  fn record(&mut self, tick: Pulse, message: Message) {
    self.events.push(tick.rem_euclid(self.length), message);
  }
}
