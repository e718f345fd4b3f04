use crate::midi::messages::Message;
use crate::time::Pulse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
  pub tick: Pulse,
  pub message: Message,
}

impl Event {
  pub fn new(tick: Pulse, message: Message) -> Event {
    Event { tick, message }
  }
}

/// Events kept sorted by tick, note offs before note ons sharing the same tick
#[derive(Debug, Clone, Default)]
pub struct Buffer {
  events: Vec<Event>,
}

impl Buffer {
  pub fn new() -> Buffer {
    Buffer { events: Vec::new() }
  }

  pub fn with_capacity(capacity: usize) -> Buffer {
    Buffer {
      events: Vec::with_capacity(capacity),
    }
  }

  pub fn reset(&mut self) -> &mut Self {
    self.events.clear();
    self
  }

  pub fn push(&mut self, tick: Pulse, message: Message) {
    let event = Event::new(tick, message);
    let index = self
      .events
      .iter()
      .position(|other| Self::sort_key(&event) < Self::sort_key(other))
      .unwrap_or_else(|| self.events.len());
    self.events.insert(index, event);
  }

  pub fn len(&self) -> usize {
    self.events.len()
  }

  pub fn is_empty(&self) -> bool {
    self.events.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Event> {
    self.events.iter()
  }

  pub fn as_slice(&self) -> &[Event] {
    &self.events
  }

  fn sort_key(event: &Event) -> (Pulse, u8) {
    (event.tick, if event.message.is_note_off() { 0 } else { 1 })
  }
}

#[cfg(test)]
mod test {
  use super::Buffer;
  use crate::midi::Message;

  #[test]
  pub fn push_keeps_order() {
    let mut buffer = Buffer::new();
    let on = Message::NoteOn {
      channel: 0,
      key: 60,
      velocity: 90,
    };
    let off = Message::NoteOff {
      channel: 0,
      key: 60,
      velocity: 0,
    };
    buffer.push(48, on);
    buffer.push(0, on);
    buffer.push(48, off);
    let ticks: Vec<_> = buffer.iter().map(|event| (event.tick, event.message)).collect();
    assert_eq!(ticks, vec![(0, on), (48, off), (48, on)]);
  }

  #[test]
  pub fn reset_clears() {
    let mut buffer = Buffer::with_capacity(4);
    buffer.push(
      0,
      Message::AllNotesOff { channel: 0 },
    );
    assert_eq!(buffer.len(), 1);
    assert!(buffer.reset().is_empty());
  }
}
