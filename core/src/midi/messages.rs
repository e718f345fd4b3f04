pub type U4 = u8;
pub type U7 = u8;
pub type U14 = u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
  NoteOff { channel: U4, key: U7, velocity: U7 },
  NoteOn { channel: U4, key: U7, velocity: U7 },
  PolyphonicKeyPressure { channel: U4, key: U7, value: U7 },
  ControlChange { channel: U4, controller: U7, value: U7 },
  ProgramChange { channel: U4, value: U7 },
  ChannelPressure { channel: U4, value: U7 },
  PitchBend { channel: U4, value: U14 },
  AllNotesOff { channel: U4 },
}

impl Message {
  pub fn channel(&self) -> U4 {
    match *self {
      Message::NoteOff { channel, .. }
      | Message::NoteOn { channel, .. }
      | Message::PolyphonicKeyPressure { channel, .. }
      | Message::ControlChange { channel, .. }
      | Message::ProgramChange { channel, .. }
      | Message::ChannelPressure { channel, .. }
      | Message::PitchBend { channel, .. }
      | Message::AllNotesOff { channel } => channel,
    }
  }

  /// The same message moved into another channel
  pub fn with_channel(self, channel: U4) -> Message {
    let channel = channel & 0x0f;
    match self {
      Message::NoteOff { key, velocity, .. } => Message::NoteOff { channel, key, velocity },
      Message::NoteOn { key, velocity, .. } => Message::NoteOn { channel, key, velocity },
      Message::PolyphonicKeyPressure { key, value, .. } => {
        Message::PolyphonicKeyPressure { channel, key, value }
      }
      Message::ControlChange {
        controller, value, ..
      } => Message::ControlChange {
        channel,
        controller,
        value,
      },
      Message::ProgramChange { value, .. } => Message::ProgramChange { channel, value },
      Message::ChannelPressure { value, .. } => Message::ChannelPressure { channel, value },
      Message::PitchBend { value, .. } => Message::PitchBend { channel, value },
      Message::AllNotesOff { .. } => Message::AllNotesOff { channel },
    }
  }

  /// A note on with zero velocity is a note off
  pub fn is_note_on(&self) -> bool {
    match self {
      Message::NoteOn { velocity, .. } => *velocity > 0,
      _ => false,
    }
  }

  pub fn is_note_off(&self) -> bool {
    match self {
      Message::NoteOff { .. } => true,
      Message::NoteOn { velocity, .. } => *velocity == 0,
      _ => false,
    }
  }
}
