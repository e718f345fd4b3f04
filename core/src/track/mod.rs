mod pattern;

pub use self::pattern::{Pattern, TrackContent};

use log::debug;

use crate::midi::{Event, Message, MidiOutput, U4};
use crate::time::{Ppqn, Pulse};
use crate::triggers::{PlayStatus, PlayWindow, Triggers};

pub struct Track {
  name: String,
  channel: U4,
  active: bool,
  recording: bool,

  triggers: Triggers,
  status: PlayStatus,

  content: Box<dyn TrackContent>,
}

impl Track {
  pub fn new<T>(name: T, channel: U4, ppqn: Ppqn, content: Box<dyn TrackContent>) -> Track
  where
    T: Into<String>,
  {
    let length = content.length();
    Track {
      name: name.into(),
      channel: channel & 0x0f,
      active: true,
      recording: false,
      triggers: Triggers::new(ppqn, length),
      status: PlayStatus::new(),
      content,
    }
  }

  pub fn get_name(&self) -> &str {
    self.name.as_str()
  }

  pub fn get_channel(&self) -> U4 {
    self.channel
  }

  pub fn set_channel(&mut self, channel: U4) {
    self.channel = channel & 0x0f;
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn set_active(&mut self, active: bool) {
    self.active = active;
  }

  pub fn is_recording(&self) -> bool {
    self.recording
  }

  pub fn set_recording(&mut self, recording: bool) {
    self.recording = recording;
  }

  pub fn is_playing(&self) -> bool {
    self.status.playing
  }

  pub fn is_blocked(&self) -> bool {
    self.status.blocked
  }

  pub fn get_last_tick(&self) -> Pulse {
    self.status.last_tick
  }

  pub fn get_trigger_offset(&self) -> Pulse {
    self.status.trigger_offset
  }

  pub fn triggers(&self) -> &Triggers {
    &self.triggers
  }

  pub fn triggers_mut(&mut self) -> &mut Triggers {
    &mut self.triggers
  }

  pub fn content(&self) -> &dyn TrackContent {
    self.content.as_ref()
  }

  pub fn get_length(&self) -> Pulse {
    self.content.length()
  }

  /// Changes the content length keeping every trigger on the same material
  pub fn set_length(&mut self, length: Pulse) {
    if length > 0 {
      self.content.set_length(length);
      self.triggers.adjust_offsets_to_length(length);
    }
  }

  /// Turns the track on or off, silencing whatever it was sounding when turning off
  pub fn set_playing(&mut self, playing: bool, output: &mut dyn MidiOutput) {
    if self.status.playing != playing {
      debug!("Track '{}' playing = {}", self.name, playing);
      if !playing {
        self.silence(output);
      }
      self.status.playing = playing;
    }
  }

  pub fn toggle_playing(&mut self, output: &mut dyn MidiOutput) {
    let playing = !self.status.playing;
    self.set_playing(playing, output);
  }

  /// Keeps a manual playing state against the triggers until the next trigger boundary
  pub fn block_triggers(&mut self) {
    self.status.blocked = true;
  }

  /// Plays the slice `[start_tick, end_tick]` of the song.
  ///
  /// In song mode the triggers decide whether the track plays and which offset applies,
  /// otherwise the current playing state is kept and the content is not shifted.
  pub fn play(
    &mut self,
    start_tick: Pulse,
    end_tick: Pulse,
    song_mode: bool,
    output: &mut dyn MidiOutput,
  ) {
    let window = if song_mode {
      self.triggers.play(&mut self.status, start_tick, end_tick)
    } else {
      PlayWindow {
        start_tick,
        end_tick,
        turning_off: false,
      }
    };

    if self.status.playing {
      let offset = if song_mode {
        self.status.trigger_offset
      } else {
        0
      };
      self.render(window.start_tick, window.end_tick, offset, output);
    }

    self.status.last_tick = window.end_tick + 1;

    if window.turning_off {
      self.set_playing(false, output);
    }
  }

  /// Forgets the playing position after a jump of the song position to `tick`.
  ///
  /// In song mode the track is turned off so that the triggers decide again from the new
  /// position. In live mode the playing state survives the jump.
  pub fn reposition(&mut self, tick: Pulse, song_mode: bool, output: &mut dyn MidiOutput) {
    let playing = self.status.playing;
    self.set_playing(false, output);
    self.status.last_tick = tick;
    if !song_mode {
      self.status.playing = playing;
    }
  }

  /// Stores an incoming event into the content when the track is armed
  pub fn record(&mut self, tick: Pulse, message: Message) -> bool {
    if self.recording {
      let offset = self.status.trigger_offset;
      self.content.record(tick - offset, message);
      true
    } else {
      false
    }
  }

  fn render(
    &self,
    start_tick: Pulse,
    end_tick: Pulse,
    offset: Pulse,
    output: &mut dyn MidiOutput,
  ) {
    let length = self.content.length();
    if length <= 0 {
      return;
    }
    let channel = self.channel;
    let mut tick = start_tick;
    while tick <= end_tick {
      let local = (tick - offset).rem_euclid(length);
      let chunk_end = (tick + length - 1 - local).min(end_tick);
      let base = tick - local;
      self.content.for_each_in(
        local,
        local + chunk_end - tick,
        &mut |event: &Event| output.emit(&event.message.with_channel(channel), base + event.tick),
      );
      tick = chunk_end + 1;
    }
  }

  fn silence(&self, output: &mut dyn MidiOutput) {
    output.emit(
      &Message::AllNotesOff {
        channel: self.channel,
      },
      self.status.last_tick,
    );
  }
}
