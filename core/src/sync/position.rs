use crate::error::SyncResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
  Stopped,
  Starting,
  Rolling,
}

impl TransportState {
  pub fn is_moving(&self) -> bool {
    *self != TransportState::Stopped
  }
}

/// Where an external frame based transport is, and how its frames map to musical time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
  pub state: TransportState,
  pub frame: u64,
  pub frame_rate: u32,
  pub ticks_per_beat: f64,
  pub beats_per_bar: f64,
  pub beat_type: f64,
  pub beats_per_minute: f64,
}

impl Position {
  pub fn new(frame_rate: u32) -> Position {
    Position {
      state: TransportState::Stopped,
      frame: 0,
      frame_rate,
      ticks_per_beat: 1920.0,
      beats_per_bar: 4.0,
      beat_type: 4.0,
      beats_per_minute: 120.0,
    }
  }

  /// Whether the musical fields can be used to convert frames into ticks
  pub fn is_valid(&self) -> bool {
    self.frame_rate > 0
      && self.ticks_per_beat > 0.0
      && self.beat_type > 0.0
      && self.beats_per_minute > 0.0
  }

  /// The ticks, in the external resolution, elapsed until `frame`
  pub fn external_tick(&self) -> f64 {
    self.frame as f64 * self.ticks_per_beat * self.beats_per_minute
      / (f64::from(self.frame_rate) * 60.0)
  }

  /// The frame where `external_tick` falls
  pub fn frame_at(&self, external_tick: f64) -> u64 {
    let frame = external_tick * f64::from(self.frame_rate) * 60.0
      / (self.ticks_per_beat * self.beats_per_minute);
    frame.max(0.0).round() as u64
  }
}

/// An external transport the engine can follow or drive
pub trait TransportProvider: Send {
  fn query_position(&mut self) -> SyncResult<Position>;

  fn request_reposition(&mut self, frame: u64) -> SyncResult<()>;

  fn request_state(&mut self, state: TransportState) -> SyncResult<()>;

  /// Publishes the musical fields of `position` for the other clients, used when master
  fn publish(&mut self, position: &Position) -> SyncResult<()>;
}
