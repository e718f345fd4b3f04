use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::error::{SyncError, SyncResult};

use super::position::{Position, TransportProvider, TransportState};

struct LoopbackState {
  position: Position,
  connected: bool,
  wall_clock: bool,
  last_instant: Option<Instant>,
}

///! An in-process frame transport.
///!
///! Clones share the same transport, so one handle can be given to the engine while
///! another one advances the frames or simulates a disconnection. A requested start goes
///! through `Starting` for one query before `Rolling`, like a real server does.
#[derive(Clone)]
pub struct LoopbackTransport {
  state: Arc<Mutex<LoopbackState>>,
}

impl LoopbackTransport {
  pub fn new(frame_rate: u32) -> LoopbackTransport {
    LoopbackTransport {
      state: Arc::new(Mutex::new(LoopbackState {
        position: Position::new(frame_rate),
        connected: true,
        wall_clock: false,
        last_instant: None,
      })),
    }
  }

  /// A transport whose frames follow the wall clock while rolling
  pub fn with_wall_clock(frame_rate: u32) -> LoopbackTransport {
    let transport = LoopbackTransport::new(frame_rate);
    if let Ok(mut state) = transport.state.lock() {
      state.wall_clock = true;
    }
    transport
  }

  fn lock(&self) -> SyncResult<MutexGuard<LoopbackState>> {
    self.state.lock().map_err(|_| SyncError::Unavailable {
      cause: "loopback transport lock poisoned".to_string(),
    })
  }

  /// Moves the frame forward when rolling
  pub fn advance(&self, frames: u64) {
    if let Ok(mut state) = self.lock() {
      if state.position.state == TransportState::Rolling {
        state.position.frame += frames;
      }
    }
  }

  pub fn set_beats_per_minute(&self, beats_per_minute: f64) {
    if let Ok(mut state) = self.lock() {
      state.position.beats_per_minute = beats_per_minute;
    }
  }

  pub fn set_meter(&self, beats_per_bar: f64, beat_type: f64, ticks_per_beat: f64) {
    if let Ok(mut state) = self.lock() {
      state.position.beats_per_bar = beats_per_bar;
      state.position.beat_type = beat_type;
      state.position.ticks_per_beat = ticks_per_beat;
    }
  }

  pub fn disconnect(&self) {
    if let Ok(mut state) = self.lock() {
      state.connected = false;
    }
  }

  pub fn reconnect(&self) {
    if let Ok(mut state) = self.lock() {
      state.connected = true;
    }
  }

  pub fn position(&self) -> Option<Position> {
    self.lock().ok().map(|state| state.position)
  }

  fn connected(&self) -> SyncResult<MutexGuard<LoopbackState>> {
    let state = self.lock()?;
    if state.connected {
      Ok(state)
    } else {
      Err(SyncError::Disconnected)
    }
  }
}

impl TransportProvider for LoopbackTransport {
  fn query_position(&mut self) -> SyncResult<Position> {
    let mut state = self.connected()?;
    if state.wall_clock && state.position.state == TransportState::Rolling {
      let now = Instant::now();
      if let Some(last_instant) = state.last_instant {
        let elapsed = now.duration_since(last_instant);
        let frames = elapsed.as_nanos() * u128::from(state.position.frame_rate) / 1_000_000_000;
        state.position.frame += frames as u64;
      }
      state.last_instant = Some(now);
    }

    let position = state.position;
    if position.state == TransportState::Starting {
      state.position.state = TransportState::Rolling;
      state.last_instant = Some(Instant::now());
    }
    Ok(position)
  }

  fn request_reposition(&mut self, frame: u64) -> SyncResult<()> {
    let mut state = self.connected()?;
    state.position.frame = frame;
    if state.last_instant.is_some() {
      state.last_instant = Some(Instant::now());
    }
    Ok(())
  }

  fn request_state(&mut self, requested: TransportState) -> SyncResult<()> {
    let mut state = self.connected()?;
    let next = match (state.position.state, requested) {
      (TransportState::Stopped, TransportState::Starting)
      | (TransportState::Stopped, TransportState::Rolling) => TransportState::Starting,
      (_, TransportState::Stopped) => TransportState::Stopped,
      (current, _) => current,
    };
    if next == TransportState::Stopped {
      state.last_instant = None;
    }
    state.position.state = next;
    Ok(())
  }

  fn publish(&mut self, position: &Position) -> SyncResult<()> {
    let mut state = self.connected()?;
    state.position.ticks_per_beat = position.ticks_per_beat;
    state.position.beats_per_bar = position.beats_per_bar;
    state.position.beat_type = position.beat_type;
    state.position.beats_per_minute = position.beats_per_minute;
    Ok(())
  }
}
