mod loopback;
mod position;

pub use self::loopback::LoopbackTransport;
pub use self::position::{Position, TransportProvider, TransportState};

use log::{debug, info, warn};

use crate::error::SyncError;
use crate::time::{Ppqn, Pulse, Signature, Tempo};

/// Cycles to wait for a requested relocation before trusting the reported frames again
pub const MAX_PENDING_CYCLES: u32 = 100;

/// External ticks per local pulse published when master
pub const MASTER_TICKS_PER_PULSE: f64 = 10.0;

///! The outcome of one synchronisation cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncReport {
  pub state: TransportState,
  /// The local tick the external position maps to
  pub tick: Pulse,
  /// The transport just entered `Starting`, the engine has to relocate to `tick`
  pub starting: bool,
  /// A relocation is still pending, the reported tick can not be trusted yet
  pub holding: bool,
  pub beats_per_minute: f64,
}

struct PendingReposition {
  frame: u64,
  cycles: u32,
}

///! Maps the local pulse clock onto an external frame based transport.
///!
///! As slave the external position drives the local tick. As master the local tempo and
///! meter are published for the other clients, while the frames still drive the tick.
///! Any provider failure deactivates the bridge and the engine falls back to its own clock.
pub struct TransportBridge {
  provider: Option<Box<dyn TransportProvider>>,
  active: bool,
  master: bool,

  ppqn: Ppqn,
  position: Position,
  state: TransportState,
  last_state: TransportState,
  frame: u64,
  last_frame: u64,
  tick: Pulse,

  tick_multiplier: f64,
  multiplier_basis: (f64, f64, Ppqn),

  pending: Option<PendingReposition>,
}

impl TransportBridge {
  /// A bridge without any external transport, never active
  pub fn inactive(ppqn: Ppqn) -> TransportBridge {
    TransportBridge {
      provider: None,
      active: false,
      master: false,
      ppqn,
      position: Position::new(0),
      state: TransportState::Stopped,
      last_state: TransportState::Stopped,
      frame: 0,
      last_frame: 0,
      tick: 0,
      tick_multiplier: 1.0,
      multiplier_basis: (0.0, 0.0, 0),
      pending: None,
    }
  }

  pub fn new(provider: Box<dyn TransportProvider>, master: bool, ppqn: Ppqn) -> TransportBridge {
    let mut bridge = TransportBridge::inactive(ppqn);
    bridge.provider = Some(provider);
    bridge.active = true;
    bridge.master = master;
    info!(
      "External transport bridge active as {}",
      if master { "master" } else { "slave" }
    );
    bridge
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn is_master(&self) -> bool {
    self.active && self.master
  }

  pub fn set_master(&mut self, master: bool) {
    self.master = master;
  }

  pub fn state(&self) -> TransportState {
    self.state
  }

  pub fn frame(&self) -> u64 {
    self.frame
  }

  pub fn last_frame(&self) -> u64 {
    self.last_frame
  }

  pub fn tick(&self) -> Pulse {
    self.tick
  }

  pub fn frame_rate(&self) -> u32 {
    self.position.frame_rate
  }

  pub fn tick_multiplier(&self) -> f64 {
    self.tick_multiplier
  }

  pub fn set_ppqn(&mut self, ppqn: Ppqn) {
    self.ppqn = ppqn;
  }

  /// Stops following the external transport
  pub fn deactivate(&mut self) {
    if self.active {
      info!("External transport bridge deactivated");
    }
    self.active = false;
    self.pending = None;
    self.state = TransportState::Stopped;
    self.last_state = TransportState::Stopped;
  }

  fn fail(&mut self, error: SyncError) {
    warn!("External transport failed, using the internal clock: {}", error);
    self.deactivate();
  }

  pub fn start(&mut self) -> bool {
    self.request_state(TransportState::Rolling)
  }

  pub fn stop(&mut self) -> bool {
    self.request_state(TransportState::Stopped)
  }

  fn request_state(&mut self, state: TransportState) -> bool {
    if !self.active {
      return false;
    }
    let result = match self.provider.as_mut() {
      Some(provider) => provider.request_state(state),
      None => return false,
    };
    match result {
      Ok(()) => {
        debug!("External transport state requested: {:?}", state);
        true
      }
      Err(error) => {
        self.fail(error);
        false
      }
    }
  }

  /// Asks the external transport to relocate to the local `tick`, or to the beginning in
  /// live mode. The relocation is confirmed by a later `sync`.
  pub fn position(&mut self, song_mode: bool, tick: Pulse) -> bool {
    if !self.active || !self.position.is_valid() {
      return false;
    }
    let tick = if song_mode { tick.max(0) } else { 0 };
    let external_tick = tick as f64 / self.tick_multiplier;
    let frame = self.position.frame_at(external_tick);

    let result = match self.provider.as_mut() {
      Some(provider) => provider.request_reposition(frame),
      None => return false,
    };
    match result {
      Ok(()) => {
        debug!("External transport relocation to frame {} (tick {})", frame, tick);
        self.pending = Some(PendingReposition {
          frame,
          cycles: MAX_PENDING_CYCLES,
        });
        true
      }
      Err(error) => {
        self.fail(error);
        false
      }
    }
  }

  /// Runs one synchronisation cycle.
  ///
  /// When master the local tempo and meter are published first. Then the external position
  /// is queried and converted into a local tick.
  pub fn sync(&mut self, tempo: Tempo, signature: Signature) -> Option<SyncReport> {
    if !self.active {
      return None;
    }

    if self.master {
      let mut published = self.position;
      published.ticks_per_beat = f64::from(self.ppqn) * MASTER_TICKS_PER_PULSE;
      published.beats_per_bar = f64::from(signature.get_beats_per_bar());
      published.beat_type = f64::from(signature.get_beat_width());
      published.beats_per_minute = tempo.get_value();
      let result = match self.provider.as_mut() {
        Some(provider) => provider.publish(&published),
        None => return None,
      };
      if let Err(error) = result {
        self.fail(error);
        return None;
      }
    }

    let result = match self.provider.as_mut() {
      Some(provider) => provider.query_position(),
      None => return None,
    };
    let mut position = match result {
      Ok(position) => position,
      Err(error) => {
        self.fail(error);
        return None;
      }
    };

    if position.frame_rate == 0 {
      position.frame_rate = self.position.frame_rate;
    }
    if !position.is_valid() {
      warn!("External transport reported an unusable position: {:?}", position);
      return None;
    }

    self.position = position;
    self.update_tick_multiplier();
    self.last_frame = self.frame;
    self.frame = position.frame;
    self.last_state = self.state;
    self.state = position.state;
    self.tick = (position.external_tick() * self.tick_multiplier).round() as Pulse;

    let starting =
      self.state == TransportState::Starting && self.last_state != TransportState::Starting;
    if starting {
      debug!("External transport starting at tick {}", self.tick);
    }

    let holding = self.update_pending(position.frame, starting);

    Some(SyncReport {
      state: self.state,
      tick: self.tick,
      starting,
      holding,
      beats_per_minute: position.beats_per_minute,
    })
  }

  fn update_tick_multiplier(&mut self) {
    let basis = (
      self.position.ticks_per_beat,
      self.position.beat_type,
      self.ppqn,
    );
    if basis != self.multiplier_basis {
      let external_ppqn = basis.0 * basis.1 / 4.0;
      self.tick_multiplier = f64::from(self.ppqn) / external_ppqn;
      self.multiplier_basis = basis;
      debug!("External transport tick multiplier = {}", self.tick_multiplier);
    }
  }

  fn update_pending(&mut self, frame: u64, starting: bool) -> bool {
    let frame_rate = u64::from(self.position.frame_rate);
    let done = match self.pending.as_mut() {
      Some(pending) => {
        if starting || (frame >= pending.frame && frame - pending.frame < frame_rate) {
          true
        } else if pending.cycles <= 1 {
          warn!(
            "External transport never relocated to frame {}, resuming",
            pending.frame
          );
          true
        } else {
          pending.cycles -= 1;
          false
        }
      }
      None => return false,
    };
    if done {
      self.pending = None;
    }
    !done
  }
}
