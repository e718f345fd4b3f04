use log::debug;

use crate::time::{ClockTime, Ppqn, Pulse, PulsesDriftCorrection, Signature, Tempo, DEFAULT_PPQN};

const DEFAULT_TEMPO: f64 = 120.0;
const DEFAULT_SIGNATURE_NUM_BEATS: u8 = 4;
const DEFAULT_SIGNATURE_NOTE_VALUE: u8 = 4;

///! The song clock: position, loop markers, playback mode and the running state.
///!
///! The position only changes through `update_from_segments` while running, or through
///! an explicit jump (start, stop, reposition).
pub struct Transport {
  ppqn: Ppqn,
  signature: Signature,
  tempo: Tempo,

  running: bool,
  paused: bool,
  pause_support: bool,
  song_mode: bool,
  looping: bool,

  tick: Pulse,
  starting_tick: Pulse,
  left_tick: Pulse,
  right_tick: Pulse,

  drift_correction: PulsesDriftCorrection,
}

impl Transport {
  pub fn new(ppqn: Ppqn) -> Self {
    let ppqn = if ppqn > 0 { ppqn } else { DEFAULT_PPQN };
    let signature = Signature::new(DEFAULT_SIGNATURE_NUM_BEATS, DEFAULT_SIGNATURE_NOTE_VALUE);
    let tempo = Tempo::new(DEFAULT_TEMPO);
    Transport {
      ppqn,
      signature,
      tempo,

      running: false,
      paused: false,
      pause_support: false,
      song_mode: false,
      looping: false,

      tick: 0,
      starting_tick: 0,
      left_tick: 0,
      right_tick: signature.measure_pulses(ppqn) * 4,

      drift_correction: PulsesDriftCorrection::new(ppqn, tempo),
    }
  }

  pub fn get_ppqn(&self) -> Ppqn {
    self.ppqn
  }

  pub fn set_ppqn(&mut self, ppqn: Ppqn) {
    if ppqn > 0 {
      self.ppqn = ppqn;
      self.update_timing_constants();
    }
  }

  pub fn get_signature(&self) -> Signature {
    self.signature
  }

  pub fn set_signature(&mut self, signature: Signature) {
    self.signature = signature;
  }

  pub fn get_tempo(&self) -> Tempo {
    self.tempo
  }

  pub fn set_tempo(&mut self, tempo: Tempo) {
    self.tempo = tempo;
    self.update_timing_constants();
  }

  /// The pulses of one measure with the current signature
  pub fn one_measure(&self) -> Pulse {
    self.signature.measure_pulses(self.ppqn)
  }

  pub fn is_running(&self) -> bool {
    self.running
  }

  pub fn is_paused(&self) -> bool {
    self.paused
  }

  pub fn has_pause_support(&self) -> bool {
    self.pause_support
  }

  pub fn set_pause_support(&mut self, pause_support: bool) {
    self.pause_support = pause_support;
  }

  pub fn is_song_mode(&self) -> bool {
    self.song_mode
  }

  pub fn set_song_mode(&mut self, song_mode: bool) {
    self.song_mode = song_mode;
  }

  pub fn is_looping(&self) -> bool {
    self.looping
  }

  pub fn set_looping(&mut self, looping: bool) {
    self.looping = looping;
  }

  pub fn get_tick(&self) -> Pulse {
    self.tick
  }

  /// Jumps to `tick` without touching the running state
  pub fn set_tick(&mut self, tick: Pulse) {
    self.tick = tick.max(0);
  }

  pub fn get_starting_tick(&self) -> Pulse {
    self.starting_tick
  }

  pub fn get_left_tick(&self) -> Pulse {
    self.left_tick
  }

  pub fn get_right_tick(&self) -> Pulse {
    self.right_tick
  }

  /// Moves the left marker, pushing the right one a measure away when they would cross
  pub fn set_left_tick(&mut self, tick: Pulse, set_start: bool) {
    self.left_tick = tick.max(0);
    if set_start {
      self.starting_tick = self.left_tick;
    }
    if self.left_tick >= self.right_tick {
      self.right_tick = self.left_tick + self.one_measure();
    }
  }

  /// Moves the right marker, pulling the left one a measure back when they would cross.
  /// Positions within the first measure are ignored.
  pub fn set_right_tick(&mut self, tick: Pulse, set_start: bool) {
    let one_measure = self.one_measure();
    if tick >= one_measure {
      self.right_tick = tick;
      if self.right_tick <= self.left_tick {
        self.left_tick = self.right_tick - one_measure;
        if set_start {
          self.starting_tick = self.left_tick;
        }
      }
    }
  }

  /// Starts rolling. Returns the tick the playback starts from.
  ///
  /// A paused transport resumes where it was. Otherwise the song starts at the left marker
  /// and the live mode at the beginning.
  pub fn start(&mut self, song_mode: bool) -> Pulse {
    self.song_mode = song_mode;
    if self.paused {
      self.paused = false;
    } else {
      self.starting_tick = if song_mode { self.left_tick } else { 0 };
      self.tick = self.starting_tick;
    }
    self.running = true;
    self.drift_correction.reset();
    debug!(
      "Transport started at {} in {} mode",
      self.tick,
      if song_mode { "song" } else { "live" }
    );
    self.tick
  }

  /// Stops rolling and goes back to the starting tick
  pub fn stop(&mut self) -> Pulse {
    self.running = false;
    self.paused = false;
    self.tick = self.starting_tick;
    self.drift_correction.reset();
    debug!("Transport stopped, back to {}", self.tick);
    self.tick
  }

  /// Stops rolling but keeps the position, so that the next start resumes from it
  pub fn pause(&mut self) -> bool {
    if self.pause_support && self.running {
      self.running = false;
      self.paused = true;
      debug!("Transport paused at {}", self.tick);
      true
    } else {
      false
    }
  }

  /// The whole pulses elapsed in `elapsed` wall clock time at the current tempo
  pub fn advance(&mut self, elapsed: ClockTime) -> Pulse {
    self.drift_correction.next(elapsed)
  }

  pub fn segments_iterator(&self, pulses: Pulse) -> SegmentsIterator {
    SegmentsIterator {
      next_tick: self.tick,
      remaining: pulses,
      left_tick: self.left_tick,
      right_tick: self.right_tick,
      looping: self.looping && self.song_mode,
    }
  }

  pub fn update_from_segments(&mut self, segments: &SegmentsIterator) {
    self.tick = segments.next_tick;
  }

  ///! Update timing constants that change sporadically (ex. changes on ppqn or tempo)
  fn update_timing_constants(&mut self) {
    self.drift_correction = PulsesDriftCorrection::new(self.ppqn, self.tempo);
    debug!(
      "Pulses per second = {:?}",
      self.drift_correction.get_pulses_per_second()
    );
  }
}

/// A contiguous run of pulses, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
  pub start_tick: Pulse,
  pub end_tick: Pulse,
  /// The position jumped back to `start_tick` right before this segment
  pub repositioned: bool,
}

/// Cuts an advance of the transport into segments at the right marker when looping
pub struct SegmentsIterator {
  next_tick: Pulse,
  remaining: Pulse,
  left_tick: Pulse,
  right_tick: Pulse,
  looping: bool,
}

impl SegmentsIterator {
  pub fn next_tick(&self) -> Pulse {
    self.next_tick
  }
}

impl Iterator for SegmentsIterator {
  type Item = Segment;

  fn next(&mut self) -> Option<Segment> {
    if self.remaining <= 0 {
      return None;
    }

    let mut start_tick = self.next_tick;
    let mut repositioned = false;
    if self.looping && start_tick >= self.right_tick {
      start_tick = self.left_tick;
      repositioned = true;
    }

    let mut end_tick = start_tick + self.remaining - 1;
    if self.looping && end_tick >= self.right_tick {
      end_tick = self.right_tick - 1;
    }

    self.remaining -= end_tick - start_tick + 1;
    self.next_tick = end_tick + 1;
    Some(Segment {
      start_tick,
      end_tick,
      repositioned,
    })
  }
}

#[cfg(test)]
mod test {
  use super::{Segment, Transport};
  use crate::time::{ClockTime, Tempo};

  fn segments(transport: &mut Transport, pulses: i64) -> Vec<Segment> {
    let mut iterator = transport.segments_iterator(pulses);
    let segments: Vec<Segment> = iterator.by_ref().collect();
    transport.update_from_segments(&iterator);
    segments
  }

  #[test]
  pub fn start_in_song_mode_from_left_marker() {
    let mut transport = Transport::new(192);
    transport.set_left_tick(768, true);
    assert_eq!(transport.start(true), 768);
    assert!(transport.is_running());
    assert!(transport.is_song_mode());
  }

  #[test]
  pub fn start_in_live_mode_from_zero() {
    let mut transport = Transport::new(192);
    transport.set_left_tick(768, true);
    assert_eq!(transport.start(false), 0);
  }

  #[test]
  pub fn stop_goes_back_to_start() {
    let mut transport = Transport::new(192);
    transport.set_left_tick(100, true);
    transport.start(true);
    segments(&mut transport, 500);
    assert_eq!(transport.get_tick(), 600);
    assert_eq!(transport.stop(), 100);
    assert!(!transport.is_running());
  }

  #[test]
  pub fn pause_and_resume_keep_tick() {
    let mut transport = Transport::new(192);
    transport.start(true);
    segments(&mut transport, 300);
    assert!(!transport.pause());

    transport.set_pause_support(true);
    assert!(transport.pause());
    assert!(transport.is_paused());
    assert!(!transport.is_running());
    assert_eq!(transport.start(true), 300);
    assert!(!transport.is_paused());
  }

  #[test]
  pub fn stop_after_pause_clears_pause() {
    let mut transport = Transport::new(192);
    transport.set_pause_support(true);
    transport.start(false);
    segments(&mut transport, 300);
    transport.pause();
    assert_eq!(transport.stop(), 0);
    assert!(!transport.is_paused());
    assert_eq!(transport.start(false), 0);
  }

  #[test]
  pub fn markers_never_cross() {
    let mut transport = Transport::new(192);
    transport.set_right_tick(1536, true);
    transport.set_left_tick(2000, true);
    assert_eq!(transport.get_right_tick(), 2000 + 768);

    transport.set_right_tick(1000, true);
    assert_eq!(transport.get_right_tick(), 1000);
    assert_eq!(transport.get_left_tick(), 232);
    assert_eq!(transport.get_starting_tick(), 232);

    transport.set_right_tick(100, true);
    assert_eq!(transport.get_right_tick(), 1000);
  }

  #[test]
  pub fn segments_wrap_at_right_marker() {
    let mut transport = Transport::new(192);
    transport.set_left_tick(0, true);
    transport.set_right_tick(768, true);
    transport.set_looping(true);
    transport.start(true);
    segments(&mut transport, 700);

    let wrapped = segments(&mut transport, 100);
    assert_eq!(
      wrapped,
      vec![
        Segment {
          start_tick: 700,
          end_tick: 767,
          repositioned: false
        },
        Segment {
          start_tick: 0,
          end_tick: 31,
          repositioned: true
        },
      ]
    );
    assert_eq!(transport.get_tick(), 32);
  }

  #[test]
  pub fn segments_wrap_when_landing_on_right_marker() {
    let mut transport = Transport::new(192);
    transport.set_looping(true);
    transport.set_left_tick(192, true);
    transport.set_right_tick(768, true);
    transport.start(true);
    segments(&mut transport, 576);
    assert_eq!(transport.get_tick(), 768);

    let wrapped = segments(&mut transport, 10);
    assert_eq!(wrapped[0].start_tick, 192);
    assert!(wrapped[0].repositioned);
  }

  #[test]
  pub fn live_mode_never_wraps() {
    let mut transport = Transport::new(192);
    transport.set_right_tick(768, true);
    transport.set_looping(true);
    transport.start(false);
    let all = segments(&mut transport, 2000);
    assert_eq!(all.len(), 1);
    assert_eq!(transport.get_tick(), 2000);
  }

  #[test]
  pub fn advance_follows_tempo() {
    let mut transport = Transport::new(192);
    transport.set_tempo(Tempo::new(60.0));
    assert_eq!(transport.advance(ClockTime::from_seconds(1.0)), 192);
    transport.set_ppqn(96);
    assert_eq!(transport.advance(ClockTime::from_seconds(2.0)), 192);
  }
}
