use log::{debug, info, trace, warn};

use crate::config::{Config, Engine as EngineConfig, Track as TrackConfig};
use crate::error::{EditError, EditResult};
use crate::midi::{Message, MidiOutput};
use crate::sync::{SyncReport, TransportBridge, TransportState};
use crate::time::{ClockTime, Ppqn, Pulse, Signature, Tempo};
use crate::track::{Pattern, Track};
use crate::transport::Transport;
use crate::triggers::{GrowEdit, Triggers};

///! The performance context: transport, tracks, output sink and external transport bridge.
///!
///! The control plane edits it between slices and the output driver calls `process` once per
///! slice. Both go through the same lock, so no edit ever overlaps the trigger evaluation.
pub struct Perform {
  transport: Transport,
  bridge: TransportBridge,
  tracks: Vec<Track>,
  output: Box<dyn MidiOutput>,
  thru: bool,
  allow_snap_split: bool,
  awaiting_start: bool,
}

impl Perform {
  pub fn new(config: &EngineConfig, output: Box<dyn MidiOutput>) -> Perform {
    let mut transport = Transport::new(config.ppqn);
    transport.set_signature(Signature::new(config.beats_per_bar, config.beat_width));
    transport.set_tempo(Tempo::new(config.beats_per_minute));
    transport.set_song_mode(config.song_mode);
    transport.set_looping(config.looping);
    transport.set_pause_support(config.pause_support);
    transport.set_left_tick(config.left_tick, true);
    transport.set_right_tick(config.right_tick, true);
    let starting_tick = transport.get_starting_tick();
    transport.set_tick(starting_tick);

    let ppqn = transport.get_ppqn();
    Perform {
      transport,
      bridge: TransportBridge::inactive(ppqn),
      tracks: Vec::new(),
      output,
      thru: true,
      allow_snap_split: config.allow_snap_split,
      awaiting_start: false,
    }
  }

  pub fn from_config(config: &Config, output: Box<dyn MidiOutput>) -> Perform {
    let mut perform = Perform::new(&config.engine, output);
    perform.set_thru(config.midi.thru);
    let ppqn = perform.transport.get_ppqn();
    for track_config in config.tracks.iter() {
      perform.add_track(Self::build_track(track_config, ppqn));
    }
    info!("Performance ready with {} tracks", perform.tracks.len());
    perform
  }

  fn build_track(config: &TrackConfig, ppqn: Ppqn) -> Track {
    let mut pattern = Pattern::new(config.length);
    for note in config.notes.iter() {
      pattern.add_note(note.tick, note.key, note.velocity, note.duration);
    }
    let mut track = Track::new(config.name.as_str(), config.channel, ppqn, Box::new(pattern));
    track.set_active(config.active);
    let discarded = track.triggers_mut().load(&config.triggers);
    if discarded > 0 {
      warn!(
        "Track '{}': {} malformed triggers discarded",
        config.name, discarded
      );
    }
    track
  }

  pub fn set_bridge(&mut self, bridge: TransportBridge) {
    self.bridge = bridge;
  }

  pub fn bridge(&self) -> &TransportBridge {
    &self.bridge
  }

  pub fn transport(&self) -> &Transport {
    &self.transport
  }

  pub fn set_thru(&mut self, thru: bool) {
    self.thru = thru;
  }

  pub fn add_track(&mut self, track: Track) -> usize {
    self.tracks.push(track);
    self.tracks.len() - 1
  }

  pub fn tracks(&self) -> &[Track] {
    &self.tracks
  }

  pub fn track(&self, index: usize) -> EditResult<&Track> {
    self
      .tracks
      .get(index)
      .ok_or(EditError::TrackNotFound { index })
  }

  fn track_mut(&mut self, index: usize) -> EditResult<&mut Track> {
    self
      .tracks
      .get_mut(index)
      .ok_or(EditError::TrackNotFound { index })
  }

  // Transport

  pub fn get_tick(&self) -> Pulse {
    self.transport.get_tick()
  }

  pub fn is_running(&self) -> bool {
    self.transport.is_running()
  }

  pub fn is_paused(&self) -> bool {
    self.transport.is_paused()
  }

  pub fn is_master(&self) -> bool {
    self.bridge.is_master()
  }

  /// Switches the bridge between driving and following the external transport.
  /// Returns false when there is no active bridge.
  pub fn set_master(&mut self, master: bool) -> bool {
    if !self.bridge.is_active() {
      return false;
    }
    self.bridge.set_master(master);
    info!(
      "External transport bridge now {}",
      if master { "master" } else { "slave" }
    );
    true
  }

  pub fn is_song_mode(&self) -> bool {
    self.transport.is_song_mode()
  }

  /// Whether the output driver has to keep processing slices
  pub fn needs_clock(&self) -> bool {
    self.transport.is_running() || self.bridge.is_active()
  }

  pub fn start(&mut self, song_mode: bool) {
    let tick = self.transport.start(song_mode);
    self.reposition_tracks(tick);
    if self.bridge.is_active() {
      self.bridge.position(song_mode, tick);
      self.awaiting_start = self.bridge.start();
    }
    info!(
      "Playback started at {} in {} mode",
      tick,
      if song_mode { "song" } else { "live" }
    );
  }

  pub fn stop(&mut self) {
    let song_mode = self.transport.is_song_mode();
    let tick = self.stop_local();
    if self.bridge.is_active() {
      self.bridge.stop();
      self.bridge.position(song_mode, tick);
    }
    info!("Playback stopped");
  }

  fn stop_local(&mut self) -> Pulse {
    let tick = self.transport.stop();
    self.awaiting_start = false;
    let output = self.output.as_mut();
    for track in self.tracks.iter_mut() {
      track.reposition(tick, true, output);
    }
    self.output.all_notes_off();
    self.output.flush();
    tick
  }

  pub fn pause(&mut self) -> bool {
    if !self.transport.pause() {
      return false;
    }
    self.awaiting_start = false;
    if self.bridge.is_active() {
      self.bridge.stop();
    }
    self.output.all_notes_off();
    self.output.flush();
    info!("Playback paused at {}", self.transport.get_tick());
    true
  }

  /// Jumps to `tick`, the tracks start deciding again from there
  pub fn reposition(&mut self, tick: Pulse) {
    let tick = tick.max(0);
    self.transport.set_tick(tick);
    self.reposition_tracks(tick);
    if self.bridge.is_active() {
      let song_mode = self.transport.is_song_mode();
      self.bridge.position(song_mode, tick);
    }
  }

  fn reposition_tracks(&mut self, tick: Pulse) {
    let song_mode = self.transport.is_song_mode();
    let output = self.output.as_mut();
    for track in self.tracks.iter_mut() {
      track.reposition(tick, song_mode, output);
    }
  }

  pub fn get_left_tick(&self) -> Pulse {
    self.transport.get_left_tick()
  }

  pub fn get_right_tick(&self) -> Pulse {
    self.transport.get_right_tick()
  }

  pub fn set_left_tick(&mut self, tick: Pulse) {
    self.transport.set_left_tick(tick, true);
    let left_tick = self.transport.get_left_tick();
    if self.bridge.is_master() {
      self.bridge.position(true, left_tick);
    } else if !self.bridge.is_active() && !self.is_running() && !self.is_paused() {
      self.transport.set_tick(left_tick);
    }
  }

  pub fn set_right_tick(&mut self, tick: Pulse) {
    self.transport.set_right_tick(tick, true);
  }

  pub fn is_looping(&self) -> bool {
    self.transport.is_looping()
  }

  pub fn set_looping(&mut self, looping: bool) {
    self.transport.set_looping(looping);
  }

  pub fn get_beats_per_minute(&self) -> f64 {
    self.transport.get_tempo().get_value()
  }

  pub fn set_beats_per_minute(&mut self, beats_per_minute: f64) {
    self.transport.set_tempo(Tempo::new(beats_per_minute));
  }

  // Processing

  /// Processes one slice of `elapsed` wall clock time.
  ///
  /// With an active bridge the external position decides how far the song moves, otherwise
  /// the elapsed time at the current tempo does.
  pub fn process(&mut self, elapsed: ClockTime) {
    let report = if self.bridge.is_active() {
      self
        .bridge
        .sync(self.transport.get_tempo(), self.transport.get_signature())
    } else {
      None
    };

    match report {
      Some(report) => self.follow(report),
      None => {
        if self.transport.is_running() {
          let pulses = self.transport.advance(elapsed);
          self.advance(pulses);
        }
      }
    }
  }

  fn follow(&mut self, report: SyncReport) {
    if !self.bridge.is_master() {
      let tempo = Tempo::new(report.beats_per_minute);
      if tempo != self.transport.get_tempo() {
        debug!("Following external tempo {}", tempo.get_value());
        self.transport.set_tempo(tempo);
      }
    }

    if report.state == TransportState::Stopped {
      if self.transport.is_running() && !self.awaiting_start {
        debug!("External transport stopped");
        self.stop_local();
      }
      return;
    }

    self.awaiting_start = false;
    if !self.transport.is_running() {
      let song_mode = self.transport.is_song_mode();
      let tick = self.transport.start(song_mode);
      self.reposition_tracks(tick);
    }

    if report.starting {
      self.transport.set_tick(report.tick);
      self.reposition_tracks(report.tick);
      return;
    }

    if report.holding || report.state != TransportState::Rolling {
      return;
    }

    let pulses = report.tick - self.transport.get_tick();
    if pulses < 0 || pulses > self.transport.one_measure() {
      debug!(
        "External transport jumped from {} to {}",
        self.transport.get_tick(),
        report.tick
      );
      self.transport.set_tick(report.tick);
      self.reposition_tracks(report.tick);
    } else {
      self.advance(pulses);
    }
  }

  fn advance(&mut self, pulses: Pulse) {
    if pulses <= 0 {
      return;
    }
    let song_mode = self.transport.is_song_mode();
    let mut segments = self.transport.segments_iterator(pulses);
    let mut wrapped = false;
    while let Some(segment) = segments.next() {
      if segment.repositioned {
        trace!("Looping back to {}", segment.start_tick);
        self.reposition_tracks(segment.start_tick);
        wrapped = true;
      }
      let output = self.output.as_mut();
      for track in self.tracks.iter_mut().filter(|track| track.is_active()) {
        track.play(segment.start_tick, segment.end_tick, song_mode, output);
      }
    }
    self.transport.update_from_segments(&segments);
    if wrapped && self.bridge.is_active() {
      // the external transport resumes where the wrapped slice ended
      self.bridge.position(song_mode, segments.next_tick());
    }
    self.output.flush();
  }

  // Input

  /// Echoes an incoming event when thru is enabled and records it into the armed tracks
  pub fn route_input(&mut self, message: Message) -> bool {
    let tick = self.transport.get_tick();
    if self.thru {
      let echoed = match self.tracks.iter().find(|track| track.is_recording()) {
        Some(track) => message.with_channel(track.get_channel()),
        None => message,
      };
      self.output.emit(&echoed, tick);
    }
    let mut recorded = false;
    for track in self.tracks.iter_mut().filter(|track| track.is_recording()) {
      recorded |= track.record(tick, message);
    }
    recorded
  }

  pub fn set_recording(&mut self, index: usize, recording: bool) -> EditResult<()> {
    self.track_mut(index)?.set_recording(recording);
    Ok(())
  }

  // Live playing state

  /// Flips the playing state of a track. During song playback the new state holds until
  /// the next trigger boundary.
  pub fn sequence_playing_toggle(&mut self, index: usize) -> EditResult<bool> {
    let song_playback = self.transport.is_song_mode() && self.transport.is_running();
    let track = self
      .tracks
      .get_mut(index)
      .ok_or(EditError::TrackNotFound { index })?;
    track.toggle_playing(self.output.as_mut());
    if song_playback {
      track.block_triggers();
    }
    Ok(track.is_playing())
  }

  pub fn sequence_playing_on(&mut self, index: usize) -> EditResult<()> {
    self.set_track_playing(index, true)
  }

  pub fn sequence_playing_off(&mut self, index: usize) -> EditResult<()> {
    self.set_track_playing(index, false)
  }

  fn set_track_playing(&mut self, index: usize, playing: bool) -> EditResult<()> {
    let track = self
      .tracks
      .get_mut(index)
      .ok_or(EditError::TrackNotFound { index })?;
    track.set_playing(playing, self.output.as_mut());
    Ok(())
  }

  pub fn mute_all_tracks(&mut self, mute: bool) {
    let output = self.output.as_mut();
    for track in self.tracks.iter_mut() {
      track.set_playing(!mute, output);
    }
  }

  /// How many active tracks have a trigger on at `tick`
  pub fn triggered_tracks(&self, tick: Pulse) -> usize {
    self
      .tracks
      .iter()
      .filter(|track| track.is_active() && track.triggers().state_at(tick))
      .count()
  }

  pub fn set_active(&mut self, index: usize, active: bool) -> EditResult<()> {
    self.track_mut(index)?.set_active(active);
    Ok(())
  }

  // Trigger edits of one track

  /// Applies an edit with an undo snapshot, dropped again when nothing changed
  fn edit_triggers<F>(&mut self, index: usize, edit: F) -> EditResult<bool>
  where
    F: FnOnce(&mut Triggers) -> EditResult<bool>,
  {
    let triggers = self.track_mut(index)?.triggers_mut();
    triggers.push_undo();
    let result = edit(&mut *triggers);
    if result != Ok(true) {
      triggers.discard_undo();
    }
    result
  }

  pub fn add_trigger(
    &mut self,
    track: usize,
    tick: Pulse,
    length: Pulse,
    offset: Pulse,
  ) -> EditResult<()> {
    self
      .edit_triggers(track, |triggers| {
        triggers.add(tick, length, offset, true).map(|_| true)
      })
      .map(|_| ())
  }

  pub fn remove_trigger(&mut self, track: usize, tick: Pulse) -> EditResult<bool> {
    self.edit_triggers(track, |triggers| Ok(triggers.remove(tick)))
  }

  pub fn split_trigger(&mut self, track: usize, tick: Pulse) -> EditResult<bool> {
    let exact = self.allow_snap_split;
    self.edit_triggers(track, |triggers| Ok(triggers.split(tick, exact)))
  }

  pub fn grow_trigger(
    &mut self,
    track: usize,
    tick_from: Pulse,
    tick_to: Pulse,
    length: Pulse,
  ) -> EditResult<()> {
    self
      .edit_triggers(track, |triggers| {
        triggers.grow(tick_from, tick_to, length).map(|_| true)
      })
      .map(|_| ())
  }

  pub fn move_track_triggers(
    &mut self,
    track: usize,
    start_tick: Pulse,
    distance: Pulse,
    forward: bool,
  ) -> EditResult<()> {
    self
      .edit_triggers(track, |triggers| {
        triggers
          .move_triggers(start_tick, distance, forward)
          .map(|_| true)
      })
      .map(|_| ())
  }

  pub fn copy_track_triggers(
    &mut self,
    track: usize,
    start_tick: Pulse,
    distance: Pulse,
  ) -> EditResult<()> {
    self
      .edit_triggers(track, |triggers| {
        triggers.copy(start_tick, distance).map(|_| true)
      })
      .map(|_| ())
  }

  /// Copies the selected trigger of a track into its clipboard
  pub fn copy_trigger(&mut self, track: usize) -> EditResult<()> {
    self.track_mut(track)?.triggers_mut().copy_selected()
  }

  /// Pastes the clipboard of a track at `tick`, or right after the last copy when `None`
  pub fn paste_trigger(&mut self, track: usize, tick: Option<Pulse>) -> EditResult<()> {
    self
      .edit_triggers(track, |triggers| {
        triggers.set_paste_tick(tick);
        triggers.paste().map(|_| true)
      })
      .map(|_| ())
  }

  pub fn remove_selected_trigger(&mut self, track: usize) -> EditResult<bool> {
    self.edit_triggers(track, |triggers| Ok(triggers.remove_selected()))
  }

  pub fn select_trigger(&mut self, track: usize, tick: Pulse) -> EditResult<bool> {
    Ok(self.track_mut(track)?.triggers_mut().select(tick))
  }

  pub fn unselect_trigger(&mut self, track: usize, tick: Pulse) -> EditResult<bool> {
    Ok(self.track_mut(track)?.triggers_mut().unselect(tick))
  }

  pub fn unselect_all_triggers(&mut self, track: usize) -> EditResult<()> {
    self.track_mut(track)?.triggers_mut().unselect_all();
    Ok(())
  }

  pub fn move_selected_trigger(
    &mut self,
    track: usize,
    tick: Pulse,
    fix_offset: bool,
    which: GrowEdit,
  ) -> EditResult<bool> {
    Ok(
      self
        .track_mut(track)?
        .triggers_mut()
        .move_selected(tick, fix_offset, which),
    )
  }

  pub fn offset_selected_triggers(
    &mut self,
    track: usize,
    delta: Pulse,
    which: GrowEdit,
  ) -> EditResult<bool> {
    Ok(
      self
        .track_mut(track)?
        .triggers_mut()
        .offset_selected(delta, which),
    )
  }

  pub fn undo_triggers(&mut self, track: usize) -> EditResult<bool> {
    Ok(self.track_mut(track)?.triggers_mut().pop_undo())
  }

  pub fn redo_triggers(&mut self, track: usize) -> EditResult<bool> {
    Ok(self.track_mut(track)?.triggers_mut().pop_redo())
  }

  // Trigger edits across tracks

  pub fn push_trigger_undo(&mut self) {
    for track in self.tracks.iter_mut() {
      track.triggers_mut().push_undo();
    }
  }

  pub fn pop_trigger_undo(&mut self) -> bool {
    self
      .tracks
      .iter_mut()
      .fold(false, |any, track| track.triggers_mut().pop_undo() || any)
  }

  pub fn pop_trigger_redo(&mut self) -> bool {
    self
      .tracks
      .iter_mut()
      .fold(false, |any, track| track.triggers_mut().pop_redo() || any)
  }

  /// Opens (`forward`) or closes a gap as wide as the loop markers at the left marker,
  /// in every active track
  pub fn move_triggers(&mut self, forward: bool) -> bool {
    let left_tick = self.transport.get_left_tick();
    let distance = self.transport.get_right_tick() - left_tick;
    if distance <= 0 {
      return false;
    }
    self.push_trigger_undo();
    for track in self.tracks.iter_mut().filter(|track| track.is_active()) {
      if let Err(error) = track
        .triggers_mut()
        .move_triggers(left_tick, distance, forward)
      {
        warn!("Track '{}': {}", track.get_name(), error);
      }
    }
    true
  }

  /// Duplicates the triggers between the loop markers of every active track right after them
  pub fn copy_triggers(&mut self) -> bool {
    let left_tick = self.transport.get_left_tick();
    let distance = self.transport.get_right_tick() - left_tick;
    if distance <= 0 {
      return false;
    }
    self.push_trigger_undo();
    for track in self.tracks.iter_mut().filter(|track| track.is_active()) {
      if let Err(error) = track.triggers_mut().copy(left_tick, distance) {
        warn!("Track '{}': {}", track.get_name(), error);
      }
    }
    true
  }

  /// The end of the latest trigger of all the tracks
  pub fn get_max_trigger(&self) -> Pulse {
    self
      .tracks
      .iter()
      .map(|track| track.triggers().maximum())
      .max()
      .unwrap_or(0)
  }
}
