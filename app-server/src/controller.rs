use std::io::BufRead;
use std::str::FromStr;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use failure::Fail;
use log::{debug, info, warn};

use perform_core::engine::Engine;
use perform_core::error::EngineError;
use perform_core::midi::Message;
use perform_core::time::{BarsTime, Pulse};

use crate::config::Controller as ControllerConfig;

#[derive(Debug, Fail)]
pub enum ControllerError {
  #[fail(display = "Failed to create the {} thread: {}", name, cause)]
  Start { name: &'static str, cause: String },

  #[fail(display = "Failed to join the Controller thread")]
  Stop,

  #[fail(display = "Unknown command: {}", line)]
  Parse { line: String },

  #[fail(display = "{}", cause)]
  Engine { cause: EngineError },
}

impl From<EngineError> for ControllerError {
  fn from(cause: EngineError) -> Self {
    ControllerError::Engine { cause }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
  Start { song_mode: bool },
  Stop,
  Pause,
  Seek { tick: Pulse },
  Left { tick: Pulse },
  Right { tick: Pulse },
  Tempo { beats_per_minute: f64 },
  Looping { looping: bool },
  Toggle { track: usize },
  Mute { mute: bool },
  Master { master: bool },
  AddTrigger { track: usize, tick: Pulse, length: Pulse, offset: Pulse },
  SplitTrigger { track: usize, tick: Pulse },
  RemoveTrigger { track: usize, tick: Pulse },
  Undo { track: usize },
  Redo { track: usize },
  MoveTriggers { forward: bool },
  CopyTriggers,
  Note { key: u8 },
  Status,
  Quit,
}

impl Command {
  /// Parses one line like `start song`, `seek 768` or `add 0 0 384`
  pub fn parse(line: &str) -> Result<Command, ControllerError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let command = match words.first().cloned().unwrap_or("") {
      "start" | "play" => Command::Start {
        song_mode: words.get(1).map_or(true, |mode| *mode != "live"),
      },
      "stop" => Command::Stop,
      "pause" => Command::Pause,
      "seek" => Command::Seek { tick: Self::arg(&words, 1, line)? },
      "left" => Command::Left { tick: Self::arg(&words, 1, line)? },
      "right" => Command::Right { tick: Self::arg(&words, 1, line)? },
      "bpm" => Command::Tempo {
        beats_per_minute: Self::arg(&words, 1, line)?,
      },
      "loop" => Command::Looping {
        looping: words.get(1).map_or(true, |state| *state != "off"),
      },
      "toggle" => Command::Toggle { track: Self::arg(&words, 1, line)? },
      "mute" => Command::Mute { mute: true },
      "unmute" => Command::Mute { mute: false },
      "master" => Command::Master { master: true },
      "slave" => Command::Master { master: false },
      "add" => Command::AddTrigger {
        track: Self::arg(&words, 1, line)?,
        tick: Self::arg(&words, 2, line)?,
        length: Self::arg(&words, 3, line)?,
        offset: if words.len() > 4 { Self::arg(&words, 4, line)? } else { 0 },
      },
      "split" => Command::SplitTrigger {
        track: Self::arg(&words, 1, line)?,
        tick: Self::arg(&words, 2, line)?,
      },
      "remove" => Command::RemoveTrigger {
        track: Self::arg(&words, 1, line)?,
        tick: Self::arg(&words, 2, line)?,
      },
      "undo" => Command::Undo { track: Self::arg(&words, 1, line)? },
      "redo" => Command::Redo { track: Self::arg(&words, 1, line)? },
      "insert" => Command::MoveTriggers { forward: true },
      "collapse" => Command::MoveTriggers { forward: false },
      "expand" => Command::CopyTriggers,
      "note" => Command::Note { key: Self::arg(&words, 1, line)? },
      "status" => Command::Status,
      "quit" | "exit" => Command::Quit,
      _ => {
        return Err(ControllerError::Parse {
          line: line.to_string(),
        })
      }
    };
    Ok(command)
  }

  fn arg<T: FromStr>(words: &[&str], index: usize, line: &str) -> Result<T, ControllerError> {
    words
      .get(index)
      .and_then(|word| word.parse::<T>().ok())
      .ok_or_else(|| ControllerError::Parse {
        line: line.to_string(),
      })
  }
}

pub enum Protocol {
  Stop,

  Command(Command),
}

struct ControllerThread {
  engine: Engine,
  input_tx: Sender<Message>,
  status_interval: Option<Duration>,
}

impl ControllerThread {
  fn new(engine: Engine, input_tx: Sender<Message>, config: &ControllerConfig) -> ControllerThread {
    let status_interval = match config.status_interval_millis {
      0 => None,
      millis => Some(Duration::from_millis(millis)),
    };
    ControllerThread {
      engine,
      input_tx,
      status_interval,
    }
  }

  fn handle_messages(&mut self, protocol_rx: Receiver<Protocol>) {
    info!("Handling commands ...");

    loop {
      let received = match self.status_interval {
        Some(interval) => match protocol_rx.recv_timeout(interval) {
          Ok(message) => Some(message),
          Err(RecvTimeoutError::Timeout) => None,
          Err(RecvTimeoutError::Disconnected) => Some(Protocol::Stop),
        },
        None => Some(protocol_rx.recv().unwrap_or(Protocol::Stop)),
      };

      match received {
        Some(Protocol::Stop) | Some(Protocol::Command(Command::Quit)) => break,
        Some(Protocol::Command(command)) => {
          debug!("Command {:?}", command);
          if let Err(err) = self.execute(command) {
            warn!("{}", err);
          }
        }
        None => {
          if let Err(err) = self.report(false) {
            warn!("{}", err);
          }
        }
      }
    }

    if let Err(err) = self.engine.finish() {
      warn!("{}", err);
    }
    info!("Controller stopped ...");
  }

  fn execute(&mut self, command: Command) -> Result<(), ControllerError> {
    let engine = &self.engine;
    match command {
      Command::Start { song_mode } => engine.start(song_mode)?,
      Command::Stop => engine.stop()?,
      Command::Pause => {
        if !engine.pause()? {
          info!("Nothing to pause");
        }
      }
      Command::Seek { tick } => engine.reposition(tick)?,
      Command::Left { tick } => engine.set_left_tick(tick)?,
      Command::Right { tick } => engine.set_right_tick(tick)?,
      Command::Tempo { beats_per_minute } => {
        engine.with_perform(|perform| perform.set_beats_per_minute(beats_per_minute))?
      }
      Command::Looping { looping } => {
        engine.with_perform(|perform| perform.set_looping(looping))?
      }
      Command::Toggle { track } => {
        let playing = engine.edit(|perform| perform.sequence_playing_toggle(track))?;
        info!("Track {} playing = {}", track, playing);
      }
      Command::Mute { mute } => engine.with_perform(|perform| perform.mute_all_tracks(mute))?,
      Command::Master { master } => {
        if !engine.with_perform(|perform| perform.set_master(master))? {
          info!("No external transport to drive");
        }
      }
      Command::AddTrigger {
        track,
        tick,
        length,
        offset,
      } => engine.edit(|perform| perform.add_trigger(track, tick, length, offset))?,
      Command::SplitTrigger { track, tick } => {
        if !engine.edit(|perform| perform.split_trigger(track, tick))? {
          info!("No trigger split at {}", tick);
        }
      }
      Command::RemoveTrigger { track, tick } => {
        if !engine.edit(|perform| perform.remove_trigger(track, tick))? {
          info!("No trigger at {}", tick);
        }
      }
      Command::Undo { track } => {
        engine.edit(|perform| perform.undo_triggers(track))?;
      }
      Command::Redo { track } => {
        engine.edit(|perform| perform.redo_triggers(track))?;
      }
      Command::MoveTriggers { forward } => {
        engine.with_perform(|perform| perform.move_triggers(forward))?;
      }
      Command::CopyTriggers => {
        engine.with_perform(|perform| perform.copy_triggers())?;
      }
      Command::Note { key } => {
        let on = Message::NoteOn {
          channel: 0,
          key,
          velocity: 100,
        };
        let off = Message::NoteOff {
          channel: 0,
          key,
          velocity: 0,
        };
        drop(self.input_tx.send(on));
        drop(self.input_tx.send(off));
      }
      Command::Status => self.report(true)?,
      Command::Quit => {}
    }
    Ok(())
  }

  fn report(&self, always: bool) -> Result<(), ControllerError> {
    let status = self.engine.with_perform(|perform| {
      let transport = perform.transport();
      (
        transport.is_running(),
        BarsTime::from_pulses(
          transport.get_tick(),
          transport.get_signature(),
          transport.get_ppqn(),
        ),
        transport.get_tick(),
        transport.get_tempo().get_value(),
        perform.bridge().is_active(),
        perform.triggered_tracks(transport.get_tick()),
      )
    })?;
    let (running, time, tick, beats_per_minute, synced, triggered) = status;
    if running || always {
      info!(
        "{:?} | tick {} | {} bpm | {} tracks on | {}{}",
        time,
        tick,
        beats_per_minute,
        triggered,
        if running { "rolling" } else { "stopped" },
        if synced { " | external" } else { "" }
      );
    }
    Ok(())
  }
}

///! Runs the commands against the engine, which it owns and finishes when stopped
pub struct Controller {
  handler: JoinHandle<()>,
  protocol_tx: Sender<Protocol>,
}

impl Controller {
  pub fn new_channel() -> (Sender<Protocol>, Receiver<Protocol>) {
    crossbeam_channel::unbounded::<Protocol>()
  }

  pub fn new(
    engine: Engine,
    input_tx: Sender<Message>,
    config: &ControllerConfig,
  ) -> Result<Controller, ControllerError> {
    info!("Starting Controller ...");

    let (protocol_tx, protocol_rx) = Self::new_channel();
    let config = config.clone();

    thread::Builder::new()
      .name("controller".into())
      .spawn(move || ControllerThread::new(engine, input_tx, &config).handle_messages(protocol_rx))
      .map_err(|err| ControllerError::Start {
        name: "controller",
        cause: err.to_string(),
      })
      .map(|handler| Controller {
        handler,
        protocol_tx,
      })
  }

  pub fn sender(&self) -> Sender<Protocol> {
    self.protocol_tx.clone()
  }

  /// Feeds the commands typed on the standard input until it is closed
  pub fn read_commands(&self) -> Result<(), ControllerError> {
    let protocol_tx = self.sender();
    thread::Builder::new()
      .name("commands".into())
      .spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
          let line = match line {
            Ok(line) => line,
            Err(err) => {
              warn!("Failed to read a command: {}", err);
              break;
            }
          };
          if line.trim().is_empty() {
            continue;
          }
          match Command::parse(line.as_str()) {
            Ok(command) => {
              let quit = command == Command::Quit;
              if protocol_tx.send(Protocol::Command(command)).is_err() || quit {
                return;
              }
            }
            Err(err) => warn!("{}", err),
          }
        }
        drop(protocol_tx.send(Protocol::Stop));
      })
      .map_err(|err| ControllerError::Start {
        name: "commands",
        cause: err.to_string(),
      })
      .map(|_| ())
  }

  /// Waits for the controller to be told to quit
  pub fn wait(self) -> Result<(), ControllerError> {
    self.handler.join().map_err(|_| ControllerError::Stop)
  }

  pub fn stop(self) -> Result<(), ControllerError> {
    info!("Stopping Controller ...");

    self
      .protocol_tx
      .send(Protocol::Stop)
      .map_err(|_| ControllerError::Stop)
      .and_then(|()| self.handler.join().map_err(|_| ControllerError::Stop))
  }
}
