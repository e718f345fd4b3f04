use failure::Error;

use serde_derive::Deserialize;

use std::fs::File;
use std::io::Read;

use crate::time::{Ppqn, Pulse, DEFAULT_PPQN};
use crate::triggers::TriggerRecord;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Engine {
  pub ppqn: Ppqn,
  pub beats_per_minute: f64,
  pub beats_per_bar: u8,
  pub beat_width: u8,
  pub song_mode: bool,
  pub looping: bool,
  pub pause_support: bool,
  /// Split triggers exactly at the given tick instead of at their middle
  pub allow_snap_split: bool,
  pub left_tick: Pulse,
  pub right_tick: Pulse,
}

impl Default for Engine {
  fn default() -> Engine {
    Engine {
      ppqn: DEFAULT_PPQN,
      beats_per_minute: 120.0,
      beats_per_bar: 4,
      beat_width: 4,
      song_mode: true,
      looping: false,
      pause_support: true,
      allow_snap_split: false,
      left_tick: 0,
      right_tick: Pulse::from(DEFAULT_PPQN) * 4 * 4,
    }
  }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Driver {
  pub slice_micros: u64,
  pub realtime_priority: bool,
}

impl Default for Driver {
  fn default() -> Driver {
    Driver {
      slice_micros: 2_000,
      realtime_priority: true,
    }
  }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Transport {
  pub enabled: bool,
  pub master: bool,
  pub frame_rate: u32,
}

impl Default for Transport {
  fn default() -> Transport {
    Transport {
      enabled: false,
      master: true,
      frame_rate: 48_000,
    }
  }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Midi {
  pub thru: bool,
}

impl Default for Midi {
  fn default() -> Midi {
    Midi { thru: true }
  }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Note {
  pub tick: Pulse,
  pub key: u8,
  #[serde(default = "default_velocity")]
  pub velocity: u8,
  pub duration: Pulse,
}

fn default_velocity() -> u8 {
  100
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Track {
  pub name: String,
  pub length: Pulse,
  pub active: bool,
  pub channel: u8,
  pub notes: Vec<Note>,
  pub triggers: Vec<TriggerRecord>,
}

impl Default for Track {
  fn default() -> Track {
    Track {
      name: "untitled".to_string(),
      length: Pulse::from(DEFAULT_PPQN) * 4,
      active: true,
      channel: 0,
      notes: Vec::new(),
      triggers: Vec::new(),
    }
  }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
  pub engine: Engine,
  pub driver: Driver,
  pub transport: Transport,
  pub midi: Midi,
  pub tracks: Vec<Track>,
}

impl Config {
  pub fn from_file<'a, T>(path: T) -> Result<Config, Error>
  where
    T: Into<&'a str>,
  {
    let mut content = String::new();
    let path_str = path.into();
    let mut file = File::open(path_str)?;
    file.read_to_string(&mut content)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
  }

  pub fn from_str<'a, T>(content: T) -> Result<Config, Error>
  where
    T: Into<&'a str>,
  {
    let config: Config = toml::from_str(content.into())?;
    Ok(config)
  }
}

#[cfg(test)]
mod test {
  use super::Config;
  use crate::triggers::TriggerRecord;

  #[test]
  pub fn defaults_from_empty_content() {
    let config = Config::from_str("").unwrap();
    assert_eq!(config.engine.ppqn, 192);
    assert_eq!(config.driver.slice_micros, 2_000);
    assert!(!config.transport.enabled);
    assert!(config.midi.thru);
    assert!(config.tracks.is_empty());
  }

  #[test]
  pub fn tracks_with_notes_and_triggers() {
    let content = r#"
      [engine]
      ppqn = 96
      looping = true

      [[tracks]]
      name = "bass"
      length = 384
      channel = 1
      notes = [
        { tick = 0, key = 36, duration = 48 },
        { tick = 192, key = 43, velocity = 90, duration = 48 },
      ]
      triggers = [
        { tick_start = 0, tick_end = 767 },
        { tick_start = 1536, tick_end = 2303, offset = 96 },
      ]
    "#;
    let config = Config::from_str(content).unwrap();
    assert_eq!(config.engine.ppqn, 96);
    assert!(config.engine.looping);
    assert_eq!(config.engine.beats_per_bar, 4);

    let track = &config.tracks[0];
    assert_eq!(track.name, "bass");
    assert!(track.active);
    assert_eq!(track.notes[0].velocity, 100);
    assert_eq!(track.notes[1].velocity, 90);
    assert_eq!(
      track.triggers,
      vec![
        TriggerRecord::new(0, 767, 0),
        TriggerRecord::new(1536, 2303, 96)
      ]
    );
  }

  #[test]
  pub fn invalid_content_fails() {
    assert!(Config::from_str("[engine]\nppqn = \"many\"").is_err());
  }

  #[test]
  pub fn missing_file_fails() {
    assert!(Config::from_file("/nonexistent/perform.toml").is_err());
  }
}
