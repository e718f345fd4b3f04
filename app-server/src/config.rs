use failure::Error;

use serde_derive::Deserialize;

use std::fs::File;
use std::io::Read;

/// The settings of the server itself, read from the same file as the engine ones
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
  pub controller: Controller,
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
    Self::from_str(content.as_str())
  }

  pub fn from_str<'a, T>(content: T) -> Result<Config, Error>
  where
    T: Into<&'a str>,
  {
    let config: Config = toml::from_str(content.into())?;
    Ok(config)
  }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Controller {
  /// Milliseconds between two status lines while playing, zero disables them
  pub status_interval_millis: u64,
}

impl Default for Controller {
  fn default() -> Controller {
    Controller {
      status_interval_millis: 1_000,
    }
  }
}

#[cfg(test)]
mod test {
  use super::Config;

  #[test]
  pub fn engine_sections_are_ignored() {
    let content = r#"
      [engine]
      ppqn = 96

      [controller]
      status_interval_millis = 250
    "#;
    let config = Config::from_str(content).unwrap();
    assert_eq!(config.controller.status_interval_millis, 250);
  }

  #[test]
  pub fn defaults() {
    let config = Config::from_str("").unwrap();
    assert_eq!(config.controller.status_interval_millis, 1_000);
  }
}
