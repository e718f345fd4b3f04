use log::{debug, info};

use failure::{Error, Fail};

use perform_core::config::Config;
use perform_core::engine::Engine;
use perform_core::midi::ChannelInput;
use perform_core::perform::Perform;
use perform_core::sync::{LoopbackTransport, TransportBridge};

mod config;
use crate::config::Config as ServerConfig;

mod controller;
use crate::controller::Controller;

mod output;
use crate::output::LogMidiOutput;

const PERFORM_CONFIG: &str = "PERFORM_CONFIG";
const DEFAULT_PERFORM_CONFIG: &str = "perform.toml";

const PERFORM_LOG_CONFIG: &str = "PERFORM_LOG_CONFIG";
const DEFAULT_PERFORM_LOG_CONFIG: &str = "log4rs.yaml";

#[derive(Debug, Fail)]
enum MainError {
  #[fail(display = "Failed to init logging: {}", cause)]
  LoggingInit { cause: String },
}

fn main() -> Result<(), Error> {
  init_logging()?;

  let config_path =
    std::env::var(PERFORM_CONFIG).unwrap_or_else(|_| DEFAULT_PERFORM_CONFIG.to_string());

  let config = init_config(config_path.as_str())?;
  let server_config = ServerConfig::from_file(config_path.as_str())?;

  let (input_tx, input_rx) = ChannelInput::new_channel();

  let mut engine = init_engine(&config)?;
  engine.launch(Some(Box::new(ChannelInput::new(input_rx))))?;

  let controller = Controller::new(engine, input_tx, &server_config.controller)?;
  controller.read_commands()?;

  info!("Ready, type `start`, `stop`, `status` or `quit`");
  controller.wait()?;

  Ok(())
}

fn init_logging() -> Result<(), Error> {
  let log_config_path = std::env::var(PERFORM_LOG_CONFIG)
    .unwrap_or_else(|_| DEFAULT_PERFORM_LOG_CONFIG.to_string());

  log4rs::init_file(log_config_path.as_str(), Default::default()).map_err(|err| {
    MainError::LoggingInit {
      cause: err.to_string(),
    }
  })?;

  Ok(())
}

fn init_config(config_path: &str) -> Result<Config, Error> {
  info!("Loading the configuration from {} ...", config_path);
  let config = Config::from_file(config_path)?;
  debug!("{:#?}", config);

  Ok(config)
}

fn init_engine(config: &Config) -> Result<Engine, Error> {
  info!("Initialising the performance ...");

  let mut perform = Perform::from_config(config, Box::new(LogMidiOutput::new()));

  if config.transport.enabled {
    info!(
      "Following a loopback transport at {} frames per second",
      config.transport.frame_rate
    );
    let transport = LoopbackTransport::with_wall_clock(config.transport.frame_rate);
    perform.set_bridge(TransportBridge::new(
      Box::new(transport),
      config.transport.master,
      config.engine.ppqn,
    ));
  }

  Ok(Engine::new(perform, &config.driver))
}
