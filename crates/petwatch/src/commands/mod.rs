//! Command dispatch and shared helpers.

pub mod collar;
pub mod config_cmd;
pub mod pets;
pub mod run;

use std::path::PathBuf;

use tracing::debug;

use petwatch_api::{PetClient, TransportConfig};
use petwatch_config::Config;
use petwatch_core::{DeviceSnapshot, PetService};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Run => run::handle(&load(global)?).await,
        Command::Pets => pets::handle(&load(global)?, global).await,
        Command::Light(args) => collar::light(&load(global)?, &args).await,
        Command::LostMode(args) => collar::lost_mode(&load(global)?, &args).await,
        Command::Config(args) => config_cmd::handle(&args, global),
    }
}

/// The config file in use: `--config` or the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(petwatch_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = config_file(global);
    debug!(path = %path.display(), "loading config");
    Ok(petwatch_config::load_config_from(&path)?)
}

/// Build the remote client from resolved credentials.
pub fn build_client(cfg: &Config) -> Result<PetClient, CliError> {
    let creds = petwatch_config::resolve_credentials(cfg)?;
    let transport = TransportConfig::default().with_timeout(cfg.request_timeout());
    Ok(PetClient::new(
        cfg.api_url()?,
        creds.username,
        creds.password,
        &transport,
    )?)
}

/// Fetch the device list and pick one pet by id or case-insensitive name.
pub async fn find_pet(client: &PetClient, needle: &str) -> Result<DeviceSnapshot, CliError> {
    let devices = client.list_devices().await?;
    match_pet(devices, needle).ok_or_else(|| CliError::NotFound {
        identifier: needle.to_owned(),
    })
}

fn match_pet(devices: Vec<DeviceSnapshot>, needle: &str) -> Option<DeviceSnapshot> {
    let mut by_name = None;
    for device in devices {
        if device.id.as_str() == needle {
            return Some(device);
        }
        if by_name.is_none() && device.name.eq_ignore_ascii_case(needle) {
            by_name = Some(device);
        }
    }
    by_name
}
