//! Collar write commands: light and lost-dog mode.

use tracing::debug;

use petwatch_core::PetService;
use petwatch_config::Config;

use crate::cli::SwitchArgs;
use crate::error::CliError;

use super::{build_client, find_pet};

pub async fn light(cfg: &Config, args: &SwitchArgs) -> Result<(), CliError> {
    let client = build_client(cfg)?;
    let pet = find_pet(&client, &args.pet).await?;
    let on = args.state.is_on();

    debug!(device = %pet.id, module = %pet.module_id, on, "setting light");
    client.set_light(&pet.module_id, on).await?;
    println!("{}: light {}", pet.name, if on { "on" } else { "off" });
    Ok(())
}

pub async fn lost_mode(cfg: &Config, args: &SwitchArgs) -> Result<(), CliError> {
    let client = build_client(cfg)?;
    let pet = find_pet(&client, &args.pet).await?;
    let lost = args.state.is_on();

    debug!(device = %pet.id, module = %pet.module_id, lost, "setting lost dog mode");
    PetService::set_lost_mode(&client, &pet.module_id, lost).await?;
    println!(
        "{}: {}",
        pet.name,
        if lost { "lost dog mode on" } else { "back to normal mode" }
    );
    Ok(())
}
