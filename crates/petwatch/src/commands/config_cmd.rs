//! Config subcommand handlers.

use petwatch_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&super::config_file(global).display().to_string());
            Ok(())
        }
        ConfigCommand::Show => {
            let cfg = super::load(global)?;
            let rendered = render_redacted(&cfg, global.output)?;
            output::print_output(&rendered);
            Ok(())
        }
    }
}

/// Format config for display, masking the password.
fn render_redacted(cfg: &Config, format: OutputFormat) -> Result<String, CliError> {
    let mut shown = cfg.clone();
    if shown.password.is_some() {
        shown.password = Some("****".into());
    }
    Ok(match format {
        OutputFormat::Table => toml::to_string_pretty(&shown)?,
        OutputFormat::Json => serde_json::to_string_pretty(&shown)?,
        OutputFormat::JsonCompact => serde_json::to_string(&shown)?,
    })
}
