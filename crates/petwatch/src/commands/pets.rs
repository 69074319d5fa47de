//! One-shot pet listing.

use tabled::Tabled;

use petwatch_config::Config;
use petwatch_core::{DeviceSnapshot, PetService};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, Tone, paint};

use super::build_client;

#[derive(Tabled)]
struct PetRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Battery")]
    battery: String,
    #[tabled(rename = "Light")]
    light: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Where")]
    location: String,
    #[tabled(rename = "With")]
    companion: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn row(d: &DeviceSnapshot, color: bool) -> PetRow {
    let battery = format!(
        "{}%{}",
        d.battery_percent,
        if d.is_charging { " (charging)" } else { "" }
    );
    let battery_tone = if d.is_low_battery() && !d.is_charging {
        Tone::Warn
    } else {
        Tone::Plain
    };
    let location = d
        .safe_place()
        .or(d.location.area_name.as_deref())
        .unwrap_or("-")
        .to_owned();
    let (status, tone) = if d.is_escaped() {
        ("outside", Tone::Bad)
    } else {
        ("safe", Tone::Good)
    };
    let mode_tone = if d.mode.is_lost() { Tone::Bad } else { Tone::Plain };

    PetRow {
        id: d.id.to_string(),
        name: d.name.clone(),
        battery: paint(&battery, battery_tone, color),
        light: if d.light_on { "on" } else { "off" }.to_owned(),
        mode: paint(&d.mode.to_string(), mode_tone, color),
        location,
        companion: d.companion.clone().unwrap_or_else(|| "-".into()),
        status: paint(status, tone, color),
    }
}

pub async fn handle(cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let client = build_client(cfg)?;
    let mut devices = client.list_devices().await?;
    devices.sort_by(|a, b| a.name.cmp(&b.name));

    let color = output::should_color(global.color);
    let rendered = output::render_list(global.output, &devices, |d| row(d, color))?;
    output::print_output(&rendered);
    Ok(())
}
