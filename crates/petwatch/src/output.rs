//! Output formatting: table or JSON.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

/// Semantic tone for a table cell.
#[derive(Debug, Clone, Copy)]
pub enum Tone {
    Good,
    Warn,
    Bad,
    Plain,
}

pub fn paint(text: &str, tone: Tone, color: bool) -> String {
    if !color {
        return text.to_owned();
    }
    match tone {
        Tone::Good => text.green().to_string(),
        Tone::Warn => text.yellow().to_string(),
        Tone::Bad => text.red().bold().to_string(),
        Tone::Plain => text.to_owned(),
    }
}

/// Render a list in the chosen format: `Tabled` rows for tables, the
/// original data via serde for JSON.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(Table::new(rows).with(Style::rounded()).to_string())
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(data)?),
    }
}

pub fn print_output(output: &str) {
    if output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize)]
    struct Item {
        name: &'static str,
    }

    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "Name")]
        name: String,
    }

    #[test]
    fn renders_table_and_json() {
        let data = [Item { name: "Rex" }];
        let row = |i: &Item| ItemRow {
            name: i.name.to_owned(),
        };

        let table = render_list(OutputFormat::Table, &data, row).unwrap_or_default();
        assert!(table.contains("Name"));
        assert!(table.contains("Rex"));

        let json = render_list(OutputFormat::JsonCompact, &data, row).unwrap_or_default();
        assert_eq!(json, r#"[{"name":"Rex"}]"#);
    }

    #[test]
    fn paint_is_identity_without_color() {
        assert_eq!(paint("ESCAPED", Tone::Bad, false), "ESCAPED");
        assert_ne!(paint("ESCAPED", Tone::Bad, true), "ESCAPED");
    }
}
