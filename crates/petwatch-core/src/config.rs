// ── Runtime monitor configuration ──
//
// These types describe *how* the monitor polls and debounces. They never
// touch disk: `petwatch-config` builds a `MonitorConfig` and hands it in.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::escape::DEFAULT_CONFIRMATIONS;

/// How the accessory layer renders the escape alarm. Cosmetic only.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EscapeAlertType {
    #[default]
    Leak,
    Motion,
}

/// Polling and debounce settings for a [`Monitor`](crate::Monitor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Main poll cadence.
    pub polling_interval: Duration,
    /// Consecutive escaped readings required before the alarm fires.
    pub escape_confirmations: u32,
    /// Delay before an accelerated recheck while an escape is suspected.
    pub escape_check_interval: Duration,
    /// Pet names excluded from monitoring (compared case-insensitively).
    pub ignored_pets: Vec<String>,
    pub escape_alert_type: EscapeAlertType,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            polling_interval: Duration::from_secs(60),
            escape_confirmations: DEFAULT_CONFIRMATIONS,
            escape_check_interval: Duration::from_secs(30),
            ignored_pets: Vec::new(),
            escape_alert_type: EscapeAlertType::default(),
        }
    }
}

impl MonitorConfig {
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored_pets
            .iter()
            .any(|ignored| ignored.eq_ignore_ascii_case(name))
    }

    /// Confirmation threshold, never below 1.
    pub fn confirmations(&self) -> u32 {
        self.escape_confirmations.max(1)
    }
}
