//! Reconciliation and escape-detection engine between `petwatch-api` and
//! the accessory layer that shows collar state to the user.
//!
//! - **[`Monitor`]**: Owns the single control path. Polls the remote
//!   service on a fixed interval, runs accelerated rechecks while an escape
//!   is suspected, serialises user-issued writes, and applies the
//!   re-authentication policy on failure.
//!
//! - **[`EscapeTracker`]**: Pure per-device debounce state machine. A pet
//!   outside every safe place and with no companion must be seen that way
//!   on `escape_confirmations` consecutive polls before the alarm fires.
//!
//! - **[`DeviceRegistry`]**: Concurrent map of [`TrackedDevice`] records
//!   (`DashMap` + `watch` snapshot). Snapshot and escape status are
//!   published together so no reader sees one without the other.
//!
//! - **[`PetService`]** / **[`AccessorySink`]**: The seams to the remote
//!   client (inbound data) and to the accessory layer (outbound
//!   notifications).

pub mod config;
pub mod convert;
pub mod error;
pub mod escape;
pub mod model;
pub mod monitor;
pub mod registry;
pub mod service;
pub mod sink;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{EscapeAlertType, MonitorConfig};
pub use error::CoreError;
pub use escape::{Evaluation, EscapeStatus, EscapeTracker, Transition};
pub use model::{DeviceId, DeviceSnapshot, Location, PetMode, TrackedDevice};
pub use monitor::Monitor;
pub use registry::DeviceRegistry;
pub use service::PetService;
pub use sink::{AccessorySink, NullSink};
