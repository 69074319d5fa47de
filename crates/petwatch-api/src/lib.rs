// petwatch-api: Async Rust client for the TryFi GPS collar service

pub mod client;
pub mod error;
pub mod location;
pub mod models;
mod pets;
mod queries;
pub mod session;
pub mod transport;

pub use client::PetClient;
pub use error::Error;
pub use location::{FetchFailure, Location, LocationCache};
pub use models::{Pet, PetMode};
pub use session::Session;
pub use transport::TransportConfig;
