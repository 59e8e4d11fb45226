//! # DitchPouch Core
//! Shared types, configuration, errors and the collaborator traits
//! (store + channel) that the engine and the adapters meet at.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::DitchPouchConfig;
pub use error::{DitchPouchError, Result};
pub use traits::{Channel, ProgressStore};
pub use types::{AdminCommand, Choice, Event, Outbound, UnlockPolicy, UserProgress};
