//! # DitchPouch Engine
//!
//! The tapering state machine and the tracker that drives it.
//!
//! ```text
//! Event ──► Tracker (one event at a time)
//!             ├── ProgressStore::load
//!             ├── Engine::transition   (pure)
//!             ├── ProgressStore::save
//!             └── Channel::send × outbound
//! ```

pub mod engine;
pub mod ladder;
pub mod messages;
pub mod tracker;

pub use engine::{Engine, Transition};
pub use tracker::Tracker;
