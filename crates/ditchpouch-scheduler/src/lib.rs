//! # DitchPouch Scheduler
//!
//! Fires the once-a-day boundary that closes out a tracking day.
//!
//! ```text
//! tokio interval (check_interval_secs)
//!   └── DailyBoundary::poll(Local::now())
//!         └── due → callback → Tracker::handle(DailyTick)
//! ```

pub mod boundary;
pub mod cron;

pub use boundary::{DailyBoundary, spawn_daily_boundary};
