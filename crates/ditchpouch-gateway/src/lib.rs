//! # DitchPouch Gateway
//! Axum server exposing the WhatsApp webhook and a small admin API, and the
//! wiring that assembles store, channel, tracker and daily boundary.

pub mod inbox;
pub mod routes;
pub mod server;

pub use server::{AppState, build_router, build_tracker, start};
