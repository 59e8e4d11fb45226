//! # DitchPouch Channels
//! Transport adapters: WhatsApp Cloud API in and out, plus a log-only
//! channel for dry runs. `decode` turns inbound content into engine events.

pub mod decode;
pub mod log;
pub mod whatsapp;

pub use decode::decode;
pub use log::LogChannel;
pub use whatsapp::{InboundContent, InboundMessage, WhatsAppChannel};
