//! Telemirror — one-way Telegram mirroring with edit propagation.

pub mod config;
pub mod error;
pub mod mirror;
pub mod store;
pub mod supervisor;
pub mod text;
pub mod transport;
