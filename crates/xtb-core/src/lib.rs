//! Core domain + application logic for the XMPP twtxt bot.
//!
//! This crate is intentionally transport-agnostic. XMPP and the twtxt process
//! runner live behind ports (traits) implemented in adapter crates.

pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod liveness;
pub mod logging;
pub mod messaging;
pub mod security;
pub mod twtxt;

pub use errors::{Error, Result};
