//! Messenger abstractions (XMPP today).

pub mod port;
pub mod types;
