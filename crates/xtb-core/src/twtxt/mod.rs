//! twtxt / txtnish integration: invocation building, the process-runner port,
//! and the output shaping the chat replies rely on.

pub mod client;
pub mod filter;
pub mod service;
pub mod types;

pub use client::{CommandRunner, TwtxtInvocationBuilder};
pub use service::Twtxt;
pub use types::{CliFlavor, CliInvocation, TwtxtCliConfig};
