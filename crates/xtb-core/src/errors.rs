use std::process::ExitStatus;

/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the dispatcher
/// can turn tool failures into chat replies and the binary can tell fatal
/// conditions apart.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("twtxt exited with status {status}{}", stderr_suffix(.stderr))]
    Tool { status: ExitStatus, stderr: String },

    /// The search ran but nothing in the timeline matched.
    #[error("no matches")]
    NoMatches,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("Connection lost.")]
    ConnectionLost,

    #[error("external error: {0}")]
    External(String),
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.trim().is_empty() {
        String::new()
    } else {
        format!("\nstderr (tail):\n{stderr}")
    }
}

pub type Result<T> = std::result::Result<T, Error>;
