use std::{fmt, path::Path, path::PathBuf, str::FromStr};

use crate::{errors::Error, Result};

/// Which microblogging client is installed.
///
/// txtnish has no `view` sub-command, so per-user views are filtered out of
/// its timeline instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CliFlavor {
    Twtxt,
    Txtnish,
}

impl CliFlavor {
    /// Guess the flavor from the binary name (`txtnish*` vs anything else).
    pub fn from_program(program: &Path) -> Self {
        let is_txtnish = program
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_lowercase().starts_with("txtnish"))
            .unwrap_or(false);
        if is_txtnish {
            CliFlavor::Txtnish
        } else {
            CliFlavor::Twtxt
        }
    }
}

impl FromStr for CliFlavor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "twtxt" => Ok(CliFlavor::Twtxt),
            "txtnish" => Ok(CliFlavor::Txtnish),
            other => Err(Error::Config(format!(
                "unknown twtxt flavor {other:?} (expected \"twtxt\" or \"txtnish\")"
            ))),
        }
    }
}

impl fmt::Display for CliFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliFlavor::Twtxt => f.write_str("twtxt"),
            CliFlavor::Txtnish => f.write_str("txtnish"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TwtxtCliConfig {
    pub program: PathBuf,
    pub flavor: CliFlavor,
}

/// A concrete process invocation: program plus argument vector.
///
/// Arguments are handed to the process as-is; nothing is ever passed through
/// a shell, so spaces and quotes inside a tweet need no escaping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CliInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}
