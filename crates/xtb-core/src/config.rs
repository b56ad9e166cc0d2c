use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{errors::Error, twtxt::types::CliFlavor, Result};

const DEFAULT_TIMELINE_ENTRIES: usize = 10;
const DEFAULT_MAX_CHARACTERS: usize = 140;

/// Well-known install locations, preferred order (txtnish first).
const KNOWN_TOOL_PATHS: [&str; 2] = ["/usr/local/bin/txtnish", "/usr/local/bin/twtxt"];

/// On-disk configuration (`config.json`).
///
/// Field names match the historical goxtxt config so existing files keep working.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileConfig {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub bot_jid: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub control_jid: String,
    #[serde(default)]
    pub twtxtnick: String,
    #[serde(default = "default_timeline_entries")]
    pub timeline_entries: usize,
    #[serde(default = "default_max_characters")]
    pub max_characters: usize,
}

fn default_timeline_entries() -> usize {
    DEFAULT_TIMELINE_ENTRIES
}

fn default_max_characters() -> usize {
    DEFAULT_MAX_CHARACTERS
}

/// Typed, validated configuration. Immutable once loaded.
#[derive(Clone, Debug)]
pub struct Config {
    // XMPP
    pub address: Option<String>,
    pub bot_jid: String,
    pub password: String,
    pub control_jid: String,

    // twtxt
    pub twtxt_nick: String,
    pub timeline_entries: usize,
    pub max_characters: usize,
    pub twtxt_path: PathBuf,
    pub twtxt_flavor: CliFlavor,
}

impl Config {
    /// Load `$XTB_CONFIG` or `$HOME/.config/goxtxt/config.json` and resolve the
    /// twtxt binary.
    pub fn load() -> Result<Self> {
        let path = match env_path("XTB_CONFIG") {
            Some(p) => p,
            None => {
                let home =
                    home_dir().ok_or_else(|| Error::Config("HOME is not set".to_string()))?;
                let dir = home.join(".config/goxtxt");
                ensure_config_dir(&dir)?;
                dir.join("config.json")
            }
        };

        let file = read_file_config(&path)?;

        let (twtxt_path, detected) = resolve_twtxt_path()?;
        let twtxt_flavor = match env_str("XTB_TWTXT_FLAVOR").and_then(non_empty) {
            Some(s) => s.parse()?,
            None => detected,
        };

        Self::from_file(file, twtxt_path, twtxt_flavor)
    }

    /// Validate a parsed config file and combine it with the resolved tool.
    pub fn from_file(
        file: FileConfig,
        twtxt_path: PathBuf,
        twtxt_flavor: CliFlavor,
    ) -> Result<Self> {
        require("BotJid", &file.bot_jid)?;
        require("Password", &file.password)?;
        require("ControlJid", &file.control_jid)?;
        require("Twtxtnick", &file.twtxtnick)?;

        if file.timeline_entries == 0 {
            return Err(Error::Config(
                "TimelineEntries must be greater than zero".to_string(),
            ));
        }
        if file.max_characters == 0 {
            return Err(Error::Config(
                "MaxCharacters must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            address: non_empty(file.address.trim().to_string()),
            bot_jid: file.bot_jid.trim().to_string(),
            password: file.password,
            control_jid: file.control_jid.trim().to_string(),
            twtxt_nick: file.twtxtnick.trim().to_string(),
            timeline_entries: file.timeline_entries,
            max_characters: file.max_characters,
            twtxt_path,
            twtxt_flavor,
        })
    }
}

pub fn read_file_config(path: &Path) -> Result<FileConfig> {
    if !path.is_file() {
        return Err(Error::Config(format!(
            "config file not found: {}",
            path.display()
        )));
    }
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn ensure_config_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    }
    tracing::info!(dir = %dir.display(), "created config directory");
    Ok(())
}

/// Find the twtxt client. `XTB_TWTXT_PATH` wins; otherwise txtnish is preferred.
fn resolve_twtxt_path() -> Result<(PathBuf, CliFlavor)> {
    if let Some(p) = env_path("XTB_TWTXT_PATH") {
        if !is_executable_file(&p) {
            return Err(Error::Config(format!(
                "XTB_TWTXT_PATH is not an executable file: {}",
                p.display()
            )));
        }
        let flavor = CliFlavor::from_program(&p);
        return Ok((p, flavor));
    }

    KNOWN_TOOL_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| is_executable_file(p))
        .or_else(|| which_in_path("txtnish"))
        .or_else(|| which_in_path("twtxt"))
        .map(|p| {
            let flavor = CliFlavor::from_program(&p);
            (p, flavor)
        })
        .ok_or_else(|| Error::Config("neither txtnish nor twtxt was found".to_string()))
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Config(format!("{field} is required in config.json")));
    }
    Ok(())
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn which_in_path(binary: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    for dir in env::split_paths(&path) {
        let candidate = dir.join(binary);
        if is_executable_file(&candidate) {
            return Some(candidate);
        }
    }
    None
}

fn is_executable_file(p: &Path) -> bool {
    if !p.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(md) = fs::metadata(p) {
            return (md.permissions().mode() & 0o111) != 0;
        }
    }
    true
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "Address": "xmpp.example.org:5223",
        "BotJid": "bot@example.org",
        "Password": "secret",
        "ControlJid": "me@example.org",
        "Twtxtnick": "bob",
        "TimelineEntries": 5,
        "MaxCharacters": 280
    }"#;

    fn parse(raw: &str) -> FileConfig {
        serde_json::from_str(raw).unwrap()
    }

    fn build(raw: &str) -> Result<Config> {
        Config::from_file(
            parse(raw),
            PathBuf::from("/usr/local/bin/twtxt"),
            CliFlavor::Twtxt,
        )
    }

    #[test]
    fn parses_goxtxt_field_names() {
        let cfg = build(FULL).unwrap();
        assert_eq!(cfg.address.as_deref(), Some("xmpp.example.org:5223"));
        assert_eq!(cfg.bot_jid, "bot@example.org");
        assert_eq!(cfg.control_jid, "me@example.org");
        assert_eq!(cfg.twtxt_nick, "bob");
        assert_eq!(cfg.timeline_entries, 5);
        assert_eq!(cfg.max_characters, 280);
    }

    #[test]
    fn legacy_fields_are_ignored_and_defaults_apply() {
        let cfg = build(
            r#"{"BotJid":"bot@x","Password":"p","ControlJid":"me@x","Twtxtnick":"me",
                "Twtxtpath":"/usr/bin/twtxt"}"#,
        )
        .unwrap();
        assert_eq!(cfg.address, None);
        assert_eq!(cfg.timeline_entries, DEFAULT_TIMELINE_ENTRIES);
        assert_eq!(cfg.max_characters, DEFAULT_MAX_CHARACTERS);
    }

    #[test]
    fn rejects_missing_control_jid() {
        let err = build(r#"{"BotJid":"bot@x","Password":"p","Twtxtnick":"me"}"#).unwrap_err();
        assert!(err.to_string().contains("ControlJid"), "{err}");
    }

    #[test]
    fn rejects_zero_entries() {
        let err = build(
            r#"{"BotJid":"bot@x","Password":"p","ControlJid":"me@x","Twtxtnick":"me",
                "TimelineEntries":0}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn reads_config_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, FULL).unwrap();

        let file = read_file_config(&path).unwrap();
        assert_eq!(file.bot_jid, "bot@example.org");
        assert_eq!(file.timeline_entries, 5);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_file_config(&dir.path().join("config.json")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn malformed_file_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(read_file_config(&path), Err(Error::Json(_))));
    }

    #[cfg(unix)]
    #[test]
    fn config_dir_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join(".config/goxtxt");
        ensure_config_dir(&dir).unwrap();
        let mode = fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
    }
}
