use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::clipboard::ClipboardBackend;

pub const DEFAULT_CONFIG_DIR: &str = "~/.kube/configs";
pub const DEFAULT_HEIGHT: &str = "40%";
pub const DEFAULT_SHELL: &str = "/bin/sh";
pub const DEFAULT_SESSION_TYPE: &str = "x11";
pub const SYMLINK_PATH: &str = "~/.kube/config";

const DIR_ENV: &str = "KCNF_DIR";
const HEIGHT_ENV: &str = "KCNF_HEIGHT";
const LEGACY_HEIGHT_ENV: &str = "KCNF_DIR_HEIGHT";
const QUIET_ENV: &str = "KCNF_NO_VERBOSE";
const PRINT_ENV: &str = "KCNF_NO_SHELL";
const CLIPBOARD_ENV: &str = "KCNF_COPY_CLIP";
const SYMLINK_ENV: &str = "KCNF_SYMLINK";
const HOME_ENV: &str = "HOME";
const SHELL_ENV: &str = "SHELL";
const SESSION_TYPE_ENV: &str = "XDG_SESSION_TYPE";
const PATH_ENV: &str = "PATH";

/// What happens with the selected kubeconfig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Launch `$SHELL` with `KUBECONFIG` pointing at the selection.
    #[default]
    Subshell,
    /// Print `export KUBECONFIG='...'` to stdout.
    Print,
    /// Copy `export KUBECONFIG='...'` to the clipboard.
    Clipboard,
    /// Point `~/.kube/config` at the selection.
    Symlink,
}

/// Values given explicitly on the command line. They win over the
/// environment, which wins over the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub dir: Option<String>,
    pub height: Option<String>,
    pub quiet: bool,
    pub mode: Option<OutputMode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub config_dir: PathBuf,
    pub height: String,
    pub mode: OutputMode,
    pub quiet: bool,
    pub shell: String,
    pub symlink_path: PathBuf,
    pub clipboard: ClipboardBackend,
    pub bat_available: bool,
}

impl RunOptions {
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        Self::from_pairs(std::env::vars(), overrides)
    }

    pub fn from_pairs<I, K, V>(pairs: I, overrides: Overrides) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let env_map: HashMap<String, String> = pairs
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        let lookup = |key: &str| {
            env_map
                .get(key)
                .map(String::as_str)
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let home = lookup(HOME_ENV).ok_or(ConfigError::MissingHome)?;

        let dir = overrides
            .dir
            .as_deref()
            .or_else(|| lookup(DIR_ENV))
            .unwrap_or(DEFAULT_CONFIG_DIR);
        let height = overrides
            .height
            .clone()
            .or_else(|| lookup(HEIGHT_ENV).map(str::to_string))
            .or_else(|| lookup(LEGACY_HEIGHT_ENV).map(str::to_string))
            .unwrap_or_else(|| DEFAULT_HEIGHT.to_string());

        let quiet = overrides.quiet || parse_bool(lookup(QUIET_ENV), QUIET_ENV)?.unwrap_or(false);
        let mode = match overrides.mode {
            Some(mode) => mode,
            None => mode_from_env(&lookup)?,
        };

        let session_type = lookup(SESSION_TYPE_ENV).unwrap_or(DEFAULT_SESSION_TYPE);
        let bat_available = lookup(PATH_ENV)
            .and_then(|path| find_executable("bat", path))
            .is_some();

        Ok(Self {
            config_dir: PathBuf::from(expand_home(dir, home)),
            height,
            mode,
            quiet,
            shell: lookup(SHELL_ENV).unwrap_or(DEFAULT_SHELL).to_string(),
            symlink_path: PathBuf::from(expand_home(SYMLINK_PATH, home)),
            clipboard: ClipboardBackend::detect(std::env::consts::OS, session_type),
            bat_available,
        })
    }
}

fn mode_from_env<'a>(
    lookup: &impl Fn(&str) -> Option<&'a str>,
) -> Result<OutputMode, ConfigError> {
    let mut enabled = Vec::new();
    for (key, mode) in [
        (PRINT_ENV, OutputMode::Print),
        (CLIPBOARD_ENV, OutputMode::Clipboard),
        (SYMLINK_ENV, OutputMode::Symlink),
    ] {
        if parse_bool(lookup(key), key)?.unwrap_or(false) {
            enabled.push((key, mode));
        }
    }

    match enabled.as_slice() {
        [] => Ok(OutputMode::Subshell),
        [(_, mode)] => Ok(*mode),
        _ => Err(ConfigError::ConflictingModes(
            enabled.iter().map(|(key, _)| *key).collect::<Vec<_>>().join(", "),
        )),
    }
}

fn parse_bool(raw: Option<&str>, field: &'static str) -> Result<Option<bool>, ConfigError> {
    let Some(value) = raw else {
        return Ok(None);
    };

    match value.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "f" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidBool {
            field,
            value: value.to_string(),
        }),
    }
}

/// Expands a leading `~` and any `$HOME` in `raw`.
pub fn expand_home(raw: &str, home: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let mut expanded = trimmed.replace("$HOME", home);

    if expanded == "~" {
        expanded = home.to_string();
    } else if let Some(rest) = expanded.strip_prefix("~/") {
        expanded = format!("{}/{rest}", home.trim_end_matches('/'));
    }

    expanded
}

/// Looks `name` up in a `PATH`-style list of directories.
pub fn find_executable(name: &str, path_var: &str) -> Option<PathBuf> {
    let cwd = std::env::current_dir().unwrap_or_default();
    which::which_in(name, Some(path_var), cwd).ok()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{HOME_ENV} is not set; cannot resolve kubeconfig paths")]
    MissingHome,
    #[error("invalid {field}: {value} (expected true/false)")]
    InvalidBool { field: &'static str, value: String },
    #[error("only one output mode can be enabled, got {0}")]
    ConflictingModes(String),
}
