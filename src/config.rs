use std::str::FromStr;
use thiserror::Error;

const PROMPT_VAR: &str = "CONSOLE_PROMPT";
const HISTORY_SIZE_VAR: &str = "CONSOLE_HISTORY_SIZE";
const EDIT_MODE_VAR: &str = "CONSOLE_EDIT_MODE";
const REPEAT_VAR: &str = "CONSOLE_REPEAT_ON_EMPTY";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown edit mode '{0}', expected 'emacs' or 'vi'")]
    EditMode(String),
    #[error("{name}: invalid value '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

/// Key bindings of the interactive line editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditMode {
    #[default]
    Emacs,
    Vi,
}

impl FromStr for EditMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "emacs" => Ok(EditMode::Emacs),
            "vi" | "vim" => Ok(EditMode::Vi),
            _ => Err(ConfigError::EditMode(s.to_string())),
        }
    }
}

/// Settings of a [`Shell`](crate::shell::Shell).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// Prompt of the root console.
    pub prompt: String,
    /// Whether empty input repeats the last command of the root console.
    pub repeat_on_empty: bool,
    /// Number of lines kept in the in-memory history.
    pub history_size: usize,
    pub edit_mode: EditMode,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            repeat_on_empty: true,
            history_size: 1000,
            edit_mode: EditMode::Emacs,
        }
    }
}

impl ShellConfig {
    /// Reads the settings from the process environment.
    pub fn from_process_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Reads the settings through `lookup`. Unset variables keep their
    /// default, invalid ones are reported and ignored.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(prompt) = lookup(PROMPT_VAR) {
            config.prompt = prompt;
        }
        if let Some(value) = lookup(HISTORY_SIZE_VAR) {
            match parse_number(HISTORY_SIZE_VAR, &value) {
                Ok(size) => config.history_size = size,
                Err(e) => log::warn!("{}", e),
            }
        }
        if let Some(value) = lookup(EDIT_MODE_VAR) {
            match value.parse() {
                Ok(mode) => config.edit_mode = mode,
                Err(e) => log::warn!("{}", e),
            }
        }
        if let Some(value) = lookup(REPEAT_VAR) {
            match parse_flag(REPEAT_VAR, &value) {
                Ok(flag) => config.repeat_on_empty = flag,
                Err(e) => log::warn!("{}", e),
            }
        }
        config
    }
}

fn parse_number(name: &'static str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
    })
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        }),
    }
}
