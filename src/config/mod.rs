//! Configuration management for fzcomp
//!
//! This module handles loading, parsing, and managing configuration from various sources:
//! - Configuration files (TOML format)
//! - Environment variables (`FZCOMP_*`)
//! - Command-line arguments
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::bindings::KeyChord;
use crate::completion::history::EditMode;
use crate::completion::registry::SourceKind;
use crate::error::{ConfigError, Result};
use crate::selector::Height;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Selector configuration
    #[serde(default)]
    pub selector: SelectorConfig,

    /// Completion trigger and candidate sources
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Per-widget producers and flags
    #[serde(default)]
    pub widgets: WidgetConfig,

    /// Key chords per widget
    #[serde(default)]
    pub keybindings: KeyBindingConfig,

    /// Built-in line editor
    #[serde(default)]
    pub shell: ShellConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Selector invocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Selector executable
    #[serde(default = "default_selector_binary")]
    pub binary: String,

    /// Run in a tmux split when inside tmux
    #[serde(default)]
    pub tmux: bool,

    /// Split or inline height (`N` lines or `N%`)
    #[serde(default = "default_tmux_height")]
    pub tmux_height: String,

    /// Flags passed to every invocation
    #[serde(default)]
    pub default_options: String,
}

/// Completion trigger and candidate sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Marker that ends the token being completed; may be empty
    #[serde(default = "default_trigger")]
    pub trigger: String,

    /// Flags appended to every completion invocation
    #[serde(default)]
    pub options: String,

    /// Commands completed with directories only
    #[serde(default = "default_dir_commands")]
    pub dir_commands: Vec<String>,

    /// Producer for the generic path source (`{dir}` is substituted)
    #[serde(default)]
    pub path_command: Option<String>,

    /// Producer for the generic directory source (`{dir}` is substituted)
    #[serde(default)]
    pub dir_command: Option<String>,

    /// Custom sources keyed by command name
    #[serde(default)]
    pub commands: BTreeMap<String, CommandSourceConfig>,
}

/// A user-defined candidate source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSourceConfig {
    /// Shell command writing candidates to stdout
    pub command: String,

    /// Selector flags for this source
    #[serde(default)]
    pub options: String,

    /// Insert mode
    #[serde(default)]
    pub kind: SourceKind,
}

/// Producers and flags of the non-completion widgets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Producer for the insert-path widget
    #[serde(default)]
    pub file_command: Option<String>,

    /// Flags for the insert-path widget
    #[serde(default)]
    pub file_options: String,

    /// Producer for the change-directory widget
    #[serde(default)]
    pub cd_command: Option<String>,

    /// Flags for the change-directory widget
    #[serde(default)]
    pub cd_options: String,

    /// Flags for the history widget
    #[serde(default)]
    pub history_options: String,
}

/// Key chords per widget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindingConfig {
    #[serde(default = "default_complete_key")]
    pub complete: String,

    #[serde(default = "default_insert_path_key")]
    pub insert_path: String,

    #[serde(default = "default_change_directory_key")]
    pub change_directory: String,

    #[serde(default = "default_history_key")]
    pub history: String,
}

/// Built-in line editor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Edit mode (emacs, vi)
    #[serde(default)]
    pub edit_mode: EditMode,

    /// Path to history file
    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,

    /// Maximum number of history entries
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_selector_binary() -> String {
    "sk".to_string()
}

fn default_tmux_height() -> String {
    "40%".to_string()
}

fn default_trigger() -> String {
    "**".to_string()
}

fn default_dir_commands() -> Vec<String> {
    ["cd", "pushd", "rmdir"].iter().map(|s| s.to_string()).collect()
}

fn default_complete_key() -> String {
    "tab".to_string()
}

fn default_insert_path_key() -> String {
    "ctrl-t".to_string()
}

fn default_change_directory_key() -> String {
    "alt-c".to_string()
}

fn default_history_key() -> String {
    "ctrl-r".to_string()
}

fn default_history_file() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fzcomp")
        .join("history.txt")
}

fn default_history_size() -> usize {
    1000
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

fn default_log_timestamps() -> bool {
    false
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            binary: default_selector_binary(),
            tmux: false,
            tmux_height: default_tmux_height(),
            default_options: String::new(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            trigger: default_trigger(),
            options: String::new(),
            dir_commands: default_dir_commands(),
            path_command: None,
            dir_command: None,
            commands: BTreeMap::new(),
        }
    }
}

impl Default for KeyBindingConfig {
    fn default() -> Self {
        Self {
            complete: default_complete_key(),
            insert_path: default_insert_path_key(),
            change_directory: default_change_directory_key(),
            history: default_history_key(),
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            edit_mode: EditMode::default(),
            history_file: default_history_file(),
            history_size: default_history_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

/// Descriptions printed above each section by `to_toml_with_comments`
const SECTION_COMMENTS: &[(&str, &str)] = &[
    ("[selector]", "Fuzzy selector executable and global flags"),
    ("[completion]", "Completion trigger and candidate sources"),
    ("[widgets]", "Producers and flags of the insert-path, change-directory and history widgets"),
    ("[keybindings]", "Key chords (ctrl-<c>, alt-<c>, tab)"),
    ("[shell]", "Built-in line editor (fzcomp shell)"),
    ("[logging]", "Log level (error, warn, info, debug, trace) and timestamps"),
];

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the default configuration file path
    ///
    /// # Returns
    /// * `PathBuf` - `<config dir>/fzcomp/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fzcomp")
            .join("config.toml")
    }

    /// Load configuration from a file
    ///
    /// A missing default file yields the default configuration; a missing
    /// file that was asked for explicitly is an error.
    ///
    /// # Arguments
    /// * `path` - Explicit path, or `None` for the default location
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_config_path(), false),
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigError::FileNotFound(path.display().to_string()).into());
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `FZCOMP_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides read through `lookup`
    ///
    /// # Arguments
    /// * `lookup` - Returns the value of a variable, if set
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("FZCOMP_SELECTOR") {
            self.selector.binary = v;
        }
        if let Some(v) = lookup("FZCOMP_TMUX") {
            self.selector.tmux = parse_flag("FZCOMP_TMUX", &v)?;
        }
        if let Some(v) = lookup("FZCOMP_TMUX_HEIGHT") {
            self.selector.tmux_height = v;
        }
        if let Some(v) = lookup("FZCOMP_DEFAULT_OPTS") {
            self.selector.default_options = v;
        }

        // an empty trigger is meaningful, so presence alone decides
        if let Some(v) = lookup("FZCOMP_COMPLETION_TRIGGER") {
            self.completion.trigger = v;
        }
        if let Some(v) = lookup("FZCOMP_COMPLETION_OPTS") {
            self.completion.options = v;
        }
        if let Some(v) = lookup("FZCOMP_COMPLETION_DIR_COMMANDS") {
            self.completion.dir_commands = v.split_whitespace().map(str::to_string).collect();
        }

        if let Some(v) = lookup("FZCOMP_CTRL_T_COMMAND") {
            self.widgets.file_command = Some(v).filter(|c| !c.trim().is_empty());
        }
        if let Some(v) = lookup("FZCOMP_CTRL_T_OPTS") {
            self.widgets.file_options = v;
        }
        if let Some(v) = lookup("FZCOMP_ALT_C_COMMAND") {
            self.widgets.cd_command = Some(v).filter(|c| !c.trim().is_empty());
        }
        if let Some(v) = lookup("FZCOMP_ALT_C_OPTS") {
            self.widgets.cd_options = v;
        }
        if let Some(v) = lookup("FZCOMP_CTRL_R_OPTS") {
            self.widgets.history_options = v;
        }

        Ok(())
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        if self.selector.binary.trim().is_empty() {
            return Err(invalid("selector.binary", &self.selector.binary));
        }

        self.selector.tmux_height.parse::<Height>()?;

        if self.completion.trigger.chars().any(char::is_whitespace) {
            return Err(invalid("completion.trigger", &self.completion.trigger));
        }

        for (name, source) in &self.completion.commands {
            if source.command.trim().is_empty() {
                return Err(invalid(&format!("completion.commands.{name}.command"), ""));
            }
        }

        let keys = [
            ("keybindings.complete", &self.keybindings.complete),
            ("keybindings.insert_path", &self.keybindings.insert_path),
            ("keybindings.change_directory", &self.keybindings.change_directory),
            ("keybindings.history", &self.keybindings.history),
        ];
        for (field, chord) in keys {
            chord
                .parse::<KeyChord>()
                .map_err(|_| invalid(field, chord))?;
        }

        if self.shell.history_size == 0 {
            return Err(invalid("shell.history_size", "0"));
        }

        Ok(())
    }

    /// Serialize the configuration as TOML with a comment above each section
    pub fn to_toml_with_comments(&self) -> Result<String> {
        let body = toml::to_string_pretty(self)?;

        let mut out = String::from("# fzcomp configuration\n");
        out.push_str(&format!("# Location: {}\n\n", Self::default_config_path().display()));
        for line in body.lines() {
            if let Some((_, comment)) = SECTION_COMMENTS.iter().find(|(header, _)| *header == line) {
                out.push_str("# ");
                out.push_str(comment);
                out.push('\n');
            }
            out.push_str(line);
            out.push('\n');
        }
        Ok(out)
    }
}

fn invalid(field: &str, value: &str) -> crate::error::FzcompError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

fn parse_flag(field: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(field, value)),
    }
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.selector.binary, "sk");
        assert_eq!(config.selector.tmux_height, "40%");
        assert_eq!(config.completion.trigger, "**");
        assert_eq!(config.completion.dir_commands, vec!["cd", "pushd", "rmdir"]);
        assert_eq!(config.keybindings.history, "ctrl-r");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [selector]
            binary = "fzf"

            [completion.commands.git]
            command = "git branch --format='%(refname:short)'"
            options = "+m"
            "#,
        )
        .unwrap();

        assert_eq!(config.selector.binary, "fzf");
        assert_eq!(config.selector.tmux_height, "40%");
        assert_eq!(config.completion.trigger, "**");
        assert_eq!(config.completion.commands["git"].kind, SourceKind::Plain);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml("selector = [").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Config::load_from_file(Some(Path::new("/nonexistent/fzcomp.toml"))).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[completion]\ntrigger = \"~~\"\n").unwrap();

        let config = Config::load_from_file(Some(&path)).unwrap();
        assert_eq!(config.completion.trigger, "~~");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env_with(env(&[
                ("FZCOMP_SELECTOR", "fzf"),
                ("FZCOMP_TMUX", "1"),
                ("FZCOMP_TMUX_HEIGHT", "20"),
                ("FZCOMP_COMPLETION_TRIGGER", ""),
                ("FZCOMP_COMPLETION_DIR_COMMANDS", "cd z"),
                ("FZCOMP_CTRL_T_COMMAND", "fd --type f"),
                ("FZCOMP_ALT_C_COMMAND", " "),
            ]))
            .unwrap();

        assert_eq!(config.selector.binary, "fzf");
        assert!(config.selector.tmux);
        assert_eq!(config.selector.tmux_height, "20");
        assert_eq!(config.completion.trigger, "");
        assert_eq!(config.completion.dir_commands, vec!["cd", "z"]);
        assert_eq!(config.widgets.file_command.as_deref(), Some("fd --type f"));
        assert_eq!(config.widgets.cd_command, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_bad_flag() {
        let mut config = Config::default();
        let err = config
            .apply_env_with(env(&[("FZCOMP_TMUX", "maybe")]))
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.completion.trigger = "* *".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.selector.tmux_height = "tall".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.selector.binary = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.keybindings.complete = "hyper-q".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_with_comments_round_trips() {
        let mut config = Config::default();
        config.completion.commands.insert(
            "git".to_string(),
            CommandSourceConfig {
                command: "git branch".to_string(),
                options: String::new(),
                kind: SourceKind::Plain,
            },
        );

        let text = config.to_toml_with_comments().unwrap();
        assert!(text.contains("# Completion trigger and candidate sources\n[completion]"));

        let parsed = Config::from_toml(&text).unwrap();
        assert_eq!(parsed.completion.trigger, "**");
        assert_eq!(parsed.completion.commands["git"].command, "git branch");
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LogLevel::Debug.to_tracing_level(), tracing::Level::DEBUG);
        assert_eq!(LogLevel::Warn.to_tracing_level(), tracing::Level::WARN);
    }
}
