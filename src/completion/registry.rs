//! Candidate source registry
//!
//! Maps the command being completed to the source that produces its
//! candidates. Lookup never fails: a command without an explicit source
//! degrades to the directory source (for directory-biased commands) or the
//! path source (for everything else).

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::quoting::quote;
use crate::config::{CommandSourceConfig, CompletionConfig};

/// What a source lists, which decides how its output is resolved and reinserted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Files and directories under the resolved directory; space separated
    Path,
    /// Directories under the resolved directory; concatenated with a trailing `/`
    Directory,
    /// Anything else; no filesystem involvement
    #[default]
    Plain,
}

impl SourceKind {
    /// Whether the source is resolved against the filesystem
    pub fn is_path_based(&self) -> bool {
        matches!(self, SourceKind::Path | SourceKind::Directory)
    }
}

/// Built-in candidate producers
///
/// Built-ins run as `fzcomp compgen <kind>` subprocesses so their output
/// streams into the selector like any other command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Producer {
    /// Recursive listing of files and directories
    WalkPaths,
    /// Recursive listing of directories
    WalkDirs,
    /// Host names from ssh configuration and /etc/hosts
    Hosts,
    /// Environment variable names
    EnvVars,
    /// A shell command; `{dir}` is replaced by the quoted directory for
    /// path-based sources, otherwise the directory is appended
    Shell(String),
}

impl Producer {
    /// `compgen` sub-command implementing a built-in producer
    pub fn compgen_kind(&self) -> Option<&'static str> {
        match self {
            Producer::WalkPaths => Some("path"),
            Producer::WalkDirs => Some("dir"),
            Producer::Hosts => Some("hosts"),
            Producer::EnvVars => Some("env"),
            Producer::Shell(_) => None,
        }
    }
}

/// A named provider of completion candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSource {
    /// Identifier used in logs
    pub identifier: String,
    /// Resolution and reinsertion behaviour
    pub kind: SourceKind,
    /// How candidates are produced
    pub producer: Producer,
    /// Flags appended after the global and completion flags
    pub selector_flags: Vec<String>,
    /// Appended to every reinserted candidate
    pub suffix: String,
    /// Fires on a trailing separator without the trigger sequence
    pub unconditional: bool,
    /// Whether path-like fragments still go to this source
    pub accepts_paths: bool,
    /// 1-based whitespace-separated field of the selected line to insert
    pub field: Option<usize>,
}

impl CandidateSource {
    /// Generic path source (files and directories)
    pub fn path() -> Self {
        Self {
            identifier: "path".to_string(),
            kind: SourceKind::Path,
            producer: Producer::WalkPaths,
            selector_flags: vec!["-m".to_string()],
            suffix: String::new(),
            unconditional: false,
            accepts_paths: true,
            field: None,
        }
    }

    /// Generic directory source
    pub fn directory() -> Self {
        Self {
            identifier: "directory".to_string(),
            kind: SourceKind::Directory,
            producer: Producer::WalkDirs,
            selector_flags: vec!["+m".to_string()],
            suffix: "/".to_string(),
            unconditional: false,
            accepts_paths: true,
            field: None,
        }
    }

    /// Running processes; inserts PIDs
    pub fn processes() -> Self {
        Self {
            identifier: "processes".to_string(),
            kind: SourceKind::Plain,
            producer: Producer::Shell("command ps -ef | sed 1d".to_string()),
            selector_flags: vec!["-m".to_string()],
            suffix: String::new(),
            unconditional: true,
            accepts_paths: false,
            field: Some(2),
        }
    }

    /// Known host names
    pub fn hosts() -> Self {
        Self::plain("hosts", Producer::Hosts, "+m")
    }

    /// Environment variable names
    pub fn env_vars() -> Self {
        Self::plain("env", Producer::EnvVars, "-m")
    }

    /// A user-defined source backed by a shell command
    pub fn shell(identifier: impl Into<String>, command: impl Into<String>, kind: SourceKind) -> Self {
        let base = match kind {
            SourceKind::Path => Self::path(),
            SourceKind::Directory => Self::directory(),
            SourceKind::Plain => Self::plain("", Producer::WalkPaths, "-m"),
        };
        Self {
            identifier: identifier.into(),
            producer: Producer::Shell(command.into()),
            ..base
        }
    }

    fn plain(identifier: &str, producer: Producer, multi: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            kind: SourceKind::Plain,
            producer,
            selector_flags: vec![multi.to_string()],
            suffix: String::new(),
            unconditional: false,
            accepts_paths: false,
            field: None,
        }
    }

    /// Replace the selector flags
    pub fn with_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selector_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    /// Text to splice into the buffer for the selected lines.
    ///
    /// Each selection is reduced to its configured field, quoted and given
    /// the source suffix. Directory selections are concatenated so they can
    /// chain as path segments; everything else is space separated. A single
    /// trailing space ends the insertion.
    pub fn render(&self, selection: &[String]) -> String {
        let separator = match self.kind {
            SourceKind::Directory => "",
            _ => " ",
        };

        let items: Vec<String> = selection
            .iter()
            .map(|line| {
                let value = match self.field {
                    Some(n) => line.split_whitespace().nth(n.saturating_sub(1)).unwrap_or(line),
                    None => line.as_str(),
                };
                // producers may already end directories with the suffix
                match value.strip_suffix(self.suffix.as_str()) {
                    Some("") => quote(value),
                    Some(stripped) if !self.suffix.is_empty() => {
                        format!("{}{}", quote(stripped), self.suffix)
                    }
                    _ => format!("{}{}", quote(value), self.suffix),
                }
            })
            .collect();

        format!("{} ", items.join(separator))
    }
}

/// Registry of candidate sources keyed by command name
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    /// Sources registered for specific commands
    by_command: HashMap<String, CandidateSource>,
    /// Commands routed to the directory source
    dir_commands: BTreeSet<String>,
    /// Generic path source
    path: CandidateSource,
    /// Generic directory source
    directory: CandidateSource,
}

impl SourceRegistry {
    /// Create a registry with only the generic sources
    ///
    /// # Arguments
    /// * `dir_commands` - Commands whose completions are directories only
    pub fn new<I, S>(dir_commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            by_command: HashMap::new(),
            dir_commands: dir_commands.into_iter().map(Into::into).collect(),
            path: CandidateSource::path(),
            directory: CandidateSource::directory(),
        }
    }

    /// Create a registry with the built-in command sources
    pub fn with_defaults<I, S>(dir_commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::new(dir_commands);
        registry.register("kill", CandidateSource::processes());
        registry.register("ssh", CandidateSource::hosts());
        registry.register("telnet", CandidateSource::hosts());
        registry.register("export", CandidateSource::env_vars());
        registry.register("unset", CandidateSource::env_vars());
        registry
    }

    /// Build the registry described by the completion configuration
    pub fn from_config(config: &CompletionConfig) -> Self {
        let mut registry = Self::with_defaults(config.dir_commands.iter().cloned());

        if let Some(cmd) = &config.path_command {
            registry.path.producer = Producer::Shell(cmd.clone());
        }
        if let Some(cmd) = &config.dir_command {
            registry.directory.producer = Producer::Shell(cmd.clone());
        }

        for (name, CommandSourceConfig { command, options, kind }) in &config.commands {
            let mut source = CandidateSource::shell(name.clone(), command.clone(), *kind);
            if !options.trim().is_empty() {
                source = source.with_flags(super::token_stream::split_words(options));
            }
            registry.register(name.clone(), source);
        }

        registry
    }

    /// Register `source` for `command`, replacing any previous registration
    pub fn register(&mut self, command: impl Into<String>, source: CandidateSource) {
        self.by_command.insert(command.into(), source);
    }

    /// Find the source for a command.
    ///
    /// 1. a source registered for `command`, unless the fragment looks like a
    ///    path and the source does not accept paths
    /// 2. the directory source for directory-biased commands
    /// 3. the path source
    ///
    /// # Arguments
    /// * `command` - First word of the command being edited
    /// * `fragment_looks_like_path` - Whether the typed fragment is path-like
    pub fn resolve(&self, command: &str, fragment_looks_like_path: bool) -> &CandidateSource {
        if let Some(source) = self.by_command.get(command) {
            if source.accepts_paths || !fragment_looks_like_path {
                return source;
            }
        }

        if self.dir_commands.contains(command) {
            &self.directory
        } else {
            &self.path
        }
    }

    /// The generic path source
    pub fn path_source(&self) -> &CandidateSource {
        &self.path
    }

    /// The generic directory source
    pub fn directory_source(&self) -> &CandidateSource {
        &self.directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SourceRegistry {
        SourceRegistry::with_defaults(["cd", "pushd", "rmdir"])
    }

    #[test]
    fn test_unregistered_commands_get_path_source() {
        let registry = registry();
        for cmd in ["vim", "cat", "", "unknown-cmd", "CD"] {
            assert_eq!(registry.resolve(cmd, false), registry.path_source());
            assert_eq!(registry.resolve(cmd, true), registry.path_source());
        }
    }

    #[test]
    fn test_dir_commands_get_directory_source() {
        let registry = registry();
        assert_eq!(registry.resolve("cd", false).kind, SourceKind::Directory);
        assert_eq!(registry.resolve("pushd", true).kind, SourceKind::Directory);
    }

    #[test]
    fn test_specific_sources_win() {
        let registry = registry();
        assert_eq!(registry.resolve("ssh", false).identifier, "hosts");
        assert_eq!(registry.resolve("kill", false).identifier, "processes");
        assert_eq!(registry.resolve("unset", false).identifier, "env");
    }

    #[test]
    fn test_path_fragments_skip_name_sources() {
        let registry = registry();
        assert_eq!(registry.resolve("ssh", true), registry.path_source());
    }

    #[test]
    fn test_registration_overrides_dir_command() {
        let mut registry = registry();
        registry.register("cd", CandidateSource::shell("zoxide", "zoxide query -l", SourceKind::Directory));
        let source = registry.resolve("cd", false);
        assert_eq!(source.identifier, "zoxide");
        assert_eq!(source.producer, Producer::Shell("zoxide query -l".to_string()));
    }

    #[test]
    fn test_from_config_custom_commands() {
        let mut config = CompletionConfig::default();
        config.path_command = Some("fd --type f . {dir}".to_string());
        config.commands.insert(
            "git".to_string(),
            CommandSourceConfig {
                command: "git branch --format='%(refname:short)'".to_string(),
                options: "+m --prompt 'branch> '".to_string(),
                kind: SourceKind::Plain,
            },
        );

        let registry = SourceRegistry::from_config(&config);
        assert_eq!(
            registry.path_source().producer,
            Producer::Shell("fd --type f . {dir}".to_string())
        );
        let git = registry.resolve("git", false);
        assert_eq!(git.selector_flags, vec!["+m", "--prompt", "branch> "]);
    }

    #[test]
    fn test_render_modes() {
        let selection = vec!["web1".to_string(), "my host".to_string()];
        assert_eq!(CandidateSource::hosts().render(&selection), "web1 my\\ host ");

        let dirs = vec!["project".to_string()];
        assert_eq!(CandidateSource::directory().render(&dirs), "project/ ");

        let chained = vec!["a".to_string(), "b".to_string()];
        assert_eq!(CandidateSource::directory().render(&chained), "a/b/ ");
    }

    #[test]
    fn test_render_keeps_single_suffix() {
        let slashed = vec!["project/".to_string()];
        assert_eq!(CandidateSource::directory().render(&slashed), "project/ ");

        let root = vec!["/".to_string()];
        assert_eq!(CandidateSource::directory().render(&root), "/ ");
    }

    #[test]
    fn test_render_extracts_field() {
        let lines = vec!["root  4242  1  0 10:00 ?  00:00:01 sshd".to_string()];
        assert_eq!(CandidateSource::processes().render(&lines), "4242 ");
    }
}
