//! Interactive selector integration
//!
//! The selector is an external fuzzy finder (`sk` by default) that reads
//! candidate lines on stdin and prints the chosen lines on stdout. This module
//! builds its command line, feeds it a [`CandidateStream`] and collects the
//! selection.

pub mod options;
pub mod pipeline;

use std::io;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::config::SelectorConfig;
use crate::error::{ConfigError, FzcompError, Result, SelectorError};

pub use options::{Flag, FlagSet, Height};
pub use pipeline::{CandidateStream, Pipeline};

/// Per-request selector arguments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorInvocation {
    /// Layered flags for this request
    pub flags: FlagSet,
    /// Initial query, if any
    pub query: Option<String>,
}

impl SelectorInvocation {
    /// Create an invocation from flags and an optional query
    pub fn new(flags: FlagSet, query: Option<String>) -> Self {
        Self {
            flags,
            query: query.filter(|q| !q.is_empty()),
        }
    }
}

/// Something that lets the user pick lines from a candidate stream
pub trait Selector {
    /// Run the selection.
    ///
    /// # Arguments
    /// * `input` - Candidate lines
    /// * `invocation` - Flags and initial query
    ///
    /// # Returns
    /// * `Result<Vec<String>>` - Selected lines; empty when the user cancelled
    fn select(
        &self,
        input: &mut CandidateStream,
        invocation: &SelectorInvocation,
    ) -> Result<Vec<String>>;
}

/// Runs an external selector executable
#[derive(Debug, Clone)]
pub struct ProcessSelector {
    /// Selector executable
    binary: String,
    /// Window height
    height: Height,
    /// Whether to prefer the tmux pane wrapper
    tmux: bool,
    /// Whether we are running inside tmux
    in_tmux: bool,
    /// Global default flags
    default_options: FlagSet,
}

impl ProcessSelector {
    /// Create a selector for `binary`
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            height: Height::default(),
            tmux: false,
            in_tmux: false,
            default_options: FlagSet::new(),
        }
    }

    /// Build the selector from configuration
    pub fn from_config(config: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            binary: config.binary.clone(),
            height: config.tmux_height.parse()?,
            tmux: config.tmux,
            in_tmux: std::env::var_os("TMUX").is_some_and(|v| !v.is_empty()),
            default_options: FlagSet::parse(&config.default_options),
        })
    }

    /// Override tmux detection
    pub fn with_tmux(mut self, tmux: bool, in_tmux: bool) -> Self {
        self.tmux = tmux;
        self.in_tmux = in_tmux;
        self
    }

    /// Set the window height
    pub fn with_height(mut self, height: Height) -> Self {
        self.height = height;
        self
    }

    /// Set the global default flags
    pub fn with_default_options(mut self, options: FlagSet) -> Self {
        self.default_options = options;
        self
    }

    /// Program and arguments for an invocation.
    ///
    /// Base flags come first, then the default options, then the invocation's
    /// own flags and finally the query.
    pub fn command_line(&self, invocation: &SelectorInvocation) -> (String, Vec<String>) {
        let (program, mut args) = if self.tmux && self.in_tmux {
            (
                format!("{}-tmux", self.binary),
                vec![format!("-d{}", self.height), "--".to_string()],
            )
        } else {
            (self.binary.clone(), Vec::new())
        };

        let mut flags = if self.tmux && self.in_tmux {
            FlagSet::new()
        } else {
            FlagSet::from_words(["--height".to_string(), self.height.to_string()])
                .merged(&FlagSet::from_words(["--reverse"]))
        };
        flags.merge(&self.default_options);
        flags.merge(&invocation.flags);
        if let Some(query) = &invocation.query {
            flags.push(Flag::new(["--query", query.as_str()]));
        }

        args.extend(flags.to_args());
        (program, args)
    }
}

impl Selector for ProcessSelector {
    fn select(
        &self,
        input: &mut CandidateStream,
        invocation: &SelectorInvocation,
    ) -> Result<Vec<String>> {
        let (program, args) = self.command_line(invocation);
        debug!(program = %program, ?args, "Launching selector");

        let child = Command::new(&program)
            .args(&args)
            .stdin(input.stdin()?)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => {
                    FzcompError::from(ConfigError::SelectorNotFound(program.clone()))
                }
                _ => SelectorError::SpawnFailed(format!("{program}: {e}")).into(),
            })?;

        let output = child
            .wait_with_output()
            .map_err(|e| SelectorError::OutputUnreadable(e.to_string()))?;

        if !output.status.success() {
            debug!(status = ?output.status.code(), "Selector returned no selection");
            return Ok(Vec::new());
        }

        Ok(parse_selection(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Split selector output into selected lines
pub fn parse_selection(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_layers() {
        let selector = ProcessSelector::new("sk")
            .with_height(Height::Percent(40))
            .with_default_options(FlagSet::parse("--height 60% --ansi"));
        let invocation = SelectorInvocation::new(FlagSet::parse("+m"), Some("src".to_string()));

        let (program, args) = selector.command_line(&invocation);
        assert_eq!(program, "sk");
        assert_eq!(
            args,
            vec!["--reverse", "--height", "60%", "--ansi", "+m", "--query", "src"]
        );
    }

    #[test]
    fn test_command_line_tmux() {
        let selector = ProcessSelector::new("fzf")
            .with_height(Height::Lines(20))
            .with_tmux(true, true);
        let (program, args) = selector.command_line(&SelectorInvocation::default());
        assert_eq!(program, "fzf-tmux");
        assert_eq!(args, vec!["-d20", "--"]);
    }

    #[test]
    fn test_tmux_ignored_outside_tmux() {
        let selector = ProcessSelector::new("sk").with_tmux(true, false);
        let (program, _) = selector.command_line(&SelectorInvocation::default());
        assert_eq!(program, "sk");
    }

    #[test]
    fn test_empty_query_is_dropped() {
        let invocation = SelectorInvocation::new(FlagSet::new(), Some(String::new()));
        assert_eq!(invocation.query, None);
    }

    #[test]
    fn test_missing_selector_is_config_error() {
        let selector = ProcessSelector::new("fzcomp-no-such-selector-xyz");
        let mut input = CandidateStream::Empty;
        let err = selector
            .select(&mut input, &SelectorInvocation::default())
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("a\r\nb c\n\n"), vec!["a", "b c"]);
        assert!(parse_selection("").is_empty());
    }
}
