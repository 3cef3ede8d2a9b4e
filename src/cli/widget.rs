//! `fzcomp widget`: one widget invocation on behalf of an external shell
//!
//! The shell passes its buffer on the command line and reads the result
//! back from the exit status and stdout. The status codes are the contract
//! with the scripts printed by `fzcomp init`.

use tracing::debug;

use crate::bindings::Widget;
use crate::completion::{
    DispatchOutcome, Dispatcher, EditMode, EditorHost, HistoryEntry, LineBuffer,
};
use crate::error::{FzcompError, Result};

/// Exit status of a widget invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetStatus {
    /// Replace the left buffer with stdout
    Replace = 0,
    /// Leave the buffer alone
    Unchanged = 1,
    /// Run the shell's default completion
    Fallback = 2,
    /// Fetch the history entry whose index is on stdout
    HistoryExpand = 3,
    /// Replace the buffer with stdout and execute it
    Execute = 4,
    /// Configuration error, reported on stderr
    ConfigError = 5,
}

impl WidgetStatus {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Result of a widget invocation: status plus what goes to stdout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetReply {
    pub status: WidgetStatus,
    pub output: Option<String>,
}

impl WidgetReply {
    fn status(status: WidgetStatus) -> Self {
        Self {
            status,
            output: None,
        }
    }

    fn with_output(status: WidgetStatus, output: impl Into<String>) -> Self {
        Self {
            status,
            output: Some(output.into()),
        }
    }
}

/// Editor host standing in for a shell that runs in another process.
///
/// Nothing is done in place; the calls are recorded and turned into a
/// [`WidgetReply`] afterwards.
#[derive(Debug, Default)]
pub struct ScriptHost {
    /// Default completion was requested
    fell_back: bool,
    /// A configuration error was reported
    config_error: bool,
    /// History index to expand
    expanded: Option<usize>,
}

impl EditorHost for ScriptHost {
    fn default_completion(&mut self, _buffer: &mut LineBuffer) -> Result<()> {
        self.fell_back = true;
        Ok(())
    }

    // The shell redraws after reading the reply
    fn redisplay(&mut self) {}

    fn report_error(&mut self, error: &FzcompError) {
        eprintln!("fzcomp: {}", error);
        self.config_error = true;
    }

    fn expand_history(&mut self, index: usize, _buffer: &mut LineBuffer) -> Result<()> {
        self.expanded = Some(index);
        Ok(())
    }
}

/// Run `widget` against the shell's buffer
///
/// # Arguments
/// * `dispatcher` - Configured dispatcher
/// * `widget` - Widget to run
/// * `buffer` - Shell buffer split at the cursor
/// * `mode` - Shell edit mode (history only)
/// * `history` - Shell history (history only)
///
/// # Returns
/// * `Result<WidgetReply>` - Status and output for the shell
pub fn run_widget(
    dispatcher: &Dispatcher,
    widget: Widget,
    mut buffer: LineBuffer,
    mode: EditMode,
    history: &[HistoryEntry],
) -> Result<WidgetReply> {
    let mut host = ScriptHost::default();

    let outcome = match widget {
        Widget::Complete => dispatcher.complete(&mut host, &mut buffer)?,
        Widget::InsertPath => dispatcher.insert_paths(&mut host, &mut buffer)?,
        Widget::ChangeDirectory => dispatcher.change_directory(&mut host, &mut buffer)?,
        Widget::History => dispatcher.history(&mut host, &mut buffer, history, mode)?,
    };
    debug!(widget = %widget, outcome = ?outcome, "Widget finished");

    if host.config_error {
        return Ok(WidgetReply::status(WidgetStatus::ConfigError));
    }

    Ok(match outcome {
        DispatchOutcome::Fallback => WidgetReply::status(WidgetStatus::Fallback),
        DispatchOutcome::Cancelled => WidgetReply::status(WidgetStatus::Unchanged),
        DispatchOutcome::Replaced => WidgetReply::with_output(WidgetStatus::Replace, buffer.left),
        DispatchOutcome::Execute(command) => {
            WidgetReply::with_output(WidgetStatus::Execute, command)
        }
        DispatchOutcome::HistoryExpanded(index) => {
            let index = host.expanded.unwrap_or(index);
            WidgetReply::with_output(WidgetStatus::HistoryExpand, index.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{CandidateSource, PathResolver, SourceKind, SourceRegistry};
    use crate::selector::{CandidateStream, Pipeline, Selector, SelectorInvocation};

    /// Picks the first candidate
    struct First;

    impl Selector for First {
        fn select(&self, input: &mut CandidateStream, _: &SelectorInvocation) -> Result<Vec<String>> {
            Ok(input.read_lines()?.into_iter().take(1).collect())
        }
    }

    fn dispatcher() -> Dispatcher {
        let mut registry = SourceRegistry::with_defaults(["cd"]);
        registry.register(
            "ssh",
            CandidateSource::shell("hosts", "echo web1", SourceKind::Plain),
        );
        registry.register(
            "broken",
            CandidateSource::shell("broken", "fzcomp-no-such-producer-xyz", SourceKind::Plain),
        );
        Dispatcher::new(
            registry,
            Box::new(First),
            Pipeline::new(".").with_shell("sh"),
            PathResolver::new("."),
        )
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(WidgetStatus::Replace.code(), 0);
        assert_eq!(WidgetStatus::Unchanged.code(), 1);
        assert_eq!(WidgetStatus::Fallback.code(), 2);
        assert_eq!(WidgetStatus::HistoryExpand.code(), 3);
        assert_eq!(WidgetStatus::Execute.code(), 4);
        assert_eq!(WidgetStatus::ConfigError.code(), 5);
    }

    #[test]
    fn test_complete_replaces_left_buffer() {
        let reply = run_widget(
            &dispatcher(),
            Widget::Complete,
            LineBuffer::new("ssh **", " -v"),
            EditMode::Emacs,
            &[],
        )
        .unwrap();
        assert_eq!(reply, WidgetReply::with_output(WidgetStatus::Replace, "ssh web1 "));
    }

    #[test]
    fn test_complete_without_trigger_falls_back() {
        let reply = run_widget(
            &dispatcher(),
            Widget::Complete,
            LineBuffer::new("ssh we", ""),
            EditMode::Emacs,
            &[],
        )
        .unwrap();
        assert_eq!(reply.status, WidgetStatus::Fallback);
        assert_eq!(reply.output, None);
    }

    #[test]
    fn test_missing_producer_is_config_error() {
        let reply = run_widget(
            &dispatcher(),
            Widget::Complete,
            LineBuffer::new("broken **", ""),
            EditMode::Emacs,
            &[],
        )
        .unwrap();
        assert_eq!(reply.status, WidgetStatus::ConfigError);
    }

    #[test]
    fn test_history_expands_index() {
        let history = vec![HistoryEntry::new(4, "make"), HistoryEntry::new(5, "make test")];
        let reply = run_widget(
            &dispatcher(),
            Widget::History,
            LineBuffer::new("", ""),
            EditMode::Emacs,
            &history,
        )
        .unwrap();
        assert_eq!(reply, WidgetReply::with_output(WidgetStatus::HistoryExpand, "5"));
    }

    #[test]
    fn test_history_vi_mode_replaces_buffer() {
        let history = vec![HistoryEntry::new(4, "make")];
        let reply = run_widget(
            &dispatcher(),
            Widget::History,
            LineBuffer::new("ma", "x"),
            EditMode::Vi,
            &history,
        )
        .unwrap();
        assert_eq!(reply, WidgetReply::with_output(WidgetStatus::Replace, "make"));
    }

    #[test]
    fn test_empty_history_is_unchanged() {
        let reply = run_widget(
            &dispatcher(),
            Widget::History,
            LineBuffer::new("", ""),
            EditMode::Emacs,
            &[],
        )
        .unwrap();
        assert_eq!(reply.status, WidgetStatus::Unchanged);
    }
}
