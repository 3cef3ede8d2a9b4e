//! History query widget
//!
//! Lists history entries newest first as `<index>\t<text>`, lets the user pick
//! one in the selector and turns the pick back into an action: re-fetch the
//! entry by index through the host's own history mechanism (emacs mode) or
//! insert the raw text (vi mode).

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::selector::{FlagSet, Pipeline, Selector, SelectorInvocation};

/// Selector flags every history search starts from
const HISTORY_FLAGS: &str = "--tiebreak=index -n2..,.. --no-multi";

/// A history entry as reported by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Host history index
    pub index: usize,
    /// Command text, possibly spanning several lines
    pub text: String,
}

impl HistoryEntry {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

/// Line editor mode of the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    #[default]
    Emacs,
    Vi,
}

/// What the host should do after a history search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryOutcome {
    /// Fetch the entry at this index through the host's history expansion
    ExpandAt(usize),
    /// Replace the buffer with this text
    Insert(String),
    /// The user cancelled
    Cancelled,
}

/// History search widget
#[derive(Debug, Clone)]
pub struct HistoryWidget {
    /// Configured history flags, layered on top of the built-in ones
    options: FlagSet,
    /// Host edit mode
    mode: EditMode,
}

impl HistoryWidget {
    pub fn new(options: FlagSet, mode: EditMode) -> Self {
        Self { options, mode }
    }

    /// Selector line for an entry; embedded newlines are shown as `\n`
    pub fn format_line(entry: &HistoryEntry) -> String {
        format!("{}\t{}", entry.index, entry.text.replace('\n', "\\n"))
    }

    /// Index of a selected line.
    ///
    /// Accepts leading blanks and the `*` that `fc` appends to modified
    /// entries.
    pub fn parse_index(line: &str) -> Option<usize> {
        let field = line.trim_start().split(char::is_whitespace).next()?;
        field.strip_suffix('*').unwrap_or(field).parse().ok()
    }

    /// Entries ordered newest first
    pub fn ordered(entries: &[HistoryEntry]) -> Vec<&HistoryEntry> {
        let mut ordered: Vec<&HistoryEntry> = entries.iter().collect();
        ordered.sort_by(|a, b| b.index.cmp(&a.index));
        ordered
    }

    /// Parse `fc -l` style output (`  <index>[*]  <text>`).
    ///
    /// Lines that do not start with an index continue the previous entry.
    pub fn parse_listing(listing: &str) -> Vec<HistoryEntry> {
        let mut entries: Vec<HistoryEntry> = Vec::new();

        for line in listing.lines() {
            let line = line.trim_end_matches('\r');
            let trimmed = line.trim_start();
            let head = trimmed.split(char::is_whitespace).next().unwrap_or("");

            match Self::parse_index(head) {
                Some(index) if !head.is_empty() => {
                    let text = trimmed[head.len()..].trim_start();
                    entries.push(HistoryEntry::new(index, text));
                }
                _ => match entries.last_mut() {
                    Some(last) => {
                        last.text.push('\n');
                        last.text.push_str(line);
                    }
                    None => debug!(line, "Skipping history line without index"),
                },
            }
        }

        entries
    }

    /// Selector flags for a search
    pub fn flags(&self) -> FlagSet {
        FlagSet::parse(HISTORY_FLAGS).merged(&self.options)
    }

    /// Run a history search.
    ///
    /// The entries are handed to the selector through a temporary file that
    /// is removed when this function returns.
    ///
    /// # Arguments
    /// * `entries` - Host history
    /// * `query` - Current left buffer, used as the initial query
    /// * `pipeline` - Provides the temporary channel
    /// * `selector` - Runs the selection
    pub fn run(
        &self,
        entries: &[HistoryEntry],
        query: &str,
        pipeline: &Pipeline,
        selector: &dyn Selector,
    ) -> Result<HistoryOutcome> {
        let lines: Vec<String> = Self::ordered(entries)
            .into_iter()
            .map(Self::format_line)
            .collect();
        debug!(entries = lines.len(), mode = ?self.mode, "Starting history search");

        let mut stream = pipeline.channel(&lines)?;
        let invocation = SelectorInvocation::new(self.flags(), Some(query.to_string()));
        let selection = selector.select(&mut stream, &invocation)?;

        let Some(line) = selection.first() else {
            return Ok(HistoryOutcome::Cancelled);
        };
        let Some(index) = Self::parse_index(line) else {
            warn!(line = %line, "Selected history line has no index");
            return Ok(HistoryOutcome::Cancelled);
        };

        Ok(match self.mode {
            EditMode::Emacs => HistoryOutcome::ExpandAt(index),
            EditMode::Vi => entries
                .iter()
                .find(|e| e.index == index)
                .map(|e| HistoryOutcome::Insert(e.text.clone()))
                .unwrap_or(HistoryOutcome::Cancelled),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::CandidateStream;
    use std::cell::RefCell;

    /// Picks the first line whose text part contains the query
    #[derive(Default)]
    struct FirstMatch {
        seen: RefCell<Vec<String>>,
        flags: RefCell<Vec<String>>,
    }

    impl Selector for FirstMatch {
        fn select(
            &self,
            input: &mut CandidateStream,
            invocation: &SelectorInvocation,
        ) -> Result<Vec<String>> {
            let lines = input.read_lines()?;
            *self.seen.borrow_mut() = lines.clone();
            *self.flags.borrow_mut() = invocation.flags.to_args();
            let query = invocation.query.clone().unwrap_or_default();
            Ok(lines
                .into_iter()
                .find(|l| l.split_once('\t').is_some_and(|(_, t)| t.contains(&query)))
                .into_iter()
                .collect())
        }
    }

    struct Cancel;

    impl Selector for Cancel {
        fn select(&self, _: &mut CandidateStream, _: &SelectorInvocation) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn history() -> Vec<HistoryEntry> {
        vec![
            HistoryEntry::new(7, "git status"),
            HistoryEntry::new(8, "ls"),
            HistoryEntry::new(9, "git status"),
        ]
    }

    #[test]
    fn test_format_and_parse_index() {
        let entry = HistoryEntry::new(42, "for f in *\ndo echo $f\ndone");
        let line = HistoryWidget::format_line(&entry);
        assert_eq!(line, "42\tfor f in *\\ndo echo $f\\ndone");
        assert_eq!(HistoryWidget::parse_index(&line), Some(42));
        assert_eq!(HistoryWidget::parse_index("  17*  vim x"), Some(17));
        assert_eq!(HistoryWidget::parse_index("vim"), None);
        assert_eq!(HistoryWidget::parse_index(""), None);
    }

    #[test]
    fn test_parse_listing() {
        let listing = "  12  ls -la\n  11* cat <<EOF\nhello\nEOF\n  10  cd /tmp\n";
        let entries = HistoryWidget::parse_listing(listing);
        assert_eq!(
            entries,
            vec![
                HistoryEntry::new(12, "ls -la"),
                HistoryEntry::new(11, "cat <<EOF\nhello\nEOF"),
                HistoryEntry::new(10, "cd /tmp"),
            ]
        );
    }

    #[test]
    fn test_tie_break_prefers_newest() {
        let widget = HistoryWidget::new(FlagSet::new(), EditMode::Emacs);
        let selector = FirstMatch::default();
        let outcome = widget
            .run(&history(), "git st", &Pipeline::new("."), &selector)
            .unwrap();

        assert_eq!(outcome, HistoryOutcome::ExpandAt(9));
        assert_eq!(selector.seen.borrow()[0], "9\tgit status");
        assert_eq!(
            *selector.flags.borrow(),
            vec!["--tiebreak=index", "-n2..,..", "--no-multi"]
        );
    }

    #[test]
    fn test_vi_mode_inserts_text() {
        let widget = HistoryWidget::new(FlagSet::new(), EditMode::Vi);
        let outcome = widget
            .run(&history(), "ls", &Pipeline::new("."), &FirstMatch::default())
            .unwrap();
        assert_eq!(outcome, HistoryOutcome::Insert("ls".to_string()));
    }

    #[test]
    fn test_cancel() {
        let widget = HistoryWidget::new(FlagSet::new(), EditMode::Emacs);
        let outcome = widget
            .run(&history(), "", &Pipeline::new("."), &Cancel)
            .unwrap();
        assert_eq!(outcome, HistoryOutcome::Cancelled);
    }

    #[test]
    fn test_configured_options_layer_on_top() {
        let widget = HistoryWidget::new(FlagSet::parse("--multi --prompt 'h> '"), EditMode::Emacs);
        assert_eq!(
            widget.flags().to_args(),
            vec!["--tiebreak=index", "-n2..,..", "--multi", "--prompt", "h> "]
        );
    }
}
