//! Editor host callbacks for the built-in shell

use reedline::{Completer, Suggestion};
use tracing::debug;

use super::completer::PathCompleter;
use crate::completion::{EditorHost, HistoryEntry, LineBuffer};
use crate::error::{FzcompError, Result};

/// [`EditorHost`] over the reedline shell.
///
/// Widgets run between two `read_line` calls, so the host works on a copy
/// of the buffer that the engine writes back afterwards.
pub struct ReedlineHost<'a> {
    /// Default completion
    completer: &'a mut PathCompleter,
    /// History snapshot, oldest first
    history: &'a [HistoryEntry],
}

impl<'a> ReedlineHost<'a> {
    pub fn new(completer: &'a mut PathCompleter, history: &'a [HistoryEntry]) -> Self {
        Self { completer, history }
    }
}

/// Longest prefix shared by all values
fn common_prefix<'s>(values: &[&'s str]) -> &'s str {
    let Some((first, rest)) = values.split_first() else {
        return "";
    };

    let mut len = first.len();
    for value in rest {
        len = first
            .char_indices()
            .zip(value.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map_or(0, |((i, a), _)| i + a.len_utf8())
            .min(len);
    }
    &first[..len]
}

impl EditorHost for ReedlineHost<'_> {
    fn default_completion(&mut self, buffer: &mut LineBuffer) -> Result<()> {
        let line = format!("{}{}", buffer.left, buffer.right);
        let pos = buffer.left.len();
        let suggestions: Vec<Suggestion> = self.completer.complete(&line, pos);

        let Some(start) = suggestions.first().map(|s| s.span.start) else {
            return Ok(());
        };
        let head = buffer.left[..start].to_string();

        if let [only] = suggestions.as_slice() {
            let space = if only.append_whitespace { " " } else { "" };
            buffer.left = format!("{}{}{}", head, only.value, space);
            return Ok(());
        }

        let values: Vec<&str> = suggestions.iter().map(|s| s.value.as_str()).collect();
        let common = common_prefix(&values);
        if common.len() > pos - start {
            buffer.left = format!("{}{}", head, common);
        } else {
            debug!(candidates = values.len(), "Listing completions");
            println!();
            println!("{}", values.join("  "));
        }

        Ok(())
    }

    // The engine writes the buffer back and reedline repaints on the next read
    fn redisplay(&mut self) {}

    fn report_error(&mut self, error: &FzcompError) {
        eprintln!("fzcomp: {}", error);
    }

    fn expand_history(&mut self, index: usize, buffer: &mut LineBuffer) -> Result<()> {
        let entry = self
            .history
            .iter()
            .find(|e| e.index == index)
            .ok_or_else(|| FzcompError::Generic(format!("No history entry {}", index)))?;

        buffer.left = entry.text.clone();
        buffer.right.clear();
        Ok(())
    }
}
