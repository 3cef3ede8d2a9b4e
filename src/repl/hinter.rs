//! Hinter for reedline - names the candidate source a completion request
//! would use

use nu_ansi_term::{Color, Style};
use reedline::{Hinter, History};

use crate::completion::quoting::unquote_one_level;
use crate::completion::resolver::looks_like_path;
use crate::completion::{SourceRegistry, detect_trigger};

/// Shows `<source>` after the cursor when the line is a completion request
pub struct TriggerHinter {
    /// Candidate sources
    registry: SourceRegistry,
    /// Completion trigger
    trigger: String,
    /// Style for hints
    style: Style,
}

impl TriggerHinter {
    /// Create a hinter for `registry` and `trigger`
    pub fn new(registry: SourceRegistry, trigger: impl Into<String>) -> Self {
        Self {
            registry,
            trigger: trigger.into(),
            style: Style::new().italic().fg(Color::DarkGray),
        }
    }

    /// Identifier of the source handling `line`, if it is a request
    pub fn source_for(&self, line: &str) -> Option<&str> {
        let context = detect_trigger(&self.registry, &self.trigger, line)?;
        let fragment = unquote_one_level(&context.raw_fragment);
        let source = self
            .registry
            .resolve(&context.command_name, looks_like_path(&fragment));
        Some(&source.identifier)
    }
}

impl Hinter for TriggerHinter {
    fn handle(
        &mut self,
        line: &str,
        pos: usize,
        _history: &dyn History,
        use_ansi_coloring: bool,
        _cwd: &str,
    ) -> String {
        // Only hint with the cursor at the end of the line
        if pos != line.len() {
            return String::new();
        }

        match self.source_for(line) {
            Some(source) if use_ansi_coloring => {
                self.style.paint(format!("  <{}>", source)).to_string()
            }
            Some(source) => format!("  <{}>", source),
            None => String::new(),
        }
    }

    // The hint is a label, accepting it inserts nothing
    fn complete_hint(&self) -> String {
        String::new()
    }

    fn next_hint_token(&self) -> String {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reedline::FileBackedHistory;

    fn hinter() -> TriggerHinter {
        TriggerHinter::new(SourceRegistry::with_defaults(["cd"]), "**")
    }

    #[test]
    fn test_source_for_requests() {
        let hinter = hinter();
        assert_eq!(hinter.source_for("cd src**"), Some("directory"));
        assert_eq!(hinter.source_for("vim src**"), Some("path"));
        assert_eq!(hinter.source_for("kill "), Some("processes"));
        assert_eq!(hinter.source_for("ssh **"), Some("hosts"));
        assert_eq!(hinter.source_for("vim src"), None);
    }

    #[test]
    fn test_plain_hint() {
        let mut hinter = hinter();
        let history = FileBackedHistory::new(10).unwrap();

        assert_eq!(hinter.handle("vim **", 6, &history, false, "/tmp"), "  <path>");
        assert_eq!(hinter.handle("vim **", 2, &history, false, "/tmp"), "");
        assert_eq!(hinter.handle("vim", 3, &history, false, "/tmp"), "");
        assert_eq!(hinter.complete_hint(), "");
    }
}
