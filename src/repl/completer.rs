//! Completer for reedline - plain file name completion
//!
//! This is the default completion of the built-in shell, i.e. what the
//! completion key does when the line is not a fuzzy completion request.

use std::fs;
use std::path::{Path, PathBuf};

use reedline::{Completer, Span, Suggestion};

use crate::completion::quoting::{quote, unquote_one_level};
use crate::completion::resolver::expand_tilde;
use crate::completion::token_stream::{TokenKind, tokenize};

/// File name completer relative to a working directory
pub struct PathCompleter {
    /// Directory relative paths are resolved against
    cwd: PathBuf,
}

impl PathCompleter {
    /// Create a completer working in `cwd`
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    /// Move to another working directory
    pub fn set_cwd(&mut self, cwd: &Path) {
        self.cwd = cwd.to_path_buf();
    }
}

/// Byte offset where the word under the cursor starts
fn word_start(left: &str) -> usize {
    match tokenize(left).last() {
        Some(token) if token.kind == TokenKind::Word && token.end == left.len() => token.start,
        _ => left.len(),
    }
}

impl Completer for PathCompleter {
    /// Complete the file name before the cursor
    ///
    /// # Arguments
    /// * `line` - The input line
    /// * `pos` - Cursor position (byte index)
    ///
    /// # Returns
    /// * `Vec<Suggestion>` - Matching entries, directories with a trailing `/`
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let Some(left) = line.get(..pos) else {
            return Vec::new();
        };
        let start = word_start(left);
        let raw = &left[start..];

        // the directory part is kept as typed, only new names are quoted
        let (raw_dir, raw_name) = match raw.rfind('/') {
            Some(i) => raw.split_at(i + 1),
            None => ("", raw),
        };
        let prefix = unquote_one_level(raw_name);
        let dir = self.cwd.join(expand_tilde(&unquote_one_level(raw_dir)));

        let Ok(entries) = fs::read_dir(&dir) else {
            return Vec::new();
        };

        let mut matches: Vec<(String, bool)> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                if !name.starts_with(&prefix) || (name.starts_with('.') && !prefix.starts_with('.'))
                {
                    return None;
                }
                let is_dir = entry.path().is_dir();
                Some((name, is_dir))
            })
            .collect();
        matches.sort();

        matches
            .into_iter()
            .map(|(name, is_dir)| Suggestion {
                value: format!("{}{}{}", raw_dir, quote(&name), if is_dir { "/" } else { "" }),
                description: None,
                style: None,
                extra: None,
                span: Span::new(start, pos),
                append_whitespace: !is_dir,
                match_indices: None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("project/src")).unwrap();
        fs::write(dir.path().join("profile.txt"), "").unwrap();
        fs::write(dir.path().join("my notes.md"), "").unwrap();
        fs::write(dir.path().join(".hidden"), "").unwrap();
        fs::write(dir.path().join("project/src/main.rs"), "").unwrap();
        dir
    }

    fn values(suggestions: Vec<Suggestion>) -> Vec<String> {
        suggestions.into_iter().map(|s| s.value).collect()
    }

    #[test]
    fn test_complete_prefix() {
        let dir = fixture();
        let mut completer = PathCompleter::new(dir.path());

        let suggestions = completer.complete("vim pro", 7);
        assert_eq!(suggestions[0].span, Span::new(4, 7));
        assert!(suggestions[0].append_whitespace);
        assert!(!suggestions[1].append_whitespace);
        assert_eq!(values(suggestions), vec!["profile.txt", "project/"]);
    }

    #[test]
    fn test_complete_nested_and_quoted() {
        let dir = fixture();
        let mut completer = PathCompleter::new(dir.path());

        assert_eq!(values(completer.complete("cat project/src/m", 17)), vec!["project/src/main.rs"]);
        assert_eq!(values(completer.complete("cat my", 6)), vec!["my\\ notes.md"]);
        assert_eq!(values(completer.complete("cat 'my no", 10)), vec!["my\\ notes.md"]);
    }

    #[test]
    fn test_hidden_entries_need_a_dot() {
        let dir = fixture();
        let mut completer = PathCompleter::new(dir.path());

        assert!(!values(completer.complete("ls ", 3)).contains(&".hidden".to_string()));
        assert_eq!(values(completer.complete("ls .h", 5)), vec![".hidden"]);
    }

    #[test]
    fn test_missing_directory() {
        let dir = fixture();
        let mut completer = PathCompleter::new(dir.path());
        assert!(completer.complete("ls nowhere/x", 12).is_empty());
    }
}
