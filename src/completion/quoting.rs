//! Shell quoting codec
//!
//! `quote` turns a raw token (a file name, a host, a PID) into text that can be
//! spliced into a command line without the shell re-interpreting it.
//! `unquote_one_level` undoes exactly one level of shell quoting and is used on
//! the fragment the user already typed before it is resolved on disk.

use std::fmt::Write;
use std::iter::Peekable;
use std::str::Chars;

/// Characters that must be backslash-escaped anywhere in a word.
const SPECIAL: &[char] = &[
    ' ', '!', '"', '#', '$', '%', '&', '\'', '(', ')', '*', ';', '<', '=', '>', '?', '[', '\\',
    ']', '^', '`', '{', '|', '}', '~',
];

/// Escape `raw` so that it reads back as a single shell word equal to `raw`.
///
/// Metacharacters are backslash-escaped. Control characters cannot be
/// backslash-escaped (a backslash-newline is a line continuation), so they are
/// written as ANSI-C `$'...'` sequences. The empty string becomes `''`.
///
/// # Arguments
/// * `raw` - Unquoted text
///
/// # Returns
/// * `String` - Escaped text
pub fn quote(raw: &str) -> String {
    if raw.is_empty() {
        return "''".to_string();
    }

    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\n' => out.push_str("$'\\n'"),
            '\t' => out.push_str("$'\\t'"),
            '\r' => out.push_str("$'\\r'"),
            c if c.is_ascii_control() => {
                let _ = write!(out, "$'\\x{:02x}'", c as u32);
            }
            c if SPECIAL.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// Remove one level of shell quoting from `escaped`.
///
/// Handles backslash escapes, single quotes, double quotes and ANSI-C
/// `$'...'` strings. Unterminated quotes run to the end of the input; the
/// function never fails.
pub fn unquote_one_level(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                // line continuation
                Some('\n') => {}
                Some(next) => out.push(next),
                None => out.push('\\'),
            },
            '\'' => {
                for next in chars.by_ref() {
                    if next == '\'' {
                        break;
                    }
                    out.push(next);
                }
            }
            '"' => unquote_double(&mut chars, &mut out),
            '$' if chars.peek() == Some(&'\'') => {
                chars.next();
                unquote_ansi_c(&mut chars, &mut out);
            }
            other => out.push(other),
        }
    }

    out
}

fn unquote_double(chars: &mut Peekable<Chars<'_>>, out: &mut String) {
    while let Some(ch) = chars.next() {
        match ch {
            '"' => return,
            '\\' => match chars.peek().copied() {
                Some(next @ ('$' | '`' | '"' | '\\')) => {
                    out.push(next);
                    chars.next();
                }
                Some('\n') => {
                    chars.next();
                }
                _ => out.push('\\'),
            },
            other => out.push(other),
        }
    }
}

fn unquote_ansi_c(chars: &mut Peekable<Chars<'_>>, out: &mut String) {
    while let Some(ch) = chars.next() {
        match ch {
            '\'' => return,
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('a') => out.push('\x07'),
                Some('b') => out.push('\x08'),
                Some('e') | Some('E') => out.push('\x1b'),
                Some('x') => {
                    let mut value = 0u32;
                    let mut digits = 0;
                    while digits < 2 {
                        match chars.peek().and_then(|c| c.to_digit(16)) {
                            Some(d) => {
                                value = value * 16 + d;
                                digits += 1;
                                chars.next();
                            }
                            None => break,
                        }
                    }
                    if digits == 0 {
                        out.push_str("\\x");
                    } else if let Some(c) = char::from_u32(value) {
                        out.push(c);
                    }
                }
                Some(c @ ('\\' | '\'' | '"' | '?')) => out.push(c),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            },
            other => out.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_plain_words_untouched() {
        assert_eq!(quote("src/main.rs"), "src/main.rs");
        assert_eq!(quote("web-1.example.com:22"), "web-1.example.com:22");
        assert_eq!(quote("héllo"), "héllo");
    }

    #[test]
    fn test_quote_escapes_metacharacters() {
        assert_eq!(quote("my dir"), "my\\ dir");
        assert_eq!(quote("it's"), "it\\'s");
        assert_eq!(quote("$HOME/*"), "\\$HOME/\\*");
        assert_eq!(quote("~user"), "\\~user");
        assert_eq!(quote("a;b|c&d"), "a\\;b\\|c\\&d");
    }

    #[test]
    fn test_quote_empty_and_control() {
        assert_eq!(quote(""), "''");
        assert_eq!(quote("a\nb"), "a$'\\n'b");
        assert_eq!(quote("\x01"), "$'\\x01'");
    }

    #[test]
    fn test_unquote_forms() {
        assert_eq!(unquote_one_level("my\\ dir"), "my dir");
        assert_eq!(unquote_one_level("'my dir'/x"), "my dir/x");
        assert_eq!(unquote_one_level("\"a \\$b \\c\""), "a $b \\c");
        assert_eq!(unquote_one_level("$'tab\\there'"), "tab\there");
        assert_eq!(unquote_one_level("$'\\x41\\x'"), "A\\x");
        assert_eq!(unquote_one_level("trailing\\"), "trailing\\");
        assert_eq!(unquote_one_level("'unterminated"), "unterminated");
    }

    #[test]
    fn test_round_trip() {
        let samples = [
            "",
            "plain",
            "with space",
            "quotes ' and \"",
            "back\\slash",
            "$(rm -rf /)",
            "`cmd` && echo; ls | wc > out < in",
            "glob*?[a-z]{1,2}",
            "~/dir with ~ tilde",
            "new\nline\ttab\rcr",
            "bell\x07esc\x1bdel\x7f",
            "#comment !bang %job ^caret =eq",
            "ünïcödé パス",
            "'",
            "\\",
            "$'",
        ];

        for sample in samples {
            assert_eq!(unquote_one_level(&quote(sample)), sample, "sample {sample:?}");
        }
    }

    #[test]
    fn test_quote_is_single_word() {
        use crate::completion::token_stream::tokenize;

        for sample in ["a b", "x\ny", "'\"", " lead", "trail "] {
            let quoted = quote(sample);
            assert_eq!(tokenize(&quoted).len(), 1, "quoted {quoted:?}");
        }
    }
}
