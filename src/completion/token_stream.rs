//! Quote-aware shell word splitting
//!
//! Tokens keep the text exactly as typed (quotes and escapes included) together
//! with their byte span, so the dispatcher can replace a token in place.
//! Command separators (`;`, `|`, `&`) become operator tokens.

use super::quoting::unquote_one_level;

/// Kind of a token in the left buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A shell word
    Word,
    /// A run of command separator characters (`;`, `|`, `&&`, ...)
    Operator,
}

/// A token of the left buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Raw text as typed
    pub text: String,
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
    /// Token kind
    pub kind: TokenKind,
}

impl Token {
    /// The word with one level of quoting removed
    pub fn unquoted(&self) -> String {
        unquote_one_level(&self.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
    AnsiC,
}

fn is_operator(c: char) -> bool {
    matches!(c, ';' | '|' | '&')
}

/// Split `input` into tokens.
///
/// Whitespace inside quotes or after a backslash does not end a word, and an
/// unterminated quote extends the last word to the end of the input.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut start: Option<usize> = None;
    let mut quote = Quote::None;
    let mut escaped = false;
    let mut prev_dollar = false;

    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }

        match quote {
            Quote::Single => {
                if c == '\'' {
                    quote = Quote::None;
                }
                continue;
            }
            Quote::Double | Quote::AnsiC => {
                let closing = if quote == Quote::Double { '"' } else { '\'' };
                if c == '\\' {
                    escaped = true;
                } else if c == closing {
                    quote = Quote::None;
                }
                continue;
            }
            Quote::None => {}
        }

        if c.is_whitespace() || is_operator(c) {
            if let Some(s) = start.take() {
                tokens.push(word(input, s, i));
            }
            prev_dollar = false;

            if is_operator(c) {
                match tokens.last_mut() {
                    Some(last) if last.kind == TokenKind::Operator && last.end == i => {
                        last.end = i + c.len_utf8();
                        last.text.push(c);
                    }
                    _ => tokens.push(Token {
                        text: c.to_string(),
                        start: i,
                        end: i + c.len_utf8(),
                        kind: TokenKind::Operator,
                    }),
                }
            }
            continue;
        }

        if start.is_none() {
            start = Some(i);
        }

        match c {
            '\\' => escaped = true,
            '\'' if prev_dollar => quote = Quote::AnsiC,
            '\'' => quote = Quote::Single,
            '"' => quote = Quote::Double,
            _ => {}
        }
        prev_dollar = c == '$';
    }

    if let Some(s) = start {
        tokens.push(word(input, s, input.len()));
    }

    tokens
}

fn word(input: &str, start: usize, end: usize) -> Token {
    Token {
        text: input[start..end].to_string(),
        start,
        end,
        kind: TokenKind::Word,
    }
}

/// Words of the last command in `tokens` (everything after the last operator).
pub fn current_command(tokens: &[Token]) -> &[Token] {
    let from = tokens
        .iter()
        .rposition(|t| t.kind == TokenKind::Operator)
        .map(|i| i + 1)
        .unwrap_or(0);
    &tokens[from..]
}

/// Split a flag string such as `--height 40% --prompt 'dir> '` into unquoted words.
pub fn split_words(input: &str) -> Vec<String> {
    tokenize(input)
        .iter()
        .filter(|t| t.kind == TokenKind::Word)
        .map(Token::unquoted)
        .collect()
}
