//! Selector flag handling
//!
//! Flags come from several layers (built-in base flags, the global default
//! options, the completion options, the source's own flags). Later layers win
//! for every flag except the ones that naturally accumulate, such as `--bind`.

use std::fmt;
use std::str::FromStr;

use crate::completion::token_stream::split_words;
use crate::error::{ConfigError, FzcompError};

/// Flags that may appear more than once, each occurrence adding to the others
const ACCUMULATING: &[&str] = &["bind", "expect"];

/// Long flags whose value is the next word, even one starting with `-`
const VALUE_FLAGS: &[&str] = &[
    "bind", "border", "color", "delimiter", "expect", "header", "height", "info", "layout",
    "marker", "min-height", "nth", "pointer", "preview", "preview-window", "prompt", "query",
    "tiebreak", "with-nth",
];

/// Height of the selector window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Height {
    /// Fixed number of terminal lines
    Lines(u16),
    /// Percentage of the terminal height
    Percent(u16),
}

impl Default for Height {
    fn default() -> Self {
        Height::Percent(40)
    }
}

impl FromStr for Height {
    type Err = FzcompError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            FzcompError::Config(ConfigError::InvalidValue {
                field: "selector.height".to_string(),
                value: s.to_string(),
            })
        };

        let s_trim = s.trim();
        if let Some(pct) = s_trim.strip_suffix('%') {
            let value: u16 = pct.parse().map_err(|_| invalid())?;
            if value == 0 || value > 100 {
                return Err(invalid());
            }
            Ok(Height::Percent(value))
        } else {
            let value: u16 = s_trim.parse().map_err(|_| invalid())?;
            if value == 0 {
                return Err(invalid());
            }
            Ok(Height::Lines(value))
        }
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Height::Lines(n) => write!(f, "{n}"),
            Height::Percent(p) => write!(f, "{p}%"),
        }
    }
}

/// One flag and the values that follow it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag {
    /// Normalized name used to detect overrides (`-m`, `+m` and `--no-multi`
    /// all share the key `multi`)
    pub key: String,
    /// The flag word followed by its values, as passed on the command line
    pub words: Vec<String>,
}

impl Flag {
    /// Create a flag from its words; the key is derived from the first word
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words: Vec<String> = words.into_iter().map(Into::into).collect();
        let key = words.first().map(|w| flag_key(w)).unwrap_or_default();
        Self { key, words }
    }
}

/// Derive the override key of a flag word
fn flag_key(word: &str) -> String {
    if let Some(long) = word.strip_prefix("--") {
        let name = long.split('=').next().unwrap_or(long);
        return name.strip_prefix("no-").unwrap_or(name).to_string();
    }

    let short = word
        .strip_prefix('-')
        .or_else(|| word.strip_prefix('+'))
        .unwrap_or(word);
    match short.chars().next() {
        Some('m') => "multi".to_string(),
        Some('q') => "query".to_string(),
        Some('n') => "nth".to_string(),
        Some('d') => "delimiter".to_string(),
        Some('e') => "exact".to_string(),
        Some(c) => c.to_string(),
        None => word.to_string(),
    }
}

fn starts_flag(word: &str) -> bool {
    word.len() > 1 && (word.starts_with('-') || word.starts_with('+'))
}

/// Whether `word` is a flag whose value is the following word
fn takes_value(word: &str) -> bool {
    match word.strip_prefix("--") {
        Some(long) => VALUE_FLAGS.contains(&long),
        None => matches!(word, "-q" | "-d" | "-n"),
    }
}

/// Ordered set of selector flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
    flags: Vec<Flag>,
}

impl FlagSet {
    /// Create an empty flag set
    pub fn new() -> Self {
        Self::default()
    }

    /// Group already-split words into flags.
    ///
    /// Words that do not look like a flag are values of the preceding flag.
    /// A flag known to take a value always consumes the next word.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = FlagSet::new();
        let mut current: Vec<String> = Vec::new();
        let mut awaiting_value = false;

        for word in words.into_iter().map(Into::into) {
            if !awaiting_value && starts_flag(&word) && !current.is_empty() {
                set.push(Flag::new(std::mem::take(&mut current)));
            }
            awaiting_value = !awaiting_value && takes_value(&word);
            current.push(word);
        }
        if !current.is_empty() {
            set.push(Flag::new(current));
        }

        set
    }

    /// Parse a shell-quoted option string such as `--height 40% --prompt 'dir> '`
    pub fn parse(options: &str) -> Self {
        Self::from_words(split_words(options))
    }

    /// Add a flag, replacing an earlier flag with the same key
    pub fn push(&mut self, flag: Flag) {
        if !ACCUMULATING.contains(&flag.key.as_str()) {
            self.flags.retain(|f| f.key != flag.key);
        }
        self.flags.push(flag);
    }

    /// Layer `other` on top of this set
    pub fn merge(&mut self, other: &FlagSet) {
        for flag in &other.flags {
            self.push(flag.clone());
        }
    }

    /// Return a new set with `other` layered on top
    pub fn merged(mut self, other: &FlagSet) -> Self {
        self.merge(other);
        self
    }

    /// Find the flag for a key
    pub fn get(&self, key: &str) -> Option<&Flag> {
        self.flags.iter().rev().find(|f| f.key == key)
    }

    /// Whether the set has no flags
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Command line arguments in order
    pub fn to_args(&self) -> Vec<String> {
        self.flags.iter().flat_map(|f| f.words.iter().cloned()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_parse() {
        assert_eq!("40%".parse::<Height>().unwrap(), Height::Percent(40));
        assert_eq!("20".parse::<Height>().unwrap(), Height::Lines(20));
        assert_eq!(" 100% ".parse::<Height>().unwrap(), Height::Percent(100));
        assert!("0".parse::<Height>().is_err());
        assert!("120%".parse::<Height>().is_err());
        assert!("tall".parse::<Height>().is_err());
        assert!("".parse::<Height>().is_err());
    }

    #[test]
    fn test_height_display() {
        assert_eq!(Height::Percent(40).to_string(), "40%");
        assert_eq!(Height::Lines(12).to_string(), "12");
    }

    #[test]
    fn test_flag_keys() {
        assert_eq!(flag_key("-m"), "multi");
        assert_eq!(flag_key("+m"), "multi");
        assert_eq!(flag_key("--multi"), "multi");
        assert_eq!(flag_key("--no-multi"), "multi");
        assert_eq!(flag_key("-n2..,.."), "nth");
        assert_eq!(flag_key("--tiebreak=index"), "tiebreak");
        assert_eq!(flag_key("--query"), "query");
    }

    #[test]
    fn test_values_attach_to_flags() {
        let set = FlagSet::parse("--height 40% --prompt 'dir> ' -m");
        assert_eq!(set.get("height").unwrap().words, vec!["--height", "40%"]);
        assert_eq!(set.get("prompt").unwrap().words, vec!["--prompt", "dir> "]);
        assert_eq!(set.to_args(), vec!["--height", "40%", "--prompt", "dir> ", "-m"]);
    }

    #[test]
    fn test_dash_values_stay_with_their_flag() {
        let set = FlagSet::parse("--prompt '-> ' -m --query -foo -d -");
        assert_eq!(set.get("prompt").unwrap().words, vec!["--prompt", "-> "]);
        assert_eq!(set.get("query").unwrap().words, vec!["--query", "-foo"]);
        assert_eq!(set.get("delimiter").unwrap().words, vec!["-d", "-"]);
        assert_eq!(set.get("multi").unwrap().words, vec!["-m"]);
        assert!(set.get(">").is_none());
    }

    #[test]
    fn test_later_layers_override() {
        let defaults = FlagSet::parse("-m --height 50% --reverse");
        let source = FlagSet::parse("+m --height 10");
        let merged = defaults.merged(&source);
        assert_eq!(merged.to_args(), vec!["--reverse", "+m", "--height", "10"]);
    }

    #[test]
    fn test_bind_accumulates() {
        let mut set = FlagSet::parse("--bind ctrl-a:select-all");
        set.merge(&FlagSet::parse("--bind ctrl-d:deselect-all"));
        assert_eq!(
            set.to_args(),
            vec!["--bind", "ctrl-a:select-all", "--bind", "ctrl-d:deselect-all"]
        );
    }

    #[test]
    fn test_empty_options() {
        assert!(FlagSet::parse("   ").is_empty());
        assert!(FlagSet::new().to_args().is_empty());
    }
}
