//! Key bindings for the widgets
//!
//! A [`BindingTable`] maps each widget to a key chord. Chords are written as
//! `tab`, `ctrl-t`, `alt-c` or `ctrl-alt-x` and can be rendered for zsh
//! `bindkey`, bash `bind -x` and reedline keybindings.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use reedline::{KeyCode, KeyModifiers};

use crate::config::KeyBindingConfig;
use crate::error::{ConfigError, FzcompError, Result};

/// The widgets fzcomp provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Widget {
    /// Trigger-based fuzzy completion, falling back to the default completion
    Complete,
    /// Insert selected paths at the cursor
    InsertPath,
    /// Change into the selected directory
    ChangeDirectory,
    /// Search the command history
    History,
}

impl Widget {
    /// All widgets in binding order
    pub const ALL: [Widget; 4] = [
        Widget::Complete,
        Widget::InsertPath,
        Widget::ChangeDirectory,
        Widget::History,
    ];

    /// Name used on the command line and in host scripts
    pub fn name(&self) -> &'static str {
        match self {
            Widget::Complete => "complete",
            Widget::InsertPath => "insert-path",
            Widget::ChangeDirectory => "change-directory",
            Widget::History => "history",
        }
    }

    /// Look up a widget by name
    pub fn from_name(name: &str) -> Option<Widget> {
        Self::ALL.into_iter().find(|w| w.name() == name)
    }
}

impl fmt::Display for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key of a chord
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Tab,
    Char(char),
}

/// A key with optional ctrl/alt modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    pub ctrl: bool,
    pub alt: bool,
    pub key: Key,
}

impl FromStr for KeyChord {
    type Err = FzcompError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || -> FzcompError {
            ConfigError::InvalidValue {
                field: "keybinding".to_string(),
                value: s.to_string(),
            }
            .into()
        };

        let mut ctrl = false;
        let mut alt = false;
        let mut rest = s.trim();

        loop {
            let lower = rest.to_ascii_lowercase();
            if lower.starts_with("ctrl-") {
                ctrl = true;
                rest = &rest[5..];
            } else if lower.starts_with("alt-") {
                alt = true;
                rest = &rest[4..];
            } else {
                break;
            }
        }

        let key = if rest.eq_ignore_ascii_case("tab") {
            Key::Tab
        } else {
            let mut chars = rest.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_graphic() => Key::Char(c.to_ascii_lowercase()),
                _ => return Err(invalid()),
            }
        };

        if !ctrl && !alt && key != Key::Tab {
            // a bare printable key would swallow ordinary typing
            return Err(invalid());
        }

        Ok(Self { ctrl, alt, key })
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("ctrl-")?;
        }
        if self.alt {
            f.write_str("alt-")?;
        }
        match self.key {
            Key::Tab => f.write_str("tab"),
            Key::Char(c) => write!(f, "{c}"),
        }
    }
}

impl KeyChord {
    /// Key sequence for zsh `bindkey`
    pub fn to_zsh(&self) -> String {
        let base = match self.key {
            Key::Tab => "^I".to_string(),
            Key::Char(c) if self.ctrl => format!("^{}", c.to_ascii_uppercase()),
            Key::Char(c) => c.to_string(),
        };
        if self.alt { format!("\\e{base}") } else { base }
    }

    /// Key sequence for bash `bind`
    pub fn to_bash(&self) -> String {
        let base = match self.key {
            Key::Tab => "\\C-i".to_string(),
            Key::Char(c) if self.ctrl => format!("\\C-{c}"),
            Key::Char(c) => c.to_string(),
        };
        if self.alt { format!("\\e{base}") } else { base }
    }

    /// Modifiers and key code for reedline keybindings
    pub fn to_reedline(&self) -> (KeyModifiers, KeyCode) {
        let mut modifiers = KeyModifiers::NONE;
        if self.ctrl && self.key != Key::Tab {
            modifiers |= KeyModifiers::CONTROL;
        }
        if self.alt {
            modifiers |= KeyModifiers::ALT;
        }
        let code = match self.key {
            Key::Tab => KeyCode::Tab,
            Key::Char(c) => KeyCode::Char(c),
        };
        (modifiers, code)
    }
}

/// Key chord per widget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingTable {
    bindings: Vec<(Widget, KeyChord)>,
}

impl BindingTable {
    /// Build the table from configuration
    pub fn from_config(config: &KeyBindingConfig) -> Result<Self> {
        let bindings = vec![
            (Widget::Complete, config.complete.parse()?),
            (Widget::InsertPath, config.insert_path.parse()?),
            (Widget::ChangeDirectory, config.change_directory.parse()?),
            (Widget::History, config.history.parse()?),
        ];
        Ok(Self { bindings })
    }

    /// Chord bound to `widget`
    pub fn chord(&self, widget: Widget) -> Option<KeyChord> {
        self.bindings
            .iter()
            .find(|(w, _)| *w == widget)
            .map(|(_, chord)| *chord)
    }

    /// All bindings in widget order
    pub fn iter(&self) -> impl Iterator<Item = (Widget, KeyChord)> + '_ {
        self.bindings.iter().copied()
    }
}
