//! Prompt for the built-in shell

use std::borrow::Cow;
use std::path::Path;

use nu_ansi_term::{Color, Style};
use reedline::{
    Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus, PromptViMode,
};

/// Prompt showing the working directory
pub struct ShellPrompt {
    /// Working directory, with the home directory shown as `~`
    location: String,
    /// Style of the location
    style: Option<Style>,
}

impl ShellPrompt {
    /// Create a prompt for `cwd`
    ///
    /// # Arguments
    /// * `cwd` - Working directory
    /// * `color` - Whether to style the location
    pub fn new(cwd: &Path, color: bool) -> Self {
        Self {
            location: display_location(cwd, dirs::home_dir().as_deref()),
            style: color.then(|| Color::Cyan.bold()),
        }
    }

    /// Update the working directory
    pub fn set_cwd(&mut self, cwd: &Path) {
        self.location = display_location(cwd, dirs::home_dir().as_deref());
    }
}

fn display_location(cwd: &Path, home: Option<&Path>) -> String {
    match home.and_then(|h| cwd.strip_prefix(h).ok()) {
        Some(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Some(rest) => format!("~/{}", rest.display()),
        None => cwd.display().to_string(),
    }
}

impl Prompt for ShellPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        match self.style {
            Some(style) => format!("{} ", style.paint(&self.location)).into(),
            None => format!("{} ", self.location).into(),
        }
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        "".into()
    }

    /// `:` in vi normal mode, `$` otherwise
    fn render_prompt_indicator(&self, prompt_mode: PromptEditMode) -> Cow<'_, str> {
        match prompt_mode {
            PromptEditMode::Vi(PromptViMode::Normal) => ": ".into(),
            _ => "$ ".into(),
        }
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        "> ".into()
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };

        format!("({}reverse-search: {}) ", prefix, history_search.term).into()
    }
}
