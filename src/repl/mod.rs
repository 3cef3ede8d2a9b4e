//! Built-in interactive shell (`fzcomp shell`)
//!
//! This module provides a small reedline-based shell hosting the widgets:
//! - Widget keys bound to reedline host commands
//! - Plain file name completion as the default completion
//! - Command history in a file
//! - A hint naming the candidate source of a completion request
//! - A prompt showing the working directory

mod completer;
mod engine;
mod hinter;
mod host;
mod prompt;

pub use completer::PathCompleter;
pub use engine::ShellEngine;
pub use hinter::TriggerHinter;
pub use host::ReedlineHost;
pub use prompt::ShellPrompt;
