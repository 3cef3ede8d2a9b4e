//! fzcomp library
//!
//! Fuzzy completion for line-editing shells: a key press turns into a fuzzy
//! selection over files, directories, processes, hosts or any command's
//! output, and the choice is written back into the command line.
//!
//! # Modules
//!
//! - `bindings`: Widgets and their key chords
//! - `cli`: Command-line interface, shell integration scripts and the widget protocol
//! - `completion`: Quoting, candidate sources, path resolution and the dispatcher
//! - `config`: Configuration management
//! - `error`: Error types and handling
//! - `repl`: Built-in reedline shell
//! - `selector`: Running the external selector and candidate producers
//!
//! # Example
//!
//! ```no_run
//! use fzcomp::completion::{Dispatcher, LineBuffer};
//! use fzcomp::config::Config;
//!
//! fn main() -> fzcomp::Result<()> {
//!     let config = Config::default();
//!     let cwd = std::env::current_dir()?;
//!     let dispatcher = Dispatcher::from_config(&config, &cwd)?;
//!
//!     let context = dispatcher.trigger_context("cd proj**");
//!     println!("{:?}", context);
//!     Ok(())
//! }
//! ```

pub mod bindings;
pub mod cli;
pub mod completion;
pub mod config;
pub mod error;
pub mod repl;
pub mod selector;

// Re-export commonly used types
pub use bindings::{BindingTable, KeyChord, Widget};
pub use completion::{DispatchOutcome, Dispatcher, EditorHost, LineBuffer};
pub use config::Config;
pub use error::{FzcompError, Result};
pub use repl::ShellEngine;
pub use selector::{ProcessSelector, Selector};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
///
/// # Returns
/// * `&str` - Version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
