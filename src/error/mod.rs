//! Error handling for fzcomp.
//!
//! Errors fall into two groups that the widgets treat very differently:
//! - configuration errors (missing selector binary, missing producer command,
//!   malformed configuration) abort the request and are reported once
//! - everything else that can go wrong while producing candidates degrades to
//!   "no candidates" and never reaches this type
//!
//! # Example
//!
//! ```rust,no_run
//! use fzcomp::error::{FzcompError, Result};
//!
//! fn run_widget() -> Result<()> {
//!     Ok(())
//! }
//!
//! if let Err(e) = run_widget() {
//!     if e.is_config() {
//!         eprintln!("fzcomp: {e}");
//!     }
//! }
//! ```

pub mod kinds;

// Re-export commonly used types
pub use kinds::{ConfigError, FzcompError, Result, SelectorError};
