//! Fuzzy completion core
//!
//! This module handles:
//! - Shell quoting and quote-aware word splitting
//! - The registry mapping commands to candidate sources
//! - Resolution of partially typed paths
//! - The completion dispatcher and its widgets
//! - History search
//! - Built-in candidate producers (`compgen`)

pub mod compgen;
pub mod dispatcher;
pub mod history;
pub mod quoting;
pub mod registry;
pub mod resolver;
pub mod token_stream;

pub use dispatcher::{
    DispatchOutcome, Dispatcher, EditorHost, LineBuffer, TriggerContext, detect_trigger,
};
pub use history::{EditMode, HistoryEntry, HistoryOutcome, HistoryWidget};
pub use quoting::{quote, unquote_one_level};
pub use registry::{CandidateSource, Producer, SourceKind, SourceRegistry};
pub use resolver::{PathResolver, ResolvedPath};
