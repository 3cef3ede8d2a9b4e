//! Completion dispatcher
//!
//! Decides whether a key press is a fuzzy completion request, picks the
//! candidate source, resolves partially typed paths, runs the selector over
//! the producer's output and splices the selection back into the line buffer.
//! Requests that do not qualify go to the host's default completion.

use std::path::Path;

use tracing::{debug, info, warn};

use super::history::{EditMode, HistoryEntry, HistoryOutcome, HistoryWidget};
use super::quoting::{quote, unquote_one_level};
use super::registry::{CandidateSource, Producer, SourceRegistry};
use super::resolver::{PathResolver, expand_tilde, looks_like_path};
use super::token_stream::{TokenKind, current_command, tokenize};
use crate::config::{Config, WidgetConfig};
use crate::error::{FzcompError, Result};
use crate::selector::{FlagSet, Pipeline, ProcessSelector, Selector, SelectorInvocation};

/// The line being edited, split at the cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    /// Text left of the cursor
    pub left: String,
    /// Text right of the cursor
    pub right: String,
}

impl LineBuffer {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

/// Callbacks into the line editor hosting the widgets
pub trait EditorHost {
    /// Run the completion that was bound to the key before fzcomp took it over
    fn default_completion(&mut self, buffer: &mut LineBuffer) -> Result<()>;

    /// Redraw the line after the buffer changed
    fn redisplay(&mut self);

    /// Tell the user about a configuration problem
    fn report_error(&mut self, error: &FzcompError);

    /// Replace the buffer with history entry `index` using the host's own
    /// history expansion
    fn expand_history(&mut self, index: usize, buffer: &mut LineBuffer) -> Result<()>;
}

/// How a widget invocation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not a fuzzy request, or a configuration error; default completion ran
    Fallback,
    /// The user cancelled; the buffer is unchanged
    Cancelled,
    /// The left buffer was replaced
    Replaced,
    /// The host should run this command line
    Execute(String),
    /// The buffer was replaced with a history entry by the host
    HistoryExpanded(usize),
}

/// What the trigger check found in the left buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerContext {
    /// First word of the current command, unquoted
    pub command_name: String,
    /// The token being completed as typed, without the trigger
    pub raw_fragment: String,
    /// Everything left of the token being completed
    pub preceding_text: String,
}

/// Check whether `left` is a completion request.
///
/// A request is a left buffer ending with `trigger` inside a token of a
/// command that has at least two words. An empty trigger makes the whole
/// last token the fragment. On a trailing separator the request fires with
/// an empty fragment when the trigger is empty, or when the command's source
/// is unconditional.
pub fn detect_trigger(registry: &SourceRegistry, trigger: &str, left: &str) -> Option<TriggerContext> {
    let tokens = tokenize(left);
    let command = current_command(&tokens);
    let first = command.first().filter(|t| t.kind == TokenKind::Word)?;
    let command_name = first.unquoted();
    let last = command.last()?;

    let trailing_separator = last.end < left.len();
    if trailing_separator {
        let fires = trigger.is_empty() || registry.resolve(&command_name, false).unconditional;
        return fires.then(|| TriggerContext {
            command_name,
            raw_fragment: String::new(),
            preceding_text: left.to_string(),
        });
    }

    if command.len() < 2 {
        return None;
    }
    let raw_fragment = last.text.strip_suffix(trigger)?;

    Some(TriggerContext {
        command_name,
        raw_fragment: raw_fragment.to_string(),
        preceding_text: left[..last.start].to_string(),
    })
}

/// Completion dispatcher
pub struct Dispatcher {
    /// Candidate sources
    registry: SourceRegistry,
    /// Selector used for every widget
    selector: Box<dyn Selector>,
    /// Spawns producers
    pipeline: Pipeline,
    /// Resolves path fragments
    resolver: PathResolver,
    /// Marker ending a completion request
    trigger: String,
    /// Flags for completion requests, before source flags
    completion_flags: FlagSet,
    /// Producers and flags of the other widgets
    widgets: WidgetConfig,
}

impl Dispatcher {
    /// Create a dispatcher with the default trigger
    pub fn new(
        registry: SourceRegistry,
        selector: Box<dyn Selector>,
        pipeline: Pipeline,
        resolver: PathResolver,
    ) -> Self {
        Self {
            registry,
            selector,
            pipeline,
            resolver,
            trigger: "**".to_string(),
            completion_flags: FlagSet::new(),
            widgets: WidgetConfig::default(),
        }
    }

    /// Build a dispatcher working in `cwd` from configuration
    pub fn from_config(config: &Config, cwd: &Path) -> Result<Self> {
        let selector = ProcessSelector::from_config(&config.selector)?;

        Ok(Self::new(
            SourceRegistry::from_config(&config.completion),
            Box::new(selector),
            Pipeline::new(cwd),
            PathResolver::new(cwd),
        )
        .with_trigger(config.completion.trigger.clone())
        .with_completion_options(FlagSet::parse(&config.completion.options))
        .with_widgets(config.widgets.clone()))
    }

    /// Set the trigger sequence; an empty trigger fires on every argument
    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = trigger.into();
        self
    }

    /// Set the completion flags
    pub fn with_completion_options(mut self, flags: FlagSet) -> Self {
        self.completion_flags = flags;
        self
    }

    /// Set the widget producers and flags
    pub fn with_widgets(mut self, widgets: WidgetConfig) -> Self {
        self.widgets = widgets;
        self
    }

    /// The source registry
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// The trigger sequence
    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    /// Check whether `left` is a completion request
    pub fn trigger_context(&self, left: &str) -> Option<TriggerContext> {
        detect_trigger(&self.registry, &self.trigger, left)
    }

    /// Move to another working directory
    pub fn set_cwd(&mut self, cwd: &Path) {
        self.pipeline.set_cwd(cwd);
        self.resolver = PathResolver::new(cwd);
    }

    /// Trigger-based fuzzy completion (the `complete` widget).
    ///
    /// Falls back to the host's default completion when the buffer is not a
    /// request or when the request hits a configuration error.
    pub fn complete(
        &self,
        host: &mut dyn EditorHost,
        buffer: &mut LineBuffer,
    ) -> Result<DispatchOutcome> {
        let Some(context) = self.trigger_context(&buffer.left) else {
            debug!(left = %buffer.left, "No completion trigger, using default completion");
            host.default_completion(buffer)?;
            return Ok(DispatchOutcome::Fallback);
        };

        match self.complete_context(&context, buffer) {
            Ok(outcome) => {
                if outcome == DispatchOutcome::Replaced {
                    host.redisplay();
                }
                Ok(outcome)
            }
            Err(e) if e.is_config() => {
                warn!(error = %e, "Completion aborted");
                host.report_error(&e);
                host.default_completion(buffer)?;
                Ok(DispatchOutcome::Fallback)
            }
            Err(e) => Err(e),
        }
    }

    fn complete_context(
        &self,
        context: &TriggerContext,
        buffer: &mut LineBuffer,
    ) -> Result<DispatchOutcome> {
        // 1. source
        let fragment = unquote_one_level(&context.raw_fragment);
        let source = self
            .registry
            .resolve(&context.command_name, looks_like_path(&fragment));
        info!(
            command = %context.command_name,
            source = %source.identifier,
            fragment = %fragment,
            "Completion triggered"
        );

        // 2. candidates
        let (dir, query) = if source.kind.is_path_based() {
            let resolved = self.resolver.resolve(&expand_tilde(&fragment));
            (Some(resolved.existing_prefix), resolved.leftover_suffix)
        } else {
            (None, fragment)
        };

        // 3. selection
        let flags = self
            .completion_flags
            .clone()
            .merged(&FlagSet::from_words(source.selector_flags.iter().cloned()));
        let Some(selection) = self.select(&source.producer, dir.as_deref(), flags, query)? else {
            return Ok(DispatchOutcome::Cancelled);
        };

        // 4. reinsertion
        buffer.left = format!("{}{}", context.preceding_text, source.render(&selection));
        Ok(DispatchOutcome::Replaced)
    }

    /// Run a producer through the selector.
    ///
    /// Returns `None` when nothing was selected or the producer failed. The
    /// producer is always stopped before this returns; a missing producer
    /// wins over the selector's result.
    fn select(
        &self,
        producer: &Producer,
        dir: Option<&str>,
        flags: FlagSet,
        query: String,
    ) -> Result<Option<Vec<String>>> {
        let mut stream = self.pipeline.spawn(producer, dir)?;
        let invocation = SelectorInvocation::new(flags, Some(query));

        let selection = self.selector.select(&mut stream, &invocation);
        let produced = stream.finish()?;
        let selection = selection?;

        if !produced {
            debug!("Candidate producer failed, discarding selection");
            return Ok(None);
        }

        debug!(selected = selection.len(), "Selector finished");
        Ok((!selection.is_empty()).then_some(selection))
    }

    /// Insert selected paths at the cursor (the `insert-path` widget)
    pub fn insert_paths(
        &self,
        host: &mut dyn EditorHost,
        buffer: &mut LineBuffer,
    ) -> Result<DispatchOutcome> {
        let source = self.registry.path_source();
        let result = self.widget_selection(
            source,
            self.widgets.file_command.as_deref(),
            &self.widgets.file_options,
        );

        match self.settle(host, result)? {
            Some(selection) => {
                buffer.left.push_str(&source.render(&selection));
                host.redisplay();
                Ok(DispatchOutcome::Replaced)
            }
            None => Ok(DispatchOutcome::Cancelled),
        }
    }

    /// Pick a directory and produce the command changing into it
    /// (the `change-directory` widget)
    pub fn change_directory(
        &self,
        host: &mut dyn EditorHost,
        buffer: &mut LineBuffer,
    ) -> Result<DispatchOutcome> {
        let source = self.registry.directory_source();
        let result = self.widget_selection(
            source,
            self.widgets.cd_command.as_deref(),
            &self.widgets.cd_options,
        );

        let Some(selection) = self.settle(host, result)? else {
            return Ok(DispatchOutcome::Cancelled);
        };
        let Some(dir) = selection.first() else {
            return Ok(DispatchOutcome::Cancelled);
        };

        let command = format!("builtin cd -- {}", quote(dir));
        buffer.left = command.clone();
        buffer.right.clear();
        host.redisplay();
        Ok(DispatchOutcome::Execute(command))
    }

    /// Search `entries` (the `history` widget)
    ///
    /// # Arguments
    /// * `host` - Performs history expansion in emacs mode
    /// * `buffer` - The left buffer seeds the query
    /// * `entries` - Host history
    /// * `mode` - Host edit mode
    pub fn history(
        &self,
        host: &mut dyn EditorHost,
        buffer: &mut LineBuffer,
        entries: &[HistoryEntry],
        mode: EditMode,
    ) -> Result<DispatchOutcome> {
        let widget = HistoryWidget::new(FlagSet::parse(&self.widgets.history_options), mode);
        let outcome = widget.run(entries, &buffer.left, &self.pipeline, self.selector.as_ref());

        match self.settle(host, outcome.map(Some))? {
            Some(HistoryOutcome::ExpandAt(index)) => {
                host.expand_history(index, buffer)?;
                host.redisplay();
                Ok(DispatchOutcome::HistoryExpanded(index))
            }
            Some(HistoryOutcome::Insert(text)) => {
                buffer.left = text;
                buffer.right.clear();
                host.redisplay();
                Ok(DispatchOutcome::Replaced)
            }
            Some(HistoryOutcome::Cancelled) | None => Ok(DispatchOutcome::Cancelled),
        }
    }

    fn widget_selection(
        &self,
        source: &CandidateSource,
        command: Option<&str>,
        options: &str,
    ) -> Result<Option<Vec<String>>> {
        let (producer, dir) = match command {
            Some(cmd) => (Producer::Shell(cmd.to_string()), None),
            None => (source.producer.clone(), Some(".")),
        };
        let flags = FlagSet::from_words(source.selector_flags.iter().cloned())
            .merged(&FlagSet::parse(options));
        self.select(&producer, dir, flags, String::new())
    }

    /// Report configuration errors to the host and turn them into "nothing selected"
    fn settle<T>(&self, host: &mut dyn EditorHost, result: Result<Option<T>>) -> Result<Option<T>> {
        match result {
            Err(e) if e.is_config() => {
                warn!(error = %e, "Widget aborted");
                host.report_error(&e);
                Ok(None)
            }
            other => other,
        }
    }
}
