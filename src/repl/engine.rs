use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use reedline::{
    EditCommand, Emacs, FileBackedHistory, Keybindings, Reedline, ReedlineEvent, SearchDirection,
    SearchQuery, Signal, Vi, default_emacs_keybindings, default_vi_insert_keybindings,
    default_vi_normal_keybindings,
};
use tracing::{debug, warn};

use super::completer::PathCompleter;
use super::hinter::TriggerHinter;
use super::host::ReedlineHost;
use super::prompt::ShellPrompt;
use crate::bindings::{BindingTable, Widget};
use crate::completion::resolver::expand_tilde;
use crate::completion::token_stream::{Token, TokenKind, tokenize};
use crate::completion::{DispatchOutcome, Dispatcher, EditMode, HistoryEntry, LineBuffer};
use crate::config::Config;
use crate::error::{FzcompError, Result};

/// Prefix of the host commands the widget keys submit
const WIDGET_COMMAND: &str = "__fzcomp_widget ";

/// Interactive shell with the fzcomp widgets bound
pub struct ShellEngine {
    /// Line editor for command input
    editor: Reedline,

    /// Prompt showing the working directory
    prompt: ShellPrompt,

    /// Runs the widgets
    dispatcher: Dispatcher,

    /// Default completion
    completer: PathCompleter,

    /// Edit mode, decides how history selections are inserted
    mode: EditMode,

    /// Shell running the entered commands
    shell: String,

    /// Whether to continue running
    running: bool,
}

/// Bind every widget chord to its host command
fn bind_widgets(keybindings: &mut Keybindings, bindings: &BindingTable) {
    for (widget, chord) in bindings.iter() {
        let (modifiers, code) = chord.to_reedline();
        keybindings.add_binding(
            modifiers,
            code,
            ReedlineEvent::ExecuteHostCommand(format!("{}{}", WIDGET_COMMAND, widget.name())),
        );
    }
}

/// Target of a plain `cd` or `builtin cd` command line, `None` if it is
/// something else
fn cd_target(line: &str) -> Option<Option<String>> {
    let tokens = tokenize(line);
    if tokens.iter().any(|t| t.kind == TokenKind::Operator) {
        return None;
    }
    let words: Vec<String> = tokens.iter().map(Token::unquoted).collect();
    let args = match words.as_slice() {
        [cd, rest @ ..] if cd == "cd" => rest,
        [builtin, cd, rest @ ..] if builtin == "builtin" && cd == "cd" => rest,
        _ => return None,
    };
    Some(args.iter().find(|a| *a != "--").cloned())
}

impl ShellEngine {
    /// Create a new shell engine
    ///
    /// # Arguments
    /// * `config` - Effective configuration
    /// * `cwd` - Starting directory
    /// * `color` - Whether to style the prompt
    ///
    /// # Returns
    /// * `Result<Self>` - New engine or error
    pub fn new(config: &Config, cwd: PathBuf, color: bool) -> Result<Self> {
        let bindings = BindingTable::from_config(&config.keybindings)?;
        let dispatcher = Dispatcher::from_config(config, &cwd)?;

        if let Some(parent) = config.shell.history_file.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(error = %e, path = %parent.display(), "Cannot create history directory");
            }
        }
        let history = FileBackedHistory::with_file(
            config.shell.history_size,
            config.shell.history_file.clone(),
        )
        .map_err(|e| FzcompError::Generic(format!("Failed to open history: {}", e)))?;

        let edit_mode: Box<dyn reedline::EditMode> = match config.shell.edit_mode {
            EditMode::Emacs => {
                let mut keybindings = default_emacs_keybindings();
                bind_widgets(&mut keybindings, &bindings);
                Box::new(Emacs::new(keybindings))
            }
            EditMode::Vi => {
                let mut insert = default_vi_insert_keybindings();
                bind_widgets(&mut insert, &bindings);
                Box::new(Vi::new(insert, default_vi_normal_keybindings()))
            }
        };

        let hinter = TriggerHinter::new(dispatcher.registry().clone(), dispatcher.trigger());

        let editor = Reedline::create()
            .with_history(Box::new(history))
            .with_edit_mode(edit_mode)
            .with_hinter(Box::new(hinter));

        Ok(Self {
            editor,
            prompt: ShellPrompt::new(&cwd, color),
            completer: PathCompleter::new(&cwd),
            dispatcher,
            mode: config.shell.edit_mode,
            shell: std::env::var("SHELL").unwrap_or_else(|_| "sh".to_string()),
            running: true,
        })
    }

    /// Read and run lines until end of input or `exit`
    pub fn run(&mut self) -> Result<()> {
        while self.running {
            let signal = self
                .editor
                .read_line(&self.prompt)
                .map_err(|e| FzcompError::Generic(format!("Read error: {}", e)))?;

            match signal {
                Signal::Success(line) => match line.strip_prefix(WIDGET_COMMAND) {
                    Some(name) => self.run_widget(name),
                    None => self.execute(&line),
                },
                Signal::CtrlD => break,
                _ => continue,
            }
        }

        Ok(())
    }

    /// History entries, oldest first, numbered from 1
    fn history_entries(&self) -> Vec<HistoryEntry> {
        match self
            .editor
            .history()
            .search(SearchQuery::everything(SearchDirection::Forward, None))
        {
            Ok(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| HistoryEntry::new(i + 1, item.command_line))
                .collect(),
            Err(e) => {
                warn!(error = %e, "Cannot read history");
                Vec::new()
            }
        }
    }

    /// Run the widget a key press asked for and write the buffer back
    fn run_widget(&mut self, name: &str) {
        let Some(widget) = Widget::from_name(name) else {
            warn!(name, "Unknown widget");
            return;
        };

        let line = self.editor.current_buffer_contents().to_string();
        let pos = self.editor.current_insertion_point().min(line.len());
        let (left, right) = match (line.get(..pos), line.get(pos..)) {
            (Some(left), Some(right)) => (left, right),
            _ => (line.as_str(), ""),
        };
        let mut buffer = LineBuffer::new(left, right);

        let history = match widget {
            Widget::History => self.history_entries(),
            _ => Vec::new(),
        };
        let mut host = ReedlineHost::new(&mut self.completer, &history);

        let outcome = match widget {
            Widget::Complete => self.dispatcher.complete(&mut host, &mut buffer),
            Widget::InsertPath => self.dispatcher.insert_paths(&mut host, &mut buffer),
            Widget::ChangeDirectory => self.dispatcher.change_directory(&mut host, &mut buffer),
            Widget::History => self
                .dispatcher
                .history(&mut host, &mut buffer, &history, self.mode),
        };
        debug!(widget = %widget, outcome = ?outcome, "Widget finished");

        match outcome {
            Ok(DispatchOutcome::Cancelled) => {}
            Ok(DispatchOutcome::Execute(command)) => self.execute(&command),
            Ok(_) => self.set_buffer(&buffer),
            Err(e) => eprintln!("fzcomp: {}", e),
        }
    }

    /// Replace the editor buffer, cursor at the end of the left part
    fn set_buffer(&mut self, buffer: &LineBuffer) {
        self.editor.run_edit_commands(&[
            EditCommand::Clear,
            EditCommand::InsertString(format!("{}{}", buffer.left, buffer.right)),
            EditCommand::MoveToPosition {
                position: buffer.left.len(),
                select: false,
            },
        ]);
    }

    /// Run an entered command line
    fn execute(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        if line == "exit" {
            self.running = false;
            return;
        }

        if let Some(target) = cd_target(line) {
            self.change_directory(target);
            return;
        }

        debug!(command = %line, shell = %self.shell, "Running command");
        match Command::new(&self.shell).arg("-c").arg(line).status() {
            Ok(status) if !status.success() => debug!(status = %status, "Command failed"),
            Ok(_) => {}
            Err(e) => eprintln!("fzcomp: cannot run {}: {}", self.shell, e),
        }
    }

    /// `cd` runs in-process so the shell and the widgets follow it
    fn change_directory(&mut self, target: Option<String>) {
        let target = match target {
            Some(t) => PathBuf::from(expand_tilde(&t)),
            None => match dirs::home_dir() {
                Some(home) => home,
                None => return,
            },
        };

        if let Err(e) = std::env::set_current_dir(&target) {
            eprintln!("cd: {}: {}", target.display(), e);
            return;
        }

        let cwd = std::env::current_dir().unwrap_or(target);
        self.moved_to(&cwd);
    }

    fn moved_to(&mut self, cwd: &Path) {
        debug!(cwd = %cwd.display(), "Changed directory");
        self.dispatcher.set_cwd(cwd);
        self.completer.set_cwd(cwd);
        self.prompt.set_cwd(cwd);
    }
}
