//! Command-line interface for fzcomp
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and validation
//! - Subcommands: shell integration scripts, widget invocations, built-in
//!   producers and configuration inspection

pub mod init;
pub mod widget;

use clap::{Parser, Subcommand};
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use crate::bindings::{BindingTable, Widget};
use crate::completion::compgen::{self, CompgenKind};
use crate::completion::{Dispatcher, EditMode, HistoryEntry, HistoryWidget, LineBuffer};
use crate::config::Config;
use crate::error::Result;

pub use init::{InitShell, init_script};
pub use widget::{ScriptHost, WidgetReply, WidgetStatus, run_widget};

/// fzcomp - fuzzy completion for line-editing shells
#[derive(Parser, Debug)]
#[command(
    name = "fzcomp",
    version,
    about = "Fuzzy completion front-end for zsh, bash and a built-in shell",
    long_about = "Turns a completion key press into a fuzzy selection over files, directories,
processes, hosts or any command's output, and writes the choice back into the command line."
)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Quiet mode (errors only)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,

    /// Selector executable
    #[arg(long, value_name = "BINARY")]
    pub selector: Option<String>,

    /// Completion trigger
    #[arg(long, value_name = "TRIGGER", allow_hyphen_values = true)]
    pub trigger: Option<String>,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl CliArgs {
    /// Whether this is a widget invocation from a shell script
    pub fn is_widget(&self) -> bool {
        matches!(self.command, Some(Commands::Widget { .. }))
    }
}

/// Subcommands for fzcomp
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the integration script for a shell
    Init {
        #[arg(value_enum, value_name = "SHELL")]
        shell: InitShell,
    },

    /// Run one widget for a shell script
    Widget {
        #[arg(value_enum)]
        widget: Widget,

        /// Text left of the cursor
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        lbuffer: String,

        /// Text right of the cursor
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        rbuffer: String,

        /// Edit mode of the shell
        #[arg(long, value_enum, default_value_t = EditMode::Emacs)]
        mode: EditMode,
    },

    /// Write built-in candidates to stdout
    Compgen {
        #[arg(value_enum)]
        kind: CompgenKind,

        /// Directory to list
        #[arg(value_name = "DIR")]
        dir: Option<PathBuf>,
    },

    /// Start the built-in interactive shell
    Shell,

    /// Show configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration file
        #[arg(long)]
        validate: bool,
    },

    /// Show version information
    Version,
}

/// CLI interface handler
#[derive(Debug)]
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded configuration
    config: Config,
}

impl CliInterface {
    /// Create a new CLI interface from the process arguments
    ///
    /// # Returns
    /// * `Result<Self>` - New CLI interface or error
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Create a CLI interface from parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Self::load_config(&args)?;
        Ok(Self { args, config })
    }

    /// Load configuration from file, environment and arguments
    ///
    /// # Arguments
    /// * `args` - Command-line arguments
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    fn load_config(args: &CliArgs) -> Result<Config> {
        let inspecting = matches!(args.command, Some(Commands::Config { .. }));

        let loaded = Config::load_from_file(args.config_file.as_deref()).and_then(|mut config| {
            config.apply_env()?;
            Ok(config)
        });

        let mut config = match loaded {
            Ok(config) => config,
            // `config --validate` reports the problem itself
            Err(e) if inspecting => {
                eprintln!("Warning: Failed to load configuration: {}", e);
                eprintln!("Using default configuration instead.");
                Config::default()
            }
            Err(e) => return Err(e),
        };

        // Apply CLI arguments to override config values
        Self::apply_args_to_config(&mut config, args);

        if !inspecting {
            config.validate()?;
        }

        Ok(config)
    }

    /// Get the configuration
    ///
    /// # Returns
    /// * `&Config` - Reference to configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the CLI arguments
    ///
    /// # Returns
    /// * `&CliArgs` - Reference to arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Apply CLI arguments to configuration
    ///
    /// # Arguments
    /// * `config` - Configuration to modify
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        Self::apply_selector_args(config, args);
        Self::apply_logging_args(config, args);
    }

    /// Apply selector and trigger arguments to configuration
    fn apply_selector_args(config: &mut Config, args: &CliArgs) {
        if let Some(selector) = &args.selector {
            config.selector.binary = selector.clone();
        }

        if let Some(trigger) = &args.trigger {
            config.completion.trigger = trigger.clone();
        }
    }

    /// Apply logging-related CLI arguments to configuration
    fn apply_logging_args(config: &mut Config, args: &CliArgs) {
        use crate::config::LogLevel;

        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };
    }

    /// Handle subcommands
    ///
    /// # Returns
    /// * `Result<Option<i32>>` - Exit status if a subcommand was handled,
    ///   `None` to start the interactive shell
    pub fn handle_subcommand(&self) -> Result<Option<i32>> {
        match &self.args.command {
            Some(Commands::Init { shell }) => {
                self.print_init_script(*shell)?;
                Ok(Some(0))
            }
            Some(Commands::Widget {
                widget,
                lbuffer,
                rbuffer,
                mode,
            }) => self
                .run_widget(*widget, LineBuffer::new(lbuffer, rbuffer), *mode)
                .map(Some),
            Some(Commands::Compgen { kind, dir }) => {
                Self::run_compgen(*kind, dir.as_deref())?;
                Ok(Some(0))
            }
            Some(Commands::Config { show, validate }) => {
                self.handle_config_command(*show, *validate)?;
                Ok(Some(0))
            }
            Some(Commands::Version) => {
                self.show_version();
                Ok(Some(0))
            }
            Some(Commands::Shell) | None => Ok(None),
        }
    }

    /// Print the integration script for `shell`
    fn print_init_script(&self, shell: InitShell) -> Result<()> {
        let bindings = BindingTable::from_config(&self.config.keybindings)?;
        let program = std::env::current_exe()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "fzcomp".to_string());

        print!("{}", init_script(shell, &bindings, &program));
        io::stdout().flush()?;
        Ok(())
    }

    /// Run a widget and write its reply for the calling shell
    ///
    /// # Returns
    /// * `Result<i32>` - Widget exit status
    fn run_widget(&self, widget: Widget, buffer: LineBuffer, mode: EditMode) -> Result<i32> {
        let cwd = std::env::current_dir()?;
        let dispatcher = match Dispatcher::from_config(&self.config, &cwd) {
            Ok(dispatcher) => dispatcher,
            Err(e) if e.is_config() => {
                eprintln!("fzcomp: {}", e);
                return Ok(WidgetStatus::ConfigError.code());
            }
            Err(e) => return Err(e),
        };

        let history = if widget == Widget::History {
            Self::read_history()?
        } else {
            Vec::new()
        };

        let reply = run_widget(&dispatcher, widget, buffer, mode, &history)?;
        if let Some(output) = &reply.output {
            let mut stdout = io::stdout().lock();
            stdout.write_all(output.as_bytes())?;
            stdout.flush()?;
        }

        Ok(reply.status.code())
    }

    /// History listing piped in by the shell
    fn read_history() -> Result<Vec<HistoryEntry>> {
        let mut stdin = io::stdin();
        if stdin.is_terminal() {
            return Ok(Vec::new());
        }

        let mut raw = Vec::new();
        stdin.read_to_end(&mut raw)?;
        Ok(HistoryWidget::parse_listing(&String::from_utf8_lossy(&raw)))
    }

    /// Stream built-in candidates to stdout.
    ///
    /// A selector that exits early closes the pipe; that is not an error.
    fn run_compgen(kind: CompgenKind, dir: Option<&Path>) -> Result<()> {
        let mut out = io::BufWriter::new(io::stdout().lock());

        match compgen::run(kind, dir, &mut out).and_then(|_| out.flush()) {
            Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Show version information
    fn show_version(&self) {
        println!("fzcomp version {}", env!("CARGO_PKG_VERSION"));
        println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
    }

    /// Handle config subcommand
    ///
    /// # Arguments
    /// * `show` - Whether to show configuration
    /// * `validate` - Whether to validate configuration
    ///
    /// # Returns
    /// * `Result<()>` - Success or error
    fn handle_config_command(&self, show: bool, validate: bool) -> Result<()> {
        if validate {
            self.validate_config_file();
        }

        if show || !validate {
            self.show_config()?;
        }

        Ok(())
    }

    /// Validate configuration file
    fn validate_config_file(&self) {
        let path = self.get_config_path();
        println!("Validating configuration file: {}", path.display());

        if !path.exists() {
            println!("❌ Configuration file does not exist");
            return;
        }

        let loaded = Config::load_from_file(Some(&path)).and_then(|mut config| {
            config.apply_env()?;
            Ok(config)
        });
        match loaded {
            Ok(config) => match config.validate() {
                Ok(_) => println!("✅ Configuration is valid"),
                Err(e) => println!("❌ Configuration validation failed: {}", e),
            },
            Err(e) => println!("❌ Failed to load configuration: {}", e),
        }
    }

    /// Show effective configuration
    fn show_config(&self) -> Result<()> {
        let path = self.get_config_path();
        println!("Configuration file: {}", path.display());
        println!();
        println!("=== Effective Configuration ===");
        println!();

        match self.config.to_toml_with_comments() {
            Ok(toml_str) => println!("{}", toml_str),
            Err(e) => {
                eprintln!("Error formatting configuration: {}", e);
                println!("{:#?}", self.config);
            }
        }

        Ok(())
    }

    /// Get configuration file path (from args or default)
    pub fn get_config_path(&self) -> PathBuf {
        self.args
            .config_file
            .clone()
            .unwrap_or_else(Config::default_config_path)
    }
}
