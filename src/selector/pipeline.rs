//! Candidate producers
//!
//! A producer is a child process whose stdout becomes the selector's stdin.
//! Built-in producers re-run this executable (`fzcomp compgen <kind>`), user
//! commands run through the user's shell. Pre-computed candidate lists (shell
//! history) are handed over through a temporary file instead.

use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use std::{env, io};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::completion::quoting::quote;
use crate::completion::registry::Producer;
use crate::error::{ConfigError, FzcompError, Result, SelectorError};

/// Exit status shells use for "command not found"
const COMMAND_NOT_FOUND: i32 = 127;

/// Statuses above this mean the shell's child was killed by a signal
const SIGNAL_STATUS_BASE: i32 = 128;

/// How long a finished selector waits for its producer to exit on its own
const EXIT_GRACE: Duration = Duration::from_millis(100);

/// Interval between exit checks during the grace period
const EXIT_POLL: Duration = Duration::from_millis(5);

/// Spawns producers in a working directory
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Executable implementing the `compgen` sub-command
    program: PathBuf,
    /// Shell used to run producer commands
    shell: String,
    /// Working directory of spawned producers
    cwd: PathBuf,
}

impl Pipeline {
    /// Create a pipeline running producers in `cwd`
    ///
    /// The shell is taken from `$SHELL`, falling back to `sh`.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        let program = env::current_exe().unwrap_or_else(|_| PathBuf::from("fzcomp"));
        let shell = env::var("SHELL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "sh".to_string());

        Self {
            program,
            shell,
            cwd: cwd.into(),
        }
    }

    /// Use another executable for built-in producers
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Use another shell for producer commands
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Run future producers in `cwd`
    pub fn set_cwd(&mut self, cwd: impl Into<PathBuf>) {
        self.cwd = cwd.into();
    }

    /// Shell command line for a producer command.
    ///
    /// `{dir}` is replaced by the quoted directory; without the placeholder
    /// the directory is appended as the last argument.
    pub fn shell_command(command: &str, dir: Option<&str>) -> String {
        match dir {
            Some(dir) if command.contains("{dir}") => command.replace("{dir}", &quote(dir)),
            Some(dir) => format!("{command} {}", quote(dir)),
            None => command.to_string(),
        }
    }

    /// Start a producer
    ///
    /// # Arguments
    /// * `producer` - What to run
    /// * `dir` - Directory to list, for path based sources
    ///
    /// # Returns
    /// * `Result<CandidateStream>` - The running producer
    pub fn spawn(&self, producer: &Producer, dir: Option<&str>) -> Result<CandidateStream> {
        let (mut command, shown) = match producer {
            Producer::Shell(cmd) => {
                let line = Self::shell_command(cmd, dir);
                let mut command = Command::new(&self.shell);
                command.arg("-c").arg(&line);
                (command, line)
            }
            builtin => {
                let kind = builtin.compgen_kind().unwrap_or("path");
                let mut command = Command::new(&self.program);
                command.arg("compgen").arg(kind);
                if let Some(dir) = dir {
                    command.arg(dir);
                }
                (command, format!("compgen {kind}"))
            }
        };

        debug!(producer = %shown, shell = %self.shell, "Spawning candidate producer");

        let child = command
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => {
                    FzcompError::from(ConfigError::ProducerNotFound(shown.clone()))
                }
                _ => SelectorError::SpawnFailed(format!("{shown}: {e}")).into(),
            })?;

        Ok(CandidateStream::Process(ProducerProcess {
            child,
            command: shown,
        }))
    }

    /// Hand a pre-computed list of lines to the selector
    pub fn channel<I, S>(&self, lines: I) -> Result<CandidateStream>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut file = NamedTempFile::new()?;
        for line in lines {
            writeln!(file, "{}", line.as_ref())?;
        }
        file.flush()?;
        Ok(CandidateStream::Channel(file))
    }
}

/// A running producer process
#[derive(Debug)]
pub struct ProducerProcess {
    child: Child,
    command: String,
}

impl Drop for ProducerProcess {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Candidate lines on their way to the selector
#[derive(Debug)]
pub enum CandidateStream {
    /// Output of a producer process
    Process(ProducerProcess),
    /// Lines stored in a temporary file
    Channel(NamedTempFile),
    /// No candidates
    Empty,
}

impl CandidateStream {
    /// Stdin for the selector process
    pub fn stdin(&mut self) -> Result<Stdio> {
        match self {
            CandidateStream::Process(process) => Ok(process
                .child
                .stdout
                .take()
                .map(Stdio::from)
                .unwrap_or_else(Stdio::null)),
            CandidateStream::Channel(file) => Ok(Stdio::from(file.reopen()?)),
            CandidateStream::Empty => Ok(Stdio::null()),
        }
    }

    /// Read every candidate line in-process, stripping carriage returns
    pub fn read_lines(&mut self) -> Result<Vec<String>> {
        let reader: Box<dyn io::Read> = match self {
            CandidateStream::Process(process) => match process.child.stdout.take() {
                Some(stdout) => Box::new(stdout),
                None => return Ok(Vec::new()),
            },
            CandidateStream::Channel(file) => Box::new(file.reopen()?),
            CandidateStream::Empty => return Ok(Vec::new()),
        };

        let mut lines = Vec::new();
        for line in BufReader::new(reader).lines() {
            let line = line.map_err(|e| SelectorError::OutputUnreadable(e.to_string()))?;
            lines.push(line.trim_end_matches('\r').to_string());
        }
        Ok(lines)
    }

    /// Release the producer once the selector is done with it.
    ///
    /// A producer that is still running is killed and reaped. A producer that
    /// exited with status 127 means its command does not exist.
    ///
    /// # Returns
    /// * `Result<bool>` - Whether the candidates stand; `false` when the
    ///   producer failed with a non-zero status. Termination by a signal
    ///   (a closed pipe once the selector is gone) counts as success.
    pub fn finish(&mut self) -> Result<bool> {
        let CandidateStream::Process(process) = self else {
            return Ok(true);
        };

        let deadline = Instant::now() + EXIT_GRACE;
        let mut status = process.child.try_wait()?;
        while status.is_none() && Instant::now() < deadline {
            thread::sleep(EXIT_POLL);
            status = process.child.try_wait()?;
        }

        let Some(status) = status else {
            debug!(producer = %process.command, "Stopping candidate producer");
            let _ = process.child.kill();
            process.child.wait()?;
            return Ok(true);
        };

        match status.code() {
            Some(COMMAND_NOT_FOUND) => {
                warn!(producer = %process.command, "Candidate producer not found");
                Err(ConfigError::ProducerNotFound(process.command.clone()).into())
            }
            Some(0) | None => Ok(true),
            // shells report a signal as 128 + signal number
            Some(code) if code > SIGNAL_STATUS_BASE => Ok(true),
            Some(code) => {
                debug!(producer = %process.command, code, "Candidate producer failed");
                Ok(false)
            }
        }
    }
}
