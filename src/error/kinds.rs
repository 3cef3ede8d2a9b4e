use std::{fmt, io};

/// Crate-wide `Result` type using [`FzcompError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, FzcompError>;

/// Top-level error type for fzcomp operations.
#[derive(Debug)]
pub enum FzcompError {
    /// Configuration errors.
    Config(ConfigError),

    /// Selector invocation errors.
    Selector(SelectorError),

    /// I/O errors.
    Io(io::Error),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },

    /// The selector executable could not be started.
    SelectorNotFound(String),

    /// A candidate producer command does not exist.
    ProducerNotFound(String),

    /// Generic configuration problem.
    Generic(String),
}

/// Errors raised while talking to the selector process.
#[derive(Debug)]
pub enum SelectorError {
    /// Spawning the selector or its producer failed for a reason other than
    /// a missing executable.
    SpawnFailed(String),

    /// The selector's output could not be read.
    OutputUnreadable(String),
}

impl FzcompError {
    /// Whether this error belongs to the configuration class.
    ///
    /// Configuration errors abort the triggering request and are surfaced to
    /// the user; the host falls back to its default behaviour afterwards.
    pub fn is_config(&self) -> bool {
        matches!(self, FzcompError::Config(_))
    }
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for FzcompError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FzcompError::Config(e) => write!(f, "Configuration error: {e}"),
            FzcompError::Selector(e) => write!(f, "Selector error: {e}"),
            FzcompError::Io(e) => write!(f, "I/O error: {e}"),
            FzcompError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
            ConfigError::SelectorNotFound(binary) => {
                write!(f, "Selector '{binary}' not found in PATH")
            }
            ConfigError::ProducerNotFound(cmd) => {
                write!(f, "Candidate command not found: {cmd}")
            }
            ConfigError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorError::SpawnFailed(msg) => write!(f, "Failed to start: {msg}"),
            SelectorError::OutputUnreadable(msg) => write!(f, "Unreadable output: {msg}"),
        }
    }
}

impl std::error::Error for FzcompError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for SelectorError {}

/* ========================= Conversions to FzcompError ========================= */

impl From<io::Error> for FzcompError {
    fn from(err: io::Error) -> Self {
        FzcompError::Io(err)
    }
}

impl From<ConfigError> for FzcompError {
    fn from(err: ConfigError) -> Self {
        FzcompError::Config(err)
    }
}

impl From<SelectorError> for FzcompError {
    fn from(err: SelectorError) -> Self {
        FzcompError::Selector(err)
    }
}

impl From<toml::de::Error> for FzcompError {
    fn from(err: toml::de::Error) -> Self {
        FzcompError::Config(ConfigError::InvalidFormat(err.to_string()))
    }
}

impl From<toml::ser::Error> for FzcompError {
    fn from(err: toml::ser::Error) -> Self {
        FzcompError::Generic(format!("Failed to serialize configuration: {err}"))
    }
}

impl From<String> for FzcompError {
    fn from(msg: String) -> Self {
        FzcompError::Generic(msg)
    }
}

impl From<&str> for FzcompError {
    fn from(msg: &str) -> Self {
        FzcompError::Generic(msg.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_classified() {
        let err: FzcompError = ConfigError::SelectorNotFound("sk".to_string()).into();
        assert!(err.is_config());
        assert_eq!(
            err.to_string(),
            "Configuration error: Selector 'sk' not found in PATH"
        );
    }

    #[test]
    fn test_other_errors_are_not_config() {
        let err: FzcompError = SelectorError::SpawnFailed("boom".to_string()).into();
        assert!(!err.is_config());

        let err: FzcompError = io::Error::other("disk").into();
        assert!(!err.is_config());
    }

    #[test]
    fn test_invalid_value_display() {
        let err = ConfigError::InvalidValue {
            field: "completion.trigger".to_string(),
            value: "* *".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value '* *' for field 'completion.trigger'"
        );
    }
}
