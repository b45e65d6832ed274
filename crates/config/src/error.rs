use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ConfigError {
    /// Settings file could not be read.
    Io { path: PathBuf, message: String },
    /// Settings file is not valid TOML for the settings shape.
    Parse { path: Option<PathBuf>, message: String },
    /// Well-formed but semantically invalid.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "cannot read {}: {message}", path.display()),
            Self::Parse { path: Some(path), message } => {
                write!(f, "invalid settings in {}: {message}", path.display())
            }
            Self::Parse { path: None, message } => write!(f, "invalid settings: {message}"),
            Self::Invalid(message) => write!(f, "invalid settings: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {}
