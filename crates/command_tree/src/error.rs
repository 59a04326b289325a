use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse node document at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("command '{command}' in {path} has an empty prompt")]
    EmptyPrompt { path: PathBuf, command: String },

    #[error("command '{command}' in {path} duplicates an id used earlier in the document")]
    DuplicateCommand { path: PathBuf, command: String },

    #[error("command '{command}' in {path} has temperature {value} outside [0, 1]")]
    InvalidTemperature {
        path: PathBuf,
        command: String,
        value: f64,
    },

    #[error("command '{command}' in {path} has max_tokens 0; it must be positive")]
    InvalidMaxTokens { path: PathBuf, command: String },
}

impl ConfigError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }
}
