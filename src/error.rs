use thiserror::Error;

use backend_api::BackendApiError;
use command_tree::ConfigError;

/// Failure while constructing the orchestrator or its special nodes.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Backend(#[from] BackendApiError),
}

/// Failure reported synchronously for one run, before any dispatch.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("command '{name}' was not found")]
    CommandNotFound { name: String },

    #[error(transparent)]
    Backend(#[from] BackendApiError),
}
