//! Per-directory, composable LLM commands for editor hosts.
//!
//! Three subsystems compose here: `command_tree` maps filesystem locality to
//! command definitions, `prompt_compiler` turns templates plus host-resolved
//! variables into final text, and `backend_api` normalizes provider
//! streaming protocols into one cancellable event stream. The
//! [`Orchestrator`] wires them into a single `run` entry point.
//!
//! # Concurrency model
//! The core is single-logical-thread and cooperative: it issues async I/O on
//! the host's tokio runtime and resumes via events; no worker threads are
//! created beyond the per-run streaming task. Events for one run are always
//! delivered serially and in order.

pub mod builtin;
pub mod context;
pub mod error;
pub mod orchestrator;

pub use builtin::{builtin_node, BUILTIN_NODE_ID};
pub use context::{ContextProvider, CursorPosition, RunContext, SelectionRange};
pub use error::{RunError, SetupError};
pub use orchestrator::{CommandRef, Orchestrator, RunJob, RunState};

pub use backend_api::{
    AskOptions, BackendApiError, BackendClient, BackendProfile, BackendRegistry, EventHandler,
    FailureReason, ProviderFamily, StreamEvent,
};
pub use command_tree::{
    CommandDef, ConfigError, ConfigNode, ConfigTree, NodeData, OnAccept, Parameter,
    ReloadDebouncer, NODE_FILE_NAME,
};
pub use prompt_compiler::{find_variable_names, interpolate};
