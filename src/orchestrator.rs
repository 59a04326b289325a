//! End-to-end run composition: resolve, compile, dispatch.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, warn};

use backend_api::{
    AskOptions, BackendClient, BackendRegistry, EventHandler, StreamEvent,
};
use command_tree::{
    discover_into, load_node_file, CommandDef, ConfigTree, NodeData, Parameter, ReloadDebouncer,
};
use prompt_compiler::{find_variable_names, interpolate};

use crate::builtin::{builtin_node, BUILTIN_NODE_ID};
use crate::context::{ContextProvider, RunContext};
use crate::error::{RunError, SetupError};

/// Reference to a command by id, optionally pinned to a specific node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRef {
    pub name: String,
    /// Node-file path to resolve against. When absent, resolution uses the
    /// node chain governing the run context's file.
    pub node: Option<PathBuf>,
}

impl CommandRef {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node: None,
        }
    }

    #[must_use]
    pub fn at_node(name: impl Into<String>, node: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            node: Some(node.into()),
        }
    }
}

/// Per-run lifecycle state.
///
/// `Resolving -> Compiling -> Streaming -> {Done | Cancelled | Errored}`;
/// the three right-hand states are terminal and mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Resolving,
    Compiling,
    Streaming,
    Done,
    Cancelled,
    Errored,
}

impl RunState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::Errored)
    }
}

/// Handle to one dispatched run.
#[derive(Debug)]
pub struct RunJob {
    inner: backend_api::Job,
    state: Arc<Mutex<RunState>>,
}

impl RunJob {
    #[must_use]
    pub fn state(&self) -> RunState {
        *lock_unpoisoned(&self.state)
    }

    /// Cancels the underlying backend job. The run terminates through its
    /// event stream with the reserved cancellation reason.
    pub fn shutdown(&self) {
        self.inner.cancel();
    }

    /// Waits for the run's terminal event to be delivered.
    pub async fn join(self) {
        self.inner.join().await;
    }
}

#[derive(Debug)]
struct SpecialNode {
    id: String,
    data: NodeData,
}

/// Special nodes plus the directory tree, resolved together.
///
/// Special nodes are never attached to the tree and are always consulted
/// first, so built-in commands keep working with an empty or broken tree.
/// Same-named commands shadow by locality; definitions are never merged.
#[derive(Debug)]
struct ConfigSet {
    special: Vec<SpecialNode>,
    tree: ConfigTree,
}

impl ConfigSet {
    fn resolve(&self, reference: &CommandRef, file: Option<&Path>) -> Option<&CommandDef> {
        for special in &self.special {
            if let Some(command) = special.data.commands.get(&reference.name) {
                return Some(command);
            }
        }

        if let Some(node) = &reference.node {
            return self
                .tree
                .ancestor_chain(node)
                .into_iter()
                .find_map(|node| node.command(&reference.name));
        }

        let file = file?;
        self.tree
            .find_path_to_file(file)
            .into_iter()
            .find_map(|node| node.command(&reference.name))
    }
}

/// Explicit composition root: configuration set, backend client, and the
/// debounced reload path. One instance per host; no global state.
pub struct Orchestrator {
    config: Arc<Mutex<ConfigSet>>,
    client: BackendClient,
    debouncer: ReloadDebouncer,
}

impl Orchestrator {
    pub fn new(registry: BackendRegistry) -> Result<Self, SetupError> {
        let client = BackendClient::new(registry)?;
        let special = vec![SpecialNode {
            id: BUILTIN_NODE_ID.to_owned(),
            data: builtin_node()?,
        }];

        Ok(Self {
            config: Arc::new(Mutex::new(ConfigSet {
                special,
                tree: ConfigTree::new(),
            })),
            client,
            debouncer: ReloadDebouncer::default(),
        })
    }

    /// Loads a user-level node file as a special node consulted before the
    /// built-in defaults.
    pub fn with_user_config(self, path: &Path) -> Result<Self, SetupError> {
        let data = load_node_file(path)?;
        {
            let mut config = lock_unpoisoned(&self.config);
            config.special.insert(
                0,
                SpecialNode {
                    id: path.display().to_string(),
                    data,
                },
            );
        }
        Ok(self)
    }

    #[must_use]
    pub fn with_reload_delay(mut self, delay: Duration) -> Self {
        self.debouncer = ReloadDebouncer::new(delay);
        self
    }

    /// Discovers the node chain governing `file` and adds it to the tree.
    /// Returns the nearest node-file path, when one was found.
    pub fn attach_file(&self, file: &Path) -> Option<PathBuf> {
        self.attach_dir(file.parent()?)
    }

    /// Discovers the node chain for `dir` and adds it to the tree.
    pub fn attach_dir(&self, dir: &Path) -> Option<PathBuf> {
        let mut config = lock_unpoisoned(&self.config);
        discover_into(&mut config.tree, dir)
    }

    /// Node-file paths governing `file`, nearest ancestor first.
    #[must_use]
    pub fn node_chain_for(&self, file: &Path) -> Vec<PathBuf> {
        let config = lock_unpoisoned(&self.config);
        config
            .tree
            .find_path_to_file(file)
            .into_iter()
            .map(|node| node.path().to_path_buf())
            .collect()
    }

    /// Debounced reaction to a file-change notification for a node file.
    ///
    /// Rapid successive notifications coalesce; the eventual reload reads
    /// the latest on-disk content. A file that no longer parses is skipped
    /// with a warning and the node keeps its previous data.
    pub fn notify_changed(&self, path: PathBuf) {
        let config = self.config.clone();
        self.debouncer.notify(path, move |path| {
            match load_node_file(path) {
                Ok(data) => {
                    let mut config = lock_unpoisoned(&config);
                    config.tree.add(path.to_path_buf(), data);
                    debug!(path = %path.display(), "reloaded node file");
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "keeping previous node data");
                }
            }
        });
    }

    /// Cancels all pending reloads.
    pub fn shutdown(&self) {
        self.debouncer.stop_all();
    }

    /// Resolves, compiles, and dispatches one command run.
    ///
    /// An unresolved command fails synchronously with
    /// [`RunError::CommandNotFound`] before any dispatch. Only variable
    /// names actually referenced by the command's templates (plus its
    /// interactively requested parameters) are handed to `provider`; unused
    /// context is never computed. The backend's event contract is forwarded
    /// to `on_event` unchanged.
    pub fn run(
        &self,
        reference: &CommandRef,
        context: &RunContext,
        provider: &dyn ContextProvider,
        on_event: EventHandler,
    ) -> Result<RunJob, RunError> {
        let state = Arc::new(Mutex::new(RunState::Resolving));
        let command = {
            let config = lock_unpoisoned(&self.config);
            config
                .resolve(reference, context.file.as_deref())
                .cloned()
        }
        .ok_or_else(|| RunError::CommandNotFound {
            name: reference.name.clone(),
        })?;

        *lock_unpoisoned(&state) = RunState::Compiling;
        let names = referenced_names(&command);
        let mut values = provider.get_metadata(&names, context);
        for (name, parameter) in &command.parameters {
            if let Parameter::Static { default } = parameter {
                values.entry(name.clone()).or_insert_with(|| default.clone());
            }
        }
        let prompt = interpolate(&command.prompt, &values);
        let system = command
            .system_prompt
            .as_deref()
            .map(|text| interpolate(text, &values));

        let opts = AskOptions {
            backend: None,
            model: None,
            system,
            prompt,
            temperature: Some(command.temperature),
            max_tokens: command.max_tokens,
        };

        *lock_unpoisoned(&state) = RunState::Streaming;
        let job_state = state.clone();
        let mut on_event = on_event;
        let wrapped: EventHandler = Box::new(move |event: StreamEvent| {
            if let Some(terminal) = terminal_state(&event) {
                *lock_unpoisoned(&job_state) = terminal;
            }
            on_event(event);
        });
        let inner = self.client.ask(opts, wrapped)?;
        debug!(command = %command.id, "dispatched run");

        Ok(RunJob { inner, state })
    }
}

/// Variable names this command can consume: template placeholders in first
/// appearance order, then any interactively requested parameters.
fn referenced_names(command: &CommandDef) -> Vec<String> {
    let mut names = find_variable_names(&command.prompt);
    if let Some(system) = &command.system_prompt {
        for name in find_variable_names(system) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    for (name, parameter) in &command.parameters {
        if matches!(parameter, Parameter::Requested { .. }) && !names.contains(name) {
            names.push(name.clone());
        }
    }
    names
}

fn terminal_state(event: &StreamEvent) -> Option<RunState> {
    match event {
        StreamEvent::Completed { .. } => Some(RunState::Done),
        StreamEvent::Failed { reason } if reason.is_cancelled() => Some(RunState::Cancelled),
        StreamEvent::Failed { .. } => Some(RunState::Errored),
        _ => None,
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
