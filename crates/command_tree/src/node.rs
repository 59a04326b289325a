use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::ConfigError;
use crate::schema::{CommandDoc, NodeDocument, OnAccept, ParameterDoc};

/// A validated command definition owned by one node.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandDef {
    pub id: String,
    pub name: Option<String>,
    pub system_prompt: Option<String>,
    pub prompt: String,
    pub parameters: BTreeMap<String, Parameter>,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    pub response_syntax: Option<String>,
    pub on_accept: OnAccept,
    /// Pretty-printed source JSON, kept for preview and debugging.
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    Static { default: Value },
    Requested { label: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectInfo {
    pub name: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentInfo {
    pub id: Option<String>,
    pub identity: Option<String>,
    pub domain: Option<String>,
    pub mission: Option<String>,
}

/// Validated payload of one node file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeData {
    pub root: bool,
    pub project: Option<ProjectInfo>,
    pub agent: Option<AgentInfo>,
    pub commands: BTreeMap<String, CommandDef>,
}

impl NodeData {
    /// Parses and validates one node document.
    ///
    /// `path` is used for error reporting only; no I/O happens here.
    pub fn parse(source: &str, path: &Path) -> Result<Self, ConfigError> {
        let value: Value =
            serde_json::from_str(source).map_err(|source| ConfigError::parse(path, source))?;
        let raw_commands: Vec<String> = value
            .get("commands")
            .and_then(Value::as_array)
            .map(|commands| {
                commands
                    .iter()
                    .map(|command| {
                        serde_json::to_string_pretty(command)
                            .unwrap_or_else(|_| command.to_string())
                    })
                    .collect()
            })
            .unwrap_or_default();
        let document: NodeDocument =
            serde_json::from_value(value).map_err(|source| ConfigError::parse(path, source))?;

        let mut commands = BTreeMap::new();
        for (index, doc) in document.commands.into_iter().enumerate() {
            let raw = raw_commands.get(index).cloned().unwrap_or_default();
            let command = validate_command(doc, raw, path)?;
            if commands.contains_key(&command.id) {
                return Err(ConfigError::DuplicateCommand {
                    path: path.to_path_buf(),
                    command: command.id,
                });
            }
            commands.insert(command.id.clone(), command);
        }

        Ok(Self {
            root: document.root,
            project: document.project.map(|project| ProjectInfo {
                name: project.name,
                icon: project.icon,
            }),
            agent: document.agent.map(|agent| AgentInfo {
                id: agent.id,
                identity: agent.identity,
                domain: agent.domain,
                mission: agent.mission,
            }),
            commands,
        })
    }
}

fn validate_command(doc: CommandDoc, raw: String, path: &Path) -> Result<CommandDef, ConfigError> {
    let prompt = doc.prompt.join();
    if prompt.trim().is_empty() {
        return Err(ConfigError::EmptyPrompt {
            path: path.to_path_buf(),
            command: doc.id,
        });
    }

    let temperature = doc.temperature.unwrap_or(0.7);
    if !(0.0..=1.0).contains(&temperature) {
        return Err(ConfigError::InvalidTemperature {
            path: path.to_path_buf(),
            command: doc.id,
            value: temperature,
        });
    }

    if doc.max_tokens == Some(0) {
        return Err(ConfigError::InvalidMaxTokens {
            path: path.to_path_buf(),
            command: doc.id,
        });
    }

    let parameters = doc
        .parameters
        .into_iter()
        .map(|(name, parameter)| {
            let parameter = match parameter {
                ParameterDoc::Static { default } => Parameter::Static { default },
                ParameterDoc::Requested { request } => Parameter::Requested { label: request },
            };
            (name, parameter)
        })
        .collect();

    Ok(CommandDef {
        id: doc.id,
        name: doc.name,
        system_prompt: doc.system_prompt.as_ref().map(|text| text.join()),
        prompt,
        parameters,
        temperature,
        max_tokens: doc.max_tokens,
        response_syntax: doc.response_syntax,
        on_accept: doc.on_accept.unwrap_or_default(),
        raw,
    })
}

/// Reads and validates the node file at `path`.
pub fn load_node_file(path: &Path) -> Result<NodeData, ConfigError> {
    let source = fs::read_to_string(path)
        .map_err(|source| ConfigError::io("reading node file", path, source))?;
    NodeData::parse(&source, path)
}

/// One configuration node tied to a directory.
///
/// `path` is the absolute node-file path and doubles as the node's identity.
/// `parent` and `children` are arena keys maintained by
/// [`crate::tree::ConfigTree`]; ownership never flows through them.
#[derive(Debug, Clone)]
pub struct ConfigNode {
    pub(crate) path: PathBuf,
    pub(crate) parent: Option<PathBuf>,
    pub(crate) children: Vec<PathBuf>,
    pub(crate) data: NodeData,
}

impl ConfigNode {
    #[must_use]
    pub fn new(path: PathBuf, data: NodeData) -> Self {
        Self {
            path,
            parent: None,
            children: Vec::new(),
            data,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory this node governs.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("/"))
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Path> {
        self.parent.as_deref()
    }

    #[must_use]
    pub fn children(&self) -> &[PathBuf] {
        &self.children
    }

    #[must_use]
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    #[must_use]
    pub fn command(&self, name: &str) -> Option<&CommandDef> {
        self.data.commands.get(name)
    }
}
