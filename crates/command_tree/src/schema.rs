//! Serde document types for one on-disk node file.
//!
//! Validation and conversion into domain types happens in [`crate::node`];
//! this module only mirrors the wire shape.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

/// File name looked up in each directory during discovery.
pub const NODE_FILE_NAME: &str = ".deck.json";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeDocument {
    /// Stops upward scanning during discovery when true.
    #[serde(default)]
    pub root: bool,
    #[serde(default)]
    pub project: Option<ProjectDoc>,
    #[serde(default)]
    pub agent: Option<AgentDoc>,
    #[serde(default)]
    pub commands: Vec<CommandDoc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectDoc {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentDoc {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub mission: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandDoc {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<StringOrLines>,
    pub prompt: StringOrLines,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterDoc>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub response_syntax: Option<String>,
    #[serde(default)]
    pub on_accept: Option<OnAccept>,
}

/// Prompt text given either as one string or as an array of lines.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StringOrLines {
    One(String),
    Lines(Vec<String>),
}

impl StringOrLines {
    /// Joins array-of-lines form with newlines.
    #[must_use]
    pub fn join(&self) -> String {
        match self {
            Self::One(text) => text.clone(),
            Self::Lines(lines) => lines.join("\n"),
        }
    }
}

/// What the host does with accepted output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnAccept {
    #[default]
    Insert,
    Replace,
}

/// A named command input: statically defaulted or interactively requested.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ParameterDoc {
    Static { default: Value },
    Requested { request: String },
}
