//! Built-in default commands, available even with an empty or broken tree.

use std::path::Path;

use command_tree::{ConfigError, NodeData};

/// Identity used for the built-in special node in diagnostics.
pub const BUILTIN_NODE_ID: &str = "<builtin>";

const BUILTIN_DOCUMENT: &str = r#"{
  "project": { "name": "builtin" },
  "commands": [
    {
      "id": "explain",
      "name": "Explain selection",
      "system_prompt": [
        "You are a senior engineer reviewing code.",
        "Answer concisely and in plain language."
      ],
      "prompt": [
        "Explain the following {{language}} code:",
        "",
        "{{selection}}"
      ]
    },
    {
      "id": "complete",
      "name": "Continue at cursor",
      "system_prompt": "You complete code. Reply with code only, no commentary.",
      "prompt": [
        "Continue the following {{language}} code. Reply only with the text",
        "that should come next:",
        "",
        "{{text_before_cursor}}"
      ],
      "temperature": 0.2
    },
    {
      "id": "doc",
      "name": "Write documentation",
      "prompt": [
        "Write a documentation comment for this {{language}} code:",
        "",
        "{{selection}}"
      ],
      "on_accept": "insert"
    }
  ]
}"#;

/// Parses the embedded built-in node document.
pub fn builtin_node() -> Result<NodeData, ConfigError> {
    NodeData::parse(BUILTIN_DOCUMENT, Path::new(BUILTIN_NODE_ID))
}
