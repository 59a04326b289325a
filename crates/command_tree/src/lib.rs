//! Filesystem-local configuration nodes for composable commands.
//!
//! One `.deck.json` file per directory defines a node; nodes form a
//! parent-linked tree mirroring directory nesting, so command definitions
//! resolve by filesystem locality. The tree lives entirely in memory: node
//! files are discovered by upward directory walk, file changes replace a
//! node's data in place, and reloads are debounced.

pub mod discover;
pub mod error;
pub mod node;
pub mod reload;
pub mod schema;
pub mod tree;

pub use discover::{discover_chain, discover_into};
pub use error::ConfigError;
pub use node::{load_node_file, AgentInfo, CommandDef, ConfigNode, NodeData, Parameter, ProjectInfo};
pub use reload::{ReloadDebouncer, DEFAULT_RELOAD_DELAY};
pub use schema::{NodeDocument, OnAccept, StringOrLines, NODE_FILE_NAME};
pub use tree::ConfigTree;
