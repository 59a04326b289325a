//! Editor-supplied run context and the metadata callback seam.

use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::Value;

/// Read-only snapshot of editor state for one run.
///
/// The core never mutates this; it is input to variable resolution only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunContext {
    /// Host buffer identity.
    pub buffer: u64,
    /// Host window identity, when one is focused.
    pub window: Option<u64>,
    pub cursor: CursorPosition,
    pub selection: Option<SelectionRange>,
    /// Syntax/language tag of the buffer.
    pub language: Option<String>,
    /// Absolute path of the buffer's file, when it has one.
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorPosition {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRange {
    pub start: CursorPosition,
    pub end: CursorPosition,
}

/// Host callback resolving template variable names to values.
///
/// Implementations return only the subset of `names` they recognize;
/// unrecognized names stay literal in the compiled prompt.
pub trait ContextProvider: Send + Sync {
    fn get_metadata(&self, names: &[String], context: &RunContext) -> HashMap<String, Value>;
}
