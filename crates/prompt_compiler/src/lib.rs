//! Flat `{{NAME}}` template compilation.
//!
//! This crate intentionally knows nothing about editors, configuration
//! nodes, or backends: it discovers placeholder names in template text and
//! substitutes resolved values supplied by the caller. It performs no I/O.
//!
//! Names that the caller does not supply a value for are left as literal
//! `{{NAME}}` text in the output. Callers that need stricter handling must
//! pre-validate with [`find_variable_names`].

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

/// Placeholder syntax: word characters and dots between double braces.
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{([A-Za-z0-9_.]+)\}\}").expect("placeholder pattern is a valid regex")
});

/// Scans `text` for `{{NAME}}` placeholders.
///
/// Returns each distinct name once, in order of first appearance. Pure and
/// idempotent: scanning the same text twice yields the same list.
#[must_use]
pub fn find_variable_names(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    for captures in PLACEHOLDER.captures_iter(text) {
        let name = &captures[1];
        if !names.iter().any(|known| known == name) {
            names.push(name.to_owned());
        }
    }

    names
}

/// Replaces every occurrence of each provided placeholder in `text`.
///
/// String values substitute their contents; any other JSON value substitutes
/// its compact serialization. Placeholders whose names are absent from
/// `values` remain literal `{{NAME}}` text. Text without placeholders is
/// returned unchanged.
#[must_use]
pub fn interpolate(text: &str, values: &HashMap<String, Value>) -> String {
    PLACEHOLDER
        .replace_all(text, |captures: &Captures<'_>| {
            match values.get(&captures[1]) {
                Some(value) => render_value(value),
                None => captures[0].to_owned(),
            }
        })
        .into_owned()
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
