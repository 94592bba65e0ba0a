//! # Field Extraction
//!
//! Pulls caller-selected values out of a decoded JSON payload.
//!
//! Extraction walks the payload under a set of parsed [`FieldPattern`] trees.
//! Objects are descended by key, arrays fan out over every element in order
//! (transitively through nested arrays), and type mismatches are silent: a
//! missing key or a scalar where an object was expected simply contributes
//! nothing. The result is a map from dotted path (`pull_request.user.login`)
//! to the value, or ordered list of values, found there. Array indices never
//! appear in paths; fan-out concatenates element values in array order.

mod pattern;

pub use pattern::{parse_patterns, FieldPattern, PatternError};

use serde_json::Value;
use std::collections::BTreeMap;

/// Values accumulated under one dotted path
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Extracted {
    /// The path matched exactly one value
    Single(Value),
    /// The path fanned out over arrays; element order is preserved
    Many(Vec<Value>),
}

impl Extracted {
    /// Render for template substitution: lists join with `", "`, `null`
    /// renders empty
    pub fn render(&self) -> String {
        match self {
            Self::Single(value) => scalar_to_string(value),
            Self::Many(values) => values
                .iter()
                .map(scalar_to_string)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Render the i-th element (0-based); out of range renders empty
    pub fn render_index(&self, index: usize) -> String {
        match self {
            Self::Single(value) if index == 0 => scalar_to_string(value),
            Self::Single(_) => String::new(),
            Self::Many(values) => values.get(index).map(scalar_to_string).unwrap_or_default(),
        }
    }

    /// Number of values under this path
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Many(values) => values.len(),
        }
    }

    /// True when no value is present (never produced by extraction)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Extraction output: dotted path → value(s), deterministically ordered
pub type ValueMap = BTreeMap<String, Extracted>;

/// Extract all pattern matches from a payload
///
/// Never fails: paths absent from the payload are absent from the output.
pub fn extract(payload: &Value, patterns: &[FieldPattern]) -> ValueMap {
    let mut accumulator: BTreeMap<String, Vec<Value>> = BTreeMap::new();

    for pattern in patterns {
        apply(pattern, payload, "", &mut accumulator);
    }

    shape(accumulator)
}

/// Apply one pattern node to the current container
fn apply(node: &FieldPattern, value: &Value, prefix: &str, acc: &mut BTreeMap<String, Vec<Value>>) {
    match value {
        Value::Object(map) => {
            let Some(child) = map.get(&node.name) else {
                return;
            };

            let path = join_path(prefix, &node.name);
            if node.is_leaf() {
                record_leaf(child, &path, acc);
            } else {
                apply_children(node, child, &path, acc);
            }
        }
        // Fan out: the pattern applies to every element of an array at the
        // current level.
        Value::Array(items) => {
            for item in items {
                apply(node, item, prefix, acc);
            }
        }
        // Scalar where an object was expected.
        _ => {}
    }
}

/// Descend an internal node's children into a resolved value
fn apply_children(
    node: &FieldPattern,
    value: &Value,
    path: &str,
    acc: &mut BTreeMap<String, Vec<Value>>,
) {
    match value {
        Value::Object(_) => {
            for child in &node.children {
                apply(child, value, path, acc);
            }
        }
        Value::Array(items) => {
            for item in items {
                apply_children(node, item, path, acc);
            }
        }
        _ => {}
    }
}

/// Record a leaf match, flattening arrays transitively
fn record_leaf(value: &Value, path: &str, acc: &mut BTreeMap<String, Vec<Value>>) {
    match value {
        Value::Array(items) => {
            for item in items {
                record_leaf(item, path, acc);
            }
        }
        // A container at a leaf position is a silent type mismatch.
        Value::Object(_) => {}
        scalar => {
            acc.entry(path.to_string()).or_default().push(scalar.clone());
        }
    }
}

/// Collapse accumulations: one value → scalar, several → ordered list
///
/// A path whose only accumulated value is `null` is dropped. Nulls inside a
/// fan-out list are retained; they render as the empty string.
fn shape(acc: BTreeMap<String, Vec<Value>>) -> ValueMap {
    let mut map = ValueMap::new();

    for (path, mut values) in acc {
        match values.len() {
            0 => {}
            1 => {
                let value = values.remove(0);
                if !value.is_null() {
                    map.insert(path, Extracted::Single(value));
                }
            }
            _ => {
                map.insert(path, Extracted::Many(values));
            }
        }
    }

    map
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// Render a scalar JSON value for human-readable output
///
/// Strings render unquoted; `null` renders empty. Containers fall back to
/// their JSON form (they only reach here through introspection, never
/// through extraction).
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
