//! Class Toggler
//!
//! Author-declared class lists for the open and closed states, e.g.
//! `data-automagica11y-target-class-open="is-visible fade-in"` or a JSON
//! array. Truthy keywords (`open`, `expanded`, `shown`, ...) name the
//! open state, falsy ones (`closed`, `collapsed`, `hidden`, ...) the
//! closed state.

use ama_dom::{Document, NodeId};
use serde::Deserialize;

use crate::attributes::get_data;

const TRUTHY: &[&str] = &["open", "expanded", "shown", "active", "pressed", "true", "on"];
const FALSY: &[&str] = &["closed", "collapsed", "hidden", "inactive", "unpressed", "false", "off"];

/// Classes for one element in each state
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClassSet {
    pub open: Vec<String>,
    pub closed: Vec<String>,
}

impl ClassSet {
    pub fn is_empty(&self) -> bool {
        self.open.is_empty() && self.closed.is_empty()
    }

    /// Remove the other state's classes, then add this state's
    pub fn apply(&self, doc: &mut Document, el: NodeId, expanded: bool) {
        let (add, remove) = if expanded {
            (&self.open, &self.closed)
        } else {
            (&self.closed, &self.open)
        };
        for class in remove {
            doc.remove_class(el, class);
        }
        for class in add {
            doc.add_class(el, class);
        }
    }
}

/// Class lists for a trigger and its surfaces
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassConfig {
    pub trigger: ClassSet,
    pub target: ClassSet,
}

impl ClassConfig {
    /// Read class declarations from `trigger`. When the trigger declares
    /// nothing for itself, `fallback` supplies its classes.
    pub fn read(doc: &Document, trigger: NodeId, fallback: Option<&ClassSet>) -> Self {
        let mut config = Self::default();
        for (side, set) in [("trigger", &mut config.trigger), ("target", &mut config.target)] {
            for state in TRUTHY.iter().chain(FALSY) {
                let Some(value) = get_data(doc, trigger, &format!("{side}-class-{state}")) else {
                    continue;
                };
                let list = parse_class_list(value);
                if TRUTHY.contains(state) {
                    set.open.extend(list);
                } else {
                    set.closed.extend(list);
                }
            }
        }
        if config.trigger.is_empty() {
            if let Some(fallback) = fallback {
                config.trigger = fallback.clone();
            }
        }
        config
    }

    pub fn apply(&self, doc: &mut Document, expanded: bool, trigger: NodeId, target: Option<NodeId>) {
        self.trigger.apply(doc, trigger, expanded);
        if let Some(target) = target {
            self.target.apply(doc, target, expanded);
        }
    }
}

/// A JSON array when the value starts with `[`, otherwise whitespace
/// separated. Malformed JSON falls back to whitespace splitting.
pub fn parse_class_list(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.starts_with('[') {
        if let Ok(items) = serde_json::from_str::<Vec<serde_json::Value>>(trimmed) {
            return items
                .into_iter()
                .filter_map(|item| match item {
                    serde_json::Value::String(s) => (!s.is_empty()).then_some(s),
                    serde_json::Value::Null | serde_json::Value::Bool(false) => None,
                    other => Some(other.to_string()),
                })
                .collect();
        }
    }
    trimmed.split_ascii_whitespace().map(str::to_string).collect()
}
