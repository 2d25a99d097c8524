//! Pattern Registry
//!
//! Discovers marked-up elements and hands each one to its hydrator once.
//! Selectors written with the canonical `data-automagica11y-` prefix
//! also match every alias prefix.
//!
//! A registry tracks hydrated elements by id, so use one registry per
//! document.

mod context;
mod focus;
mod focus_links;
mod focus_trap;
mod legacy;
pub mod popover;

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use ama_dom::{Document, NodeId};

use crate::attributes::{CANONICAL_PREFIX, PREFIX_ALIASES};
use crate::toggle::init_toggle;

pub use context::init_context_trigger;
pub use focus::{init_focus_initial, init_focus_map, release_focus_map};
pub use focus_links::{has_focus_link, init_focus_links, release_focus_links};
pub use focus_trap::{init_focus_trap, release_focus_trap};
pub use legacy::{init_dialog, init_tooltip};
pub use popover::{init_popover, is_popover_open, set_popover_state};

/// Hydrator callback
pub type PatternInit = Rc<dyn Fn(&mut Document, NodeId)>;

struct Pattern {
    name: String,
    selector: String,
    init: PatternInit,
    initialized: RefCell<HashSet<NodeId>>,
}

/// Named hydrators, run in registration order
#[derive(Default)]
pub struct PatternRegistry {
    patterns: Vec<Pattern>,
}

/// Add the alias spelling of every canonical attribute in `selector`
fn expand_aliases(selector: &str) -> String {
    let canonical = format!("data-{CANONICAL_PREFIX}-");
    if !selector.contains(&canonical) {
        return selector.to_string();
    }
    let mut selectors: Vec<String> = Vec::new();
    for alias in PREFIX_ALIASES {
        let expanded = selector.replace(&canonical, &format!("data-{alias}-"));
        if !selectors.contains(&expanded) {
            selectors.push(expanded);
        }
    }
    selectors.join(",")
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in pattern. Context promotion runs
    /// before toggle hydration so promoted triggers hydrate in the same
    /// pass.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("context", "[data-automagica11y-context]", |doc, node| {
            init_context_trigger(doc, node);
        });
        registry.register("toggle", "[data-automagica11y-toggle]", |doc, node| {
            init_toggle(doc, node);
        });
        registry.register("tooltip", "[data-automagica11y-tooltip]", |doc, node| {
            init_tooltip(doc, node);
        });
        registry.register("popover", "[data-automagica11y-popover]", |doc, node| {
            init_popover(doc, node);
        });
        registry.register("dialog", "[data-automagica11y-dialog]", |doc, node| {
            init_dialog(doc, node);
        });
        registry.register("focus-initial", "[data-automagica11y-focus-initial]", init_focus_initial);
        registry.register("focus-map", "[data-automagica11y-focus-map]", init_focus_map);
        // One delegated listener serves every linked element
        registry.register(
            "focus-links",
            "[data-automagica11y-focus-next],[data-automagica11y-focus-prev]",
            |doc, _| {
                init_focus_links(doc);
            },
        );
        registry.register("focus-trap", "[data-automagica11y-focus-trap]", |doc, node| {
            init_focus_trap(doc, node);
        });
        registry
    }

    /// Add a pattern, or replace the one with the same name in place
    pub fn register(&mut self, name: &str, selector: &str, init: impl Fn(&mut Document, NodeId) + 'static) {
        let pattern = Pattern {
            name: name.to_string(),
            selector: expand_aliases(selector),
            init: Rc::new(init),
            initialized: RefCell::new(HashSet::new()),
        };
        match self.patterns.iter_mut().find(|p| p.name == name) {
            Some(existing) => *existing = pattern,
            None => self.patterns.push(pattern),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.name.as_str())
    }

    /// The alias-expanded selector of a pattern
    pub fn selector(&self, name: &str) -> Option<&str> {
        self.find(name).map(|p| p.selector.as_str())
    }

    fn find(&self, name: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.name == name)
    }

    /// `root` itself when it matches, then matching descendants
    fn collect(doc: &Document, pattern: &Pattern, root: NodeId) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        if doc.is_element(root) && doc.matches(root, &pattern.selector).unwrap_or(false) {
            nodes.push(root);
        }
        match doc.query_selector_all(root, &pattern.selector) {
            Ok(found) => nodes.extend(found),
            Err(err) => tracing::warn!("pattern {} has an invalid selector: {}", pattern.name, err),
        }
        nodes
    }

    fn hydrate(doc: &mut Document, pattern: &Pattern, root: NodeId) {
        for node in Self::collect(doc, pattern, root) {
            if !pattern.initialized.borrow_mut().insert(node) {
                continue;
            }
            tracing::trace!("hydrating {} as {}", node, pattern.name);
            (pattern.init)(doc, node);
        }
    }

    /// Hydrate one pattern under `root`. Unknown names do nothing.
    pub fn init_pattern(&self, doc: &mut Document, name: &str, root: NodeId) {
        if let Some(pattern) = self.find(name) {
            Self::hydrate(doc, pattern, root);
        }
    }

    pub fn init_patterns(&self, doc: &mut Document, names: &[&str], root: NodeId) {
        for name in names {
            self.init_pattern(doc, name, root);
        }
    }

    /// Hydrate every pattern within a newly inserted subtree
    pub fn init_node(&self, doc: &mut Document, node: NodeId) {
        for pattern in &self.patterns {
            Self::hydrate(doc, pattern, node);
        }
    }

    /// Hydrate every pattern across the whole document
    pub fn init_all(&self, doc: &mut Document) {
        let root = doc.document_element();
        self.init_node(doc, root);
    }

    /// Whether `node` was handed to the named pattern
    pub fn is_hydrated(&self, name: &str, node: NodeId) -> bool {
        self.find(name).is_some_and(|p| p.initialized.borrow().contains(&node))
    }
}

impl fmt::Debug for PatternRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.patterns.iter().map(|p| &p.name)).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toggle::is_toggle_open;

    #[test]
    fn test_selector_alias_expansion() {
        let expanded = expand_aliases("[data-automagica11y-toggle]");
        assert!(expanded.starts_with("[data-automagica11y-toggle],"));
        assert!(expanded.contains("[data-ama-toggle]"));
        assert!(expanded.contains("[data-automagically-toggle]"));
        assert_eq!(expand_aliases("button.menu"), "button.menu");
    }

    #[test]
    fn test_default_order() {
        let registry = PatternRegistry::with_defaults();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            [
                "context",
                "toggle",
                "tooltip",
                "popover",
                "dialog",
                "focus-initial",
                "focus-map",
                "focus-links",
                "focus-trap"
            ]
        );
    }

    #[test]
    fn test_hydrates_once() {
        let mut doc = Document::new();
        let body = doc.body();
        let node = doc.create_element("div");
        doc.set_attribute(node, "data-ama-thing", "");
        doc.append_child(body, node).unwrap();

        let calls = Rc::new(RefCell::new(0));
        let mut registry = PatternRegistry::new();
        let counter = calls.clone();
        registry.register("thing", "[data-automagica11y-thing]", move |_, _| *counter.borrow_mut() += 1);

        registry.init_all(&mut doc);
        registry.init_node(&mut doc, node);
        registry.init_pattern(&mut doc, "missing", body);
        assert_eq!(*calls.borrow(), 1);
        assert!(registry.is_hydrated("thing", node));
    }

    #[test]
    fn test_init_node_includes_root() {
        let mut doc = Document::new();
        let body = doc.body();
        let trigger = doc.create_element("button");
        let panel = doc.create_element("div");
        doc.set_attribute(trigger, "data-automagica11y-toggle", "#late");
        doc.set_attribute(panel, "id", "late");
        doc.append_child(body, panel).unwrap();
        doc.append_child(body, trigger).unwrap();

        let registry = PatternRegistry::with_defaults();
        registry.init_node(&mut doc, trigger);
        assert_eq!(doc.get_attribute(trigger, "aria-expanded"), Some("false"));
        doc.click(trigger);
        assert!(is_toggle_open(&doc, trigger));
    }
}
