//! Focus Links
//!
//! Per-element Tab routing: `data-automagica11y-focus-next` and
//! `-focus-prev` name where Tab and Shift+Tab go from an element. Links
//! form a graph; when a linked target cannot take focus (hidden,
//! disabled, inert, detached) routing continues along that target's own
//! links, then through elements that link back to it.
//!
//! Selectors resolve inside the nearest `data-automagica11y-focus-scope`
//! (`self`, `document`/`root`, or a selector), else the whole document.
//! `self` as a link target names the element itself.
//!
//! One delegated listener serves the document. The graph is rebuilt
//! lazily after a link, scope or loop attribute changes.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use ama_a11y::{get_focusable_in, is_focusable};
use ama_dom::{Document, ListenerId, ListenerOptions, MutationObserverInit, NodeId, ObserverId};

use super::focus::focus_logged;
use crate::attributes::{get_data, get_data_trimmed, prefixed_selector, PREFIX_ALIASES};

const LINK_SUFFIXES: &[&str] = &["focus-next", "focus-prev", "focus-scope", "focus-loop"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Next,
    Prev,
}

#[derive(Debug)]
struct Edge {
    selector: String,
    scope: NodeId,
    target: Cell<Option<NodeId>>,
}

impl Edge {
    /// The cached target, resolved again once it has left the document
    fn target(&self, doc: &Document, source: NodeId) -> Option<NodeId> {
        if let Some(target) = self.target.get().filter(|&t| doc.is_connected(t)) {
            return Some(target);
        }
        let target = resolve_target(doc, source, &self.selector, self.scope);
        self.target.set(target);
        target
    }
}

#[derive(Debug, Default)]
struct LinkNode {
    next: Option<Edge>,
    prev: Option<Edge>,
    /// Elements whose `focus-next` names this one
    inbound_next: Vec<NodeId>,
    /// Elements whose `focus-prev` names this one
    inbound_prev: Vec<NodeId>,
}

impl LinkNode {
    fn edge(&self, direction: Direction) -> Option<&Edge> {
        match direction {
            Direction::Next => self.next.as_ref(),
            Direction::Prev => self.prev.as_ref(),
        }
    }

    /// Elements that sit after (`Next`) or before (`Prev`) this one
    /// because they link back to it
    fn linked_from(&self, direction: Direction) -> &[NodeId] {
        match direction {
            Direction::Next => &self.inbound_prev,
            Direction::Prev => &self.inbound_next,
        }
    }

    fn note_inbound(&mut self, direction: Direction, source: NodeId) {
        let inbound = match direction {
            Direction::Next => &mut self.inbound_next,
            Direction::Prev => &mut self.inbound_prev,
        };
        if !inbound.contains(&source) {
            inbound.push(source);
        }
    }
}

#[derive(Debug, Default)]
struct LinkGraph {
    nodes: HashMap<NodeId, LinkNode>,
}

impl LinkGraph {
    fn build(doc: &Document) -> Self {
        let mut graph = Self::default();
        let root = doc.document_element();
        let selector = format!("{},{}", prefixed_selector("focus-next"), prefixed_selector("focus-prev"));
        let linked = match doc.query_selector_all(root, &selector) {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!("focus link selector rejected: {}", err);
                return graph;
            }
        };

        for el in linked {
            graph.nodes.entry(el).or_default();
            let scope = resolve_scope(doc, el);
            for (suffix, direction) in [("focus-next", Direction::Next), ("focus-prev", Direction::Prev)] {
                let Some(selector) = get_data_trimmed(doc, el, suffix).filter(|s| !s.is_empty()) else {
                    continue;
                };
                let target = resolve_target(doc, el, selector, scope);
                if let Some(target) = target {
                    graph.nodes.entry(target).or_default().note_inbound(direction, el);
                }
                let edge = Edge { selector: selector.to_string(), scope, target: Cell::new(target) };
                if let Some(node) = graph.nodes.get_mut(&el) {
                    match direction {
                        Direction::Next => node.next = Some(edge),
                        Direction::Prev => node.prev = Some(edge),
                    }
                }
            }
        }
        tracing::trace!("focus link graph has {} node(s)", graph.nodes.len());
        graph
    }

    fn contains(&self, el: NodeId) -> bool {
        self.nodes.contains_key(&el)
    }

    fn find(&self, doc: &Document, from: NodeId, direction: Direction, visited: &mut HashSet<NodeId>) -> Option<NodeId> {
        if !visited.insert(from) {
            return None;
        }
        if let Some(found) = self.follow(doc, from, direction, visited) {
            return Some(found);
        }
        let node = self.nodes.get(&from)?;
        for &source in node.linked_from(direction) {
            if visited.contains(&source) || !self.contains(source) {
                continue;
            }
            if let Some(found) = focusable_candidate(doc, source) {
                return Some(found);
            }
            if let Some(found) = self.find(doc, source, direction, visited) {
                return Some(found);
            }
        }
        None
    }

    /// Walk the chain of `direction` links until something takes focus
    fn follow(&self, doc: &Document, from: NodeId, direction: Direction, visited: &mut HashSet<NodeId>) -> Option<NodeId> {
        let mut current = from;
        loop {
            let target = self.nodes.get(&current)?.edge(direction)?.target(doc, current)?;
            if !visited.insert(target) {
                return None;
            }
            if let Some(found) = focusable_candidate(doc, target) {
                return Some(found);
            }
            if !self.contains(target) {
                return None;
            }
            current = target;
        }
    }
}

/// `self`, or the first match of `selector` inside `scope`
fn resolve_target(doc: &Document, source: NodeId, selector: &str, scope: NodeId) -> Option<NodeId> {
    let selector = selector.trim();
    match selector {
        "" => None,
        "self" => Some(source),
        _ => doc.query_selector(scope, selector).unwrap_or_else(|err| {
            tracing::debug!("focus link selector {:?} ignored: {}", selector, err);
            None
        }),
    }
}

/// The nearest ancestor-or-self `focus-scope` that resolves
fn resolve_scope(doc: &Document, el: NodeId) -> NodeId {
    let root = doc.document_element();
    let mut cursor = Some(el);
    while let Some(owner) = cursor {
        let scope = match get_data_trimmed(doc, owner, "focus-scope") {
            None | Some("") => None,
            Some("self") => Some(owner),
            Some("document" | "root") => Some(root),
            Some(selector) => doc.query_selector(root, selector).ok().flatten(),
        };
        if let Some(scope) = scope {
            return scope;
        }
        cursor = doc.parent_element(owner);
    }
    root
}

/// `el` if it can take focus, else its first focusable descendant
fn focusable_candidate(doc: &Document, el: NodeId) -> Option<NodeId> {
    if !doc.is_connected(el) || doc.is_inert(el) {
        return None;
    }
    if is_focusable(doc, el) {
        return Some(el);
    }
    get_focusable_in(doc, el).into_iter().find(|&candidate| is_focusable(doc, candidate))
}

#[derive(Debug, Default)]
struct FocusLinks {
    graph: RefCell<LinkGraph>,
    dirty: Cell<bool>,
    listener: Cell<Option<ListenerId>>,
    observer: Cell<Option<ObserverId>>,
}

impl FocusLinks {
    fn refresh(&self, doc: &Document) {
        if self.dirty.replace(false) {
            *self.graph.borrow_mut() = LinkGraph::build(doc);
        }
    }

    fn route(&self, doc: &Document, from: NodeId, direction: Direction) -> Option<NodeId> {
        self.refresh(doc);
        if !self.graph.borrow().contains(from) {
            // Linked since the last mutation delivery
            if !has_focus_link(doc, from) {
                return None;
            }
            self.dirty.set(true);
            self.refresh(doc);
        }
        let graph = self.graph.borrow();
        if !graph.contains(from) {
            return None;
        }
        graph.find(doc, from, direction, &mut HashSet::new())
    }
}

/// Start routing Tab through focus links for the whole document.
/// Returns false if it was already running.
pub fn init_focus_links(doc: &mut Document) -> bool {
    let links = doc.service::<FocusLinks>();
    if links.listener.get().is_some() {
        return false;
    }
    links.dirty.set(true);

    let listener = doc.add_event_listener(NodeId::ROOT, "keydown", ListenerOptions::capture(), |doc, event| {
        if event.key() != Some("Tab") || event.default_prevented() {
            return;
        }
        let Some(links) = doc.try_service::<FocusLinks>() else {
            return;
        };
        let direction = if event.shift_key() { Direction::Prev } else { Direction::Next };
        let Some(next) = links.route(doc, event.target(), direction) else {
            return;
        };
        event.prevent_default();
        focus_logged(doc, next);
    });
    links.listener.set(Some(listener));

    let observer = doc.create_mutation_observer(|doc, _, _| {
        if let Some(links) = doc.try_service::<FocusLinks>() {
            links.dirty.set(true);
        }
    });
    let watched: Vec<String> = PREFIX_ALIASES
        .iter()
        .flat_map(|alias| LINK_SUFFIXES.iter().map(move |suffix| format!("data-{alias}-{suffix}")))
        .collect();
    let init = MutationObserverInit {
        child_list: true,
        attributes: true,
        subtree: true,
        attribute_filter: Some(watched),
        ..Default::default()
    };
    let root = doc.document_element();
    if let Err(err) = doc.observe(observer, root, init) {
        tracing::debug!("focus link observer not attached: {}", err);
    }
    links.observer.set(Some(observer));
    tracing::debug!("focus links enabled");
    true
}

/// Stop routing Tab through focus links. Returns false if it was not
/// running.
pub fn release_focus_links(doc: &mut Document) -> bool {
    let Some(links) = doc.try_service::<FocusLinks>() else {
        return false;
    };
    let Some(listener) = links.listener.take() else {
        return false;
    };
    doc.remove_event_listener(listener);
    if let Some(observer) = links.observer.take() {
        doc.disconnect_observer(observer);
    }
    *links.graph.borrow_mut() = LinkGraph::default();
    true
}

/// Whether `el` carries a link of its own
pub fn has_focus_link(doc: &Document, el: NodeId) -> bool {
    get_data(doc, el, "focus-next").is_some() || get_data(doc, el, "focus-prev").is_some()
}
