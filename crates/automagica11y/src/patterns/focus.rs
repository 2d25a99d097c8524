//! Focus patterns: initial focus on hydration, and author-defined Tab
//! sequences ("focus maps") that skip over unrelated content.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use ama_a11y::{focus_element, get_focusable_in, is_focusable, FocusOptions};
use ama_dom::{Document, ListenerId, ListenerOptions, NodeId};

use crate::attributes::{get_data, get_data_trimmed, parse_delay};

pub(super) fn focus_logged(doc: &mut Document, el: NodeId) {
    if let Err(err) = focus_element(doc, el, FocusOptions::default()) {
        tracing::debug!("could not focus {}: {}", el, err);
    }
}

/// Focus `node` on the next microtask, or after
/// `data-automagica11y-focus-delay` milliseconds
pub fn init_focus_initial(doc: &mut Document, node: NodeId) {
    if !doc.is_element(node) {
        return;
    }
    let delay = parse_delay(get_data(doc, node, "focus-delay"), 0);
    if delay > 0 {
        doc.set_timeout(delay, move |doc| focus_logged(doc, node));
    } else {
        doc.queue_microtask(move |doc| focus_logged(doc, node));
    }
}

/// A JSON array of selectors, or a `;`-separated list
fn parse_selectors(value: &str) -> Vec<String> {
    let value = value.trim();
    if value.starts_with('[') {
        return match serde_json::from_str::<Vec<serde_json::Value>>(value) {
            Ok(items) => items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => s.trim().to_string(),
                    other => other.to_string(),
                })
                .filter(|s| !s.is_empty())
                .collect(),
            Err(err) => {
                tracing::debug!("focus map is not a selector array: {}", err);
                Vec::new()
            }
        };
    }
    value.split(';').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

#[derive(Debug)]
struct FocusMap {
    anchor: NodeId,
    anchor_tabindex: Option<String>,
    listeners: Vec<ListenerId>,
}

impl FocusMap {
    fn release(self, doc: &mut Document) {
        for id in self.listeners {
            doc.remove_event_listener(id);
        }
        match self.anchor_tabindex {
            Some(value) => doc.set_attribute(self.anchor, "tabindex", &value),
            None => {
                doc.remove_attribute(self.anchor, "tabindex");
            }
        }
    }
}

#[derive(Debug, Default)]
struct FocusMapRegistry {
    maps: RefCell<HashMap<NodeId, FocusMap>>,
}

/// Where selectors are resolved, and the default anchor
#[derive(Debug, Clone, Copy)]
enum Scope {
    Document,
    Element(NodeId),
}

fn read_scope(doc: &Document, node: NodeId) -> Scope {
    match get_data_trimmed(doc, node, "focus-map-scope") {
        Some("self") => Scope::Element(node),
        None | Some("document") => Scope::Document,
        Some(selector) => match doc.query_selector(doc.document_element(), selector) {
            Ok(Some(el)) => Scope::Element(el),
            _ => Scope::Document,
        },
    }
}

/// Focusable matches in selector order, with non-focusable matches
/// contributing their focusable descendants
fn ordered_elements(doc: &Document, scope: NodeId, selectors: &[String]) -> Vec<NodeId> {
    let mut ordered = Vec::new();
    for selector in selectors {
        let found = match doc.query_selector_all(scope, selector) {
            Ok(found) => found,
            Err(err) => {
                tracing::debug!("focus map selector {:?} skipped: {}", selector, err);
                continue;
            }
        };
        for el in found {
            let candidates = if is_focusable(doc, el) { vec![el] } else { get_focusable_in(doc, el) };
            for candidate in candidates {
                if !ordered.contains(&candidate) {
                    ordered.push(candidate);
                }
            }
        }
    }
    ordered
}

/// Hydrate a `data-automagica11y-focus-map` element. Hydrating again
/// replaces the previous map; an empty selector list removes it.
pub fn init_focus_map(doc: &mut Document, node: NodeId) {
    let selectors = get_data(doc, node, "focus-map").map(parse_selectors).unwrap_or_default();
    if selectors.is_empty() {
        release_focus_map(doc, node);
        return;
    }

    let scope = read_scope(doc, node);
    let scope_root = match scope {
        Scope::Document => doc.document_element(),
        Scope::Element(el) => el,
    };
    let ordered = Rc::new(ordered_elements(doc, scope_root, &selectors));
    if ordered.is_empty() {
        return;
    }
    release_focus_map(doc, node);

    let anchor = get_data_trimmed(doc, node, "focus-map-anchor")
        .and_then(|selector| doc.query_selector(doc.document_element(), selector).ok().flatten())
        .or(match scope {
            Scope::Element(el) => Some(el),
            Scope::Document => None,
        });
    let Some(anchor) = anchor else {
        tracing::debug!("focus map on {} has no anchor", node);
        return;
    };

    let anchor_tabindex = doc.get_attribute(anchor, "tabindex").map(str::to_string);
    if !is_focusable(doc, anchor) {
        doc.set_attribute(anchor, "tabindex", "0");
    }

    let suppress_anchor_focus = Rc::new(Cell::new(false));
    let mut listeners = Vec::with_capacity(ordered.len() + 2);

    for (index, &el) in ordered.iter().enumerate() {
        let ordered = ordered.clone();
        let suppress = suppress_anchor_focus.clone();
        let id = doc.add_event_listener(el, "keydown", ListenerOptions::default(), move |doc, event| {
            if event.key() != Some("Tab") {
                return;
            }
            let next = if event.shift_key() {
                if index == 0 {
                    suppress.set(true);
                    anchor
                } else {
                    ordered[index - 1]
                }
            } else if let Some(&next) = ordered.get(index + 1) {
                next
            } else {
                return;
            };
            event.prevent_default();
            focus_logged(doc, next);
        });
        listeners.push(id);
    }

    let first = ordered[0];
    listeners.push(doc.add_event_listener(anchor, "keydown", ListenerOptions::default(), move |doc, event| {
        if event.key() == Some("Tab") && !event.shift_key() {
            event.prevent_default();
            focus_logged(doc, first);
        }
    }));

    let members = ordered.clone();
    listeners.push(doc.add_event_listener(anchor, "focus", ListenerOptions::default(), move |doc, event| {
        if suppress_anchor_focus.replace(false) {
            return;
        }
        if event.related_target().is_some_and(|from| members.contains(&from)) {
            return;
        }
        focus_logged(doc, first);
    }));

    tracing::debug!("focus map on {} orders {} element(s) after {}", node, ordered.len(), anchor);
    doc.service::<FocusMapRegistry>()
        .maps
        .borrow_mut()
        .insert(node, FocusMap { anchor, anchor_tabindex, listeners });
}

/// Remove a focus map and put the anchor's `tabindex` back. Returns
/// false if `node` had none.
pub fn release_focus_map(doc: &mut Document, node: NodeId) -> bool {
    let Some(registry) = doc.try_service::<FocusMapRegistry>() else {
        return false;
    };
    let map = registry.maps.borrow_mut().remove(&node);
    match map {
        Some(map) => {
            map.release(doc);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selectors() {
        assert_eq!(parse_selectors(" #a ; .b ;; "), ["#a", ".b"]);
        assert_eq!(parse_selectors(r##"["#a", " .b ", ""]"##), ["#a", ".b"]);
        assert!(parse_selectors("[not json").is_empty());
        assert!(parse_selectors("  ").is_empty());
    }

    #[test]
    fn test_focus_initial_waits_for_microtask_or_delay() {
        let mut doc = Document::new();
        let body = doc.body();
        let now = doc.create_element("input");
        let later = doc.create_element("button");
        doc.set_attribute(later, "data-ama-focus-delay", "200");
        doc.append_child(body, now).unwrap();
        doc.append_child(body, later).unwrap();

        init_focus_initial(&mut doc, now);
        assert_eq!(doc.active_element(), body);
        doc.run_microtasks();
        assert_eq!(doc.active_element(), now);

        init_focus_initial(&mut doc, later);
        doc.advance_time(199);
        assert_eq!(doc.active_element(), now);
        doc.advance_time(1);
        assert_eq!(doc.active_element(), later);
    }

    struct Page {
        doc: Document,
        map: NodeId,
        toolbar: NodeId,
        first: NodeId,
        second: NodeId,
        third: NodeId,
    }

    /// A toolbar whose Tab order jumps to a sidebar link, then a footer
    /// button
    fn page(anchor_tabindex: Option<&str>) -> Page {
        let mut doc = Document::new();
        let body = doc.body();
        let toolbar = doc.create_element("div");
        let map = doc.create_element("div");
        let group = doc.create_element("section");
        let first = doc.create_element("button");
        let filler = doc.create_element("button");
        let second = doc.create_element("a");
        let third = doc.create_element("button");
        doc.set_attribute(toolbar, "id", "toolbar");
        if let Some(value) = anchor_tabindex {
            doc.set_attribute(toolbar, "tabindex", value);
        }
        doc.set_attribute(map, "data-automagica11y-focus-map", "#group; #side; #foot");
        doc.set_attribute(map, "data-automagica11y-focus-map-anchor", "#toolbar");
        doc.set_attribute(group, "id", "group");
        doc.set_attribute(second, "id", "side");
        doc.set_attribute(second, "href", "#side");
        doc.set_attribute(third, "id", "foot");
        for el in [toolbar, map, filler, second, group, third] {
            doc.append_child(body, el).unwrap();
        }
        doc.append_child(group, first).unwrap();
        Page { doc, map, toolbar, first, second, third }
    }

    #[test]
    fn test_tab_follows_map() {
        let mut p = page(None);
        init_focus_map(&mut p.doc, p.map);
        assert_eq!(p.doc.get_attribute(p.toolbar, "tabindex"), Some("0"));

        p.doc.focus(p.toolbar).unwrap();
        assert_eq!(p.doc.active_element(), p.first);
        p.doc.press_key("Tab", false);
        assert_eq!(p.doc.active_element(), p.second);
        p.doc.press_key("Tab", false);
        assert_eq!(p.doc.active_element(), p.third);
        p.doc.press_key("Tab", true);
        assert_eq!(p.doc.active_element(), p.second);
        p.doc.press_key("Tab", true);
        p.doc.press_key("Tab", true);
        assert_eq!(p.doc.active_element(), p.toolbar);
    }

    #[test]
    fn test_release_restores_anchor() {
        let mut p = page(Some("-1"));
        init_focus_map(&mut p.doc, p.map);
        assert_eq!(p.doc.get_attribute(p.toolbar, "tabindex"), Some("0"));
        assert!(release_focus_map(&mut p.doc, p.map));
        assert_eq!(p.doc.get_attribute(p.toolbar, "tabindex"), Some("-1"));
        assert!(!release_focus_map(&mut p.doc, p.map));

        p.doc.focus(p.first).unwrap();
        p.doc.press_key("Tab", false);
        assert_ne!(p.doc.active_element(), p.second);
    }

    #[test]
    fn test_empty_map_releases() {
        let mut p = page(None);
        init_focus_map(&mut p.doc, p.map);
        p.doc.set_attribute(p.map, "data-automagica11y-focus-map", "");
        init_focus_map(&mut p.doc, p.map);
        assert!(!p.doc.has_attribute(p.toolbar, "tabindex"));
    }
}
