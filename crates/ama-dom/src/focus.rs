//! Focus tracking
//!
//! The active element, focus/blur event sequencing and sequential
//! (Tab key) navigation. Which elements can take focus follows the HTML
//! rules closely enough for widgets: native controls, links with `href`,
//! `summary`, `contenteditable` and anything with a `tabindex`, minus
//! disabled, inert and unrendered elements.

use std::collections::HashMap;

use tracing::trace;

use crate::{Document, DomError, Event, NodeId, Result};

const FORM_CONTROLS: &[&str] = &["button", "input", "select", "textarea"];

impl Document {
    /// Currently focused element, or `<body>` when nothing is
    pub fn active_element(&self) -> NodeId {
        self.active
            .filter(|&n| self.tree.is_connected(n))
            .unwrap_or(self.body)
    }

    /// Check if `node` is the focused element
    pub fn has_focus(&self, node: NodeId) -> bool {
        self.active == Some(node) && self.tree.is_connected(node)
    }

    /// Natively focusable without a `tabindex`
    pub fn is_natively_focusable(&self, node: NodeId) -> bool {
        let Some(elem) = self.element(node) else {
            return false;
        };
        match elem.tag.as_str() {
            "a" | "area" => elem.attrs.has_attribute("href"),
            "input" => !elem.get_attr("type").is_some_and(|t| t.eq_ignore_ascii_case("hidden")),
            "button" | "select" | "textarea" | "summary" => true,
            _ => elem.get_attr("contenteditable").is_some_and(|v| v.eq_ignore_ascii_case("true")),
        }
    }

    /// Effective tab index: the parsed attribute, else 0 for native
    /// controls, else -1
    pub fn tab_index(&self, node: NodeId) -> i32 {
        match self.get_attribute(node, "tabindex").and_then(|v| v.trim().parse::<i32>().ok()) {
            Some(value) => value,
            None if self.is_natively_focusable(node) => 0,
            None => -1,
        }
    }

    /// Disabled form control
    pub fn is_disabled(&self, node: NodeId) -> bool {
        self.element(node)
            .is_some_and(|e| FORM_CONTROLS.contains(&e.tag.as_str()) && e.attrs.has_attribute("disabled"))
    }

    /// Inside an `inert` subtree
    pub fn is_inert(&self, node: NodeId) -> bool {
        std::iter::once(node)
            .chain(self.tree.ancestors(node))
            .any(|n| self.has_attribute(n, "inert"))
    }

    /// Connected and not hidden by `hidden` or `display: none` on
    /// itself or an ancestor
    pub fn is_rendered(&self, node: NodeId) -> bool {
        self.tree.is_connected(node)
            && std::iter::once(node)
                .chain(self.tree.ancestors(node))
                .filter(|&n| self.tree.is_element(n))
                .all(|n| {
                    !self.has_attribute(n, "hidden")
                        && self.style_property(n, "display").as_deref() != Some("none")
                })
    }

    /// Check if `focus()` would succeed
    pub fn is_focusable_area(&self, node: NodeId) -> bool {
        self.tree.is_element(node)
            && (self.is_natively_focusable(node) || self.has_attribute(node, "tabindex"))
            && !self.is_disabled(node)
            && !self.is_inert(node)
            && self.is_rendered(node)
    }

    /// Elements reachable with Tab, in navigation order: positive
    /// tab indices ascending, then the rest in document order
    pub fn sequential_focus_order(&self) -> Vec<NodeId> {
        let mut positive = Vec::new();
        let mut zero = Vec::new();
        for node in self.tree.descendants(NodeId::ROOT) {
            if !self.is_focusable_area(node) {
                continue;
            }
            match self.tab_index(node) {
                i if i > 0 => positive.push((i, node)),
                0 => zero.push(node),
                _ => {}
            }
        }
        positive.sort_by_key(|&(i, _)| i);
        positive.into_iter().map(|(_, n)| n).chain(zero).collect()
    }

    /// Focus an element, firing `blur`/`focusout` on the old one and
    /// `focus`/`focusin` on the new one
    pub fn focus(&mut self, node: NodeId) -> Result<()> {
        if self.tree.get(node).is_none() {
            return Err(DomError::UnknownNode(node));
        }
        if !self.tree.is_element(node) {
            return Err(DomError::NotAnElement(node));
        }
        if !self.tree.is_connected(node) {
            return Err(DomError::Detached(node));
        }
        if !self.is_focusable_area(node) {
            return Err(DomError::NotFocusable(node));
        }
        if self.has_focus(node) {
            return Ok(());
        }
        trace!(%node, "focus");
        let previous = self.active.take().filter(|&n| self.tree.is_connected(n));
        if let Some(prev) = previous {
            self.dispatch_event(prev, Event::focus("blur", Some(node)));
            self.dispatch_event(prev, Event::focus("focusout", Some(node)));
        }
        self.active = Some(node);
        self.dispatch_event(node, Event::focus("focus", previous));
        self.dispatch_event(node, Event::focus("focusin", previous));
        Ok(())
    }

    /// Drop focus back to the body
    pub fn blur(&mut self) {
        if let Some(prev) = self.active.take() {
            if self.tree.is_connected(prev) {
                self.dispatch_event(prev, Event::focus("blur", None));
                self.dispatch_event(prev, Event::focus("focusout", None));
            }
        }
    }

    /// Default action of Tab / Shift+Tab
    pub(crate) fn move_focus(&mut self, forward: bool) {
        let order = self.sequential_focus_order();
        if order.is_empty() {
            return;
        }
        let next = match self.active.and_then(|a| order.iter().position(|&n| n == a)) {
            Some(i) if forward => order[(i + 1) % order.len()],
            Some(i) => order[(i + order.len() - 1) % order.len()],
            None => self.nearest_in_order(&order, forward),
        };
        if let Err(err) = self.focus(next) {
            trace!(%err, "sequential focus failed");
        }
    }

    /// Closest candidate after (or before) the active element in
    /// document order, wrapping around
    fn nearest_in_order(&self, order: &[NodeId], forward: bool) -> NodeId {
        let Some(active) = self.active else {
            return if forward { order[0] } else { order[order.len() - 1] };
        };
        let positions: HashMap<NodeId, usize> = self
            .tree
            .descendants(NodeId::ROOT)
            .enumerate()
            .map(|(i, n)| (n, i))
            .collect();
        let here = positions.get(&active).copied().unwrap_or(0);
        let pos = |n: &NodeId| positions.get(n).copied().unwrap_or(0);
        if forward {
            order.iter().copied().find(|n| pos(n) > here).unwrap_or(order[0])
        } else {
            order.iter().rev().copied().find(|n| pos(n) < here).unwrap_or(order[order.len() - 1])
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Document, DomError, ListenerOptions};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_focusable_rules() {
        let mut doc = Document::new();
        let body = doc.body();
        let button = doc.create_element("button");
        let disabled = doc.create_element("button");
        let link = doc.create_element("a");
        let div = doc.create_element("div");
        for n in [button, disabled, link, div] {
            doc.append_child(body, n).unwrap();
        }
        doc.set_attribute(disabled, "disabled", "");

        assert!(doc.is_focusable_area(button));
        assert!(!doc.is_focusable_area(disabled));
        assert!(!doc.is_focusable_area(link));
        assert!(!doc.is_focusable_area(div));
        assert_eq!(doc.tab_index(div), -1);

        doc.set_attribute(div, "tabindex", "-1");
        assert!(doc.is_focusable_area(div));
        doc.set_attribute(body, "inert", "");
        assert!(!doc.is_focusable_area(button));
    }

    #[test]
    fn test_focus_event_sequence() {
        let mut doc = Document::new();
        let body = doc.body();
        let a = doc.create_element("button");
        let b = doc.create_element("button");
        doc.append_child(body, a).unwrap();
        doc.append_child(body, b).unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        for kind in ["focus", "blur", "focusin", "focusout"] {
            let log = log.clone();
            doc.add_event_listener(body, kind, ListenerOptions::capture(), move |_, e| {
                log.borrow_mut().push(e.kind().to_string());
            });
        }
        doc.focus(a).unwrap();
        doc.focus(b).unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["focus", "focusin", "blur", "focusout", "focus", "focusin"]
        );
        assert_eq!(doc.active_element(), b);
    }

    #[test]
    fn test_focus_errors() {
        let mut doc = Document::new();
        let detached = doc.create_element("button");
        assert_eq!(doc.focus(detached), Err(DomError::Detached(detached)));
        let div = doc.create_element("div");
        let body = doc.body();
        doc.append_child(body, div).unwrap();
        assert_eq!(doc.focus(div), Err(DomError::NotFocusable(div)));
        assert_eq!(doc.active_element(), body);
    }

    #[test]
    fn test_tab_order_wraps() {
        let mut doc = Document::new();
        let body = doc.body();
        let first = doc.create_element("button");
        let second = doc.create_element("input");
        let priority = doc.create_element("span");
        for n in [first, second, priority] {
            doc.append_child(body, n).unwrap();
        }
        doc.set_attribute(priority, "tabindex", "1");

        assert_eq!(doc.sequential_focus_order(), vec![priority, first, second]);
        doc.press_key("Tab", false);
        assert_eq!(doc.active_element(), priority);
        doc.press_key("Tab", false);
        doc.press_key("Tab", false);
        assert_eq!(doc.active_element(), second);
        doc.press_key("Tab", false);
        assert_eq!(doc.active_element(), priority);
        doc.press_key("Tab", true);
        assert_eq!(doc.active_element(), second);
    }
}
