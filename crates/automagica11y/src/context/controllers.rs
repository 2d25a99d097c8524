//! Behavior controllers shared by modal contexts. Each one is bound to
//! a single surface and can be activated and deactivated repeatedly.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use ama_a11y::{enable_focus_trap, focus_element, FocusOptions, FocusTrapHandle, FocusTrapOptions};
use ama_dom::{Document, ListenerId, ListenerOptions, NodeId};

use crate::attributes::{read_focus_trap_settings, set_inert};
use crate::toggle::set_toggle_state;

/// Owns the surface's focus trap while it is open. Focus return is left
/// to [`RestoreFocusController`].
#[derive(Debug)]
pub(crate) struct FocusTrapController {
    target: NodeId,
    handle: RefCell<Option<FocusTrapHandle>>,
}

impl FocusTrapController {
    pub fn new(target: NodeId) -> Self {
        Self { target, handle: RefCell::new(None) }
    }

    pub fn activate(&self, doc: &mut Document) {
        // A trap that released itself (Escape, lost visibility) is replaced
        if self.handle.borrow().as_ref().is_some_and(FocusTrapHandle::is_active) {
            return;
        }
        let settings = read_focus_trap_settings(doc, self.target);
        let options = FocusTrapOptions { return_focus: false, ..settings.options };
        let handle = enable_focus_trap(doc, self.target, options);
        *self.handle.borrow_mut() = Some(handle);
    }

    pub fn handle(&self) -> Option<FocusTrapHandle> {
        self.handle.borrow().clone()
    }

    pub fn deactivate(&self, doc: &mut Document) {
        let handle = self.handle.borrow_mut().take();
        if let Some(handle) = handle {
            handle.release(doc);
        }
    }
}

/// Remembers where focus was before the surface opened, and the opener
/// to fall back on
#[derive(Debug)]
pub(crate) struct RestoreFocusController {
    target: NodeId,
    restore_to: Cell<Option<NodeId>>,
    opener: Cell<Option<NodeId>>,
}

impl RestoreFocusController {
    pub fn new(target: NodeId) -> Self {
        Self { target, restore_to: Cell::new(None), opener: Cell::new(None) }
    }

    /// The focused element if it sits outside the surface, else `opener`
    pub fn capture(&self, doc: &Document, opener: NodeId) {
        let active = doc.active_element();
        let outside = active != doc.body() && doc.is_element(active) && !doc.contains(self.target, active);
        self.restore_to.set(Some(if outside { active } else { opener }));
        self.opener.set(Some(opener));
    }

    pub fn forget(&self) {
        self.restore_to.set(None);
        self.opener.set(None);
    }

    /// Focus the captured element, or the opener if it can no longer
    /// take focus
    pub fn restore(&self, doc: &mut Document) {
        let Some(candidate) = self.restore_to.take() else {
            return;
        };
        let fallback = self.opener.take().filter(|&opener| opener != candidate);
        for el in std::iter::once(candidate).chain(fallback) {
            match focus_element(doc, el, FocusOptions::default()) {
                Ok(()) => return,
                Err(err) => tracing::debug!("could not restore focus to {}: {}", el, err),
            }
        }
    }
}

#[derive(Debug, Default)]
struct EscapeTarget {
    trigger: Cell<Option<NodeId>>,
    trap: RefCell<Option<FocusTrapHandle>>,
}

/// Document-level Escape listener that closes the current trigger. With
/// surfaces stacked, only the one whose trap is innermost reacts.
#[derive(Debug)]
pub(crate) struct EscapeController {
    current: Rc<EscapeTarget>,
    listener: Cell<Option<ListenerId>>,
}

impl EscapeController {
    pub fn new() -> Self {
        Self { current: Rc::new(EscapeTarget::default()), listener: Cell::new(None) }
    }

    pub fn activate(&self, doc: &mut Document, trigger: NodeId, trap: Option<FocusTrapHandle>) {
        self.current.trigger.set(Some(trigger));
        *self.current.trap.borrow_mut() = trap;
        if self.listener.get().is_some() {
            return;
        }
        let current = self.current.clone();
        let id = doc.add_event_listener(NodeId::ROOT, "keydown", ListenerOptions::capture(), move |doc, event| {
            if event.key() != Some("Escape") || event.default_prevented() {
                return;
            }
            let Some(trigger) = current.trigger.get() else {
                return;
            };
            let covered = current.trap.borrow().as_ref().is_some_and(|t| t.is_active() && !t.is_top());
            if covered {
                return;
            }
            event.prevent_default();
            set_toggle_state(doc, trigger, false);
        });
        self.listener.set(Some(id));
    }

    pub fn deactivate(&self, doc: &mut Document) {
        self.current.trigger.set(None);
        self.current.trap.borrow_mut().take();
        if let Some(id) = self.listener.take() {
            doc.remove_event_listener(id);
        }
    }
}

#[derive(Debug)]
struct SavedState {
    aria_hidden: Option<String>,
    inert: bool,
}

#[derive(Debug, Default)]
struct InertEntry {
    /// Open surfaces hiding this element
    holds: usize,
    /// Open surfaces inside this element
    exempt: usize,
    /// Present while the element is hidden
    saved: Option<SavedState>,
}

/// Elements hidden by open modal surfaces, counted per document. An
/// element stays hidden while any surface holds it and no open surface
/// sits inside it; its own attributes come back when neither is true.
#[derive(Debug, Default)]
pub(crate) struct InertRegistry {
    entries: RefCell<HashMap<NodeId, InertEntry>>,
    scroll_locks: Cell<usize>,
    previous_overflow: RefCell<Option<String>>,
}

impl InertRegistry {
    fn update(&self, doc: &mut Document, el: NodeId, change: impl FnOnce(&mut InertEntry)) {
        let mut entries = self.entries.borrow_mut();
        let entry = entries.entry(el).or_default();
        change(entry);
        let hide = entry.holds > 0 && entry.exempt == 0;
        if hide && entry.saved.is_none() {
            let inert = doc.has_attribute(el, "inert");
            entry.saved = Some(SavedState {
                aria_hidden: doc.get_attribute(el, "aria-hidden").map(str::to_string),
                inert,
            });
            doc.set_attribute(el, "aria-hidden", "true");
            if !inert {
                set_inert(doc, el, true);
            }
        } else if !hide {
            if let Some(saved) = entry.saved.take() {
                match &saved.aria_hidden {
                    Some(value) => doc.set_attribute(el, "aria-hidden", value),
                    None => {
                        doc.remove_attribute(el, "aria-hidden");
                    }
                }
                if !saved.inert {
                    set_inert(doc, el, false);
                }
            }
        }
        if entry.holds == 0 && entry.exempt == 0 {
            entries.remove(&el);
        }
    }

    fn hold(&self, doc: &mut Document, el: NodeId) {
        self.update(doc, el, |entry| entry.holds += 1);
    }

    fn release(&self, doc: &mut Document, el: NodeId) {
        self.update(doc, el, |entry| entry.holds = entry.holds.saturating_sub(1));
    }

    fn exempt(&self, doc: &mut Document, el: NodeId) {
        self.update(doc, el, |entry| entry.exempt += 1);
    }

    fn unexempt(&self, doc: &mut Document, el: NodeId) {
        self.update(doc, el, |entry| entry.exempt = entry.exempt.saturating_sub(1));
    }

    fn lock_scroll(&self, doc: &mut Document) {
        let locks = self.scroll_locks.get();
        self.scroll_locks.set(locks + 1);
        if locks > 0 {
            return;
        }
        let body = doc.body();
        *self.previous_overflow.borrow_mut() = doc.style_property(body, "overflow");
        doc.set_style_property(body, "overflow", "hidden");
        doc.add_class(body, "modal-open");
    }

    fn unlock_scroll(&self, doc: &mut Document) {
        match self.scroll_locks.get() {
            0 => return,
            1 => {}
            locks => {
                self.scroll_locks.set(locks - 1);
                return;
            }
        }
        self.scroll_locks.set(0);
        let body = doc.body();
        match self.previous_overflow.take() {
            Some(value) => doc.set_style_property(body, "overflow", &value),
            None => doc.remove_style_property(body, "overflow"),
        }
        doc.remove_class(body, "modal-open");
    }
}

/// Hides everything outside the surface from assistive technology and
/// interaction, and locks body scrolling. Bookkeeping is shared through
/// [`InertRegistry`] so stacked surfaces can close in any order.
#[derive(Debug)]
pub(crate) struct InertController {
    target: NodeId,
    held: RefCell<Vec<NodeId>>,
    exempted: RefCell<Vec<NodeId>>,
    locked: Cell<bool>,
}

impl InertController {
    pub fn new(target: NodeId) -> Self {
        Self {
            target,
            held: RefCell::new(Vec::new()),
            exempted: RefCell::new(Vec::new()),
            locked: Cell::new(false),
        }
    }

    /// Siblings of the surface and of each of its ancestors, plus the
    /// root's other children
    fn outside(&self, doc: &Document) -> Vec<NodeId> {
        let mut found: Vec<NodeId> = Vec::new();
        let root = doc.document_element();
        for child in doc.element_children(root) {
            if !doc.contains(child, self.target) {
                found.push(child);
            }
        }
        let mut node = self.target;
        while let Some(parent) = doc.parent_element(node) {
            for child in doc.element_children(parent) {
                if child != node && !found.contains(&child) {
                    found.push(child);
                }
            }
            node = parent;
        }
        found
    }

    pub fn activate(&self, doc: &mut Document) {
        if self.locked.replace(true) {
            return;
        }
        let registry = doc.service::<InertRegistry>();

        let chain: Vec<NodeId> = std::iter::once(self.target)
            .chain(doc.tree().ancestors(self.target))
            .filter(|&n| doc.is_element(n))
            .collect();
        for &el in &chain {
            registry.exempt(doc, el);
        }
        let outside = self.outside(doc);
        for &el in &outside {
            registry.hold(doc, el);
        }
        registry.lock_scroll(doc);
        tracing::debug!("{} element(s) made inert around {}", outside.len(), self.target);
        *self.exempted.borrow_mut() = chain;
        *self.held.borrow_mut() = outside;
    }

    pub fn deactivate(&self, doc: &mut Document) {
        if !self.locked.replace(false) {
            return;
        }
        let registry = doc.service::<InertRegistry>();
        for el in self.held.take() {
            registry.release(doc, el);
        }
        for el in self.exempted.take() {
            registry.unexempt(doc, el);
        }
        registry.unlock_scroll(doc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inert_round_trip() {
        let mut doc = Document::new();
        let body = doc.body();
        let header = doc.create_element("header");
        let main = doc.create_element("main");
        let aside = doc.create_element("aside");
        let dialog = doc.create_element("div");
        for el in [header, main, dialog] {
            doc.append_child(body, el).unwrap();
        }
        doc.append_child(main, aside).unwrap();
        doc.set_attribute(header, "aria-hidden", "false");
        doc.set_attribute(main, "inert", "");
        doc.set_style_property(body, "overflow", "auto");

        let inert = InertController::new(dialog);
        inert.activate(&mut doc);
        assert_eq!(doc.get_attribute(header, "aria-hidden"), Some("true"));
        assert!(doc.has_attribute(header, "inert"));
        assert!(doc.has_attribute(doc.head(), "inert"));
        assert!(!doc.has_attribute(dialog, "inert"));
        assert!(!doc.has_attribute(aside, "aria-hidden"));
        assert_eq!(doc.style_property(body, "overflow").as_deref(), Some("hidden"));
        assert!(doc.has_class(body, "modal-open"));

        inert.deactivate(&mut doc);
        assert_eq!(doc.get_attribute(header, "aria-hidden"), Some("false"));
        assert!(!doc.has_attribute(header, "inert"));
        assert!(doc.has_attribute(main, "inert"));
        assert!(!doc.has_attribute(main, "aria-hidden"));
        assert!(!doc.has_attribute(doc.head(), "inert"));
        assert_eq!(doc.style_property(body, "overflow").as_deref(), Some("auto"));
        assert!(!doc.has_class(body, "modal-open"));
    }

    #[test]
    fn test_overlapping_surfaces_close_in_any_order() {
        let mut doc = Document::new();
        let body = doc.body();
        let main = doc.create_element("main");
        let outer = doc.create_element("div");
        let text = doc.create_element("p");
        let inner = doc.create_element("div");
        for el in [main, outer] {
            doc.append_child(body, el).unwrap();
        }
        doc.append_child(outer, text).unwrap();
        doc.append_child(outer, inner).unwrap();

        let first = InertController::new(outer);
        let second = InertController::new(inner);
        first.activate(&mut doc);
        second.activate(&mut doc);
        assert!(doc.has_attribute(text, "inert"));
        assert!(!doc.has_attribute(outer, "inert"));

        first.deactivate(&mut doc);
        assert_eq!(doc.get_attribute(main, "aria-hidden"), Some("true"));
        assert!(doc.has_attribute(main, "inert"));
        assert!(doc.has_class(body, "modal-open"));

        second.deactivate(&mut doc);
        assert!(!doc.has_attribute(main, "aria-hidden"));
        assert!(!doc.has_attribute(main, "inert"));
        assert!(!doc.has_attribute(text, "aria-hidden"));
        assert!(!doc.has_class(body, "modal-open"));
        assert_eq!(doc.style_property(body, "overflow"), None);
    }

    #[test]
    fn test_stacked_sibling_surface_is_lifted() {
        let mut doc = Document::new();
        let body = doc.body();
        let lower = doc.create_element("div");
        let upper = doc.create_element("div");
        doc.append_child(body, lower).unwrap();
        doc.append_child(body, upper).unwrap();

        let below = InertController::new(lower);
        let above = InertController::new(upper);
        below.activate(&mut doc);
        assert!(doc.has_attribute(upper, "inert"));

        above.activate(&mut doc);
        assert!(!doc.has_attribute(upper, "inert"));
        assert!(!doc.has_attribute(upper, "aria-hidden"));
        assert!(doc.has_attribute(lower, "inert"));

        above.deactivate(&mut doc);
        assert!(doc.has_attribute(upper, "inert"));
        assert!(!doc.has_attribute(lower, "inert"));

        below.deactivate(&mut doc);
        assert!(!doc.has_attribute(upper, "inert"));
        assert!(!doc.has_attribute(upper, "aria-hidden"));
    }

    #[test]
    fn test_restore_focus_falls_back_to_opener() {
        let mut doc = Document::new();
        let body = doc.body();
        let opener = doc.create_element("button");
        let other = doc.create_element("button");
        let dialog = doc.create_element("div");
        for el in [opener, other, dialog] {
            doc.append_child(body, el).unwrap();
        }
        let restore = RestoreFocusController::new(dialog);

        doc.focus(other).unwrap();
        restore.capture(&doc, opener);
        doc.remove_node(other);
        restore.restore(&mut doc);
        assert_eq!(doc.active_element(), opener);
    }

    #[test]
    fn test_restore_focus_prefers_outside_element() {
        let mut doc = Document::new();
        let body = doc.body();
        let opener = doc.create_element("button");
        let other = doc.create_element("button");
        let dialog = doc.create_element("div");
        for el in [opener, other, dialog] {
            doc.append_child(body, el).unwrap();
        }
        let restore = RestoreFocusController::new(dialog);

        restore.capture(&doc, opener);
        doc.focus(other).unwrap();
        restore.restore(&mut doc);
        assert_eq!(doc.active_element(), opener);

        restore.capture(&doc, other);
        restore.restore(&mut doc);
        assert_eq!(doc.active_element(), opener);
    }
}
