//! Focus Trap Pattern
//!
//! `data-automagica11y-focus-trap` containers trap focus while they are
//! visible. The trap follows toggle and popover events that name the
//! container, and with `focus-trap-auto` (the default) it also follows
//! the container's own visibility attributes. Removing the container
//! from the document tears everything down.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use ama_a11y::{enable_focus_trap, is_focus_trap_visible, FocusTrapHandle, FocusTrapOptions};
use ama_dom::{Document, ListenerId, ListenerOptions, MutationObserverInit, NodeId, ObserverId};

use crate::attributes::read_focus_trap_settings;
use crate::events::{self, TargetsDetail, ToggleDetail};
use crate::patterns::popover::PopoverDetail;

const WATCHED_ATTRIBUTES: &[&str] = &["hidden", "aria-hidden", "style", "class", "disabled", "inert"];

struct TrapBinding {
    container: NodeId,
    options: FocusTrapOptions,
    handle: RefCell<Option<FocusTrapHandle>>,
    observers: RefCell<Vec<ObserverId>>,
    listeners: RefCell<Vec<ListenerId>>,
}

impl TrapBinding {
    fn is_active(&self) -> bool {
        self.handle.borrow().as_ref().is_some_and(FocusTrapHandle::is_active)
    }

    fn enable(&self, doc: &mut Document) {
        if self.is_active() {
            return;
        }
        let handle = enable_focus_trap(doc, self.container, self.options.clone());
        *self.handle.borrow_mut() = Some(handle);
    }

    fn disable(&self, doc: &mut Document) {
        let handle = self.handle.borrow_mut().take();
        if let Some(handle) = handle {
            handle.release(doc);
        }
    }

    fn sync_visibility(&self, doc: &mut Document) {
        if is_focus_trap_visible(doc, self.container) {
            self.enable(doc);
        } else {
            self.disable(doc);
        }
    }

    fn teardown(&self, doc: &mut Document) {
        self.disable(doc);
        for id in self.observers.take() {
            doc.disconnect_observer(id);
        }
        for id in self.listeners.take() {
            doc.remove_event_listener(id);
        }
    }

    fn names(&self, detail_target: NodeId, targets: &[NodeId]) -> bool {
        detail_target == self.container || targets.contains(&self.container)
    }
}

#[derive(Default)]
struct FocusTrapPatterns {
    bindings: RefCell<HashMap<NodeId, Rc<TrapBinding>>>,
}

fn listen(
    doc: &mut Document,
    binding: &Rc<TrapBinding>,
    kind: &str,
    handler: impl Fn(&TrapBinding, &mut Document, &ama_dom::Event) + 'static,
) {
    let weak: Weak<TrapBinding> = Rc::downgrade(binding);
    let id = doc.add_event_listener(NodeId::ROOT, kind, ListenerOptions::capture(), move |doc, event| {
        if let Some(binding) = weak.upgrade() {
            handler(&binding, doc, event);
        }
    });
    binding.listeners.borrow_mut().push(id);
}

/// Hydrate a focus-trap container. Returns false if it was already
/// hydrated or is not an element.
pub fn init_focus_trap(doc: &mut Document, container: NodeId) -> bool {
    if !doc.is_element(container) {
        return false;
    }
    let patterns = doc.service::<FocusTrapPatterns>();
    if patterns.bindings.borrow().contains_key(&container) {
        return false;
    }

    let settings = read_focus_trap_settings(doc, container);
    let binding = Rc::new(TrapBinding {
        container,
        options: settings.options,
        handle: RefCell::new(None),
        observers: RefCell::new(Vec::new()),
        listeners: RefCell::new(Vec::new()),
    });
    patterns.bindings.borrow_mut().insert(container, binding.clone());

    listen(doc, &binding, events::TOGGLE, |binding, doc, event| {
        let Some(detail) = event.detail::<ToggleDetail>() else {
            return;
        };
        // Closing is still cancelable here; `CLOSED` confirms it
        if detail.expanded && binding.names(detail.target, &detail.targets) {
            binding.enable(doc);
        }
    });
    listen(doc, &binding, events::OPENED, |binding, doc, event| {
        if event.detail::<TargetsDetail>().is_some_and(|d| binding.names(d.target, &d.targets)) {
            binding.enable(doc);
        }
    });
    listen(doc, &binding, events::CLOSED, |binding, doc, event| {
        if event.detail::<TargetsDetail>().is_some_and(|d| binding.names(d.target, &d.targets)) {
            binding.disable(doc);
        }
    });
    listen(doc, &binding, events::POPOVER_SHOWN, |binding, doc, event| {
        if event.detail::<PopoverDetail>().is_some_and(|d| d.target == binding.container) {
            binding.enable(doc);
        }
    });
    listen(doc, &binding, events::POPOVER_HIDDEN, |binding, doc, event| {
        if event.detail::<PopoverDetail>().is_some_and(|d| d.target == binding.container) {
            binding.disable(doc);
        }
    });

    let weak = Rc::downgrade(&binding);
    let removal = doc.create_mutation_observer(move |doc, _, _| {
        let Some(binding) = weak.upgrade() else {
            return;
        };
        if !doc.is_connected(binding.container) {
            tracing::debug!("focus trap container {} left the document", binding.container);
            release_focus_trap(doc, binding.container);
        }
    });
    let body = doc.body();
    let watch_tree = MutationObserverInit { child_list: true, subtree: true, ..Default::default() };
    if let Err(err) = doc.observe(removal, body, watch_tree) {
        tracing::debug!("focus trap removal observer not attached: {}", err);
    }
    binding.observers.borrow_mut().push(removal);

    if settings.auto {
        let weak = Rc::downgrade(&binding);
        let visibility = doc.create_mutation_observer(move |doc, _, _| {
            if let Some(binding) = weak.upgrade() {
                binding.sync_visibility(doc);
            }
        });
        let watch_attrs = MutationObserverInit {
            attributes: true,
            attribute_filter: Some(WATCHED_ATTRIBUTES.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        };
        if let Err(err) = doc.observe(visibility, container, watch_attrs) {
            tracing::debug!("focus trap visibility observer not attached: {}", err);
        }
        binding.observers.borrow_mut().push(visibility);
        if is_focus_trap_visible(doc, container) {
            binding.enable(doc);
        }
    }

    tracing::debug!("focus trap pattern on {} (auto: {})", container, settings.auto);
    true
}

/// Release the container's trap and stop following it. Returns false if
/// it was not hydrated.
pub fn release_focus_trap(doc: &mut Document, container: NodeId) -> bool {
    let Some(patterns) = doc.try_service::<FocusTrapPatterns>() else {
        return false;
    };
    let binding = patterns.bindings.borrow_mut().remove(&container);
    match binding {
        Some(binding) => {
            binding.teardown(doc);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::popover::{init_popover, set_popover_state};
    use crate::toggle::{init_toggle, set_toggle_state};

    fn is_trapping(doc: &Document, container: NodeId) -> bool {
        doc.try_service::<FocusTrapPatterns>()
            .and_then(|p| p.bindings.borrow().get(&container).cloned())
            .is_some_and(|b| b.is_active())
    }

    struct Page {
        doc: Document,
        opener: NodeId,
        panel: NodeId,
        inner: NodeId,
    }

    fn page(panel_attrs: &[(&str, &str)]) -> Page {
        let mut doc = Document::new();
        let body = doc.body();
        let opener = doc.create_element("button");
        let panel = doc.create_element("div");
        let inner = doc.create_element("button");
        doc.set_attribute(panel, "id", "panel");
        doc.set_attribute(panel, "data-automagica11y-focus-trap", "");
        for (name, value) in panel_attrs {
            doc.set_attribute(panel, name, value);
        }
        doc.append_child(body, opener).unwrap();
        doc.append_child(body, panel).unwrap();
        doc.append_child(panel, inner).unwrap();
        Page { doc, opener, panel, inner }
    }

    #[test]
    fn test_visible_container_traps_on_hydration() {
        let mut p = page(&[]);
        assert!(init_focus_trap(&mut p.doc, p.panel));
        assert!(!init_focus_trap(&mut p.doc, p.panel));
        assert!(is_trapping(&p.doc, p.panel));
        p.doc.run_microtasks();
        assert_eq!(p.doc.active_element(), p.inner);
    }

    #[test]
    fn test_follows_hidden_attribute() {
        let mut p = page(&[("hidden", "")]);
        init_focus_trap(&mut p.doc, p.panel);
        assert!(!is_trapping(&p.doc, p.panel));

        p.doc.remove_attribute(p.panel, "hidden");
        p.doc.run_microtasks();
        assert!(is_trapping(&p.doc, p.panel));

        p.doc.set_attribute(p.panel, "hidden", "");
        p.doc.run_microtasks();
        assert!(!is_trapping(&p.doc, p.panel));
    }

    #[test]
    fn test_follows_toggle_events_without_auto() {
        let mut p = page(&[("data-automagica11y-focus-trap-auto", "false")]);
        p.doc.set_attribute(p.opener, "data-automagica11y-toggle", "#panel");
        init_toggle(&mut p.doc, p.opener).unwrap();
        init_focus_trap(&mut p.doc, p.panel);
        assert!(!is_trapping(&p.doc, p.panel));

        set_toggle_state(&mut p.doc, p.opener, true);
        assert!(is_trapping(&p.doc, p.panel));
        set_toggle_state(&mut p.doc, p.opener, false);
        assert!(!is_trapping(&p.doc, p.panel));
    }

    #[test]
    fn test_follows_popover_events() {
        let mut p = page(&[("data-automagica11y-focus-trap-auto", "0")]);
        p.doc.set_attribute(p.opener, "data-automagica11y-popover", "#panel");
        init_popover(&mut p.doc, p.opener);
        init_focus_trap(&mut p.doc, p.panel);

        set_popover_state(&mut p.doc, p.opener, true);
        assert!(is_trapping(&p.doc, p.panel));
        set_popover_state(&mut p.doc, p.opener, false);
        assert!(!is_trapping(&p.doc, p.panel));
    }

    #[test]
    fn test_removed_container_tears_down() {
        let mut p = page(&[]);
        init_focus_trap(&mut p.doc, p.panel);
        assert!(p.doc.listener_count_on(NodeId::ROOT) >= 5);

        p.doc.remove_node(p.panel);
        p.doc.run_microtasks();
        assert!(!release_focus_trap(&mut p.doc, p.panel));
        assert_eq!(p.doc.listener_count_on(NodeId::ROOT), 0);
    }
}
