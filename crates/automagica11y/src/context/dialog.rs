//! Dialog behaviors
//!
//! One behavior state per dialog surface, shared by every trigger bound
//! to it. While open, the surface traps focus, hides the rest of the page
//! and closes on Escape; on close, focus goes back to where it was.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use ama_dom::{Document, ListenerOptions, NodeId};

use super::controllers::{EscapeController, FocusTrapController, InertController, RestoreFocusController};
use crate::attributes::{has_data, prefixed_selector, set_hidden_state};
use crate::toggle::{on_destroy, on_transition, set_toggle_state};

struct DialogState {
    target: NodeId,
    trap: FocusTrapController,
    restore: RestoreFocusController,
    escape: EscapeController,
    inert: InertController,
    current_trigger: Cell<Option<NodeId>>,
    triggers: RefCell<Vec<NodeId>>,
}

impl DialogState {
    fn new(target: NodeId) -> Self {
        Self {
            target,
            trap: FocusTrapController::new(target),
            restore: RestoreFocusController::new(target),
            escape: EscapeController::new(),
            inert: InertController::new(target),
            current_trigger: Cell::new(None),
            triggers: RefCell::new(Vec::new()),
        }
    }

    fn close_current(&self, doc: &mut Document) {
        if let Some(trigger) = self.current_trigger.get() {
            set_toggle_state(doc, trigger, false);
        }
    }

    fn activate(&self, doc: &mut Document, trigger: NodeId) {
        let others: Vec<NodeId> = self.triggers.borrow().iter().copied().filter(|&t| t != trigger).collect();
        for other in others {
            set_toggle_state(doc, other, false);
        }

        self.current_trigger.set(Some(trigger));
        self.restore.capture(doc, trigger);
        self.inert.activate(doc);
        // Another trigger's close, or a surface beneath, may have hidden it
        set_hidden_state(doc, self.target, false);
        self.trap.activate(doc);
        self.escape.activate(doc, trigger, self.trap.handle());
        tracing::debug!("dialog {} opened by {}", self.target, trigger);
    }

    fn deactivate(&self, doc: &mut Document, trigger: NodeId) {
        if self.current_trigger.get() != Some(trigger) {
            return;
        }
        self.escape.deactivate(doc);
        self.trap.deactivate(doc);
        self.inert.deactivate(doc);
        self.restore.restore(doc);
        self.current_trigger.set(None);
        tracing::debug!("dialog {} closed", self.target);
    }

    /// Forget a destroyed trigger, releasing the page if it owned it
    fn unbind(&self, doc: &mut Document, trigger: NodeId) {
        self.triggers.borrow_mut().retain(|&t| t != trigger);
        if self.current_trigger.get() == Some(trigger) {
            self.escape.deactivate(doc);
            self.trap.deactivate(doc);
            self.inert.deactivate(doc);
            self.restore.forget();
            self.current_trigger.set(None);
        }
        tracing::debug!("dialog {} unbound from {}", self.target, trigger);
    }
}

impl fmt::Debug for DialogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogState")
            .field("target", &self.target)
            .field("current_trigger", &self.current_trigger.get())
            .field("triggers", &self.triggers.borrow())
            .finish()
    }
}

/// Dialog behavior state keyed by surface
#[derive(Debug, Default)]
pub(crate) struct DialogRegistry {
    dialogs: RefCell<HashMap<NodeId, Rc<DialogState>>>,
}

fn ensure_state(doc: &mut Document, target: NodeId) -> Rc<DialogState> {
    let registry = doc.service::<DialogRegistry>();
    if let Some(state) = registry.dialogs.borrow().get(&target) {
        return state.clone();
    }

    let state = Rc::new(DialogState::new(target));
    let weak = Rc::downgrade(&state);
    let closer = prefixed_selector("dialog-close");
    doc.add_event_listener(target, "click", ListenerOptions::default(), move |doc, event| {
        let Some(state) = weak.upgrade() else {
            return;
        };
        let origin = event.target();
        let close_control = doc
            .closest(origin, &closer)
            .ok()
            .flatten()
            .filter(|&el| doc.contains(target, el));
        if close_control.is_some() || (origin == target && has_data(doc, target, "dialog-dismissable")) {
            event.prevent_default();
            state.close_current(doc);
        }
    });
    registry.dialogs.borrow_mut().insert(target, state.clone());
    state
}

/// Bind `trigger` to the dialog behaviors of `target`
pub(crate) fn enable(doc: &mut Document, trigger: NodeId, target: NodeId) {
    let state = ensure_state(doc, target);
    if state.triggers.borrow().contains(&trigger) {
        return;
    }
    state.triggers.borrow_mut().push(trigger);

    let bound = state.clone();
    on_destroy(doc, trigger, move |doc| bound.unbind(doc, trigger));

    on_transition(doc, trigger, move |doc, detail| {
        if detail.target != target {
            return;
        }
        if detail.expanded {
            state.activate(doc, trigger);
        } else {
            state.deactivate(doc, trigger);
        }
    });
}
