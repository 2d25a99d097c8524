//! Focus Traps
//!
//! Keeps Tab navigation inside a container while it is open. Traps are
//! kept on a per-document stack: only the top trap reacts to keyboard
//! and focus events, the ones below it are paused with their sentinels
//! and observers left in place, and releasing the top trap resumes the
//! one underneath without re-running its initial focus.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use ama_dom::{Document, Event, ListenerId, ListenerOptions, MutationObserverInit, NodeId, ObserverId};

use crate::focus::{focus_element, get_focusable_in, is_focusable, FocusOptions};

/// Event dispatched on the container when Escape releases a trap
pub const FOCUS_TRAP_ESCAPE_EVENT: &str = "automagica11y:focus-trap:escape";

/// Attributes whose change can hide a trapped container
const VISIBILITY_ATTRIBUTES: &[&str] = &["hidden", "aria-hidden", "style", "class", "disabled", "inert"];

const SENTINEL_STYLE: &str = "position: fixed; width: 1px; height: 1px; margin: -1px; padding: 0; border: 0; \
    clip: rect(0 0 0 0); clip-path: inset(50%); overflow: hidden; opacity: 0; pointer-events: none; \
    white-space: nowrap;";

/// Where focus lands when a trap activates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InitialFocus {
    #[default]
    First,
    Last,
    /// Selector scoped to the container; falls back to `First`
    Selector(String),
}

impl InitialFocus {
    /// `first`/`last` (any case), blank means `first`, anything else
    /// is a selector
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "first" => Self::First,
            "last" => Self::Last,
            _ => Self::Selector(trimmed.to_string()),
        }
    }
}

/// Focus trap options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusTrapOptions {
    pub initial: InitialFocus,
    /// Restore focus to the invoker on release
    pub return_focus: bool,
    /// Escape releases the trap
    pub escape_dismiss: bool,
}

impl Default for FocusTrapOptions {
    fn default() -> Self {
        Self {
            initial: InitialFocus::First,
            return_focus: true,
            escape_dismiss: false,
        }
    }
}

/// Options read from markup, plus whether the trap manages itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusTrapSettings {
    pub options: FocusTrapOptions,
    pub auto: bool,
}

impl FocusTrapSettings {
    /// Read settings through an attribute lookup keyed by suffix
    /// (`focus-trap-initial`, `focus-trap-return`,
    /// `focus-trap-escape-dismiss`, `focus-trap-auto`)
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let initial = get("focus-trap-initial")
            .map(|v| InitialFocus::parse(&v))
            .unwrap_or_default();
        Self {
            options: FocusTrapOptions {
                initial,
                return_focus: parse_flag(get("focus-trap-return").as_deref(), true),
                escape_dismiss: parse_flag(get("focus-trap-escape-dismiss").as_deref(), false),
            },
            auto: parse_flag(get("focus-trap-auto").as_deref(), true),
        }
    }
}

/// Boolean attribute value: `true`/`1` and `false`/`0`, anything else
/// (including absent or empty) keeps the default
pub fn parse_flag(value: Option<&str>, default: bool) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}

/// Why a trap was released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseReason {
    Manual,
    Escape,
    /// The container stopped being visible
    Auto,
}

/// Payload of [`FOCUS_TRAP_ESCAPE_EVENT`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusTrapEscape {
    pub container: NodeId,
}

/// Connected, and neither it nor an ancestor is hidden, `aria-hidden`,
/// disabled, inert, `display: none` or `visibility: hidden`
pub fn is_focus_trap_visible(doc: &Document, el: NodeId) -> bool {
    if !doc.is_connected(el) {
        return false;
    }
    std::iter::once(el)
        .chain(doc.tree().ancestors(el))
        .filter(|&n| doc.is_element(n))
        .all(|n| {
            !doc.has_attribute(n, "hidden")
                && doc.get_attribute(n, "aria-hidden") != Some("true")
                && !doc.has_attribute(n, "disabled")
                && !doc.has_attribute(n, "inert")
                && doc.style_property(n, "display").as_deref() != Some("none")
                && !matches!(doc.style_property(n, "visibility").as_deref(), Some("hidden" | "collapse"))
        })
}

fn try_focus(doc: &mut Document, el: NodeId) -> bool {
    match focus_element(doc, el, FocusOptions { preserve_tab_index: true }) {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!("focus trap could not focus {}: {}", el, err);
            false
        }
    }
}

/// Per-document stack of focus traps
///
/// Installed as a document service; tests or hosts that want isolation
/// can install their own with [`FocusTrapStack::install`].
#[derive(Default)]
pub struct FocusTrapStack {
    entries: RefCell<Vec<Rc<FocusTrap>>>,
}

impl FocusTrapStack {
    /// The stack serving `doc`
    pub fn for_document(doc: &mut Document) -> Rc<Self> {
        doc.service::<Self>()
    }

    /// Replace the stack serving `doc`
    pub fn install(doc: &mut Document, stack: Rc<Self>) {
        doc.set_service(stack);
    }

    fn peek(&self) -> Option<Rc<FocusTrap>> {
        self.entries.borrow().last().cloned()
    }

    /// Make `trap` the top of the stack, pausing the previous top
    pub fn push(&self, doc: &mut Document, trap: &Rc<FocusTrap>) {
        let current = self.peek();
        if current.as_ref().is_some_and(|c| Rc::ptr_eq(c, trap)) {
            return;
        }
        if let Some(current) = current {
            current.pause(doc);
        }
        self.entries.borrow_mut().push(Rc::clone(trap));
        tracing::debug!("focus trap pushed on {} (depth {})", trap.container, self.len());
        trap.activate(doc);
    }

    /// Take `trap` off the stack wherever it is and tear it down. If it
    /// was on top, the trap beneath resumes.
    pub fn remove(&self, doc: &mut Document, trap: &Rc<FocusTrap>) {
        let was_top = {
            let mut entries = self.entries.borrow_mut();
            let Some(index) = entries.iter().position(|t| Rc::ptr_eq(t, trap)) else {
                return;
            };
            let was_top = index + 1 == entries.len();
            entries.remove(index);
            was_top
        };
        tracing::debug!("focus trap removed from {} (depth {})", trap.container, self.len());
        trap.deactivate(doc);
        if was_top {
            if let Some(top) = self.peek() {
                top.resume(doc);
            }
        }
    }

    /// Only the top trap may act on keyboard and focus events
    pub fn is_top(&self, trap: &FocusTrap) -> bool {
        self.entries.borrow().last().is_some_and(|t| std::ptr::eq(Rc::as_ptr(t), trap))
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Container of the top trap
    pub fn top_container(&self) -> Option<NodeId> {
        self.entries.borrow().last().map(|t| t.container)
    }
}

#[derive(Default)]
struct TrapState {
    invoker: Option<NodeId>,
    sentinels: Option<(NodeId, NodeId)>,
    sentinel_listeners: Vec<ListenerId>,
    listeners: Vec<ListenerId>,
    observers: Vec<ObserverId>,
}

/// One containment region
pub struct FocusTrap {
    container: NodeId,
    options: FocusTrapOptions,
    stack: Weak<FocusTrapStack>,
    active: Cell<bool>,
    paused: Cell<bool>,
    release_requested: Cell<bool>,
    return_focus: Cell<bool>,
    state: RefCell<TrapState>,
}

impl FocusTrap {
    fn new(container: NodeId, options: FocusTrapOptions, stack: &Rc<FocusTrapStack>) -> Rc<Self> {
        Rc::new(Self {
            container,
            return_focus: Cell::new(options.return_focus),
            options,
            stack: Rc::downgrade(stack),
            active: Cell::new(false),
            paused: Cell::new(false),
            release_requested: Cell::new(false),
            state: RefCell::new(TrapState::default()),
        })
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.get()
    }

    fn is_top(&self) -> bool {
        self.stack.upgrade().is_some_and(|s| s.is_top(self))
    }

    /// Active, not paused and on top
    fn in_control(&self) -> bool {
        self.active.get() && !self.paused.get() && self.is_top()
    }

    fn enable(self: &Rc<Self>, doc: &mut Document) {
        if self.active.get() {
            return;
        }
        self.active.set(true);
        self.return_focus.set(self.options.return_focus);
        let invoker = doc.active_element();
        self.state.borrow_mut().invoker = (invoker != doc.body()).then_some(invoker);
        if let Some(stack) = self.stack.upgrade() {
            stack.push(doc, self);
        }
    }

    fn release(self: &Rc<Self>, doc: &mut Document, reason: ReleaseReason, return_focus: bool) {
        if !self.active.get() || self.release_requested.get() {
            return;
        }
        tracing::debug!("releasing focus trap on {} ({:?})", self.container, reason);
        self.release_requested.set(true);
        self.return_focus.set(return_focus);
        match self.stack.upgrade() {
            Some(stack) => stack.remove(doc, self),
            None => self.deactivate(doc),
        }
    }

    fn activate(self: &Rc<Self>, doc: &mut Document) {
        self.paused.set(false);
        self.ensure_sentinels(doc);
        self.observe(doc);
        self.attach_listeners(doc);
        self.focus_initial(doc);
    }

    fn deactivate(&self, doc: &mut Document) {
        self.detach_listeners(doc);
        self.disconnect_observers(doc);
        self.remove_sentinels(doc);
        self.restore_focus(doc);
        self.active.set(false);
        self.release_requested.set(false);
        self.paused.set(false);
    }

    fn pause(&self, doc: &mut Document) {
        if !self.active.get() || self.paused.get() {
            return;
        }
        self.paused.set(true);
        self.detach_listeners(doc);
    }

    fn resume(self: &Rc<Self>, doc: &mut Document) {
        if !self.active.get() || !self.paused.get() {
            return;
        }
        self.paused.set(false);
        if !is_focus_trap_visible(doc, self.container) {
            let return_focus = self.options.return_focus;
            self.release(doc, ReleaseReason::Auto, return_focus);
            return;
        }
        self.attach_listeners(doc);
    }

    fn focus_initial(self: &Rc<Self>, doc: &mut Document) {
        let trap = Rc::clone(self);
        doc.queue_microtask(move |doc| {
            if !trap.in_control() {
                return;
            }
            match &trap.options.initial {
                InitialFocus::Last => trap.focus_last(doc),
                InitialFocus::First => trap.focus_first(doc),
                InitialFocus::Selector(selector) => {
                    let target = doc
                        .query_selector(trap.container, selector)
                        .unwrap_or_else(|err| {
                            tracing::debug!("initial focus selector ignored: {}", err);
                            None
                        })
                        .filter(|&el| is_focusable(doc, el));
                    match target {
                        Some(el) if try_focus(doc, el) => {}
                        _ => trap.focus_first(doc),
                    }
                }
            }
        });
    }

    /// Focusable descendants, computed fresh each time
    fn tabbables(&self, doc: &Document) -> Vec<NodeId> {
        get_focusable_in(doc, self.container)
    }

    fn focus_first(&self, doc: &mut Document) {
        let target = self.tabbables(doc).first().copied().unwrap_or(self.container);
        try_focus(doc, target);
    }

    fn focus_last(&self, doc: &mut Document) {
        let target = self.tabbables(doc).last().copied().unwrap_or(self.container);
        try_focus(doc, target);
    }

    fn ensure_sentinels(self: &Rc<Self>, doc: &mut Document) {
        if self.state.borrow().sentinels.is_some() {
            return;
        }
        let Some(parent) = doc.parent(self.container) else {
            return;
        };
        let before = self.create_sentinel(doc, false);
        let after = self.create_sentinel(doc, true);
        let next = doc.tree().next_sibling(self.container);
        let inserted = doc
            .insert_before(parent, before, Some(self.container))
            .and_then(|()| doc.insert_before(parent, after, next));
        if let Err(err) = inserted {
            tracing::debug!("focus trap sentinels not inserted: {}", err);
            doc.remove_node(before);
            doc.remove_node(after);
            return;
        }
        self.state.borrow_mut().sentinels = Some((before, after));
    }

    /// Leading sentinel wraps to the last tabbable, trailing to the first
    fn create_sentinel(self: &Rc<Self>, doc: &mut Document, trailing: bool) -> NodeId {
        let sentinel = doc.create_element("span");
        doc.set_attribute(sentinel, "aria-hidden", "true");
        doc.set_attribute(sentinel, "tabindex", "0");
        doc.set_attribute(sentinel, "style", SENTINEL_STYLE);
        doc.set_attribute(sentinel, "data-automagica11y-focus-sentinel", if trailing { "after" } else { "before" });
        let trap = Rc::clone(self);
        let id = doc.add_event_listener(sentinel, "focus", ListenerOptions::default(), move |doc, _| {
            if !trap.is_top() {
                return;
            }
            if trailing {
                trap.focus_first(doc);
            } else {
                trap.focus_last(doc);
            }
        });
        self.state.borrow_mut().sentinel_listeners.push(id);
        sentinel
    }

    fn remove_sentinels(&self, doc: &mut Document) {
        let (sentinels, listeners) = {
            let mut state = self.state.borrow_mut();
            (state.sentinels.take(), std::mem::take(&mut state.sentinel_listeners))
        };
        for id in listeners {
            doc.remove_event_listener(id);
        }
        if let Some((before, after)) = sentinels {
            doc.remove_node(before);
            doc.remove_node(after);
        }
    }

    fn observe(self: &Rc<Self>, doc: &mut Document) {
        if !self.state.borrow().observers.is_empty() {
            return;
        }
        let on_mutation = {
            let trap = Rc::downgrade(self);
            move |doc: &mut Document, _: &[ama_dom::MutationRecord], _: ObserverId| {
                let Some(trap) = trap.upgrade() else {
                    return;
                };
                // A trap above may hide this one's page; `resume` checks again
                if trap.is_paused() {
                    return;
                }
                if !is_focus_trap_visible(doc, trap.container) {
                    let return_focus = trap.options.return_focus;
                    trap.release(doc, ReleaseReason::Auto, return_focus);
                }
            }
        };

        let own = doc.create_mutation_observer(on_mutation.clone());
        let own_init = MutationObserverInit {
            subtree: false,
            ..MutationObserverInit::attributes_in_subtree(VISIBILITY_ATTRIBUTES)
        };
        let body = doc.body();
        let page = doc.create_mutation_observer(on_mutation);
        let page_init = MutationObserverInit {
            child_list: true,
            ..MutationObserverInit::attributes_in_subtree(VISIBILITY_ATTRIBUTES)
        };
        for (observer, target, init) in [(own, self.container, own_init), (page, body, page_init)] {
            if let Err(err) = doc.observe(observer, target, init) {
                tracing::debug!("focus trap observer not attached: {}", err);
            }
        }
        self.state.borrow_mut().observers = vec![own, page];
    }

    fn disconnect_observers(&self, doc: &mut Document) {
        let observers = std::mem::take(&mut self.state.borrow_mut().observers);
        for id in observers {
            doc.disconnect_observer(id);
        }
    }

    fn attach_listeners(self: &Rc<Self>, doc: &mut Document) {
        if !self.state.borrow().listeners.is_empty() {
            return;
        }
        let trap = Rc::clone(self);
        let focusin = doc.add_event_listener(NodeId::ROOT, "focusin", ListenerOptions::capture(), move |doc, event| {
            trap.handle_focus_in(doc, event);
        });
        let trap = Rc::clone(self);
        let keydown = doc.add_event_listener(self.container, "keydown", ListenerOptions::capture(), move |doc, event| {
            trap.handle_keydown(doc, event);
        });
        self.state.borrow_mut().listeners = vec![focusin, keydown];
    }

    fn detach_listeners(&self, doc: &mut Document) {
        let listeners = std::mem::take(&mut self.state.borrow_mut().listeners);
        for id in listeners {
            doc.remove_event_listener(id);
        }
    }

    fn handle_focus_in(&self, doc: &mut Document, event: &mut Event) {
        if !self.in_control() {
            return;
        }
        let target = event.target();
        // Stale when a focus listener already moved focus elsewhere
        if !doc.has_focus(target) {
            return;
        }
        let is_sentinel = self
            .state
            .borrow()
            .sentinels
            .is_some_and(|(before, after)| target == before || target == after);
        if !is_sentinel && !doc.contains(self.container, target) {
            self.focus_first(doc);
        }
    }

    fn handle_keydown(self: &Rc<Self>, doc: &mut Document, event: &mut Event) {
        if !self.in_control() {
            return;
        }
        match event.key() {
            Some("Tab") => self.handle_tab(doc, event),
            Some("Escape") if self.options.escape_dismiss => {
                event.prevent_default();
                let return_focus = self.options.return_focus;
                self.release(doc, ReleaseReason::Escape, return_focus);
                let container = self.container;
                doc.dispatch_event(
                    container,
                    Event::custom(FOCUS_TRAP_ESCAPE_EVENT, FocusTrapEscape { container }),
                );
            }
            _ => {}
        }
    }

    fn handle_tab(&self, doc: &mut Document, event: &mut Event) {
        event.prevent_default();
        let tabbables = self.tabbables(doc);
        let Some(&last) = tabbables.last() else {
            try_focus(doc, self.container);
            return;
        };
        let first = tabbables[0];
        let current = tabbables.iter().position(|&el| doc.has_focus(el));
        let next = match (event.shift_key(), current) {
            (true, None | Some(0)) => last,
            (true, Some(i)) => tabbables[i - 1],
            (false, Some(i)) if i + 1 < tabbables.len() => tabbables[i + 1],
            (false, _) => first,
        };
        try_focus(doc, next);
    }

    /// Invoker if still visible, else the container, else the first
    /// focusable element in the document
    fn restore_focus(&self, doc: &mut Document) {
        let invoker = self.state.borrow_mut().invoker.take();
        if !self.return_focus.get() {
            return;
        }
        if let Some(invoker) = invoker {
            if is_focus_trap_visible(doc, invoker) && try_focus(doc, invoker) {
                return;
            }
        }
        if is_focus_trap_visible(doc, self.container) && try_focus(doc, self.container) {
            return;
        }
        if let Some(&first) = get_focusable_in(doc, NodeId::ROOT).first() {
            try_focus(doc, first);
        }
    }
}

/// Handle returned by [`enable_focus_trap`]
#[derive(Clone)]
pub struct FocusTrapHandle {
    trap: Rc<FocusTrap>,
}

impl FocusTrapHandle {
    /// Release the trap, restoring focus if the options ask for it
    pub fn release(&self, doc: &mut Document) {
        let return_focus = self.trap.options.return_focus;
        self.trap.release(doc, ReleaseReason::Manual, return_focus);
    }

    /// Release with an explicit reason and focus-return choice
    pub fn release_with(&self, doc: &mut Document, reason: ReleaseReason, return_focus: bool) {
        self.trap.release(doc, reason, return_focus);
    }

    pub fn is_active(&self) -> bool {
        self.trap.is_active()
    }

    pub fn is_paused(&self) -> bool {
        self.trap.is_paused()
    }

    /// Whether this trap is the innermost one on its stack
    pub fn is_top(&self) -> bool {
        self.trap.stack.upgrade().is_some_and(|stack| stack.is_top(&self.trap))
    }

    pub fn container(&self) -> NodeId {
        self.trap.container
    }
}

impl std::fmt::Debug for FocusTrapHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FocusTrapHandle")
            .field("container", &self.trap.container)
            .field("active", &self.trap.is_active())
            .field("paused", &self.trap.is_paused())
            .finish()
    }
}

/// Trap focus inside `container` using the document's trap stack
pub fn enable_focus_trap(doc: &mut Document, container: NodeId, options: FocusTrapOptions) -> FocusTrapHandle {
    let stack = FocusTrapStack::for_document(doc);
    enable_focus_trap_in(doc, &stack, container, options)
}

/// Trap focus inside `container` using an explicit stack
pub fn enable_focus_trap_in(
    doc: &mut Document,
    stack: &Rc<FocusTrapStack>,
    container: NodeId,
    options: FocusTrapOptions,
) -> FocusTrapHandle {
    let trap = FocusTrap::new(container, options, stack);
    trap.enable(doc);
    FocusTrapHandle { trap }
}
