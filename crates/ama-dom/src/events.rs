//! DOM Events
//!
//! Event objects, listener options and the per-node listener registry.
//! Dispatch itself lives on [`Document`](crate::Document) because
//! listeners receive the document mutably.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::{Document, NodeId};

/// Event listener callback
pub type Listener = Rc<dyn Fn(&mut Document, &mut Event)>;

/// Handle returned by `add_event_listener`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Options for `add_event_listener`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Run during the capture phase
    pub capture: bool,
    /// Remove after the first invocation
    pub once: bool,
}

impl ListenerOptions {
    pub fn capture() -> Self {
        Self { capture: true, once: false }
    }

    pub fn once() -> Self {
        Self { capture: false, once: true }
    }
}

/// Event phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventPhase {
    #[default]
    None,
    Capturing,
    AtTarget,
    Bubbling,
}

/// Pointer device that produced a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerType {
    Mouse,
    Pen,
    Touch,
}

/// Event
#[derive(Clone)]
pub struct Event {
    kind: String,
    bubbles: bool,
    cancelable: bool,
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
    phase: EventPhase,
    pub(crate) target: NodeId,
    pub(crate) current_target: NodeId,
    related_target: Option<NodeId>,
    key: Option<String>,
    shift_key: bool,
    pointer_type: Option<PointerType>,
    detail: Option<Rc<dyn Any>>,
}

impl Event {
    /// Create a non-bubbling, non-cancelable event
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            bubbles: false,
            cancelable: false,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
            phase: EventPhase::None,
            target: NodeId::NONE,
            current_target: NodeId::NONE,
            related_target: None,
            key: None,
            shift_key: false,
            pointer_type: None,
            detail: None,
        }
    }

    /// Bubbling custom event carrying a typed payload
    pub fn custom<T: Any>(kind: impl Into<String>, detail: T) -> Self {
        Self::new(kind).bubbles(true).with_detail(detail)
    }

    /// Keyboard event (`keydown`, `keyup`)
    pub fn keyboard(kind: impl Into<String>, key: &str) -> Self {
        let mut event = Self::new(kind).bubbles(true).cancelable(true);
        event.key = Some(key.to_string());
        event
    }

    /// Pointer event. Enter/leave do not bubble.
    pub fn pointer(kind: impl Into<String>, pointer_type: PointerType) -> Self {
        let kind = kind.into();
        let bubbles = !matches!(kind.as_str(), "pointerenter" | "pointerleave" | "mouseenter" | "mouseleave");
        let mut event = Self::new(kind).bubbles(bubbles).cancelable(bubbles);
        event.pointer_type = Some(pointer_type);
        event
    }

    /// Mouse click
    pub fn click() -> Self {
        Self::pointer("click", PointerType::Mouse)
    }

    /// Focus event. `focusin`/`focusout` bubble, `focus`/`blur` don't.
    pub fn focus(kind: impl Into<String>, related: Option<NodeId>) -> Self {
        let kind = kind.into();
        let bubbles = matches!(kind.as_str(), "focusin" | "focusout");
        let mut event = Self::new(kind).bubbles(bubbles);
        event.related_target = related;
        event
    }

    pub fn bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    pub fn cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }

    pub fn with_shift(mut self, shift: bool) -> Self {
        self.shift_key = shift;
        self
    }

    pub fn with_detail<T: Any>(mut self, detail: T) -> Self {
        self.detail = Some(Rc::new(detail));
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    pub fn is_bubbling(&self) -> bool {
        self.bubbles
    }

    pub fn is_cancelable(&self) -> bool {
        self.cancelable
    }

    pub fn phase(&self) -> EventPhase {
        self.phase
    }

    /// Node the event was dispatched to
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Node whose listeners are currently running
    pub fn current_target(&self) -> NodeId {
        self.current_target
    }

    pub fn related_target(&self) -> Option<NodeId> {
        self.related_target
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn shift_key(&self) -> bool {
        self.shift_key
    }

    pub fn pointer_type(&self) -> Option<PointerType> {
        self.pointer_type
    }

    /// Typed view of the payload
    pub fn detail<T: Any>(&self) -> Option<&T> {
        self.detail.as_deref().and_then(|d| d.downcast_ref::<T>())
    }

    /// Cancel the default action. Ignored for non-cancelable events.
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub(crate) fn immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped
    }

    pub(crate) fn set_phase(&mut self, phase: EventPhase) {
        self.phase = phase;
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.kind)
            .field("target", &self.target)
            .field("phase", &self.phase)
            .field("default_prevented", &self.default_prevented)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

struct Registration {
    id: ListenerId,
    kind: String,
    options: ListenerOptions,
    callback: Listener,
}

/// Listeners keyed by the node they are attached to
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    by_node: HashMap<NodeId, Vec<Registration>>,
    owners: HashMap<ListenerId, NodeId>,
    next_id: u64,
}

impl ListenerRegistry {
    pub fn add(&mut self, node: NodeId, kind: &str, options: ListenerOptions, callback: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.by_node.entry(node).or_default().push(Registration {
            id,
            kind: kind.to_string(),
            options,
            callback,
        });
        self.owners.insert(id, node);
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let Some(node) = self.owners.remove(&id) else {
            return false;
        };
        if let Some(list) = self.by_node.get_mut(&node) {
            list.retain(|r| r.id != id);
            if list.is_empty() {
                self.by_node.remove(&node);
            }
        }
        true
    }

    pub fn is_registered(&self, id: ListenerId) -> bool {
        self.owners.contains_key(&id)
    }

    /// Copy out the listeners to run so callbacks may add or remove others
    pub fn snapshot(&self, node: NodeId, kind: &str, capture: bool) -> Vec<(ListenerId, bool, Listener)> {
        self.by_node
            .get(&node)
            .map(|list| {
                list.iter()
                    .filter(|r| r.kind == kind && r.options.capture == capture)
                    .map(|r| (r.id, r.options.once, Rc::clone(&r.callback)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn count_on(&self, node: NodeId) -> usize {
        self.by_node.get(&node).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prevent_default_requires_cancelable() {
        let mut event = Event::new("custom");
        event.prevent_default();
        assert!(!event.default_prevented());

        let mut event = Event::keyboard("keydown", "Tab");
        event.prevent_default();
        assert!(event.default_prevented());
    }

    #[test]
    fn test_detail_downcast() {
        let event = Event::custom("automagica11y:toggle", 42u32);
        assert_eq!(event.detail::<u32>(), Some(&42));
        assert!(event.detail::<String>().is_none());
        assert!(event.is_bubbling());
    }

    #[test]
    fn test_pointer_enter_does_not_bubble() {
        assert!(!Event::pointer("pointerenter", PointerType::Mouse).is_bubbling());
        assert!(Event::pointer("pointerdown", PointerType::Touch).is_bubbling());
        assert!(Event::focus("focusin", None).is_bubbling());
        assert!(!Event::focus("blur", None).is_bubbling());
    }

    #[test]
    fn test_registry_add_remove() {
        let mut registry = ListenerRegistry::default();
        let node = NodeId(3);
        let cb: Listener = Rc::new(|_, _| {});
        let a = registry.add(node, "click", ListenerOptions::default(), cb.clone());
        let b = registry.add(node, "click", ListenerOptions::capture(), cb);

        assert_eq!(registry.snapshot(node, "click", false).len(), 1);
        assert_eq!(registry.snapshot(node, "click", true).len(), 1);
        assert!(registry.remove(a));
        assert!(!registry.remove(a));
        assert!(registry.is_registered(b));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.count_on(node), 1);
    }
}
