//! Event names and payloads
//!
//! Every widget event is dispatched on the trigger and bubbles. Payloads
//! travel as typed `detail` values; read them with
//! [`ama_dom::Event::detail`].

use std::any::Any;

use ama_dom::{Document, Event, NodeId};

/// Cancelable notice that a trigger is about to change state
pub const TOGGLE: &str = "automagica11y:toggle";
pub const OPENED: &str = "automagica11y:toggle:opened";
pub const CLOSED: &str = "automagica11y:toggle:closed";
/// A close was requested for a trigger that was already closed
pub const DISMISSED: &str = "automagica11y:toggle:dismissed";
pub const READY: &str = "automagica11y:ready";

pub const TOOLTIP_TOGGLE: &str = "automagica11y:tooltip:toggle";
pub const TOOLTIP_SHOWN: &str = "automagica11y:tooltip:shown";
pub const TOOLTIP_HIDDEN: &str = "automagica11y:tooltip:hidden";
/// An anchored surface was shown and should follow its trigger
pub const CONTEXT_ANCHOR: &str = "automagica11y:context:anchor";

pub const POPOVER_READY: &str = "automagica11y:popover:ready";
pub const POPOVER_TOGGLE: &str = "automagica11y:popover:toggle";
pub const POPOVER_SHOWN: &str = "automagica11y:popover:shown";
pub const POPOVER_HIDDEN: &str = "automagica11y:popover:hidden";
pub const POPOVER_DISMISSED: &str = "automagica11y:popover:dismissed";
pub const POPOVER_PLACEMENT: &str = "automagica11y:popover:placement";

/// Payload of [`TOGGLE`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleDetail {
    pub expanded: bool,
    pub trigger: NodeId,
    /// First surface
    pub target: NodeId,
    pub targets: Vec<NodeId>,
}

/// Payload of [`READY`], [`OPENED`], [`CLOSED`] and [`DISMISSED`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetsDetail {
    pub trigger: NodeId,
    pub target: NodeId,
    pub targets: Vec<NodeId>,
}

/// Payload of tooltip visibility and anchor events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceDetail {
    pub trigger: NodeId,
    pub target: NodeId,
}

/// Dispatch a bubbling, non-cancelable event
pub fn dispatch<T: Any>(doc: &mut Document, target: NodeId, kind: &str, detail: T) -> Event {
    doc.dispatch_event(target, Event::custom(kind, detail))
}

/// Dispatch a bubbling, cancelable event and report whether it was vetoed
pub fn dispatch_cancelable<T: Any>(doc: &mut Document, target: NodeId, kind: &str, detail: T) -> bool {
    let event = doc.dispatch_event(target, Event::custom(kind, detail).cancelable(true));
    event.default_prevented()
}
