//! Popover
//!
//! A trigger-anchored floating panel with its own open/closed state and
//! several ways out: outside pointer-down, Escape, scrolling the page
//! past a threshold, and dismiss controls inside the panel. Every change
//! reports why it happened.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use ama_a11y::{focus_element, AriaHasPopup, FocusOptions};
use ama_dom::{Document, ListenerId, ListenerOptions, NodeId};

use crate::attributes::{
    append_token, ensure_id, get_data, get_data_trimmed, prefixed_selector, set_aria_expanded, set_data,
    set_hidden_state,
};
use crate::classes::ClassConfig;
use crate::config::Config;
use crate::events::{self, SurfaceDetail};
use crate::placement::{resolve_for, PreferredPlacement, Side};

/// What caused a popover to open or close
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopoverReason {
    Trigger,
    Outside,
    Escape,
    Scroll,
    DismissControl,
    Programmatic,
    /// Hydration announced the closed state
    Initial,
}

impl PopoverReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Outside => "outside",
            Self::Escape => "escape",
            Self::Scroll => "scroll",
            Self::DismissControl => "dismiss-control",
            Self::Programmatic => "programmatic",
            Self::Initial => "initial",
        }
    }
}

impl fmt::Display for PopoverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of `popover:toggle`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopoverToggleDetail {
    pub trigger: NodeId,
    pub target: NodeId,
    pub expanded: bool,
    pub reason: PopoverReason,
}

/// Payload of `popover:shown`, `popover:hidden` and `popover:dismissed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopoverDetail {
    pub trigger: NodeId,
    pub target: NodeId,
    pub reason: PopoverReason,
}

/// Payload of `popover:placement`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementDetail {
    pub trigger: NodeId,
    pub target: NodeId,
    pub placement: Side,
}

/// Markup switches
#[derive(Debug, Clone, Copy, PartialEq)]
struct PopoverOptions {
    outside_dismiss: bool,
    scroll_dismiss: bool,
    scroll_distance: f64,
    preferred: PreferredPlacement,
}

impl PopoverOptions {
    fn read(doc: &Document, trigger: NodeId) -> Self {
        Self {
            outside_dismiss: parse_switch(get_data(doc, trigger, "popover-outside-dismiss"), true),
            scroll_dismiss: parse_switch(get_data(doc, trigger, "popover-scroll-dismiss"), true),
            scroll_distance: get_data(doc, trigger, "popover-scroll-distance")
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v >= 0.0)
                .unwrap_or(0.0),
            preferred: PreferredPlacement::parse(get_data(doc, trigger, "popover-position")),
        }
    }
}

/// `""`, `true`, `1`, `yes`, `on` and their opposites; anything else keeps
/// the default
fn parse_switch(value: Option<&str>, default: bool) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("" | "true" | "1" | "yes" | "on") => true,
        Some("false" | "0" | "no" | "off") => false,
        _ => default,
    }
}

struct Popover {
    trigger: NodeId,
    panel: NodeId,
    options: PopoverOptions,
    classes: ClassConfig,
    expanded: Cell<bool>,
    scroll_origin: Cell<(f64, f64)>,
    /// Document listeners that only exist while open
    open_listeners: RefCell<Vec<ListenerId>>,
    this: Weak<Popover>,
}

impl Popover {
    fn surface(&self) -> SurfaceDetail {
        SurfaceDetail { trigger: self.trigger, target: self.panel }
    }

    fn detail(&self, reason: PopoverReason) -> PopoverDetail {
        PopoverDetail { trigger: self.trigger, target: self.panel, reason }
    }

    fn set_state(&self, doc: &mut Document, open: bool, reason: PopoverReason) {
        if self.expanded.get() == open {
            if !open {
                events::dispatch(doc, self.trigger, events::POPOVER_DISMISSED, self.detail(reason));
            }
            return;
        }
        self.expanded.set(open);
        set_aria_expanded(doc, self.trigger, open);

        // Never leave focus inside a panel that is about to be hidden
        if !open && doc.contains(self.panel, doc.active_element()) {
            if let Err(err) = focus_element(doc, self.trigger, FocusOptions::default()) {
                tracing::debug!("could not return focus to popover trigger {}: {}", self.trigger, err);
            }
        }

        set_hidden_state(doc, self.panel, !open);
        self.classes.apply(doc, open, self.trigger, Some(self.panel));

        if open {
            let side = resolve_for(doc, self.trigger, self.panel, self.options.preferred);
            set_data(doc, self.panel, "popover-placement", side.as_str());
            let placement = PlacementDetail { trigger: self.trigger, target: self.panel, placement: side };
            events::dispatch(doc, self.trigger, events::POPOVER_PLACEMENT, placement);
            self.attach_open_listeners(doc);
        } else {
            self.detach_open_listeners(doc);
            events::dispatch(doc, self.trigger, events::POPOVER_DISMISSED, self.detail(reason));
        }

        let toggle = PopoverToggleDetail { trigger: self.trigger, target: self.panel, expanded: open, reason };
        events::dispatch(doc, self.trigger, events::POPOVER_TOGGLE, toggle);
        let kind = if open { events::POPOVER_SHOWN } else { events::POPOVER_HIDDEN };
        events::dispatch(doc, self.trigger, kind, self.detail(reason));
        tracing::debug!("popover {} {} ({})", self.trigger, if open { "opened" } else { "closed" }, reason);
    }

    fn toggle(&self, doc: &mut Document) {
        self.set_state(doc, !self.expanded.get(), PopoverReason::Trigger);
    }

    fn listen(
        &self,
        doc: &mut Document,
        kind: &str,
        handler: impl Fn(&Popover, &mut Document, &mut ama_dom::Event) + 'static,
    ) {
        let this = self.this.clone();
        let id = doc.add_event_listener(NodeId::ROOT, kind, ListenerOptions::capture(), move |doc, event| {
            if let Some(popover) = this.upgrade() {
                handler(&popover, doc, event);
            }
        });
        self.open_listeners.borrow_mut().push(id);
    }

    fn attach_open_listeners(&self, doc: &mut Document) {
        self.scroll_origin.set(doc.scroll_position());
        if self.options.outside_dismiss {
            self.listen(doc, "pointerdown", |popover, doc, event| {
                let origin = event.target();
                if doc.contains(popover.trigger, origin) || doc.contains(popover.panel, origin) {
                    return;
                }
                popover.set_state(doc, false, PopoverReason::Outside);
            });
        }
        self.listen(doc, "keydown", |popover, doc, event| {
            if event.key() == Some("Escape") {
                popover.set_state(doc, false, PopoverReason::Escape);
            }
        });
        if self.options.scroll_dismiss {
            self.listen(doc, "scroll", |popover, doc, _| {
                let (x, y) = doc.scroll_position();
                let (origin_x, origin_y) = popover.scroll_origin.get();
                let distance = (x - origin_x).hypot(y - origin_y);
                if distance >= popover.options.scroll_distance {
                    popover.set_state(doc, false, PopoverReason::Scroll);
                }
            });
        }
    }

    fn detach_open_listeners(&self, doc: &mut Document) {
        for id in self.open_listeners.take() {
            doc.remove_event_listener(id);
        }
    }
}

impl fmt::Debug for Popover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Popover")
            .field("trigger", &self.trigger)
            .field("panel", &self.panel)
            .field("options", &self.options)
            .field("expanded", &self.expanded.get())
            .finish()
    }
}

/// Hydrated popovers keyed by trigger
#[derive(Debug, Default)]
struct PopoverRegistry {
    popovers: RefCell<HashMap<NodeId, Rc<Popover>>>,
}

fn lookup(doc: &Document, trigger: NodeId) -> Option<Rc<Popover>> {
    doc.try_service::<PopoverRegistry>()?.popovers.borrow().get(&trigger).cloned()
}

/// Hydrate a `data-automagica11y-popover` trigger. Returns false when the
/// selector is missing or matches nothing.
pub fn init_popover(doc: &mut Document, trigger: NodeId) -> bool {
    if lookup(doc, trigger).is_some() {
        return true;
    }
    let Some(selector) = get_data_trimmed(doc, trigger, "popover").map(str::to_string) else {
        return false;
    };
    let Some(panel) = doc.query_selector(doc.document_element(), &selector).ok().flatten() else {
        tracing::debug!("popover {} not hydrated: {:?} matched nothing", trigger, selector);
        return false;
    };

    let panel_id = ensure_id(doc, panel, "automagica11y-popover");
    append_token(doc, trigger, "aria-controls", &panel_id);
    if !doc.has_attribute(trigger, "aria-haspopup") {
        doc.set_attribute(trigger, "aria-haspopup", AriaHasPopup::Dialog.as_str());
    }
    set_hidden_state(doc, panel, true);
    set_aria_expanded(doc, trigger, false);

    let config = Config::for_document(doc);
    let options = PopoverOptions::read(doc, trigger);
    let classes = ClassConfig::read(doc, trigger, Some(&config.default_trigger_classes));
    let popover = Rc::new_cyclic(|this| Popover {
        trigger,
        panel,
        options,
        classes,
        expanded: Cell::new(false),
        scroll_origin: Cell::new((0.0, 0.0)),
        open_listeners: RefCell::new(Vec::new()),
        this: this.clone(),
    });
    popover.classes.apply(doc, false, trigger, Some(panel));
    doc.service::<PopoverRegistry>().popovers.borrow_mut().insert(trigger, popover.clone());

    let weak = Rc::downgrade(&popover);
    doc.add_event_listener(trigger, "click", ListenerOptions::default(), move |doc, event| {
        if let Some(popover) = weak.upgrade() {
            event.prevent_default();
            popover.toggle(doc);
        }
    });
    let weak = Rc::downgrade(&popover);
    doc.add_event_listener(trigger, "keydown", ListenerOptions::default(), move |doc, event| {
        if let Some(popover) = weak.upgrade().filter(|_| matches!(event.key(), Some("Enter" | " "))) {
            event.prevent_default();
            popover.toggle(doc);
        }
    });

    let controls = doc
        .query_selector_all(panel, &prefixed_selector("popover-dismiss"))
        .unwrap_or_default();
    for control in controls {
        if doc.tag_name(control) == Some("button") && !doc.has_attribute(control, "type") {
            doc.set_attribute(control, "type", "button");
        }
        let weak = Rc::downgrade(&popover);
        doc.add_event_listener(control, "click", ListenerOptions::default(), move |doc, event| {
            if let Some(popover) = weak.upgrade() {
                event.prevent_default();
                popover.set_state(doc, false, PopoverReason::DismissControl);
            }
        });
        let weak = Rc::downgrade(&popover);
        doc.add_event_listener(control, "keydown", ListenerOptions::default(), move |doc, event| {
            if let Some(popover) = weak.upgrade().filter(|_| matches!(event.key(), Some("Enter" | " "))) {
                event.prevent_default();
                popover.set_state(doc, false, PopoverReason::DismissControl);
            }
        });
    }

    events::dispatch(doc, trigger, events::POPOVER_HIDDEN, popover.detail(PopoverReason::Initial));
    events::dispatch(doc, trigger, events::POPOVER_READY, popover.surface());
    tracing::debug!("popover {} hydrated for {}", trigger, panel);
    true
}

/// Open or close a hydrated popover. Returns false if `trigger` is not
/// one.
pub fn set_popover_state(doc: &mut Document, trigger: NodeId, open: bool) -> bool {
    let Some(popover) = lookup(doc, trigger) else {
        return false;
    };
    popover.set_state(doc, open, PopoverReason::Programmatic);
    true
}

pub fn is_popover_open(doc: &Document, trigger: NodeId) -> bool {
    lookup(doc, trigger).is_some_and(|p| p.expanded.get())
}
