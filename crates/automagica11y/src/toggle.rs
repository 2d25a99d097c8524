//! Toggle State Machine
//!
//! Each hydrated trigger owns one or more surfaces and moves them
//! between `collapsed` and `expanded`:
//!
//! - closing is two-phase: the cancelable [`events::TOGGLE`] event runs
//!   first and any listener may veto; nothing changes until it passes
//! - opening reveals the surfaces, closes the rest of the trigger's
//!   group, then notifies; open classes land two paints later
//!
//! Per-trigger state lives in a document service keyed by trigger, not
//! on the elements, and is dropped by [`destroy_toggle`].

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use ama_a11y::AriaRole;
use ama_dom::{Document, FrameId, ListenerId, ListenerOptions, NodeId, TimerId};

use crate::attributes::{
    append_token, ensure_id, get_data_trimmed, has_data, prefixed_selector, resolve_all, resolve_first,
    set_aria_expanded, set_hidden_state,
};
use crate::classes::ClassConfig;
use crate::config::Config;
use crate::context::{apply_context, normalize_context, ContextKind, ContextMode};
use crate::device::{has_animation_frames, prefers_reduced_motion};
use crate::events::{self, TargetsDetail, ToggleDetail};

/// Callback run after a transition commits, before the trigger's own
/// notifications go out
pub type TransitionHook = Rc<dyn Fn(&mut Document, &ToggleDetail)>;

/// Cleanup run once when the trigger is destroyed
type DestroyHook = Box<dyn FnOnce(&mut Document)>;

/// Outcome of a state request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Opened,
    Closed,
    /// A listener cancelled the close; nothing changed
    Vetoed,
    /// Already in the requested state
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingPaint {
    Frame(FrameId),
    Timer(TimerId),
}

struct Toggle {
    trigger: NodeId,
    targets: Vec<NodeId>,
    /// Tooltip triggers leave `aria-expanded`/`aria-controls` alone
    manage_aria: bool,
    classes: ClassConfig,
    expanded: Cell<bool>,
    pending_paint: Cell<Option<PendingPaint>>,
    listeners: RefCell<Vec<ListenerId>>,
    hooks: RefCell<Vec<TransitionHook>>,
    on_destroy: RefCell<Vec<DestroyHook>>,
}

impl Toggle {
    fn first_target(&self) -> NodeId {
        self.targets.first().copied().unwrap_or(NodeId::NONE)
    }

    fn detail(&self, expanded: bool) -> ToggleDetail {
        ToggleDetail {
            expanded,
            trigger: self.trigger,
            target: self.first_target(),
            targets: self.targets.clone(),
        }
    }

    fn targets_detail(&self) -> TargetsDetail {
        TargetsDetail {
            trigger: self.trigger,
            target: self.first_target(),
            targets: self.targets.clone(),
        }
    }

    fn apply_classes(&self, doc: &mut Document, expanded: bool) {
        for &target in &self.targets {
            self.classes.apply(doc, expanded, self.trigger, Some(target));
        }
    }

    fn cancel_pending_paint(&self, doc: &mut Document) {
        match self.pending_paint.take() {
            Some(PendingPaint::Frame(id)) => {
                doc.cancel_animation_frame(id);
            }
            Some(PendingPaint::Timer(id)) => {
                doc.clear_timeout(id);
            }
            None => {}
        }
    }

    fn run_hooks(&self, doc: &mut Document, detail: &ToggleDetail) {
        let hooks: Vec<TransitionHook> = self.hooks.borrow().clone();
        for hook in hooks {
            hook(doc, detail);
        }
    }
}

impl fmt::Debug for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Toggle")
            .field("trigger", &self.trigger)
            .field("targets", &self.targets)
            .field("expanded", &self.expanded.get())
            .field("hooks", &self.hooks.borrow().len())
            .finish()
    }
}

/// Side table of hydrated triggers
#[derive(Debug, Default)]
pub struct ToggleRegistry {
    toggles: RefCell<HashMap<NodeId, Rc<Toggle>>>,
    /// (trigger, legacy alias) pairs already warned about
    warned: RefCell<HashSet<(NodeId, String)>>,
}

impl ToggleRegistry {
    fn get(&self, trigger: NodeId) -> Option<Rc<Toggle>> {
        self.toggles.borrow().get(&trigger).cloned()
    }

    pub fn contains(&self, trigger: NodeId) -> bool {
        self.toggles.borrow().contains_key(&trigger)
    }

    pub fn len(&self) -> usize {
        self.toggles.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.toggles.borrow().is_empty()
    }

    /// Returns false if this pair was already recorded
    fn note_alias(&self, trigger: NodeId, alias: &str) -> bool {
        self.warned.borrow_mut().insert((trigger, alias.to_string()))
    }
}

fn lookup(doc: &Document, trigger: NodeId) -> Option<Rc<Toggle>> {
    doc.try_service::<ToggleRegistry>()?.get(trigger)
}

/// A hydrated trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleHandle {
    trigger: NodeId,
}

impl ToggleHandle {
    pub fn trigger(&self) -> NodeId {
        self.trigger
    }

    pub fn targets(&self, doc: &Document) -> Vec<NodeId> {
        toggle_targets(doc, self.trigger)
    }

    pub fn is_open(&self, doc: &Document) -> bool {
        is_toggle_open(doc, self.trigger)
    }

    pub fn set_state(&self, doc: &mut Document, open: bool) -> Transition {
        set_toggle_state(doc, self.trigger, open).unwrap_or(Transition::Unchanged)
    }

    pub fn toggle(&self, doc: &mut Document) -> Transition {
        toggle_trigger(doc, self.trigger).unwrap_or(Transition::Unchanged)
    }

    /// Detach listeners and forget the trigger's state
    pub fn destroy(&self, doc: &mut Document) -> bool {
        destroy_toggle(doc, self.trigger)
    }
}

/// Hydrate a trigger whose `data-automagica11y-toggle` selector names its
/// surfaces.
///
/// Returns `None` when the selector is missing or matches nothing; the
/// trigger is left untouched and may be hydrated later. Hydrating an
/// already hydrated trigger changes nothing.
pub fn init_toggle(doc: &mut Document, trigger: NodeId) -> Option<ToggleHandle> {
    if !doc.is_element(trigger) {
        return None;
    }
    let registry = doc.service::<ToggleRegistry>();
    if registry.contains(trigger) {
        return Some(ToggleHandle { trigger });
    }

    let selector = get_data_trimmed(doc, trigger, "toggle")?.to_string();
    let targets = match resolve_all(doc, &selector) {
        Ok(targets) => targets,
        Err(err) => {
            tracing::debug!("toggle {} not hydrated: {}", trigger, err);
            return None;
        }
    };

    let context = get_data_trimmed(doc, trigger, "context").map(str::to_string);
    let kind = context.as_deref().and_then(ContextKind::from_name);
    let treat_as_tooltip =
        kind == Some(ContextKind::Tooltip) || (context.is_none() && has_data(doc, trigger, "tooltip"));
    let mode = ContextMode::parse(get_data_trimmed(doc, trigger, "context-mode"));

    let trigger_id = ensure_id(doc, trigger, "automagica11y-t");
    let target_ids: Vec<String> = targets.iter().map(|&t| ensure_id(doc, t, "automagica11y-p")).collect();

    let manage_aria = !treat_as_tooltip;
    if manage_aria {
        doc.set_attribute(trigger, "aria-controls", &target_ids.join(" "));
        set_aria_expanded(doc, trigger, false);
    } else {
        release_managed_aria(doc, trigger, &target_ids);
    }
    for &target in &targets {
        append_token(doc, target, "aria-labelledby", &trigger_id);
        set_hidden_state(doc, target, true);
    }

    let is_native_button = doc.tag_name(trigger) == Some("button");
    if !is_native_button {
        if !doc.has_attribute(trigger, "role") {
            doc.set_attribute(trigger, "role", AriaRole::Button.as_str());
        }
        if !doc.has_attribute(trigger, "tabindex") {
            doc.set_attribute(trigger, "tabindex", "0");
        }
        if doc.style_property(trigger, "cursor").is_none() {
            doc.set_style_property(trigger, "cursor", "pointer");
        }
    }

    let config = Config::for_document(doc);
    let classes = ClassConfig::read(doc, trigger, Some(&config.default_trigger_classes));

    let toggle = Rc::new(Toggle {
        trigger,
        targets: targets.clone(),
        manage_aria,
        classes,
        expanded: Cell::new(false),
        pending_paint: Cell::new(None),
        listeners: RefCell::new(Vec::new()),
        hooks: RefCell::new(Vec::new()),
        on_destroy: RefCell::new(Vec::new()),
    });
    toggle.apply_classes(doc, false);
    registry.toggles.borrow_mut().insert(trigger, toggle.clone());

    let click = doc.add_event_listener(trigger, "click", ListenerOptions::default(), move |doc, _| {
        toggle_trigger(doc, trigger);
    });
    toggle.listeners.borrow_mut().push(click);

    if !is_native_button {
        let keydown = doc.add_event_listener(trigger, "keydown", ListenerOptions::default(), move |doc, event| {
            if matches!(event.key(), Some(" " | "Enter")) {
                event.prevent_default();
                toggle_trigger(doc, trigger);
            }
        });
        toggle.listeners.borrow_mut().push(keydown);
    }

    if let Some(name) = context.as_deref() {
        let canonical = normalize_context(name);
        for alias in ["dialog", "tooltip"] {
            if canonical == alias && has_data(doc, trigger, alias) && registry.note_alias(trigger, alias) {
                tracing::warn!(
                    "data-automagica11y-{} and data-automagica11y-context=\"{}\" are equivalent on {}; prefer the context attribute",
                    alias,
                    alias,
                    trigger
                );
            }
        }
        for &target in &targets {
            apply_context(doc, trigger, target, name, mode);
        }
    }

    tracing::debug!("toggle {} hydrated with {} surface(s)", trigger, targets.len());
    events::dispatch(doc, trigger, events::READY, toggle.targets_detail());
    Some(ToggleHandle { trigger })
}

/// Tooltip triggers describe rather than control: drop `aria-controls`
/// if it only names the managed surfaces, and any boolean
/// `aria-expanded`
fn release_managed_aria(doc: &mut Document, trigger: NodeId, target_ids: &[String]) {
    if let Some(existing) = doc.get_attribute(trigger, "aria-controls") {
        let tokens: Vec<&str> = existing.split_ascii_whitespace().collect();
        if tokens.len() == target_ids.len() && tokens.iter().all(|t| target_ids.iter().any(|id| id == t)) {
            doc.remove_attribute(trigger, "aria-controls");
        }
    }
    if matches!(doc.get_attribute(trigger, "aria-expanded"), Some("true" | "false" | "")) {
        doc.remove_attribute(trigger, "aria-expanded");
    }
}

/// Suppress the duplicate-authoring warning for a trigger whose legacy
/// attribute was promoted by a hydrator rather than written by an author
pub(crate) fn note_promoted_alias(doc: &mut Document, trigger: NodeId, alias: &str) {
    doc.service::<ToggleRegistry>().note_alias(trigger, alias);
}

/// The per-trigger setter. `None` if `trigger` is not hydrated.
pub fn set_toggle_state(doc: &mut Document, trigger: NodeId, open: bool) -> Option<Transition> {
    let toggle = lookup(doc, trigger)?;
    Some(set_state(doc, &toggle, open))
}

/// Flip the trigger's state
pub fn toggle_trigger(doc: &mut Document, trigger: NodeId) -> Option<Transition> {
    let toggle = lookup(doc, trigger)?;
    let open = !toggle.expanded.get();
    Some(set_state(doc, &toggle, open))
}

fn set_state(doc: &mut Document, toggle: &Rc<Toggle>, open: bool) -> Transition {
    if toggle.expanded.get() == open {
        if !open {
            events::dispatch(doc, toggle.trigger, events::DISMISSED, toggle.targets_detail());
        }
        return Transition::Unchanged;
    }
    if open {
        open_toggle(doc, toggle)
    } else {
        close_toggle(doc, toggle)
    }
}

fn open_toggle(doc: &mut Document, toggle: &Rc<Toggle>) -> Transition {
    let trigger = toggle.trigger;
    toggle.expanded.set(true);
    if toggle.manage_aria {
        set_aria_expanded(doc, trigger, true);
    }
    toggle.cancel_pending_paint(doc);
    for &target in &toggle.targets {
        set_hidden_state(doc, target, false);
    }
    if prefers_reduced_motion(doc) {
        toggle.apply_classes(doc, true);
    } else {
        schedule_open_classes(doc, toggle);
    }

    close_group_siblings(doc, trigger);

    let detail = toggle.detail(true);
    toggle.run_hooks(doc, &detail);
    // Opening cannot be vetoed; the event is cancelable for symmetry.
    events::dispatch_cancelable(doc, trigger, events::TOGGLE, detail);
    events::dispatch(doc, trigger, events::OPENED, toggle.targets_detail());
    tracing::debug!("toggle {} opened", trigger);
    Transition::Opened
}

fn close_toggle(doc: &mut Document, toggle: &Rc<Toggle>) -> Transition {
    let trigger = toggle.trigger;
    let detail = toggle.detail(false);
    if events::dispatch_cancelable(doc, trigger, events::TOGGLE, detail.clone()) {
        tracing::debug!("toggle {} close vetoed", trigger);
        return Transition::Vetoed;
    }
    // A listener may have closed it while the event was in flight.
    if !toggle.expanded.get() {
        return Transition::Unchanged;
    }

    toggle.expanded.set(false);
    if toggle.manage_aria {
        set_aria_expanded(doc, trigger, false);
    }
    toggle.cancel_pending_paint(doc);
    toggle.apply_classes(doc, false);
    for &target in &toggle.targets {
        set_hidden_state(doc, target, true);
    }

    toggle.run_hooks(doc, &detail);
    events::dispatch(doc, trigger, events::CLOSED, toggle.targets_detail());
    tracing::debug!("toggle {} closed", trigger);
    Transition::Closed
}

/// Apply open classes two paints from now so transitions start from the
/// closed styles
fn schedule_open_classes(doc: &mut Document, toggle: &Rc<Toggle>) {
    let weak = Rc::downgrade(toggle);
    if !has_animation_frames(doc) {
        let delay = Config::for_document(doc).fallback_paint_delay_ms;
        let id = doc.set_timeout(delay, move |doc| {
            if let Some(toggle) = weak.upgrade() {
                toggle.pending_paint.set(None);
                toggle.apply_classes(doc, true);
            }
        });
        toggle.pending_paint.set(Some(PendingPaint::Timer(id)));
        return;
    }

    let id = doc.request_animation_frame(move |doc| {
        let Some(toggle) = weak.upgrade() else {
            return;
        };
        let second = Rc::downgrade(&toggle);
        let id = doc.request_animation_frame(move |doc| {
            if let Some(toggle) = second.upgrade() {
                toggle.pending_paint.set(None);
                toggle.apply_classes(doc, true);
            }
        });
        toggle.pending_paint.set(Some(PendingPaint::Frame(id)));
    });
    toggle.pending_paint.set(Some(PendingPaint::Frame(id)));
}

/// Close every other open trigger sharing this trigger's group. Openness
/// comes from the cached flag, not from `aria-expanded`.
fn close_group_siblings(doc: &mut Document, trigger: NodeId) {
    let Some(group) = get_data_trimmed(doc, trigger, "group").map(str::to_string) else {
        return;
    };
    let members = doc
        .query_selector_all(doc.document_element(), &prefixed_selector("group"))
        .unwrap_or_default();
    for other in members {
        if other == trigger || get_data_trimmed(doc, other, "group") != Some(group.as_str()) {
            continue;
        }
        if let Some(sibling) = lookup(doc, other).filter(|t| t.expanded.get()) {
            tracing::debug!("group {:?}: closing {} for {}", group, other, trigger);
            set_state(doc, &sibling, false);
        }
    }
}

/// Whether the trigger is expanded: `aria-expanded` when it holds a
/// boolean, otherwise the cached state
pub fn is_toggle_open(doc: &Document, trigger: NodeId) -> bool {
    match doc.get_attribute(trigger, "aria-expanded") {
        Some("true") => true,
        Some("false") => false,
        _ => lookup(doc, trigger).is_some_and(|t| t.expanded.get()),
    }
}

/// The trigger's surface: its toggle selector, else the first
/// `aria-controls` id
pub fn resolve_surface(doc: &Document, trigger: NodeId) -> Option<NodeId> {
    if let Some(selector) = get_data_trimmed(doc, trigger, "toggle") {
        if let Ok(target) = resolve_first(doc, selector) {
            return Some(target);
        }
    }
    let first = doc.get_attribute(trigger, "aria-controls")?.split_ascii_whitespace().next()?;
    doc.get_element_by_id(first)
}

pub fn is_initialized(doc: &Document, trigger: NodeId) -> bool {
    lookup(doc, trigger).is_some()
}

/// Surfaces of a hydrated trigger
pub fn toggle_targets(doc: &Document, trigger: NodeId) -> Vec<NodeId> {
    lookup(doc, trigger).map(|t| t.targets.clone()).unwrap_or_default()
}

/// Run `hook` after every committed transition of `trigger`. Vetoed
/// closes never reach it. Returns false if `trigger` is not hydrated.
pub fn on_transition(
    doc: &mut Document,
    trigger: NodeId,
    hook: impl Fn(&mut Document, &ToggleDetail) + 'static,
) -> bool {
    let Some(toggle) = lookup(doc, trigger) else {
        return false;
    };
    toggle.hooks.borrow_mut().push(Rc::new(hook));
    true
}

/// Run `hook` when `trigger` is destroyed, after its listeners are gone.
/// Returns false if `trigger` is not hydrated.
pub(crate) fn on_destroy(doc: &Document, trigger: NodeId, hook: impl FnOnce(&mut Document) + 'static) -> bool {
    let Some(toggle) = lookup(doc, trigger) else {
        return false;
    };
    toggle.on_destroy.borrow_mut().push(Box::new(hook));
    true
}

/// Tie a listener's lifetime to the trigger so teardown removes it
pub(crate) fn track_listener(doc: &Document, trigger: NodeId, id: ListenerId) {
    if let Some(toggle) = lookup(doc, trigger) {
        toggle.listeners.borrow_mut().push(id);
    }
}

/// Remove the trigger's listeners, pending paint work, context bindings
/// and state. ARIA and visibility are left as they are.
pub fn destroy_toggle(doc: &mut Document, trigger: NodeId) -> bool {
    let Some(registry) = doc.try_service::<ToggleRegistry>() else {
        return false;
    };
    let Some(toggle) = registry.toggles.borrow_mut().remove(&trigger) else {
        return false;
    };
    toggle.cancel_pending_paint(doc);
    for id in toggle.listeners.take() {
        doc.remove_event_listener(id);
    }
    toggle.hooks.borrow_mut().clear();
    for hook in toggle.on_destroy.take() {
        hook(doc);
    }
    tracing::debug!("toggle {} destroyed", trigger);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use ama_dom::MediaFeatures;

    fn page() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let body = doc.body();
        let trigger = doc.create_element("button");
        let panel = doc.create_element("div");
        doc.append_child(body, trigger).unwrap();
        doc.append_child(body, panel).unwrap();
        doc.set_attribute(trigger, "data-automagica11y-toggle", "#panel");
        doc.set_attribute(panel, "id", "panel");
        (doc, trigger, panel)
    }

    #[test]
    fn test_init_sets_baseline() {
        let (mut doc, trigger, panel) = page();
        let handle = init_toggle(&mut doc, trigger).unwrap();
        assert_eq!(doc.get_attribute(trigger, "aria-controls"), Some("panel"));
        assert_eq!(doc.get_attribute(trigger, "aria-expanded"), Some("false"));
        assert!(doc.has_attribute(panel, "hidden"));
        let trigger_id = doc.get_attribute(trigger, "id").unwrap().to_string();
        assert!(trigger_id.starts_with("automagica11y-t-"));
        assert_eq!(doc.get_attribute(panel, "aria-labelledby"), Some(trigger_id.as_str()));
        assert!(doc.has_class(trigger, "automagic-toggle-closed"));
        assert!(!handle.is_open(&doc));
    }

    #[test]
    fn test_init_is_idempotent() {
        let (mut doc, trigger, _panel) = page();
        init_toggle(&mut doc, trigger).unwrap();
        let listeners = doc.listener_count_on(trigger);
        init_toggle(&mut doc, trigger).unwrap();
        assert_eq!(doc.listener_count_on(trigger), listeners);
    }

    #[test]
    fn test_unresolved_selector_is_noop() {
        let (mut doc, trigger, _panel) = page();
        doc.set_attribute(trigger, "data-automagica11y-toggle", "#nowhere");
        assert!(init_toggle(&mut doc, trigger).is_none());
        assert!(!doc.has_attribute(trigger, "aria-expanded"));
        assert!(!is_initialized(&doc, trigger));
    }

    #[test]
    fn test_open_classes_wait_two_frames() {
        let (mut doc, trigger, _panel) = page();
        init_toggle(&mut doc, trigger).unwrap();
        doc.click(trigger);
        assert!(!doc.has_class(trigger, "automagic-toggle-open"));
        doc.render_frame();
        assert!(!doc.has_class(trigger, "automagic-toggle-open"));
        doc.render_frame();
        assert!(doc.has_class(trigger, "automagic-toggle-open"));
        assert!(!doc.has_class(trigger, "automagic-toggle-closed"));
    }

    #[test]
    fn test_reduced_motion_applies_immediately() {
        let (mut doc, trigger, _panel) = page();
        doc.set_media(MediaFeatures { prefers_reduced_motion: true, ..MediaFeatures::default() });
        init_toggle(&mut doc, trigger).unwrap();
        doc.click(trigger);
        assert!(doc.has_class(trigger, "automagic-toggle-open"));
        assert_eq!(doc.pending_frames(), 0);
    }

    #[test]
    fn test_fallback_paint_timer() {
        let (mut doc, trigger, _panel) = page();
        doc.set_media(MediaFeatures { animation_frames: false, ..MediaFeatures::default() });
        init_toggle(&mut doc, trigger).unwrap();
        doc.click(trigger);
        doc.advance_time(31);
        assert!(!doc.has_class(trigger, "automagic-toggle-open"));
        doc.advance_time(1);
        assert!(doc.has_class(trigger, "automagic-toggle-open"));
    }

    #[test]
    fn test_close_before_paint_cancels_open_classes() {
        let (mut doc, trigger, _panel) = page();
        init_toggle(&mut doc, trigger).unwrap();
        doc.click(trigger);
        doc.click(trigger);
        doc.render_frame();
        doc.render_frame();
        assert!(!doc.has_class(trigger, "automagic-toggle-open"));
        assert!(doc.has_class(trigger, "automagic-toggle-closed"));
    }

    #[test]
    fn test_repeated_close_dispatches_dismissed() {
        let (mut doc, trigger, _panel) = page();
        init_toggle(&mut doc, trigger).unwrap();
        let count = Rc::new(Cell::new(0));
        let seen = count.clone();
        doc.add_event_listener(trigger, events::DISMISSED, ListenerOptions::default(), move |_, _| {
            seen.set(seen.get() + 1)
        });
        assert_eq!(set_toggle_state(&mut doc, trigger, false), Some(Transition::Unchanged));
        assert_eq!(count.get(), 1);
        assert_eq!(set_toggle_state(&mut doc, trigger, true), Some(Transition::Opened));
        assert_eq!(set_toggle_state(&mut doc, trigger, true), Some(Transition::Unchanged));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_vetoed_close_changes_nothing() {
        let (mut doc, trigger, panel) = page();
        init_toggle(&mut doc, trigger).unwrap();
        doc.click(trigger);
        doc.add_event_listener(trigger, events::TOGGLE, ListenerOptions::default(), |_, event| {
            if event.detail::<ToggleDetail>().is_some_and(|d| !d.expanded) {
                event.prevent_default();
            }
        });
        let hook_calls = Rc::new(Cell::new(0));
        let calls = hook_calls.clone();
        on_transition(&mut doc, trigger, move |_, _| calls.set(calls.get() + 1));

        assert_eq!(set_toggle_state(&mut doc, trigger, false), Some(Transition::Vetoed));
        assert!(is_toggle_open(&doc, trigger));
        assert_eq!(doc.get_attribute(trigger, "aria-expanded"), Some("true"));
        assert!(!doc.has_attribute(panel, "hidden"));
        assert_eq!(hook_calls.get(), 0);
    }

    #[test]
    fn test_keyboard_on_non_button() {
        let mut doc = Document::new();
        let body = doc.body();
        let trigger = doc.create_element("span");
        let panel = doc.create_element("div");
        doc.append_child(body, trigger).unwrap();
        doc.append_child(body, panel).unwrap();
        doc.set_attribute(trigger, "data-ama-toggle", ".panel");
        doc.set_attribute(panel, "class", "panel");

        init_toggle(&mut doc, trigger).unwrap();
        assert_eq!(doc.get_attribute(trigger, "role"), Some("button"));
        assert_eq!(doc.get_attribute(trigger, "tabindex"), Some("0"));
        assert_eq!(doc.style_property(trigger, "cursor").as_deref(), Some("pointer"));

        let event = doc.key_down(trigger, "Enter", false);
        assert!(event.default_prevented());
        assert!(is_toggle_open(&doc, trigger));
        doc.key_down(trigger, " ", false);
        assert!(!is_toggle_open(&doc, trigger));
    }

    #[test]
    fn test_tooltip_trigger_skips_aria_expanded() {
        let (mut doc, trigger, panel) = page();
        doc.set_attribute(trigger, "data-automagica11y-context", "tooltip");
        doc.set_attribute(trigger, "aria-expanded", "false");
        init_toggle(&mut doc, trigger).unwrap();
        assert!(!doc.has_attribute(trigger, "aria-expanded"));
        assert!(!doc.has_attribute(trigger, "aria-controls"));

        set_toggle_state(&mut doc, trigger, true);
        assert!(is_toggle_open(&doc, trigger));
        assert!(!doc.has_attribute(panel, "hidden"));
    }

    #[test]
    fn test_resolve_surface_falls_back_to_aria_controls() {
        let (mut doc, trigger, panel) = page();
        assert_eq!(resolve_surface(&doc, trigger), Some(panel));
        doc.remove_attribute(trigger, "data-automagica11y-toggle");
        doc.set_attribute(trigger, "aria-controls", "panel other");
        assert_eq!(resolve_surface(&doc, trigger), Some(panel));
        doc.remove_attribute(trigger, "aria-controls");
        assert_eq!(resolve_surface(&doc, trigger), None);
    }

    #[test]
    fn test_destroy_detaches() {
        let (mut doc, trigger, _panel) = page();
        let handle = init_toggle(&mut doc, trigger).unwrap();
        assert!(handle.destroy(&mut doc));
        assert_eq!(doc.listener_count_on(trigger), 0);
        doc.click(trigger);
        assert_eq!(doc.get_attribute(trigger, "aria-expanded"), Some("false"));
        assert!(!handle.destroy(&mut doc));
        assert!(init_toggle(&mut doc, trigger).is_some());
    }
}
