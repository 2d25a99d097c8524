//! Document
//!
//! Owns the node tree and everything scoped to a page: listeners,
//! mutation observers, the event loop, focus, media features and
//! services. All mutation goes through here so observers see it.

use std::rc::Rc;

use tracing::{trace, warn};

use crate::event_loop::EventLoop;
use crate::events::ListenerRegistry;
use crate::observer::ObserverRegistry;
use crate::{
    DOMRect, DomError, DomTree, ElementData, Event, EventPhase, FrameId, ListenerId, ListenerOptions,
    MutationCallback, MutationObserverInit, MutationRecord, NodeId, ObserverId, PointerType, Result,
    SelectorList, Services, Size, TimerId, TokenList,
};

/// Microtasks drained per checkpoint before assuming a runaway loop
const MICROTASK_LIMIT: usize = 100_000;

/// User preferences and device capabilities exposed through media queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaFeatures {
    /// `prefers-reduced-motion: reduce`
    pub prefers_reduced_motion: bool,
    /// `any-pointer: fine`
    pub any_fine_pointer: bool,
    /// Whether the host paints frames (`requestAnimationFrame` exists)
    pub animation_frames: bool,
}

impl Default for MediaFeatures {
    fn default() -> Self {
        Self {
            prefers_reduced_motion: false,
            any_fine_pointer: true,
            animation_frames: true,
        }
    }
}

/// Document
pub struct Document {
    pub(crate) tree: DomTree,
    listeners: ListenerRegistry,
    observers: ObserverRegistry,
    event_loop: EventLoop,
    services: Services,
    pub(crate) active: Option<NodeId>,
    media: MediaFeatures,
    viewport: Size,
    scroll: (f64, f64),
    html: NodeId,
    head: NodeId,
    pub(crate) body: NodeId,
    task_depth: u32,
}

impl Document {
    /// Create an empty `<html><head></head><body></body></html>` document
    pub fn new() -> Self {
        let mut tree = DomTree::new();
        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");
        // Fresh nodes under a fresh root cannot fail to link.
        let _ = tree.append_child(NodeId::ROOT, html);
        let _ = tree.append_child(html, head);
        let _ = tree.append_child(html, body);
        Self {
            tree,
            listeners: ListenerRegistry::default(),
            observers: ObserverRegistry::default(),
            event_loop: EventLoop::default(),
            services: Services::new(),
            active: None,
            media: MediaFeatures::default(),
            viewport: Size::new(1024.0, 768.0),
            scroll: (0.0, 0.0),
            html,
            head,
            body,
            task_depth: 0,
        }
    }

    // ---- tree ----

    /// Read-only view of the node tree
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    pub fn document_element(&self) -> NodeId {
        self.html
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.tree.create_element(tag)
    }

    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.tree.create_text(content)
    }

    /// Append `child` to `parent`, moving it if it is already in the tree
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> Result<()> {
        let old_parent = self.tree.parent(child);
        self.tree.insert_before(parent, child, reference)?;
        if let Some(old) = old_parent {
            self.record(MutationRecord::child_list(old, Vec::new(), vec![child]));
        }
        self.record(MutationRecord::child_list(parent, vec![child], Vec::new()));
        Ok(())
    }

    /// Remove a node from its parent. Returns the former parent.
    pub fn remove_node(&mut self, node: NodeId) -> Option<NodeId> {
        let parent = self.tree.detach(node)?;
        if self.active.is_some_and(|a| self.tree.contains(node, a)) {
            self.active = None;
        }
        self.record(MutationRecord::child_list(parent, Vec::new(), vec![node]));
        Some(parent)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.tree.parent(node)
    }

    pub fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.tree.parent_element(node)
    }

    pub fn next_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.tree.next_element_sibling(node)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.tree.children(node).collect()
    }

    pub fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.tree.element_children(node).collect()
    }

    /// Pre-order descendants, excluding `node`
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        self.tree.descendants(node).collect()
    }

    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.tree.contains(ancestor, node)
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.tree.is_connected(node)
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.tree.is_element(node)
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.tree.tag(node)
    }

    pub fn text_content(&self, node: NodeId) -> String {
        self.tree.text_content(node)
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        self.tree.get(node).and_then(|n| n.as_element())
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        self.tree.get_mut(node).and_then(|n| n.as_element_mut())
    }

    /// First connected element with the given `id`
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        if id.is_empty() {
            return None;
        }
        self.tree
            .descendants(NodeId::ROOT)
            .find(|&n| self.get_attribute(n, "id") == Some(id))
    }

    // ---- attributes ----

    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node).and_then(|e| e.get_attr(name))
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.element(node).is_some_and(|e| e.attrs.has_attribute(name))
    }

    pub fn attribute_names(&self, node: NodeId) -> Vec<String> {
        self.element(node)
            .map(|e| e.attrs.get_attribute_names().into_iter().map(String::from).collect())
            .unwrap_or_default()
    }

    /// Set an attribute. Non-elements are ignored.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(elem) = self.element_mut(node) else {
            return;
        };
        let old = elem.attrs.set_attribute(name, value);
        self.record(MutationRecord::attribute(node, name, old));
    }

    /// Remove an attribute, returning whether it was present
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> bool {
        let Some(old) = self.element_mut(node).and_then(|e| e.attrs.remove_named_item(name)) else {
            return false;
        };
        self.record(MutationRecord::attribute(node, name, Some(old)));
        true
    }

    /// Toggle a boolean attribute, returning whether it is now present
    pub fn toggle_attribute(&mut self, node: NodeId, name: &str, force: Option<bool>) -> bool {
        let want = force.unwrap_or(!self.has_attribute(node, name));
        match (want, self.has_attribute(node, name)) {
            (true, false) => self.set_attribute(node, name, ""),
            (false, true) => {
                self.remove_attribute(node, name);
            }
            _ => {}
        }
        want && self.is_element(node)
    }

    // ---- classes ----

    pub fn class_list(&self, node: NodeId) -> TokenList {
        TokenList::parse(self.get_attribute(node, "class").unwrap_or(""))
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.class_list(node).contains(class)
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        let mut list = self.class_list(node);
        if list.add(class) {
            self.set_attribute(node, "class", &list.value());
        }
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        let mut list = self.class_list(node);
        if list.remove(class) {
            self.set_attribute(node, "class", &list.value());
        }
    }

    // ---- inline style ----

    fn style_declarations(&self, node: NodeId) -> Vec<(String, String)> {
        self.get_attribute(node, "style")
            .unwrap_or("")
            .split(';')
            .filter_map(|decl| {
                let (prop, value) = decl.split_once(':')?;
                let prop = prop.trim().to_ascii_lowercase();
                (!prop.is_empty()).then(|| (prop, value.trim().to_string()))
            })
            .collect()
    }

    fn write_style(&mut self, node: NodeId, decls: &[(String, String)]) {
        if decls.is_empty() {
            self.remove_attribute(node, "style");
        } else {
            let text = decls
                .iter()
                .map(|(p, v)| format!("{p}: {v};"))
                .collect::<Vec<_>>()
                .join(" ");
            self.set_attribute(node, "style", &text);
        }
    }

    /// Inline style property value
    pub fn style_property(&self, node: NodeId, property: &str) -> Option<String> {
        self.style_declarations(node)
            .into_iter()
            .find(|(p, _)| p.eq_ignore_ascii_case(property))
            .map(|(_, v)| v)
    }

    pub fn set_style_property(&mut self, node: NodeId, property: &str, value: &str) {
        if !self.is_element(node) {
            return;
        }
        let mut decls = self.style_declarations(node);
        match decls.iter_mut().find(|(p, _)| p.eq_ignore_ascii_case(property)) {
            Some(decl) => decl.1 = value.to_string(),
            None => decls.push((property.to_ascii_lowercase(), value.to_string())),
        }
        self.write_style(node, &decls);
    }

    pub fn remove_style_property(&mut self, node: NodeId, property: &str) {
        let mut decls = self.style_declarations(node);
        let before = decls.len();
        decls.retain(|(p, _)| !p.eq_ignore_ascii_case(property));
        if decls.len() != before {
            self.write_style(node, &decls);
        }
    }

    // ---- selectors ----

    /// Elements under `root` (exclusive) matching a parsed selector
    pub fn select(&self, root: NodeId, selector: &SelectorList) -> Vec<NodeId> {
        self.tree
            .descendants(root)
            .filter(|&n| selector.matches(&self.tree, n))
            .collect()
    }

    pub fn query_selector(&self, root: NodeId, selector: &str) -> Result<Option<NodeId>> {
        let selector = SelectorList::parse(selector)?;
        Ok(self.tree.descendants(root).find(|&n| selector.matches(&self.tree, n)))
    }

    pub fn query_selector_all(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        let selector = SelectorList::parse(selector)?;
        Ok(self.select(root, &selector))
    }

    pub fn matches(&self, node: NodeId, selector: &str) -> Result<bool> {
        Ok(SelectorList::parse(selector)?.matches(&self.tree, node))
    }

    /// Nearest inclusive ancestor matching `selector`
    pub fn closest(&self, node: NodeId, selector: &str) -> Result<Option<NodeId>> {
        let selector = SelectorList::parse(selector)?;
        Ok(std::iter::once(node)
            .chain(self.tree.ancestors(node))
            .find(|&n| selector.matches(&self.tree, n)))
    }

    // ---- geometry ----

    /// Bounding box, empty when the host never supplied one
    pub fn rect(&self, node: NodeId) -> DOMRect {
        self.element(node).and_then(|e| e.rect).unwrap_or_default()
    }

    pub fn set_rect(&mut self, node: NodeId, rect: DOMRect) {
        if let Some(elem) = self.element_mut(node) {
            elem.rect = Some(rect);
        }
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Resize the viewport and fire `resize` at the document
    pub fn set_viewport(&mut self, size: Size) {
        self.viewport = size;
        self.dispatch_event(NodeId::ROOT, Event::new("resize"));
    }

    pub fn scroll_position(&self) -> (f64, f64) {
        self.scroll
    }

    /// Scroll the page and fire `scroll` at the document
    pub fn scroll_to(&mut self, x: f64, y: f64) {
        self.user_task(|doc| {
            doc.scroll = (x, y);
            doc.dispatch_event(NodeId::ROOT, Event::new("scroll"));
        });
    }

    pub fn media(&self) -> &MediaFeatures {
        &self.media
    }

    pub fn set_media(&mut self, media: MediaFeatures) {
        self.media = media;
    }

    // ---- services ----

    /// Get a document-scoped service, creating it on first use
    pub fn service<T: 'static + Default>(&mut self) -> Rc<T> {
        self.services.get_or_default::<T>()
    }

    pub fn try_service<T: 'static>(&self) -> Option<Rc<T>> {
        self.services.get::<T>()
    }

    /// Install a service instance, replacing any existing one
    pub fn set_service<T: 'static>(&mut self, service: Rc<T>) -> Option<Rc<T>> {
        self.services.insert(service)
    }

    // ---- events ----

    pub fn add_event_listener(
        &mut self,
        target: NodeId,
        kind: &str,
        options: ListenerOptions,
        listener: impl Fn(&mut Document, &mut Event) + 'static,
    ) -> ListenerId {
        self.listeners.add(target, kind, options, Rc::new(listener))
    }

    pub fn remove_event_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn has_listener(&self, id: ListenerId) -> bool {
        self.listeners.is_registered(id)
    }

    /// Total live listeners across the document
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Live listeners attached to one node
    pub fn listener_count_on(&self, node: NodeId) -> usize {
        self.listeners.count_on(node)
    }

    /// Dispatch through capture, target and bubble phases and hand the
    /// event back so callers can inspect `default_prevented`
    pub fn dispatch_event(&mut self, target: NodeId, mut event: Event) -> Event {
        trace!(kind = event.kind(), %target, "dispatch");
        event.target = target;
        let ancestors: Vec<NodeId> = self.tree.ancestors(target).collect();

        event.set_phase(EventPhase::Capturing);
        for &node in ancestors.iter().rev() {
            self.invoke(node, &mut event, true);
            if event.propagation_stopped() {
                break;
            }
        }
        if !event.propagation_stopped() {
            event.set_phase(EventPhase::AtTarget);
            self.invoke(target, &mut event, true);
            if !event.immediate_propagation_stopped() {
                self.invoke(target, &mut event, false);
            }
        }
        if event.is_bubbling() && !event.propagation_stopped() {
            event.set_phase(EventPhase::Bubbling);
            for &node in &ancestors {
                self.invoke(node, &mut event, false);
                if event.propagation_stopped() {
                    break;
                }
            }
        }
        event.set_phase(EventPhase::None);
        event.current_target = NodeId::NONE;
        event
    }

    fn invoke(&mut self, node: NodeId, event: &mut Event, capture: bool) {
        event.current_target = node;
        for (id, once, listener) in self.listeners.snapshot(node, event.kind(), capture) {
            // An earlier listener may have removed this one.
            if !self.listeners.is_registered(id) {
                continue;
            }
            if once {
                self.listeners.remove(id);
            }
            listener(self, event);
            if event.immediate_propagation_stopped() {
                break;
            }
        }
    }

    /// Run `f` as a top-level task; microtasks drain when the outermost
    /// task finishes
    fn user_task<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.task_depth += 1;
        let out = f(self);
        self.task_depth -= 1;
        if self.task_depth == 0 {
            self.run_microtasks();
        }
        out
    }

    /// Simulated user click. Disabled controls ignore it.
    pub fn click(&mut self, target: NodeId) -> Event {
        self.user_task(|doc| {
            if doc.is_disabled(target) {
                return Event::click();
            }
            doc.dispatch_event(target, Event::click())
        })
    }

    /// Simulated key press at `target`, including default actions:
    /// Tab moves focus, Enter activates buttons and links, Space
    /// activates buttons
    pub fn key_down(&mut self, target: NodeId, key: &str, shift: bool) -> Event {
        self.user_task(|doc| {
            let event = doc.dispatch_event(target, Event::keyboard("keydown", key).with_shift(shift));
            if event.default_prevented() {
                return event;
            }
            let tag = doc.tag_name(target).unwrap_or("").to_string();
            match key {
                "Tab" => doc.move_focus(!shift),
                "Enter" if tag == "button" || (tag == "a" && doc.has_attribute(target, "href")) => {
                    doc.click(target);
                }
                " " | "Spacebar" if tag == "button" => {
                    doc.click(target);
                }
                _ => {}
            }
            event
        })
    }

    /// Key press at the focused element
    pub fn press_key(&mut self, key: &str, shift: bool) -> Event {
        let target = self.active_element();
        self.key_down(target, key, shift)
    }

    /// Simulated pointer event (`pointerenter`, `pointerleave`,
    /// `pointerdown`, `pointerup`)
    pub fn pointer(&mut self, target: NodeId, kind: &str, pointer_type: PointerType) -> Event {
        self.user_task(|doc| doc.dispatch_event(target, Event::pointer(kind, pointer_type)))
    }

    // ---- event loop ----

    /// Virtual clock in milliseconds
    pub fn now(&self) -> u64 {
        self.event_loop.now()
    }

    pub fn queue_microtask(&mut self, task: impl FnOnce(&mut Document) + 'static) {
        self.event_loop.queue_microtask(Box::new(task));
    }

    pub fn set_timeout(&mut self, delay_ms: u64, task: impl FnOnce(&mut Document) + 'static) -> TimerId {
        self.event_loop.set_timeout(delay_ms, Box::new(task))
    }

    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        self.event_loop.clear_timeout(id)
    }

    pub fn request_animation_frame(&mut self, task: impl FnOnce(&mut Document) + 'static) -> FrameId {
        self.event_loop.request_frame(Box::new(task))
    }

    pub fn cancel_animation_frame(&mut self, id: FrameId) -> bool {
        self.event_loop.cancel_frame(id)
    }

    pub fn pending_timers(&self) -> usize {
        self.event_loop.pending_timers()
    }

    pub fn pending_frames(&self) -> usize {
        self.event_loop.pending_frames()
    }

    /// Drain the microtask queue, including microtasks queued while draining
    pub fn run_microtasks(&mut self) {
        let mut ran = 0;
        while let Some(task) = self.event_loop.take_microtask() {
            task(self);
            ran += 1;
            if ran >= MICROTASK_LIMIT {
                warn!(ran, "microtask queue did not settle");
                break;
            }
        }
    }

    /// Move the clock forward, running every timer that falls due in order
    pub fn advance_time(&mut self, ms: u64) {
        self.run_microtasks();
        let until = self.now() + ms;
        while let Some((due, task)) = self.event_loop.pop_due_timer(until) {
            self.event_loop.set_now(due);
            trace!(due, "timer");
            self.user_task(|doc| task(doc));
        }
        self.event_loop.set_now(until);
    }

    /// Run one frame's worth of animation frame callbacks
    pub fn render_frame(&mut self) {
        self.run_microtasks();
        for task in self.event_loop.take_frames() {
            self.user_task(|doc| task(doc));
        }
    }

    // ---- mutation observers ----

    pub fn create_mutation_observer(
        &mut self,
        callback: impl Fn(&mut Document, &[MutationRecord], ObserverId) + 'static,
    ) -> ObserverId {
        let callback: MutationCallback = Rc::new(callback);
        self.observers.create(callback)
    }

    /// Start observing `target`
    pub fn observe(&mut self, observer: ObserverId, target: NodeId, init: MutationObserverInit) -> Result<()> {
        if self.tree.get(target).is_none() {
            return Err(DomError::UnknownNode(target));
        }
        self.observers.observe(observer, target, init);
        Ok(())
    }

    pub fn disconnect_observer(&mut self, observer: ObserverId) -> bool {
        self.observers.disconnect(observer)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    fn record(&mut self, record: MutationRecord) {
        if self.observers.enqueue(&self.tree, &record) {
            self.queue_microtask(Document::deliver_mutations);
        }
    }

    fn deliver_mutations(&mut self) {
        for (id, callback, records) in self.observers.take_pending() {
            if self.observers.is_active(id) {
                callback(self, &records, id);
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn nested(doc: &mut Document) -> (NodeId, NodeId) {
        let outer = doc.create_element("div");
        let inner = doc.create_element("button");
        let body = doc.body();
        doc.append_child(body, outer).unwrap();
        doc.append_child(outer, inner).unwrap();
        (outer, inner)
    }

    #[test]
    fn test_dispatch_phases() {
        let mut doc = Document::new();
        let (outer, inner) = nested(&mut doc);
        let log = Rc::new(RefCell::new(Vec::new()));

        for (node, capture, label) in [
            (outer, true, "outer-capture"),
            (inner, false, "target"),
            (outer, false, "outer-bubble"),
        ] {
            let log = log.clone();
            let options = ListenerOptions { capture, once: false };
            doc.add_event_listener(node, "click", options, move |_, _| log.borrow_mut().push(label));
        }
        doc.click(inner);
        assert_eq!(*log.borrow(), vec!["outer-capture", "target", "outer-bubble"]);
    }

    #[test]
    fn test_stop_propagation_and_once() {
        let mut doc = Document::new();
        let (outer, inner) = nested(&mut doc);
        let hits = Rc::new(RefCell::new(0));

        let h = hits.clone();
        doc.add_event_listener(outer, "click", ListenerOptions::default(), move |_, _| *h.borrow_mut() += 1);
        let once = doc.add_event_listener(inner, "click", ListenerOptions::once(), |_, e| e.stop_propagation());

        doc.click(inner);
        assert_eq!(*hits.borrow(), 0);
        assert!(!doc.has_listener(once));
        doc.click(inner);
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn test_listener_may_remove_later_listener() {
        let mut doc = Document::new();
        let (_outer, inner) = nested(&mut doc);
        let hits = Rc::new(RefCell::new(0));
        let second = Rc::new(RefCell::new(None));

        let s = second.clone();
        doc.add_event_listener(inner, "click", ListenerOptions::default(), move |doc, _| {
            if let Some(id) = *s.borrow() {
                doc.remove_event_listener(id);
            }
        });
        let h = hits.clone();
        let id = doc.add_event_listener(inner, "click", ListenerOptions::default(), move |_, _| *h.borrow_mut() += 1);
        *second.borrow_mut() = Some(id);

        doc.click(inner);
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn test_query_and_closest() {
        let mut doc = Document::new();
        let (outer, inner) = nested(&mut doc);
        doc.set_attribute(outer, "id", "panel");
        doc.add_class(inner, "close");

        assert_eq!(doc.get_element_by_id("panel"), Some(outer));
        assert_eq!(doc.query_selector(NodeId::ROOT, "#panel .close").unwrap(), Some(inner));
        assert_eq!(doc.closest(inner, "div").unwrap(), Some(outer));
        assert!(doc.matches(inner, "button.close").unwrap());
        assert!(doc.query_selector_all(NodeId::ROOT, "[").is_err());
    }

    #[test]
    fn test_style_properties() {
        let mut doc = Document::new();
        let (outer, _) = nested(&mut doc);
        doc.set_style_property(outer, "display", "none");
        doc.set_style_property(outer, "top", "4px");
        assert_eq!(doc.style_property(outer, "display").as_deref(), Some("none"));
        doc.remove_style_property(outer, "display");
        assert_eq!(doc.get_attribute(outer, "style"), Some("top: 4px;"));
        doc.remove_style_property(outer, "top");
        assert!(!doc.has_attribute(outer, "style"));
    }

    #[test]
    fn test_mutations_delivered_on_microtask() {
        let mut doc = Document::new();
        let (outer, inner) = nested(&mut doc);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let s = seen.clone();
        let observer = doc.create_mutation_observer(move |_, records, _| {
            s.borrow_mut().extend(records.iter().filter_map(|r| r.attribute_name.clone()));
        });
        doc.observe(observer, outer, MutationObserverInit::attributes_in_subtree(&["hidden"]))
            .unwrap();

        doc.set_attribute(inner, "hidden", "");
        doc.set_attribute(inner, "title", "x");
        assert!(seen.borrow().is_empty());
        doc.run_microtasks();
        assert_eq!(*seen.borrow(), vec!["hidden".to_string()]);

        doc.disconnect_observer(observer);
        doc.remove_attribute(inner, "hidden");
        doc.run_microtasks();
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_timers_and_frames() {
        let mut doc = Document::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = log.clone();
        doc.set_timeout(100, move |doc| l.borrow_mut().push(format!("timer@{}", doc.now())));
        let l = log.clone();
        let cancelled = doc.set_timeout(50, move |_| l.borrow_mut().push("cancelled".into()));
        doc.clear_timeout(cancelled);

        let l = log.clone();
        doc.request_animation_frame(move |doc| {
            l.borrow_mut().push("frame1".into());
            let l = l.clone();
            doc.request_animation_frame(move |_| l.borrow_mut().push("frame2".into()));
        });

        doc.render_frame();
        assert_eq!(*log.borrow(), vec!["frame1"]);
        doc.render_frame();
        doc.advance_time(99);
        assert_eq!(log.borrow().len(), 2);
        doc.advance_time(1);
        assert_eq!(log.borrow().last().map(String::as_str), Some("timer@100"));
    }

    #[test]
    fn test_remove_node_clears_focus() {
        let mut doc = Document::new();
        let (outer, inner) = nested(&mut doc);
        doc.focus(inner).unwrap();
        assert_eq!(doc.remove_node(outer), Some(doc.body()));
        assert_eq!(doc.active_element(), doc.body());
    }

    #[test]
    fn test_enter_activates_button() {
        let mut doc = Document::new();
        let (_outer, inner) = nested(&mut doc);
        let clicks = Rc::new(RefCell::new(0));
        let c = clicks.clone();
        doc.add_event_listener(inner, "click", ListenerOptions::default(), move |_, _| *c.borrow_mut() += 1);

        doc.key_down(inner, "Enter", false);
        doc.key_down(inner, " ", false);
        assert_eq!(*clicks.borrow(), 2);
    }
}
