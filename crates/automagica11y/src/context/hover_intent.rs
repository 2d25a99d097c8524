//! Hover Intent
//!
//! Debounced show/hide scheduling for anchored surfaces. Pointer
//! enter/leave on the trigger or any attached element, focus and blur on
//! the trigger, and (on coarse-pointer devices) a touch long-press that
//! pins the surface open until the next outside pointer-down.
//!
//! Show and hide timers cancel each other: scheduling either clears
//! both.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use ama_dom::{Document, Event, ListenerOptions, NodeId, PointerType, TimerId};

use crate::device::has_fine_pointer;
use crate::toggle::track_listener;

type Callback = Rc<dyn Fn(&mut Document)>;

/// Delays in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoverIntentOptions {
    pub open_delay: u64,
    pub close_delay: u64,
    pub long_press_delay: u64,
}

impl Default for HoverIntentOptions {
    fn default() -> Self {
        Self {
            open_delay: 0,
            close_delay: 100,
            long_press_delay: 550,
        }
    }
}

pub struct HoverIntent {
    trigger: NodeId,
    options: HoverIntentOptions,
    show: Callback,
    hide: Callback,
    elements: RefCell<Vec<NodeId>>,
    pointer_active: Cell<bool>,
    focus_active: Cell<bool>,
    touch_hold: Cell<bool>,
    show_timer: Cell<Option<TimerId>>,
    hide_timer: Cell<Option<TimerId>>,
    long_press_timer: Cell<Option<TimerId>>,
    this: Weak<HoverIntent>,
}

impl HoverIntent {
    /// Wire hover intent onto `trigger`. Listeners live as long as the
    /// trigger's toggle.
    pub fn attach(
        doc: &mut Document,
        trigger: NodeId,
        options: HoverIntentOptions,
        show: impl Fn(&mut Document) + 'static,
        hide: impl Fn(&mut Document) + 'static,
    ) -> Rc<Self> {
        let intent = Rc::new_cyclic(|this| Self {
            trigger,
            options,
            show: Rc::new(show),
            hide: Rc::new(hide),
            elements: RefCell::new(Vec::new()),
            pointer_active: Cell::new(false),
            focus_active: Cell::new(false),
            touch_hold: Cell::new(false),
            show_timer: Cell::new(None),
            hide_timer: Cell::new(None),
            long_press_timer: Cell::new(None),
            this: this.clone(),
        });

        intent.attach_pointer(doc, trigger);
        intent.listen(doc, trigger, "focus", ListenerOptions::default(), |intent, doc, _| {
            intent.focus_active.set(true);
            intent.clear_hide(doc);
            (intent.show)(doc);
        });
        intent.listen(doc, trigger, "blur", ListenerOptions::default(), |intent, doc, _| {
            intent.focus_active.set(false);
            intent.schedule_hide(doc);
        });

        if !has_fine_pointer(doc) {
            intent.attach_long_press(doc);
        }
        intent
    }

    pub fn trigger(&self) -> NodeId {
        self.trigger
    }

    /// The surface is pinned open by a touch long-press
    pub fn is_held(&self) -> bool {
        self.touch_hold.get()
    }

    /// Treat pointer activity on `el` like activity on the trigger
    pub fn add_element(&self, doc: &mut Document, el: NodeId) {
        if !self.attach_pointer(doc, el) || has_fine_pointer(doc) {
            return;
        }
        self.listen(doc, el, "pointerdown", ListenerOptions::default(), |intent, _, event| {
            if is_touch(event) {
                intent.pointer_active.set(true);
            }
        });
        for kind in ["pointerup", "pointercancel"] {
            self.listen(doc, el, kind, ListenerOptions::default(), |intent, doc, event| {
                if is_touch(event) {
                    intent.pointer_active.set(false);
                    intent.schedule_hide(doc);
                }
            });
        }
    }

    pub fn reset_touch_hold(&self) {
        self.touch_hold.set(false);
    }

    /// Cancel pending work and hide right away
    pub fn hide_now(&self, doc: &mut Document) {
        self.clear_show(doc);
        self.clear_hide(doc);
        self.reset_touch_hold();
        (self.hide)(doc);
    }

    pub fn schedule_show(&self, doc: &mut Document) {
        self.clear_show(doc);
        self.clear_hide(doc);
        if self.options.open_delay == 0 {
            (self.show)(doc);
            return;
        }
        let this = self.this.clone();
        let id = doc.set_timeout(self.options.open_delay, move |doc| {
            if let Some(intent) = this.upgrade() {
                intent.show_timer.set(None);
                (intent.show)(doc);
            }
        });
        self.show_timer.set(Some(id));
    }

    pub fn schedule_hide(&self, doc: &mut Document) {
        self.clear_show(doc);
        self.clear_hide(doc);
        if self.is_engaged() {
            return;
        }
        let this = self.this.clone();
        let id = doc.set_timeout(self.options.close_delay, move |doc| {
            let Some(intent) = this.upgrade() else {
                return;
            };
            intent.hide_timer.set(None);
            if !intent.is_engaged() {
                intent.reset_touch_hold();
                (intent.hide)(doc);
            }
        });
        self.hide_timer.set(Some(id));
    }

    /// Cancel every pending timer and drop the hold
    pub fn cancel(&self, doc: &mut Document) {
        self.clear_show(doc);
        self.clear_hide(doc);
        self.clear_long_press(doc);
        self.reset_touch_hold();
    }

    fn is_engaged(&self) -> bool {
        self.pointer_active.get() || self.focus_active.get() || self.touch_hold.get()
    }

    fn clear_show(&self, doc: &mut Document) {
        if let Some(id) = self.show_timer.take() {
            doc.clear_timeout(id);
        }
    }

    fn clear_hide(&self, doc: &mut Document) {
        if let Some(id) = self.hide_timer.take() {
            doc.clear_timeout(id);
        }
    }

    fn clear_long_press(&self, doc: &mut Document) {
        if let Some(id) = self.long_press_timer.take() {
            doc.clear_timeout(id);
        }
    }

    /// Register a listener that holds only a weak reference back
    fn listen(
        &self,
        doc: &mut Document,
        node: NodeId,
        kind: &str,
        options: ListenerOptions,
        handler: impl Fn(&HoverIntent, &mut Document, &mut Event) + 'static,
    ) {
        let this = self.this.clone();
        let id = doc.add_event_listener(node, kind, options, move |doc, event| {
            if let Some(intent) = this.upgrade() {
                handler(&intent, doc, event);
            }
        });
        track_listener(doc, self.trigger, id);
    }

    /// Mouse and pen enter/leave. False if `el` was already attached.
    fn attach_pointer(&self, doc: &mut Document, el: NodeId) -> bool {
        if self.elements.borrow().contains(&el) {
            return false;
        }
        self.elements.borrow_mut().push(el);
        self.listen(doc, el, "pointerenter", ListenerOptions::default(), |intent, doc, event| {
            if is_touch(event) {
                return;
            }
            intent.pointer_active.set(true);
            intent.schedule_show(doc);
        });
        self.listen(doc, el, "pointerleave", ListenerOptions::default(), |intent, doc, event| {
            if is_touch(event) {
                return;
            }
            intent.pointer_active.set(false);
            intent.schedule_hide(doc);
        });
        true
    }

    fn attach_long_press(&self, doc: &mut Document) {
        self.listen(doc, self.trigger, "pointerdown", ListenerOptions::default(), |intent, doc, event| {
            if !is_touch(event) {
                return;
            }
            intent.pointer_active.set(true);
            intent.clear_long_press(doc);
            let this = intent.this.clone();
            let id = doc.set_timeout(intent.options.long_press_delay, move |doc| {
                if let Some(intent) = this.upgrade() {
                    intent.long_press_timer.set(None);
                    intent.touch_hold.set(true);
                    tracing::debug!("long press pinned surface of {}", intent.trigger);
                    (intent.show)(doc);
                }
            });
            intent.long_press_timer.set(Some(id));
        });

        for kind in ["pointerup", "pointercancel"] {
            self.listen(doc, self.trigger, kind, ListenerOptions::default(), |intent, doc, event| {
                if !is_touch(event) {
                    return;
                }
                intent.pointer_active.set(false);
                if intent.long_press_timer.get().is_some() {
                    intent.clear_long_press(doc);
                    intent.schedule_hide(doc);
                    return;
                }
                if !intent.touch_hold.get() {
                    intent.schedule_hide(doc);
                }
            });
        }

        self.listen(doc, NodeId::ROOT, "pointerdown", ListenerOptions::capture(), |intent, doc, event| {
            if !intent.touch_hold.get() {
                return;
            }
            let origin = event.target();
            let inside = intent.elements.borrow().iter().any(|&el| doc.contains(el, origin));
            if inside {
                return;
            }
            intent.reset_touch_hold();
            intent.schedule_hide(doc);
        });
    }
}

fn is_touch(event: &Event) -> bool {
    event.pointer_type() == Some(PointerType::Touch)
}

impl fmt::Debug for HoverIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HoverIntent")
            .field("trigger", &self.trigger)
            .field("options", &self.options)
            .field("elements", &self.elements.borrow())
            .field("pointer_active", &self.pointer_active.get())
            .field("focus_active", &self.focus_active.get())
            .field("touch_hold", &self.touch_hold.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ama_dom::MediaFeatures;

    struct Fixture {
        doc: Document,
        trigger: NodeId,
        surface: NodeId,
        visible: Rc<Cell<bool>>,
        intent: Rc<HoverIntent>,
    }

    /// Hover intent with no toggle behind it; listeners are untracked
    fn fixture(options: HoverIntentOptions, fine_pointer: bool) -> Fixture {
        let mut doc = Document::new();
        doc.set_media(MediaFeatures {
            any_fine_pointer: fine_pointer,
            ..MediaFeatures::default()
        });
        let body = doc.body();
        let trigger = doc.create_element("button");
        let surface = doc.create_element("div");
        doc.append_child(body, trigger).unwrap();
        doc.append_child(body, surface).unwrap();

        let visible = Rc::new(Cell::new(false));
        let (on, off) = (visible.clone(), visible.clone());
        let intent = HoverIntent::attach(&mut doc, trigger, options, move |_| on.set(true), move |_| off.set(false));
        intent.add_element(&mut doc, surface);
        Fixture { doc, trigger, surface, visible, intent }
    }

    #[test]
    fn test_open_delay() {
        let options = HoverIntentOptions { open_delay: 200, ..Default::default() };
        let mut f = fixture(options, true);
        f.doc.pointer(f.trigger, "pointerenter", PointerType::Mouse);
        f.doc.advance_time(199);
        assert!(!f.visible.get());
        f.doc.advance_time(1);
        assert!(f.visible.get());
    }

    #[test]
    fn test_leave_then_reenter_cancels_hide() {
        let mut f = fixture(HoverIntentOptions::default(), true);
        f.doc.pointer(f.trigger, "pointerenter", PointerType::Mouse);
        assert!(f.visible.get());
        f.doc.pointer(f.trigger, "pointerleave", PointerType::Mouse);
        f.doc.advance_time(50);
        f.doc.pointer(f.surface, "pointerenter", PointerType::Mouse);
        f.doc.advance_time(500);
        assert!(f.visible.get());
        f.doc.pointer(f.surface, "pointerleave", PointerType::Mouse);
        f.doc.advance_time(100);
        assert!(!f.visible.get());
    }

    #[test]
    fn test_touch_enter_is_ignored() {
        let mut f = fixture(HoverIntentOptions::default(), true);
        f.doc.pointer(f.trigger, "pointerenter", PointerType::Touch);
        assert!(!f.visible.get());
    }

    #[test]
    fn test_long_press_holds_until_outside_pointerdown() {
        let mut f = fixture(HoverIntentOptions::default(), false);
        let outside = f.doc.create_element("p");
        let body = f.doc.body();
        f.doc.append_child(body, outside).unwrap();

        f.doc.pointer(f.trigger, "pointerdown", PointerType::Touch);
        f.doc.advance_time(550);
        assert!(f.visible.get());
        assert!(f.intent.is_held());

        f.doc.pointer(f.trigger, "pointerup", PointerType::Touch);
        f.doc.advance_time(1_000);
        assert!(f.visible.get());

        f.doc.pointer(outside, "pointerdown", PointerType::Touch);
        assert!(!f.intent.is_held());
        f.doc.advance_time(100);
        assert!(!f.visible.get());
    }

    #[test]
    fn test_short_tap_does_not_pin() {
        let mut f = fixture(HoverIntentOptions::default(), false);
        f.doc.pointer(f.trigger, "pointerdown", PointerType::Touch);
        f.doc.advance_time(200);
        f.doc.pointer(f.trigger, "pointerup", PointerType::Touch);
        f.doc.advance_time(1_000);
        assert!(!f.visible.get());
        assert!(!f.intent.is_held());
    }

    #[test]
    fn test_fine_pointer_skips_long_press() {
        let mut f = fixture(HoverIntentOptions::default(), true);
        f.doc.pointer(f.trigger, "pointerdown", PointerType::Touch);
        f.doc.advance_time(1_000);
        assert!(!f.visible.get());
    }
}
