//! Tooltip behaviors: hover intent, anchored placement, dismissal

use std::cell::RefCell;
use std::collections::HashSet;

use ama_dom::{Document, ListenerOptions, NodeId};

use super::hover_intent::{HoverIntent, HoverIntentOptions};
use crate::attributes::{get_data, parse_delay, prefixed_selector, set_data};
use crate::config::Config;
use crate::events::{self, SurfaceDetail};
use crate::placement::{resolve_for, PreferredPlacement};
use crate::toggle::{is_initialized, on_destroy, on_transition, set_toggle_state, track_listener};

/// (trigger, surface) pairs already wired
#[derive(Debug, Default)]
struct TooltipBindings {
    bound: RefCell<HashSet<(NodeId, NodeId)>>,
}

fn hover_options(doc: &mut Document, trigger: NodeId) -> HoverIntentOptions {
    let config = Config::for_document(doc);
    HoverIntentOptions {
        open_delay: parse_delay(get_data(doc, trigger, "tooltip-open-delay"), config.open_delay_ms),
        close_delay: parse_delay(get_data(doc, trigger, "tooltip-close-delay"), config.close_delay_ms),
        long_press_delay: parse_delay(get_data(doc, trigger, "tooltip-long-press"), config.long_press_ms),
    }
}

pub(crate) fn enable(doc: &mut Document, trigger: NodeId, target: NodeId) {
    if !is_initialized(doc, trigger) {
        return;
    }
    if !doc.service::<TooltipBindings>().bound.borrow_mut().insert((trigger, target)) {
        return;
    }

    let options = hover_options(doc, trigger);
    let preferred = PreferredPlacement::parse(get_data(doc, trigger, "tooltip-position"));
    set_data(doc, target, "tooltip-placement", preferred.initial_side().as_str());

    let show = move |doc: &mut Document| {
        set_toggle_state(doc, trigger, true);
        let side = resolve_for(doc, trigger, target, preferred);
        set_data(doc, target, "tooltip-placement", side.as_str());
        events::dispatch(doc, trigger, events::CONTEXT_ANCHOR, SurfaceDetail { trigger, target });
    };
    let hide = move |doc: &mut Document| {
        set_toggle_state(doc, trigger, false);
    };
    let hover = HoverIntent::attach(doc, trigger, options, show, hide);
    hover.add_element(doc, target);

    let dismiss_controls = doc
        .query_selector_all(target, &prefixed_selector("tooltip-dismiss"))
        .unwrap_or_default();
    for control in dismiss_controls {
        if doc.tag_name(control) == Some("button") && !doc.has_attribute(control, "type") {
            doc.set_attribute(control, "type", "button");
        }
        let on_click = hover.clone();
        let id = doc.add_event_listener(control, "click", ListenerOptions::default(), move |doc, _| {
            on_click.hide_now(doc);
        });
        track_listener(doc, trigger, id);
        let on_key = hover.clone();
        let id = doc.add_event_listener(control, "keydown", ListenerOptions::default(), move |doc, event| {
            if matches!(event.key(), Some("Enter" | " ")) {
                event.prevent_default();
                on_key.hide_now(doc);
            }
        });
        track_listener(doc, trigger, id);
    }

    let on_escape = hover.clone();
    let id = doc.add_event_listener(trigger, "keydown", ListenerOptions::default(), move |doc, event| {
        if event.key() == Some("Escape") {
            on_escape.hide_now(doc);
        }
    });
    track_listener(doc, trigger, id);

    let pending = hover.clone();
    on_destroy(doc, trigger, move |doc| {
        pending.cancel(doc);
        if let Some(bindings) = doc.try_service::<TooltipBindings>() {
            bindings.bound.borrow_mut().remove(&(trigger, target));
        }
    });

    on_transition(doc, trigger, move |doc, detail| {
        if detail.target != target {
            return;
        }
        events::dispatch(doc, trigger, events::TOOLTIP_TOGGLE, detail.clone());
        let kind = if detail.expanded { events::TOOLTIP_SHOWN } else { events::TOOLTIP_HIDDEN };
        events::dispatch(doc, trigger, kind, SurfaceDetail { trigger, target });
        if !detail.expanded {
            hover.reset_touch_hold();
        }
    });
}
