//! Single-purpose dialog and tooltip markup
//!
//! `data-automagica11y-dialog="#sel"` and `data-automagica11y-tooltip="#sel"`
//! are shorthands for a toggle with the matching context. Both hydrate
//! through the toggle state machine.

use ama_dom::{Document, NodeId};

use crate::attributes::{get_data_trimmed, has_data, set_data};
use crate::toggle::{init_toggle, note_promoted_alias, ToggleHandle};

fn promote(doc: &mut Document, trigger: NodeId, alias: &str) -> Option<ToggleHandle> {
    let selector = get_data_trimmed(doc, trigger, alias)?.to_string();
    if !has_data(doc, trigger, "toggle") {
        set_data(doc, trigger, "toggle", &selector);
    }
    if !has_data(doc, trigger, "context") {
        set_data(doc, trigger, "context", alias);
        note_promoted_alias(doc, trigger, alias);
    }
    init_toggle(doc, trigger)
}

/// Hydrate a `data-automagica11y-dialog` trigger
pub fn init_dialog(doc: &mut Document, trigger: NodeId) -> Option<ToggleHandle> {
    promote(doc, trigger, "dialog")
}

/// Hydrate a `data-automagica11y-tooltip` trigger
pub fn init_tooltip(doc: &mut Document, trigger: NodeId) -> Option<ToggleHandle> {
    promote(doc, trigger, "tooltip")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toggle::{is_toggle_open, ToggleRegistry};

    fn page(attr: &str, target_id: &str) -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let body = doc.body();
        let trigger = doc.create_element("button");
        let target = doc.create_element("div");
        doc.set_attribute(trigger, attr, &format!("#{target_id}"));
        doc.set_attribute(target, "id", target_id);
        doc.append_child(body, trigger).unwrap();
        doc.append_child(body, target).unwrap();
        (doc, trigger, target)
    }

    #[test]
    fn test_dialog_shorthand() {
        let (mut doc, trigger, target) = page("data-automagica11y-dialog", "dlg");
        let handle = init_dialog(&mut doc, trigger).unwrap();
        assert_eq!(doc.get_attribute(trigger, "data-automagica11y-toggle"), Some("#dlg"));
        assert_eq!(doc.get_attribute(trigger, "data-automagica11y-context"), Some("dialog"));
        assert_eq!(doc.get_attribute(target, "role"), Some("dialog"));
        assert_eq!(doc.get_attribute(target, "aria-modal"), Some("true"));
        assert!(doc.service::<ToggleRegistry>().contains(trigger));
        assert!(!handle.is_open(&doc));
    }

    #[test]
    fn test_tooltip_shorthand_uses_alias_prefix() {
        let (mut doc, trigger, target) = page("data-ama-tooltip", "tip");
        init_tooltip(&mut doc, trigger).unwrap();
        assert_eq!(doc.get_attribute(target, "role"), Some("tooltip"));
        assert_eq!(doc.get_attribute(trigger, "aria-describedby"), Some("tip"));
        doc.focus(trigger).unwrap();
        assert!(is_toggle_open(&doc, trigger));
    }

    #[test]
    fn test_missing_selector() {
        let mut doc = Document::new();
        let body = doc.body();
        let trigger = doc.create_element("button");
        doc.set_attribute(trigger, "data-automagica11y-dialog", " ");
        doc.append_child(body, trigger).unwrap();
        assert!(init_dialog(&mut doc, trigger).is_none());
        assert!(!doc.has_attribute(trigger, "data-automagica11y-toggle"));
    }
}
