//! Additive ARIA helpers
//!
//! Each helper backs off when the author already expressed the value,
//! either directly or through a `data-automagica11y-*` override.

use ama_a11y::AriaRole;
use ama_dom::{Document, NodeId};

use crate::attributes::{append_token, ensure_id, normalize_prefix};

fn normalized_names(doc: &Document, el: NodeId) -> Vec<String> {
    doc.attribute_names(el).iter().map(|name| normalize_prefix(name)).collect()
}

/// An explicit `role`, or any `data-automagica11y-*-role` attribute
pub fn has_role_override(doc: &Document, el: NodeId) -> bool {
    doc.has_attribute(el, "role")
        || normalized_names(doc, el)
            .iter()
            .any(|name| name.starts_with("data-automagica11y") && name.ends_with("-role"))
}

/// The attribute itself, or a `data-automagica11y-[trigger-|target-][aria-]{name}`
/// override
pub fn has_aria_override(doc: &Document, el: NodeId, attribute: &str) -> bool {
    let attribute = attribute.to_ascii_lowercase();
    if doc.has_attribute(el, &attribute) {
        return true;
    }
    let bare = attribute.strip_prefix("aria-").unwrap_or(&attribute);
    let names = normalized_names(doc, el);
    ["", "target-", "trigger-"].iter().any(|side| {
        [format!("data-automagica11y-{side}{bare}"), format!("data-automagica11y-{side}aria-{bare}")]
            .iter()
            .any(|candidate| names.contains(candidate))
    })
}

/// Trigger controls the surface, surface is labelled by the trigger
pub fn link(doc: &mut Document, trigger: NodeId, target: NodeId) {
    let trigger_id = ensure_id(doc, trigger, "automagica11y-t");
    let target_id = ensure_id(doc, target, "automagica11y-p");
    if !has_aria_override(doc, trigger, "aria-controls") {
        doc.set_attribute(trigger, "aria-controls", &target_id);
    }
    if !has_aria_override(doc, target, "aria-labelledby") {
        append_token(doc, target, "aria-labelledby", &trigger_id);
    }
}

/// Trigger is described by the surface
pub fn describe(doc: &mut Document, trigger: NodeId, target: NodeId) {
    let target_id = ensure_id(doc, target, "automagica11y-tip");
    if !has_aria_override(doc, trigger, "aria-describedby") {
        append_token(doc, trigger, "aria-describedby", &target_id);
    }
}

pub fn set_role(doc: &mut Document, el: NodeId, role: AriaRole) {
    if !has_role_override(doc, el) {
        doc.set_attribute(el, "role", role.as_str());
    }
}

pub fn set_aria(doc: &mut Document, el: NodeId, name: &str, value: &str) {
    if !has_aria_override(doc, el, name) {
        doc.set_attribute(el, name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let body = doc.body();
        let trigger = doc.create_element("button");
        let target = doc.create_element("div");
        doc.append_child(body, trigger).unwrap();
        doc.append_child(body, target).unwrap();
        (doc, trigger, target)
    }

    #[test]
    fn test_role_override_via_data_attribute() {
        let (mut doc, _trigger, target) = pair();
        doc.set_attribute(target, "data-ama-target-role", "alertdialog");
        set_role(&mut doc, target, AriaRole::Dialog);
        assert!(!doc.has_attribute(target, "role"));
    }

    #[test]
    fn test_aria_override_candidates() {
        let (mut doc, trigger, _target) = pair();
        assert!(!has_aria_override(&doc, trigger, "aria-haspopup"));
        doc.set_attribute(trigger, "data-automagica11y-trigger-aria-haspopup", "menu");
        assert!(has_aria_override(&doc, trigger, "aria-haspopup"));
        set_aria(&mut doc, trigger, "aria-haspopup", "dialog");
        assert!(!doc.has_attribute(trigger, "aria-haspopup"));
    }

    #[test]
    fn test_link_and_describe() {
        let (mut doc, trigger, target) = pair();
        doc.set_attribute(trigger, "id", "t");
        doc.set_attribute(target, "id", "p");
        link(&mut doc, trigger, target);
        assert_eq!(doc.get_attribute(trigger, "aria-controls"), Some("p"));
        assert_eq!(doc.get_attribute(target, "aria-labelledby"), Some("t"));

        doc.set_attribute(trigger, "aria-describedby", "hint");
        describe(&mut doc, trigger, target);
        // An authored aria-describedby counts as an override.
        assert_eq!(doc.get_attribute(trigger, "aria-describedby"), Some("hint"));
    }
}
