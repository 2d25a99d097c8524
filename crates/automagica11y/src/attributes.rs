//! Attribute Accessor
//!
//! Reads and writes `data-automagica11y-*` attributes through every
//! supported prefix alias (`data-ama-toggle` is the same attribute as
//! `data-automagica11y-toggle`), plus the token and id helpers the
//! widgets share.

use ama_a11y::FocusTrapSettings;
use ama_dom::{Document, NodeId};
use uuid::Uuid;

use crate::{Error, Result};

/// Canonical attribute prefix
pub const CANONICAL_PREFIX: &str = "automagica11y";

/// Prefixes that resolve to [`CANONICAL_PREFIX`], canonical first
pub const PREFIX_ALIASES: &[&str] = &[
    "automagica11y",
    "automagically",
    "ama11y",
    "amaally",
    "ama",
    "autoa11y",
    "automagic",
];

/// Rewrite an aliased `data-*` attribute name to the canonical prefix.
/// Other names come back unchanged.
pub fn normalize_prefix(name: &str) -> String {
    for alias in PREFIX_ALIASES {
        let token = format!("data-{alias}-");
        if let Some(rest) = name.strip_prefix(&token) {
            return format!("data-{CANONICAL_PREFIX}-{rest}");
        }
    }
    name.to_string()
}

/// `data-automagica11y-{suffix}`
pub fn data_name(suffix: &str) -> String {
    format!("data-{CANONICAL_PREFIX}-{suffix}")
}

/// The attribute actually present on `el` that normalizes to `canonical`
fn find_attribute_name(doc: &Document, el: NodeId, canonical: &str) -> Option<String> {
    doc.attribute_names(el)
        .into_iter()
        .find(|name| normalize_prefix(name) == canonical)
}

/// Read `data-automagica11y-{suffix}` through any alias
pub fn get_data<'a>(doc: &'a Document, el: NodeId, suffix: &str) -> Option<&'a str> {
    let name = find_attribute_name(doc, el, &data_name(suffix))?;
    doc.get_attribute(el, &name)
}

/// Non-blank, trimmed value of `data-automagica11y-{suffix}`
pub fn get_data_trimmed<'a>(doc: &'a Document, el: NodeId, suffix: &str) -> Option<&'a str> {
    get_data(doc, el, suffix).map(str::trim).filter(|v| !v.is_empty())
}

pub fn has_data(doc: &Document, el: NodeId, suffix: &str) -> bool {
    find_attribute_name(doc, el, &data_name(suffix)).is_some()
}

/// Write `data-automagica11y-{suffix}` under the canonical prefix,
/// dropping any aliased spelling
pub fn set_data(doc: &mut Document, el: NodeId, suffix: &str, value: &str) {
    let canonical = data_name(suffix);
    if let Some(actual) = find_attribute_name(doc, el, &canonical).filter(|n| *n != canonical) {
        doc.remove_attribute(el, &actual);
    }
    doc.set_attribute(el, &canonical, value);
}

fn split_tokens(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or("")
        .split_ascii_whitespace()
        .map(str::to_string)
        .collect()
}

/// Add `token` to a space-separated attribute if missing
pub fn append_token(doc: &mut Document, el: NodeId, attr: &str, token: &str) {
    let canonical = normalize_prefix(attr);
    let actual = find_attribute_name(doc, el, &canonical).unwrap_or_else(|| canonical.clone());
    let mut tokens = split_tokens(doc.get_attribute(el, &actual));
    if !tokens.iter().any(|t| t == token) {
        tokens.push(token.to_string());
    }
    if actual != canonical {
        doc.remove_attribute(el, &actual);
    }
    doc.set_attribute(el, &canonical, &tokens.join(" "));
}

/// Remove `token` from a space-separated attribute, dropping the
/// attribute when nothing is left
pub fn remove_token(doc: &mut Document, el: NodeId, attr: &str, token: &str) {
    let canonical = normalize_prefix(attr);
    let actual = find_attribute_name(doc, el, &canonical).unwrap_or_else(|| canonical.clone());
    let existing = doc.get_attribute(el, &actual).unwrap_or("");
    if existing.is_empty() {
        return;
    }
    let tokens: Vec<String> = split_tokens(Some(existing)).into_iter().filter(|t| t != token).collect();
    if actual != canonical {
        doc.remove_attribute(el, &actual);
    }
    if tokens.is_empty() {
        doc.remove_attribute(el, &canonical);
    } else {
        doc.set_attribute(el, &canonical, &tokens.join(" "));
    }
}

/// Return the element id, assigning `{prefix}-{uuid}` when it has none
pub fn ensure_id(doc: &mut Document, el: NodeId, prefix: &str) -> String {
    if let Some(id) = doc.get_attribute(el, "id").filter(|id| !id.is_empty()) {
        return id.to_string();
    }
    let id = format!("{prefix}-{}", Uuid::new_v4());
    doc.set_attribute(el, "id", &id);
    id
}

/// Selector matching `[data-{alias}-{suffix}]` for every alias
pub fn prefixed_selector(suffix: &str) -> String {
    PREFIX_ALIASES
        .iter()
        .map(|alias| format!("[data-{alias}-{suffix}]"))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn set_aria_expanded(doc: &mut Document, el: NodeId, expanded: bool) {
    doc.set_attribute(el, "aria-expanded", if expanded { "true" } else { "false" });
}

/// Hidden surfaces carry `hidden` and `aria-hidden="true"`; visible ones
/// drop `hidden` and report `aria-hidden="false"`
pub fn set_hidden_state(doc: &mut Document, el: NodeId, hidden: bool) {
    if hidden {
        doc.set_attribute(el, "hidden", "");
        doc.set_attribute(el, "aria-hidden", "true");
    } else {
        doc.remove_attribute(el, "hidden");
        doc.set_attribute(el, "aria-hidden", "false");
    }
}

pub fn set_inert(doc: &mut Document, el: NodeId, inert: bool) {
    doc.toggle_attribute(el, "inert", Some(inert));
}

/// Focus trap settings from `data-automagica11y-focus-trap-*`
pub fn read_focus_trap_settings(doc: &Document, el: NodeId) -> FocusTrapSettings {
    FocusTrapSettings::from_lookup(|suffix| get_data(doc, el, suffix).map(str::to_string))
}

/// Milliseconds from the attribute's leading integer, so `"150ms"` is
/// 150. Negative or missing numbers give `default`.
pub fn parse_delay(value: Option<&str>, default: u64) -> u64 {
    let Some(value) = value.map(str::trim_start) else {
        return default;
    };
    let (negative, rest) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    match rest[..end].parse::<u64>() {
        Ok(0) => 0,
        Ok(_) if negative => default,
        Ok(ms) => ms,
        Err(_) => default,
    }
}

/// Every element matching `selector`, in document order. A malformed
/// selector or an empty match is an error.
pub fn resolve_all(doc: &Document, selector: &str) -> Result<Vec<NodeId>> {
    let found = doc.query_selector_all(doc.document_element(), selector)?;
    if found.is_empty() {
        return Err(Error::UnresolvedSelector(selector.to_string()));
    }
    Ok(found)
}

/// First element matching `selector`
pub fn resolve_first(doc: &Document, selector: &str) -> Result<NodeId> {
    doc.query_selector(doc.document_element(), selector)?
        .ok_or_else(|| Error::UnresolvedSelector(selector.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(doc: &mut Document, tag: &str) -> NodeId {
        let el = doc.create_element(tag);
        let body = doc.body();
        doc.append_child(body, el).unwrap();
        el
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("data-ama-toggle"), "data-automagica11y-toggle");
        assert_eq!(normalize_prefix("data-ama11y-group"), "data-automagica11y-group");
        assert_eq!(normalize_prefix("data-automagic-context"), "data-automagica11y-context");
        assert_eq!(normalize_prefix("data-automagica11y-toggle"), "data-automagica11y-toggle");
        assert_eq!(normalize_prefix("aria-controls"), "aria-controls");
    }

    #[test]
    fn test_get_and_set_through_alias() {
        let mut doc = Document::new();
        let el = element(&mut doc, "button");
        doc.set_attribute(el, "data-ama-toggle", "#panel");
        assert_eq!(get_data(&doc, el, "toggle"), Some("#panel"));
        assert!(has_data(&doc, el, "toggle"));
        assert!(!has_data(&doc, el, "group"));

        set_data(&mut doc, el, "toggle", "#other");
        assert!(!doc.has_attribute(el, "data-ama-toggle"));
        assert_eq!(doc.get_attribute(el, "data-automagica11y-toggle"), Some("#other"));
    }

    #[test]
    fn test_tokens() {
        let mut doc = Document::new();
        let el = element(&mut doc, "div");
        append_token(&mut doc, el, "aria-labelledby", "a");
        append_token(&mut doc, el, "aria-labelledby", "b");
        append_token(&mut doc, el, "aria-labelledby", "a");
        assert_eq!(doc.get_attribute(el, "aria-labelledby"), Some("a b"));

        remove_token(&mut doc, el, "aria-labelledby", "a");
        assert_eq!(doc.get_attribute(el, "aria-labelledby"), Some("b"));
        remove_token(&mut doc, el, "aria-labelledby", "b");
        assert!(!doc.has_attribute(el, "aria-labelledby"));
    }

    #[test]
    fn test_ensure_id_keeps_existing() {
        let mut doc = Document::new();
        let el = element(&mut doc, "div");
        let id = ensure_id(&mut doc, el, "automagica11y-p");
        assert!(id.starts_with("automagica11y-p-"));
        assert_eq!(ensure_id(&mut doc, el, "other"), id);

        let named = element(&mut doc, "div");
        doc.set_attribute(named, "id", "panel");
        assert_eq!(ensure_id(&mut doc, named, "x"), "panel");
    }

    #[test]
    fn test_prefixed_selector_matches_aliases() {
        let mut doc = Document::new();
        let a = element(&mut doc, "button");
        let b = element(&mut doc, "button");
        doc.set_attribute(a, "data-automagica11y-group", "g");
        doc.set_attribute(b, "data-amaally-group", "g");
        let found = doc.query_selector_all(doc.document_element(), &prefixed_selector("group")).unwrap();
        assert_eq!(found, vec![a, b]);
    }

    #[test]
    fn test_hidden_state() {
        let mut doc = Document::new();
        let el = element(&mut doc, "div");
        set_hidden_state(&mut doc, el, true);
        assert!(doc.has_attribute(el, "hidden"));
        assert_eq!(doc.get_attribute(el, "aria-hidden"), Some("true"));
        set_hidden_state(&mut doc, el, false);
        assert!(!doc.has_attribute(el, "hidden"));
        assert_eq!(doc.get_attribute(el, "aria-hidden"), Some("false"));
    }

    #[test]
    fn test_parse_delay() {
        assert_eq!(parse_delay(Some("250"), 100), 250);
        assert_eq!(parse_delay(Some(" 0 "), 100), 0);
        assert_eq!(parse_delay(Some("-5"), 100), 100);
        assert_eq!(parse_delay(Some("soon"), 100), 100);
        assert_eq!(parse_delay(Some("150ms"), 100), 150);
        assert_eq!(parse_delay(Some(" +20.5"), 100), 20);
        assert_eq!(parse_delay(Some("ms150"), 100), 100);
        assert_eq!(parse_delay(None, 550), 550);
    }

    #[test]
    fn test_resolve_all_errors() {
        let doc = Document::new();
        assert!(matches!(resolve_all(&doc, "#missing"), Err(Error::UnresolvedSelector(_))));
        assert!(matches!(resolve_all(&doc, "[["), Err(Error::Dom(_))));
    }

    #[test]
    fn test_focus_trap_settings_through_alias() {
        let mut doc = Document::new();
        let el = element(&mut doc, "div");
        doc.set_attribute(el, "data-ama-focus-trap-escape-dismiss", "true");
        doc.set_attribute(el, "data-automagica11y-focus-trap-return", "0");
        let settings = read_focus_trap_settings(&doc, el);
        assert!(settings.options.escape_dismiss);
        assert!(!settings.options.return_focus);
        assert!(settings.auto);
    }
}
