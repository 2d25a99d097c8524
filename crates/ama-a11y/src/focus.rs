//! Focus Management
//!
//! Which elements can take keyboard focus, focusing helpers that keep
//! author `tabindex` values intact, and explicit tab ordering.

use std::collections::HashSet;
use std::sync::OnceLock;

use ama_dom::{Document, ListenerOptions, NodeId, SelectorList};

use crate::Result;

/// Elements that are focusable without an explicit `tabindex`
pub const FOCUSABLE_SELECTOR: &str = "a[href], area[href], button:not([disabled]), \
    input:not([disabled]):not([type=\"hidden\"]), select:not([disabled]), textarea:not([disabled]), \
    summary, [tabindex]:not([tabindex=\"-1\"]), [contenteditable=\"true\"]";

fn focusable_selector() -> Option<&'static SelectorList> {
    static SELECTOR: OnceLock<Option<SelectorList>> = OnceLock::new();
    SELECTOR.get_or_init(|| SelectorList::parse(FOCUSABLE_SELECTOR).ok()).as_ref()
}

fn matches_focusable(doc: &Document, el: NodeId) -> bool {
    focusable_selector().is_some_and(|s| s.matches(doc.tree(), el))
}

/// Not hidden, not `aria-hidden`, and rendered
pub fn is_visible(doc: &Document, el: NodeId) -> bool {
    !doc.has_attribute(el, "hidden") && doc.get_attribute(el, "aria-hidden") != Some("true") && doc.is_rendered(el)
}

/// Check if an element can take focus, considering visibility and ARIA
pub fn is_focusable(doc: &Document, el: NodeId) -> bool {
    if !doc.is_element(el) || doc.has_attribute(el, "disabled") {
        return false;
    }
    if doc.get_attribute(el, "aria-hidden") == Some("true") || doc.is_inert(el) {
        return false;
    }
    if !is_visible(doc, el) {
        return false;
    }
    matches_focusable(doc, el) || doc.tab_index(el) >= 0
}

/// Unique focusable elements within `root` (inclusive), in document order
pub fn get_focusable_in(doc: &Document, root: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    if doc.is_element(root) && is_focusable(doc, root) {
        result.push(root);
    }
    for el in doc.tree().descendants(root) {
        if matches_focusable(doc, el) && is_focusable(doc, el) && !result.contains(&el) {
            result.push(el);
        }
    }
    result
}

/// Options for [`focus_element`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusOptions {
    /// Give non-focusable targets a temporary `tabindex="-1"` and put
    /// the author value back on blur
    pub preserve_tab_index: bool,
}

impl Default for FocusOptions {
    fn default() -> Self {
        Self { preserve_tab_index: true }
    }
}

/// Focus an element, optionally preserving author `tabindex` after blur
pub fn focus_element(doc: &mut Document, el: NodeId, options: FocusOptions) -> Result<()> {
    let previous = doc.get_attribute(el, "tabindex").map(str::to_owned);
    let needs_temp = options.preserve_tab_index
        && doc.is_element(el)
        && doc.tab_index(el) < 0
        && !matches_focusable(doc, el);

    if needs_temp {
        doc.set_attribute(el, "tabindex", "-1");
    }

    let restore = move |doc: &mut Document| match &previous {
        Some(value) => doc.set_attribute(el, "tabindex", value),
        None => {
            doc.remove_attribute(el, "tabindex");
        }
    };

    match doc.focus(el) {
        Ok(()) => {
            if needs_temp {
                doc.add_event_listener(el, "blur", ListenerOptions::once(), move |doc, _| restore(doc));
            }
            Ok(())
        }
        Err(err) => {
            if needs_temp {
                restore(doc);
            }
            Err(err.into())
        }
    }
}

/// Focus the first focusable element in `root`, or `root` itself
pub fn focus_first(doc: &mut Document, root: NodeId, options: FocusOptions) -> Option<NodeId> {
    let target = get_focusable_in(doc, root).first().copied().or_else(|| doc.is_element(root).then_some(root))?;
    match focus_element(doc, target, options) {
        Ok(()) => Some(target),
        Err(err) => {
            tracing::debug!("focus_first on {} failed: {}", root, err);
            None
        }
    }
}

/// Starting point for [`apply_focus_order`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FocusOrderOptions {
    /// First tab index to assign (clamped to at least 1)
    pub start_index: Option<i32>,
    /// Continue after this element's positive tab index
    pub relative_to: Option<NodeId>,
}

/// Restores the original `tabindex` values of ordered elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusOrderController {
    originals: Vec<(NodeId, Option<String>)>,
}

impl FocusOrderController {
    /// Elements in the order they were assigned
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.originals.iter().map(|(el, _)| *el)
    }

    pub fn release(&self, doc: &mut Document) {
        for (el, value) in &self.originals {
            match value {
                Some(value) => doc.set_attribute(*el, "tabindex", value),
                None => {
                    doc.remove_attribute(*el, "tabindex");
                }
            }
        }
    }
}

/// Assign consecutive positive tab indices so Tab walks `elements` in
/// the given order. Returns `None` for an empty list.
pub fn apply_focus_order(
    doc: &mut Document,
    elements: &[NodeId],
    options: FocusOrderOptions,
) -> Option<FocusOrderController> {
    if elements.is_empty() {
        return None;
    }
    let base = match (options.start_index, options.relative_to) {
        (Some(start), _) => start.max(1),
        (None, Some(anchor)) if doc.tab_index(anchor) > 0 => doc.tab_index(anchor) + 1,
        _ => 1,
    };

    let mut seen = HashSet::new();
    let mut originals = Vec::new();
    for (offset, &el) in elements.iter().enumerate() {
        if seen.insert(el) {
            originals.push((el, doc.get_attribute(el, "tabindex").map(str::to_owned)));
        }
        doc.set_attribute(el, "tabindex", &(base + offset as i32).to_string());
    }
    Some(FocusOrderController { originals })
}
