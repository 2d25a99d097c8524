//! Context-declared triggers
//!
//! `data-automagica11y-context` without a toggle selector names its
//! surface through `data-automagica11y-target`, or implicitly through its
//! next element sibling. The surface is promoted into a toggle selector
//! so toggle hydration picks the trigger up.

use ama_dom::{Document, NodeId};

use crate::attributes::{ensure_id, get_data_trimmed, has_data, set_data};

/// Returns the promoted surface, or `None` when the trigger already has
/// a toggle selector or no surface can be found
pub fn init_context_trigger(doc: &mut Document, node: NodeId) -> Option<NodeId> {
    if !doc.is_element(node) || has_data(doc, node, "toggle") {
        return None;
    }
    let target = match get_data_trimmed(doc, node, "target") {
        Some(selector) => doc.query_selector(doc.document_element(), selector).ok().flatten(),
        None => doc.next_element_sibling(node),
    }?;

    let id = ensure_id(doc, target, "automagica11y-p");
    set_data(doc, node, "toggle", &format!("#{id}"));
    tracing::debug!("context trigger {} promoted to toggle for {}", node, target);
    Some(target)
}
