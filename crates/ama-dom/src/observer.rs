//! MutationObserver
//!
//! Records attribute and child-list changes and delivers them in batches
//! on a microtask, the way browsers do.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::{Document, DomTree, NodeId};

/// Callback receiving a batch of records
pub type MutationCallback = Rc<dyn Fn(&mut Document, &[MutationRecord], ObserverId)>;

/// Handle for a registered observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

/// What an observer watches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub attributes: bool,
    pub subtree: bool,
    /// Only report these attribute names
    pub attribute_filter: Option<Vec<String>>,
}

impl MutationObserverInit {
    /// Attribute changes within a subtree, limited to `names`
    pub fn attributes_in_subtree(names: &[&str]) -> Self {
        Self {
            child_list: false,
            attributes: true,
            subtree: true,
            attribute_filter: Some(names.iter().map(|n| n.to_string()).collect()),
        }
    }
}

/// Mutation type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Attributes,
    ChildList,
}

/// Mutation record
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: NodeId,
    pub attribute_name: Option<String>,
    pub old_value: Option<String>,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
}

impl MutationRecord {
    pub fn attribute(target: NodeId, name: &str, old_value: Option<String>) -> Self {
        Self {
            kind: MutationKind::Attributes,
            target,
            attribute_name: Some(name.to_ascii_lowercase()),
            old_value,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
        }
    }

    pub fn child_list(target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target,
            attribute_name: None,
            old_value: None,
            added_nodes: added,
            removed_nodes: removed,
        }
    }
}

struct Registration {
    callback: MutationCallback,
    targets: Vec<(NodeId, MutationObserverInit)>,
    pending: Vec<MutationRecord>,
}

impl Registration {
    fn interested(&self, tree: &DomTree, record: &MutationRecord) -> bool {
        self.targets.iter().any(|(target, init)| {
            let in_scope = *target == record.target || (init.subtree && tree.contains(*target, record.target));
            in_scope
                && match record.kind {
                    MutationKind::ChildList => init.child_list,
                    MutationKind::Attributes => {
                        init.attributes
                            && match (&init.attribute_filter, &record.attribute_name) {
                                (Some(filter), Some(name)) => filter.iter().any(|f| f.eq_ignore_ascii_case(name)),
                                _ => true,
                            }
                    }
                }
        })
    }
}

/// Batch ready for delivery
pub(crate) type Delivery = (ObserverId, MutationCallback, Vec<MutationRecord>);

#[derive(Default)]
pub(crate) struct ObserverRegistry {
    observers: BTreeMap<ObserverId, Registration>,
    next_id: u64,
    delivery_scheduled: bool,
}

impl ObserverRegistry {
    pub fn create(&mut self, callback: MutationCallback) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.observers.insert(id, Registration { callback, targets: Vec::new(), pending: Vec::new() });
        id
    }

    /// Add a target; observing the same node again replaces its options
    pub fn observe(&mut self, id: ObserverId, target: NodeId, init: MutationObserverInit) -> bool {
        let Some(reg) = self.observers.get_mut(&id) else {
            return false;
        };
        reg.targets.retain(|(t, _)| *t != target);
        reg.targets.push((target, init));
        true
    }

    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        self.observers.remove(&id).is_some()
    }

    pub fn is_active(&self, id: ObserverId) -> bool {
        self.observers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Queue a record for every interested observer. Returns true when a
    /// delivery microtask needs to be scheduled.
    pub fn enqueue(&mut self, tree: &DomTree, record: &MutationRecord) -> bool {
        let mut queued = false;
        for reg in self.observers.values_mut() {
            if reg.interested(tree, record) {
                reg.pending.push(record.clone());
                queued = true;
            }
        }
        if queued && !self.delivery_scheduled {
            self.delivery_scheduled = true;
            return true;
        }
        false
    }

    pub fn take_pending(&mut self) -> Vec<Delivery> {
        self.delivery_scheduled = false;
        self.observers
            .iter_mut()
            .filter(|(_, reg)| !reg.pending.is_empty())
            .map(|(id, reg)| (*id, Rc::clone(&reg.callback), std::mem::take(&mut reg.pending)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_filter_and_subtree() {
        let mut tree = DomTree::new();
        let outer = tree.create_element("div");
        let inner = tree.create_element("span");
        tree.append_child(NodeId::ROOT, outer).unwrap();
        tree.append_child(outer, inner).unwrap();

        let mut registry = ObserverRegistry::default();
        let id = registry.create(Rc::new(|_, _, _| {}));
        registry.observe(id, outer, MutationObserverInit::attributes_in_subtree(&["hidden"]));

        assert!(registry.enqueue(&tree, &MutationRecord::attribute(inner, "hidden", None)));
        // Already scheduled
        assert!(!registry.enqueue(&tree, &MutationRecord::attribute(outer, "hidden", None)));
        assert!(!registry.enqueue(&tree, &MutationRecord::attribute(inner, "title", None)));

        let batches = registry.take_pending();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].2.len(), 2);
    }

    #[test]
    fn test_disconnect_drops_pending() {
        let tree = DomTree::new();
        let mut registry = ObserverRegistry::default();
        let id = registry.create(Rc::new(|_, _, _| {}));
        registry.observe(
            id,
            NodeId::ROOT,
            MutationObserverInit { child_list: true, ..Default::default() },
        );
        registry.enqueue(&tree, &MutationRecord::child_list(NodeId::ROOT, vec![], vec![]));
        assert!(registry.disconnect(id));
        assert!(registry.take_pending().is_empty());
        assert_eq!(registry.len(), 0);
    }
}
