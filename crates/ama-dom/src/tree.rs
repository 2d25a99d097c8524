//! DOM Tree (arena-based allocation)
//!
//! Nodes are never freed; removing a node only unlinks it, so `NodeId`s
//! stay valid for the life of the tree.

use crate::{DomError, Node, NodeId, Result};

/// Arena-based DOM tree
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self { nodes: vec![Node::document()] }
    }

    /// The document node
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes ever allocated
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(Node::element(tag))
    }

    /// Allocate a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.push(Node::text(content.to_string()))
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.get(id).ok_or(DomError::UnknownNode(id))
    }

    /// Append `child` as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or at the end when `None`)
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> Result<()> {
        self.node(parent)?;
        self.node(child)?;
        if child == NodeId::ROOT || self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        if let Some(reference) = reference {
            if self.node(reference)?.parent != parent {
                return Err(DomError::UnknownNode(reference));
            }
            if reference == child {
                return Ok(());
            }
        }
        self.detach(child);

        let (prev, next) = match reference {
            Some(next) => (self.nodes[next.index()].prev_sibling, next),
            None => (self.nodes[parent.index()].last_child, NodeId::NONE),
        };

        {
            let node = &mut self.nodes[child.index()];
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = next;
        }
        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = child;
        } else {
            self.nodes[parent.index()].first_child = child;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = child;
        } else {
            self.nodes[parent.index()].last_child = child;
        }
        Ok(())
    }

    /// Unlink a node from its parent. Returns the former parent.
    pub fn detach(&mut self, child: NodeId) -> Option<NodeId> {
        let (parent, prev, next) = {
            let node = self.get(child)?;
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        if !parent.is_valid() {
            return None;
        }
        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = next;
        } else {
            self.nodes[parent.index()].first_child = next;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = prev;
        } else {
            self.nodes[parent.index()].last_child = prev;
        }
        let node = &mut self.nodes[child.index()];
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
        Some(parent)
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).map(|n| n.parent).filter(|p| p.is_valid())
    }

    /// Parent that is an element (stops at the document node)
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|&p| self.is_element(p))
    }

    /// Next sibling of a node
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).map(|n| n.next_sibling).filter(|s| s.is_valid())
    }

    /// Next sibling that is an element
    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.next_sibling(id);
        while let Some(sibling) = current {
            if self.is_element(sibling) {
                return Some(sibling);
            }
            current = self.next_sibling(sibling);
        }
        None
    }

    /// Iterate direct children
    pub fn children(&self, id: NodeId) -> Children<'_> {
        let first = self.get(id).map(|n| n.first_child).unwrap_or(NodeId::NONE);
        Children { tree: self, next: first }
    }

    /// Element children only
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).filter(move |&c| self.is_element(c))
    }

    /// Pre-order descendants of `id`, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let first = self.get(id).map(|n| n.first_child).unwrap_or(NodeId::NONE);
        Descendants { tree: self, root: id, next: first }
    }

    /// Ancestors from the parent up to the top of the containing tree
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// Inclusive containment check
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        if ancestor == node {
            return self.get(node).is_some();
        }
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// Check if a node is reachable from the document node
    pub fn is_connected(&self, id: NodeId) -> bool {
        id == NodeId::ROOT || self.ancestors(id).any(|a| a == NodeId::ROOT)
    }

    /// Check if a node is an element
    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_element)
    }

    /// Lower-cased tag name of an element
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(Node::as_element).map(|e| e.tag.as_str())
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .filter_map(|d| self.get(d).and_then(Node::as_text))
            .collect()
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over direct children
pub struct Children<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if !self.next.is_valid() {
            return None;
        }
        let current = self.next;
        self.next = self.tree.get(current).map(|n| n.next_sibling).unwrap_or(NodeId::NONE);
        Some(current)
    }
}

/// Pre-order walk bounded by a subtree root
pub struct Descendants<'a> {
    tree: &'a DomTree,
    root: NodeId,
    next: NodeId,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if !self.next.is_valid() {
            return None;
        }
        let current = self.next;
        let node = self.tree.get(current)?;
        self.next = if node.first_child.is_valid() {
            node.first_child
        } else {
            // Climb until a next sibling exists, never leaving the subtree.
            let mut cursor = current;
            loop {
                if cursor == self.root {
                    break NodeId::NONE;
                }
                let n = match self.tree.get(cursor) {
                    Some(n) => n,
                    None => break NodeId::NONE,
                };
                if n.next_sibling.is_valid() {
                    break n.next_sibling;
                }
                if !n.parent.is_valid() || n.parent == self.root {
                    break NodeId::NONE;
                }
                cursor = n.parent;
            }
        };
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DomTree, NodeId, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let html = tree.create_element("html");
        let a = tree.create_element("div");
        let b = tree.create_element("span");
        let c = tree.create_element("p");
        tree.append_child(tree.root(), html).unwrap();
        tree.append_child(html, a).unwrap();
        tree.append_child(a, b).unwrap();
        tree.append_child(html, c).unwrap();
        (tree, html, a, b, c)
    }

    #[test]
    fn test_descendants_preorder() {
        let (tree, html, a, b, c) = sample();
        let order: Vec<_> = tree.descendants(NodeId::ROOT).collect();
        assert_eq!(order, vec![html, a, b, c]);
        let inner: Vec<_> = tree.descendants(a).collect();
        assert_eq!(inner, vec![b]);
    }

    #[test]
    fn test_insert_before_and_detach() {
        let (mut tree, html, a, _b, c) = sample();
        let d = tree.create_element("aside");
        tree.insert_before(html, d, Some(c)).unwrap();
        let kids: Vec<_> = tree.children(html).collect();
        assert_eq!(kids, vec![a, d, c]);

        assert_eq!(tree.detach(d), Some(html));
        let kids: Vec<_> = tree.children(html).collect();
        assert_eq!(kids, vec![a, c]);
        assert!(!tree.is_connected(d));
    }

    #[test]
    fn test_cycle_rejected() {
        let (mut tree, html, a, _b, _c) = sample();
        let err = tree.append_child(a, html).unwrap_err();
        assert!(matches!(err, DomError::HierarchyRequest { .. }));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let (tree, html, a, b, c) = sample();
        assert!(tree.contains(a, a));
        assert!(tree.contains(html, b));
        assert!(!tree.contains(a, c));
        assert!(tree.is_connected(b));
    }
}
