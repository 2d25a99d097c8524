//! automagica11y DOM - Host document model
//!
//! Arena-based node tree plus the parts of a browser page that the
//! interaction core relies on: attributes, selectors, event dispatch,
//! focus tracking, mutation observers and a deterministic event loop.
//!
//! Everything runs on one thread. Listener and task callbacks receive
//! `&mut Document`, so per-widget state lives in side tables (see
//! [`Services`]) instead of on the nodes themselves.

mod attributes;
mod classlist;
mod document;
mod event_loop;
mod events;
mod focus;
mod geometry;
mod node;
mod observer;
mod selector;
mod services;
mod tree;

pub use attributes::{Attr, NamedNodeMap};
pub use classlist::TokenList;
pub use document::{Document, MediaFeatures};
pub use event_loop::{FrameId, Task, TimerId};
pub use events::{Event, EventPhase, Listener, ListenerId, ListenerOptions, PointerType};
pub use geometry::{DOMRect, Size};
pub use node::{ElementData, Node, NodeData};
pub use observer::{MutationCallback, MutationKind, MutationObserverInit, MutationRecord, ObserverId};
pub use selector::SelectorList;
pub use services::Services;
pub use tree::DomTree;

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The document node
    pub const ROOT: NodeId = NodeId(0);

    /// Marker for an absent link
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check if this id refers to a node
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// DOM error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("node {0} is not connected to the document")]
    Detached(NodeId),

    #[error("node {0} cannot receive focus")]
    NotFocusable(NodeId),

    #[error("inserting {child} into {parent} would create a cycle")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    #[error("invalid selector: {0}")]
    InvalidSelector(String),
}

/// Result alias for DOM operations
pub type Result<T> = std::result::Result<T, DomError>;
