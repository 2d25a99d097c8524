//! Context Capability Layer
//!
//! A context is a named bundle of semantics and behaviors layered onto a
//! hydrated trigger and one of its surfaces. The set of contexts is
//! fixed; friendly names (`modal`, `dropdown`, `tabs`, ...) resolve to a
//! canonical [`ContextKind`].

mod controllers;
mod dialog;
mod hover_intent;
pub mod semantics;
mod tooltip;

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;

use ama_a11y::{AriaHasPopup, AriaRole};
use ama_dom::{Document, NodeId};
use bitflags::bitflags;

pub use hover_intent::{HoverIntent, HoverIntentOptions};

bitflags! {
    /// Semantics and behaviors a context provides
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u16 {
        const SEMANTICS = 1 << 0;
        const FOCUS_TRAP = 1 << 1;
        const ESC_TO_CLOSE = 1 << 2;
        const ARIA_MODAL = 1 << 3;
        const INERT_SIBLINGS = 1 << 4;
        const RESTORE_FOCUS = 1 << 5;
        const HOVER_INTENT = 1 << 6;
        const ANCHOR_FOLLOW = 1 << 7;
        const ROVING_TABINDEX = 1 << 8;
        const TYPEAHEAD = 1 << 9;
        const ARROW_NAV = 1 << 10;
    }
}

/// Canonical context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    Dialog,
    Tooltip,
    Menu,
    Disclosure,
    Accordion,
    Listbox,
    Tablist,
    Tree,
}

impl ContextKind {
    pub const ALL: [ContextKind; 8] = [
        Self::Dialog,
        Self::Tooltip,
        Self::Menu,
        Self::Disclosure,
        Self::Accordion,
        Self::Listbox,
        Self::Tablist,
        Self::Tree,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dialog => "dialog",
            Self::Tooltip => "tooltip",
            Self::Menu => "menu",
            Self::Disclosure => "disclosure",
            Self::Accordion => "accordion",
            Self::Listbox => "listbox",
            Self::Tablist => "tablist",
            Self::Tree => "tree",
        }
    }

    /// Names that resolve to this context, canonical first
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Dialog => &["dialog", "modal"],
            Self::Tooltip => &["tooltip"],
            Self::Menu => &["menu", "dropdown", "kebab", "meatball", "overflow", "popover"],
            Self::Disclosure => &["disclosure", "details", "expander"],
            Self::Accordion => &["accordion"],
            Self::Listbox => &["listbox", "select", "combobox"],
            Self::Tablist => &["tablist", "tabs"],
            Self::Tree => &["tree", "treeview"],
        }
    }

    /// Resolve any alias, ignoring case and surrounding whitespace
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|kind| kind.aliases().contains(&name.as_str()))
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            Self::Dialog => {
                Capabilities::SEMANTICS
                    | Capabilities::ARIA_MODAL
                    | Capabilities::FOCUS_TRAP
                    | Capabilities::ESC_TO_CLOSE
                    | Capabilities::INERT_SIBLINGS
                    | Capabilities::RESTORE_FOCUS
            }
            Self::Tooltip => Capabilities::SEMANTICS | Capabilities::HOVER_INTENT | Capabilities::ANCHOR_FOLLOW,
            _ => Capabilities::SEMANTICS,
        }
    }

    /// Role given to the surface unless the author chose one
    pub fn surface_role(&self) -> AriaRole {
        match self {
            Self::Dialog => AriaRole::Dialog,
            Self::Tooltip => AriaRole::Tooltip,
            Self::Menu => AriaRole::Menu,
            Self::Disclosure | Self::Accordion => AriaRole::Region,
            Self::Listbox => AriaRole::Listbox,
            Self::Tablist => AriaRole::TabList,
            Self::Tree => AriaRole::Tree,
        }
    }

    /// Add the context's roles and ARIA relationships. Never overwrites
    /// author-supplied values.
    pub fn ensure_semantics(&self, doc: &mut Document, trigger: NodeId, target: NodeId) {
        match self {
            Self::Dialog => {
                semantics::link(doc, trigger, target);
                semantics::set_aria(doc, trigger, "aria-haspopup", AriaHasPopup::Dialog.as_str());
                semantics::set_role(doc, target, self.surface_role());
                semantics::set_aria(doc, target, "aria-modal", "true");
                if !doc.has_attribute(target, "tabindex") {
                    doc.set_attribute(target, "tabindex", "-1");
                }
            }
            Self::Tooltip => {
                semantics::describe(doc, trigger, target);
                semantics::set_role(doc, target, self.surface_role());
            }
            _ => semantics::set_role(doc, target, self.surface_role()),
        }
    }

    /// Wire the context's behaviors onto the trigger's transitions
    pub fn enable_behaviors(&self, doc: &mut Document, trigger: NodeId, target: NodeId) {
        match self {
            Self::Dialog => dialog::enable(doc, trigger, target),
            Self::Tooltip => tooltip::enable(doc, trigger, target),
            // Semantics only for now
            _ => {}
        }
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a friendly context name to its canonical key. Unknown names come
/// back trimmed and lower-cased.
pub fn normalize_context(name: &str) -> String {
    match ContextKind::from_name(name) {
        Some(kind) => kind.as_str().to_string(),
        None => name.trim().to_ascii_lowercase(),
    }
}

/// Which halves of a context to apply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContextMode {
    #[default]
    All,
    SemanticsOnly,
    BehaviorsOnly,
}

impl ContextMode {
    /// Unknown values mean `all`
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("semantics-only") => Self::SemanticsOnly,
            Some("behaviors-only") => Self::BehaviorsOnly,
            _ => Self::All,
        }
    }
}

/// One-time diagnostics
#[derive(Debug, Default)]
struct ContextWarnings {
    unknown: RefCell<HashSet<String>>,
    semantics_only: RefCell<HashSet<NodeId>>,
}

/// Apply the named context to a trigger/surface pair
pub fn apply_context(doc: &mut Document, trigger: NodeId, target: NodeId, name: &str, mode: ContextMode) {
    let Some(kind) = ContextKind::from_name(name) else {
        let key = name.trim().to_ascii_lowercase();
        if doc.service::<ContextWarnings>().unknown.borrow_mut().insert(key) {
            tracing::warn!("Unknown context: {}", name);
        }
        return;
    };

    if mode != ContextMode::BehaviorsOnly {
        kind.ensure_semantics(doc, trigger, target);
    }

    if mode == ContextMode::SemanticsOnly {
        let behavioral = kind.capabilities() != Capabilities::SEMANTICS;
        if behavioral && doc.service::<ContextWarnings>().semantics_only.borrow_mut().insert(target) {
            tracing::warn!(
                "context='{}' with semantics-only on {}: ensure focus cannot leak and Escape closes if desired",
                kind,
                target
            );
        }
        return;
    }

    tracing::debug!("context {} enabled for {} -> {}", kind, trigger, target);
    kind.enable_behaviors(doc, trigger, target);
}
