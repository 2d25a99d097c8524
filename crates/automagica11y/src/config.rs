//! Library Configuration

use std::rc::Rc;

use ama_dom::Document;
use serde::Deserialize;

use crate::classes::ClassSet;
use crate::Result;

/// Library-wide defaults, stored per document
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hover intent delay before showing
    pub open_delay_ms: u64,

    /// Hover intent delay before hiding
    pub close_delay_ms: u64,

    /// Touch hold duration that pins a tooltip open
    pub long_press_ms: u64,

    /// Trigger classes used when the author declares none
    pub default_trigger_classes: ClassSet,

    /// Paint deferral when the host has no animation frames
    pub fallback_paint_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            open_delay_ms: 0,
            close_delay_ms: 100,
            long_press_ms: 550,
            default_trigger_classes: ClassSet {
                open: vec!["automagic-toggle-open".to_string()],
                closed: vec!["automagic-toggle-closed".to_string()],
            },
            fallback_paint_delay_ms: 32,
        }
    }
}

impl Config {
    /// Parse from JSON; missing fields keep their defaults
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// The document's configuration
    pub fn for_document(doc: &mut Document) -> Rc<Self> {
        doc.service::<Self>()
    }

    /// Replace the document's configuration. Affects widgets hydrated
    /// afterwards.
    pub fn install(self, doc: &mut Document) {
        doc.set_service(Rc::new(self));
    }
}
