//! automagica11y
//!
//! Progressive enhancement of semantic markup into accessible
//! interactive widgets.
//!
//! # Overview
//! - [`toggle`]: the per-trigger open/closed state machine
//! - [`context`]: named bundles of semantics and behaviors (dialog,
//!   tooltip, menu, ...) layered on a trigger and its surfaces
//! - [`patterns`]: hydrators that discover marked-up triggers
//!
//! Focus containment lives in [`ama_a11y::focus_trap`].
//!
//! # Example
//! ```rust,ignore
//! use automagica11y::{patterns::PatternRegistry, toggle};
//!
//! let mut doc = ama_dom::Document::new();
//! // ... build markup ...
//! PatternRegistry::with_defaults().init_all(&mut doc);
//! doc.click(trigger);
//! assert!(toggle::is_toggle_open(&doc, trigger));
//! ```

pub mod attributes;
pub mod classes;
pub mod config;
pub mod context;
pub mod device;
pub mod events;
pub mod patterns;
pub mod placement;
pub mod toggle;

pub use classes::{ClassConfig, ClassSet};
pub use config::Config;
pub use context::{apply_context, normalize_context, Capabilities, ContextKind, ContextMode};
pub use events::{SurfaceDetail, TargetsDetail, ToggleDetail};
pub use patterns::PatternRegistry;
pub use placement::{PreferredPlacement, Side};
pub use toggle::{init_toggle, is_toggle_open, resolve_surface, set_toggle_state, ToggleHandle, Transition};

// Re-export sub-crates for advanced usage
pub use ama_a11y as a11y;
pub use ama_dom as dom;

use ama_a11y::A11yError;
use ama_dom::DomError;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// automagica11y error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    A11y(#[from] A11yError),

    #[error("Selector matched nothing: {0}")]
    UnresolvedSelector(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result alias for automagica11y operations
pub type Result<T> = std::result::Result<T, Error>;
