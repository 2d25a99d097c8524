//! automagica11y Accessibility
//!
//! Accessibility APIs layered on the host document.
//!
//! Features:
//! - ARIA roles and `aria-haspopup` values
//! - Focusability and tabbability checks
//! - Focus helpers that preserve author `tabindex`
//! - Explicit focus order
//! - Stacked focus traps for nested modal regions

pub mod aria;
pub mod focus;
pub mod focus_trap;

pub use aria::{AriaHasPopup, AriaRole};
pub use focus::{
    apply_focus_order, focus_element, focus_first, get_focusable_in, is_focusable, is_visible, FocusOptions,
    FocusOrderController, FocusOrderOptions, FOCUSABLE_SELECTOR,
};
pub use focus_trap::{
    enable_focus_trap, enable_focus_trap_in, is_focus_trap_visible, FocusTrapEscape, FocusTrapHandle,
    FocusTrapOptions, FocusTrapSettings, FocusTrapStack, InitialFocus, ReleaseReason, FOCUS_TRAP_ESCAPE_EVENT,
    parse_flag,
};

use ama_dom::DomError;

/// Accessibility error
#[derive(Debug, thiserror::Error)]
pub enum A11yError {
    #[error("Invalid ARIA role: {0}")]
    InvalidRole(String),

    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Result alias for accessibility operations
pub type Result<T> = std::result::Result<T, A11yError>;
