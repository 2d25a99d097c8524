//! ARIA Support
//!
//! The role vocabulary and `aria-haspopup` tokens used when layering
//! semantics onto triggers and surfaces.

use std::fmt;
use std::str::FromStr;

use crate::A11yError;

/// Roles written onto triggers and surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AriaRole {
    Button,
    Dialog,
    Listbox,
    Menu,
    Region,
    TabList,
    Tooltip,
    Tree,
}

impl AriaRole {
    /// Parse from string, ignoring case and surrounding space
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.trim().to_ascii_lowercase().as_str() {
            "button" => Self::Button,
            "dialog" => Self::Dialog,
            "listbox" => Self::Listbox,
            "menu" => Self::Menu,
            "region" => Self::Region,
            "tablist" => Self::TabList,
            "tooltip" => Self::Tooltip,
            "tree" => Self::Tree,
            _ => return None,
        })
    }

    /// Attribute value for `role`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Dialog => "dialog",
            Self::Listbox => "listbox",
            Self::Menu => "menu",
            Self::Region => "region",
            Self::TabList => "tablist",
            Self::Tooltip => "tooltip",
            Self::Tree => "tree",
        }
    }
}

impl FromStr for AriaRole {
    type Err = A11yError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| A11yError::InvalidRole(s.to_string()))
    }
}

impl fmt::Display for AriaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `aria-haspopup` token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AriaHasPopup {
    Menu,
    Listbox,
    Tree,
    Dialog,
}

impl AriaHasPopup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Menu => "menu",
            Self::Listbox => "listbox",
            Self::Tree => "tree",
            Self::Dialog => "dialog",
        }
    }

    /// Popup type implied by the role of the popup surface
    pub fn for_role(role: AriaRole) -> Option<Self> {
        match role {
            AriaRole::Menu => Some(Self::Menu),
            AriaRole::Listbox => Some(Self::Listbox),
            AriaRole::Tree => Some(Self::Tree),
            AriaRole::Dialog => Some(Self::Dialog),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!(AriaRole::parse("button"), Some(AriaRole::Button));
        assert_eq!(AriaRole::parse(" Dialog "), Some(AriaRole::Dialog));
        assert_eq!(AriaRole::parse("TabList"), Some(AriaRole::TabList));
        assert!(AriaRole::parse("widget").is_none());
    }

    #[test]
    fn test_from_str_error() {
        let err = "bogus".parse::<AriaRole>().unwrap_err();
        assert!(matches!(err, A11yError::InvalidRole(ref r) if r == "bogus"));
        assert_eq!("tooltip".parse::<AriaRole>().unwrap().to_string(), "tooltip");
    }

    #[test]
    fn test_haspopup_for_role() {
        assert_eq!(AriaHasPopup::for_role(AriaRole::Menu), Some(AriaHasPopup::Menu));
        assert_eq!(AriaHasPopup::for_role(AriaRole::Dialog).map(|h| h.as_str()), Some("dialog"));
        assert_eq!(AriaHasPopup::for_role(AriaRole::Tooltip), None);
    }
}
