//! Anchored Placement
//!
//! Picks the side of a trigger an anchored surface (tooltip, popover)
//! should open on. Pure box arithmetic against the viewport.

use std::fmt;

use ama_dom::{DOMRect, Document, NodeId, Size};

/// Side of the trigger the surface is placed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

/// Fallback order after the preferred side and its opposite
const DEFAULT_ORDER: [Side; 4] = [Side::Bottom, Side::Top, Side::Right, Side::Left];

impl Side {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Some(Self::Top),
            "bottom" => Some(Self::Bottom),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Author preference: a fixed side or `auto`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PreferredPlacement {
    #[default]
    Auto,
    Side(Side),
}

impl PreferredPlacement {
    /// Unknown or missing values mean `auto`
    pub fn parse(value: Option<&str>) -> Self {
        value.and_then(Side::parse).map_or(Self::Auto, Self::Side)
    }

    /// Side to advertise before anything has been measured
    pub fn initial_side(&self) -> Side {
        match self {
            Self::Auto => Side::Bottom,
            Self::Side(side) => *side,
        }
    }

    fn order(&self) -> Vec<Side> {
        match self {
            Self::Auto => DEFAULT_ORDER.to_vec(),
            Self::Side(side) => {
                let opposite = side.opposite();
                let mut order = vec![*side, opposite];
                order.extend(DEFAULT_ORDER.iter().filter(|s| **s != *side && **s != opposite));
                order
            }
        }
    }
}

fn fits(side: Side, trigger: &DOMRect, surface: &DOMRect, viewport: Size) -> bool {
    match side {
        Side::Top => surface.height <= trigger.top(),
        Side::Bottom => surface.height <= viewport.height - trigger.bottom(),
        Side::Left => surface.width <= trigger.left(),
        Side::Right => surface.width <= viewport.width - trigger.right(),
    }
}

/// First side in preference order where the surface fits, else the
/// first candidate
pub fn resolve(trigger: &DOMRect, surface: &DOMRect, preferred: PreferredPlacement, viewport: Size) -> Side {
    let order = preferred.order();
    order
        .iter()
        .copied()
        .find(|side| fits(*side, trigger, surface, viewport))
        .unwrap_or(order[0])
}

/// [`resolve`] using the boxes and viewport recorded on the document
pub fn resolve_for(doc: &Document, trigger: NodeId, surface: NodeId, preferred: PreferredPlacement) -> Side {
    let side = resolve(&doc.rect(trigger), &doc.rect(surface), preferred, doc.viewport());
    tracing::trace!("placement for {} resolved to {}", surface, side);
    side
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Size = Size { width: 800.0, height: 600.0 };

    #[test]
    fn test_preferred_side_when_it_fits() {
        let trigger = DOMRect::from_xywh(300.0, 300.0, 100.0, 30.0);
        let surface = DOMRect::from_xywh(0.0, 0.0, 120.0, 40.0);
        assert_eq!(resolve(&trigger, &surface, PreferredPlacement::Side(Side::Top), VIEWPORT), Side::Top);
        assert_eq!(resolve(&trigger, &surface, PreferredPlacement::Auto, VIEWPORT), Side::Bottom);
    }

    #[test]
    fn test_flips_to_opposite() {
        let trigger = DOMRect::from_xywh(300.0, 10.0, 100.0, 30.0);
        let surface = DOMRect::from_xywh(0.0, 0.0, 120.0, 40.0);
        assert_eq!(resolve(&trigger, &surface, PreferredPlacement::Side(Side::Top), VIEWPORT), Side::Bottom);
    }

    #[test]
    fn test_nothing_fits_keeps_first_candidate() {
        let trigger = DOMRect::from_xywh(0.0, 0.0, 800.0, 600.0);
        let surface = DOMRect::from_xywh(0.0, 0.0, 50.0, 50.0);
        assert_eq!(resolve(&trigger, &surface, PreferredPlacement::Side(Side::Left), VIEWPORT), Side::Left);
        assert_eq!(resolve(&trigger, &surface, PreferredPlacement::Auto, VIEWPORT), Side::Bottom);
    }

    #[test]
    fn test_parse_preferred() {
        assert_eq!(PreferredPlacement::parse(Some("RIGHT")), PreferredPlacement::Side(Side::Right));
        assert_eq!(PreferredPlacement::parse(Some("diagonal")), PreferredPlacement::Auto);
        assert_eq!(PreferredPlacement::parse(None).initial_side(), Side::Bottom);
        assert_eq!(
            PreferredPlacement::Side(Side::Left).order(),
            vec![Side::Left, Side::Right, Side::Bottom, Side::Top]
        );
    }
}
