// Copyright 2026 the Espalier Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The anchor value type: one point on a widget bound to a point on a
//! target, with an offset.

use alloc::string::String;

use kurbo::{Size, Vec2};

use crate::point::AnchorPoint;
use crate::tree::WidgetId;

/// What an anchor is attached to.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum AnchorTarget {
    /// The screen rectangle. Anchors to the screen are absolute: they place
    /// their point directly in screen coordinates.
    Screen,
    /// A widget identified by handle.
    Widget(WidgetId),
    /// A widget identified by name, resolved lazily through the tree's name
    /// registry. A name that does not (yet) resolve leaves the anchor
    /// dormant rather than failing, so widgets may anchor to targets
    /// declared after them.
    Named(String),
}

impl From<WidgetId> for AnchorTarget {
    fn from(id: WidgetId) -> Self {
        Self::Widget(id)
    }
}

impl From<&str> for AnchorTarget {
    fn from(name: &str) -> Self {
        Self::Named(String::from(name))
    }
}

impl From<String> for AnchorTarget {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

/// An anchor's offset from its target point.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum AnchorOffset {
    /// Absolute pixels, applied as-is.
    Px(Vec2),
    /// Fractions of the target's resolved size: `x` is multiplied by the
    /// target's width and `y` by its height at resolution time.
    Fraction(Vec2),
}

impl AnchorOffset {
    /// The offset in pixels, given the resolved size of the anchor's target.
    #[must_use]
    pub fn to_px(self, target: Size) -> Vec2 {
        match self {
            Self::Px(v) => v,
            Self::Fraction(v) => Vec2::new(v.x * target.width, v.y * target.height),
        }
    }
}

/// A rule binding one point of a widget to a point on a target.
///
/// A widget holds at most one anchor per [`AnchorPoint`]; committing an
/// anchor through [`Tree::set_anchor`] replaces whatever occupied that
/// point's slot.
///
/// # Example
///
/// ```rust
/// use espalier_anchor::{Anchor, AnchorOffset, AnchorPoint, AnchorTarget};
/// use kurbo::Vec2;
///
/// let anchor = Anchor::abs(AnchorPoint::TopLeft, AnchorTarget::Screen, AnchorPoint::TopLeft)
///     .with_offset(10.0, 20.0);
/// assert_eq!(anchor.target, AnchorTarget::Screen);
/// assert_eq!(anchor.offset, AnchorOffset::Px(Vec2::new(10.0, 20.0)));
/// ```
///
/// [`Tree::set_anchor`]: crate::Tree::set_anchor
#[derive(Clone, PartialEq, Debug)]
pub struct Anchor {
    /// The point on the owning widget this anchor places.
    pub point: AnchorPoint,
    /// What the anchor is attached to.
    pub target: AnchorTarget,
    /// The point on the target that `point` is placed relative to.
    pub target_point: AnchorPoint,
    /// Offset applied to the target point's coordinates.
    pub offset: AnchorOffset,
}

impl Anchor {
    /// A zero-offset anchor with an absolute-pixel offset kind.
    #[must_use]
    pub fn abs(
        point: AnchorPoint,
        target: impl Into<AnchorTarget>,
        target_point: AnchorPoint,
    ) -> Self {
        Self {
            point,
            target: target.into(),
            target_point,
            offset: AnchorOffset::Px(Vec2::ZERO),
        }
    }

    /// A zero-offset anchor whose offset is proportional to the target's
    /// resolved size.
    #[must_use]
    pub fn rel(
        point: AnchorPoint,
        target: impl Into<AnchorTarget>,
        target_point: AnchorPoint,
    ) -> Self {
        Self {
            point,
            target: target.into(),
            target_point,
            offset: AnchorOffset::Fraction(Vec2::ZERO),
        }
    }

    /// This anchor with its offset magnitude replaced, keeping the offset
    /// kind.
    #[must_use]
    pub fn with_offset(mut self, x: f64, y: f64) -> Self {
        self.offset = match self.offset {
            AnchorOffset::Px(_) => AnchorOffset::Px(Vec2::new(x, y)),
            AnchorOffset::Fraction(_) => AnchorOffset::Fraction(Vec2::new(x, y)),
        };
        self
    }
}
