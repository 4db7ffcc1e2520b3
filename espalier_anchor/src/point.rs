// Copyright 2026 the Espalier Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Anchor points and the rectangle edges they pin.

use kurbo::{Point, Rect};

/// One of the nine named positions on a widget's bounding rectangle.
///
/// Four corners, four edge midpoints, and the center. An anchor binds one
/// of these points on its owner to one of these points on a target, so both
/// ends of an anchor are described by this enum.
///
/// Each point contributes to border resolution through a fixed table: the
/// edges it pins ([`edges`](Self::edges)) and whether it supplies a center
/// coordinate on either axis ([`supplies_center_x`](Self::supplies_center_x),
/// [`supplies_center_y`](Self::supplies_center_y)).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum AnchorPoint {
    /// The top-left corner.
    TopLeft,
    /// The midpoint of the top edge.
    Top,
    /// The top-right corner.
    TopRight,
    /// The midpoint of the right edge.
    Right,
    /// The bottom-right corner.
    BottomRight,
    /// The midpoint of the bottom edge.
    Bottom,
    /// The bottom-left corner.
    BottomLeft,
    /// The midpoint of the left edge.
    Left,
    /// The center of the rectangle.
    Center,
}

impl AnchorPoint {
    /// All nine anchor points, in slot order.
    pub const ALL: [Self; 9] = [
        Self::TopLeft,
        Self::Top,
        Self::TopRight,
        Self::Right,
        Self::BottomRight,
        Self::Bottom,
        Self::BottomLeft,
        Self::Left,
        Self::Center,
    ];

    /// The index of this point in a widget's anchor slot array.
    #[must_use]
    pub const fn slot(self) -> usize {
        self as usize
    }

    /// The edge-pin and center contributions of this point, as one table.
    ///
    /// Returns `(pinned edges, supplies center x, supplies center y)`.
    const fn contribution(self) -> (Edges, bool, bool) {
        match self {
            Self::TopLeft => (Edges::TOP.union(Edges::LEFT), false, false),
            Self::Top => (Edges::TOP, true, false),
            Self::TopRight => (Edges::TOP.union(Edges::RIGHT), false, false),
            Self::Right => (Edges::RIGHT, false, true),
            Self::BottomRight => (Edges::BOTTOM.union(Edges::RIGHT), false, false),
            Self::Bottom => (Edges::BOTTOM, true, false),
            Self::BottomLeft => (Edges::BOTTOM.union(Edges::LEFT), false, false),
            Self::Left => (Edges::LEFT, false, true),
            Self::Center => (Edges::empty(), true, true),
        }
    }

    /// The rectangle edges an anchor at this point pins on its owner.
    ///
    /// Corners pin two edges, edge midpoints pin one, and [`Center`] pins
    /// none; it supplies center coordinates instead.
    ///
    /// [`Center`]: Self::Center
    #[must_use]
    pub const fn edges(self) -> Edges {
        self.contribution().0
    }

    /// Whether an anchor at this point supplies a horizontal center
    /// coordinate to its owner.
    #[must_use]
    pub const fn supplies_center_x(self) -> bool {
        self.contribution().1
    }

    /// Whether an anchor at this point supplies a vertical center coordinate
    /// to its owner.
    #[must_use]
    pub const fn supplies_center_y(self) -> bool {
        self.contribution().2
    }
}

bitflags::bitflags! {
    /// A set of rectangle edges.
    ///
    /// Used both for the per-widget "defined borders" mask (which edges the
    /// current anchors pin) and to drive coordinate reads in the resolver.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct Edges: u8 {
        /// The left edge (minimum x).
        const LEFT = 1 << 0;
        /// The right edge (maximum x).
        const RIGHT = 1 << 1;
        /// The top edge (minimum y).
        const TOP = 1 << 2;
        /// The bottom edge (maximum y).
        const BOTTOM = 1 << 3;
    }
}

/// The absolute coordinates of `point` on `rect`.
///
/// # Example
///
/// ```rust
/// use espalier_anchor::{AnchorPoint, point_on_rect};
/// use kurbo::{Point, Rect};
///
/// let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
/// assert_eq!(point_on_rect(rect, AnchorPoint::BottomRight), Point::new(100.0, 50.0));
/// assert_eq!(point_on_rect(rect, AnchorPoint::Center), Point::new(50.0, 25.0));
/// ```
#[must_use]
pub fn point_on_rect(rect: Rect, point: AnchorPoint) -> Point {
    let edges = point.edges();
    let x = if edges.contains(Edges::LEFT) {
        rect.x0
    } else if edges.contains(Edges::RIGHT) {
        rect.x1
    } else {
        rect.center().x
    };
    let y = if edges.contains(Edges::TOP) {
        rect.y0
    } else if edges.contains(Edges::BOTTOM) {
        rect.y1
    } else {
        rect.center().y
    };
    Point::new(x, y)
}
