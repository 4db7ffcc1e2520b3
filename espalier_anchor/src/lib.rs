// Copyright 2026 the Espalier Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=espalier_anchor --heading-base-level=0

//! Espalier Anchor: a retained-mode anchor layout tree.
//!
//! Espalier Anchor positions rectangular widgets by declaration rather than
//! by algorithm: each widget pins up to nine named points of its rectangle
//! (corners, edge midpoints, center) to points on other widgets or on the
//! screen, with pixel or proportional offsets, and the tree resolves the
//! declarations into concrete rectangles on demand.
//!
//! - Widgets live in a generational arena and are addressed by [`WidgetId`].
//! - Anchors may target the [screen](AnchorTarget::Screen), another
//!   [widget](AnchorTarget::Widget), or a [name](AnchorTarget::Named) that
//!   has not registered yet; named targets bind when the name appears.
//! - Resolution is lazy and incremental: reading
//!   [`borders`](Tree::borders) recomputes only geometry invalidated since
//!   the last read, and [`take_redraws`](Tree::take_redraws) drains the
//!   widgets whose appearance may have changed.
//! - Cyclic anchor declarations are rejected when committed, so layout
//!   never loops.
//!
//! ## Minimal example
//!
//! ```rust
//! use espalier_anchor::{Anchor, AnchorPoint, AnchorTarget, Tree};
//! use kurbo::{Rect, Size};
//!
//! let mut tree = Tree::with_screen(Rect::new(0.0, 0.0, 800.0, 600.0));
//!
//! // A panel filling the left half of the screen.
//! let panel = tree.insert(None);
//! tree.set_anchor(
//!     panel,
//!     Anchor::abs(AnchorPoint::TopLeft, AnchorTarget::Screen, AnchorPoint::TopLeft),
//! )?;
//! tree.set_anchor(
//!     panel,
//!     Anchor::rel(AnchorPoint::BottomRight, AnchorTarget::Screen, AnchorPoint::TopLeft)
//!         .with_offset(0.5, 1.0),
//! )?;
//!
//! // A button of fixed size, centered just above the panel's bottom edge.
//! let button = tree.insert(Some(panel));
//! tree.set_anchor(
//!     button,
//!     Anchor::abs(AnchorPoint::Bottom, panel, AnchorPoint::Bottom).with_offset(0.0, -10.0),
//! )?;
//! tree.set_size(button, Size::new(120.0, 40.0));
//!
//! assert_eq!(tree.borders(panel), Rect::new(0.0, 0.0, 400.0, 600.0));
//! assert_eq!(tree.borders(button), Rect::new(140.0, 550.0, 260.0, 590.0));
//!
//! // Resizing the screen invalidates the panel, and through it the button.
//! tree.set_screen(Rect::new(0.0, 0.0, 1000.0, 600.0));
//! assert_eq!(tree.borders(panel), Rect::new(0.0, 0.0, 500.0, 600.0));
//! assert_eq!(tree.borders(button), Rect::new(190.0, 550.0, 310.0, 590.0));
//! # Ok::<(), espalier_anchor::AnchorError>(())
//! ```
//!
//! ## Design notes
//!
//! - A widget needs enough declarations to determine each axis: two
//!   opposing edges, or one edge plus a size, or a center plus a size.
//!   Until then it reports [`is_ready`](Tree::is_ready) `false` and holds
//!   its previously resolved rectangle.
//! - When anchors pin both edges of an axis, they win over any declared
//!   size; the declaration is updated to the resolved extent.
//! - Removing a widget removes the subtree it owns, and anchors held by
//!   survivors onto removed widgets are rewritten into screen-relative
//!   pixel anchors so the survivors do not move.
//! - The tree is headless. Rendering, input, and styling live in the
//!   collaborating Espalier crates; this one only answers "where is this
//!   widget and does it need repainting".
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod anchor;
mod error;
mod graph;
mod point;
mod resolve;
mod tree;

pub use anchor::{Anchor, AnchorOffset, AnchorTarget};
pub use error::{AnchorError, CycleError, NameError};
pub use point::{AnchorPoint, Edges, point_on_rect};
pub use tree::{Tree, WidgetId};
