// Copyright 2026 the Espalier Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for anchor assignment and widget registration.

use alloc::string::String;

use crate::point::AnchorPoint;

/// An anchor would create (or has created) a dependency cycle.
///
/// Returned by [`Tree::set_anchor`] when the proposed target's dependency
/// chain reaches back to the anchor's owner. Also recorded by the
/// dependency-graph refresh when a dormant named target later resolves into
/// a cycle; the offending anchor is stripped and the diagnostic is drained
/// through [`Tree::take_strips`].
///
/// Widgets are identified by their registered name, or by `"#<index>"` for
/// anonymous widgets.
///
/// [`Tree::set_anchor`]: crate::Tree::set_anchor
/// [`Tree::take_strips`]: crate::Tree::take_strips
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CycleError {
    /// Label of the widget whose anchor was rejected or stripped.
    pub from: String,
    /// Label of the anchor's target.
    pub to: String,
    /// The anchor point on the owning widget, or `None` when the offending
    /// dependency is a relative-size edge rather than an anchor.
    pub point: Option<AnchorPoint>,
}

impl core::fmt::Display for CycleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.point {
            Some(point) => write!(
                f,
                "cyclic anchor dependency: {:?} and {:?} depend on each other ({:?} anchor)",
                self.from, self.to, point
            ),
            None => write!(
                f,
                "cyclic anchor dependency: {:?} and {:?} depend on each other (relative size)",
                self.from, self.to
            ),
        }
    }
}

impl core::error::Error for CycleError {}

/// Error returned by anchor-mutating operations on a [`Tree`].
///
/// Failed operations are complete no-ops: the previous anchor state of every
/// widget involved is preserved.
///
/// [`Tree`]: crate::Tree
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum AnchorError {
    /// The anchor's target chain reaches back to its owner.
    Cycle(CycleError),
    /// The operation would anchor a widget directly to itself.
    SelfAnchor {
        /// Label of the widget.
        widget: String,
        /// The anchor point on the owning widget.
        point: AnchorPoint,
    },
}

impl core::fmt::Display for AnchorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Cycle(err) => write!(f, "{err}"),
            Self::SelfAnchor { widget, point } => {
                write!(
                    f,
                    "widget {widget:?} cannot anchor to itself ({point:?} anchor)"
                )
            }
        }
    }
}

impl core::error::Error for AnchorError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Cycle(err) => Some(err),
            Self::SelfAnchor { .. } => None,
        }
    }
}

impl From<CycleError> for AnchorError {
    fn from(err: CycleError) -> Self {
        Self::Cycle(err)
    }
}

/// Error returned by [`Tree::insert_named`] when the name is already bound
/// to a live widget.
///
/// [`Tree::insert_named`]: crate::Tree::insert_named
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct NameError {
    /// The name that is already taken.
    pub name: String,
}

impl core::fmt::Display for NameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "a widget named {:?} already exists", self.name)
    }
}

impl core::error::Error for NameError {}
