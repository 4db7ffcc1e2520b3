// Copyright 2026 the Espalier Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Border resolution: the per-axis accumulator fold and span completion
//! rules, run lazily and depth-first over the anchor graph.

use alloc::vec::Vec;

use kurbo::{Rect, Size};

use crate::anchor::AnchorTarget;
use crate::point::{AnchorPoint, Edges, point_on_rect};
use crate::tree::{Tree, WidgetId};

/// Ceiling on resolve recursion through anchor targets.
///
/// Anchor chains are expected to be shallow (tens of widgets, not
/// thousands); the cycle guard, not this ceiling, is what prevents loops.
/// A widget reached at the ceiling reports its held borders and stays
/// dirty, and everything that resolved against it stays dirty too, so a
/// later shallower query or a full pass recovers the true geometry.
pub(crate) const MAX_RESOLVE_DEPTH: usize = 128;

/// Running bounds for one axis, folded from anchors.
///
/// Infinities are the "no bound yet" sentinels: `min` seeds at `+∞` and
/// folds downward, `max` at `-∞` and folds upward, `center` holds the most
/// recently supplied center coordinate (`+∞` when none).
#[derive(Clone, Copy, Debug)]
struct AxisAcc {
    min: f64,
    max: f64,
    center: f64,
}

impl AxisAcc {
    const EMPTY: Self = Self {
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
        center: f64::INFINITY,
    };
}

/// Whether a declared dimension takes part in resolution.
///
/// Zero means undeclared; negative and non-finite values count the same,
/// rather than producing inverted rectangles.
fn size_declared(size: f64) -> bool {
    size.is_finite() && size > 0.0
}

/// Completes one axis from its accumulated bounds and the declared size.
///
/// Returns the `(min, max)` span, or `None` when the axis is
/// under-determined. A declared size that fails [`size_declared`] counts
/// as absent; when both bounds are known the declared size is ignored
/// outright: anchors win.
fn make_span(acc: AxisAcc, size: f64) -> Option<(f64, f64)> {
    let has_size = size_declared(size);
    let has_center = acc.center.is_finite();
    match (acc.min.is_finite(), acc.max.is_finite()) {
        (true, true) => Some((acc.min, acc.max)),
        (true, false) => {
            if has_size {
                Some((acc.min, acc.min + size))
            } else if has_center {
                // Reflect the known bound around the center.
                Some((acc.min, acc.min + 2.0 * (acc.center - acc.min)))
            } else {
                None
            }
        }
        (false, true) => {
            if has_size {
                Some((acc.max - size, acc.max))
            } else if has_center {
                Some((acc.max - 2.0 * (acc.max - acc.center), acc.max))
            } else {
                None
            }
        }
        (false, false) => {
            if has_size && has_center {
                Some((acc.center - size / 2.0, acc.center + size / 2.0))
            } else {
                None
            }
        }
    }
}

impl Tree {
    /// The resolved borders of `id`, recomputing them first if stale.
    ///
    /// Anchor targets are resolved depth-first before their coordinates are
    /// read, so one read sees a consistent graph; unchanged widgets are
    /// served from memory. Returns [`Rect::ZERO`] for dead handles. An
    /// under-determined widget keeps its previously resolved borders and
    /// reports [`is_ready`](Self::is_ready) `false`.
    pub fn borders(&mut self, id: WidgetId) -> Rect {
        self.resolve_depth(id, 0)
    }

    /// Whether the geometry of `id` is fully determined by its current
    /// anchors and declared size, resolving first if stale.
    pub fn is_ready(&mut self, id: WidgetId) -> bool {
        let _ = self.resolve_depth(id, 0);
        self.widget(id).is_some_and(|w| w.ready)
    }

    /// Resolves every live widget, in slot order.
    ///
    /// Equivalent to reading [`borders`](Self::borders) once per widget;
    /// useful as the per-frame tick after a batch of mutations.
    pub fn resolve_all(&mut self) {
        let ids: Vec<WidgetId> = self.ids().collect();
        for id in ids {
            let _ = self.resolve_depth(id, 0);
        }
    }

    pub(crate) fn resolve_depth(&mut self, id: WidgetId, depth: usize) -> Rect {
        if depth > MAX_RESOLVE_DEPTH {
            return self.widget(id).map_or(Rect::ZERO, |w| w.borders);
        }
        self.refresh_graph(id);
        {
            let Some(widget) = self.widget(id) else {
                return Rect::ZERO;
            };
            if !widget.borders_dirty {
                return widget.borders;
            }
        }

        // Forces the tree parent for relative declarations, so it runs
        // before the anchor snapshot below.
        let (size, mut provisional) = self.effective_size(id, depth);

        let Some(widget) = self.widget(id) else {
            return Rect::ZERO;
        };
        let old_ready = widget.ready;
        let prior = widget.borders;
        let anchors = widget.anchors.clone();
        let resolved = widget.resolved;

        if anchors.iter().all(Option::is_none) {
            // Anchorless widgets have only their declared size; they sit at
            // the origin and are never ready.
            let width = if size_declared(size.width) { size.width } else { 0.0 };
            let height = if size_declared(size.height) { size.height } else { 0.0 };
            let rect = Rect::new(0.0, 0.0, width, height);
            if let Some(widget) = self.widget_mut(id) {
                widget.borders = rect;
                widget.ready = false;
                widget.borders_dirty = provisional;
            }
            if old_ready {
                self.queue_redraw(id);
            }
            return rect;
        }

        let mut h = AxisAcc::EMPTY;
        let mut v = AxisAcc::EMPTY;
        for point in AnchorPoint::ALL {
            let Some(anchor) = &anchors[point.slot()] else {
                continue;
            };
            let target_rect = match (&anchor.target, resolved[point.slot()]) {
                (AnchorTarget::Screen, _) => self.screen(),
                (_, Some(target)) => {
                    let rect = self.resolve_depth(target, depth + 1);
                    // A target still dirty after resolving hit the depth
                    // ceiling; this result is then provisional too.
                    if self.widget(target).is_some_and(|w| w.borders_dirty) {
                        provisional = true;
                    }
                    rect
                }
                // Dormant: an unresolved name or a dead handle contributes
                // nothing.
                (_, None) => continue,
            };
            let target_size = Size::new(target_rect.width(), target_rect.height());
            let at = point_on_rect(target_rect, anchor.target_point)
                + anchor.offset.to_px(target_size);
            let edges = point.edges();
            if edges.contains(Edges::LEFT) {
                h.min = h.min.min(at.x);
            }
            if edges.contains(Edges::RIGHT) {
                h.max = h.max.max(at.x);
            }
            if point.supplies_center_x() {
                h.center = at.x;
            }
            if edges.contains(Edges::TOP) {
                v.min = v.min.min(at.y);
            }
            if edges.contains(Edges::BOTTOM) {
                v.max = v.max.max(at.y);
            }
            if point.supplies_center_y() {
                v.center = at.y;
            }
        }

        let (rect, ready) = match (make_span(h, size.width), make_span(v, size.height)) {
            (Some((x0, x1)), Some((y0, y1))) => {
                // Degenerate spans clamp to at least one pixel.
                let x1 = if x1 < x0 { x0 + 1.0 } else { x1 };
                let y1 = if y1 < y0 { y0 + 1.0 } else { y1 };
                (Rect::new(x0, y0, x1, y1), true)
            }
            // Under-determined on either axis: hold the prior borders.
            _ => (prior, false),
        };

        if let Some(widget) = self.widget_mut(id) {
            widget.borders = rect;
            widget.ready = ready;
            widget.borders_dirty = provisional;
            if ready {
                // Anchors win over the declared size; fold the outcome
                // back into the declaration.
                widget.width = rect.width();
                widget.height = rect.height();
            }
        }
        // Geometry becoming determinable (or ceasing to be) is visually
        // significant even when the rectangle value held steady.
        if ready != old_ready {
            self.queue_redraw(id);
        }
        rect
    }

    /// The declared size of `id` in pixels, applying a relative declaration
    /// against the tree parent's (or screen's) current dimensions.
    ///
    /// The second value is `true` when the parent's geometry could only be
    /// resolved provisionally.
    fn effective_size(&mut self, id: WidgetId, depth: usize) -> (Size, bool) {
        let Some(widget) = self.widget(id) else {
            return (Size::ZERO, false);
        };
        let declared = Size::new(widget.width, widget.height);
        let Some(fraction) = widget.rel_size else {
            return (declared, false);
        };
        let parent = widget.parent.filter(|&parent| self.is_alive(parent));
        let (base, provisional) = match parent {
            Some(parent) => {
                let rect = self.resolve_depth(parent, depth + 1);
                let dirty = self.widget(parent).is_some_and(|w| w.borders_dirty);
                (rect.size(), dirty)
            }
            None => (self.screen().size(), false),
        };
        let size = Size::new(base.width * fraction.width, base.height * fraction.height);
        (size, provisional)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::anchor::Anchor;

    fn screen_tree() -> Tree {
        Tree::with_screen(Rect::new(0.0, 0.0, 800.0, 600.0))
    }

    #[test]
    fn span_from_two_bounds_ignores_declared_size() {
        let acc = AxisAcc {
            min: 10.0,
            max: 90.0,
            center: f64::INFINITY,
        };
        assert_eq!(make_span(acc, 500.0), Some((10.0, 90.0)));
    }

    #[test]
    fn span_from_one_bound_and_size() {
        let acc = AxisAcc {
            min: 10.0,
            max: f64::NEG_INFINITY,
            center: f64::INFINITY,
        };
        assert_eq!(make_span(acc, 30.0), Some((10.0, 40.0)));

        let acc = AxisAcc {
            min: f64::INFINITY,
            max: 40.0,
            center: f64::INFINITY,
        };
        assert_eq!(make_span(acc, 30.0), Some((10.0, 40.0)));
    }

    #[test]
    fn span_from_one_bound_reflects_around_center() {
        let acc = AxisAcc {
            min: 10.0,
            max: f64::NEG_INFINITY,
            center: 25.0,
        };
        assert_eq!(make_span(acc, 0.0), Some((10.0, 40.0)));

        let acc = AxisAcc {
            min: f64::INFINITY,
            max: 40.0,
            center: 25.0,
        };
        assert_eq!(make_span(acc, 0.0), Some((10.0, 40.0)));
    }

    #[test]
    fn span_from_center_and_size() {
        let acc = AxisAcc {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            center: 50.0,
        };
        assert_eq!(make_span(acc, 20.0), Some((40.0, 60.0)));
        assert_eq!(make_span(acc, 0.0), None, "center alone is not enough");
    }

    #[test]
    fn zero_size_counts_as_undeclared() {
        let acc = AxisAcc {
            min: 10.0,
            max: f64::NEG_INFINITY,
            center: f64::INFINITY,
        };
        assert_eq!(make_span(acc, 0.0), None);
        assert_eq!(make_span(acc, f64::INFINITY), None);
    }

    #[test]
    fn negative_and_nan_sizes_count_as_undeclared() {
        let mut tree = screen_tree();
        let a = tree.insert(None);
        tree.set_size(a, Size::new(-40.0, f64::NAN));
        // The anchorless rectangle must stay normalized regardless of what
        // was declared.
        assert_eq!(tree.borders(a), Rect::ZERO);
        assert!(!tree.is_ready(a));

        tree.set_anchor(
            a,
            Anchor::abs(AnchorPoint::TopLeft, AnchorTarget::Screen, AnchorPoint::TopLeft),
        )
        .unwrap();
        // One bound plus an invalid size leaves the axis under-determined.
        assert_eq!(tree.borders(a), Rect::ZERO);
        assert!(!tree.is_ready(a));

        tree.set_size(a, Size::new(40.0, 20.0));
        assert_eq!(tree.borders(a), Rect::new(0.0, 0.0, 40.0, 20.0));
        assert!(tree.is_ready(a));
    }

    #[test]
    fn anchorless_widgets_sit_at_origin_and_are_never_ready() {
        let mut tree = screen_tree();
        let a = tree.insert(None);
        assert_eq!(tree.borders(a), Rect::ZERO);
        assert!(!tree.is_ready(a));

        tree.set_size(a, Size::new(100.0, 50.0));
        assert_eq!(tree.borders(a), Rect::new(0.0, 0.0, 100.0, 50.0));
        assert!(!tree.is_ready(a));
    }

    #[test]
    fn screen_anchor_plus_size_resolves() {
        let mut tree = screen_tree();
        let a = tree.insert(None);
        tree.set_anchor(
            a,
            Anchor::abs(AnchorPoint::TopLeft, AnchorTarget::Screen, AnchorPoint::TopLeft),
        )
        .unwrap();
        tree.set_size(a, Size::new(100.0, 50.0));
        assert_eq!(tree.borders(a), Rect::new(0.0, 0.0, 100.0, 50.0));
        assert!(tree.is_ready(a));
    }

    #[test]
    fn under_determined_axes_hold_prior_borders() {
        let mut tree = screen_tree();
        let a = tree.insert(None);
        tree.set_anchor(
            a,
            Anchor::abs(AnchorPoint::TopLeft, AnchorTarget::Screen, AnchorPoint::TopLeft),
        )
        .unwrap();
        tree.set_size(a, Size::new(100.0, 50.0));
        assert_eq!(tree.borders(a), Rect::new(0.0, 0.0, 100.0, 50.0));
        assert!(tree.is_ready(a));

        // Clearing the height leaves the vertical axis under-determined:
        // the previous rectangle is retained, readiness drops.
        tree.set_height(a, 0.0);
        assert_eq!(tree.borders(a), Rect::new(0.0, 0.0, 100.0, 50.0));
        assert!(!tree.is_ready(a));
    }

    #[test]
    fn proportional_offsets_scale_with_the_target() {
        let mut tree = screen_tree();
        let a = tree.insert(None);
        tree.set_anchor(
            a,
            Anchor::abs(AnchorPoint::TopLeft, AnchorTarget::Screen, AnchorPoint::TopLeft),
        )
        .unwrap();
        tree.set_size(a, Size::new(200.0, 100.0));

        let b = tree.insert(None);
        tree.set_anchor(
            b,
            Anchor::rel(AnchorPoint::TopLeft, a, AnchorPoint::TopLeft).with_offset(0.25, 0.5),
        )
        .unwrap();
        tree.set_size(b, Size::new(10.0, 10.0));

        // 25% of a's width, 50% of its height.
        assert_eq!(tree.borders(b), Rect::new(50.0, 50.0, 60.0, 60.0));
    }

    #[test]
    fn degenerate_spans_clamp_to_one_pixel() {
        let mut tree = screen_tree();
        let a = tree.insert(None);
        // Right edge pinned left of the left edge.
        tree.set_anchor(
            a,
            Anchor::abs(AnchorPoint::TopLeft, AnchorTarget::Screen, AnchorPoint::TopLeft)
                .with_offset(100.0, 0.0),
        )
        .unwrap();
        tree.set_anchor(
            a,
            Anchor::abs(AnchorPoint::BottomRight, AnchorTarget::Screen, AnchorPoint::TopLeft)
                .with_offset(40.0, 80.0),
        )
        .unwrap();

        let rect = tree.borders(a);
        assert_eq!(rect, Rect::new(100.0, 0.0, 101.0, 80.0));
        assert!(tree.is_ready(a));
    }

    #[test]
    fn ready_resolution_back_derives_the_declared_size() {
        let mut tree = screen_tree();
        let a = tree.insert(None);
        tree.set_size(a, Size::new(999.0, 999.0));
        tree.set_anchor(
            a,
            Anchor::abs(AnchorPoint::TopLeft, AnchorTarget::Screen, AnchorPoint::TopLeft),
        )
        .unwrap();
        tree.set_anchor(
            a,
            Anchor::abs(AnchorPoint::BottomRight, AnchorTarget::Screen, AnchorPoint::TopLeft)
                .with_offset(120.0, 60.0),
        )
        .unwrap();

        assert_eq!(tree.borders(a), Rect::new(0.0, 0.0, 120.0, 60.0));
        let widget = tree.widget(a).unwrap();
        assert_eq!((widget.width, widget.height), (120.0, 60.0));
    }

    #[test]
    fn center_anchors_follow_the_target_midpoint() {
        let mut tree = screen_tree();
        let a = tree.insert(None);
        tree.set_anchor(
            a,
            Anchor::abs(AnchorPoint::Center, AnchorTarget::Screen, AnchorPoint::Center),
        )
        .unwrap();
        tree.set_size(a, Size::new(100.0, 50.0));

        // Screen center is (400, 300).
        assert_eq!(tree.borders(a), Rect::new(350.0, 275.0, 450.0, 325.0));
        assert!(tree.is_ready(a));
    }

    #[test]
    fn relative_size_tracks_the_parent() {
        let mut tree = screen_tree();
        let parent = tree.insert(None);
        tree.set_anchor(
            parent,
            Anchor::abs(AnchorPoint::TopLeft, AnchorTarget::Screen, AnchorPoint::TopLeft),
        )
        .unwrap();
        tree.set_size(parent, Size::new(200.0, 100.0));

        let child = tree.insert(Some(parent));
        tree.set_anchor(
            child,
            Anchor::abs(AnchorPoint::TopLeft, parent, AnchorPoint::TopLeft),
        )
        .unwrap();
        tree.set_rel_size(child, Size::new(0.5, 0.5)).unwrap();
        assert_eq!(tree.borders(child), Rect::new(0.0, 0.0, 100.0, 50.0));

        // Growing the parent re-resolves the child on the next read.
        tree.set_size(parent, Size::new(300.0, 100.0));
        assert!(tree.needs_resolve(child));
        assert_eq!(tree.borders(child), Rect::new(0.0, 0.0, 150.0, 50.0));
    }

    #[test]
    fn parentless_relative_size_tracks_the_screen() {
        let mut tree = screen_tree();
        let a = tree.insert(None);
        tree.set_anchor(
            a,
            Anchor::abs(AnchorPoint::TopLeft, AnchorTarget::Screen, AnchorPoint::TopLeft),
        )
        .unwrap();
        tree.set_rel_size(a, Size::new(0.5, 1.0)).unwrap();
        assert_eq!(tree.borders(a), Rect::new(0.0, 0.0, 400.0, 600.0));

        tree.set_screen(Rect::new(0.0, 0.0, 1000.0, 600.0));
        assert_eq!(tree.borders(a), Rect::new(0.0, 0.0, 500.0, 600.0));
    }

    #[test]
    fn readiness_transitions_queue_redraws_value_repeats_do_not() {
        let mut tree = screen_tree();
        let a = tree.insert(None);
        tree.set_anchor(
            a,
            Anchor::abs(AnchorPoint::TopLeft, AnchorTarget::Screen, AnchorPoint::TopLeft),
        )
        .unwrap();
        let _ = tree.take_redraws();

        // Under-determined: no transition (started not ready), no redraw
        // beyond what the mutation already queued.
        let _ = tree.borders(a);
        assert!(tree.take_redraws().is_empty());

        // Becoming ready queues one.
        tree.set_size(a, Size::new(10.0, 10.0));
        let _ = tree.take_redraws();
        let _ = tree.borders(a);
        assert_eq!(tree.take_redraws(), vec![a]);

        // Ceasing to be ready queues one too.
        tree.clear_anchors(a);
        let _ = tree.take_redraws();
        let _ = tree.borders(a);
        assert_eq!(tree.take_redraws(), vec![a]);
    }

    #[test]
    fn deep_chains_recover_after_a_shallow_pass() {
        let mut tree = screen_tree();
        let mut ids = Vec::new();
        let root = tree.insert(None);
        tree.set_anchor(
            root,
            Anchor::abs(AnchorPoint::TopLeft, AnchorTarget::Screen, AnchorPoint::TopLeft),
        )
        .unwrap();
        tree.set_size(root, Size::new(10.0, 10.0));
        ids.push(root);
        for i in 1..(MAX_RESOLVE_DEPTH + 40) {
            let id = tree.insert(None);
            tree.set_anchor(
                id,
                Anchor::abs(AnchorPoint::TopLeft, ids[i - 1], AnchorPoint::BottomRight),
            )
            .unwrap();
            tree.set_size(id, Size::new(10.0, 10.0));
            ids.push(id);
        }

        // Querying the tail first exceeds the recursion ceiling; the tail
        // must come back without the stack blowing, still dirty.
        let last = *ids.last().unwrap();
        let _ = tree.borders(last);
        assert!(tree.needs_resolve(last));

        // A full pass in slot order resolves one link at a time.
        tree.resolve_all();
        let n = ids.len() as f64;
        assert_eq!(
            tree.borders(last),
            Rect::new(
                10.0 * (n - 1.0),
                10.0 * (n - 1.0),
                10.0 * n,
                10.0 * n
            )
        );
        assert!(tree.is_ready(last));
    }

    #[test]
    fn resolving_is_idempotent_and_memoized() {
        let mut tree = screen_tree();
        let a = tree.insert(None);
        tree.set_anchor(
            a,
            Anchor::abs(AnchorPoint::TopLeft, AnchorTarget::Screen, AnchorPoint::TopLeft),
        )
        .unwrap();
        tree.set_size(a, Size::new(50.0, 50.0));

        let first = tree.borders(a);
        let _ = tree.take_redraws();
        let second = tree.borders(a);
        assert_eq!(first, second);
        assert!(tree.take_redraws().is_empty(), "memoized read must not renotify");
    }
}
