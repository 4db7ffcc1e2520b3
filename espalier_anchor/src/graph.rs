// Copyright 2026 the Espalier Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dependency-graph maintenance: the transitive cycle walk, the commit-time
//! anchor guard, and the lazy refresh that keeps anchored-by
//! back-references consistent.

use alloc::string::String;

use hashbrown::HashSet;
use smallvec::SmallVec;

use crate::anchor::{Anchor, AnchorTarget};
use crate::error::{AnchorError, CycleError};
use crate::point::{AnchorPoint, Edges};
use crate::tree::{Tree, WidgetId};

impl Tree {
    /// The live widget `anchor` currently targets, resolving names through
    /// the registry.
    ///
    /// `None` for screen targets, dead handles, and names that do not
    /// resolve. All of these leave the anchor dormant.
    pub(crate) fn anchor_target_id(&self, anchor: &Anchor) -> Option<WidgetId> {
        let id = match &anchor.target {
            AnchorTarget::Screen => return None,
            AnchorTarget::Widget(id) => *id,
            AnchorTarget::Named(name) => self.lookup(name)?,
        };
        self.is_alive(id).then_some(id)
    }

    /// Whether `from` reaches `to` through anchor targets or relative-size
    /// parent edges, in any number of steps.
    ///
    /// Every anchor of every reached widget is walked (explicit stack plus
    /// a visited set), so diamond-shaped fans terminate without revisits.
    /// Trivially true when `from == to`.
    pub(crate) fn depends_on(&self, from: WidgetId, to: WidgetId) -> bool {
        let mut visited: HashSet<WidgetId> = HashSet::new();
        let mut stack: SmallVec<[WidgetId; 8]> = SmallVec::new();
        visited.insert(from);
        stack.push(from);
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            let Some(widget) = self.widget(current) else {
                continue;
            };
            for anchor in widget.anchors.iter().flatten() {
                if let Some(target) = self.anchor_target_id(anchor) {
                    if visited.insert(target) {
                        stack.push(target);
                    }
                }
            }
            if widget.rel_size.is_some() {
                if let Some(parent) = widget.parent {
                    if self.is_alive(parent) && visited.insert(parent) {
                        stack.push(parent);
                    }
                }
            }
        }
        false
    }

    /// Validates a proposed anchor target for `id` without committing
    /// anything.
    ///
    /// Names that do not currently resolve pass validation: they commit as
    /// dormant anchors and are re-checked by [`refresh_graph`] once they
    /// resolve.
    ///
    /// [`refresh_graph`]: Self::refresh_graph
    pub(crate) fn guard_target(
        &self,
        id: WidgetId,
        point: AnchorPoint,
        target: &AnchorTarget,
    ) -> Result<(), AnchorError> {
        let target_id = match target {
            AnchorTarget::Screen => return Ok(()),
            AnchorTarget::Widget(target_id) => *target_id,
            AnchorTarget::Named(name) => match self.lookup(name) {
                Some(target_id) => target_id,
                None => return Ok(()),
            },
        };
        if target_id == id {
            return Err(AnchorError::SelfAnchor {
                widget: self.label(id),
                point,
            });
        }
        if !self.is_alive(target_id) {
            // A dead direct handle is dormant, like an unresolved name.
            return Ok(());
        }
        if self.depends_on(target_id, id) {
            return Err(CycleError {
                from: self.label(id),
                to: self.label(target_id),
                point: Some(point),
            }
            .into());
        }
        Ok(())
    }

    /// Rebuilds the dependency bookkeeping of `id` from its current anchor
    /// set, if it is marked stale.
    ///
    /// Re-resolves named targets through the registry; strips anchors that
    /// have come to form a cycle, recording a [`CycleError`] for
    /// [`take_strips`]; registers `id` as a waiter on names that do not
    /// resolve; and diffs the direct-dependency set against the previous
    /// one, updating anchored-by back-references on both sides. The diff
    /// makes this O(degree) rather than O(population); many widgets refresh per
    /// frame in interactive use.
    ///
    /// [`take_strips`]: Self::take_strips
    pub(crate) fn refresh_graph(&mut self, id: WidgetId) {
        let Some(widget) = self.widget(id) else {
            return;
        };
        if !widget.anchors_dirty {
            return;
        }
        let rel_parent = widget
            .rel_size
            .and(widget.parent)
            .filter(|&parent| self.is_alive(parent));

        // First pass, read-only: resolve targets, pick out anchors to
        // strip, and collect names to wait on.
        let mut resolved: [Option<WidgetId>; 9] = [None; 9];
        let mut strip: SmallVec<[CycleError; 2]> = SmallVec::new();
        let mut strip_points: SmallVec<[AnchorPoint; 2]> = SmallVec::new();
        let mut waits: SmallVec<[String; 2]> = SmallVec::new();
        for point in AnchorPoint::ALL {
            let Some(anchor) = &widget.anchors[point.slot()] else {
                continue;
            };
            let target_id = match &anchor.target {
                AnchorTarget::Screen => continue,
                AnchorTarget::Widget(target_id) => {
                    if !self.is_alive(*target_id) {
                        continue;
                    }
                    *target_id
                }
                AnchorTarget::Named(name) => match self.lookup(name) {
                    Some(target_id) => target_id,
                    None => {
                        waits.push(name.clone());
                        continue;
                    }
                },
            };
            // Committed anchors are re-validated here: a target can change
            // identity after the commit-time check, e.g. when a dormant
            // name registers as a widget that already depends on `id`.
            if target_id == id || self.depends_on(target_id, id) {
                strip.push(CycleError {
                    from: self.label(id),
                    to: self.label(target_id),
                    point: Some(point),
                });
                strip_points.push(point);
                continue;
            }
            resolved[point.slot()] = Some(target_id);
        }

        // Second pass: commit the refresh.
        self.strips.extend(strip);
        for name in waits {
            let entry = self.waiters.entry(name).or_default();
            if !entry.contains(&id) {
                entry.push(id);
            }
        }

        let mut deps: SmallVec<[WidgetId; 4]> = SmallVec::new();
        for target in resolved.iter().flatten() {
            if !deps.contains(target) {
                deps.push(*target);
            }
        }
        if let Some(parent) = rel_parent {
            if !deps.contains(&parent) {
                deps.push(parent);
            }
        }

        let old: SmallVec<[WidgetId; 4]> = match self.widget(id) {
            Some(widget) => widget.deps.clone(),
            None => return,
        };
        for dep in &old {
            if !deps.contains(dep) {
                if let Some(widget) = self.widget_mut(*dep) {
                    widget.anchored_by.retain(|dependent| *dependent != id);
                }
            }
        }
        for dep in &deps {
            if !old.contains(dep) {
                if let Some(widget) = self.widget_mut(*dep) {
                    if !widget.anchored_by.contains(&id) {
                        widget.anchored_by.push(id);
                    }
                }
            }
        }

        if let Some(widget) = self.widget_mut(id) {
            for point in strip_points {
                widget.anchors[point.slot()] = None;
            }
            let mut defined = Edges::empty();
            for anchor in widget.anchors.iter().flatten() {
                defined |= anchor.point.edges();
            }
            widget.defined = defined;
            widget.deps = deps;
            widget.resolved = resolved;
            widget.anchors_dirty = false;
        }
    }
}
