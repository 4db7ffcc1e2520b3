// Copyright 2026 the Espalier Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The widget tree: arena storage, the name registry, anchor and size
//! mutation, teardown, and the invalidation queues.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::{Rect, Size};
use smallvec::SmallVec;

use crate::anchor::{Anchor, AnchorOffset, AnchorTarget};
use crate::error::{AnchorError, CycleError, NameError};
use crate::point::{AnchorPoint, Edges, point_on_rect};

/// A generation-checked handle to a widget in a [`Tree`].
///
/// Handles are cheap to copy and compare. A handle to a removed widget is
/// detectably dead ([`Tree::is_alive`]) and is never confused with a later
/// widget that reuses the same slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct WidgetId(pub(crate) u32, pub(crate) u32);

impl WidgetId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self(index, generation)
    }

    /// The slot index of this handle.
    ///
    /// Indices are reused after removal; pair with generation checks
    /// ([`Tree::is_alive`]) before treating one as a stable identity.
    #[must_use]
    pub const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Per-widget layout state.
#[derive(Clone, Debug)]
pub(crate) struct Widget {
    pub(crate) name: Option<String>,
    pub(crate) parent: Option<WidgetId>,
    pub(crate) children: SmallVec<[WidgetId; 4]>,
    /// One slot per [`AnchorPoint`].
    pub(crate) anchors: [Option<Anchor>; 9],
    /// Target handle per anchor slot, refreshed by the graph pass. `None`
    /// for screen targets and for names that have not resolved.
    pub(crate) resolved: [Option<WidgetId>; 9],
    /// Which rectangle edges the current anchors pin.
    pub(crate) defined: Edges,
    /// Resolved rectangle; valid only while `borders_dirty` is clear.
    pub(crate) borders: Rect,
    /// Declared absolute size; zero means undeclared.
    pub(crate) width: f64,
    pub(crate) height: f64,
    /// Declared size as fractions of the tree parent's (or screen's)
    /// resolved dimensions.
    pub(crate) rel_size: Option<Size>,
    /// Whether the last resolution fully determined both axes.
    pub(crate) ready: bool,
    pub(crate) borders_dirty: bool,
    pub(crate) anchors_dirty: bool,
    pub(crate) queued_redraw: bool,
    /// Widgets whose anchors (or relative size) depend on this one.
    pub(crate) anchored_by: SmallVec<[WidgetId; 4]>,
    /// Direct dependencies as of the last graph refresh; diffed against the
    /// recomputed set so back-references update in O(degree).
    pub(crate) deps: SmallVec<[WidgetId; 4]>,
}

impl Widget {
    fn new(name: Option<String>, parent: Option<WidgetId>) -> Self {
        Self {
            name,
            parent,
            children: SmallVec::new(),
            anchors: [const { None }; 9],
            resolved: [None; 9],
            defined: Edges::empty(),
            borders: Rect::ZERO,
            width: 0.0,
            height: 0.0,
            rel_size: None,
            ready: false,
            borders_dirty: true,
            anchors_dirty: false,
            queued_redraw: false,
            anchored_by: SmallVec::new(),
            deps: SmallVec::new(),
        }
    }
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    widget: Option<Widget>,
}

/// A retained widget tree with anchor-based layout.
///
/// Widgets are inserted into an arena and addressed by [`WidgetId`]. Each
/// widget declares its geometry through up to nine [`Anchor`]s plus an
/// optional declared size; [`borders`](Tree::borders) lazily resolves the
/// declarations into concrete rectangles, recomputing only what changed
/// since the last read.
///
/// All mutation goes through `&mut self`; the tree is single-threaded and
/// every operation runs synchronously to completion.
///
/// # Example
///
/// ```rust
/// use espalier_anchor::{Anchor, AnchorPoint, AnchorTarget, Tree};
/// use kurbo::Rect;
///
/// let mut tree = Tree::with_screen(Rect::new(0.0, 0.0, 800.0, 600.0));
/// let panel = tree.insert(None);
/// tree.set_anchor(
///     panel,
///     Anchor::abs(AnchorPoint::TopLeft, AnchorTarget::Screen, AnchorPoint::TopLeft),
/// )?;
/// tree.set_size(panel, kurbo::Size::new(100.0, 50.0));
///
/// assert_eq!(tree.borders(panel), Rect::new(0.0, 0.0, 100.0, 50.0));
/// assert!(tree.is_ready(panel));
/// # Ok::<(), espalier_anchor::AnchorError>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_name: HashMap<String, WidgetId>,
    /// Widgets whose anchors wait on a name to register, keyed by the name.
    pub(crate) waiters: HashMap<String, SmallVec<[WidgetId; 2]>>,
    screen: Rect,
    redraws: Vec<WidgetId>,
    pub(crate) strips: Vec<CycleError>,
}

impl Tree {
    /// An empty tree with a zero screen rectangle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty tree whose absolute anchors resolve against `screen`.
    #[must_use]
    pub fn with_screen(screen: Rect) -> Self {
        Self {
            screen,
            ..Self::default()
        }
    }

    /// The number of live widgets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Whether the tree holds no live widgets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `id` refers to a live widget.
    #[must_use]
    pub fn is_alive(&self, id: WidgetId) -> bool {
        self.widget(id).is_some()
    }

    /// Iterates over every live widget handle.
    pub fn ids(&self) -> impl Iterator<Item = WidgetId> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let index = u32::try_from(index).ok()?;
            slot.widget
                .as_ref()
                .map(|_| WidgetId::new(index, slot.generation))
        })
    }

    pub(crate) fn widget(&self, id: WidgetId) -> Option<&Widget> {
        let slot = self.slots.get(id.idx())?;
        if slot.generation != id.1 {
            return None;
        }
        slot.widget.as_ref()
    }

    pub(crate) fn widget_mut(&mut self, id: WidgetId) -> Option<&mut Widget> {
        let slot = self.slots.get_mut(id.idx())?;
        if slot.generation != id.1 {
            return None;
        }
        slot.widget.as_mut()
    }

    /// A diagnostic label for `id`: its registered name, or `#<index>` for
    /// anonymous widgets.
    pub(crate) fn label(&self, id: WidgetId) -> String {
        match self.widget(id).and_then(|w| w.name.clone()) {
            Some(name) => name,
            None => format!("#{}", id.0),
        }
    }

    /// Inserts an anonymous widget, optionally owned by a tree parent.
    ///
    /// The parent exclusively owns the new widget: removing the parent
    /// removes it too. Tree parentage is independent of anchoring: a
    /// widget may anchor to widgets outside its parent chain.
    pub fn insert(&mut self, parent: Option<WidgetId>) -> WidgetId {
        self.insert_inner(None, parent)
    }

    /// Inserts a widget registered under `name`.
    ///
    /// Dormant anchors waiting on `name` wake up: their owners are marked
    /// for a dependency refresh and invalidated, so widgets may be declared
    /// in any order.
    ///
    /// # Errors
    ///
    /// Returns [`NameError`] if a live widget already holds `name`; nothing
    /// is inserted.
    pub fn insert_named(
        &mut self,
        name: &str,
        parent: Option<WidgetId>,
    ) -> Result<WidgetId, NameError> {
        if self.by_name.contains_key(name) {
            return Err(NameError {
                name: String::from(name),
            });
        }
        let id = self.insert_inner(Some(String::from(name)), parent);
        self.by_name.insert(String::from(name), id);
        self.wake_waiters(name);
        Ok(id)
    }

    fn insert_inner(&mut self, name: Option<String>, parent: Option<WidgetId>) -> WidgetId {
        debug_assert!(
            parent.is_none_or(|p| self.is_alive(p)),
            "insert under a dead parent"
        );
        let parent = parent.filter(|&p| self.is_alive(p));
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.widget = Some(Widget::new(name, parent));
                WidgetId::new(index, slot.generation)
            }
            None => {
                let index =
                    u32::try_from(self.slots.len()).expect("widget arena exceeds u32::MAX slots");
                self.slots.push(Slot {
                    generation: 0,
                    widget: Some(Widget::new(name, parent)),
                });
                WidgetId::new(index, 0)
            }
        };
        if let Some(parent) = parent {
            if let Some(widget) = self.widget_mut(parent) {
                widget.children.push(id);
            }
        }
        id
    }

    fn wake_waiters(&mut self, name: &str) {
        let Some(waiters) = self.waiters.remove(name) else {
            return;
        };
        for waiter in waiters {
            if let Some(widget) = self.widget_mut(waiter) {
                widget.anchors_dirty = true;
                self.invalidate(waiter);
            }
        }
    }

    /// The widget registered under `name`, if any.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<WidgetId> {
        self.by_name.get(name).copied()
    }

    /// The registered name of `id`.
    #[must_use]
    pub fn name(&self, id: WidgetId) -> Option<&str> {
        self.widget(id)?.name.as_deref()
    }

    /// The tree parent of `id`.
    #[must_use]
    pub fn parent(&self, id: WidgetId) -> Option<WidgetId> {
        self.widget(id)?.parent
    }

    /// The widgets owned by `id`.
    #[must_use]
    pub fn children(&self, id: WidgetId) -> &[WidgetId] {
        self.widget(id).map_or(&[], |w| w.children.as_slice())
    }

    /// The rectangle absolute anchors resolve against.
    #[must_use]
    pub fn screen(&self) -> Rect {
        self.screen
    }

    /// Replaces the screen rectangle, invalidating every live widget.
    ///
    /// No-op when the rectangle is unchanged. Anything may shift on a
    /// screen change (absolute anchors, screen-relative sizes, chains
    /// hanging off either), so this is the one full-population
    /// invalidation.
    pub fn set_screen(&mut self, screen: Rect) {
        if self.screen == screen {
            return;
        }
        self.screen = screen;
        let ids: Vec<WidgetId> = self.ids().collect();
        for id in ids {
            self.invalidate(id);
        }
    }

    /// Marks the geometry of `id`, and of every widget transitively
    /// anchored to it, as needing recomputation, and queues redraw
    /// notifications for all of them.
    ///
    /// Redraws are queued unconditionally: a declared-geometry change is
    /// assumed visually relevant before recomputation proves it. The walk
    /// short-circuits at widgets already marked dirty, so repeated
    /// invalidation stays cheap.
    pub fn invalidate(&mut self, id: WidgetId) {
        let mut stack: SmallVec<[WidgetId; 8]> = SmallVec::new();
        stack.push(id);
        while let Some(current) = stack.pop() {
            self.queue_redraw(current);
            let Some(widget) = self.widget_mut(current) else {
                continue;
            };
            if widget.borders_dirty {
                continue;
            }
            widget.borders_dirty = true;
            stack.extend(widget.anchored_by.iter().copied());
        }
    }

    pub(crate) fn queue_redraw(&mut self, id: WidgetId) {
        if let Some(widget) = self.widget_mut(id) {
            if !widget.queued_redraw {
                widget.queued_redraw = true;
                self.redraws.push(id);
            }
        }
    }

    /// Drains the widgets queued for redraw since the last drain.
    ///
    /// Each live widget appears at most once per drain cycle. The render
    /// collaborator is expected to call this once per frame and schedule
    /// redraws for the returned handles.
    pub fn take_redraws(&mut self) -> Vec<WidgetId> {
        let mut redraws = core::mem::take(&mut self.redraws);
        redraws.retain(|&id| self.is_alive(id));
        for &id in &redraws {
            if let Some(widget) = self.widget_mut(id) {
                widget.queued_redraw = false;
            }
        }
        redraws
    }

    /// Drains the diagnostics recorded when the dependency refresh stripped
    /// or skipped cycle-forming anchors.
    pub fn take_strips(&mut self) -> Vec<CycleError> {
        core::mem::take(&mut self.strips)
    }

    /// Declares an absolute width in pixels for `id`. Zero clears the
    /// declaration.
    pub fn set_width(&mut self, id: WidgetId, width: f64) {
        let Some(widget) = self.widget_mut(id) else {
            return;
        };
        if widget.width == width {
            return;
        }
        widget.width = width;
        self.invalidate(id);
    }

    /// Declares an absolute height in pixels for `id`. Zero clears the
    /// declaration.
    pub fn set_height(&mut self, id: WidgetId, height: f64) {
        let Some(widget) = self.widget_mut(id) else {
            return;
        };
        if widget.height == height {
            return;
        }
        widget.height = height;
        self.invalidate(id);
    }

    /// Declares both absolute dimensions at once.
    pub fn set_size(&mut self, id: WidgetId, size: Size) {
        self.set_width(id, size.width);
        self.set_height(id, size.height);
    }

    /// Declares the size of `id` as fractions of its tree parent's resolved
    /// dimensions (the screen's, for parentless widgets), recomputed at
    /// every resolution.
    ///
    /// The parent becomes a layout dependency: resizing it invalidates this
    /// widget, and anchor-cycle checks count the edge.
    ///
    /// # Errors
    ///
    /// Returns [`AnchorError::Cycle`] when the parent already depends on
    /// this widget through its own anchors; the declaration is not applied.
    pub fn set_rel_size(&mut self, id: WidgetId, fraction: Size) -> Result<(), AnchorError> {
        if !self.is_alive(id) {
            return Ok(());
        }
        if let Some(parent) = self.parent(id) {
            if self.depends_on(parent, id) {
                return Err(CycleError {
                    from: self.label(id),
                    to: self.label(parent),
                    point: None,
                }
                .into());
            }
        }
        let Some(widget) = self.widget_mut(id) else {
            return Ok(());
        };
        if widget.rel_size == Some(fraction) {
            return Ok(());
        }
        widget.rel_size = Some(fraction);
        widget.anchors_dirty = true;
        self.invalidate(id);
        Ok(())
    }

    /// Removes a relative-size declaration from `id`.
    pub fn clear_rel_size(&mut self, id: WidgetId) {
        let Some(widget) = self.widget_mut(id) else {
            return;
        };
        if widget.rel_size.take().is_some() {
            widget.anchors_dirty = true;
            self.invalidate(id);
        }
    }

    /// Commits `anchor` on widget `id`, replacing whatever occupies that
    /// anchor point's slot.
    ///
    /// Targets named after widgets that do not exist yet are accepted and
    /// stay dormant until the name registers ([`insert_named`]); dormant
    /// anchors contribute nothing to resolution.
    ///
    /// # Errors
    ///
    /// [`AnchorError::SelfAnchor`] when the target is `id` itself (by handle
    /// or by registered name), and [`AnchorError::Cycle`] when the target's
    /// dependency chain reaches back to `id`. A rejected commit leaves the
    /// previous anchor at that slot untouched.
    ///
    /// [`insert_named`]: Self::insert_named
    pub fn set_anchor(&mut self, id: WidgetId, anchor: Anchor) -> Result<(), AnchorError> {
        if !self.is_alive(id) {
            return Ok(());
        }
        self.guard_target(id, anchor.point, &anchor.target)?;
        let slot = anchor.point.slot();
        if let Some(widget) = self.widget_mut(id) {
            widget.anchors[slot] = Some(anchor);
        }
        self.note_anchors_changed(id);
        Ok(())
    }

    /// Clears all anchors of `id`, then anchors its `TopLeft` and
    /// `BottomRight` to the same points on `target` with zero offsets, the
    /// common "fill the target" case.
    ///
    /// # Errors
    ///
    /// As for [`set_anchor`](Self::set_anchor). Validation runs before
    /// anything is cleared, so a rejected call leaves the widget untouched.
    pub fn set_all_points(
        &mut self,
        id: WidgetId,
        target: impl Into<AnchorTarget>,
    ) -> Result<(), AnchorError> {
        if !self.is_alive(id) {
            return Ok(());
        }
        let target = target.into();
        self.guard_target(id, AnchorPoint::TopLeft, &target)?;
        if let Some(widget) = self.widget_mut(id) {
            widget.anchors = [const { None }; 9];
            widget.anchors[AnchorPoint::TopLeft.slot()] = Some(Anchor::abs(
                AnchorPoint::TopLeft,
                target.clone(),
                AnchorPoint::TopLeft,
            ));
            widget.anchors[AnchorPoint::BottomRight.slot()] = Some(Anchor::abs(
                AnchorPoint::BottomRight,
                target,
                AnchorPoint::BottomRight,
            ));
        }
        self.note_anchors_changed(id);
        Ok(())
    }

    /// Removes every anchor from `id`.
    pub fn clear_anchors(&mut self, id: WidgetId) {
        let Some(widget) = self.widget_mut(id) else {
            return;
        };
        if widget.anchors.iter().all(Option::is_none) {
            return;
        }
        widget.anchors = [const { None }; 9];
        self.note_anchors_changed(id);
    }

    /// The anchor occupying `point` on `id`, if any.
    #[must_use]
    pub fn anchor(&self, id: WidgetId, point: AnchorPoint) -> Option<&Anchor> {
        self.widget(id)?.anchors[point.slot()].as_ref()
    }

    /// How many of the nine anchor slots of `id` are occupied.
    #[must_use]
    pub fn anchor_count(&self, id: WidgetId) -> usize {
        self.widget(id)
            .map_or(0, |w| w.anchors.iter().flatten().count())
    }

    /// Which rectangle edges the current anchors of `id` pin.
    #[must_use]
    pub fn defined_edges(&self, id: WidgetId) -> Edges {
        self.widget(id).map_or(Edges::empty(), |w| w.defined)
    }

    /// Whether the borders of `id` are stale, i.e. whether the next
    /// geometry read will recompute them.
    #[must_use]
    pub fn needs_resolve(&self, id: WidgetId) -> bool {
        self.widget(id).is_some_and(|w| w.borders_dirty)
    }

    /// Copies the layout declaration of `src` onto `dst`: every anchor
    /// (re-validated against `dst`) plus the declared absolute and relative
    /// size.
    ///
    /// Anchors whose target chain reaches `dst` are skipped and recorded as
    /// [`CycleError`] diagnostics ([`take_strips`](Self::take_strips))
    /// rather than failing the whole copy. No-op when `dst == src` or
    /// either handle is dead.
    pub fn copy_layout_from(&mut self, dst: WidgetId, src: WidgetId) {
        if dst == src || !self.is_alive(dst) {
            return;
        }
        let Some(source) = self.widget(src) else {
            return;
        };
        let anchors = source.anchors.clone();
        let width = source.width;
        let height = source.height;
        let rel_size = source.rel_size;

        if let Some(widget) = self.widget_mut(dst) {
            widget.anchors = [const { None }; 9];
            widget.width = width;
            widget.height = height;
        }
        for anchor in anchors.into_iter().flatten() {
            match self.guard_target(dst, anchor.point, &anchor.target) {
                Ok(()) => {
                    let slot = anchor.point.slot();
                    if let Some(widget) = self.widget_mut(dst) {
                        widget.anchors[slot] = Some(anchor);
                    }
                }
                Err(AnchorError::Cycle(err)) => self.strips.push(err),
                Err(AnchorError::SelfAnchor { widget, point }) => self.strips.push(CycleError {
                    from: widget.clone(),
                    to: widget,
                    point: Some(point),
                }),
            }
        }
        self.note_anchors_changed(dst);
        match rel_size {
            Some(fraction) => {
                if let Err(AnchorError::Cycle(err)) = self.set_rel_size(dst, fraction) {
                    self.strips.push(err);
                }
            }
            None => self.clear_rel_size(dst),
        }
    }

    /// Removes `id` and, children first, every widget it owns.
    ///
    /// Surviving widgets anchored to anything being removed have those
    /// anchors rewritten to absolute screen anchors that preserve their
    /// current resolved position: removal never visibly moves a dependent,
    /// only its anchor representation changes.
    pub fn remove(&mut self, id: WidgetId) {
        if !self.is_alive(id) {
            return;
        }
        let mut doomed: Vec<WidgetId> = Vec::new();
        self.collect_subtree(id, &mut doomed);

        // Dependents must be detached while the dying geometry is still
        // resolvable.
        for index in 0..doomed.len() {
            self.detach_dependents(doomed[index], &doomed);
        }

        if let Some(parent) = self.parent(id) {
            if let Some(widget) = self.widget_mut(parent) {
                widget.children.retain(|child| *child != id);
            }
        }

        for index in 0..doomed.len() {
            self.free_slot(doomed[index]);
        }
    }

    fn collect_subtree(&self, id: WidgetId, out: &mut Vec<WidgetId>) {
        for &child in self.children(id) {
            self.collect_subtree(child, out);
        }
        out.push(id);
    }

    /// Rewrites every surviving dependent's anchors on `dying` to absolute
    /// screen anchors at the position they currently resolve to.
    fn detach_dependents(&mut self, dying: WidgetId, doomed: &[WidgetId]) {
        let dependents: SmallVec<[WidgetId; 4]> = match self.widget(dying) {
            Some(widget) => widget.anchored_by.clone(),
            None => return,
        };
        if dependents.is_empty() {
            return;
        }
        let screen_origin = self.screen.origin();
        let rect = self.borders(dying);
        let size = Size::new(rect.width(), rect.height());
        for dependent in dependents {
            if doomed.contains(&dependent) || !self.is_alive(dependent) {
                continue;
            }
            let mut rewrote = false;
            for point in AnchorPoint::ALL {
                let Some(anchor) = self.anchor(dependent, point).cloned() else {
                    continue;
                };
                if self.anchor_target_id(&anchor) != Some(dying) {
                    continue;
                }
                let absolute = point_on_rect(rect, anchor.target_point) + anchor.offset.to_px(size);
                if let Some(widget) = self.widget_mut(dependent) {
                    widget.anchors[point.slot()] = Some(Anchor {
                        point,
                        target: AnchorTarget::Screen,
                        target_point: AnchorPoint::TopLeft,
                        offset: AnchorOffset::Px(absolute - screen_origin),
                    });
                    rewrote = true;
                }
            }
            if rewrote {
                self.note_anchors_changed(dependent);
            }
        }
    }

    fn free_slot(&mut self, id: WidgetId) {
        let deps: SmallVec<[WidgetId; 4]> = match self.widget(id) {
            Some(widget) => widget.deps.clone(),
            None => return,
        };
        for dep in deps {
            if let Some(widget) = self.widget_mut(dep) {
                widget.anchored_by.retain(|dependent| *dependent != id);
            }
        }
        let Some(slot) = self.slots.get_mut(id.idx()) else {
            return;
        };
        if slot.generation != id.1 {
            return;
        }
        let widget = slot.widget.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.0);
        if let Some(name) = widget.and_then(|w| w.name) {
            self.by_name.remove(&name);
        }
    }

    /// Recomputes the defined-edges mask after an anchor-set change, marks
    /// the dependency set for a refresh, and invalidates.
    pub(crate) fn note_anchors_changed(&mut self, id: WidgetId) {
        let Some(widget) = self.widget_mut(id) else {
            return;
        };
        let mut defined = Edges::empty();
        for anchor in widget.anchors.iter().flatten() {
            defined |= anchor.point.edges();
        }
        widget.defined = defined;
        widget.anchors_dirty = true;
        self.invalidate(id);
    }
}
