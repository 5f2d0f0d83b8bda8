//! Pointer-driven drag reorder.
//!
//! `DragReorderController` turns begin/update/end pointer events into at
//! most one index move. It never touches the DOM: the host passes sibling
//! bounding boxes with every update. Target indices use the post-removal
//! convention of [`ContentDocumentModel::move_block`], so a committed drag
//! is exactly one `move_item(source, target)` call.

use std::time::{Duration, Instant};

use tessera_sdk::BlockId;
use tracing::debug;

use crate::content::ContentDocumentModel;
use crate::error::ContentResult;

/// Default recompute interval: one frame at 60 Hz.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Element bounds in the host's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Midpoint along `axis`.
    pub fn midpoint(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Vertical => self.y + self.height / 2.0,
            Axis::Horizontal => self.x + self.width / 2.0,
        }
    }
}

/// Direction items are laid out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Axis {
    /// Stacked top to bottom (blocks, table rows).
    #[default]
    Vertical,
    /// Side by side (table columns).
    Horizontal,
}

impl Axis {
    fn coord(self, point: Point) -> f64 {
        match self {
            Axis::Vertical => point.y,
            Axis::Horizontal => point.x,
        }
    }
}

/// One sibling as currently laid out, in list order.
#[derive(Debug, Clone, PartialEq)]
pub struct Sibling<Id> {
    pub id: Id,
    pub bounds: BoundingBox,
}

impl<Id> Sibling<Id> {
    pub fn new(id: Id, bounds: BoundingBox) -> Self {
        Self { id, bounds }
    }
}

/// A list whose items can be moved by id.
pub trait Reorderable<Id> {
    /// Current index of `id`, if present.
    fn position_of(&self, id: &Id) -> Option<usize>;

    /// Move `id` to `to_index` in the resulting list.
    fn move_item(&mut self, id: &Id, to_index: usize) -> ContentResult<()>;
}

impl Reorderable<BlockId> for ContentDocumentModel {
    fn position_of(&self, id: &BlockId) -> Option<usize> {
        self.index_of(id)
    }

    fn move_item(&mut self, id: &BlockId, to_index: usize) -> ContentResult<()> {
        self.move_block(id, to_index)
    }
}

/// Move `items[from]` so it ends up at `to`, shifting the items between.
///
/// Both indices must be in bounds.
pub fn move_in_place<T>(items: &mut [T], from: usize, to: usize) {
    if from < to {
        items[from..=to].rotate_left(1);
    } else if to < from {
        items[to..=from].rotate_right(1);
    }
}

/// Controller state. `Committing` and `Cancelled` are left on `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Dragging,
    Committing,
    Cancelled,
}

/// Transient state of one drag interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession<Id> {
    pub source_id: Id,
    pub source_index: usize,
    pub current_target_index: usize,
    pub pointer_origin: Point,
    pub pointer_offset: Point,
    /// Whether a target has been computed since `begin`.
    pub updated: bool,
}

/// What `end` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome<Id> {
    /// The item was moved once.
    Moved { id: Id, from: usize, to: usize },
    /// Committed, but the target equals the source (or no update arrived).
    Unchanged,
    /// Dropped outside, cancelled, or the source disappeared.
    Cancelled,
    /// `end` called with no drag in progress.
    NotDragging,
}

#[derive(Debug, Clone)]
struct PendingUpdate<Id> {
    pointer: Point,
    siblings: Vec<Sibling<Id>>,
}

/// Drag state machine: Idle -> Dragging -> (Committing | Cancelled) -> Idle.
#[derive(Debug)]
pub struct DragReorderController<Id> {
    axis: Axis,
    throttle: Duration,
    phase: DragPhase,
    session: Option<DragSession<Id>>,
    pending: Option<PendingUpdate<Id>>,
    last_recompute: Option<Instant>,
}

impl<Id: Clone + PartialEq + std::fmt::Debug> DragReorderController<Id> {
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            throttle: DEFAULT_THROTTLE,
            phase: DragPhase::Idle,
            session: None,
            pending: None,
            last_recompute: None,
        }
    }

    /// Set the minimum interval between target recomputations.
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&DragSession<Id>> {
        self.session.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.phase == DragPhase::Dragging
    }

    /// Pointer displacement since `begin`, for drawing the drag ghost.
    pub fn pointer_offset(&self) -> Option<Point> {
        self.session.as_ref().map(|s| s.pointer_offset)
    }

    /// Start a drag. Returns false (and does nothing) if one is in progress.
    pub fn begin(&mut self, source_id: Id, source_index: usize, pointer: Point) -> bool {
        if self.phase == DragPhase::Dragging {
            return false;
        }
        debug!(source = ?source_id, source_index, "drag started");
        self.session = Some(DragSession {
            source_id,
            source_index,
            current_target_index: source_index,
            pointer_origin: pointer,
            pointer_offset: Point::default(),
            updated: false,
        });
        self.pending = None;
        self.last_recompute = None;
        self.phase = DragPhase::Dragging;
        true
    }

    /// Feed a pointer move. Returns the current target index while dragging.
    pub fn update(&mut self, pointer: Point, siblings: &[Sibling<Id>]) -> Option<usize> {
        self.update_at(pointer, siblings, Instant::now())
    }

    /// [`update`](Self::update) with an explicit clock reading.
    pub fn update_at(
        &mut self,
        pointer: Point,
        siblings: &[Sibling<Id>],
        now: Instant,
    ) -> Option<usize> {
        if self.phase != DragPhase::Dragging {
            return None;
        }
        if let Some(session) = self.session.as_mut() {
            session.pointer_offset = pointer - session.pointer_origin;
        }

        let throttled = self
            .last_recompute
            .is_some_and(|last| now.saturating_duration_since(last) < self.throttle);
        if throttled {
            // Keep only the latest skipped update; end() applies it.
            self.pending = Some(PendingUpdate {
                pointer,
                siblings: siblings.to_vec(),
            });
        } else {
            self.pending = None;
            self.last_recompute = Some(now);
            self.recompute(pointer, siblings);
        }
        self.current_target()
    }

    /// Apply a throttled update now. Hosts call this once per frame.
    pub fn flush(&mut self) -> Option<usize> {
        self.flush_at(Instant::now())
    }

    pub fn flush_at(&mut self, now: Instant) -> Option<usize> {
        if let Some(pending) = self.pending.take()
            && self.phase == DragPhase::Dragging
        {
            self.last_recompute = Some(now);
            self.recompute(pending.pointer, &pending.siblings);
        }
        self.current_target()
    }

    fn current_target(&self) -> Option<usize> {
        match self.phase {
            DragPhase::Dragging => self.session.as_ref().map(|s| s.current_target_index),
            _ => None,
        }
    }

    fn recompute(&mut self, pointer: Point, siblings: &[Sibling<Id>]) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        if !siblings.iter().any(|s| s.id == session.source_id) {
            debug!(source = ?session.source_id, "drag source disappeared; cancelling");
            self.phase = DragPhase::Cancelled;
            self.pending = None;
            return;
        }

        let coord = self.axis.coord(pointer);
        let mut before = 0;
        let mut on = 0;
        for sibling in siblings.iter().filter(|s| s.id != session.source_id) {
            let mid = sibling.bounds.midpoint(self.axis);
            if mid < coord {
                before += 1;
            } else if mid == coord {
                on += 1;
            }
        }

        // Sitting on a midpoint leaves a range of valid targets; stay as
        // close to the current one as possible.
        session.current_target_index = session.current_target_index.clamp(before, before + on);
        session.updated = true;
    }

    /// Finish the drag. On commit, moves the source at most once.
    pub fn end(
        &mut self,
        commit: bool,
        target: &mut impl Reorderable<Id>,
    ) -> ContentResult<DragOutcome<Id>> {
        match self.phase {
            DragPhase::Idle => return Ok(DragOutcome::NotDragging),
            DragPhase::Cancelled | DragPhase::Committing => {
                self.reset();
                return Ok(DragOutcome::Cancelled);
            }
            DragPhase::Dragging => {}
        }

        // The last update decides the target, even if it was throttled.
        if let Some(pending) = self.pending.take() {
            self.recompute(pending.pointer, &pending.siblings);
        }
        if self.phase == DragPhase::Cancelled || !commit {
            self.phase = DragPhase::Cancelled;
            debug!("drag cancelled");
            self.reset();
            return Ok(DragOutcome::Cancelled);
        }

        let Some(session) = self.session.take() else {
            self.reset();
            return Ok(DragOutcome::NotDragging);
        };
        self.phase = DragPhase::Committing;

        let Some(from) = target.position_of(&session.source_id) else {
            debug!(source = ?session.source_id, "drag source gone at drop; cancelling");
            self.reset();
            return Ok(DragOutcome::Cancelled);
        };
        let to = session.current_target_index;
        if !session.updated || to == from {
            self.reset();
            return Ok(DragOutcome::Unchanged);
        }

        let result = target.move_item(&session.source_id, to);
        self.reset();
        result?;
        debug!(source = ?session.source_id, from, to, "drag committed");
        Ok(DragOutcome::Moved {
            id: session.source_id,
            from,
            to,
        })
    }

    /// Abandon the drag without mutating anything. Returns false when idle.
    pub fn cancel(&mut self) -> bool {
        if self.phase == DragPhase::Idle {
            return false;
        }
        debug!("drag cancelled");
        self.reset();
        true
    }

    /// Cancel if `id` is the item being dragged.
    pub fn cancel_if_source(&mut self, id: &Id) -> bool {
        if self.session.as_ref().is_some_and(|s| &s.source_id == id) {
            self.cancel()
        } else {
            false
        }
    }

    /// Mid-drag visual order: `ids` with the source shown at the target.
    pub fn preview_order(&self, ids: &[Id]) -> Vec<Id> {
        let mut order = ids.to_vec();
        let Some(session) = self.session.as_ref().filter(|_| self.is_dragging()) else {
            return order;
        };
        if let Some(from) = order.iter().position(|id| *id == session.source_id) {
            let to = session.current_target_index.min(order.len() - 1);
            move_in_place(&mut order, from, to);
        }
        order
    }

    fn reset(&mut self) {
        self.phase = DragPhase::Idle;
        self.session = None;
        self.pending = None;
        self.last_recompute = None;
    }
}

impl<Id: Clone + PartialEq + std::fmt::Debug> Default for DragReorderController<Id> {
    fn default() -> Self {
        Self::new(Axis::Vertical)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::ContentError;

    /// Plain list of ids for exercising the controller alone.
    #[derive(Debug, Default)]
    struct Items {
        ids: Vec<&'static str>,
        moves: usize,
    }

    impl Reorderable<&'static str> for Items {
        fn position_of(&self, id: &&'static str) -> Option<usize> {
            self.ids.iter().position(|i| i == id)
        }

        fn move_item(&mut self, id: &&'static str, to_index: usize) -> ContentResult<()> {
            let from = self.position_of(id).ok_or(ContentError::IndexOutOfRange {
                index: to_index,
                len: self.ids.len(),
            })?;
            move_in_place(&mut self.ids, from, to_index);
            self.moves += 1;
            Ok(())
        }
    }

    fn items() -> Items {
        Items {
            ids: vec!["a", "b", "c", "d"],
            moves: 0,
        }
    }

    /// Rows of height 10 stacked from y = 0.
    fn rows(ids: &[&'static str]) -> Vec<Sibling<&'static str>> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| Sibling::new(*id, BoundingBox::new(0.0, i as f64 * 10.0, 100.0, 10.0)))
            .collect()
    }

    fn controller() -> DragReorderController<&'static str> {
        DragReorderController::new(Axis::Vertical).with_throttle(Duration::ZERO)
    }

    #[test]
    fn drag_first_to_index_two_commits_once() {
        let mut list = items();
        let mut drag = controller();
        assert!(drag.begin("a", 0, Point::new(50.0, 5.0)));
        // Past b (mid 15) and c (mid 25), before d (mid 35)
        assert_eq!(drag.update(Point::new(50.0, 27.0), &rows(&list.ids)), Some(2));
        let outcome = drag.end(true, &mut list).unwrap();
        assert_eq!(
            outcome,
            DragOutcome::Moved {
                id: "a",
                from: 0,
                to: 2
            }
        );
        assert_eq!(list.ids, ["b", "c", "a", "d"]);
        assert_eq!(list.moves, 1);
        assert_eq!(drag.phase(), DragPhase::Idle);
    }

    #[test]
    fn cancelled_drag_leaves_order() {
        let mut list = items();
        let mut drag = controller();
        drag.begin("a", 0, Point::new(50.0, 5.0));
        drag.update(Point::new(50.0, 27.0), &rows(&list.ids));
        assert_eq!(drag.end(false, &mut list).unwrap(), DragOutcome::Cancelled);
        assert_eq!(list.ids, ["a", "b", "c", "d"]);
        assert_eq!(list.moves, 0);
    }

    #[test]
    fn end_without_update_is_noop() {
        let mut list = items();
        let mut drag = controller();
        drag.begin("b", 1, Point::new(0.0, 15.0));
        assert_eq!(drag.end(true, &mut list).unwrap(), DragOutcome::Unchanged);
        assert_eq!(list.moves, 0);
    }

    #[test]
    fn end_when_idle() {
        let mut drag = controller();
        assert_eq!(drag.end(true, &mut items()).unwrap(), DragOutcome::NotDragging);
    }

    #[test]
    fn begin_while_dragging_is_ignored() {
        let mut drag = controller();
        assert!(drag.begin("a", 0, Point::default()));
        assert!(!drag.begin("b", 1, Point::default()));
        assert_eq!(drag.session().unwrap().source_id, "a");
    }

    #[test]
    fn drag_upwards() {
        let mut list = items();
        let mut drag = controller();
        drag.begin("d", 3, Point::new(0.0, 35.0));
        // Above a's midpoint
        assert_eq!(drag.update(Point::new(0.0, 2.0), &rows(&list.ids)), Some(0));
        drag.end(true, &mut list).unwrap();
        assert_eq!(list.ids, ["d", "a", "b", "c"]);
    }

    #[test]
    fn tie_on_midpoint_keeps_current_target() {
        let list = items();
        let mut drag = controller();
        drag.begin("b", 1, Point::new(0.0, 15.0));
        // Exactly on a's midpoint: targets 0 and 1 are both valid
        assert_eq!(drag.update(Point::new(0.0, 5.0), &rows(&list.ids)), Some(1));
        // Exactly on c's midpoint: 1 and 2 are valid, 1 is closer
        assert_eq!(drag.update(Point::new(0.0, 25.0), &rows(&list.ids)), Some(1));
        // Past c, then back onto c's midpoint: stays at 2
        assert_eq!(drag.update(Point::new(0.0, 26.0), &rows(&list.ids)), Some(2));
        assert_eq!(drag.update(Point::new(0.0, 25.0), &rows(&list.ids)), Some(2));
    }

    #[test]
    fn missing_source_cancels() {
        let mut list = items();
        let mut drag = controller();
        drag.begin("a", 0, Point::default());
        drag.update(Point::new(0.0, 30.0), &rows(&["b", "c", "d"]));
        assert_eq!(drag.phase(), DragPhase::Cancelled);
        assert_eq!(drag.update(Point::new(0.0, 30.0), &rows(&list.ids)), None);
        assert_eq!(drag.end(true, &mut list).unwrap(), DragOutcome::Cancelled);
        assert_eq!(list.moves, 0);
        assert_eq!(drag.phase(), DragPhase::Idle);
    }

    #[test]
    fn source_removed_before_drop_cancels() {
        let mut list = items();
        let mut drag = controller();
        drag.begin("a", 0, Point::default());
        drag.update(Point::new(0.0, 27.0), &rows(&list.ids));
        list.ids.remove(0);
        assert_eq!(drag.end(true, &mut list).unwrap(), DragOutcome::Cancelled);
        assert_eq!(list.ids, ["b", "c", "d"]);
    }

    #[test]
    fn throttled_update_is_applied_before_end() {
        let mut list = items();
        let mut drag = DragReorderController::new(Axis::Vertical)
            .with_throttle(Duration::from_millis(16));
        let t0 = Instant::now();
        drag.begin("a", 0, Point::default());
        assert_eq!(drag.update_at(Point::new(0.0, 17.0), &rows(&list.ids), t0), Some(1));
        // Within the same frame: recorded, not recomputed
        let t1 = t0 + Duration::from_millis(4);
        assert_eq!(drag.update_at(Point::new(0.0, 39.0), &rows(&list.ids), t1), Some(1));
        // The final throttled update still decides the drop
        drag.end(true, &mut list).unwrap();
        assert_eq!(list.ids, ["b", "c", "d", "a"]);
    }

    #[test]
    fn flush_applies_pending_update() {
        let list = items();
        let mut drag = DragReorderController::new(Axis::Vertical)
            .with_throttle(Duration::from_millis(16));
        let t0 = Instant::now();
        drag.begin("a", 0, Point::default());
        drag.update_at(Point::new(0.0, 17.0), &rows(&list.ids), t0);
        drag.update_at(Point::new(0.0, 27.0), &rows(&list.ids), t0 + Duration::from_millis(1));
        assert_eq!(drag.flush_at(t0 + Duration::from_millis(16)), Some(2));
        // Next frame recomputes immediately
        assert_eq!(
            drag.update_at(Point::new(0.0, 2.0), &rows(&list.ids), t0 + Duration::from_millis(40)),
            Some(0)
        );
    }

    #[test]
    fn horizontal_axis_uses_x() {
        let cols: Vec<_> = (0..3usize)
            .map(|i| Sibling::new(i, BoundingBox::new(i as f64 * 50.0, 0.0, 50.0, 20.0)))
            .collect();
        let mut drag = DragReorderController::new(Axis::Horizontal).with_throttle(Duration::ZERO);
        drag.begin(0usize, 0, Point::new(10.0, 10.0));
        assert_eq!(drag.update(Point::new(130.0, 500.0), &cols), Some(2));
        assert_eq!(drag.pointer_offset(), Some(Point::new(120.0, 490.0)));
    }

    #[test]
    fn preview_order_shows_source_at_target() {
        let list = items();
        let mut drag = controller();
        assert_eq!(drag.preview_order(&list.ids), ["a", "b", "c", "d"]);
        drag.begin("a", 0, Point::default());
        drag.update(Point::new(0.0, 27.0), &rows(&list.ids));
        assert_eq!(drag.preview_order(&list.ids), ["b", "c", "a", "d"]);
        drag.cancel();
        assert_eq!(drag.preview_order(&list.ids), ["a", "b", "c", "d"]);
    }

    #[test]
    fn cancel_if_source_matches_only_source() {
        let mut drag = controller();
        drag.begin("a", 0, Point::default());
        assert!(!drag.cancel_if_source(&"b"));
        assert!(drag.is_dragging());
        assert!(drag.cancel_if_source(&"a"));
        assert_eq!(drag.phase(), DragPhase::Idle);
        assert!(!drag.cancel());
    }

    #[test]
    fn move_in_place_both_directions() {
        let mut v = vec![1, 2, 3, 4];
        move_in_place(&mut v, 0, 2);
        assert_eq!(v, [2, 3, 1, 4]);
        move_in_place(&mut v, 3, 0);
        assert_eq!(v, [4, 2, 3, 1]);
        move_in_place(&mut v, 1, 1);
        assert_eq!(v, [4, 2, 3, 1]);
    }
}
