//! Snapping a dragged bounding box so it sits at equal distances from its
//! neighbours.

use super::candidate::{SnapCandidatePoint, SnapSourceType, SnapTargetType};
use super::collector::CandidateCollector;
use super::preferences::is_always_snap;
use super::results::{DistributionInfo, IntermSnapResults, SnappedPoint};
use super::{SnapEnv, Snapper, private};
use crate::document::BBoxKind;
use crate::geom::{SnapConstraint, rects_intersect};
use kurbo::{Point, Rect, Vec2};

/// Gaps further along a run must match to within this, times the run depth.
const DISTRIBUTION_EPSILON: f64 = 5e-5;

/// Longest run of equally spaced boxes that is followed.
const MAX_RUN_DEPTH: usize = 10;

/// Gap from the first box to the second in one direction.
type GapFn = fn(&Rect, &Rect) -> f64;

fn gap_right(a: &Rect, b: &Rect) -> f64 {
    b.x0 - a.x1
}

fn gap_left(a: &Rect, b: &Rect) -> f64 {
    a.x0 - b.x1
}

fn gap_up(a: &Rect, b: &Rect) -> f64 {
    a.y0 - b.y1
}

fn gap_down(a: &Rect, b: &Rect) -> f64 {
    b.y0 - a.y1
}

fn same_gap(a: f64, b: f64) -> bool {
    (a - b).abs() < DISTRIBUTION_EPSILON
}

/// Neighbouring boxes on each side of the dragged box, nearest first.
#[derive(Debug, Default)]
struct Neighbours {
    right: Vec<Rect>,
    left: Vec<Rect>,
    up: Vec<Rect>,
    down: Vec<Rect>,
}

impl Neighbours {
    fn collect(env: &SnapEnv<'_>, collector: &CandidateCollector<'_>, dragged: Rect) -> Self {
        let kind = if env.prefs.visual_bbox {
            BBoxKind::Visual
        } else {
            BBoxKind::Geometric
        };
        let display = env.display_area();
        let extent = display.width().max(display.height());
        let x_band = dragged.inflate(extent, 0.0);
        let y_band = dragged.inflate(0.0, extent);

        let mut neighbours = Neighbours::default();
        for candidate in collector.align_candidates() {
            if candidate.is_clip_or_mask() {
                continue;
            }
            let Some(bbox) = candidate.item.bounds(kind, candidate.parent_to_doc) else {
                continue;
            };
            if rects_intersect(bbox, dragged) {
                continue;
            }
            let diff = bbox.center() - dragged.center();
            if rects_intersect(x_band, bbox) {
                if diff.x > 0.0 {
                    neighbours.right.push(bbox);
                } else {
                    neighbours.left.push(bbox);
                }
            } else if rects_intersect(y_band, bbox) {
                if diff.y < 0.0 {
                    neighbours.up.push(bbox);
                } else {
                    neighbours.down.push(bbox);
                }
            }
        }

        neighbours.right.sort_by(|a, b| a.center().x.total_cmp(&b.center().x));
        neighbours.left.sort_by(|a, b| b.center().x.total_cmp(&a.center().x));
        neighbours.up.sort_by(|a, b| b.center().y.total_cmp(&a.center().y));
        neighbours.down.sort_by(|a, b| a.center().y.total_cmp(&b.center().y));
        for side in [
            &mut neighbours.right,
            &mut neighbours.left,
            &mut neighbours.up,
            &mut neighbours.down,
        ] {
            merge_intersecting(side);
        }
        neighbours
    }
}

/// Put the union of every run of overlapping neighbours in front of the run,
/// so a cluster of boxes can act as one.
fn merge_intersecting(boxes: &mut Vec<Rect>) {
    let mut merged = Vec::with_capacity(boxes.len());
    let mut start = 0;
    while start < boxes.len() {
        let mut end = start;
        let mut union = boxes[start];
        while end + 1 < boxes.len() && rects_intersect(boxes[end], boxes[end + 1]) {
            union = union.union(boxes[end + 1]);
            end += 1;
        }
        if end > start {
            merged.push(union);
        }
        merged.extend_from_slice(&boxes[start..=end]);
        start = end + 1;
    }
    *boxes = merged;
}

/// The longest run of equally spaced boxes next to `source`, and its gap.
///
/// The gap between the first two boxes of the run only has to be within
/// `tolerance` of the gap between `source` and the first box; every further
/// gap has to match exactly.
fn find_equal_gaps(source: Rect, boxes: &[Rect], gap: GapFn, tolerance: f64) -> Option<(Vec<Rect>, f64)> {
    let mut best: Option<(Vec<Rect>, f64)> = None;
    for i in 0..boxes.len().saturating_sub(1) {
        let first_gap = gap(&source, &boxes[i]);
        let rest = &boxes[i + 1..];
        let Some((j, equal)) = rest
            .iter()
            .map(|next| gap(&boxes[i], next))
            .enumerate()
            .find(|(_, g)| (g - first_gap).abs() < tolerance)
        else {
            continue;
        };
        let mut run = vec![boxes[i], rest[j]];
        extend_run(&mut run, &rest[j + 1..], gap, equal, 2);
        if best.as_ref().is_none_or(|(b, _)| run.len() > b.len()) {
            best = Some((run, equal));
        }
    }
    best
}

fn extend_run(run: &mut Vec<Rect>, remaining: &[Rect], gap: GapFn, equal: f64, depth: usize) {
    if depth > MAX_RUN_DEPTH {
        return;
    }
    let Some(&last) = run.last() else {
        return;
    };
    let epsilon = depth as f64 * DISTRIBUTION_EPSILON;
    if let Some(k) = remaining.iter().position(|next| (gap(&last, next) - equal).abs() < epsilon) {
        run.push(remaining[k]);
        extend_run(run, &remaining[k + 1..], gap, equal, depth + 1);
    }
}

/// A distribution match along one axis.
#[derive(Debug, Clone)]
struct AxisSnap {
    /// Translation of the dragged box.
    delta: Vec2,
    equal: f64,
    bboxes: Vec<Rect>,
    moved: Rect,
    target: SnapTargetType,
}

/// One axis of the search: the two sides and their gap functions.
struct Axis<'n> {
    forward: &'n [Rect],
    backward: &'n [Rect],
    gap_forward: GapFn,
    gap_backward: GapFn,
    /// Unit vector pointing towards the forward side.
    unit: Vec2,
    targets: [SnapTargetType; 3],
}

impl Axis<'_> {
    fn component(&self, v: Vec2) -> f64 {
        v.dot(self.unit)
    }

    /// Equal spacing against the forward side, then the backward side, then
    /// centered between the nearest box on each side.
    fn snap(&self, dragged: Rect, tolerance: f64) -> Option<AxisSnap> {
        if let Some(snap) = self.snap_side(dragged, tolerance, true) {
            return Some(snap);
        }
        if let Some(snap) = self.snap_side(dragged, tolerance, false) {
            return Some(snap);
        }

        let (&near_forward, &near_backward) = (self.forward.first()?, self.backward.first()?);
        // Middle of the space between the two neighbours, along this axis
        let gap = (self.gap_forward)(&near_backward, &near_forward);
        let start = (self.gap_backward)(&dragged, &near_backward);
        let width = self.component(Vec2::new(dragged.width(), dragged.height()));
        let shift = (gap - width) / 2.0 - start;
        if shift.abs() > tolerance {
            return None;
        }
        let delta = self.unit * shift;
        let moved = dragged + delta;
        Some(AxisSnap {
            delta,
            equal: (self.gap_backward)(&moved, &near_backward),
            bboxes: vec![near_backward, moved, near_forward],
            moved,
            target: self.targets[2],
        })
    }

    fn snap_side(&self, dragged: Rect, tolerance: f64, forward: bool) -> Option<AxisSnap> {
        let (near, far, gap_near, gap_far, target) = if forward {
            (self.forward, self.backward, self.gap_forward, self.gap_backward, self.targets[0])
        } else {
            (self.backward, self.forward, self.gap_backward, self.gap_forward, self.targets[1])
        };
        let (run, equal) = find_equal_gaps(dragged, near, gap_near, tolerance)?;
        let first = gap_near(&dragged, &run[0]);
        let sign = if forward { 1.0 } else { -1.0 };
        let delta = self.unit * (sign * (first - equal));
        let moved = dragged + delta;

        // Boxes on the other side that continue the spacing
        let mut continuation: Vec<Rect> = Vec::new();
        if let Some(&nearest_far) = far.first() {
            match find_equal_gaps(dragged, far, gap_far, tolerance) {
                Some((far_run, far_equal)) => {
                    if same_gap(far_equal, equal) {
                        continuation = far_run;
                    }
                }
                None => {
                    if same_gap(gap_far(&moved, &nearest_far), equal) {
                        continuation.push(nearest_far);
                    }
                }
            }
        }

        // Order the boxes along the axis, backward side first
        let mut bboxes: Vec<Rect> = Vec::with_capacity(run.len() + continuation.len() + 1);
        let (backward_boxes, forward_boxes) = if forward {
            (continuation, run)
        } else {
            (run, continuation)
        };
        bboxes.extend(backward_boxes.into_iter().rev());
        bboxes.push(moved);
        bboxes.extend(forward_boxes);

        Some(AxisSnap {
            delta,
            equal,
            bboxes,
            moved,
            target,
        })
    }
}

/// Snaps the midpoint of a dragged bounding box to equal-spacing positions.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistributionSnapper;

impl DistributionSnapper {
    fn snapped(&self, env: &SnapEnv<'_>, p: &SnapCandidatePoint, at: Point, snap: AxisSnap) -> SnappedPoint {
        let mut sp = SnappedPoint::new(
            at,
            p.source,
            p.source_num,
            snap.target,
            at.distance(p.point),
            self.tolerance(env),
            self.always_snap(env),
        )
        .with_target_bbox(Some(snap.moved));
        sp.distribution = Some(DistributionInfo {
            equal_distance: snap.equal,
            bboxes: snap.bboxes,
            second_equal_distance: None,
            second_bboxes: Vec::new(),
        });
        sp
    }

    /// Where a snap along one axis lands on the constraint.
    fn onto_constraint(constraint: &SnapConstraint, p: Point, at: Point, horizontal_snap: bool) -> Option<Point> {
        // A snap along x keeps its x, so the free direction is vertical
        let free = if horizontal_snap {
            Vec2::new(0.0, 1.0)
        } else {
            Vec2::new(1.0, 0.0)
        };
        constraint
            .intersect_line(constraint.projection(p), at, free)
            .into_iter()
            .min_by(|a, b| a.distance(p).total_cmp(&b.distance(p)))
    }

    fn snap(
        &self,
        env: &SnapEnv<'_>,
        collector: &CandidateCollector<'_>,
        isr: &mut IntermSnapResults,
        p: &SnapCandidatePoint,
        dragged: Rect,
        constraint: Option<&SnapConstraint>,
    ) {
        let (consider_x, consider_y) = match constraint {
            Some(c) if c.is_linear() => {
                if c.direction().x == 0.0 {
                    (false, true)
                } else {
                    (true, false)
                }
            }
            _ => (true, true),
        };
        let tolerance = self.tolerance(env);
        let neighbours = Neighbours::collect(env, collector, dragged);

        let x_axis = Axis {
            forward: &neighbours.right,
            backward: &neighbours.left,
            gap_forward: gap_right,
            gap_backward: gap_left,
            unit: Vec2::new(1.0, 0.0),
            targets: [
                SnapTargetType::DistributionRight,
                SnapTargetType::DistributionLeft,
                SnapTargetType::DistributionX,
            ],
        };
        let y_axis = Axis {
            forward: &neighbours.down,
            backward: &neighbours.up,
            gap_forward: gap_down,
            gap_backward: gap_up,
            unit: Vec2::new(0.0, 1.0),
            targets: [
                SnapTargetType::DistributionDown,
                SnapTargetType::DistributionUp,
                SnapTargetType::DistributionY,
            ],
        };
        let sx = if consider_x { x_axis.snap(dragged, tolerance) } else { None };
        let sy = if consider_y { y_axis.snap(dragged, tolerance) } else { None };

        match (sx, sy) {
            (Some(sx), Some(sy)) if constraint.is_none() => {
                let at = p.point + sx.delta + sy.delta;
                let moved = dragged + sx.delta + sy.delta;
                let mut sp = self.snapped(env, p, at, sx).with_target_bbox(Some(moved));
                sp.target = SnapTargetType::DistributionXY;
                if let Some(info) = sp.distribution.as_mut() {
                    info.second_equal_distance = Some(sy.equal);
                    info.second_bboxes = sy.bboxes;
                }
                isr.points.push(sp.fully_constrained(false));
            }
            (sx, sy) => {
                for (snap, horizontal) in [(sx, true), (sy, false)] {
                    let Some(snap) = snap else { continue };
                    let mut at = p.point + snap.delta;
                    if let Some(c) = constraint {
                        let Some(on) = Self::onto_constraint(c, p.point, at, horizontal) else {
                            continue;
                        };
                        at = on;
                    }
                    isr.points
                        .push(self.snapped(env, p, at, snap).fully_constrained(constraint.is_some()));
                }
            }
        }
    }
}

impl private::Sealed for DistributionSnapper {}

impl Snapper for DistributionSnapper {
    fn might_snap(&self, env: &SnapEnv<'_>) -> bool {
        env.prefs.snap_enabled
            && env.prefs.is_target_snappable(SnapTargetType::DistributionCategory)
            && self.tolerance(env) > 0.0
    }

    fn tolerance(&self, env: &SnapEnv<'_>) -> f64 {
        env.tolerance(env.prefs.distribution_tolerance)
    }

    fn always_snap(&self, env: &SnapEnv<'_>) -> bool {
        is_always_snap(env.prefs.distribution_tolerance)
    }

    fn free_snap<'a>(
        &self,
        env: &SnapEnv<'a>,
        collector: &mut CandidateCollector<'a>,
        isr: &mut IntermSnapResults,
        p: &SnapCandidatePoint,
        bbox_to_snap: Option<Rect>,
    ) {
        let Some(dragged) = bbox_to_snap else { return };
        if p.source != SnapSourceType::BBoxMidpoint || !self.might_snap(env) {
            return;
        }
        collector.collect(env, p.point, bbox_to_snap);
        self.snap(env, collector, isr, p, dragged, None);
    }

    fn constrained_snap<'a>(
        &self,
        env: &SnapEnv<'a>,
        collector: &mut CandidateCollector<'a>,
        isr: &mut IntermSnapResults,
        p: &SnapCandidatePoint,
        bbox_to_snap: Option<Rect>,
        constraint: &SnapConstraint,
    ) {
        let Some(dragged) = bbox_to_snap else { return };
        if p.source != SnapSourceType::BBoxMidpoint || !self.might_snap(env) {
            return;
        }
        collector.collect(env, p.point, bbox_to_snap);
        self.snap(env, collector, isr, p, dragged, Some(constraint));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::document::{Document, Item};
    use crate::snap::{RecordingDiagnostics, SnapPreferences};
    use kurbo::Size;

    fn square(x: f64, y: f64) -> Rect {
        Rect::new(x, y, x + 10.0, y + 10.0)
    }

    fn snap(boxes: &[Rect], dragged: Rect, constraint: Option<SnapConstraint>) -> IntermSnapResults {
        let mut document = Document::new(Size::new(500.0, 500.0));
        for b in boxes {
            document.add_item(Item::rect(*b));
        }
        let camera = Camera::new();
        let prefs = SnapPreferences::default();
        let diagnostics = RecordingDiagnostics::new();
        let env = SnapEnv {
            prefs: &prefs,
            document: &document,
            camera: &camera,
            ignore: Vec::new(),
            unselected_nodes: Vec::new(),
            diagnostics: &diagnostics,
        };
        let p = SnapCandidatePoint::new(dragged.center(), SnapSourceType::BBoxMidpoint);
        let mut collector = CandidateCollector::new();
        let mut isr = IntermSnapResults::default();
        match constraint {
            Some(c) => DistributionSnapper.constrained_snap(&env, &mut collector, &mut isr, &p, Some(dragged), &c),
            None => DistributionSnapper.free_snap(&env, &mut collector, &mut isr, &p, Some(dragged)),
        }
        isr
    }

    #[test]
    fn test_continues_spacing_to_the_right() {
        let isr = snap(&[square(40.0, 0.0), square(60.0, 0.0)], square(18.0, 0.0), None);

        assert_eq!(isr.points.len(), 1);
        let sp = &isr.points[0];
        assert_eq!(sp.target, SnapTargetType::DistributionRight);
        assert!(sp.point.distance(Point::new(25.0, 5.0)) < 1e-9);
        assert!((sp.distance - 2.0).abs() < 1e-9);
        let info = sp.distribution.as_ref().unwrap();
        assert!((info.equal_distance - 10.0).abs() < 1e-9);
        assert_eq!(info.bboxes.len(), 3);
        assert_eq!(info.bboxes[0], square(20.0, 0.0));
    }

    #[test]
    fn test_centers_between_neighbours() {
        let isr = snap(&[square(0.0, 0.0), square(40.0, 0.0)], square(19.0, 0.0), None);

        assert_eq!(isr.points.len(), 1);
        let sp = &isr.points[0];
        assert_eq!(sp.target, SnapTargetType::DistributionX);
        assert!(sp.point.distance(Point::new(25.0, 5.0)) < 1e-9);
        let info = sp.distribution.as_ref().unwrap();
        assert!((info.equal_distance - 10.0).abs() < 1e-9);
        assert_eq!(info.bboxes, vec![square(0.0, 0.0), square(20.0, 0.0), square(40.0, 0.0)]);
    }

    #[test]
    fn test_both_axes_give_xy() {
        let boxes = [
            square(0.0, 100.0),
            square(40.0, 100.0),
            square(19.0, 60.0),
            square(19.0, 140.0),
        ];
        let isr = snap(&boxes, square(19.0, 101.0), None);

        assert_eq!(isr.points.len(), 1);
        let sp = &isr.points[0];
        assert_eq!(sp.target, SnapTargetType::DistributionXY);
        assert!(sp.point.distance(Point::new(25.0, 105.0)) < 1e-9);
        assert!((sp.distance - 2f64.sqrt()).abs() < 1e-9);
        let info = sp.distribution.as_ref().unwrap();
        assert!((info.equal_distance - 10.0).abs() < 1e-9);
        assert!((info.second_equal_distance.unwrap() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_constraint_keeps_one_axis() {
        let boxes = [
            square(0.0, 100.0),
            square(40.0, 100.0),
            square(19.0, 60.0),
            square(19.0, 140.0),
        ];
        let dragged = square(19.0, 101.0);
        let vertical = SnapConstraint::line(dragged.center(), Vec2::new(0.0, 1.0));
        let isr = snap(&boxes, dragged, Some(vertical));

        assert_eq!(isr.points.len(), 1);
        assert_eq!(isr.points[0].target, SnapTargetType::DistributionY);
        assert!(isr.points[0].point.distance(Point::new(24.0, 105.0)) < 1e-9);
        assert!(isr.points[0].constrained_snap);
    }

    #[test]
    fn test_needs_bbox_midpoint_source() {
        let document = Document::new(Size::new(100.0, 100.0));
        let camera = Camera::new();
        let prefs = SnapPreferences::default();
        let diagnostics = RecordingDiagnostics::new();
        let env = SnapEnv {
            prefs: &prefs,
            document: &document,
            camera: &camera,
            ignore: Vec::new(),
            unselected_nodes: Vec::new(),
            diagnostics: &diagnostics,
        };
        let p = SnapCandidatePoint::new(Point::new(5.0, 5.0), SnapSourceType::BBoxCorner);
        let mut collector = CandidateCollector::new();
        let mut isr = IntermSnapResults::default();
        DistributionSnapper.free_snap(&env, &mut collector, &mut isr, &p, Some(square(0.0, 0.0)));
        assert!(isr.is_empty());
        assert!(!collector.is_collected());
    }

    #[test]
    fn test_equal_gap_runs() {
        let boxes = [square(20.0, 0.0), square(40.0, 0.0), square(60.0, 0.0), square(95.0, 0.0)];
        let (run, equal) = find_equal_gaps(square(0.0, 0.0), &boxes, gap_right, 5.0).unwrap();
        assert_eq!(run.len(), 3);
        assert!((equal - 10.0).abs() < 1e-9);

        assert!(find_equal_gaps(square(0.0, 0.0), &boxes[..1], gap_right, 5.0).is_none());
    }

    #[test]
    fn test_overlapping_neighbours_are_merged() {
        let mut boxes = vec![square(0.0, 0.0), square(5.0, 0.0), square(30.0, 0.0)];
        merge_intersecting(&mut boxes);
        assert_eq!(
            boxes,
            vec![
                Rect::new(0.0, 0.0, 15.0, 10.0),
                square(0.0, 0.0),
                square(5.0, 0.0),
                square(30.0, 0.0)
            ]
        );
    }
}
