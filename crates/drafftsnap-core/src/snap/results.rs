//! Snap results: snapped points, lines and curves, and the intermediate
//! collection the snappers fill in.

use super::candidate::{SnapSourceType, SnapTargetType};
use crate::document::ItemId;
use crate::geom::{line_intersection, rot90, segment_intersections, segment_line_intersections};
use kurbo::{ParamCurve, PathSeg, Point, Rect, Vec2};
use serde::Serialize;

/// Penalty added to projections onto a constraint, so any real snap beats them.
const CONSTRAINT_PENALTY: f64 = 1e6;

/// Points closer than this are considered coincident.
const COINCIDENT_EPSILON: f64 = 1e-9;

/// Equal-spacing information of a distribution snap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionInfo {
    /// Gap shared by the distributed boxes.
    pub equal_distance: f64,
    /// Boxes taking part, in order, including the snapped box.
    pub bboxes: Vec<Rect>,
    /// Gap of the second axis for `DistributionXY` snaps.
    pub second_equal_distance: Option<f64>,
    pub second_bboxes: Vec<Rect>,
}

/// A snapped position, possibly unsnapped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnappedPoint {
    pub point: Point,
    pub source: SnapSourceType,
    pub source_num: Option<usize>,
    pub target: SnapTargetType,
    /// Distance from the source point.
    pub distance: f64,
    pub tolerance: f64,
    /// Snapper with the maximum tolerance: distance does not matter.
    pub always_snap: bool,
    /// For intersections: distance to the second object.
    pub second_distance: f64,
    pub second_tolerance: f64,
    pub second_always_snap: bool,
    pub at_intersection: bool,
    /// Result of a constrained snap.
    pub constrained_snap: bool,
    /// Both degrees of freedom are fixed (node, intersection, constrained result).
    pub fully_constrained: bool,
    pub snapped: bool,
    /// Tangent of the target curve or line at the snapped point.
    pub tangent: Option<Vec2>,
    pub target_bbox: Option<Rect>,
    pub alignment_target: Option<Point>,
    pub alignment_target2: Option<Point>,
    pub distribution: Option<DistributionInfo>,
}

impl SnappedPoint {
    /// A snap to `target` at `point`.
    pub fn new(
        point: Point,
        source: SnapSourceType,
        source_num: Option<usize>,
        target: SnapTargetType,
        distance: f64,
        tolerance: f64,
        always_snap: bool,
    ) -> Self {
        Self {
            point,
            source,
            source_num,
            target,
            distance,
            tolerance,
            always_snap,
            second_distance: f64::INFINITY,
            second_tolerance: 1.0,
            second_always_snap: false,
            at_intersection: false,
            constrained_snap: false,
            fully_constrained: false,
            snapped: distance.is_finite(),
            tangent: None,
            target_bbox: None,
            alignment_target: None,
            alignment_target2: None,
            distribution: None,
        }
    }

    /// The explicit "did not snap" value carrying `point`.
    pub fn unsnapped(point: Point) -> Self {
        Self::new(
            point,
            SnapSourceType::Undefined,
            None,
            SnapTargetType::Undefined,
            f64::INFINITY,
            1.0,
            false,
        )
    }

    /// Mark both degrees of freedom as fixed, e.g. a node or a constrained result.
    pub fn fully_constrained(mut self, constrained_snap: bool) -> Self {
        self.fully_constrained = true;
        self.constrained_snap = constrained_snap;
        self
    }

    pub fn with_tangent(mut self, tangent: Vec2) -> Self {
        self.tangent = Some(tangent);
        self
    }

    pub fn with_target_bbox(mut self, bbox: Option<Rect>) -> Self {
        self.target_bbox = bbox;
        self
    }

    pub fn set_point(&mut self, point: Point) {
        self.point = point;
    }

    pub fn set_target(&mut self, target: SnapTargetType) {
        self.target = target;
    }

    pub fn set_source(&mut self, source: SnapSourceType) {
        self.source = source;
    }

    /// The snapped position, or `None` if nothing matched.
    pub fn point_if_snapped(&self) -> Option<Point> {
        self.snapped.then_some(self.point)
    }

    /// Within the snapper's reach.
    pub fn is_within_tolerance(&self) -> bool {
        self.distance <= self.tolerance
    }

    /// Whether `other` should replace `self` as the best snap so far.
    ///
    /// Preference order: any real snap over a bare constraint projection,
    /// always-snap snappers over regular ones, closer over farther, fully
    /// constrained over partially constrained, nodes over coincident
    /// intersections, then the second distance, then free over constrained
    /// snaps. Complete ties fall back to the target priority; a tie there
    /// keeps `self`.
    pub fn is_other_snap_better(&self, other: &SnappedPoint) -> bool {
        if self.distance.is_infinite() && other.distance.is_finite() {
            return true;
        }

        let mut dist_other = other.distance;
        let mut dist_this = self.distance;
        if other.target == SnapTargetType::Constraint {
            dist_other += CONSTRAINT_PENALTY;
        }
        if self.target == SnapTargetType::Constraint {
            dist_this += CONSTRAINT_PENALTY;
        }

        let closer = dist_other < dist_this;
        let gains_always = other.always_snap && !self.always_snap;
        let loses_always = !other.always_snap && self.always_snap;
        let gains_constraint = other.fully_constrained && !other.constrained_snap && !self.fully_constrained;
        let loses_constraint = !other.fully_constrained && self.fully_constrained;

        let coincident = self.fully_constrained
            && other.fully_constrained
            && self.point.distance(other.point) < COINCIDENT_EPSILON;
        let leaves_intersection = coincident && !other.at_intersection && self.at_intersection;
        let enters_intersection = coincident && other.at_intersection && !self.at_intersection;

        let equally_close = dist_other == dist_this;
        let closer_second = other.second_distance < self.second_distance && self.second_distance.is_finite();
        let less_constrained = !other.constrained_snap && self.constrained_snap;

        let better = (closer
            || gains_always
            || gains_constraint
            || leaves_intersection
            || (equally_close && (closer_second || less_constrained)))
            && !loses_always
            && (!loses_constraint || gains_always)
            && !enters_intersection;
        if better {
            return true;
        }

        let farther_second = self.second_distance < other.second_distance && other.second_distance.is_finite();
        let more_constrained = !self.constrained_snap && other.constrained_snap;
        let tie = equally_close
            && other.always_snap == self.always_snap
            && other.fully_constrained == self.fully_constrained
            && !leaves_intersection
            && !enters_intersection
            && !closer_second
            && !farther_second
            && !less_constrained
            && !more_constrained;
        tie && other.target.priority() < self.target.priority()
    }
}

/// A grid or guide line within reach of the source point.
#[derive(Debug, Clone, PartialEq)]
pub struct SnappedLine {
    /// Projection of the source point onto the line.
    pub point: Point,
    pub distance: f64,
    pub source: SnapSourceType,
    pub source_num: Option<usize>,
    pub target: SnapTargetType,
    pub tolerance: f64,
    pub always_snap: bool,
    pub normal: Vec2,
    pub point_on_line: Point,
}

impl SnappedLine {
    pub fn direction(&self) -> Vec2 {
        rot90(self.normal)
    }

    pub fn to_snapped_point(&self) -> SnappedPoint {
        SnappedPoint::new(
            self.point,
            self.source,
            self.source_num,
            self.target,
            self.distance,
            self.tolerance,
            self.always_snap,
        )
        .with_tangent(self.direction())
    }

    /// Crossing of two lines as a fully constrained snap measured from `source_point`.
    pub fn intersect(&self, other: &SnappedLine, source_point: Point) -> Option<SnappedPoint> {
        let crossing = line_intersection(self.point_on_line, self.direction(), other.point_on_line, other.direction())?;
        let (primary, secondary) = if self.distance < other.distance {
            (self, other)
        } else {
            (other, self)
        };
        Some(intersection_point(
            crossing,
            source_point,
            primary.source_num,
            (primary.tolerance, primary.always_snap),
            (secondary.distance, secondary.tolerance, secondary.always_snap),
        ))
    }
}

/// A curve within reach of the source point.
#[derive(Debug, Clone, PartialEq)]
pub struct SnappedCurve {
    /// Nearest location on the curve.
    pub point: Point,
    pub distance: f64,
    pub source: SnapSourceType,
    pub source_num: Option<usize>,
    pub target: SnapTargetType,
    pub tolerance: f64,
    pub always_snap: bool,
    /// The segment in document coordinates.
    pub segment: PathSeg,
    /// Owner of the segment; `None` for page borders.
    pub item: Option<ItemId>,
    pub segment_index: usize,
    pub tangent: Vec2,
    pub target_bbox: Option<Rect>,
}

impl SnappedCurve {
    pub fn to_snapped_point(&self) -> SnappedPoint {
        SnappedPoint::new(
            self.point,
            self.source,
            self.source_num,
            self.target,
            self.distance,
            self.tolerance,
            self.always_snap,
        )
        .with_tangent(self.tangent)
        .with_target_bbox(self.target_bbox)
    }

    fn shares_joint_with(&self, other: &SnappedCurve, p: Point) -> bool {
        if self.item.is_none() || self.item != other.item {
            return false;
        }
        let ends = |seg: &PathSeg| [seg.start(), seg.end()];
        ends(&self.segment)
            .iter()
            .any(|a| a.distance(p) < 1e-6 && ends(&other.segment).iter().any(|b| b.distance(p) < 1e-6))
    }

    /// Closest crossing with another curve, measured from `source_point`.
    ///
    /// Joints shared by two segments of the same item are not crossings.
    pub fn intersect_curve(&self, other: &SnappedCurve, source_point: Point) -> Option<SnappedPoint> {
        let crossing = segment_intersections(&self.segment, &other.segment)
            .into_iter()
            .filter(|p| !self.shares_joint_with(other, *p))
            .min_by(|a, b| a.distance(source_point).total_cmp(&b.distance(source_point)))?;
        let (primary, secondary) = if self.distance < other.distance {
            (self, other)
        } else {
            (other, self)
        };
        let mut sp = intersection_point(
            crossing,
            source_point,
            primary.source_num,
            (primary.tolerance, primary.always_snap),
            (secondary.distance, secondary.tolerance, secondary.always_snap),
        );
        sp.target = SnapTargetType::PathIntersection;
        Some(sp)
    }

    /// Closest crossing with a guide line, measured from `source_point`.
    pub fn intersect_line(&self, line: &SnappedLine, source_point: Point) -> Option<SnappedPoint> {
        let (crossing, _) = segment_line_intersections(&self.segment, line.point_on_line, line.direction())
            .into_iter()
            .min_by(|a, b| a.0.distance(source_point).total_cmp(&b.0.distance(source_point)))?;
        let mut sp = if self.distance < line.distance {
            intersection_point(
                crossing,
                source_point,
                self.source_num,
                (self.tolerance, self.always_snap),
                (line.distance, line.tolerance, line.always_snap),
            )
        } else {
            intersection_point(
                crossing,
                source_point,
                line.source_num,
                (line.tolerance, line.always_snap),
                (self.distance, self.tolerance, self.always_snap),
            )
        };
        sp.target = SnapTargetType::PathGuideIntersection;
        Some(sp)
    }
}

fn intersection_point(
    crossing: Point,
    source_point: Point,
    source_num: Option<usize>,
    (tolerance, always_snap): (f64, bool),
    (second_distance, second_tolerance, second_always_snap): (f64, f64, bool),
) -> SnappedPoint {
    let mut sp = SnappedPoint::new(
        crossing,
        SnapSourceType::Undefined,
        source_num,
        SnapTargetType::Undefined,
        crossing.distance(source_point),
        tolerance,
        always_snap,
    )
    .fully_constrained(false);
    sp.at_intersection = true;
    sp.second_distance = second_distance;
    sp.second_tolerance = second_tolerance;
    sp.second_always_snap = second_always_snap;
    sp
}

/// Everything the snappers found for one snap call.
#[derive(Debug, Clone, Default)]
pub struct IntermSnapResults {
    pub points: Vec<SnappedPoint>,
    pub curves: Vec<SnappedCurve>,
    pub grid_lines: Vec<SnappedLine>,
    pub guide_lines: Vec<SnappedLine>,
}

impl IntermSnapResults {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.curves.is_empty() && self.grid_lines.is_empty() && self.guide_lines.is_empty()
    }
}

/// Sort key of the "closest" scans: always-snap entries first, then distance.
fn closeness(always_snap: bool, distance: f64) -> (bool, f64) {
    (!always_snap, distance)
}

fn is_closer(a: (bool, f64), b: (bool, f64)) -> bool {
    a.0 < b.0 || (a.0 == b.0 && a.1 < b.1)
}

pub fn closest_point(points: &[SnappedPoint]) -> Option<&SnappedPoint> {
    points.iter().fold(None, |best: Option<&SnappedPoint>, sp| match best {
        Some(b) if !is_closer(closeness(sp.always_snap, sp.distance), closeness(b.always_snap, b.distance)) => Some(b),
        _ => Some(sp),
    })
}

/// Closest curve; when `exclude_paths` is set, plain path targets are skipped.
pub fn closest_curve(curves: &[SnappedCurve], exclude_paths: bool) -> Option<&SnappedCurve> {
    curves
        .iter()
        .filter(|c| !(exclude_paths && c.target == SnapTargetType::Path))
        .fold(None, |best: Option<&SnappedCurve>, c| match best {
            Some(b) if !is_closer(closeness(c.always_snap, c.distance), closeness(b.always_snap, b.distance)) => Some(b),
            _ => Some(c),
        })
}

pub fn closest_line(lines: &[SnappedLine]) -> Option<&SnappedLine> {
    lines.iter().fold(None, |best: Option<&SnappedLine>, l| match best {
        Some(b) if !is_closer(closeness(l.always_snap, l.distance), closeness(b.always_snap, b.distance)) => Some(b),
        _ => Some(l),
    })
}

/// Keep `candidate` if it is closer than `best`, or as close with a smaller second distance.
fn keep_closer_intersection(best: &mut Option<SnappedPoint>, candidate: SnappedPoint) {
    let replace = match best {
        None => true,
        Some(b) => {
            candidate.distance < b.distance
                || (candidate.distance == b.distance && candidate.second_distance < b.second_distance)
        }
    };
    if replace {
        *best = Some(candidate);
    }
}

/// Closest crossing of any two curves.
pub fn closest_curve_intersection(curves: &[SnappedCurve], source_point: Point) -> Option<SnappedPoint> {
    let mut best = None;
    for (i, a) in curves.iter().enumerate() {
        for b in &curves[i + 1..] {
            if let Some(sp) = a.intersect_curve(b, source_point) {
                keep_closer_intersection(&mut best, sp);
            }
        }
    }
    best
}

/// Closest crossing of a curve with a line.
pub fn closest_curve_line_intersection(
    curves: &[SnappedCurve],
    lines: &[SnappedLine],
    source_point: Point,
) -> Option<SnappedPoint> {
    let mut best = None;
    for curve in curves {
        for line in lines {
            if let Some(sp) = curve.intersect_line(line, source_point) {
                keep_closer_intersection(&mut best, sp);
            }
        }
    }
    best
}

/// Closest crossing of any two lines of one list.
pub fn closest_line_intersection(lines: &[SnappedLine], source_point: Point) -> Option<SnappedPoint> {
    let mut best = None;
    for (i, a) in lines.iter().enumerate() {
        for b in &lines[i + 1..] {
            if let Some(sp) = a.intersect(b, source_point) {
                keep_closer_intersection(&mut best, sp);
            }
        }
    }
    best
}

/// Closest crossing of a line of the first list with a line of the second.
pub fn closest_line_pair_intersection(
    first: &[SnappedLine],
    second: &[SnappedLine],
    source_point: Point,
) -> Option<SnappedPoint> {
    let mut best = None;
    for a in first {
        for b in second {
            if let Some(sp) = a.intersect(b, source_point) {
                keep_closer_intersection(&mut best, sp);
            }
        }
    }
    best
}
