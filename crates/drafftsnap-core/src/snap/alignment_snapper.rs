//! Snapping to horizontal and vertical alignment lines through the corners
//! and centers of other objects and the page.

use super::candidate::{SnapCandidatePoint, SnapSourceType, SnapTargetCategory, SnapTargetType};
use super::collector::CandidateCollector;
use super::preferences::is_always_snap;
use super::results::{IntermSnapResults, SnappedPoint};
use super::{SnapEnv, Snapper, private};
use crate::document::BBoxKind;
use crate::geom::SnapConstraint;
use kurbo::{Point, Rect, Vec2};
use std::f64::consts::SQRT_2;

/// A point other points can be aligned with.
#[derive(Debug, Clone, Copy)]
struct AlignTarget {
    point: Point,
    target: SnapTargetType,
    bbox: Option<Rect>,
}

/// Best match on one axis so far.
#[derive(Debug, Clone, Copy)]
struct AxisMatch {
    snapped: Point,
    distance: f64,
    target: AlignTarget,
}

impl AxisMatch {
    fn distance_to_target(&self) -> f64 {
        self.snapped.distance(self.target.point)
    }
}

/// Which alignment lines a call may use.
#[derive(Debug, Clone, Copy)]
struct Axes {
    /// Horizontal lines (points take the target's y).
    horizontal: bool,
    /// Vertical lines (points take the target's x).
    vertical: bool,
}

/// Snaps to alignment lines through the points of the visible objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlignmentSnapper;

impl AlignmentSnapper {
    fn applies_to(env: &SnapEnv<'_>, p: &SnapCandidatePoint) -> bool {
        let is_handle = p.source.is_node() || p.source == SnapSourceType::OtherHandle;
        p.source.is_bbox() || (is_handle && (!env.unselected_nodes.is_empty() || p.consider_for_alignment))
    }

    fn targets(env: &SnapEnv<'_>, collector: &CandidateCollector<'_>) -> Vec<AlignTarget> {
        let mut targets = Vec::new();
        if env.prefs.is_target_snappable(SnapTargetType::PageEdgeCorner) {
            let page = env.document.page_rect();
            for corner in env.document.page_corners() {
                targets.push(AlignTarget {
                    point: corner,
                    target: SnapTargetType::AlignmentPageCorner,
                    bbox: Some(page),
                });
            }
            targets.push(AlignTarget {
                point: page.center(),
                target: SnapTargetType::AlignmentPageCenter,
                bbox: Some(page),
            });
        }

        let kind = if env.prefs.visual_bbox {
            BBoxKind::Visual
        } else {
            BBoxKind::Geometric
        };
        for candidate in collector.align_candidates() {
            if candidate.is_clip_or_mask() {
                continue;
            }
            let Some(bbox) = candidate.item.bounds(kind, candidate.parent_to_doc) else {
                continue;
            };
            let corners = [
                Point::new(bbox.x0, bbox.y0),
                Point::new(bbox.x1, bbox.y0),
                Point::new(bbox.x1, bbox.y1),
                Point::new(bbox.x0, bbox.y1),
            ];
            for corner in corners {
                targets.push(AlignTarget {
                    point: corner,
                    target: SnapTargetType::AlignmentBBoxCorner,
                    bbox: Some(bbox),
                });
            }
            targets.push(AlignTarget {
                point: bbox.center(),
                target: SnapTargetType::AlignmentBBoxMidpoint,
                bbox: Some(bbox),
            });
        }

        if env.prefs.is_target_snappable(SnapTargetType::AlignmentHandle) {
            targets.extend(env.unselected_nodes.iter().map(|node| AlignTarget {
                point: node.point,
                target: if node.target.category() == Some(SnapTargetCategory::Node) {
                    SnapTargetType::AlignmentHandle
                } else {
                    node.target
                },
                bbox: node.target_bbox,
            }));
        }
        targets
    }

    /// Where `p` lands on the alignment line through `target`.
    ///
    /// Free snaps drop straight onto the line; constrained snaps slide along
    /// the constraint to the crossing closest to `p`.
    fn land(p: Point, target: Point, horizontal: bool, constraint: Option<(&SnapConstraint, Point)>) -> Option<Point> {
        let direction = if horizontal {
            Vec2::new(1.0, 0.0)
        } else {
            Vec2::new(0.0, 1.0)
        };
        match constraint {
            None if horizontal => Some(Point::new(p.x, target.y)),
            None => Some(Point::new(target.x, p.y)),
            Some((constraint, projected)) => constraint
                .intersect_line(projected, target, direction)
                .into_iter()
                .min_by(|a, b| a.distance(p).total_cmp(&b.distance(p))),
        }
    }

    fn snapped(&self, env: &SnapEnv<'_>, p: &SnapCandidatePoint, m: &AxisMatch, target: SnapTargetType) -> SnappedPoint {
        let mut sp = SnappedPoint::new(
            m.snapped,
            p.source,
            p.source_num,
            target,
            m.distance,
            self.tolerance(env),
            self.always_snap(env),
        )
        .with_target_bbox(m.target.bbox);
        sp.alignment_target = Some(m.target.point);
        sp
    }

    fn snap(
        &self,
        env: &SnapEnv<'_>,
        collector: &CandidateCollector<'_>,
        isr: &mut IntermSnapResults,
        p: &SnapCandidatePoint,
        constraint: Option<&SnapConstraint>,
    ) {
        let tolerance = self.tolerance(env);
        let axes = match constraint {
            Some(c) if c.is_linear() => {
                if c.direction().x == 0.0 {
                    Axes { horizontal: true, vertical: false }
                } else {
                    Axes { horizontal: false, vertical: true }
                }
            }
            _ => Axes { horizontal: true, vertical: true },
        };
        let constraint = constraint.map(|c| (c, c.projection(p.point)));

        let mut best_x: Option<AxisMatch> = None;
        let mut best_y: Option<AxisMatch> = None;
        for target in Self::targets(env, collector) {
            for (horizontal, best) in [(true, &mut best_x), (false, &mut best_y)] {
                let enabled = if horizontal { axes.horizontal } else { axes.vertical };
                if !enabled {
                    continue;
                }
                let Some(snapped) = Self::land(p.point, target.point, horizontal, constraint) else {
                    continue;
                };
                let candidate = AxisMatch {
                    snapped,
                    distance: snapped.distance(p.point),
                    target,
                };
                if candidate.distance >= tolerance {
                    continue;
                }
                if best.is_none_or(|b| candidate.distance_to_target() < b.distance_to_target()) {
                    *best = Some(candidate);
                }
            }
        }

        let fully = constraint.is_some();
        match (best_x, best_y) {
            (Some(x), Some(y)) if constraint.is_none() => {
                let crossing = Point::new(y.snapped.x, x.snapped.y);
                let distance = crossing.distance(p.point);
                if distance < SQRT_2 * tolerance {
                    let mut sp = SnappedPoint::new(
                        crossing,
                        p.source,
                        p.source_num,
                        SnapTargetType::AlignmentIntersection,
                        distance,
                        tolerance,
                        self.always_snap(env),
                    )
                    .with_target_bbox(y.target.bbox)
                    .fully_constrained(false);
                    sp.alignment_target = Some(x.target.point);
                    sp.alignment_target2 = Some(y.target.point);
                    isr.points.push(sp);
                    return;
                }
                let closer = if x.distance < y.distance { x } else { y };
                isr.points.push(self.snapped(env, p, &closer, closer.target.target).fully_constrained(fully));
            }
            (Some(m), Some(other)) => {
                let closer = if m.distance < other.distance { m } else { other };
                isr.points.push(self.snapped(env, p, &closer, closer.target.target).fully_constrained(fully));
            }
            (Some(m), None) | (None, Some(m)) => {
                isr.points.push(self.snapped(env, p, &m, m.target.target).fully_constrained(fully));
            }
            (None, None) => {}
        }
    }
}

impl private::Sealed for AlignmentSnapper {}

impl Snapper for AlignmentSnapper {
    fn might_snap(&self, env: &SnapEnv<'_>) -> bool {
        env.prefs.snap_enabled
            && env.prefs.is_target_snappable(SnapTargetType::AlignmentCategory)
            && self.tolerance(env) > 0.0
    }

    fn tolerance(&self, env: &SnapEnv<'_>) -> f64 {
        env.tolerance(env.prefs.alignment_tolerance)
    }

    fn always_snap(&self, env: &SnapEnv<'_>) -> bool {
        is_always_snap(env.prefs.alignment_tolerance)
    }

    fn free_snap<'a>(
        &self,
        env: &SnapEnv<'a>,
        collector: &mut CandidateCollector<'a>,
        isr: &mut IntermSnapResults,
        p: &SnapCandidatePoint,
        bbox_to_snap: Option<Rect>,
    ) {
        if !self.might_snap(env) || !Self::applies_to(env, p) {
            return;
        }
        collector.collect(env, p.point, bbox_to_snap);
        self.snap(env, collector, isr, p, None);
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
        if !self.might_snap(env) || !Self::applies_to(env, p) {
            return;
        }
        collector.collect(env, p.point, bbox_to_snap);
        self.snap(env, collector, isr, p, Some(constraint));
    }
}
