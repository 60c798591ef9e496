//! Snapping to the nodes, paths and bounding boxes of document items, and
//! to the page.

use super::candidate::{OriginOrVector, SnapCandidateItem, SnapCandidatePoint, SnapTargetType};
use super::collector::CandidateCollector;
use super::preferences::is_always_snap;
use super::results::{IntermSnapResults, SnappedCurve, SnappedPoint};
use super::{SnapEnv, Snapper, private};
use crate::document::{BBoxKind, ItemId, ItemKind};
use crate::geom::{SnapConstraint, nearest_on_segment, project_on_line, segment_tangent};
use kurbo::{Line, ParamCurve, PathSeg, Point, Rect};

/// Point targets farther than this from a constraint are not on it.
const ON_CONSTRAINT_EPSILON: f64 = 1e-9;

/// Samples per segment when searching for tangent and normal parameters.
const ROOT_SAMPLES: usize = 64;

/// Bisection steps refining a sampled sign change.
const ROOT_ITERATIONS: usize = 50;

/// Targets that need the path and box outlines.
const CURVE_TARGETS: [SnapTargetType; 5] = [
    SnapTargetType::Path,
    SnapTargetType::PathIntersection,
    SnapTargetType::PathGuideIntersection,
    SnapTargetType::BBoxEdge,
    SnapTargetType::PageEdgeBorder,
];

#[derive(Debug, Clone, Copy)]
struct PointTarget {
    point: Point,
    target: SnapTargetType,
    bbox: Option<Rect>,
}

#[derive(Debug, Clone, Copy)]
struct CurveTarget {
    segment: PathSeg,
    target: SnapTargetType,
    item: Option<ItemId>,
    index: usize,
    bbox: Option<Rect>,
}

impl CurveTarget {
    fn is_path(&self) -> bool {
        matches!(
            self.target,
            SnapTargetType::Path | SnapTargetType::PathClip | SnapTargetType::PathMask
        )
    }
}

/// Snaps to the items gathered by the candidate collector, plus the page.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectSnapper;

impl ObjectSnapper {
    fn bbox_kind(env: &SnapEnv<'_>) -> BBoxKind {
        if env.prefs.visual_bbox {
            BBoxKind::Visual
        } else {
            BBoxKind::Geometric
        }
    }

    /// Every point an item or the page offers to `p`.
    fn point_targets(env: &SnapEnv<'_>, candidates: &[SnapCandidateItem<'_>], p: &SnapCandidatePoint) -> Vec<PointTarget> {
        let prefs = env.prefs;
        let mut targets = Vec::new();
        let mut push = |point: Point, target: SnapTargetType, bbox: Option<Rect>| {
            if prefs.is_target_snappable(target) && prefs.is_source_compatible(p.source, target) {
                targets.push(PointTarget { point, target, bbox });
            }
        };

        for candidate in candidates {
            let item = candidate.item;
            let affine = candidate.parent_to_doc;
            for node in item.nodes_in(affine) {
                let target = if node.smooth {
                    SnapTargetType::NodeSmooth
                } else {
                    SnapTargetType::NodeCusp
                };
                push(node.point, target, None);
            }
            if let ItemKind::Path { .. } = item.kind {
                for seg in item.segments_in(affine) {
                    if let PathSeg::Line(line) = seg {
                        push(line.p0.midpoint(line.p1), SnapTargetType::LineMidpoint, None);
                    }
                }
            }
            for quadrant in item.quadrant_points(affine).into_iter().flatten() {
                push(quadrant, SnapTargetType::EllipseQuadrant, None);
            }
            if let Some(center) = item.center(affine) {
                push(center, SnapTargetType::RotationCenter, None);
            }
            if let Some(bounds) = item.geometric_bounds(affine) {
                push(bounds.center(), SnapTargetType::ObjectMidpoint, Some(bounds));
            }

            // The box of a clip or mask would duplicate the clipped item's box
            if candidate.is_clip_or_mask() {
                continue;
            }
            let Some(bbox) = item.bounds(Self::bbox_kind(env), affine) else {
                continue;
            };
            for corner in rect_corners(bbox) {
                push(corner, SnapTargetType::BBoxCorner, Some(bbox));
            }
            for midpoint in rect_edge_midpoints(bbox) {
                push(midpoint, SnapTargetType::BBoxEdgeMidpoint, Some(bbox));
            }
            push(bbox.center(), SnapTargetType::BBoxMidpoint, Some(bbox));
        }

        for node in &env.unselected_nodes {
            push(node.point, node.target, node.target_bbox);
        }

        if !env.is_page_ignored() {
            let page = env.document.page_rect();
            for corner in env.document.page_corners() {
                push(corner, SnapTargetType::PageEdgeCorner, Some(page));
            }
            push(page.center(), SnapTargetType::PageEdgeCenter, Some(page));
        }
        targets
    }

    /// Every outline segment an item or the page offers to `p`.
    fn curve_targets(env: &SnapEnv<'_>, candidates: &[SnapCandidateItem<'_>], p: &SnapCandidatePoint) -> Vec<CurveTarget> {
        let prefs = env.prefs;
        let mut targets = Vec::new();
        let wants_paths = prefs.is_any_target_snappable(&[
            SnapTargetType::Path,
            SnapTargetType::PathIntersection,
            SnapTargetType::PathGuideIntersection,
        ]);
        let wants_edges = prefs.is_target_snappable(SnapTargetType::BBoxEdge)
            && prefs.is_source_compatible(p.source, SnapTargetType::BBoxEdge);

        for candidate in candidates {
            let item = candidate.item;
            let affine = candidate.parent_to_doc;
            let path_target = candidate.path_target();
            if wants_paths && prefs.is_source_compatible(p.source, path_target) {
                for (index, segment) in item.segments_in(affine).into_iter().enumerate() {
                    targets.push(CurveTarget {
                        segment,
                        target: path_target,
                        item: Some(item.id),
                        index,
                        bbox: None,
                    });
                }
            }
            if wants_edges && !candidate.is_clip_or_mask() {
                if let Some(bbox) = item.bounds(Self::bbox_kind(env), affine) {
                    for (index, segment) in rect_edges(bbox).into_iter().enumerate() {
                        targets.push(CurveTarget {
                            segment,
                            target: SnapTargetType::BBoxEdge,
                            item: Some(item.id),
                            index,
                            bbox: Some(bbox),
                        });
                    }
                }
            }
        }

        if prefs.is_target_snappable(SnapTargetType::PageEdgeBorder) && !env.is_page_ignored() {
            let page = env.document.page_rect();
            for (index, segment) in rect_edges(page).into_iter().enumerate() {
                targets.push(CurveTarget {
                    segment,
                    target: SnapTargetType::PageEdgeBorder,
                    item: None,
                    index,
                    bbox: Some(page),
                });
            }
        }
        targets
    }

    fn snapped_point(&self, env: &SnapEnv<'_>, p: &SnapCandidatePoint, at: Point, target: SnapTargetType) -> SnappedPoint {
        SnappedPoint::new(
            at,
            p.source,
            p.source_num,
            target,
            at.distance(p.point),
            self.tolerance(env),
            self.always_snap(env),
        )
    }

    /// Tangential and perpendicular snaps of `p` onto a path segment.
    fn snap_tangents_and_normals(&self, env: &SnapEnv<'_>, isr: &mut IntermSnapResults, p: &SnapCandidatePoint, curve: &CurveTarget) {
        let perpendicular = env.prefs.is_target_snappable(SnapTargetType::PathPerpendicular);
        let tangential = env.prefs.is_target_snappable(SnapTargetType::PathTangential);
        if !perpendicular && !tangential {
            return;
        }
        let tolerance = self.tolerance(env);
        let seg = curve.segment;
        for hint in &p.origins_and_vectors {
            let mut hits: Vec<(f64, SnapTargetType)> = Vec::new();
            match (*hint, seg) {
                (OriginOrVector::Origin(origin), PathSeg::Line(line)) => {
                    if perpendicular {
                        let foot = project_on_line(origin, line.p0, line.p1 - line.p0);
                        let t = (foot - line.p0).dot(line.p1 - line.p0) / (line.p1 - line.p0).hypot2();
                        if (0.0..=1.0).contains(&t) {
                            hits.push((t, SnapTargetType::PathPerpendicular));
                        }
                    }
                }
                // Straight segments have no isolated tangent or normal directions
                (OriginOrVector::Vector(_), PathSeg::Line(_)) => {}
                (OriginOrVector::Origin(origin), _) => {
                    if perpendicular {
                        let normals = segment_roots(|t| (seg.eval(t) - origin).dot(segment_tangent(&seg, t)));
                        hits.extend(normals.into_iter().map(|t| (t, SnapTargetType::PathPerpendicular)));
                    }
                    if tangential {
                        let tangents = segment_roots(|t| (seg.eval(t) - origin).cross(segment_tangent(&seg, t)));
                        hits.extend(tangents.into_iter().map(|t| (t, SnapTargetType::PathTangential)));
                    }
                }
                (OriginOrVector::Vector(vector), _) => {
                    if perpendicular {
                        let normals = segment_roots(|t| segment_tangent(&seg, t).dot(vector));
                        hits.extend(normals.into_iter().map(|t| (t, SnapTargetType::PathPerpendicular)));
                    }
                    if tangential {
                        let tangents = segment_roots(|t| segment_tangent(&seg, t).cross(vector));
                        hits.extend(tangents.into_iter().map(|t| (t, SnapTargetType::PathTangential)));
                    }
                }
            }
            for (t, target) in hits {
                let at = seg.eval(t);
                if at.distance(p.point) <= tolerance {
                    isr.points.push(
                        self.snapped_point(env, p, at, target)
                            .with_tangent(segment_tangent(&seg, t))
                            .fully_constrained(false),
                    );
                }
            }
        }
    }
}

impl private::Sealed for ObjectSnapper {}

impl Snapper for ObjectSnapper {
    fn might_snap(&self, env: &SnapEnv<'_>) -> bool {
        env.prefs.snap_enabled
            && self.tolerance(env) > 0.0
            && env.prefs.is_any_target_snappable(&[
                SnapTargetType::BBoxCategory,
                SnapTargetType::NodeCategory,
                SnapTargetType::OthersCategory,
                SnapTargetType::PageEdgeBorder,
                SnapTargetType::PageEdgeCorner,
                SnapTargetType::PageEdgeCenter,
            ])
    }

    fn tolerance(&self, env: &SnapEnv<'_>) -> f64 {
        env.tolerance(env.prefs.object_tolerance)
    }

    fn always_snap(&self, env: &SnapEnv<'_>) -> bool {
        is_always_snap(env.prefs.object_tolerance)
    }

    fn free_snap<'a>(
        &self,
        env: &SnapEnv<'a>,
        collector: &mut CandidateCollector<'a>,
        isr: &mut IntermSnapResults,
        p: &SnapCandidatePoint,
        bbox_to_snap: Option<Rect>,
    ) {
        if !self.might_snap(env) || !env.prefs.is_source_snappable(p.source) {
            return;
        }
        collector.collect(env, p.point, bbox_to_snap);
        let candidates = collector.object_candidates();
        let tolerance = self.tolerance(env);

        for t in Self::point_targets(env, candidates, p) {
            if t.point.distance(p.point) <= tolerance {
                isr.points.push(
                    self.snapped_point(env, p, t.point, t.target)
                        .with_target_bbox(t.bbox)
                        .fully_constrained(false),
                );
            }
        }

        if !env.prefs.is_any_target_snappable(&CURVE_TARGETS) {
            return;
        }
        for curve in Self::curve_targets(env, candidates, p) {
            let (at, distance, t) = nearest_on_segment(&curve.segment, p.point);
            if distance <= tolerance {
                isr.curves.push(SnappedCurve {
                    point: at,
                    distance,
                    source: p.source,
                    source_num: p.source_num,
                    target: curve.target,
                    tolerance,
                    always_snap: self.always_snap(env),
                    segment: curve.segment,
                    item: curve.item,
                    segment_index: curve.index,
                    tangent: segment_tangent(&curve.segment, t),
                    target_bbox: curve.bbox,
                });
            }
            if curve.is_path() && !p.origins_and_vectors.is_empty() {
                self.snap_tangents_and_normals(env, isr, p, &curve);
            }
        }
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
        if !self.might_snap(env) || !env.prefs.is_source_snappable(p.source) {
            return;
        }
        collector.collect(env, p.point, bbox_to_snap);
        let candidates = collector.object_candidates();
        let tolerance = self.tolerance(env);

        let closest = Self::point_targets(env, candidates, p)
            .into_iter()
            .filter(|t| constraint.contains(t.point, ON_CONSTRAINT_EPSILON) && t.point.distance(p.point) <= tolerance)
            .fold(None, |best: Option<PointTarget>, t| match best {
                Some(b) if b.point.distance(p.point) <= t.point.distance(p.point) => Some(b),
                _ => Some(t),
            });
        if let Some(t) = closest {
            isr.points.push(
                self.snapped_point(env, p, t.point, t.target)
                    .with_target_bbox(t.bbox)
                    .fully_constrained(true),
            );
        }

        if !env.prefs.is_any_target_snappable(&CURVE_TARGETS) {
            return;
        }
        let projected = constraint.projection(p.point);
        for curve in Self::curve_targets(env, candidates, p) {
            if !env.prefs.is_target_snappable(curve.target) {
                continue;
            }
            for crossing in constraint.intersect_segment(projected, &curve.segment) {
                if crossing.distance(p.point) <= tolerance {
                    isr.points.push(
                        self.snapped_point(env, p, crossing, curve.target)
                            .with_target_bbox(curve.bbox)
                            .fully_constrained(true),
                    );
                }
            }
        }
    }
}

fn rect_corners(r: Rect) -> [Point; 4] {
    [
        Point::new(r.x0, r.y0),
        Point::new(r.x1, r.y0),
        Point::new(r.x1, r.y1),
        Point::new(r.x0, r.y1),
    ]
}

fn rect_edge_midpoints(r: Rect) -> [Point; 4] {
    let c = r.center();
    [
        Point::new(c.x, r.y0),
        Point::new(r.x1, c.y),
        Point::new(c.x, r.y1),
        Point::new(r.x0, c.y),
    ]
}

fn rect_edges(r: Rect) -> [PathSeg; 4] {
    let [a, b, c, d] = rect_corners(r);
    [
        PathSeg::Line(Line::new(a, b)),
        PathSeg::Line(Line::new(b, c)),
        PathSeg::Line(Line::new(c, d)),
        PathSeg::Line(Line::new(d, a)),
    ]
}

/// Parameters in `[0, 1]` where `f` changes sign, refined by bisection.
fn segment_roots(f: impl Fn(f64) -> f64) -> Vec<f64> {
    let mut roots = Vec::new();
    let mut t0 = 0.0;
    let mut f0 = f(t0);
    if f0 == 0.0 {
        roots.push(t0);
    }
    for i in 1..=ROOT_SAMPLES {
        let t1 = i as f64 / ROOT_SAMPLES as f64;
        let f1 = f(t1);
        if f1 == 0.0 {
            roots.push(t1);
        } else if f0 != 0.0 && f0.signum() != f1.signum() {
            roots.push(bisect(&f, t0, t1, f0));
        }
        t0 = t1;
        f0 = f1;
    }
    roots
}

fn bisect(f: &impl Fn(f64) -> f64, mut lo: f64, mut hi: f64, mut f_lo: f64) -> f64 {
    for _ in 0..ROOT_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        let f_mid = f(mid);
        if f_mid == 0.0 {
            return mid;
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::document::{Document, Item};
    use crate::snap::results::closest_point;
    use crate::snap::{IgnoredObject, RecordingDiagnostics, SnapPreferences, SnapSourceType};
    use kurbo::{CubicBez, Size, Vec2};

    fn document_with_square() -> Document {
        let mut document = Document::new(Size::new(100.0, 100.0));
        document.add_item(Item::rect(Rect::new(20.0, 20.0, 30.0, 30.0)));
        document
    }

    fn snap(
        document: &Document,
        prefs: &SnapPreferences,
        ignore: Vec<IgnoredObject>,
        p: &SnapCandidatePoint,
        constraint: Option<SnapConstraint>,
    ) -> IntermSnapResults {
        let camera = Camera::new();
        let diagnostics = RecordingDiagnostics::new();
        let env = SnapEnv {
            prefs,
            document,
            camera: &camera,
            ignore,
            unselected_nodes: Vec::new(),
            diagnostics: &diagnostics,
        };
        let mut collector = CandidateCollector::new();
        let mut isr = IntermSnapResults::default();
        match constraint {
            Some(c) => ObjectSnapper.constrained_snap(&env, &mut collector, &mut isr, p, None, &c),
            None => ObjectSnapper.free_snap(&env, &mut collector, &mut isr, p, None),
        }
        isr
    }

    #[test]
    fn test_node_source_snaps_to_closest_node() {
        let document = document_with_square();
        let prefs = SnapPreferences::default();
        let p = SnapCandidatePoint::new(Point::new(21.0, 21.0), SnapSourceType::NodeCusp);
        let isr = snap(&document, &prefs, Vec::new(), &p, None);

        // Every node and line midpoint within 10 px is reported
        assert!(isr.points.iter().all(|sp| sp.distance <= 10.0));
        assert!(isr.points.iter().any(|sp| sp.point.distance(Point::new(30.0, 20.0)) < 1e-9));
        assert!(isr.points.iter().any(|sp| sp.target == SnapTargetType::LineMidpoint));
        assert!(!isr.points.iter().any(|sp| sp.point.distance(Point::new(30.0, 30.0)) < 1e-9));
        let closest = closest_point(&isr.points).unwrap();
        assert_eq!(closest.target, SnapTargetType::NodeCusp);
        assert!(closest.point.distance(Point::new(20.0, 20.0)) < 1e-9);
        assert!(closest.fully_constrained);
        assert_eq!(isr.curves.len(), 4);
        assert!(isr.curves.iter().all(|c| c.target == SnapTargetType::Path));
    }

    #[test]
    fn test_bbox_source_snaps_to_bbox_only_when_strict() {
        let document = document_with_square();
        let mut prefs = SnapPreferences::default();
        prefs.visual_bbox = false;
        let p = SnapCandidatePoint::new(Point::new(21.0, 21.0), SnapSourceType::BBoxCorner);
        let isr = snap(&document, &prefs, Vec::new(), &p, None);

        assert_eq!(isr.points.len(), 3);
        assert!(isr.points.iter().all(|sp| sp.target == SnapTargetType::BBoxCorner));
        assert!(isr.points.iter().all(|sp| sp.target_bbox == Some(Rect::new(20.0, 20.0, 30.0, 30.0))));
        let closest = closest_point(&isr.points).unwrap();
        assert!(closest.point.distance(Point::new(20.0, 20.0)) < 1e-9);
        assert!(isr.curves.iter().all(|c| c.target == SnapTargetType::BBoxEdge));
    }

    #[test]
    fn test_constrained_snap_crosses_outline() {
        let document = document_with_square();
        let prefs = SnapPreferences::default();
        let p = SnapCandidatePoint::new(Point::new(21.0, 25.0), SnapSourceType::NodeCusp);
        let constraint = SnapConstraint::line(Point::new(0.0, 25.0), Vec2::new(1.0, 0.0));
        let isr = snap(&document, &prefs, Vec::new(), &p, Some(constraint));

        let crossing = isr
            .points
            .iter()
            .find(|sp| sp.target == SnapTargetType::Path && sp.point.distance(Point::new(20.0, 25.0)) < 1e-9)
            .unwrap();
        assert!(crossing.fully_constrained);
        assert!(crossing.constrained_snap);
        assert!(isr.curves.is_empty());
    }

    #[test]
    fn test_perpendicular_from_origin() {
        let document = document_with_square();
        let mut prefs = SnapPreferences::default();
        prefs.set_target_snappable(SnapTargetType::PathPerpendicular, true);
        let mut p = SnapCandidatePoint::new(Point::new(25.0, 21.0), SnapSourceType::NodeCusp);
        p.add_origin(Point::new(25.0, 0.0));
        let isr = snap(&document, &prefs, Vec::new(), &p, None);

        assert!(isr.points.iter().any(|sp| {
            sp.target == SnapTargetType::PathPerpendicular && sp.point.distance(Point::new(25.0, 20.0)) < 1e-9
        }));
    }

    #[test]
    fn test_tangent_to_curve_from_origin() {
        let mut document = Document::new(Size::new(100.0, 100.0));
        // Symmetric arch whose apex is at (50, 25)
        let arch = CubicBez::new((40.0, 40.0), (40.0, 20.0), (60.0, 20.0), (60.0, 40.0));
        let mut path = kurbo::BezPath::new();
        path.move_to(arch.p0);
        path.curve_to(arch.p1, arch.p2, arch.p3);
        document.add_item(Item::path(path));

        let mut prefs = SnapPreferences::default();
        prefs.set_target_snappable(SnapTargetType::PathTangential, true);
        let mut p = SnapCandidatePoint::new(Point::new(50.0, 24.0), SnapSourceType::NodeCusp);
        p.add_vector(Vec2::new(1.0, 0.0));
        let isr = snap(&document, &prefs, Vec::new(), &p, None);

        let tangent = isr
            .points
            .iter()
            .find(|sp| sp.target == SnapTargetType::PathTangential)
            .unwrap();
        assert!((tangent.point.x - 50.0).abs() < 1e-6);
        assert!((tangent.point.y - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_page_targets_respect_ignore() {
        let document = Document::new(Size::new(100.0, 100.0));
        let prefs = SnapPreferences::default();
        let p = SnapCandidatePoint::new(Point::new(2.0, 98.0), SnapSourceType::NodeCusp);

        let isr = snap(&document, &prefs, Vec::new(), &p, None);
        assert_eq!(isr.points.len(), 1);
        assert_eq!(isr.points[0].target, SnapTargetType::PageEdgeCorner);
        assert!(isr.curves.iter().all(|c| c.target == SnapTargetType::PageEdgeBorder));

        let isr = snap(&document, &prefs, vec![IgnoredObject::Page], &p, None);
        assert!(isr.is_empty());
    }

    #[test]
    fn test_ellipse_quadrant_point() {
        let mut document = Document::new(Size::new(200.0, 200.0));
        document.add_item(Item::ellipse(Point::new(100.0, 100.0), Vec2::new(10.0, 5.0)));
        let mut prefs = SnapPreferences::default();
        prefs.set_target_snappable(SnapTargetType::NodeCusp, false);
        prefs.set_target_snappable(SnapTargetType::NodeSmooth, false);
        let p = SnapCandidatePoint::new(Point::new(100.5, 106.0), SnapSourceType::NodeCusp);
        let isr = snap(&document, &prefs, Vec::new(), &p, None);

        assert_eq!(isr.points.len(), 1);
        assert_eq!(isr.points[0].target, SnapTargetType::EllipseQuadrant);
        assert!(isr.points[0].point.distance(Point::new(100.0, 105.0)) < 1e-9);
    }

    #[test]
    fn test_segment_roots_finds_sign_changes() {
        let roots = segment_roots(|t| t - 0.3);
        assert_eq!(roots.len(), 1);
        assert!((roots[0] - 0.3).abs() < 1e-9);
        assert!(segment_roots(|_| 1.0).is_empty());
    }
}
