//! Geometry helpers shared by the snappers: constraints, rounding and
//! intersections of lines, circles and path segments.

use kurbo::{
    Line, ParamCurve, ParamCurveDeriv, ParamCurveExtrema, ParamCurveNearest, PathSeg, Point, Vec2,
};
use serde::{Deserialize, Serialize};

/// Accuracy passed to kurbo's nearest-point search.
pub const NEAREST_ACCURACY: f64 = 1e-6;

/// Number of chords used when a curve has to be flattened for intersection.
const CURVE_SAMPLES: usize = 32;

/// Number of chords used when flattening a circle.
const CIRCLE_SAMPLES: usize = 64;

/// Newton steps polishing a chord crossing onto both curves.
const REFINE_STEPS: usize = 8;

/// Round `x` up to the closest value of the form `c0 + k * c1`.
pub fn round_to_upper_multiple_plus(x: f64, c1: f64, c0: f64) -> f64 {
    ((x - c0) / c1).ceil() * c1 + c0
}

/// Round `x` down to the closest value of the form `c0 + k * c1`.
pub fn round_to_lower_multiple_plus(x: f64, c1: f64, c0: f64) -> f64 {
    ((x - c0) / c1).floor() * c1 + c0
}

/// Rotate a vector by +90 degrees.
pub fn rot90(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}

/// Orthogonal projection of `p` onto the infinite line through `origin` along `direction`.
///
/// A zero direction collapses the line to its origin.
pub fn project_on_line(p: Point, origin: Point, direction: Vec2) -> Point {
    let len_sq = direction.hypot2();
    if len_sq == 0.0 {
        return origin;
    }
    let t = (p - origin).dot(direction) / len_sq;
    origin + direction * t
}

/// Intersection of two infinite lines, or `None` when they are parallel.
pub fn line_intersection(p1: Point, d1: Vec2, p2: Point, d2: Vec2) -> Option<Point> {
    let denom = d1.cross(d2);
    let scale = d1.hypot() * d2.hypot();
    if scale == 0.0 || denom.abs() <= 1e-12 * scale {
        return None;
    }
    let t = (p2 - p1).cross(d2) / denom;
    Some(p1 + d1 * t)
}

/// Intersections of an infinite line with a circle, ordered along the line.
pub fn line_circle_intersections(origin: Point, direction: Vec2, center: Point, radius: f64) -> Vec<Point> {
    let a = direction.hypot2();
    if a == 0.0 {
        return Vec::new();
    }
    let oc = origin - center;
    let b = 2.0 * direction.dot(oc);
    let c = oc.hypot2() - radius * radius;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return Vec::new();
    }
    if disc == 0.0 {
        return vec![origin + direction * (-b / (2.0 * a))];
    }
    let sq = disc.sqrt();
    vec![
        origin + direction * ((-b - sq) / (2.0 * a)),
        origin + direction * ((-b + sq) / (2.0 * a)),
    ]
}

/// A line or circle that a snapped point has to stay on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SnapConstraint {
    /// Infinite line through `origin`.
    Line { origin: Point, direction: Vec2 },
    /// Direction only; the line passes through whatever point is being snapped.
    Direction { direction: Vec2 },
    /// Circle, used when rotating about a center.
    Circle { center: Point, radius: f64 },
}

impl SnapConstraint {
    pub fn line(origin: Point, direction: Vec2) -> Self {
        SnapConstraint::Line { origin, direction }
    }

    pub fn direction_only(direction: Vec2) -> Self {
        SnapConstraint::Direction { direction }
    }

    pub fn circle(center: Point, radius: f64) -> Self {
        SnapConstraint::Circle { center, radius }
    }

    pub fn is_linear(&self) -> bool {
        !self.is_circular()
    }

    pub fn is_circular(&self) -> bool {
        matches!(self, SnapConstraint::Circle { .. })
    }

    /// Direction of a linear constraint; zero for circles.
    pub fn direction(&self) -> Vec2 {
        match *self {
            SnapConstraint::Line { direction, .. } | SnapConstraint::Direction { direction } => direction,
            SnapConstraint::Circle { .. } => Vec2::ZERO,
        }
    }

    /// Fixed point of the constraint (line origin or circle center), if any.
    pub fn point(&self) -> Option<Point> {
        match *self {
            SnapConstraint::Line { origin, .. } => Some(origin),
            SnapConstraint::Circle { center, .. } => Some(center),
            SnapConstraint::Direction { .. } => None,
        }
    }

    /// Closest point on the constraint.
    pub fn projection(&self, p: Point) -> Point {
        match *self {
            SnapConstraint::Line { origin, direction } => project_on_line(p, origin, direction),
            SnapConstraint::Direction { .. } => p,
            SnapConstraint::Circle { center, radius } => {
                let v = p - center;
                let len = v.hypot();
                if len == 0.0 {
                    center + Vec2::new(radius, 0.0)
                } else {
                    center + v * (radius / len)
                }
            }
        }
    }

    /// The constraint as an infinite line, anchored at `projected` when it has no origin.
    pub fn as_line(&self, projected: Point) -> Option<(Point, Vec2)> {
        match *self {
            SnapConstraint::Line { origin, direction } => Some((origin, direction)),
            SnapConstraint::Direction { direction } => Some((projected, direction)),
            SnapConstraint::Circle { .. } => None,
        }
    }

    /// Whether `p` lies on the constraint.
    pub fn contains(&self, p: Point, epsilon: f64) -> bool {
        match *self {
            SnapConstraint::Direction { .. } => true,
            _ => self.projection(p).distance(p) < epsilon,
        }
    }

    /// Crossings of the constraint with an infinite line.
    pub fn intersect_line(&self, projected: Point, origin: Point, direction: Vec2) -> Vec<Point> {
        match *self {
            SnapConstraint::Circle { center, radius } => {
                line_circle_intersections(origin, direction, center, radius)
            }
            _ => self
                .as_line(projected)
                .and_then(|(o, d)| line_intersection(o, d, origin, direction))
                .into_iter()
                .collect(),
        }
    }

    /// Crossings of the constraint with a path segment.
    pub fn intersect_segment(&self, projected: Point, seg: &PathSeg) -> Vec<Point> {
        match *self {
            SnapConstraint::Circle { center, radius } => segment_circle_intersections(seg, center, radius),
            _ => match self.as_line(projected) {
                Some((o, d)) => segment_line_intersections(seg, o, d)
                    .into_iter()
                    .map(|(p, _)| p)
                    .collect(),
                None => Vec::new(),
            },
        }
    }
}

/// Nearest location on a segment: (point, distance, parameter).
pub fn nearest_on_segment(seg: &PathSeg, p: Point) -> (Point, f64, f64) {
    let nearest = seg.nearest(p, NEAREST_ACCURACY);
    (seg.eval(nearest.t), nearest.distance_sq.sqrt(), nearest.t)
}

/// Unnormalized tangent of a segment at parameter `t`.
pub fn segment_tangent(seg: &PathSeg, t: f64) -> Vec2 {
    match seg {
        PathSeg::Line(line) => line.p1 - line.p0,
        PathSeg::Quad(quad) => quad.deriv().eval(t).to_vec2(),
        PathSeg::Cubic(cubic) => cubic.deriv().eval(t).to_vec2(),
    }
}

/// Crossings of a segment with an infinite line: (point, segment parameter).
pub fn segment_line_intersections(seg: &PathSeg, origin: Point, direction: Vec2) -> Vec<(Point, f64)> {
    let len = direction.hypot();
    if len == 0.0 {
        return Vec::new();
    }
    let unit = direction / len;
    let bbox = seg.bounding_box();
    let corners = [
        Point::new(bbox.x0, bbox.y0),
        Point::new(bbox.x1, bbox.y0),
        Point::new(bbox.x0, bbox.y1),
        Point::new(bbox.x1, bbox.y1),
    ];
    let (mut t_min, mut t_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for corner in corners {
        let t = (corner - origin).dot(unit);
        t_min = t_min.min(t);
        t_max = t_max.max(t);
    }
    let chord = Line::new(origin + unit * (t_min - 1.0), origin + unit * (t_max + 1.0));
    seg.intersect_line(chord)
        .iter()
        .map(|hit| (seg.eval(hit.segment_t), hit.segment_t))
        .collect()
}

/// Crossings of two segments.
///
/// Exact when either segment is a straight line. Otherwise the second curve is
/// flattened into chords and every chord crossing is polished onto both
/// curves with Newton steps.
pub fn segment_intersections(a: &PathSeg, b: &PathSeg) -> Vec<Point> {
    if let PathSeg::Line(line) = b {
        return a.intersect_line(*line).iter().map(|hit| a.eval(hit.segment_t)).collect();
    }
    if let PathSeg::Line(line) = a {
        return b.intersect_line(*line).iter().map(|hit| b.eval(hit.segment_t)).collect();
    }
    let mut hits: Vec<Point> = Vec::new();
    let step = 1.0 / CURVE_SAMPLES as f64;
    for i in 0..CURVE_SAMPLES {
        let chord = Line::new(b.eval(i as f64 * step), b.eval((i + 1) as f64 * step));
        for hit in a.intersect_line(chord) {
            let t_b = (i as f64 + hit.line_t) * step;
            let p = refine_crossing(a, b, hit.segment_t, t_b);
            if !hits.iter().any(|q| q.distance(p) < 1e-9) {
                hits.push(p);
            }
        }
    }
    hits
}

/// Solve `a(s) = b(t)` from a nearby estimate. Falls back to `a(s)` when the
/// iteration leaves the segments or the curves run parallel.
fn refine_crossing(a: &PathSeg, b: &PathSeg, s0: f64, t0: f64) -> Point {
    let (mut s, mut t) = (s0, t0);
    for _ in 0..REFINE_STEPS {
        let residual = b.eval(t) - a.eval(s);
        if residual.hypot2() < 1e-24 {
            break;
        }
        // a'(s) ds - b'(t) dt = b(t) - a(s)
        let da = segment_tangent(a, s);
        let db = -segment_tangent(b, t);
        let det = da.cross(db);
        if det.abs() < 1e-12 {
            return a.eval(s0);
        }
        s += residual.cross(db) / det;
        t += da.cross(residual) / det;
        if !(0.0..=1.0).contains(&s) || !(0.0..=1.0).contains(&t) {
            return a.eval(s0);
        }
    }
    a.eval(s)
}

/// Crossings of a segment with a circle, projected back onto the circle.
pub fn segment_circle_intersections(seg: &PathSeg, center: Point, radius: f64) -> Vec<Point> {
    if let PathSeg::Line(line) = seg {
        return line_circle_intersections(line.p0, line.p1 - line.p0, center, radius)
            .into_iter()
            .filter(|p| {
                let t = (*p - line.p0).dot(line.p1 - line.p0) / (line.p1 - line.p0).hypot2();
                (0.0..=1.0).contains(&t)
            })
            .collect();
    }
    let circle = SnapConstraint::circle(center, radius);
    let mut hits: Vec<Point> = Vec::new();
    let step = std::f64::consts::TAU / CIRCLE_SAMPLES as f64;
    for i in 0..CIRCLE_SAMPLES {
        let a0 = i as f64 * step;
        let a1 = a0 + step;
        let chord = Line::new(
            center + Vec2::from_angle(a0) * radius,
            center + Vec2::from_angle(a1) * radius,
        );
        for hit in seg.intersect_line(chord) {
            let p = circle.projection(seg.eval(hit.segment_t));
            if !hits.iter().any(|q| q.distance(p) < 1e-9) {
                hits.push(p);
            }
        }
    }
    hits
}

/// Whether two rectangles touch or overlap; degenerate rectangles count.
pub fn rects_intersect(a: kurbo::Rect, b: kurbo::Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

/// Whether `p` lies inside or on the border of `r`.
pub fn rect_contains(r: kurbo::Rect, p: Point) -> bool {
    p.x >= r.x0 && p.x <= r.x1 && p.y >= r.y0 && p.y <= r.y1
}
