//! Transformations that snap a whole set of points at once.
//!
//! Every point of the set is transformed with the proposed parameters and
//! snapped on its own. Each snap implies new parameters; those of the best
//! snap win and become the result.

use super::candidate::SnapCandidatePoint;
use super::manager::SnapSession;
use super::results::SnappedPoint;
use crate::geom::SnapConstraint;
use kurbo::{Affine, Point, Rect, Vec2};

/// Offsets from the origin shorter than this cannot carry a scale, skew or angle.
const MIN_LEVER: f64 = 1e-4;

/// Scales closer to zero than this would collapse the selection.
const MIN_SCALE: f64 = 1e-6;

/// A coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dim {
    X,
    Y,
}

impl Dim {
    pub fn other(self) -> Dim {
        match self {
            Dim::X => Dim::Y,
            Dim::Y => Dim::X,
        }
    }

    pub fn of(self, v: Vec2) -> f64 {
        match self {
            Dim::X => v.x,
            Dim::Y => v.y,
        }
    }

    pub fn unit(self) -> Vec2 {
        match self {
            Dim::X => Vec2::new(1.0, 0.0),
            Dim::Y => Vec2::new(0.0, 1.0),
        }
    }
}

fn reject(snapped: &mut SnappedPoint) {
    snapped.snapped = false;
    snapped.distance = f64::INFINITY;
}

/// A transformation whose parameters are adjusted by snapping.
pub trait PureTransform {
    /// The transformation with the parameters as proposed.
    fn proposed(&self) -> Affine;

    /// The transformation with the parameters of the best snap, or the
    /// proposed ones if nothing snapped.
    fn snapped(&self) -> Affine;

    /// Snap one transformed point. `original` is where it came from.
    fn snap_point(
        &self,
        session: &mut SnapSession<'_>,
        p: &SnapCandidatePoint,
        original: Point,
        bbox: Option<Rect>,
    ) -> SnappedPoint;

    /// Derive the parameters implied by `snapped`. A snap that implies no
    /// usable parameters is marked as not snapped.
    fn store_transform(&mut self, original: &SnapCandidatePoint, snapped: &mut SnappedPoint);

    /// Keep the parameters last derived as the result.
    fn commit(&mut self);

    fn best_snapped_point(&self) -> &SnappedPoint;

    fn set_best_snapped_point(&mut self, best: SnappedPoint);

    fn transform_point(&self, p: Point) -> Point {
        self.proposed() * p
    }

    /// Snap every point of `points`; the best snap decides the parameters.
    fn snap(&mut self, session: &mut SnapSession<'_>, points: &[SnapCandidatePoint], pointer: Point) {
        let transformed: Vec<SnapCandidatePoint> = points
            .iter()
            .enumerate()
            .map(|(i, p)| SnapCandidatePoint::new(self.transform_point(p.point), p.source).with_source_num(i))
            .collect();
        let bbox = transformed
            .iter()
            .map(|p| Rect::from_points(p.point, p.point))
            .reduce(|a, b| a.union(b));

        let mut best = SnappedPoint::unsnapped(pointer);
        for (original, candidate) in points.iter().zip(&transformed) {
            let mut snapped = self.snap_point(session, candidate, original.point, bbox);
            if !snapped.snapped {
                continue;
            }
            self.store_transform(original, &mut snapped);
            if snapped.snapped && best.is_other_snap_better(&snapped) {
                self.commit();
                best = snapped;
            }
        }
        self.set_best_snapped_point(best);
    }
}

/// Moving by a vector, freely or along one axis.
#[derive(Debug, Clone)]
pub struct PureTranslate {
    translation: Vec2,
    direction: Option<Dim>,
    pending: Vec2,
    translation_snapped: Vec2,
    best: SnappedPoint,
}

impl PureTranslate {
    pub fn new(translation: Vec2) -> Self {
        Self {
            translation,
            direction: None,
            pending: translation,
            translation_snapped: translation,
            best: SnappedPoint::unsnapped(Point::ZERO),
        }
    }

    /// A translation that may only change along `direction`.
    pub fn constrained(translation: Vec2, direction: Dim) -> Self {
        Self {
            direction: Some(direction),
            ..Self::new(translation)
        }
    }

    pub fn translation_snapped(&self) -> Vec2 {
        self.translation_snapped
    }
}

impl PureTransform for PureTranslate {
    fn proposed(&self) -> Affine {
        Affine::translate(self.translation)
    }

    fn snapped(&self) -> Affine {
        Affine::translate(self.translation_snapped)
    }

    fn snap_point(
        &self,
        session: &mut SnapSession<'_>,
        p: &SnapCandidatePoint,
        _original: Point,
        bbox: Option<Rect>,
    ) -> SnappedPoint {
        match self.direction {
            Some(dim) => session.constrained_snap(p, &SnapConstraint::line(p.point, dim.unit()), bbox),
            None => session.free_snap(p, bbox, false),
        }
    }

    fn store_transform(&mut self, original: &SnapCandidatePoint, snapped: &mut SnappedPoint) {
        self.pending = snapped.point - original.point;
    }

    fn commit(&mut self) {
        self.translation_snapped = self.pending;
    }

    fn best_snapped_point(&self) -> &SnappedPoint {
        &self.best
    }

    fn set_best_snapped_point(&mut self, best: SnappedPoint) {
        self.best = best;
    }
}

fn scale_about(scale: Vec2, origin: Point) -> Affine {
    Affine::translate(origin.to_vec2()) * Affine::scale_non_uniform(scale.x, scale.y) * Affine::translate(-origin.to_vec2())
}

/// Scaling about an origin. A uniform scale keeps each point on its ray
/// from the origin.
#[derive(Debug, Clone)]
pub struct PureScale {
    scale: Vec2,
    origin: Point,
    uniform: bool,
    pending: Vec2,
    scale_snapped: Vec2,
    best: SnappedPoint,
}

impl PureScale {
    pub fn new(scale: Vec2, origin: Point, uniform: bool) -> Self {
        Self {
            scale,
            origin,
            uniform,
            pending: scale,
            scale_snapped: scale,
            best: SnappedPoint::unsnapped(Point::ZERO),
        }
    }

    pub fn scale_snapped(&self) -> Vec2 {
        self.scale_snapped
    }
}

impl PureTransform for PureScale {
    fn proposed(&self) -> Affine {
        scale_about(self.scale, self.origin)
    }

    fn snapped(&self) -> Affine {
        scale_about(self.scale_snapped, self.origin)
    }

    fn snap_point(
        &self,
        session: &mut SnapSession<'_>,
        p: &SnapCandidatePoint,
        _original: Point,
        bbox: Option<Rect>,
    ) -> SnappedPoint {
        if !self.uniform {
            return session.free_snap(p, bbox, false);
        }
        let ray = p.point - self.origin;
        if ray.hypot() < MIN_LEVER {
            return SnappedPoint::unsnapped(p.point);
        }
        session.constrained_snap(p, &SnapConstraint::line(self.origin, ray), bbox)
    }

    fn store_transform(&mut self, original: &SnapCandidatePoint, snapped: &mut SnappedPoint) {
        let a = snapped.point - self.origin;
        let b = original.point - self.origin;
        let mut result = self.scale;
        let mut scaled = [false; 2];
        for (i, dim) in [Dim::X, Dim::Y].into_iter().enumerate() {
            if dim.of(b).abs() > MIN_LEVER {
                let s = dim.of(a) / dim.of(b);
                match dim {
                    Dim::X => result.x = s,
                    Dim::Y => result.y = s,
                }
                scaled[i] = true;
            }
        }
        if !scaled[0] && !scaled[1] {
            reject(snapped);
            return;
        }
        if self.uniform {
            // Trust the axis with the longer lever
            let s = if b.x.abs() >= b.y.abs() { result.x } else { result.y };
            result = Vec2::new(s, s);
        }
        if result.x.abs() < MIN_SCALE || result.y.abs() < MIN_SCALE {
            reject(snapped);
            return;
        }
        self.pending = result;
    }

    fn commit(&mut self) {
        self.scale_snapped = self.pending;
    }

    fn best_snapped_point(&self) -> &SnappedPoint {
        &self.best
    }

    fn set_best_snapped_point(&mut self, best: SnappedPoint) {
        self.best = best;
    }
}

/// Scaling along one axis about an origin, optionally uniform.
#[derive(Debug, Clone)]
pub struct PureStretch {
    stretch: f64,
    origin: Point,
    direction: Dim,
    uniform: bool,
    pending: f64,
    stretch_snapped: f64,
    best: SnappedPoint,
}

impl PureStretch {
    pub fn new(stretch: f64, origin: Point, direction: Dim, uniform: bool) -> Self {
        Self {
            stretch,
            origin,
            direction,
            uniform,
            pending: stretch,
            stretch_snapped: stretch,
            best: SnappedPoint::unsnapped(Point::ZERO),
        }
    }

    pub fn stretch_snapped(&self) -> f64 {
        self.stretch_snapped
    }

    fn scale_vector(&self, stretch: f64) -> Vec2 {
        let across = if self.uniform { stretch } else { 1.0 };
        match self.direction {
            Dim::X => Vec2::new(stretch, across),
            Dim::Y => Vec2::new(across, stretch),
        }
    }
}

impl PureTransform for PureStretch {
    fn proposed(&self) -> Affine {
        scale_about(self.scale_vector(self.stretch), self.origin)
    }

    fn snapped(&self) -> Affine {
        scale_about(self.scale_vector(self.stretch_snapped), self.origin)
    }

    fn snap_point(
        &self,
        session: &mut SnapSession<'_>,
        p: &SnapCandidatePoint,
        _original: Point,
        bbox: Option<Rect>,
    ) -> SnappedPoint {
        let constraint = if self.uniform {
            let ray = p.point - self.origin;
            if ray.hypot() < MIN_LEVER {
                return SnappedPoint::unsnapped(p.point);
            }
            SnapConstraint::line(self.origin, ray)
        } else {
            SnapConstraint::line(p.point, self.direction.unit())
        };
        session.constrained_snap(p, &constraint, bbox)
    }

    fn store_transform(&mut self, original: &SnapCandidatePoint, snapped: &mut SnappedPoint) {
        let a = self.direction.of(snapped.point - self.origin);
        let b = self.direction.of(original.point - self.origin);
        if b.abs() <= MIN_LEVER {
            reject(snapped);
            return;
        }
        let stretch = a / b;
        if stretch.abs() < MIN_SCALE {
            reject(snapped);
            return;
        }
        self.pending = stretch;
    }

    fn commit(&mut self) {
        self.stretch_snapped = self.pending;
    }

    fn best_snapped_point(&self) -> &SnappedPoint {
        &self.best
    }

    fn set_best_snapped_point(&mut self, best: SnappedPoint) {
        self.best = best;
    }
}

/// Skewing along one axis about an origin, combined with a fixed scale on
/// that axis.
#[derive(Debug, Clone)]
pub struct PureSkew {
    skew: f64,
    scale: f64,
    origin: Point,
    direction: Dim,
    pending: f64,
    skew_snapped: f64,
    best: SnappedPoint,
}

impl PureSkew {
    pub fn new(skew: f64, scale: f64, origin: Point, direction: Dim) -> Self {
        Self {
            skew,
            scale,
            origin,
            direction,
            pending: skew,
            skew_snapped: skew,
            best: SnappedPoint::unsnapped(Point::ZERO),
        }
    }

    pub fn skew_snapped(&self) -> f64 {
        self.skew_snapped
    }

    fn affine(&self, skew: f64) -> Affine {
        let o = self.origin;
        match self.direction {
            Dim::X => Affine::new([self.scale, 0.0, skew, 1.0, o.x - o.x * self.scale - o.y * skew, 0.0]),
            Dim::Y => Affine::new([1.0, skew, 0.0, self.scale, 0.0, o.y - o.x * skew - o.y * self.scale]),
        }
    }
}

impl PureTransform for PureSkew {
    fn proposed(&self) -> Affine {
        self.affine(self.skew)
    }

    fn snapped(&self) -> Affine {
        self.affine(self.skew_snapped)
    }

    fn snap_point(
        &self,
        session: &mut SnapSession<'_>,
        p: &SnapCandidatePoint,
        _original: Point,
        bbox: Option<Rect>,
    ) -> SnappedPoint {
        session.constrained_snap(p, &SnapConstraint::line(p.point, self.direction.unit()), bbox)
    }

    fn store_transform(&mut self, original: &SnapCandidatePoint, snapped: &mut SnappedPoint) {
        let dim = self.direction;
        let lever = dim.other().of(original.point - self.origin);
        if lever.abs() <= MIN_LEVER {
            reject(snapped);
            return;
        }
        let moved = dim.of(snapped.point - self.origin) - dim.of(original.point - self.origin) * self.scale;
        self.pending = moved / lever;
    }

    fn commit(&mut self) {
        self.skew_snapped = self.pending;
    }

    fn best_snapped_point(&self) -> &SnappedPoint {
        &self.best
    }

    fn set_best_snapped_point(&mut self, best: SnappedPoint) {
        self.best = best;
    }
}

/// Rotation about an origin; every point stays on its circle.
#[derive(Debug, Clone)]
pub struct PureRotate {
    angle: f64,
    origin: Point,
    pending: f64,
    angle_snapped: f64,
    best: SnappedPoint,
}

impl PureRotate {
    /// `angle` in radians.
    pub fn new(angle: f64, origin: Point) -> Self {
        Self {
            angle,
            origin,
            pending: angle,
            angle_snapped: angle,
            best: SnappedPoint::unsnapped(Point::ZERO),
        }
    }

    pub fn angle_snapped(&self) -> f64 {
        self.angle_snapped
    }
}

impl PureTransform for PureRotate {
    fn proposed(&self) -> Affine {
        Affine::rotate_about(self.angle, self.origin)
    }

    fn snapped(&self) -> Affine {
        Affine::rotate_about(self.angle_snapped, self.origin)
    }

    fn snap_point(
        &self,
        session: &mut SnapSession<'_>,
        p: &SnapCandidatePoint,
        original: Point,
        bbox: Option<Rect>,
    ) -> SnappedPoint {
        let radius = original.distance(self.origin);
        if radius < MIN_LEVER {
            return SnappedPoint::unsnapped(p.point);
        }
        session.constrained_snap(p, &SnapConstraint::circle(self.origin, radius), bbox)
    }

    fn store_transform(&mut self, original: &SnapCandidatePoint, snapped: &mut SnappedPoint) {
        let a = snapped.point - self.origin;
        let b = original.point - self.origin;
        if a.hypot() < MIN_LEVER || b.hypot() < MIN_LEVER {
            reject(snapped);
            return;
        }
        self.pending = b.cross(a).atan2(b.dot(a));
    }

    fn commit(&mut self) {
        self.angle_snapped = self.pending;
    }

    fn best_snapped_point(&self) -> &SnappedPoint {
        &self.best
    }

    fn set_best_snapped_point(&mut self, best: SnappedPoint) {
        self.best = best;
    }
}
