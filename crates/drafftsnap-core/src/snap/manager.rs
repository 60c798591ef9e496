//! The snap manager and its per-gesture snap session.

use super::candidate::{IgnoredObject, OriginOrVector, SnapCandidatePoint, SnapSourceCategory, SnapSourceType, SnapTargetType};
use super::collector::CandidateCollector;
use super::diagnostics::{Diagnostics, RateLimitedLog};
use super::indicator::{NullIndicator, SnapIndicator};
use super::preferences::SnapPreferences;
use super::results::{IntermSnapResults, SnappedPoint};
use super::selector;
use super::transform::PureTransform;
use super::{SnapEnv, SnapperKind};
use crate::camera::Camera;
use crate::document::{Document, Guide, GuideId, ItemId};
use crate::geom::{SnapConstraint, rot90, round_to_lower_multiple_plus, round_to_upper_multiple_plus};
use kurbo::{Point, Rect, Vec2};
use std::f64::consts::{FRAC_PI_2, PI};

/// Tangents shorter than this carry no direction.
const TANGENT_EPSILON: f64 = 1e-6;

/// What a gesture should leave alone.
#[derive(Debug, Clone)]
pub struct SetupOptions {
    /// Objects that must not be snapped to, usually the dragged selection.
    pub ignore: Vec<IgnoredObject>,
    /// Nodes of the edited path that stay put.
    pub unselected_nodes: Vec<SnapCandidatePoint>,
    /// Whether the indicator is told about the snaps of this gesture.
    pub indicator_enabled: bool,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            ignore: Vec::new(),
            unselected_nodes: Vec::new(),
            indicator_enabled: true,
        }
    }
}

/// Owns the snapping preferences and the collaborators notified while
/// snapping. Every gesture starts with [`SnapManager::setup`].
pub struct SnapManager {
    pub preferences: SnapPreferences,
    indicator: Box<dyn SnapIndicator>,
    diagnostics: Box<dyn Diagnostics>,
}

impl Default for SnapManager {
    fn default() -> Self {
        Self::new(SnapPreferences::default())
    }
}

impl SnapManager {
    pub fn new(preferences: SnapPreferences) -> Self {
        Self {
            preferences,
            indicator: Box::new(NullIndicator),
            diagnostics: Box::new(RateLimitedLog::default()),
        }
    }

    pub fn with_indicator(mut self, indicator: Box<dyn SnapIndicator>) -> Self {
        self.indicator = indicator;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Box<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Start a gesture. The gesture ends when the session is dropped.
    pub fn setup<'a>(&'a mut self, document: &'a Document, camera: &'a Camera, options: SetupOptions) -> SnapSession<'a> {
        let SnapManager {
            preferences,
            indicator,
            diagnostics,
        } = self;
        log::debug!(
            "Snap session started ({} ignored objects, {} unselected nodes)",
            options.ignore.len(),
            options.unselected_nodes.len()
        );
        SnapSession {
            env: SnapEnv {
                prefs: preferences,
                document,
                camera,
                ignore: options.ignore,
                unselected_nodes: options.unselected_nodes,
                diagnostics: &**diagnostics,
            },
            collector: CandidateCollector::new(),
            indicator: &mut **indicator,
            indicator_enabled: options.indicator_enabled,
        }
    }

    /// Start a gesture that ignores the selected items.
    pub fn setup_ignore_selection<'a>(
        &'a mut self,
        document: &'a Document,
        camera: &'a Camera,
        selection: &[ItemId],
        unselected_nodes: Vec<SnapCandidatePoint>,
        indicator_enabled: bool,
    ) -> SnapSession<'a> {
        let options = SetupOptions {
            ignore: selection.iter().copied().map(IgnoredObject::Item).collect(),
            unselected_nodes,
            indicator_enabled,
        };
        self.setup(document, camera, options)
    }
}

/// One gesture worth of snapping.
///
/// The candidates near the dragged point are collected on the first snap
/// and reused until the session is dropped.
pub struct SnapSession<'a> {
    env: SnapEnv<'a>,
    collector: CandidateCollector<'a>,
    indicator: &'a mut dyn SnapIndicator,
    indicator_enabled: bool,
}

impl Drop for SnapSession<'_> {
    fn drop(&mut self) {
        log::debug!(
            "Snap session ended ({} object candidates collected)",
            self.collector.object_candidates().len()
        );
    }
}

impl<'a> SnapSession<'a> {
    pub fn env(&self) -> &SnapEnv<'a> {
        &self.env
    }

    pub fn preferences(&self) -> &SnapPreferences {
        self.env.prefs
    }

    pub fn collector(&self) -> &CandidateCollector<'a> {
        &self.collector
    }

    pub fn indicator_enabled(&self) -> bool {
        self.indicator_enabled
    }

    pub fn ignored_guide(&self) -> Option<GuideId> {
        self.env.ignored_guide()
    }

    pub fn is_page_ignored(&self) -> bool {
        self.env.is_page_ignored()
    }

    /// Whether any snapper could snap; with `immediately`, a postponed snap counts as no.
    pub fn some_snapper_might_snap(&self, immediately: bool) -> bool {
        let prefs = self.env.prefs;
        if !prefs.snap_enabled || (immediately && prefs.snap_postponed) {
            return false;
        }
        SnapperKind::all(&self.env).iter().any(|s| s.might_snap(&self.env))
    }

    pub fn grid_snapper_might_snap(&self) -> bool {
        if !self.env.prefs.is_active() {
            return false;
        }
        SnapperKind::grids(&self.env).iter().any(|s| s.might_snap(&self.env))
    }

    fn free_results(&mut self, p: &SnapCandidatePoint, bbox_to_snap: Option<Rect>) -> IntermSnapResults {
        let mut isr = IntermSnapResults::default();
        for snapper in SnapperKind::all(&self.env) {
            if snapper.might_snap(&self.env) {
                snapper.free_snap(&self.env, &mut self.collector, &mut isr, p, bbox_to_snap);
            }
        }
        isr
    }

    fn constrained_results(
        &mut self,
        p: &SnapCandidatePoint,
        bbox_to_snap: Option<Rect>,
        constraint: &SnapConstraint,
    ) -> IntermSnapResults {
        let mut isr = IntermSnapResults::default();
        for snapper in SnapperKind::all(&self.env) {
            if snapper.might_snap(&self.env) {
                snapper.constrained_snap(&self.env, &mut self.collector, &mut isr, p, bbox_to_snap, constraint);
            }
        }
        isr
    }

    /// Pick the best snap among `isr`, telling the indicator if enabled.
    pub fn find_best_snap(
        &mut self,
        p: &SnapCandidatePoint,
        isr: &IntermSnapResults,
        constrained: bool,
        allow_offscreen: bool,
        to_paths_only: bool,
    ) -> SnappedPoint {
        let indicator: Option<&mut dyn SnapIndicator> = if self.indicator_enabled {
            Some(&mut *self.indicator as &mut dyn SnapIndicator)
        } else {
            None
        };
        selector::find_best_snap(&self.env, indicator, p, isr, constrained, allow_offscreen, to_paths_only)
    }

    fn unsnapped(p: &SnapCandidatePoint) -> SnappedPoint {
        let mut sp = SnappedPoint::unsnapped(p.point);
        sp.set_source(p.source);
        sp.source_num = p.source_num;
        sp
    }

    /// The result of a constrained snap that found nothing: `at`, on the constraint.
    fn no_snap(p: &SnapCandidatePoint, at: Point) -> SnappedPoint {
        let mut sp = SnappedPoint::new(
            at,
            p.source,
            p.source_num,
            SnapTargetType::Constraint,
            f64::INFINITY,
            0.0,
            false,
        );
        sp.constrained_snap = true;
        sp
    }

    /// Snap `p` to whatever is closest.
    pub fn free_snap(&mut self, p: &SnapCandidatePoint, bbox_to_snap: Option<Rect>, to_paths_only: bool) -> SnappedPoint {
        if !self.some_snapper_might_snap(true) {
            return Self::unsnapped(p);
        }
        let isr = self.free_results(p, bbox_to_snap);
        self.find_best_snap(p, &isr, false, false, to_paths_only)
    }

    /// Free snap that moves `point` only if it snapped.
    pub fn free_snap_in_place(&mut self, point: &mut Point, source: SnapSourceType, bbox_to_snap: Option<Rect>) {
        let candidate = SnapCandidatePoint::new(*point, source);
        if let Some(snapped) = self.free_snap(&candidate, bbox_to_snap, false).point_if_snapped() {
            *point = snapped;
        }
    }

    /// Show where `p` would snap, as a pre-snap indication, without moving anything.
    pub fn pre_snap(&mut self, p: &SnapCandidatePoint, to_paths_only: bool) {
        if !self.indicator_enabled {
            return;
        }
        self.indicator_enabled = false;
        let snapped = self.free_snap(p, None, to_paths_only);
        self.indicator_enabled = true;
        if snapped.snapped {
            self.indicator.set_target(&snapped, true);
        } else {
            self.indicator.remove_target(true);
        }
    }

    /// Snap `p` while keeping it on `constraint`.
    ///
    /// Without a match the result is `p` projected onto the constraint,
    /// with a [`SnapTargetType::Constraint`] target.
    pub fn constrained_snap(
        &mut self,
        p: &SnapCandidatePoint,
        constraint: &SnapConstraint,
        bbox_to_snap: Option<Rect>,
    ) -> SnappedPoint {
        let no_snap = Self::no_snap(p, constraint.projection(p.point));
        if !self.some_snapper_might_snap(true) {
            return no_snap;
        }

        // Snapping the pointer reaches targets that do not cross the constraint
        if self.env.prefs.snap_mouse_pointer && p.single_handle {
            let mut result = self.free_snap(p, bbox_to_snap, false);
            if !result.snapped {
                return no_snap;
            }
            result.set_point(constraint.projection(result.point));
            return result;
        }

        let isr = self.constrained_results(p, bbox_to_snap, constraint);
        let result = self.find_best_snap(p, &isr, true, false, false);
        if result.snapped { result } else { no_snap }
    }

    /// Constrained snap that always moves `point` onto the constraint.
    pub fn constrained_snap_in_place(
        &mut self,
        point: &mut Point,
        source: SnapSourceType,
        constraint: &SnapConstraint,
        bbox_to_snap: Option<Rect>,
    ) {
        let candidate = SnapCandidatePoint::new(*point, source);
        *point = self.constrained_snap(&candidate, constraint, bbox_to_snap).point;
    }

    /// Snap along whichever of `constraints` passes closest to `p`.
    ///
    /// Only that one constraint is tried. With `dont_snap` the point is just
    /// projected onto it.
    pub fn multiple_constrained_snaps(
        &mut self,
        p: &SnapCandidatePoint,
        constraints: &[SnapConstraint],
        dont_snap: bool,
        bbox_to_snap: Option<Rect>,
    ) -> SnappedPoint {
        let mut no_snap = Self::no_snap(p, p.point);
        let Some(mut closest) = constraints.first().copied() else {
            return no_snap;
        };
        let mut projection = closest.projection(p.point);
        for constraint in &constraints[1..] {
            let candidate = constraint.projection(p.point);
            if candidate.distance(p.point) < projection.distance(p.point) {
                projection = candidate;
                closest = *constraint;
            }
        }
        no_snap.set_point(projection);

        if dont_snap || !self.some_snapper_might_snap(true) {
            return no_snap;
        }

        let result = if self.env.prefs.snap_mouse_pointer && p.single_handle {
            let mut result = self.free_snap(p, bbox_to_snap, false);
            result.set_point(closest.projection(result.point));
            result
        } else {
            let isr = self.constrained_results(p, bbox_to_snap, &closest);
            self.find_best_snap(p, &isr, true, false, false)
        };
        if result.snapped { result } else { no_snap }
    }

    /// Snap `p` to the angular increments of `PI / snaps_per_half_rotation`
    /// around `origin`, counted from `reference` when given.
    ///
    /// Without an explicit count the `rotation_snaps_per_pi` preference is
    /// used. Zero increments disable angular snapping and fall back to a free
    /// snap.
    pub fn constrained_angular_snap(
        &mut self,
        p: &SnapCandidatePoint,
        reference: Option<Point>,
        origin: Point,
        snaps_per_half_rotation: Option<u32>,
    ) -> SnappedPoint {
        let snaps_per_half_rotation = snaps_per_half_rotation.unwrap_or(self.env.prefs.rotation_snaps_per_pi);
        if snaps_per_half_rotation == 0 {
            return self.free_snap(p, None, false);
        }

        let angle = angle_from_y_axis(p.point - origin);
        let increment = PI / f64::from(snaps_per_half_rotation);
        let offset = reference.map_or(0.0, |r| angle_from_y_axis(r - origin));
        let ceil = round_to_upper_multiple_plus(angle, increment, offset);
        let floor = round_to_lower_multiple_plus(angle, increment, offset);
        let constraints: Vec<SnapConstraint> = [ceil, floor]
            .into_iter()
            .map(|a| {
                let direction = a - FRAC_PI_2;
                SnapConstraint::line(origin, Vec2::new(direction.cos(), direction.sin()))
            })
            .collect();

        let mut snapped = self.multiple_constrained_snaps(p, &constraints, false, None);
        if !snapped.snapped {
            snapped.set_target(SnapTargetType::ConstrainedAngle);
        }
        snapped
    }

    /// Snap every transformed point and keep the transformation of the best
    /// snap. The indicator only shows the final choice.
    pub fn snap_transformed(&mut self, points: &[SnapCandidatePoint], pointer: Point, transform: &mut dyn PureTransform) {
        let indicator_enabled = self.indicator_enabled;
        self.indicator_enabled = false;
        transform.snap(self, points, pointer);
        self.indicator_enabled = indicator_enabled;

        let best = transform.best_snapped_point();
        if self.indicator_enabled {
            if best.snapped {
                self.indicator.set_target(best, false);
            } else {
                self.indicator.remove_target(false);
            }
        }
        if let [single] = points {
            let source = SnapCandidatePoint::new(best.point, single.source);
            self.display_snap_source(&source);
        }
    }

    /// Round a translation to the nearest multiple of a grid's pitch.
    ///
    /// The grid giving the closest multiple wins; without any, the
    /// translation is returned unchanged.
    pub fn multiple_of_grid_pitch(&mut self, translation: Vec2, origin: Point) -> Vec2 {
        if !self.env.prefs.is_active() || !self.env.document.show_grids {
            return translation;
        }

        let mut best: Option<(Vec2, SnappedPoint)> = None;
        for snapper in SnapperKind::grids(&self.env) {
            let SnapperKind::Grid(grid_snapper) = &snapper else {
                continue;
            };
            if !snapper.might_snap(&self.env) {
                continue;
            }
            // Multiples are counted from the grid origin
            let grid_origin = grid_snapper.grid().origin;
            let candidate = SnapCandidatePoint::new(grid_origin + translation, SnapSourceType::GridPitch);
            let mut isr = IntermSnapResults::default();
            snapper.free_snap(&self.env, &mut self.collector, &mut isr, &candidate, None);
            let snapped = selector::find_best_snap(&self.env, None, &candidate, &isr, false, true, false);
            if snapped.snapped && best.as_ref().is_none_or(|(_, b)| snapped.distance < b.distance) {
                best = Some((snapped.point - grid_origin, snapped));
            }
        }

        let Some((multiple, mut snapped)) = best else {
            return translation;
        };
        snapped.set_point(origin + multiple);
        if self.indicator_enabled {
            self.indicator.set_target(&snapped, false);
        }
        multiple
    }

    /// Snap a guide being dragged.
    ///
    /// With an origin the whole guide moves and `point` snaps; with a normal
    /// only the guide's origin moves along it. Unless `freeze_angle`, a snap
    /// to a curve or line turns the guide to follow its tangent, which
    /// replaces `origin_or_vector` with the new normal.
    pub fn guide_free_snap(&mut self, point: &mut Point, origin_or_vector: &mut OriginOrVector, freeze_angle: bool) {
        if freeze_angle && matches!(origin_or_vector, OriginOrVector::Origin(_)) {
            log::warn!("Cannot freeze the angle of a guide given by an origin instead of a normal");
        }
        let prefs = self.env.prefs;
        if !prefs.is_active() || !prefs.is_target_snappable(SnapTargetType::Guide) {
            return;
        }

        let candidate = match *origin_or_vector {
            OriginOrVector::Origin(origin) => {
                let mut candidate = SnapCandidatePoint::new(*point, SnapSourceType::Guide);
                candidate.add_origin(origin);
                candidate
            }
            OriginOrVector::Vector(normal) => {
                let mut candidate = SnapCandidatePoint::new(*point, SnapSourceType::GuideOrigin);
                candidate.add_vector(rot90(normal));
                candidate
            }
        };

        let isr = self.free_results(&candidate, None);
        let snapped = self.find_best_snap(&candidate, &isr, false, false, false);
        let Some(at) = snapped.point_if_snapped() else {
            return;
        };
        *point = at;
        if freeze_angle {
            return;
        }
        if let Some(tangent) = snapped.tangent.filter(|t| t.hypot() > TANGENT_EPSILON) {
            *origin_or_vector = OriginOrVector::Vector(rot90(tangent).normalize());
        }
    }

    /// Snap the origin of a guide while it slides along the guide.
    pub fn guide_constrained_snap(&mut self, point: &mut Point, guide: &Guide) {
        let prefs = self.env.prefs;
        if !prefs.is_active() || !prefs.is_target_snappable(SnapTargetType::Guide) {
            return;
        }
        let candidate = SnapCandidatePoint::new(*point, SnapSourceType::GuideOrigin);
        let constraint = SnapConstraint::line(guide.point, guide.direction());
        let isr = self.constrained_results(&candidate, None, &constraint);
        if let Some(at) = self.find_best_snap(&candidate, &isr, true, false, false).point_if_snapped() {
            *point = at;
        }
    }

    /// Mark the snap source when only the closest source point snaps.
    pub fn display_snap_source(&mut self, p: &SnapCandidatePoint) {
        let prefs = self.env.prefs;
        if !prefs.snap_closest_only {
            return;
        }
        let shown = match p.source.category() {
            Some(SnapSourceCategory::Others | SnapSourceCategory::Datums) => true,
            Some(SnapSourceCategory::Node) => prefs.is_target_snappable(SnapTargetType::NodeCategory),
            Some(SnapSourceCategory::BBox) => prefs.is_target_snappable(SnapTargetType::BBoxCategory),
            None => false,
        };
        if prefs.snap_enabled && shown {
            self.indicator.set_source(p);
        } else {
            self.indicator.remove_source();
        }
    }
}

/// Angle of `v` measured from the positive y axis.
fn angle_from_y_axis(v: Vec2) -> f64 {
    (-v.x).atan2(v.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Grid, Item};
    use crate::snap::{IndicatorEvent, RecordingDiagnostics, RecordingIndicator, ALWAYS_SNAP_TOLERANCE};
    use kurbo::Size;
    use std::rc::Rc;
    use std::time::Duration;

    fn grid_document(spacing: f64, origin: Point) -> Document {
        let mut document = Document::new(Size::new(800.0, 600.0));
        document.add_grid(Grid::rectangular(origin, Vec2::new(spacing, spacing)));
        document
    }

    fn ignore_page() -> SetupOptions {
        SetupOptions {
            ignore: vec![IgnoredObject::Page],
            ..Default::default()
        }
    }

    fn node(x: f64, y: f64) -> SnapCandidatePoint {
        SnapCandidatePoint::new(Point::new(x, y), SnapSourceType::NodeCusp)
    }

    fn is_multiple(value: f64, origin: f64, spacing: f64) -> bool {
        let k = (value - origin) / spacing;
        (k - k.round()).abs() < 1e-9
    }

    #[test]
    fn test_free_snap_lands_on_grid_multiples() {
        let origin = Point::new(3.0, 4.0);
        let document = grid_document(10.0, origin);
        let camera = Camera::new();
        let mut manager = SnapManager::default();
        let mut session = manager.setup(&document, &camera, ignore_page());
        for (x, y) in [(7.0, 2.0), (123.4, 56.7), (301.0, 299.0), (44.9, 45.1), (611.5, 18.2)] {
            let snapped = session.free_snap(&node(x, y), None, false);
            assert!(snapped.snapped, "({x}, {y}) did not snap");
            assert!(is_multiple(snapped.point.x, origin.x, 10.0));
            assert!(is_multiple(snapped.point.y, origin.y, 10.0));
        }
    }

    #[test]
    fn test_grid_scenario_at_seven_two() {
        let document = grid_document(10.0, Point::ZERO);
        let camera = Camera::new();

        let mut manager = SnapManager::default();
        manager.preferences.grid_tolerance = 5.0;
        let mut session = manager.setup(&document, &camera, ignore_page());
        let snapped = session.free_snap(&node(7.0, 2.0), None, false);
        assert!(snapped.snapped);
        assert_eq!(snapped.target, SnapTargetType::GridIntersection);
        assert!(snapped.point.distance(Point::new(10.0, 0.0)) < 1e-9);
        assert!((snapped.distance - 13f64.sqrt()).abs() < 1e-9);
        drop(session);

        manager.preferences.grid_tolerance = 2.0;
        let mut session = manager.setup(&document, &camera, ignore_page());
        let snapped = session.free_snap(&node(7.0, 2.0), None, false);
        assert!(!snapped.snapped);
        assert_eq!(snapped.point, Point::new(7.0, 2.0));
    }

    #[test]
    fn test_tolerance_boundary() {
        let document = grid_document(10.0, Point::ZERO);
        let camera = Camera::new();
        let mut manager = SnapManager::default();

        // The horizontal line is exactly 3 away, everything else further
        manager.preferences.grid_tolerance = 3.0;
        let mut session = manager.setup(&document, &camera, ignore_page());
        let snapped = session.free_snap(&node(5.0, 3.0), None, false);
        assert!(snapped.snapped);
        assert_eq!(snapped.target, SnapTargetType::GridLine);
        assert!(snapped.point.distance(Point::new(5.0, 0.0)) < 1e-12);
        drop(session);

        manager.preferences.grid_tolerance = 3.0 - 1e-9;
        let mut session = manager.setup(&document, &camera, ignore_page());
        assert!(!session.free_snap(&node(5.0, 3.0), None, false).snapped);
    }

    #[test]
    fn test_always_snap_category_wins() {
        let mut document = grid_document(100.0, Point::ZERO);
        document.add_guide(Guide::vertical(50.0));
        let camera = Camera::new();
        let mut manager = SnapManager::default();
        manager.preferences.grid_tolerance = ALWAYS_SNAP_TOLERANCE;
        let mut session = manager.setup(&document, &camera, ignore_page());

        // The guide is 3 away, the nearest grid crossing about 67
        let snapped = session.free_snap(&node(47.0, 52.0), None, false);
        assert!(snapped.snapped);
        assert!(snapped.always_snap);
        assert_eq!(snapped.target, SnapTargetType::GridIntersection);
        assert!(snapped.point.distance(Point::new(0.0, 100.0)) < 1e-9);
    }

    #[test]
    fn test_constrained_snap_falls_back_to_projection() {
        let document = Document::new(Size::new(800.0, 600.0));
        let camera = Camera::new();
        let mut manager = SnapManager::default();
        let mut session = manager.setup(&document, &camera, ignore_page());
        let constraint = SnapConstraint::line(Point::new(100.0, 100.0), Vec2::new(1.0, 2.0));
        for (x, y) in [(130.0, 105.0), (400.0, 20.0), (-50.0, 700.0)] {
            let snapped = session.constrained_snap(&node(x, y), &constraint, None);
            assert!(!snapped.snapped);
            assert_eq!(snapped.target, SnapTargetType::Constraint);
            assert!(snapped.constrained_snap);
            assert!(constraint.contains(snapped.point, 1e-9));
        }
    }

    #[test]
    fn test_constrained_snap_stays_on_constraint_when_snapping() {
        let mut document = Document::new(Size::new(800.0, 600.0));
        document.add_guide(Guide::horizontal(240.0));
        let camera = Camera::new();
        let mut manager = SnapManager::default();
        let mut session = manager.setup(&document, &camera, ignore_page());
        let constraint = SnapConstraint::line(Point::new(100.0, 40.0), Vec2::new(1.0, 2.0));
        // The guide crosses the constraint at (200, 240)
        let snapped = session.constrained_snap(&node(203.0, 236.0), &constraint, None);
        assert!(snapped.snapped);
        assert_eq!(snapped.target, SnapTargetType::Guide);
        assert!(snapped.point.distance(Point::new(200.0, 240.0)) < 1e-9);
        assert!(constraint.contains(snapped.point, 1e-9));
    }

    #[test]
    fn test_snap_mouse_pointer_reprojects_free_snap() {
        let mut document = Document::new(Size::new(800.0, 600.0));
        document.add_guide(Guide::vertical(205.0));
        let camera = Camera::new();
        let mut manager = SnapManager::default();
        manager.preferences.snap_mouse_pointer = true;
        let mut session = manager.setup(&document, &camera, ignore_page());
        let constraint = SnapConstraint::line(Point::new(0.0, 100.0), Vec2::new(1.0, 0.0));
        let snapped = session.constrained_snap(&node(200.0, 130.0).single_handle(), &constraint, None);
        assert!(snapped.snapped);
        assert!(snapped.point.distance(Point::new(205.0, 100.0)) < 1e-9);
    }

    #[test]
    fn test_in_place_variants() {
        let document = grid_document(10.0, Point::ZERO);
        let camera = Camera::new();
        let mut manager = SnapManager::default();
        let mut session = manager.setup(&document, &camera, ignore_page());

        let mut point = Point::new(21.0, 38.0);
        session.free_snap_in_place(&mut point, SnapSourceType::NodeCusp, None);
        assert!(point.distance(Point::new(20.0, 40.0)) < 1e-9);

        let mut point = Point::new(23.0, 61.0);
        let constraint = SnapConstraint::line(Point::new(0.0, 61.0), Vec2::new(1.0, 0.0));
        session.constrained_snap_in_place(&mut point, SnapSourceType::NodeCusp, &constraint, None);
        assert!(point.distance(Point::new(20.0, 61.0)) < 1e-9);
    }

    #[test]
    fn test_multiple_constrained_snaps_uses_closest_constraint() {
        let document = Document::new(Size::new(800.0, 600.0));
        let camera = Camera::new();
        let mut manager = SnapManager::default();
        let mut session = manager.setup(&document, &camera, ignore_page());
        let horizontal = SnapConstraint::line(Point::new(0.0, 300.0), Vec2::new(1.0, 0.0));
        let vertical = SnapConstraint::line(Point::new(400.0, 0.0), Vec2::new(0.0, 1.0));

        let snapped = session.multiple_constrained_snaps(&node(380.0, 310.0), &[vertical, horizontal], false, None);
        assert_eq!(snapped.target, SnapTargetType::Constraint);
        assert_eq!(snapped.point, Point::new(380.0, 300.0));

        let projected = session.multiple_constrained_snaps(&node(395.0, 200.0), &[vertical, horizontal], true, None);
        assert_eq!(projected.point, Point::new(400.0, 200.0));

        let none = session.multiple_constrained_snaps(&node(1.0, 2.0), &[], false, None);
        assert_eq!(none.point, Point::new(1.0, 2.0));
    }

    #[test]
    fn test_angular_snap_returns_multiples() {
        let document = Document::new(Size::new(800.0, 600.0));
        let camera = Camera::new();
        let mut manager = SnapManager::default();
        let mut session = manager.setup(&document, &camera, ignore_page());
        let origin = Point::new(500.0, 400.0);
        let increment = PI / 4.0;
        for (x, y) in [(530.0, 410.0), (470.0, 350.0), (505.0, 460.0), (560.0, 330.0)] {
            let snapped = session.constrained_angular_snap(&node(x, y), None, origin, Some(4));
            assert_eq!(snapped.target, SnapTargetType::ConstrainedAngle);
            let steps = angle_from_y_axis(snapped.point - origin) / increment;
            assert!((steps - steps.round()).abs() < 1e-9, "({x}, {y}) gave {steps} steps");
        }

        let snapped = session.constrained_angular_snap(&node(530.0, 410.0), None, origin, Some(4));
        assert!(snapped.point.distance(Point::new(530.0, 400.0)) < 1e-9);
    }

    #[test]
    fn test_angular_snap_counts_from_reference() {
        let document = Document::new(Size::new(800.0, 600.0));
        let camera = Camera::new();
        let mut manager = SnapManager::default();
        let mut session = manager.setup(&document, &camera, ignore_page());
        let origin = Point::new(500.0, 400.0);
        let reference = origin + Vec2::new(30f64.to_radians().cos(), 30f64.to_radians().sin()) * 50.0;
        let snapped = session.constrained_angular_snap(&node(560.0, 430.0), Some(reference), origin, Some(2));
        let offset = angle_from_y_axis(reference - origin);
        let steps = (angle_from_y_axis(snapped.point - origin) - offset) / FRAC_PI_2;
        assert!((steps - steps.round()).abs() < 1e-9);
    }

    #[test]
    fn test_angular_snap_disabled_is_free_snap() {
        let document = grid_document(10.0, Point::ZERO);
        let camera = Camera::new();
        let mut manager = SnapManager::default();
        let mut session = manager.setup(&document, &camera, ignore_page());
        let snapped = session.constrained_angular_snap(&node(21.0, 38.0), None, Point::new(0.0, 0.0), Some(0));
        assert_eq!(snapped.target, SnapTargetType::GridIntersection);
        assert!(snapped.point.distance(Point::new(20.0, 40.0)) < 1e-9);
    }

    #[test]
    fn test_angular_snap_defaults_to_rotation_preference() {
        let document = Document::new(Size::new(800.0, 600.0));
        let camera = Camera::new();
        let preferences = SnapPreferences {
            rotation_snaps_per_pi: 2,
            ..Default::default()
        };
        let mut manager = SnapManager::new(preferences);
        let mut session = manager.setup(&document, &camera, ignore_page());
        let origin = Point::new(500.0, 400.0);

        // 2 per half turn only leaves the axes, so a point at 30 degrees lands on one.
        let snapped = session.constrained_angular_snap(&node(552.0, 430.0), None, origin, None);
        assert_eq!(snapped.target, SnapTargetType::ConstrainedAngle);
        assert!(snapped.point.distance(Point::new(552.0, 400.0)) < 1e-9);

        let finer = session.constrained_angular_snap(&node(552.0, 430.0), None, origin, Some(6));
        let steps = angle_from_y_axis(finer.point - origin) / (PI / 6.0);
        assert!((steps - steps.round()).abs() < 1e-9);
        assert!(finer.point.distance(Point::new(552.0, 400.0)) > 1.0);
    }

    fn crowded_document() -> Document {
        let mut document = Document::new(Size::new(800.0, 600.0));
        for i in 0..250 {
            let x = f64::from(i % 20) * 30.0 + 10.0;
            let y = f64::from(i / 20) * 30.0 + 10.0;
            document.add_item(Item::rect(Rect::new(x, y, x + 2.0, y + 2.0)));
        }
        document
    }

    #[test]
    fn test_candidate_cap_warns_once_and_still_snaps() {
        let document = crowded_document();
        let camera = Camera::new();
        let diagnostics = RecordingDiagnostics::new();
        let mut manager = SnapManager::default().with_diagnostics(Box::new(diagnostics.clone()));
        let mut session = manager.setup(&document, &camera, ignore_page());

        let first = session.free_snap(&node(11.0, 9.0), None, false);
        let second = session.free_snap(&node(12.5, 11.0), None, false);
        assert!(session.collector().limit_reached());
        assert_eq!(session.collector().align_candidates().len(), 200);
        assert!(first.snapped && second.snapped);
        assert!(first.distance <= first.tolerance);
        assert_eq!(diagnostics.limits(), vec![200]);
    }

    #[test]
    fn test_candidate_cap_warning_is_rate_limited_across_gestures() {
        let document = crowded_document();
        let camera = Camera::new();
        let log = Rc::new(RateLimitedLog::new(Duration::from_secs(3600)));
        let mut manager = SnapManager::default().with_diagnostics(Box::new(log.clone()));
        for _ in 0..3 {
            let mut session = manager.setup(&document, &camera, ignore_page());
            session.free_snap(&node(11.0, 9.0), None, false);
        }
        assert_eq!(log.emitted(), 1);
    }

    #[test]
    fn test_free_snap_is_idempotent() {
        let mut document = grid_document(25.0, Point::ZERO);
        document.add_guide(Guide::horizontal(103.0));
        document.add_item(Item::rect(Rect::new(60.0, 60.0, 140.0, 120.0)));
        let camera = Camera::new();
        let mut manager = SnapManager::default();
        let mut session = manager.setup(&document, &camera, SetupOptions::default());
        for (x, y) in [(98.0, 101.0), (62.0, 58.0), (140.5, 90.0)] {
            let first = session.free_snap(&node(x, y), None, false);
            let second = session.free_snap(&node(x, y), None, false);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_snapping_disabled_or_postponed() {
        let document = grid_document(10.0, Point::ZERO);
        let camera = Camera::new();
        let mut manager = SnapManager::default();
        manager.preferences.snap_postponed = true;
        {
            let mut session = manager.setup(&document, &camera, SetupOptions::default());
            assert!(!session.some_snapper_might_snap(true));
            assert!(session.some_snapper_might_snap(false));
            assert!(!session.grid_snapper_might_snap());
            assert!(!session.free_snap(&node(7.0, 2.0), None, false).snapped);
        }

        manager.preferences.snap_postponed = false;
        manager.preferences.snap_enabled = false;
        let mut session = manager.setup(&document, &camera, SetupOptions::default());
        assert!(!session.some_snapper_might_snap(false));
        let constraint = SnapConstraint::line(Point::ZERO, Vec2::new(1.0, 0.0));
        let snapped = session.constrained_snap(&node(7.0, 2.0), &constraint, None);
        assert_eq!(snapped.point, Point::new(7.0, 0.0));
        assert_eq!(snapped.target, SnapTargetType::Constraint);
    }

    #[test]
    fn test_grid_snapper_might_snap_needs_visible_grid() {
        let mut document = grid_document(10.0, Point::ZERO);
        let camera = Camera::new();
        let mut manager = SnapManager::default();
        assert!(manager.setup(&document, &camera, SetupOptions::default()).grid_snapper_might_snap());
        document.show_grids = false;
        assert!(!manager.setup(&document, &camera, SetupOptions::default()).grid_snapper_might_snap());
    }

    #[test]
    fn test_selection_is_ignored() {
        let mut document = Document::new(Size::new(800.0, 600.0));
        let selected = document.add_item(Item::rect(Rect::new(100.0, 100.0, 200.0, 200.0)));
        let camera = Camera::new();
        let mut manager = SnapManager::default();

        let mut session = manager.setup(&document, &camera, ignore_page());
        assert!(session.free_snap(&node(102.0, 101.0), None, false).snapped);
        drop(session);

        let mut session = manager.setup_ignore_selection(&document, &camera, &[selected], Vec::new(), true);
        assert!(!session.free_snap(&node(102.0, 101.0), None, false).snapped);
    }

    #[test]
    fn test_indicator_follows_snaps() {
        let document = grid_document(10.0, Point::ZERO);
        let camera = Camera::new();
        let recorder = RecordingIndicator::new();
        let mut manager = SnapManager::default().with_indicator(Box::new(recorder.clone()));
        let mut session = manager.setup(&document, &camera, ignore_page());

        let snapped = session.free_snap(&node(7.0, 2.0), None, false);
        assert_eq!(recorder.current_target(), Some(snapped));

        session.pre_snap(&node(7.0, 2.0), false);
        let last = recorder.events().pop();
        assert!(matches!(last, Some(IndicatorEvent::SetTarget { pre_snap: true, .. })));
        drop(session);

        recorder.take();
        let mut quiet = manager.setup(
            &document,
            &camera,
            SetupOptions {
                indicator_enabled: false,
                ..ignore_page()
            },
        );
        quiet.free_snap(&node(7.0, 2.0), None, false);
        quiet.pre_snap(&node(7.0, 2.0), false);
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_multiple_of_grid_pitch() {
        let document = grid_document(10.0, Point::new(3.0, 4.0));
        let camera = Camera::new();
        let mut manager = SnapManager::default();
        let mut session = manager.setup(&document, &camera, SetupOptions::default());
        let multiple = session.multiple_of_grid_pitch(Vec2::new(12.0, -7.0), Point::new(50.0, 50.0));
        assert!((multiple - Vec2::new(10.0, -10.0)).hypot() < 1e-9);
        drop(session);

        let empty = Document::new(Size::new(800.0, 600.0));
        let mut session = manager.setup(&empty, &camera, SetupOptions::default());
        assert_eq!(session.multiple_of_grid_pitch(Vec2::new(12.0, -7.0), Point::ZERO), Vec2::new(12.0, -7.0));
    }

    #[test]
    fn test_guide_free_snap_to_node() {
        let mut document = Document::new(Size::new(800.0, 600.0));
        document.add_item(Item::rect(Rect::new(100.0, 100.0, 200.0, 200.0)));
        let camera = Camera::new();
        let mut manager = SnapManager::default();
        let mut session = manager.setup(&document, &camera, ignore_page());

        let mut point = Point::new(103.0, 98.0);
        let mut normal = OriginOrVector::Vector(Vec2::new(0.0, 1.0));
        session.guide_free_snap(&mut point, &mut normal, false);
        assert_eq!(point, Point::new(100.0, 100.0));
        // Nodes have no tangent, so the guide keeps its angle
        assert_eq!(normal, OriginOrVector::Vector(Vec2::new(0.0, 1.0)));
    }

    #[test]
    fn test_guide_free_snap_follows_path() {
        let mut document = Document::new(Size::new(800.0, 600.0));
        document.add_item(Item::rect(Rect::new(100.0, 100.0, 300.0, 200.0)));
        let camera = Camera::new();
        let mut manager = SnapManager::default();
        let mut session = manager.setup(&document, &camera, ignore_page());

        let mut point = Point::new(150.0, 104.0);
        let mut normal = OriginOrVector::Vector(Vec2::new(1.0, 0.0));
        session.guide_free_snap(&mut point, &mut normal, false);
        assert!(point.distance(Point::new(150.0, 100.0)) < 1e-6);
        let OriginOrVector::Vector(n) = normal else {
            panic!("expected a normal");
        };
        assert!(n.x.abs() < 1e-6 && (n.y.abs() - 1.0).abs() < 1e-6);

        let mut point = Point::new(150.0, 104.0);
        let mut frozen = OriginOrVector::Vector(Vec2::new(1.0, 0.0));
        session.guide_free_snap(&mut point, &mut frozen, true);
        assert!(point.distance(Point::new(150.0, 100.0)) < 1e-6);
        assert_eq!(frozen, OriginOrVector::Vector(Vec2::new(1.0, 0.0)));
    }

    #[test]
    fn test_guide_constrained_snap_stays_on_guide() {
        let mut document = grid_document(10.0, Point::ZERO);
        let guide = Guide::horizontal(55.0);
        document.add_guide(guide);
        let camera = Camera::new();
        let mut manager = SnapManager::default();
        let mut session = manager.setup(
            &document,
            &camera,
            SetupOptions {
                ignore: vec![IgnoredObject::Page, IgnoredObject::Guide(guide.id)],
                ..Default::default()
            },
        );
        assert_eq!(session.ignored_guide(), Some(guide.id));
        assert!(session.is_page_ignored());

        let mut point = Point::new(38.0, 55.0);
        session.guide_constrained_snap(&mut point, &guide);
        assert!(point.distance(Point::new(40.0, 55.0)) < 1e-9);
    }

    #[test]
    fn test_display_snap_source_only_when_closest_only() {
        let document = Document::new(Size::new(800.0, 600.0));
        let camera = Camera::new();
        let recorder = RecordingIndicator::new();
        let mut manager = SnapManager::default().with_indicator(Box::new(recorder.clone()));
        {
            let mut session = manager.setup(&document, &camera, SetupOptions::default());
            session.display_snap_source(&node(1.0, 1.0));
        }
        assert!(recorder.events().is_empty());

        manager.preferences.snap_closest_only = true;
        manager.preferences.set_target_snappable(SnapTargetType::BBoxCategory, false);
        let mut session = manager.setup(&document, &camera, SetupOptions::default());
        session.display_snap_source(&node(1.0, 1.0));
        session.display_snap_source(&SnapCandidatePoint::new(Point::ZERO, SnapSourceType::BBoxCorner));
        assert_eq!(
            recorder.events(),
            vec![IndicatorEvent::SetSource(node(1.0, 1.0)), IndicatorEvent::RemoveSource]
        );
    }
}
