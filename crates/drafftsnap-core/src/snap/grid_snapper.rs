//! Snapping to rectangular and axonometric grids.

use super::candidate::{SnapCandidatePoint, SnapTargetType};
use super::collector::CandidateCollector;
use super::line_snapper::{GridLine, LineFamily, LineReach, constrained_snap_lines, free_snap_lines};
use super::preferences::is_always_snap;
use super::results::IntermSnapResults;
use super::{SnapEnv, Snapper, private};
use crate::document::{Grid, GridKind};
use crate::geom::{SnapConstraint, line_intersection, rot90, round_to_lower_multiple_plus, round_to_upper_multiple_plus};
use kurbo::{Point, Rect, Vec2};

/// Minimum on-screen line spacing, in pixels, for a line to count as visible.
const MIN_VISIBLE_SPACING: f64 = 8.0;

/// Skew axes whose slopes cancel out to within this are parallel.
const PARALLEL_EPSILON: f64 = 1e-9;

/// Iteration cap of the spacing multiplier search.
const SCALING_WATCHDOG: u32 = 100;

/// Multiplier applied to a grid spacing of `length` screen pixels so the
/// snapped-to lines are the visible ones. Major lines are tried first, then
/// the multiplier keeps doubling.
pub fn calculate_scaling_factor(length: f64, major: u32) -> f64 {
    let mut multiply = 1.0;
    let mut step = f64::from(major.max(1));
    let mut watchdog = 0;
    while length * multiply < MIN_VISIBLE_SPACING && watchdog < SCALING_WATCHDOG {
        multiply *= step;
        step = 2.0;
        watchdog += 1;
    }
    multiply
}

/// Snapper for one document grid.
#[derive(Debug, Clone, Copy)]
pub struct GridSnapper<'a> {
    grid: &'a Grid,
}

impl<'a> GridSnapper<'a> {
    pub fn new(grid: &'a Grid) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &'a Grid {
        self.grid
    }

    fn scaling(&self, length_px: f64, visible_only: bool) -> f64 {
        if visible_only {
            calculate_scaling_factor(length_px, self.grid.major_line_interval)
        } else {
            1.0
        }
    }

    /// The grid lines around `p` at the given zoom.
    pub fn lines(&self, p: Point, zoom: f64, visible_only: bool) -> Vec<GridLine> {
        match self.grid.kind {
            GridKind::Rectangular => self.rectangular_lines(p, zoom, visible_only),
            GridKind::Axonometric => self.axonometric_lines(p, zoom, visible_only),
        }
    }

    fn rectangular_lines(&self, p: Point, zoom: f64, visible_only: bool) -> Vec<GridLine> {
        let origin = self.grid.origin;
        let axes = [
            (Vec2::new(1.0, 0.0), p.x, origin.x, self.grid.spacing.x),
            (Vec2::new(0.0, 1.0), p.y, origin.y, self.grid.spacing.y),
        ];
        let mut lines = Vec::with_capacity(4);
        for (normal, coord, offset, spacing) in axes {
            let scaled = spacing * self.scaling(spacing * zoom, visible_only);
            if !(scaled > 0.0) {
                continue;
            }
            let upper = round_to_upper_multiple_plus(coord, scaled, offset);
            let lower = round_to_lower_multiple_plus(coord, scaled, offset);
            for value in [upper, lower] {
                let line = GridLine::new(normal, (normal * value).to_point());
                if !lines.contains(&line) {
                    lines.push(line);
                }
            }
        }
        lines
    }

    /// The three lines of the half cell `p` lies in; every line when the
    /// skew axes are parallel.
    fn axonometric_lines(&self, p: Point, zoom: f64, visible_only: bool) -> Vec<GridLine> {
        let origin = self.grid.origin;
        // The document's y axis points down, which mirrors the two skew axes
        let ta_x = self.grid.angle_z.to_radians().tan();
        let ta_z = self.grid.angle_x.to_radians().tan();
        let spacing = self.grid.spacing.y;
        let scale = self.scaling(spacing * zoom, visible_only);
        let spacing_v = spacing * scale;
        if !(spacing_v > 0.0) {
            return Vec::new();
        }
        // Parallel skew axes have no vertical lines
        let slope_sum = ta_x + ta_z;
        let spacing_h = (spacing / slope_sum * scale).abs();
        let verticals = (slope_sum.abs() > PARALLEL_EPSILON && spacing_h.is_finite()).then(|| {
            (
                round_to_upper_multiple_plus(p.x, spacing_h, origin.x),
                round_to_lower_multiple_plus(p.x, spacing_h, origin.x),
            )
        });

        // Where the skew lines through p cross the vertical through the origin
        let y_along_z = p.y - ta_z * (p.x - origin.x);
        let y_along_x = p.y + ta_x * (p.x - origin.x);
        let y_z_max = round_to_upper_multiple_plus(y_along_z, spacing_v, origin.y);
        let y_z_min = round_to_lower_multiple_plus(y_along_z, spacing_v, origin.y);
        let y_x_max = round_to_upper_multiple_plus(y_along_x, spacing_v, origin.y);
        let y_x_min = round_to_lower_multiple_plus(y_along_x, spacing_v, origin.y);

        let vers_x = Vec2::new(1.0, -ta_x);
        let vers_z = Vec2::new(1.0, ta_z);
        let norm_x = rot90(vers_x);
        let norm_z = rot90(vers_z);
        let vertical = Vec2::new(1.0, 0.0);

        let mut left = vec![
            GridLine::new(norm_z, Point::new(origin.x, y_z_max)),
            GridLine::new(norm_x, Point::new(origin.x, y_x_min)),
        ];
        let mut right = vec![
            GridLine::new(norm_z, Point::new(origin.x, y_z_min)),
            GridLine::new(norm_x, Point::new(origin.x, y_x_max)),
        ];
        if let Some((x_max, x_min)) = verticals {
            left.push(GridLine::new(vertical, Point::new(x_max, 0.0)));
            right.push(GridLine::new(vertical, Point::new(x_min, 0.0)));
        }

        // The upper skew lines meet on the vertical that splits the cell
        let crossing = line_intersection(
            Point::new(origin.x, y_x_max),
            vers_x,
            Point::new(origin.x, y_z_max),
            vers_z,
        );
        match crossing {
            Some(c) if p.x < c.x => left,
            Some(_) => right,
            None => left.into_iter().chain(right).collect(),
        }
    }
}

impl private::Sealed for GridSnapper<'_> {}

impl Snapper for GridSnapper<'_> {
    fn might_snap(&self, env: &SnapEnv<'_>) -> bool {
        env.prefs.snap_enabled
            && self.grid.enabled
            && env.prefs.is_target_snappable(SnapTargetType::Grid)
            && self.tolerance(env) > 0.0
    }

    fn tolerance(&self, env: &SnapEnv<'_>) -> f64 {
        env.tolerance(env.prefs.grid_tolerance)
    }

    fn always_snap(&self, env: &SnapEnv<'_>) -> bool {
        is_always_snap(env.prefs.grid_tolerance)
    }

    fn free_snap<'a>(
        &self,
        env: &SnapEnv<'a>,
        _collector: &mut CandidateCollector<'a>,
        isr: &mut IntermSnapResults,
        p: &SnapCandidatePoint,
        _bbox_to_snap: Option<Rect>,
    ) {
        let lines = self.lines(p.point, env.zoom(), env.prefs.visible_grid_lines_only);
        free_snap_lines(env, isr, p, &lines, self.reach(env));
    }

    fn constrained_snap<'a>(
        &self,
        env: &SnapEnv<'a>,
        _collector: &mut CandidateCollector<'a>,
        isr: &mut IntermSnapResults,
        p: &SnapCandidatePoint,
        _bbox_to_snap: Option<Rect>,
        constraint: &SnapConstraint,
    ) {
        let anchor = constraint.projection(p.point);
        let lines = self.lines(anchor, env.zoom(), env.prefs.visible_grid_lines_only);
        constrained_snap_lines(env, isr, p, &lines, self.reach(env), constraint);
    }
}

impl GridSnapper<'_> {
    fn reach(&self, env: &SnapEnv<'_>) -> LineReach {
        LineReach {
            family: LineFamily::Grid,
            tolerance: self.tolerance(env),
            always_snap: self.always_snap(env),
        }
    }
}
