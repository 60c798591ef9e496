//! Snapping to infinite lines, shared by the grid and guide snappers.

use super::SnapEnv;
use super::candidate::{OriginOrVector, SnapCandidatePoint, SnapTargetType};
use super::results::{IntermSnapResults, SnappedLine, SnappedPoint};
use crate::geom::{SnapConstraint, project_on_line, rot90};
use kurbo::{Point, Vec2};

/// A line given by its normal and a point on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub normal: Vec2,
    pub point_on_line: Point,
}

impl GridLine {
    pub fn new(normal: Vec2, point_on_line: Point) -> Self {
        Self { normal, point_on_line }
    }

    pub fn direction(&self) -> Vec2 {
        rot90(self.normal)
    }
}

/// Which family of lines is being snapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LineFamily {
    Grid,
    Guide,
}

impl LineFamily {
    fn line_target(self) -> SnapTargetType {
        match self {
            LineFamily::Grid => SnapTargetType::Grid,
            LineFamily::Guide => SnapTargetType::Guide,
        }
    }

    fn perpendicular_target(self) -> SnapTargetType {
        match self {
            LineFamily::Grid => SnapTargetType::GridPerpendicular,
            LineFamily::Guide => SnapTargetType::GuidePerpendicular,
        }
    }
}

/// Reach of a line snapper for one call.
#[derive(Debug, Clone, Copy)]
pub(super) struct LineReach {
    pub family: LineFamily,
    pub tolerance: f64,
    pub always_snap: bool,
}

impl LineReach {
    fn point(&self, p: &SnapCandidatePoint, at: Point, target: SnapTargetType) -> SnappedPoint {
        SnappedPoint::new(
            at,
            p.source,
            p.source_num,
            target,
            at.distance(p.point),
            self.tolerance,
            self.always_snap,
        )
    }
}

pub(super) fn free_snap_lines(
    env: &SnapEnv<'_>,
    isr: &mut IntermSnapResults,
    p: &SnapCandidatePoint,
    lines: &[GridLine],
    reach: LineReach,
) {
    if !env.prefs.is_source_snappable(p.source) {
        return;
    }
    for line in lines {
        if line.normal == Vec2::ZERO {
            continue;
        }
        let projected = project_on_line(p.point, line.point_on_line, line.direction());
        let distance = projected.distance(p.point);
        if distance > reach.tolerance {
            continue;
        }
        let snapped = SnappedLine {
            point: projected,
            distance,
            source: p.source,
            source_num: p.source_num,
            target: reach.family.line_target(),
            tolerance: reach.tolerance,
            always_snap: reach.always_snap,
            normal: line.normal,
            point_on_line: line.point_on_line,
        };
        match reach.family {
            LineFamily::Grid => isr.grid_lines.push(snapped),
            LineFamily::Guide => isr.guide_lines.push(snapped),
        }

        // For guides the point on the line is the guide's origin
        if reach.family == LineFamily::Guide
            && line.point_on_line.distance(p.point) <= reach.tolerance
            && env.prefs.is_target_snappable(SnapTargetType::GuideOrigin)
        {
            isr.points
                .push(reach.point(p, line.point_on_line, SnapTargetType::GuideOrigin).fully_constrained(false));
        }

        let perpendicular = reach.family.perpendicular_target();
        if !env.prefs.is_target_snappable(perpendicular) {
            continue;
        }
        for hint in &p.origins_and_vectors {
            if let OriginOrVector::Origin(origin) = hint {
                let foot = project_on_line(*origin, line.point_on_line, line.direction());
                if foot.distance(p.point) <= reach.tolerance {
                    isr.points
                        .push(reach.point(p, foot, perpendicular).fully_constrained(false));
                }
            }
        }
    }
}

pub(super) fn constrained_snap_lines(
    env: &SnapEnv<'_>,
    isr: &mut IntermSnapResults,
    p: &SnapCandidatePoint,
    lines: &[GridLine],
    reach: LineReach,
    constraint: &SnapConstraint,
) {
    if !env.prefs.is_source_snappable(p.source) {
        return;
    }
    let projected = constraint.projection(p.point);
    for line in lines {
        if line.normal == Vec2::ZERO {
            continue;
        }
        for crossing in constraint.intersect_line(projected, line.point_on_line, line.direction()) {
            if crossing.distance(p.point) > reach.tolerance {
                continue;
            }
            isr.points
                .push(reach.point(p, crossing, reach.family.line_target()).fully_constrained(true));

            let origin = line.point_on_line;
            if reach.family == LineFamily::Guide
                && origin.distance(p.point) <= reach.tolerance
                && constraint.contains(origin, 1e-9)
                && env.prefs.is_target_snappable(SnapTargetType::GuideOrigin)
            {
                isr.points
                    .push(reach.point(p, origin, SnapTargetType::GuideOrigin).fully_constrained(true));
            }
        }
    }
}
