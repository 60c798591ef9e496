//! Picks the best snap out of everything the snappers found.

use super::SnapEnv;
use super::candidate::{SnapCandidatePoint, SnapTargetType};
use super::indicator::SnapIndicator;
use super::results::{
    IntermSnapResults, SnappedPoint, closest_curve, closest_curve_intersection, closest_curve_line_intersection,
    closest_line, closest_line_intersection, closest_line_pair_intersection, closest_point,
};
use crate::geom::rect_contains;

/// The candidates competing for the best snap, in the order they are ranked.
fn candidates(env: &SnapEnv<'_>, p: &SnapCandidatePoint, isr: &IntermSnapResults, constrained: bool) -> Vec<SnappedPoint> {
    let prefs = env.prefs;
    let mut list = Vec::new();

    if let Some(point) = closest_point(&isr.points) {
        list.push(point.clone());
    }

    // Curves may have been collected for their intersections only
    let exclude_paths = !prefs.is_target_snappable(SnapTargetType::Path);
    if let Some(curve) = closest_curve(&isr.curves, exclude_paths) {
        list.push(curve.to_snapped_point());
    }

    if prefs.is_target_snappable(SnapTargetType::GridLine) {
        if let Some(line) = closest_line(&isr.grid_lines) {
            let mut sp = line.to_snapped_point();
            sp.set_source(p.source);
            sp.set_target(SnapTargetType::GridLine);
            list.push(sp);
        }
    }

    if let Some(line) = closest_line(&isr.guide_lines) {
        list.push(line.to_snapped_point());
    }

    // A constrained result already sits on the constraint, one more line would over-determine it
    if constrained {
        return list;
    }

    let source_point = p.point;
    let mut intersections = Vec::new();
    if prefs.is_target_snappable(SnapTargetType::PathIntersection) {
        intersections.push((closest_curve_intersection(&isr.curves, source_point), None));
    }
    if prefs.is_target_snappable(SnapTargetType::PathGuideIntersection) {
        intersections.push((
            closest_curve_line_intersection(&isr.curves, &isr.guide_lines, source_point),
            None,
        ));
    }
    intersections.push((
        closest_line_intersection(&isr.grid_lines, source_point),
        Some(SnapTargetType::GridIntersection),
    ));
    intersections.push((
        closest_line_intersection(&isr.guide_lines, source_point),
        Some(SnapTargetType::GuideIntersection),
    ));
    if prefs.is_target_snappable(SnapTargetType::GridGuideIntersection) {
        intersections.push((
            closest_line_pair_intersection(&isr.grid_lines, &isr.guide_lines, source_point),
            Some(SnapTargetType::GridGuideIntersection),
        ));
    }

    for (found, target) in intersections {
        let Some(mut sp) = found else { continue };
        sp.set_source(p.source);
        if let Some(target) = target {
            sp.set_target(target);
        }
        list.push(sp);
    }
    list
}

/// Choose the best snap for `p` among the intermediate results.
///
/// Only candidates on screen (unless `allow_offscreen`) and within their
/// own tolerance compete. With `to_paths_only` the result is guaranteed to
/// lie on a path. Without any eligible candidate the result is the
/// unsnapped `p`. The indicator, when given, shows the outcome.
pub fn find_best_snap(
    env: &SnapEnv<'_>,
    indicator: Option<&mut dyn SnapIndicator>,
    p: &SnapCandidatePoint,
    isr: &IntermSnapResults,
    constrained: bool,
    allow_offscreen: bool,
    to_paths_only: bool,
) -> SnappedPoint {
    let mut list = candidates(env, p, isr, constrained);
    if to_paths_only {
        list.retain(|sp| sp.target.is_on_path());
    }

    let display = env.display_area();
    let mut best: Option<SnappedPoint> = None;
    for sp in list {
        let on_screen = allow_offscreen || rect_contains(display, sp.point);
        if !on_screen || !(sp.always_snap || sp.is_within_tolerance()) {
            continue;
        }
        if best.as_ref().is_none_or(|b| b.is_other_snap_better(&sp)) {
            best = Some(sp);
        }
    }

    let best = best.unwrap_or_else(|| {
        let mut unsnapped = SnappedPoint::unsnapped(p.point);
        unsnapped.set_source(p.source);
        unsnapped
    });

    if let Some(indicator) = indicator {
        if best.snapped {
            indicator.set_target(&best, false);
        } else {
            indicator.remove_target(false);
        }
    }
    best
}
