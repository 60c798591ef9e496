//! Snapping to guide lines.

use super::candidate::{SnapCandidatePoint, SnapTargetType};
use super::collector::CandidateCollector;
use super::line_snapper::{GridLine, LineFamily, LineReach, constrained_snap_lines, free_snap_lines};
use super::preferences::is_always_snap;
use super::results::IntermSnapResults;
use super::{SnapEnv, Snapper, private};
use crate::geom::SnapConstraint;
use kurbo::Rect;

/// Snaps to the document guides, their origins and perpendicular feet.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuideSnapper;

impl GuideSnapper {
    /// Every guide except the ignored one.
    fn lines(env: &SnapEnv<'_>) -> Vec<GridLine> {
        let ignored = env.ignored_guide();
        env.document
            .guides
            .iter()
            .filter(|guide| Some(guide.id) != ignored)
            .map(|guide| GridLine::new(guide.normal, guide.point))
            .collect()
    }

    fn reach(&self, env: &SnapEnv<'_>) -> LineReach {
        LineReach {
            family: LineFamily::Guide,
            tolerance: self.tolerance(env),
            always_snap: self.always_snap(env),
        }
    }
}

impl private::Sealed for GuideSnapper {}

impl Snapper for GuideSnapper {
    fn might_snap(&self, env: &SnapEnv<'_>) -> bool {
        env.prefs.snap_enabled
            && env.prefs.is_target_snappable(SnapTargetType::Guide)
            && !env.document.guides.is_empty()
            && self.tolerance(env) > 0.0
    }

    fn tolerance(&self, env: &SnapEnv<'_>) -> f64 {
        env.tolerance(env.prefs.guide_tolerance)
    }

    fn always_snap(&self, env: &SnapEnv<'_>) -> bool {
        is_always_snap(env.prefs.guide_tolerance)
    }

    fn free_snap<'a>(
        &self,
        env: &SnapEnv<'a>,
        _collector: &mut CandidateCollector<'a>,
        isr: &mut IntermSnapResults,
        p: &SnapCandidatePoint,
        _bbox_to_snap: Option<Rect>,
    ) {
        if !self.might_snap(env) {
            return;
        }
        free_snap_lines(env, isr, p, &Self::lines(env), self.reach(env));
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
        if !self.might_snap(env) {
            return;
        }
        constrained_snap_lines(env, isr, p, &Self::lines(env), self.reach(env), constraint);
    }
}
