//! Snapping engine: candidate model, snappers, best-snap selection and the
//! snap manager.

mod alignment_snapper;
mod candidate;
mod collector;
mod diagnostics;
mod distribution_snapper;
mod grid_snapper;
mod guide_snapper;
mod indicator;
mod line_snapper;
mod manager;
mod object_snapper;
mod preferences;
mod results;
mod selector;
mod transform;

pub use alignment_snapper::AlignmentSnapper;
pub use candidate::{
    ClipOrMask, IgnoredObject, OriginOrVector, SnapCandidateItem, SnapCandidatePoint, SnapSourceCategory, SnapSourceType,
    SnapTargetCategory, SnapTargetType,
};
pub use collector::{CandidateCollector, MAX_SNAP_CANDIDATES};
pub use diagnostics::{Diagnostics, RateLimitedLog, RecordingDiagnostics, WARNING_INTERVAL};
pub use distribution_snapper::DistributionSnapper;
pub use grid_snapper::{GridSnapper, calculate_scaling_factor};
pub use guide_snapper::GuideSnapper;
pub use indicator::{IndicatorEvent, NullIndicator, RecordingIndicator, SnapIndicator};
pub use line_snapper::GridLine;
pub use manager::{SetupOptions, SnapManager, SnapSession};
pub use object_snapper::ObjectSnapper;
pub use preferences::{ALWAYS_SNAP_TOLERANCE, ConfigError, ConfigResult, SnapPreferences, is_always_snap};
pub use results::{DistributionInfo, IntermSnapResults, SnappedCurve, SnappedLine, SnappedPoint};
pub use selector::find_best_snap;
pub use transform::{Dim, PureRotate, PureScale, PureSkew, PureStretch, PureTransform, PureTranslate};

use crate::camera::Camera;
use crate::document::{Document, GuideId, ItemId};
use crate::geom::SnapConstraint;
use kurbo::Rect;

/// Gesture-scoped inputs shared by every snapper.
pub struct SnapEnv<'a> {
    pub prefs: &'a SnapPreferences,
    pub document: &'a Document,
    pub camera: &'a Camera,
    /// Objects that must not be snapped to, usually the selection being dragged.
    pub ignore: Vec<IgnoredObject>,
    /// Nodes of the edited path that are not being dragged.
    pub unselected_nodes: Vec<SnapCandidatePoint>,
    pub diagnostics: &'a dyn Diagnostics,
}

impl<'a> SnapEnv<'a> {
    pub fn zoom(&self) -> f64 {
        self.camera.current_zoom()
    }

    /// Convert a tolerance in screen pixels to document units.
    pub fn tolerance(&self, pixels: f64) -> f64 {
        pixels / self.zoom()
    }

    pub fn is_item_ignored(&self, id: ItemId) -> bool {
        self.ignore.iter().any(|o| o.as_item() == Some(id))
    }

    /// The ignored guide, e.g. the one being dragged.
    pub fn ignored_guide(&self) -> Option<GuideId> {
        self.ignore.iter().find_map(IgnoredObject::as_guide)
    }

    pub fn is_page_ignored(&self) -> bool {
        self.ignore.iter().any(IgnoredObject::is_page)
    }

    pub fn display_area(&self) -> Rect {
        self.camera.display_area()
    }
}

mod private {
    pub trait Sealed {}
}

/// A strategy that turns a candidate point into intermediate snap results.
///
/// Implemented only by the snappers of this module.
pub trait Snapper: private::Sealed {
    /// Cheap check whether this snapper could produce anything at all.
    fn might_snap(&self, env: &SnapEnv<'_>) -> bool;

    /// Tolerance in document units.
    fn tolerance(&self, env: &SnapEnv<'_>) -> f64;

    /// The tolerance preference is the "always snap" sentinel.
    fn always_snap(&self, env: &SnapEnv<'_>) -> bool;

    fn free_snap<'a>(
        &self,
        env: &SnapEnv<'a>,
        collector: &mut CandidateCollector<'a>,
        isr: &mut IntermSnapResults,
        p: &SnapCandidatePoint,
        bbox_to_snap: Option<Rect>,
    );

    fn constrained_snap<'a>(
        &self,
        env: &SnapEnv<'a>,
        collector: &mut CandidateCollector<'a>,
        isr: &mut IntermSnapResults,
        p: &SnapCandidatePoint,
        bbox_to_snap: Option<Rect>,
        constraint: &SnapConstraint,
    );
}

/// The closed set of snappers.
pub enum SnapperKind<'a> {
    Grid(GridSnapper<'a>),
    Guide(GuideSnapper),
    Object(ObjectSnapper),
    Alignment(AlignmentSnapper),
    Distribution(DistributionSnapper),
}

impl<'a> SnapperKind<'a> {
    /// The snappers for a document, grids first.
    pub fn all(env: &SnapEnv<'a>) -> Vec<SnapperKind<'a>> {
        let mut snappers: Vec<SnapperKind<'a>> = Vec::new();
        if env.document.show_grids && env.prefs.is_target_snappable(SnapTargetType::Grid) {
            snappers.extend(
                env.document
                    .grids
                    .iter()
                    .filter(|grid| grid.enabled)
                    .map(|grid| SnapperKind::Grid(grid.snapper())),
            );
        }
        snappers.push(SnapperKind::Guide(GuideSnapper));
        snappers.push(SnapperKind::Object(ObjectSnapper));
        snappers.push(SnapperKind::Alignment(AlignmentSnapper));
        snappers.push(SnapperKind::Distribution(DistributionSnapper));
        snappers
    }

    /// Only the grid snappers of a document.
    pub fn grids(env: &SnapEnv<'a>) -> Vec<SnapperKind<'a>> {
        Self::all(env)
            .into_iter()
            .filter(|s| matches!(s, SnapperKind::Grid(_)))
            .collect()
    }

    fn inner(&self) -> &dyn Snapper {
        match self {
            SnapperKind::Grid(s) => s,
            SnapperKind::Guide(s) => s,
            SnapperKind::Object(s) => s,
            SnapperKind::Alignment(s) => s,
            SnapperKind::Distribution(s) => s,
        }
    }

    pub fn might_snap(&self, env: &SnapEnv<'_>) -> bool {
        self.inner().might_snap(env)
    }

    pub fn tolerance(&self, env: &SnapEnv<'_>) -> f64 {
        self.inner().tolerance(env)
    }

    pub fn always_snap(&self, env: &SnapEnv<'_>) -> bool {
        self.inner().always_snap(env)
    }

    pub fn free_snap(
        &self,
        env: &SnapEnv<'a>,
        collector: &mut CandidateCollector<'a>,
        isr: &mut IntermSnapResults,
        p: &SnapCandidatePoint,
        bbox_to_snap: Option<Rect>,
    ) {
        match self {
            SnapperKind::Grid(s) => s.free_snap(env, collector, isr, p, bbox_to_snap),
            SnapperKind::Guide(s) => s.free_snap(env, collector, isr, p, bbox_to_snap),
            SnapperKind::Object(s) => s.free_snap(env, collector, isr, p, bbox_to_snap),
            SnapperKind::Alignment(s) => s.free_snap(env, collector, isr, p, bbox_to_snap),
            SnapperKind::Distribution(s) => s.free_snap(env, collector, isr, p, bbox_to_snap),
        }
    }

    pub fn constrained_snap(
        &self,
        env: &SnapEnv<'a>,
        collector: &mut CandidateCollector<'a>,
        isr: &mut IntermSnapResults,
        p: &SnapCandidatePoint,
        bbox_to_snap: Option<Rect>,
        constraint: &SnapConstraint,
    ) {
        match self {
            SnapperKind::Grid(s) => s.constrained_snap(env, collector, isr, p, bbox_to_snap, constraint),
            SnapperKind::Guide(s) => s.constrained_snap(env, collector, isr, p, bbox_to_snap, constraint),
            SnapperKind::Object(s) => s.constrained_snap(env, collector, isr, p, bbox_to_snap, constraint),
            SnapperKind::Alignment(s) => s.constrained_snap(env, collector, isr, p, bbox_to_snap, constraint),
            SnapperKind::Distribution(s) => {
                s.constrained_snap(env, collector, isr, p, bbox_to_snap, constraint)
            }
        }
    }
}
