//! Collects the items near the dragged point once per gesture.

use super::SnapEnv;
use super::candidate::{ClipOrMask, SnapCandidateItem, SnapTargetType};
use crate::document::{BBoxKind, Item};
use crate::geom::{rect_contains, rects_intersect};
use kurbo::{Affine, Point, Rect};
use std::ops::ControlFlow;

/// Maximum number of alignment candidates gathered per gesture.
pub const MAX_SNAP_CANDIDATES: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collection {
    NotCollected,
    Collected,
}

/// Where the walk currently is in the item tree.
#[derive(Debug, Clone, Copy)]
struct WalkContext {
    parent_to_doc: Affine,
    clip_or_mask: Option<ClipOrMask>,
    additional_affine: Affine,
}

/// Gesture-scoped candidate lists.
///
/// The object list holds items within the snapping radius of the dragged
/// point or box, the alignment list everything on screen.
#[derive(Debug)]
pub struct CandidateCollector<'a> {
    state: Collection,
    object_candidates: Vec<SnapCandidateItem<'a>>,
    align_candidates: Vec<SnapCandidateItem<'a>>,
    limit_reached: bool,
}

impl Default for CandidateCollector<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> CandidateCollector<'a> {
    pub fn new() -> Self {
        Self {
            state: Collection::NotCollected,
            object_candidates: Vec::new(),
            align_candidates: Vec::new(),
            limit_reached: false,
        }
    }

    pub fn is_collected(&self) -> bool {
        self.state == Collection::Collected
    }

    pub fn object_candidates(&self) -> &[SnapCandidateItem<'a>] {
        &self.object_candidates
    }

    pub fn align_candidates(&self) -> &[SnapCandidateItem<'a>] {
        &self.align_candidates
    }

    /// Whether the last walk stopped at [`MAX_SNAP_CANDIDATES`].
    pub fn limit_reached(&self) -> bool {
        self.limit_reached
    }

    /// Walk the document unless this gesture already did.
    ///
    /// The snapping radius is `bbox_to_snap` (or the point itself) grown by
    /// the object tolerance.
    pub fn collect(&mut self, env: &SnapEnv<'a>, p: Point, bbox_to_snap: Option<Rect>) {
        if self.state == Collection::Collected {
            return;
        }
        self.state = Collection::Collected;
        self.object_candidates.clear();
        self.align_candidates.clear();
        self.limit_reached = false;

        let tolerance = env.tolerance(env.prefs.object_tolerance);
        let near = bbox_to_snap
            .unwrap_or_else(|| Rect::from_points(p, p))
            .inflate(tolerance, tolerance);
        let root = WalkContext {
            parent_to_doc: Affine::IDENTITY,
            clip_or_mask: None,
            additional_affine: Affine::IDENTITY,
        };
        if self.walk(env, std::slice::from_ref(&env.document.root), root, near).is_break() {
            self.limit_reached = true;
            env.diagnostics.candidate_limit_reached(MAX_SNAP_CANDIDATES);
        }
        log::debug!(
            "Collected {} object and {} alignment snap candidates",
            self.object_candidates.len(),
            self.align_candidates.len()
        );
    }

    fn walk(&mut self, env: &SnapEnv<'a>, items: &'a [Item], ctx: WalkContext, near: Rect) -> ControlFlow<()> {
        for item in items {
            if item.hidden && ctx.clip_or_mask.is_none() {
                continue;
            }
            if env.is_item_ignored(item.id) || shares_ignored_marker(env, item) {
                continue;
            }

            let item_to_doc = ctx.parent_to_doc * item.transform;
            if ctx.clip_or_mask.is_none() {
                let sides = [
                    (&item.clip, ClipOrMask::Clip, SnapTargetType::PathClip),
                    (&item.mask, ClipOrMask::Mask, SnapTargetType::PathMask),
                ];
                for (side, role, target) in sides {
                    let Some(side) = side else { continue };
                    if !env.prefs.is_target_snappable(target) {
                        continue;
                    }
                    let inner = WalkContext {
                        parent_to_doc: item_to_doc,
                        clip_or_mask: Some(role),
                        additional_affine: item_to_doc,
                    };
                    self.walk(env, std::slice::from_ref(side.as_ref()), inner, near)?;
                }
            }

            if let Some(children) = item.as_group() {
                let inner = WalkContext {
                    parent_to_doc: item_to_doc,
                    ..ctx
                };
                self.walk(env, children, inner, near)?;
                continue;
            }

            let kind = if env.prefs.visual_bbox && env.prefs.is_target_snappable(SnapTargetType::BBoxCategory) {
                BBoxKind::Visual
            } else {
                BBoxKind::Geometric
            };
            let Some(bbox) = item.bounds(kind, ctx.parent_to_doc) else {
                continue;
            };

            let candidate = SnapCandidateItem::new(item, ctx.clip_or_mask, ctx.additional_affine, ctx.parent_to_doc);
            if rects_intersect(env.display_area(), bbox) {
                if self.align_candidates.len() >= MAX_SNAP_CANDIDATES {
                    return ControlFlow::Break(());
                }
                self.align_candidates.push(candidate);
            }
            let center_near = env.prefs.is_target_snappable(SnapTargetType::RotationCenter)
                && item.center(ctx.parent_to_doc).is_some_and(|c| rect_contains(near, c));
            if rects_intersect(near, bbox) || center_near {
                self.object_candidates.push(candidate);
            }
        }
        ControlFlow::Continue(())
    }
}

/// Whether the item carries a construction marker while some ignored item
/// carries one too. The kinds need not match.
fn shares_ignored_marker(env: &SnapEnv<'_>, item: &Item) -> bool {
    if !item.markers.any() {
        return false;
    }
    env.ignore
        .iter()
        .filter_map(|o| o.as_item())
        .filter_map(|id| env.document.find_item(id).ok())
        .any(|ignored| ignored.markers.any())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::document::{Document, ItemMarkers};
    use crate::snap::{IgnoredObject, RecordingDiagnostics, SnapPreferences};
    use kurbo::Size;

    fn env<'a>(
        document: &'a Document,
        camera: &'a Camera,
        prefs: &'a SnapPreferences,
        diagnostics: &'a RecordingDiagnostics,
        ignore: Vec<IgnoredObject>,
    ) -> SnapEnv<'a> {
        SnapEnv {
            prefs,
            document,
            camera,
            ignore,
            unselected_nodes: Vec::new(),
            diagnostics,
        }
    }

    fn square(x: f64, y: f64) -> Item {
        Item::rect(Rect::new(x, y, x + 10.0, y + 10.0))
    }

    #[test]
    fn test_collects_near_and_visible_items() {
        let mut document = Document::new(Size::new(1000.0, 1000.0));
        document.add_item(square(0.0, 0.0));
        document.add_item(square(500.0, 500.0));
        document.add_item(square(5000.0, 5000.0));
        let camera = Camera::new();
        let prefs = SnapPreferences::default();
        let diagnostics = RecordingDiagnostics::new();
        let env = env(&document, &camera, &prefs, &diagnostics, Vec::new());

        let mut collector = CandidateCollector::new();
        collector.collect(&env, Point::new(12.0, 12.0), None);
        assert!(collector.is_collected());
        assert_eq!(collector.object_candidates().len(), 1);
        assert_eq!(collector.align_candidates().len(), 2);
        assert!(diagnostics.limits().is_empty());
    }

    #[test]
    fn test_second_collect_in_gesture_is_a_no_op() {
        let mut document = Document::new(Size::new(100.0, 100.0));
        document.add_item(square(0.0, 0.0));
        let camera = Camera::new();
        let prefs = SnapPreferences::default();
        let diagnostics = RecordingDiagnostics::new();
        let env = env(&document, &camera, &prefs, &diagnostics, Vec::new());

        let mut collector = CandidateCollector::new();
        collector.collect(&env, Point::new(5.0, 5.0), None);
        collector.collect(&env, Point::new(900.0, 900.0), None);
        assert_eq!(collector.object_candidates().len(), 1);
    }

    #[test]
    fn test_skips_hidden_and_ignored_items() {
        let mut document = Document::new(Size::new(100.0, 100.0));
        document.add_item(square(0.0, 0.0).hidden(true));
        let dragged = document.add_item(square(0.0, 0.0));
        document.add_item(square(5.0, 5.0));
        let camera = Camera::new();
        let prefs = SnapPreferences::default();
        let diagnostics = RecordingDiagnostics::new();
        let env = env(&document, &camera, &prefs, &diagnostics, vec![IgnoredObject::Item(dragged)]);

        let mut collector = CandidateCollector::new();
        collector.collect(&env, Point::new(5.0, 5.0), None);
        assert_eq!(collector.object_candidates().len(), 1);
        assert_ne!(collector.object_candidates()[0].item.id, dragged);
    }

    #[test]
    fn test_marked_items_are_skipped_while_a_marked_item_is_ignored() {
        let boolean_op = ItemMarkers {
            boolean_op_effect: true,
            hidden_filter: false,
        };
        let hidden_filter = ItemMarkers {
            boolean_op_effect: false,
            hidden_filter: true,
        };
        let mut document = Document::new(Size::new(100.0, 100.0));
        let dragged = document.add_item(square(0.0, 0.0).with_markers(boolean_op));
        document.add_item(square(5.0, 5.0).with_markers(boolean_op));
        document.add_item(square(5.0, 5.0).with_markers(hidden_filter));
        let plain = document.add_item(square(5.0, 5.0));
        let camera = Camera::new();
        let prefs = SnapPreferences::default();
        let diagnostics = RecordingDiagnostics::new();
        let env = env(&document, &camera, &prefs, &diagnostics, vec![IgnoredObject::Item(dragged)]);

        let mut collector = CandidateCollector::new();
        collector.collect(&env, Point::new(5.0, 5.0), None);
        assert_eq!(collector.object_candidates().len(), 1);
        assert_eq!(collector.object_candidates()[0].item.id, plain);
    }

    #[test]
    fn test_marked_items_are_kept_when_ignored_items_are_plain() {
        let mut document = Document::new(Size::new(100.0, 100.0));
        let dragged = document.add_item(square(0.0, 0.0));
        document.add_item(square(5.0, 5.0).with_markers(ItemMarkers {
            boolean_op_effect: false,
            hidden_filter: true,
        }));
        let camera = Camera::new();
        let prefs = SnapPreferences::default();
        let diagnostics = RecordingDiagnostics::new();
        let env = env(&document, &camera, &prefs, &diagnostics, vec![IgnoredObject::Item(dragged)]);

        let mut collector = CandidateCollector::new();
        collector.collect(&env, Point::new(5.0, 5.0), None);
        assert_eq!(collector.object_candidates().len(), 1);
        assert!(collector.object_candidates()[0].item.markers.hidden_filter);
    }

    #[test]
    fn test_clip_and_mask_children_are_candidates() {
        let clip = square(0.0, 0.0).hidden(true);
        let clipped = square(0.0, 0.0)
            .with_clip(clip)
            .with_transform(Affine::translate((20.0, 0.0)));
        let mut document = Document::new(Size::new(100.0, 100.0));
        document.add_item(clipped);
        let camera = Camera::new();
        let mut prefs = SnapPreferences::default();
        let diagnostics = RecordingDiagnostics::new();

        {
            let env = env(&document, &camera, &prefs, &diagnostics, Vec::new());
            let mut collector = CandidateCollector::new();
            collector.collect(&env, Point::new(25.0, 5.0), None);
            let candidates = collector.object_candidates();
            assert_eq!(candidates.len(), 2);
            let clip = candidates.iter().find(|c| c.is_clip_or_mask()).unwrap();
            assert_eq!(clip.path_target(), SnapTargetType::PathClip);
            let bbox = clip.item.geometric_bounds(clip.parent_to_doc).unwrap();
            assert!((bbox.x0 - 20.0).abs() < 1e-9);
            assert_eq!(clip.additional_affine, Affine::translate((20.0, 0.0)));
        }

        prefs.set_target_snappable(SnapTargetType::PathClip, false);
        let env = env(&document, &camera, &prefs, &diagnostics, Vec::new());
        let mut collector = CandidateCollector::new();
        collector.collect(&env, Point::new(25.0, 5.0), None);
        assert_eq!(collector.object_candidates().len(), 1);
    }

    #[test]
    fn test_groups_are_transparent() {
        let group = Item::group(vec![square(0.0, 0.0), square(20.0, 0.0)]).with_transform(Affine::translate((100.0, 0.0)));
        let mut document = Document::new(Size::new(100.0, 100.0));
        document.add_item(group);
        let camera = Camera::new();
        let prefs = SnapPreferences::default();
        let diagnostics = RecordingDiagnostics::new();
        let env = env(&document, &camera, &prefs, &diagnostics, Vec::new());

        let mut collector = CandidateCollector::new();
        collector.collect(&env, Point::new(105.0, 5.0), None);
        assert_eq!(collector.object_candidates().len(), 1);
        assert_eq!(collector.align_candidates().len(), 2);
        assert!(collector.align_candidates().iter().all(|c| c.item.as_path().is_some()));
    }

    #[test]
    fn test_candidate_cap() {
        let mut document = Document::new(Size::new(100.0, 100.0));
        for i in 0..250 {
            document.add_item(square(f64::from(i) * 0.01, 0.0));
        }
        let camera = Camera::new();
        let prefs = SnapPreferences::default();
        let diagnostics = RecordingDiagnostics::new();
        let env = env(&document, &camera, &prefs, &diagnostics, Vec::new());

        let mut collector = CandidateCollector::new();
        collector.collect(&env, Point::new(5.0, 5.0), None);
        assert!(collector.limit_reached());
        assert_eq!(collector.align_candidates().len(), MAX_SNAP_CANDIDATES);
        assert_eq!(diagnostics.limits(), vec![MAX_SNAP_CANDIDATES]);
    }

    #[test]
    fn test_exactly_at_cap_does_not_warn() {
        let mut document = Document::new(Size::new(100.0, 100.0));
        for _ in 0..MAX_SNAP_CANDIDATES {
            document.add_item(square(0.0, 0.0));
        }
        let camera = Camera::new();
        let prefs = SnapPreferences::default();
        let diagnostics = RecordingDiagnostics::new();
        let env = env(&document, &camera, &prefs, &diagnostics, Vec::new());

        let mut collector = CandidateCollector::new();
        collector.collect(&env, Point::new(5.0, 5.0), None);
        assert!(!collector.limit_reached());
        assert!(diagnostics.limits().is_empty());
    }
}
