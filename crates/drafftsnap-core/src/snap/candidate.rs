//! Snap sources, snap targets and the candidates fed to the snappers.

use crate::document::{GuideId, Item, ItemId};
use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Category of a snap source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapSourceCategory {
    BBox,
    Node,
    Others,
    /// Guides and grid pitch: always allowed to snap.
    Datums,
}

/// The kind of point being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapSourceType {
    #[default]
    Undefined,
    BBoxCorner,
    BBoxMidpoint,
    BBoxEdgeMidpoint,
    NodeSmooth,
    NodeCusp,
    NodeHandle,
    LineMidpoint,
    PathIntersection,
    RotationCenter,
    ObjectMidpoint,
    OtherHandle,
    Guide,
    GuideOrigin,
    GridPitch,
}

impl SnapSourceType {
    pub fn category(self) -> Option<SnapSourceCategory> {
        use SnapSourceType::*;
        match self {
            Undefined => None,
            BBoxCorner | BBoxMidpoint | BBoxEdgeMidpoint => Some(SnapSourceCategory::BBox),
            NodeSmooth | NodeCusp | NodeHandle | LineMidpoint | PathIntersection => {
                Some(SnapSourceCategory::Node)
            }
            RotationCenter | ObjectMidpoint | OtherHandle => Some(SnapSourceCategory::Others),
            Guide | GuideOrigin | GridPitch => Some(SnapSourceCategory::Datums),
        }
    }

    pub fn is_bbox(self) -> bool {
        self.category() == Some(SnapSourceCategory::BBox)
    }

    pub fn is_node(self) -> bool {
        self.category() == Some(SnapSourceCategory::Node)
    }
}

/// Category of a snap target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapTargetCategory {
    BBox,
    Node,
    Datums,
    Others,
    Alignment,
    Distribution,
}

impl SnapTargetCategory {
    /// The toggle that switches the whole category; datums have none.
    pub fn toggle(self) -> Option<SnapTargetType> {
        match self {
            SnapTargetCategory::BBox => Some(SnapTargetType::BBoxCategory),
            SnapTargetCategory::Node => Some(SnapTargetType::NodeCategory),
            SnapTargetCategory::Others => Some(SnapTargetType::OthersCategory),
            SnapTargetCategory::Alignment => Some(SnapTargetType::AlignmentCategory),
            SnapTargetCategory::Distribution => Some(SnapTargetType::DistributionCategory),
            SnapTargetCategory::Datums => None,
        }
    }
}

/// What a point snapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapTargetType {
    #[default]
    Undefined,

    BBoxCategory,
    BBoxCorner,
    BBoxEdge,
    BBoxEdgeMidpoint,
    BBoxMidpoint,

    NodeCategory,
    NodeSmooth,
    NodeCusp,
    LineMidpoint,
    EllipseQuadrant,
    Path,
    PathPerpendicular,
    PathTangential,
    PathIntersection,
    PathGuideIntersection,
    PathClip,
    PathMask,

    Grid,
    GridIntersection,
    GridLine,
    GridPerpendicular,
    Guide,
    GuideIntersection,
    GuideOrigin,
    GuidePerpendicular,
    GridGuideIntersection,
    PageEdgeBorder,
    PageEdgeCorner,
    PageEdgeCenter,

    OthersCategory,
    ObjectMidpoint,
    RotationCenter,
    ConstrainedAngle,
    Constraint,

    AlignmentCategory,
    AlignmentBBoxCorner,
    AlignmentBBoxMidpoint,
    AlignmentBBoxEdgeMidpoint,
    AlignmentPageCorner,
    AlignmentPageCenter,
    AlignmentHandle,
    AlignmentIntersection,

    DistributionCategory,
    DistributionX,
    DistributionY,
    DistributionRight,
    DistributionLeft,
    DistributionUp,
    DistributionDown,
    DistributionXY,
}

impl SnapTargetType {
    pub fn category(self) -> Option<SnapTargetCategory> {
        use SnapTargetType::*;
        let category = match self {
            Undefined | ConstrainedAngle | Constraint => return None,
            BBoxCategory | BBoxCorner | BBoxEdge | BBoxEdgeMidpoint | BBoxMidpoint => SnapTargetCategory::BBox,
            NodeCategory | NodeSmooth | NodeCusp | LineMidpoint | EllipseQuadrant | Path | PathPerpendicular | PathTangential
            | PathIntersection | PathGuideIntersection | PathClip | PathMask => SnapTargetCategory::Node,
            Grid | GridIntersection | GridLine | GridPerpendicular | Guide | GuideIntersection | GuideOrigin
            | GuidePerpendicular | GridGuideIntersection | PageEdgeBorder | PageEdgeCorner | PageEdgeCenter => {
                SnapTargetCategory::Datums
            }
            OthersCategory | ObjectMidpoint | RotationCenter => SnapTargetCategory::Others,
            AlignmentCategory | AlignmentBBoxCorner | AlignmentBBoxMidpoint | AlignmentBBoxEdgeMidpoint
            | AlignmentPageCorner | AlignmentPageCenter | AlignmentHandle | AlignmentIntersection => {
                SnapTargetCategory::Alignment
            }
            DistributionCategory | DistributionX | DistributionY | DistributionRight | DistributionLeft
            | DistributionUp | DistributionDown | DistributionXY => SnapTargetCategory::Distribution,
        };
        Some(category)
    }

    /// Whether this target is itself the switch of a whole category.
    pub fn is_category_toggle(self) -> bool {
        self.category().and_then(SnapTargetCategory::toggle) == Some(self)
    }

    /// Toggles (besides the category switch) that must be on for this target.
    pub fn toggles(self) -> &'static [SnapTargetType] {
        use SnapTargetType::*;
        match self {
            Undefined | ConstrainedAngle | Constraint => &[],
            BBoxCategory | NodeCategory | OthersCategory | AlignmentCategory | DistributionCategory => &[],
            GridIntersection | GridPerpendicular => &[Grid],
            GridLine => &[Grid, GridLine],
            GuideIntersection | GuideOrigin | GuidePerpendicular => &[Guide],
            GridGuideIntersection => &[Grid, Guide],
            PathGuideIntersection => &[Path, Guide],
            AlignmentBBoxCorner | AlignmentBBoxMidpoint | AlignmentBBoxEdgeMidpoint | AlignmentPageCorner
            | AlignmentPageCenter | AlignmentIntersection => &[],
            DistributionX | DistributionY | DistributionRight | DistributionLeft | DistributionUp
            | DistributionDown | DistributionXY => &[],
            BBoxCorner => &[BBoxCorner],
            BBoxEdge => &[BBoxEdge],
            BBoxEdgeMidpoint => &[BBoxEdgeMidpoint],
            BBoxMidpoint => &[BBoxMidpoint],
            NodeSmooth => &[NodeSmooth],
            NodeCusp => &[NodeCusp],
            LineMidpoint => &[LineMidpoint],
            EllipseQuadrant => &[EllipseQuadrant],
            Path => &[Path],
            PathPerpendicular => &[PathPerpendicular],
            PathTangential => &[PathTangential],
            PathIntersection => &[PathIntersection],
            PathClip => &[PathClip],
            PathMask => &[PathMask],
            Grid => &[Grid],
            Guide => &[Guide],
            PageEdgeBorder => &[PageEdgeBorder],
            PageEdgeCorner => &[PageEdgeCorner],
            PageEdgeCenter => &[PageEdgeCenter],
            ObjectMidpoint => &[ObjectMidpoint],
            RotationCenter => &[RotationCenter],
            AlignmentHandle => &[AlignmentHandle],
        }
    }

    /// Rank used to break ties between otherwise equivalent snaps; lower wins.
    pub fn priority(self) -> u8 {
        use SnapTargetType::*;
        match self {
            NodeCusp | NodeSmooth => 0,
            BBoxCorner | RotationCenter | ObjectMidpoint => 1,
            BBoxMidpoint | BBoxEdgeMidpoint | LineMidpoint | EllipseQuadrant | PageEdgeCorner | PageEdgeCenter => 2,
            PathIntersection | PathGuideIntersection => 3,
            Path | PathClip | PathMask | PathPerpendicular | PathTangential | BBoxEdge | PageEdgeBorder => 4,
            GuideOrigin | GuideIntersection => 5,
            Guide | GuidePerpendicular | GridGuideIntersection => 6,
            GridIntersection => 7,
            Grid | GridLine | GridPerpendicular => 8,
            AlignmentBBoxCorner | AlignmentBBoxMidpoint | AlignmentBBoxEdgeMidpoint | AlignmentPageCorner
            | AlignmentPageCenter | AlignmentHandle | AlignmentIntersection => 9,
            DistributionX | DistributionY | DistributionRight | DistributionLeft | DistributionUp
            | DistributionDown | DistributionXY => 10,
            Undefined | ConstrainedAngle | Constraint => 11,
            BBoxCategory | NodeCategory | OthersCategory | AlignmentCategory | DistributionCategory => 12,
        }
    }

    /// Whether a snap to this target is guaranteed to lie on a path.
    pub fn is_on_path(self) -> bool {
        use SnapTargetType::*;
        matches!(
            self,
            LineMidpoint
                | EllipseQuadrant
                | Path
                | PathPerpendicular
                | PathTangential
                | PathIntersection
                | PathGuideIntersection
                | PathClip
                | PathMask
        )
    }

    pub fn is_intersection(self) -> bool {
        use SnapTargetType::*;
        matches!(
            self,
            PathIntersection
                | PathGuideIntersection
                | GridIntersection
                | GuideIntersection
                | GridGuideIntersection
                | AlignmentIntersection
        )
    }
}

/// A hint attached to a candidate: a fixed origin the dragged point is
/// connected to, or a fixed direction it moves along.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OriginOrVector {
    Origin(Point),
    Vector(Vec2),
}

/// The point that is being snapped.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapCandidatePoint {
    pub point: Point,
    pub source: SnapSourceType,
    /// Index of the point in the set being snapped; `None` when not part of a set.
    pub source_num: Option<usize>,
    /// Only meaningful when the candidate is used as a target.
    pub target: SnapTargetType,
    pub origins_and_vectors: Vec<OriginOrVector>,
    pub target_bbox: Option<Rect>,
    pub consider_for_alignment: bool,
    pub single_handle: bool,
}

impl SnapCandidatePoint {
    pub fn new(point: Point, source: SnapSourceType) -> Self {
        Self {
            point,
            source,
            source_num: None,
            target: SnapTargetType::Undefined,
            origins_and_vectors: Vec::new(),
            target_bbox: None,
            consider_for_alignment: false,
            single_handle: false,
        }
    }

    /// A candidate used as a target, e.g. an alignment reference.
    pub fn target(point: Point, source: SnapSourceType, target: SnapTargetType) -> Self {
        Self {
            target,
            ..Self::new(point, source)
        }
    }

    pub fn with_source_num(mut self, num: usize) -> Self {
        self.source_num = Some(num);
        self
    }

    pub fn with_bbox(mut self, bbox: Rect) -> Self {
        self.target_bbox = Some(bbox);
        self
    }

    /// Mark as the single handle being dragged, which allows snapping the
    /// pointer rather than the constrained position.
    pub fn single_handle(mut self) -> Self {
        self.single_handle = true;
        self
    }

    pub fn consider_for_alignment(mut self) -> Self {
        self.consider_for_alignment = true;
        self
    }

    pub fn add_origin(&mut self, origin: Point) {
        self.origins_and_vectors.push(OriginOrVector::Origin(origin));
    }

    pub fn add_vector(&mut self, vector: Vec2) {
        self.origins_and_vectors.push(OriginOrVector::Vector(vector));
    }

    /// Whether this is the first point of a set (or not part of a set);
    /// per-gesture target caches are rebuilt only for the first point.
    pub fn is_first(&self) -> bool {
        matches!(self.source_num, None | Some(0))
    }
}

/// Which side object a candidate was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipOrMask {
    Clip,
    Mask,
}

/// An item that may be snapped to, found by the candidate collector.
#[derive(Debug, Clone, Copy)]
pub struct SnapCandidateItem<'a> {
    pub item: &'a Item,
    /// Set when the item is part of a clip path or a mask.
    pub clip_or_mask: Option<ClipOrMask>,
    /// Item-to-document transform of the clipped/masked item, identity otherwise.
    pub additional_affine: Affine,
    /// Transform from the item's parent space to document coordinates.
    pub parent_to_doc: Affine,
}

impl<'a> SnapCandidateItem<'a> {
    pub fn new(
        item: &'a Item,
        clip_or_mask: Option<ClipOrMask>,
        additional_affine: Affine,
        parent_to_doc: Affine,
    ) -> Self {
        Self {
            item,
            clip_or_mask,
            additional_affine,
            parent_to_doc,
        }
    }

    pub fn is_clip_or_mask(&self) -> bool {
        self.clip_or_mask.is_some()
    }

    /// Target type of the item's own path.
    pub fn path_target(&self) -> SnapTargetType {
        match self.clip_or_mask {
            None => SnapTargetType::Path,
            Some(ClipOrMask::Clip) => SnapTargetType::PathClip,
            Some(ClipOrMask::Mask) => SnapTargetType::PathMask,
        }
    }
}

/// Something the snappers must not snap to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum IgnoredObject {
    Item(ItemId),
    Guide(GuideId),
    Page,
}

impl IgnoredObject {
    pub fn as_item(&self) -> Option<ItemId> {
        match self {
            IgnoredObject::Item(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_guide(&self) -> Option<GuideId> {
        match self {
            IgnoredObject::Guide(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_page(&self) -> bool {
        matches!(self, IgnoredObject::Page)
    }
}
