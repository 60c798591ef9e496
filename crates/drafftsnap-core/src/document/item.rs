//! Document items: paths and groups, with optional clip and mask objects.

use crate::geom::segment_tangent;
use kurbo::{Affine, BezPath, Ellipse, ParamCurve, ParamCurveExtrema, PathSeg, Point, Rect, Shape, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for items.
pub type ItemId = Uuid;

/// Flattening tolerance used when converting ellipses to Béziers.
const ELLIPSE_TOLERANCE: f64 = 0.1;

/// Which bounding box of an item to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BBoxKind {
    /// Raw path extents.
    Geometric,
    /// Path extents including the stroke.
    Visual,
}

/// Markers that make an item part of live construction geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMarkers {
    /// The item carries a boolean-operation path effect.
    #[serde(default)]
    pub boolean_op_effect: bool,
    /// The item uses the filter that hides selectable helper geometry.
    #[serde(default)]
    pub hidden_filter: bool,
}

impl ItemMarkers {
    /// Whether any construction marker is present.
    pub fn any(&self) -> bool {
        self.boolean_op_effect || self.hidden_filter
    }
}

/// Content of an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemKind {
    /// A group; its children are snap candidates, the group itself is not.
    Group { children: Vec<Item> },
    /// A path in item coordinates.
    Path {
        #[serde(with = "svg_path")]
        path: BezPath,
    },
    /// An axis-aligned ellipse in item coordinates.
    Ellipse { center: Point, radii: Vec2 },
}

/// A node of a path, in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathNode {
    pub point: Point,
    /// Whether the incoming and outgoing tangents are collinear.
    pub smooth: bool,
}

/// An item of the document tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    #[serde(default = "Uuid::new_v4")]
    pub id: ItemId,
    #[serde(flatten)]
    pub kind: ItemKind,
    /// Item to parent transform.
    #[serde(default)]
    pub transform: Affine,
    #[serde(default)]
    pub hidden: bool,
    /// Locked items are not editable but remain snap targets.
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub stroke_width: f64,
    /// Clip object, expressed in this item's own coordinates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<Box<Item>>,
    /// Mask object, expressed in this item's own coordinates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<Box<Item>>,
    #[serde(default)]
    pub markers: ItemMarkers,
    /// Explicit rotation center in item coordinates; the bbox center otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_center: Option<Point>,
}

impl Item {
    fn with_kind(kind: ItemKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            transform: Affine::IDENTITY,
            hidden: false,
            locked: false,
            stroke_width: 0.0,
            clip: None,
            mask: None,
            markers: ItemMarkers::default(),
            rotation_center: None,
        }
    }

    /// Create a path item.
    pub fn path(path: BezPath) -> Self {
        Self::with_kind(ItemKind::Path { path })
    }

    /// Create a group item.
    pub fn group(children: Vec<Item>) -> Self {
        Self::with_kind(ItemKind::Group { children })
    }

    /// Create an ellipse item.
    pub fn ellipse(center: Point, radii: Vec2) -> Self {
        Self::with_kind(ItemKind::Ellipse { center, radii })
    }

    /// Create a closed rectangular path item.
    pub fn rect(rect: Rect) -> Self {
        let mut path = BezPath::new();
        path.move_to((rect.x0, rect.y0));
        path.line_to((rect.x1, rect.y0));
        path.line_to((rect.x1, rect.y1));
        path.line_to((rect.x0, rect.y1));
        path.close_path();
        Self::path(path)
    }

    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_stroke_width(mut self, width: f64) -> Self {
        self.stroke_width = width;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn with_clip(mut self, clip: Item) -> Self {
        self.clip = Some(Box::new(clip));
        self
    }

    pub fn with_mask(mut self, mask: Item) -> Self {
        self.mask = Some(Box::new(mask));
        self
    }

    pub fn with_markers(mut self, markers: ItemMarkers) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_rotation_center(mut self, center: Point) -> Self {
        self.rotation_center = Some(center);
        self
    }

    pub fn as_group(&self) -> Option<&[Item]> {
        match &self.kind {
            ItemKind::Group { children } => Some(children),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut Vec<Item>> {
        match &mut self.kind {
            ItemKind::Group { children } => Some(children),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&BezPath> {
        match &self.kind {
            ItemKind::Path { path } => Some(path),
            _ => None,
        }
    }

    /// The four quadrant points of an ellipse item in the space given by `affine`.
    pub fn quadrant_points(&self, affine: Affine) -> Option<[Point; 4]> {
        let ItemKind::Ellipse { center, radii } = self.kind else {
            return None;
        };
        let full = affine * self.transform;
        Some([
            full * (center + Vec2::new(radii.x, 0.0)),
            full * (center + Vec2::new(0.0, radii.y)),
            full * (center - Vec2::new(radii.x, 0.0)),
            full * (center - Vec2::new(0.0, radii.y)),
        ])
    }

    /// Find an item by ID in this subtree, including clip and mask objects.
    pub fn find(&self, id: ItemId) -> Option<&Item> {
        if self.id == id {
            return Some(self);
        }
        for side in [&self.clip, &self.mask].into_iter().flatten() {
            if let Some(found) = side.find(id) {
                return Some(found);
            }
        }
        self.as_group()?.iter().find_map(|child| child.find(id))
    }

    /// Path segments in the coordinates given by `affine` (which maps this
    /// item's parent space to the target space).
    pub fn segments_in(&self, affine: Affine) -> Vec<PathSeg> {
        let full = affine * self.transform;
        match &self.kind {
            ItemKind::Path { path } => path.segments().map(|seg| full * seg).collect(),
            ItemKind::Ellipse { center, radii } => Ellipse::new(*center, *radii, 0.0)
                .path_segments(ELLIPSE_TOLERANCE)
                .map(|seg| full * seg)
                .collect(),
            ItemKind::Group { children } => children
                .iter()
                .flat_map(|child| child.segments_in(full))
                .collect(),
        }
    }

    /// Geometric bounding box, `None` for empty items.
    pub fn geometric_bounds(&self, affine: Affine) -> Option<Rect> {
        self.segments_in(affine)
            .iter()
            .map(|seg| ParamCurveExtrema::bounding_box(seg))
            .reduce(|a, b| a.union(b))
    }

    /// Bounding box including half the stroke width on each side.
    pub fn visual_bounds(&self, affine: Affine) -> Option<Rect> {
        let full = affine * self.transform;
        match &self.kind {
            ItemKind::Path { .. } | ItemKind::Ellipse { .. } => {
                let bounds = self.geometric_bounds(affine)?;
                let half = 0.5 * self.stroke_width * full.determinant().abs().sqrt();
                Some(bounds.inflate(half, half))
            }
            ItemKind::Group { children } => children
                .iter()
                .filter_map(|child| child.visual_bounds(full))
                .reduce(|a, b| a.union(b)),
        }
    }

    pub fn bounds(&self, kind: BBoxKind, affine: Affine) -> Option<Rect> {
        match kind {
            BBoxKind::Geometric => self.geometric_bounds(affine),
            BBoxKind::Visual => self.visual_bounds(affine),
        }
    }

    /// Rotation center in the space given by `affine`.
    pub fn center(&self, affine: Affine) -> Option<Point> {
        match self.rotation_center {
            Some(center) => Some(affine * self.transform * center),
            None => self.geometric_bounds(affine).map(|b| b.center()),
        }
    }

    /// Nodes of the path (or of every path in a group) in the space given by `affine`.
    pub fn nodes_in(&self, affine: Affine) -> Vec<PathNode> {
        let segments = self.segments_in(affine);
        let mut nodes = Vec::new();
        for subpath in split_subpaths(&segments) {
            collect_nodes(subpath, &mut nodes);
        }
        nodes
    }
}

/// Split consecutive segments into runs whose endpoints connect.
fn split_subpaths(segments: &[PathSeg]) -> Vec<&[PathSeg]> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..segments.len() {
        if segments[i - 1].end().distance(segments[i].start()) > 1e-9 {
            runs.push(&segments[start..i]);
            start = i;
        }
    }
    if start < segments.len() {
        runs.push(&segments[start..]);
    }
    runs
}

fn is_smooth_join(incoming: &PathSeg, outgoing: &PathSeg) -> bool {
    let a = segment_tangent(incoming, 1.0);
    let b = segment_tangent(outgoing, 0.0);
    let scale = a.hypot() * b.hypot();
    if scale == 0.0 {
        return false;
    }
    (a.cross(b) / scale).abs() < 1e-6 && a.dot(b) > 0.0
}

fn collect_nodes(subpath: &[PathSeg], nodes: &mut Vec<PathNode>) {
    let (Some(first), Some(last)) = (subpath.first(), subpath.last()) else {
        return;
    };
    let closed = subpath.len() > 1 && last.end().distance(first.start()) < 1e-9;
    for (i, seg) in subpath.iter().enumerate() {
        let smooth = if i > 0 {
            is_smooth_join(&subpath[i - 1], seg)
        } else {
            closed && is_smooth_join(last, seg)
        };
        nodes.push(PathNode { point: seg.start(), smooth });
    }
    if !closed {
        nodes.push(PathNode { point: last.end(), smooth: false });
    }
}

/// Serialize paths as SVG path data.
mod svg_path {
    use kurbo::BezPath;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(path: &BezPath, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&path.to_svg())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BezPath, D::Error> {
        let data = String::deserialize(deserializer)?;
        BezPath::from_svg(&data).map_err(serde::de::Error::custom)
    }
}
