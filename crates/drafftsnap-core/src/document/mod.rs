//! The scene the snapping engine reads: an item tree, guides, grids and a page.

mod grid;
mod guide;
mod item;

pub use grid::{Grid, GridKind};
pub use guide::{Guide, GuideId};
pub use item::{BBoxKind, Item, ItemId, ItemKind, ItemMarkers, PathNode};

use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Scene loading errors.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Unknown item: {0}")]
    UnknownItem(ItemId),
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// A document: the root group, its guides and grids, and the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub root: Item,
    #[serde(default)]
    pub guides: Vec<Guide>,
    #[serde(default)]
    pub grids: Vec<Grid>,
    pub page: Size,
    #[serde(default = "default_show_grids")]
    pub show_grids: bool,
}

fn default_show_grids() -> bool {
    true
}

impl Document {
    /// Create an empty document with the given page size.
    pub fn new(page: Size) -> Self {
        Self {
            root: Item::group(Vec::new()),
            guides: Vec::new(),
            grids: Vec::new(),
            page,
            show_grids: true,
        }
    }

    /// Add an item at the top level.
    pub fn add_item(&mut self, item: Item) -> ItemId {
        let id = item.id;
        match self.root.as_group_mut() {
            Some(children) => children.push(item),
            None => {
                let old_root = std::mem::replace(&mut self.root, Item::group(Vec::new()));
                self.root = Item::group(vec![old_root, item]);
            }
        }
        id
    }

    pub fn add_guide(&mut self, guide: Guide) {
        self.guides.push(guide);
    }

    pub fn add_grid(&mut self, grid: Grid) {
        self.grids.push(grid);
    }

    /// Top-level items.
    pub fn items(&self) -> &[Item] {
        self.root.as_group().unwrap_or(std::slice::from_ref(&self.root))
    }

    pub fn find_item(&self, id: ItemId) -> SceneResult<&Item> {
        self.root.find(id).ok_or(SceneError::UnknownItem(id))
    }

    /// The page rectangle, anchored at the document origin.
    pub fn page_rect(&self) -> Rect {
        Rect::from_origin_size(Point::ZERO, self.page)
    }

    pub fn page_corners(&self) -> [Point; 4] {
        let r = self.page_rect();
        [
            Point::new(r.x0, r.y0),
            Point::new(r.x0, r.y1),
            Point::new(r.x1, r.y1),
            Point::new(r.x1, r.y0),
        ]
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> SceneResult<Self> {
        serde_json::from_str(json).map_err(|e| SceneError::Parse(e.to_string()))
    }

    /// Load a document from a JSON file.
    pub fn load(path: &Path) -> SceneResult<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| SceneError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }
}
