//! DrafftSnap Core Library
//!
//! Interactive snapping for vector editing: grids, guides, object geometry,
//! alignment and distribution, driven by a per-gesture snap session.

pub mod camera;
pub mod document;
pub mod geom;
pub mod snap;

pub use camera::Camera;
pub use document::{Document, Grid, GridKind, Guide, Item, SceneError};
pub use geom::SnapConstraint;
pub use snap::{
    SetupOptions, SnapCandidatePoint, SnapManager, SnapPreferences, SnapSession, SnapSourceType, SnapTargetType,
    SnappedPoint,
};
