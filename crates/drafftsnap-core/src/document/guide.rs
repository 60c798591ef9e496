//! Guide lines.

use crate::geom::rot90;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for guides.
pub type GuideId = Uuid;

/// An infinite guide line, given by a point on it and its normal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Guide {
    #[serde(default = "Uuid::new_v4")]
    pub id: GuideId,
    pub point: Point,
    pub normal: Vec2,
}

impl Guide {
    pub fn new(point: Point, normal: Vec2) -> Self {
        Self {
            id: Uuid::new_v4(),
            point,
            normal,
        }
    }

    /// A horizontal guide at height `y`.
    pub fn horizontal(y: f64) -> Self {
        Self::new(Point::new(0.0, y), Vec2::new(0.0, 1.0))
    }

    /// A vertical guide at `x`.
    pub fn vertical(x: f64) -> Self {
        Self::new(Point::new(x, 0.0), Vec2::new(1.0, 0.0))
    }

    /// Direction along the guide.
    pub fn direction(&self) -> Vec2 {
        rot90(self.normal)
    }
}
