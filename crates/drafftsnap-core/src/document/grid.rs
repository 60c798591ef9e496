//! Grid definitions.

use crate::snap::GridSnapper;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Grid layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridKind {
    #[default]
    Rectangular,
    /// Two skewed axes at `angle_x` / `angle_z` plus vertical lines.
    Axonometric,
}

/// A document grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub kind: GridKind,
    #[serde(default)]
    pub origin: Point,
    pub spacing: Vec2,
    /// Angle of the X axis in degrees (axonometric only).
    #[serde(default = "default_angle")]
    pub angle_x: f64,
    /// Angle of the Z axis in degrees (axonometric only).
    #[serde(default = "default_angle")]
    pub angle_z: f64,
    /// Every n-th line is a major line.
    #[serde(default = "default_major_line_interval")]
    pub major_line_interval: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_angle() -> f64 {
    30.0
}

fn default_major_line_interval() -> u32 {
    5
}

fn default_enabled() -> bool {
    true
}

impl Grid {
    /// A rectangular grid.
    pub fn rectangular(origin: Point, spacing: Vec2) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: GridKind::Rectangular,
            origin,
            spacing,
            angle_x: default_angle(),
            angle_z: default_angle(),
            major_line_interval: default_major_line_interval(),
            enabled: true,
        }
    }

    /// An axonometric grid; only `spacing_y` matters for its line pitch.
    pub fn axonometric(origin: Point, spacing_y: f64, angle_x: f64, angle_z: f64) -> Self {
        Self {
            kind: GridKind::Axonometric,
            angle_x,
            angle_z,
            ..Self::rectangular(origin, Vec2::new(spacing_y, spacing_y))
        }
    }

    pub fn with_major_line_interval(mut self, interval: u32) -> Self {
        self.major_line_interval = interval;
        self
    }

    /// The snapper for this grid.
    pub fn snapper(&self) -> GridSnapper<'_> {
        GridSnapper::new(self)
    }
}
