//! Camera module: the view onto the document used to convert snap
//! tolerances and to find the visible area.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Camera manages the view transform of the canvas.
///
/// World coordinates are document coordinates (y down). A zoom of 1.0 shows
/// one document unit per screen pixel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    /// Current translation offset (pan), in screen pixels
    pub offset: Vec2,
    /// Current zoom level (1.0 = 100%)
    pub zoom: f64,
    /// Minimum allowed zoom level
    pub min_zoom: f64,
    /// Maximum allowed zoom level
    pub max_zoom: f64,
    /// Size of the visible canvas in screen pixels
    pub viewport: Size,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
            min_zoom: 0.01,
            max_zoom: 256.0,
            viewport: Size::new(1280.0, 800.0),
        }
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a camera showing `center` in the middle of a `viewport` at
    /// `zoom`, clamped to the allowed zoom range.
    pub fn centered_on(center: Point, viewport: Size, zoom: f64) -> Self {
        let mut camera = Self {
            viewport,
            ..Self::default()
        };
        camera.zoom = zoom.clamp(camera.min_zoom, camera.max_zoom);
        let zoom = camera.zoom;
        camera.offset = Vec2::new(
            viewport.width / 2.0 - center.x * zoom,
            viewport.height / 2.0 - center.y * zoom,
        );
        camera
    }

    /// Screen to world transform.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.offset)
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    /// Zoom factor used to turn screen-pixel tolerances into world distances.
    pub fn current_zoom(&self) -> f64 {
        self.zoom
    }

    /// The part of the document that is currently visible.
    pub fn display_area(&self) -> Rect {
        let top_left = self.screen_to_world(Point::ZERO);
        let bottom_right = self.screen_to_world(Point::new(self.viewport.width, self.viewport.height));
        Rect::from_points(top_left, bottom_right)
    }
}
