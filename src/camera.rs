#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::{Deserialize, Serialize};

/// A point in canvas or design-area space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Rotate this point by `deg` degrees clockwise around `center`.
    #[must_use]
    pub fn rotate_around(self, center: Self, deg: f64) -> Self {
        if deg == 0.0 {
            return self;
        }
        let (sin, cos) = deg.to_radians().sin_cos();
        let dx = self.x - center.x;
        let dy = self.y - center.y;
        Self {
            x: center.x + dx * cos - dy * sin,
            y: center.y + dx * sin + dy * cos,
        }
    }
}

/// Maps canvas pixels onto the design area.
///
/// `pan_x` / `pan_y` are in CSS pixels and position the product template
/// inside the host canvas. `zoom` is a scale factor (1.0 = template size).
/// Element coordinates live in design-area space, so conversions also take
/// the active design area's offset within the template.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self { pan_x: 0.0, pan_y: 0.0, zoom: 1.0 }
    }
}

impl Camera {
    /// Convert a canvas-space point (CSS pixels) to design-area coordinates.
    #[must_use]
    pub fn screen_to_local(&self, screen: Point, area_origin: Point) -> Point {
        Point {
            x: (screen.x - self.pan_x) / self.zoom - area_origin.x,
            y: (screen.y - self.pan_y) / self.zoom - area_origin.y,
        }
    }

    /// Convert a screen-space distance (pixels) to design-area distance.
    #[must_use]
    pub fn screen_dist_to_local(&self, screen_dist: f64) -> f64 {
        screen_dist / self.zoom
    }
}
