//! Geometry utilities: pure functions over axis-aligned rectangles.
//!
//! Everything here is stateless. Rectangles are the unrotated bounding boxes
//! of elements in design-area coordinates; rotation is ignored for bounds
//! and snapping, matching how elements are laid out before rotation is
//! applied around their center.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

use serde::{Deserialize, Serialize};

use crate::camera::Point;
use crate::hit::ResizeAnchor;

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// A rectangle at the origin with the given size.
    #[must_use]
    pub fn from_size(width: f64, height: f64) -> Self {
        Self { x: 0.0, y: 0.0, width, height }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether the two rectangles share a region of positive area.
    ///
    /// Rectangles that merely touch along an edge do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.right() > other.x && self.x < other.right() && self.bottom() > other.y && self.y < other.bottom()
    }

    #[must_use]
    pub fn contains(&self, pt: Point) -> bool {
        pt.x >= self.x && pt.x <= self.right() && pt.y >= self.y && pt.y <= self.bottom()
    }
}

/// Whether any part of `rect` lies inside `area`.
#[must_use]
pub fn is_partially_visible(rect: &Rect, area: &Rect) -> bool {
    rect.overlaps(area)
}

/// Pull a rectangle that is completely outside `area` back so that `inset`
/// units of it sit inside the nearest edge. Rectangles with any overlap are
/// returned unchanged.
///
/// Each axis is corrected independently, so a rectangle off a corner is
/// pulled back on both axes while one that is only off to the left keeps its
/// vertical position.
#[must_use]
pub fn snap_back_if_outside(rect: &Rect, area: &Rect, inset: f64) -> Point {
    if rect.overlaps(area) {
        return Point::new(rect.x, rect.y);
    }

    let inset_x = inset.min(area.width).min(rect.width);
    let inset_y = inset.min(area.height).min(rect.height);

    let mut x = rect.x;
    let mut y = rect.y;

    if rect.right() <= area.x {
        x = area.x - rect.width + inset_x;
    } else if rect.x >= area.right() {
        x = area.right() - inset_x;
    }

    if rect.bottom() <= area.y {
        y = area.y - rect.height + inset_y;
    } else if rect.y >= area.bottom() {
        y = area.bottom() - inset_y;
    }

    Point::new(x, y)
}

/// Round `value` to the nearest multiple of `grid`.
#[must_use]
pub fn snap_to_grid(value: f64, grid: f64) -> f64 {
    if grid <= 0.0 {
        return value;
    }
    (value / grid).round() * grid
}

/// Result of center snapping a candidate position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenterSnap {
    /// Top-left after snapping.
    pub pos: Point,
    /// The x axis was pulled to the area's horizontal center.
    pub snapped_x: bool,
    /// The y axis was pulled to the area's vertical center.
    pub snapped_y: bool,
}

/// Snap each axis of a rectangle's center to the area center independently
/// when it is strictly closer than `threshold`.
#[must_use]
pub fn center_snap(rect: &Rect, area: &Rect, threshold: f64) -> CenterSnap {
    let target = area.center();
    let center = rect.center();

    let snapped_x = (center.x - target.x).abs() < threshold;
    let snapped_y = (center.y - target.y).abs() < threshold;

    let x = if snapped_x { target.x - rect.width / 2.0 } else { rect.x };
    let y = if snapped_y { target.y - rect.height / 2.0 } else { rect.y };

    CenterSnap { pos: Point::new(x, y), snapped_x, snapped_y }
}

/// Snap `deg` to the nearest multiple of 90° when within `threshold` degrees.
#[must_use]
pub fn snap_rotation(deg: f64, threshold: f64) -> f64 {
    let nearest = (deg / 90.0).round() * 90.0;
    if (deg - nearest).abs() <= threshold {
        // Avoid handing back -0.0 for a snap to zero.
        nearest + 0.0
    } else {
        deg
    }
}

/// Scale `width × height` up uniformly until both are at least `min`.
fn floor_preserving_aspect(width: f64, height: f64, aspect: f64, min: f64) -> (f64, f64) {
    let (mut w, mut h) = (width, height);
    if w < min {
        w = min;
        h = w / aspect;
    }
    if h < min {
        h = min;
        w = h * aspect;
    }
    (w, h)
}

/// Aspect-preserving resize of `orig` by a pointer delta on one handle.
///
/// Corner handles anchor the opposite corner; the axis with the larger
/// relative change drives and the other follows from `aspect`. Edge handles
/// anchor the opposite edge and keep the perpendicular axis centered. Both
/// dimensions are floored at `min`.
#[must_use]
pub fn resize_with_aspect(orig: &Rect, anchor: ResizeAnchor, dx: f64, dy: f64, aspect: f64, min: f64) -> Rect {
    let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { orig.width / orig.height };

    let (raw_w, raw_h) = match anchor {
        ResizeAnchor::Se => (orig.width + dx, orig.height + dy),
        ResizeAnchor::Nw => (orig.width - dx, orig.height - dy),
        ResizeAnchor::Ne => (orig.width + dx, orig.height - dy),
        ResizeAnchor::Sw => (orig.width - dx, orig.height + dy),
        ResizeAnchor::E => (orig.width + dx, orig.height),
        ResizeAnchor::W => (orig.width - dx, orig.height),
        ResizeAnchor::S => (orig.width, orig.height + dy),
        ResizeAnchor::N => (orig.width, orig.height - dy),
    };

    let (w, h) = match anchor {
        ResizeAnchor::E | ResizeAnchor::W => (raw_w, raw_w / aspect),
        ResizeAnchor::N | ResizeAnchor::S => (raw_h * aspect, raw_h),
        _ => {
            let rel_w = (raw_w - orig.width).abs() / orig.width;
            let rel_h = (raw_h - orig.height).abs() / orig.height;
            if rel_w >= rel_h { (raw_w, raw_w / aspect) } else { (raw_h * aspect, raw_h) }
        }
    };
    let (w, h) = floor_preserving_aspect(w, h, aspect, min);

    let (x, y) = match anchor {
        ResizeAnchor::Se => (orig.x, orig.y),
        ResizeAnchor::Nw => (orig.right() - w, orig.bottom() - h),
        ResizeAnchor::Ne => (orig.x, orig.bottom() - h),
        ResizeAnchor::Sw => (orig.right() - w, orig.y),
        ResizeAnchor::E => (orig.x, orig.y + (orig.height - h) / 2.0),
        ResizeAnchor::W => (orig.right() - w, orig.y + (orig.height - h) / 2.0),
        ResizeAnchor::S => (orig.x + (orig.width - w) / 2.0, orig.y),
        ResizeAnchor::N => (orig.x + (orig.width - w) / 2.0, orig.bottom() - h),
    };

    Rect::new(x, y, w, h)
}

/// Angle in degrees from `center` to `pt`, measured with `atan2`.
#[must_use]
pub fn pointer_angle_deg(center: Point, pt: Point) -> f64 {
    (pt.y - center.y).atan2(pt.x - center.x).to_degrees()
}
