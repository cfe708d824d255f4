//! Per-frame gesture math for drag, resize, and rotate.
//!
//! Each function takes the geometry captured at pointer-down plus the
//! current pointer and returns the live geometry for this frame. Nothing
//! here mutates the scene; the engine applies the result and commits once
//! on release.

#[cfg(test)]
#[path = "transform_test.rs"]
mod transform_test;

use crate::camera::Point;
use crate::config::EditorConfig;
use crate::geometry::{
    Rect, center_snap, is_partially_visible, pointer_angle_deg, resize_with_aspect, snap_back_if_outside,
    snap_rotation, snap_to_grid,
};
use crate::hit::ResizeAnchor;

/// Live result of one drag frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragFrame {
    /// New top-left.
    pub pos: Point,
    /// The x axis sits on the design-area center (vertical guide).
    pub guide_v: bool,
    /// The y axis sits on the design-area center (horizontal guide).
    pub guide_h: bool,
    /// The element no longer overlaps the design area.
    pub out_of_bounds: bool,
}

/// Position for a drag of an element of `size` that started at `orig`.
///
/// Center snapping wins per axis; grid snapping applies only to axes that
/// did not center-snap.
#[must_use]
pub fn drag_frame(
    orig: Point,
    size: (f64, f64),
    start: Point,
    current: Point,
    area: &Rect,
    config: &EditorConfig,
    grid: bool,
) -> DragFrame {
    let candidate = Rect::new(orig.x + current.x - start.x, orig.y + current.y - start.y, size.0, size.1);
    let snap = center_snap(&candidate, area, config.center_snap_threshold);

    let mut pos = snap.pos;
    if grid {
        if !snap.snapped_x {
            pos.x = snap_to_grid(pos.x, config.grid_size);
        }
        if !snap.snapped_y {
            pos.y = snap_to_grid(pos.y, config.grid_size);
        }
    }

    let placed = Rect::new(pos.x, pos.y, size.0, size.1);
    DragFrame {
        pos,
        guide_v: snap.snapped_x,
        guide_h: snap.snapped_y,
        out_of_bounds: !is_partially_visible(&placed, area),
    }
}

/// Bounding box for a resize by `anchor`.
///
/// The pointer delta is measured in design-area space and turned into the
/// element's own frame, so dragging a rotated element's handle outward grows
/// it along its own axes. The box is then shifted so the opposite handle
/// keeps its on-screen position under the rotation.
#[must_use]
pub fn resize_frame(
    orig: &Rect,
    anchor: ResizeAnchor,
    aspect: f64,
    rotation: f64,
    start: Point,
    current: Point,
    config: &EditorConfig,
) -> Rect {
    let origin = Point::new(0.0, 0.0);
    let delta = Point::new(current.x - start.x, current.y - start.y).rotate_around(origin, -rotation);
    let next = resize_with_aspect(orig, anchor, delta.x, delta.y, aspect, config.min_element_size);

    let fixed = anchor.opposite();
    let pinned = fixed.position(orig).rotate_around(orig.center(), rotation);
    let moved = fixed.position(&next).rotate_around(next.center(), rotation);
    Rect::new(next.x + pinned.x - moved.x, next.y + pinned.y - moved.y, next.width, next.height)
}

/// Rotation in degrees for a rotate gesture around `center`.
#[must_use]
pub fn rotate_frame(center: Point, start_angle: f64, orig_rotation: f64, current: Point, config: &EditorConfig) -> f64 {
    let angle = orig_rotation + (pointer_angle_deg(center, current) - start_angle);
    snap_rotation(angle, config.rotation_snap_deg)
}

/// Final top-left for an element released at `rect`.
#[must_use]
pub fn release_position(rect: &Rect, area: &Rect, config: &EditorConfig) -> Point {
    snap_back_if_outside(rect, area, config.snap_back_inset)
}

/// Top-left for an element nudged by `(dx, dy)` with the keyboard.
///
/// With grid snapping on, a nudge moves at least one grid cell so that small
/// steps are not swallowed by the snap.
#[must_use]
pub fn nudge_position(rect: &Rect, dx: f64, dy: f64, area: &Rect, config: &EditorConfig, grid: bool) -> Point {
    let step = |pos: f64, d: f64| {
        if !grid || d == 0.0 {
            return pos + d;
        }
        snap_to_grid(pos + d.signum() * d.abs().max(config.grid_size), config.grid_size)
    };
    let moved = Rect::new(step(rect.x, dx), step(rect.y, dy), rect.width, rect.height);
    release_position(&moved, area, config)
}
