//! Hit-testing: which element, handle, or crop region lies under a point.
//!
//! All points are in design-area coordinates. Rotated elements are tested by
//! rotating the point back into the element's unrotated frame, so bodies and
//! resize handles are plain axis-aligned checks. Handle slop is given in
//! screen pixels and divided by zoom, so handles stay the same size on screen.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::Point;
use crate::consts::{HANDLE_RADIUS_PX, ROTATE_HANDLE_OFFSET_PX};
use crate::crop::CropBox;
use crate::doc::{CanvasElement, DocStore, ElementId};
use crate::geometry::Rect;

/// Which part of an element was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    ResizeHandle(ResizeAnchor),
    RotateHandle,
}

/// Anchor position for resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAnchor {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

impl ResizeAnchor {
    pub const ALL: [Self; 8] = [Self::Nw, Self::N, Self::Ne, Self::E, Self::Se, Self::S, Self::Sw, Self::W];

    #[must_use]
    pub fn is_corner(self) -> bool {
        matches!(self, Self::Ne | Self::Se | Self::Sw | Self::Nw)
    }

    /// The handle across the box, which stays put while this one is dragged.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::N => Self::S,
            Self::Ne => Self::Sw,
            Self::E => Self::W,
            Self::Se => Self::Nw,
            Self::S => Self::N,
            Self::Sw => Self::Ne,
            Self::W => Self::E,
            Self::Nw => Self::Se,
        }
    }

    /// Position of this handle on `rect`.
    #[must_use]
    pub fn position(self, rect: &Rect) -> Point {
        let cx = rect.x + rect.width / 2.0;
        let cy = rect.y + rect.height / 2.0;
        match self {
            Self::N => Point::new(cx, rect.y),
            Self::Ne => Point::new(rect.right(), rect.y),
            Self::E => Point::new(rect.right(), cy),
            Self::Se => Point::new(rect.right(), rect.bottom()),
            Self::S => Point::new(cx, rect.bottom()),
            Self::Sw => Point::new(rect.x, rect.bottom()),
            Self::W => Point::new(rect.x, cy),
            Self::Nw => Point::new(rect.x, rect.y),
        }
    }
}

/// Result of a hit test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub element_id: ElementId,
    pub part: HitPart,
}

/// Which part of the crop box was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropHit {
    Handle(ResizeAnchor),
    Body,
}

/// Map a design-area point into `element`'s unrotated frame.
#[must_use]
pub fn to_element_frame(pt: Point, element: &CanvasElement) -> Point {
    pt.rotate_around(element.center(), -element.rotation)
}

/// Map a design-area point into `element`'s local box, where (0, 0) is its
/// top-left corner before rotation.
#[must_use]
pub fn to_element_local(pt: Point, element: &CanvasElement) -> Point {
    let p = to_element_frame(pt, element);
    Point::new(p.x - element.x, p.y - element.y)
}

/// Rotate handle position in design-area coordinates.
///
/// The handle sits a fixed screen distance below the bounding box and
/// rotates with the element.
#[must_use]
pub fn rotate_handle_position(element: &CanvasElement, zoom: f64) -> Point {
    let offset = ROTATE_HANDLE_OFFSET_PX / zoom;
    let center = element.center();
    Point::new(center.x, element.y + element.height + offset).rotate_around(center, element.rotation)
}

fn near(a: Point, b: Point, radius: f64) -> bool {
    (a.x - b.x).abs() <= radius && (a.y - b.y).abs() <= radius
}

/// Test which element (if any) is under `pt`, checking the selected
/// element's handles first. Hidden elements are never hit. Locked elements
/// expose their body but no handles.
#[must_use]
pub fn hit_test(pt: Point, doc: &DocStore, zoom: f64, selected: Option<ElementId>) -> Option<Hit> {
    let radius = HANDLE_RADIUS_PX / zoom;

    if let Some(el) = selected.and_then(|id| doc.get(&id)).filter(|el| !el.hidden && !el.locked) {
        let local = to_element_frame(pt, el);
        let rect = el.rect();
        for anchor in ResizeAnchor::ALL {
            if near(local, anchor.position(&rect), radius) {
                return Some(Hit { element_id: el.id, part: HitPart::ResizeHandle(anchor) });
            }
        }
        if near(pt, rotate_handle_position(el, zoom), radius) {
            return Some(Hit { element_id: el.id, part: HitPart::RotateHandle });
        }
    }

    doc.sorted_elements()
        .into_iter()
        .rev()
        .filter(|el| !el.hidden)
        .find(|el| el.rect().contains(to_element_frame(pt, el)))
        .map(|el| Hit { element_id: el.id, part: HitPart::Body })
}

/// Test a point given in the cropped element's local box against the crop box.
#[must_use]
pub fn hit_test_crop(local: Point, crop: &CropBox, zoom: f64) -> Option<CropHit> {
    let radius = HANDLE_RADIUS_PX / zoom;
    let rect = crop.rect();
    ResizeAnchor::ALL
        .into_iter()
        .find(|anchor| near(local, anchor.position(&rect), radius))
        .map(CropHit::Handle)
        .or_else(|| rect.contains(local).then_some(CropHit::Body))
}
