//! Crop subsystem: the crop box, its presets, and rasterization.
//!
//! DESIGN
//! ======
//! The crop box lives in the cropped element's local box, where (0, 0) is
//! the element's unrotated top-left corner and the box never leaves
//! `0..width × 0..height`. Every manipulation here is a pure function from
//! the box at gesture start plus a pointer delta to the new box; the engine
//! owns the session and feeds it pointer events.
//!
//! Rasterization works on source pixels. The box is scaled by
//! `natural / displayed` per axis and cut out of the decoded image without
//! resampling, so the output is `round(w * W0 / Wd) × round(h * H0 / Hd)`.

#[cfg(test)]
#[path = "crop_test.rs"]
mod crop_test;

use serde::Serialize;

use crate::assets::encode_data_uri;
use crate::doc::ElementId;
use crate::error::ErrorCode;
use crate::geometry::Rect;
use crate::hit::ResizeAnchor;

/// Slack for float comparisons against the element bounds.
const EPSILON: f64 = 1e-9;

/// Failure while applying a crop.
#[derive(Debug, thiserror::Error)]
pub enum CropError {
    #[error("crop source could not be loaded: {0}")]
    Load(String),
    #[error("crop source could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
    #[error("crop region is empty")]
    EmptyRegion,
}

impl ErrorCode for CropError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Load(_) => "E_CROP_LOAD",
            Self::Decode(_) => "E_CROP_DECODE",
            Self::EmptyRegion => "E_CROP_EMPTY",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Load(_))
    }
}

/// Region of an element to keep, in element-local units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CropBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropBox {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// The whole element.
    #[must_use]
    pub fn full(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Aspect-ratio presets offered while cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum AspectPreset {
    #[default]
    Free,
    Square,
    R9x16,
    R16x9,
    R10x16,
    R16x10,
    R2x3,
    R3x2,
    R3x4,
    R4x3,
    R4x5,
    R5x4,
}

impl AspectPreset {
    pub const ALL: [Self; 12] = [
        Self::Free,
        Self::Square,
        Self::R9x16,
        Self::R16x9,
        Self::R10x16,
        Self::R16x10,
        Self::R2x3,
        Self::R3x2,
        Self::R3x4,
        Self::R4x3,
        Self::R4x5,
        Self::R5x4,
    ];

    /// Width over height, or `None` for free cropping.
    #[must_use]
    pub fn ratio(self) -> Option<f64> {
        let (w, h) = match self {
            Self::Free => return None,
            Self::Square => (1.0, 1.0),
            Self::R9x16 => (9.0, 16.0),
            Self::R16x9 => (16.0, 9.0),
            Self::R10x16 => (10.0, 16.0),
            Self::R16x10 => (16.0, 10.0),
            Self::R2x3 => (2.0, 3.0),
            Self::R3x2 => (3.0, 2.0),
            Self::R3x4 => (3.0, 4.0),
            Self::R4x3 => (4.0, 3.0),
            Self::R4x5 => (4.0, 5.0),
            Self::R5x4 => (5.0, 4.0),
        };
        Some(w / h)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Square => "1:1",
            Self::R9x16 => "9:16",
            Self::R16x9 => "16:9",
            Self::R10x16 => "10:16",
            Self::R16x10 => "16:10",
            Self::R2x3 => "2:3",
            Self::R3x2 => "3:2",
            Self::R3x4 => "3:4",
            Self::R4x3 => "4:3",
            Self::R4x5 => "4:5",
            Self::R5x4 => "5:4",
        }
    }

    /// Look a preset up by its label (`"16:9"`, `"Free"`).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.label().eq_ignore_ascii_case(label.trim()))
    }
}

/// An active crop of one image element.
#[derive(Debug, Clone, PartialEq)]
pub struct CropSession {
    pub element_id: ElementId,
    pub crop: CropBox,
    pub preset: AspectPreset,
    /// Set when the last apply failed; cleared by the next edit or apply.
    pub error: Option<String>,
    /// An apply is in flight.
    pub applying: bool,
}

impl CropSession {
    /// Start cropping an element of the given displayed size.
    #[must_use]
    pub fn new(element_id: ElementId, width: f64, height: f64) -> Self {
        Self {
            element_id,
            crop: CropBox::full(width, height),
            preset: AspectPreset::Free,
            error: None,
            applying: false,
        }
    }
}

/// Move the whole box by a delta, kept inside the element.
#[must_use]
pub fn move_box(orig: &CropBox, dx: f64, dy: f64, bounds: (f64, f64)) -> CropBox {
    let (bw, bh) = bounds;
    let x = (orig.x + dx).min(bw - orig.width).max(0.0);
    let y = (orig.y + dy).min(bh - orig.height).max(0.0);
    CropBox::new(x, y, orig.width, orig.height)
}

/// Drag one crop handle by a delta.
///
/// Without a ratio the dragged edges move freely, clamped to the element
/// and to `min`. With a ratio the opposite corner (or edge midpoint) stays
/// put and the box keeps that ratio while fitting inside the element.
#[must_use]
pub fn resize_box(
    orig: &CropBox,
    handle: ResizeAnchor,
    dx: f64,
    dy: f64,
    bounds: (f64, f64),
    ratio: Option<f64>,
    min: f64,
) -> CropBox {
    let free = resize_free(orig, handle, dx, dy, bounds, min);
    match ratio {
        Some(r) if r.is_finite() && r > 0.0 => lock_ratio(orig, &free, handle, bounds, r, min),
        _ => free,
    }
}

fn resize_free(orig: &CropBox, handle: ResizeAnchor, dx: f64, dy: f64, bounds: (f64, f64), min: f64) -> CropBox {
    let (bw, bh) = bounds;
    let mut out = *orig;

    let west = || (orig.x + dx).min(orig.right() - min).max(0.0);
    let north = || (orig.y + dy).min(orig.bottom() - min).max(0.0);
    let east = || (orig.width + dx).min(bw - orig.x).max(min);
    let south = || (orig.height + dy).min(bh - orig.y).max(min);

    if matches!(handle, ResizeAnchor::Nw | ResizeAnchor::W | ResizeAnchor::Sw) {
        out.x = west();
        out.width = orig.right() - out.x;
    }
    if matches!(handle, ResizeAnchor::Ne | ResizeAnchor::E | ResizeAnchor::Se) {
        out.width = east();
    }
    if matches!(handle, ResizeAnchor::Nw | ResizeAnchor::N | ResizeAnchor::Ne) {
        out.y = north();
        out.height = orig.bottom() - out.y;
    }
    if matches!(handle, ResizeAnchor::Sw | ResizeAnchor::S | ResizeAnchor::Se) {
        out.height = south();
    }
    out
}

fn lock_ratio(orig: &CropBox, free: &CropBox, handle: ResizeAnchor, bounds: (f64, f64), ratio: f64, min: f64) -> CropBox {
    let (bw, bh) = bounds;
    let west = matches!(handle, ResizeAnchor::Nw | ResizeAnchor::W | ResizeAnchor::Sw);
    let east = matches!(handle, ResizeAnchor::Ne | ResizeAnchor::E | ResizeAnchor::Se);
    let north = matches!(handle, ResizeAnchor::Nw | ResizeAnchor::N | ResizeAnchor::Ne);
    let south = matches!(handle, ResizeAnchor::Sw | ResizeAnchor::S | ResizeAnchor::Se);

    let anchor_x = if west {
        orig.right()
    } else if east {
        orig.x
    } else {
        orig.x + orig.width / 2.0
    };
    let anchor_y = if north {
        orig.bottom()
    } else if south {
        orig.y
    } else {
        orig.y + orig.height / 2.0
    };

    let drive_width = if handle.is_corner() {
        (free.width - orig.width).abs() / orig.width >= (free.height - orig.height).abs() / orig.height
    } else {
        matches!(handle, ResizeAnchor::E | ResizeAnchor::W)
    };
    let (mut w, mut h) = if drive_width { (free.width, free.width / ratio) } else { (free.height * ratio, free.height) };

    let avail_w = if west {
        anchor_x
    } else if east {
        bw - anchor_x
    } else {
        2.0 * anchor_x.min(bw - anchor_x)
    };
    let avail_h = if north {
        anchor_y
    } else if south {
        bh - anchor_y
    } else {
        2.0 * anchor_y.min(bh - anchor_y)
    };

    if w > avail_w {
        w = avail_w;
        h = w / ratio;
    }
    if h > avail_h {
        h = avail_h;
        w = h * ratio;
    }
    if w < min {
        w = min;
        h = w / ratio;
    }
    if h < min {
        h = min;
        w = h * ratio;
    }
    w = w.min(bw);
    h = h.min(bh);

    let x = if west {
        anchor_x - w
    } else if east {
        anchor_x
    } else {
        anchor_x - w / 2.0
    };
    let y = if north {
        anchor_y - h
    } else if south {
        anchor_y
    } else {
        anchor_y - h / 2.0
    };

    CropBox::new(x.min(bw - w).max(0.0), y.min(bh - h).max(0.0), w, h)
}

/// Reshape the box to `ratio` around its current center, shrinking the
/// longer side and fitting the result inside the element. A box that ends
/// up under `min` on either side grows to the floor. Returns `None` when no
/// box of that ratio fits the element.
#[must_use]
pub fn apply_ratio(orig: &CropBox, ratio: f64, bounds: (f64, f64), min: f64) -> Option<CropBox> {
    if !ratio.is_finite() || ratio <= 0.0 {
        return None;
    }
    let (bw, bh) = bounds;
    let cx = orig.x + orig.width / 2.0;
    let cy = orig.y + orig.height / 2.0;

    let w = if orig.width / orig.height > ratio { orig.height * ratio } else { orig.width };
    let w = w.min(bw).min(bh * ratio).max(ratio_floor(ratio, min));
    let h = w / ratio;
    if w > bw + EPSILON || h > bh + EPSILON {
        return None;
    }

    let x = (cx - w / 2.0).min(bw - w).max(0.0);
    let y = (cy - h / 2.0).min(bh - h).max(0.0);
    Some(CropBox::new(x, y, w, h))
}

/// Smallest width at `ratio` that keeps both sides at or above `min`.
fn ratio_floor(ratio: f64, min: f64) -> f64 {
    min.max(min * ratio)
}

/// Size a ratio-locked box from a requested width, anchored at its
/// top-left. The width is capped by the room to the right and below, raised
/// to the floor, and the origin pulled back if the floor needs more room.
fn fit_ratio(orig: &CropBox, width: f64, ratio: f64, bounds: (f64, f64), min: f64) -> Option<CropBox> {
    if !ratio.is_finite() || ratio <= 0.0 {
        return None;
    }
    let (bw, bh) = bounds;
    let room = (bw - orig.x).min((bh - orig.y) * ratio);
    let w = width.min(room).max(ratio_floor(ratio, min));
    let h = w / ratio;
    if w > bw + EPSILON || h > bh + EPSILON {
        return None;
    }
    Some(CropBox::new(orig.x.min(bw - w).max(0.0), orig.y.min(bh - h).max(0.0), w, h))
}

/// Numeric width entry. Returns `None` for malformed or too-small input,
/// or when the preset ratio cannot fit.
#[must_use]
pub fn set_width(orig: &CropBox, width: f64, bounds: (f64, f64), ratio: Option<f64>, min: f64) -> Option<CropBox> {
    if !width.is_finite() || width < min {
        return None;
    }
    match ratio {
        Some(r) => fit_ratio(orig, width, r, bounds, min),
        None => Some(CropBox::new(orig.x, orig.y, width.min(bounds.0 - orig.x), orig.height)),
    }
}

/// Numeric height entry. Returns `None` for malformed or too-small input,
/// or when the preset ratio cannot fit.
#[must_use]
pub fn set_height(orig: &CropBox, height: f64, bounds: (f64, f64), ratio: Option<f64>, min: f64) -> Option<CropBox> {
    if !height.is_finite() || height < min {
        return None;
    }
    match ratio {
        Some(r) => fit_ratio(orig, height * r, r, bounds, min),
        None => Some(CropBox::new(orig.x, orig.y, orig.width, height.min(bounds.1 - orig.y))),
    }
}

/// A rasterized crop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropOutput {
    /// `data:image/png;base64,...`
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn source_span(start: f64, len: f64, scale: f64, total: u32, mirrored: bool) -> (u32, u32) {
    let total_f = f64::from(total);
    let size = (len * scale).round().clamp(1.0, total_f);
    let origin = if mirrored { total_f - (start + len) * scale } else { start * scale };
    let origin = origin.round().clamp(0.0, total_f - size);
    (origin as u32, size as u32)
}

/// Cut `crop` out of the encoded image `source`, displayed at
/// `displayed = (width, height)`. Flipped elements are cropped from the
/// mirrored side of the source so the kept region matches what is on screen.
pub fn rasterize(
    source: &[u8],
    displayed: (f64, f64),
    crop: &CropBox,
    flip_h: bool,
    flip_v: bool,
) -> Result<CropOutput, CropError> {
    let (dw, dh) = displayed;
    if crop.width <= 0.0 || crop.height <= 0.0 || dw <= 0.0 || dh <= 0.0 {
        return Err(CropError::EmptyRegion);
    }

    let img = image::load_from_memory(source)?;
    let (w0, h0) = (img.width(), img.height());
    if w0 == 0 || h0 == 0 {
        return Err(CropError::EmptyRegion);
    }

    let (sx, sw) = source_span(crop.x, crop.width, f64::from(w0) / dw, w0, flip_h);
    let (sy, sh) = source_span(crop.y, crop.height, f64::from(h0) / dh, h0, flip_v);

    let cropped = img.crop_imm(sx, sy, sw, sh);
    let mut bytes: Vec<u8> = Vec::new();
    cropped.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)?;

    Ok(CropOutput { data_uri: encode_data_uri(&bytes, "image/png"), width: sw, height: sh })
}
