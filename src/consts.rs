//! Shared numeric constants for the canvas crate.

// ── Geometry ────────────────────────────────────────────────────

/// Smallest width or height any gesture may produce, in design-area units.
pub const MIN_ELEMENT_SIZE: f64 = 20.0;

/// Grid pitch used when snap-to-grid is enabled.
pub const GRID_SIZE: f64 = 10.0;

/// Distance from the design-area center under which an axis snaps to center.
pub const CENTER_SNAP_THRESHOLD: f64 = 8.0;

/// Angular distance in degrees under which rotation snaps to a multiple of 90°.
pub const ROTATION_SNAP_DEG: f64 = 5.0;

/// How far an element is pulled back inside the design area on snap-back.
pub const SNAP_BACK_INSET: f64 = 20.0;

// ── Element defaults ────────────────────────────────────────────

/// Display width assigned to a newly added image.
pub const DEFAULT_IMAGE_WIDTH: f64 = 160.0;

/// Natural size assumed when an image cannot be probed.
pub const FALLBACK_IMAGE_SIZE: (u32, u32) = (200, 200);

/// Width of a newly added text element.
pub const DEFAULT_TEXT_WIDTH: f64 = 200.0;

/// Height of a newly added text element.
pub const DEFAULT_TEXT_HEIGHT: f64 = 50.0;

/// Offset applied to both axes when duplicating an element.
pub const DUPLICATE_OFFSET: f64 = 20.0;

/// Arrow-key nudge distance.
pub const NUDGE_STEP: f64 = 1.0;

/// Arrow-key nudge distance with Shift held.
pub const NUDGE_STEP_LARGE: f64 = 10.0;

/// Resolution an element has when it exactly fills the design area.
pub const BASE_PRINT_DPI: f64 = 300.0;

// ── Hit-testing ─────────────────────────────────────────────────

/// Screen-space hit slop in pixels for handles.
pub const HANDLE_RADIUS_PX: f64 = 8.0;

/// Distance from the bounding box bottom edge to the rotate handle, in screen pixels.
pub const ROTATE_HANDLE_OFFSET_PX: f64 = 24.0;
