//! Rendering: draws the product template, design area, and elements to a 2D context.
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`].
//! It reads engine state and produces pixels. It never mutates the engine.
//!
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.
//! The top-level caller ([`crate::engine::Engine::render`]) handles the result.

use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use crate::camera::Camera;
use crate::consts::{HANDLE_RADIUS_PX, ROTATE_HANDLE_OFFSET_PX};
use crate::crop::CropBox;
use crate::doc::{CanvasElement, ElementKind};
use crate::engine::{EngineCore, ImageCache};
use crate::geometry::Rect;
use crate::hit::ResizeAnchor;

/// Selection dash segment length in screen pixels.
const SELECTION_DASH_PX: f64 = 4.0;

const SELECTION_COLOR: &str = "#1E90FF";
const OUT_OF_BOUNDS_COLOR: &str = "#E53935";
const GUIDE_COLOR: &str = "#FF4081";
const GRID_COLOR: &str = "rgba(0, 0, 0, 0.08)";

/// Draw the full scene.
///
/// `viewport_w` and `viewport_h` are in CSS pixels. `dpr` is the device pixel ratio.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails (e.g. invalid context state).
pub fn draw(
    ctx: &CanvasRenderingContext2d,
    core: &EngineCore,
    images: &ImageCache,
    viewport_w: f64,
    viewport_h: f64,
    dpr: f64,
) -> Result<(), JsValue> {
    let camera = &core.camera;
    let area = core.design_area();
    let zoom = camera.zoom;

    // Layer 1: clear and set up transforms.
    ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0)?;
    ctx.clear_rect(0.0, 0.0, viewport_w, viewport_h);
    ctx.translate(camera.pan_x, camera.pan_y)?;
    ctx.scale(zoom, zoom)?;

    // Layer 2: product template, tinted with the chosen color.
    if let Some(template) = images.get(&area.background).filter(|img| img.complete()) {
        let w = f64::from(template.natural_width());
        let h = f64::from(template.natural_height());
        if let Some(color) = core.color().and_then(|id| area.color(id)) {
            ctx.set_fill_style_str(&color.hex);
            ctx.fill_rect(0.0, 0.0, w, h);
        }
        ctx.draw_image_with_html_image_element_and_dw_and_dh(template, 0.0, 0.0, w, h)?;
    }

    // Everything below is in design-area space.
    ctx.translate(area.x, area.y)?;
    let bounds = area.local_rect();

    if core.snap_to_grid() {
        draw_grid(ctx, &bounds, core.config.grid_size, zoom);
    }
    draw_area_border(ctx, core, &bounds, zoom)?;

    // Layer 3: elements in paint order.
    let removing = core.removing_id();
    for el in core.elements() {
        if el.hidden {
            continue;
        }
        draw_element(ctx, el, images)?;
        if removing == Some(el.id) {
            draw_busy_overlay(ctx, el)?;
        }
    }

    // Layer 4: guides, selection, crop.
    draw_guides(ctx, core, &bounds, zoom);

    if let Some(session) = core.crop_session() {
        if let Some(el) = core.element(&session.element_id) {
            draw_crop_overlay(ctx, el, &session.crop, camera)?;
        }
    } else if let Some(el) = core.selected_element().filter(|el| !el.hidden) {
        draw_selection(ctx, el, camera)?;
    }

    Ok(())
}

// =============================================================
// Design area
// =============================================================

fn draw_area_border(
    ctx: &CanvasRenderingContext2d,
    core: &EngineCore,
    bounds: &Rect,
    zoom: f64,
) -> Result<(), JsValue> {
    let border = &core.design_area().border;
    ctx.save();
    if core.is_out_of_bounds() {
        ctx.set_stroke_style_str(OUT_OF_BOUNDS_COLOR);
        set_dash(ctx, 6.0 / zoom)?;
    } else {
        ctx.set_stroke_style_str(&border.color);
        if border.dashed {
            set_dash(ctx, 6.0 / zoom)?;
        }
    }
    ctx.set_line_width(border.width / zoom);
    rounded_rect_path(ctx, bounds, border.radius)?;
    ctx.stroke();
    ctx.restore();
    Ok(())
}

fn draw_grid(ctx: &CanvasRenderingContext2d, bounds: &Rect, grid: f64, zoom: f64) {
    if grid <= 0.0 {
        return;
    }
    ctx.save();
    ctx.set_stroke_style_str(GRID_COLOR);
    ctx.set_line_width(1.0 / zoom);
    ctx.begin_path();
    let mut x = grid;
    while x < bounds.width {
        ctx.move_to(x, 0.0);
        ctx.line_to(x, bounds.height);
        x += grid;
    }
    let mut y = grid;
    while y < bounds.height {
        ctx.move_to(0.0, y);
        ctx.line_to(bounds.width, y);
        y += grid;
    }
    ctx.stroke();
    ctx.restore();
}

fn draw_guides(ctx: &CanvasRenderingContext2d, core: &EngineCore, bounds: &Rect, zoom: f64) {
    if !core.ui.guide_v && !core.ui.guide_h {
        return;
    }
    let center = bounds.center();
    ctx.save();
    ctx.set_stroke_style_str(GUIDE_COLOR);
    ctx.set_line_width(1.0 / zoom);
    ctx.begin_path();
    if core.ui.guide_v {
        ctx.move_to(center.x, bounds.y);
        ctx.line_to(center.x, bounds.bottom());
    }
    if core.ui.guide_h {
        ctx.move_to(bounds.x, center.y);
        ctx.line_to(bounds.right(), center.y);
    }
    ctx.stroke();
    ctx.restore();
}

// =============================================================
// Elements
// =============================================================

fn draw_element(ctx: &CanvasRenderingContext2d, el: &CanvasElement, images: &ImageCache) -> Result<(), JsValue> {
    let hw = el.width / 2.0;
    let hh = el.height / 2.0;

    ctx.save();
    translate_and_rotate(ctx, el)?;
    ctx.scale(if el.flip_h { -1.0 } else { 1.0 }, if el.flip_v { -1.0 } else { 1.0 })?;

    match el.kind {
        ElementKind::Image => match images.get(&el.content).filter(|img| img.complete()) {
            Some(img) => draw_image(ctx, img, -hw, -hh, el.width, el.height)?,
            None => {
                ctx.set_fill_style_str("rgba(0, 0, 0, 0.06)");
                ctx.fill_rect(-hw, -hh, el.width, el.height);
            }
        },
        ElementKind::Text => {
            let font_size = (el.height * 0.6).clamp(8.0, 200.0);
            ctx.set_fill_style_str("#1F1A17");
            ctx.set_text_align("center");
            ctx.set_text_baseline("middle");
            ctx.set_font(&format!("{font_size}px sans-serif"));
            ctx.fill_text_with_max_width(&el.content, 0.0, 0.0, el.width)?;
        }
    }

    ctx.restore();
    Ok(())
}

fn draw_image(
    ctx: &CanvasRenderingContext2d,
    img: &HtmlImageElement,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
) -> Result<(), JsValue> {
    ctx.draw_image_with_html_image_element_and_dw_and_dh(img, x, y, w, h)
}

fn draw_busy_overlay(ctx: &CanvasRenderingContext2d, el: &CanvasElement) -> Result<(), JsValue> {
    ctx.save();
    translate_and_rotate(ctx, el)?;
    ctx.set_fill_style_str("rgba(255, 255, 255, 0.6)");
    ctx.fill_rect(-el.width / 2.0, -el.height / 2.0, el.width, el.height);
    ctx.restore();
    Ok(())
}

// =============================================================
// Selection
// =============================================================

fn draw_selection(ctx: &CanvasRenderingContext2d, el: &CanvasElement, camera: &Camera) -> Result<(), JsValue> {
    let hw = el.width / 2.0;
    let hh = el.height / 2.0;
    let px = |d: f64| camera.screen_dist_to_local(d);

    ctx.save();
    translate_and_rotate(ctx, el)?;

    ctx.set_stroke_style_str(SELECTION_COLOR);
    ctx.set_line_width(px(1.0));
    set_dash(ctx, px(SELECTION_DASH_PX))?;
    ctx.stroke_rect(-hw, -hh, el.width, el.height);
    ctx.set_line_dash(&js_sys::Array::new())?;

    if el.locked {
        ctx.restore();
        return Ok(());
    }

    // Handles are drawn in the element's rotated frame, centered on the origin.
    let frame = Rect::new(-hw, -hh, el.width, el.height);
    let size = px(HANDLE_RADIUS_PX);
    ctx.set_fill_style_str("#fff");
    for anchor in ResizeAnchor::ALL {
        let pos = anchor.position(&frame);
        ctx.fill_rect(pos.x - size, pos.y - size, size * 2.0, size * 2.0);
        ctx.stroke_rect(pos.x - size, pos.y - size, size * 2.0, size * 2.0);
    }

    // Rotate handle below the bottom edge, joined to the S handle.
    let rh_y = hh + px(ROTATE_HANDLE_OFFSET_PX);
    ctx.begin_path();
    ctx.move_to(0.0, hh);
    ctx.line_to(0.0, rh_y);
    ctx.stroke();
    ctx.begin_path();
    ctx.arc(0.0, rh_y, size, 0.0, 2.0 * PI)?;
    ctx.fill();
    ctx.stroke();

    ctx.restore();
    Ok(())
}

// =============================================================
// Crop
// =============================================================

fn draw_crop_overlay(
    ctx: &CanvasRenderingContext2d,
    el: &CanvasElement,
    crop: &CropBox,
    camera: &Camera,
) -> Result<(), JsValue> {
    ctx.save();
    translate_and_rotate(ctx, el)?;
    // Element-local box coordinates from here on.
    ctx.translate(-el.width / 2.0, -el.height / 2.0)?;

    // Dim everything outside the crop box.
    ctx.set_fill_style_str("rgba(0, 0, 0, 0.5)");
    ctx.fill_rect(0.0, 0.0, el.width, crop.y);
    ctx.fill_rect(0.0, crop.bottom(), el.width, el.height - crop.bottom());
    ctx.fill_rect(0.0, crop.y, crop.x, crop.height);
    ctx.fill_rect(crop.right(), crop.y, el.width - crop.right(), crop.height);

    ctx.set_stroke_style_str("#fff");
    ctx.set_line_width(camera.screen_dist_to_local(1.0));
    ctx.stroke_rect(crop.x, crop.y, crop.width, crop.height);

    // Rule-of-thirds lines.
    ctx.set_stroke_style_str("rgba(255, 255, 255, 0.5)");
    ctx.begin_path();
    for i in [1.0, 2.0] {
        let x = crop.x + crop.width * i / 3.0;
        let y = crop.y + crop.height * i / 3.0;
        ctx.move_to(x, crop.y);
        ctx.line_to(x, crop.bottom());
        ctx.move_to(crop.x, y);
        ctx.line_to(crop.right(), y);
    }
    ctx.stroke();

    let size = camera.screen_dist_to_local(HANDLE_RADIUS_PX);
    let rect = crop.rect();
    ctx.set_fill_style_str("#fff");
    for anchor in ResizeAnchor::ALL {
        let pos = anchor.position(&rect);
        ctx.fill_rect(pos.x - size / 2.0, pos.y - size / 2.0, size, size);
    }

    ctx.restore();
    Ok(())
}

// =============================================================
// Helpers
// =============================================================

fn translate_and_rotate(ctx: &CanvasRenderingContext2d, el: &CanvasElement) -> Result<(), JsValue> {
    let c = el.center();
    ctx.translate(c.x, c.y)?;
    ctx.rotate(el.rotation.to_radians())?;
    Ok(())
}

fn rounded_rect_path(ctx: &CanvasRenderingContext2d, r: &Rect, radius: f64) -> Result<(), JsValue> {
    let radius = radius.min(r.width / 2.0).min(r.height / 2.0).max(0.0);
    ctx.begin_path();
    ctx.move_to(r.x + radius, r.y);
    ctx.arc_to(r.right(), r.y, r.right(), r.bottom(), radius)?;
    ctx.arc_to(r.right(), r.bottom(), r.x, r.bottom(), radius)?;
    ctx.arc_to(r.x, r.bottom(), r.x, r.y, radius)?;
    ctx.arc_to(r.x, r.y, r.right(), r.y, radius)?;
    ctx.close_path();
    Ok(())
}

fn set_dash(ctx: &CanvasRenderingContext2d, len: f64) -> Result<(), JsValue> {
    let dash_array = js_sys::Array::new();
    dash_array.push(&len.into());
    dash_array.push(&len.into());
    ctx.set_line_dash(&dash_array)
}
