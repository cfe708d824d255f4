#![allow(clippy::float_cmp)]

use super::*;
use crate::fixtures::{png_bytes, png_data_uri};

// =============================================================
// Helpers
// =============================================================

fn at(core: &EngineCore, x: f64, y: f64) -> Point {
    let o = core.design_area().origin();
    Point::new(x + o.x, y + o.y)
}

fn down(core: &mut EngineCore, x: f64, y: f64) -> Vec<Action> {
    let p = at(core, x, y);
    core.on_pointer_down(p, Button::Primary, Modifiers::default())
}

fn move_to(core: &mut EngineCore, x: f64, y: f64) -> Vec<Action> {
    let p = at(core, x, y);
    core.on_pointer_move(p, Modifiers::default())
}

fn up(core: &mut EngineCore, x: f64, y: f64) -> Vec<Action> {
    let p = at(core, x, y);
    core.on_pointer_up(p, Button::Primary, Modifiers::default())
}

fn key(core: &mut EngineCore, name: &str, modifiers: Modifiers) -> Vec<Action> {
    core.on_key_down(Key(name.into()), modifiers)
}

fn ctrl() -> Modifiers {
    Modifiers { ctrl: true, ..Modifiers::default() }
}

fn shift() -> Modifiers {
    Modifiers { shift: true, ..Modifiers::default() }
}

/// An 800×600 image added with no drop point: 160×120, centered at (16, 68)
/// in the default 192×256 design area.
fn add_image(core: &mut EngineCore) -> ElementId {
    core.add_element(ElementKind::Image, "a.png", None, Some((800, 600)))
}

fn add_image_at(core: &mut EngineCore, x: f64, y: f64) -> ElementId {
    core.add_element(ElementKind::Image, "a.png", Some(Point::new(x, y)), Some((800, 600)))
}

fn el(core: &EngineCore, id: ElementId) -> CanvasElement {
    core.element(&id).unwrap().clone()
}

fn history_len(core: &EngineCore) -> usize {
    core.scene().history().len()
}

fn is_idle(core: &EngineCore) -> bool {
    matches!(core.input, InputState::Idle)
}

// =============================================================
// Adding elements
// =============================================================

#[test]
fn add_image_sizes_from_natural_dimensions_and_centers() {
    let mut core = EngineCore::new();
    let id = add_image(&mut core);
    let e = el(&core, id);
    assert_eq!((e.width, e.height), (160.0, 120.0));
    assert_eq!((e.x, e.y), (16.0, 68.0));
    assert_eq!(e.rotation, 0.0);
    assert_eq!(core.selection(), Some(id));
    assert!(core.can_undo());
}

#[test]
fn add_image_without_probe_uses_fallback_size() {
    let mut core = EngineCore::new();
    let id = core.add_element(ElementKind::Image, "a.png", None, None);
    let e = el(&core, id);
    assert_eq!((e.width, e.height), (160.0, 160.0));
}

#[test]
fn add_text_uses_default_text_box() {
    let mut core = EngineCore::new();
    let id = core.add_element(ElementKind::Text, "Hello", None, None);
    let e = el(&core, id);
    assert_eq!((e.width, e.height), (200.0, 50.0));
    assert!(!e.is_image());
}

#[test]
fn add_at_drop_point_outside_area_snaps_back() {
    let mut core = EngineCore::new();
    let id = add_image_at(&mut core, 1000.0, 10.0);
    let e = el(&core, id);
    assert_eq!((e.x, e.y), (172.0, 10.0));
}

#[test]
fn each_add_gets_a_higher_z_index() {
    let mut core = EngineCore::new();
    let a = add_image(&mut core);
    let b = add_image(&mut core);
    assert!(el(&core, b).z_index > el(&core, a).z_index);
    assert_eq!(core.selection(), Some(b));
}

#[test]
fn load_default_image_becomes_the_undo_floor() {
    let mut core = EngineCore::new();
    let id = core.load_default_image("default.png", Some((400, 400)));
    assert_eq!(core.elements().len(), 1);
    assert!(!core.can_undo());
    assert_eq!(el(&core, id).width, 160.0);
}

// =============================================================
// Drag
// =============================================================

#[test]
fn drag_moves_and_commits_once() {
    let mut core = EngineCore::new();
    add_image_at(&mut core, 0.0, 0.0);
    let before = history_len(&core);

    down(&mut core, 30.0, 30.0);
    move_to(&mut core, 35.0, 60.0);
    move_to(&mut core, 40.0, 70.0);
    assert_eq!(history_len(&core), before);
    let actions = up(&mut core, 40.0, 70.0);

    assert!(actions.contains(&Action::HistoryCommitted));
    assert_eq!(history_len(&core), before + 1);
    assert!(is_idle(&core));
}

#[test]
fn drag_near_center_snaps_and_shows_vertical_guide() {
    let mut core = EngineCore::new();
    let id = add_image_at(&mut core, 0.0, 0.0);

    down(&mut core, 30.0, 30.0);
    // Candidate x = 15, center 95: within threshold of the area center 96.
    move_to(&mut core, 45.0, 30.0);
    assert_eq!(el(&core, id).x, 16.0);
    assert!(core.view().guide_v);
    assert!(!core.view().guide_h);

    up(&mut core, 45.0, 30.0);
    assert_eq!(el(&core, id).x, 16.0);
    assert!(!core.view().guide_v);
}

#[test]
fn small_drag_off_center_stays_centered_without_commit() {
    let mut core = EngineCore::new();
    let id = add_image(&mut core);
    let before = history_len(&core);

    down(&mut core, 96.0, 128.0);
    move_to(&mut core, 101.0, 128.0);
    assert_eq!(el(&core, id).x, 16.0);
    let actions = up(&mut core, 101.0, 128.0);

    assert!(!actions.contains(&Action::HistoryCommitted));
    assert_eq!(history_len(&core), before);
}

#[test]
fn drag_out_of_area_flags_then_snaps_back_on_release() {
    let mut core = EngineCore::new();
    let id = add_image_at(&mut core, 0.0, 0.0);

    down(&mut core, 30.0, 30.0);
    move_to(&mut core, 530.0, 30.0);
    assert!(core.is_out_of_bounds());
    assert_eq!(el(&core, id).x, 500.0);

    up(&mut core, 530.0, 30.0);
    let e = el(&core, id);
    assert_eq!((e.x, e.y), (172.0, 0.0));
    assert!(e.rect().overlaps(&core.design_area().local_rect()));
    assert!(!core.is_out_of_bounds());
}

#[test]
fn drag_with_grid_lands_on_grid() {
    let mut core = EngineCore::new();
    core.set_snap_to_grid(true);
    let id = add_image_at(&mut core, 0.0, 0.0);

    down(&mut core, 30.0, 30.0);
    move_to(&mut core, 33.0, 44.0);
    up(&mut core, 33.0, 44.0);

    let e = el(&core, id);
    assert_eq!((e.x, e.y), (0.0, 10.0));
}

#[test]
fn pointer_down_on_lower_element_brings_it_to_front_without_commit() {
    let mut core = EngineCore::new();
    let a = add_image_at(&mut core, 0.0, 0.0);
    let b = add_image_at(&mut core, 100.0, 100.0);
    let before = history_len(&core);

    down(&mut core, 10.0, 10.0);
    up(&mut core, 10.0, 10.0);

    assert_eq!(core.selection(), Some(a));
    assert!(el(&core, a).z_index > el(&core, b).z_index);
    assert_eq!(history_len(&core), before);
}

#[test]
fn pointer_down_on_empty_space_clears_selection() {
    let mut core = EngineCore::new();
    add_image_at(&mut core, 0.0, 0.0);
    let actions = down(&mut core, 180.0, 240.0);
    assert_eq!(core.selection(), None);
    assert!(actions.contains(&Action::SelectionChanged(None)));
}

#[test]
fn escape_abandons_drag() {
    let mut core = EngineCore::new();
    let id = add_image_at(&mut core, 0.0, 0.0);
    let before = history_len(&core);

    down(&mut core, 30.0, 30.0);
    move_to(&mut core, 90.0, 90.0);
    key(&mut core, "Escape", Modifiers::default());

    let e = el(&core, id);
    assert_eq!((e.x, e.y), (0.0, 0.0));
    assert!(is_idle(&core));
    assert_eq!(history_len(&core), before);
    assert!(up(&mut core, 90.0, 90.0).is_empty());
}

// =============================================================
// Resize / rotate
// =============================================================

#[test]
fn resize_corner_keeps_aspect_and_commits() {
    let mut core = EngineCore::new();
    let id = add_image(&mut core);
    let handle = ResizeAnchor::Se.position(&el(&core, id).rect());

    down(&mut core, handle.x, handle.y);
    move_to(&mut core, handle.x + 40.0, handle.y + 10.0);
    let actions = up(&mut core, handle.x + 40.0, handle.y + 10.0);

    let e = el(&core, id);
    assert!(e.width > 160.0);
    assert!((e.width / e.height - 160.0 / 120.0).abs() < 1e-9);
    assert!(actions.contains(&Action::HistoryCommitted));
}

#[test]
fn resize_never_goes_below_minimum_size() {
    let mut core = EngineCore::new();
    let id = add_image(&mut core);
    let handle = ResizeAnchor::Se.position(&el(&core, id).rect());

    down(&mut core, handle.x, handle.y);
    move_to(&mut core, -900.0, -900.0);
    up(&mut core, -900.0, -900.0);

    let e = el(&core, id);
    assert!(e.width >= 20.0 - 1e-9);
    assert!(e.height >= 20.0 - 1e-9);
}

#[test]
fn rotate_to_88_degrees_commits_90() {
    let mut core = EngineCore::new();
    let id = add_image(&mut core);
    let e = el(&core, id);
    let handle = hit::rotate_handle_position(&e, 1.0);
    let center = e.center();
    let r = handle.y - center.y;
    let (sin, cos) = 178.0_f64.to_radians().sin_cos();
    let target = Point::new(center.x + r * cos, center.y + r * sin);

    down(&mut core, handle.x, handle.y);
    assert!(matches!(core.input, InputState::RotatingElement { .. }));
    move_to(&mut core, target.x, target.y);
    let actions = up(&mut core, target.x, target.y);

    assert_eq!(el(&core, id).rotation, 90.0);
    assert!(actions.contains(&Action::HistoryCommitted));
    assert!(core.undo());
    assert_eq!(el(&core, id).rotation, 0.0);
}

// =============================================================
// History
// =============================================================

#[test]
fn undo_then_redo_restores_same_scene() {
    let mut core = EngineCore::new();
    add_image(&mut core);
    key(&mut core, "ArrowRight", Modifiers::default());
    let after: Vec<CanvasElement> = core.elements().into_iter().cloned().collect();

    key(&mut core, "z", ctrl());
    key(&mut core, "z", Modifiers { shift: true, ..ctrl() });
    let redone: Vec<CanvasElement> = core.elements().into_iter().cloned().collect();
    assert_eq!(after, redone);
}

#[test]
fn commit_after_undo_prunes_redo_branch() {
    let mut core = EngineCore::new();
    add_image(&mut core);
    add_image(&mut core);
    assert!(core.undo());
    assert!(core.can_redo());
    add_image(&mut core);
    assert!(!core.can_redo());
    assert_eq!(core.elements().len(), 2);
}

#[test]
fn undo_at_floor_is_a_no_op() {
    let mut core = EngineCore::new();
    assert!(!core.undo());
    assert!(key(&mut core, "z", ctrl()).is_empty());
}

#[test]
fn undo_mid_gesture_abandons_gesture_first() {
    let mut core = EngineCore::new();
    add_image_at(&mut core, 0.0, 0.0);
    down(&mut core, 30.0, 30.0);
    move_to(&mut core, 90.0, 90.0);

    key(&mut core, "z", ctrl());
    assert!(is_idle(&core));
    assert!(core.elements().is_empty());
}

#[test]
fn undo_restores_selection_of_the_entry() {
    let mut core = EngineCore::new();
    let a = add_image(&mut core);
    add_image(&mut core);
    core.undo();
    assert_eq!(core.selection(), Some(a));
}

// =============================================================
// Keyboard
// =============================================================

#[test]
fn arrow_keys_nudge_selected_element() {
    let mut core = EngineCore::new();
    let id = add_image(&mut core);
    key(&mut core, "ArrowRight", Modifiers::default());
    key(&mut core, "ArrowDown", shift());
    let e = el(&core, id);
    assert_eq!((e.x, e.y), (17.0, 78.0));
}

#[test]
fn delete_key_removes_selected_element() {
    let mut core = EngineCore::new();
    add_image(&mut core);
    let actions = key(&mut core, "Delete", Modifiers::default());
    assert_eq!(actions, vec![Action::RenderNeeded]);
    assert!(core.elements().is_empty());
    assert_eq!(core.selection(), None);
    assert!(core.undo());
    assert_eq!(core.elements().len(), 1);
}

#[test]
fn escape_clears_selection() {
    let mut core = EngineCore::new();
    add_image(&mut core);
    key(&mut core, "Escape", Modifiers::default());
    assert_eq!(core.selection(), None);
}

#[test]
fn unknown_key_is_ignored() {
    let mut core = EngineCore::new();
    add_image(&mut core);
    assert!(key(&mut core, "q", Modifiers::default()).is_empty());
}

// =============================================================
// Layer ops / toolbar
// =============================================================

#[test]
fn layer_ops_renumber_paint_order() {
    let mut core = EngineCore::new();
    let a = add_image(&mut core);
    let b = add_image(&mut core);
    let c = add_image(&mut core);

    assert!(core.send_to_back(&c));
    let order: Vec<ElementId> = core.elements().iter().map(|e| e.id).collect();
    assert_eq!(order, vec![c, a, b]);
    assert_eq!(el(&core, c).z_index, 1);

    assert!(core.bring_forward(&c));
    let order: Vec<ElementId> = core.elements().iter().map(|e| e.id).collect();
    assert_eq!(order, vec![a, c, b]);

    assert!(!core.send_backward(&a));
    assert!(!core.bring_forward(&b));
}

#[test]
fn duplicate_offsets_and_selects_copy() {
    let mut core = EngineCore::new();
    let id = add_image(&mut core);
    let copy = core.duplicate_element().unwrap();
    assert_ne!(copy, id);
    let c = el(&core, copy);
    assert_eq!((c.x, c.y), (36.0, 88.0));
    assert_eq!(core.selection(), Some(copy));
    assert!(c.z_index > el(&core, id).z_index);
}

#[test]
fn align_and_center_move_within_area() {
    let mut core = EngineCore::new();
    let id = add_image_at(&mut core, 3.0, 7.0);
    assert!(core.align_right());
    assert_eq!(el(&core, id).x, 32.0);
    assert!(core.align_bottom());
    assert_eq!(el(&core, id).y, 136.0);
    assert!(core.center_element());
    assert_eq!((el(&core, id).x, el(&core, id).y), (16.0, 68.0));
    assert!(!core.center_element());
}

#[test]
fn flips_toggle_and_commit() {
    let mut core = EngineCore::new();
    let id = add_image(&mut core);
    assert!(core.flip_horizontal());
    assert!(el(&core, id).flip_h);
    assert!(core.flip_vertical());
    assert!(el(&core, id).flip_v);
    core.undo();
    assert!(!el(&core, id).flip_v);
}

#[test]
fn locked_element_refuses_edits_and_gestures() {
    let mut core = EngineCore::new();
    let id = add_image(&mut core);
    assert!(core.toggle_lock());

    assert!(key(&mut core, "ArrowRight", Modifiers::default()).is_empty());
    assert!(!core.delete_element(&id));
    assert!(!core.flip_horizontal());
    down(&mut core, 96.0, 128.0);
    assert!(is_idle(&core));
    assert_eq!(core.selection(), Some(id));

    assert!(core.toggle_lock());
    assert!(!el(&core, id).locked);
}

#[test]
fn hiding_selected_element_clears_selection_and_hit_testing() {
    let mut core = EngineCore::new();
    let id = add_image(&mut core);
    assert!(core.toggle_visibility(&id));
    assert!(el(&core, id).hidden);
    assert_eq!(core.selection(), None);

    down(&mut core, 96.0, 128.0);
    assert_eq!(core.selection(), None);

    assert!(core.toggle_visibility(&id));
    assert!(!el(&core, id).hidden);
}

#[test]
fn replace_image_keeps_width_and_adopts_new_aspect() {
    let mut core = EngineCore::new();
    let id = add_image(&mut core);
    assert!(core.replace_image(&id, "b.png", Some((100, 200))));
    let e = el(&core, id);
    assert_eq!(e.content, "b.png");
    assert_eq!((e.width, e.height), (160.0, 320.0));
    assert_eq!(e.aspect_ratio, 0.5);
}

// =============================================================
// Attributes
// =============================================================

#[test]
fn width_with_aspect_lock_derives_height() {
    let mut core = EngineCore::new();
    let id = add_image(&mut core);
    assert!(core.set_attribute(Attribute::Width, "80", true));
    assert_eq!((el(&core, id).width, el(&core, id).height), (80.0, 60.0));
}

#[test]
fn height_without_lock_changes_only_height() {
    let mut core = EngineCore::new();
    let id = add_image(&mut core);
    assert!(core.set_attribute(Attribute::Height, "30", false));
    assert_eq!((el(&core, id).width, el(&core, id).height), (160.0, 30.0));
}

#[test]
fn scale_is_percent_of_current_size() {
    let mut core = EngineCore::new();
    let id = add_image(&mut core);
    assert!(core.set_attribute(Attribute::Scale, "50", false));
    assert_eq!((el(&core, id).width, el(&core, id).height), (80.0, 60.0));
}

#[test]
fn rotation_accepts_any_finite_value() {
    let mut core = EngineCore::new();
    let id = add_image(&mut core);
    assert!(core.set_attribute(Attribute::Rotation, "-45", false));
    assert_eq!(el(&core, id).rotation, -45.0);
}

#[test]
fn malformed_or_non_positive_attributes_are_ignored() {
    let mut core = EngineCore::new();
    add_image(&mut core);
    let before = history_len(&core);
    assert!(!core.set_attribute(Attribute::Width, "abc", false));
    assert!(!core.set_attribute(Attribute::Width, "0", false));
    assert!(!core.set_attribute(Attribute::Height, "-3", true));
    assert!(!core.set_attribute(Attribute::Rotation, "NaN", false));
    assert_eq!(history_len(&core), before);
}

#[test]
fn effective_dpi_scales_with_area_fraction() {
    let mut core = EngineCore::new();
    let id = add_image(&mut core);
    core.set_attribute(Attribute::Width, "96", false);
    core.set_attribute(Attribute::Height, "128", false);
    assert_eq!(core.effective_dpi(&id), Some(150.0));
}

// =============================================================
// Background removal
// =============================================================

#[test]
fn removal_success_replaces_content_and_commits() {
    let mut core = EngineCore::new();
    let id = add_image(&mut core);
    let job = core.begin_remove_background().unwrap();
    assert_eq!(job.content, "a.png");
    assert_eq!(core.removing_id(), Some(id));

    assert!(core.finish_remove_background(&job, Ok(png_bytes(4, 4))));
    assert!(el(&core, id).content.starts_with("data:image/png;base64,"));
    assert_eq!(core.removing(), None);
    core.undo();
    assert_eq!(el(&core, id).content, "a.png");
}

#[test]
fn removal_failure_raises_notice_and_keeps_content() {
    let mut core = EngineCore::new();
    let id = add_image(&mut core);
    let job = core.begin_remove_background().unwrap();
    assert!(!core.finish_remove_background(&job, Err(RemovalError::InvalidResult)));
    assert_eq!(el(&core, id).content, "a.png");
    assert_eq!(core.removing(), None);
    assert_eq!(core.notices().len(), 1);
    assert_eq!(core.notices()[0].kind, NoticeKind::BackgroundRemovalFailed);
    assert!(core.dismiss_notice(0));
    assert!(core.notices().is_empty());
}

#[test]
fn only_one_removal_runs_at_a_time() {
    let mut core = EngineCore::new();
    add_image(&mut core);
    let job = core.begin_remove_background().unwrap();
    assert!(core.begin_remove_background().is_none());
    add_image(&mut core);
    assert!(core.begin_remove_background().is_none());
    core.finish_remove_background(&job, Err(RemovalError::InvalidResult));
    assert!(core.begin_remove_background().is_some());
}

#[test]
fn busy_element_refuses_delete_crop_and_gestures() {
    let mut core = EngineCore::new();
    let other = add_image_at(&mut core, 100.0, 200.0);
    let busy = add_image(&mut core);
    core.begin_remove_background().unwrap();

    assert!(!core.delete_element(&busy));
    assert!(!core.start_cropping());
    assert!(!core.replace_image(&busy, "b.png", None));
    down(&mut core, 96.0, 128.0);
    assert!(is_idle(&core));
    assert!(core.element(&busy).is_some());

    assert!(core.delete_element(&other));
}

#[test]
fn removal_refused_on_element_being_cropped() {
    let mut core = EngineCore::new();
    add_image(&mut core);
    assert!(core.start_cropping());
    assert!(core.begin_remove_background().is_none());
    assert_eq!(core.removing(), None);
}

#[test]
fn removal_result_during_gesture_commits_after_it() {
    let mut core = EngineCore::new();
    let target = add_image_at(&mut core, 0.0, 0.0);
    let job = core.begin_remove_background().unwrap();
    let other = add_image_at(&mut core, 0.0, 0.0);

    down(&mut core, 30.0, 30.0);
    move_to(&mut core, 60.0, 130.0);
    assert!(core.finish_remove_background(&job, Ok(png_bytes(4, 4))));
    assert_eq!(el(&core, target).content, "a.png");
    up(&mut core, 60.0, 130.0);

    assert!(el(&core, target).content.starts_with("data:image/png"));
    assert_eq!((el(&core, other).x, el(&core, other).y), (30.0, 100.0));

    // Content commit is the newest entry; the move survives its undo.
    core.undo();
    assert_eq!(el(&core, target).content, "a.png");
    assert_eq!(el(&core, other).x, 30.0);
}

#[test]
fn undo_during_gesture_keeps_queued_removal_result() {
    let mut core = EngineCore::new();
    let target = add_image_at(&mut core, 0.0, 0.0);
    let job = core.begin_remove_background().unwrap();
    let other = add_image_at(&mut core, 0.0, 0.0);

    down(&mut core, 30.0, 30.0);
    move_to(&mut core, 60.0, 130.0);
    assert!(core.finish_remove_background(&job, Ok(png_bytes(4, 4))));
    key(&mut core, "z", ctrl());

    // The undo removes the last add; the queued result still lands.
    assert!(is_idle(&core));
    assert!(core.element(&other).is_none());
    assert!(el(&core, target).content.starts_with("data:image/png"));

    core.undo();
    assert_eq!(el(&core, target).content, "a.png");
    assert!(core.element(&other).is_none());
}

#[test]
fn removal_result_lands_on_its_own_side() {
    let mut core = EngineCore::new();
    let id = add_image(&mut core);
    let job = core.begin_remove_background().unwrap();
    core.switch_side(Side::Back);
    assert!(core.finish_remove_background(&job, Ok(png_bytes(2, 2))));
    assert!(core.elements().is_empty());
    let front = core.scene_on(Side::Front).doc.get(&id).unwrap();
    assert!(front.content.starts_with("data:image/png"));
}

#[test]
fn insert_during_gesture_is_deferred() {
    let mut core = EngineCore::new();
    add_image_at(&mut core, 0.0, 0.0);
    down(&mut core, 30.0, 30.0);
    move_to(&mut core, 40.0, 40.0);

    let late = add_image(&mut core);
    assert!(core.element(&late).is_none());
    up(&mut core, 40.0, 40.0);
    assert!(core.element(&late).is_some());
    assert_eq!(core.selection(), Some(late));
}

// =============================================================
// Crop
// =============================================================

fn crop_ready() -> (EngineCore, ElementId) {
    let mut core = EngineCore::new();
    let id = core.add_element(ElementKind::Image, png_data_uri(100, 50), None, Some((100, 50)));
    assert!(core.start_cropping());
    (core, id)
}

#[test]
fn crop_starts_with_full_box() {
    let (core, id) = crop_ready();
    assert_eq!(core.crop_box(), Some(CropBox::new(0.0, 0.0, 160.0, 80.0)));
    assert_eq!(core.view().crop.unwrap().element_id, id);
}

#[test]
fn crop_preset_recenters_box() {
    let (mut core, _) = crop_ready();
    assert!(core.set_crop_preset(AspectPreset::Square));
    assert_eq!(core.crop_box(), Some(CropBox::new(40.0, 0.0, 80.0, 80.0)));
}

#[test]
fn crop_width_entry_under_preset_holds_floor_and_ratio() {
    let (mut core, _) = crop_ready();
    assert!(core.set_crop_preset(AspectPreset::R16x9));
    assert!(core.set_crop_width(20.0));

    let b = core.crop_box().unwrap();
    assert!(b.height >= 20.0 - 1e-9);
    assert!((b.width / b.height - 16.0 / 9.0).abs() < 1e-9);
}

#[test]
fn crop_preset_that_cannot_fit_is_refused() {
    let mut core = EngineCore::new();
    core.add_element(ElementKind::Image, "a.png", None, Some((20, 200)));
    assert!(core.start_cropping());
    assert!(!core.set_crop_preset(AspectPreset::R16x9));
    assert_eq!(core.crop_session().unwrap().preset, AspectPreset::Free);
}

#[test]
fn crop_box_drag_moves_without_commit() {
    let (mut core, id) = crop_ready();
    core.set_crop_preset(AspectPreset::Square);
    let e = el(&core, id);
    let before = history_len(&core);

    down(&mut core, e.x + 80.0, e.y + 40.0);
    assert!(matches!(core.input, InputState::MovingCrop { .. }));
    move_to(&mut core, e.x + 90.0, e.y + 40.0);
    up(&mut core, e.x + 90.0, e.y + 40.0);

    assert_eq!(core.crop_box().unwrap().x, 50.0);
    assert_eq!(history_len(&core), before);
    assert!(core.is_cropping());
}

#[test]
fn crop_apply_success_updates_element_and_exits() {
    let (mut core, id) = crop_ready();
    core.set_crop_preset(AspectPreset::Square);
    let job = core.begin_apply_crop().unwrap();
    assert!(core.begin_apply_crop().is_none());

    let output = crop::rasterize(&png_bytes(100, 50), job.displayed, &job.crop, job.flip_h, job.flip_v).unwrap();
    assert_eq!((output.width, output.height), (50, 50));
    assert!(core.finish_apply_crop(&job, Ok(output)));

    let e = el(&core, id);
    assert_eq!((e.x, e.y, e.width, e.height), (56.0, 88.0, 80.0, 80.0));
    assert_eq!(e.aspect_ratio, 1.0);
    assert!(e.content.starts_with("data:image/png;base64,"));
    assert!(!core.is_cropping());

    core.undo();
    assert_eq!(el(&core, id).width, 160.0);
}

#[test]
fn crop_apply_failure_stays_in_crop_mode_with_error() {
    let (mut core, id) = crop_ready();
    let job = core.begin_apply_crop().unwrap();
    assert!(!core.finish_apply_crop(&job, Err(CropError::EmptyRegion)));

    let session = core.crop_session().unwrap();
    assert!(session.error.is_some());
    assert!(!session.applying);
    assert_eq!(core.notices()[0].kind, NoticeKind::CropFailed);
    assert_eq!(el(&core, id).width, 160.0);
}

#[test]
fn crop_result_after_cancel_is_dropped() {
    let (mut core, id) = crop_ready();
    let job = core.begin_apply_crop().unwrap();
    key(&mut core, "Escape", Modifiers::default());
    assert!(!core.is_cropping());
    let output = CropOutput { data_uri: png_data_uri(2, 2), width: 2, height: 2 };
    assert!(!core.finish_apply_crop(&job, Ok(output)));
    assert_eq!(el(&core, id).width, 160.0);
}

#[test]
fn deleting_cropped_element_exits_crop_mode() {
    let (mut core, id) = crop_ready();
    assert!(core.delete_element(&id));
    assert!(!core.is_cropping());
}

#[test]
fn crop_width_entry_rejects_too_small() {
    let (mut core, _) = crop_ready();
    assert!(!core.set_crop_width(5.0));
    assert!(core.set_crop_width(100.0));
    assert_eq!(core.crop_box().unwrap().width, 100.0);
    assert!(core.set_crop_height(40.0));
    assert_eq!(core.crop_box().unwrap().height, 40.0);
}

#[test]
fn delete_key_is_ignored_while_cropping() {
    let (mut core, id) = crop_ready();
    key(&mut core, "Delete", Modifiers::default());
    assert!(core.element(&id).is_some());
}

// =============================================================
// Sides / products
// =============================================================

#[test]
fn sides_keep_separate_scenes_and_histories() {
    let mut core = EngineCore::new();
    let front = add_image(&mut core);
    assert!(core.switch_side(Side::Back));
    assert!(core.elements().is_empty());
    assert!(!core.can_undo());

    add_image(&mut core);
    assert!(core.switch_side(Side::Front));
    let ids: Vec<ElementId> = core.elements().iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![front]);
    assert_eq!(core.selection(), None);
    assert!(!core.switch_side(Side::Front));
}

#[test]
fn select_product_installs_both_areas() {
    let catalog = Catalog::from_json(
        r##"{"products": [{"id": "tee", "name": "Tee", "areas": [
            {"id": "tee-front", "side": "front", "x": 10, "y": 20, "width": 300, "height": 400,
             "colors": [{"id": "black", "name": "Black", "hex": "#000000"}]}
        ]}]}"##,
    )
    .unwrap();
    let mut core = EngineCore::new();
    assert!(core.select_product(&catalog, "tee"));
    assert_eq!(core.design_area().width, 300.0);
    assert_eq!(core.color(), Some("black"));

    core.switch_side(Side::Back);
    assert_eq!(core.design_area().side, Side::Back);
    assert_eq!(core.design_area().height, 400.0);

    assert!(!core.select_product(&catalog, "mug"));
    assert!(!core.select_color("red"));
}

#[test]
fn view_serializes_for_the_host() {
    let mut core = EngineCore::new();
    add_image(&mut core);
    let v = serde_json::to_value(core.view()).unwrap();
    assert_eq!(v["side"], "front");
    assert_eq!(v["elements"].as_array().unwrap().len(), 1);
    assert_eq!(v["can_undo"], true);
    assert!(v["crop"].is_null());
}
