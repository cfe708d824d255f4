#![allow(clippy::float_cmp)]

use super::*;

fn make_element(kind: ElementKind, z: i64) -> CanvasElement {
    CanvasElement::new(kind, "content", Rect::new(0.0, 0.0, 100.0, 80.0), z)
}

// =============================================================
// ElementKind serde
// =============================================================

#[test]
fn kind_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&ElementKind::Image).unwrap(), "\"image\"");
    assert_eq!(serde_json::to_string(&ElementKind::Text).unwrap(), "\"text\"");
}

#[test]
fn kind_deserialize_invalid_rejects() {
    assert!(serde_json::from_str::<ElementKind>("\"video\"").is_err());
}

// =============================================================
// CanvasElement
// =============================================================

#[test]
fn new_element_records_aspect_and_defaults() {
    let el = CanvasElement::new(ElementKind::Image, "a.png", Rect::new(5.0, 6.0, 160.0, 120.0), 3);
    assert_eq!(el.x, 5.0);
    assert_eq!(el.y, 6.0);
    assert_eq!(el.z_index, 3);
    assert!((el.aspect_ratio - 160.0 / 120.0).abs() < 1e-12);
    assert!(!el.locked && !el.flip_h && !el.flip_v && !el.hidden);
    assert_eq!(el.rotation, 0.0);
}

#[test]
fn new_elements_get_distinct_ids() {
    let a = make_element(ElementKind::Text, 0);
    let b = make_element(ElementKind::Text, 0);
    assert_ne!(a.id, b.id);
}

#[test]
fn effective_aspect_falls_back_to_current_ratio() {
    let mut el = make_element(ElementKind::Image, 0);
    el.aspect_ratio = 0.0;
    assert_eq!(el.effective_aspect(), 100.0 / 80.0);
}

#[test]
fn element_serde_roundtrip_keeps_flags() {
    let mut el = make_element(ElementKind::Image, 2);
    el.flip_h = true;
    el.locked = true;
    let json = serde_json::to_string(&el).unwrap();
    let back: CanvasElement = serde_json::from_str(&json).unwrap();
    assert_eq!(back, el);
}

// =============================================================
// ElementPatch
// =============================================================

#[test]
fn patch_default_is_empty() {
    let p = ElementPatch::new();
    assert_eq!(p, ElementPatch::default());
    assert!(!p.touches_geometry());
}

#[test]
fn patch_builder_sets_fields() {
    let p = ElementPatch::new().position(1.0, 2.0).size(3.0, 4.0).flip_h(true).content("x");
    assert_eq!(p.x, Some(1.0));
    assert_eq!(p.y, Some(2.0));
    assert_eq!(p.width, Some(3.0));
    assert_eq!(p.height, Some(4.0));
    assert_eq!(p.flip_h, Some(true));
    assert_eq!(p.content.as_deref(), Some("x"));
    assert!(p.touches_geometry());
}

#[test]
fn patch_skips_absent_fields_when_serialized() {
    let json = serde_json::to_string(&ElementPatch::new().rotation(90.0)).unwrap();
    assert_eq!(json, "{\"rotation\":90.0}");
}

// =============================================================
// DocStore
// =============================================================

#[test]
fn store_insert_get_remove() {
    let mut store = DocStore::new();
    let el = make_element(ElementKind::Text, 1);
    let id = el.id;
    store.insert(el);
    assert_eq!(store.len(), 1);
    assert!(store.get(&id).is_some());
    assert!(store.remove(&id).is_some());
    assert!(store.is_empty());
    assert!(store.remove(&id).is_none());
}

#[test]
fn store_insert_same_id_replaces_in_place() {
    let mut store = DocStore::new();
    let a = make_element(ElementKind::Image, 1);
    let b = make_element(ElementKind::Image, 1);
    let mut a2 = a.clone();
    a2.content = "replaced".into();
    store.insert(a.clone());
    store.insert(b.clone());
    store.insert(a2);
    assert_eq!(store.len(), 2);
    let order: Vec<_> = store.iter().map(|e| e.id).collect();
    assert_eq!(order, vec![a.id, b.id]);
    assert_eq!(store.get(&a.id).unwrap().content, "replaced");
}

#[test]
fn apply_patch_missing_returns_false() {
    let mut store = DocStore::new();
    assert!(!store.apply_patch(&Uuid::new_v4(), &ElementPatch::new().x(1.0)));
}

#[test]
fn apply_patch_updates_only_present_fields() {
    let mut store = DocStore::new();
    let el = make_element(ElementKind::Image, 0);
    let id = el.id;
    store.insert(el);
    assert!(store.apply_patch(&id, &ElementPatch::new().x(42.0).hidden(true)));
    let el = store.get(&id).unwrap();
    assert_eq!(el.x, 42.0);
    assert_eq!(el.y, 0.0);
    assert!(el.hidden);
    assert_eq!(el.width, 100.0);
}

#[test]
fn apply_patch_ignores_degenerate_sizes() {
    let mut store = DocStore::new();
    let el = make_element(ElementKind::Image, 0);
    let id = el.id;
    store.insert(el);
    store.apply_patch(&id, &ElementPatch::new().size(0.0, -5.0));
    store.apply_patch(&id, &ElementPatch::new().size(f64::NAN, f64::INFINITY));
    let el = store.get(&id).unwrap();
    assert_eq!(el.width, 100.0);
    assert_eq!(el.height, 80.0);
}

#[test]
fn sorted_elements_by_z_then_insertion() {
    let mut store = DocStore::new();
    let top = make_element(ElementKind::Image, 5);
    let first_tie = make_element(ElementKind::Image, 2);
    let second_tie = make_element(ElementKind::Text, 2);
    store.insert(top.clone());
    store.insert(first_tie.clone());
    store.insert(second_tie.clone());
    let ids: Vec<_> = store.sorted_elements().iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![first_tie.id, second_tie.id, top.id]);
}

#[test]
fn z_index_bounds() {
    let mut store = DocStore::new();
    assert_eq!(store.max_z_index(), None);
    store.insert(make_element(ElementKind::Image, -3));
    store.insert(make_element(ElementKind::Image, 7));
    assert_eq!(store.max_z_index(), Some(7));
}

#[test]
fn snapshot_is_independent_copy() {
    let mut store = DocStore::new();
    let el = make_element(ElementKind::Image, 0);
    let id = el.id;
    store.insert(el);
    let snap = store.snapshot();
    store.apply_patch(&id, &ElementPatch::new().content("changed"));
    assert_eq!(snap[0].content, "content");
}
