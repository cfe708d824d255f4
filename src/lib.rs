//! Scene and transform engine for a print-product design canvas.
//!
//! Customers place images and text inside the printable region of a product
//! (a shirt front, a mug wrap) and move, resize, rotate, crop, and layer
//! them. This crate owns that scene: the element model, per-side undo
//! history, gesture math with snapping, the crop workflow, and the async
//! background-removal job. It compiles to WebAssembly for the browser host
//! and runs natively under `cargo test`.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`pipeline`] | Async drivers for image probing, crop apply, and background removal |
//! | [`scene`] | One product side: elements, selection, z counter, history |
//! | [`doc`] | Element types, partial updates, and the element store |
//! | [`history`] | Snapshot undo/redo log |
//! | [`transform`] | Per-frame drag, resize, and rotate math |
//! | [`geometry`] | Rectangles, snapping, and bounds checks |
//! | [`crop`] | Crop box manipulation, aspect presets, and rasterization |
//! | [`assets`] | Data URIs, format sniffing, and image loaders |
//! | [`removal`] | Background-removal service client |
//! | [`catalog`] | Products, design areas, and colors |
//! | [`camera`] | Pan/zoom camera and coordinate conversions |
//! | [`input`] | Input event types and the gesture state machine |
//! | [`hit`] | Hit-testing against elements, handles, and the crop box |
//! | [`render`] | Scene rendering to a 2D canvas context |
//! | [`config`] | Editor tuning and removal-service configuration |
//! | [`error`] | Machine-readable error codes |
//! | [`consts`] | Shared numeric constants (snap thresholds, default sizes, etc.) |

pub mod assets;
pub mod camera;
pub mod catalog;
pub mod config;
pub mod consts;
pub mod crop;
pub mod doc;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod history;
pub mod hit;
pub mod input;
pub mod pipeline;
pub mod removal;
pub mod render;
pub mod scene;
pub mod transform;

#[cfg(test)]
#[path = "fixtures_test.rs"]
pub(crate) mod fixtures;
