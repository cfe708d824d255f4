//! Async drivers that connect the engine to image loading, cropping, and
//! background removal.
//!
//! DESIGN
//! ======
//! Each driver snapshots what it needs from the engine, releases the borrow,
//! awaits the slow work, then re-borrows to apply the result. No `RefCell`
//! borrow is ever held across an `.await`, so input handlers keep running
//! while a job is in flight. The engine's begin/finish pairs own every guard
//! and the decision of what to do with a late result.

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{info, warn};

use crate::assets::{ImageLoader, probe_dimensions};
use crate::camera::Point;
use crate::crop::{self, CropError};
use crate::doc::{ElementId, ElementKind};
use crate::engine::EngineCore;
use crate::removal::{BackgroundRemover, RemovalError, validate_result};

/// Engine handle shared between input handlers and in-flight jobs.
pub type SharedEngine = Rc<RefCell<EngineCore>>;

/// Natural size of the image behind `content`, or `None` if it cannot be
/// loaded or decoded.
pub async fn probe(loader: &dyn ImageLoader, content: &str) -> Option<(u32, u32)> {
    let bytes = match loader.load(content).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "image load failed; using fallback size");
            return None;
        }
    };
    match probe_dimensions(&bytes) {
        Ok(size) => Some(size),
        Err(e) => {
            warn!(error = %e, "image probe failed; using fallback size");
            None
        }
    }
}

/// Probe an image and add it to the active side.
pub async fn add_image(
    engine: &SharedEngine,
    loader: &dyn ImageLoader,
    content: String,
    drop: Option<Point>,
) -> ElementId {
    let natural = probe(loader, &content).await;
    engine.borrow_mut().add_element(ElementKind::Image, content, drop, natural)
}

/// Probe the session's starting image and seed the active side with it.
pub async fn load_default_image(engine: &SharedEngine, loader: &dyn ImageLoader, content: String) -> ElementId {
    let natural = probe(loader, &content).await;
    engine.borrow_mut().load_default_image(content, natural)
}

/// Probe a replacement image and swap it into an existing element.
pub async fn replace_image(engine: &SharedEngine, loader: &dyn ImageLoader, id: ElementId, content: String) -> bool {
    let natural = probe(loader, &content).await;
    engine.borrow_mut().replace_image(&id, content, natural)
}

/// Rasterize the active crop and hand the result back to the engine.
pub async fn apply_crop(engine: &SharedEngine, loader: &dyn ImageLoader) -> bool {
    let Some(job) = engine.borrow_mut().begin_apply_crop() else {
        return false;
    };

    let result = match loader.load(&job.content).await {
        Ok(bytes) => crop::rasterize(&bytes, job.displayed, &job.crop, job.flip_h, job.flip_v),
        Err(e) => Err(CropError::Load(e.to_string())),
    };
    engine.borrow_mut().finish_apply_crop(&job, result)
}

/// Run background removal on the selected image.
///
/// Returns `false` when the engine refused to start or the removal failed.
pub async fn remove_background(
    engine: &SharedEngine,
    loader: &dyn ImageLoader,
    remover: &dyn BackgroundRemover,
) -> bool {
    let Some(job) = engine.borrow_mut().begin_remove_background() else {
        return false;
    };
    info!(id = %job.target.id, "requesting background removal");

    let result = match loader.load(&job.content).await {
        Ok(bytes) => remover.remove_background(&bytes).await.and_then(validate_result),
        Err(e) => Err(RemovalError::Source(e)),
    };
    engine.borrow_mut().finish_remove_background(&job, result)
}
