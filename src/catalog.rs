//! Product catalog data consumed by the engine.
//!
//! The catalog itself is authored elsewhere and arrives as JSON. The engine
//! only needs the printable region of the active product side, the template
//! art drawn behind it, and the colors a customer may pick.

#[cfg(test)]
#[path = "catalog_test.rs"]
mod catalog_test;

use serde::{Deserialize, Serialize};

use crate::camera::Point;
use crate::geometry::Rect;

/// Which face of the product is being designed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Front,
    Back,
}

/// A color the product is available in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductColor {
    pub id: String,
    pub name: String,
    /// CSS hex color, e.g. `"#1F1A17"`.
    pub hex: String,
}

/// Outline drawn around the printable region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorderStyle {
    pub color: String,
    pub width: f64,
    pub radius: f64,
    pub dashed: bool,
}

impl Default for BorderStyle {
    fn default() -> Self {
        Self { color: "rgba(0, 0, 0, 0.3)".into(), width: 2.0, radius: 4.0, dashed: true }
    }
}

/// Printable region of one product side.
///
/// `x, y` offset the region within the product template image; `width,
/// height` are its printable size. Element coordinates are relative to
/// this region's top-left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignAreaConfig {
    pub id: String,
    pub side: Side,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Product template art drawn behind the design area.
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub border: BorderStyle,
    #[serde(default)]
    pub colors: Vec<ProductColor>,
}

impl DesignAreaConfig {
    /// The printable region in its own (element) coordinate frame.
    #[must_use]
    pub fn local_rect(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    /// Offset of the region inside the template.
    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    #[must_use]
    pub fn color(&self, id: &str) -> Option<&ProductColor> {
        self.colors.iter().find(|c| c.id == id)
    }
}

impl Default for DesignAreaConfig {
    /// A 192×256 chest print centered in a 700×700 template.
    fn default() -> Self {
        Self {
            id: "default-front".into(),
            side: Side::Front,
            x: (700.0 - 192.0) / 2.0,
            y: (700.0 - 256.0) / 2.0,
            width: 192.0,
            height: 256.0,
            background: String::new(),
            border: BorderStyle::default(),
            colors: Vec::new(),
        }
    }
}

/// One product with its per-side design areas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub areas: Vec<DesignAreaConfig>,
}

impl Product {
    #[must_use]
    pub fn area(&self, side: Side) -> Option<&DesignAreaConfig> {
        self.areas.iter().find(|a| a.side == side)
    }
}

/// Every product the editor can design on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub products: Vec<Product>,
}

impl Catalog {
    /// Parse a catalog from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Find a design area by its own id across all products.
    #[must_use]
    pub fn area(&self, id: &str) -> Option<&DesignAreaConfig> {
        self.products.iter().flat_map(|p| p.areas.iter()).find(|a| a.id == id)
    }
}
