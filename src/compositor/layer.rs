//! Layer types for the compositor
//!
//! A Layer is one overlay image placed over the base document. It owns its
//! decoded source, a model-space box with rotation, an opacity and a blend
//! mode. Layers are drawn back-to-front in stack order.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::compositor::document::SourceImage;
use crate::compositor::geometry::{clamp_extent, LayerBounds, LayerTransform};
use crate::compositor::BlendMode;

/// Stable identifier of a layer for its whole lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(pub u32);

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "layer-{}", self.0)
    }
}

/// A compositing layer placed over the base document.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Unique identifier for this layer
    pub id: LayerId,
    /// Human-readable name for the layer
    pub name: String,
    /// Decoded image drawn by this layer
    pub source: Arc<SourceImage>,
    /// Box and rotation in model space
    pub transform: LayerTransform,
    /// Opacity from 0.0 (transparent) to 1.0 (opaque)
    pub opacity: f32,
    /// Blend mode for compositing with everything below
    pub blend_mode: BlendMode,
    /// Whether the layer is visible
    pub visible: bool,
}

impl Layer {
    /// Create a layer with default appearance: no rotation, fully opaque,
    /// normal blending, visible
    pub fn new(
        id: LayerId,
        name: impl Into<String>,
        source: Arc<SourceImage>,
        bounds: LayerBounds,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            source,
            transform: LayerTransform::new(bounds, 0.0),
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            visible: true,
        }
    }

    pub fn bounds(&self) -> LayerBounds {
        self.transform.bounds
    }

    pub fn rotation(&self) -> f32 {
        self.transform.rotation
    }

    /// Set the layer's top-left position
    pub fn set_position(&mut self, x: f32, y: f32) {
        if x.is_finite() {
            self.transform.bounds.x = x;
        }
        if y.is_finite() {
            self.transform.bounds.y = y;
        }
    }

    /// Move the layer by a model-space offset
    pub fn translate(&mut self, dx: f32, dy: f32) {
        let b = self.transform.bounds;
        self.set_position(b.x + dx, b.y + dy);
    }

    /// Set the layer's size (floored at the minimum layer size)
    pub fn set_size(&mut self, width: f32, height: f32) {
        self.transform.bounds.width = clamp_extent(width);
        self.transform.bounds.height = clamp_extent(height);
    }

    /// Replace the whole box, enforcing the size floor
    pub fn set_bounds(&mut self, bounds: LayerBounds) {
        self.set_position(bounds.x, bounds.y);
        self.set_size(bounds.width, bounds.height);
    }

    /// Set the layer's rotation in degrees
    pub fn set_rotation(&mut self, degrees: f32) {
        if degrees.is_finite() {
            self.transform.rotation = degrees;
        }
    }

    /// Set the layer's opacity (clamped to 0.0-1.0)
    pub fn set_opacity(&mut self, opacity: f32) {
        if opacity.is_finite() {
            self.opacity = opacity.clamp(0.0, 1.0);
        }
    }

    /// Set the layer's blend mode
    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }

    /// Show the layer
    pub fn show(&mut self) {
        self.visible = true;
    }

    /// Hide the layer
    pub fn hide(&mut self) {
        self.visible = false;
    }

    /// Toggle layer visibility
    pub fn toggle_visibility(&mut self) {
        self.visible = !self.visible;
    }
}
