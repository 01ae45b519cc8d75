//! Compositor module
//!
//! Holds the layer model and renders it over a fixed-resolution base
//! document.
//!
//! # Architecture
//!
//! - `BaseDocument`: The base image; its pixel grid is model space
//! - `Layer`: An overlay image with box, rotation, opacity and blend mode
//! - `LayerStack`: Z-ordered layers plus the active selection
//! - `BlendMode`: The 16 compositing operators and their two name tables
//! - `ViewState`: Fit scale and zoom of the live preview
//! - `Compositor`: Renders base + visible layers at native resolution

pub mod blend;
pub mod document;
pub mod export;
pub mod geometry;
pub mod layer;
pub mod render;
pub mod stack;
pub mod viewport;

pub use blend::BlendMode;
pub use document::{BaseDocument, ImageFormat, SourceImage};
pub use export::ExportPayload;
pub use geometry::{LayerBounds, LayerTransform, ResizeHandle, MIN_LAYER_SIZE};
pub use layer::{Layer, LayerId};
pub use render::{Compositor, CompositorError};
pub use stack::LayerStack;
pub use viewport::ViewState;
