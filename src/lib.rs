//! Overlay Studio Library
//!
//! Stack raster images as independently transformable layers over a base
//! image and render a pixel-accurate composite at the base's original
//! resolution and format.

pub mod compositor;
pub mod ingest;
pub mod input;
pub mod settings;
pub mod studio;
pub mod telemetry;

pub use compositor::{
    BaseDocument, BlendMode, Compositor, CompositorError, ExportPayload, ImageFormat, Layer,
    LayerBounds, LayerId, LayerStack, ResizeHandle, SourceImage, ViewState,
};
pub use ingest::{IngestSource, IngestionError};
pub use input::{
    InputResult, InteractionController, InteractionSession, PointerEvent, PointerPhase,
    PointerTarget,
};
pub use settings::{SettingsError, StudioPreferences};
pub use studio::{IngestReport, LayerEdit, NudgeDirection, PreviewFrame, Studio};
