//! Editing session
//!
//! `Studio` ties one base document, its layer stack, the preview view state
//! and the interaction controller together. Loading a new base replaces the
//! whole stack; every export path declines quietly while no base exists.

use std::sync::Arc;

use glam::Vec2;
use image::RgbaImage;
use serde::Serialize;

use crate::compositor::export::{self, ExportPayload};
use crate::compositor::{
    BaseDocument, BlendMode, Compositor, CompositorError, LayerId, LayerStack, SourceImage,
    ViewState,
};
use crate::ingest::{self, IngestSource, IngestionError};
use crate::input::{
    self, InputResult, InteractionController, InteractionOptions, PointerEvent, PointerTarget,
};
use crate::settings::StudioPreferences;

/// Nudge distance in model pixels
const NUDGE_STEP: f32 = 1.0;
/// Nudge distance with the large-step modifier
const NUDGE_STEP_LARGE: f32 = 10.0;

/// Direction of a keyboard nudge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NudgeDirection {
    Left,
    Right,
    Up,
    Down,
}

impl NudgeDirection {
    fn unit(self) -> (f32, f32) {
        match self {
            NudgeDirection::Left => (-1.0, 0.0),
            NudgeDirection::Right => (1.0, 0.0),
            NudgeDirection::Up => (0.0, -1.0),
            NudgeDirection::Down => (0.0, 1.0),
        }
    }
}

/// A direct edit of one layer property
#[derive(Debug, Clone, PartialEq)]
pub enum LayerEdit {
    Name(String),
    X(f32),
    Y(f32),
    Width(f32),
    Height(f32),
    Rotation(f32),
    Opacity(f32),
    /// Blend mode by presentation name; unknown names select normal
    BlendMode(String),
    Visible(bool),
}

/// Outcome of applying one ingestion batch
#[derive(Debug, Default)]
pub struct IngestReport {
    /// The batch supplied the base document
    pub base_loaded: bool,
    /// Layers added, in file order
    pub added: Vec<LayerId>,
    /// Files that could not be read or decoded
    pub failed: Vec<IngestionError>,
}

/// One layer as the live preview should draw it (screen space)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewLayer {
    pub id: LayerId,
    pub name: String,
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    /// Degrees, clockwise around the box center
    pub rotation: f32,
    /// `rotation` folded into [-180, 180] for property readouts
    pub display_rotation: f32,
    pub opacity: f32,
    /// Presentation-side blend name
    pub blend_mode: &'static str,
    pub visible: bool,
    pub active: bool,
}

/// Everything the presentation collaborator needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewFrame {
    pub has_base: bool,
    pub stage_width: u32,
    pub stage_height: u32,
    pub view_scale: f32,
    pub zoom: f32,
    pub show_grid: bool,
    /// Bottom to top
    pub layers: Vec<PreviewLayer>,
}

/// A single-document editing session
pub struct Studio {
    base: Option<BaseDocument>,
    layers: LayerStack,
    view: ViewState,
    controller: InteractionController,
    prefs: StudioPreferences,
    viewport: Option<(f32, f32)>,
}

impl Default for Studio {
    fn default() -> Self {
        Self::new()
    }
}

impl Studio {
    pub fn new() -> Self {
        Self::with_preferences(StudioPreferences::default())
    }

    pub fn with_preferences(mut prefs: StudioPreferences) -> Self {
        prefs.clamp();
        let mut view = ViewState::new();
        view.set_zoom(prefs.default_zoom);
        Self {
            base: None,
            layers: LayerStack::new().with_duplicate_offset(prefs.duplicate_offset),
            view,
            controller: InteractionController::new(),
            prefs,
            viewport: None,
        }
    }

    pub fn base(&self) -> Option<&BaseDocument> {
        self.base.as_ref()
    }

    pub fn has_base(&self) -> bool {
        self.base.is_some()
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn preferences(&self) -> &StudioPreferences {
        &self.prefs
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn set_keep_aspect_ratio(&mut self, keep: bool) {
        self.prefs.keep_aspect_ratio = keep;
    }

    pub fn set_show_grid(&mut self, show: bool) {
        self.prefs.show_grid = show;
    }

    /// Tell the session how large the preview area is (screen pixels)
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = Some((width, height));
        self.refit();
    }

    /// Place the stage's top-left corner on screen
    pub fn set_stage_origin(&mut self, origin: Vec2) {
        self.view.set_origin(origin);
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.view.set_zoom(zoom);
    }

    fn refit(&mut self) {
        if let Some(viewport) = self.viewport {
            self.view.fit_to_viewport(viewport, self.base.as_ref());
        }
    }

    /// Replace the base document. Clears every layer, the selection and any
    /// gesture in progress, and resets the zoom. Empty images are refused.
    pub fn load_base(&mut self, source: Arc<SourceImage>) -> bool {
        let Some(base) = BaseDocument::new(source) else {
            tracing::warn!("Refusing empty base image");
            return false;
        };
        tracing::info!(
            file = %base.name(),
            width = base.natural_width(),
            height = base.natural_height(),
            format = base.format().mime(),
            "Loaded base document"
        );
        self.base = Some(base);
        self.layers.clear();
        self.controller.reset();
        self.view.set_zoom(self.prefs.default_zoom);
        self.refit();
        true
    }

    /// Add one decoded image as a layer on top. Each side is clamped to the
    /// base's when one exists.
    pub fn add_layer(&mut self, source: Arc<SourceImage>) -> LayerId {
        let max_size = self.base.as_ref().map(BaseDocument::size);
        let name = source.name.clone();
        self.layers.append_new(source, Some(&name), max_size)
    }

    /// Apply a decoded batch in file order. Without a base, the first
    /// successfully decoded image becomes the base and the rest become
    /// layers; the last layer added ends up selected.
    pub fn apply_ingested(
        &mut self,
        results: Vec<Result<Arc<SourceImage>, IngestionError>>,
    ) -> IngestReport {
        let mut report = IngestReport::default();
        for result in results {
            match result {
                Ok(source) if self.base.is_none() => {
                    report.base_loaded = self.load_base(source);
                }
                Ok(source) => report.added.push(self.add_layer(source)),
                Err(e) => report.failed.push(e),
            }
        }
        report
    }

    /// Decode a batch concurrently and apply it in file order
    pub async fn ingest(&mut self, inputs: Vec<IngestSource>) -> IngestReport {
        let results = ingest::ingest_batch(inputs).await;
        self.apply_ingested(results)
    }

    /// Apply a direct property edit. Returns false for an unknown layer.
    pub fn edit_layer(&mut self, id: LayerId, edit: LayerEdit) -> bool {
        self.layers.update(id, |layer| match edit {
            LayerEdit::Name(name) => layer.name = name,
            LayerEdit::X(x) => layer.set_position(x, layer.bounds().y),
            LayerEdit::Y(y) => layer.set_position(layer.bounds().x, y),
            LayerEdit::Width(w) => layer.set_size(w, layer.bounds().height),
            LayerEdit::Height(h) => layer.set_size(layer.bounds().width, h),
            LayerEdit::Rotation(deg) => layer.set_rotation(deg),
            LayerEdit::Opacity(o) => layer.set_opacity(o),
            LayerEdit::BlendMode(name) => layer.set_blend_mode(BlendMode::from_presentation(&name)),
            LayerEdit::Visible(v) => layer.visible = v,
        })
    }

    pub fn select(&mut self, id: Option<LayerId>) -> bool {
        self.layers.set_active(id)
    }

    pub fn raise(&mut self, id: LayerId) -> bool {
        self.layers.raise(id)
    }

    pub fn lower(&mut self, id: LayerId) -> bool {
        self.layers.lower(id)
    }

    pub fn duplicate(&mut self, id: LayerId) -> Option<LayerId> {
        self.layers.duplicate(id)
    }

    pub fn remove(&mut self, id: LayerId) -> bool {
        self.layers.remove(id).is_some()
    }

    /// Delete the selected layer
    pub fn remove_active(&mut self) -> bool {
        self.layers.remove_active().is_some()
    }

    /// Move the selected layer by 1 px, or 10 px with `large`
    pub fn nudge_active(&mut self, direction: NudgeDirection, large: bool) -> bool {
        let step = if large { NUDGE_STEP_LARGE } else { NUDGE_STEP };
        let (ux, uy) = direction.unit();
        self.layers.nudge_active(ux * step, uy * step)
    }

    /// Feed a pointer event to the interaction state machine
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> InputResult {
        let options = InteractionOptions {
            has_base: self.base.is_some(),
            aspect_locked: self.prefs.keep_aspect_ratio,
        };
        self.controller.handle(event, &mut self.layers, &self.view, options)
    }

    /// What a pointer-down at `point` (screen space) would grab
    pub fn hit_test(&self, point: Vec2) -> PointerTarget {
        input::hit_test(&self.layers, &self.view, point)
    }

    /// Render the composite at the base's natural size
    pub fn render(&self) -> Result<Option<RgbaImage>, CompositorError> {
        match &self.base {
            Some(base) => Compositor::render(base, self.layers.iter()).map(Some),
            None => Ok(None),
        }
    }

    /// Encode the composite in the base's format
    pub fn export_composite(&self) -> Result<Option<ExportPayload>, CompositorError> {
        match &self.base {
            Some(base) => {
                export::export_composite(base, self.layers.iter(), self.prefs.jpeg_quality)
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    /// The base file exactly as ingested
    pub fn export_base_original(&self) -> Option<ExportPayload> {
        self.base
            .as_ref()
            .map(|base| export::export_original(base.source(), base.name()))
    }

    pub fn export_layer_original(&self, id: LayerId) -> Option<ExportPayload> {
        let layer = self.layers.get(id)?;
        Some(export::export_original(&layer.source, export::layer_file_base(layer)))
    }

    pub fn export_layer_crop(&self, id: LayerId) -> Result<Option<ExportPayload>, CompositorError> {
        match self.layers.get(id) {
            Some(layer) => export::export_crop(layer).map(Some),
            None => Ok(None),
        }
    }

    pub fn export_layer_transformed(
        &self,
        id: LayerId,
    ) -> Result<Option<ExportPayload>, CompositorError> {
        match self.layers.get(id) {
            Some(layer) => export::export_transformed(layer).map(Some),
            None => Ok(None),
        }
    }

    /// Snapshot for the live preview
    pub fn preview_frame(&self) -> PreviewFrame {
        let (stage_width, stage_height) = self.view.stage_size(self.base.as_ref());
        let scale = self.view.view_scale();
        let active = self.layers.active();
        let layers = self
            .layers
            .iter()
            .map(|layer| {
                let b = layer.bounds();
                let top_left = self.view.model_to_screen(Vec2::new(b.x, b.y));
                PreviewLayer {
                    id: layer.id,
                    name: layer.name.clone(),
                    left: top_left.x,
                    top: top_left.y,
                    width: b.width * scale,
                    height: b.height * scale,
                    rotation: layer.rotation(),
                    display_rotation: layer.transform.display_rotation(),
                    opacity: layer.opacity,
                    blend_mode: layer.blend_mode.presentation_name(),
                    visible: layer.visible,
                    active: active == Some(layer.id),
                }
            })
            .collect();

        PreviewFrame {
            has_base: self.base.is_some(),
            stage_width,
            stage_height,
            view_scale: scale,
            zoom: self.view.zoom(),
            show_grid: self.prefs.show_grid,
            layers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn source(name: &str, w: u32, h: u32) -> Arc<SourceImage> {
        Arc::new(SourceImage::from_pixels(
            name,
            RgbaImage::from_pixel(w, h, Rgba([90, 90, 90, 255])),
        ))
    }

    fn studio_with_base() -> Studio {
        let mut studio = Studio::new();
        assert!(studio.load_base(source("base.png", 800, 600)));
        studio
    }

    #[test]
    fn test_exports_decline_without_base() {
        let studio = Studio::new();
        assert!(studio.render().unwrap().is_none());
        assert!(studio.export_composite().unwrap().is_none());
        assert!(studio.export_base_original().is_none());
        assert_eq!(studio.preview_frame().stage_width, 640);
    }

    #[test]
    fn test_load_base_clears_stack_and_zoom() {
        let mut studio = studio_with_base();
        let id = studio.add_layer(source("a.png", 10, 10));
        studio.set_zoom(2.0);
        assert_eq!(studio.layers().active(), Some(id));

        studio.load_base(source("other.png", 100, 100));
        assert!(studio.layers().is_empty());
        assert_eq!(studio.layers().active(), None);
        assert_eq!(studio.view().zoom(), 1.0);
    }

    #[test]
    fn test_batch_without_base_promotes_first_success() {
        let mut studio = Studio::new();
        let report = studio.apply_ingested(vec![
            Err(IngestionError::EmptyInput { name: "bad.png".into() }),
            Ok(source("base.png", 200, 100)),
            Ok(source("a.png", 400, 400)),
            Ok(source("b.png", 10, 10)),
        ]);
        assert!(report.base_loaded);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.added.len(), 2);
        assert_eq!(studio.base().unwrap().name(), "base.png");
        assert_eq!(studio.layers().ids(), report.added);
        assert_eq!(studio.layers().active(), Some(report.added[1]));

        // Oversized layers are clamped to the base per axis
        let a = studio.layers().get(report.added[0]).unwrap().bounds();
        assert_eq!((a.width, a.height), (200.0, 100.0));
    }

    #[test]
    fn test_edit_layer_properties() {
        let mut studio = studio_with_base();
        let id = studio.add_layer(source("a.png", 50, 50));
        assert!(studio.edit_layer(id, LayerEdit::Width(1.0)));
        assert!(studio.edit_layer(id, LayerEdit::Opacity(3.0)));
        assert!(studio.edit_layer(id, LayerEdit::BlendMode("color-dodge".into())));
        assert!(studio.edit_layer(id, LayerEdit::Name("Logo".into())));
        let l = studio.layers().get(id).unwrap();
        assert_eq!(l.bounds().width, 5.0);
        assert_eq!(l.opacity, 1.0);
        assert_eq!(l.blend_mode, BlendMode::ColorDodge);
        assert_eq!(l.name, "Logo");

        studio.edit_layer(id, LayerEdit::BlendMode("no-such-mode".into()));
        assert_eq!(studio.layers().get(id).unwrap().blend_mode, BlendMode::Normal);
        assert!(!studio.edit_layer(LayerId(999), LayerEdit::X(1.0)));
    }

    #[test]
    fn test_nudge_steps() {
        let mut studio = studio_with_base();
        let id = studio.add_layer(source("a.png", 50, 50));
        studio.nudge_active(NudgeDirection::Right, false);
        studio.nudge_active(NudgeDirection::Up, true);
        let b = studio.layers().get(id).unwrap().bounds();
        assert_eq!((b.x, b.y), (21.0, 10.0));
        assert!(studio.remove_active());
        assert!(!studio.nudge_active(NudgeDirection::Left, false));
    }

    #[test]
    fn test_pointer_drag_through_studio() {
        let mut studio = studio_with_base();
        studio.set_viewport(416.0, 316.0);
        assert!((studio.view().view_scale() - 0.5).abs() < 1e-6);
        let id = studio.add_layer(source("a.png", 100, 100));

        let start = Vec2::new(30.0, 30.0);
        assert_eq!(studio.hit_test(start), PointerTarget::LayerBody { layer: id });
        let target = PointerTarget::LayerBody { layer: id };
        studio.handle_pointer(&PointerEvent::down(1, start, target));
        studio.handle_pointer(&PointerEvent::moved(1, start + Vec2::new(10.0, 10.0)));
        studio.handle_pointer(&PointerEvent::up(1, start));
        let b = studio.layers().get(id).unwrap().bounds();
        assert_eq!((b.x, b.y), (40.0, 40.0));
    }

    #[test]
    fn test_preview_frame_uses_presentation_names() {
        let mut studio = studio_with_base();
        studio.set_viewport(416.0, 316.0);
        let id = studio.add_layer(source("a.png", 100, 100));
        studio.edit_layer(id, LayerEdit::BlendMode("multiply".into()));
        studio.edit_layer(id, LayerEdit::Rotation(270.0));

        let frame = studio.preview_frame();
        assert_eq!((frame.stage_width, frame.stage_height), (400, 300));
        let l = &frame.layers[0];
        assert_eq!(l.blend_mode, "multiply");
        assert_eq!((l.left, l.top, l.width), (10.0, 10.0, 50.0));
        assert!(l.active);
        assert_eq!(l.rotation, 270.0);
        assert_eq!(l.display_rotation, -90.0);

        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["layers"][0]["blend_mode"], "multiply");
    }

    #[test]
    fn test_layer_exports() {
        let mut studio = studio_with_base();
        let id = studio.add_layer(source("logo.png", 40, 20));
        studio.edit_layer(id, LayerEdit::Rotation(90.0));
        let crop = studio.export_layer_crop(id).unwrap().unwrap();
        assert_eq!(crop.filename, "logo_crop_40x20.png");
        let rot = studio.export_layer_transformed(id).unwrap().unwrap();
        assert_eq!(rot.filename, "logo_rot_90deg_20x40.png");
        let composite = studio.export_composite().unwrap().unwrap();
        assert_eq!(composite.filename, "base_composite.png");
        assert!(studio.export_layer_crop(LayerId(77)).unwrap().is_none());
    }
}
