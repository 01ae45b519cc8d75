//! View state for the live preview
//!
//! The preview shows the base document at `view_scale = fit_scale × zoom`.
//! Stored geometry never depends on this: pointer deltas are divided by the
//! view scale before they touch a layer.

use glam::Vec2;

use crate::compositor::document::BaseDocument;

/// Minimum zoom level (25%)
pub const MIN_ZOOM: f32 = 0.25;
/// Maximum zoom level (200%)
pub const MAX_ZOOM: f32 = 2.0;
/// Space kept free around the stage, in screen pixels
const STAGE_PADDING: f32 = 16.0;
/// Smallest viewport extent considered when fitting
const MIN_FIT_EXTENT: f32 = 200.0;
/// Stage size shown before a base document exists
pub const EMPTY_STAGE_SIZE: (u32, u32) = (640, 360);

/// Presentation-only scale state
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    /// Scale that fits the base in the viewport (never above 1)
    fit_scale: f32,
    /// User zoom multiplier
    zoom: f32,
    /// Screen position of the model-space origin (stage top-left)
    origin: Vec2,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            fit_scale: 1.0,
            zoom: 1.0,
            origin: Vec2::ZERO,
        }
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit_scale(&self) -> f32 {
        self.fit_scale
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Set zoom level (clamped to the supported range)
    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    /// Effective preview scale
    pub fn view_scale(&self) -> f32 {
        self.fit_scale * self.zoom
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Set where the stage's top-left corner sits on screen
    pub fn set_origin(&mut self, origin: Vec2) {
        if origin.is_finite() {
            self.origin = origin;
        }
    }

    /// Recompute the fit scale for a viewport of the given size.
    ///
    /// Without a base the fit scale is 1.
    pub fn fit_to_viewport(&mut self, viewport: (f32, f32), base: Option<&BaseDocument>) {
        self.fit_scale = match base {
            Some(base) => compute_fit_scale(viewport, base.size()),
            None => 1.0,
        };
    }

    /// Back to fit-to-viewport at 100% zoom
    pub fn reset(&mut self) {
        self.zoom = 1.0;
    }

    /// Convert a screen-space displacement into model space
    pub fn screen_delta_to_model(&self, delta: Vec2) -> Vec2 {
        delta / self.view_scale()
    }

    pub fn screen_to_model(&self, point: Vec2) -> Vec2 {
        (point - self.origin) / self.view_scale()
    }

    pub fn model_to_screen(&self, point: Vec2) -> Vec2 {
        self.origin + point * self.view_scale()
    }

    /// Size of the preview stage in screen pixels
    pub fn stage_size(&self, base: Option<&BaseDocument>) -> (u32, u32) {
        match base {
            Some(base) => {
                let (w, h) = base.size();
                let s = self.view_scale();
                ((w * s).round() as u32, (h * s).round() as u32)
            }
            None => EMPTY_STAGE_SIZE,
        }
    }
}

/// Scale that fits `content` into `viewport` minus padding, capped at 1
pub fn compute_fit_scale(viewport: (f32, f32), content: (f32, f32)) -> f32 {
    let max_w = (viewport.0 - STAGE_PADDING).max(MIN_FIT_EXTENT);
    let max_h = (viewport.1 - STAGE_PADDING).max(MIN_FIT_EXTENT);
    let scale = (max_w / content.0).min(max_h / content.1);
    if scale.is_finite() && scale > 0.0 {
        scale.min(1.0)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_view() {
        let view = ViewState::new();
        assert_eq!(view.zoom(), 1.0);
        assert_eq!(view.view_scale(), 1.0);
    }

    #[test]
    fn test_zoom_clamping() {
        let mut view = ViewState::new();
        view.set_zoom(10.0);
        assert_eq!(view.zoom(), MAX_ZOOM);
        view.set_zoom(0.0);
        assert_eq!(view.zoom(), MIN_ZOOM);
        view.set_zoom(f32::NAN);
        assert_eq!(view.zoom(), MIN_ZOOM);
    }

    #[test]
    fn test_fit_scale_never_upscales() {
        assert_eq!(compute_fit_scale((1000.0, 1000.0), (100.0, 100.0)), 1.0);
        let s = compute_fit_scale((816.0, 616.0), (1600.0, 1200.0));
        assert!((s - 0.5).abs() < 1e-6);
        // Tiny viewports still fit against the 200px floor
        let s = compute_fit_scale((10.0, 10.0), (400.0, 400.0));
        assert!((s - 0.5).abs() < 1e-6);
        assert_eq!(compute_fit_scale((800.0, 600.0), (0.0, 0.0)), 1.0);
    }

    #[test]
    fn test_screen_model_round_trip() {
        let mut view = ViewState::new();
        view.fit_scale = 0.5;
        view.set_zoom(1.5);
        view.set_origin(Vec2::new(30.0, 40.0));
        let p = Vec2::new(123.0, 77.0);
        let back = view.screen_to_model(view.model_to_screen(p));
        assert!((back - p).length() < 1e-4);
        let d = view.screen_delta_to_model(Vec2::new(75.0, -15.0));
        assert!((d - Vec2::new(100.0, -20.0)).length() < 1e-4);
    }
}
