//! Hit testing for pointer-down events
//!
//! Resolves a screen point to the `PointerTarget` a presentation layer
//! would report: handles of the active layer first, then layer bodies from
//! the top of the stack down.

use glam::Vec2;

use super::PointerTarget;
use crate::compositor::{Layer, LayerStack, ResizeHandle, ViewState};

/// Distance of the rotation knob above the top edge, in screen pixels
pub const ROTATE_KNOB_OFFSET: f32 = 24.0;
/// Grab radius of corner handles and the rotation knob, in screen pixels
pub const HANDLE_RADIUS: f32 = 8.0;

/// Find what lies under `point` (screen space)
pub fn hit_test(stack: &LayerStack, view: &ViewState, point: Vec2) -> PointerTarget {
    if let Some(active) = stack.active_layer().filter(|l| l.visible) {
        if let Some(target) = hit_handles(active, view, point) {
            return target;
        }
    }

    let model = view.screen_to_model(point);
    stack
        .iter()
        .rev()
        .filter(|l| l.visible)
        .find(|l| l.transform.contains(model.x, model.y))
        .map(|l| PointerTarget::LayerBody { layer: l.id })
        .unwrap_or_default()
}

fn hit_handles(layer: &Layer, view: &ViewState, point: Vec2) -> Option<PointerTarget> {
    let b = layer.bounds();
    let scale = view.view_scale();
    let to_screen = |lx: f32, ly: f32| {
        let (x, y) = layer.transform.to_model(lx, ly);
        view.model_to_screen(Vec2::new(x, y))
    };

    // The knob keeps a constant on-screen distance from the top edge
    let knob = to_screen(0.0, -b.height / 2.0 - ROTATE_KNOB_OFFSET / scale);
    if knob.distance(point) <= HANDLE_RADIUS {
        return Some(PointerTarget::RotateHandle { layer: layer.id });
    }

    ResizeHandle::all().iter().find_map(|&handle| {
        let (fx, fy) = handle.local_corner();
        let corner = to_screen(fx * b.width, fy * b.height);
        (corner.distance(point) <= HANDLE_RADIUS).then_some(PointerTarget::ResizeHandle {
            layer: layer.id,
            handle,
        })
    })
}
