//! Interaction state machine
//!
//! Turns pointer events into layer edits. Drag and resize deltas are
//! converted from screen to model space by dividing by the view scale;
//! rotation works on screen-space angles directly.

use glam::Vec2;

use super::{InputResult, InteractionSession, PointerEvent, PointerPhase, PointerTarget};
use crate::compositor::geometry::{pointer_angle, resize, rotate};
use crate::compositor::{LayerId, LayerStack, ViewState};

/// Per-event flags the controller needs from the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionOptions {
    /// Gestures only start once a base document exists
    pub has_base: bool,
    /// Lock the aspect ratio of resizes started with these options
    pub aspect_locked: bool,
}

impl Default for InteractionOptions {
    fn default() -> Self {
        Self {
            has_base: true,
            aspect_locked: true,
        }
    }
}

/// Owns the single interaction session
#[derive(Debug, Default)]
pub struct InteractionController {
    session: InteractionSession,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn session(&self) -> &InteractionSession {
        &self.session
    }

    /// Check if a gesture is in progress
    #[inline]
    pub fn is_active(&self) -> bool {
        !self.session.is_idle()
    }

    /// Drop any session without touching layers
    pub fn reset(&mut self) {
        self.session = InteractionSession::Idle;
    }

    /// Feed one pointer event
    pub fn handle(
        &mut self,
        event: &PointerEvent,
        stack: &mut LayerStack,
        view: &ViewState,
        options: InteractionOptions,
    ) -> InputResult {
        match event.phase {
            PointerPhase::Down => self.pointer_down(event, stack, view, options),
            PointerPhase::Move => self.pointer_move(event, stack, view),
            PointerPhase::Up | PointerPhase::Cancel => self.pointer_up(event.phase),
        }
    }

    fn pointer_down(
        &mut self,
        event: &PointerEvent,
        stack: &mut LayerStack,
        view: &ViewState,
        options: InteractionOptions,
    ) -> InputResult {
        // Single-pointer model: the running gesture has to finish first
        if self.is_active() || !options.has_base {
            return InputResult::Unhandled;
        }
        let Some(id) = event.target.layer() else {
            return InputResult::Unhandled;
        };
        let Some(layer) = stack.get(id) else {
            return InputResult::Unhandled;
        };
        let handles_grabbable = stack.active() == Some(id);
        let pointer_id = event.pointer_id;
        let pointer_anchor = event.position;

        let session = match event.target {
            PointerTarget::LayerBody { .. } => {
                let b = layer.bounds();
                InteractionSession::Dragging {
                    layer: id,
                    pointer_id,
                    pointer_anchor,
                    origin_at_start: (b.x, b.y),
                }
            }
            PointerTarget::ResizeHandle { handle, .. } if handles_grabbable => {
                InteractionSession::Resizing {
                    layer: id,
                    pointer_id,
                    handle,
                    pointer_anchor,
                    start: layer.bounds(),
                    aspect_locked: options.aspect_locked,
                }
            }
            PointerTarget::RotateHandle { .. } if handles_grabbable => {
                let (cx, cy) = layer.bounds().center();
                let pivot = view.model_to_screen(Vec2::new(cx, cy));
                let grab = pointer_angle(pointer_anchor.into(), pivot.into());
                InteractionSession::Rotating {
                    layer: id,
                    pointer_id,
                    pointer_anchor,
                    pivot,
                    start_angle_offset: grab - layer.rotation(),
                }
            }
            _ => return InputResult::Unhandled,
        };

        stack.set_active(Some(id));
        tracing::debug!(
            layer = %id,
            kind = session.kind(),
            pointer = pointer_id,
            "Interaction started"
        );
        self.session = session;
        InputResult::Started { layer: id }
    }

    fn pointer_move(
        &mut self,
        event: &PointerEvent,
        stack: &mut LayerStack,
        view: &ViewState,
    ) -> InputResult {
        // Moves from any pointer but the captured one are not ours
        if self.session.pointer_id() != Some(event.pointer_id) {
            return InputResult::Unhandled;
        }
        let position = event.position;

        match self.session {
            InteractionSession::Idle => InputResult::Unhandled,
            InteractionSession::Dragging {
                layer,
                pointer_anchor,
                origin_at_start,
                ..
            } => {
                let delta = view.screen_delta_to_model(position - pointer_anchor);
                let found = stack.update(layer, |l| {
                    l.set_position(origin_at_start.0 + delta.x, origin_at_start.1 + delta.y)
                });
                updated(layer, found)
            }
            InteractionSession::Resizing {
                layer,
                handle,
                pointer_anchor,
                start,
                aspect_locked,
                ..
            } => {
                let delta = view.screen_delta_to_model(position - pointer_anchor);
                let bounds = resize(handle, delta.into(), start, aspect_locked);
                updated(layer, stack.update(layer, |l| l.set_bounds(bounds)))
            }
            InteractionSession::Rotating {
                layer,
                pivot,
                start_angle_offset,
                ..
            } => {
                let rotation = rotate(position.into(), pivot.into(), start_angle_offset);
                updated(layer, stack.update(layer, |l| l.set_rotation(rotation)))
            }
        }
    }

    fn pointer_up(&mut self, phase: PointerPhase) -> InputResult {
        let ended = std::mem::take(&mut self.session);
        match ended.layer() {
            Some(layer) => {
                tracing::debug!(layer = %layer, kind = ended.kind(), ?phase, "Interaction ended");
                InputResult::Ended { layer }
            }
            None => InputResult::Unhandled,
        }
    }
}

/// A removed layer turns the rest of its gesture into no-ops
fn updated(layer: LayerId, found: bool) -> InputResult {
    if found {
        InputResult::Updated { layer }
    } else {
        InputResult::Unhandled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::{LayerBounds, ResizeHandle, SourceImage};
    use image::RgbaImage;
    use std::sync::Arc;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    fn setup() -> (InteractionController, LayerStack, LayerId) {
        let mut stack = LayerStack::new();
        let src = Arc::new(SourceImage::from_pixels("a.png", RgbaImage::new(100, 50)));
        let id = stack.append_new(src, None, None);
        stack.update(id, |l| l.set_bounds(LayerBounds::new(100.0, 100.0, 100.0, 50.0)));
        (InteractionController::new(), stack, id)
    }

    fn view_at(zoom: f32) -> ViewState {
        let mut view = ViewState::new();
        view.set_zoom(zoom);
        view
    }

    fn body(id: LayerId) -> PointerTarget {
        PointerTarget::LayerBody { layer: id }
    }

    #[test]
    fn test_drag_divides_by_view_scale() {
        let (mut ctl, mut stack, id) = setup();
        let view = view_at(0.5);
        let opts = InteractionOptions::default();

        let down = PointerEvent::down(1, Vec2::new(10.0, 10.0), body(id));
        let r = ctl.handle(&down, &mut stack, &view, opts);
        assert_eq!(r, InputResult::Started { layer: id });
        assert!(ctl.session().is_dragging());

        ctl.handle(&PointerEvent::moved(1, Vec2::new(20.0, 5.0)), &mut stack, &view, opts);
        let b = stack.get(id).unwrap().bounds();
        assert!(approx(b.x, 120.0));
        assert!(approx(b.y, 90.0));

        let r = ctl.handle(&PointerEvent::up(1, Vec2::new(20.0, 5.0)), &mut stack, &view, opts);
        assert_eq!(r, InputResult::Ended { layer: id });
        assert!(!ctl.is_active());
    }

    #[test]
    fn test_down_requires_base() {
        let (mut ctl, mut stack, id) = setup();
        let opts = InteractionOptions {
            has_base: false,
            aspect_locked: true,
        };
        let down = PointerEvent::down(1, Vec2::ZERO, body(id));
        let r = ctl.handle(&down, &mut stack, &ViewState::new(), opts);
        assert_eq!(r, InputResult::Unhandled);
        assert!(!ctl.is_active());
    }

    #[test]
    fn test_second_down_ignored_while_active() {
        let (mut ctl, mut stack, id) = setup();
        let src = Arc::new(SourceImage::from_pixels("b.png", RgbaImage::new(10, 10)));
        let other = stack.append_new(src, None, None);
        let view = ViewState::new();
        let opts = InteractionOptions::default();

        ctl.handle(&PointerEvent::down(1, Vec2::ZERO, body(id)), &mut stack, &view, opts);
        assert_eq!(stack.active(), Some(id));
        let down = PointerEvent::down(2, Vec2::ZERO, body(other));
        let r = ctl.handle(&down, &mut stack, &view, opts);
        assert_eq!(r, InputResult::Unhandled);
        assert_eq!(ctl.session().layer(), Some(id));
        assert_eq!(stack.active(), Some(id));
    }

    #[test]
    fn test_moves_from_other_pointer_ignored() {
        let (mut ctl, mut stack, id) = setup();
        let view = ViewState::new();
        let opts = InteractionOptions::default();
        ctl.handle(&PointerEvent::down(1, Vec2::ZERO, body(id)), &mut stack, &view, opts);
        let r = ctl.handle(&PointerEvent::moved(7, Vec2::new(50.0, 50.0)), &mut stack, &view, opts);
        assert_eq!(r, InputResult::Unhandled);
        assert_eq!(stack.get(id).unwrap().bounds().x, 100.0);
    }

    #[test]
    fn test_cancel_keeps_intermediate_geometry() {
        let (mut ctl, mut stack, id) = setup();
        let view = ViewState::new();
        let opts = InteractionOptions::default();
        ctl.handle(&PointerEvent::down(1, Vec2::ZERO, body(id)), &mut stack, &view, opts);
        ctl.handle(&PointerEvent::moved(1, Vec2::new(30.0, 0.0)), &mut stack, &view, opts);
        let r = ctl.handle(&PointerEvent::cancel(1), &mut stack, &view, opts);
        assert_eq!(r, InputResult::Ended { layer: id });
        assert_eq!(stack.get(id).unwrap().bounds().x, 130.0);
        assert!(ctl.session().is_idle());
    }

    #[test]
    fn test_resize_locked_keeps_ratio() {
        let (mut ctl, mut stack, id) = setup();
        let view = view_at(2.0);
        let opts = InteractionOptions::default();
        let target = PointerTarget::ResizeHandle {
            layer: id,
            handle: ResizeHandle::Nw,
        };
        ctl.handle(&PointerEvent::down(1, Vec2::ZERO, target), &mut stack, &view, opts);
        assert!(ctl.session().is_resizing());
        // 40 screen px at 2x is 20 model px
        ctl.handle(&PointerEvent::moved(1, Vec2::new(-40.0, 0.0)), &mut stack, &view, opts);
        let b = stack.get(id).unwrap().bounds();
        assert!(approx(b.width, 120.0));
        assert!(approx(b.height, 60.0));
        // Opposite (se) corner stays put
        assert!(approx(b.x + b.width, 200.0));
        assert!(approx(b.y + b.height, 150.0));
    }

    #[test]
    fn test_handles_only_on_active_layer() {
        let (mut ctl, mut stack, id) = setup();
        stack.set_active(None);
        let target = PointerTarget::RotateHandle { layer: id };
        let r = ctl.handle(
            &PointerEvent::down(1, Vec2::ZERO, target),
            &mut stack,
            &ViewState::new(),
            InteractionOptions::default(),
        );
        assert_eq!(r, InputResult::Unhandled);
        assert!(!ctl.is_active());
    }

    #[test]
    fn test_rotation_is_scale_invariant() {
        let mut results = Vec::new();
        for zoom in [0.25, 1.0, 2.0] {
            let (mut ctl, mut stack, id) = setup();
            stack.update(id, |l| l.set_rotation(10.0));
            let view = view_at(zoom);
            let opts = InteractionOptions::default();
            let (cx, cy) = stack.get(id).unwrap().bounds().center();
            let pivot = view.model_to_screen(Vec2::new(cx, cy));

            let target = PointerTarget::RotateHandle { layer: id };
            let grab = pivot + Vec2::new(0.0, -30.0);
            ctl.handle(&PointerEvent::down(1, grab, target), &mut stack, &view, opts);
            // Grabbing does not change the rotation
            ctl.handle(&PointerEvent::moved(1, grab), &mut stack, &view, opts);
            assert!(approx(stack.get(id).unwrap().rotation(), 10.0));

            // Quarter turn clockwise
            let turned = pivot + Vec2::new(30.0, 0.0);
            ctl.handle(&PointerEvent::moved(1, turned), &mut stack, &view, opts);
            results.push(stack.get(id).unwrap().rotation());
        }
        for r in results {
            assert!(approx(r, 100.0));
        }
    }

    #[test]
    fn test_removed_layer_makes_moves_noop() {
        let (mut ctl, mut stack, id) = setup();
        let view = ViewState::new();
        let opts = InteractionOptions::default();
        ctl.handle(&PointerEvent::down(1, Vec2::ZERO, body(id)), &mut stack, &view, opts);
        stack.remove(id);
        let r = ctl.handle(&PointerEvent::moved(1, Vec2::new(5.0, 5.0)), &mut stack, &view, opts);
        assert_eq!(r, InputResult::Unhandled);
        let r = ctl.handle(&PointerEvent::up(1, Vec2::ZERO), &mut stack, &view, opts);
        assert_eq!(r, InputResult::Ended { layer: id });
    }
}
