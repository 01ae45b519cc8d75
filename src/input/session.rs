//! Interaction session state

use glam::Vec2;

use crate::compositor::{LayerBounds, LayerId, ResizeHandle};

/// The gesture currently in progress. At most one exists at a time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionSession {
    #[default]
    Idle,
    /// Moving a layer
    Dragging {
        layer: LayerId,
        /// Captured pointer
        pointer_id: u32,
        /// Screen position at grab
        pointer_anchor: Vec2,
        /// Layer top-left at grab (model space)
        origin_at_start: (f32, f32),
    },
    /// Dragging a corner handle
    Resizing {
        layer: LayerId,
        pointer_id: u32,
        handle: ResizeHandle,
        pointer_anchor: Vec2,
        /// Layer box at grab
        start: LayerBounds,
        aspect_locked: bool,
    },
    /// Turning the layer around its center
    Rotating {
        layer: LayerId,
        pointer_id: u32,
        pointer_anchor: Vec2,
        /// Layer center in screen space at grab
        pivot: Vec2,
        /// Pointer angle at grab minus the layer's rotation at grab
        start_angle_offset: f32,
    },
}

impl InteractionSession {
    #[inline]
    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionSession::Idle)
    }

    #[inline]
    pub fn is_dragging(&self) -> bool {
        matches!(self, InteractionSession::Dragging { .. })
    }

    #[inline]
    pub fn is_resizing(&self) -> bool {
        matches!(self, InteractionSession::Resizing { .. })
    }

    #[inline]
    pub fn is_rotating(&self) -> bool {
        matches!(self, InteractionSession::Rotating { .. })
    }

    /// Layer manipulated by this session
    pub fn layer(&self) -> Option<LayerId> {
        match *self {
            InteractionSession::Idle => None,
            InteractionSession::Dragging { layer, .. }
            | InteractionSession::Resizing { layer, .. }
            | InteractionSession::Rotating { layer, .. } => Some(layer),
        }
    }

    /// Pointer captured by this session
    pub fn pointer_id(&self) -> Option<u32> {
        match *self {
            InteractionSession::Idle => None,
            InteractionSession::Dragging { pointer_id, .. }
            | InteractionSession::Resizing { pointer_id, .. }
            | InteractionSession::Rotating { pointer_id, .. } => Some(pointer_id),
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            InteractionSession::Idle => "idle",
            InteractionSession::Dragging { .. } => "drag",
            InteractionSession::Resizing { .. } => "resize",
            InteractionSession::Rotating { .. } => "rotate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_has_no_layer() {
        let s = InteractionSession::default();
        assert!(s.is_idle());
        assert_eq!(s.layer(), None);
        assert_eq!(s.pointer_id(), None);
    }

    #[test]
    fn test_session_accessors() {
        let s = InteractionSession::Rotating {
            layer: LayerId(4),
            pointer_id: 2,
            pointer_anchor: Vec2::ZERO,
            pivot: Vec2::new(10.0, 10.0),
            start_angle_offset: 0.0,
        };
        assert!(s.is_rotating());
        assert!(!s.is_dragging());
        assert_eq!(s.layer(), Some(LayerId(4)));
        assert_eq!(s.pointer_id(), Some(2));
        assert_eq!(s.kind(), "rotate");
    }
}
