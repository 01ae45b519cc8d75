//! Abstract pointer events
//!
//! Mouse, touch and pen input are adapted outside the crate into this one
//! event type. Positions are screen pixels.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::compositor::{LayerId, ResizeHandle};

/// Phase of a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// What was under the pointer when it went down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointerTarget {
    /// Empty stage or outside it
    #[default]
    None,
    /// A layer's body
    LayerBody { layer: LayerId },
    /// A corner handle of a layer
    ResizeHandle { layer: LayerId, handle: ResizeHandle },
    /// The rotation knob of a layer
    RotateHandle { layer: LayerId },
}

impl PointerTarget {
    pub fn layer(&self) -> Option<LayerId> {
        match *self {
            PointerTarget::None => None,
            PointerTarget::LayerBody { layer }
            | PointerTarget::ResizeHandle { layer, .. }
            | PointerTarget::RotateHandle { layer } => Some(layer),
        }
    }
}

/// A single pointer event in screen space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Identifies the physical pointer (mouse, finger, pen)
    pub pointer_id: u32,
    pub position: Vec2,
    pub phase: PointerPhase,
    /// Only meaningful for `Down`
    pub target: PointerTarget,
}

impl PointerEvent {
    pub fn down(pointer_id: u32, position: Vec2, target: PointerTarget) -> Self {
        Self {
            pointer_id,
            position,
            phase: PointerPhase::Down,
            target,
        }
    }

    pub fn moved(pointer_id: u32, position: Vec2) -> Self {
        Self {
            pointer_id,
            position,
            phase: PointerPhase::Move,
            target: PointerTarget::None,
        }
    }

    pub fn up(pointer_id: u32, position: Vec2) -> Self {
        Self {
            pointer_id,
            position,
            phase: PointerPhase::Up,
            target: PointerTarget::None,
        }
    }

    pub fn cancel(pointer_id: u32) -> Self {
        Self {
            pointer_id,
            position: Vec2::ZERO,
            phase: PointerPhase::Cancel,
            target: PointerTarget::None,
        }
    }
}
