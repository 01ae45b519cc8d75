//! Input result type

use serde::Serialize;

use crate::compositor::LayerId;

/// Result of feeding one pointer event to the controller
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InputResult {
    /// A session started on this layer
    Started { layer: LayerId },
    /// The session's layer was updated
    Updated { layer: LayerId },
    /// The session ended
    Ended { layer: LayerId },
    /// The event belongs to no session (pass through)
    Unhandled,
}

impl InputResult {
    /// Whether the event was consumed
    #[inline]
    pub fn is_handled(&self) -> bool {
        !matches!(self, InputResult::Unhandled)
    }

    /// Whether layer geometry or selection may have changed
    #[inline]
    pub fn changed_layer(&self) -> Option<LayerId> {
        match *self {
            InputResult::Started { layer } | InputResult::Updated { layer } => Some(layer),
            _ => None,
        }
    }
}
