//! Input routing module
//!
//! Provides the pointer-driven state machine that moves, resizes and
//! rotates layers.

mod event;
mod hit;
mod result;
mod router;
mod session;

pub use event::{PointerEvent, PointerPhase, PointerTarget};
pub use hit::{hit_test, HANDLE_RADIUS, ROTATE_KNOB_OFFSET};
pub use result::InputResult;
pub use router::{InteractionController, InteractionOptions};
pub use session::InteractionSession;
