pub mod effect;
pub mod input;
pub mod interaction;
pub mod scheduler;
pub mod session;
pub mod tooltip;
pub mod zoom;

pub use effect::{Effect, StoreMutation};
pub use input::{InputEvent, TouchPoint};
pub use interaction::{Frame, Interaction, Mode};
pub use scheduler::FrameScheduler;
pub use session::{PageParams, Session};
pub use zoom::ZoomPan;
