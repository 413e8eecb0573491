pub mod handles;
pub mod hit;
pub mod layout;

pub use handles::{RenderHandle, RenderHandles};
pub use hit::{AREA_BORDER_WIDTH, Handle, Hit, Part, hit_test, in_hover_band};
pub use layout::{Anchor, Placement, position_all};
