pub mod overlay;
pub mod render;
pub mod view;

pub use overlay::{OverlayMessage, OverlayStyle};
pub use render::render;
pub use view::{Status, ViewState};
