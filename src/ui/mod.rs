mod app;
pub mod components;
mod layout;
pub mod theme;

pub use app::App;
pub use layout::{Layout, LayoutAreas, ViewMode};
