mod refresher;

pub use refresher::{RefreshMessage, Refresher};
