mod day_list;
mod heatmap;
mod help_popup;
mod model_list;
mod overview_panel;
mod session_detail;
mod session_list;
mod session_modal;
mod status_bar;

pub use day_list::DayList;
pub use heatmap::{Heatmap, HeatmapGeometry};
pub use help_popup::HelpPopup;
pub use model_list::ModelList;
pub use overview_panel::OverviewPanel;
pub use session_detail::SessionDetail;
pub use session_list::SessionList;
pub use session_modal::SessionModal;
pub use status_bar::StatusBar;
