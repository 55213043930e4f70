mod store;

pub use store::{
    AppState, ModalState, PanelFocus, SharedState, SortBy, StatsSnapshot, StatsWindow,
    WindowTotals, SPINNER_FRAMES,
};
