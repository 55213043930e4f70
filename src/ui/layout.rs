use ratatui::layout::{Constraint, Direction, Rect};

/// Rows reserved for the contribution heatmap
const HEATMAP_HEIGHT: u16 = 11;

/// Active view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Day list, sessions of the selected day, session detail
    #[default]
    Days,
    /// Model ranking and per-model detail
    Models,
    /// Heatmap and lifetime overview
    Overview,
}

impl ViewMode {
    /// Cycle to next view mode
    pub fn next(self) -> Self {
        match self {
            ViewMode::Days => ViewMode::Models,
            ViewMode::Models => ViewMode::Overview,
            ViewMode::Overview => ViewMode::Days,
        }
    }

    /// Get display name for the status bar
    pub fn display_name(&self) -> &'static str {
        match self {
            ViewMode::Days => "Days",
            ViewMode::Models => "Models",
            ViewMode::Overview => "Overview",
        }
    }
}

/// Layout configuration for the UI
pub struct Layout {
    /// Width percentage for the left sidebar
    pub sidebar_width_pct: u16,
    /// Current view mode
    pub view_mode: ViewMode,
}

impl Layout {
    pub fn new() -> Self {
        Self {
            sidebar_width_pct: 35,
            view_mode: ViewMode::default(),
        }
    }

    /// Cycle view mode (Days -> Models -> Overview -> Days)
    pub fn cycle_view_mode(&mut self) {
        self.view_mode = self.view_mode.next();
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    /// Calculate the main areas.
    /// Days:     [DayList | SessionList / SessionDetail]
    /// Models:   [ModelList | ModelDetail]
    /// Overview: [Heatmap / OverviewPanel] (full width)
    /// A one-row status bar always sits at the bottom.
    pub fn calculate(&self, area: Rect) -> LayoutAreas {
        let main_and_status = ratatui::layout::Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),    // Main content area
                Constraint::Length(1), // Status bar
            ])
            .split(area);

        let main_area = main_and_status[0];
        let status_bar = main_and_status[1];

        match self.view_mode {
            ViewMode::Days => {
                let horizontal = ratatui::layout::Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([
                        Constraint::Percentage(self.sidebar_width_pct),
                        Constraint::Percentage(100 - self.sidebar_width_pct),
                    ])
                    .split(main_area);

                let right = ratatui::layout::Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                    .split(horizontal[1]);

                LayoutAreas {
                    sidebar: Some(horizontal[0]),
                    heatmap: None,
                    content_top: Some(right[0]),
                    content_bottom: Some(right[1]),
                    status_bar,
                }
            }
            ViewMode::Models => {
                let horizontal = ratatui::layout::Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([
                        Constraint::Percentage(self.sidebar_width_pct),
                        Constraint::Percentage(100 - self.sidebar_width_pct),
                    ])
                    .split(main_area);

                LayoutAreas {
                    sidebar: Some(horizontal[0]),
                    heatmap: None,
                    content_top: Some(horizontal[1]),
                    content_bottom: None,
                    status_bar,
                }
            }
            ViewMode::Overview => {
                let vertical = ratatui::layout::Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Length(HEATMAP_HEIGHT), Constraint::Min(5)])
                    .split(main_area);

                LayoutAreas {
                    sidebar: None,
                    heatmap: Some(vertical[0]),
                    content_top: Some(vertical[1]),
                    content_bottom: None,
                    status_bar,
                }
            }
        }
    }

    /// Calculate areas for a popup (centered)
    pub fn popup_area(&self, area: Rect, width_pct: u16, height_pct: u16) -> Rect {
        let popup_layout = ratatui::layout::Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage((100 - height_pct) / 2),
                Constraint::Percentage(height_pct),
                Constraint::Percentage((100 - height_pct) / 2),
            ])
            .split(area);

        ratatui::layout::Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage((100 - width_pct) / 2),
                Constraint::Percentage(width_pct),
                Constraint::Percentage((100 - width_pct) / 2),
            ])
            .split(popup_layout[1])[1]
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new()
    }
}

/// Calculated layout areas
pub struct LayoutAreas {
    /// Left sidebar (day list or model list)
    pub sidebar: Option<Rect>,
    /// Contribution heatmap strip
    pub heatmap: Option<Rect>,
    /// Primary content area
    pub content_top: Option<Rect>,
    /// Secondary content area (session detail)
    pub content_bottom: Option<Rect>,
    /// One-row status bar
    pub status_bar: Rect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_layout() {
        let layout = Layout::new();
        let area = Rect::new(0, 0, 100, 50);
        let areas = layout.calculate(area);

        assert!(areas.sidebar.is_some());
        assert!(areas.content_top.is_some());
        assert!(areas.content_bottom.is_some());
        assert!(areas.heatmap.is_none());
        assert_eq!(areas.status_bar.height, 1);
    }

    #[test]
    fn test_models_layout() {
        let mut layout = Layout::new();
        layout.view_mode = ViewMode::Models;
        let areas = layout.calculate(Rect::new(0, 0, 100, 50));

        assert!(areas.sidebar.is_some());
        assert!(areas.content_top.is_some());
        assert!(areas.content_bottom.is_none());
    }

    #[test]
    fn test_overview_layout() {
        let mut layout = Layout::new();
        layout.view_mode = ViewMode::Overview;
        let areas = layout.calculate(Rect::new(0, 0, 100, 50));

        assert!(areas.sidebar.is_none());
        let heatmap = areas.heatmap.unwrap();
        assert_eq!(heatmap.height, 11);
        // Overview panel starts right below the heatmap.
        assert_eq!(areas.content_top.unwrap().y, heatmap.y + heatmap.height);
    }

    #[test]
    fn test_view_mode_cycle() {
        let mut layout = Layout::new();
        assert_eq!(layout.view_mode, ViewMode::Days);

        layout.cycle_view_mode();
        assert_eq!(layout.view_mode, ViewMode::Models);

        layout.cycle_view_mode();
        assert_eq!(layout.view_mode, ViewMode::Overview);

        layout.cycle_view_mode();
        assert_eq!(layout.view_mode, ViewMode::Days);
    }

    #[test]
    fn test_popup_area_centered() {
        let layout = Layout::new();
        let area = Rect::new(0, 0, 100, 50);
        let popup = layout.popup_area(area, 60, 40);

        assert!(popup.x > 0);
        assert!(popup.y > 0);
        assert!(popup.x + popup.width < area.width);
        assert!(popup.y + popup.height < area.height);
    }
}
