use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{List, ListItem, ListState},
    Frame,
};

use ocstats_core::format::{format_date, format_number};

use crate::state::{AppState, PanelFocus};
use crate::ui::theme;

/// Days in the active window with per-day tokens and cost
pub struct DayList;

impl DayList {
    pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
        let items: Vec<ListItem> = state
            .day_list
            .iter()
            .map(|day| Self::create_list_item(day, state))
            .collect();

        let title = format!(
            " Days ({}) [{}] ",
            state.day_list.len(),
            state.window.display_name()
        );

        let list = List::new(items)
            .block(theme::panel_block(title, state.focus == PanelFocus::Sidebar))
            .highlight_style(theme::highlight_style())
            .highlight_symbol("▶ ");

        let mut list_state = ListState::default();
        list_state.select(Some(state.selected_day_index));

        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn create_list_item(day: &str, state: &AppState) -> ListItem<'static> {
        let Some(stat) = state.per_day.get(day) else {
            return ListItem::new(Line::from(day.to_string()));
        };

        let spans = vec![
            Span::styled(
                format!("{:<13}", format_date(day)),
                Style::default().fg(theme::TEXT_PRIMARY),
            ),
            Span::styled(
                format!("{:>7} ", format_number(stat.tokens.total())),
                Style::default().fg(theme::SUCCESS),
            ),
            Span::styled(
                format!("${:>7.2} ", stat.cost),
                Style::default().fg(theme::COST),
            ),
            Span::styled(
                format!("+{}", stat.diffs.additions),
                Style::default().fg(theme::DIFF_ADD),
            ),
            Span::styled(
                format!("/-{}", stat.diffs.deletions),
                Style::default().fg(theme::DIFF_REMOVE),
            ),
        ];

        ListItem::new(Line::from(spans))
    }
}
