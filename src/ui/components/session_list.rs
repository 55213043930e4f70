use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{List, ListItem, ListState},
    Frame,
};

use ocstats_core::format::format_number;
use ocstats_core::SessionStat;

use crate::state::{AppState, PanelFocus};
use crate::ui::theme;

/// Sessions of the selected day
pub struct SessionList;

impl SessionList {
    pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
        let items: Vec<ListItem> = state
            .session_list
            .iter()
            .map(|session| Self::create_list_item(session, state))
            .collect();

        let title = format!(
            " Sessions ({}) sort:{} ",
            state.session_list.len(),
            state.sort_by.display_name()
        );

        let list = List::new(items)
            .block(theme::panel_block(title, state.focus == PanelFocus::Content))
            .highlight_style(theme::highlight_style())
            .highlight_symbol("▶ ");

        let mut list_state = ListState::default();
        list_state.select(Some(state.selected_session_index));

        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn create_list_item(session: &SessionStat, state: &AppState) -> ListItem<'static> {
        let mut spans = Vec::with_capacity(6);

        // Sessions continued from a previous day carry a marker.
        if session.is_continuation {
            spans.push(Span::styled("↪ ", Style::default().fg(theme::INFO)));
        } else {
            spans.push(Span::raw("  "));
        }

        spans.push(Span::styled(
            format!("{:<32}", truncate(state.session_title(&session.id), 32)),
            Style::default().fg(theme::TEXT_PRIMARY),
        ));
        spans.push(Span::styled(
            format!("{:>7} ", format_number(session.tokens.total())),
            Style::default().fg(theme::SUCCESS),
        ));
        spans.push(Span::styled(
            format!("${:>6.2} ", session.cost),
            Style::default().fg(theme::COST),
        ));
        spans.push(Span::styled(
            format!("+{}", session.diffs.additions),
            Style::default().fg(theme::DIFF_ADD),
        ));
        spans.push(Span::styled(
            format!("/-{}", session.diffs.deletions),
            Style::default().fg(theme::DIFF_REMOVE),
        ));

        ListItem::new(Line::from(spans))
    }
}

/// Truncate a string to a maximum display width, wide characters counted
/// as two columns.
pub(super) fn truncate(s: &str, max_width: usize) -> String {
    use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

    if s.width() <= max_width {
        return s.to_string();
    }
    let budget = max_width.saturating_sub(3);
    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    format!("{}...", out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
    }
}
