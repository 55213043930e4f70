use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use ocstats_core::format::format_number;

use crate::state::AppState;
use crate::ui::theme;
use crate::ui::ViewMode;

/// One-row status bar: windowed totals, mode indicators and key hints
pub struct StatusBar;

impl StatusBar {
    pub fn render(frame: &mut Frame, area: Rect, state: &AppState, view: ViewMode) {
        let dim = Style::default().fg(theme::TEXT_MUTED);
        let mut spans: Vec<Span> = Vec::new();

        if state.loading {
            spans.push(Span::styled(
                format!(" {} ", state.spinner_char()),
                Style::default().fg(theme::ACCENT_CYAN),
            ));
        } else {
            spans.push(Span::raw("   "));
        }

        spans.push(Span::styled(
            format!("[{}] ", view.display_name()),
            Style::default()
                .fg(theme::BORDER_FOCUS)
                .add_modifier(Modifier::BOLD),
        ));

        let totals = state.windowed_totals();
        spans.push(Span::styled(format!("{}: ", state.window.display_name()), dim));
        spans.push(Span::styled(
            format!("{} tok ", format_number(totals.tokens.total())),
            Style::default().fg(theme::SUCCESS),
        ));
        spans.push(Span::styled(
            format!("${:.2} ", totals.cost),
            Style::default().fg(theme::COST),
        ));
        spans.push(Span::styled(
            format!("+{}", totals.additions),
            Style::default().fg(theme::DIFF_ADD),
        ));
        spans.push(Span::styled(
            format!("/-{} ", totals.deletions),
            Style::default().fg(theme::DIFF_REMOVE),
        ));
        spans.push(Span::styled(
            format!("{} sessions ", totals.sessions),
            Style::default().fg(theme::TEXT_SECONDARY),
        ));
        spans.push(Span::styled(
            format!("sort:{} ", state.sort_by.display_name()),
            dim,
        ));

        if let Some(refreshed) = state.last_refresh {
            spans.push(Span::styled(
                format!("({}s ago) ", refreshed.elapsed().as_secs()),
                dim,
            ));
        }

        if let Some(error) = &state.error_message {
            spans.push(Span::styled(
                format!(" {error} "),
                Style::default().fg(theme::ERROR).add_modifier(Modifier::BOLD),
            ));
        } else {
            spans.push(Span::styled(
                "q:quit ?:help Tab:view w:window s:sort r:refresh Enter:chat",
                dim,
            ));
        }

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}
