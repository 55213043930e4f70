use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use ocstats_core::format::{format_number, format_number_full};

use crate::state::AppState;
use crate::ui::theme;

/// Lifetime totals and derived overview stats
pub struct OverviewPanel;

impl OverviewPanel {
    pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
        let block = theme::panel_block(" Overview ".to_string(), false);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let overview =
            state
                .overview_cache
                .get(&state.per_day, &state.model_usage, state.totals.cost);

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(inner);

        let dim = Style::default().fg(theme::TEXT_MUTED);
        let val = Style::default().fg(theme::TEXT_PRIMARY);
        let row = |label: &str, value: &str, style: Style| {
            Line::from(vec![
                Span::styled(format!("{label:<16}"), dim),
                Span::styled(value.to_string(), style),
            ])
        };

        let totals = &state.totals;
        let left = vec![
            Line::from(Span::styled(
                "Lifetime",
                Style::default()
                    .fg(theme::ACCENT_CYAN)
                    .add_modifier(Modifier::BOLD),
            )),
            row("sessions", &totals.sessions.len().to_string(), val),
            row(
                "messages",
                &format_number_full(totals.messages),
                val,
            ),
            row("prompts", &format_number_full(totals.prompts), val),
            row(
                "tokens",
                &format_number(totals.tokens.total()),
                Style::default().fg(theme::SUCCESS),
            ),
            row(
                "cost",
                &format!("${:.2}", totals.cost),
                Style::default().fg(theme::COST),
            ),
            row(
                "lines",
                &format!("+{} / -{}", totals.diffs.additions, totals.diffs.deletions),
                Style::default().fg(theme::DIFF_ADD),
            ),
            row("active time", &overview.total_active_time, Style::default().fg(theme::INFO)),
            row("since", &overview.start_day, val),
            row("active days", &overview.active_days, val),
            row("models used", &overview.total_models, val),
        ];

        let mut right = vec![
            Line::from(Span::styled(
                "Habits",
                Style::default()
                    .fg(theme::ACCENT_ORANGE)
                    .add_modifier(Modifier::BOLD),
            )),
            row("peak day", &overview.peak_day, val),
            row("longest session", &overview.longest_session, val),
            row("avg sessions/day", &overview.avg_sessions, val),
            row("avg tokens/day", &overview.avg_tokens, val),
            row(
                "avg cost/day",
                &overview.avg_cost,
                Style::default().fg(theme::COST),
            ),
            row("chronotype", &overview.chronotype, val),
            row("favorite day", &overview.favorite_day, val),
        ];

        if state.pricing_enabled {
            right.push(row(
                "est. savings",
                &overview.total_savings,
                Style::default().fg(theme::SUCCESS),
            ));
        }

        if !overview.top_languages.is_empty() {
            right.push(Line::from(Span::styled("top languages", dim)));
            for (lang, pct) in &overview.top_languages {
                right.push(Line::from(vec![
                    Span::styled(format!("  {lang:<12}"), val),
                    Span::styled(
                        format!("{pct:.0}%"),
                        Style::default().fg(theme::TEXT_SECONDARY),
                    ),
                ]));
            }
            if overview.has_more_langs {
                right.push(Line::from(Span::styled("  …", dim)));
            }
        }

        frame.render_widget(Paragraph::new(left), cols[0]);
        frame.render_widget(Paragraph::new(right), cols[1]);
    }
}
