use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use ocstats_core::format::{format_active_duration, format_number};

use super::session_list::truncate;
use crate::state::AppState;
use crate::ui::theme;

/// Detail panel for the selected session
pub struct SessionDetail;

impl SessionDetail {
    pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
        let block = theme::panel_block(" Session ".to_string(), false);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(session) = state.selected_session() else {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    "No session selected",
                    Style::default().fg(theme::TEXT_MUTED),
                ))),
                inner,
            );
            return;
        };

        let dim = Style::default().fg(theme::TEXT_MUTED);
        let mut lines: Vec<Line> = Vec::new();

        let mut header = vec![Span::styled(
            truncate(state.session_title(&session.id), 48),
            Style::default()
                .fg(theme::TEXT_PRIMARY)
                .add_modifier(Modifier::BOLD),
        )];
        if session.is_continuation {
            header.push(Span::styled(" ↪ continued", Style::default().fg(theme::INFO)));
            if let Some(origin) = &session.first_created_date {
                header.push(Span::styled(format!(" from {origin}"), dim));
            }
        }
        lines.push(Line::from(header));

        if !session.path_cwd.is_empty() {
            lines.push(Line::from(Span::styled(
                truncate(&session.path_cwd, 60),
                dim,
            )));
        }

        lines.push(Line::from(vec![
            Span::styled("msgs:", dim),
            Span::styled(
                format!("{} ", session.messages),
                Style::default().fg(theme::TEXT_SECONDARY),
            ),
            Span::styled("prompts:", dim),
            Span::styled(
                format!("{} ", session.prompts),
                Style::default().fg(theme::TEXT_SECONDARY),
            ),
            Span::styled("cost:", dim),
            Span::styled(
                format!("${:.2} ", session.cost),
                Style::default().fg(theme::COST),
            ),
            Span::styled("active:", dim),
            Span::styled(
                format_active_duration(session.active_duration_ms),
                Style::default().fg(theme::INFO),
            ),
        ]));

        lines.push(Line::from(vec![
            Span::styled("in:", dim),
            Span::styled(
                format!("{} ", format_number(session.tokens.input)),
                Style::default().fg(theme::TOKEN_INPUT),
            ),
            Span::styled("out:", dim),
            Span::styled(
                format!("{} ", format_number(session.tokens.output)),
                Style::default().fg(theme::TOKEN_OUTPUT),
            ),
            Span::styled("reason:", dim),
            Span::styled(
                format!("{} ", format_number(session.tokens.reasoning)),
                Style::default().fg(theme::THINKING),
            ),
            Span::styled("cache r/w:", dim),
            Span::styled(
                format!(
                    "{}/{}",
                    format_number(session.tokens.cache_read),
                    format_number(session.tokens.cache_write)
                ),
                Style::default().fg(theme::TEXT_SECONDARY),
            ),
        ]));

        // Agents, main agent first.
        let mut agents: Vec<_> = session.agents.iter().collect();
        agents.sort_by_key(|a| (!a.is_main, std::cmp::Reverse(a.tokens.total())));
        for (i, agent) in agents.iter().take(4).enumerate() {
            let color = if agent.is_main {
                theme::TEXT_PRIMARY
            } else {
                theme::subagent_color(i)
            };
            let mut models: Vec<&str> = agent.models.iter().map(|m| &**m).collect();
            models.sort_unstable();
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{} {:<12}", if agent.is_main { "●" } else { "○" }, agent.name),
                    Style::default().fg(color),
                ),
                Span::styled(
                    format!("{:>7} ", format_number(agent.tokens.total())),
                    Style::default().fg(theme::SUCCESS),
                ),
                Span::styled(
                    format!("{:>7} ", format_active_duration(agent.active_duration_ms)),
                    Style::default().fg(theme::INFO),
                ),
                Span::styled(truncate(&models.join(","), 28), dim),
            ]));
        }

        // Top tools by call count.
        let mut tools: Vec<(&str, u64)> = session
            .tools
            .iter()
            .map(|(name, count)| (&**name, *count))
            .collect();
        tools.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        if !tools.is_empty() {
            let summary = tools
                .iter()
                .take(5)
                .map(|(name, count)| format!("{name}:{count}"))
                .collect::<Vec<_>>()
                .join(" ");
            lines.push(Line::from(vec![
                Span::styled("tools ", dim),
                Span::styled(summary, Style::default().fg(theme::TEXT_SECONDARY)),
            ]));
        }

        // File diffs, largest churn first.
        let remaining = (inner.height as usize).saturating_sub(lines.len());
        for diff in session.file_diffs.iter().take(remaining) {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("+{:<5}", diff.additions),
                    Style::default().fg(theme::DIFF_ADD),
                ),
                Span::styled(
                    format!("-{:<5}", diff.deletions),
                    Style::default().fg(theme::DIFF_REMOVE),
                ),
                Span::styled(truncate(&diff.path, 48), Style::default().fg(theme::TEXT_SECONDARY)),
            ]));
        }

        frame.render_widget(Paragraph::new(lines), inner);
    }
}
