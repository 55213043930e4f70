use chrono::{Duration, NaiveDate};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph, Sparkline},
    Frame,
};

use ocstats_core::format::{format_number, format_number_full};
use ocstats_core::pricing::{estimate_cost, lookup_pricing};
use ocstats_core::ModelUsage;

use super::session_list::truncate;
use crate::state::{AppState, PanelFocus};
use crate::ui::theme;

/// Model ranking, busiest first
pub struct ModelList;

impl ModelList {
    pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
        let items: Vec<ListItem> = state
            .model_usage
            .iter()
            .map(Self::create_list_item)
            .collect();

        let title = format!(" Models ({}) ", state.model_usage.len());
        let list = List::new(items)
            .block(theme::panel_block(title, state.focus == PanelFocus::Sidebar))
            .highlight_style(theme::highlight_style())
            .highlight_symbol("▶ ");

        let mut list_state = ListState::default();
        list_state.select(Some(state.selected_model_index));

        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn create_list_item(model: &ModelUsage) -> ListItem<'static> {
        let spans = vec![
            Span::styled(
                format!("{:<24}", truncate(&model.display_name, 24)),
                Style::default().fg(theme::TEXT_PRIMARY),
            ),
            Span::styled(
                format!("{:>7} ", format_number(model.tokens.total())),
                Style::default().fg(theme::SUCCESS),
            ),
            Span::styled(
                format!("${:>7.2}", model.cost),
                Style::default().fg(theme::COST),
            ),
        ];
        ListItem::new(Line::from(spans))
    }

    /// Detail panel for the selected model: token breakdown, pricing and a
    /// daily-usage sparkline for the trailing two weeks.
    pub fn render_detail(frame: &mut Frame, area: Rect, state: &AppState) {
        let block = theme::panel_block(
            " Model ".to_string(),
            state.focus == PanelFocus::Content,
        );
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(model) = state.selected_model() else {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    "No model selected",
                    Style::default().fg(theme::TEXT_MUTED),
                ))),
                inner,
            );
            return;
        };

        let dim = Style::default().fg(theme::TEXT_MUTED);
        let mut lines: Vec<Line> = Vec::new();

        lines.push(Line::from(vec![
            Span::styled(
                model.display_name.to_string(),
                Style::default()
                    .fg(theme::TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  provider:{}", model.provider), dim),
        ]));

        lines.push(Line::from(vec![
            Span::styled("msgs:", dim),
            Span::styled(
                format!("{} ", format_number_full(model.messages)),
                Style::default().fg(theme::TEXT_SECONDARY),
            ),
            Span::styled("sessions:", dim),
            Span::styled(
                format!("{} ", model.sessions.len()),
                Style::default().fg(theme::TEXT_SECONDARY),
            ),
            Span::styled("cost:", dim),
            Span::styled(
                format!("${:.2}", model.cost),
                Style::default().fg(theme::COST),
            ),
        ]));

        lines.push(Line::from(vec![
            Span::styled("in:", dim),
            Span::styled(
                format!("{} ", format_number(model.tokens.input)),
                Style::default().fg(theme::TOKEN_INPUT),
            ),
            Span::styled("out:", dim),
            Span::styled(
                format!("{} ", format_number(model.tokens.output)),
                Style::default().fg(theme::TOKEN_OUTPUT),
            ),
            Span::styled("reason:", dim),
            Span::styled(
                format!("{} ", format_number(model.tokens.reasoning)),
                Style::default().fg(theme::THINKING),
            ),
            Span::styled("cache r/w:", dim),
            Span::styled(
                format!(
                    "{}/{}",
                    format_number(model.tokens.cache_read),
                    format_number(model.tokens.cache_write)
                ),
                Style::default().fg(theme::TEXT_SECONDARY),
            ),
        ]));

        if state.pricing_enabled {
            if let Some(pricing) = lookup_pricing(&model.name) {
                let estimated = estimate_cost(&model.name, &model.tokens).unwrap_or(0.0);
                let savings = estimated - model.cost;
                lines.push(Line::from(vec![
                    Span::styled(
                        format!(
                            "openrouter in:${:.2}/M out:${:.2}/M ",
                            pricing.prompt * 1e6,
                            pricing.completion * 1e6
                        ),
                        dim,
                    ),
                    Span::styled("est:", dim),
                    Span::styled(
                        format!("${estimated:.2} "),
                        Style::default().fg(theme::COST),
                    ),
                    Span::styled("saved:", dim),
                    Span::styled(
                        format!("${savings:.2}"),
                        Style::default().fg(if savings >= 0.0 {
                            theme::SUCCESS
                        } else {
                            theme::ERROR
                        }),
                    ),
                ]));
            }
        }

        // Top agents driving this model.
        let mut agents: Vec<(&str, u64)> = model
            .agents
            .iter()
            .map(|(name, count)| (&**name, *count))
            .collect();
        agents.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        if !agents.is_empty() {
            let summary = agents
                .iter()
                .take(5)
                .map(|(name, count)| format!("{name}:{count}"))
                .collect::<Vec<_>>()
                .join(" ");
            lines.push(Line::from(vec![
                Span::styled("agents ", dim),
                Span::styled(summary, Style::default().fg(theme::TEXT_SECONDARY)),
            ]));
        }

        lines.push(Line::from(Span::styled("last 14 days", dim)));
        let text_height = lines.len() as u16;
        frame.render_widget(Paragraph::new(lines), inner);

        // Sparkline under the text block with whatever height is left.
        let spark_height = inner.height.saturating_sub(text_height);
        if spark_height > 0 {
            let data = Self::daily_series(model, state.max_data_day(), 14);
            let spark_area = Rect::new(
                inner.x,
                inner.y + text_height,
                inner.width,
                spark_height.min(5),
            );
            frame.render_widget(
                Sparkline::default()
                    .data(&data)
                    .style(Style::default().fg(theme::SUCCESS)),
                spark_area,
            );
        }
    }

    /// Daily token counts, oldest first, ending on the newest data day.
    fn daily_series(model: &ModelUsage, max_day: Option<NaiveDate>, days: i64) -> Vec<u64> {
        let Some(end) = max_day else {
            return Vec::new();
        };
        (0..days)
            .rev()
            .map(|back| {
                let key = (end - Duration::days(back)).format("%Y-%m-%d").to_string();
                model.daily_tokens.get(&key).copied().unwrap_or(0)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_series_oldest_first() {
        let mut model = ModelUsage::new("anthropic/claude-sonnet-4".into());
        model.daily_tokens.insert("2026-03-10".to_string(), 100);
        model.daily_tokens.insert("2026-03-09".to_string(), 50);

        let end = NaiveDate::from_ymd_opt(2026, 3, 10);
        let series = ModelList::daily_series(&model, end, 3);
        assert_eq!(series, vec![0, 50, 100]);
    }

    #[test]
    fn test_daily_series_empty_without_data() {
        let model = ModelUsage::new("anthropic/claude-sonnet-4".into());
        assert!(ModelList::daily_series(&model, None, 14).is_empty());
    }
}
