//! Contribution heatmap over the trailing year of activity.

use chrono::{Datelike, Duration, NaiveDate};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use ocstats_core::format::{format_active_duration, format_number, month_abbr, weekday_abbr};
use ocstats_core::DayStat;

use crate::state::AppState;
use crate::ui::theme;

const LABEL_W: u16 = 6;
const WEEK_W: u16 = 2;

/// Grid geometry, recomputed every frame and by the mouse handler for
/// hit-testing. Deterministic for a given area and data set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeatmapGeometry {
    pub inner: Rect,
    /// Monday of the first rendered week
    pub render_start: NaiveDate,
    /// Most recent day with data
    pub today: NaiveDate,
    pub weeks: usize,
    /// Rows above the grid (month label row when tall enough)
    pub header_rows: u16,
}

impl HeatmapGeometry {
    /// Map a terminal coordinate to a grid day, if it lands on one.
    pub fn day_at(&self, x: u16, y: u16) -> Option<NaiveDate> {
        let grid_x = x.checked_sub(self.inner.x + LABEL_W)?;
        let row = y.checked_sub(self.inner.y + self.header_rows)?;
        if row >= 7 {
            return None;
        }
        let week = (grid_x / WEEK_W) as usize;
        if week >= self.weeks {
            return None;
        }
        let date = self.render_start + Duration::days((week * 7 + row as usize) as i64);
        (date <= self.today).then_some(date)
    }
}

/// GitHub-style activity graph, Monday-start weeks, 2-char cells.
pub struct Heatmap;

impl Heatmap {
    /// Compute the grid geometry for an outer panel area. `None` when the
    /// area is too small to draw a grid.
    pub fn geometry(area: Rect, per_day: &std::collections::HashMap<String, DayStat>) -> Option<HeatmapGeometry> {
        let inner = Block::default().borders(Borders::ALL).inner(area);
        if inner.width < 16 || inner.height < 6 {
            return None;
        }

        // Anchor on the newest day that has data, not the wall clock.
        let today = per_day
            .keys()
            .filter_map(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
            .max()
            .unwrap_or_else(|| chrono::Local::now().date_naive());

        let start_365 = today - Duration::days(364);
        let start_offset = start_365.weekday().num_days_from_monday() as i64;
        let grid_start = start_365 - Duration::days(start_offset);

        let total_days = (today - grid_start).num_days().max(0) as usize + 1;
        let total_weeks = total_days.div_ceil(7);

        let avail_w = inner.width.saturating_sub(LABEL_W + 1);
        let max_weeks_fit = (avail_w / WEEK_W) as usize;
        if max_weeks_fit == 0 {
            return None;
        }

        // Show as many weeks as fit, latest first.
        let weeks = total_weeks.min(max_weeks_fit).max(1);
        let start_week = total_weeks.saturating_sub(weeks);
        let render_start = grid_start + Duration::days((start_week * 7) as i64);

        Some(HeatmapGeometry {
            inner,
            render_start,
            today,
            weeks,
            header_rows: if inner.height > 8 { 1 } else { 0 },
        })
    }

    pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(theme::BORDER_MUTED))
            .title(
                Line::from(Span::styled(
                    " Activity ",
                    Style::default()
                        .fg(theme::ACCENT_CYAN)
                        .add_modifier(Modifier::BOLD),
                ))
                .alignment(Alignment::Center),
            );
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(geo) = Self::geometry(area, &state.per_day) else {
            return;
        };

        // Fill the grid, tracking the busiest day for scaling.
        let mut grid: Vec<[Option<u64>; 7]> = vec![[None; 7]; geo.weeks];
        let mut max_tokens: u64 = 1;
        for (w, col) in grid.iter_mut().enumerate() {
            for (d, cell) in col.iter_mut().enumerate() {
                let date = geo.render_start + Duration::days((w * 7 + d) as i64);
                if date > geo.today {
                    continue;
                }
                let key = date.format("%Y-%m-%d").to_string();
                let tokens = state
                    .per_day
                    .get(&key)
                    .map(|ds| ds.tokens.total())
                    .unwrap_or(0);
                *cell = Some(tokens);
                max_tokens = max_tokens.max(tokens);
            }
        }

        let selected = state
            .heatmap_selected_day
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .and_then(|d| {
                let offset = (d - geo.render_start).num_days();
                (offset >= 0).then(|| ((offset / 7) as usize, (offset % 7) as usize))
            });

        let mut lines: Vec<Line> = Vec::with_capacity(11);
        if geo.header_rows > 0 {
            lines.push(Self::month_row(&geo));
        }

        const WEEKDAYS: [chrono::Weekday; 7] = [
            chrono::Weekday::Mon,
            chrono::Weekday::Tue,
            chrono::Weekday::Wed,
            chrono::Weekday::Thu,
            chrono::Weekday::Fri,
            chrono::Weekday::Sat,
            chrono::Weekday::Sun,
        ];

        let label_style = Style::default().fg(theme::TEXT_MUTED);
        for (d, weekday) in WEEKDAYS.into_iter().enumerate() {
            let mut spans: Vec<Span> = Vec::with_capacity(geo.weeks + 1);
            spans.push(Span::styled(
                format!(" {:<w$}", weekday_abbr(weekday), w = (LABEL_W - 1) as usize),
                label_style,
            ));

            for (w, week) in grid.iter().enumerate() {
                let cell = match week[d] {
                    None => Span::raw("  "),
                    Some(tokens) => {
                        let ratio = if tokens == 0 {
                            0.0
                        } else {
                            tokens as f64 / max_tokens as f64
                        };
                        let mut style = Style::default().bg(theme::heatmap_level(ratio));
                        if selected == Some((w, d)) {
                            style = style.add_modifier(Modifier::REVERSED);
                        }
                        Span::styled("  ", style)
                    }
                };
                spans.push(cell);
            }
            lines.push(Line::from(spans));
        }

        if inner.height > 9 {
            lines.push(Line::from(""));
        }
        lines.push(Self::legend_row(state));

        frame.render_widget(Paragraph::new(lines), inner);
    }

    /// Month labels centered over each visible month range, skipping labels
    /// that would not fit or would collide.
    fn month_row(geo: &HeatmapGeometry) -> Line<'static> {
        let grid_w = (WEEK_W as usize) * geo.weeks;
        let mut row: Vec<char> = vec![' '; grid_w];

        let mut ranges: Vec<(u32, usize, usize)> = Vec::new();
        let mut cur_month: Option<u32> = None;
        let mut range_start = 0usize;
        let mut x = 0usize;
        for w in 0..geo.weeks {
            let month = (geo.render_start + Duration::days((w * 7) as i64)).month();
            match cur_month {
                None => {
                    cur_month = Some(month);
                    range_start = x;
                }
                Some(m) if m != month => {
                    ranges.push((m, range_start, x));
                    cur_month = Some(month);
                    range_start = x;
                }
                _ => {}
            }
            x += WEEK_W as usize;
        }
        if let Some(m) = cur_month {
            ranges.push((m, range_start, x));
        }

        let mut last_end: i32 = -2;
        for (month, x0, x1) in ranges {
            let name = month_abbr(month);
            if x1 - x0 < name.len() {
                continue;
            }
            let center = (x0 + x1) / 2;
            let start = center.saturating_sub(name.len() / 2) as i32;
            let end = start + name.len() as i32 - 1;
            if start <= last_end + 1 || end >= grid_w as i32 {
                continue;
            }
            for (i, ch) in name.chars().enumerate() {
                row[start as usize + i] = ch;
            }
            last_end = end;
        }

        Line::from(vec![
            Span::raw(" ".repeat(LABEL_W as usize)),
            Span::styled(
                row.into_iter().collect::<String>(),
                Style::default().fg(theme::TEXT_MUTED),
            ),
        ])
    }

    /// Less -> More legend, plus the selected-day readout when a day is
    /// selected.
    fn legend_row(state: &AppState) -> Line<'static> {
        let dim = Style::default().fg(theme::TEXT_MUTED);
        let mut spans = vec![
            Span::raw(" ".repeat(LABEL_W as usize)),
            Span::styled("Less ", dim),
        ];
        for color in theme::heatmap_legend().iter().take(6) {
            spans.push(Span::styled("  ", Style::default().bg(*color)));
        }
        spans.push(Span::styled(" More ", dim));

        if let Some(day) = &state.heatmap_selected_day {
            let stat = state.per_day.get(day);
            let tokens = stat.map(|s| s.tokens.total()).unwrap_or(0);
            let sessions = stat.map(|s| s.sessions.len()).unwrap_or(0);
            let cost = stat.map(|s| s.cost).unwrap_or(0.0);
            let active_ms: i64 = stat
                .map(|s| s.sessions.values().map(|ses| ses.active_duration_ms).sum())
                .unwrap_or(0);

            spans.push(Span::styled(
                format!("  {} ", ocstats_core::format::format_date(day)),
                Style::default()
                    .fg(theme::TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled(" tok:", dim));
            spans.push(Span::styled(
                format_number(tokens),
                Style::default().fg(theme::SUCCESS),
            ));
            spans.push(Span::styled("  sess:", dim));
            spans.push(Span::styled(
                sessions.to_string(),
                Style::default().fg(theme::ACCENT_CYAN),
            ));
            spans.push(Span::styled("  cost:", dim));
            spans.push(Span::styled(
                format!("${cost:.2}"),
                Style::default().fg(theme::COST),
            ));
            spans.push(Span::styled("  active:", dim));
            spans.push(Span::styled(
                format_active_duration(active_ms),
                Style::default().fg(theme::INFO),
            ));
        }

        Line::from(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn per_day_with(day: &str) -> HashMap<String, DayStat> {
        let mut map = HashMap::new();
        map.insert(day.to_string(), DayStat::default());
        map
    }

    #[test]
    fn test_geometry_too_small() {
        let per_day = per_day_with("2026-03-10");
        assert!(Heatmap::geometry(Rect::new(0, 0, 10, 5), &per_day).is_none());
    }

    #[test]
    fn test_geometry_anchors_on_max_data_day() {
        let per_day = per_day_with("2026-03-10");
        let geo = Heatmap::geometry(Rect::new(0, 0, 80, 11), &per_day).unwrap();
        assert_eq!(geo.today, NaiveDate::from_ymd_opt(2026, 3, 10).unwrap());
        // Grid always starts on a Monday.
        assert_eq!(
            geo.render_start.weekday(),
            chrono::Weekday::Mon,
        );
        assert!(geo.weeks > 0);
    }

    #[test]
    fn test_day_at_maps_cells() {
        let per_day = per_day_with("2026-03-10");
        let geo = Heatmap::geometry(Rect::new(0, 0, 80, 11), &per_day).unwrap();
        // Top-left grid cell is the render start day.
        let x = geo.inner.x + LABEL_W;
        let y = geo.inner.y + geo.header_rows;
        assert_eq!(geo.day_at(x, y), Some(geo.render_start));
        // One row down is the next day.
        assert_eq!(geo.day_at(x, y + 1), Some(geo.render_start + Duration::days(1)));
        // Left of the grid is a miss.
        assert_eq!(geo.day_at(geo.inner.x, y), None);
    }
}
