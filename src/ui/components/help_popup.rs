use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::ui::theme;

/// Key reference popup
pub struct HelpPopup;

const KEYS: &[(&str, &str)] = &[
    ("q / Esc", "quit (Esc closes popups first)"),
    ("?", "toggle this help"),
    ("Tab / 1 2 3", "switch view (Days / Models / Overview)"),
    ("j / k, ↓ / ↑", "move selection in the focused list"),
    ("h / l, ← / →", "switch focus between panels"),
    ("w", "cycle stats window (7d / 14d / 30d / All)"),
    ("s", "cycle session sort (Tokens / Cost / Messages / Recent)"),
    ("r", "force a full refresh"),
    ("Enter", "open session transcript"),
    ("arrows (Overview)", "move heatmap day selection"),
];

impl HelpPopup {
    pub fn render(frame: &mut Frame, area: Rect) {
        frame.render_widget(Clear, area);

        let block = theme::panel_block(" Help ".to_string(), true);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut lines: Vec<Line> = vec![Line::from("")];
        for (key, desc) in KEYS {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {key:<18}"),
                    Style::default()
                        .fg(theme::ACCENT_CYAN)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(*desc, Style::default().fg(theme::TEXT_SECONDARY)),
            ]));
        }

        frame.render_widget(Paragraph::new(lines), inner);
    }
}
