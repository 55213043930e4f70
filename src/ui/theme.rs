//! Fixed RGB palette shared by all components.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, BorderType, Borders};

pub const BG_PRIMARY: Color = Color::Rgb(22, 24, 38);
pub const BG_HIGHLIGHT: Color = Color::Rgb(50, 54, 72);

pub const BORDER_DEFAULT: Color = Color::Rgb(130, 135, 160);
pub const BORDER_FOCUS: Color = Color::Rgb(120, 220, 170);
pub const BORDER_MUTED: Color = Color::Rgb(90, 95, 115);

pub const TEXT_PRIMARY: Color = Color::Rgb(230, 233, 248);
pub const TEXT_SECONDARY: Color = Color::Rgb(185, 190, 210);
pub const TEXT_MUTED: Color = Color::Rgb(140, 145, 168);

pub const SUCCESS: Color = Color::Rgb(110, 220, 120);
pub const ERROR: Color = Color::Rgb(250, 120, 130);
pub const INFO: Color = Color::Rgb(110, 200, 245);

pub const DIFF_ADD: Color = Color::Rgb(120, 200, 140);
pub const DIFF_REMOVE: Color = Color::Rgb(230, 130, 130);

pub const TOKEN_INPUT: Color = Color::Rgb(120, 170, 250);
pub const TOKEN_OUTPUT: Color = Color::Rgb(210, 150, 235);
pub const COST: Color = Color::Rgb(235, 195, 100);
pub const THINKING: Color = Color::Rgb(100, 215, 235);

pub const ACCENT_CYAN: Color = Color::Rgb(100, 215, 235);
pub const ACCENT_ORANGE: Color = Color::Rgb(245, 175, 100);

/// Green heatmap scale, zero level first.
const HEATMAP_LEVELS: [Color; 7] = [
    Color::Rgb(38, 42, 50),
    Color::Rgb(24, 66, 44),
    Color::Rgb(28, 102, 58),
    Color::Rgb(42, 138, 74),
    Color::Rgb(64, 181, 96),
    Color::Rgb(94, 230, 126),
    Color::Rgb(118, 255, 149),
];

/// Map a ratio of the busiest day (0.0..=1.0) to a heatmap cell color.
pub fn heatmap_level(ratio: f64) -> Color {
    if ratio <= 0.0 {
        HEATMAP_LEVELS[0]
    } else if ratio <= 0.20 {
        HEATMAP_LEVELS[1]
    } else if ratio <= 0.40 {
        HEATMAP_LEVELS[2]
    } else if ratio <= 0.60 {
        HEATMAP_LEVELS[3]
    } else if ratio <= 0.80 {
        HEATMAP_LEVELS[4]
    } else if ratio <= 0.95 {
        HEATMAP_LEVELS[5]
    } else {
        HEATMAP_LEVELS[6]
    }
}

/// Legend swatches, Less to More.
pub fn heatmap_legend() -> &'static [Color; 7] {
    &HEATMAP_LEVELS
}

/// Stable per-subagent accent.
pub fn subagent_color(index: usize) -> Color {
    const COLORS: [Color; 5] = [
        Color::Rgb(100, 210, 225),
        Color::Rgb(200, 150, 225),
        Color::Rgb(110, 200, 120),
        Color::Rgb(225, 190, 100),
        Color::Rgb(120, 165, 240),
    ];
    COLORS[index % COLORS.len()]
}

/// Standard panel block, border color keyed on focus.
pub fn panel_block(title: String, focused: bool) -> Block<'static> {
    let border = if focused { BORDER_FOCUS } else { BORDER_MUTED };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
}

pub fn highlight_style() -> Style {
    Style::default()
        .bg(BG_HIGHLIGHT)
        .add_modifier(Modifier::BOLD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heatmap_level_boundaries() {
        assert_eq!(heatmap_level(0.0), HEATMAP_LEVELS[0]);
        assert_eq!(heatmap_level(0.1), HEATMAP_LEVELS[1]);
        assert_eq!(heatmap_level(0.5), HEATMAP_LEVELS[3]);
        assert_eq!(heatmap_level(1.0), HEATMAP_LEVELS[6]);
    }
}
