use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use ocstats_core::format::format_number;
use ocstats_core::{ChatMessage, MessageContent};

use super::session_list::truncate;
use crate::state::AppState;
use crate::ui::theme;

/// Maximum characters of message text shown per role
const USER_TEXT_MAX: usize = 200;
const ASSISTANT_TEXT_MAX: usize = 400;

/// Centered modal showing the reconstructed session transcript
pub struct SessionModal;

impl SessionModal {
    pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
        let Some(modal) = &state.modal else {
            return;
        };

        frame.render_widget(Clear, area);

        let day_suffix = modal
            .day
            .as_deref()
            .map(|d| format!(" · {d}"))
            .unwrap_or_default();
        let title = format!(
            " {} ({} messages{day_suffix}) ",
            truncate(state.session_title(&modal.session_id), 40),
            modal.messages.len()
        );
        let block = theme::panel_block(title, true);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut lines: Vec<Line> = Vec::new();
        for message in modal.messages.iter() {
            Self::push_message(&mut lines, message);
        }
        if lines.is_empty() {
            lines.push(Line::from(Span::styled(
                "No transcript for this session",
                Style::default().fg(theme::TEXT_MUTED),
            )));
        }

        frame.render_widget(
            Paragraph::new(lines).scroll((modal.scroll, 0)),
            inner,
        );
    }

    /// Total rendered line count, used to bound scrolling.
    pub fn line_count(messages: &[ChatMessage]) -> usize {
        let mut lines = Vec::new();
        for message in messages {
            Self::push_message(&mut lines, message);
        }
        lines.len()
    }

    fn push_message(lines: &mut Vec<Line<'static>>, message: &ChatMessage) {
        let (role_label, role_color) = match &*message.role {
            "user" => ("user", theme::ACCENT_CYAN),
            "assistant" => ("assistant", theme::SUCCESS),
            other => (other, theme::TEXT_MUTED),
        };
        let mut header = vec![Span::styled(
            format!("▌ {role_label}"),
            Style::default().fg(role_color).add_modifier(Modifier::BOLD),
        )];
        if let Some(label) = &message.agent_label {
            header.push(Span::styled(
                format!(" [{label}]"),
                Style::default().fg(theme::subagent_color(0)),
            ));
        }
        if let Some(model) = &message.model {
            header.push(Span::styled(
                format!(" {model}"),
                Style::default().fg(theme::TEXT_MUTED),
            ));
        }
        lines.push(Line::from(header));

        let text_max = if &*message.role == "user" {
            USER_TEXT_MAX
        } else {
            ASSISTANT_TEXT_MAX
        };

        for part in &message.parts {
            match part {
                MessageContent::Text(text) => {
                    let clipped = truncate(text.trim(), text_max);
                    for chunk in clipped.lines() {
                        lines.push(Line::from(Span::styled(
                            format!("  {chunk}"),
                            Style::default().fg(theme::TEXT_SECONDARY),
                        )));
                    }
                }
                MessageContent::ToolCall(tool) => {
                    let mut spans = vec![Span::styled(
                        format!("  ⚒ {}", tool.name),
                        Style::default().fg(theme::ACCENT_ORANGE),
                    )];
                    if let Some(detail) = tool.input.as_deref().or(tool.file_path.as_deref()) {
                        spans.push(Span::styled(
                            format!(" {}", truncate(detail, 60)),
                            Style::default().fg(theme::TEXT_MUTED),
                        ));
                    }
                    if let (Some(adds), Some(dels)) = (tool.additions, tool.deletions) {
                        spans.push(Span::styled(
                            format!(" +{}", format_number(adds)),
                            Style::default().fg(theme::DIFF_ADD),
                        ));
                        spans.push(Span::styled(
                            format!("/-{}", format_number(dels)),
                            Style::default().fg(theme::DIFF_REMOVE),
                        ));
                    }
                    lines.push(Line::from(spans));
                }
                MessageContent::Thinking => {
                    lines.push(Line::from(Span::styled(
                        "  ∴ thinking…",
                        Style::default().fg(theme::THINKING),
                    )));
                }
            }
        }
        lines.push(Line::from(""));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocstats_core::stats::ToolCallInfo;

    #[test]
    fn test_line_count_counts_headers_and_parts() {
        let messages = vec![ChatMessage {
            role: "assistant".into(),
            model: Some("claude-sonnet-4".into()),
            parts: vec![
                MessageContent::Text("hello".into()),
                MessageContent::ToolCall(ToolCallInfo {
                    name: "edit".into(),
                    file_path: Some("src/main.rs".into()),
                    input: None,
                    additions: Some(3),
                    deletions: Some(1),
                }),
            ],
            is_subagent: false,
            agent_label: None,
        }];

        // header + text + tool + trailing blank
        assert_eq!(SessionModal::line_count(&messages), 4);
    }
}
