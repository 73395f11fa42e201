//! Transcript display component

use crate::message::{Message, Role};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Read-only view over a transcript snapshot, pinned to the newest messages
pub struct ConversationHistory<'a> {
    messages: &'a [Message],
    show_timestamps: bool,
}

impl<'a> ConversationHistory<'a> {
    pub fn new(messages: &'a [Message], show_timestamps: bool) -> Self {
        Self {
            messages,
            show_timestamps,
        }
    }

    /// All lines for the transcript at the given content width
    fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let mut all_lines = Vec::new();
        for message in self.messages {
            all_lines.extend(self.render_message(message, width));
            // spacing between messages
            all_lines.push(Line::from(""));
        }
        all_lines
    }

    /// Render a single message into lines
    fn render_message(&self, message: &Message, width: u16) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        let mut header = vec![Span::styled(
            message.role().display_name().to_uppercase(),
            Self::role_style(message.role()).add_modifier(Modifier::BOLD),
        )];
        if self.show_timestamps {
            header.push(Span::styled(
                format!(" {}", message.clock_time()),
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(header));

        for content_line in wrap_text(message.content(), width.saturating_sub(2) as usize) {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(content_line, Self::role_style(message.role())),
            ]));
        }

        lines
    }

    fn role_style(role: Role) -> Style {
        match role {
            Role::User => Style::default().fg(Color::Cyan),
            Role::Assistant => Style::default().fg(Color::Green),
        }
    }
}

impl Widget for ConversationHistory<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title("Conversation");
        let inner_area = block.inner(area);
        block.render(area, buf);

        let all_lines = self.lines(inner_area.width);

        // Keep the newest lines in view
        let height = inner_area.height as usize;
        let start = all_lines.len().saturating_sub(height);
        for (i, line) in all_lines[start..].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

/// Wrap text to fit within the given width.
///
/// Explicit line breaks and runs of spaces are kept. Breaks fall between
/// words; a word wider than a whole line is split across lines.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        let mut current_width = 0;

        for token in split_runs(paragraph) {
            let token_width = token.chars().count();
            if current_width + token_width <= width {
                current_line.push_str(token);
                current_width += token_width;
                continue;
            }

            if token.starts_with(char::is_whitespace) {
                // Spaces at a wrap point are swallowed by the break
                if current_width > 0 {
                    lines.push(std::mem::take(&mut current_line));
                    current_width = 0;
                }
                continue;
            }

            if current_width > 0 {
                lines.push(current_line.trim_end().to_string());
                current_line.clear();
                current_width = 0;
            }

            for c in token.chars() {
                if current_width == width {
                    lines.push(std::mem::take(&mut current_line));
                    current_width = 0;
                }
                current_line.push(c);
                current_width += 1;
            }
        }

        lines.push(current_line);
    }

    lines
}

/// Split a line into alternating runs of whitespace and non-whitespace
fn split_runs(line: &str) -> Vec<&str> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut in_space = None;

    for (i, c) in line.char_indices() {
        let space = c.is_whitespace();
        if in_space.is_some_and(|prev| prev != space) {
            runs.push(&line[start..i]);
            start = i;
        }
        in_space = Some(space);
    }
    if start < line.len() {
        runs.push(&line[start..]);
    }

    runs
}
