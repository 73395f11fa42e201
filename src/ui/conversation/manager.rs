use crate::config::UiConfig;
use crate::exchange::ExchangeController;
use crate::transport::Transport;
use crate::ui::conversation::{
    get_help_text, ComposerResult, ConversationComposer, ConversationHistory, SlashCommand,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use std::sync::Arc;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Wires the composer and transcript view to an exchange controller
pub struct ConversationManager<T: Transport + 'static> {
    controller: Arc<ExchangeController<T>>,
    composer: ConversationComposer,
    ui: UiConfig,
    notice: Option<String>,
}

impl<T: Transport + 'static> ConversationManager<T> {
    pub fn new(controller: Arc<ExchangeController<T>>, ui: UiConfig) -> Self {
        Self {
            controller,
            composer: ConversationComposer::new("Ask anything about stocks or financial concepts…"),
            ui,
            notice: None,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind == KeyEventKind::Press {
            let ctrl_c = key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
            if ctrl_c || key.code == KeyCode::Esc {
                return ConversationAction::Exit;
            }
        }

        self.composer.set_sending_enabled(!self.controller.is_busy());
        match self.composer.handle_key(key) {
            ComposerResult::Submitted(text) => {
                self.notice = None;
                self.spawn_exchange(text);
                ConversationAction::None
            }
            ComposerResult::Command(command) => self.handle_slash_command(command),
            ComposerResult::None => ConversationAction::None,
        }
    }

    /// Hand text to the controller on a background task so the UI keeps drawing
    fn spawn_exchange(&self, text: String) {
        let controller = self.controller.clone();
        tokio::spawn(async move {
            controller.submit(text).await;
        });
    }

    fn handle_slash_command(&mut self, command: SlashCommand) -> ConversationAction {
        match command {
            SlashCommand::Clear => {
                self.controller.reset();
                self.notice = None;
                ConversationAction::None
            }
            SlashCommand::Help => {
                self.notice = Some(get_help_text());
                ConversationAction::None
            }
            SlashCommand::Quit => ConversationAction::Exit,
        }
    }

    /// Render the whole conversation screen
    pub fn render(&mut self, area: Rect, buf: &mut Buffer) {
        let busy = self.controller.is_busy();
        self.composer.set_sending_enabled(!busy);
        let error = self.controller.error();
        let messages = self.controller.store().snapshot();

        let banner = error.as_ref().or(self.notice.as_ref());
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),                                   // Header
                Constraint::Min(5),                                      // History
                Constraint::Length(if banner.is_some() { 3 } else { 0 }), // Banner
                Constraint::Length(5),                                   // Composer
            ])
            .split(area);

        self.render_header(busy, chunks[0], buf);
        ConversationHistory::new(&messages, self.ui.show_timestamps).render(chunks[1], buf);

        if let Some(error) = &error {
            Self::render_banner(error, Color::Red, chunks[2], buf);
        } else if let Some(notice) = &self.notice {
            Self::render_banner(notice, Color::Yellow, chunks[2], buf);
        }

        (&self.composer).render(chunks[3], buf);
    }

    fn render_header(&self, busy: bool, area: Rect, buf: &mut Buffer) {
        let (pill, pill_color) = if busy {
            ("Thinking…", Color::Yellow)
        } else {
            ("Ready", Color::Green)
        };

        let lines = vec![
            Line::from(vec![
                Span::styled(
                    self.ui.title.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::styled(
                    format!("[{pill}]"),
                    Style::default().fg(pill_color).add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(Span::styled(
                self.ui.subtitle.clone(),
                Style::default().fg(Color::Gray),
            )),
        ];

        Paragraph::new(lines)
            .block(Block::default().borders(Borders::BOTTOM))
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }

    fn render_banner(text: &str, color: Color, area: Rect, buf: &mut Buffer) {
        Paragraph::new(text.to_string())
            .style(Style::default().fg(color))
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}
