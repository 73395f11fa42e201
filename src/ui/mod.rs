//! Interactive terminal front end

pub mod conversation;

use anyhow::{Context, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;

use crate::events::{spawn_event_reader, TuiEvent};
use crate::transport::Transport;
use conversation::{ConversationAction, ConversationManager};

/// How often the screen is redrawn while waiting for input or replies
const TICK: Duration = Duration::from_millis(120);

/// Puts the terminal back the way we found it, even on early return
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))
            .context("Failed to initialise terminal")?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            tracing::warn!(error = %e, "failed to disable raw mode");
        }
        if let Err(e) = execute!(self.terminal.backend_mut(), LeaveAlternateScreen) {
            tracing::warn!(error = %e, "failed to leave alternate screen");
        }
        let _ = self.terminal.show_cursor();
    }
}

/// Run the interactive chat until the user quits
pub async fn run<T: Transport + 'static>(mut manager: ConversationManager<T>) -> Result<()> {
    let mut guard = TerminalGuard::enter()?;
    let mut events = spawn_event_reader();
    let mut tick = tokio::time::interval(TICK);

    loop {
        guard
            .terminal
            .draw(|frame| {
                let area = frame.size();
                manager.render(area, frame.buffer_mut());
            })
            .context("Failed to draw frame")?;

        tokio::select! {
            event = events.recv() => match event {
                Some(TuiEvent::Key(key)) => {
                    if manager.handle_key(key) == ConversationAction::Exit {
                        break;
                    }
                }
                Some(TuiEvent::Resize(width, height)) => {
                    tracing::debug!(width, height, "terminal resized");
                }
                None => break,
            },
            _ = tick.tick() => {}
        }
    }

    tracing::info!("leaving interactive session");
    Ok(())
}
