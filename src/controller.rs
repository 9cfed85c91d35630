use std::time::Duration;

use ratatui::crossterm::event::{self, Event, KeyCode, KeyEventKind};
use tracing::trace;

use crate::domain::{Message, TabvConfig, TabvError};
use crate::model::Model;

/// Polls the terminal and maps events to [`Message`]s. While the model is
/// reading a command line, every key press is passed through raw.
pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &TabvConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, TabvError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    return Ok(self.handle_key(model, key));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn handle_key(&self, model: &Model, key: event::KeyEvent) -> Option<Message> {
        if model.raw_keyevents() {
            return Some(Message::RawKey(key));
        }
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Esc => Some(Message::Exit),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::MoveUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::MoveDown),
            KeyCode::Left | KeyCode::Char('h') => Some(Message::MoveLeft),
            KeyCode::Right | KeyCode::Char('l') => Some(Message::MoveRight),
            KeyCode::PageDown | KeyCode::Char('n') => Some(Message::NextPage),
            KeyCode::PageUp | KeyCode::Char('p') => Some(Message::PrevPage),
            KeyCode::Home => Some(Message::FirstPage),
            KeyCode::End => Some(Message::LastPage),
            KeyCode::Tab => Some(Message::NextTab),
            KeyCode::BackTab => Some(Message::PrevTab),
            KeyCode::Char('/') => Some(Message::Search),
            KeyCode::Char('f') => Some(Message::FilterColumn),
            KeyCode::Char('c') => Some(Message::ClearFilters),
            KeyCode::Char('s') => Some(Message::SortColumn),
            KeyCode::Char('g') => Some(Message::GoToPage),
            KeyCode::Char('z') => Some(Message::PageSize),
            KeyCode::Char('e') => Some(Message::Export),
            KeyCode::Char('y') => Some(Message::CopyCell),
            KeyCode::Char('Y') => Some(Message::CopyRow),
            KeyCode::Char('<') => Some(Message::MoveColumnLeft),
            KeyCode::Char('>') => Some(Message::MoveColumnRight),
            _ => None,
        };
        trace!("mapped {key:?} => {message:?}");
        message
    }
}
