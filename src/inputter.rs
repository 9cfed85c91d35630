use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Single-line editor for the command line at the bottom of the screen.
/// The cursor is a character position; edits resolve it to a byte offset.
#[derive(Default)]
pub struct Inputter {
    buffer: String,
    cursor: usize,
    finished: bool,
    canceled: bool,
}

#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub cursor: usize,
}

impl Inputter {
    pub fn read(&mut self, key: KeyEvent) -> InputResult {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, KeyModifiers::NONE) => self.finished = true,
            (KeyCode::Esc, KeyModifiers::NONE) => {
                self.clear();
                self.canceled = true;
                self.finished = true;
            }
            (KeyCode::Backspace, KeyModifiers::NONE) => self.backspace(),
            (KeyCode::Left, KeyModifiers::NONE) => self.cursor = self.cursor.saturating_sub(1),
            (KeyCode::Right, KeyModifiers::NONE) => {
                if self.cursor < self.char_count() {
                    self.cursor += 1;
                }
            }
            (KeyCode::Home, KeyModifiers::NONE) => self.cursor = 0,
            (KeyCode::End, KeyModifiers::NONE) => self.cursor = self.char_count(),
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => {
                self.buffer.clear();
                self.cursor = 0;
            }
            (code, _) => {
                if let Some(chr) = code.as_char() {
                    let at = self.byte_pos(self.cursor);
                    self.buffer.insert(at, chr);
                    self.cursor += 1;
                }
            }
        }
        self.get()
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            input: self.buffer.clone(),
            finished: self.finished,
            canceled: self.canceled,
            cursor: self.cursor,
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.finished = false;
        self.canceled = false;
    }

    fn backspace(&mut self) {
        if self.cursor > 0 {
            let at = self.byte_pos(self.cursor - 1);
            self.buffer.remove(at);
            self.cursor -= 1;
        }
    }

    fn char_count(&self) -> usize {
        self.buffer.chars().count()
    }

    fn byte_pos(&self, char_pos: usize) -> usize {
        self.buffer
            .char_indices()
            .nth(char_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.buffer.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(inputter: &mut Inputter, s: &str) -> InputResult {
        let mut last = inputter.get();
        for c in s.chars() {
            last = inputter.read(key(KeyCode::Char(c)));
        }
        last
    }

    #[test]
    fn typing_appends_at_the_cursor() {
        let mut inputter = Inputter::default();
        let result = type_str(&mut inputter, "blue");
        assert_eq!(result.input, "blue");
        assert_eq!(result.cursor, 4);
        assert!(!result.finished);
    }

    #[test]
    fn editing_in_the_middle_respects_char_boundaries() {
        let mut inputter = Inputter::default();
        type_str(&mut inputter, "naïve");
        inputter.read(key(KeyCode::Left));
        inputter.read(key(KeyCode::Left));
        let result = inputter.read(key(KeyCode::Backspace));
        assert_eq!(result.input, "nave");
        let result = type_str(&mut inputter, "ï");
        assert_eq!(result.input, "naïve");
    }

    #[test]
    fn enter_finishes_escape_cancels() {
        let mut inputter = Inputter::default();
        type_str(&mut inputter, "x");
        let result = inputter.read(key(KeyCode::Enter));
        assert!(result.finished && !result.canceled);
        assert_eq!(result.input, "x");

        inputter.clear();
        type_str(&mut inputter, "y");
        let result = inputter.read(key(KeyCode::Esc));
        assert!(result.finished && result.canceled);
        assert_eq!(result.input, "");
    }

    #[test]
    fn ctrl_u_wipes_the_line() {
        let mut inputter = Inputter::default();
        type_str(&mut inputter, "some text");
        let result = inputter.read(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        assert_eq!(result.input, "");
        assert_eq!(result.cursor, 0);
    }
}
