use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use super::centered_rect;

/// Single-line editor for a personal note.
#[derive(Debug, Default)]
pub struct NoteEditor {
    pub text: String,
    /// Cursor position in chars.
    pub cursor: usize,
    /// Title of the item being annotated.
    pub item_title: String,
}

impl NoteEditor {
    pub fn open(item_title: &str, text: &str) -> Self {
        Self {
            text: text.to_string(),
            cursor: text.chars().count(),
            item_title: item_title.to_string(),
        }
    }

    fn byte_index(&self, cursor: usize) -> usize {
        self.text
            .char_indices()
            .nth(cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    pub fn handle_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.text.insert(at, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.text.chars().count() {
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor = self.text.chars().count();
    }
}

pub fn render(frame: &mut Frame, editor: &NoteEditor, area: Rect) {
    let dialog_area = centered_rect(area, 60.min(area.width.saturating_sub(4)), 7);
    frame.render_widget(Clear, dialog_area);

    let (before, after) = editor.text.split_at(editor.byte_index(editor.cursor));
    let mut after_chars = after.chars();
    let under_cursor = after_chars.next().map(String::from).unwrap_or_else(|| " ".to_string());

    let lines = vec![
        Line::from(vec![
            Span::raw(before.to_string()),
            Span::styled(under_cursor, Style::default().add_modifier(Modifier::REVERSED)),
            Span::raw(after_chars.as_str().to_string()),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Enter: save | Esc: cancel | an empty note hides the printed one",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(format!(" Note: {} ", editor.item_title)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, dialog_area);
}
