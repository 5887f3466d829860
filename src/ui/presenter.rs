//! Full-screen presenter for a Sunday program.

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use std::sync::Arc;
use std::time::Duration;

use super::note_editor::{self, NoteEditor};
use crate::library::Library;
use crate::models::{ProgramItem, Speaker};
use crate::program::{LinkedContent, ProgramPresenter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresenterMode {
    #[default]
    Normal,
    Help,
    EditingNote,
}

pub struct PresenterApp {
    pub presenter: ProgramPresenter,
    library: Arc<Library>,
    pub mode: PresenterMode,
    pub editor: NoteEditor,
    /// Linked hymn or reading for the current item.
    pub content: LinkedContent,
    pub status_message: Option<String>,
    pub should_quit: bool,
}

impl PresenterApp {
    pub fn new(presenter: ProgramPresenter, library: Arc<Library>) -> Self {
        let mut app = Self {
            presenter,
            library,
            mode: PresenterMode::default(),
            editor: NoteEditor::default(),
            content: LinkedContent::None,
            status_message: None,
            should_quit: false,
        };
        app.refresh_content();
        app
    }

    fn refresh_content(&mut self) {
        self.content = match self.presenter.linked_content(&self.library) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load linked content");
                self.status_message = Some(format!("Could not load content: {}", e));
                LinkedContent::None
            }
        };
    }

    pub async fn run(&mut self, terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> Result<()> {
        while !self.should_quit {
            terminal.draw(|frame| render(frame, self))?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match self.mode {
            PresenterMode::Help => {
                self.mode = PresenterMode::Normal;
            }
            PresenterMode::EditingNote => self.handle_editor_key(key),
            PresenterMode::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        self.status_message = None;
        let moved = match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.should_quit = true;
                false
            }
            KeyCode::Char('?') => {
                self.mode = PresenterMode::Help;
                false
            }
            KeyCode::Char('l') | KeyCode::Right | KeyCode::Char(' ') => self.presenter.next(),
            KeyCode::Char('h') | KeyCode::Left => self.presenter.prev(),
            KeyCode::Char('g') | KeyCode::Home => self.presenter.first(),
            KeyCode::Char('G') | KeyCode::End => self.presenter.last(),
            KeyCode::Char('e') => {
                self.open_editor();
                false
            }
            KeyCode::Char('d') => {
                match self.presenter.delete_note() {
                    Ok(()) => self.status_message = Some("Personal note removed".to_string()),
                    Err(e) => self.status_message = Some(format!("Could not remove note: {}", e)),
                }
                false
            }
            _ => false,
        };

        if moved {
            self.refresh_content();
        }
    }

    fn open_editor(&mut self) {
        let Some(item) = self.presenter.current_item() else {
            return;
        };
        let title = item.title.display_name();
        let existing = match self.presenter.personal_note() {
            Ok(Some(note)) => note,
            Ok(None) => self.presenter.note().unwrap_or_default().to_string(),
            Err(e) => {
                self.status_message = Some(format!("Could not read note: {}", e));
                return;
            }
        };
        self.editor = NoteEditor::open(title, &existing);
        self.mode = PresenterMode::EditingNote;
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = PresenterMode::Normal;
            }
            KeyCode::Enter => {
                let text = std::mem::take(&mut self.editor.text);
                match self.presenter.save_note(&text) {
                    Ok(()) => self.status_message = Some("Personal note saved".to_string()),
                    Err(e) => self.status_message = Some(format!("Could not save note: {}", e)),
                }
                self.mode = PresenterMode::Normal;
            }
            KeyCode::Backspace => self.editor.backspace(),
            KeyCode::Delete => self.editor.delete(),
            KeyCode::Left => self.editor.move_cursor_left(),
            KeyCode::Right => self.editor.move_cursor_right(),
            KeyCode::Home => self.editor.move_cursor_home(),
            KeyCode::End => self.editor.move_cursor_end(),
            KeyCode::Char(c) => self.editor.handle_char(c),
            _ => {}
        }
    }
}

pub fn render(frame: &mut Frame, app: &PresenterApp) {
    let area = frame.area();
    frame.render_widget(Clear, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Preview strip
            Constraint::Min(6),    // Current item
            Constraint::Length(2), // Status bar
        ])
        .split(area);

    render_preview_strip(frame, app, chunks[0]);
    render_current(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);

    match app.mode {
        PresenterMode::Help => render_help(frame, area),
        PresenterMode::EditingNote => note_editor::render(frame, &app.editor, area),
        PresenterMode::Normal => {}
    }
}

fn item_label(item: Option<&ProgramItem>) -> String {
    item.map(|i| i.title.display_name().to_string()).unwrap_or_default()
}

fn render_preview_strip(frame: &mut Frame, app: &PresenterApp, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(33),
            Constraint::Percentage(34),
            Constraint::Percentage(33),
        ])
        .split(area);

    let panels = [
        (" Previous ", item_label(app.presenter.prev_item()), Color::DarkGray),
        (" Current ", item_label(app.presenter.current_item()), Color::Green),
        (" Next ", item_label(app.presenter.next_item()), Color::Yellow),
    ];

    for ((title, label, color), col) in panels.into_iter().zip(cols.iter()) {
        let paragraph = Paragraph::new(label).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(title),
        );
        frame.render_widget(paragraph, *col);
    }
}

fn speaker_style(speaker: Option<Speaker>) -> Style {
    match speaker {
        Some(Speaker::Leader) => Style::default().fg(Color::Cyan),
        Some(Speaker::People) => Style::default().fg(Color::Green),
        Some(Speaker::All) => Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        None => Style::default(),
    }
}

fn content_lines(item: &ProgramItem, content: &LinkedContent) -> Vec<Line<'static>> {
    let heading = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().fg(Color::DarkGray);
    let mut lines = Vec::new();

    match content {
        LinkedContent::Hymn { hymn, language, lyrics } => {
            let mut title = hymn.display_title().to_string();
            if let Some(page) = hymn.page_number {
                title = format!("{}  (p. {})", title, page);
            }
            lines.push(Line::from(Span::styled(title, heading)));
            if let Some(language) = language {
                lines.push(Line::from(Span::styled(language.name(), dim)));
            }
            lines.push(Line::from(""));
            match lyrics {
                Some(lyrics) => lines.extend(lyrics.lines().map(|l| Line::from(l.to_string()))),
                None => lines.push(Line::from(Span::styled("No lyrics available", dim))),
            }
        }
        LinkedContent::Reading(reading) => {
            lines.push(Line::from(Span::styled(reading.title.clone(), heading)));
            if let Some(source) = &reading.source {
                lines.push(Line::from(Span::styled(source.clone(), dim)));
            }
            lines.push(Line::from(""));
            for line in reading.lines() {
                let mut spans = Vec::new();
                if let Some(speaker) = line.speaker {
                    spans.push(Span::styled(format!("{:>7}: ", speaker.label()), speaker_style(Some(speaker))));
                }
                spans.push(Span::styled(line.text, speaker_style(line.speaker)));
                lines.push(Line::from(spans));
            }
        }
        LinkedContent::Text(text) => {
            lines.extend(text.lines().map(|l| Line::from(l.to_string())));
        }
        LinkedContent::Missing { kind, id } => {
            lines.push(Line::from(Span::styled(
                format!("The linked {} ({}) is no longer in the library", kind, id),
                Style::default().fg(Color::Red),
            )));
        }
        LinkedContent::None => {}
    }

    let extras = [("Usher", &item.usher), ("Special number", &item.special_number)];
    for (label, value) in extras {
        if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                Span::styled(format!("{}: ", label), dim),
                Span::raw(value.to_string()),
            ]));
        }
    }

    lines
}

fn render_current(frame: &mut Frame, app: &PresenterApp, area: Rect) {
    let Some(item) = app.presenter.current_item() else {
        let empty = Paragraph::new("This program has no items.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    };

    let (body_area, note_area) = match app.presenter.note() {
        Some(_) => {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(3), Constraint::Length(4)])
                .split(area);
            (rows[0], Some(rows[1]))
        }
        None => (area, None),
    };

    let body = Paragraph::new(content_lines(item, &app.content))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(format!(" {} ", item.title.display_name()))
                .title_style(Style::default().add_modifier(Modifier::BOLD)),
        );
    frame.render_widget(body, body_area);

    if let (Some(note), Some(note_area)) = (app.presenter.note(), note_area) {
        let paragraph = Paragraph::new(note.to_string()).wrap(Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" Note "),
        );
        frame.render_widget(paragraph, note_area);
    }
}

fn render_status_bar(frame: &mut Frame, app: &PresenterApp, area: Rect) {
    let program = app.presenter.program();
    let progress = if app.presenter.is_empty() {
        "0/0".to_string()
    } else {
        format!("{}/{}", app.presenter.current_index() + 1, app.presenter.len())
    };

    let status_line = match &app.status_message {
        Some(message) => format!(" {} | {} ", progress, message),
        None => format!(
            " {} | {} | {} ",
            progress,
            program.title,
            program.date.format("%B %-d, %Y")
        ),
    };

    let help = "h/l:prev/next | g/G:first/last | e:edit note | d:delete note | ?:help | q:quit";

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    frame.render_widget(Paragraph::new(status_line).style(Style::default().fg(Color::Cyan)), chunks[0]);
    frame.render_widget(Paragraph::new(help).style(Style::default().fg(Color::DarkGray)), chunks[1]);
}

pub fn render_help(frame: &mut Frame, area: Rect) {
    let dialog_area = super::centered_rect(area, 50.min(area.width.saturating_sub(4)), 13.min(area.height.saturating_sub(2)));
    frame.render_widget(Clear, dialog_area);

    let help_text = vec![
        Line::from(Span::styled("Presenter Controls", Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan))),
        Line::from(""),
        Line::from("  h/Left         Previous item"),
        Line::from("  l/Right/Space  Next item"),
        Line::from("  g/Home         First item"),
        Line::from("  G/End          Last item"),
        Line::from("  e              Edit personal note"),
        Line::from("  d              Delete personal note"),
        Line::from("  Esc/q          Exit presenter"),
        Line::from("  ?              Toggle this help"),
    ];

    let paragraph = Paragraph::new(help_text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Presenter Help "),
    );

    frame.render_widget(paragraph, dialog_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ActivityTracker, DEFAULT_CAPACITY};
    use crate::program::NoteStore;
    use crate::store::MemoryStore;
    use crossterm::event::KeyModifiers;
    use ratatui::backend::TestBackend;

    fn app() -> PresenterApp {
        let store = Arc::new(MemoryStore::new());
        let library = Arc::new(Library::new(store.clone()));
        let program = library.program("100").unwrap().unwrap();
        let activity = ActivityTracker::load(store.clone(), DEFAULT_CAPACITY).unwrap();
        let presenter = ProgramPresenter::open(program, NoteStore::new(store), activity);
        PresenterApp::new(presenter, library)
    }

    fn press(app: &mut PresenterApp, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut PresenterApp, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn screen(app: &PresenterApp) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_navigation_keys() {
        let mut app = app();
        press(&mut app, KeyCode::Char('h'));
        assert_eq!(app.presenter.current_index(), 0);
        press(&mut app, KeyCode::Char('l'));
        assert!(matches!(app.content, LinkedContent::Reading(_)));
        press(&mut app, KeyCode::Char('G'));
        assert_eq!(app.presenter.current_index(), app.presenter.len() - 1);
        press(&mut app, KeyCode::Char('g'));
        assert_eq!(app.presenter.current_index(), 0);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_edit_and_delete_note() {
        let mut app = app();
        press(&mut app, KeyCode::Char('e'));
        assert_eq!(app.mode, PresenterMode::EditingNote);
        type_text(&mut app, "Stand");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.mode, PresenterMode::Normal);
        assert_eq!(app.presenter.note(), Some("Stand"));

        // Keys typed while editing do not navigate.
        press(&mut app, KeyCode::Char('e'));
        type_text(&mut app, "l");
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.presenter.current_index(), 0);
        assert_eq!(app.presenter.note(), Some("Stand"));

        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.presenter.note(), None);
    }

    #[test]
    fn test_editor_starts_from_printed_note() {
        let mut app = app();
        app.presenter.go_to(5);
        press(&mut app, KeyCode::Char('e'));
        assert_eq!(app.editor.text, "Pray for missions");
    }

    #[test]
    fn test_render_shows_lyrics_and_note() {
        let mut app = app();
        let text = screen(&app);
        assert!(text.contains("Doxology"));
        assert!(text.contains("Praise God"));
        assert!(text.contains("1/11"));

        app.presenter.go_to(5);
        app.refresh_content();
        assert!(screen(&app).contains("Pray for missions"));

        press(&mut app, KeyCode::Char('?'));
        assert!(screen(&app).contains("Presenter Controls"));
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.mode, PresenterMode::Normal);
    }
}
