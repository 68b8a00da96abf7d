//! Daily note editor: one free-text note per local day.

use anyhow::Result;
use chrono::{Duration, Local, NaiveDate};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::app::App;
use crate::db::Database;
use crate::ui::{accent, muted};

pub struct NotesView {
    pub day: NaiveDate,
    pub text: String,
    /// Text differs from what is stored for `day`.
    pub dirty: bool,
}

impl NotesView {
    pub fn new(db: &Database) -> Self {
        let mut view = Self {
            day: Local::now().date_naive(),
            text: String::new(),
            dirty: false,
        };
        view.load(db);
        view
    }

    pub fn load(&mut self, db: &Database) {
        self.text = db
            .get_note(self.day)
            .ok()
            .flatten()
            .map(|n| n.text)
            .unwrap_or_default();
        self.dirty = false;
    }

    pub fn change_day(&mut self, days: i64, db: &Database) {
        self.day = self.day + Duration::days(days);
        self.load(db);
    }

    pub fn push_char(&mut self, c: char) {
        self.text.push(c);
        self.dirty = true;
    }

    pub fn pop_char(&mut self) {
        self.text.pop();
        self.dirty = true;
    }

    /// Save the note; empty text is not persisted (matches the absent-note
    /// model: no empty notes exist).
    pub fn save(&mut self, db: &Database) -> Result<bool> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            return Ok(false);
        }
        db.upsert_note(self.day, trimmed)?;
        self.dirty = false;
        Ok(true)
    }

    pub fn delete(&mut self, db: &Database) -> Result<()> {
        db.delete_note(self.day)?;
        self.text.clear();
        self.dirty = false;
        Ok(())
    }
}

pub fn render(frame: &mut Frame, app: &mut App, area: Rect) {
    let App {
        notes_view, prefs, ..
    } = app;
    let Some(view) = notes_view.as_ref() else {
        return;
    };
    let theme = prefs.theme;

    let today = Local::now().date_naive();
    let day_label = if view.day == today {
        format!("{} (today)", view.day.format("%A, %Y-%m-%d"))
    } else {
        view.day.format("%A, %Y-%m-%d").to_string()
    };
    let dirty_marker = if view.dirty { " *" } else { "" };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(4)])
        .split(area);

    frame.render_widget(
        Paragraph::new(format!(" {day_label}{dirty_marker}"))
            .style(Style::default().fg(accent(theme)).add_modifier(Modifier::BOLD)),
        chunks[0],
    );

    let body: Text = if view.text.is_empty() {
        Text::styled(
            "No note for this day. Start typing...",
            Style::default().fg(muted(theme)),
        )
    } else {
        // Trailing cursor marker on the last line
        Text::from(format!("{}\u{2588}", view.text))
    };

    let editor = Paragraph::new(body)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" Note "));
    frame.render_widget(editor, chunks[1]);
}
