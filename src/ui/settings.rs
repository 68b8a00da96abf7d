//! Settings view: reminder time, theme, journal export.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

use crate::app::App;
use crate::ui::{accent, muted};

#[derive(Debug, Clone, Default)]
pub struct SettingsView {
    /// Reminder time being edited, "HH:MM".
    pub time_input: String,
}

impl SettingsView {
    pub fn new(current: Option<&str>) -> Self {
        Self {
            time_input: current.unwrap_or("20:00").to_string(),
        }
    }

    pub fn push_char(&mut self, c: char) {
        if self.time_input.len() < 5 && (c.is_ascii_digit() || c == ':') {
            self.time_input.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        self.time_input.pop();
    }
}

pub fn render(frame: &mut Frame, app: &mut App, area: Rect) {
    let App {
        settings_view,
        prefs,
        config,
        ..
    } = app;
    let Some(view) = settings_view.as_ref() else {
        return;
    };
    let theme = prefs.theme;

    let saved_reminder = prefs
        .reminder_time
        .as_deref()
        .unwrap_or("none");

    let lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Reminder time  ", Style::default().fg(muted(theme))),
            Span::styled(
                format!("{}\u{2588}", view.time_input),
                Style::default().fg(accent(theme)),
            ),
            Span::styled(
                format!("   (saved: {saved_reminder})"),
                Style::default().fg(muted(theme)),
            ),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Theme          ", Style::default().fg(muted(theme))),
            Span::raw(prefs.theme.as_str()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Export dir     ", Style::default().fg(muted(theme))),
            Span::raw(config.export.dir.display().to_string()),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "  Ctrl-s save reminder · c clear reminder · t toggle theme",
            Style::default().fg(muted(theme)),
        )),
        Line::from(Span::styled(
            "  e export journal as CSV · j export as JSON",
            Style::default().fg(muted(theme)),
        )),
    ];

    let card = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent(theme)))
            .title(" Settings "),
    );
    frame.render_widget(card, area);
}
