//! Home view: streak card, reminder hint, and the before/after comparison.
//!
//! The comparison splits the area into a "Start" pane (oldest photo) and a
//! "Today" pane (newest photo); the split position is draggable with the
//! arrow keys, mirroring a center-reveal slider.

use chrono::Local;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};
use ratatui_image::{Resize, StatefulImage};

use crate::app::App;
use crate::stats::has_photo_on;
use crate::ui::{accent, muted};

const SPLIT_STEP: u16 = 5;

#[derive(Debug, Clone)]
pub struct HomeView {
    /// Comparison split position, percent of width given to "Start".
    pub split: u16,
}

impl Default for HomeView {
    fn default() -> Self {
        Self { split: 50 }
    }
}

impl HomeView {
    pub fn nudge_left(&mut self) {
        self.split = self.split.saturating_sub(SPLIT_STEP).max(10);
    }

    pub fn nudge_right(&mut self) {
        self.split = (self.split + SPLIT_STEP).min(90);
    }
}

pub fn render(frame: &mut Frame, app: &mut App, area: Rect) {
    let today = Local::now().date_naive();
    let has_today_photo = has_photo_on(app.timeline.ascending(), today);
    let show_reminder = app.prefs.reminder_time.is_some() && !has_today_photo;

    let mut constraints = vec![Constraint::Length(4)];
    if show_reminder {
        constraints.push(Constraint::Length(3));
    }
    constraints.push(Constraint::Min(8));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    render_streak_card(frame, app, chunks[0]);

    let mut next = 1;
    if show_reminder {
        let reminder = app.prefs.reminder_time.as_deref().unwrap_or_default();
        let card = Paragraph::new(format!(
            "No photo yet today (reminder set for {reminder}). Press p to take one."
        ))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(" Reminder "));
        frame.render_widget(card, chunks[next]);
        next += 1;
    }

    render_comparison(frame, app, chunks[next]);
}

fn render_streak_card(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.prefs.theme;
    let streak_line = if app.stats.streak == 0 {
        Line::from(Span::styled(
            "No streak yet",
            Style::default().add_modifier(Modifier::BOLD),
        ))
    } else {
        Line::from(vec![
            Span::styled(
                format!("{}", app.stats.streak),
                Style::default()
                    .add_modifier(Modifier::BOLD)
                    .fg(accent(theme)),
            ),
            Span::raw(" day streak"),
        ])
    };

    let lines = vec![
        streak_line,
        Line::from(Span::styled(
            format!("{} days documented in total", app.stats.total_days),
            Style::default().fg(muted(theme)),
        )),
    ];

    let card = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(" Fitlapse "));
    frame.render_widget(card, area);
}

fn render_comparison(frame: &mut Frame, app: &mut App, area: Rect) {
    let App {
        timeline,
        photo_cache,
        home_view,
        prefs,
        ..
    } = app;
    let theme = prefs.theme;

    if timeline.is_empty() {
        let empty = Paragraph::new("No photos yet. Take your first one (p) or import (i).")
            .alignment(Alignment::Center)
            .style(Style::default().fg(muted(theme)))
            .block(Block::default().borders(Borders::ALL).title(" Before / After "));
        frame.render_widget(empty, area);
        return;
    }

    let first = timeline.first();
    let latest = timeline.latest();

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(home_view.split),
            Constraint::Percentage(100 - home_view.split),
        ])
        .split(area);

    for (photo, col, label) in [
        (first, cols[0], "Start"),
        (latest, cols[1], "Today"),
    ] {
        let Some(photo) = photo else { continue };
        let date = photo
            .captured_at
            .with_timezone(&Local)
            .format("%Y-%m-%d")
            .to_string();
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent(theme)))
            .title(format!(" {label} · {date} "));
        let inner = block.inner(col);
        frame.render_widget(block, col);

        if let Some(protocol) = photo_cache.protocol(photo, 1024) {
            let image = StatefulImage::new(None).resize(Resize::Fit(None));
            frame.render_stateful_widget(image, inner, protocol);
        } else {
            let text = if photo_cache.is_available() {
                "Loading..."
            } else {
                "(image preview unavailable in this terminal)"
            };
            let loading = Paragraph::new(text)
                .alignment(Alignment::Center)
                .style(Style::default().fg(muted(theme)));
            frame.render_widget(loading, inner);
        }
    }
}
