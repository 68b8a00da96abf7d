//! Calendar heat-map: one month at a time, days with photos highlighted.
//!
//! The day lookup uses the newest photo per local day, matching the gallery
//! ordering: iterating newest-first, the first photo seen for a day wins.

use chrono::{Datelike, Duration, Local, NaiveDate};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};
use ratatui_image::{Resize, StatefulImage};
use std::collections::HashMap;

use crate::app::App;
use crate::db::{PhotoEntry, Timeline};
use crate::stats::day_bucket;
use crate::ui::{accent, muted};

#[derive(Debug, Clone)]
pub struct CalendarView {
    /// First day of the displayed month.
    pub month: NaiveDate,
    pub selected: NaiveDate,
}

impl CalendarView {
    pub fn new() -> Self {
        let today = Local::now().date_naive();
        Self {
            month: today.with_day(1).unwrap_or(today),
            selected: today,
        }
    }

    pub fn prev_month(&mut self) {
        let prev_last = self.month - Duration::days(1);
        self.month = prev_last.with_day(1).unwrap_or(prev_last);
        self.clamp_selected();
    }

    pub fn next_month(&mut self) {
        let next = self.month + Duration::days(32);
        self.month = next.with_day(1).unwrap_or(next);
        self.clamp_selected();
    }

    pub fn move_selected(&mut self, days: i64) {
        self.selected = self.selected + Duration::days(days);
        let month_of = self.selected.with_day(1).unwrap_or(self.selected);
        if month_of != self.month {
            self.month = month_of;
        }
    }

    fn clamp_selected(&mut self) {
        if self.selected.with_day(1) != Some(self.month) {
            self.selected = self.month;
        }
    }

    fn days_in_month(&self) -> u32 {
        let next = self.month + Duration::days(32);
        let next_first = next.with_day(1).unwrap_or(next);
        (next_first - self.month).num_days() as u32
    }
}

/// Newest photo per local day, derived from the descending order.
pub fn latest_photo_by_day(timeline: &Timeline) -> HashMap<NaiveDate, &PhotoEntry> {
    let mut map = HashMap::new();
    for photo in timeline.descending() {
        map.entry(day_bucket(photo.captured_at)).or_insert(photo);
    }
    map
}

pub fn render(frame: &mut Frame, app: &mut App, area: Rect) {
    let App {
        timeline,
        photo_cache,
        calendar_view,
        prefs,
        db,
        ..
    } = app;
    let Some(view) = calendar_view.as_ref() else {
        return;
    };
    let theme = prefs.theme;

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let by_day = latest_photo_by_day(timeline);
    render_month_grid(frame, view, &by_day, theme, cols[0]);

    // Detail pane for the selected day
    let detail_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent(theme)))
        .title(format!(" {} ", view.selected.format("%A, %Y-%m-%d")));
    let inner = detail_block.inner(cols[1]);
    frame.render_widget(detail_block, cols[1]);

    let note = db.get_note(view.selected).ok().flatten();

    match by_day.get(&view.selected) {
        Some(photo) => {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(4), Constraint::Length(3)])
                .split(inner);

            if let Some(protocol) = photo_cache.protocol(photo, 512) {
                let image = StatefulImage::new(None).resize(Resize::Fit(None));
                frame.render_stateful_widget(image, rows[0], protocol);
            } else {
                frame.render_widget(
                    Paragraph::new("Loading...")
                        .alignment(Alignment::Center)
                        .style(Style::default().fg(muted(theme))),
                    rows[0],
                );
            }

            let note_line = match note {
                Some(n) => format!("Note: {}", n.text.lines().next().unwrap_or("")),
                None => "No note for this day (n to write one)".to_string(),
            };
            frame.render_widget(
                Paragraph::new(vec![
                    Line::from(note_line),
                    Line::from(Span::styled(
                        "d: delete this day's photo",
                        Style::default().fg(muted(theme)),
                    )),
                ]),
                rows[1],
            );
        }
        None => {
            let mut lines = vec![Line::from("No photo on this day.")];
            if let Some(n) = note {
                lines.push(Line::from(format!(
                    "Note: {}",
                    n.text.lines().next().unwrap_or("")
                )));
            }
            frame.render_widget(
                Paragraph::new(lines).style(Style::default().fg(muted(theme))),
                inner,
            );
        }
    }
}

fn render_month_grid(
    frame: &mut Frame,
    view: &CalendarView,
    by_day: &HashMap<NaiveDate, &PhotoEntry>,
    theme: crate::prefs::Theme,
    area: Rect,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", view.month.format("%B %Y")));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height < 8 || inner.width < 21 {
        return;
    }

    let cell_w = inner.width / 7;
    let cell_h = ((inner.height - 1) / 6).max(1);
    let today = Local::now().date_naive();

    // Weekday header, Sunday first
    for (i, name) in ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"].iter().enumerate() {
        let x = inner.x + i as u16 * cell_w;
        let rect = Rect::new(x, inner.y, cell_w, 1);
        frame.render_widget(
            Paragraph::new(*name)
                .alignment(Alignment::Center)
                .style(Style::default().fg(muted(theme))),
            rect,
        );
    }

    let offset = view.month.weekday().num_days_from_sunday();
    for day_num in 1..=view.days_in_month() {
        let Some(date) = view.month.with_day(day_num) else {
            continue;
        };
        let slot = offset + day_num - 1;
        let row = slot / 7;
        let col = slot % 7;

        let x = inner.x + col as u16 * cell_w;
        let y = inner.y + 1 + row as u16 * cell_h;
        if y + cell_h > inner.y + inner.height {
            continue;
        }
        let rect = Rect::new(x, y, cell_w, cell_h);

        let has_photo = by_day.contains_key(&date);
        let mut style = Style::default();
        if has_photo {
            style = style.bg(Color::Green).fg(Color::Black);
        }
        if date == today {
            style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
        }
        if date == view.selected {
            style = style.add_modifier(Modifier::REVERSED);
        }

        frame.render_widget(
            Paragraph::new(format!("{day_num}"))
                .alignment(Alignment::Center)
                .style(style),
            rect,
        );
    }
}
