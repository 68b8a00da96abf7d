//! Timelapse view: range selection plus the frame player.

use chrono::{Duration, Local, NaiveDate};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};
use ratatui_image::{Resize, StatefulImage};

use crate::app::App;
use crate::db::{Database, PhotoEntry, Timeline};
use crate::stats::day_bucket;
use crate::timelapse::{Player, RangeBounds, RangePreset, RangeSelector};
use crate::ui::{accent, muted};

pub struct TimelapseView {
    pub selector: RangeSelector,
    pub player: Player,
    /// Ids of the photos in the active range, ascending. Kept materialized
    /// so a range change is detected and resets the player.
    pub range_ids: Vec<String>,
    pub show_note: bool,
    note_cache: Option<(NaiveDate, Option<String>)>,
}

impl TimelapseView {
    pub fn new(timeline: &Timeline) -> Self {
        let mut view = Self {
            selector: RangeSelector::new(),
            player: Player::new(0),
            range_ids: Vec::new(),
            show_note: true,
            note_cache: None,
        };
        view.refresh_range(timeline);
        view
    }

    /// Re-resolve the range; when it changed, the player restarts from the
    /// first frame and resumes playing.
    pub fn refresh_range(&mut self, timeline: &Timeline) {
        let ids: Vec<String> = self
            .selector
            .select(timeline.ascending())
            .iter()
            .map(|p| p.id.clone())
            .collect();
        if ids != self.range_ids {
            self.range_ids = ids;
            self.player.reset(self.range_ids.len());
        }
    }

    pub fn current_photo<'a>(&self, timeline: &'a Timeline) -> Option<&'a PhotoEntry> {
        let id = self.range_ids.get(self.player.index())?;
        timeline.get(id)
    }

    /// Effective date bounds of the current range, for manual adjustment.
    fn effective_date_bounds(&self, timeline: &Timeline) -> Option<(NaiveDate, NaiveDate)> {
        if let Some(RangeBounds::Date { from, to }) = self.selector.bounds() {
            let (from, to) = if from > to { (*to, *from) } else { (*from, *to) };
            return Some((from, to));
        }
        let range = self.selector.select(timeline.ascending());
        let first = range.first()?;
        let last = range.last()?;
        Some((day_bucket(first.captured_at), day_bucket(last.captured_at)))
    }

    pub fn shift_from(&mut self, days: i64, timeline: &Timeline) {
        if let Some((from, to)) = self.effective_date_bounds(timeline) {
            self.selector.set_date_bounds(from + Duration::days(days), to);
            self.refresh_range(timeline);
        }
    }

    pub fn shift_to(&mut self, days: i64, timeline: &Timeline) {
        if let Some((from, to)) = self.effective_date_bounds(timeline) {
            self.selector.set_date_bounds(from, to + Duration::days(days));
            self.refresh_range(timeline);
        }
    }

    /// Photo-mode: make the current frame the range start.
    pub fn mark_start_here(&mut self, timeline: &Timeline) {
        let Some(current) = self.current_photo(timeline).map(|p| p.id.clone()) else {
            return;
        };
        let end = match self.selector.bounds() {
            Some(RangeBounds::Photos { end, .. }) => end.clone(),
            _ => match timeline.latest() {
                Some(p) => p.id.clone(),
                None => return,
            },
        };
        self.selector.set_photo_bounds(current, end);
        self.refresh_range(timeline);
    }

    /// Photo-mode: make the current frame the range end.
    pub fn mark_end_here(&mut self, timeline: &Timeline) {
        let Some(current) = self.current_photo(timeline).map(|p| p.id.clone()) else {
            return;
        };
        let start = match self.selector.bounds() {
            Some(RangeBounds::Photos { start, .. }) => start.clone(),
            _ => match timeline.first() {
                Some(p) => p.id.clone(),
                None => return,
            },
        };
        self.selector.set_photo_bounds(start, current);
        self.refresh_range(timeline);
    }

    fn note_for(&mut self, db: &Database, day: NaiveDate) -> Option<String> {
        if let Some((cached_day, ref text)) = self.note_cache {
            if cached_day == day {
                return text.clone();
            }
        }
        let text = db
            .get_note(day)
            .ok()
            .flatten()
            .map(|n| n.text)
            .filter(|t| !t.trim().is_empty());
        self.note_cache = Some((day, text.clone()));
        text
    }

    /// Invalidate the cached note (e.g. after editing notes).
    pub fn invalidate_note(&mut self) {
        self.note_cache = None;
    }
}

fn preset_span(label: &str, active: bool, theme: crate::prefs::Theme) -> Span<'static> {
    let style = if active {
        Style::default()
            .fg(accent(theme))
            .add_modifier(Modifier::REVERSED)
    } else {
        Style::default().fg(muted(theme))
    };
    Span::styled(format!("[{label}]"), style)
}

pub fn render(frame: &mut Frame, app: &mut App, area: Rect) {
    let App {
        timeline,
        photo_cache,
        timelapse_view,
        prefs,
        db,
        ..
    } = app;
    let Some(view) = timelapse_view.as_mut() else {
        return;
    };
    let theme = prefs.theme;

    if view.range_ids.is_empty() {
        let message = if timeline.is_empty() {
            "No photos yet."
        } else {
            "No photos in the selected range."
        };
        let empty = Paragraph::new(message)
            .alignment(Alignment::Center)
            .style(Style::default().fg(muted(theme)))
            .block(Block::default().borders(Borders::ALL).title(" Timelapse "));
        frame.render_widget(empty, area);
        return;
    }

    let today = Local::now().date_naive();
    let current_day = view.current_photo(timeline).map(|p| day_bucket(p.captured_at));
    let is_today_frame = current_day == Some(today);
    let show_note_box = view.show_note && is_today_frame;

    let mut constraints = vec![Constraint::Min(6), Constraint::Length(1), Constraint::Length(2)];
    if show_note_box {
        constraints.push(Constraint::Length(4));
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    // Frame pane
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent(theme)))
        .title(" Timelapse ");
    let inner = block.inner(chunks[0]);
    frame.render_widget(block, chunks[0]);

    if let Some(photo) = view.current_photo(timeline) {
        if let Some(protocol) = photo_cache.protocol(photo, 1024) {
            let image = StatefulImage::new(None).resize(Resize::Fit(None));
            frame.render_stateful_widget(image, inner, protocol);
        } else {
            frame.render_widget(
                Paragraph::new("Loading...")
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(muted(theme))),
                inner,
            );
        }
    }

    // Progress line
    let play_status = if view.player.playing() { "▶" } else { "⏸" };
    let date_label = current_day
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    let progress = format!(
        " {play_status} {}/{} · {date_label} · {} ms/frame",
        view.player.index() + 1,
        view.player.len(),
        view.player.frame_delay_ms(),
    );
    frame.render_widget(
        Paragraph::new(progress).style(Style::default().fg(accent(theme))),
        chunks[1],
    );

    // Presets and bounds
    let preset = view.selector.active_preset();
    let presets_line = Line::from(vec![
        Span::raw(" Presets: "),
        preset_span("7 days", preset == Some(RangePreset::LastDays(7)), theme),
        Span::raw(" "),
        preset_span("30 days", preset == Some(RangePreset::LastDays(30)), theme),
        Span::raw(" "),
        preset_span("all", preset == Some(RangePreset::All), theme),
    ]);
    let bounds_line = match view.selector.bounds() {
        Some(RangeBounds::Date { from, to }) => {
            Line::from(format!(" Range: {from} → {to} (by date)"))
        }
        Some(RangeBounds::Photos { .. }) => {
            Line::from(format!(" Range: {} photos (by photo)", view.range_ids.len()))
        }
        None => Line::from(" Range: everything"),
    };
    frame.render_widget(
        Paragraph::new(vec![presets_line, bounds_line]).style(Style::default().fg(muted(theme))),
        chunks[2],
    );

    // Today's note under today's frame
    if show_note_box {
        let note_text = view
            .note_for(db, today)
            .unwrap_or_else(|| "No note for this day.".to_string());
        let note = Paragraph::new(note_text)
            .block(Block::default().borders(Borders::ALL).title(" Note "))
            .style(Style::default().fg(muted(theme)));
        frame.render_widget(note, chunks[3]);
    }
}
