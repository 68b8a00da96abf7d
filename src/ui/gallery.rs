//! Gallery: newest-first photo list grouped by day, with a preview pane.

use chrono::Local;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use ratatui_image::{Resize, StatefulImage};

use crate::app::App;
use crate::stats::day_bucket;
use crate::ui::{accent, muted};

#[derive(Debug, Clone, Default)]
pub struct GalleryView {
    /// Index into the descending photo order.
    pub selected: usize,
}

impl GalleryView {
    pub fn select_next(&mut self, len: usize) {
        if len > 0 && self.selected + 1 < len {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn clamp(&mut self, len: usize) {
        if len == 0 {
            self.selected = 0;
        } else {
            self.selected = self.selected.min(len - 1);
        }
    }
}

pub fn render(frame: &mut Frame, app: &mut App, area: Rect) {
    let App {
        timeline,
        photo_cache,
        gallery_view,
        prefs,
        ..
    } = app;
    let Some(view) = gallery_view.as_mut() else {
        return;
    };
    let theme = prefs.theme;

    let photos: Vec<_> = timeline.descending().collect();
    view.clamp(photos.len());

    if photos.is_empty() {
        let empty = Paragraph::new("No photos yet. Take one (p) or import (i).")
            .alignment(Alignment::Center)
            .style(Style::default().fg(muted(theme)))
            .block(Block::default().borders(Borders::ALL).title(" Gallery "));
        frame.render_widget(empty, area);
        return;
    }

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    // Day-grouped list: the day label appears on the first (newest) photo
    // of each day.
    let mut items = Vec::with_capacity(photos.len());
    let mut last_day = None;
    for photo in &photos {
        let local = photo.captured_at.with_timezone(&Local);
        let day = day_bucket(photo.captured_at);
        let day_label = if last_day != Some(day) {
            last_day = Some(day);
            format!("{} ", day.format("%Y-%m-%d"))
        } else {
            "           ".to_string()
        };
        items.push(ListItem::new(Line::from(vec![
            Span::styled(day_label, Style::default().fg(accent(theme))),
            Span::raw(local.format("%H:%M").to_string()),
            Span::styled(
                format!("  {}", photo.mime),
                Style::default().fg(muted(theme)),
            ),
        ])));
    }

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(" Gallery "))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default();
    state.select(Some(view.selected));
    frame.render_stateful_widget(list, cols[0], &mut state);

    // Preview pane
    let photo = photos[view.selected];
    let local = photo.captured_at.with_timezone(&Local);
    let title = format!(" {} · {:.0} KB ", local.format("%Y-%m-%d %H:%M"), photo.image.len() as f64 / 1024.0);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent(theme)))
        .title(title);
    let inner = block.inner(cols[1]);
    frame.render_widget(block, cols[1]);

    if let Some(protocol) = photo_cache.protocol(photo, 1024) {
        let image = StatefulImage::new(None).resize(Resize::Fit(None));
        frame.render_stateful_widget(image, inner, protocol);
    } else if photo_cache.is_loading(&photo.id) {
        frame.render_widget(
            Paragraph::new("Loading...")
                .alignment(Alignment::Center)
                .style(Style::default().fg(muted(theme))),
            inner,
        );
    }
}
