pub mod calendar;
pub mod capture;
pub mod dialogs;
pub mod gallery;
pub mod home;
pub mod notes;
pub mod photo_cache;
pub mod settings;
pub mod status_bar;
pub mod timelapse;

use ratatui::prelude::*;

use crate::app::{App, AppMode};
use crate::prefs::Theme;

/// Accent color for borders and highlights.
pub fn accent(theme: Theme) -> Color {
    match theme {
        Theme::Dark => Color::Cyan,
        Theme::Light => Color::Blue,
    }
}

/// De-emphasized text.
pub fn muted(theme: Theme) -> Color {
    match theme {
        Theme::Dark => Color::DarkGray,
        Theme::Light => Color::Gray,
    }
}

pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // Main layout: content area + status bar
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    match app.mode {
        AppMode::Home | AppMode::Help => home::render(frame, app, main_chunks[0]),
        AppMode::Calendar => calendar::render(frame, app, main_chunks[0]),
        AppMode::Gallery => gallery::render(frame, app, main_chunks[0]),
        AppMode::Timelapse => timelapse::render(frame, app, main_chunks[0]),
        AppMode::Notes => notes::render(frame, app, main_chunks[0]),
        AppMode::Capture => capture::render(frame, app, main_chunks[0]),
        AppMode::Settings => settings::render(frame, app, main_chunks[0]),
    }

    status_bar::render(frame, app, main_chunks[1]);

    if app.mode == AppMode::Help {
        dialogs::render_help(frame, area);
    }

    if let Some(ref dialog) = app.confirm_dialog {
        dialogs::render_confirm(frame, dialog, area);
    }
}
