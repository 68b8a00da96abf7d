use anyhow::Result;
use chrono::Local;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::prelude::*;
use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::capture::{DetectorBackend, FolderCamera, TickOutcome};
use crate::config::Config;
use crate::db::{Database, Timeline};
use crate::export::{export_journal, ExportFormat};
use crate::import;
use crate::prefs::{is_valid_time, Preferences};
use crate::stats::{compute_stats, Stats};
use crate::ui;
use crate::ui::calendar::{latest_photo_by_day, CalendarView};
use crate::ui::capture::CaptureView;
use crate::ui::dialogs::{ConfirmAction, ConfirmDialog};
use crate::ui::gallery::GalleryView;
use crate::ui::home::HomeView;
use crate::ui::notes::NotesView;
use crate::ui::photo_cache::PhotoCache;
use crate::ui::settings::SettingsView;
use crate::ui::timelapse::TimelapseView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Home,
    Calendar,
    Gallery,
    Timelapse,
    Notes,
    Capture,
    Settings,
    Help,
}

pub struct App {
    pub config: Config,
    pub prefs: Preferences,
    pub db: Database,
    pub mode: AppMode,
    pub should_quit: bool,
    pub status_message: Option<String>,

    /// Current photo collection; reloaded from the store on every visible
    /// change, never mutated in place.
    pub timeline: Timeline,
    pub stats: Stats,
    pub photo_cache: PhotoCache,
    camera: FolderCamera,

    pub home_view: HomeView,
    pub calendar_view: Option<CalendarView>,
    pub gallery_view: Option<GalleryView>,
    pub timelapse_view: Option<TimelapseView>,
    pub notes_view: Option<NotesView>,
    pub capture_view: Option<CaptureView>,
    pub settings_view: Option<SettingsView>,
    pub confirm_dialog: Option<ConfirmDialog>,
}

impl App {
    pub fn new(config: Config, prefs: Preferences, db: Database) -> Result<Self> {
        let photo_cache = PhotoCache::new(config.preview.protocol, config.preview.image_preview);
        let camera = FolderCamera::new(
            config.capture.front_frames_dir.clone(),
            config.capture.rear_frames_dir.clone(),
        );

        let mut app = Self {
            config,
            prefs,
            db,
            mode: AppMode::Home,
            should_quit: false,
            status_message: None,
            timeline: Timeline::default(),
            stats: Stats::default(),
            photo_cache,
            camera,
            home_view: HomeView::default(),
            calendar_view: None,
            gallery_view: None,
            timelapse_view: None,
            notes_view: None,
            capture_view: None,
            settings_view: None,
            confirm_dialog: None,
        };
        app.refresh()?;
        Ok(app)
    }

    /// Reload the photo collection and everything derived from it.
    pub fn refresh(&mut self) -> Result<()> {
        self.timeline = self.db.timeline()?;
        self.stats = compute_stats(self.timeline.ascending());

        let ids: HashSet<String> = self
            .timeline
            .ascending()
            .iter()
            .map(|p| p.id.clone())
            .collect();
        self.photo_cache.retain(&ids);

        if let Some(view) = self.timelapse_view.as_mut() {
            view.refresh_range(&self.timeline);
        }
        if let Some(view) = self.gallery_view.as_mut() {
            view.clamp(self.timeline.len());
        }
        Ok(())
    }

    pub async fn run(&mut self, terminal: &mut Terminal<impl Backend>) -> Result<()> {
        while !self.should_quit {
            terminal.draw(|frame| ui::render(frame, self))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key)?;
                    }
                }
            }

            self.tick()?;
        }
        Ok(())
    }

    fn status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    // ========================================================================
    // Per-iteration ticks
    // ========================================================================

    fn tick(&mut self) -> Result<()> {
        let now = Instant::now();
        match self.mode {
            AppMode::Timelapse => {
                if let Some(view) = self.timelapse_view.as_mut() {
                    view.player.tick(now);
                }
            }
            AppMode::Capture => self.tick_capture(now)?,
            _ => {}
        }
        Ok(())
    }

    fn tick_capture(&mut self, now: Instant) -> Result<()> {
        let Some(view) = self.capture_view.as_mut() else {
            return Ok(());
        };

        let CaptureView {
            session, detector, ..
        } = view;
        let detector = detector.as_mut();
        let outcome = session.tick(now, |frame| {
            detector.map(|d| d.detect(&frame.image).unwrap_or_default())
        });

        if outcome == TickOutcome::Capture {
            self.finish_capture()?;
        }
        Ok(())
    }

    /// Snapshot the current frame and persist it. Storage failure leaves the
    /// session live with the frame retained, so the user can retry.
    fn finish_capture(&mut self) -> Result<()> {
        let snapshot = match self.capture_view.as_mut() {
            Some(view) => view.session.take_snapshot(),
            None => return Ok(()),
        };

        match snapshot {
            Ok(blob) => match self.db.add_photo(blob, "image/jpeg", None) {
                Ok(entry) => {
                    tracing::info!(id = %entry.id, "Photo captured");
                    if let Some(view) = self.capture_view.as_mut() {
                        view.session.saved();
                    }
                    self.leave_capture();
                    self.refresh()?;
                    self.mode = AppMode::Home;
                    self.status("Photo saved.");
                }
                Err(err) => {
                    if let Some(view) = self.capture_view.as_mut() {
                        view.session.save_failed(err.to_string());
                    }
                }
            },
            Err(err) => {
                if let Some(view) = self.capture_view.as_mut() {
                    view.session.capture_failed(&err);
                }
            }
        }
        Ok(())
    }

    fn leave_capture(&mut self) {
        if let Some(mut view) = self.capture_view.take() {
            view.session.teardown();
        }
        self.photo_cache.clear_live();
    }

    // ========================================================================
    // Key handling
    // ========================================================================

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        self.status_message = None;

        // Confirmation dialog captures all input while open
        if self.confirm_dialog.is_some() {
            return self.handle_confirm_key(key);
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return Ok(());
        }

        match self.mode {
            AppMode::Home => self.handle_home_key(key)?,
            AppMode::Help => match key.code {
                KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => {
                    self.mode = AppMode::Home;
                }
                _ => {}
            },
            AppMode::Calendar => self.handle_calendar_key(key)?,
            AppMode::Gallery => self.handle_gallery_key(key)?,
            AppMode::Timelapse => self.handle_timelapse_key(key)?,
            AppMode::Notes => self.handle_notes_key(key)?,
            AppMode::Capture => self.handle_capture_key(key)?,
            AppMode::Settings => self.handle_settings_key(key)?,
        }
        Ok(())
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                if let Some(dialog) = self.confirm_dialog.take() {
                    match dialog.action {
                        ConfirmAction::DeletePhoto { id } => {
                            self.db.delete_photo(&id)?;
                            self.refresh()?;
                            self.status("Photo deleted.");
                        }
                        ConfirmAction::DeleteNote { day } => {
                            self.db.delete_note(day)?;
                            if let Some(view) = self.notes_view.as_mut() {
                                view.load(&self.db);
                            }
                            if let Some(view) = self.timelapse_view.as_mut() {
                                view.invalidate_note();
                            }
                            self.status("Note deleted.");
                        }
                    }
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.confirm_dialog = None;
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_home_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.mode = AppMode::Help,
            KeyCode::Char('r') => {
                self.refresh()?;
                self.status("Reloaded.");
            }
            KeyCode::Left => self.home_view.nudge_left(),
            KeyCode::Right => self.home_view.nudge_right(),
            KeyCode::Char('c') => {
                self.refresh()?;
                self.calendar_view = Some(CalendarView::new());
                self.mode = AppMode::Calendar;
            }
            KeyCode::Char('g') => {
                self.refresh()?;
                self.gallery_view = Some(GalleryView::default());
                self.mode = AppMode::Gallery;
            }
            KeyCode::Char('t') => {
                self.refresh()?;
                self.timelapse_view = Some(TimelapseView::new(&self.timeline));
                self.mode = AppMode::Timelapse;
            }
            KeyCode::Char('n') => {
                self.notes_view = Some(NotesView::new(&self.db));
                self.mode = AppMode::Notes;
            }
            KeyCode::Char('p') => {
                let mut view = CaptureView::new(self.config.capture.alignment.clone());
                view.session.start(&self.camera);
                self.capture_view = Some(view);
                self.mode = AppMode::Capture;
            }
            KeyCode::Char('i') => self.import_latest()?,
            KeyCode::Char('s') => {
                self.settings_view = Some(SettingsView::new(self.prefs.reminder_time.as_deref()));
                self.mode = AppMode::Settings;
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_calendar_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(view) = self.calendar_view.as_mut() else {
            return Ok(());
        };
        match key.code {
            KeyCode::Esc => {
                self.calendar_view = None;
                self.mode = AppMode::Home;
            }
            KeyCode::Left => view.move_selected(-1),
            KeyCode::Right => view.move_selected(1),
            KeyCode::Up => view.move_selected(-7),
            KeyCode::Down => view.move_selected(7),
            KeyCode::Char('[') => view.prev_month(),
            KeyCode::Char(']') => view.next_month(),
            KeyCode::Char('n') => {
                let day = view.selected;
                let mut notes = NotesView::new(&self.db);
                notes.day = day;
                notes.load(&self.db);
                self.notes_view = Some(notes);
                self.mode = AppMode::Notes;
            }
            KeyCode::Char('d') => {
                let day = view.selected;
                let id = latest_photo_by_day(&self.timeline)
                    .get(&day)
                    .map(|p| p.id.clone());
                match id {
                    Some(id) => {
                        self.confirm_dialog = Some(ConfirmDialog {
                            message: format!("Delete the photo for {day}?"),
                            action: ConfirmAction::DeletePhoto { id },
                        });
                    }
                    None => self.status("No photo on this day."),
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_gallery_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(view) = self.gallery_view.as_mut() else {
            return Ok(());
        };
        match key.code {
            KeyCode::Esc => {
                self.gallery_view = None;
                self.mode = AppMode::Home;
            }
            KeyCode::Char('j') | KeyCode::Down => view.select_next(self.timeline.len()),
            KeyCode::Char('k') | KeyCode::Up => view.select_prev(),
            KeyCode::Char('d') => {
                let id = self
                    .timeline
                    .descending()
                    .nth(view.selected)
                    .map(|p| p.id.clone());
                if let Some(id) = id {
                    self.confirm_dialog = Some(ConfirmDialog {
                        message: "Delete this photo?".to_string(),
                        action: ConfirmAction::DeletePhoto { id },
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_timelapse_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(view) = self.timelapse_view.as_mut() else {
            return Ok(());
        };
        match key.code {
            KeyCode::Esc => {
                self.timelapse_view = None;
                self.mode = AppMode::Home;
            }
            KeyCode::Char(' ') => view.player.toggle_play(),
            KeyCode::Char('h') | KeyCode::Left => view.player.prev(),
            KeyCode::Char('l') | KeyCode::Right => view.player.next(),
            KeyCode::Home => view.player.scrub(0),
            KeyCode::End => {
                let last = view.player.len().saturating_sub(1);
                view.player.scrub(last);
            }
            KeyCode::Char('7') => {
                view.selector.apply_last_days(7, self.timeline.ascending());
                view.refresh_range(&self.timeline);
            }
            KeyCode::Char('3') => {
                view.selector.apply_last_days(30, self.timeline.ascending());
                view.refresh_range(&self.timeline);
            }
            KeyCode::Char('a') => {
                view.selector.apply_all(self.timeline.ascending());
                view.refresh_range(&self.timeline);
            }
            KeyCode::Char('f') => view.shift_from(-1, &self.timeline),
            KeyCode::Char('F') => view.shift_from(1, &self.timeline),
            KeyCode::Char('t') => view.shift_to(-1, &self.timeline),
            KeyCode::Char('T') => view.shift_to(1, &self.timeline),
            KeyCode::Char('s') => view.mark_start_here(&self.timeline),
            KeyCode::Char('e') => view.mark_end_here(&self.timeline),
            KeyCode::Char('+') | KeyCode::Char('=') => view.player.slower(),
            KeyCode::Char('-') => view.player.faster(),
            KeyCode::Char('m') => view.show_note = !view.show_note,
            _ => {}
        }
        Ok(())
    }

    fn handle_notes_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(view) = self.notes_view.as_mut() else {
            return Ok(());
        };

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('s') => {
                    let saved = view.save(&self.db)?;
                    if let Some(tl) = self.timelapse_view.as_mut() {
                        tl.invalidate_note();
                    }
                    if saved {
                        self.status("Note saved.");
                    } else {
                        self.status("Nothing to save: the note is empty.");
                    }
                }
                KeyCode::Char('d') => {
                    self.confirm_dialog = Some(ConfirmDialog {
                        message: format!("Delete the note for {}?", view.day),
                        action: ConfirmAction::DeleteNote { day: view.day },
                    });
                }
                _ => {}
            }
            return Ok(());
        }

        match key.code {
            KeyCode::Esc => {
                self.notes_view = None;
                self.mode = AppMode::Home;
            }
            KeyCode::Char('[') => view.change_day(-1, &self.db),
            KeyCode::Char(']') => view.change_day(1, &self.db),
            KeyCode::Backspace => view.pop_char(),
            KeyCode::Enter => view.push_char('\n'),
            KeyCode::Char(c) => view.push_char(c),
            _ => {}
        }
        Ok(())
    }

    fn handle_capture_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.leave_capture();
                self.mode = AppMode::Home;
                return Ok(());
            }
            _ => {}
        }

        let Some(view) = self.capture_view.as_mut() else {
            return Ok(());
        };
        match key.code {
            KeyCode::Char(' ') | KeyCode::Enter => {
                if view.session.request_capture(Instant::now()) == TickOutcome::Capture {
                    self.finish_capture()?;
                }
            }
            KeyCode::Char('a') => {
                if view.session.auto_mode() {
                    view.session.toggle_auto_mode();
                } else if view.ensure_detector() {
                    view.session.toggle_auto_mode();
                    let reduced = view
                        .detector
                        .as_ref()
                        .map(|d| d.backend() == DetectorBackend::Minimal)
                        .unwrap_or(false);
                    if reduced {
                        self.status("Face assist running in reduced mode.");
                    }
                } else {
                    self.status("Face assist unavailable; manual capture still works.");
                }
            }
            KeyCode::Char('d') => view.session.cycle_auto_delay(),
            KeyCode::Char('t') => view.session.cycle_timer(),
            KeyCode::Char('f') => view.session.toggle_facing(&self.camera),
            _ => {}
        }
        Ok(())
    }

    fn handle_settings_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(view) = self.settings_view.as_mut() else {
            return Ok(());
        };

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('s') {
                let input = view.time_input.clone();
                if is_valid_time(&input) {
                    self.prefs.reminder_time = Some(input);
                    self.prefs.save()?;
                    self.status("Reminder saved.");
                } else {
                    self.status("Reminder must be HH:MM.");
                }
            }
            return Ok(());
        }

        match key.code {
            KeyCode::Esc => {
                self.settings_view = None;
                self.mode = AppMode::Home;
            }
            KeyCode::Char('t') => {
                self.prefs.theme = self.prefs.theme.toggled();
                self.prefs.save()?;
            }
            KeyCode::Char('c') => {
                self.prefs.reminder_time = None;
                self.prefs.save()?;
                self.status("Reminder cleared.");
            }
            KeyCode::Char('e') => self.export(ExportFormat::Csv)?,
            KeyCode::Char('j') => self.export(ExportFormat::Json)?,
            KeyCode::Backspace => view.pop_char(),
            KeyCode::Char(c) => view.push_char(c),
            _ => {}
        }
        Ok(())
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Import the newest image file from the configured import directory,
    /// dating it by its EXIF capture time (or file mtime) rather than now.
    fn import_latest(&mut self) -> Result<()> {
        let files = import::list_image_files(&self.config.import.dir);
        let Some(path) = files.first() else {
            self.status(format!(
                "No images found in {}",
                self.config.import.dir.display()
            ));
            return Ok(());
        };

        match import::import_photo(&self.db, path, None) {
            Ok(entry) => {
                self.refresh()?;
                let day = entry.captured_at.with_timezone(&Local).format("%Y-%m-%d");
                self.status(format!("Imported photo, dated {day}."));
            }
            Err(err) => self.status(format!("Import failed: {err}")),
        }
        Ok(())
    }

    fn export(&mut self, format: ExportFormat) -> Result<()> {
        let filename = format!("fitlapse-journal.{}", format.extension());
        let path = self.config.export.dir.join(filename);
        match export_journal(&self.db, &path, format) {
            Ok(rows) => self.status(format!(
                "Exported {rows} days as {} to {}",
                format.name(),
                path.display()
            )),
            Err(err) => self.status(format!("Export failed: {err}")),
        }
        Ok(())
    }
}
