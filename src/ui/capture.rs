//! Capture view: live preview, alignment feedback, countdown overlay.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};
use ratatui_image::{Resize, StatefulImage};

use crate::app::App;
use crate::capture::{
    AlignmentConfig, CaptureSession, FaceDetector, SessionState,
};
use crate::ui::dialogs::centered_rect;
use crate::ui::{accent, muted};

pub struct CaptureView {
    pub session: CaptureSession,
    pub detector: Option<FaceDetector>,
    /// Both detector init attempts failed; auto-align stays off for this
    /// session, manual capture is unaffected.
    pub detector_failed: bool,
}

impl CaptureView {
    pub fn new(alignment: AlignmentConfig) -> Self {
        Self {
            session: CaptureSession::new(alignment),
            detector: None,
            detector_failed: false,
        }
    }

    /// Lazily initialize the face detector. Returns whether it is usable.
    pub fn ensure_detector(&mut self) -> bool {
        if self.detector.is_some() {
            return true;
        }
        if self.detector_failed {
            return false;
        }
        match FaceDetector::init() {
            Ok(detector) => {
                self.detector = Some(detector);
                true
            }
            Err(err) => {
                tracing::error!(error = %err, "Face detector unavailable");
                self.detector_failed = true;
                false
            }
        }
    }
}

pub fn render(frame: &mut Frame, app: &mut App, area: Rect) {
    let App {
        capture_view,
        photo_cache,
        prefs,
        ..
    } = app;
    let Some(view) = capture_view.as_mut() else {
        return;
    };
    let theme = prefs.theme;
    let session = &view.session;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(2),
        ])
        .split(area);

    // Header: state, notices, errors
    let header = if let Some(error) = session.error() {
        Line::from(Span::styled(
            format!(" {error}"),
            Style::default().fg(Color::Red),
        ))
    } else if let Some(notice) = session.notice() {
        Line::from(Span::styled(
            format!(" {notice}"),
            Style::default().fg(Color::Yellow),
        ))
    } else {
        let state_label = match session.state() {
            SessionState::Starting => "Starting camera...",
            SessionState::Live => "Live",
            SessionState::CountingDown(_) => "Get ready...",
            SessionState::Saving => "Saving...",
            SessionState::Failed => "Camera unavailable",
        };
        Line::from(Span::styled(
            format!(" {state_label} · {} camera", session.facing().as_str()),
            Style::default().fg(muted(theme)),
        ))
    };
    frame.render_widget(Paragraph::new(header), chunks[0]);

    // Preview with alignment border
    let border_color = match session.aligned() {
        Some(true) => Color::Green,
        Some(false) => Color::Red,
        None => accent(theme),
    };
    let title = if session.auto_mode() {
        match session.aligned() {
            Some(true) => " ● aligned, hold still ",
            Some(false) => " ○ line your head up with the frame ",
            None => " auto-align on ",
        }
    } else {
        " preview "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);
    let inner = block.inner(chunks[1]);
    frame.render_widget(block, chunks[1]);

    match session.frame() {
        Some(frame_data) => {
            if let Some(protocol) = photo_cache.live_protocol(frame_data) {
                let image = StatefulImage::new(None).resize(Resize::Fit(None));
                frame.render_stateful_widget(image, inner, protocol);
            }
        }
        None => {
            let waiting = match session.state() {
                SessionState::Failed => "Camera could not be started.",
                _ => "Waiting for frames...",
            };
            frame.render_widget(
                Paragraph::new(waiting)
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(muted(theme))),
                inner,
            );
        }
    }

    // Countdown overlay
    if let Some((_, remaining)) = session.countdown_remaining() {
        if remaining > 0 {
            let overlay = centered_rect(inner, 9, 3);
            frame.render_widget(Clear, overlay);
            frame.render_widget(
                Paragraph::new(format!("{remaining}"))
                    .alignment(Alignment::Center)
                    .style(
                        Style::default()
                            .add_modifier(Modifier::BOLD)
                            .fg(Color::White),
                    )
                    .block(Block::default().borders(Borders::ALL)),
                overlay,
            );
        }
    }

    // Mode line
    let timer_label = match session.timer_seconds() {
        0 => "off".to_string(),
        s => format!("{s}s"),
    };
    let delay_label = match session.auto_delay_seconds() {
        0 => "off".to_string(),
        s => format!("{s}s"),
    };
    let auto_label = if session.auto_mode() {
        if view.detector_failed {
            "on (detector unavailable)"
        } else {
            "on"
        }
    } else {
        "off"
    };
    let modes = format!(" auto: {auto_label} · auto-delay: {delay_label} · timer: {timer_label}");
    frame.render_widget(
        Paragraph::new(modes).style(Style::default().fg(muted(theme))),
        chunks[2],
    );
}
