//! Help overlay and the delete confirmation dialog.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

/// What a confirmed dialog should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    DeletePhoto { id: String },
    DeleteNote { day: chrono::NaiveDate },
}

#[derive(Debug, Clone)]
pub struct ConfirmDialog {
    pub message: String,
    pub action: ConfirmAction,
}

pub fn render_confirm(frame: &mut Frame, dialog: &ConfirmDialog, area: Rect) {
    let width = 46.min(area.width.saturating_sub(4));
    let height = 5;
    let dialog_area = centered_rect(area, width, height);

    frame.render_widget(Clear, dialog_area);

    let lines = vec![
        Line::from(dialog.message.clone()),
        Line::from(""),
        Line::from(Span::styled(
            "y: confirm   n/Esc: cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(" Confirm "),
    );
    frame.render_widget(paragraph, dialog_area);
}

pub fn render_help(frame: &mut Frame, area: Rect) {
    let width = 52.min(area.width.saturating_sub(4));
    let height = 18.min(area.height.saturating_sub(2));
    let dialog_area = centered_rect(area, width, height);

    frame.render_widget(Clear, dialog_area);

    let help_text = vec![
        Line::from(Span::styled(
            "Fitlapse",
            Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan),
        )),
        Line::from(""),
        Line::from("  c              Calendar"),
        Line::from("  g              Gallery"),
        Line::from("  t              Timelapse"),
        Line::from("  n              Daily note"),
        Line::from("  p              Camera (capture)"),
        Line::from("  i              Import a photo"),
        Line::from("  s              Settings"),
        Line::from("  Left/Right     Comparison split (home)"),
        Line::from("  r              Reload photos"),
        Line::from("  Esc            Back to home"),
        Line::from("  q              Quit"),
        Line::from("  ?              Toggle this help"),
    ];

    let paragraph = Paragraph::new(help_text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Help "),
    );
    frame.render_widget(paragraph, dialog_area);
}

pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
