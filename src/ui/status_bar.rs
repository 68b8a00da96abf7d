//! Bottom status bar: key hints, collection stats, transient messages.

use ratatui::{prelude::*, widgets::Paragraph};

use crate::app::{App, AppMode};
use crate::ui::muted;

fn hints(mode: AppMode) -> &'static str {
    match mode {
        AppMode::Home | AppMode::Help => "c:calendar g:gallery t:timelapse n:note p:camera s:settings ?:help q:quit",
        AppMode::Calendar => "arrows:move [/]:month Enter:day d:delete n:note Esc:back",
        AppMode::Gallery => "j/k:select d:delete Esc:back",
        AppMode::Timelapse => "Space:play h/l:step 7/3:presets a:all f/F t/T:bounds s/e:photo-range +/-:speed m:note Esc:back",
        AppMode::Notes => "type text  Ctrl-s:save Ctrl-d:delete [/]:day Esc:back",
        AppMode::Capture => "Space:shoot a:auto d:auto-delay t:timer f:flip Esc:back",
        AppMode::Settings => "digits:reminder Ctrl-s:save c:clear t:theme e:csv j:json Esc:back",
    }
}

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let left = match app.status_message {
        Some(ref msg) => msg.clone(),
        None => hints(app.mode).to_string(),
    };
    let left_style = if app.status_message.is_some() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(muted(app.prefs.theme))
    };

    let right = format!(
        "{} photos · streak {} · {} days ",
        app.timeline.len(),
        app.stats.streak,
        app.stats.total_days
    );

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(right.len() as u16),
        ])
        .split(area);

    frame.render_widget(Paragraph::new(format!(" {left}")).style(left_style), chunks[0]);
    frame.render_widget(
        Paragraph::new(right).style(Style::default().fg(muted(app.prefs.theme))),
        chunks[1],
    );
}
