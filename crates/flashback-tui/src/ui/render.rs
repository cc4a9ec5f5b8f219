use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use flashback_core::view::Face;

use crate::app::{App, AppState};

use super::styles;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Title bar
            Constraint::Length(1), // Stale-data banner
            Constraint::Min(7),    // Card
            Constraint::Length(1), // Position
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    let view = app.view.view();

    render_title_bar(frame, app, chunks[0]);
    if let Some(ref banner) = view.banner {
        let paragraph = Paragraph::new(format!(" {}", banner)).style(styles::banner_style());
        frame.render_widget(paragraph, chunks[1]);
    }
    render_card(frame, &view.text, view.face, chunks[2]);
    frame.render_widget(
        Paragraph::new(view.position.clone())
            .alignment(Alignment::Center)
            .style(styles::muted_style()),
        chunks[3],
    );
    render_status_bar(frame, app, chunks[4]);

    if matches!(app.state, AppState::ShowingHelp) {
        render_help_overlay(frame);
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  Flashback";
    let indicator = match app.online {
        Some(true) => "● Online",
        Some(false) => "● Offline",
        None => "○ Connecting",
    };

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            (area.width as usize).saturating_sub(title.chars().count() + indicator.chars().count() + 2),
        )),
        Span::styled(indicator, styles::online_style(app.online)),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());
    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_card(frame: &mut Frame, text: &str, face: Face, area: Rect) {
    let back = face == Face::Back;
    let block = Block::default()
        .borders(Borders::ALL)
        .title(if back { " Back " } else { " Front " })
        .border_style(styles::card_border_style(back));

    let inner_height = area.height.saturating_sub(2) as usize;
    let mut lines: Vec<Line> = vec![Line::raw(""); inner_height.saturating_sub(1) / 2];
    lines.push(Line::styled(text.to_string(), styles::card_text_style()));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shuffle = if app.view.state().shuffle { "shuffle on" } else { "shuffle off" };
    let text = match app.status_message {
        Some(ref message) => format!(" {} | {}", shuffle, message),
        None => format!(" {} | ←/→ move  space flip  s shuffle  r reload  ? help  q quit", shuffle),
    };
    frame.render_widget(Paragraph::new(text).style(styles::status_bar_style()), area);
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect(50, 60, frame.area());
    frame.render_widget(Clear, area);

    let bindings = [
        ("→ l n / swipe left", "Next card"),
        ("← h p / swipe right", "Previous card"),
        ("space enter f / click", "Flip card"),
        ("s", "Toggle shuffle"),
        ("r", "Reload deck"),
        ("?", "Toggle help"),
        ("q esc", "Quit"),
    ];
    let lines: Vec<Line> = bindings
        .iter()
        .map(|(keys, desc)| {
            Line::from(vec![
                Span::styled(format!("{:>24}  ", keys), styles::help_key_style()),
                Span::styled(*desc, styles::help_desc_style()),
            ])
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Help ")
        .border_style(styles::title_style());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
