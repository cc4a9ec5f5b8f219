use ratatui::style::{Color, Modifier, Style};

// Color palette
pub const PRIMARY: Color = Color::Rgb(56, 189, 248);
pub const ACCENT: Color = Color::Rgb(192, 160, 64);
pub const ERROR: Color = Color::Rgb(248, 113, 113);
pub const MUTED: Color = Color::Rgb(128, 128, 128);
pub const BACK_FACE: Color = Color::Rgb(167, 139, 250);

pub fn title_style() -> Style {
    Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
}

pub fn muted_style() -> Style {
    Style::default().fg(MUTED)
}

pub fn online_style(online: Option<bool>) -> Style {
    match online {
        Some(true) => Style::default().fg(PRIMARY),
        Some(false) => Style::default().fg(ERROR),
        None => muted_style(),
    }
}

pub fn banner_style() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(ACCENT)
        .add_modifier(Modifier::BOLD)
}

pub fn card_border_style(back: bool) -> Style {
    if back {
        Style::default().fg(BACK_FACE)
    } else {
        Style::default().fg(PRIMARY)
    }
}

pub fn card_text_style() -> Style {
    Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
}

pub fn status_bar_style() -> Style {
    Style::default().bg(Color::Rgb(32, 32, 40)).fg(Color::White)
}

pub fn help_key_style() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn help_desc_style() -> Style {
    Style::default().fg(Color::White)
}
