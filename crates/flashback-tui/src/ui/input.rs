//! Keyboard and mouse input handling.
//!
//! Key presses, clicks and horizontal drags are translated into `Action`s;
//! the app applies them to the viewer.

use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};

use crate::app::{Action, App, AppState};

/// Minimum horizontal drag, in columns, that counts as a swipe.
const SWIPE_THRESHOLD_COLS: i32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Swipe {
    Left,
    Right,
}

/// Classify a drag from `start` to `end` (column, row).
/// Mostly-horizontal drags beyond the threshold are swipes.
pub fn classify_swipe(start: (u16, u16), end: (u16, u16)) -> Option<Swipe> {
    let dx = end.0 as i32 - start.0 as i32;
    let dy = end.1 as i32 - start.1 as i32;
    if dx.abs() > dy.abs() && dx.abs() > SWIPE_THRESHOLD_COLS {
        Some(if dx < 0 { Swipe::Left } else { Swipe::Right })
    } else {
        None
    }
}

pub fn key_action(state: AppState, key: KeyEvent) -> Option<Action> {
    if state == AppState::ShowingHelp {
        return matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q'))
            .then_some(Action::ToggleHelp);
    }

    match key.code {
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('n') => Some(Action::Next),
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('p') => Some(Action::Prev),
        KeyCode::Char(' ') | KeyCode::Enter | KeyCode::Char('f') => Some(Action::Flip),
        KeyCode::Char('s') => Some(Action::ToggleShuffle),
        KeyCode::Char('r') => Some(Action::Reload),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        _ => None,
    }
}

/// Tracks a mouse press so the release can be classified.
#[derive(Debug, Default)]
pub struct MouseTracker {
    pressed_at: Option<(u16, u16)>,
}

impl MouseTracker {
    /// A press followed by a release in place is a click (flip); a release
    /// far enough sideways is a swipe (left = next, right = previous).
    pub fn action(&mut self, event: MouseEvent) -> Option<Action> {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.pressed_at = Some((event.column, event.row));
                None
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let start = self.pressed_at.take()?;
                let end = (event.column, event.row);
                match classify_swipe(start, end) {
                    Some(Swipe::Left) => Some(Action::Next),
                    Some(Swipe::Right) => Some(Action::Prev),
                    None if start == end => Some(Action::Flip),
                    None => None,
                }
            }
            _ => None,
        }
    }
}

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if let Some(action) = key_action(app.state, key) {
        app.apply(action);
    }
    matches!(app.state, AppState::Quitting)
}

pub fn handle_mouse(app: &mut App, tracker: &mut MouseTracker, event: MouseEvent) {
    if app.state != AppState::Normal {
        return;
    }
    if let Some(action) = tracker.action(event) {
        app.apply(action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn test_classify_swipe() {
        assert_eq!(classify_swipe((20, 5), (10, 6)), Some(Swipe::Left));
        assert_eq!(classify_swipe((10, 5), (20, 5)), Some(Swipe::Right));
        // Below threshold
        assert_eq!(classify_swipe((10, 5), (15, 5)), None);
        // Mostly vertical
        assert_eq!(classify_swipe((10, 0), (18, 20)), None);
    }

    #[test]
    fn test_key_action_normal() {
        assert_eq!(key_action(AppState::Normal, key(KeyCode::Right)), Some(Action::Next));
        assert_eq!(key_action(AppState::Normal, key(KeyCode::Char('h'))), Some(Action::Prev));
        assert_eq!(key_action(AppState::Normal, key(KeyCode::Char(' '))), Some(Action::Flip));
        assert_eq!(key_action(AppState::Normal, key(KeyCode::Char('s'))), Some(Action::ToggleShuffle));
        assert_eq!(key_action(AppState::Normal, key(KeyCode::Char('r'))), Some(Action::Reload));
        assert_eq!(key_action(AppState::Normal, key(KeyCode::Char('x'))), None);
    }

    #[test]
    fn test_key_action_help_overlay_swallows_keys() {
        assert_eq!(key_action(AppState::ShowingHelp, key(KeyCode::Right)), None);
        assert_eq!(key_action(AppState::ShowingHelp, key(KeyCode::Esc)), Some(Action::ToggleHelp));
    }

    #[test]
    fn test_mouse_tracker() {
        let mut tracker = MouseTracker::default();
        assert_eq!(tracker.action(mouse(MouseEventKind::Down(MouseButton::Left), 30, 8)), None);
        assert_eq!(
            tracker.action(mouse(MouseEventKind::Up(MouseButton::Left), 12, 9)),
            Some(Action::Next)
        );

        tracker.action(mouse(MouseEventKind::Down(MouseButton::Left), 30, 8));
        assert_eq!(
            tracker.action(mouse(MouseEventKind::Up(MouseButton::Left), 30, 8)),
            Some(Action::Flip)
        );

        // Release without a press
        assert_eq!(tracker.action(mouse(MouseEventKind::Up(MouseButton::Left), 1, 1)), None);
    }
}
