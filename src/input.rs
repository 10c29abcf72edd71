use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::app::InputMode;

/// Logical key actions. Everything past this module is independent of the
/// terminal library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Down,
    Up,
    PageDown,
    PageUp,
    Top,
    Bottom,
    Select,
    Delete,
    Refresh,
    ToggleFocus,
    ToggleMenu,
    PickNamespace,
    ToggleHelp,
    Cancel,
    Char(char),
    ConfirmYes,
    ConfirmNo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseAction {
    Click { column: u16, row: u16 },
    ScrollUp { column: u16, row: u16 },
    ScrollDown { column: u16, row: u16 },
}

pub fn map_key(mode: InputMode, key: KeyEvent) -> Option<Action> {
    match mode {
        InputMode::Normal => map_normal_mode_key(key),
        InputMode::Confirm => Some(map_confirm_key(key)),
    }
}

fn map_normal_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::Refresh)
        }
        KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::PickNamespace)
        }
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::PageDown)
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::PageUp),
        KeyCode::Char(_) if key.modifiers.contains(KeyModifiers::CONTROL) => None,
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('j') => Some(Action::Down),
        KeyCode::Char('k') => Some(Action::Up),
        KeyCode::Char('g') => Some(Action::Top),
        KeyCode::Char('G') => Some(Action::Bottom),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        KeyCode::Char('m') => Some(Action::ToggleMenu),
        KeyCode::Char(c) => Some(Action::Char(c)),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Up => Some(Action::Up),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::Home => Some(Action::Top),
        KeyCode::End => Some(Action::Bottom),
        KeyCode::Enter => Some(Action::Select),
        KeyCode::Delete => Some(Action::Delete),
        KeyCode::Tab | KeyCode::BackTab => Some(Action::ToggleFocus),
        KeyCode::Left | KeyCode::Right => Some(Action::ToggleFocus),
        KeyCode::F(2) => Some(Action::PickNamespace),
        KeyCode::F(5) => Some(Action::Refresh),
        KeyCode::F(9) => Some(Action::ToggleMenu),
        KeyCode::Esc => Some(Action::Cancel),
        _ => None,
    }
}

/// A pending yes/no prompt swallows the next key; anything but `y` cancels.
fn map_confirm_key(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y')
            if !key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            Action::ConfirmYes
        }
        _ => Action::ConfirmNo,
    }
}

pub fn map_mouse(event: MouseEvent) -> Option<MouseAction> {
    let (column, row) = (event.column, event.row);
    match event.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(MouseAction::Click { column, row }),
        MouseEventKind::ScrollUp => Some(MouseAction::ScrollUp { column, row }),
        MouseEventKind::ScrollDown => Some(MouseAction::ScrollDown { column, row }),
        _ => None,
    }
}
