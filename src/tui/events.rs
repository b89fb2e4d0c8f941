//! Event handling for the TUI
//!
//! Vim-style keys map onto tree messages. Selecting and expanding are bound
//! to different keys so one never triggers the other.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::app::App;
use crate::tree::Msg;

/// Handle a key event, returns true if app should quit
pub fn handle_event(app: &mut App, key: KeyEvent) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }

    // Help overlay swallows everything but its own close keys
    if app.show_help {
        if matches!(
            key.code,
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?')
        ) {
            app.show_help = false;
        }
        return false;
    }

    if key.code == KeyCode::Char('?') {
        app.show_help = true;
        return false;
    }

    if key.code == KeyCode::Esc {
        let msg = if app.model().error.is_some() {
            Msg::DismissError
        } else {
            Msg::ClearSelection
        };
        return app.dispatch(msg);
    }

    match key_to_msg(key) {
        Some(msg) => app.dispatch(msg),
        None => false,
    }
}

/// Tree message bound to `key`, if any
pub fn key_to_msg(key: KeyEvent) -> Option<Msg> {
    let msg = match key.code {
        KeyCode::Char('q') => Msg::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Msg::Quit,

        // Navigation
        KeyCode::Char('j') | KeyCode::Down => Msg::MoveDown,
        KeyCode::Char('k') | KeyCode::Up => Msg::MoveUp,
        KeyCode::Char('g') | KeyCode::Home => Msg::JumpToTop,
        KeyCode::Char('G') | KeyCode::End => Msg::JumpToBottom,

        // Expand / collapse
        KeyCode::Char('l') | KeyCode::Right => Msg::ExpandAtCursor,
        KeyCode::Char('h') | KeyCode::Left => Msg::CollapseAtCursor,

        // Publish to the detail panel
        KeyCode::Enter | KeyCode::Char(' ') => Msg::SelectAtCursor,

        KeyCode::Char('r') => Msg::LoadRoots,
        KeyCode::Char('x') => Msg::DismissError,
        _ => return None,
    };
    Some(msg)
}
