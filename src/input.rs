use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::api::Color;
use crate::core::command::Command;

/// Translates a key press into a controller command.
pub fn map_key(key: KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Command::Quit);
    }

    let command = match key.code {
        KeyCode::Esc | KeyCode::Char('q') => Command::Quit,
        KeyCode::Left => Command::MoveCursor(-1),
        KeyCode::Right => Command::MoveCursor(1),
        KeyCode::Enter | KeyCode::Char(' ') => Command::DropAtCursor,
        KeyCode::Char(c @ '1'..='5') => Command::Drop(c as usize - '1' as usize),
        KeyCode::Char('a') => Command::ToggleAutoplay,
        KeyCode::Char('n') => Command::NewGame,
        KeyCode::Char('m') => Command::CycleMode,
        KeyCode::Char('t') => Command::CycleAgent,
        KeyCode::Char('+') | KeyCode::Char('=') => Command::Slower,
        KeyCode::Char('-') => Command::Faster,
        KeyCode::Char('l') => Command::ToggleLearning,
        KeyCode::Char('d') => Command::ToggleDebug,
        KeyCode::Char('e') => Command::StartEvaluation,
        KeyCode::Char('s') => Command::StartTraining,
        KeyCode::Char('x') => Command::Stop,
        KeyCode::Char('w') => Command::SaveModel,
        KeyCode::Char(c) => Command::SelectColor(Color::from_key(c)?),
        _ => return None,
    };
    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn digits_drop_into_columns() {
        assert_eq!(map_key(press(KeyCode::Char('1'))), Some(Command::Drop(0)));
        assert_eq!(map_key(press(KeyCode::Char('5'))), Some(Command::Drop(4)));
        assert_eq!(map_key(press(KeyCode::Char('6'))), None);
    }

    #[test]
    fn color_letters_select_colors() {
        assert_eq!(map_key(press(KeyCode::Char('p'))), Some(Command::SelectColor(Color::Purple)));
        assert_eq!(map_key(press(KeyCode::Char('z'))), None);
    }

    #[test]
    fn release_events_are_ignored() {
        let mut key = press(KeyCode::Char('a'));
        key.kind = KeyEventKind::Release;
        assert_eq!(map_key(key), None);
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Command::Quit)
        );
    }
}
