use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use std::time::Duration;

use super::board::Direction;
use crate::config::KeyBindings;

/// Commands the local player can give the game
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveCommand {
    Move(Direction),
    PlaceBomb,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputAction {
    Move(MoveCommand),
    Quit,
    Reconnect,
}

/// Key codes resolved from the configured bindings
#[derive(Clone, Debug)]
pub struct KeyMap {
    up: KeyCode,
    down: KeyCode,
    left: KeyCode,
    right: KeyCode,
    place_bomb: KeyCode,
    quit: KeyCode,
}

impl KeyMap {
    /// Unknown key names fall back to the default binding for that action
    pub fn from_bindings(bindings: &KeyBindings) -> Self {
        let defaults = KeyBindings::default();
        let resolve = |name: &str, fallback: &str| {
            parse_key(name)
                .or_else(|| parse_key(fallback))
                .unwrap_or(KeyCode::Null)
        };
        Self {
            up: resolve(&bindings.up, &defaults.up),
            down: resolve(&bindings.down, &defaults.down),
            left: resolve(&bindings.left, &defaults.left),
            right: resolve(&bindings.right, &defaults.right),
            place_bomb: resolve(&bindings.place_bomb, &defaults.place_bomb),
            quit: resolve(&bindings.quit, &defaults.quit),
        }
    }

    pub fn action(&self, code: KeyCode) -> Option<InputAction> {
        let code = normalize(code);
        if code == self.up {
            Some(InputAction::Move(MoveCommand::Move(Direction::Up)))
        } else if code == self.down {
            Some(InputAction::Move(MoveCommand::Move(Direction::Down)))
        } else if code == self.left {
            Some(InputAction::Move(MoveCommand::Move(Direction::Left)))
        } else if code == self.right {
            Some(InputAction::Move(MoveCommand::Move(Direction::Right)))
        } else if code == self.place_bomb {
            Some(InputAction::Move(MoveCommand::PlaceBomb))
        } else if code == self.quit || code == KeyCode::Esc {
            Some(InputAction::Quit)
        } else if code == KeyCode::Char('r') {
            Some(InputAction::Reconnect)
        } else {
            None
        }
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::from_bindings(&KeyBindings::default())
    }
}

/// Parse a binding name such as "Up", "Space" or "Q"
pub fn parse_key(name: &str) -> Option<KeyCode> {
    let code = match name.trim().to_ascii_lowercase().as_str() {
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "space" => KeyCode::Char(' '),
        "enter" => KeyCode::Enter,
        "esc" => KeyCode::Esc,
        "tab" => KeyCode::Tab,
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => return None,
            }
        }
    };
    Some(code)
}

fn normalize(code: KeyCode) -> KeyCode {
    match code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    }
}

/// Poll for input events and return actions.
/// Each Press event generates an immediate action - no state tracking needed.
pub fn poll_input(keys: &KeyMap) -> Result<Vec<InputAction>, std::io::Error> {
    let mut actions = Vec::new();

    while event::poll(Duration::from_millis(0))? {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                actions.extend(keys.action(key.code));
            }
        }
    }

    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        let keys = KeyMap::default();
        assert_eq!(
            keys.action(KeyCode::Up),
            Some(InputAction::Move(MoveCommand::Move(Direction::Up)))
        );
        assert_eq!(
            keys.action(KeyCode::Char(' ')),
            Some(InputAction::Move(MoveCommand::PlaceBomb))
        );
        assert_eq!(keys.action(KeyCode::Char('Q')), Some(InputAction::Quit));
        assert_eq!(keys.action(KeyCode::Esc), Some(InputAction::Quit));
        assert_eq!(keys.action(KeyCode::Char('R')), Some(InputAction::Reconnect));
        assert_eq!(keys.action(KeyCode::Char('x')), None);
    }

    #[test]
    fn test_custom_bindings_with_fallback() {
        let bindings = KeyBindings {
            up: "W".to_string(),
            place_bomb: "not-a-key".to_string(),
            ..KeyBindings::default()
        };
        let keys = KeyMap::from_bindings(&bindings);
        assert_eq!(
            keys.action(KeyCode::Char('w')),
            Some(InputAction::Move(MoveCommand::Move(Direction::Up)))
        );
        assert_eq!(keys.action(KeyCode::Up), None);
        assert_eq!(
            keys.action(KeyCode::Char(' ')),
            Some(InputAction::Move(MoveCommand::PlaceBomb))
        );
    }

    #[test]
    fn test_parse_key_names() {
        assert_eq!(parse_key("Space"), Some(KeyCode::Char(' ')));
        assert_eq!(parse_key("q"), Some(KeyCode::Char('q')));
        assert_eq!(parse_key("F13"), None);
    }
}
