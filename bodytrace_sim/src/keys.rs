//! Keyboard bindings for the trace toggles.

use bodytrace_env::ToggleCommand;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Keys the harness can press. Only a handful of keypad keys are bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    KpMultiply,
    KpSubtract,
    Kp0,
    Char(char),
}

/// Modifier state at the time of a key press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        shift: false,
        alt: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        shift: false,
        alt: false,
    };
}

/// Maps (key, modifiers) to a toggle command. Modifiers must match exactly.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    bindings: HashMap<(Key, Modifiers), ToggleCommand>,
}

impl KeyBindings {
    /// No bindings at all.
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    pub fn bind(&mut self, key: Key, modifiers: Modifiers, command: ToggleCommand) {
        self.bindings.insert((key, modifiers), command);
    }

    pub fn lookup(&self, key: Key, modifiers: Modifiers) -> Option<ToggleCommand> {
        self.bindings.get(&(key, modifiers)).copied()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Default for KeyBindings {
    /// Ctrl+KP_Multiply collects, Ctrl+KP_Subtract shows, Ctrl+KP_0 reloads
    /// the static trace.
    fn default() -> Self {
        let mut bindings = Self::empty();
        bindings.bind(Key::KpMultiply, Modifiers::CTRL, ToggleCommand::ToggleCollect);
        bindings.bind(Key::KpSubtract, Modifiers::CTRL, ToggleCommand::ToggleShow);
        bindings.bind(Key::Kp0, Modifiers::CTRL, ToggleCommand::ReloadStatic);
        bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        let keys = KeyBindings::default();
        assert_eq!(keys.len(), 3);
        assert_eq!(
            keys.lookup(Key::KpMultiply, Modifiers::CTRL),
            Some(ToggleCommand::ToggleCollect)
        );
        assert_eq!(
            keys.lookup(Key::KpSubtract, Modifiers::CTRL),
            Some(ToggleCommand::ToggleShow)
        );
        assert_eq!(
            keys.lookup(Key::Kp0, Modifiers::CTRL),
            Some(ToggleCommand::ReloadStatic)
        );
    }

    #[test]
    fn test_modifiers_must_match_exactly() {
        let keys = KeyBindings::default();
        assert_eq!(keys.lookup(Key::KpMultiply, Modifiers::NONE), None);

        let ctrl_shift = Modifiers {
            shift: true,
            ..Modifiers::CTRL
        };
        assert_eq!(keys.lookup(Key::KpMultiply, ctrl_shift), None);
        assert_eq!(keys.lookup(Key::Char('t'), Modifiers::CTRL), None);
    }

    #[test]
    fn test_rebinding_replaces() {
        let mut keys = KeyBindings::default();
        keys.bind(Key::Kp0, Modifiers::CTRL, ToggleCommand::SetShow(false));
        assert_eq!(keys.len(), 3);
        assert_eq!(
            keys.lookup(Key::Kp0, Modifiers::CTRL),
            Some(ToggleCommand::SetShow(false))
        );
    }
}
