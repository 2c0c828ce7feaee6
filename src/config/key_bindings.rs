// SPDX-License-Identifier: GPL-3.0-only

use serde::Deserialize;
use xkbcommon::xkb;

use crate::backend::ModifiersState;

/// Modifier part of a key binding.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KeyModifiers {
    pub logo: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl KeyModifiers {
    pub fn matches(&self, state: &ModifiersState) -> bool {
        self.logo == state.logo
            && self.ctrl == state.ctrl
            && self.alt == state.alt
            && self.shift == state.shift
    }
}

/// One configured binding: modifiers plus a layout-translated keysym,
/// written as e.g. `"Super+Shift+Return"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPattern {
    pub modifiers: KeyModifiers,
    pub key: xkb::Keysym,
}

#[derive(Debug, thiserror::Error)]
pub enum KeyPatternError {
    #[error("no such keysym or modifier '{0}'")]
    UnknownToken(String),
    #[error("key binding has no keysym")]
    MissingKeysym,
}

impl KeyPattern {
    pub fn parse(text: &str) -> Result<KeyPattern, KeyPatternError> {
        let mut modifiers = KeyModifiers::default();
        let mut key = None;

        for token in text.split('+').filter(|t| !t.is_empty()) {
            match token.to_ascii_lowercase().as_str() {
                "super" | "logo" | "mod4" => modifiers.logo = true,
                "ctrl" | "control" => modifiers.ctrl = true,
                "alt" | "mod1" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                _ => {
                    let sym = xkb::keysym_from_name(token, xkb::KEYSYM_NO_FLAGS);
                    if sym.raw() == xkb::keysyms::KEY_NoSymbol {
                        return Err(KeyPatternError::UnknownToken(token.to_string()));
                    }
                    key = Some(sym);
                }
            }
        }

        match key {
            Some(key) => Ok(KeyPattern { modifiers, key }),
            None => Err(KeyPatternError::MissingKeysym),
        }
    }

    pub fn matches(&self, modifiers: &ModifiersState, sym: xkb::Keysym) -> bool {
        self.modifiers.matches(modifiers) && self.key == sym
    }
}

impl std::fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.modifiers.logo {
            write!(f, "Super+")?;
        }
        if self.modifiers.ctrl {
            write!(f, "Ctrl+")?;
        }
        if self.modifiers.alt {
            write!(f, "Alt+")?;
        }
        if self.modifiers.shift {
            write!(f, "Shift+")?;
        }
        write!(f, "{}", xkb::keysym_get_name(self.key))
    }
}

/// Everything a key binding can do.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum Action {
    /// End the session.
    Terminate,
    /// Re-load and re-apply the configuration file.
    Reload,
    /// Ask the focused window to close.
    Close,
    /// Switch to (or create) the numbered workspace.
    Workspace(u32),
    /// Toggle fullscreen on the focused window.
    ToggleFullscreen,
    /// Spawn a shell command; `$name` references config variables.
    Exec(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_parse_modifiers_and_keysym() {
        let pattern = KeyPattern::parse("Super+Shift+Return").unwrap();
        assert!(pattern.modifiers.logo && pattern.modifiers.shift);
        assert!(!pattern.modifiers.ctrl && !pattern.modifiers.alt);
        assert_eq!(pattern.key, xkb::Keysym::from(xkb::keysyms::KEY_Return));
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        assert!(matches!(
            KeyPattern::parse("Super+NotAKey"),
            Err(KeyPatternError::UnknownToken(_))
        ));
        assert!(matches!(
            KeyPattern::parse("Super+Shift"),
            Err(KeyPatternError::MissingKeysym)
        ));
    }

    #[test]
    fn matching_requires_exact_modifiers() {
        let pattern = KeyPattern::parse("Super+q").unwrap();
        let sym = xkb::Keysym::from(xkb::keysyms::KEY_q);
        assert!(pattern.matches(
            &ModifiersState {
                logo: true,
                ..Default::default()
            },
            sym
        ));
        assert!(!pattern.matches(
            &ModifiersState {
                logo: true,
                shift: true,
                ..Default::default()
            },
            sym
        ));
        assert!(!pattern.matches(&ModifiersState::default(), sym));
    }
}
