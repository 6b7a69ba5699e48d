//! Macro actions

use std::fmt;

use crate::vk::{self, VkCode};

/// What a macro key does when pressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Placeholder for an entry that could not be configured; never fires
    Invalid,
    /// Press and release one virtual key
    VirtualKey(VkCode),
    /// Type one character through the keyboard layout
    Char(u8),
    /// Type a string through the keyboard layout
    String(String),
}

/// Discriminant of an [`Action`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Invalid,
    VirtualKey,
    Char,
    String,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Invalid => "invalid",
            ActionKind::VirtualKey => "virtual_key",
            ActionKind::Char => "char",
            ActionKind::String => "string",
        };
        f.write_str(name)
    }
}

/// An action bound to a macro key, with a human-readable description
///
/// Immutable once built. The payload accessors return the "empty" value
/// (0 or "") when asked for a payload the action does not carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroAction {
    action: Action,
    description: String,
}

impl MacroAction {
    pub fn new(action: Action, description: impl Into<String>) -> Self {
        Self {
            action,
            description: description.into(),
        }
    }

    pub fn virtual_key(code: VkCode, description: impl Into<String>) -> Self {
        Self::new(Action::VirtualKey(code), description)
    }

    pub fn char(c: u8, description: impl Into<String>) -> Self {
        Self::new(Action::Char(c), description)
    }

    pub fn string(text: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Action::String(text.into()), description)
    }

    pub fn invalid() -> Self {
        Self::new(Action::Invalid, "")
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn kind(&self) -> ActionKind {
        match self.action {
            Action::Invalid => ActionKind::Invalid,
            Action::VirtualKey(_) => ActionKind::VirtualKey,
            Action::Char(_) => ActionKind::Char,
            Action::String(_) => ActionKind::String,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Virtual-key payload, or 0
    pub fn key_code(&self) -> VkCode {
        match self.action {
            Action::VirtualKey(code) => code,
            _ => 0,
        }
    }

    /// Character payload, or 0
    pub fn char_value(&self) -> u8 {
        match self.action {
            Action::Char(c) => c,
            _ => 0,
        }
    }

    /// String payload, or ""
    pub fn text(&self) -> &str {
        match &self.action {
            Action::String(s) => s,
            _ => "",
        }
    }

    pub fn is_valid(&self) -> bool {
        self.action != Action::Invalid
    }
}

impl fmt::Display for MacroAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            Action::Invalid => write!(f, "invalid")?,
            Action::VirtualKey(code) => write!(f, "key {}", vk::display_key(*code))?,
            Action::Char(c) => write!(f, "char {:?}", char::from(*c))?,
            Action::String(s) => write!(f, "string {s:?}")?,
        }
        if !self.description.is_empty() {
            write!(f, " ({})", self.description)?;
        }
        Ok(())
    }
}
