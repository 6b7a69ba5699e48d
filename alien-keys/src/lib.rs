//! Macro actions and key injection
//!
//! A [`MacroTable`] binds scan codes to [`MacroAction`]s. The
//! [`MacroDispatcher`] resolves an action to key events through a
//! [`KeyboardLayout`] and hands them to a [`KeyInjector`].

pub mod action;
pub mod dispatch;
pub mod error;
pub mod inject;
pub mod layout;
pub mod vk;

#[cfg(target_os = "linux")]
pub mod uinput;

pub use action::{Action, ActionKind, MacroAction};
pub use dispatch::{Dispatch, MacroDispatcher, MacroTable, ScanCode};
pub use error::InjectionError;
pub use inject::{KeyEvent, KeyInjector, KeyState, LoggingInjector, RecordingInjector};
pub use layout::{KeyStroke, KeyboardLayout, UsLayout};
pub use vk::VkCode;

#[cfg(target_os = "linux")]
pub use uinput::UinputInjector;
