//! Error types for key injection

use thiserror::Error;

use crate::vk::VkCode;

/// Failures while turning a macro action into injected key events
#[derive(Debug, Error)]
pub enum InjectionError {
    #[error("Character {0:#04x} cannot be typed with the active keyboard layout")]
    Unresolvable(u8),

    #[error("Injector accepted {accepted} of {submitted} key events")]
    ShortSubmission { accepted: usize, submitted: usize },

    #[error("Virtual key {0:#04x} has no mapping on this injector")]
    UnsupportedKey(VkCode),

    #[error("Failed to create virtual keyboard: {0}")]
    CreateDevice(#[source] std::io::Error),
}
