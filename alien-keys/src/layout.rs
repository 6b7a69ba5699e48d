//! Character to key resolution

use crate::vk::*;

/// A key plus whether Shift must be held to produce the character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub vk: VkCode,
    pub shift: bool,
}

impl KeyStroke {
    pub const fn plain(vk: VkCode) -> Self {
        Self { vk, shift: false }
    }

    pub const fn shifted(vk: VkCode) -> Self {
        Self { vk, shift: true }
    }
}

/// Maps characters to the keystrokes that type them
pub trait KeyboardLayout: Send + Sync {
    /// Layout identifier, for logs
    fn name(&self) -> &str;

    /// Resolve an ASCII character, `None` if the layout cannot type it
    fn resolve(&self, c: u8) -> Option<KeyStroke>;
}

/// US English (00000409)
#[derive(Debug, Clone, Copy, Default)]
pub struct UsLayout;

impl KeyboardLayout for UsLayout {
    fn name(&self) -> &str {
        "00000409"
    }

    fn resolve(&self, c: u8) -> Option<KeyStroke> {
        let stroke = match c {
            b'a'..=b'z' => KeyStroke::plain(VK_A + VkCode::from(c - b'a')),
            b'A'..=b'Z' => KeyStroke::shifted(VK_A + VkCode::from(c - b'A')),
            b'0'..=b'9' => KeyStroke::plain(VK_0 + VkCode::from(c - b'0')),
            b' ' => KeyStroke::plain(VK_SPACE),
            b'\t' => KeyStroke::plain(VK_TAB),
            b'\n' | b'\r' => KeyStroke::plain(VK_RETURN),
            0x08 => KeyStroke::plain(VK_BACK),
            0x1B => KeyStroke::plain(VK_ESCAPE),
            // unshifted punctuation
            b'-' => KeyStroke::plain(VK_OEM_MINUS),
            b'=' => KeyStroke::plain(VK_OEM_PLUS),
            b'[' => KeyStroke::plain(VK_OEM_4),
            b']' => KeyStroke::plain(VK_OEM_6),
            b'\\' => KeyStroke::plain(VK_OEM_5),
            b';' => KeyStroke::plain(VK_OEM_1),
            b'\'' => KeyStroke::plain(VK_OEM_7),
            b'`' => KeyStroke::plain(VK_OEM_3),
            b',' => KeyStroke::plain(VK_OEM_COMMA),
            b'.' => KeyStroke::plain(VK_OEM_PERIOD),
            b'/' => KeyStroke::plain(VK_OEM_2),
            // shifted digits
            b')' => KeyStroke::shifted(VK_0),
            b'!' => KeyStroke::shifted(VK_0 + 1),
            b'@' => KeyStroke::shifted(VK_0 + 2),
            b'#' => KeyStroke::shifted(VK_0 + 3),
            b'$' => KeyStroke::shifted(VK_0 + 4),
            b'%' => KeyStroke::shifted(VK_0 + 5),
            b'^' => KeyStroke::shifted(VK_0 + 6),
            b'&' => KeyStroke::shifted(VK_0 + 7),
            b'*' => KeyStroke::shifted(VK_0 + 8),
            b'(' => KeyStroke::shifted(VK_0 + 9),
            // shifted punctuation
            b'_' => KeyStroke::shifted(VK_OEM_MINUS),
            b'+' => KeyStroke::shifted(VK_OEM_PLUS),
            b'{' => KeyStroke::shifted(VK_OEM_4),
            b'}' => KeyStroke::shifted(VK_OEM_6),
            b'|' => KeyStroke::shifted(VK_OEM_5),
            b':' => KeyStroke::shifted(VK_OEM_1),
            b'"' => KeyStroke::shifted(VK_OEM_7),
            b'~' => KeyStroke::shifted(VK_OEM_3),
            b'<' => KeyStroke::shifted(VK_OEM_COMMA),
            b'>' => KeyStroke::shifted(VK_OEM_PERIOD),
            b'?' => KeyStroke::shifted(VK_OEM_2),
            _ => return None,
        };
        Some(stroke)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters() {
        let us = UsLayout;
        assert_eq!(us.resolve(b'h'), Some(KeyStroke::plain(0x48)));
        assert_eq!(us.resolve(b'H'), Some(KeyStroke::shifted(0x48)));
        assert_eq!(us.resolve(b'z'), Some(KeyStroke::plain(0x5A)));
    }

    #[test]
    fn test_digits_and_symbols() {
        let us = UsLayout;
        assert_eq!(us.resolve(b'0'), Some(KeyStroke::plain(0x30)));
        assert_eq!(us.resolve(b'!'), Some(KeyStroke::shifted(0x31)));
        assert_eq!(us.resolve(b')'), Some(KeyStroke::shifted(0x30)));
        assert_eq!(us.resolve(b'?'), Some(KeyStroke::shifted(VK_OEM_2)));
        assert_eq!(us.resolve(b'/'), Some(KeyStroke::plain(VK_OEM_2)));
    }

    #[test]
    fn test_whitespace() {
        let us = UsLayout;
        assert_eq!(us.resolve(b' '), Some(KeyStroke::plain(VK_SPACE)));
        assert_eq!(us.resolve(b'\n'), Some(KeyStroke::plain(VK_RETURN)));
        assert_eq!(us.resolve(b'\t'), Some(KeyStroke::plain(VK_TAB)));
    }

    #[test]
    fn test_unresolvable() {
        let us = UsLayout;
        assert_eq!(us.resolve(0x00), None);
        assert_eq!(us.resolve(0x7F), None);
        assert_eq!(us.resolve(0xE9), None);
    }
}
