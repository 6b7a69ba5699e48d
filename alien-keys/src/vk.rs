//! Virtual-key vocabulary
//!
//! Key codes follow the Windows virtual-key code space, which is what macro
//! configurations are written against. Injectors translate these codes to
//! whatever their platform expects.

/// A virtual-key code
pub type VkCode = u16;

pub const VK_CANCEL: VkCode = 0x03;
pub const VK_BACK: VkCode = 0x08;
pub const VK_TAB: VkCode = 0x09;
pub const VK_CLEAR: VkCode = 0x0C;
pub const VK_RETURN: VkCode = 0x0D;
pub const VK_PAUSE: VkCode = 0x13;
pub const VK_CAPITAL: VkCode = 0x14;
pub const VK_ESCAPE: VkCode = 0x1B;
pub const VK_SPACE: VkCode = 0x20;
pub const VK_PRIOR: VkCode = 0x21;
pub const VK_NEXT: VkCode = 0x22;
pub const VK_END: VkCode = 0x23;
pub const VK_HOME: VkCode = 0x24;
pub const VK_LEFT: VkCode = 0x25;
pub const VK_UP: VkCode = 0x26;
pub const VK_RIGHT: VkCode = 0x27;
pub const VK_DOWN: VkCode = 0x28;
pub const VK_SNAPSHOT: VkCode = 0x2C;
pub const VK_INSERT: VkCode = 0x2D;
pub const VK_DELETE: VkCode = 0x2E;
pub const VK_HELP: VkCode = 0x2F;
/// `0`..`9` are contiguous from here
pub const VK_0: VkCode = 0x30;
/// `A`..`Z` are contiguous from here
pub const VK_A: VkCode = 0x41;
pub const VK_LWIN: VkCode = 0x5B;
pub const VK_RWIN: VkCode = 0x5C;
pub const VK_APPS: VkCode = 0x5D;
pub const VK_SLEEP: VkCode = 0x5F;
pub const VK_MULTIPLY: VkCode = 0x6A;
pub const VK_ADD: VkCode = 0x6B;
pub const VK_SUBTRACT: VkCode = 0x6D;
pub const VK_DIVIDE: VkCode = 0x6F;
/// `F1`..`F24` are contiguous from here
pub const VK_F1: VkCode = 0x70;
pub const VK_F13: VkCode = 0x7C;
pub const VK_F14: VkCode = 0x7D;
pub const VK_F15: VkCode = 0x7E;
pub const VK_F16: VkCode = 0x7F;
pub const VK_F24: VkCode = 0x87;
pub const VK_NUMLOCK: VkCode = 0x90;
pub const VK_SCROLL: VkCode = 0x91;
pub const VK_LSHIFT: VkCode = 0xA0;
pub const VK_RSHIFT: VkCode = 0xA1;
pub const VK_LCONTROL: VkCode = 0xA2;
pub const VK_RCONTROL: VkCode = 0xA3;
pub const VK_LMENU: VkCode = 0xA4;
pub const VK_RMENU: VkCode = 0xA5;
pub const VK_BROWSER_BACK: VkCode = 0xA6;
pub const VK_BROWSER_FORWARD: VkCode = 0xA7;
pub const VK_BROWSER_REFRESH: VkCode = 0xA8;
pub const VK_BROWSER_STOP: VkCode = 0xA9;
pub const VK_BROWSER_SEARCH: VkCode = 0xAA;
pub const VK_BROWSER_FAVORITES: VkCode = 0xAB;
pub const VK_BROWSER_HOME: VkCode = 0xAC;
pub const VK_VOLUME_MUTE: VkCode = 0xAD;
pub const VK_VOLUME_DOWN: VkCode = 0xAE;
pub const VK_VOLUME_UP: VkCode = 0xAF;
pub const VK_MEDIA_NEXT_TRACK: VkCode = 0xB0;
pub const VK_MEDIA_PREV_TRACK: VkCode = 0xB1;
pub const VK_MEDIA_STOP: VkCode = 0xB2;
pub const VK_MEDIA_PLAY_PAUSE: VkCode = 0xB3;
pub const VK_LAUNCH_MAIL: VkCode = 0xB4;
pub const VK_LAUNCH_MEDIA_SELECT: VkCode = 0xB5;
pub const VK_LAUNCH_APP1: VkCode = 0xB6;
pub const VK_LAUNCH_APP2: VkCode = 0xB7;
/// `;:` on US layouts
pub const VK_OEM_1: VkCode = 0xBA;
pub const VK_OEM_PLUS: VkCode = 0xBB;
pub const VK_OEM_COMMA: VkCode = 0xBC;
pub const VK_OEM_MINUS: VkCode = 0xBD;
pub const VK_OEM_PERIOD: VkCode = 0xBE;
/// `/?`
pub const VK_OEM_2: VkCode = 0xBF;
/// `` `~ ``
pub const VK_OEM_3: VkCode = 0xC0;
pub const VK_ABNT_C1: VkCode = 0xC1;
pub const VK_ABNT_C2: VkCode = 0xC2;
/// `[{`
pub const VK_OEM_4: VkCode = 0xDB;
/// `\|`
pub const VK_OEM_5: VkCode = 0xDC;
/// `]}`
pub const VK_OEM_6: VkCode = 0xDD;
/// `'"`
pub const VK_OEM_7: VkCode = 0xDE;

/// Named keys outside the contiguous digit, letter and function-key runs
const NAMED: &[(VkCode, &str)] = &[
    (VK_CANCEL, "CANCEL"),
    (VK_BACK, "BACK"),
    (VK_TAB, "TAB"),
    (VK_CLEAR, "CLEAR"),
    (VK_RETURN, "RETURN"),
    (VK_PAUSE, "PAUSE"),
    (VK_CAPITAL, "CAPITAL"),
    (VK_ESCAPE, "ESCAPE"),
    (VK_SPACE, "SPACE"),
    (VK_PRIOR, "PRIOR"),
    (VK_NEXT, "NEXT"),
    (VK_END, "END"),
    (VK_HOME, "HOME"),
    (VK_LEFT, "LEFT"),
    (VK_UP, "UP"),
    (VK_RIGHT, "RIGHT"),
    (VK_DOWN, "DOWN"),
    (VK_SNAPSHOT, "SNAPSHOT"),
    (VK_INSERT, "INSERT"),
    (VK_DELETE, "DELETE"),
    (VK_HELP, "HELP"),
    (VK_LWIN, "LWIN"),
    (VK_RWIN, "RWIN"),
    (VK_APPS, "APPS"),
    (VK_SLEEP, "SLEEP"),
    (VK_MULTIPLY, "MULTIPLY"),
    (VK_ADD, "ADD"),
    (VK_SUBTRACT, "SUBTRACT"),
    (VK_DIVIDE, "DIVIDE"),
    (VK_NUMLOCK, "NUMLOCK"),
    (VK_SCROLL, "SCROLL"),
    (VK_LSHIFT, "LSHIFT"),
    (VK_RSHIFT, "RSHIFT"),
    (VK_LCONTROL, "LCONTROL"),
    (VK_RCONTROL, "RCONTROL"),
    (VK_LMENU, "LMENU"),
    (VK_RMENU, "RMENU"),
    (VK_BROWSER_BACK, "BROWSER_BACK"),
    (VK_BROWSER_FORWARD, "BROWSER_FORWARD"),
    (VK_BROWSER_REFRESH, "BROWSER_REFRESH"),
    (VK_BROWSER_STOP, "BROWSER_STOP"),
    (VK_BROWSER_SEARCH, "BROWSER_SEARCH"),
    (VK_BROWSER_FAVORITES, "BROWSER_FAVORITES"),
    (VK_BROWSER_HOME, "BROWSER_HOME"),
    (VK_VOLUME_MUTE, "VOLUME_MUTE"),
    (VK_VOLUME_DOWN, "VOLUME_DOWN"),
    (VK_VOLUME_UP, "VOLUME_UP"),
    (VK_MEDIA_NEXT_TRACK, "MEDIA_NEXT_TRACK"),
    (VK_MEDIA_PREV_TRACK, "MEDIA_PREV_TRACK"),
    (VK_MEDIA_STOP, "MEDIA_STOP"),
    (VK_MEDIA_PLAY_PAUSE, "MEDIA_PLAY_PAUSE"),
    (VK_LAUNCH_MAIL, "LAUNCH_MAIL"),
    (VK_LAUNCH_MEDIA_SELECT, "LAUNCH_MEDIA_SELECT"),
    (VK_LAUNCH_APP1, "LAUNCH_APP1"),
    (VK_LAUNCH_APP2, "LAUNCH_APP2"),
    (VK_OEM_1, "OEM_1"),
    (VK_OEM_PLUS, "OEM_PLUS"),
    (VK_OEM_COMMA, "OEM_COMMA"),
    (VK_OEM_MINUS, "OEM_MINUS"),
    (VK_OEM_PERIOD, "OEM_PERIOD"),
    (VK_OEM_2, "OEM_2"),
    (VK_OEM_3, "OEM_3"),
    (VK_ABNT_C1, "ABNT_C1"),
    (VK_ABNT_C2, "ABNT_C2"),
    (VK_OEM_4, "OEM_4"),
    (VK_OEM_5, "OEM_5"),
    (VK_OEM_6, "OEM_6"),
    (VK_OEM_7, "OEM_7"),
];

const DIGIT_NAMES: [&str; 10] = ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];
const LETTER_NAMES: [&str; 26] = [
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R", "S",
    "T", "U", "V", "W", "X", "Y", "Z",
];
const FUNCTION_NAMES: [&str; 24] = [
    "F1", "F2", "F3", "F4", "F5", "F6", "F7", "F8", "F9", "F10", "F11", "F12", "F13", "F14", "F15",
    "F16", "F17", "F18", "F19", "F20", "F21", "F22", "F23", "F24",
];

/// Name of a virtual key without the `VK_` prefix ("F13" for 0x7C)
pub fn key_name(vk: VkCode) -> Option<&'static str> {
    match vk {
        0x30..=0x39 => Some(DIGIT_NAMES[usize::from(vk - VK_0)]),
        0x41..=0x5A => Some(LETTER_NAMES[usize::from(vk - VK_A)]),
        0x70..=0x87 => Some(FUNCTION_NAMES[usize::from(vk - VK_F1)]),
        _ => NAMED
            .iter()
            .find(|(code, _)| *code == vk)
            .map(|(_, name)| *name),
    }
}

/// Look up a virtual key by name
///
/// Case-insensitive; accepts an optional `VK_` prefix ("f13", "VK_F13").
pub fn key_from_name(name: &str) -> Option<VkCode> {
    let upper = name.trim().to_ascii_uppercase();
    let bare = upper.strip_prefix("VK_").unwrap_or(&upper);

    let in_run = |names: &[&str], base: VkCode| {
        names
            .iter()
            .position(|n| *n == bare)
            .map(|i| base + i as VkCode)
    };

    in_run(&DIGIT_NAMES, VK_0)
        .or_else(|| in_run(&LETTER_NAMES, VK_A))
        .or_else(|| in_run(&FUNCTION_NAMES, VK_F1))
        .or_else(|| {
            NAMED
                .iter()
                .find(|(_, n)| *n == bare)
                .map(|(code, _)| *code)
        })
}

/// Parse a key given either by name or by number ("F13", "0x7C", "124")
pub fn parse_key(text: &str) -> Option<VkCode> {
    let text = text.trim();
    if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        return VkCode::from_str_radix(hex, 16).ok();
    }
    // single digits are key names, not codes
    if text.len() > 1 && text.bytes().all(|b| b.is_ascii_digit()) {
        return text.parse().ok();
    }
    key_from_name(text)
}

/// Display form of a key: its name, or the hex code for unnamed keys
pub fn display_key(vk: VkCode) -> String {
    match key_name(vk) {
        Some(name) => name.to_string(),
        None => format!("0x{vk:02X}"),
    }
}
