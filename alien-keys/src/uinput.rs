//! Virtual keyboard using evdev/uinput
//!
//! Creates a virtual keyboard device and replays key events on it, so
//! macro keys show up as ordinary key presses to the desktop.

use evdev::{
    uinput::{VirtualDevice, VirtualDeviceBuilder},
    AttributeSet, EventType, InputEvent, Key,
};
use tracing::{debug, warn};

use crate::error::InjectionError;
use crate::inject::{KeyEvent, KeyInjector, KeyState};
use crate::vk::{self, VkCode};

/// Default device name (shown in `evtest`)
pub const DEFAULT_DEVICE_NAME: &str = "Alien Macros Virtual Keyboard";

/// Virtual keyboard device
pub struct UinputInjector {
    device: VirtualDevice,
}

impl UinputInjector {
    /// Create the virtual keyboard with every key that has a mapping
    pub fn new(name: &str) -> Result<Self, InjectionError> {
        let mut keys = AttributeSet::<Key>::new();
        for code in 0..=0xFF {
            if let Some(key) = linux_key(code) {
                keys.insert(key);
            }
        }

        let device = VirtualDeviceBuilder::new()
            .map_err(InjectionError::CreateDevice)?
            .name(name)
            .with_keys(&keys)
            .map_err(InjectionError::CreateDevice)?
            .build()
            .map_err(InjectionError::CreateDevice)?;

        debug!("Created virtual keyboard {:?}", name);
        Ok(Self { device })
    }
}

impl KeyInjector for UinputInjector {
    fn send(&mut self, events: &[KeyEvent]) -> Result<usize, InjectionError> {
        // Reject the whole batch before emitting anything
        let mut mapped = Vec::with_capacity(events.len());
        for event in events {
            let key = linux_key(event.vk).ok_or(InjectionError::UnsupportedKey(event.vk))?;
            mapped.push((key, event.state));
        }

        let mut accepted = 0;
        for (key, state) in mapped {
            let value = match state {
                KeyState::Down => 1,
                KeyState::Up => 0,
            };
            // emit() appends SYN_REPORT, one per transition
            let event = InputEvent::new_now(EventType::KEY, key.code(), value);
            if let Err(e) = self.device.emit(&[event]) {
                warn!("Failed to emit key event: {}", e);
                break;
            }
            accepted += 1;
        }
        Ok(accepted)
    }
}

/// Linux key for a virtual-key code
pub fn linux_key(vk: VkCode) -> Option<Key> {
    const LETTERS: [Key; 26] = [
        Key::KEY_A,
        Key::KEY_B,
        Key::KEY_C,
        Key::KEY_D,
        Key::KEY_E,
        Key::KEY_F,
        Key::KEY_G,
        Key::KEY_H,
        Key::KEY_I,
        Key::KEY_J,
        Key::KEY_K,
        Key::KEY_L,
        Key::KEY_M,
        Key::KEY_N,
        Key::KEY_O,
        Key::KEY_P,
        Key::KEY_Q,
        Key::KEY_R,
        Key::KEY_S,
        Key::KEY_T,
        Key::KEY_U,
        Key::KEY_V,
        Key::KEY_W,
        Key::KEY_X,
        Key::KEY_Y,
        Key::KEY_Z,
    ];
    const DIGITS: [Key; 10] = [
        Key::KEY_0,
        Key::KEY_1,
        Key::KEY_2,
        Key::KEY_3,
        Key::KEY_4,
        Key::KEY_5,
        Key::KEY_6,
        Key::KEY_7,
        Key::KEY_8,
        Key::KEY_9,
    ];
    const FUNCTION: [Key; 24] = [
        Key::KEY_F1,
        Key::KEY_F2,
        Key::KEY_F3,
        Key::KEY_F4,
        Key::KEY_F5,
        Key::KEY_F6,
        Key::KEY_F7,
        Key::KEY_F8,
        Key::KEY_F9,
        Key::KEY_F10,
        Key::KEY_F11,
        Key::KEY_F12,
        Key::KEY_F13,
        Key::KEY_F14,
        Key::KEY_F15,
        Key::KEY_F16,
        Key::KEY_F17,
        Key::KEY_F18,
        Key::KEY_F19,
        Key::KEY_F20,
        Key::KEY_F21,
        Key::KEY_F22,
        Key::KEY_F23,
        Key::KEY_F24,
    ];

    let key = match vk {
        0x30..=0x39 => DIGITS[usize::from(vk - vk::VK_0)],
        0x41..=0x5A => LETTERS[usize::from(vk - vk::VK_A)],
        0x70..=0x87 => FUNCTION[usize::from(vk - vk::VK_F1)],
        vk::VK_CANCEL => Key::KEY_CANCEL,
        vk::VK_BACK => Key::KEY_BACKSPACE,
        vk::VK_TAB => Key::KEY_TAB,
        vk::VK_CLEAR => Key::KEY_CLEAR,
        vk::VK_RETURN => Key::KEY_ENTER,
        vk::VK_PAUSE => Key::KEY_PAUSE,
        vk::VK_CAPITAL => Key::KEY_CAPSLOCK,
        vk::VK_ESCAPE => Key::KEY_ESC,
        vk::VK_SPACE => Key::KEY_SPACE,
        vk::VK_PRIOR => Key::KEY_PAGEUP,
        vk::VK_NEXT => Key::KEY_PAGEDOWN,
        vk::VK_END => Key::KEY_END,
        vk::VK_HOME => Key::KEY_HOME,
        vk::VK_LEFT => Key::KEY_LEFT,
        vk::VK_UP => Key::KEY_UP,
        vk::VK_RIGHT => Key::KEY_RIGHT,
        vk::VK_DOWN => Key::KEY_DOWN,
        vk::VK_SNAPSHOT => Key::KEY_SYSRQ,
        vk::VK_INSERT => Key::KEY_INSERT,
        vk::VK_DELETE => Key::KEY_DELETE,
        vk::VK_HELP => Key::KEY_HELP,
        vk::VK_LWIN => Key::KEY_LEFTMETA,
        vk::VK_RWIN => Key::KEY_RIGHTMETA,
        vk::VK_APPS => Key::KEY_COMPOSE,
        vk::VK_SLEEP => Key::KEY_SLEEP,
        vk::VK_MULTIPLY => Key::KEY_KPASTERISK,
        vk::VK_ADD => Key::KEY_KPPLUS,
        vk::VK_SUBTRACT => Key::KEY_KPMINUS,
        vk::VK_DIVIDE => Key::KEY_KPSLASH,
        vk::VK_NUMLOCK => Key::KEY_NUMLOCK,
        vk::VK_SCROLL => Key::KEY_SCROLLLOCK,
        vk::VK_LSHIFT => Key::KEY_LEFTSHIFT,
        vk::VK_RSHIFT => Key::KEY_RIGHTSHIFT,
        vk::VK_LCONTROL => Key::KEY_LEFTCTRL,
        vk::VK_RCONTROL => Key::KEY_RIGHTCTRL,
        vk::VK_LMENU => Key::KEY_LEFTALT,
        vk::VK_RMENU => Key::KEY_RIGHTALT,
        vk::VK_BROWSER_BACK => Key::KEY_BACK,
        vk::VK_BROWSER_FORWARD => Key::KEY_FORWARD,
        vk::VK_BROWSER_REFRESH => Key::KEY_REFRESH,
        vk::VK_BROWSER_STOP => Key::KEY_STOP,
        vk::VK_BROWSER_SEARCH => Key::KEY_SEARCH,
        vk::VK_BROWSER_FAVORITES => Key::KEY_BOOKMARKS,
        vk::VK_BROWSER_HOME => Key::KEY_HOMEPAGE,
        vk::VK_VOLUME_MUTE => Key::KEY_MUTE,
        vk::VK_VOLUME_DOWN => Key::KEY_VOLUMEDOWN,
        vk::VK_VOLUME_UP => Key::KEY_VOLUMEUP,
        vk::VK_MEDIA_NEXT_TRACK => Key::KEY_NEXTSONG,
        vk::VK_MEDIA_PREV_TRACK => Key::KEY_PREVIOUSSONG,
        vk::VK_MEDIA_STOP => Key::KEY_STOPCD,
        vk::VK_MEDIA_PLAY_PAUSE => Key::KEY_PLAYPAUSE,
        vk::VK_LAUNCH_MAIL => Key::KEY_MAIL,
        vk::VK_LAUNCH_MEDIA_SELECT => Key::KEY_MEDIA,
        vk::VK_LAUNCH_APP1 => Key::KEY_PROG1,
        vk::VK_LAUNCH_APP2 => Key::KEY_PROG2,
        vk::VK_OEM_1 => Key::KEY_SEMICOLON,
        vk::VK_OEM_PLUS => Key::KEY_EQUAL,
        vk::VK_OEM_COMMA => Key::KEY_COMMA,
        vk::VK_OEM_MINUS => Key::KEY_MINUS,
        vk::VK_OEM_PERIOD => Key::KEY_DOT,
        vk::VK_OEM_2 => Key::KEY_SLASH,
        vk::VK_OEM_3 => Key::KEY_GRAVE,
        vk::VK_ABNT_C1 => Key::KEY_RO,
        vk::VK_OEM_4 => Key::KEY_LEFTBRACE,
        vk::VK_OEM_5 => Key::KEY_BACKSLASH,
        vk::VK_OEM_6 => Key::KEY_RIGHTBRACE,
        vk::VK_OEM_7 => Key::KEY_APOSTROPHE,
        _ => return None,
    };
    Some(key)
}
