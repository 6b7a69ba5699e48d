//! Configuration for the macro monitor
//!
//! Stored as TOML. Which interface to listen on lives under `[target]`,
//! read timing and the virtual keyboard under `[monitor]`, and each
//! `[[macros]]` entry binds one scan code to an action:
//!
//! ```toml
//! [[macros]]
//! scan_code = 0x4C
//! description = "Macro A"
//! action = { type = "virtual_key", key = "F13" }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use alien_hid::TargetDeviceIdentity;
use alien_keys::{vk, MacroAction, MacroTable, ScanCode, VkCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::devices::{ALIENWARE_M17_R4, MACRO_KEY_A, MACRO_KEY_B, MACRO_KEY_C, MACRO_KEY_D};

/// Errors loading, validating or saving the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Scan code {0:#06x} is bound more than once")]
    DuplicateScanCode(ScanCode),

    #[error("Unknown key {key:?} for scan code {scan_code:#06x}")]
    UnknownKey { scan_code: ScanCode, key: String },

    #[error("Character {value:?} for scan code {scan_code:#06x} is not ASCII")]
    InvalidChar { scan_code: ScanCode, value: char },

    #[error("Text for scan code {scan_code:#06x} is not ASCII")]
    NonAsciiText { scan_code: ScanCode },

    #[error("monitor.read_timeout_ms must be at least 1")]
    ZeroReadTimeout,
}

/// Which HID interface to listen on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    pub usage_page: u16,
    pub usage: u16,
    /// Device path to open directly instead of searching by identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self::from_identity(ALIENWARE_M17_R4)
    }
}

impl TargetConfig {
    pub fn from_identity(identity: TargetDeviceIdentity) -> Self {
        Self {
            vendor_id: identity.vendor_id,
            product_id: identity.product_id,
            usage_page: identity.usage_page,
            usage: identity.usage,
            path: None,
        }
    }

    pub fn identity(&self) -> TargetDeviceIdentity {
        TargetDeviceIdentity::new(self.vendor_id, self.product_id, self.usage_page, self.usage)
    }
}

/// Read timing and output device settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// How long each wait for a report lasts before checking for Ctrl-C
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Pause between characters of string macros; unset sends the string at once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub char_delay_ms: Option<u64>,
    /// Name for the virtual keyboard device
    #[serde(default = "default_device_name")]
    pub device_name: String,
}

fn default_read_timeout_ms() -> u64 {
    1000
}

fn default_device_name() -> String {
    "Alien Macros Virtual Keyboard".to_string()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: default_read_timeout_ms(),
            char_delay_ms: None,
            device_name: default_device_name(),
        }
    }
}

impl MonitorConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn char_delay(&self) -> Option<Duration> {
        self.char_delay_ms.map(Duration::from_millis)
    }
}

/// A key given by name (`"F13"`) or by virtual-key code (`124`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySpec {
    Code(VkCode),
    Name(String),
}

impl KeySpec {
    /// Name form for named keys, the code otherwise
    pub fn from_code(code: VkCode) -> Self {
        match vk::key_name(code) {
            Some(name) => KeySpec::Name(name.to_string()),
            None => KeySpec::Code(code),
        }
    }

    pub fn resolve(&self) -> Option<VkCode> {
        match self {
            KeySpec::Code(code) => Some(*code),
            KeySpec::Name(name) => vk::parse_key(name),
        }
    }
}

/// What a macro key does
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionConfig {
    /// Press and release one key
    VirtualKey { key: KeySpec },
    /// Type one character
    Char { value: char },
    /// Type a string
    String { value: String },
}

/// One `[[macros]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroConfig {
    pub scan_code: ScanCode,
    #[serde(default)]
    pub description: String,
    pub action: ActionConfig,
}

impl MacroConfig {
    fn to_action(&self) -> Result<MacroAction, ConfigError> {
        let scan_code = self.scan_code;
        let description = self.description.as_str();
        match &self.action {
            ActionConfig::VirtualKey { key } => {
                let code = key.resolve().ok_or_else(|| ConfigError::UnknownKey {
                    scan_code,
                    key: match key {
                        KeySpec::Name(name) => name.clone(),
                        KeySpec::Code(code) => code.to_string(),
                    },
                })?;
                Ok(MacroAction::virtual_key(code, description))
            }
            ActionConfig::Char { value } => {
                if !value.is_ascii() {
                    return Err(ConfigError::InvalidChar {
                        scan_code,
                        value: *value,
                    });
                }
                Ok(MacroAction::char(*value as u8, description))
            }
            ActionConfig::String { value } => {
                if !value.is_ascii() {
                    return Err(ConfigError::NonAsciiText { scan_code });
                }
                Ok(MacroAction::string(value.as_str(), description))
            }
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub macros: Vec<MacroConfig>,
}

impl Default for Config {
    fn default() -> Self {
        // macro keys A-D send F13-F16
        let macros = [MACRO_KEY_A, MACRO_KEY_B, MACRO_KEY_C, MACRO_KEY_D]
            .into_iter()
            .zip(vk::VK_F13..)
            .zip(["A", "B", "C", "D"])
            .map(|((scan_code, key), letter)| MacroConfig {
                scan_code,
                description: format!("Macro {letter}"),
                action: ActionConfig::VirtualKey {
                    key: KeySpec::from_code(key),
                },
            })
            .collect();

        Self {
            target: TargetConfig::default(),
            monitor: MonitorConfig::default(),
            macros,
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("alien-macros")
            .join("config.toml")
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings the monitor cannot run with, and every macro binding
    pub fn validate(&self) -> Result<(), ConfigError> {
        // A zero wait turns the read loop into a busy poll
        if self.monitor.read_timeout_ms == 0 {
            return Err(ConfigError::ZeroReadTimeout);
        }
        self.macro_table()?;
        Ok(())
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(write_err)?;
        Ok(())
    }

    /// Build the scan code → action table
    pub fn macro_table(&self) -> Result<MacroTable, ConfigError> {
        let mut seen = HashSet::new();
        let mut table = MacroTable::new();
        for entry in &self.macros {
            if !seen.insert(entry.scan_code) {
                return Err(ConfigError::DuplicateScanCode(entry.scan_code));
            }
            table.insert(entry.scan_code, entry.to_action()?);
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alien_keys::ActionKind;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("vendor_id = 3426"));
        assert!(toml_str.contains("product_id = 6684"));
        assert!(toml_str.contains("type = \"virtual_key\""));
        assert!(toml_str.contains("key = \"F13\""));
        assert!(!toml_str.contains("char_delay_ms"));
    }

    #[test]
    fn test_default_table_maps_macro_keys_to_f13_f16() {
        let table = Config::default().macro_table().unwrap();
        assert_eq!(table.len(), 4);
        for (scan_code, key) in [(0x4C, 0x7C), (0x4D, 0x7D), (0x4E, 0x7E), (0x4F, 0x7F)] {
            let action = table.get(scan_code).unwrap();
            assert_eq!(action.kind(), ActionKind::VirtualKey);
            assert_eq!(action.key_code(), key);
        }
        assert_eq!(table.get(0x4D).unwrap().description(), "Macro B");
    }

    #[test]
    fn test_roundtrip() {
        let mut config = Config::default();
        config.target.path = Some("/dev/hidraw3".into());
        config.monitor.char_delay_ms = Some(20);
        config.macros.push(MacroConfig {
            scan_code: 0x50,
            description: "Greeting".into(),
            action: ActionConfig::String {
                value: "Hello!".into(),
            },
        });

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = Config::from_toml(&toml_str).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(parsed.monitor.char_delay(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn test_hand_written_file() {
        let config = Config::from_toml(
            r#"
[target]
vendor_id = 0x0d62
product_id = 0x1a1c
usage_page = 0x0c
usage = 0x01

[monitor]
read_timeout_ms = 250

[[macros]]
scan_code = 0x4C
action = { type = "virtual_key", key = "vk_f20" }

[[macros]]
scan_code = 0x4D
description = "Numeric key"
action = { type = "virtual_key", key = 0xB3 }

[[macros]]
scan_code = 0x4E
action = { type = "char", value = "@" }
"#,
        )
        .unwrap();

        assert_eq!(config.target.identity(), ALIENWARE_M17_R4);
        assert_eq!(config.monitor.read_timeout(), Duration::from_millis(250));
        assert_eq!(config.monitor.device_name, default_device_name());

        let table = config.macro_table().unwrap();
        assert_eq!(table.get(0x4C).unwrap().key_code(), 0x83);
        assert_eq!(table.get(0x4D).unwrap().key_code(), 0xB3);
        assert_eq!(table.get(0x4E).unwrap().char_value(), b'@');
        assert!(table.get(0x4F).is_none());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.target, TargetConfig::default());
        assert_eq!(config.monitor, MonitorConfig::default());
        assert!(config.macros.is_empty());
    }

    #[test]
    fn test_duplicate_scan_code_rejected() {
        let err = Config::from_toml(
            r#"
[[macros]]
scan_code = 76
action = { type = "virtual_key", key = "F13" }

[[macros]]
scan_code = 76
action = { type = "virtual_key", key = "F14" }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateScanCode(0x4C)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Config::from_toml(
            r#"
[[macros]]
scan_code = 76
action = { type = "virtual_key", key = "F99" }
"#,
        )
        .unwrap_err();
        match err {
            ConfigError::UnknownKey { scan_code, key } => {
                assert_eq!(scan_code, 0x4C);
                assert_eq!(key, "F99");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_ascii_rejected() {
        let err = Config::from_toml(
            r#"
[[macros]]
scan_code = 76
action = { type = "char", value = "é" }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidChar { value: 'é', .. }));

        let err = Config::from_toml(
            r#"
[[macros]]
scan_code = 76
action = { type = "string", value = "naïve" }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::NonAsciiText { scan_code: 0x4C }));
    }

    #[test]
    fn test_zero_read_timeout_rejected() {
        let err = Config::from_toml("[monitor]\nread_timeout_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ZeroReadTimeout));

        let config = Config::from_toml("[monitor]\nread_timeout_ms = 1\n").unwrap();
        assert_eq!(config.monitor.read_timeout(), Duration::from_millis(1));
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config::default();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, Config::default());
    }
}
