// Alien Macros - Shared Library
// Configuration, known-device registry and the macro-key monitor

pub mod config;
pub mod devices;
pub mod monitor;

pub use config::{
    ActionConfig, Config, ConfigError, KeySpec, MacroConfig, MonitorConfig, TargetConfig,
};
pub use devices::{find_known, is_known, KnownDevice, ALIENWARE_M17_R4, KNOWN_DEVICES};
pub use monitor::{locate, resolve_path, Monitor, MonitorError, MonitorStats};
