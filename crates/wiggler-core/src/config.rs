use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, CoreResult};

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub window: WindowConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_true")]
    pub resizable: bool,

    /// Escape closes the window like the close button does.
    #[serde(default = "default_true")]
    pub close_on_escape: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_path")]
    pub path: PathBuf,

    /// Prefix each persisted line with unix milliseconds.
    #[serde(default = "default_true")]
    pub timestamps: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_clear_color")]
    pub clear_color: [f32; 4],

    #[serde(default)]
    pub present_mode: PresentModePreference,

    /// Enables `VK_LAYER_KHRONOS_validation` when the layer is installed.
    #[serde(default = "default_validation")]
    pub validation: bool,

    #[serde(default)]
    pub device: DevicePreference,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentModePreference {
    #[default]
    Fifo,
    Mailbox,
    Immediate,
}

/// Coarse GPU classification used for device preference.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    Discrete,
    Integrated,
    Virtual,
    Cpu,
    Other,
}

/// Optional narrowing of the default "first capable device" policy.
///
/// `name` wins over `kind` when both are given. Neither matching falls back to
/// the first capable device.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct DevicePreference {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub kind: Option<AdapterKind>,
}

impl DevicePreference {
    #[inline]
    pub fn is_default(&self) -> bool {
        self.name.is_none() && self.kind.is_none()
    }
}

fn default_title() -> String {
    "StringWiggler".to_string()
}
fn default_width() -> u32 {
    800
}
fn default_height() -> u32 {
    600
}
fn default_true() -> bool {
    true
}
fn default_log_path() -> PathBuf {
    PathBuf::from("log.txt")
}
fn default_clear_color() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}
fn default_validation() -> bool {
    cfg!(debug_assertions)
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            width: default_width(),
            height: default_height(),
            resizable: true,
            close_on_escape: true,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
            timestamps: true,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            clear_color: default_clear_color(),
            present_mode: PresentModePreference::default(),
            validation: default_validation(),
            device: DevicePreference::default(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str, origin: &Path) -> CoreResult<Self> {
        toml::from_str(s).map_err(|source| CoreError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Missing file yields defaults; an unreadable or malformed file is an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(s) => Self::from_toml_str(&s, path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(CoreError::ConfigRead {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}
