//! Configuration file handling for face-attendance.
//!
//! Loads configuration from `<config_dir>/face-attendance/config.toml` or a
//! custom path, then layers environment variables on top.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::{API_URL_ENV, DEFAULT_API_BASE_URL};
use crate::camera::{
    CameraSettings, CaptureConstraints, EncodeSettings, FacingMode, ImageFormat, Resolution,
};
use crate::records::CsvStyle;
use crate::store::{DEFAULT_PAGE_SIZE, SUPABASE_KEY_ENV, SUPABASE_URL_ENV};

/// Written by `config init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# face-attendance configuration

[api]
# Recognition backend, including the /api prefix.
# Overridden by ATTENDANCE_API_URL.
# base_url = "http://localhost:5000/api"
timeout_secs = 30
connect_timeout_secs = 10

[store]
# Supabase project URL. Overridden by SUPABASE_URL.
# The API key is only read from SUPABASE_KEY.
# url = "https://your-project.supabase.co"
page_size = 100

[camera]
# Device index, path or name. Leave unset to pick by facing mode.
# device = "0"
width = 640
height = 480
facing = "user"
format = "jpeg"
quality = 90
acquire_timeout_secs = 10

[export]
# Directory for CSV exports. Defaults to the current directory.
# dir = "/path/to/exports"
legacy_format = false
"#;

/// Configuration file structure for face-attendance.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StoreConfig {
    #[serde(default)]
    pub url: Option<String>,
    /// Never read from the file
    #[serde(skip)]
    pub key: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            key: None,
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CameraConfig {
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub facing: FacingMode,
    #[serde(default)]
    pub format: ImageFormat,
    #[serde(default = "default_quality")]
    pub quality: u8,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: None,
            width: default_width(),
            height: default_height(),
            facing: FacingMode::default(),
            format: ImageFormat::default(),
            quality: default_quality(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct ExportConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub legacy_format: bool,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_width() -> u32 {
    Resolution::MEDIUM.width
}

fn default_height() -> u32 {
    Resolution::MEDIUM.height
}

fn default_quality() -> u8 {
    90
}

fn default_acquire_timeout_secs() -> u64 {
    10
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            Self::read(&path)
        } else {
            log::debug!("No config file at {}, using defaults", path.display());
            Ok(Config::default())
        }
    }

    /// Load from a path the user named explicitly; it must exist.
    pub fn load_from_explicit(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Self::read(path)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Check value ranges the type system doesn't cover.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, message: &str| ConfigError::Invalid {
            field,
            message: message.to_string(),
        };
        if self.store.page_size == 0 {
            return Err(invalid("store.page_size", "must be at least 1"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(invalid("camera.width/height", "must be non-zero"));
        }
        if !(1..=100).contains(&self.camera.quality) {
            return Err(invalid("camera.quality", "must be between 1 and 100"));
        }
        if self.api.timeout_secs == 0 || self.api.connect_timeout_secs == 0 {
            return Err(invalid("api timeouts", "must be non-zero"));
        }
        if self.camera.acquire_timeout_secs == 0 {
            return Err(invalid("camera.acquire_timeout_secs", "must be non-zero"));
        }
        Ok(())
    }

    /// Apply `ATTENDANCE_API_URL`, `SUPABASE_URL` and `SUPABASE_KEY`.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from `lookup`. Empty values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(url) = get(API_URL_ENV) {
            self.api.base_url = Some(url);
        }
        if let Some(url) = get(SUPABASE_URL_ENV) {
            self.store.url = Some(url);
        }
        if let Some(key) = get(SUPABASE_KEY_ENV) {
            self.store.key = Some(key);
        }
    }

    pub fn api_base_url(&self) -> &str {
        self.api.base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn api_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.api.connect_timeout_secs)
    }

    pub fn camera_settings(&self) -> CameraSettings {
        CameraSettings {
            constraints: CaptureConstraints {
                ideal: Resolution {
                    width: self.camera.width,
                    height: self.camera.height,
                },
                facing: self.camera.facing,
                device: self.camera.device.clone(),
            },
            encode: EncodeSettings {
                format: self.camera.format,
                quality: self.camera.quality,
            },
            acquire_timeout: Duration::from_secs(self.camera.acquire_timeout_secs),
        }
    }

    pub fn csv_style(&self) -> CsvStyle {
        if self.export.legacy_format {
            CsvStyle::Legacy
        } else {
            CsvStyle::Quoted
        }
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export
            .dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Effective settings as TOML-like text. The store key is masked.
    pub fn render(&self) -> String {
        let opt = |v: &Option<String>| match v {
            Some(v) => format!("\"{}\"", v),
            None => "(unset)".to_string(),
        };
        let key = match &self.store.key {
            Some(k) => mask_secret(k),
            None => "(unset)".to_string(),
        };
        let dir = self.export_dir();

        format!(
            "[api]\n\
             base_url = \"{}\"\n\
             timeout_secs = {}\n\
             connect_timeout_secs = {}\n\
             \n\
             [store]\n\
             url = {}\n\
             key = {}\n\
             page_size = {}\n\
             \n\
             [camera]\n\
             device = {}\n\
             width = {}\n\
             height = {}\n\
             facing = \"{}\"\n\
             format = \"{}\"\n\
             quality = {}\n\
             acquire_timeout_secs = {}\n\
             \n\
             [export]\n\
             dir = \"{}\"\n\
             legacy_format = {}\n",
            self.api_base_url(),
            self.api.timeout_secs,
            self.api.connect_timeout_secs,
            opt(&self.store.url),
            key,
            self.store.page_size,
            opt(&self.camera.device),
            self.camera.width,
            self.camera.height,
            self.camera.facing.as_str(),
            self.camera.format.as_str(),
            self.camera.quality,
            self.camera.acquire_timeout_secs,
            dir.display(),
            self.export.legacy_format,
        )
    }
}

/// Keep the first four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}

/// Write the default config file to `path`, refusing to overwrite.
pub fn write_default(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Err(ConfigError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }
    let io_err = |e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, DEFAULT_CONFIG_TOML).map_err(io_err)?;
    log::info!("Wrote default config to {}", path.display());
    Ok(())
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    NotFound {
        path: PathBuf,
    },
    AlreadyExists {
        path: PathBuf,
    },
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::NotFound { path } => {
                write!(f, "Config file not found: '{}'", path.display())
            }
            ConfigError::AlreadyExists { path } => {
                write!(f, "Config file already exists: '{}'", path.display())
            }
            ConfigError::Invalid { field, message } => {
                write!(f, "Invalid config value for {}: {}", field, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("face-attendance").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/face-attendance/config.toml")
        })
}
