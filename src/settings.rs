use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SettingsError;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "report-viewer";

pub const BASE_URL_ENV: &str = "REPORT_VIEWER_BASE_URL";
pub const API_TIMEOUT_ENV: &str = "REPORT_VIEWER_API_TIMEOUT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Reports API root; always ends with `/`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_api_timeout")]
    pub api_timeout_secs: u64,

    #[serde(default = "default_initial_scale")]
    pub initial_scale: f32,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_image_max_width")]
    pub image_max_width: u32,

    #[serde(default = "default_image_max_height")]
    pub image_max_height: u32,

    #[serde(default = "default_placeholder_width")]
    pub placeholder_width: u32,

    #[serde(default = "default_placeholder_height")]
    pub placeholder_height: u32,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_base_url() -> String {
    "http://localhost:8000/".to_string()
}

fn default_api_timeout() -> u64 {
    30
}

fn default_initial_scale() -> f32 {
    1.5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_image_max_width() -> u32 {
    800
}

fn default_image_max_height() -> u32 {
    600
}

fn default_placeholder_width() -> u32 {
    800
}

fn default_placeholder_height() -> u32 {
    600
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            base_url: default_base_url(),
            api_timeout_secs: default_api_timeout(),
            initial_scale: default_initial_scale(),
            log_level: default_log_level(),
            image_max_width: default_image_max_width(),
            image_max_height: default_image_max_height(),
            placeholder_width: default_placeholder_width(),
            placeholder_height: default_placeholder_height(),
        }
    }
}

impl Settings {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.api_timeout_secs.max(1))
    }

    /// Parsed `log_level`, falling back to info
    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or_else(|_| {
            warn!("Unknown log level {:?}, using info", self.log_level);
            log::LevelFilter::Info
        })
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            debug!("Base URL overridden from environment");
            self.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(API_TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.api_timeout_secs = secs,
                _ => warn!("Ignoring invalid {API_TIMEOUT_ENV}={raw:?}"),
            }
        }
        self.normalize();
    }

    fn normalize(&mut self) {
        if !self.base_url.ends_with('/') {
            self.base_url.push('/');
        }
    }
}

pub fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load settings from the default location, writing defaults on first run
pub fn load_settings() -> Settings {
    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, using default settings");
        return Settings::default();
    };

    if path.exists() {
        match load_settings_from_path(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("{e}; using default settings");
                Settings::default()
            }
        }
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        let settings = Settings::default();
        if let Err(e) = save_settings_to_file(&settings, &path) {
            warn!("{e}");
        }
        settings
    }
}

/// Load a settings file, migrating it in place if it is older than the
/// current version
pub fn load_settings_from_path(path: &Path) -> Result<Settings, SettingsError> {
    let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut settings: Settings =
        serde_yaml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })?;
    debug!("Loaded settings from {path:?}");

    if settings.version < CURRENT_VERSION {
        migrate_settings(&mut settings);
        save_settings_to_file(&settings, path)?;
    }
    settings.normalize();
    Ok(settings)
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

pub fn save_settings_to_file(settings: &Settings, path: &Path) -> Result<(), SettingsError> {
    let io_err = |source| SettingsError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    fs::write(path, generate_settings_yaml(settings)).map_err(io_err)?;
    debug!("Saved settings to {path:?}");
    Ok(())
}

fn generate_settings_yaml(settings: &Settings) -> String {
    let mut content = String::new();

    content.push_str(&format!("version: {}\n", settings.version));
    content.push_str(&format!("base_url: \"{}\"\n", settings.base_url));
    content.push_str(&format!(
        "api_timeout_secs: {}\n",
        settings.api_timeout_secs
    ));
    content.push_str(&format!("initial_scale: {}\n", settings.initial_scale));
    content.push_str(&format!("log_level: {}\n", settings.log_level));
    content.push('\n');
    content.push_str("# Images are scaled to fit within these bounds\n");
    content.push_str(&format!("image_max_width: {}\n", settings.image_max_width));
    content.push_str(&format!("image_max_height: {}\n", settings.image_max_height));
    content.push('\n');
    content.push_str("# Size of the placeholder shown when content cannot be previewed\n");
    content.push_str(&format!(
        "placeholder_width: {}\n",
        settings.placeholder_width
    ));
    content.push_str(&format!(
        "placeholder_height: {}\n",
        settings.placeholder_height
    ));

    content
}
