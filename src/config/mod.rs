use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::editor::TextFontFamily;
use crate::geometry::Color;
use crate::render::{FontLibrary, OutputFormat, DEFAULT_JPEG_QUALITY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfigPathError {
    MissingHomeDirectory,
}

const APP_DIR: &str = "lens";
const APP_CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FontPaths {
    pub regular: Option<PathBuf>,
    pub bold: Option<PathBuf>,
}

/// Application-level settings from `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub fonts: HashMap<TextFontFamily, FontPaths>,
    pub emoji_font: Option<PathBuf>,
    /// Tint for emoji faces that only carry outlines, as `#rrggbb`.
    pub emoji_tint: Option<Color>,
    pub output_format: OutputFormat,
    pub jpeg_quality: u8,
    pub history_limit: Option<NonZeroUsize>,
    pub output_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fonts: HashMap::new(),
            emoji_font: None,
            emoji_tint: None,
            output_format: OutputFormat::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            history_limit: None,
            output_dir: None,
        }
    }
}

impl AppConfig {
    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality.clamp(1, 100)
    }

    /// Loads every configured face. Unreadable fonts are skipped with a warning.
    pub fn font_library(&self) -> FontLibrary {
        let mut library = FontLibrary::new();
        for (family, paths) in &self.fonts {
            for (bold, path) in [(false, &paths.regular), (true, &paths.bold)] {
                let Some(path) = path else {
                    continue;
                };
                if let Err(err) = library.insert_face(*family, bold, path) {
                    tracing::warn!(%err, family = family.label(), bold, "skipping font face");
                }
            }
        }
        if let Some(path) = &self.emoji_font {
            if let Err(err) = library.set_emoji_face(path) {
                tracing::warn!(%err, "skipping emoji font");
            }
        }
        if let Some(tint) = self.emoji_tint {
            library.set_monochrome_emoji_color(tint);
        }
        if library.is_empty() {
            tracing::warn!("no fonts configured; text and emoji will not be drawn");
        }
        library
    }
}

pub fn load_app_config() -> AppConfig {
    let (xdg_config_home, home) = config_env_dirs();
    load_app_config_with(xdg_config_home.as_deref(), home.as_deref())
}

fn load_app_config_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> AppConfig {
    let path = match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(p) => p,
        Err(_) => return AppConfig::default(),
    };
    if !path.exists() {
        return AppConfig::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            AppConfig::default()
        }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            AppConfig::default()
        }
    }
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub(crate) fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}
