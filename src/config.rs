use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::capture::AlignmentConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub import: ImportConfig,

    #[serde(default)]
    pub preview: PreviewConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Directory the front-facing frame source watches.
    #[serde(default = "default_front_frames_dir")]
    pub front_frames_dir: PathBuf,

    /// Directory for rear-facing frames. Unset means no rear camera; a rear
    /// request then falls back to front.
    #[serde(default)]
    pub rear_frames_dir: Option<PathBuf>,

    #[serde(default)]
    pub alignment: AlignmentConfig,
}

fn default_front_frames_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from(".local/share"))
        .join("fitlapse/frames/front")
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            front_frames_dir: default_front_frames_dir(),
            rear_frames_dir: None,
            alignment: AlignmentConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Directory the import picker lists.
    #[serde(default = "default_import_dir")]
    pub dir: PathBuf,
}

fn default_import_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            dir: default_import_dir(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageProtocol {
    #[default]
    Auto,
    Sixel,
    Kitty,
    ITerm2,
    Halfblocks,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "default_preview_enabled")]
    pub image_preview: bool,

    #[serde(default)]
    pub protocol: ImageProtocol,
}

fn default_preview_enabled() -> bool {
    true
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            image_preview: default_preview_enabled(),
            protocol: ImageProtocol::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory journal exports are written into.
    #[serde(default = "default_export_dir")]
    pub dir: PathBuf,
}

fn default_export_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: default_export_dir(),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fitlapse")
        .join("journal.db")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            capture: CaptureConfig::default(),
            import: ImportConfig::default(),
            preview: PreviewConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            // Create default config
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fitlapse")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.db_path, default_db_path());
        assert_eq!(config.capture.alignment.stability_frames, 12);
        assert!(config.capture.rear_frames_dir.is_none());
    }

    #[test]
    fn test_partial_toml_round_trip() {
        let toml_text = r#"
            [capture]
            rear_frames_dir = "/tmp/rear"

            [capture.alignment]
            stability_frames = 8
        "#;
        let config: Config = toml::from_str(toml_text).unwrap();
        assert_eq!(
            config.capture.rear_frames_dir.as_deref(),
            Some(Path::new("/tmp/rear"))
        );
        assert_eq!(config.capture.alignment.stability_frames, 8);
        assert_eq!(config.capture.alignment.cooldown_ms, 3000);

        let serialized = toml::to_string_pretty(&config).unwrap();
        let reparsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(reparsed.capture.alignment.stability_frames, 8);
    }
}
