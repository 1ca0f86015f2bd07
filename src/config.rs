use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::exif::ExtractOptions;
use crate::exif::timezone::parse_offset;

/// Top-level configuration for the exif-reader library.
///
/// Controls how timestamps are normalized, where library assets live, and
/// output behavior (dry run, backups).
///
/// # Loading
///
/// ```rust,no_run
/// use exif_reader::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.timezone.default_offset = "+02:00".into();
/// config.output.dry_run = true;
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Zone used for timestamps that carry no offset tag.
    pub timezone: TimezoneConfig,
    /// Date extraction behavior.
    pub extraction: ExtractionConfig,
    /// Directory-backed asset library (`ph://` references).
    pub library: LibraryConfig,
    /// Output behavior (dry run, backups).
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimezoneConfig {
    /// Offset such as `+00:00` or `-07:00`.
    pub default_offset: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Fall back to the `{TIFF}` modify date when `DateTimeOriginal` is missing.
    pub fallback_to_modify_date: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub root: Option<PathBuf>,
}

/// Output and behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// If `true`, compute every write but commit nothing.
    pub dry_run: bool,
    /// If `true`, create a `.bak` copy before a file is first rewritten.
    pub backup_originals: bool,
}

impl Default for TimezoneConfig {
    fn default() -> Self {
        Self {
            default_offset: "+00:00".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            backup_originals: true,
        }
    }
}

impl Config {
    /// Resolve the config file path (same directory as the executable).
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        config.default_offset()?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// The configured fallback offset, parsed.
    pub fn default_offset(&self) -> Result<FixedOffset> {
        parse_offset(&self.timezone.default_offset).with_context(|| {
            format!(
                "Invalid timezone.default_offset {:?} (expected ±HH:MM)",
                self.timezone.default_offset
            )
        })
    }

    /// Extractor settings derived from this config.
    pub fn extract_options(&self) -> Result<ExtractOptions> {
        Ok(ExtractOptions {
            default_offset: self.default_offset()?,
            fallback_to_modify_date: self.extraction.fallback_to_modify_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.timezone.default_offset, "+00:00");
        assert!(!config.extraction.fallback_to_modify_date);
        assert!(config.library.root.is_none());
        assert!(!config.output.dry_run);
        assert!(config.output.backup_originals);
        assert_eq!(config.extract_options().unwrap(), ExtractOptions::default());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(&dir.path().join("config.json"))).unwrap();
        assert_eq!(config.timezone.default_offset, "+00:00");
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::default();
        config.timezone.default_offset = "-07:00".into();
        config.library.root = Some(dir.path().join("library"));
        config.output.backup_originals = false;
        config.save(Some(&path)).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.default_offset().unwrap().local_minus_utc(), -7 * 3600);
        assert_eq!(loaded.library.root, config.library.root);
        assert!(!loaded.output.backup_originals);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"extraction":{"fallback_to_modify_date":true}}"#).unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert!(config.extraction.fallback_to_modify_date);
        assert!(config.output.backup_originals);
        assert_eq!(config.timezone.default_offset, "+00:00");
    }

    #[test]
    fn invalid_offset_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"timezone":{"default_offset":"Europe/Paris"}}"#).unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("default_offset"));
    }
}
