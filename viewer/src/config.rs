use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Whether the background job fills the row cache or only computes bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeMode {
    /// Decode every row in the background.
    #[default]
    Eager,
    /// Decode rows on first access; the background job only computes bounds.
    Lazy,
}

/// Float rendering parameters of [`NumberFormatter`](crate::NumberFormatter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormatterConfig {
    /// Decimals always kept after trimming trailing zeros.
    pub min_figures: u32,
    /// Decimals printed before trimming.
    pub max_figures: u32,
    /// Magnitudes below `10^-exp_negative_cutoff` switch to exponential notation.
    pub exp_negative_cutoff: u32,
    /// Magnitudes above `10^exp_positive_cutoff` switch to exponential notation.
    pub exp_positive_cutoff: u32,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            min_figures: 2,
            max_figures: 5,
            exp_negative_cutoff: 5,
            exp_positive_cutoff: 7,
        }
    }
}

/// Viewer configuration, usually loaded from `meshview.toml`.
///
/// Every field is optional in the file:
///
/// ```toml
/// decode_mode = "lazy"
/// io_worker_threads = 4
///
/// [formatter]
/// max_figures = 3
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub decode_mode: DecodeMode,
    /// Worker threads of the fetch runtime.
    pub io_worker_threads: usize,
    /// Sleep between polls in [`MeshPipeline::wait_settled`](crate::MeshPipeline::wait_settled).
    pub settle_poll_interval_ms: u64,
    pub formatter: FormatterConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            decode_mode: DecodeMode::default(),
            io_worker_threads: 2,
            settle_poll_interval_ms: 5,
            formatter: FormatterConfig::default(),
        }
    }
}

/// Errors loading a [`ViewerConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ViewerConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Load a config, falling back to defaults if the file is missing or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                log::info!(
                    "Loaded viewer config from {} ({:?} decode)",
                    path.display(),
                    config.decode_mode
                );
                config
            }
            Err(e) => {
                log::warn!("No viewer config ({e}), using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        let config = ViewerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.formatter.max_figures, 5);
    }

    #[test]
    fn partial_overrides() {
        let config = ViewerConfig::from_toml_str(
            r#"
            decode_mode = "lazy"
            io_worker_threads = 4

            [formatter]
            max_figures = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.decode_mode, DecodeMode::Lazy);
        assert_eq!(config.io_worker_threads, 4);
        assert_eq!(config.settle_poll_interval_ms, 5);
        assert_eq!(config.formatter.max_figures, 3);
        assert_eq!(config.formatter.min_figures, 2);
    }

    #[test]
    fn bad_mode_is_a_parse_error() {
        let err = ViewerConfig::from_toml_str("decode_mode = \"sometimes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_falls_back() {
        let path = Path::new("/definitely/not/here/meshview.toml");
        assert!(matches!(
            ViewerConfig::load(path),
            Err(ConfigError::Io { .. })
        ));
        assert_eq!(ViewerConfig::load_or_default(path), ViewerConfig::default());
    }
}
