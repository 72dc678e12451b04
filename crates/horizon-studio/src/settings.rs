//! Editor configuration.
//!
//! [`EditorSettings`] collects every tunable the session consults: the
//! resampling filter, history capacity, output and decode bounds, export
//! defaults and watermark styling. Settings can be read from and written to
//! TOML or JSON; missing keys fall back to their defaults.
//!
//! ```ignore
//! use horizon_studio::EditorSettings;
//!
//! let settings = EditorSettings::from_toml_str(r#"
//!     resize_filter = "lanczos3"
//!     history_capacity = 50
//!
//!     [watermark]
//!     padding = 32
//! "#)?;
//! settings.save_toml("studio.toml")?;
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use horizon_studio_render::{DecodeLimits, ResizeFilter, WatermarkStyle, MAX_BLUR_RADIUS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::targets;

/// Errors raised while loading, saving or validating settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to access settings file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML settings: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("failed to serialize settings as TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("invalid JSON settings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Result type for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Configuration consulted by an [`EditSession`](crate::EditSession).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Filter used by resize operations.
    pub resize_filter: ResizeFilter,
    /// Maximum history entries. Unlimited when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_capacity: Option<usize>,
    /// Largest width or height an operation may produce.
    pub max_dimension: u32,
    /// Largest accepted blur radius.
    pub max_blur_radius: u32,
    /// Quality used by default exports.
    pub export_quality: f32,
    /// Prefix of suggested export file names.
    pub export_prefix: String,
    /// Bounds applied while decoding input bytes.
    pub decode_limits: DecodeLimits,
    /// Watermark padding, stroke and colors.
    pub watermark: WatermarkStyle,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            resize_filter: ResizeFilter::Triangle,
            history_capacity: None,
            max_dimension: 16_384,
            max_blur_radius: 50,
            export_quality: 0.95,
            export_prefix: "horizon-studio".to_string(),
            decode_limits: DecodeLimits::default(),
            watermark: WatermarkStyle::default(),
        }
    }
}

impl EditorSettings {
    /// Check that every value is usable.
    pub fn validate(&self) -> SettingsResult<()> {
        if self.max_dimension == 0 {
            return Err(invalid("max_dimension", "must be at least 1"));
        }
        if self.max_blur_radius > MAX_BLUR_RADIUS {
            return Err(invalid(
                "max_blur_radius",
                format!("{} exceeds the engine limit of {MAX_BLUR_RADIUS}", self.max_blur_radius),
            ));
        }
        if !(0.0..=1.0).contains(&self.export_quality) {
            return Err(invalid(
                "export_quality",
                format!("{} is outside 0.0..=1.0", self.export_quality),
            ));
        }
        if self.history_capacity == Some(0) {
            return Err(invalid("history_capacity", "must be at least 1"));
        }
        if self.decode_limits.max_width == 0 || self.decode_limits.max_height == 0 {
            return Err(invalid("decode_limits", "maximum dimensions must be at least 1"));
        }
        if self.export_prefix.trim().is_empty() {
            return Err(invalid("export_prefix", "must not be empty"));
        }
        Ok(())
    }

    // ========================================================================
    // Parsing
    // ========================================================================

    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> SettingsResult<Self> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse and validate JSON text.
    pub fn from_json_str(text: &str) -> SettingsResult<Self> {
        let settings: Self = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_toml_string(&self) -> SettingsResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn to_json_string(&self) -> SettingsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Load settings from a TOML file.
    pub fn load_toml(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let settings = Self::from_toml_str(&read_text(path.as_ref())?)?;
        tracing::debug!(target: targets::SETTINGS, path = %path.as_ref().display(), "loaded TOML settings");
        Ok(settings)
    }

    /// Load settings from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let settings = Self::from_json_str(&read_text(path.as_ref())?)?;
        tracing::debug!(target: targets::SETTINGS, path = %path.as_ref().display(), "loaded JSON settings");
        Ok(settings)
    }

    /// Save settings to a TOML file.
    ///
    /// The file is written atomically using a temporary file and rename.
    pub fn save_toml(&self, path: impl AsRef<Path>) -> SettingsResult<()> {
        atomic_write(path.as_ref(), self.to_toml_string()?.as_bytes())
    }

    /// Save settings to a JSON file.
    ///
    /// The file is written atomically using a temporary file and rename.
    pub fn save_json(&self, path: impl AsRef<Path>) -> SettingsResult<()> {
        atomic_write(path.as_ref(), self.to_json_string()?.as_bytes())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> SettingsError {
    SettingsError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn io_error(path: &Path, source: std::io::Error) -> SettingsError {
    SettingsError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn read_text(path: &Path) -> SettingsResult<String> {
    std::fs::read_to_string(path).map_err(|e| io_error(path, e))
}

fn atomic_write(path: &Path, contents: &[u8]) -> SettingsResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = std::fs::File::create(&tmp).map_err(|e| io_error(&tmp, e))?;
    file.write_all(contents).map_err(|e| io_error(&tmp, e))?;
    file.sync_all().map_err(|e| io_error(&tmp, e))?;
    drop(file);
    std::fs::rename(&tmp, path).map_err(|e| io_error(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = EditorSettings::default();
        settings.validate().unwrap();
        assert_eq!(settings.export_quality, 0.95);
        assert_eq!(settings.watermark.padding, 20);
        assert_eq!(settings.watermark.stroke_width, 2);
        assert_eq!(settings.max_blur_radius, 50);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings = EditorSettings::from_toml_str(
            r#"
            resize_filter = "lanczos3"
            history_capacity = 10

            [watermark]
            padding = 32
            "#,
        )
        .unwrap();
        assert_eq!(settings.resize_filter, ResizeFilter::Lanczos3);
        assert_eq!(settings.history_capacity, Some(10));
        assert_eq!(settings.watermark.padding, 32);
        assert_eq!(settings.watermark.stroke_width, 2);
        assert_eq!(settings.max_dimension, 16_384);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EditorSettings::from_toml_str("export_quality = 1.5").unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { field: "export_quality", .. }));

        let err = EditorSettings::from_json_str(r#"{"history_capacity": 0}"#).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { field: "history_capacity", .. }));

        let err = EditorSettings::from_toml_str("max_blur_radius = 100000").unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { field: "max_blur_radius", .. }));
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            EditorSettings::from_toml_str("resize_filter = ["),
            Err(SettingsError::TomlParse(_))
        ));
        assert!(matches!(
            EditorSettings::from_json_str("{"),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn test_toml_string_roundtrip() {
        let settings = EditorSettings {
            history_capacity: Some(25),
            export_prefix: "shots".to_string(),
            ..EditorSettings::default()
        };
        let text = settings.to_toml_string().unwrap();
        assert_eq!(EditorSettings::from_toml_str(&text).unwrap(), settings);
    }

    #[test]
    fn test_missing_file() {
        let err = EditorSettings::load_toml("/nonexistent/horizon-studio.toml").unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
    }
}
