//! Run configuration.
//!
//! [`ExtractionConfig`] groups every component's options. It deserializes from
//! partial JSON: missing keys take their defaults and unknown keys are ignored.
//!
//! ```
//! use lenscrl::ExtractionConfig;
//!
//! let config = ExtractionConfig::from_json_str(r#"{
//!     "manual_name": "PROCSG02",
//!     "validator": { "min_width": 80 }
//! }"#).unwrap();
//! assert_eq!(config.prefix, "CRL");
//! assert_eq!(config.validator.min_width, 80.0);
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pipeline::naming::DEFAULT_PREFIX;
use crate::source::LoadOptions;
use crate::spatial::{OrphanPolicy, SpatialConfig};
use crate::structure::{AdaptiveConfig, SectionDetectorConfig};
use crate::validate::ValidatorConfig;

/// Configuration for one extraction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Filename prefix
    pub prefix: String,

    /// Manual name; deduced from the document when absent
    pub manual_name: Option<String>,

    /// Baseline heading detector
    pub detection: SectionDetectorConfig,

    /// Adaptive heading detector
    pub adaptive: AdaptiveConfig,

    /// Image validator
    pub validator: ValidatorConfig,

    /// Layout analysis and association
    pub spatial: SpatialConfig,

    /// PDF loading
    pub load: LoadOptions,
}

impl ExtractionConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings no run could use.
    pub fn validate(&self) -> Result<()> {
        if self.prefix.trim().is_empty() {
            return Err(Error::Config("prefix must not be empty".into()));
        }
        if self.detection.font_size_min > self.detection.font_size_max {
            return Err(Error::Config(format!(
                "font_size_min {} exceeds font_size_max {}",
                self.detection.font_size_min, self.detection.font_size_max
            )));
        }
        if self.validator.min_aspect_ratio > self.validator.max_aspect_ratio {
            return Err(Error::Config("min_aspect_ratio exceeds max_aspect_ratio".into()));
        }
        if self.spatial.max_distance <= 0.0 {
            return Err(Error::Config("max_distance must be positive".into()));
        }
        Ok(())
    }

    /// Set the filename prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the manual name.
    pub fn with_manual_name(mut self, name: impl Into<String>) -> Self {
        self.manual_name = Some(name.into());
        self
    }

    /// Set the baseline detector configuration.
    pub fn with_detection(mut self, detection: SectionDetectorConfig) -> Self {
        self.detection = detection;
        self
    }

    /// Set the adaptive detector configuration.
    pub fn with_adaptive(mut self, adaptive: AdaptiveConfig) -> Self {
        self.adaptive = adaptive;
        self
    }

    /// Set the validator configuration.
    pub fn with_validator(mut self, validator: ValidatorConfig) -> Self {
        self.validator = validator;
        self
    }

    /// Set the spatial configuration.
    pub fn with_spatial(mut self, spatial: SpatialConfig) -> Self {
        self.spatial = spatial;
        self
    }

    /// Set the orphan policy.
    pub fn with_orphan_policy(mut self, policy: OrphanPolicy) -> Self {
        self.spatial.orphan_policy = policy;
        self
    }

    /// Set the load options.
    pub fn with_load_options(mut self, load: LoadOptions) -> Self {
        self.load = load;
        self
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            manual_name: None,
            detection: SectionDetectorConfig::default(),
            adaptive: AdaptiveConfig::default(),
            validator: ValidatorConfig::default(),
            spatial: SpatialConfig::default(),
            load: LoadOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_json() {
        let config = ExtractionConfig::from_json_str(
            r#"{"spatial": {"orphan_policy": "nearest_section"}, "unknown_key": 1}"#,
        )
        .unwrap();
        assert_eq!(config.spatial.orphan_policy, OrphanPolicy::NearestSection);
        assert_eq!(config.spatial.max_distance, 200.0);
        assert_eq!(config.detection.font_size_min, 12.0);
        assert!(config.manual_name.is_none());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ExtractionConfig::from_json_str(r#"{"prefix": " "}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ExtractionConfig::from_json_str(r#"{"detection": {"font_size_min": 20}}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(ExtractionConfig::from_json_str("{"), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_file_round_trip() {
        let config = ExtractionConfig::new().with_manual_name("OMA").with_prefix("IMG");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_json().unwrap().as_bytes()).unwrap();

        let loaded = ExtractionConfig::from_json_file(file.path()).unwrap();
        assert_eq!(loaded.prefix, "IMG");
        assert_eq!(loaded.manual_name.as_deref(), Some("OMA"));
    }
}
