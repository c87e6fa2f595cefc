use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default cap on normalized label length, ellipsis included.
pub const DEFAULT_MAX_LABEL_LENGTH: usize = 100;

/// Label reported when no candidate clears the confidence floor.
pub const DEFAULT_FALLBACK_LABEL: &str = "Unlabeled";

/// Default priority bonus factor for the priority-weighted strategy.
pub const DEFAULT_PRIORITY_WEIGHT: f32 = 0.1;

/// How the resolver picks a winner from the collected candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionStrategy {
    /// Accept the first result that clears the floor, in priority order.
    FirstMatch,
    /// Run everything, pick the highest raw confidence.
    #[default]
    BestConfidence,
    /// Run everything, pick the highest priority-weighted score.
    PriorityWeighted,
}

/// Custom text transform applied during label normalization.
pub type LabelTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Tunables applied uniformly to every detector result.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionOptions {
    /// Maximum label length; longer labels are truncated with an ellipsis.
    pub max_length: usize,
    /// Results below this confidence are rejected per detector.
    pub min_confidence: f32,
    pub collapse_whitespace: bool,
    pub trim: bool,
    /// Applied after collapse/trim and before truncation. Not serialized.
    #[serde(skip)]
    pub transform: Option<LabelTransform>,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_LABEL_LENGTH,
            min_confidence: 0.0,
            collapse_whitespace: true,
            trim: true,
            transform: None,
        }
    }
}

impl fmt::Debug for DetectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectionOptions")
            .field("max_length", &self.max_length)
            .field("min_confidence", &self.min_confidence)
            .field("collapse_whitespace", &self.collapse_whitespace)
            .field("trim", &self.trim)
            .field("transform", &self.transform.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Resolver configuration. All fields have documented defaults; partial
/// updates go through [`ResolverConfigUpdate`] and merge field-wise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub strategy: SelectionStrategy,
    /// Candidates below this confidence are filtered out before selection.
    /// Clamped to [0, 1].
    pub min_confidence: f32,
    /// Cap on detectors considered per resolution; `None` = unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_detectors: Option<usize>,
    pub priority_weight: f32,
    pub fallback_label: String,
    pub detection_options: DetectionOptions,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            strategy: SelectionStrategy::default(),
            min_confidence: 0.0,
            max_detectors: None,
            priority_weight: DEFAULT_PRIORITY_WEIGHT,
            fallback_label: DEFAULT_FALLBACK_LABEL.to_string(),
            detection_options: DetectionOptions::default(),
        }
    }
}

/// Partial configuration; `None` fields leave the current value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfigUpdate {
    pub strategy: Option<SelectionStrategy>,
    pub min_confidence: Option<f32>,
    /// `Some(n)` sets the cap. Clearing an existing cap goes through
    /// `Resolver::set_max_detectors`.
    pub max_detectors: Option<usize>,
    pub priority_weight: Option<f32>,
    pub fallback_label: Option<String>,
    pub detection_options: Option<DetectionOptions>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read or write config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl ResolverConfig {
    pub fn merge(&mut self, update: ResolverConfigUpdate) {
        if let Some(strategy) = update.strategy {
            self.strategy = strategy;
        }
        if let Some(min_confidence) = update.min_confidence {
            self.min_confidence = min_confidence.clamp(0.0, 1.0);
        }
        if let Some(max_detectors) = update.max_detectors {
            self.max_detectors = Some(max_detectors);
        }
        if let Some(priority_weight) = update.priority_weight {
            self.priority_weight = priority_weight;
        }
        if let Some(fallback_label) = update.fallback_label {
            self.fallback_label = fallback_label;
        }
        if let Some(detection_options) = update.detection_options {
            self.detection_options = detection_options;
        }
    }

    /// Load from the user config file, falling back to defaults.
    pub fn load() -> Self {
        if let Some(config_path) = Self::config_file_path()
            && let Ok(content) = std::fs::read_to_string(config_path)
            && let Ok(config) = toml::from_str::<ResolverConfig>(&content)
        {
            let mut config = config;
            config.min_confidence = config.min_confidence.clamp(0.0, 1.0);
            return config;
        }
        Self::default()
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: ResolverConfig = toml::from_str(&content)?;
        config.min_confidence = config.min_confidence.clamp(0.0, 1.0);
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(config_path) = Self::config_file_path() {
            self.save_to(&config_path)?;
        }
        Ok(())
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("labelsense");
            path.push("config.toml");
            path
        })
    }
}
