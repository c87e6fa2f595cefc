use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which mechanism produced the label text.
#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LabelSource {
    /// Read directly off an attribute of the element.
    Attribute,
    /// An element explicitly associated with the target (`label[for]`,
    /// `aria-labelledby`).
    Associated,
    /// A wrapping ancestor element (e.g. an enclosing `<label>`).
    Ancestor,
    /// Nearby sibling text.
    Sibling,
    /// The element's own visible text.
    TextContent,
    /// A CSS-framework convention match.
    Framework,
    /// Last-resort derivation (e.g. a humanized `id`).
    Fallback,
}

/// Provenance attached to every detection result.
#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, PartialEq, Default)]
pub struct ResultMetadata {
    /// The text as the detector saw it, before normalization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(default)]
    pub truncated: bool,
    /// Selector-ish description of where the text came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extras: HashMap<String, serde_json::Value>,
}

/// One detector's verdict for one element.
///
/// Invariant: `confidence` is in [0, 1] and `label` is non-empty after
/// normalization, or the result is discarded by the shared wrapper.
#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, PartialEq)]
pub struct DetectionResult {
    pub label: String,
    pub confidence: f32,
    /// Name of the detector that produced this result.
    pub strategy: String,
    pub source: LabelSource,
    #[serde(default)]
    pub metadata: ResultMetadata,
}

impl DetectionResult {
    pub fn new(
        label: impl Into<String>,
        confidence: f32,
        strategy: impl Into<String>,
        source: LabelSource,
    ) -> Self {
        Self {
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
            strategy: strategy.into(),
            source,
            metadata: ResultMetadata::default(),
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.metadata.selector = Some(selector.into());
        self
    }

    pub fn with_framework(mut self, framework: impl Into<String>) -> Self {
        self.metadata.framework = Some(framework.into());
        self
    }

    pub fn with_raw_text(mut self, raw: impl Into<String>) -> Self {
        self.metadata.raw_text = Some(raw.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.extras.insert(key.into(), value);
        self
    }
}
