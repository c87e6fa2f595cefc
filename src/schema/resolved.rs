use crate::config::SelectionStrategy;
use crate::schema::result::DetectionResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A detection result annotated by the resolver with the producing
/// detector's effective priority and, for the weighted strategy, a
/// computed score. Lives only within one resolution call.
#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, PartialEq)]
pub struct LabelCandidate {
    pub label: String,
    pub confidence: f32,
    pub detector: String,
    /// The detector's priority after any catalog-level override.
    pub effective_priority: u32,
    /// Only computed under the priority-weighted strategy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weighted_score: Option<f32>,
    /// Full provenance of the underlying result.
    pub result: DetectionResult,
}

impl LabelCandidate {
    pub fn new(result: DetectionResult, detector: impl Into<String>, priority: u32) -> Self {
        Self {
            label: result.label.clone(),
            confidence: result.confidence,
            detector: detector.into(),
            effective_priority: priority,
            weighted_score: None,
            result,
        }
    }

    /// Score used for ordering under the priority-weighted strategy,
    /// falling back to raw confidence when no score was computed.
    pub fn score(&self) -> f32 {
        self.weighted_score.unwrap_or(self.confidence)
    }
}

/// The outcome of one resolution call.
///
/// `success == false` means no candidate cleared the floor: `label` is the
/// configured fallback and `confidence` is 0, but `candidates` still holds
/// everything that was collected, for diagnostics.
#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone)]
pub struct ResolvedLabel {
    pub label: String,
    pub confidence: f32,
    /// Winning detector name, or `"none"` on failure.
    pub detector: String,
    pub strategy: SelectionStrategy,
    pub success: bool,
    /// Every candidate collected, unfiltered, in collection order.
    pub candidates: Vec<LabelCandidate>,
    /// Detectors whose `detect` was actually invoked.
    pub detectors_run: usize,
    /// Detectors that produced a (non-null) result.
    pub detectors_succeeded: usize,
    pub elapsed_ms: f64,
    /// The winning detection result, when successful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<DetectionResult>,
}

impl ResolvedLabel {
    /// Unsuccessful outcome carrying the fallback label and whatever
    /// candidates were collected.
    pub fn fallback(
        fallback_label: impl Into<String>,
        strategy: SelectionStrategy,
        candidates: Vec<LabelCandidate>,
        detectors_run: usize,
        detectors_succeeded: usize,
        elapsed_ms: f64,
    ) -> Self {
        Self {
            label: fallback_label.into(),
            confidence: 0.0,
            detector: "none".to_string(),
            strategy,
            success: false,
            candidates,
            detectors_run,
            detectors_succeeded,
            elapsed_ms,
            result: None,
        }
    }
}
