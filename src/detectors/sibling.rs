use crate::config::DetectionOptions;
use crate::detectors::confidence::{AdjustmentFactors, adjust_confidence};
use crate::detectors::{DetectError, DetectionContext, Detector, SiblingText};
use crate::schema::{DetectionResult, LabelSource};
use serde_json::json;

/// Proximity heuristic: the nearest preceding sibling text, falling back
/// to the nearest following one at a small penalty.
pub struct SiblingDetector;

const AFTER_PENALTY: f32 = 0.05;

impl SiblingDetector {
    fn nearest(texts: &[SiblingText], before: bool) -> Option<&SiblingText> {
        texts
            .iter()
            .filter(|t| t.before == before && !t.text.trim().is_empty())
            .min_by_key(|t| t.distance)
    }
}

impl Detector for SiblingDetector {
    fn name(&self) -> &'static str {
        "sibling"
    }

    fn priority(&self) -> u32 {
        65
    }

    fn base_confidence(&self) -> f32 {
        0.60
    }

    fn can_detect(&self, ctx: &DetectionContext) -> bool {
        ctx.element
            .sibling_texts
            .iter()
            .any(|t| !t.text.trim().is_empty())
    }

    fn detect(
        &self,
        ctx: &DetectionContext,
        _options: &DetectionOptions,
    ) -> Result<Option<DetectionResult>, DetectError> {
        let texts = &ctx.element.sibling_texts;
        let (sibling, base) = match Self::nearest(texts, true) {
            Some(before) => (before, self.base_confidence()),
            None => match Self::nearest(texts, false) {
                Some(after) => (after, self.base_confidence() - AFTER_PENALTY),
                None => return Ok(None),
            },
        };

        let confidence =
            adjust_confidence(base, sibling.text.trim(), AdjustmentFactors::text_quality());
        let position = if sibling.before { "before" } else { "after" };
        Ok(Some(
            DetectionResult::new(
                sibling.text.clone(),
                confidence,
                self.name(),
                LabelSource::Sibling,
            )
            .with_extra("position", json!(position))
            .with_extra("distance", json!(sibling.distance)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_utils::snapshot;

    #[test]
    fn nearest_before_text_wins() {
        let element = snapshot("input")
            .with_sibling_text("Far label", true, 3)
            .with_sibling_text("Near label", true, 1)
            .with_sibling_text("After text", false, 1);
        let ctx = DetectionContext::new(element);
        let detector = SiblingDetector;

        assert!(detector.can_detect(&ctx));
        let result = detector
            .detect(&ctx, &DetectionOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(result.label, "Near label");
        assert_eq!(result.source, LabelSource::Sibling);
        assert_eq!(result.metadata.extras["position"], json!("before"));
        // 0.60 +0.05 length bonus.
        assert!((result.confidence - 0.65).abs() < 1e-6);
    }

    #[test]
    fn falls_back_to_after_text_with_penalty() {
        let element = snapshot("input").with_sibling_text("Trailing hint", false, 1);
        let ctx = DetectionContext::new(element);
        let result = SiblingDetector
            .detect(&ctx, &DetectionOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(result.label, "Trailing hint");
        assert_eq!(result.metadata.extras["position"], json!("after"));
        // 0.55 +0.05 length bonus.
        assert!((result.confidence - 0.60).abs() < 1e-6);
    }

    #[test]
    fn blank_sibling_texts_ignored() {
        let element = snapshot("input").with_sibling_text("  ", true, 1);
        let ctx = DetectionContext::new(element);
        assert!(!SiblingDetector.can_detect(&ctx));
        assert!(SiblingDetector
            .detect(&ctx, &DetectionOptions::default())
            .unwrap()
            .is_none());
    }
}
