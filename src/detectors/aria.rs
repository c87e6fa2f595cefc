use crate::config::DetectionOptions;
use crate::detectors::confidence::{AdjustmentFactors, adjust_confidence};
use crate::detectors::{DetectError, DetectionContext, Detector};
use crate::schema::{DetectionResult, LabelSource};

/// ARIA labelling: `aria-label` directly, `aria-labelledby` via the
/// pre-resolved target texts.
pub struct AriaDetector;

const LABELLED_BY_PENALTY: f32 = 0.05;

impl Detector for AriaDetector {
    fn name(&self) -> &'static str {
        "aria"
    }

    fn priority(&self) -> u32 {
        25
    }

    fn base_confidence(&self) -> f32 {
        0.90
    }

    fn can_detect(&self, ctx: &DetectionContext) -> bool {
        ctx.element
            .attr("aria-label")
            .is_some_and(|v| !v.trim().is_empty())
            || !ctx.element.labelled_by_texts.is_empty()
    }

    fn detect(
        &self,
        ctx: &DetectionContext,
        _options: &DetectionOptions,
    ) -> Result<Option<DetectionResult>, DetectError> {
        if let Some(value) = ctx.element.attr("aria-label")
            && !value.trim().is_empty()
        {
            // An authored aria-label is an exact match by definition.
            let confidence = adjust_confidence(
                self.base_confidence(),
                value.trim(),
                AdjustmentFactors::text_quality().exact(),
            );
            return Ok(Some(
                DetectionResult::new(value, confidence, self.name(), LabelSource::Attribute)
                    .with_selector("[aria-label]"),
            ));
        }

        let joined = ctx
            .element
            .labelled_by_texts
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            return Ok(None);
        }
        let confidence = adjust_confidence(
            self.base_confidence() - LABELLED_BY_PENALTY,
            &joined,
            AdjustmentFactors::text_quality(),
        );
        Ok(Some(
            DetectionResult::new(joined, confidence, self.name(), LabelSource::Associated)
                .with_selector("[aria-labelledby]"),
        ))
    }
}
