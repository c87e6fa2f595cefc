use crate::config::DetectionOptions;
use crate::detectors::confidence::{AdjustmentFactors, adjust_confidence};
use crate::detectors::{DetectError, DetectionContext, Detector, LabelRelation};
use crate::schema::{DetectionResult, LabelSource};

/// Explicit `<label>` association: a `for`-linked label at full base
/// confidence, a wrapping label slightly below it.
pub struct AssociatedLabelDetector;

const ANCESTOR_PENALTY: f32 = 0.05;

impl Detector for AssociatedLabelDetector {
    fn name(&self) -> &'static str {
        "associated-label"
    }

    fn priority(&self) -> u32 {
        20
    }

    fn base_confidence(&self) -> f32 {
        0.95
    }

    fn can_detect(&self, ctx: &DetectionContext) -> bool {
        !ctx.element.labels.is_empty()
    }

    fn detect(
        &self,
        ctx: &DetectionContext,
        _options: &DetectionOptions,
    ) -> Result<Option<DetectionResult>, DetectError> {
        // First label in document order wins.
        let Some(label) = ctx
            .element
            .labels
            .iter()
            .find(|l| !l.text.trim().is_empty())
        else {
            return Ok(None);
        };

        let (base, source, selector) = match label.relation {
            LabelRelation::ForAttribute => {
                (self.base_confidence(), LabelSource::Associated, "label[for]")
            }
            LabelRelation::Ancestor => (
                self.base_confidence() - ANCESTOR_PENALTY,
                LabelSource::Ancestor,
                "label",
            ),
        };
        let confidence = adjust_confidence(
            base,
            label.text.trim(),
            AdjustmentFactors::text_quality(),
        );

        Ok(Some(
            DetectionResult::new(label.text.clone(), confidence, self.name(), source)
                .with_selector(selector),
        ))
    }
}
