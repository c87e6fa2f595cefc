use crate::config::DetectionOptions;
use crate::detectors::confidence::{AdjustmentFactors, adjust_confidence};
use crate::detectors::normalize::humanize_identifier;
use crate::detectors::{DetectError, DetectionContext, Detector};
use crate::schema::{DetectionResult, LabelSource};

/// Last-band strategy: the element's own text, or a humanized `id` when
/// even that is missing.
pub struct TextContentDetector;

const ID_FALLBACK_PENALTY: f32 = 0.10;

const TEXT_BEARING_TAGS: &[&str] = &[
    "button", "a", "summary", "legend", "option", "th", "td", "div", "span", "label",
];

impl Detector for TextContentDetector {
    fn name(&self) -> &'static str {
        "text-content"
    }

    fn priority(&self) -> u32 {
        90
    }

    fn base_confidence(&self) -> f32 {
        0.50
    }

    fn allowed_tags(&self) -> Option<&[&str]> {
        Some(TEXT_BEARING_TAGS)
    }

    fn can_detect(&self, ctx: &DetectionContext) -> bool {
        ctx.element
            .text_content
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
            || ctx.element.id.as_deref().is_some_and(|id| !id.is_empty())
    }

    fn detect(
        &self,
        ctx: &DetectionContext,
        _options: &DetectionOptions,
    ) -> Result<Option<DetectionResult>, DetectError> {
        if let Some(text) = ctx.element.text_content.as_deref()
            && !text.trim().is_empty()
        {
            let confidence = adjust_confidence(
                self.base_confidence(),
                text.trim(),
                AdjustmentFactors::text_quality(),
            );
            return Ok(Some(DetectionResult::new(
                text,
                confidence,
                self.name(),
                LabelSource::TextContent,
            )));
        }

        if let Some(id) = ctx.element.id.as_deref()
            && !id.is_empty()
        {
            let label = humanize_identifier(id);
            let confidence = adjust_confidence(
                self.base_confidence() - ID_FALLBACK_PENALTY,
                label.trim(),
                AdjustmentFactors::text_quality(),
            );
            return Ok(Some(
                DetectionResult::new(label, confidence, self.name(), LabelSource::Fallback)
                    .with_raw_text(id),
            ));
        }

        Ok(None)
    }
}
