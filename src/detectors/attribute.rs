use crate::config::DetectionOptions;
use crate::detectors::confidence::{AdjustmentFactors, adjust_confidence};
use crate::detectors::normalize::humanize_identifier;
use crate::detectors::{DetectError, DetectionContext, Detector};
use crate::schema::{DetectionResult, LabelSource};

/// Common labelling attributes, checked in order of reliability:
/// `placeholder`, `title`, `alt`, `name` (humanized), and `value` on
/// submit-style inputs.
pub struct AttributeDetector;

struct AttributeCheck {
    attr: &'static str,
    penalty: f32,
    humanize: bool,
}

const CHECKS: &[AttributeCheck] = &[
    AttributeCheck {
        attr: "placeholder",
        penalty: 0.0,
        humanize: false,
    },
    AttributeCheck {
        attr: "title",
        penalty: 0.10,
        humanize: false,
    },
    AttributeCheck {
        attr: "alt",
        penalty: 0.05,
        humanize: false,
    },
    AttributeCheck {
        attr: "name",
        penalty: 0.20,
        humanize: true,
    },
];

const VALUE_PENALTY: f32 = 0.15;
const VALUE_INPUT_TYPES: &[&str] = &["submit", "button", "reset"];

impl AttributeDetector {
    fn value_applies(ctx: &DetectionContext) -> bool {
        ctx.element.tag == "input"
            && ctx
                .element
                .attr("type")
                .is_some_and(|t| VALUE_INPUT_TYPES.iter().any(|v| t.eq_ignore_ascii_case(v)))
    }
}

impl Detector for AttributeDetector {
    fn name(&self) -> &'static str {
        "attribute"
    }

    fn priority(&self) -> u32 {
        45
    }

    fn base_confidence(&self) -> f32 {
        0.75
    }

    fn can_detect(&self, ctx: &DetectionContext) -> bool {
        CHECKS
            .iter()
            .any(|check| ctx.element.attr(check.attr).is_some_and(|v| !v.trim().is_empty()))
            || (Self::value_applies(ctx)
                && ctx.element.attr("value").is_some_and(|v| !v.trim().is_empty()))
    }

    fn detect(
        &self,
        ctx: &DetectionContext,
        _options: &DetectionOptions,
    ) -> Result<Option<DetectionResult>, DetectError> {
        for check in CHECKS {
            let Some(value) = ctx.element.attr(check.attr) else {
                continue;
            };
            if value.trim().is_empty() {
                continue;
            }
            let label = if check.humanize {
                humanize_identifier(value.trim())
            } else {
                value.to_string()
            };
            let confidence = adjust_confidence(
                self.base_confidence() - check.penalty,
                label.trim(),
                AdjustmentFactors::text_quality(),
            );
            return Ok(Some(
                DetectionResult::new(label, confidence, self.name(), LabelSource::Attribute)
                    .with_raw_text(value)
                    .with_selector(format!("[{}]", check.attr)),
            ));
        }

        if Self::value_applies(ctx)
            && let Some(value) = ctx.element.attr("value")
            && !value.trim().is_empty()
        {
            let confidence = adjust_confidence(
                self.base_confidence() - VALUE_PENALTY,
                value.trim(),
                AdjustmentFactors::text_quality(),
            );
            return Ok(Some(
                DetectionResult::new(value, confidence, self.name(), LabelSource::Attribute)
                    .with_selector("[value]"),
            ));
        }

        Ok(None)
    }
}
