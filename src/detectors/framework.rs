use crate::config::DetectionOptions;
use crate::detectors::class_mapping::{
    ClassMapping, bootstrap_mapping, google_forms_mapping, material_ui_mapping,
};
use crate::detectors::confidence::{AdjustmentFactors, adjust_confidence};
use crate::detectors::{DetectError, DetectionContext, Detector};
use crate::schema::{DetectionResult, LabelSource};

const FORM_CONTROL_TAGS: &[&str] = &["input", "select", "textarea", "button"];

/// One detector front per framework, all sharing the declarative
/// class-mapping walk. A matching container ancestor whose label texts
/// include a recognized classed text yields the label.
pub struct FrameworkDetector {
    name: &'static str,
    priority: u32,
    mapping: ClassMapping,
}

impl FrameworkDetector {
    pub fn bootstrap() -> Self {
        Self {
            name: "bootstrap",
            priority: 10,
            mapping: bootstrap_mapping(),
        }
    }

    pub fn material_ui() -> Self {
        Self {
            name: "material-ui",
            priority: 12,
            mapping: material_ui_mapping(),
        }
    }

    pub fn google_forms() -> Self {
        Self {
            name: "google-forms",
            priority: 14,
            mapping: google_forms_mapping(),
        }
    }
}

impl Detector for FrameworkDetector {
    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn base_confidence(&self) -> f32 {
        0.85
    }

    fn allowed_tags(&self) -> Option<&[&str]> {
        Some(FORM_CONTROL_TAGS)
    }

    fn can_detect(&self, ctx: &DetectionContext) -> bool {
        ctx.element
            .ancestors
            .iter()
            .any(|ancestor| self.mapping.matches_container(ancestor).is_some())
    }

    fn detect(
        &self,
        ctx: &DetectionContext,
        _options: &DetectionOptions,
    ) -> Result<Option<DetectionResult>, DetectError> {
        // Ancestors are nearest-first; the innermost matching container
        // wins so nested form groups resolve to the closest label.
        for ancestor in &ctx.element.ancestors {
            let Some(container_class) = self.mapping.matches_container(ancestor) else {
                continue;
            };
            let Some(label) = ancestor
                .label_texts
                .iter()
                .find(|text| self.mapping.matches_label(text) && !text.text.trim().is_empty())
            else {
                continue;
            };

            let confidence = adjust_confidence(
                self.base_confidence(),
                label.text.trim(),
                AdjustmentFactors::text_quality().exact(),
            );
            let result = DetectionResult::new(
                label.text.clone(),
                confidence,
                self.name,
                LabelSource::Framework,
            )
            .with_framework(self.mapping.framework)
            .with_selector(self.mapping.describe_match(container_class, label));
            return Ok(Some(result));
        }
        Ok(None)
    }
}
