use std::collections::HashMap;
use std::sync::Arc;

use crate::config::DetectionOptions;
use crate::schema::DetectionResult;

pub mod aria;
pub mod associated;
pub mod attribute;
pub mod class_mapping;
pub mod confidence;
pub mod framework;
pub mod normalize;
pub mod sibling;
pub mod test_utils;
pub mod text_content;

use normalize::normalize_label;

/// The capability contract every detection strategy implements.
///
/// Priority bands (lower = tried/weighted first): 0-19 framework-specific,
/// 20-39 high-confidence attribute/ARIA, 40-59 common attributes, 60-79
/// proximity, 80-99 fallback.
pub trait Detector: Send + Sync {
    /// Unique key within a catalog.
    fn name(&self) -> &'static str;

    fn priority(&self) -> u32;

    /// Default confidence attached to a successful detection.
    fn base_confidence(&self) -> f32;

    /// Restrict this detector to specific element tags. `None` means any.
    fn allowed_tags(&self) -> Option<&[&str]> {
        None
    }

    /// Cheap applicability pre-check. Must not fail for a well-formed
    /// context.
    fn can_detect(&self, ctx: &DetectionContext) -> bool;

    /// The actual detection. `Ok(None)` means "nothing found"; errors are
    /// isolated at the resolver boundary.
    fn detect(
        &self,
        ctx: &DetectionContext,
        options: &DetectionOptions,
    ) -> Result<Option<DetectionResult>, DetectError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DetectError {
    #[error("missing element data: {0}")]
    MissingData(String),
    #[error("detection failed: {0}")]
    Failed(String),
}

/// How a label element relates to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelRelation {
    /// Associated via a `for` attribute (or equivalent explicit link).
    ForAttribute,
    /// The label wraps the target element.
    Ancestor,
}

#[derive(Debug, Clone)]
pub struct AssociatedLabel {
    pub text: String,
    pub relation: LabelRelation,
}

/// A piece of text found next to the target element.
#[derive(Debug, Clone)]
pub struct SiblingText {
    pub text: String,
    /// Whether the text precedes the element in document order.
    pub before: bool,
    /// Sibling hops between the text and the element.
    pub distance: u32,
}

/// Text-bearing descendant of an ancestor, with enough structure for
/// selector-style lookups.
#[derive(Debug, Clone)]
pub struct ClassedText {
    pub tag: String,
    pub classes: Vec<String>,
    pub text: String,
}

/// One ancestor of the target, nearest-first in `ElementSnapshot`.
#[derive(Debug, Clone)]
pub struct AncestorSnapshot {
    pub tag: String,
    pub classes: Vec<String>,
    pub label_texts: Vec<ClassedText>,
}

/// Everything the external DOM layer extracted about one element. The
/// engine never inspects markup itself; detectors read only these
/// pre-extracted signals.
#[derive(Debug, Clone, Default)]
pub struct ElementSnapshot {
    /// Lowercase tag name.
    pub tag: String,
    pub id: Option<String>,
    pub attributes: HashMap<String, String>,
    pub classes: Vec<String>,
    /// Resolved `<label>` associations, in document order.
    pub labels: Vec<AssociatedLabel>,
    /// Resolved `aria-labelledby` target texts, in attribute order.
    pub labelled_by_texts: Vec<String>,
    pub sibling_texts: Vec<SiblingText>,
    /// Nearest-first.
    pub ancestors: Vec<AncestorSnapshot>,
    /// The element's own visible text.
    pub text_content: Option<String>,
}

impl ElementSnapshot {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_lowercase(),
            ..Default::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_label(mut self, text: impl Into<String>, relation: LabelRelation) -> Self {
        self.labels.push(AssociatedLabel {
            text: text.into(),
            relation,
        });
        self
    }

    pub fn with_labelled_by(mut self, text: impl Into<String>) -> Self {
        self.labelled_by_texts.push(text.into());
        self
    }

    pub fn with_sibling_text(mut self, text: impl Into<String>, before: bool, distance: u32) -> Self {
        self.sibling_texts.push(SiblingText {
            text: text.into(),
            before,
            distance,
        });
        self
    }

    pub fn with_ancestor(mut self, ancestor: AncestorSnapshot) -> Self {
        self.ancestors.push(ancestor);
        self
    }

    pub fn with_text_content(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }
}

/// The triggering event, when resolution was driven by user interaction.
#[derive(Debug, Clone)]
pub struct TriggerEvent {
    pub kind: String,
}

/// Immutable snapshot of one detection request. Built once per resolution
/// and passed unchanged to every detector; detectors only read it.
#[derive(Debug, Clone)]
pub struct DetectionContext {
    pub element: ElementSnapshot,
    pub page_url: Option<String>,
    pub in_shadow_dom: bool,
    pub in_iframe: bool,
    pub trigger: Option<TriggerEvent>,
    /// Free-form extension bag for host-specific data.
    pub extras: HashMap<String, serde_json::Value>,
}

impl DetectionContext {
    pub fn new(element: ElementSnapshot) -> Self {
        Self {
            element,
            page_url: None,
            in_shadow_dom: false,
            in_iframe: false,
            trigger: None,
            extras: HashMap::new(),
        }
    }

    pub fn with_page_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = Some(url.into());
        self
    }

    pub fn with_shadow_dom(mut self, in_shadow_dom: bool) -> Self {
        self.in_shadow_dom = in_shadow_dom;
        self
    }

    pub fn with_iframe(mut self, in_iframe: bool) -> Self {
        self.in_iframe = in_iframe;
        self
    }

    pub fn with_trigger(mut self, kind: impl Into<String>) -> Self {
        self.trigger = Some(TriggerEvent { kind: kind.into() });
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }
}

/// Shared wrapper around every concrete `detect` call: tag allow-list
/// short-circuit, per-options confidence floor, re-normalization, and the
/// empty-label rejection. Keeping this outside the trait lets detectors
/// stay plain structs.
pub fn run_detector(
    detector: &dyn Detector,
    ctx: &DetectionContext,
    options: &DetectionOptions,
) -> Result<Option<DetectionResult>, DetectError> {
    if let Some(tags) = detector.allowed_tags()
        && !tags.iter().any(|t| t.eq_ignore_ascii_case(&ctx.element.tag))
    {
        return Ok(None);
    }

    let Some(mut result) = detector.detect(ctx, options)? else {
        return Ok(None);
    };

    if result.confidence < options.min_confidence {
        tracing::debug!(
            detector = detector.name(),
            confidence = result.confidence,
            floor = options.min_confidence,
            "result below options floor; rejected"
        );
        return Ok(None);
    }

    if result.metadata.raw_text.is_none() {
        result.metadata.raw_text = Some(result.label.clone());
    }
    let normalized = normalize_label(&result.label, options);
    if normalized.text.is_empty() {
        tracing::debug!(
            detector = detector.name(),
            "label empty after normalization; rejected"
        );
        return Ok(None);
    }
    result.metadata.truncated = result.metadata.truncated || normalized.truncated;
    result.label = normalized.text;

    Ok(Some(result))
}

/// Structural sanity check applied at the registration boundary only.
pub fn validate_detector(detector: &dyn Detector) -> Result<(), String> {
    if detector.name().trim().is_empty() {
        return Err("detector name must be non-empty".to_string());
    }
    let base = detector.base_confidence();
    if !(0.0..=1.0).contains(&base) || base.is_nan() {
        return Err(format!("base confidence {} outside [0, 1]", base));
    }
    if let Some(tags) = detector.allowed_tags()
        && tags.is_empty()
    {
        return Err("tag allow-list must not be empty".to_string());
    }
    Ok(())
}

/// The built-in detector set, in priority order.
pub fn builtin_detectors() -> Vec<Arc<dyn Detector>> {
    vec![
        Arc::new(framework::FrameworkDetector::bootstrap()),
        Arc::new(framework::FrameworkDetector::material_ui()),
        Arc::new(framework::FrameworkDetector::google_forms()),
        Arc::new(associated::AssociatedLabelDetector),
        Arc::new(aria::AriaDetector),
        Arc::new(attribute::AttributeDetector),
        Arc::new(sibling::SiblingDetector),
        Arc::new(text_content::TextContentDetector),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::LabelSource;

    struct FixedDetector {
        label: &'static str,
        confidence: f32,
        tags: Option<&'static [&'static str]>,
    }

    impl Detector for FixedDetector {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn priority(&self) -> u32 {
            50
        }
        fn base_confidence(&self) -> f32 {
            self.confidence
        }
        fn allowed_tags(&self) -> Option<&[&str]> {
            self.tags
        }
        fn can_detect(&self, _ctx: &DetectionContext) -> bool {
            true
        }
        fn detect(
            &self,
            _ctx: &DetectionContext,
            _options: &DetectionOptions,
        ) -> Result<Option<DetectionResult>, DetectError> {
            Ok(Some(DetectionResult::new(
                self.label,
                self.confidence,
                "fixed",
                LabelSource::Attribute,
            )))
        }
    }

    fn input_context() -> DetectionContext {
        DetectionContext::new(ElementSnapshot::new("input"))
    }

    #[test]
    fn wrapper_short_circuits_on_tag_allow_list() {
        let detector = FixedDetector {
            label: "Name",
            confidence: 0.8,
            tags: Some(&["button"]),
        };
        let result = run_detector(&detector, &input_context(), &DetectionOptions::default());
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn wrapper_rejects_below_options_floor() {
        let detector = FixedDetector {
            label: "Name",
            confidence: 0.3,
            tags: None,
        };
        let options = DetectionOptions {
            min_confidence: 0.5,
            ..Default::default()
        };
        let result = run_detector(&detector, &input_context(), &options);
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn wrapper_normalizes_and_records_raw_text() {
        let detector = FixedDetector {
            label: "  First   name ",
            confidence: 0.8,
            tags: None,
        };
        let result = run_detector(&detector, &input_context(), &DetectionOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(result.label, "First name");
        assert_eq!(result.metadata.raw_text.as_deref(), Some("  First   name "));
    }

    #[test]
    fn wrapper_rejects_empty_after_normalization() {
        let detector = FixedDetector {
            label: "   \t ",
            confidence: 0.8,
            tags: None,
        };
        let result = run_detector(&detector, &input_context(), &DetectionOptions::default());
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn validation_rejects_bad_shapes() {
        struct Nameless;
        impl Detector for Nameless {
            fn name(&self) -> &'static str {
                ""
            }
            fn priority(&self) -> u32 {
                0
            }
            fn base_confidence(&self) -> f32 {
                0.5
            }
            fn can_detect(&self, _ctx: &DetectionContext) -> bool {
                false
            }
            fn detect(
                &self,
                _ctx: &DetectionContext,
                _options: &DetectionOptions,
            ) -> Result<Option<DetectionResult>, DetectError> {
                Ok(None)
            }
        }
        assert!(validate_detector(&Nameless).is_err());

        let out_of_range = FixedDetector {
            label: "x",
            confidence: 1.5,
            tags: None,
        };
        assert!(validate_detector(&out_of_range).is_err());
    }

    #[test]
    fn builtin_set_is_priority_ordered_and_unique() {
        let detectors = builtin_detectors();
        assert_eq!(detectors.len(), 8);
        let priorities: Vec<u32> = detectors.iter().map(|d| d.priority()).collect();
        let mut sorted = priorities.clone();
        sorted.sort_unstable();
        assert_eq!(priorities, sorted);

        let mut names: Vec<&str> = detectors.iter().map(|d| d.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 8);
    }
}
