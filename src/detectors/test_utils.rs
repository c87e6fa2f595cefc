//! Shared builders for detector and resolver tests.

use crate::detectors::{AncestorSnapshot, ClassedText, ElementSnapshot};

/// Create an element snapshot for testing.
///
/// Chain the `with_*` builders for attributes, labels, siblings and
/// ancestors:
///
/// ```rust
/// use labelsense::detectors::test_utils::snapshot;
///
/// let element = snapshot("input")
///     .with_attr("placeholder", "Your email")
///     .with_sibling_text("Email", true, 1);
/// ```
pub fn snapshot(tag: &str) -> ElementSnapshot {
    ElementSnapshot::new(tag)
}

/// An ancestor container holding one labelled text, the shape framework
/// detectors look for.
pub fn framework_container(
    container_classes: &[&str],
    label_tag: &str,
    label_classes: &[&str],
    label_text: &str,
) -> AncestorSnapshot {
    AncestorSnapshot {
        tag: "div".to_string(),
        classes: container_classes.iter().map(|c| c.to_string()).collect(),
        label_texts: vec![ClassedText {
            tag: label_tag.to_string(),
            classes: label_classes.iter().map(|c| c.to_string()).collect(),
            text: label_text.to_string(),
        }],
    }
}
