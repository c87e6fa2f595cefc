use crate::detectors::{AncestorSnapshot, ClassedText};

/// Declarative description of how one CSS framework structures labelled
/// form controls: which container classes wrap a control, and which
/// classes/tags mark the label text inside that container.
#[derive(Debug, Clone)]
pub struct ClassMapping {
    pub framework: &'static str,
    pub container_classes: &'static [&'static str],
    pub label_classes: &'static [&'static str],
    /// Tags accepted as labels even without a recognized class.
    pub label_tags: &'static [&'static str],
}

impl ClassMapping {
    pub fn matches_container(&self, ancestor: &AncestorSnapshot) -> Option<&'static str> {
        self.container_classes
            .iter()
            .find(|class| ancestor.classes.iter().any(|c| c == *class))
            .copied()
    }

    pub fn matches_label(&self, text: &ClassedText) -> bool {
        self.label_classes
            .iter()
            .any(|class| text.classes.iter().any(|c| c == class))
            || self
                .label_tags
                .iter()
                .any(|tag| tag.eq_ignore_ascii_case(&text.tag))
    }

    /// Selector-ish description of a match, for provenance.
    pub fn describe_match(&self, container_class: &str, label: &ClassedText) -> String {
        match label.classes.iter().find(|c| {
            self.label_classes.iter().any(|class| c.as_str() == *class)
        }) {
            Some(label_class) => format!(".{} .{}", container_class, label_class),
            None => format!(".{} {}", container_class, label.tag),
        }
    }
}

pub fn bootstrap_mapping() -> ClassMapping {
    ClassMapping {
        framework: "bootstrap",
        container_classes: &[
            "form-group",
            "input-group",
            "form-floating",
            "form-check",
            "mb-3",
        ],
        label_classes: &[
            "form-label",
            "control-label",
            "col-form-label",
            "form-check-label",
            "input-group-text",
        ],
        label_tags: &["label", "legend"],
    }
}

pub fn material_ui_mapping() -> ClassMapping {
    ClassMapping {
        framework: "material-ui",
        container_classes: &[
            "MuiFormControl-root",
            "MuiTextField-root",
            "MuiFormGroup-root",
        ],
        label_classes: &[
            "MuiFormLabel-root",
            "MuiInputLabel-root",
            "MuiFormControlLabel-label",
        ],
        label_tags: &["label", "legend"],
    }
}

pub fn google_forms_mapping() -> ClassMapping {
    ClassMapping {
        framework: "google-forms",
        container_classes: &[
            "freebirdFormviewerComponentsQuestionBaseRoot",
            "Qr7Oae",
            "geS5n",
        ],
        label_classes: &[
            "freebirdFormviewerComponentsQuestionBaseTitle",
            "M7eMe",
            "HoXoMd",
        ],
        label_tags: &[],
    }
}
