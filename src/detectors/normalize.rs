use crate::config::DetectionOptions;

const ELLIPSIS: &str = "...";

/// A label after the shared cleanup pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLabel {
    pub text: String,
    pub truncated: bool,
}

/// Shared label cleanup: whitespace collapse, trim, optional transform,
/// then truncation with an ellipsis at `max_length`.
///
/// Every detector result goes through this regardless of what the
/// detector itself already did, so labels stay comparable across
/// strategies.
pub fn normalize_label(raw: &str, options: &DetectionOptions) -> NormalizedLabel {
    let mut text = if options.collapse_whitespace {
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    } else if options.trim {
        raw.trim().to_string()
    } else {
        raw.to_string()
    };

    if let Some(transform) = &options.transform {
        text = transform(&text);
    }

    let mut truncated = false;
    if text.chars().count() > options.max_length {
        truncated = true;
        if options.max_length > ELLIPSIS.len() {
            let keep = options.max_length - ELLIPSIS.len();
            let head: String = text.chars().take(keep).collect();
            text = format!("{}{}", head.trim_end(), ELLIPSIS);
        } else {
            text = text.chars().take(options.max_length).collect();
        }
    }

    NormalizedLabel { text, truncated }
}

/// Turn an identifier-ish attribute value into words: `first_name`,
/// `first-name` and `firstName` all become `First Name`.
pub fn humanize_identifier(identifier: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for ch in identifier.chars() {
        if ch == '_' || ch == '-' || ch == '.' || ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if ch.is_uppercase()
            && current.chars().last().is_some_and(|prev| prev.is_lowercase())
        {
            words.push(std::mem::take(&mut current));
            current.push(ch);
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|word| capitalize(word))
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
