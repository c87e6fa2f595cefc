use once_cell::sync::Lazy;
use regex::Regex;

/// Bonus for labels whose length falls in the comfortable range.
pub const LENGTH_BONUS: f32 = 0.05;
/// Penalty for labels shorter than [`MIN_COMFORTABLE_LENGTH`].
pub const SHORT_PENALTY: f32 = 0.10;
/// Penalty for labels matching the generic-word set.
pub const GENERIC_PENALTY: f32 = 0.15;
/// Bonus for an exact pattern match.
pub const EXACT_MATCH_BONUS: f32 = 0.10;

pub const MIN_COMFORTABLE_LENGTH: usize = 3;
pub const MAX_COMFORTABLE_LENGTH: usize = 50;

/// Words that name the control rather than describe it. A label that is
/// nothing but one of these carries very little information.
static GENERIC_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(input|field|text(box|field)?|submit|button|select|choose|option|value|enter|data|label|form|click here|\*)$",
    )
    .unwrap()
});

pub fn is_generic_label(label: &str) -> bool {
    GENERIC_LABEL.is_match(label.trim())
}

/// Which adjustments to apply on top of a base confidence. Factors are
/// compositional; any subset may be enabled per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdjustmentFactors {
    /// Length bonus / short penalty.
    pub length: bool,
    /// Generic-word penalty.
    pub generic_words: bool,
    /// Exact-pattern-match bonus.
    pub exact_match: bool,
}

impl AdjustmentFactors {
    /// The usual combination for heuristic text sources.
    pub fn text_quality() -> Self {
        Self {
            length: true,
            generic_words: true,
            exact_match: false,
        }
    }

    /// Text quality plus the exact-match bonus, for authored labels and
    /// pattern-table hits.
    pub fn exact(self) -> Self {
        Self {
            exact_match: true,
            ..self
        }
    }
}

/// Adjust a base confidence for a cleaned label.
///
/// The factors are applied in a fixed order so identical inputs always
/// produce identical numbers: length bonus/short penalty, then the
/// generic-word penalty, then the exact-match bonus. The running value is
/// clamped to [0, 1] after every step.
pub fn adjust_confidence(base: f32, label: &str, factors: AdjustmentFactors) -> f32 {
    let mut confidence = base.clamp(0.0, 1.0);

    if factors.length {
        let len = label.chars().count();
        if (MIN_COMFORTABLE_LENGTH..=MAX_COMFORTABLE_LENGTH).contains(&len) {
            confidence = (confidence + LENGTH_BONUS).min(1.0);
        } else if len < MIN_COMFORTABLE_LENGTH {
            confidence = (confidence - SHORT_PENALTY).max(0.0);
        }
    }

    if factors.generic_words && is_generic_label(label) {
        confidence = (confidence - GENERIC_PENALTY).max(0.0);
    }

    if factors.exact_match {
        confidence = (confidence + EXACT_MATCH_BONUS).min(1.0);
    }

    confidence
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comfortable_length_gets_bonus() {
        let adjusted = adjust_confidence(0.80, "Email address", AdjustmentFactors::text_quality());
        assert!((adjusted - 0.85).abs() < 1e-6);
    }

    #[test]
    fn short_label_penalized() {
        let adjusted = adjust_confidence(0.80, "OK", AdjustmentFactors::text_quality());
        assert!((adjusted - 0.70).abs() < 1e-6);
    }

    #[test]
    fn generic_word_penalized() {
        let adjusted = adjust_confidence(0.80, "Submit", AdjustmentFactors::text_quality());
        // +0.05 length bonus, then -0.15 generic penalty.
        assert!((adjusted - 0.70).abs() < 1e-6);
    }

    #[test]
    fn generic_set_matches_whole_string_only() {
        assert!(is_generic_label("input"));
        assert!(is_generic_label("SUBMIT"));
        assert!(is_generic_label("*"));
        assert!(is_generic_label("click here"));
        assert!(!is_generic_label("input your email"));
        assert!(!is_generic_label("Email"));
    }

    #[test]
    fn exact_match_bonus_caps_at_one() {
        let factors = AdjustmentFactors::text_quality().exact();
        let adjusted = adjust_confidence(0.95, "Email address", factors);
        assert_eq!(adjusted, 1.0);
    }

    #[test]
    fn floor_at_zero() {
        let adjusted = adjust_confidence(0.05, "*", AdjustmentFactors::text_quality());
        assert_eq!(adjusted, 0.0);
    }

    #[test]
    fn order_is_length_then_generic_then_exact() {
        // "field" is both comfortable-length and generic:
        // 0.50 +0.05 = 0.55, -0.15 = 0.40, +0.10 = 0.50.
        let factors = AdjustmentFactors::text_quality().exact();
        let adjusted = adjust_confidence(0.50, "field", factors);
        assert!((adjusted - 0.50).abs() < 1e-6);
    }

    #[test]
    fn subsets_are_independent() {
        let none = AdjustmentFactors::default();
        assert_eq!(adjust_confidence(0.80, "Submit", none), 0.80);

        let generic_only = AdjustmentFactors {
            generic_words: true,
            ..Default::default()
        };
        let adjusted = adjust_confidence(0.80, "Submit", generic_only);
        assert!((adjusted - 0.65).abs() < 1e-6);
    }
}
