//! Position-based extractors. Each one takes the spans of a single request and
//! returns `None` when it cannot resolve a value; none of them fail.

pub mod below;
pub mod bounded;
pub mod checkbox;
pub mod choice;
pub mod value;

use regex::Regex;
use std::sync::LazyLock;

use crate::model::Span;

/// Glyphs recognised as "selected" inside a checkbox.
pub const MARKER_GLYPHS: &[&str] = &["X", "x", "✓", "✔", "☑", "☒", "■", "●"];

static NUMERIC_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("valid numeric regex"));

pub fn is_marker(text: &str) -> bool {
    MARKER_GLYPHS.contains(&text.trim())
}

/// Strict numeric literal: optional leading `-`, digits, optional fraction.
/// No units, separators or surrounding text.
pub fn is_numeric_text(text: &str) -> bool {
    NUMERIC_LITERAL.is_match(text.trim())
}

/// How to find the span that anchors a field's row.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelLookup<'q> {
    /// Exact label text.
    pub text: &'q str,
    /// Case-insensitive substring tried when the exact text is absent.
    pub includes: Option<&'q str>,
    pub alt_includes: Option<&'q str>,
    /// Section text preceding the label; when set, the nearest matching label
    /// below the first span containing it on the same page wins.
    pub below_anchor: Option<&'q str>,
}

impl<'q> LabelLookup<'q> {
    pub fn exact(text: &'q str) -> Self {
        LabelLookup {
            text,
            ..Default::default()
        }
    }

    fn matches(&self, span: &Span) -> bool {
        span.trimmed() == self.text.trim() || contains_ci(&span.text, self.includes)
    }
}

pub(crate) fn contains_ci(haystack: &str, needle: Option<&str>) -> bool {
    match needle {
        Some(n) if !n.is_empty() => haystack.to_lowercase().contains(&n.to_lowercase()),
        _ => false,
    }
}

/// Resolve the label span for a field.
///
/// When the section anchor is configured and present, only the nearest match
/// below it on the same page is considered. Otherwise: first exact match,
/// first `includes` match, first `alt_includes` match.
pub fn find_label_span<'s>(spans: &'s [Span], lookup: &LabelLookup<'_>) -> Option<&'s Span> {
    if let Some(anchor_text) = lookup.below_anchor {
        let anchor = spans
            .iter()
            .find(|s| contains_ci(&s.text, Some(anchor_text)));
        if let Some(anchor) = anchor {
            return spans
                .iter()
                .filter(|s| s.page == anchor.page && s.top > anchor.top && lookup.matches(s))
                .min_by(|a, b| a.top.total_cmp(&b.top));
        }
    }

    let exact = lookup.text.trim();
    spans
        .iter()
        .find(|s| s.trimmed() == exact)
        .or_else(|| spans.iter().find(|s| contains_ci(&s.text, lookup.includes)))
        .or_else(|| spans.iter().find(|s| contains_ci(&s.text, lookup.alt_includes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_literal() {
        assert!(is_numeric_text("42"));
        assert!(is_numeric_text(" 250000 "));
        assert!(is_numeric_text("-3.5"));
        assert!(!is_numeric_text("3."));
        assert!(!is_numeric_text("£250,000"));
        assert!(!is_numeric_text("1.2.3"));
        assert!(!is_numeric_text("42%"));
        assert!(!is_numeric_text(""));
    }

    #[test]
    fn test_markers() {
        assert!(is_marker("X"));
        assert!(is_marker(" ✓ "));
        assert!(!is_marker("Yes"));
        assert!(!is_marker("XX"));
    }

    #[test]
    fn test_label_lookup_order() {
        let spans = vec![
            Span::new("Rising", 10.0, 10.0, 1),
            Span::new("Are property prices in the area:", 5.0, 20.0, 1),
            Span::new("Rising", 10.0, 30.0, 1),
            Span::new("Is demand for this type of property:", 5.0, 40.0, 1),
            Span::new("Rising", 10.0, 42.0, 1),
        ];

        let plain = find_label_span(&spans, &LabelLookup::exact("Rising")).unwrap();
        assert_eq!(plain.top, 10.0);

        let demand = LabelLookup {
            below_anchor: Some("is demand for this type"),
            ..LabelLookup::exact("Rising")
        };
        assert_eq!(find_label_span(&spans, &demand).unwrap().top, 42.0);

        let prices = LabelLookup {
            below_anchor: Some("Are property prices"),
            ..LabelLookup::exact("Rising")
        };
        assert_eq!(find_label_span(&spans, &prices).unwrap().top, 30.0);
    }

    #[test]
    fn test_label_lookup_stays_below_anchor() {
        let spans = vec![
            Span::new("Are property prices in the area", 5.0, 10.0, 1),
            Span::new("Rising", 10.0, 12.0, 1),
            Span::new("Is demand for this type of property", 5.0, 20.0, 1),
        ];
        let demand = LabelLookup {
            below_anchor: Some("Is demand for this type"),
            ..LabelLookup::exact("Rising")
        };
        assert!(find_label_span(&spans, &demand).is_none());

        let missing_anchor = LabelLookup {
            below_anchor: Some("Is rental demand"),
            ..LabelLookup::exact("Rising")
        };
        assert_eq!(find_label_span(&spans, &missing_anchor).unwrap().top, 12.0);
    }

    #[test]
    fn test_label_lookup_ignores_surrounding_whitespace() {
        let spans = vec![
            Span::new("  Urban ", 20.49, 10.0, 1),
            Span::new("Suburban", 33.26, 20.0, 1),
            Span::new(" Suburban", 33.26, 30.0, 1),
        ];
        assert_eq!(find_label_span(&spans, &LabelLookup::exact("Urban")).unwrap().left, 20.49);

        let below = LabelLookup {
            below_anchor: Some("Suburban"),
            ..LabelLookup::exact("Suburban")
        };
        assert_eq!(find_label_span(&spans, &below).unwrap().top, 30.0);
    }

    #[test]
    fn test_label_lookup_substring_fallback() {
        let spans = vec![Span::new(
            "Is the property suitable security for finance purposes?",
            5.0,
            10.0,
            1,
        )];
        let lookup = LabelLookup {
            includes: Some("SUITABLE SECURITY"),
            ..LabelLookup::exact("Suitable security?")
        };
        assert!(find_label_span(&spans, &lookup).is_some());
        assert!(find_label_span(&spans, &LabelLookup::exact("Suitable security?")).is_none());
    }
}
