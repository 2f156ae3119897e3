use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extract::{find_label_span, is_marker, LabelLookup};
use crate::model::Span;

/// One named option of a single-choice row and the column of its box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub value: String,
    pub left: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ChoiceOptions {
    pub top_threshold: f64,
    pub left_threshold: f64,
    pub require_marker: bool,
}

impl Default for ChoiceOptions {
    fn default() -> Self {
        Self {
            top_threshold: 0.6,
            left_threshold: 2.0,
            require_marker: true,
        }
    }
}

/// Pick the selected option of a row such as "EPC Rating: A B C ... Exempt".
///
/// Options are walked in declaration order and the first with a marker near
/// its column wins. Without `require_marker`, an unmarked row falls back to
/// the option with the closest non-blank span.
pub fn match_choice<'o>(
    spans: &[Span],
    lookup: &LabelLookup<'_>,
    options: &'o [ChoiceOption],
    opts: &ChoiceOptions,
) -> Option<&'o str> {
    let label = find_label_span(spans, lookup)?;
    let on_row = |s: &&Span| s.on_row(label.page, label.top, opts.top_threshold);

    for option in options {
        let marked = spans
            .iter()
            .filter(on_row)
            .any(|s| is_marker(&s.text) && (s.left - option.left).abs() <= opts.left_threshold);
        if marked {
            debug!(label = lookup.text, option = %option.value, "choice marker");
            return Some(&option.value);
        }
    }

    if opts.require_marker {
        debug!(label = lookup.text, "choice row has no marker");
        return None;
    }

    let mut best: Option<(&ChoiceOption, f64)> = None;
    for option in options {
        let dist = spans
            .iter()
            .filter(on_row)
            .filter(|s| !s.is_blank())
            .map(|s| (s.left - option.left).abs())
            .filter(|d| *d <= opts.left_threshold)
            .min_by(|a, b| a.total_cmp(b));
        if let Some(dist) = dist {
            if best.is_none_or(|(_, d)| dist < d) {
                best = Some((option, dist));
            }
        }
    }
    best.map(|(option, _)| option.value.as_str())
}
