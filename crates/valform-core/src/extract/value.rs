use tracing::debug;

use crate::extract::{find_label_span, is_numeric_text, LabelLookup};
use crate::model::Span;

pub const DEFAULT_VALUE_LEFT_THRESHOLD: f64 = 2.0;
/// Depth of the window under the label row searched after the row itself.
pub const BELOW_WINDOW: f64 = 3.0;
/// Half-height of the window around the label row searched last.
pub const VICINITY_WINDOW: f64 = 3.0;
pub const DEFAULT_ROW_RIGHT_WITHIN: f64 = 60.0;

#[derive(Debug, Clone)]
pub struct ValueOptions<'a> {
    pub top_threshold: f64,
    pub left_threshold: f64,
    /// Join one-digit-per-box answers before trying a single value.
    pub combine_digits: bool,
    /// Explicit box columns joined with the target column.
    pub additional_lefts: &'a [f64],
    pub adjacent_left_window: f64,
    pub adjacent_right_window: f64,
    /// Vertical window for digit gathering; defaults to `top_threshold`.
    pub combine_vertical_window: Option<f64>,
    /// Last resort: right-most number on the label row.
    pub row_right_fallback: bool,
    pub row_right_within: f64,
}

impl Default for ValueOptions<'_> {
    fn default() -> Self {
        Self {
            top_threshold: 0.6,
            left_threshold: DEFAULT_VALUE_LEFT_THRESHOLD,
            combine_digits: false,
            additional_lefts: &[],
            adjacent_left_window: 2.0,
            adjacent_right_window: 2.0,
            combine_vertical_window: None,
            row_right_fallback: false,
            row_right_within: DEFAULT_ROW_RIGHT_WITHIN,
        }
    }
}

fn all_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// Numeric answer printed at `target_left` for the labelled row.
///
/// Ladder, first success wins: joined digit boxes (if enabled), nearest
/// number on the label row, nearest number in a window below the row,
/// nearest number in a window around the row, right-most number on the row
/// (if enabled).
pub fn extract_value(
    spans: &[Span],
    lookup: &LabelLookup<'_>,
    target_left: f64,
    opts: &ValueOptions<'_>,
) -> Option<String> {
    let Some(label) = find_label_span(spans, lookup) else {
        debug!(label = lookup.text, "value label not found");
        return None;
    };
    let numbers: Vec<&Span> = spans
        .iter()
        .filter(|s| s.page == label.page && is_numeric_text(&s.text))
        .collect();
    let d_top = |s: &Span| (s.top - label.top).abs();
    let d_left = |s: &Span, col: f64| (s.left - col).abs();

    let nearest_on_row = |col: f64| {
        numbers
            .iter()
            .copied()
            .filter(|s| d_top(s) < opts.top_threshold && d_left(s, col) <= opts.left_threshold)
            .min_by(|x, y| d_left(x, col).total_cmp(&d_left(y, col)))
    };

    if opts.combine_digits {
        let joined: String = if opts.additional_lefts.is_empty() {
            let window = opts.combine_vertical_window.unwrap_or(opts.top_threshold);
            let lo = target_left - opts.adjacent_left_window;
            let hi = target_left + opts.adjacent_right_window;
            let mut boxes: Vec<&Span> = numbers
                .iter()
                .copied()
                .filter(|s| d_top(s) <= window && s.left >= lo && s.left <= hi)
                .collect();
            boxes.sort_by(|x, y| x.left.total_cmp(&y.left));
            boxes.iter().map(|s| s.trimmed()).collect()
        } else {
            let mut columns: Vec<f64> = std::iter::once(target_left)
                .chain(opts.additional_lefts.iter().copied())
                .collect();
            columns.sort_by(f64::total_cmp);
            columns
                .into_iter()
                .filter_map(nearest_on_row)
                .map(|s| s.trimmed())
                .collect()
        };
        if all_digits(&joined) {
            debug!(label = lookup.text, value = %joined, "combined digit boxes");
            return Some(joined);
        }
    }

    if let Some(hit) = nearest_on_row(target_left) {
        debug!(label = lookup.text, left = hit.left, top = hit.top, "value on label row");
        return Some(hit.trimmed().to_string());
    }

    let below = numbers
        .iter()
        .copied()
        .filter(|s| {
            s.top > label.top
                && s.top - label.top <= BELOW_WINDOW
                && d_left(s, target_left) <= opts.left_threshold
        })
        .min_by(|x, y| {
            d_top(x)
                .total_cmp(&d_top(y))
                .then(d_left(x, target_left).total_cmp(&d_left(y, target_left)))
        });
    if let Some(hit) = below {
        debug!(label = lookup.text, left = hit.left, top = hit.top, "value below label row");
        return Some(hit.trimmed().to_string());
    }

    let vicinity = numbers
        .iter()
        .copied()
        .filter(|s| d_top(s) <= VICINITY_WINDOW && d_left(s, target_left) <= opts.left_threshold)
        .min_by(|x, y| {
            d_top(x)
                .total_cmp(&d_top(y))
                .then(d_left(x, target_left).total_cmp(&d_left(y, target_left)))
        });
    if let Some(hit) = vicinity {
        debug!(label = lookup.text, left = hit.left, top = hit.top, "value near label row");
        return Some(hit.trimmed().to_string());
    }

    if opts.row_right_fallback {
        let right_most = numbers
            .iter()
            .copied()
            .filter(|s| {
                d_top(s) <= opts.top_threshold
                    && s.left > label.left
                    && s.left <= label.left + opts.row_right_within
            })
            .max_by(|x, y| x.left.total_cmp(&y.left));
        if let Some(hit) = right_most {
            debug!(label = lookup.text, left = hit.left, "right-most value on label row");
            return Some(hit.trimmed().to_string());
        }
    }

    debug!(label = lookup.text, "value unresolved");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABEL: &str = "Number of bedrooms";

    fn run(spans: &[Span], opts: &ValueOptions<'_>) -> Option<String> {
        extract_value(spans, &LabelLookup::exact(LABEL), 45.0, opts)
    }

    #[test]
    fn test_value_on_row() {
        let spans = vec![Span::new(LABEL, 5.0, 30.0, 1), Span::new("42", 45.0, 30.0, 1)];
        assert_eq!(run(&spans, &ValueOptions::default()).as_deref(), Some("42"));
    }

    #[test]
    fn test_value_one_row_below() {
        let spans = vec![Span::new(LABEL, 5.0, 30.0, 1), Span::new("42", 45.3, 31.5, 1)];
        assert_eq!(run(&spans, &ValueOptions::default()).as_deref(), Some("42"));
    }

    #[test]
    fn test_non_numeric_at_target_is_skipped() {
        let spans = vec![
            Span::new(LABEL, 5.0, 30.0, 1),
            Span::new("N/A", 45.0, 30.0, 1),
            Span::new("3", 45.5, 31.0, 1),
        ];
        assert_eq!(run(&spans, &ValueOptions::default()).as_deref(), Some("3"));
    }

    #[test]
    fn test_vicinity_above() {
        let spans = vec![Span::new(LABEL, 5.0, 30.0, 1), Span::new("2", 45.0, 28.0, 1)];
        assert_eq!(run(&spans, &ValueOptions::default()).as_deref(), Some("2"));
    }

    #[test]
    fn test_nearest_column_on_row() {
        let spans = vec![
            Span::new(LABEL, 5.0, 30.0, 1),
            Span::new("7", 43.5, 30.0, 1),
            Span::new("8", 45.4, 30.0, 1),
        ];
        assert_eq!(run(&spans, &ValueOptions::default()).as_deref(), Some("8"));
    }

    #[test]
    fn test_combined_digit_window() {
        let spans = vec![
            Span::new("EPC Score", 5.0, 60.0, 2),
            Span::new("7", 16.5, 60.1, 2),
            Span::new("2", 18.2, 60.1, 2),
        ];
        let opts = ValueOptions {
            combine_digits: true,
            adjacent_left_window: 1.0,
            adjacent_right_window: 3.5,
            ..Default::default()
        };
        let got = extract_value(&spans, &LabelLookup::exact("EPC Score"), 16.44, &opts);
        assert_eq!(got.as_deref(), Some("72"));
    }

    #[test]
    fn test_combined_explicit_columns() {
        let spans = vec![
            Span::new("Year built", 5.0, 40.0, 1),
            Span::new("9", 32.0, 40.0, 1),
            Span::new("1", 30.0, 40.0, 1),
            Span::new("8", 34.0, 40.0, 1),
            Span::new("9", 36.0, 40.0, 1),
        ];
        let lefts = [32.0, 34.0, 36.0];
        let opts = ValueOptions {
            combine_digits: true,
            additional_lefts: &lefts,
            ..Default::default()
        };
        let got = extract_value(&spans, &LabelLookup::exact("Year built"), 30.0, &opts);
        assert_eq!(got.as_deref(), Some("1989"));
    }

    #[test]
    fn test_combined_falls_through_on_decimal() {
        let spans = vec![Span::new(LABEL, 5.0, 30.0, 1), Span::new("2.5", 45.0, 30.0, 1)];
        let opts = ValueOptions {
            combine_digits: true,
            ..Default::default()
        };
        assert_eq!(run(&spans, &opts).as_deref(), Some("2.5"));
    }

    #[test]
    fn test_row_right_fallback() {
        let spans = vec![
            Span::new(LABEL, 5.0, 30.0, 1),
            Span::new("4", 52.0, 30.0, 1),
            Span::new("9", 62.0, 30.0, 1),
        ];
        assert_eq!(run(&spans, &ValueOptions::default()), None);
        let opts = ValueOptions {
            row_right_fallback: true,
            ..Default::default()
        };
        assert_eq!(run(&spans, &opts).as_deref(), Some("9"));
    }

    #[test]
    fn test_label_includes_lookup() {
        let spans = vec![
            Span::new("Gross external floor area (sq m)", 5.0, 30.0, 1),
            Span::new("95", 45.0, 30.0, 1),
        ];
        let lookup = LabelLookup {
            includes: Some("floor area"),
            ..LabelLookup::exact("Floor area:")
        };
        let got = extract_value(&spans, &lookup, 45.0, &ValueOptions::default());
        assert_eq!(got.as_deref(), Some("95"));
    }
}
