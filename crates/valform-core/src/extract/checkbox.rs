use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::extract::{find_label_span, is_marker, LabelLookup};
use crate::layout::rows::{row_containing, ROW_THRESHOLD};
use crate::model::{Row, Span};

pub const DEFAULT_TOP_THRESHOLD: f64 = 0.6;
pub const DEFAULT_CHECKBOX_LEFT_THRESHOLD: f64 = 2.0;
pub const DEFAULT_YES_NO_WINDOW: f64 = 3.5;

/// Answer of a paired Yes/No(/N/A) question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum YesNo {
    Yes,
    No,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl fmt::Display for YesNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YesNo::Yes => write!(f, "Yes"),
            YesNo::No => write!(f, "No"),
            YesNo::NotApplicable => write!(f, "N/A"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CheckboxOptions {
    /// Vertical distance from the label row a marker may sit.
    pub top_threshold: f64,
    /// Horizontal distance from the column a marker may sit.
    pub left_threshold: f64,
    /// When set, a marker anywhere on the label's row is accepted if it lies
    /// within this distance of the column.
    pub row_fallback_max_left: Option<f64>,
}

impl Default for CheckboxOptions {
    fn default() -> Self {
        Self {
            top_threshold: DEFAULT_TOP_THRESHOLD,
            left_threshold: DEFAULT_CHECKBOX_LEFT_THRESHOLD,
            row_fallback_max_left: None,
        }
    }
}

/// Expected columns of a Yes/No(/N/A) question, in tie-break order.
#[derive(Debug, Clone, Copy)]
pub struct YesNoColumns {
    pub yes: f64,
    pub no: f64,
    pub na: Option<f64>,
}

impl YesNoColumns {
    fn iter(&self) -> impl Iterator<Item = (YesNo, f64)> {
        [(YesNo::Yes, Some(self.yes)), (YesNo::No, Some(self.no)), (YesNo::NotApplicable, self.na)]
            .into_iter()
            .filter_map(|(answer, left)| left.map(|l| (answer, l)))
    }

    /// Nearest column to `left`; ties go to the earlier declared column.
    fn nearest(&self, left: f64) -> (YesNo, f64) {
        let mut best = (YesNo::Yes, (left - self.yes).abs());
        for (answer, col) in self.iter().skip(1) {
            let dist = (left - col).abs();
            if dist < best.1 {
                best = (answer, dist);
            }
        }
        best
    }
}

#[derive(Debug, Clone, Copy)]
pub struct YesNoOptions {
    pub top_threshold: f64,
    /// Tight horizontal window around each expected column.
    pub left_window: f64,
    /// Looser window used when scanning the whole label row.
    pub row_fallback_max_left: Option<f64>,
    /// Accept typed "Yes"/"Y"/"No"/"N"/"N/A" words instead of a marker.
    pub allow_word_fallback: bool,
}

impl Default for YesNoOptions {
    fn default() -> Self {
        Self {
            top_threshold: DEFAULT_TOP_THRESHOLD,
            left_window: DEFAULT_YES_NO_WINDOW,
            row_fallback_max_left: None,
            allow_word_fallback: false,
        }
    }
}

/// Grouped row holding the label span, falling back to the nearest row.
fn label_row<'r>(rows: &'r [Row], label: &Span) -> Option<&'r Row> {
    rows.iter()
        .find(|r| r.page == label.page && r.spans.contains(label))
        .or_else(|| row_containing(rows, label, ROW_THRESHOLD))
}

/// Markers on the label's row: inside the `top_threshold` band or inside the
/// grouped row the label belongs to.
fn row_markers<'s>(
    spans: &'s [Span],
    rows: &'s [Row],
    label: &Span,
    top_threshold: f64,
) -> Vec<&'s Span> {
    let mut markers: Vec<&Span> = spans
        .iter()
        .filter(|s| is_marker(&s.text) && s.on_row(label.page, label.top, top_threshold))
        .collect();
    if let Some(row) = label_row(rows, label) {
        for s in row.spans.iter().filter(|s| is_marker(&s.text)) {
            if !markers.iter().any(|m| *m == s) {
                markers.push(s);
            }
        }
    }
    markers
}

/// Single checkbox: is a marker present at `column` on the label's row?
///
/// Returns `false` both when the label is missing and when no marker is
/// found; the caller treats either as "not selected".
pub fn match_checkbox(
    spans: &[Span],
    rows: &[Row],
    lookup: &LabelLookup<'_>,
    column: f64,
    opts: &CheckboxOptions,
) -> bool {
    let Some(label) = find_label_span(spans, lookup) else {
        debug!(label = lookup.text, "checkbox label not found");
        return false;
    };

    let tight = spans.iter().find(|s| {
        is_marker(&s.text)
            && s.on_row(label.page, label.top, opts.top_threshold)
            && (s.left - column).abs() <= opts.left_threshold
    });
    if let Some(mark) = tight {
        debug!(label = lookup.text, page = mark.page, left = mark.left, top = mark.top, "checkbox marker at column");
        return true;
    }

    if let Some(max_left) = opts.row_fallback_max_left {
        let nearest = row_markers(spans, rows, label, opts.top_threshold)
            .into_iter()
            .map(|m| (m, (m.left - column).abs()))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((mark, dist)) = nearest {
            if dist <= max_left {
                debug!(label = lookup.text, left = mark.left, dist, "checkbox marker via row fallback");
                return true;
            }
        }
    }

    false
}

fn yes_no_word(text: &str) -> Option<YesNo> {
    match text.trim().to_lowercase().as_str() {
        "yes" | "y" => Some(YesNo::Yes),
        "no" | "n" => Some(YesNo::No),
        "n/a" | "na" => Some(YesNo::NotApplicable),
        _ => None,
    }
}

/// Resolve a Yes/No(/N/A) question from marker glyphs near its columns.
///
/// Ladder, first success wins:
/// 1. marker on the label row within `left_window` of a column; the nearest
///    column wins, ties broken by declaration order (yes, no, n/a);
/// 2. any marker on the label's row whose nearest column lies within
///    `row_fallback_max_left`;
/// 3. typed answer words near their own column, if enabled;
/// 4. unresolved.
pub fn match_yes_no(
    spans: &[Span],
    rows: &[Row],
    lookup: &LabelLookup<'_>,
    columns: &YesNoColumns,
    opts: &YesNoOptions,
) -> Option<YesNo> {
    let label = find_label_span(spans, lookup)?;

    let band: Vec<&Span> = spans
        .iter()
        .filter(|s| is_marker(&s.text) && s.on_row(label.page, label.top, opts.top_threshold))
        .collect();

    let mut best: Option<(YesNo, f64)> = None;
    for (answer, col) in columns.iter() {
        let nearest = band
            .iter()
            .map(|m| (m.left - col).abs())
            .filter(|d| *d <= opts.left_window)
            .min_by(|a, b| a.total_cmp(b));
        if let Some(dist) = nearest {
            if best.is_none_or(|(_, d)| dist < d) {
                best = Some((answer, dist));
            }
        }
    }
    if let Some((answer, dist)) = best {
        debug!(label = lookup.text, %answer, dist, "yes/no marker at column");
        return Some(answer);
    }

    if let Some(max_left) = opts.row_fallback_max_left {
        let nearest = row_markers(spans, rows, label, opts.top_threshold)
            .into_iter()
            .map(|m| columns.nearest(m.left))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((answer, dist)) = nearest {
            if dist <= max_left {
                debug!(label = lookup.text, %answer, dist, "yes/no marker via row fallback");
                return Some(answer);
            }
        }
    }

    if opts.allow_word_fallback {
        let mut best: Option<(YesNo, f64)> = None;
        for span in spans
            .iter()
            .filter(|s| s.on_row(label.page, label.top, opts.top_threshold))
        {
            let Some(word) = yes_no_word(&span.text) else {
                continue;
            };
            let Some((_, col)) = columns.iter().find(|(a, _)| *a == word) else {
                continue;
            };
            let dist = (span.left - col).abs();
            if dist <= opts.left_window && best.is_none_or(|(_, d)| dist < d) {
                best = Some((word, dist));
            }
        }
        if let Some((answer, dist)) = best {
            debug!(label = lookup.text, %answer, dist, "yes/no typed word");
            return Some(answer);
        }
    }

    debug!(label = lookup.text, "yes/no unresolved");
    None
}
