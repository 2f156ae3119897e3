use std::cmp::Ordering;
use tracing::debug;

use crate::extract::is_numeric_text;
use crate::model::{LabelBlock, Span};

/// Horizontal tolerance between a wrapped label and the answer under it.
pub const BELOW_LEFT_EPS: f64 = 2.0;

/// The answer printed directly under `block`, in the same column.
///
/// Among non-blank spans below the block's last line, the closest one wins;
/// ties prefer text over numbers, then the larger font, then the smaller
/// horizontal offset.
pub fn find_answer_below(block: &LabelBlock, spans: &[Span]) -> Option<String> {
    let chosen = spans
        .iter()
        .filter(|s| {
            s.page == block.page
                && s.top > block.top_end
                && (s.left - block.left).abs() < BELOW_LEFT_EPS
                && !s.is_blank()
        })
        .min_by(|x, y| rank(block, x, y));

    match chosen {
        Some(span) => {
            debug!(label = %block.label_text, page = span.page, left = span.left, top = span.top, "answer below label");
            Some(span.trimmed().to_string())
        }
        None => {
            debug!(label = %block.label_text, "no answer below label");
            None
        }
    }
}

fn rank(block: &LabelBlock, x: &Span, y: &Span) -> Ordering {
    let vertical = |s: &Span| s.top - block.top_end;
    let horizontal = |s: &Span| (s.left - block.left).abs();
    let font = |s: &Span| s.font_size.unwrap_or(0.0);

    vertical(x)
        .total_cmp(&vertical(y))
        .then(is_numeric_text(&x.text).cmp(&is_numeric_text(&y.text)))
        .then(font(y).total_cmp(&font(x)))
        .then(horizontal(x).total_cmp(&horizontal(y)))
}
