use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::extract::contains_ci;
use crate::layout::{find_block, find_nearest_below, BlockQuery, BlockScope};
use crate::model::{LabelBlock, Span};

pub const DEFAULT_CLUSTER_THRESHOLD: f64 = 3.0;
pub const DEFAULT_ROW_EPS: f64 = 0.6;

static CHECKBOX_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:X|Yes|No)\b|\bN/A\b").expect("valid checkbox token regex")
});
static CHECKBOX_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:Yes|No|X|N/A|\s)+$").expect("valid checkbox-only regex"));

/// Tuning for one bounded text box.
#[derive(Debug, Clone)]
pub struct BoundedOptions<'a> {
    /// Keep only spans with `|left - A.left| < left_band`. Disables clustering.
    pub left_band: Option<f64>,
    pub answer_left_min: Option<f64>,
    pub answer_left_max: Option<f64>,
    /// Drop spans left of `A.left - right_slack`.
    pub only_right_of_a: bool,
    pub right_slack: f64,
    /// Maximum distance below A's last line for spans between the labels.
    pub max_below_a: Option<f64>,
    /// Also capture spans on A's own row, right of A.
    pub include_same_row_right: bool,
    pub row_eps: f64,
    pub cluster_threshold: f64,
    /// Widen the chosen column rightwards to catch indented wrapped lines.
    pub expand_right_within: Option<f64>,
    /// Texts that end the capture early when found below A.
    pub stop_markers: &'a [String],
    pub strip_label_prefix: bool,
    pub strip_tokens: &'a [String],
    pub strip_checkbox_tokens: bool,
    pub reject_if_label: bool,
    /// Capture to the end of A's page when B is missing or out of order.
    pub allow_open_end: bool,
}

impl Default for BoundedOptions<'_> {
    fn default() -> Self {
        Self {
            left_band: None,
            answer_left_min: None,
            answer_left_max: None,
            only_right_of_a: false,
            right_slack: 0.0,
            max_below_a: None,
            include_same_row_right: false,
            row_eps: DEFAULT_ROW_EPS,
            cluster_threshold: DEFAULT_CLUSTER_THRESHOLD,
            expand_right_within: None,
            stop_markers: &[],
            strip_label_prefix: false,
            strip_tokens: &[],
            strip_checkbox_tokens: true,
            reject_if_label: true,
            allow_open_end: false,
        }
    }
}

/// Capture the free text written between label `a` and label `b`.
///
/// `b` must start strictly below the end of `a` on the same page; otherwise
/// the capture is rejected unless `allow_open_end` lets it run to the bottom
/// of the page.
pub fn extract_bounded(
    a: &LabelBlock,
    b: Option<&LabelBlock>,
    spans: &[Span],
    opts: &BoundedOptions<'_>,
) -> Option<String> {
    let b = b.filter(|b| b.page == a.page && b.top_start > a.top_end);
    if b.is_none() && !opts.allow_open_end {
        debug!(label = %a.label_text, "bounded capture has no valid lower label");
        return None;
    }
    let b_top = b.map_or(f64::INFINITY, |b| b.top_start);

    let stop_top = opts
        .stop_markers
        .iter()
        .filter_map(|marker| {
            spans
                .iter()
                .find(|s| s.page == a.page && s.top > a.top_end && contains_ci(&s.text, Some(marker)))
                .map(|s| s.top)
        })
        .min_by(|x, y| x.total_cmp(y));

    let mut picked: Vec<&Span> = spans
        .iter()
        .filter(|s| {
            if s.page != a.page || s.is_blank() {
                return false;
            }
            let between = s.top > a.top_end && s.top < b_top;
            let same_row_right = opts.include_same_row_right
                && (s.top - a.top_start).abs() < opts.row_eps
                && s.left > a.left;
            if !(between || same_row_right) {
                return false;
            }
            if stop_top.is_some_and(|t| s.top >= t) {
                return false;
            }
            if opts.include_same_row_right {
                if let Some(b) = b {
                    if (s.top - b.top_start).abs() < opts.row_eps && s.left <= b.left {
                        return false;
                    }
                }
            }
            if between && opts.max_below_a.is_some_and(|m| s.top - a.top_end > m) {
                return false;
            }
            if opts.answer_left_min.is_some_and(|m| s.left < m)
                || opts.answer_left_max.is_some_and(|m| s.left > m)
            {
                return false;
            }
            if opts.only_right_of_a && s.left < a.left - opts.right_slack {
                return false;
            }
            opts.left_band.is_none_or(|band| (s.left - a.left).abs() < band)
        })
        .collect();

    picked.sort_by(|x, y| x.left.total_cmp(&y.left).then(x.top.total_cmp(&y.top)));

    if opts.left_band.is_none() && !picked.is_empty() {
        picked = select_column(picked, a.left, opts);
    }

    picked.sort_by(|x, y| x.top.total_cmp(&y.top).then(x.left.total_cmp(&y.left)));
    if picked.is_empty() {
        debug!(label = %a.label_text, "bounded capture is empty");
        return None;
    }

    let mut text = collapse_whitespace(picked.iter().map(|s| s.trimmed()));
    debug!(label = %a.label_text, spans = picked.len(), %text, "bounded capture");

    if opts.strip_label_prefix || !opts.strip_tokens.is_empty() {
        let label = opts.strip_label_prefix.then_some(a.label_text.as_str());
        let prefixes: Vec<&str> = label
            .into_iter()
            .chain(opts.strip_tokens.iter().map(String::as_str))
            .collect();
        text = strip_leading_prefixes(&text, &prefixes);
    }

    if opts.reject_if_label && is_label_echo(&text, &a.label_text) {
        debug!(label = %a.label_text, "bounded capture only repeats its label");
        return None;
    }

    if opts.strip_checkbox_tokens {
        text = CHECKBOX_TOKEN.replace_all(&text, "").into_owned();
    }
    let text = collapse_whitespace(text.split_whitespace());

    if text.is_empty() || (opts.strip_checkbox_tokens && CHECKBOX_ONLY.is_match(&text)) {
        return None;
    }
    Some(text)
}

/// Single-linkage clustering on `left` over spans sorted by left; keeps the
/// cluster whose mean is nearest `anchor_left`.
fn select_column<'s>(sorted: Vec<&'s Span>, anchor_left: f64, opts: &BoundedOptions<'_>) -> Vec<&'s Span> {
    let threshold = opts.cluster_threshold;
    let mut clusters: Vec<Vec<&Span>> = Vec::new();
    for &span in &sorted {
        let open = clusters
            .last_mut()
            .filter(|c| c.last().is_some_and(|p| (span.left - p.left).abs() <= threshold));
        if let Some(cluster) = open {
            cluster.push(span);
        } else {
            clusters.push(vec![span]);
        }
    }

    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, cluster) in clusters.iter().enumerate() {
        let dist = (mean_left(cluster) - anchor_left).abs();
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }

    match opts.expand_right_within {
        Some(expand) => {
            let center = mean_left(&clusters[best]);
            let (lo, hi) = (center - threshold, center + expand);
            sorted.into_iter().filter(|s| s.left >= lo && s.left <= hi).collect()
        }
        None => clusters.swap_remove(best),
    }
}

fn mean_left(cluster: &[&Span]) -> f64 {
    cluster.iter().map(|s| s.left).sum::<f64>() / cluster.len() as f64
}

fn collapse_whitespace<'t>(parts: impl Iterator<Item = &'t str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_prefix_ci<'t>(text: &'t str, prefix: &str) -> Option<&'t str> {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return None;
    }
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| text[prefix.len()..].trim())
}

/// Repeatedly remove any of `prefixes` from the start of `text`.
fn strip_leading_prefixes(text: &str, prefixes: &[&str]) -> String {
    let mut current = text.trim();
    loop {
        let before = current;
        for prefix in prefixes {
            if let Some(rest) = strip_prefix_ci(current, prefix) {
                current = rest;
            }
        }
        if current == before || current.is_empty() {
            return current.to_string();
        }
    }
}

/// True when `text` is the label itself or the label plus a few characters.
fn is_label_echo(text: &str, label: &str) -> bool {
    let label = label.trim().to_lowercase();
    if label.is_empty() {
        return false;
    }
    let text = text.trim().to_lowercase();
    text == label
        || (text.starts_with(&label) && text.chars().count() - label.chars().count() < 5)
}

/// How to find the two labels around a text box.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnchorQuery<'q> {
    pub label: BlockQuery<'q>,
    pub next: BlockQuery<'q>,
    /// Section heading the whole search must stay below.
    pub below_section: Option<BlockQuery<'q>>,
    /// Preceding question; A is the nearest label match below it.
    pub anchor_before: Option<&'q str>,
    pub next_left_min: Option<f64>,
    pub next_left_max: Option<f64>,
}

/// Resolved text box bounds. `next` is `None` when no lower label follows
/// `label` on its page.
#[derive(Debug, Clone, Copy)]
pub struct Anchors<'b> {
    pub label: &'b LabelBlock,
    pub next: Option<&'b LabelBlock>,
}

/// Locate label A and label B among the label blocks.
///
/// Returns `None` when a configured section or preceding anchor is missing,
/// when no label A follows the preceding anchor on its page, or when label A
/// cannot be found at all.
pub fn locate_anchors<'b>(blocks: &'b [LabelBlock], query: &AnchorQuery<'_>) -> Option<Anchors<'b>> {
    let mut scope = BlockScope::default();
    if let Some(section) = &query.below_section {
        let Some(heading) = find_block(blocks, section, BlockScope::default()) else {
            debug!(section = ?section.includes.or(section.exact), "section anchor not found");
            return None;
        };
        scope.below_top = Some(heading.top_end);
    }

    let label = match query.anchor_before {
        Some(before_text) => {
            let Some(before) = find_block(blocks, &BlockQuery::includes(before_text), scope) else {
                debug!(anchor = before_text, "preceding anchor not found");
                return None;
            };
            let below = BlockScope {
                below_top: Some(before.top_end),
                page: Some(before.page),
            };
            let Some(label) = find_nearest_below(blocks, &query.label, below) else {
                debug!(anchor = before_text, "no label below preceding anchor");
                return None;
            };
            label
        }
        None => find_block(blocks, &query.label, scope)?,
    };

    // Prefer the nearest B below A on A's page, then any B in scope.
    let strict = match query.next.exact {
        Some(exact) => BlockQuery::exact(exact),
        None => query.next,
    };
    let next = blocks
        .iter()
        .filter(|b| {
            b.page == label.page
                && b.top_start > label.top_end
                && query.next_left_min.is_none_or(|m| b.left >= m)
                && query.next_left_max.is_none_or(|m| b.left <= m)
                && strict.matches(b)
        })
        .min_by(|x, y| x.top_start.total_cmp(&y.top_start))
        .or_else(|| find_block(blocks, &query.next, scope))
        .filter(|b| b.page == label.page && b.top_start > label.top_end);

    debug!(
        label = %label.label_text,
        page = label.page,
        top = label.top_start,
        next = next.map(|b| b.label_text.as_str()),
        "text box anchors"
    );
    Some(Anchors { label, next })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::build_blocks;

    fn block(text: &str, left: f64, top: f64) -> LabelBlock {
        LabelBlock {
            label_text: text.to_string(),
            left,
            top_start: top,
            top_end: top,
            page: 1,
        }
    }

    #[test]
    fn test_captures_column_between_labels() {
        let a = block("Details:", 10.0, 20.0);
        let b = block("Tenure:", 10.0, 25.0);
        let spans = vec![
            Span::new("Foo", 10.2, 21.0, 1),
            Span::new("Bar", 10.0, 22.0, 1),
            Span::new("Baz", 10.4, 23.0, 1),
            Span::new("Elsewhere", 60.0, 22.0, 1),
        ];
        let got = extract_bounded(&a, Some(&b), &spans, &BoundedOptions::default());
        assert_eq!(got.as_deref(), Some("Foo Bar Baz"));
    }

    #[test]
    fn test_reading_order_and_whitespace() {
        let a = block("Remarks", 5.0, 10.0);
        let b = block("Signed", 5.0, 30.0);
        let spans = vec![
            Span::new("second  line", 5.0, 13.0, 1),
            Span::new("first", 5.0, 11.0, 1),
            Span::new("part", 7.0, 11.0, 1),
        ];
        let got = extract_bounded(&a, Some(&b), &spans, &BoundedOptions::default());
        assert_eq!(got.as_deref(), Some("first part second line"));
    }

    #[test]
    fn test_guard_rejects_out_of_order_labels() {
        let a = block("Details:", 10.0, 20.0);
        let spans = vec![Span::new("Foo", 10.0, 21.0, 1)];
        let opts = BoundedOptions::default();

        let above = block("Tenure:", 10.0, 15.0);
        assert_eq!(extract_bounded(&a, Some(&above), &spans, &opts), None);
        let level = block("Tenure:", 10.0, 20.0);
        assert_eq!(extract_bounded(&a, Some(&level), &spans, &opts), None);
        let other_page = LabelBlock { page: 2, ..block("Tenure:", 10.0, 25.0) };
        assert_eq!(extract_bounded(&a, Some(&other_page), &spans, &opts), None);
        assert_eq!(extract_bounded(&a, None, &spans, &opts), None);

        let open = BoundedOptions {
            allow_open_end: true,
            ..Default::default()
        };
        assert_eq!(extract_bounded(&a, Some(&above), &spans, &open).as_deref(), Some("Foo"));
    }

    #[test]
    fn test_stop_marker_truncates() {
        let a = block("If No, please provide details", 50.0, 40.0);
        let spans = vec![
            Span::new("Minor settlement", 54.0, 42.0, 1),
            Span::new("ENERGY EFFICIENCY", 5.0, 50.0, 1),
            Span::new("EPC Rating:", 54.0, 52.0, 1),
        ];
        let markers = vec!["ENERGY EFFICIENCY".to_string()];
        let opts = BoundedOptions {
            allow_open_end: true,
            answer_left_min: Some(35.0),
            stop_markers: &markers,
            ..Default::default()
        };
        let got = extract_bounded(&a, None, &spans, &opts);
        assert_eq!(got.as_deref(), Some("Minor settlement"));
    }

    #[test]
    fn test_strips_checkbox_tokens_and_rejects_token_only() {
        let a = block("Details:", 10.0, 20.0);
        let b = block("Tenure:", 10.0, 25.0);
        let spans = vec![Span::new("Yes", 10.0, 21.0, 1), Span::new("X", 11.0, 21.0, 1)];
        assert_eq!(extract_bounded(&a, Some(&b), &spans, &BoundedOptions::default()), None);

        let spans = vec![Span::new("Shared drive X", 10.0, 21.0, 1)];
        let got = extract_bounded(&a, Some(&b), &spans, &BoundedOptions::default());
        assert_eq!(got.as_deref(), Some("Shared drive"));

        let keep = BoundedOptions {
            strip_checkbox_tokens: false,
            ..Default::default()
        };
        let got = extract_bounded(&a, Some(&b), &spans, &keep);
        assert_eq!(got.as_deref(), Some("Shared drive X"));
    }

    #[test]
    fn test_strip_prefix_and_reject_label_echo() {
        let a = block("If Yes, please provide details", 10.0, 20.0);
        let b = block("Tenure:", 10.0, 30.0);
        let tokens = vec!["If Yes, please provide details".to_string()];
        let opts = BoundedOptions {
            strip_label_prefix: true,
            strip_tokens: &tokens,
            ..Default::default()
        };

        let spans = vec![
            Span::new("if yes, please provide details", 10.0, 21.0, 1),
            Span::new("Right of way to rear", 10.0, 22.0, 1),
        ];
        let got = extract_bounded(&a, Some(&b), &spans, &opts);
        assert_eq!(got.as_deref(), Some("Right of way to rear"));

        let echo = vec![Span::new("If Yes, please provide details:", 10.0, 21.0, 1)];
        assert_eq!(
            extract_bounded(&a, Some(&b), &echo, &BoundedOptions::default()),
            None
        );
    }

    #[test]
    fn test_same_row_right_excludes_b_row_left() {
        let a = block("Road name:", 5.0, 10.0);
        let b = block("Other:", 30.0, 12.0);
        let spans = vec![
            Span::new("High Street", 20.0, 10.0, 1),
            Span::new("Yes", 25.0, 11.9, 1),
            Span::new("noise", 40.0, 11.9, 1),
        ];
        let opts = BoundedOptions {
            include_same_row_right: true,
            left_band: Some(50.0),
            strip_checkbox_tokens: false,
            ..Default::default()
        };
        let got = extract_bounded(&a, Some(&b), &spans, &opts);
        assert_eq!(got.as_deref(), Some("High Street noise"));
    }

    #[test]
    fn test_expand_right_within() {
        let a = block("Remarks", 10.0, 10.0);
        let b = block("Signed", 10.0, 20.0);
        let spans = vec![
            Span::new("Start", 10.0, 11.0, 1),
            Span::new("indented", 15.0, 12.0, 1),
            Span::new("far", 60.0, 12.0, 1),
        ];
        let plain = extract_bounded(&a, Some(&b), &spans, &BoundedOptions::default());
        assert_eq!(plain.as_deref(), Some("Start"));
        let opts = BoundedOptions {
            expand_right_within: Some(10.0),
            ..Default::default()
        };
        let got = extract_bounded(&a, Some(&b), &spans, &opts);
        assert_eq!(got.as_deref(), Some("Start indented"));
    }

    #[test]
    fn test_locate_anchors_below_preceding_question() {
        let spans = vec![
            Span::new("SERVICES", 5.0, 5.0, 1),
            Span::new("If Yes, please provide details", 5.0, 10.0, 1),
            Span::new("Any easements or rights of way?", 5.0, 20.0, 1),
            Span::new("If Yes, please provide details", 5.0, 24.0, 1),
            Span::new("services separate for each unit?", 5.0, 34.0, 1),
        ];
        let blocks = build_blocks(&spans);
        let query = AnchorQuery {
            label: BlockQuery::includes("If Yes, please provide details"),
            next: BlockQuery::includes("services separate for each unit?"),
            below_section: Some(BlockQuery::includes("SERVICES")),
            anchor_before: Some("Any easements or rights of way"),
            ..Default::default()
        };
        let anchors = locate_anchors(&blocks, &query).unwrap();
        assert_eq!(anchors.label.top_start, 24.0);
        assert_eq!(anchors.next.unwrap().top_start, 34.0);
    }

    #[test]
    fn test_locate_anchors_no_label_after_preceding_question() {
        let spans = vec![
            Span::new("SERVICES", 5.0, 5.0, 1),
            Span::new("If Yes, please provide details", 5.0, 10.0, 1),
            Span::new("Compulsory purchase notice served", 5.0, 12.0, 1),
            Span::new("Any high voltage equipment nearby?", 5.0, 20.0, 1),
            Span::new("services separate for each unit?", 5.0, 34.0, 1),
        ];
        let blocks = build_blocks(&spans);
        let query = AnchorQuery {
            label: BlockQuery::includes("If Yes, please provide details"),
            next: BlockQuery::includes("services separate for each unit?"),
            below_section: Some(BlockQuery::includes("SERVICES")),
            anchor_before: Some("Any high voltage equipment"),
            ..Default::default()
        };
        assert!(locate_anchors(&blocks, &query).is_none());
    }

    #[test]
    fn test_locate_anchors_missing_section() {
        let blocks = build_blocks(&[Span::new("Details:", 5.0, 10.0, 1)]);
        let query = AnchorQuery {
            label: BlockQuery::exact("Details:"),
            below_section: Some(BlockQuery::includes("CONDITION OF PROPERTY")),
            ..Default::default()
        };
        assert!(locate_anchors(&blocks, &query).is_none());
    }

    #[test]
    fn test_locate_anchors_next_above_is_dropped() {
        let blocks = build_blocks(&[
            Span::new("Tenure:", 5.0, 5.0, 1),
            Span::new("Details:", 5.0, 10.0, 1),
        ]);
        let query = AnchorQuery {
            label: BlockQuery::exact("Details:"),
            next: BlockQuery::exact("Tenure:"),
            ..Default::default()
        };
        let anchors = locate_anchors(&blocks, &query).unwrap();
        assert!(anchors.next.is_none());
    }
}
