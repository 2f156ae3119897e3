use std::collections::BTreeMap;

use crate::model::{Row, Span};

/// Default vertical distance (percent of page height) under which two spans
/// share a row.
pub const ROW_THRESHOLD: f64 = 0.6;

/// Group spans into visual rows per page.
///
/// Spans are visited in (top, left) order. Each span joins the existing row on
/// its page whose running-mean top is closest, provided the difference is below
/// `threshold`; otherwise it opens a new row. The mean is updated on every
/// insertion so a long run of slightly offset fragments does not drift away
/// from the row it started in.
///
/// Spans within a row are ordered by left; rows are ordered by (page, top).
pub fn group_spans(spans: &[Span], threshold: f64) -> Vec<Row> {
    let mut by_page: BTreeMap<u32, Vec<&Span>> = BTreeMap::new();
    for span in spans {
        by_page.entry(span.page).or_default().push(span);
    }

    let mut rows = Vec::new();

    for (page, mut page_spans) in by_page {
        page_spans.sort_by(|a, b| a.top.total_cmp(&b.top).then(a.left.total_cmp(&b.left)));

        let mut page_rows: Vec<Row> = Vec::new();
        for span in page_spans {
            let best = page_rows
                .iter()
                .enumerate()
                .map(|(i, row)| (i, (row.top - span.top).abs()))
                .filter(|(_, delta)| *delta < threshold)
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(i, _)| i);

            match best {
                Some(i) => {
                    let row = &mut page_rows[i];
                    row.spans.push(span.clone());
                    let n = row.spans.len() as f64;
                    row.top = (row.top * (n - 1.0) + span.top) / n;
                }
                None => page_rows.push(Row {
                    page,
                    top: span.top,
                    spans: vec![span.clone()],
                }),
            }
        }

        for mut row in page_rows {
            row.spans.sort_by(|a, b| a.left.total_cmp(&b.left));
            rows.push(row);
        }
    }

    rows.sort_by(|a, b| a.page.cmp(&b.page).then(a.top.total_cmp(&b.top)));
    rows
}

/// Re-group the spans of already grouped rows.
pub fn regroup(rows: &[Row], threshold: f64) -> Vec<Row> {
    let spans: Vec<Span> = rows.iter().flat_map(|r| r.spans.iter().cloned()).collect();
    group_spans(&spans, threshold)
}

/// The row on `span`'s page whose mean top is closest to the span, if any
/// lies within `threshold`.
pub fn row_containing<'r>(rows: &'r [Row], span: &Span, threshold: f64) -> Option<&'r Row> {
    rows.iter()
        .filter(|r| r.page == span.page)
        .map(|r| (r, (r.top - span.top).abs()))
        .filter(|(_, delta)| *delta < threshold)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(r, _)| r)
}
