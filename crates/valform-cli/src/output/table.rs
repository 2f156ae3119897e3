use valform_core::model::{ExtractionReport, Row, Span};

pub fn print_report(report: &ExtractionReport) {
    println!(
        "=== {} report: {}/{} fields resolved from {} spans ===\n",
        report.application_type,
        report.resolved_count(),
        report.field_count(),
        report.span_count
    );

    for (group, fields) in &report.groups {
        println!("  {group}");

        let max_name = fields.keys().map(|k| k.len()).max().unwrap_or(10);
        for (key, value) in fields {
            let shown = match value {
                Some(v) => v.to_string(),
                None => "-".to_string(),
            };
            println!("    {:<width$}  {}", key, shown, width = max_name);
        }
        println!();
    }

    if let Some(ref text) = report.raw_text {
        println!("=== Raw text ===\n");
        println!("{text}");
    }
}

pub fn format_spans(spans: &[Span]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>4}  {:>7}  {:>7}  {:>5}  Text\n",
        "Page", "Left", "Top", "Size"
    ));
    for span in spans {
        let size = span
            .font_size
            .map(|f| format!("{f:.2}"))
            .unwrap_or_else(|| "-".into());
        out.push_str(&format!(
            "{:>4}  {:>7.2}  {:>7.2}  {:>5}  {}\n",
            span.page, span.left, span.top, size, span.text
        ));
    }
    out
}

pub fn format_rows(rows: &[Row]) -> String {
    let mut out = String::new();
    let mut page = None;
    for row in rows {
        if page != Some(row.page) {
            if page.is_some() {
                out.push('\n');
            }
            out.push_str(&format!("--- Page {} ---\n", row.page));
            page = Some(row.page);
        }
        let cells: Vec<String> = row
            .spans
            .iter()
            .map(|s| format!("{}@{:.2}", s.trimmed(), s.left))
            .collect();
        out.push_str(&format!("{:>7.2}  {}\n", row.top, cells.join("  ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_spans_columns() {
        let spans = vec![Span::new("Urban", 20.49, 10.0, 1).with_font_size(8.5)];
        let text = format_spans(&spans);
        let line = text.lines().nth(1).unwrap();
        assert!(line.contains("20.49"));
        assert!(line.contains("8.50"));
        assert!(line.ends_with("Urban"));
    }

    #[test]
    fn test_format_rows_page_headers() {
        let rows = vec![
            Row {
                page: 1,
                top: 10.0,
                spans: vec![Span::new("Urban", 12.0, 10.0, 1), Span::new("X", 20.6, 10.0, 1)],
            },
            Row {
                page: 2,
                top: 5.0,
                spans: vec![Span::new("Gas", 5.0, 5.0, 2)],
            },
        ];
        let text = format_rows(&rows);
        assert!(text.starts_with("--- Page 1 ---"));
        assert!(text.contains("Urban@12.00  X@20.60"));
        assert!(text.contains("--- Page 2 ---"));
    }
}
