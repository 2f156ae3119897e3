use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

use crate::error::ValformError;
use crate::extraction::{FullTextSource, SpanExtractor};
use crate::model::Span;

/// Span extraction backend using pdftotext (from poppler-utils).
///
/// Uses `pdftotext -bbox` for word positions and `pdftotext -layout` for the
/// full-text fallback.
pub struct PdftotextExtractor;

impl PdftotextExtractor {
    pub fn new() -> Self {
        PdftotextExtractor
    }

    /// Check if pdftotext is available on the system.
    pub fn is_available() -> bool {
        Command::new("pdftotext")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SpanExtractor for PdftotextExtractor {
    fn extract_spans(&self, pdf_bytes: &[u8]) -> Result<Vec<Span>, ValformError> {
        let tmpfile = write_temp_pdf(pdf_bytes)?;
        let xml = run_pdftotext("-bbox", tmpfile.path())?;
        let spans = parse_bbox_xml(&xml)?;
        debug!(spans = spans.len(), "parsed pdftotext bbox output");
        Ok(spans)
    }

    fn backend_name(&self) -> &str {
        "pdftotext"
    }
}

impl FullTextSource for PdftotextExtractor {
    fn full_text(&self, pdf_bytes: &[u8]) -> Result<String, ValformError> {
        let tmpfile = write_temp_pdf(pdf_bytes)?;
        let text = run_pdftotext("-layout", tmpfile.path())?;
        Ok(normalize_text(&text))
    }
}

fn write_temp_pdf(pdf_bytes: &[u8]) -> Result<tempfile::NamedTempFile, ValformError> {
    let mut tmpfile =
        tempfile::NamedTempFile::new().map_err(|e| ValformError::Extraction(e.to_string()))?;
    tmpfile
        .write_all(pdf_bytes)
        .map_err(|e| ValformError::Extraction(e.to_string()))?;
    Ok(tmpfile)
}

fn run_pdftotext(mode: &str, pdf_path: &Path) -> Result<String, ValformError> {
    let output = Command::new("pdftotext")
        .arg(mode)
        .arg(pdf_path)
        .arg("-") // output to stdout
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ValformError::PdftotextNotFound
            } else {
                ValformError::Extraction(format!("pdftotext {mode} failed: {e}"))
            }
        })?;

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(ValformError::PdftotextFailed { code, stderr });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[derive(Debug, Default, Clone, Copy)]
struct PageSize {
    width: f64,
    height: f64,
}

#[derive(Debug, Default)]
struct WordBox {
    x_min: f64,
    y_min: f64,
    y_max: f64,
}

fn attr_f64(tag: &BytesStart<'_>, name: &[u8]) -> Option<f64> {
    tag.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| String::from_utf8_lossy(&a.value).parse().ok())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parse `pdftotext -bbox` XHTML into spans, one per word.
fn parse_bbox_xml(xml: &str) -> Result<Vec<Span>, ValformError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut spans = Vec::new();
    let mut page_number = 0u32;
    let mut page = PageSize::default();
    let mut word: Option<WordBox> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"page" => {
                    page_number += 1;
                    page = PageSize {
                        width: attr_f64(&e, b"width").unwrap_or(0.0),
                        height: attr_f64(&e, b"height").unwrap_or(0.0),
                    };
                }
                b"word" => {
                    word = Some(WordBox {
                        x_min: attr_f64(&e, b"xMin").unwrap_or(0.0),
                        y_min: attr_f64(&e, b"yMin").unwrap_or(0.0),
                        y_max: attr_f64(&e, b"yMax").unwrap_or(0.0),
                    });
                    text.clear();
                }
                _ => {}
            },
            Ok(Event::Text(e)) if word.is_some() => {
                let decoded = e
                    .unescape()
                    .map_err(|err| ValformError::Extraction(format!("bad word text: {err}")))?;
                text.push_str(&decoded);
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"word" => {
                if let Some(b) = word.take() {
                    let trimmed = text.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if page.width <= 0.0 || page.height <= 0.0 {
                        warn!(page = page_number, "page without size; word dropped");
                        continue;
                    }
                    let span = Span::new(
                        trimmed,
                        round2(b.x_min / page.width * 100.0),
                        round2(b.y_min / page.height * 100.0),
                        page_number,
                    )
                    .with_font_size(round2(b.y_max - b.y_min));
                    spans.push(span);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ValformError::Extraction(format!(
                    "malformed pdftotext bbox output at {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }

    Ok(spans)
}

/// Collapse runs of spaces/tabs and consecutive blank lines.
fn normalize_text(text: &str) -> String {
    let mut out = Vec::new();
    let mut previous_blank = false;
    for line in text.lines() {
        let collapsed = line
            .split([' ', '\t'])
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        // pdftotext separates pages with form feeds
        let collapsed = collapsed.trim_matches('\x0c').to_string();
        let blank = collapsed.is_empty();
        if blank && previous_blank {
            continue;
        }
        previous_blank = blank;
        out.push(collapsed);
    }
    out.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BBOX: &str = r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
<title></title>
<meta name="Producer" content="Microsoft Word"/>
</head>
<body>
<doc>
  <page width="600.000000" height="800.000000">
    <word xMin="122.940000" yMin="80.000000" xMax="150.000000" yMax="88.500000">Urban</word>
    <word xMin="123.600000" yMin="80.000000" xMax="128.000000" yMax="88.500000">X</word>
    <word xMin="10.000000" yMin="90.000000" xMax="60.000000" yMax="98.000000">Rising &amp; Falling</word>
  </page>
  <page width="600.000000" height="800.000000">
    <word xMin="60.000000" yMin="400.000000" xMax="90.000000" yMax="409.000000">Gas</word>
  </page>
</doc>
</body>
</html>
"#;

    #[test]
    fn test_parse_bbox_words_as_percent_spans() {
        let spans = parse_bbox_xml(BBOX).unwrap();
        assert_eq!(spans.len(), 4);
        assert_eq!(spans[0].text, "Urban");
        assert_eq!(spans[0].left, 20.49);
        assert_eq!(spans[0].top, 10.0);
        assert_eq!(spans[0].page, 1);
        assert_eq!(spans[0].font_size, Some(8.5));
        assert_eq!(spans[1].left, 20.6);
        assert_eq!(spans[2].text, "Rising & Falling");
        assert_eq!(spans[3].page, 2);
        assert_eq!(spans[3].left, 10.0);
        assert_eq!(spans[3].top, 50.0);
    }

    #[test]
    fn test_parse_bbox_drops_blank_words() {
        let xml = r#"<doc><page width="100" height="100">
            <word xMin="1" yMin="1" xMax="2" yMax="2">   </word>
            <word xMin="5" yMin="5" xMax="9" yMax="7">Flat</word>
        </page></doc>"#;
        let spans = parse_bbox_xml(xml).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Flat");
    }

    #[test]
    fn test_parse_bbox_empty_document() {
        let spans = parse_bbox_xml("<doc></doc>").unwrap();
        assert!(spans.is_empty());
    }

    #[test]
    fn test_normalize_text() {
        let raw = "VALUATION   REPORT\t\tBTL\n\n\n\nUrban    X\n\x0cPage 2\n";
        assert_eq!(normalize_text(raw), "VALUATION REPORT BTL\n\nUrban X\nPage 2");
    }
}
