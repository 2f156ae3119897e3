use std::path::PathBuf;
use valform_core::error::ValformError;
use valform_core::extraction::pdftotext::PdftotextExtractor;
use valform_core::extraction::SpanExtractor;
use valform_core::layout::{group_spans, ROW_THRESHOLD};

use crate::output;

pub fn run(
    pdf_file: PathBuf,
    output_format: &str,
    rows: bool,
    output_file: Option<PathBuf>,
) -> Result<(), ValformError> {
    let pdf_bytes = std::fs::read(&pdf_file)?;
    let extractor = PdftotextExtractor::new();
    let spans = extractor.extract_spans(&pdf_bytes)?;
    if spans.is_empty() {
        return Err(ValformError::NoSpans);
    }

    let output_str = match (output_format, rows) {
        ("json", true) => serde_json::to_string_pretty(&group_spans(&spans, ROW_THRESHOLD))?,
        ("json", false) => serde_json::to_string_pretty(&spans)?,
        (_, true) => output::table::format_rows(&group_spans(&spans, ROW_THRESHOLD)),
        (_, false) => output::table::format_spans(&spans),
    };

    match output_file {
        Some(path) => {
            // Always write the flat span list, so the file can be fed back to `extract`
            let json = serde_json::to_string_pretty(&spans)?;
            std::fs::write(&path, json)?;
            eprintln!("Extracted {} span(s), written to {}", spans.len(), path.display());
        }
        None => {
            println!("{output_str}");
        }
    }

    Ok(())
}
