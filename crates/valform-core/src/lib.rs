pub mod error;
pub mod extract;
pub mod extraction;
pub mod fields;
pub mod layout;
pub mod model;
pub mod orchestrate;
pub mod session;

use std::collections::BTreeMap;
use tracing::{info, warn};

use error::ValformError;
use extraction::{FullTextSource, SpanExtractor};
use fields::schema::FieldSetDef;
use model::{ApplicationType, ExtractionReport, Span};
use session::ExtractionSession;

/// Extract every field group of `field_set` from already positioned spans.
///
/// Never fails: unresolved fields (including all fields when `spans` is
/// empty) come back as `None`.
pub fn extract_spans(
    spans: &[Span],
    field_set: &FieldSetDef,
    application_type: ApplicationType,
) -> ExtractionReport {
    let session = ExtractionSession::new(spans);
    let groups: BTreeMap<_, _> =
        orchestrate::extract_all(&session, &field_set.groups, application_type)
            .into_iter()
            .collect();

    let report = ExtractionReport {
        application_type,
        span_count: spans.len(),
        groups,
        raw_text: None,
    };
    info!(
        application_type = %application_type,
        spans = report.span_count,
        groups = report.groups.len(),
        resolved = report.resolved_count(),
        fields = report.field_count(),
        "field extraction finished"
    );
    report
}

/// Main API entry point: extract a PDF report against a field set.
///
/// Fails when the extractor fails or the document has no positioned text.
/// A failing full-text source only leaves `raw_text` empty.
pub fn extract_pdf(
    pdf_bytes: &[u8],
    extractor: &dyn SpanExtractor,
    full_text: Option<&dyn FullTextSource>,
    field_set: &FieldSetDef,
    application_type: ApplicationType,
) -> Result<ExtractionReport, ValformError> {
    let spans = extractor.extract_spans(pdf_bytes)?;
    info!(backend = extractor.backend_name(), spans = spans.len(), "spans extracted");
    if spans.is_empty() {
        return Err(ValformError::NoSpans);
    }

    let mut report = extract_spans(&spans, field_set, application_type);

    report.raw_text = full_text.and_then(|source| match source.full_text(pdf_bytes) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(error = %e, "full-text extraction failed; continuing without raw text");
            None
        }
    });

    Ok(report)
}
