pub mod pdftotext;

use crate::error::ValformError;
use crate::model::Span;

/// Trait for positioned-text extraction backends.
pub trait SpanExtractor: Send + Sync {
    /// Extract every word of the document as a [`Span`], in page order, with
    /// coordinates as percentages of the page size.
    fn extract_spans(&self, pdf_bytes: &[u8]) -> Result<Vec<Span>, ValformError>;

    /// Name of this extraction backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// Plain full-text fallback for consumers that match on document text rather
/// than position.
pub trait FullTextSource: Send + Sync {
    fn full_text(&self, pdf_bytes: &[u8]) -> Result<String, ValformError>;
}
