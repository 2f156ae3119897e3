use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ValformError {
    #[error("span extraction failed: {0}")]
    Extraction(String),

    #[error("pdftotext not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftotextNotFound,

    #[error("pdftotext failed with exit code {code}: {stderr}")]
    PdftotextFailed { code: i32, stderr: String },

    #[error("no positioned text found in document; it may be a scanned image without a text layer")]
    NoSpans,

    #[error("failed to load field set from {path}: {reason}")]
    FieldSetLoad { path: PathBuf, reason: String },

    #[error("invalid field set: {0}")]
    FieldSetInvalid(String),

    #[error("unknown preset '{name}'. Available: {available}")]
    UnknownPreset { name: String, available: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
