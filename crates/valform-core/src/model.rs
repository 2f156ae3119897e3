use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A positioned text fragment. Coordinates are percentages of the page
/// width (`left`) and height (`top`), origin at the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub text: String,
    pub left: f64,
    pub top: f64,
    pub page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
}

impl Span {
    pub fn new(text: impl Into<String>, left: f64, top: f64, page: u32) -> Self {
        Span {
            text: text.into(),
            left,
            top,
            page,
            font_size: None,
        }
    }

    pub fn with_font_size(mut self, font_size: f64) -> Self {
        self.font_size = Some(font_size);
        self
    }

    /// Text with surrounding whitespace removed.
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Whether the span lies within `threshold` of `top` on `page`.
    pub fn on_row(&self, page: u32, top: f64, threshold: f64) -> bool {
        self.page == page && (self.top - top).abs() < threshold
    }
}

/// A horizontally ordered cluster of spans sharing a vertical band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub page: u32,
    /// Running mean of the member spans' `top`.
    pub top: f64,
    pub spans: Vec<Span>,
}

impl Row {
    pub fn text(&self) -> String {
        self.spans
            .iter()
            .map(|s| s.trimmed())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One logical label, possibly concatenated from stacked fragments.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelBlock {
    pub label_text: String,
    pub left: f64,
    pub top_start: f64,
    pub top_end: f64,
    pub page: u32,
}

/// The template variant a report was produced for. Both variants print the
/// same label text but place some answers at different coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationType {
    #[default]
    Btl,
    Hpp,
}

impl fmt::Display for ApplicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationType::Btl => write!(f, "BTL"),
            ApplicationType::Hpp => write!(f, "HPP"),
        }
    }
}

impl ApplicationType {
    pub fn from_str_loose(s: &str) -> Option<ApplicationType> {
        let lower = s.trim().to_lowercase();
        if lower == "btl" || lower.contains("buy to let") || lower.contains("buy-to-let") {
            Some(ApplicationType::Btl)
        } else if lower == "hpp" || lower.contains("home purchase") {
            Some(ApplicationType::Hpp)
        } else {
            None
        }
    }
}

impl FromStr for ApplicationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationType::from_str_loose(s)
            .ok_or_else(|| format!("unknown application type '{s}' (expected 'btl' or 'hpp')"))
    }
}

/// A resolved field value. Unresolved fields are `None` in an
/// [`ExtractionResult`] and serialize as JSON `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Text(String),
    Number(Decimal),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Output key -> value for one field group. Every declared key is present.
pub type ExtractionResult = BTreeMap<String, Option<FieldValue>>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionReport {
    pub application_type: ApplicationType,
    pub span_count: usize,
    pub groups: BTreeMap<String, ExtractionResult>,
    pub raw_text: Option<String>,
}

impl ExtractionReport {
    /// Number of fields across all groups that resolved to a value.
    pub fn resolved_count(&self) -> usize {
        self.groups
            .values()
            .flat_map(|g| g.values())
            .filter(|v| v.is_some())
            .count()
    }

    pub fn field_count(&self) -> usize {
        self.groups.values().map(|g| g.len()).sum()
    }
}
