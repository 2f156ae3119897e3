use crate::error::ValformError;
use crate::fields::parse_field_set_str;
use crate::fields::schema::FieldSetDef;

const VALUATION_REPORT_JSON: &str = include_str!("../../../../presets/valuation-report.json");

/// Field sets compiled into the binary.
pub const PRESETS: &[&str] = &["valuation-report"];

/// Load a predefined field set by name.
pub fn load_preset(name: &str) -> Result<FieldSetDef, ValformError> {
    match name {
        "valuation-report" => parse_field_set_str(VALUATION_REPORT_JSON),
        _ => Err(ValformError::UnknownPreset {
            name: name.to_string(),
            available: PRESETS.join(", "),
        }),
    }
}
