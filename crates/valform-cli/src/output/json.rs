use valform_core::error::ValformError;
use valform_core::model::ExtractionReport;

pub fn print(report: &ExtractionReport) -> Result<(), ValformError> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{json}");
    Ok(())
}
