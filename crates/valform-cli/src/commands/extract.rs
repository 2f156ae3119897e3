use std::path::PathBuf;
use valform_core::error::ValformError;
use valform_core::extraction::pdftotext::PdftotextExtractor;
use valform_core::extraction::FullTextSource;
use valform_core::fields::builtin;
use valform_core::fields::schema::FieldSetDef;
use valform_core::model::{ApplicationType, Span};

use crate::output;

pub struct ExtractArgs {
    pub input_file: PathBuf,
    pub application_type: ApplicationType,
    pub preset: String,
    pub fields: Option<PathBuf>,
    pub groups: Vec<String>,
    pub output_format: String,
    pub raw_text: bool,
}

pub fn run(args: ExtractArgs) -> Result<(), ValformError> {
    let field_set = match &args.fields {
        Some(path) => valform_core::fields::load_field_set(path)?,
        None => builtin::load_preset(&args.preset)?,
    };
    let field_set = select_groups(field_set, &args.groups)?;

    // Determine input type by extension
    let is_json = args
        .input_file
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let report = if is_json {
        // Pre-extracted spans, e.g. from `valform spans -O`
        let json_bytes = std::fs::read(&args.input_file)?;
        let spans: Vec<Span> = serde_json::from_slice(&json_bytes)?;
        valform_core::extract_spans(&spans, &field_set, args.application_type)
    } else {
        let pdf_bytes = std::fs::read(&args.input_file)?;
        let extractor = PdftotextExtractor::new();
        let full_text = args
            .raw_text
            .then_some(&extractor as &dyn FullTextSource);
        valform_core::extract_pdf(
            &pdf_bytes,
            &extractor,
            full_text,
            &field_set,
            args.application_type,
        )?
    };

    match args.output_format.as_str() {
        "json" => output::json::print(&report)?,
        _ => output::table::print_report(&report),
    }

    Ok(())
}

/// Keep only the named groups, in the order they are declared.
fn select_groups(mut field_set: FieldSetDef, names: &[String]) -> Result<FieldSetDef, ValformError> {
    if names.is_empty() {
        return Ok(field_set);
    }
    if let Some(unknown) = names
        .iter()
        .find(|n| !field_set.groups.iter().any(|g| &g.name == *n))
    {
        let available: Vec<&str> = field_set.groups.iter().map(|g| g.name.as_str()).collect();
        return Err(ValformError::FieldSetInvalid(format!(
            "unknown group '{unknown}'. Available: {}",
            available.join(", ")
        )));
    }
    field_set.groups.retain(|g| names.contains(&g.name));
    Ok(field_set)
}
