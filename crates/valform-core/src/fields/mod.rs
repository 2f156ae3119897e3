pub mod builtin;
pub mod schema;

use crate::error::ValformError;
use crate::model::ApplicationType;
use schema::{FieldDescriptor, FieldSetDef};
use std::collections::HashSet;
use std::path::Path;

/// Load a field set from a JSON file.
pub fn load_field_set(path: &Path) -> Result<FieldSetDef, ValformError> {
    let content = std::fs::read_to_string(path).map_err(|e| ValformError::FieldSetLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_field_set(&content, path)
}

/// Parse a field set from a JSON string.
pub fn parse_field_set(json: &str, source: &Path) -> Result<FieldSetDef, ValformError> {
    let set: FieldSetDef = serde_json::from_str(json).map_err(|e| ValformError::FieldSetLoad {
        path: source.to_path_buf(),
        reason: e.to_string(),
    })?;
    validate_field_set(&set)?;
    Ok(set)
}

/// Parse a field set from a JSON string (no file path context).
pub fn parse_field_set_str(json: &str) -> Result<FieldSetDef, ValformError> {
    let set: FieldSetDef = serde_json::from_str(json).map_err(ValformError::Json)?;
    validate_field_set(&set)?;
    Ok(set)
}

fn invalid(msg: String) -> ValformError {
    ValformError::FieldSetInvalid(msg)
}

fn check_positive(field: &str, what: &str, value: f64) -> Result<(), ValformError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!(
            "field '{field}': {what} must be a positive number, got {value}"
        )))
    }
}

fn check_positive_opt(field: &str, what: &str, value: Option<f64>) -> Result<(), ValformError> {
    value.map_or(Ok(()), |v| check_positive(field, what, v))
}

/// Validate that a field set is well-formed.
pub fn validate_field_set(set: &FieldSetDef) -> Result<(), ValformError> {
    if set.groups.is_empty() {
        return Err(invalid("groups must not be empty".into()));
    }

    let mut group_names = HashSet::new();
    for group in &set.groups {
        if group.name.trim().is_empty() {
            return Err(invalid("group name must not be empty".into()));
        }
        if !group_names.insert(group.name.as_str()) {
            return Err(invalid(format!("duplicate group '{}'", group.name)));
        }

        // The same key may be declared once per template variant.
        let mut outputs: HashSet<(&str, Option<ApplicationType>)> = HashSet::new();
        for field in &group.fields {
            validate_field(field).map_err(|e| match e {
                ValformError::FieldSetInvalid(msg) => {
                    invalid(format!("group '{}': {msg}", group.name))
                }
                other => other,
            })?;

            let key = (field.output(), field.variant());
            let clashes = outputs.iter().any(|(out, variant)| {
                *out == key.0 && (variant.is_none() || key.1.is_none() || *variant == key.1)
            });
            if clashes {
                return Err(invalid(format!(
                    "group '{}': output '{}' is declared twice for the same variant",
                    group.name, key.0
                )));
            }
            outputs.insert(key);
        }
    }

    Ok(())
}

fn validate_field(field: &FieldDescriptor) -> Result<(), ValformError> {
    let name = field.output();
    if name.trim().is_empty() {
        return Err(invalid(format!(
            "{} field labelled '{}' has an empty output key",
            field.kind(),
            field.label()
        )));
    }
    if field.label().trim().is_empty() {
        return Err(invalid(format!("field '{name}' has an empty label")));
    }

    match field {
        FieldDescriptor::Checkbox(f) => {
            check_positive(name, "left", f.left)?;
            check_positive(name, "topThreshold", f.top_threshold)?;
            check_positive(name, "leftThreshold", f.left_threshold)?;
            check_positive_opt(name, "rowFallbackMaxLeft", f.row_fallback_max_left)?;
        }
        FieldDescriptor::YesNo(f) => {
            check_positive(name, "yesLeft", f.yes_left)?;
            check_positive(name, "noLeft", f.no_left)?;
            check_positive_opt(name, "naLeft", f.na_left)?;
            check_positive(name, "topThreshold", f.top_threshold)?;
            check_positive(name, "leftWindow", f.left_window)?;
            check_positive_opt(name, "rowFallbackMaxLeft", f.row_fallback_max_left)?;
            let cols = [Some(f.yes_left), Some(f.no_left), f.na_left];
            let distinct = cols.iter().flatten().enumerate().all(|(i, a)| {
                cols.iter().flatten().skip(i + 1).all(|b| a != b)
            });
            if !distinct {
                return Err(invalid(format!("field '{name}': yes/no columns must differ")));
            }
        }
        FieldDescriptor::ValueColumn(f) => {
            check_positive(name, "targetLeft", f.target_left)?;
            check_positive(name, "topThreshold", f.top_threshold)?;
            check_positive(name, "leftThreshold", f.left_threshold)?;
            check_positive(name, "adjacentLeftWindow", f.adjacent_left_window)?;
            check_positive(name, "adjacentRightWindow", f.adjacent_right_window)?;
            check_positive_opt(name, "combineVerticalWindow", f.combine_vertical_window)?;
            check_positive(name, "rowRightWithin", f.row_right_within)?;
            for left in &f.additional_lefts {
                check_positive(name, "additionalLefts", *left)?;
            }
        }
        FieldDescriptor::Textarea(f) => {
            check_positive(name, "rowEps", f.row_eps)?;
            check_positive(name, "clusterThreshold", f.cluster_threshold)?;
            check_positive_opt(name, "leftBand", f.left_band)?;
            check_positive_opt(name, "maxBelowA", f.max_below_a)?;
            check_positive_opt(name, "expandRightWithin", f.expand_right_within)?;
            if !f.right_slack.is_finite() || f.right_slack < 0.0 {
                return Err(invalid(format!(
                    "field '{name}': rightSlack must not be negative"
                )));
            }
            if let (Some(lo), Some(hi)) = (f.answer_left_min, f.answer_left_max) {
                if lo > hi {
                    return Err(invalid(format!(
                        "field '{name}': answerLeftMin is greater than answerLeftMax"
                    )));
                }
            }
        }
        FieldDescriptor::Choice(f) => {
            if f.options.is_empty() {
                return Err(invalid(format!("field '{name}' has no options")));
            }
            check_positive(name, "topThreshold", f.top_threshold)?;
            check_positive(name, "leftThreshold", f.left_threshold)?;
            for option in &f.options {
                if option.value.trim().is_empty() {
                    return Err(invalid(format!("field '{name}' has an empty option value")));
                }
                check_positive(name, "option left", option.left)?;
            }
        }
        FieldDescriptor::Below(_) => {}
    }

    Ok(())
}
