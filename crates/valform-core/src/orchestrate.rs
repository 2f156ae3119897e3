use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

use crate::extract::below::find_answer_below;
use crate::extract::bounded::{extract_bounded, locate_anchors};
use crate::extract::checkbox::{match_checkbox, match_yes_no, YesNo};
use crate::extract::choice::match_choice;
use crate::extract::value::extract_value;
use crate::extract::LabelLookup;
use crate::fields::schema::{FieldDescriptor, FieldGroupDef, TextareaField};
use crate::layout::{find_block, BlockQuery, BlockScope};
use crate::model::{ApplicationType, ExtractionResult, FieldValue};
use crate::session::ExtractionSession;

/// Run every applicable descriptor of `group` and collect the outputs.
///
/// Every output key declared in the group is present in the result, `None`
/// when unresolved or when only descriptors for another variant declare it.
pub fn extract_group(
    session: &ExtractionSession<'_>,
    group: &FieldGroupDef,
    application_type: ApplicationType,
) -> ExtractionResult {
    let mut result: ExtractionResult = group
        .fields
        .iter()
        .map(|f| (f.output().to_string(), None))
        .collect();

    for field in group.fields.iter().filter(|f| f.applies_to(application_type)) {
        let value = extract_field(session, &group.name, field);
        debug!(
            group = %group.name,
            field = field.output(),
            kind = field.kind(),
            resolved = value.is_some(),
            "field extracted"
        );
        result.insert(field.output().to_string(), value);
    }

    result
}

/// Run every group of a field set.
pub fn extract_all<'g>(
    session: &ExtractionSession<'_>,
    groups: impl IntoIterator<Item = &'g FieldGroupDef>,
    application_type: ApplicationType,
) -> Vec<(String, ExtractionResult)> {
    groups
        .into_iter()
        .map(|g| (g.name.clone(), extract_group(session, g, application_type)))
        .collect()
}

fn extract_field(
    session: &ExtractionSession<'_>,
    group: &str,
    field: &FieldDescriptor,
) -> Option<FieldValue> {
    let spans = session.spans();
    match field {
        FieldDescriptor::Checkbox(f) => {
            let checked = match_checkbox(spans, session.rows(), &f.lookup(), f.left, &f.options());
            checked.then_some(FieldValue::Bool(true))
        }
        FieldDescriptor::YesNo(f) => {
            let answer = match_yes_no(spans, session.rows(), &f.lookup(), &f.columns(), &f.options())?;
            if f.pass_through {
                return Some(FieldValue::Text(answer.to_string()));
            }
            match answer {
                YesNo::Yes => Some(FieldValue::Bool(true)),
                YesNo::No => Some(FieldValue::Bool(false)),
                YesNo::NotApplicable => None,
            }
        }
        FieldDescriptor::ValueColumn(f) => {
            let text = extract_value(spans, &f.lookup(), f.target_left, &f.options())?;
            Some(typed_value(text, f.numeric))
        }
        FieldDescriptor::Textarea(f) => session
            .capture_with(f.memo_key(group), |s| capture_textarea(s, f))
            .map(FieldValue::Text),
        FieldDescriptor::Choice(f) => {
            let lookup = LabelLookup::exact(&f.label);
            match_choice(spans, &lookup, &f.options, &f.options())
                .map(|v| FieldValue::Text(v.to_string()))
        }
        FieldDescriptor::Below(f) => {
            let block = find_block(session.blocks(), &BlockQuery::exact(&f.label), BlockScope::default())?;
            find_answer_below(block, spans).map(FieldValue::Text)
        }
    }
}

fn capture_textarea(session: &ExtractionSession<'_>, field: &TextareaField) -> Option<String> {
    let anchors = locate_anchors(session.blocks(), &field.anchor_query())?;
    extract_bounded(anchors.label, anchors.next, session.spans(), &field.options())
}

fn typed_value(text: String, numeric: bool) -> FieldValue {
    if numeric {
        if let Ok(n) = Decimal::from_str(&text) {
            return FieldValue::Number(n);
        }
    }
    FieldValue::Text(text)
}
