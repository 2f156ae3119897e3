use std::collections::BTreeMap;
use std::path::Path;
use valform_core::error::ValformError;
use valform_core::fields::builtin;
use valform_core::fields::schema::{FieldDescriptor, FieldSetDef};

fn total_fields(set: &FieldSetDef) -> usize {
    set.groups.iter().map(|g| g.fields.len()).sum()
}

pub fn list() -> Result<(), ValformError> {
    println!("Available predefined field sets:\n");
    for name in builtin::PRESETS {
        let set = builtin::load_preset(name)?;
        println!(
            "  {:<18} {} (v{}) [{} groups, {} fields]",
            name,
            set.name,
            set.version,
            set.groups.len(),
            total_fields(&set)
        );
        if let Some(ref desc) = set.description {
            println!("                     {}", desc);
        }
        println!();
    }
    Ok(())
}

pub fn show(preset: &str) -> Result<(), ValformError> {
    let set = builtin::load_preset(preset)?;

    println!("{} (version {})\n", set.name, set.version);
    if let Some(ref desc) = set.description {
        println!("{}\n", desc);
    }

    for group in &set.groups {
        println!("  {}", group.name);
        let max_name = group
            .fields
            .iter()
            .map(|f| f.output().len())
            .max()
            .unwrap_or(20);
        for field in &group.fields {
            let variant = field
                .variant()
                .map(|v| format!(" [{v}]"))
                .unwrap_or_default();
            println!(
                "    {:<width$}  {:<12} {}{}  {}",
                field.output(),
                field.kind(),
                position(field),
                variant,
                field.label(),
                width = max_name
            );
        }
        println!();
    }

    Ok(())
}

/// Short description of where the answer is read.
fn position(field: &FieldDescriptor) -> String {
    match field {
        FieldDescriptor::Checkbox(f) => format!("@{}", f.left),
        FieldDescriptor::YesNo(f) => match f.na_left {
            Some(na) => format!("@{}/{}/{}", f.yes_left, f.no_left, na),
            None => format!("@{}/{}", f.yes_left, f.no_left),
        },
        FieldDescriptor::ValueColumn(f) => format!("@{}", f.target_left),
        FieldDescriptor::Textarea(f) => match f.next_label.as_deref() {
            Some(next) => format!("until '{next}'"),
            None => "to page end".to_string(),
        },
        FieldDescriptor::Choice(f) => format!("{} options", f.options.len()),
        FieldDescriptor::Below(_) => "below label".to_string(),
    }
}

pub fn schema() -> Result<(), ValformError> {
    print!(
        r#"JSON Field Set Schema
=====================

A field set describes where each answer of a fixed-layout report is
printed. When you run `valform extract`, every field is located by its
label text and read from positions given as percentages of the page
(left = % of width, top = % of height, origin top-left).

Top-level fields:
  name          (string, required)  Human-readable name of the field set
  description   (string, optional)  What this field set is for
  version       (string, required)  Version identifier (e.g., "1.0")
  groups        (array, required)   Output groups (see below)

Each group:
  name          (string, required)  Output object name, unique
  description   (string, optional)
  fields        (array, required)   Field descriptors

Every field descriptor has:
  kind          (string, required)  checkbox | yes_no | value_column |
                                    textarea | choice | below
  output        (string, required)  Output key within the group
  label         (string, required)  Exact label text on the page
  variant       (string, optional)  "btl" or "hpp": only used for that
                                    template variant. The same output may
                                    be declared once per variant.

checkbox       left, labelIncludes, belowAnchor, topThreshold (0.6),
               leftThreshold (2.0), rowFallbackMaxLeft
               -> true when marked, otherwise null
yes_no         yesLeft, noLeft, naLeft, labelIncludes, belowAnchor,
               topThreshold (0.6), leftWindow (3.5), rowFallbackMaxLeft,
               allowWordFallback (false), passThrough (false)
               -> true / false, null for N/A; "Yes"/"No"/"N/A" with passThrough
value_column   targetLeft, labelIncludes, labelAltIncludes,
               topThreshold (0.6), leftThreshold (2.0), combineDigits,
               additionalLefts, adjacentLeftWindow (2.0),
               adjacentRightWindow (2.0), combineVerticalWindow,
               rowRightFallback, rowRightWithin (60.0), numeric
               -> the numeric text, or a number with "numeric": true
textarea       nextLabel, nextLabelIncludes, nextLabelAltIncludes,
               nextLeftMin, nextLeftMax, labelIncludes, labelAltIncludes,
               belowSection, anchorBefore, allowOpenEnd, leftBand,
               answerLeftMin, answerLeftMax, onlyRightOfA, rightSlack,
               maxBelowA, includeSameRowRight, rowEps (0.6),
               clusterThreshold (3.0), expandRightWithin, stopMarkers,
               stripLabelPrefix, stripTokens, stripCheckboxTokens (true),
               rejectIfLabel (true), answerKey
               -> text captured between the label and the next label
choice         options: [{{ "value": "A", "left": 19.65 }}, ...],
               topThreshold (0.6), leftThreshold (2.0), requireMarker (true)
               -> value of the first marked option
below          -> text printed directly under a wrapped label

Example:
{{
  "name": "My template",
  "version": "1.0",
  "groups": [
    {{
      "name": "localityAndDemand",
      "fields": [
        {{ "kind": "checkbox", "output": "isUrban", "label": "Urban", "left": 20.49 }},
        {{
          "kind": "yes_no",
          "output": "isOccupancyRestrictionPossible",
          "label": "Is there a possibility of occupancy restriction?",
          "yesLeft": 40.15,
          "noLeft": 46.2
        }},
        {{
          "kind": "value_column",
          "variant": "hpp",
          "output": "marketValue",
          "label": "Market Value in present condition",
          "targetLeft": 20.7,
          "numeric": true
        }}
      ]
    }}
  ]
}}

Run `valform spans <PDF> --rows` to read label and answer coordinates
off a sample document.
"#
    );
    Ok(())
}

pub fn validate(file: &Path) -> Result<(), ValformError> {
    let set = valform_core::fields::load_field_set(file)?;

    println!("Field set '{}' (v{}) is valid.", set.name, set.version);
    println!("  Groups: {}", set.groups.len());
    println!("  Fields: {}", total_fields(&set));

    let mut kinds: BTreeMap<&str, usize> = BTreeMap::new();
    for field in set.groups.iter().flat_map(|g| &g.fields) {
        *kinds.entry(field.kind()).or_default() += 1;
    }
    let summary: Vec<String> = kinds.iter().map(|(k, n)| format!("{k} {n}")).collect();
    println!("  Kinds: {}", summary.join(", "));

    // Check for potential issues (warnings, not errors)
    let mut warnings = Vec::new();
    for group in &set.groups {
        if group.fields.is_empty() {
            warnings.push(format!("group '{}' has no fields", group.name));
        }
        for field in &group.fields {
            if let FieldDescriptor::Textarea(f) = field {
                if f.next_label.is_none()
                    && f.next_label_includes.is_none()
                    && f.next_label_alt_includes.is_none()
                    && !f.allow_open_end
                {
                    warnings.push(format!(
                        "textarea '{}' has no next label and allowOpenEnd is off; it never resolves",
                        f.output
                    ));
                }
            }
        }
    }

    if !warnings.is_empty() {
        println!("\nWarnings:");
        for w in &warnings {
            println!("  - {}", w);
        }
    }

    Ok(())
}
