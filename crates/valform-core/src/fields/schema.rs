use serde::{Deserialize, Serialize};

use crate::extract::bounded::{AnchorQuery, BoundedOptions};
use crate::extract::checkbox::{CheckboxOptions, YesNoColumns, YesNoOptions};
use crate::extract::choice::{ChoiceOption, ChoiceOptions};
use crate::extract::value::ValueOptions;
use crate::extract::LabelLookup;
use crate::layout::BlockQuery;
use crate::model::ApplicationType;
use crate::session::MemoKey;

/// A named set of field groups describing one report template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSetDef {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub version: String,
    pub groups: Vec<FieldGroupDef>,
}

/// One output object of the report, e.g. `propertyType` or `services`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldGroupDef {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub fields: Vec<FieldDescriptor>,
}

/// How a single output key is read off the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldDescriptor {
    Checkbox(CheckboxField),
    YesNo(YesNoField),
    ValueColumn(ValueColumnField),
    Textarea(TextareaField),
    Choice(ChoiceField),
    Below(BelowField),
}

impl FieldDescriptor {
    pub fn output(&self) -> &str {
        match self {
            FieldDescriptor::Checkbox(f) => &f.output,
            FieldDescriptor::YesNo(f) => &f.output,
            FieldDescriptor::ValueColumn(f) => &f.output,
            FieldDescriptor::Textarea(f) => &f.output,
            FieldDescriptor::Choice(f) => &f.output,
            FieldDescriptor::Below(f) => &f.output,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            FieldDescriptor::Checkbox(f) => &f.label,
            FieldDescriptor::YesNo(f) => &f.label,
            FieldDescriptor::ValueColumn(f) => &f.label,
            FieldDescriptor::Textarea(f) => &f.label,
            FieldDescriptor::Choice(f) => &f.label,
            FieldDescriptor::Below(f) => &f.label,
        }
    }

    pub fn variant(&self) -> Option<ApplicationType> {
        match self {
            FieldDescriptor::Checkbox(f) => f.variant,
            FieldDescriptor::YesNo(f) => f.variant,
            FieldDescriptor::ValueColumn(f) => f.variant,
            FieldDescriptor::Textarea(f) => f.variant,
            FieldDescriptor::Choice(f) => f.variant,
            FieldDescriptor::Below(f) => f.variant,
        }
    }

    /// Short name of the descriptor kind, as written in JSON.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldDescriptor::Checkbox(_) => "checkbox",
            FieldDescriptor::YesNo(_) => "yes_no",
            FieldDescriptor::ValueColumn(_) => "value_column",
            FieldDescriptor::Textarea(_) => "textarea",
            FieldDescriptor::Choice(_) => "choice",
            FieldDescriptor::Below(_) => "below",
        }
    }

    /// Whether the descriptor is used for reports of `application_type`.
    pub fn applies_to(&self, application_type: ApplicationType) -> bool {
        self.variant().is_none_or(|v| v == application_type)
    }
}

fn default_top_threshold() -> f64 {
    0.6
}

fn default_left_threshold() -> f64 {
    2.0
}

fn default_left_window() -> f64 {
    3.5
}

fn default_adjacent_window() -> f64 {
    2.0
}

fn default_row_right_within() -> f64 {
    60.0
}

fn default_cluster_threshold() -> f64 {
    3.0
}

fn default_row_eps() -> f64 {
    0.6
}

fn default_true() -> bool {
    true
}

/// Single checkbox: `true` when a marker sits at `left`, otherwise null.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckboxField {
    pub output: String,
    pub label: String,
    #[serde(default)]
    pub label_includes: Option<String>,
    /// Section text above the label, for labels that repeat on the page.
    #[serde(default)]
    pub below_anchor: Option<String>,
    pub left: f64,
    #[serde(default = "default_top_threshold")]
    pub top_threshold: f64,
    #[serde(default = "default_left_threshold")]
    pub left_threshold: f64,
    #[serde(default)]
    pub row_fallback_max_left: Option<f64>,
    #[serde(default)]
    pub variant: Option<ApplicationType>,
}

impl CheckboxField {
    pub fn lookup(&self) -> LabelLookup<'_> {
        LabelLookup {
            text: &self.label,
            includes: self.label_includes.as_deref(),
            alt_includes: None,
            below_anchor: self.below_anchor.as_deref(),
        }
    }

    pub fn options(&self) -> CheckboxOptions {
        CheckboxOptions {
            top_threshold: self.top_threshold,
            left_threshold: self.left_threshold,
            row_fallback_max_left: self.row_fallback_max_left,
        }
    }
}

/// Paired Yes/No(/N/A) question. Emits a boolean (N/A is null) unless
/// `passThrough` keeps the answer as text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YesNoField {
    pub output: String,
    pub label: String,
    #[serde(default)]
    pub label_includes: Option<String>,
    #[serde(default)]
    pub below_anchor: Option<String>,
    pub yes_left: f64,
    pub no_left: f64,
    #[serde(default)]
    pub na_left: Option<f64>,
    #[serde(default = "default_top_threshold")]
    pub top_threshold: f64,
    #[serde(default = "default_left_window")]
    pub left_window: f64,
    #[serde(default)]
    pub row_fallback_max_left: Option<f64>,
    #[serde(default)]
    pub allow_word_fallback: bool,
    #[serde(default)]
    pub pass_through: bool,
    #[serde(default)]
    pub variant: Option<ApplicationType>,
}

impl YesNoField {
    pub fn lookup(&self) -> LabelLookup<'_> {
        LabelLookup {
            text: &self.label,
            includes: self.label_includes.as_deref(),
            alt_includes: None,
            below_anchor: self.below_anchor.as_deref(),
        }
    }

    pub fn columns(&self) -> YesNoColumns {
        YesNoColumns {
            yes: self.yes_left,
            no: self.no_left,
            na: self.na_left,
        }
    }

    pub fn options(&self) -> YesNoOptions {
        YesNoOptions {
            top_threshold: self.top_threshold,
            left_window: self.left_window,
            row_fallback_max_left: self.row_fallback_max_left,
            allow_word_fallback: self.allow_word_fallback,
        }
    }
}

/// Numeric answer at a fixed column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueColumnField {
    pub output: String,
    pub label: String,
    #[serde(default)]
    pub label_includes: Option<String>,
    #[serde(default)]
    pub label_alt_includes: Option<String>,
    pub target_left: f64,
    #[serde(default = "default_top_threshold")]
    pub top_threshold: f64,
    #[serde(default = "default_left_threshold")]
    pub left_threshold: f64,
    #[serde(default)]
    pub combine_digits: bool,
    #[serde(default)]
    pub additional_lefts: Vec<f64>,
    #[serde(default = "default_adjacent_window")]
    pub adjacent_left_window: f64,
    #[serde(default = "default_adjacent_window")]
    pub adjacent_right_window: f64,
    #[serde(default)]
    pub combine_vertical_window: Option<f64>,
    #[serde(default)]
    pub row_right_fallback: bool,
    #[serde(default = "default_row_right_within")]
    pub row_right_within: f64,
    /// Emit a JSON number instead of the literal text.
    #[serde(default)]
    pub numeric: bool,
    #[serde(default)]
    pub variant: Option<ApplicationType>,
}

impl ValueColumnField {
    pub fn lookup(&self) -> LabelLookup<'_> {
        LabelLookup {
            text: &self.label,
            includes: self.label_includes.as_deref(),
            alt_includes: self.label_alt_includes.as_deref(),
            below_anchor: None,
        }
    }

    pub fn options(&self) -> ValueOptions<'_> {
        ValueOptions {
            top_threshold: self.top_threshold,
            left_threshold: self.left_threshold,
            combine_digits: self.combine_digits,
            additional_lefts: &self.additional_lefts,
            adjacent_left_window: self.adjacent_left_window,
            adjacent_right_window: self.adjacent_right_window,
            combine_vertical_window: self.combine_vertical_window,
            row_right_fallback: self.row_right_fallback,
            row_right_within: self.row_right_within,
        }
    }
}

/// Free text captured between this label and the next one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextareaField {
    pub output: String,
    pub label: String,
    #[serde(default)]
    pub label_includes: Option<String>,
    #[serde(default)]
    pub label_alt_includes: Option<String>,
    #[serde(default)]
    pub next_label: Option<String>,
    #[serde(default)]
    pub next_label_includes: Option<String>,
    #[serde(default)]
    pub next_label_alt_includes: Option<String>,
    #[serde(default)]
    pub next_left_min: Option<f64>,
    #[serde(default)]
    pub next_left_max: Option<f64>,
    /// Section heading (substring) the label must sit below.
    #[serde(default)]
    pub below_section: Option<String>,
    /// Preceding question (substring); the nearest label below it is used.
    #[serde(default)]
    pub anchor_before: Option<String>,
    #[serde(default)]
    pub allow_open_end: bool,
    #[serde(default)]
    pub left_band: Option<f64>,
    #[serde(default)]
    pub answer_left_min: Option<f64>,
    #[serde(default)]
    pub answer_left_max: Option<f64>,
    #[serde(default)]
    pub only_right_of_a: bool,
    #[serde(default)]
    pub right_slack: f64,
    #[serde(default)]
    pub max_below_a: Option<f64>,
    #[serde(default)]
    pub include_same_row_right: bool,
    #[serde(default = "default_row_eps")]
    pub row_eps: f64,
    #[serde(default = "default_cluster_threshold")]
    pub cluster_threshold: f64,
    #[serde(default)]
    pub expand_right_within: Option<f64>,
    #[serde(default)]
    pub stop_markers: Vec<String>,
    #[serde(default)]
    pub strip_label_prefix: bool,
    #[serde(default)]
    pub strip_tokens: Vec<String>,
    #[serde(default = "default_true")]
    pub strip_checkbox_tokens: bool,
    #[serde(default = "default_true")]
    pub reject_if_label: bool,
    /// Shares one capture between fields of different groups in a request.
    #[serde(default)]
    pub answer_key: Option<String>,
    #[serde(default)]
    pub variant: Option<ApplicationType>,
}

impl TextareaField {
    pub fn anchor_query(&self) -> AnchorQuery<'_> {
        AnchorQuery {
            label: BlockQuery {
                exact: Some(&self.label),
                includes: self.label_includes.as_deref(),
                alt_includes: self.label_alt_includes.as_deref(),
            },
            next: BlockQuery {
                exact: self.next_label.as_deref(),
                includes: self.next_label_includes.as_deref(),
                alt_includes: self.next_label_alt_includes.as_deref(),
            },
            below_section: self.below_section.as_deref().map(BlockQuery::includes),
            anchor_before: self.anchor_before.as_deref(),
            next_left_min: self.next_left_min,
            next_left_max: self.next_left_max,
        }
    }

    pub fn options(&self) -> BoundedOptions<'_> {
        BoundedOptions {
            left_band: self.left_band,
            answer_left_min: self.answer_left_min,
            answer_left_max: self.answer_left_max,
            only_right_of_a: self.only_right_of_a,
            right_slack: self.right_slack,
            max_below_a: self.max_below_a,
            include_same_row_right: self.include_same_row_right,
            row_eps: self.row_eps,
            cluster_threshold: self.cluster_threshold,
            expand_right_within: self.expand_right_within,
            stop_markers: &self.stop_markers,
            strip_label_prefix: self.strip_label_prefix,
            strip_tokens: &self.strip_tokens,
            strip_checkbox_tokens: self.strip_checkbox_tokens,
            reject_if_label: self.reject_if_label,
            allow_open_end: self.allow_open_end,
        }
    }

    /// Memo key for the capture within one request. Without an `answerKey`
    /// the capture belongs to this field of `group` alone.
    pub fn memo_key(&self, group: &str) -> MemoKey {
        match &self.answer_key {
            Some(key) => MemoKey::Shared(key.clone()),
            None => MemoKey::Field {
                group: group.to_string(),
                output: self.output.clone(),
            },
        }
    }
}

/// Row of named options, one of which is marked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceField {
    pub output: String,
    pub label: String,
    pub options: Vec<ChoiceOption>,
    #[serde(default = "default_top_threshold")]
    pub top_threshold: f64,
    #[serde(default = "default_left_threshold")]
    pub left_threshold: f64,
    #[serde(default = "default_true")]
    pub require_marker: bool,
    #[serde(default)]
    pub variant: Option<ApplicationType>,
}

impl ChoiceField {
    pub fn options(&self) -> ChoiceOptions {
        ChoiceOptions {
            top_threshold: self.top_threshold,
            left_threshold: self.left_threshold,
            require_marker: self.require_marker,
        }
    }
}

/// Answer printed directly under a (possibly wrapped) label.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BelowField {
    pub output: String,
    pub label: String,
    #[serde(default)]
    pub variant: Option<ApplicationType>,
}
