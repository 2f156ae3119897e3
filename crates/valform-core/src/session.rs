use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use tracing::debug;

use crate::layout::{build_blocks, group_spans, ROW_THRESHOLD};
use crate::model::{LabelBlock, Row, Span};

/// Identity of a bounded capture within one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemoKey {
    /// Explicit `answerKey`, shared by every field that names it.
    Shared(String),
    /// A single field, identified by its group and output name.
    Field { group: String, output: String },
}

/// Everything derived from the spans of one request.
///
/// Rows and label blocks are built on first use. Bounded text captures are
/// memoized by key so a text box referenced from several field groups is only
/// extracted once. The memo lives exactly as long as the session.
pub struct ExtractionSession<'s> {
    spans: &'s [Span],
    rows: OnceCell<Vec<Row>>,
    blocks: OnceCell<Vec<LabelBlock>>,
    captures: RefCell<HashMap<MemoKey, Option<String>>>,
}

impl<'s> ExtractionSession<'s> {
    pub fn new(spans: &'s [Span]) -> Self {
        ExtractionSession {
            spans,
            rows: OnceCell::new(),
            blocks: OnceCell::new(),
            captures: RefCell::new(HashMap::new()),
        }
    }

    pub fn spans(&self) -> &'s [Span] {
        self.spans
    }

    pub fn rows(&self) -> &[Row] {
        self.rows.get_or_init(|| group_spans(self.spans, ROW_THRESHOLD))
    }

    pub fn blocks(&self) -> &[LabelBlock] {
        self.blocks.get_or_init(|| build_blocks(self.spans))
    }

    /// Cached capture for `key`, computing it with `extract` on first use.
    /// Unresolved captures are cached too.
    pub fn capture_with(
        &self,
        key: MemoKey,
        extract: impl FnOnce(&Self) -> Option<String>,
    ) -> Option<String> {
        if let Some(hit) = self.captures.borrow().get(&key) {
            debug!(?key, "bounded capture served from session memo");
            return hit.clone();
        }
        let value = extract(self);
        self.captures.borrow_mut().insert(key, value.clone());
        value
    }

    pub fn cached_captures(&self) -> usize {
        self.captures.borrow().len()
    }
}
