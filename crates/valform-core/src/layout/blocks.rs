use crate::extract::contains_ci;
use crate::model::{LabelBlock, Span};

/// Maximum horizontal offset between stacked fragments of one label.
pub const BLOCK_LEFT_EPS: f64 = 0.5;
/// Maximum vertical step from one fragment to the next within a label.
pub const BLOCK_TOP_GAP: f64 = 1.5;

/// Merge vertically stacked, left-aligned fragments into logical labels.
///
/// Non-blank fragments are sorted by (page, left, top). A block keeps growing
/// while the next fragment is on the same page, within [`BLOCK_LEFT_EPS`] of
/// the block's left and below the block's current end by less than
/// [`BLOCK_TOP_GAP`].
pub fn build_blocks(spans: &[Span]) -> Vec<LabelBlock> {
    let mut items: Vec<&Span> = spans.iter().filter(|s| !s.is_blank()).collect();
    items.sort_by(|a, b| {
        a.page
            .cmp(&b.page)
            .then(a.left.total_cmp(&b.left))
            .then(a.top.total_cmp(&b.top))
    });

    let mut blocks = Vec::new();
    let mut iter = items.into_iter().peekable();

    while let Some(start) = iter.next() {
        let mut block = LabelBlock {
            label_text: start.trimmed().to_string(),
            left: start.left,
            top_start: start.top,
            top_end: start.top,
            page: start.page,
        };

        while let Some(next) = iter.peek() {
            let continues = next.page == block.page
                && (next.left - block.left).abs() < BLOCK_LEFT_EPS
                && next.top > block.top_end
                && next.top - block.top_end < BLOCK_TOP_GAP;
            if !continues {
                break;
            }
            block.label_text.push(' ');
            block.label_text.push_str(next.trimmed());
            block.top_end = next.top;
            iter.next();
        }

        blocks.push(block);
    }

    blocks
}

/// Text predicate used to locate label blocks: an exact label, a
/// case-insensitive substring, or an alternate substring.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockQuery<'q> {
    pub exact: Option<&'q str>,
    pub includes: Option<&'q str>,
    pub alt_includes: Option<&'q str>,
}

impl<'q> BlockQuery<'q> {
    pub fn exact(text: &'q str) -> Self {
        BlockQuery {
            exact: Some(text),
            ..Default::default()
        }
    }

    pub fn includes(text: &'q str) -> Self {
        BlockQuery {
            includes: Some(text),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_none() && self.includes.is_none() && self.alt_includes.is_none()
    }

    fn matches_exact(&self, block: &LabelBlock) -> bool {
        self.exact.is_some_and(|e| block.label_text == e)
    }

    fn matches_includes(&self, block: &LabelBlock) -> bool {
        contains_ci(&block.label_text, self.includes)
    }

    fn matches_alt(&self, block: &LabelBlock) -> bool {
        contains_ci(&block.label_text, self.alt_includes)
    }

    /// Any of the three predicates.
    pub fn matches(&self, block: &LabelBlock) -> bool {
        self.matches_exact(block) || self.matches_includes(block) || self.matches_alt(block)
    }
}

/// Spatial restriction applied on top of a [`BlockQuery`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockScope {
    /// Only blocks starting strictly below this top.
    pub below_top: Option<f64>,
    pub page: Option<u32>,
}

impl BlockScope {
    fn admits(&self, block: &LabelBlock) -> bool {
        self.below_top.is_none_or(|t| block.top_start > t) && self.page.is_none_or(|p| block.page == p)
    }
}

/// First block in document order matching the query, trying the exact text
/// first, then the substring, then the alternate substring.
pub fn find_block<'b>(
    blocks: &'b [LabelBlock],
    query: &BlockQuery<'_>,
    scope: BlockScope,
) -> Option<&'b LabelBlock> {
    let in_scope = |b: &&LabelBlock| scope.admits(b);
    blocks
        .iter()
        .filter(in_scope)
        .find(|b| query.matches_exact(b))
        .or_else(|| blocks.iter().filter(in_scope).find(|b| query.matches_includes(b)))
        .or_else(|| blocks.iter().filter(in_scope).find(|b| query.matches_alt(b)))
}

/// Matching block closest below `scope.below_top` (or the topmost one when
/// no bound is set).
pub fn find_nearest_below<'b>(
    blocks: &'b [LabelBlock],
    query: &BlockQuery<'_>,
    scope: BlockScope,
) -> Option<&'b LabelBlock> {
    blocks
        .iter()
        .filter(|b| scope.admits(b) && query.matches(b))
        .min_by(|a, b| a.top_start.total_cmp(&b.top_start))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merges_wrapped_label() {
        let spans = vec![
            Span::new("If Yes, please state if this would affect the", 5.0, 40.0, 1),
            Span::new("residential nature of the property", 5.2, 41.2, 1),
            Span::new("Tenure:", 4.9, 50.0, 1),
        ];
        let blocks = build_blocks(&spans);
        assert_eq!(blocks.len(), 2);
        let merged = blocks.iter().find(|b| b.top_start == 40.0).unwrap();
        assert_eq!(
            merged.label_text,
            "If Yes, please state if this would affect the residential nature of the property"
        );
        assert_eq!(merged.top_end, 41.2);
        assert!(blocks.iter().any(|b| b.label_text == "Tenure:"));
    }

    #[test]
    fn test_gap_too_large_splits() {
        let spans = vec![
            Span::new("Main Walls:", 5.0, 40.0, 1),
            Span::new("Main Roof:", 5.0, 42.0, 1),
        ];
        let blocks = build_blocks(&spans);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_offset_column_splits() {
        let spans = vec![
            Span::new("Main Walls:", 5.0, 40.0, 1),
            Span::new("Brick", 6.0, 41.0, 1),
        ];
        assert_eq!(build_blocks(&spans).len(), 2);
    }

    #[test]
    fn test_blocks_never_span_pages() {
        let spans = vec![
            Span::new("GENERAL", 5.0, 98.0, 1),
            Span::new("REMARKS", 5.0, 1.0, 2),
        ];
        let blocks = build_blocks(&spans);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].page, 1);
        assert_eq!(blocks[1].page, 2);
    }

    #[test]
    fn test_blank_fragments_ignored() {
        let spans = vec![
            Span::new("Garage:", 5.0, 40.0, 1),
            Span::new("   ", 5.0, 40.5, 1),
        ];
        let blocks = build_blocks(&spans);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].top_end, 40.0);
    }

    #[test]
    fn test_find_block_prefers_exact() {
        let blocks = build_blocks(&[
            Span::new("If Yes, please provide details below", 5.0, 10.0, 1),
            Span::new("If Yes, please provide details", 5.0, 20.0, 1),
        ]);
        let q = BlockQuery {
            exact: Some("If Yes, please provide details"),
            includes: Some("please provide details"),
            alt_includes: None,
        };
        let found = find_block(&blocks, &q, BlockScope::default()).unwrap();
        assert_eq!(found.top_start, 20.0);
    }

    #[test]
    fn test_find_nearest_below_respects_scope() {
        let blocks = build_blocks(&[
            Span::new("SERVICES", 5.0, 5.0, 1),
            Span::new("If Yes, please provide details", 5.0, 10.0, 1),
            Span::new("If Yes, please provide details", 5.0, 30.0, 1),
            Span::new("If Yes, please provide details", 5.0, 20.0, 2),
        ]);
        let q = BlockQuery::includes("please provide details");
        let scope = BlockScope {
            below_top: Some(15.0),
            page: Some(1),
        };
        let found = find_nearest_below(&blocks, &q, scope).unwrap();
        assert_eq!(found.top_start, 30.0);
        assert_eq!(found.page, 1);
    }
}
