//! Mapping source ranges back to tree nodes
//!
//! Used to judge whether a textual difference between two source revisions
//! touches anything meaningful: the changed range of the old revision is
//! matched against the provenance of the old parse.

use crate::units::is_atomic;
use selser_dom::{NodeId, NodeKind, SelserConfig, Tree};
use serde::Serialize;
use similar::{DiffOp, TextDiff};
use std::ops::Range;
use tracing::{trace, warn};

/// Bytes of comment markup around the comment text
const COMMENT_DELIMITERS: usize = "<!--".len() + "-->".len();

/// Changed ranges of two source revisions after trimming their common
/// prefix and suffix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDiff {
    pub old: Range<usize>,
    pub new: Range<usize>,
}

/// `None` when the sources are identical
pub fn wikitext_ranges_differ(old: &str, new: &str) -> Option<SourceDiff> {
    if old == new {
        return None;
    }

    let diff = TextDiff::from_chars(old, new);
    let ops = diff.ops();
    let prefix = match ops.first() {
        Some(DiffOp::Equal { len, .. }) => *len,
        _ => 0,
    };
    let suffix = match ops.last() {
        Some(DiffOp::Equal { len, .. }) if ops.len() > 1 => *len,
        _ => 0,
    };
    let prefix: usize = old.chars().take(prefix).map(char::len_utf8).sum();
    let suffix: usize = old.chars().rev().take(suffix).map(char::len_utf8).sum();

    Some(SourceDiff {
        old: prefix..old.len() - suffix,
        new: prefix..new.len() - suffix,
    })
}

/// Span of a child as seen by the matcher
enum Span {
    Known(Range<usize>),
    /// Provenance missing or inconsistent with the running offset
    Gap,
}

pub struct RangeMatcher<'c> {
    config: &'c SelserConfig,
}

impl<'c> RangeMatcher<'c> {
    pub fn new(config: &'c SelserConfig) -> Self {
        Self { config }
    }

    /// Minimal set of nodes, in document order, whose source overlaps `range`.
    ///
    /// An empty range is an insertion point and matches the nodes it falls
    /// strictly inside.
    pub fn find_overlapping(&self, tree: &Tree, range: Range<usize>) -> Vec<NodeId> {
        let root = tree.root();
        let start = tree
            .provenance(root)
            .and_then(|p| p.valid_dsr())
            .map_or(0, |dsr| dsr.inner_range().map_or(dsr.start, |inner| inner.start));

        let mut found = Vec::new();
        self.match_children(tree, root, start, &range, &mut found);
        found
    }

    /// Nodes of the old parse touched by the edit from `old` to `new`
    pub fn changed_nodes(&self, tree: &Tree, old: &str, new: &str) -> Vec<NodeId> {
        match wikitext_ranges_differ(old, new) {
            Some(diff) => self.find_overlapping(tree, diff.old),
            None => Vec::new(),
        }
    }

    fn match_children(
        &self,
        tree: &Tree,
        parent: NodeId,
        mut cursor: usize,
        range: &Range<usize>,
        found: &mut Vec<NodeId>,
    ) {
        for &child in tree.children(parent) {
            let span = match self.span(tree, child, cursor) {
                Span::Known(span) => span,
                Span::Gap => {
                    warn!(node = %child, offset = cursor, "no usable source range, including by offset");
                    if range.start <= cursor && cursor <= range.end {
                        found.push(child);
                    }
                    continue;
                }
            };
            cursor = span.end;

            if !overlaps(&span, range) {
                continue;
            }
            if tree.kind(child) != NodeKind::Element
                || contained(&span, range)
                || is_atomic(tree, child, self.config)
            {
                trace!(node = %child, start = span.start, end = span.end, "matched");
                found.push(child);
                continue;
            }

            let dsr = tree.provenance(child).and_then(|p| p.valid_dsr());
            let hits_tags = dsr.map_or(false, |dsr| {
                [dsr.open_range(), dsr.close_range()]
                    .into_iter()
                    .flatten()
                    .any(|tag| !tag.is_empty() && overlaps(&tag, range))
            });
            if hits_tags {
                trace!(node = %child, "range touches the element's own markup");
                found.push(child);
                continue;
            }

            let inner_start = dsr
                .and_then(|dsr| dsr.inner_range())
                .map_or(span.start, |inner| inner.start);
            let before = found.len();
            self.match_children(tree, child, inner_start, range, found);
            if found.len() == before {
                found.push(child);
            }
        }
    }

    fn span(&self, tree: &Tree, id: NodeId, cursor: usize) -> Span {
        if let Some(provenance) = tree.provenance(id) {
            return match provenance.dsr {
                Some(dsr) if dsr.is_valid() && dsr.start >= cursor => Span::Known(dsr.range()),
                _ => Span::Gap,
            };
        }
        match tree.kind(id) {
            NodeKind::Text => Span::Known(cursor..cursor + tree.text(id).map_or(0, str::len)),
            NodeKind::Comment => {
                let len = tree.text(id).map_or(0, str::len) + COMMENT_DELIMITERS;
                Span::Known(cursor..cursor + len)
            }
            NodeKind::Element => Span::Gap,
        }
    }
}

fn overlaps(span: &Range<usize>, range: &Range<usize>) -> bool {
    if range.is_empty() {
        span.start < range.start && range.start < span.end
    } else {
        span.start < range.end && range.start < span.end
    }
}

fn contained(span: &Range<usize>, range: &Range<usize>) -> bool {
    range.start <= span.start && span.end <= range.end
}

#[cfg(test)]
mod tests {
    use super::*;
    use selser_dom::{Dsr, Provenance};
    use selser_markup::parse;

    fn matched(source: &str, range: Range<usize>) -> Vec<String> {
        let tree = parse(source).unwrap();
        let config = SelserConfig::default();
        RangeMatcher::new(&config)
            .find_overlapping(&tree, range)
            .into_iter()
            .map(|id| match tree.tag_name(id) {
                Some(tag) => format!("<{}>{}", tag, tree.text_content(id)),
                None => tree.text(id).unwrap_or_default().to_string(),
            })
            .collect()
    }

    #[test]
    fn test_source_diff() {
        assert_eq!(wikitext_ranges_differ("abc", "abc"), None);
        assert_eq!(
            wikitext_ranges_differ("a [b] c", "a [bb] c"),
            Some(SourceDiff { old: 4..4, new: 4..5 })
        );
        assert_eq!(
            wikitext_ranges_differ("xéy", "xüy"),
            Some(SourceDiff { old: 1..3, new: 1..3 })
        );
        assert_eq!(
            wikitext_ranges_differ("aa", "aaa"),
            Some(SourceDiff { old: 2..2, new: 2..3 })
        );
    }

    #[test]
    fn test_whole_and_partial_nodes() {
        assert_eq!(matched("[a][b][c]", 3..6), vec!["<a>b"]);
        assert_eq!(matched("[a][bcd][e]", 4..5), vec!["bcd"]);
        assert_eq!(matched("[a][b][c]", 2..4), vec!["<a>a", "<a>b"]);
    }

    #[test]
    fn test_atomic_units_match_whole() {
        let tree = parse("x{{tpl|p}}y").unwrap();
        let config = SelserConfig::default();
        let found = RangeMatcher::new(&config).find_overlapping(&tree, 5..6);
        assert_eq!(found.len(), 1);
        assert_eq!(tree.attr(found[0], "typeof"), Some("mw:Transclusion"));
    }

    #[test]
    fn test_insertion_point() {
        assert_eq!(matched("[a][bcd][e]", 5..5), vec!["bcd"]);
        assert!(matched("[a][b]", 3..3).is_empty());
    }

    #[test]
    fn test_offsets_without_provenance() {
        let mut tree = Tree::new("body");
        let root = tree.root();
        tree.set_provenance(root, Provenance::with_dsr(Dsr::with_widths(0, 20, 0, 0)));
        let text = tree.create_text("abc");
        let comment = tree.create_comment("x");
        let stale = tree.create_element("b");
        tree.set_provenance(stale, Provenance::with_dsr(Dsr::new(2, 4)));
        let tail = tree.create_text("zz");
        for id in [text, comment, stale, tail] {
            tree.append_child(root, id);
        }

        let config = SelserConfig::default();
        let matcher = RangeMatcher::new(&config);
        assert_eq!(matcher.find_overlapping(&tree, 4..5), vec![comment]);
        assert_eq!(matcher.find_overlapping(&tree, 11..12), vec![stale, tail]);
    }

    #[test]
    fn test_changed_nodes() {
        let old = "<p>one</p>\n<p>two</p>";
        let new = "<p>one</p>\n<p>twice</p>";
        let tree = parse(old).unwrap();
        let config = SelserConfig::default();
        let nodes = RangeMatcher::new(&config).changed_nodes(&tree, old, new);
        assert_eq!(nodes.len(), 1);
        assert_eq!(tree.text(nodes[0]), Some("two"));
    }
}
