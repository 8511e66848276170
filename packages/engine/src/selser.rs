//! Selective serialization
//!
//! Walks the marks of a diffed tree and splices verbatim source ranges
//! together with markup regenerated by a [`NodeSerializer`]:
//!
//! - `Unmodified`: the node's source range, without descending
//! - `ChildrenChanged`: the original open and close markup around the
//!   children, each emitted by its own mark
//! - `Modified`/`ModifiedAttrsOnly`: fresh open and close markup around the
//!   children when the serializer can split the node, the whole node otherwise
//! - `Inserted`, atomic units, text and comments: full regeneration
//!
//! A newline separates verbatim and regenerated block-level neighbours.

use crate::differ::{DiffMark, DiffResult};
use crate::units::group_children;
use selser_dom::{NodeId, NodeSerializer, SelserConfig, Tree};
use serde::Serialize;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelserOutput {
    pub text: String,
    pub reused_bytes: usize,
    pub regenerated_bytes: usize,
    /// Nodes whose source range could not be sliced and were regenerated
    pub demotions: usize,
}

pub struct SelectiveSerializer<'a, S: NodeSerializer> {
    serializer: &'a S,
    config: &'a SelserConfig,
}

impl<'a, S: NodeSerializer> SelectiveSerializer<'a, S> {
    pub fn new(serializer: &'a S, config: &'a SelserConfig) -> Self {
        Self { serializer, config }
    }

    /// Serialize the edited `tree` using the marks in `result` and the
    /// original `source`
    pub fn serialize(&self, tree: &Tree, result: &DiffResult, source: &str) -> SelserOutput {
        if result.is_empty() {
            debug!(target: "selser::selser", bytes = source.len(), "no changes, returning source");
            return SelserOutput {
                text: source.to_string(),
                reused_bytes: source.len(),
                ..SelserOutput::default()
            };
        }

        let mut writer = Writer {
            tree,
            result,
            source,
            serializer: self.serializer,
            config: self.config,
            stats: SelserOutput::default(),
        };
        let text = writer.children(tree.root(), false);
        debug!(
            target: "selser::selser",
            reused = writer.stats.reused_bytes,
            regenerated = writer.stats.regenerated_bytes,
            demotions = writer.stats.demotions,
            "serialized"
        );

        SelserOutput { text, ..writer.stats }
    }
}

/// One emitted sibling unit
struct Piece {
    node: NodeId,
    text: String,
    verbatim: bool,
    /// Ends with source whose closing tag was implied
    open_ended: bool,
}

struct Writer<'a, S: NodeSerializer> {
    tree: &'a Tree,
    result: &'a DiffResult,
    source: &'a str,
    serializer: &'a S,
    config: &'a SelserConfig,
    stats: SelserOutput,
}

impl<S: NodeSerializer> Writer<'_, S> {
    fn mark(&self, id: NodeId) -> DiffMark {
        self.result.mark(id).unwrap_or(DiffMark::Modified)
    }

    fn open_ended(&self, id: NodeId) -> bool {
        self.tree
            .provenance(id)
            .map_or(false, |p| p.auto_inserted_end)
    }

    fn children(&mut self, parent: NodeId, in_pre: bool) -> String {
        let tree = self.tree;
        let mut out = String::new();
        let mut previous: Option<Piece> = None;

        for group in group_children(tree, parent, self.config) {
            let piece = if group.atomic {
                self.unit(&group.nodes)
            } else {
                self.node(group.nodes[0], in_pre)
            };

            if let Some(prev) = &previous {
                if prev.open_ended {
                    // Something now follows content that used to end its parent
                    let close = self.serializer.close_tag(tree, prev.node).unwrap_or_default();
                    self.stats.regenerated_bytes += close.len();
                    out.push_str(&close);
                }
                if !in_pre && self.needs_separator(prev, &piece, &out) {
                    trace!(target: "selser::selser", node = %piece.node, "separator");
                    self.stats.regenerated_bytes += 1;
                    out.push('\n');
                }
            }
            out.push_str(&piece.text);
            previous = Some(piece);
        }

        out
    }

    fn needs_separator(&self, prev: &Piece, next: &Piece, out: &str) -> bool {
        let tree = self.tree;
        let is_block = |id: NodeId| tree.tag_name(id).map_or(false, |t| self.config.is_block_tag(t));

        prev.verbatim != next.verbatim
            && (is_block(prev.node) || is_block(next.node))
            && !tree.is_comment(prev.node)
            && !tree.is_comment(next.node)
            && !out.ends_with('\n')
            && !next.text.starts_with('\n')
    }

    /// The node's original source, if it can be sliced
    fn slice(&mut self, id: NodeId) -> Option<String> {
        let Some(dsr) = self.result.reuse_range(id) else {
            warn!(target: "selser::selser", node = %id, "unmodified node without a source range, regenerating");
            self.stats.demotions += 1;
            return None;
        };
        match dsr.slice(self.source) {
            Some(text) => {
                trace!(target: "selser::selser", node = %id, start = dsr.start, end = dsr.end, "reused");
                self.stats.reused_bytes += text.len();
                Some(text.to_string())
            }
            None => {
                warn!(
                    target: "selser::selser",
                    node = %id,
                    start = dsr.start,
                    end = dsr.end,
                    source_len = self.source.len(),
                    "source range out of bounds, regenerating"
                );
                self.stats.demotions += 1;
                None
            }
        }
    }

    fn regenerate(&mut self, id: NodeId) -> Piece {
        let text = self.serializer.serialize_node(self.tree, id);
        self.stats.regenerated_bytes += text.len();
        Piece {
            node: id,
            text,
            verbatim: false,
            open_ended: false,
        }
    }

    fn unit(&mut self, nodes: &[NodeId]) -> Piece {
        let first = nodes[0];
        if self.mark(first) == DiffMark::Unmodified {
            if let Some(text) = self.slice(first) {
                return Piece {
                    node: first,
                    text,
                    verbatim: true,
                    open_ended: false,
                };
            }
        }

        let text = self.serializer.serialize_unit(self.tree, nodes);
        self.stats.regenerated_bytes += text.len();
        Piece {
            node: first,
            text,
            verbatim: false,
            open_ended: false,
        }
    }

    fn node(&mut self, id: NodeId, in_pre: bool) -> Piece {
        let tree = self.tree;
        match self.mark(id) {
            DiffMark::Unmodified => match self.slice(id) {
                Some(text) => Piece {
                    node: id,
                    text,
                    verbatim: true,
                    open_ended: self.open_ended(id),
                },
                None => self.regenerate(id),
            },
            DiffMark::ChildrenChanged if tree.is_element(id) => self.reuse_tags(id, in_pre),
            DiffMark::ChildrenChanged | DiffMark::Modified | DiffMark::ModifiedAttrsOnly
                if tree.is_element(id) =>
            {
                self.rebuild(id, in_pre)
            }
            _ => self.regenerate(id),
        }
    }

    /// Original open and close markup around re-emitted children
    fn reuse_tags(&mut self, id: NodeId, in_pre: bool) -> Piece {
        let source = self.source;
        let tags = self
            .tree
            .provenance(id)
            .and_then(|p| p.valid_dsr())
            .and_then(|dsr| Some((dsr.open_range()?, dsr.close_range()?)))
            .and_then(|(open, close)| Some((source.get(open)?, source.get(close)?)));

        let Some((open, close)) = tags else {
            return self.rebuild(id, in_pre);
        };

        let in_pre = in_pre || self.tree.is_tag(id, "pre");
        let inner = self.children(id, in_pre);
        self.stats.reused_bytes += open.len() + close.len();
        Piece {
            node: id,
            text: format!("{}{}{}", open, inner, close),
            verbatim: true,
            open_ended: self.open_ended(id),
        }
    }

    /// Fresh open and close markup around re-emitted children
    fn rebuild(&mut self, id: NodeId, in_pre: bool) -> Piece {
        let tree = self.tree;
        let (Some(open), Some(close)) = (
            self.serializer.open_tag(tree, id),
            self.serializer.close_tag(tree, id),
        ) else {
            return self.regenerate(id);
        };

        let in_pre = in_pre || tree.is_tag(id, "pre");
        let inner = self.children(id, in_pre);
        self.stats.regenerated_bytes += open.len() + close.len();
        Piece {
            node: id,
            text: format!("{}{}{}", open, inner, close),
            verbatim: false,
            open_ended: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::differ::diff;
    use selser_dom::Dsr;
    use selser_markup::{parse, MarkupSerializer};

    fn selser(source: &str, edit: impl FnOnce(&mut Tree)) -> SelserOutput {
        let old = parse(source).unwrap();
        let mut new = old.clone();
        edit(&mut new);
        let result = diff(&old, &new);
        let config = SelserConfig::default();
        let serializer = MarkupSerializer::default();
        SelectiveSerializer::new(&serializer, &config).serialize(&new, &result, source)
    }

    fn child(tree: &Tree, index: usize) -> NodeId {
        tree.children(tree.root())[index]
    }

    #[test]
    fn test_unchanged_document_is_returned_verbatim() {
        let source = "<p  class='odd'>a</p>\n\n[b] <!-- c -->";
        let output = selser(source, |_| {});
        assert_eq!(output.text, source);
        assert_eq!(output.reused_bytes, source.len());
        assert_eq!(output.regenerated_bytes, 0);
    }

    #[test]
    fn test_edited_middle_link() {
        let output = selser("[a][b][c]", |tree| {
            let b = child(tree, 1);
            let label = tree.first_child(b).unwrap();
            tree.set_text(label, "B");
        });
        assert_eq!(output.text, "[a][b|B][c]");
        assert_eq!(output.reused_bytes, 6);
    }

    #[test]
    fn test_deleted_middle_link() {
        let output = selser("[a][b][c]", |tree| {
            let b = child(tree, 1);
            tree.detach(b);
        });
        assert_eq!(output.text, "[a][c]");
    }

    #[test]
    fn test_inserted_block_gets_separators() {
        let output = selser("<p>a</p><p>b</p>", |tree| {
            let p = tree.create_element("p");
            let text = tree.create_text("new");
            tree.append_child(p, text);
            let root = tree.root();
            let second = child(tree, 1);
            tree.insert_before(root, p, second).unwrap();
        });
        assert_eq!(output.text, "<p>a</p>\n<p>new</p>\n<p>b</p>");
    }

    #[test]
    fn test_attribute_change_keeps_children() {
        let output = selser("<p class=\"x\">keep <b  >this</b></p>", |tree| {
            let p = child(tree, 0);
            tree.set_attr(p, "data-foobar", "1").unwrap();
        });
        assert_eq!(output.text, "<p class=\"x\" data-foobar=\"1\">keep <b  >this</b></p>");
    }

    #[test]
    fn test_children_changed_reuses_original_tags() {
        let output = selser("<div  class='a'>x<p>y</p></div>", |tree| {
            let div = child(tree, 0);
            let text = tree.first_child(div).unwrap();
            tree.set_text(text, "z");
        });
        assert_eq!(output.text, "<div  class='a'>z\n<p>y</p></div>");
    }

    #[test]
    fn test_out_of_range_provenance_is_demoted() {
        let output = selser("<p>a</p><p>b</p>", |tree| {
            let first = child(tree, 0);
            let mut provenance = tree.provenance(first).cloned().unwrap();
            provenance.dsr = Some(Dsr::with_widths(100, 108, 3, 4));
            tree.set_provenance(first, provenance);

            let second = child(tree, 1);
            let text = tree.first_child(second).unwrap();
            tree.set_text(text, "c");
        });
        assert_eq!(output.demotions, 1);
        assert_eq!(output.text, "<p>a</p>\n<p>c</p>");
    }

    #[test]
    fn test_implied_close_is_written_before_new_siblings() {
        let output = selser("<b>x", |tree| {
            let text = tree.create_text("y");
            let root = tree.root();
            tree.append_child(root, text);
        });
        assert_eq!(output.text, "<b>x</b>y");
    }

    #[test]
    fn test_no_separators_inside_pre() {
        let output = selser("<pre>a<p>b</p></pre>", |tree| {
            let pre = child(tree, 0);
            let text = tree.first_child(pre).unwrap();
            tree.set_text(text, "c");
        });
        assert_eq!(output.text, "<pre>c<p>b</p></pre>");
    }

    #[test]
    fn test_template_is_reused_or_regenerated_whole() {
        let output = selser("a {{echo|1}} b", |tree| {
            let last = child(tree, 2);
            tree.set_text(last, " c");
        });
        assert_eq!(output.text, "a {{echo|1}} c");
    }
}
