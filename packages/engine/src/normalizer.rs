//! Canonical form of a DOM for semantic comparison
//!
//! Normalization works on a copy. The passes run in a fixed order:
//!
//! 1. drop comments, `meta` and `link` elements (unless `parsoid_only`)
//! 2. unwrap transparent spans, so wrappers do not split text runs
//! 3. strip bookkeeping attributes, canonicalize `href` and `src`
//! 4. scrub editor artefacts (optional)
//! 5. drop empty spans, merge adjacent text nodes
//! 6. collapse whitespace, stripping it at the edges of block elements
//! 7. give every block element exactly one newline on each side
//!
//! The serialized result is checked for structural sanity; a failure is an
//! error since it can only come from corrupted input.

use crate::error::{EngineError, EngineResult};
use regex::Regex;
use selser_dom::config::is_void_element;
use selser_dom::visitor::walk_children_mut;
use selser_dom::{inner_html, to_html, HtmlOptions, HtmlReader, NodeId, NodeKind, SelserConfig, Tree, VisitorMut};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

const SANITY_PATTERN: &str =
    r#"^[^<]*(?:<(?:/\w+|\w+(?:\s+[^\x00-\x1A\s"'>/=]+(?:="[^"]*")?)*/?)>[^<]*)*$"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizeOptions {
    /// Keep structural and debugging attributes for a stricter comparison
    pub parsoid_only: bool,
    /// Keep inter-element whitespace as it is
    pub preserve_iew: bool,
    /// Also remove artefacts typical of visual editing
    pub scrub: bool,
}

struct Patterns {
    transparent: Regex,
    generated_id: Regex,
    thumbnail: Regex,
    whitespace: Regex,
    leading_ws: Regex,
    trailing_ws: Regex,
    sanity: Regex,
    comment: Regex,
    tag: Regex,
}

pub struct Normalizer<'c> {
    config: &'c SelserConfig,
    options: NormalizeOptions,
    patterns: Patterns,
}

impl<'c> Normalizer<'c> {
    pub fn new(config: &'c SelserConfig, options: NormalizeOptions) -> EngineResult<Self> {
        let transparent = if options.parsoid_only {
            &config.parsoid_only_transparent_span_pattern
        } else {
            &config.transparent_span_pattern
        };
        let patterns = Patterns {
            transparent: Regex::new(transparent)?,
            generated_id: Regex::new(&config.generated_id_pattern)?,
            thumbnail: Regex::new(&config.thumbnail_pattern)?,
            whitespace: Regex::new(r"\s+")?,
            leading_ws: Regex::new(r"^\s*")?,
            trailing_ws: Regex::new(r"\s*$")?,
            sanity: Regex::new(SANITY_PATTERN)?,
            comment: Regex::new(r"(?s)<!--.*?-->")?,
            tag: Regex::new(r"<(/?)(\w+)[^>]*?(/?)>")?,
        };
        Ok(Self {
            config,
            options,
            patterns,
        })
    }

    /// Normalized copy of the subtree at `id`
    pub fn normalize_tree(&self, tree: &Tree, id: NodeId) -> Tree {
        let mut tree = tree.subtree(id);
        let root = tree.root();

        if !self.options.parsoid_only {
            remove_where(&mut tree, root, |t, n| t.is_comment(n));
            remove_where(&mut tree, root, |t, n| t.is_tag(n, "meta") || t.is_tag(n, "link"));
        }
        self.unwrap_transparent(&mut tree, root);

        let mut attributes = AttributeNormalizer {
            config: self.config,
            options: self.options,
            patterns: &self.patterns,
        };
        attributes.visit_node_mut(&mut tree, root);

        if self.options.scrub {
            self.scrub(&mut tree, root);
        }
        self.drop_empty_spans(&mut tree, root);
        merge_text(&mut tree, root);

        self.whitespace(&mut tree, root, true, true, false);
        remove_where(&mut tree, root, |t, n| t.is_text(n) && t.text(n) == Some(""));
        if !self.options.preserve_iew {
            self.newlines_around_blocks(&mut tree, root);
        }

        tree
    }

    /// Normalize the subtree at `id` and serialize it
    pub fn normalize(&self, tree: &Tree, id: NodeId) -> EngineResult<String> {
        let normalized = self.normalize_tree(tree, id);
        let html = inner_html(&normalized, normalized.root(), &HtmlOptions::default());
        self.check(&html)?;
        Ok(html)
    }

    /// Normalize a DOM string
    pub fn normalize_html(&self, input: &str) -> EngineResult<String> {
        let tree = HtmlReader::new(self.config).parse(input)?;
        self.normalize(&tree, tree.root())
    }

    /// Serialize the whole normalized subtree, including its root element
    pub fn normalize_outer(&self, tree: &Tree, id: NodeId) -> EngineResult<String> {
        let normalized = self.normalize_tree(tree, id);
        let html = to_html(&normalized, normalized.root(), &HtmlOptions::default());
        self.check(&html)?;
        Ok(html)
    }

    fn check(&self, html: &str) -> EngineResult<()> {
        let without_comments = self.patterns.comment.replace_all(html, "");
        if !self.patterns.sanity.is_match(&without_comments) {
            error!(bytes = html.len(), "normalized output is not well formed");
            return Err(EngineError::normalization_failed("malformed tag or attribute", html));
        }

        let mut open: Vec<String> = Vec::new();
        for caps in self.patterns.tag.captures_iter(&without_comments) {
            let name = caps[2].to_ascii_lowercase();
            let closing = !caps[1].is_empty();
            if is_void_element(&name) || !caps[3].is_empty() {
                continue;
            }
            if !closing {
                open.push(name);
            } else if open.pop().as_deref() != Some(name.as_str()) {
                error!(tag = %name, "unbalanced end tag in normalized output");
                return Err(EngineError::normalization_failed(
                    format!("unbalanced end tag </{}>", name),
                    html,
                ));
            }
        }
        if let Some(name) = open.pop() {
            error!(tag = %name, "unclosed element in normalized output");
            return Err(EngineError::normalization_failed(
                format!("unclosed element <{}>", name),
                html,
            ));
        }

        debug!(bytes = html.len(), "normalized");
        Ok(())
    }

    fn unwrap_transparent(&self, tree: &mut Tree, root: NodeId) {
        let grouping = &self.config.grouping_attribute;
        let targets: Vec<NodeId> = tree
            .descendants(root)
            .filter(|&id| id != root && tree.is_tag(id, "span"))
            .filter(|&id| {
                let transparent = tree
                    .attr(id, "typeof")
                    .map_or(false, |t| self.patterns.transparent.is_match(t));
                let grouped = !self.options.parsoid_only && tree.attr(id, grouping).is_some();
                transparent || grouped
            })
            .collect();
        // Innermost first
        for id in targets.into_iter().rev() {
            tree.unwrap_node(id);
        }
    }

    fn scrub(&self, tree: &mut Tree, root: NodeId) {
        let headings: Vec<NodeId> = tree
            .descendants(root)
            .filter(|&id| tree.tag_name(id).map_or(false, |t| HEADINGS.contains(&t)))
            .collect();
        for heading in headings {
            let breaks: Vec<NodeId> = tree
                .descendants(heading)
                .filter(|&id| tree.is_tag(id, "br"))
                .collect();
            for br in breaks {
                if let Some(parent) = tree.parent(br) {
                    let space = tree.create_text(" ");
                    if tree.insert_before(parent, space, br).is_ok() {
                        tree.detach(br);
                    }
                }
            }
        }

        let fonts: Vec<NodeId> = tree
            .descendants(root)
            .filter(|&id| tree.is_tag(id, "font") && tree.attrs(id).map_or(false, |a| a.is_empty()))
            .collect();
        for font in fonts.into_iter().rev() {
            tree.unwrap_node(font);
        }

        let is_quote = |tree: &Tree, id: NodeId| {
            tree.tag_name(id)
                .map_or(false, |t| self.config.mergeable_quote_tags.iter().any(|q| q == t))
        };

        // Empty quotes and headings, innermost first so emptiness cascades
        let candidates: Vec<NodeId> = tree
            .descendants(root)
            .filter(|&id| {
                id != root
                    && (is_quote(tree, id) || tree.tag_name(id).map_or(false, |t| HEADINGS.contains(&t)))
            })
            .collect();
        for id in candidates.into_iter().rev() {
            if tree.children(id).is_empty() {
                tree.detach(id);
            }
        }

        let quotes: Vec<NodeId> = tree.descendants(root).filter(|&id| is_quote(tree, id)).collect();
        for id in quotes {
            if !tree.is_attached(id) {
                continue;
            }
            while let Some(next) = tree.next_sibling(id) {
                let same = tree.tag_name(next) == tree.tag_name(id)
                    && match (tree.attrs(id), tree.attrs(next)) {
                        (Some(a), Some(b)) => a.same_set(b, &[]),
                        _ => false,
                    };
                if !same {
                    break;
                }
                tree.move_children(next, id);
                tree.detach(next);
            }
        }
    }

    fn drop_empty_spans(&self, tree: &mut Tree, root: NodeId) {
        let parsoid_only = self.options.parsoid_only;
        let spans: Vec<NodeId> = tree
            .descendants(root)
            .filter(|&id| id != root && tree.is_tag(id, "span"))
            .filter(|&id| !parsoid_only || tree.attr(id, "typeof") == Some("mw:Nowiki"))
            .collect();
        for id in spans.into_iter().rev() {
            if tree.children(id).is_empty() {
                tree.detach(id);
            }
        }
    }

    fn is_block(&self, tree: &Tree, id: NodeId) -> bool {
        tree.tag_name(id).map_or(false, |t| self.config.is_block_tag(t))
    }

    /// Collapse whitespace runs and strip them at the edges of blocks.
    /// The strip flags are threaded through `mw:` spans and reset by any other
    /// inline element.
    fn whitespace(&self, tree: &mut Tree, id: NodeId, strip_leading: bool, strip_trailing: bool, in_pre: bool) {
        let children = tree.children(id).to_vec();
        let count = children.len();

        for (i, child) in children.into_iter().enumerate() {
            let (first, last) = (i == 0, i + 1 == count);
            match tree.kind(child) {
                NodeKind::Text => {
                    let Some(text) = tree.text(child) else { continue };
                    if in_pre || (self.options.preserve_iew && text.trim().is_empty()) {
                        continue;
                    }
                    let mut collapsed = self.patterns.whitespace.replace_all(text, " ").into_owned();
                    if first && strip_leading {
                        collapsed = collapsed.trim_start().to_string();
                    }
                    if last && strip_trailing {
                        collapsed = collapsed.trim_end().to_string();
                    }
                    tree.set_text(child, collapsed);
                }
                NodeKind::Comment => {}
                NodeKind::Element => {
                    if in_pre || tree.is_tag(child, "pre") {
                        self.trim_pre(tree, child);
                        continue;
                    }
                    if self.is_block(tree, child) {
                        self.whitespace(tree, child, true, true, false);
                    } else if tree.is_tag(child, "span")
                        && tree.attr(child, "typeof").map_or(false, |t| t.starts_with("mw:"))
                    {
                        self.whitespace(tree, child, first && strip_leading, last && strip_trailing, false);
                    } else {
                        self.whitespace(tree, child, false, false, false);
                    }
                }
            }
        }
    }

    /// Inside `pre` only trailing whitespace at the very end is removed,
    /// following the last child down to its deepest text
    fn trim_pre(&self, tree: &mut Tree, id: NodeId) {
        let Some(last) = tree.last_child(id) else {
            return;
        };
        match tree.kind(last) {
            NodeKind::Text => {
                let trimmed = tree.text(last).unwrap_or("").trim_end().to_string();
                tree.set_text(last, trimmed);
            }
            NodeKind::Element => self.trim_pre(tree, last),
            NodeKind::Comment => {}
        }
    }

    fn newlines_around_blocks(&self, tree: &mut Tree, id: NodeId) {
        if tree.is_tag(id, "pre") {
            return;
        }

        let mut i = 0;
        while i < tree.children(id).len() {
            let child = tree.children(id)[i];
            if self.is_block(tree, child) {
                match tree.previous_sibling(child).filter(|&p| tree.is_text(p)) {
                    Some(prev) => {
                        let text = tree.text(prev).unwrap_or("");
                        let replaced = self.patterns.trailing_ws.replace(text, "\n").into_owned();
                        tree.set_text(prev, replaced);
                    }
                    None => {
                        let newline = tree.create_text("\n");
                        if tree.insert_before(id, newline, child).is_ok() {
                            i += 1;
                        }
                    }
                }
                match tree.next_sibling(child).filter(|&n| tree.is_text(n)) {
                    Some(next) => {
                        let text = tree.text(next).unwrap_or("");
                        let replaced = self.patterns.leading_ws.replace(text, "\n").into_owned();
                        tree.set_text(next, replaced);
                    }
                    None => {
                        let newline = tree.create_text("\n");
                        match tree.next_sibling(child) {
                            Some(next) => {
                                let _ = tree.insert_before(id, newline, next);
                            }
                            None => tree.append_child(id, newline),
                        }
                    }
                }
            }
            if tree.is_element(child) {
                self.newlines_around_blocks(tree, child);
            }
            i += 1;
        }
    }
}

/// Normalize a DOM string with the default configuration
pub fn normalize_html(input: &str, options: NormalizeOptions) -> EngineResult<String> {
    let config = SelserConfig::default();
    Normalizer::new(&config, options)?.normalize_html(input)
}

fn remove_where(tree: &mut Tree, root: NodeId, doomed: impl Fn(&Tree, NodeId) -> bool) {
    let targets: Vec<NodeId> = tree
        .descendants(root)
        .filter(|&id| id != root && doomed(tree, id))
        .collect();
    for id in targets {
        tree.detach(id);
    }
}

/// Merge adjacent text nodes and drop empty ones
fn merge_text(tree: &mut Tree, root: NodeId) {
    let elements: Vec<NodeId> = tree.descendants(root).filter(|&id| tree.is_element(id)).collect();
    for parent in elements {
        let children = tree.children(parent).to_vec();
        let mut previous_text: Option<NodeId> = None;
        for child in children {
            match tree.text(child).map(str::to_string) {
                Some(text) if text.is_empty() && tree.is_text(child) => tree.detach(child),
                Some(text) if tree.is_text(child) => match previous_text {
                    Some(prev) => {
                        let merged = format!("{}{}", tree.text(prev).unwrap_or(""), text);
                        tree.set_text(prev, merged);
                        tree.detach(child);
                    }
                    None => previous_text = Some(child),
                },
                _ => previous_text = None,
            }
        }
    }
}

/// Strips bookkeeping attributes and canonicalizes URLs
struct AttributeNormalizer<'a> {
    config: &'a SelserConfig,
    options: NormalizeOptions,
    patterns: &'a Patterns,
}

impl VisitorMut for AttributeNormalizer<'_> {
    fn visit_element_mut(&mut self, tree: &mut Tree, id: NodeId) {
        let is_heading = tree.tag_name(id).map_or(false, |t| HEADINGS.contains(&t));
        let config = self.config;
        let options = self.options;
        let patterns = self.patterns;

        if let Some(attrs) = tree.attrs_mut(id) {
            attrs.retain(|name, value| {
                if config.stripped_attributes.iter().any(|a| a == name) {
                    return false;
                }
                if options.parsoid_only {
                    return !(name == "rel" && value == "nofollow");
                }
                if config.stripped_attributes_non_parsoid.iter().any(|a| a == name) {
                    return false;
                }
                !(name == "id" && (is_heading || patterns.generated_id.is_match(value)))
            });

            if let Some(href) = attrs.get("href") {
                let mut href = href.to_string();
                if !options.parsoid_only {
                    while let Some(rest) = href.strip_prefix("./").or_else(|| href.strip_prefix("../")) {
                        href = rest.to_string();
                    }
                }
                let decoded = match urlencoding::decode(&href) {
                    Ok(decoded) => decoded.into_owned(),
                    Err(_) => href.clone(),
                };
                attrs.set("href", decoded);
            }

            if let Some(src) = attrs.get("src") {
                let original = patterns.thumbnail.replace(src, "$1$2").into_owned();
                attrs.set("src", original);
            }
        }

        walk_children_mut(self, tree, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(input: &str) -> String {
        normalize_html(input, NormalizeOptions::default()).unwrap()
    }

    #[test]
    fn test_transparent_spans_and_text_merge() {
        assert_eq!(
            normalize("<p>a<span typeof=\"mw:Entity\">&amp;</span>b</p>"),
            "\n<p>a&amp;b</p>\n"
        );
    }

    #[test]
    fn test_whitespace_collapse_and_block_edges() {
        assert_eq!(
            normalize("<div>  a \n\n b  <b> c </b>  </div>"),
            "\n<div>a b <b> c </b></div>\n"
        );
    }

    #[test]
    fn test_newline_around_blocks() {
        assert_eq!(
            normalize("x<p>a</p><p>b</p>y"),
            "x\n<p>a</p>\n<p>b</p>\ny"
        );
    }

    #[test]
    fn test_comments_and_bookkeeping_attributes() {
        let input = "<p id=\"mwAB\" class=\"c\" data-parsoid='{\"dsr\":[0,1,0,0]}' about=\"#mwt1\" title=\"t\">a<!-- x --></p>";
        assert_eq!(normalize(input), "\n<p title=\"t\">a</p>\n");
    }

    #[test]
    fn test_parsoid_only_keeps_structure() {
        let input = "<p class=\"c\" rel=\"nofollow\">a<!--x--></p>";
        let output = normalize_html(
            input,
            NormalizeOptions {
                parsoid_only: true,
                ..NormalizeOptions::default()
            },
        )
        .unwrap();
        assert_eq!(output, "\n<p class=\"c\">a<!--x--></p>\n");
    }

    #[test]
    fn test_hrefs_and_thumbnails() {
        let input = "<a href=\"./Main%20Page\">m</a><img src=\"//u.org/images/thumb/a/ab/Cat.png/120px-Cat.png\">";
        assert_eq!(
            normalize(input),
            "<a href=\"Main Page\">m</a><img src=\"//u.org/images/a/ab/Cat.png\">"
        );
    }

    #[test]
    fn test_pre_keeps_whitespace() {
        assert_eq!(normalize("<pre>  a\n  b\n\n</pre>"), "<pre>  a\n  b</pre>");
        assert_eq!(normalize("<pre>a  </pre>"), "<pre>a</pre>");
        assert_eq!(normalize("<pre>a <b>b \t\n</b></pre>"), "<pre>a <b>b</b></pre>");
    }

    #[test]
    fn test_scrub() {
        let options = NormalizeOptions {
            scrub: true,
            ..NormalizeOptions::default()
        };
        let output = normalize_html("<p><b>a</b><b>b</b><i></i><font>c</font></p><h2>x<br>y</h2><h3></h3>", options).unwrap();
        assert_eq!(output, "\n<p><b>ab</b>c</p>\n<h2>x y</h2>\n");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "  <p> a <span typeof=\"mw:Transclusion\" about=\"#mwt1\">b</span>  </p> <ul><li>x</li>\n</ul>",
            "<div>a<p>b</p>c</div>",
            "<pre>x  y\n</pre>\n\n<p>z</p>",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_malformed_output_is_an_error() {
        let config = SelserConfig::default();
        let normalizer = Normalizer::new(&config, NormalizeOptions::default()).unwrap();
        let mut tree = Tree::new("body");
        let root = tree.root();
        let p = tree.create_element("p");
        tree.append_child(root, p);
        tree.set_attr(p, "a/b", "x").unwrap();

        let err = normalizer.normalize(&tree, root).unwrap_err();
        assert!(matches!(err, EngineError::NormalizationFailed { .. }));
    }
}
