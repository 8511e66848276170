//! DOM string reader and writer.
//!
//! The writer produces canonical HTML: double-quoted attributes, escaped
//! text, no end tags for void elements. With provenance storage enabled every
//! element's provenance record is written as JSON into the reserved
//! provenance attribute, and the reader loads it back into the tree.

use crate::config::{is_void_element, SelserConfig};
use crate::entities::{decode_entity, escape_attr, escape_text};
use crate::error::DomResult;
use crate::lexer::{HtmlToken, StartTag};
use crate::provenance::Provenance;
use crate::tree::{Attributes, NodeId, Tree};
use crate::visitor::{walk_children, Visitor};
use logos::Logos;
use tracing::{trace, warn};

#[derive(Debug, Clone)]
pub struct HtmlOptions {
    pub store_provenance: bool,
    pub provenance_attribute: String,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            store_provenance: false,
            provenance_attribute: SelserConfig::default().provenance_attribute,
        }
    }
}

impl HtmlOptions {
    pub fn with_provenance(config: &SelserConfig) -> Self {
        Self {
            store_provenance: true,
            provenance_attribute: config.provenance_attribute.clone(),
        }
    }
}

/// Serialize `id` and its subtree
pub fn to_html(tree: &Tree, id: NodeId, options: &HtmlOptions) -> String {
    let mut writer = HtmlWriter {
        options,
        output: String::new(),
    };
    writer.visit_node(tree, id);
    writer.output
}

/// Serialize the children of `id` only
pub fn inner_html(tree: &Tree, id: NodeId, options: &HtmlOptions) -> String {
    let mut writer = HtmlWriter {
        options,
        output: String::new(),
    };
    walk_children(&mut writer, tree, id);
    writer.output
}

struct HtmlWriter<'a> {
    options: &'a HtmlOptions,
    output: String,
}

impl HtmlWriter<'_> {
    fn write_attr(&mut self, name: &str, value: &str) {
        self.output.push(' ');
        self.output.push_str(name);
        self.output.push_str("=\"");
        self.output.push_str(&escape_attr(value));
        self.output.push('"');
    }
}

impl Visitor for HtmlWriter<'_> {
    fn visit_element(&mut self, tree: &Tree, id: NodeId) {
        let Some(name) = tree.tag_name(id) else {
            return;
        };
        let provenance_attr = self.options.provenance_attribute.as_str();
        let stored = if self.options.store_provenance {
            tree.provenance(id).and_then(|p| p.to_json().ok())
        } else {
            None
        };

        self.output.push('<');
        self.output.push_str(name);
        if let Some(attrs) = tree.attrs(id) {
            for (key, value) in attrs.iter() {
                if stored.is_some() && key == provenance_attr {
                    continue;
                }
                self.write_attr(key, value);
            }
        }
        if let Some(json) = &stored {
            self.write_attr(provenance_attr, json);
        }
        self.output.push('>');

        if is_void_element(name) {
            return;
        }
        walk_children(self, tree, id);
        self.output.push_str("</");
        self.output.push_str(name);
        self.output.push('>');
    }

    fn visit_text(&mut self, _tree: &Tree, _id: NodeId, text: &str) {
        self.output.push_str(&escape_text(text));
    }

    fn visit_comment(&mut self, _tree: &Tree, _id: NodeId, text: &str) {
        self.output.push_str("<!--");
        self.output.push_str(text);
        self.output.push_str("-->");
    }
}

/// Parse a DOM string with the default provenance attribute
pub fn parse_html(input: &str) -> DomResult<Tree> {
    HtmlReader::new(&SelserConfig::default()).parse(input)
}

pub struct HtmlReader {
    provenance_attribute: String,
}

impl HtmlReader {
    pub fn new(config: &SelserConfig) -> Self {
        Self {
            provenance_attribute: config.provenance_attribute.clone(),
        }
    }

    /// Build a tree from a DOM string.
    ///
    /// A document consisting of a single `<body>` element becomes a tree
    /// rooted at that element; anything else is wrapped in a fresh `body`.
    /// Unclosed elements are closed at the end of input and stray end tags
    /// are dropped.
    pub fn parse(&self, input: &str) -> DomResult<Tree> {
        let mut tree = Tree::new("body");
        let container = tree.root();
        let mut stack = vec![container];
        let mut lex = HtmlToken::lexer(input);

        while let Some(token) = lex.next() {
            let parent = *stack.last().unwrap_or(&container);
            match token {
                Ok(HtmlToken::StartTag(tag)) => {
                    let is_leaf = tag.self_closing || is_void_element(&tag.name);
                    let id = self.create_element(&mut tree, tag);
                    tree.append_child(parent, id);
                    if !is_leaf {
                        stack.push(id);
                    }
                }
                Ok(HtmlToken::EndTag(name)) => {
                    let open = stack
                        .iter()
                        .rposition(|&n| n != container && tree.is_tag(n, &name));
                    match open {
                        Some(pos) => stack.truncate(pos),
                        None => trace!(tag = %name, "dropping stray end tag"),
                    }
                }
                Ok(HtmlToken::Comment(text)) => {
                    let id = tree.create_comment(text);
                    tree.append_child(parent, id);
                }
                Ok(HtmlToken::CharRef(reference)) => match decode_entity(reference) {
                    Some(c) => append_text(&mut tree, parent, c.encode_utf8(&mut [0; 4])),
                    None => append_text(&mut tree, parent, reference),
                },
                Ok(HtmlToken::Text(text)) | Ok(HtmlToken::Stray(text)) => {
                    append_text(&mut tree, parent, text);
                }
                Err(()) => append_text(&mut tree, parent, lex.slice()),
            }
        }

        let significant: Vec<NodeId> = tree
            .children(container)
            .iter()
            .copied()
            .filter(|&c| !tree.text(c).map_or(false, |t| t.trim().is_empty()))
            .collect();
        if let [only] = significant.as_slice() {
            if tree.is_tag(*only, "body") {
                tree.set_root(*only)?;
            }
        }
        Ok(tree)
    }

    fn create_element(&self, tree: &mut Tree, tag: StartTag) -> NodeId {
        let mut provenance = None;
        let mut attrs = Attributes::new();
        for (key, value) in tag.attrs {
            if key == self.provenance_attribute {
                match Provenance::from_json(&value) {
                    Ok(record) => provenance = Some(record),
                    Err(e) => warn!(error = %e, "ignoring unreadable provenance record"),
                }
            } else {
                attrs.set(key, value);
            }
        }
        let id = tree.create_element_with(&tag.name, attrs);
        if let Some(record) = provenance {
            tree.set_provenance(id, record);
        }
        id
    }
}

fn append_text(tree: &mut Tree, parent: NodeId, text: &str) {
    if let Some(last) = tree.last_child(parent) {
        if tree.is_text(last) {
            let merged = format!("{}{}", tree.text(last).unwrap_or_default(), text);
            tree.set_text(last, merged);
            return;
        }
    }
    let id = tree.create_text(text);
    tree.append_child(parent, id);
}
