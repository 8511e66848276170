//! Full serializer: regenerates markup for nodes that cannot be copied from
//! the source.
//!
//! Every element is written in the shortest surface form that reparses to an
//! equivalent node, falling back to literal HTML tags when its attributes or
//! content do not fit a bracket form. Text is escaped so that it always
//! reparses as text.

use crate::parser::{is_page_name, is_url_like, MEDIA_PATH, MEDIA_PREFIX, WIKILINK_REL};
use crate::template::TemplateCall;
use selser_dom::config::is_void_element;
use selser_dom::entities::{entity_name, escape_attr};
use selser_dom::{NodeData, NodeId, NodeSerializer, SelserConfig, Stx, Tree};

/// Escape text so that none of it is read back as markup
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '[' => out.push_str("&#91;"),
            ']' => out.push_str("&#93;"),
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            '|' => out.push_str("&#124;"),
            _ => out.push(c),
        }
    }
    out
}

/// No character the lexer would split on
fn is_plain(s: &str) -> bool {
    !s.contains(|c| matches!(c, '<' | '&' | '[' | ']' | '{' | '}' | '|'))
}

#[derive(Debug, Clone, PartialEq)]
enum Form<'t> {
    Html,
    Template(TemplateCall),
    Media { name: &'t str, caption: Option<NodeId> },
    Entity(char),
    Link { target: String, wiki: bool, piped: bool },
}

#[derive(Debug, Clone, Default)]
pub struct MarkupSerializer {
    config: SelserConfig,
}

impl MarkupSerializer {
    pub fn new(config: SelserConfig) -> Self {
        Self { config }
    }

    /// Markup for the whole document below the root
    pub fn serialize_document(&self, tree: &Tree) -> String {
        let mut out = String::new();
        self.write_children(tree, tree.root(), false, &mut out);
        out
    }

    fn write_children(&self, tree: &Tree, id: NodeId, in_label: bool, out: &mut String) {
        for &child in tree.children(id) {
            self.write(tree, child, in_label, out);
        }
    }

    fn write(&self, tree: &Tree, id: NodeId, in_label: bool, out: &mut String) {
        match &tree.node(id).data {
            NodeData::Text(text) => out.push_str(&escape_markup(text)),
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::Element { .. } => self.write_element(tree, id, in_label, out),
        }
    }

    fn write_element(&self, tree: &Tree, id: NodeId, in_label: bool, out: &mut String) {
        match self.form(tree, id, in_label) {
            Form::Template(call) => out.push_str(&call.to_markup()),
            Form::Media { name, caption } => {
                out.push_str("[[");
                out.push_str(MEDIA_PREFIX);
                out.push_str(name);
                if let Some(caption) = caption {
                    out.push('|');
                    self.write_children(tree, caption, true, out);
                }
                out.push_str("]]");
            }
            Form::Entity(c) => out.push_str(&entity_markup(c)),
            Form::Link { target, wiki, piped } => {
                let (open, close) = if wiki { ("[[", "]]") } else { ("[", "]") };
                out.push_str(open);
                out.push_str(&target);
                if piped {
                    out.push('|');
                    self.write_children(tree, id, true, out);
                }
                out.push_str(close);
            }
            Form::Html => {
                out.push_str(&self.html_open_tag(tree, id));
                if let Some(close) = self.html_close_tag(tree, id) {
                    self.write_children(tree, id, in_label, out);
                    out.push_str(&close);
                }
            }
        }
    }

    fn html_open_tag(&self, tree: &Tree, id: NodeId) -> String {
        let mut out = String::from("<");
        out.push_str(tree.tag_name(id).unwrap_or("span"));
        if let Some(attrs) = tree.attrs(id) {
            for (key, value) in attrs.iter() {
                if key == self.config.provenance_attribute {
                    continue;
                }
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }
        }
        out.push('>');
        out
    }

    /// `None` for void elements
    fn html_close_tag(&self, tree: &Tree, id: NodeId) -> Option<String> {
        let name = tree.tag_name(id)?;
        if is_void_element(name) {
            None
        } else {
            Some(format!("</{}>", name))
        }
    }

    fn form<'t>(&self, tree: &'t Tree, id: NodeId, in_label: bool) -> Form<'t> {
        let (Some(name), Some(attrs)) = (tree.tag_name(id), tree.attrs(id)) else {
            return Form::Html;
        };
        let typeof_attr = attrs.get("typeof").unwrap_or("");

        // Bracket and brace forms cannot nest inside a label
        if !in_label {
            if self.config.is_encapsulation_typeof(typeof_attr) {
                if let Some(call) = self.template_call(tree, id) {
                    return Form::Template(call);
                }
            }
            if name == "figure" && self.config.is_media_typeof(typeof_attr) {
                if let Some(form) = media_form(tree, id) {
                    return form;
                }
            }
            if name == "a" {
                if let Some(form) = link_form(tree, id) {
                    return form;
                }
            }
        }

        if name == "span" && attrs.len() == 1 && self.config.is_entity_typeof(typeof_attr) {
            if let [only] = tree.children(id) {
                let mut chars = tree.text(*only).unwrap_or("").chars();
                if let (Some(c), None) = (chars.next(), chars.next()) {
                    return Form::Entity(c);
                }
            }
        }

        Form::Html
    }

    fn template_call(&self, tree: &Tree, id: NodeId) -> Option<TemplateCall> {
        let call = TemplateCall::from_json(tree.attr(id, &self.config.template_data_attribute)?)?;
        let fits = |s: &str| !s.contains('|') && !s.contains("{{") && !s.contains("}}");
        let valid = !call.target.trim().is_empty()
            && fits(&call.target)
            && call.params.iter().all(|p| fits(p));
        valid.then_some(call)
    }
}

fn entity_markup(c: char) -> String {
    match entity_name(c) {
        Some(name) => format!("&{};", name),
        None => format!("&#{};", c as u32),
    }
}

fn media_form(tree: &Tree, id: NodeId) -> Option<Form<'_>> {
    if tree.attrs(id)?.len() != 1 || tree.attr(id, "typeof") != Some("mw:Image") {
        return None;
    }
    let (img, caption) = match tree.children(id) {
        [img] => (*img, None),
        [img, caption] => (*img, Some(*caption)),
        _ => return None,
    };
    if !tree.is_tag(img, "img") || tree.attrs(img)?.len() != 1 {
        return None;
    }
    let name = tree.attr(img, "src")?.strip_prefix(MEDIA_PATH)?;
    if !is_page_name(name) || !is_plain(name) || name != name.trim() {
        return None;
    }
    if let Some(caption) = caption {
        if !tree.is_tag(caption, "figcaption") || !tree.attrs(caption)?.is_empty() {
            return None;
        }
    }
    Some(Form::Media { name, caption })
}

fn link_form(tree: &Tree, id: NodeId) -> Option<Form<'static>> {
    let stx = tree.provenance(id).and_then(|p| p.stx);
    if stx == Some(Stx::Html) {
        return None;
    }
    let attrs = tree.attrs(id)?;
    let href = attrs.get("href")?;

    let (target, wiki) = if attrs.get("rel") == Some(WIKILINK_REL) && attrs.len() == 2 {
        let encoded = href.strip_prefix("./")?;
        let target = urlencoding::decode(encoded).ok()?.into_owned();
        let canonical = is_page_name(&target)
            && is_plain(&target)
            && !target.starts_with(MEDIA_PREFIX)
            && urlencoding::encode(&target) == encoded;
        if !canonical {
            return None;
        }
        (target, true)
    } else if attrs.len() == 1 && is_url_like(href) && is_plain(href) {
        (href.to_string(), false)
    } else {
        return None;
    };

    let label_is_target = match tree.children(id) {
        [only] => tree.text(*only) == Some(target.as_str()),
        _ => false,
    };
    let piped = stx == Some(Stx::Piped) || !label_is_target;
    Some(Form::Link { target, wiki, piped })
}

impl NodeSerializer for MarkupSerializer {
    fn serialize_node(&self, tree: &Tree, id: NodeId) -> String {
        let mut out = String::new();
        self.write(tree, id, false, &mut out);
        out
    }

    /// A template's sibling nodes are all part of its expansion, so the call
    /// markup is emitted once for the whole group
    fn serialize_unit(&self, tree: &Tree, ids: &[NodeId]) -> String {
        if let Some(&first) = ids.first() {
            if let Form::Template(call) = self.form(tree, first, false) {
                return call.to_markup();
            }
        }
        ids.iter().map(|&id| self.serialize_node(tree, id)).collect()
    }

    fn open_tag(&self, tree: &Tree, id: NodeId) -> Option<String> {
        match self.form(tree, id, false) {
            Form::Html => Some(self.html_open_tag(tree, id)),
            Form::Link { target, wiki: true, piped: true } => Some(format!("[[{}|", target)),
            Form::Link { target, wiki: false, piped: true } => Some(format!("[{}|", target)),
            _ => None,
        }
    }

    fn close_tag(&self, tree: &Tree, id: NodeId) -> Option<String> {
        match self.form(tree, id, false) {
            Form::Html => Some(self.html_close_tag(tree, id).unwrap_or_default()),
            Form::Link { wiki: true, piped: true, .. } => Some("]]".to_string()),
            Form::Link { wiki: false, piped: true, .. } => Some("]".to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use selser_dom::Attributes;

    fn regenerate(source: &str) -> String {
        let tree = parse(source).unwrap();
        MarkupSerializer::default().serialize_document(&tree)
    }

    #[test]
    fn test_canonical_markup_regenerates_exactly() {
        let sources = [
            "<p class=\"x\">a [b] [c|d <i>e</i>] [[E F]] [[G|h]]</p>",
            "{{echo|1|two}} &amp; &#960; <!-- c --> <br>",
            "[[File:Cat.png|A <b>cat</b>]] [[File:Dog.png]]",
            "<ul><li>one</li><li>two</li></ul>",
        ];
        for source in sources {
            assert_eq!(regenerate(source), source);
        }
    }

    #[test]
    fn test_text_is_escaped() {
        let mut tree = Tree::new("body");
        let text = tree.create_text("a [b] {c} | <d> & e");
        let root = tree.root();
        tree.append_child(root, text);
        let out = MarkupSerializer::default().serialize_document(&tree);
        assert_eq!(out, "a &#91;b&#93; &#123;c&#125; &#124; &lt;d&gt; &amp; e");

        let reparsed = parse(&out).unwrap();
        assert_eq!(reparsed.text_content(reparsed.root()), "a [b] {c} | <d> & e");
    }

    #[test]
    fn test_links_with_extra_attributes_use_html() {
        let mut tree = parse("[x]").unwrap();
        let a = tree.first_child(tree.root()).unwrap();
        tree.set_attr(a, "data-foobar", "1").unwrap();
        assert_eq!(
            MarkupSerializer::default().serialize_document(&tree),
            "<a href=\"x\" data-foobar=\"1\">x</a>"
        );
    }

    #[test]
    fn test_simple_link_with_changed_label_becomes_piped() {
        let mut tree = parse("[x]").unwrap();
        let a = tree.first_child(tree.root()).unwrap();
        let label = tree.first_child(a).unwrap();
        tree.set_text(label, "y");
        let serializer = MarkupSerializer::default();
        assert_eq!(serializer.serialize_document(&tree), "[x|y]");
        assert_eq!(serializer.open_tag(&tree, a).as_deref(), Some("[x|"));
        assert_eq!(serializer.close_tag(&tree, a).as_deref(), Some("]"));
    }

    #[test]
    fn test_open_and_close_tags() {
        let tree = parse("<p>a</p><hr>[[W|x]]{{t}}[s]").unwrap();
        let children = tree.children(tree.root()).to_vec();
        let serializer = MarkupSerializer::default();

        assert_eq!(serializer.open_tag(&tree, children[0]).as_deref(), Some("<p>"));
        assert_eq!(serializer.close_tag(&tree, children[0]).as_deref(), Some("</p>"));
        assert_eq!(serializer.close_tag(&tree, children[1]).as_deref(), Some(""));
        assert_eq!(serializer.open_tag(&tree, children[2]).as_deref(), Some("[[W|"));
        assert_eq!(serializer.close_tag(&tree, children[2]).as_deref(), Some("]]"));
        assert_eq!(serializer.open_tag(&tree, children[3]), None);
        assert_eq!(serializer.open_tag(&tree, children[4]), None);
    }

    #[test]
    fn test_links_inside_labels_use_html() {
        let mut tree = Tree::new("body");
        let root = tree.root();
        let outer = tree.create_element_with("a", [("href", "x")].into_iter().collect::<Attributes>());
        let inner = tree.create_element_with("a", [("href", "y")].into_iter().collect::<Attributes>());
        let text = tree.create_text("y");
        tree.append_child(inner, text);
        tree.append_child(outer, inner);
        tree.append_child(root, outer);

        assert_eq!(
            MarkupSerializer::default().serialize_document(&tree),
            "[x|<a href=\"y\">y</a>]"
        );
    }

    #[test]
    fn test_template_unit_emits_call_once() {
        let mut tree = parse("{{t|a}}").unwrap();
        let root = tree.root();
        let wrapper = tree.first_child(root).unwrap();
        let about = tree.attr(wrapper, "about").unwrap().to_string();
        let sibling = tree.create_element_with("span", [("about", about)].into_iter().collect::<Attributes>());
        tree.append_child(root, sibling);

        let out = MarkupSerializer::default().serialize_unit(&tree, &[wrapper, sibling]);
        assert_eq!(out, "{{t|a}}");
    }
}
