//! Provenance-producing parser for the markup language
//!
//! Grammar, informally:
//!
//! ```text
//! content   := (element | link | wikilink | media | template | comment | entity | text)*
//! element   := '<' name attrs '>' content ('</' name '>')?     -- unclosed: auto-closed
//! link      := '[' target ']' | '[' target '|' content ']'
//! wikilink  := '[[' page ']]' | '[[' page '|' content ']]'
//! media     := '[[File:' name ( '|' content )? ']]'
//! template  := '{{' name ('|' param)* '}}'
//! ```
//!
//! Anything that does not fit one of the bracketed forms is literal text, so
//! every source string parses. Each node records the byte range it came from;
//! the children of an element tile its inner range exactly.

use crate::error::{ParseError, ParseResult};
use crate::id_generator::IDGenerator;
use crate::lexer::{lex, SpannedToken, Token};
use crate::template::TemplateCall;
use selser_dom::config::is_void_element;
use selser_dom::entities::decode_entity;
use selser_dom::{Attributes, Dsr, NodeId, Provenance, SelserConfig, SourceParser, Stx, Tree};
use std::ops::Range;
use tracing::{debug, trace};

pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Page prefix that turns a wikilink into a media wrapper
pub const MEDIA_PREFIX: &str = "File:";

/// Path under which media files are served
pub const MEDIA_PATH: &str = "/images/";

pub const WIKILINK_REL: &str = "mw:WikiLink";

#[derive(Debug, Clone)]
pub struct MarkupParser {
    config: SelserConfig,
    max_depth: usize,
}

impl Default for MarkupParser {
    fn default() -> Self {
        Self::new(SelserConfig::default())
    }
}

impl MarkupParser {
    pub fn new(config: SelserConfig) -> Self {
        Self {
            config,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn parse(&self, source: &str) -> ParseResult<Tree> {
        let mut parser = Parser {
            source,
            tokens: lex(source),
            tree: Tree::new("body"),
            ids: IDGenerator::default(),
            config: &self.config,
            max_depth: self.max_depth,
        };

        let root = parser.tree.root();
        parser.tree.set_provenance(
            root,
            Provenance::with_dsr(Dsr::with_widths(0, source.len(), 0, 0)),
        );
        let end = parser.tokens.len();
        parser.parse_content(root, 0, end, &mut Vec::new(), 0)?;

        debug!(bytes = source.len(), nodes = parser.tree.capacity(), "parsed markup");
        Ok(parser.tree)
    }
}

impl SourceParser for MarkupParser {
    type Error = ParseError;

    fn parse_source(&self, source: &str) -> Result<Tree, ParseError> {
        self.parse(source)
    }
}

/// Parse with the default configuration
pub fn parse(source: &str) -> ParseResult<Tree> {
    MarkupParser::default().parse(source)
}

/// Why a content run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    /// Reached the end of the token range
    End,
    /// At the end tag of the element being parsed
    OwnEndTag,
    /// At the end tag of an enclosing element
    AncestorEndTag,
}

enum Step<'s> {
    Comment(&'s str),
    Entity(char),
    Element,
    EndTag(String),
    Template,
    Bracket,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BracketKind {
    External,
    Wiki,
    Media,
}

#[derive(Debug, Clone)]
struct BracketPlan<'s> {
    kind: BracketKind,
    target: &'s str,
    /// Token index of the target
    target_at: usize,
    /// Token range of the label, after the pipe
    label: Option<Range<usize>>,
    /// Index of the last closing bracket
    last: usize,
}

struct Parser<'s, 'c> {
    source: &'s str,
    tokens: Vec<SpannedToken<'s>>,
    tree: Tree,
    ids: IDGenerator,
    config: &'c SelserConfig,
    max_depth: usize,
}

impl<'s> Parser<'s, '_> {
    /// Byte offset where token `i` starts, or the end of the source
    fn byte_at(&self, i: usize) -> usize {
        self.tokens
            .get(i)
            .map_or(self.source.len(), |t| t.span.start)
    }

    fn token(&self, i: usize, end: usize) -> Option<&Token<'s>> {
        if i < end {
            self.tokens.get(i).map(|t| &t.token)
        } else {
            None
        }
    }

    fn adjacent(&self, a: usize, b: usize) -> bool {
        self.tokens[a].span.end == self.tokens[b].span.start
    }

    fn flush_text(&mut self, parent: NodeId, run: &mut Option<Range<usize>>) {
        if let Some(range) = run.take() {
            let id = self.tree.create_text(&self.source[range.clone()]);
            self.tree
                .set_provenance(id, Provenance::with_dsr(Dsr::new(range.start, range.end)));
            self.tree.append_child(parent, id);
        }
    }

    /// Parse tokens `[i, end)` into children of `parent`.
    /// `open` holds the names of the elements open in the current scope.
    fn parse_content(
        &mut self,
        parent: NodeId,
        mut i: usize,
        end: usize,
        open: &mut Vec<String>,
        depth: usize,
    ) -> ParseResult<(usize, Stop)> {
        let mut run: Option<Range<usize>> = None;

        while i < end {
            let span = self.tokens[i].span.clone();
            let step = match &self.tokens[i].token {
                Token::Comment(text) => Step::Comment(*text),
                Token::CharRef(reference) => decode_entity(reference).map_or(Step::Text, Step::Entity),
                Token::StartTag(_) => Step::Element,
                Token::EndTag(name) => Step::EndTag(name.clone()),
                Token::OpenTemplate => Step::Template,
                Token::OpenBracket => Step::Bracket,
                _ => Step::Text,
            };

            match step {
                Step::Comment(text) => {
                    self.flush_text(parent, &mut run);
                    let id = self.tree.create_comment(text);
                    self.tree
                        .set_provenance(id, Provenance::with_dsr(Dsr::new(span.start, span.end)));
                    self.tree.append_child(parent, id);
                    i += 1;
                }
                Step::Entity(c) => {
                    self.flush_text(parent, &mut run);
                    self.entity(parent, c, span);
                    i += 1;
                }
                Step::Element => {
                    self.flush_text(parent, &mut run);
                    i = self.parse_element(parent, i, end, open, depth)?;
                }
                Step::EndTag(name) => {
                    if open.last() == Some(&name) {
                        self.flush_text(parent, &mut run);
                        return Ok((i, Stop::OwnEndTag));
                    }
                    if open.contains(&name) {
                        self.flush_text(parent, &mut run);
                        return Ok((i, Stop::AncestorEndTag));
                    }
                    trace!(tag = %name, at = span.start, "stray end tag kept as text");
                    extend(&mut run, span);
                    i += 1;
                }
                Step::Template => match self.scan_template(i, end) {
                    Some(close) => {
                        self.flush_text(parent, &mut run);
                        self.template(parent, i, close)?;
                        i = close + 1;
                    }
                    None => {
                        extend(&mut run, span);
                        i += 1;
                    }
                },
                Step::Bracket => match self.scan_brackets(i, end) {
                    Some(plan) => {
                        self.flush_text(parent, &mut run);
                        i = self.bracketed(parent, i, plan, depth)?;
                    }
                    None => {
                        extend(&mut run, span);
                        i += 1;
                    }
                },
                Step::Text => {
                    extend(&mut run, span);
                    i += 1;
                }
            }
        }

        self.flush_text(parent, &mut run);
        Ok((i, Stop::End))
    }

    fn parse_element(
        &mut self,
        parent: NodeId,
        i: usize,
        end: usize,
        open: &mut Vec<String>,
        depth: usize,
    ) -> ParseResult<usize> {
        let span = self.tokens[i].span.clone();
        let tag = match &self.tokens[i].token {
            Token::StartTag(tag) => tag.clone(),
            _ => return Ok(i + 1),
        };
        if depth >= self.max_depth {
            return Err(ParseError::nesting_too_deep(span, self.max_depth));
        }

        let attrs: Attributes = tag.attrs.into_iter().collect();
        let id = self.tree.create_element_with(&tag.name, attrs);
        self.tree.append_child(parent, id);
        let open_width = span.len();

        if tag.self_closing || is_void_element(&tag.name) {
            let dsr = Dsr::with_widths(span.start, span.end, open_width, 0);
            self.tree
                .set_provenance(id, Provenance::with_dsr(dsr).stx(Stx::Html));
            return Ok(i + 1);
        }

        open.push(tag.name.clone());
        let (stop, how) = self.parse_content(id, i + 1, end, open, depth + 1)?;
        open.pop();

        let mut provenance = if how == Stop::OwnEndTag {
            let close = self.tokens[stop].span.clone();
            Provenance::with_dsr(Dsr::with_widths(span.start, close.end, open_width, close.len()))
        } else {
            let at = self.byte_at(stop);
            let mut dp = Provenance::with_dsr(Dsr::with_widths(span.start, at, open_width, 0));
            dp.auto_inserted_end = true;
            dp
        };
        provenance.stx = Some(Stx::Html);
        self.tree.set_provenance(id, provenance);

        Ok(if how == Stop::OwnEndTag { stop + 1 } else { stop })
    }

    fn entity(&mut self, parent: NodeId, c: char, span: Range<usize>) {
        let attrs: Attributes = [("typeof", "mw:Entity")].into_iter().collect();
        let id = self.tree.create_element_with("span", attrs);
        let text = self.tree.create_text(c.to_string());
        self.tree.append_child(id, text);
        self.tree
            .set_provenance(id, Provenance::with_dsr(Dsr::new(span.start, span.end)));
        self.tree.append_child(parent, id);
    }

    // Templates

    fn scan_template(&self, i: usize, end: usize) -> Option<usize> {
        for j in i + 1..end {
            match self.tokens[j].token {
                Token::CloseTemplate => return Some(j),
                Token::OpenTemplate => return None,
                _ => {}
            }
        }
        None
    }

    fn template(&mut self, parent: NodeId, i: usize, close: usize) -> ParseResult<()> {
        let start = self.tokens[i].span.start;
        let end = self.tokens[close].span.end;
        let inner = &self.source[self.tokens[i].span.end..self.tokens[close].span.start];
        let call = TemplateCall::parse(inner)
            .ok_or_else(|| ParseError::empty_template_name(start..end))?;

        let mut attrs = Attributes::new();
        attrs.set("typeof", "mw:Transclusion");
        attrs.set(self.config.grouping_attribute.as_str(), self.ids.new_id());
        attrs.set(self.config.template_data_attribute.as_str(), call.to_json());

        let id = self.tree.create_element_with("span", attrs);
        // Expansion is out of reach here; the target name stands in for it
        let placeholder = self.tree.create_text(call.target.clone());
        self.tree.append_child(id, placeholder);
        self.tree
            .set_provenance(id, Provenance::with_dsr(Dsr::new(start, end)));
        self.tree.append_child(parent, id);
        Ok(())
    }

    // Links and media

    /// First closing bracket of a label, provided nothing bracket-like opens
    /// before it
    fn find_label_end(&self, from: usize, end: usize) -> Option<usize> {
        for j in from..end {
            match self.tokens[j].token {
                Token::CloseBracket => return Some(j),
                Token::OpenBracket | Token::OpenTemplate | Token::CloseTemplate => return None,
                _ => {}
            }
        }
        None
    }

    fn scan_brackets(&self, i: usize, end: usize) -> Option<BracketPlan<'s>> {
        let double = matches!(self.token(i + 1, end), Some(Token::OpenBracket)) && self.adjacent(i, i + 1);
        if double {
            if let Some(plan) = self.scan_double(i, end) {
                return Some(plan);
            }
        }
        self.scan_single(i, end)
    }

    fn scan_double(&self, i: usize, end: usize) -> Option<BracketPlan<'s>> {
        let target = match self.token(i + 2, end) {
            Some(Token::Text(t)) if is_page_name(t) => *t,
            _ => return None,
        };
        let kind = match target.strip_prefix(MEDIA_PREFIX) {
            Some(name) if !name.trim().is_empty() => BracketKind::Media,
            Some(_) => return None,
            None => BracketKind::Wiki,
        };

        let closing_pair = |k: usize| {
            matches!(self.token(k, end), Some(Token::CloseBracket))
                && matches!(self.token(k + 1, end), Some(Token::CloseBracket))
                && self.adjacent(k, k + 1)
        };

        match self.token(i + 3, end) {
            Some(Token::CloseBracket) if closing_pair(i + 3) => Some(BracketPlan {
                kind,
                target,
                target_at: i + 2,
                label: None,
                last: i + 4,
            }),
            Some(Token::Pipe) => {
                let k = self.find_label_end(i + 4, end)?;
                closing_pair(k).then(|| BracketPlan {
                    kind,
                    target,
                    target_at: i + 2,
                    label: Some(i + 4..k),
                    last: k + 1,
                })
            }
            _ => None,
        }
    }

    fn scan_single(&self, i: usize, end: usize) -> Option<BracketPlan<'s>> {
        let target = match self.token(i + 1, end) {
            Some(Token::Text(t)) if is_url_like(t) => *t,
            _ => return None,
        };

        match self.token(i + 2, end) {
            Some(Token::CloseBracket) => Some(BracketPlan {
                kind: BracketKind::External,
                target,
                target_at: i + 1,
                label: None,
                last: i + 2,
            }),
            Some(Token::Pipe) => {
                let k = self.find_label_end(i + 3, end)?;
                Some(BracketPlan {
                    kind: BracketKind::External,
                    target,
                    target_at: i + 1,
                    label: Some(i + 3..k),
                    last: k,
                })
            }
            _ => None,
        }
    }

    fn bracketed(&mut self, parent: NodeId, i: usize, plan: BracketPlan<'s>, depth: usize) -> ParseResult<usize> {
        let start = self.tokens[i].span.start;
        let end = self.tokens[plan.last].span.end;
        if depth >= self.max_depth {
            return Err(ParseError::nesting_too_deep(start..end, self.max_depth));
        }

        if plan.kind == BracketKind::Media {
            self.media(parent, start..end, &plan, depth)?;
            return Ok(plan.last + 1);
        }

        let attrs: Attributes = match plan.kind {
            BracketKind::Wiki => [
                ("rel", WIKILINK_REL.to_string()),
                ("href", format!("./{}", urlencoding::encode(plan.target))),
            ]
            .into_iter()
            .collect(),
            _ => [("href", plan.target.to_string())].into_iter().collect(),
        };
        let id = self.tree.create_element_with("a", attrs);
        self.tree.append_child(parent, id);

        let provenance = match &plan.label {
            None => {
                let target_span = self.tokens[plan.target_at].span.clone();
                let text = self.tree.create_text(plan.target);
                self.tree.set_provenance(
                    text,
                    Provenance::with_dsr(Dsr::new(target_span.start, target_span.end)),
                );
                self.tree.append_child(id, text);
                Provenance::with_dsr(Dsr::with_widths(
                    start,
                    end,
                    target_span.start - start,
                    end - target_span.end,
                ))
                .stx(Stx::Simple)
            }
            Some(label) => {
                let label_start = self.tokens[label.start - 1].span.end;
                let label_end = self.tokens[label.end].span.start;
                self.parse_content(id, label.start, label.end, &mut Vec::new(), depth + 1)?;
                Provenance::with_dsr(Dsr::with_widths(start, end, label_start - start, end - label_end))
                    .stx(Stx::Piped)
            }
        };
        self.tree.set_provenance(id, provenance);

        Ok(plan.last + 1)
    }

    fn media(&mut self, parent: NodeId, span: Range<usize>, plan: &BracketPlan<'s>, depth: usize) -> ParseResult<()> {
        let name = plan.target[MEDIA_PREFIX.len()..].trim();
        let figure = self
            .tree
            .create_element_with("figure", [("typeof", "mw:Image")].into_iter().collect());
        let img = self.tree.create_element_with(
            "img",
            [("src", format!("{}{}", MEDIA_PATH, name))].into_iter().collect(),
        );
        self.tree.append_child(figure, img);

        if let Some(label) = &plan.label {
            let caption = self.tree.create_element("figcaption");
            self.tree.append_child(figure, caption);
            self.parse_content(caption, label.start, label.end, &mut Vec::new(), depth + 1)?;
        }

        self.tree
            .set_provenance(figure, Provenance::with_dsr(Dsr::new(span.start, span.end)));
        self.tree.append_child(parent, figure);
        Ok(())
    }
}

fn extend(run: &mut Option<Range<usize>>, span: Range<usize>) {
    match run {
        Some(range) => range.end = span.end,
        None => *run = Some(span),
    }
}

/// External link targets are single words
pub fn is_url_like(target: &str) -> bool {
    !target.is_empty() && !target.chars().any(char::is_whitespace)
}

/// Page names may contain spaces but not line breaks
pub fn is_page_name(target: &str) -> bool {
    !target.trim().is_empty() && !target.contains('\n')
}
