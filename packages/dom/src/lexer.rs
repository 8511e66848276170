//! Tag-level lexing shared by the DOM reader and markup front ends
//!
//! Start tags are matched on `<name` and their attributes are consumed by a
//! callback running a second, attribute-level lexer over the remainder. A
//! malformed tag makes the callback fail, which callers treat as literal
//! text.

use crate::entities::decode_entities;
use logos::{Lexer, Logos};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub self_closing: bool,
}

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum AttrToken<'s> {
    #[regex(r#"[^ \t\r\n\f"'>/=][^ \t\r\n\f"'>=]*"#, |lex| lex.slice())]
    Word(&'s str),

    #[token("=")]
    Eq,

    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    DoubleQuoted(&'s str),

    #[regex(r"'[^']*'", |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    SingleQuoted(&'s str),

    #[token(">")]
    Close,

    #[token("/>")]
    SelfClose,
}

/// Attributes scanned from the text following a tag name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedAttributes {
    pub attrs: Vec<(String, String)>,
    pub self_closing: bool,
    /// Bytes consumed, including the closing `>` or `/>`
    pub consumed: usize,
}

fn push_attr(attrs: &mut Vec<(String, String)>, name: String, value: String) {
    // First occurrence wins, as in HTML
    if !attrs.iter().any(|(k, _)| *k == name) {
        attrs.push((name, value));
    }
}

/// Scan `name="value" ... >` from the start of `input`
pub fn scan_attributes(input: &str) -> Option<ScannedAttributes> {
    let mut lex = AttrToken::lexer(input);
    let mut attrs = Vec::new();
    let mut pending: Option<String> = None;
    let mut expect_value = false;

    while let Some(token) = lex.next() {
        match token.ok()? {
            AttrToken::Word(word) if expect_value => {
                push_attr(&mut attrs, pending.take()?, decode_entities(word));
                expect_value = false;
            }
            AttrToken::Word(word) => {
                if let Some(name) = pending.take() {
                    push_attr(&mut attrs, name, String::new());
                }
                pending = Some(word.to_ascii_lowercase());
            }
            AttrToken::Eq => {
                if pending.is_none() || expect_value {
                    return None;
                }
                expect_value = true;
            }
            AttrToken::DoubleQuoted(value) | AttrToken::SingleQuoted(value) => {
                if !expect_value {
                    return None;
                }
                push_attr(&mut attrs, pending.take()?, decode_entities(value));
                expect_value = false;
            }
            close @ (AttrToken::Close | AttrToken::SelfClose) => {
                if expect_value {
                    return None;
                }
                if let Some(name) = pending.take() {
                    push_attr(&mut attrs, name, String::new());
                }
                return Some(ScannedAttributes {
                    attrs,
                    self_closing: close == AttrToken::SelfClose,
                    consumed: lex.span().end,
                });
            }
        }
    }

    None
}

/// Callback for `<name` tokens
pub fn lex_start_tag<'s, T>(lex: &mut Lexer<'s, T>) -> Option<StartTag>
where
    T: Logos<'s, Source = str>,
{
    let name = lex.slice()[1..].to_ascii_lowercase();
    let scanned = scan_attributes(lex.remainder())?;
    lex.bump(scanned.consumed);
    Some(StartTag {
        name,
        attrs: scanned.attrs,
        self_closing: scanned.self_closing,
    })
}

/// Callback for `</name >` tokens
pub fn lex_end_tag<'s, T>(lex: &mut Lexer<'s, T>) -> String
where
    T: Logos<'s, Source = str>,
{
    lex.slice()[2..]
        .trim_end_matches('>')
        .trim_end()
        .to_ascii_lowercase()
}

/// Callback for `<!--`; consumes through the closing `-->`
pub fn lex_comment<'s, T>(lex: &mut Lexer<'s, T>) -> Option<&'s str>
where
    T: Logos<'s, Source = str>,
{
    let rest: &'s str = lex.remainder();
    let end = rest.find("-->")?;
    lex.bump(end + 3);
    Some(&rest[..end])
}

/// Tokens of a plain DOM string
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
pub enum HtmlToken<'s> {
    #[token("<!--", lex_comment)]
    Comment(&'s str),

    #[regex(r"<[a-zA-Z][a-zA-Z0-9-]*", lex_start_tag)]
    StartTag(StartTag),

    #[regex(r"</[a-zA-Z][a-zA-Z0-9-]*[ \t\r\n\f]*>", lex_end_tag)]
    EndTag(String),

    #[regex(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z][a-zA-Z0-9]*);", |lex| lex.slice())]
    CharRef(&'s str),

    #[regex(r"[^<&]+", |lex| lex.slice())]
    Text(&'s str),

    #[token("<", |lex| lex.slice())]
    #[token("&", |lex| lex.slice())]
    Stray(&'s str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_attributes_quoting_styles() {
        let scanned = scan_attributes(r#" href="a&amp;b" class='x y' checked data-n=3>rest"#).unwrap();
        assert_eq!(
            scanned.attrs,
            vec![
                ("href".to_string(), "a&b".to_string()),
                ("class".to_string(), "x y".to_string()),
                ("checked".to_string(), String::new()),
                ("data-n".to_string(), "3".to_string()),
            ]
        );
        assert!(!scanned.self_closing);
        assert_eq!(&r#" href="a&amp;b" class='x y' checked data-n=3>rest"#[scanned.consumed..], "rest");
    }

    #[test]
    fn test_scan_attributes_self_closing() {
        let scanned = scan_attributes(" />").unwrap();
        assert!(scanned.self_closing);
        assert_eq!(scanned.consumed, 3);
    }

    #[test]
    fn test_scan_attributes_rejects_unterminated() {
        assert_eq!(scan_attributes(r#" a="b"#), None);
        assert_eq!(scan_attributes(" a= >"), None);
    }

    #[test]
    fn test_html_tokens() {
        let tokens: Vec<_> = HtmlToken::lexer("<p id=\"x\">a &lt; b<!-- c --></p>")
            .map(|t| t.unwrap())
            .collect();
        assert_eq!(
            tokens,
            vec![
                HtmlToken::StartTag(StartTag {
                    name: "p".to_string(),
                    attrs: vec![("id".to_string(), "x".to_string())],
                    self_closing: false,
                }),
                HtmlToken::Text("a "),
                HtmlToken::CharRef("&lt;"),
                HtmlToken::Text(" b"),
                HtmlToken::Comment(" c "),
                HtmlToken::EndTag("p".to_string()),
            ]
        );
    }

    #[test]
    fn test_unterminated_comment_is_an_error_token() {
        let mut lex = HtmlToken::lexer("<!-- open");
        assert!(lex.next().unwrap().is_err());
    }
}
