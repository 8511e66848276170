//! Lexer for the markup language using logos
//!
//! Lexing is total: anything logos cannot match (a malformed tag, an
//! unterminated comment) comes back as [`Token::Stray`] and ends up as text.

use logos::Logos;
use selser_dom::lexer::{lex_comment, lex_end_tag, lex_start_tag, StartTag};
use std::ops::Range;

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
pub enum Token<'src> {
    #[token("<!--", lex_comment)]
    Comment(&'src str),

    #[regex(r"<[a-zA-Z][a-zA-Z0-9]*", lex_start_tag)]
    StartTag(StartTag),

    #[regex(r"</[a-zA-Z][a-zA-Z0-9]*[ \t\r\n\f]*>", lex_end_tag)]
    EndTag(String),

    #[regex(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z][a-zA-Z0-9]*);", |lex| lex.slice())]
    CharRef(&'src str),

    #[token("{{")]
    OpenTemplate,

    #[token("}}")]
    CloseTemplate,

    #[token("[")]
    OpenBracket,

    #[token("]")]
    CloseBracket,

    #[token("|")]
    Pipe,

    #[regex(r"[^<&\[\]{}|]+", |lex| lex.slice())]
    Text(&'src str),

    #[token("<", |lex| lex.slice())]
    #[token("&", |lex| lex.slice())]
    #[token("{", |lex| lex.slice())]
    #[token("}", |lex| lex.slice())]
    Stray(&'src str),
}

/// A token with its byte span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedToken<'src> {
    pub token: Token<'src>,
    pub span: Range<usize>,
}

pub fn lex(source: &str) -> Vec<SpannedToken<'_>> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let token = match result {
            Ok(token) => token,
            Err(()) => Token::Stray(lexer.slice()),
        };
        tokens.push(SpannedToken { token, span });
    }

    tokens
}
