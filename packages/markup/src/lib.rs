//! # Selser Markup
//!
//! Reference source language for the selective serializer: a small wikitext
//! dialect with HTML tags, bracket links, wikilinks, media, templates and
//! character references.
//!
//! The [`MarkupParser`] records a byte range for every node it builds, and
//! the [`MarkupSerializer`] regenerates markup for nodes that have to be
//! written from scratch.

pub mod error;
pub mod id_generator;
pub mod lexer;
pub mod parser;
pub mod serializer;
pub mod template;

#[cfg(feature = "pretty-errors")]
pub use error::format_error;
pub use error::{ParseError, ParseResult};
pub use parser::{parse, MarkupParser};
pub use serializer::{escape_markup, MarkupSerializer};
pub use template::TemplateCall;
