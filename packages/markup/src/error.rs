//! Error types for the markup parser

use std::ops::Range;
use thiserror::Error;

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Nesting deeper than {limit} levels at {span:?}")]
    NestingTooDeep { span: Range<usize>, limit: usize },

    #[error("Template call without a name at {span:?}")]
    EmptyTemplateName { span: Range<usize> },
}

impl ParseError {
    pub fn nesting_too_deep(span: Range<usize>, limit: usize) -> Self {
        Self::NestingTooDeep { span, limit }
    }

    pub fn empty_template_name(span: Range<usize>) -> Self {
        Self::EmptyTemplateName { span }
    }

    /// Byte range of the offending markup
    pub fn span(&self) -> Range<usize> {
        match self {
            ParseError::NestingTooDeep { span, .. } => span.clone(),
            ParseError::EmptyTemplateName { span } => span.clone(),
        }
    }
}

/// Pretty-print an error with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_error(source: &str, filename: &str, error: &ParseError) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    // ariadne counts characters, spans are bytes
    let to_char = |byte: usize| source[..byte.min(source.len())].chars().count();
    let span = error.span();
    let (start, end) = (to_char(span.start), to_char(span.end));

    let mut output = Vec::new();
    let report = Report::build(ReportKind::Error, filename, start)
        .with_message(error.to_string())
        .with_label(
            Label::new((filename, start..end))
                .with_color(Color::Red)
                .with_message(match error {
                    ParseError::NestingTooDeep { limit, .. } => {
                        format!("more than {} open elements here", limit)
                    }
                    ParseError::EmptyTemplateName { .. } => "template name expected".to_string(),
                }),
        )
        .finish();

    if report
        .write((filename, Source::from(source)), &mut output)
        .is_err()
    {
        return error.to_string();
    }

    String::from_utf8(output).unwrap_or_else(|_| "Error formatting failed".to_string())
}

#[cfg(all(test, feature = "pretty-errors"))]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_mentions_message() {
        let source = "abc {{|x}} def";
        let error = ParseError::empty_template_name(4..10);
        let formatted = format_error(source, "page.wt", &error);
        assert!(formatted.contains("Template call without a name"));
        assert!(formatted.contains("page.wt"));
    }
}
