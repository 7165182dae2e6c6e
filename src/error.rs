//! Parse errors and the source-text carrier they point into.

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::sync::Arc;
use thiserror::Error;

/// Result type alias for parsing operations.
pub type Result<T, E = ParseError> = std::result::Result<T, E>;

/// Error produced when lexing or parsing a template fails.
///
/// `Display` renders the classical `name:line: message` form; the attached
/// source and span let a miette handler print the offending line as well.
#[derive(Debug, Error, Diagnostic)]
#[error("{name}:{line}: {message}")]
pub struct ParseError {
    /// Name of the template being parsed.
    pub name: String,
    /// 1-based line the error was reported on.
    pub line: usize,
    /// The error message, without location prefix.
    pub message: String,
    #[source_code]
    src: NamedSource<String>,
    #[label("{message}")]
    span: SourceSpan,
}

impl ParseError {
    pub(crate) fn new(
        source: &TemplateSource,
        line: usize,
        span: SourceSpan,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: source.name().to_string(),
            line,
            message: message.into(),
            src: source.named_source(),
            span,
        }
    }
}

/// Named source text shared between the lexer, the parser, and error reports.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    name: String,
    text: Arc<String>,
}

impl TemplateSource {
    pub fn new(name: impl Into<String>, text: Arc<String>) -> Self {
        Self {
            name: name.into(),
            text,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &Arc<String> {
        &self.text
    }

    pub fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(&self.name, String::clone(&self.text))
    }
}
