//! Error types shared by every layer of the schema validator.
//!
//! Every error carries the span of the offending node so that callers can
//! render precise reports. Rendering against the original source text is
//! available through [`ParseErrorWithSource`] when the `miette` feature is
//! enabled.

use marked_yaml::Span;
use thiserror::Error;

#[cfg(feature = "miette")]
use miette::{Diagnostic, SourceSpan};

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors produced while constructing a typed document from a YAML tree.
///
/// The variants mirror the structural rules of the schema: closed field
/// sets, discriminated unions, refinement scalars and the conditional
/// container shapes. Validation never recovers from any of these; a
/// document with at least one error is rejected wholesale.
#[derive(Debug, Error, Clone)]
pub enum ParseError {
    /// The raw text could not even be parsed into a YAML tree
    #[error("invalid YAML: {message}")]
    YamlError { message: String, span: Span },

    /// A key not in the entity's closed field set
    #[error("unrecognized field '{field}' in {section}")]
    UnrecognizedField {
        section: String,
        field: String,
        span: Span,
        suggestion: Option<String>,
    },

    /// No variant of a discriminated union matched (or more than one did)
    #[error("no matching alternative for {section}: {reason}")]
    NoMatchingAlternative {
        section: String,
        reason: String,
        span: Span,
        suggestion: Option<String>,
    },

    /// A refinement scalar rejected the literal value
    #[error("invalid value for '{field}': {reason}")]
    ConstraintViolation {
        field: String,
        reason: String,
        span: Span,
        suggestion: Option<String>,
    },

    /// Required field absent from a mapping
    #[error("missing required field '{field}'")]
    MissingField { field: String, span: Span },

    /// The node is neither a plain value, an if/then/else, nor a list of either
    #[error("invalid conditional for '{field}': {message}")]
    ConditionalShapeMismatch {
        field: String,
        message: String,
        span: Span,
    },

    /// The declared schema version is outside the supported range
    #[error("unsupported schema version {version}")]
    SchemaVersionUnsupported { version: String, span: Span },

    /// Node kind differs from what the field requires
    #[error("expected {expected} but got {actual}")]
    TypeMismatch {
        expected: String,
        actual: String,
        span: Span,
    },
}

impl ParseError {
    pub fn yaml_error(message: impl Into<String>, span: Span) -> Self {
        Self::YamlError {
            message: message.into(),
            span,
        }
    }

    pub fn unrecognized_field(
        section: impl Into<String>,
        field: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::UnrecognizedField {
            section: section.into(),
            field: field.into(),
            span,
            suggestion: None,
        }
    }

    pub fn no_matching_alternative(
        section: impl Into<String>,
        reason: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::NoMatchingAlternative {
            section: section.into(),
            reason: reason.into(),
            span,
            suggestion: None,
        }
    }

    pub fn constraint_violation(
        field: impl Into<String>,
        reason: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::ConstraintViolation {
            field: field.into(),
            reason: reason.into(),
            span,
            suggestion: None,
        }
    }

    pub fn missing_field(field: impl Into<String>, span: Span) -> Self {
        Self::MissingField {
            field: field.into(),
            span,
        }
    }

    pub fn conditional_shape_mismatch(
        field: impl Into<String>,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::ConditionalShapeMismatch {
            field: field.into(),
            message: message.into(),
            span,
        }
    }

    pub fn schema_version_unsupported(version: impl Into<String>, span: Span) -> Self {
        Self::SchemaVersionUnsupported {
            version: version.into(),
            span,
        }
    }

    pub fn expected_type(
        expected: impl Into<String>,
        actual: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
            span,
        }
    }

    /// Add a suggestion to errors that support one
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        match &mut self {
            Self::UnrecognizedField { suggestion: s, .. }
            | Self::NoMatchingAlternative { suggestion: s, .. }
            | Self::ConstraintViolation { suggestion: s, .. } => {
                *s = Some(suggestion.into());
            }
            _ => {}
        }
        self
    }

    /// Get the span of the offending node
    pub fn span(&self) -> &Span {
        match self {
            Self::YamlError { span, .. }
            | Self::UnrecognizedField { span, .. }
            | Self::NoMatchingAlternative { span, .. }
            | Self::ConstraintViolation { span, .. }
            | Self::MissingField { span, .. }
            | Self::ConditionalShapeMismatch { span, .. }
            | Self::SchemaVersionUnsupported { span, .. }
            | Self::TypeMismatch { span, .. } => span,
        }
    }

    /// Get the attached suggestion, if any
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::UnrecognizedField { suggestion, .. }
            | Self::NoMatchingAlternative { suggestion, .. }
            | Self::ConstraintViolation { suggestion, .. } => suggestion.as_deref(),
            _ => None,
        }
    }
}

#[cfg(feature = "miette")]
impl Diagnostic for ParseError {
    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        let source_span = span_to_source_span(self.span());
        let label = miette::LabeledSpan::new_with_span(Some(self.to_string()), source_span);
        Some(Box::new(std::iter::once(label)))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.suggestion()
            .map(|s| Box::new(s.to_string()) as Box<dyn std::fmt::Display>)
    }
}

/// Format a span for plain-text error messages
pub fn format_span(span: &Span) -> String {
    if let Some(start) = span.start() {
        format!("line {}, column {}", start.line(), start.column())
    } else {
        "unknown location".to_string()
    }
}

/// Convert a marked_yaml span to a miette source span
#[cfg(feature = "miette")]
fn span_to_source_span(span: &Span) -> SourceSpan {
    if let Some(start) = span.start() {
        let offset = start.character();
        let len = if let Some(end) = span.end() {
            end.character().saturating_sub(offset).max(1)
        } else {
            1
        };
        SourceSpan::new(offset.into(), len)
    } else {
        SourceSpan::new(0.into(), 0)
    }
}

/// Find the length of a YAML token starting at the given byte offset.
/// The offset may land out of range or inside a multi-byte character;
/// fall back to a single-column label instead of slicing blindly.
#[cfg(feature = "miette")]
fn find_token_length(src: &str, start: usize) -> usize {
    let Some(remaining) = src.get(start..) else {
        return 1;
    };
    let mut len = 0;

    for (i, ch) in remaining.char_indices() {
        if ch.is_whitespace() || ch == ':' || ch == ',' {
            return if len == 0 { i.max(1) } else { len };
        }
        len = i + ch.len_utf8();
    }

    if len == 0 { remaining.len().max(1) } else { len }
}

/// A [`ParseError`] bundled with the source text it came from.
///
/// Single-character spans are widened to the full token so that reports
/// highlight the whole offending word.
#[cfg(feature = "miette")]
#[derive(Debug)]
pub struct ParseErrorWithSource<S> {
    source: S,
    error: ParseError,
}

#[cfg(feature = "miette")]
impl<S> ParseErrorWithSource<S> {
    pub fn new(source: S, error: ParseError) -> Self {
        Self { source, error }
    }

    pub fn error(&self) -> &ParseError {
        &self.error
    }

    pub fn into_error(self) -> ParseError {
        self.error
    }
}

#[cfg(feature = "miette")]
impl<S> std::fmt::Display for ParseErrorWithSource<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

#[cfg(feature = "miette")]
impl<S> std::error::Error for ParseErrorWithSource<S> where S: std::fmt::Debug {}

#[cfg(feature = "miette")]
impl<S> Diagnostic for ParseErrorWithSource<S>
where
    S: AsRef<str> + miette::SourceCode + std::fmt::Debug,
{
    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.source)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        let labels = self.error.labels()?;
        let source_str = self.source.as_ref();

        let expanded = labels.map(move |label| {
            let span = label.inner();
            if span.len() == 1 && span.offset() < source_str.len() {
                let offset = span.offset();
                let token_len = find_token_length(source_str, offset);
                miette::LabeledSpan::new(label.label().map(|s| s.to_string()), offset, token_len)
            } else {
                label
            }
        });
        Some(Box::new(expanded))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.error.help()
    }
}

#[cfg(all(test, feature = "miette"))]
mod tests {
    use super::*;

    #[test]
    fn test_token_length_stops_at_separators() {
        assert_eq!(find_token_length("name: value", 6), 5);
        assert_eq!(find_token_length("a, b", 0), 1);
    }

    #[test]
    fn test_token_length_tolerates_bad_offsets() {
        // inside the two-byte `é`
        assert_eq!(find_token_length("héllo: 1", 2), 1);
        // past the end of the source
        assert_eq!(find_token_length("abc", 99), 1);
    }
}
