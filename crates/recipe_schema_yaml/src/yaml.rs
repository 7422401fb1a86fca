//! Thin wrapper over the external YAML parser

use marked_yaml::{Node as MarkedNode, Span};

use crate::error::{ParseError, ParseResult};

/// Parse raw text into a generic span-carrying tree.
///
/// This is the boundary to the external document parser; everything past
/// this point operates on the tree only.
pub fn parse_yaml(source: &str) -> ParseResult<MarkedNode> {
    marked_yaml::parse_yaml(0, source)
        .map_err(|e| ParseError::yaml_error(e.to_string(), Span::new_blank()))
}
