//! Helper functions for walking marked_yaml trees

use marked_yaml::{Node as MarkedNode, Span, types::MarkedMappingNode};

use crate::error::{ParseError, ParseResult};

/// Get the span from a marked_yaml node
pub fn get_span(node: &MarkedNode) -> Span {
    match node {
        MarkedNode::Scalar(s) => *s.span(),
        MarkedNode::Mapping(m) => *m.span(),
        MarkedNode::Sequence(s) => *s.span(),
    }
}

/// Describe the kind of a node, for type-mismatch messages
pub fn node_kind(node: &MarkedNode) -> &'static str {
    match node {
        MarkedNode::Scalar(_) => "scalar",
        MarkedNode::Mapping(_) => "mapping",
        MarkedNode::Sequence(_) => "sequence",
    }
}

/// Enforce a closed field set on a mapping.
///
/// `valid_fields` lists every declared field name including accepted
/// aliases. Any other key is an unrecognized-field error naming the entity,
/// with the full key list as a suggestion. Open entities simply never call
/// this.
pub fn validate_mapping_fields(
    mapping: &MarkedMappingNode,
    section: &str,
    valid_fields: &[&str],
) -> ParseResult<()> {
    for (key_node, _value_node) in mapping.iter() {
        let key = key_node.as_str();
        if !valid_fields.contains(&key) {
            return Err(
                ParseError::unrecognized_field(section, key, *key_node.span()).with_suggestion(
                    format!("valid fields are: {}", valid_fields.join(", ")),
                ),
            );
        }
    }
    Ok(())
}
