//! The `extra` section: a free-form mapping carried through untyped

use indexmap::IndexMap;
use marked_yaml::Node as MarkedNode;
use recipe_schema_yaml::{ParseError, ParseResult, get_span, node_kind};
use serde_json::Value as JsonValue;

/// Convert an arbitrary subtree into JSON values. Scalars stay strings;
/// no type coercion happens for untyped content.
pub(crate) fn node_to_json(node: &MarkedNode) -> JsonValue {
    match node {
        MarkedNode::Scalar(scalar) => JsonValue::String(scalar.as_str().to_string()),
        MarkedNode::Sequence(sequence) => {
            JsonValue::Array(sequence.iter().map(node_to_json).collect())
        }
        MarkedNode::Mapping(mapping) => {
            let mut map = serde_json::Map::new();
            for (key, value) in mapping.iter() {
                map.insert(key.as_str().to_string(), node_to_json(value));
            }
            JsonValue::Object(map)
        }
    }
}

pub(crate) fn parse_extra(node: &MarkedNode) -> ParseResult<IndexMap<String, JsonValue>> {
    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;

    let mut extra = IndexMap::new();
    for (key, value) in mapping.iter() {
        extra.insert(key.as_str().to_string(), node_to_json(value));
    }
    Ok(extra)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arbitrary_keys_accepted() {
        let node = recipe_schema_yaml::parse_yaml(
            r#"
extra:
  recipe-maintainers:
    - wolfv
    - nichmor
  feedstock-name: xtensor
  nested:
    anything: [1, 2]
"#,
        )
        .unwrap();
        let extra = parse_extra(node.as_mapping().unwrap().get("extra").unwrap()).unwrap();
        assert_eq!(extra.len(), 3);
        assert!(extra["recipe-maintainers"].is_array());
        assert!(extra["nested"].is_object());
    }

    #[test]
    fn test_scalar_extra_rejected() {
        let node = recipe_schema_yaml::parse_yaml("extra: just-a-string").unwrap();
        let err = parse_extra(node.as_mapping().unwrap().get("extra").unwrap()).unwrap_err();
        assert!(matches!(err, ParseError::TypeMismatch { .. }));
    }
}
