//! Parsing of conditional lists and if/then/else nodes.
//!
//! Two entry points implement the two legal field typings:
//!
//! - [`parse_conditional_list`] is strict: the field must be a sequence, and
//!   a bare if/then/else at the field position is a shape mismatch. This is
//!   the typing of list-biased fields such as `patches`.
//! - [`parse_conditional_list_or_item`] is the full three-shape union: a
//!   bare value, a bare if/then/else, or a sequence mixing both.
//!
//! An if/then/else is only ever legal as a whole field value (when the field
//! is typed for it) or as a list element; the same rule applies one level
//! down inside `then`/`else` branches.

use marked_yaml::Node as MarkedNode;

use crate::{
    converter::{FromStrConverter, NodeConverter},
    error::{ParseError, ParseResult},
    helpers::{get_span, node_kind},
    list::parse_list_or_item_with_converter,
    scalars::Expression,
    types::{Conditional, ConditionalList, Item},
    value::parse_value_with_converter,
};

/// Check whether a node is structurally an if/then/else (has the reserved
/// `if` key)
pub fn is_conditional(node: &MarkedNode) -> bool {
    node.as_mapping()
        .is_some_and(|mapping| mapping.get("if").is_some())
}

/// Parse a strict conditional list: the node must be a sequence
pub fn parse_conditional_list<T>(node: &MarkedNode, field: &str) -> ParseResult<ConditionalList<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    parse_conditional_list_with_converter(node, field, &FromStrConverter::new())
}

/// Parse a strict conditional list using a custom converter
pub fn parse_conditional_list_with_converter<T, C>(
    node: &MarkedNode,
    field: &str,
    converter: &C,
) -> ParseResult<ConditionalList<T>>
where
    C: NodeConverter<T>,
{
    let sequence = node.as_sequence().ok_or_else(|| {
        if is_conditional(node) {
            ParseError::conditional_shape_mismatch(
                field,
                "a bare if/then/else is not allowed here; wrap it in a list",
                get_span(node),
            )
        } else {
            ParseError::expected_type("sequence", node_kind(node), get_span(node))
        }
    })?;

    let mut items = Vec::new();
    for item in sequence.iter() {
        items.push(parse_item_with_converter(item, field, converter)?);
    }
    Ok(ConditionalList::new(items))
}

/// Parse the full conditional union: bare value, bare if/then/else, or a
/// sequence of either
pub fn parse_conditional_list_or_item<T>(
    node: &MarkedNode,
    field: &str,
) -> ParseResult<ConditionalList<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    parse_conditional_list_or_item_with_converter(node, field, &FromStrConverter::new())
}

/// Parse the full conditional union using a custom converter
pub fn parse_conditional_list_or_item_with_converter<T, C>(
    node: &MarkedNode,
    field: &str,
    converter: &C,
) -> ParseResult<ConditionalList<T>>
where
    C: NodeConverter<T>,
{
    if let Some(sequence) = node.as_sequence() {
        let mut items = Vec::new();
        for item in sequence.iter() {
            items.push(parse_item_with_converter(item, field, converter)?);
        }
        return Ok(ConditionalList::new(items));
    }

    let item = parse_item_with_converter(node, field, converter)?;
    Ok(ConditionalList::new(vec![item]))
}

/// Parse a single list element: a value or an if/then/else
pub fn parse_item_with_converter<T, C>(
    node: &MarkedNode,
    field: &str,
    converter: &C,
) -> ParseResult<Item<T>>
where
    C: NodeConverter<T>,
{
    if is_conditional(node) {
        return parse_conditional_with_converter(node, field, converter).map(Item::Conditional);
    }

    let value = parse_value_with_converter(node, field, converter)?;
    Ok(Item::Value(value))
}

fn parse_conditional_with_converter<T, C>(
    node: &MarkedNode,
    field: &str,
    converter: &C,
) -> ParseResult<Conditional<T>>
where
    C: NodeConverter<T>,
{
    let mapping = node.as_mapping().ok_or_else(|| {
        ParseError::conditional_shape_mismatch(field, "expected a mapping", get_span(node))
    })?;

    crate::helpers::validate_mapping_fields(mapping, field, &["if", "then", "else"])?;

    let condition_node = mapping
        .get("if")
        .ok_or_else(|| ParseError::missing_field("if", get_span(node)))?;
    let condition_scalar = condition_node.as_scalar().ok_or_else(|| {
        ParseError::expected_type("scalar", node_kind(condition_node), get_span(condition_node))
    })?;
    let condition = condition_scalar.as_str().parse::<Expression>().map_err(|e| {
        ParseError::constraint_violation(format!("{field}.if"), e.to_string(), *condition_scalar.span())
    })?;

    let then_node = mapping
        .get("then")
        .ok_or_else(|| ParseError::missing_field("then", get_span(node)))?;
    let then = parse_list_or_item_with_converter(then_node, field, converter)?;

    let else_value = match mapping.get("else") {
        Some(else_node) => Some(parse_list_or_item_with_converter(else_node, field, converter)?),
        None => None,
    };

    Ok(Conditional {
        condition,
        then,
        else_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_node(yaml: &str) -> MarkedNode {
        marked_yaml::parse_yaml(0, yaml).unwrap()
    }

    #[test]
    fn test_parse_simple_list() {
        let yaml = field_node("val: [\"1.0\", \"2.0\"]");
        let node = yaml.as_mapping().unwrap().get("val").unwrap();
        let list: ConditionalList<String> = parse_conditional_list(node, "val").unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|item| item.is_value()));
    }

    #[test]
    fn test_parse_conditional() {
        let yaml = field_node(
            r#"
val:
  - if: win
    then: "14"
  - if: unix
    then: "16"
"#,
        );
        let node = yaml.as_mapping().unwrap().get("val").unwrap();
        let list: ConditionalList<String> = parse_conditional_list(node, "val").unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|item| item.is_conditional()));
    }

    #[test]
    fn test_parse_conditional_with_branch_lists() {
        let yaml = field_node(
            r#"
val:
  - if: unix
    then: ["3.9", "3.10"]
  - if: win
    then: ["3.8"]
    else: ["3.11", "3.12", "3.13"]
"#,
        );
        let node = yaml.as_mapping().unwrap().get("val").unwrap();
        let list: ConditionalList<String> = parse_conditional_list(node, "val").unwrap();
        assert_eq!(list.len(), 2);

        let first = list.iter().next().unwrap().as_conditional().unwrap();
        assert_eq!(first.then.len(), 2);

        let second = list.iter().nth(1).unwrap().as_conditional().unwrap();
        assert_eq!(second.then.len(), 1);
        assert_eq!(second.else_value.as_ref().unwrap().len(), 3);
    }

    #[test]
    fn test_parse_mixed_list() {
        let yaml = field_node(
            r#"
val:
  - "plain"
  - ${{ template }}
  - if: condition
    then: "conditional"
"#,
        );
        let node = yaml.as_mapping().unwrap().get("val").unwrap();
        let list: ConditionalList<String> = parse_conditional_list(node, "val").unwrap();
        assert_eq!(list.len(), 3);

        let items: Vec<_> = list.iter().collect();
        assert!(items[0].is_value());
        assert!(items[1].as_value().unwrap().is_template());
        assert!(items[2].is_conditional());
    }

    #[test]
    fn test_strict_list_rejects_bare_conditional() {
        let yaml = field_node(
            r#"
val:
  if: win
  then: "windows"
"#,
        );
        let node = yaml.as_mapping().unwrap().get("val").unwrap();
        let result: ParseResult<ConditionalList<String>> = parse_conditional_list(node, "val");
        assert!(matches!(
            result,
            Err(ParseError::ConditionalShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_lenient_union_accepts_all_three_shapes() {
        for yaml in [
            "val: bare",
            "val:\n  if: win\n  then: conditional",
            "val:\n  - listed\n  - if: win\n    then: conditional",
        ] {
            let tree = field_node(yaml);
            let node = tree.as_mapping().unwrap().get("val").unwrap();
            let list: ConditionalList<String> =
                parse_conditional_list_or_item(node, "val").unwrap();
            assert!(!list.is_empty(), "failed for: {yaml}");
        }
    }

    #[test]
    fn test_conditional_with_unknown_key_rejected() {
        let yaml = field_node(
            r#"
val:
  - if: win
    then: "a"
    otherwise: "b"
"#,
        );
        let node = yaml.as_mapping().unwrap().get("val").unwrap();
        let result: ParseResult<ConditionalList<String>> = parse_conditional_list(node, "val");
        assert!(matches!(result, Err(ParseError::UnrecognizedField { .. })));
    }

    #[test]
    fn test_conditional_missing_then() {
        let yaml = field_node("val:\n  - if: win\n");
        let node = yaml.as_mapping().unwrap().get("val").unwrap();
        let result: ParseResult<ConditionalList<String>> = parse_conditional_list(node, "val");
        assert!(matches!(result, Err(ParseError::MissingField { field, .. }) if field == "then"));
    }
}
