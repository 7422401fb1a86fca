//! Parsing of `T | List<T>` branch values

use marked_yaml::Node as MarkedNode;

use crate::{
    converter::{FromStrConverter, NodeConverter},
    error::ParseResult,
    types::{ListOrItem, Value},
    value::parse_value_with_converter,
};

/// Parse a `then`/`else` branch: either a single value or a list of values
pub fn parse_list_or_item<T>(node: &MarkedNode, field: &str) -> ParseResult<ListOrItem<Value<T>>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    parse_list_or_item_with_converter(node, field, &FromStrConverter::new())
}

/// Parse a `then`/`else` branch using a custom converter
pub fn parse_list_or_item_with_converter<T, C>(
    node: &MarkedNode,
    field: &str,
    converter: &C,
) -> ParseResult<ListOrItem<Value<T>>>
where
    C: NodeConverter<T>,
{
    if let Some(sequence) = node.as_sequence() {
        let mut items = Vec::new();
        for item in sequence.iter() {
            items.push(parse_value_with_converter(item, field, converter)?);
        }
        return Ok(ListOrItem::new(items));
    }

    let value = parse_value_with_converter(node, field, converter)?;
    Ok(ListOrItem::single(value))
}
