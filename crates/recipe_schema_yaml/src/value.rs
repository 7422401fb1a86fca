//! Parsing of single values (concrete or templated)

use marked_yaml::Node as MarkedNode;

use crate::{
    converter::{FromStrConverter, NodeConverter},
    error::ParseResult,
    scalars::Template,
    types::Value,
};

/// Parse a `Value<T>` from a node using the default `FromStr` converter
pub fn parse_value<T>(node: &MarkedNode, field: &str) -> ParseResult<Value<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    parse_value_with_converter(node, field, &FromStrConverter::new())
}

/// Parse a `Value<T>` using a custom converter.
///
/// A scalar containing template delimiters becomes a [`Value::new_template`];
/// anything else is handed to the converter. Converter failures carry the
/// offending literal, so refinement violations are never silent.
pub fn parse_value_with_converter<T, C>(
    node: &MarkedNode,
    field: &str,
    converter: &C,
) -> ParseResult<Value<T>>
where
    C: NodeConverter<T>,
{
    if let Some(scalar) = node.as_scalar() {
        let s = scalar.as_str();
        if converter.is_template(s) {
            // Template text is structurally checked and carried verbatim
            let template = Template::new_unchecked(s);
            return Ok(Value::new_template(template, Some(*scalar.span())));
        }
    }

    let span = crate::helpers::get_span(node);
    let value = converter.convert(node, field)?;
    Ok(Value::new_concrete(value, Some(span)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_for(yaml: &str) -> MarkedNode {
        marked_yaml::parse_yaml(0, yaml).unwrap()
    }

    #[test]
    fn test_parse_concrete_value() {
        let yaml = node_for("val: 42");
        let node = yaml.as_mapping().unwrap().get("val").unwrap();
        let value: Value<u64> = parse_value(node, "val").unwrap();
        assert!(value.is_concrete());
        assert_eq!(value.as_concrete(), Some(&42));
    }

    #[test]
    fn test_parse_template_value() {
        let yaml = node_for("val: \"${{ foo }}\"");
        let node = yaml.as_mapping().unwrap().get("val").unwrap();
        let value: Value<String> = parse_value(node, "val").unwrap();
        assert!(value.is_template());
    }

    #[test]
    fn test_parse_invalid_value() {
        let yaml = node_for("val: not-a-number");
        let node = yaml.as_mapping().unwrap().get("val").unwrap();
        let result: ParseResult<Value<u64>> = parse_value(node, "val");
        assert!(result.is_err());
    }
}
