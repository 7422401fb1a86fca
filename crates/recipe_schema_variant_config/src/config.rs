//! Typed model and parser for variant configuration documents

use indexmap::IndexMap;
use marked_yaml::Node as MarkedNode;
use recipe_schema_yaml::{
    ConditionalList, NodeConverter, NonEmptyStr, ParseError, ParseMapping, ParseResult, Value,
    get_span, is_null, node_kind, parse_conditional_list,
    parse_conditional_list_or_item_with_converter, validate_mapping_fields,
};
use serde::Serialize;

/// Keys with dedicated semantics; everything else is an axis
pub const RESERVED_KEYS: &[&str] = &["zip_keys", "pin_run_as_build"];

pub const PIN_SPEC_FIELDS: &[&str] = &["min_pin", "max_pin"];

/// A parsed variant configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VariantConfig {
    /// Groups of axes whose values advance in lockstep instead of forming
    /// a cross product
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub zip_keys: ConditionalList<ConditionalList<NonEmptyStr>>,
    /// Pin widths applied when a package moves from build to run
    /// requirements
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub pin_run_as_build: IndexMap<String, PinSpec>,
    /// The build matrix axes, in document order
    #[serde(flatten)]
    pub variants: IndexMap<String, ConditionalList<NonEmptyStr>>,
}

/// A pin width: at least one of the two bounds must be given
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PinSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_pin: Option<Value<NonEmptyStr>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pin: Option<Value<NonEmptyStr>>,
}

/// Parse a variant configuration tree.
///
/// The document is open: any key outside the reserved set declares an
/// axis, so there is no closed-field check at the top level.
pub fn parse_variant_config(node: &MarkedNode) -> ParseResult<VariantConfig> {
    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;

    let zip_keys = match mapping.get("zip_keys") {
        Some(zip_keys) if !is_null(zip_keys) => parse_zip_keys(zip_keys)?,
        _ => ConditionalList::default(),
    };
    let pin_run_as_build = match mapping.get("pin_run_as_build") {
        Some(pins) if !is_null(pins) => parse_pin_run_as_build(pins)?,
        _ => IndexMap::new(),
    };

    let mut variants = IndexMap::new();
    for (key, value) in mapping.iter() {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        if is_null(value) {
            variants.insert(key.as_str().to_string(), ConditionalList::default());
            continue;
        }
        use recipe_schema_yaml::ParseNode;
        variants.insert(
            key.as_str().to_string(),
            value.parse_conditional_list_or_item(key.as_str())?,
        );
    }

    Ok(VariantConfig {
        zip_keys,
        pin_run_as_build,
        variants,
    })
}

/// Parse raw text into a variant configuration
pub fn parse_variant_config_from_source(source: &str) -> ParseResult<VariantConfig> {
    let node = recipe_schema_yaml::parse_yaml(source)?;
    parse_variant_config(&node)
}

fn parse_zip_keys(node: &MarkedNode) -> ParseResult<ConditionalList<ConditionalList<NonEmptyStr>>> {
    parse_conditional_list_or_item_with_converter(node, "zip_keys", &KeyGroupConverter)
}

/// Each zip group is itself a list of axis names
struct KeyGroupConverter;

impl NodeConverter<ConditionalList<NonEmptyStr>> for KeyGroupConverter {
    fn convert(
        &self,
        node: &MarkedNode,
        field: &str,
    ) -> ParseResult<ConditionalList<NonEmptyStr>> {
        parse_conditional_list(node, field)
    }

    fn is_template(&self, _text: &str) -> bool {
        false
    }
}

fn parse_pin_run_as_build(node: &MarkedNode) -> ParseResult<IndexMap<String, PinSpec>> {
    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;

    let mut pins = IndexMap::new();
    for (key, value) in mapping.iter() {
        pins.insert(key.as_str().to_string(), parse_pin_spec(value, key.as_str())?);
    }
    Ok(pins)
}

fn parse_pin_spec(node: &MarkedNode, package: &str) -> ParseResult<PinSpec> {
    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;

    let section = format!("pin_run_as_build.{package}");
    validate_mapping_fields(mapping, &section, PIN_SPEC_FIELDS)?;

    let spec = PinSpec {
        min_pin: node.try_get_value("min_pin")?,
        max_pin: node.try_get_value("max_pin")?,
    };
    if spec.min_pin.is_none() && spec.max_pin.is_none() {
        return Err(ParseError::no_matching_alternative(
            section,
            "expected at least one of `min_pin` or `max_pin`",
            get_span(node),
        ));
    }
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_axes() {
        let config = parse_variant_config_from_source(
            r#"
python:
  - "3.9"
  - "3.10"
boost:
  - "1.78"
custom_axis:
  - value_a
"#,
        )
        .unwrap();
        assert_eq!(config.variants.len(), 3);
        assert_eq!(config.variants["python"].len(), 2);
        assert!(config.zip_keys.is_empty());
    }

    #[test]
    fn test_axis_with_conditional() {
        let config = parse_variant_config_from_source(
            r#"
c_compiler:
  - if: win
    then: vs2019
    else: gcc
"#,
        )
        .unwrap();
        assert!(config.variants["c_compiler"]
            .iter()
            .next()
            .unwrap()
            .is_conditional());
    }

    #[test]
    fn test_bare_axis_value() {
        let config = parse_variant_config_from_source("target_platform: linux-64\n").unwrap();
        assert_eq!(config.variants["target_platform"].len(), 1);
    }

    #[test]
    fn test_null_axis_is_empty() {
        let config = parse_variant_config_from_source("python:\nzip_keys:\n").unwrap();
        assert!(config.variants["python"].is_empty());
        assert!(config.zip_keys.is_empty());
    }

    #[test]
    fn test_zip_keys() {
        let config = parse_variant_config_from_source(
            r#"
zip_keys:
  - [python, numpy]
  - [c_compiler, cxx_compiler]
"#,
        )
        .unwrap();
        assert_eq!(config.zip_keys.len(), 2);
        let first = config
            .zip_keys
            .iter()
            .next()
            .and_then(|i| i.as_value()?.as_concrete())
            .unwrap();
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_pin_run_as_build() {
        let config = parse_variant_config_from_source(
            r#"
pin_run_as_build:
  boost:
    max_pin: x.x
  libfoo:
    min_pin: x.x.x
    max_pin: x
"#,
        )
        .unwrap();
        assert_eq!(config.pin_run_as_build.len(), 2);
        assert!(config.pin_run_as_build["boost"].min_pin.is_none());
    }

    #[test]
    fn test_empty_pin_spec_rejected() {
        let err = parse_variant_config_from_source("pin_run_as_build: {boost: {}}\n").unwrap_err();
        assert!(matches!(err, ParseError::NoMatchingAlternative { .. }));
    }

    #[test]
    fn test_unknown_pin_field_rejected() {
        let err = parse_variant_config_from_source(
            "pin_run_as_build: {boost: {exact_pin: x.x}}\n",
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::UnrecognizedField { .. }));
    }
}
