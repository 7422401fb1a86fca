//! The `package` section

use marked_yaml::Node as MarkedNode;
use recipe_schema_yaml::{
    NonEmptyStr, ParseError, ParseMapping, ParseResult, Value, get_span, node_kind,
    validate_mapping_fields,
};
use serde::Serialize;

/// Fields accepted by the `package` section of a single-output recipe
pub const PACKAGE_FIELDS: &[&str] = &["name", "version"];

/// The `package` section of a single-output recipe. Both fields are
/// required here; a multi-output recipe declares them per output instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Package {
    pub name: Value<NonEmptyStr>,
    pub version: Value<NonEmptyStr>,
}

/// The `package` declaration of a multi-output output, where both name
/// and version may be inherited from the top-level `recipe` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PackageIdentifier {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Value<NonEmptyStr>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Value<NonEmptyStr>>,
}

pub(crate) fn parse_package(node: &MarkedNode) -> ParseResult<Package> {
    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;

    validate_mapping_fields(mapping, "package", PACKAGE_FIELDS)?;

    let name = node
        .try_get_value("name")?
        .ok_or_else(|| ParseError::missing_field("package.name", get_span(node)))?;
    let version = node
        .try_get_value("version")?
        .ok_or_else(|| ParseError::missing_field("package.version", get_span(node)))?;

    Ok(Package { name, version })
}

pub(crate) fn parse_package_identifier(
    node: &MarkedNode,
    section: &str,
) -> ParseResult<PackageIdentifier> {
    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;

    validate_mapping_fields(mapping, section, PACKAGE_FIELDS)?;

    Ok(PackageIdentifier {
        name: node.try_get_value("name")?,
        version: node.try_get_value("version")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> ParseResult<Package> {
        let node = recipe_schema_yaml::parse_yaml(yaml).unwrap();
        parse_package(&node)
    }

    #[test]
    fn test_parse_package() {
        let package = parse("{name: xtensor, version: 0.24.0}").unwrap();
        assert_eq!(package.name.to_string(), "xtensor");
        assert_eq!(package.version.to_string(), "0.24.0");
    }

    #[test]
    fn test_templated_version() {
        let package = parse("{name: xtensor, version: '${{ version }}'}").unwrap();
        assert!(package.version.is_template());
    }

    #[test]
    fn test_missing_version_rejected() {
        let err = parse("{name: xtensor}").unwrap_err();
        assert!(matches!(err, ParseError::MissingField { .. }));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = parse("{name: xtensor, version: '1.0', vendor: acme}").unwrap_err();
        assert!(matches!(err, ParseError::UnrecognizedField { .. }));
    }

    #[test]
    fn test_identifier_fields_optional() {
        let node = recipe_schema_yaml::parse_yaml("{name: sub-output}").unwrap();
        let identifier = parse_package_identifier(&node, "outputs.package").unwrap();
        assert!(identifier.name.is_some());
        assert!(identifier.version.is_none());
    }
}
