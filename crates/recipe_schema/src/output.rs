//! The `outputs` section of a multi-output recipe

use indexmap::IndexMap;
use marked_yaml::Node as MarkedNode;
use recipe_schema_yaml::{
    ConditionalList, NodeConverter, ParseError, ParseResult, get_span, is_null, node_kind,
    parse_conditional_list_or_item_with_converter, validate_mapping_fields,
};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::about::{About, parse_about};
use crate::build::{OutputBuild, parse_output_build};
use crate::extra::parse_extra;
use crate::package::{PackageIdentifier, parse_package_identifier};
use crate::requirements::{Requirements, parse_requirements};
use crate::source::{Source, parse_sources};
use crate::test_elements::{TestElement, parse_tests};

/// `test` is the deprecated spelling of `tests`
pub const OUTPUT_FIELDS: &[&str] = &[
    "package",
    "source",
    "build",
    "requirements",
    "tests",
    "test",
    "about",
    "extra",
];

/// A single artifact of a multi-output recipe. Unset sections fall back
/// to the recipe-level defaults during rendering; this layer only records
/// what was written.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Output {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageIdentifier>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub source: ConditionalList<Source>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<OutputBuild>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Requirements>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub tests: ConditionalList<TestElement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<About>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub extra: IndexMap<String, JsonValue>,
}

pub(crate) fn parse_outputs(node: &MarkedNode) -> ParseResult<ConditionalList<Output>> {
    parse_conditional_list_or_item_with_converter(node, "outputs", &OutputConverter)
}

pub(crate) struct OutputConverter;

impl NodeConverter<Output> for OutputConverter {
    fn convert(&self, node: &MarkedNode, _field: &str) -> ParseResult<Output> {
        parse_output(node)
    }

    // Outputs are mappings; a scalar here is an error, not a template.
    fn is_template(&self, _text: &str) -> bool {
        false
    }
}

fn parse_output(node: &MarkedNode) -> ParseResult<Output> {
    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;

    validate_mapping_fields(mapping, "outputs", OUTPUT_FIELDS)?;

    let package = match mapping.get("package") {
        Some(package) if !is_null(package) => {
            Some(parse_package_identifier(package, "outputs.package")?)
        }
        _ => None,
    };
    let source = match mapping.get("source") {
        Some(source) if !is_null(source) => parse_sources(source)?,
        _ => ConditionalList::default(),
    };
    let build = match mapping.get("build") {
        Some(build) if !is_null(build) => Some(parse_output_build(build)?),
        _ => None,
    };
    let requirements = match mapping.get("requirements") {
        Some(requirements) if !is_null(requirements) => Some(parse_requirements(requirements)?),
        _ => None,
    };
    let tests = parse_tests_with_alias(node)?;
    let about = match mapping.get("about") {
        Some(about) if !is_null(about) => Some(parse_about(about)?),
        _ => None,
    };
    let extra = match mapping.get("extra") {
        Some(extra) if !is_null(extra) => parse_extra(extra)?,
        _ => IndexMap::new(),
    };

    Ok(Output {
        package,
        source,
        build,
        requirements,
        tests,
        about,
        extra,
    })
}

/// Read `tests`, accepting the deprecated `test` spelling with a warning.
/// The canonical key wins when both are present.
pub(crate) fn parse_tests_with_alias(
    node: &MarkedNode,
) -> ParseResult<ConditionalList<TestElement>> {
    let mapping = node.as_mapping().expect("checked by caller");

    if let Some(tests) = mapping.get("tests") {
        if !is_null(tests) {
            return parse_tests(tests);
        }
    }
    match mapping.get("test") {
        Some(tests) if !is_null(tests) => {
            tracing::warn!("`test` is deprecated, use `tests`");
            parse_tests(tests)
        }
        _ => Ok(ConditionalList::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> ParseResult<ConditionalList<Output>> {
        let node = recipe_schema_yaml::parse_yaml(yaml).unwrap();
        let outputs = node.as_mapping().unwrap().get("outputs").unwrap();
        parse_outputs(outputs)
    }

    fn first_output(outputs: &ConditionalList<Output>) -> &Output {
        match outputs.iter().next().and_then(|i| i.as_value()?.as_concrete()) {
            Some(output) => output,
            None => panic!("expected a concrete output"),
        }
    }

    #[test]
    fn test_parse_outputs() {
        let outputs = parse(
            r#"
outputs:
  - package:
      name: libfoo
    requirements:
      run:
        - libstdcxx
  - package:
      name: foo
      version: 2.0.0
    build:
      cache_from:
        - libfoo
"#,
        )
        .unwrap();
        assert_eq!(outputs.len(), 2);
        let first = first_output(&outputs);
        assert!(first.package.as_ref().unwrap().version.is_none());
        assert!(first.requirements.is_some());
    }

    #[test]
    fn test_conditional_output() {
        let outputs = parse(
            r#"
outputs:
  - if: linux
    then:
      package:
        name: foo-cuda
"#,
        )
        .unwrap();
        assert!(outputs.iter().next().unwrap().is_conditional());
    }

    #[test]
    fn test_output_test_alias() {
        let outputs = parse(
            r#"
outputs:
  - package:
      name: foo
    test:
      - python:
          imports: [foo]
"#,
        )
        .unwrap();
        assert_eq!(first_output(&outputs).tests.len(), 1);
    }

    #[test]
    fn test_unknown_output_field_rejected() {
        let err = parse(
            r#"
outputs:
  - package:
      name: foo
    script: build.sh
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::UnrecognizedField { .. }));
    }
}
