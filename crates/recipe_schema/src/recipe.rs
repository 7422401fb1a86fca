//! The top-level recipe document: single-output or multi-output, resolved
//! by the presence of the `outputs` key.

use std::ops::RangeInclusive;

use indexmap::IndexMap;
use marked_yaml::Node as MarkedNode;
use recipe_schema_yaml::{
    ConditionalList, ParseError, ParseResult, Value, get_span, is_null, node_kind, parse_yaml,
};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::about::{About, parse_about};
use crate::build::{Build, parse_build};
use crate::extra::parse_extra;
use crate::output::{Output, parse_outputs, parse_tests_with_alias};
use crate::package::{Package, PackageIdentifier, parse_package, parse_package_identifier};
use crate::requirements::{Requirements, parse_requirements};
use crate::source::{Source, parse_sources};
use crate::test_elements::TestElement;

/// Declared versions this validator understands
pub const SUPPORTED_SCHEMA_VERSIONS: RangeInclusive<u64> = 1..=1;

/// `test` is the deprecated spelling of `tests`
pub const SIMPLE_RECIPE_FIELDS: &[&str] = &[
    "schema_version",
    "context",
    "package",
    "source",
    "build",
    "requirements",
    "tests",
    "test",
    "about",
    "extra",
];
pub const COMPLEX_RECIPE_FIELDS: &[&str] = &[
    "schema_version",
    "context",
    "recipe",
    "source",
    "build",
    "outputs",
    "about",
    "extra",
];

/// A validated recipe document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Recipe {
    Simple(SimpleRecipe),
    Complex(ComplexRecipe),
}

impl Recipe {
    pub fn schema_version(&self) -> u64 {
        match self {
            Recipe::Simple(recipe) => recipe.schema_version,
            Recipe::Complex(recipe) => recipe.schema_version,
        }
    }

    pub fn context(&self) -> &IndexMap<String, Value<String>> {
        match self {
            Recipe::Simple(recipe) => &recipe.context,
            Recipe::Complex(recipe) => &recipe.context,
        }
    }
}

/// A recipe producing exactly one package
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleRecipe {
    pub schema_version: u64,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub context: IndexMap<String, Value<String>>,
    pub package: Package,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub source: ConditionalList<Source>,
    pub build: Build,
    pub requirements: Requirements,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub tests: ConditionalList<TestElement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<About>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub extra: IndexMap<String, JsonValue>,
}

/// A recipe producing several packages from one build
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexRecipe {
    pub schema_version: u64,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub context: IndexMap<String, Value<String>>,
    /// Name/version defaults shared by the outputs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe: Option<PackageIdentifier>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub source: ConditionalList<Source>,
    pub build: Build,
    pub outputs: ConditionalList<Output>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<About>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub extra: IndexMap<String, JsonValue>,
}

/// Validate a document tree into a typed [`Recipe`].
///
/// Errors are accumulated across top-level sections, so one pass reports
/// a bad `source` entry and a bad `build` script together. Any error
/// rejects the whole document.
pub fn validate(node: &MarkedNode) -> Result<Recipe, Vec<ParseError>> {
    let Some(mapping) = node.as_mapping() else {
        return Err(vec![ParseError::expected_type(
            "mapping",
            node_kind(node),
            get_span(node),
        )]);
    };

    if mapping.contains_key("outputs") {
        validate_complex(node)
    } else {
        validate_simple(node)
    }
}

/// Parse raw text and validate it
pub fn validate_from_source(source: &str) -> Result<Recipe, Vec<ParseError>> {
    let node = parse_yaml(source).map_err(|error| vec![error])?;
    validate(&node)
}

fn accumulate<T>(errors: &mut Vec<ParseError>, result: ParseResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            errors.push(error);
            None
        }
    }
}

fn check_fields(
    node: &MarkedNode,
    section: &str,
    valid_fields: &[&str],
    errors: &mut Vec<ParseError>,
) {
    let mapping = node.as_mapping().expect("checked by validate");
    for (key, _) in mapping.iter() {
        if !valid_fields.contains(&key.as_str()) {
            let error =
                ParseError::unrecognized_field(section, key.as_str(), *key.span()).with_suggestion(
                    format!("valid fields are: {}", valid_fields.join(", ")),
                );
            errors.push(error);
        }
    }
}

fn parse_schema_version(node: &MarkedNode) -> ParseResult<u64> {
    let scalar = node
        .as_scalar()
        .ok_or_else(|| ParseError::expected_type("scalar", node_kind(node), get_span(node)))?;
    let version: u64 = scalar
        .as_str()
        .parse()
        .map_err(|_| ParseError::schema_version_unsupported(scalar.as_str(), *scalar.span()))?;
    if !SUPPORTED_SCHEMA_VERSIONS.contains(&version) {
        return Err(ParseError::schema_version_unsupported(
            version.to_string(),
            *scalar.span(),
        ));
    }
    Ok(version)
}

fn parse_context(node: &MarkedNode) -> ParseResult<IndexMap<String, Value<String>>> {
    use recipe_schema_yaml::ParseNode;

    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;

    let mut context = IndexMap::new();
    for (key, value) in mapping.iter() {
        let parsed = value.parse_value(&format!("context.{}", key.as_str()))?;
        context.insert(key.as_str().to_string(), parsed);
    }
    Ok(context)
}

/// The fields shared by both recipe kinds
struct CommonSections {
    schema_version: u64,
    context: IndexMap<String, Value<String>>,
    source: ConditionalList<Source>,
    build: Build,
    about: Option<About>,
    extra: IndexMap<String, JsonValue>,
}

fn parse_common_sections(node: &MarkedNode, errors: &mut Vec<ParseError>) -> CommonSections {
    let mapping = node.as_mapping().expect("checked by validate");

    let schema_version = match mapping.get("schema_version") {
        Some(version) if !is_null(version) => {
            accumulate(errors, parse_schema_version(version)).unwrap_or(1)
        }
        _ => 1,
    };
    let context = match mapping.get("context") {
        Some(context) if !is_null(context) => {
            accumulate(errors, parse_context(context)).unwrap_or_default()
        }
        _ => IndexMap::new(),
    };
    let source = match mapping.get("source") {
        Some(source) if !is_null(source) => {
            accumulate(errors, parse_sources(source)).unwrap_or_default()
        }
        _ => ConditionalList::default(),
    };
    let build = match mapping.get("build") {
        Some(build) if !is_null(build) => {
            accumulate(errors, parse_build(build)).unwrap_or_default()
        }
        _ => Build::default(),
    };
    let about = match mapping.get("about") {
        Some(about) if !is_null(about) => accumulate(errors, parse_about(about)),
        _ => None,
    };
    let extra = match mapping.get("extra") {
        Some(extra) if !is_null(extra) => {
            accumulate(errors, parse_extra(extra)).unwrap_or_default()
        }
        _ => IndexMap::new(),
    };

    CommonSections {
        schema_version,
        context,
        source,
        build,
        about,
        extra,
    }
}

fn validate_simple(node: &MarkedNode) -> Result<Recipe, Vec<ParseError>> {
    let mapping = node.as_mapping().expect("checked by validate");
    let mut errors = Vec::new();

    check_fields(node, "recipe", SIMPLE_RECIPE_FIELDS, &mut errors);
    let common = parse_common_sections(node, &mut errors);

    let package = match mapping.get("package") {
        Some(package) => accumulate(&mut errors, parse_package(package)),
        None => {
            errors.push(ParseError::missing_field("package", get_span(node)));
            None
        }
    };
    let requirements = match mapping.get("requirements") {
        Some(requirements) if !is_null(requirements) => {
            accumulate(&mut errors, parse_requirements(requirements)).unwrap_or_default()
        }
        _ => Requirements::default(),
    };
    let tests = accumulate(&mut errors, parse_tests_with_alias(node)).unwrap_or_default();

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(Recipe::Simple(SimpleRecipe {
        schema_version: common.schema_version,
        context: common.context,
        package: package.expect("no errors recorded"),
        source: common.source,
        build: common.build,
        requirements,
        tests,
        about: common.about,
        extra: common.extra,
    }))
}

fn validate_complex(node: &MarkedNode) -> Result<Recipe, Vec<ParseError>> {
    let mapping = node.as_mapping().expect("checked by validate");
    let mut errors = Vec::new();

    // Closure check first; a `package` section here is the one mistake
    // worth a targeted hint, since it means the author mixed the two
    // recipe kinds.
    for (key, _) in mapping.iter() {
        if key.as_str() == "package" {
            errors.push(
                ParseError::unrecognized_field("recipe", "package", *key.span()).with_suggestion(
                    "a multi-output recipe declares shared name/version under `recipe`, \
                     not `package`",
                ),
            );
        } else if !COMPLEX_RECIPE_FIELDS.contains(&key.as_str()) {
            errors.push(
                ParseError::unrecognized_field("recipe", key.as_str(), *key.span())
                    .with_suggestion(format!(
                        "valid fields are: {}",
                        COMPLEX_RECIPE_FIELDS.join(", ")
                    )),
            );
        }
    }

    let common = parse_common_sections(node, &mut errors);

    let recipe = match mapping.get("recipe") {
        Some(recipe) if !is_null(recipe) => {
            accumulate(&mut errors, parse_package_identifier(recipe, "recipe"))
        }
        _ => None,
    };
    let outputs = match mapping.get("outputs") {
        Some(outputs) if !is_null(outputs) => {
            accumulate(&mut errors, parse_outputs(outputs)).unwrap_or_default()
        }
        _ => {
            errors.push(ParseError::missing_field("outputs", get_span(node)));
            ConditionalList::default()
        }
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(Recipe::Complex(ComplexRecipe {
        schema_version: common.schema_version,
        context: common.context,
        recipe,
        source: common.source,
        build: common.build,
        outputs,
        about: common.about,
        extra: common.extra,
    }))
}
