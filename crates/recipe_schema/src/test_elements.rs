//! The `tests` section: a list of test elements, each a discriminated
//! union resolved by its marker key

use marked_yaml::Node as MarkedNode;
use recipe_schema_yaml::{
    ConditionalList, MatchSpec, NodeConverter, NonEmptyStr, ParseError, ParseMapping, ParseResult,
    Value, get_span, is_null, node_kind, parse_conditional_list_or_item_with_converter,
    validate_mapping_fields,
};
use serde::Serialize;

use crate::build::{Script, parse_script};

/// The keys that select a test element variant
pub const TEST_MARKER_KEYS: &[&str] = &["script", "python", "downstream", "package_contents"];

pub const SCRIPT_TEST_FIELDS: &[&str] = &["script", "requirements", "files"];
pub const TEST_REQUIREMENTS_FIELDS: &[&str] = &["build", "run"];
pub const TEST_FILES_FIELDS: &[&str] = &["source", "recipe"];
pub const PYTHON_TEST_FIELDS: &[&str] = &["imports", "pip_check"];
pub const DOWNSTREAM_TEST_FIELDS: &[&str] = &["downstream"];
pub const PACKAGE_CONTENTS_TEST_FIELDS: &[&str] =
    &["files", "include", "site_packages", "bin", "lib"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TestElement {
    Script(ScriptTest),
    Python(PythonTest),
    Downstream(DownstreamTest),
    PackageContents(PackageContentsTest),
}

/// Run a command against the installed package
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptTest {
    pub script: Script,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<TestRequirements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<TestFiles>,
}

/// Extra dependencies installed into the test environments
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TestRequirements {
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub build: ConditionalList<MatchSpec>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub run: ConditionalList<MatchSpec>,
}

/// Files copied into the test working directory
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TestFiles {
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub source: ConditionalList<NonEmptyStr>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub recipe: ConditionalList<NonEmptyStr>,
}

/// Import the listed modules and optionally run `pip check`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PythonTest {
    pub python: PythonTestInner,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PythonTestInner {
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub imports: ConditionalList<NonEmptyStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pip_check: Option<Value<bool>>,
}

/// Build a downstream package against this one
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownstreamTest {
    pub downstream: Value<MatchSpec>,
}

/// Assert on the file layout of the produced package
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageContentsTest {
    pub package_contents: PackageContentsTestInner,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PackageContentsTestInner {
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub files: ConditionalList<NonEmptyStr>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub include: ConditionalList<NonEmptyStr>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub site_packages: ConditionalList<NonEmptyStr>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub bin: ConditionalList<NonEmptyStr>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub lib: ConditionalList<NonEmptyStr>,
}

pub(crate) fn parse_tests(node: &MarkedNode) -> ParseResult<ConditionalList<TestElement>> {
    parse_conditional_list_or_item_with_converter(node, "tests", &TestElementConverter)
}

pub(crate) struct TestElementConverter;

impl NodeConverter<TestElement> for TestElementConverter {
    fn convert(&self, node: &MarkedNode, _field: &str) -> ParseResult<TestElement> {
        parse_test_element(node)
    }

    // Test elements are mappings; a scalar here is an error, not a template.
    fn is_template(&self, _text: &str) -> bool {
        false
    }
}

fn parse_test_element(node: &MarkedNode) -> ParseResult<TestElement> {
    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;

    // a null-valued marker key selects nothing
    let markers: Vec<&str> = TEST_MARKER_KEYS
        .iter()
        .copied()
        .filter(|key| mapping.get(*key).is_some_and(|value| !is_null(value)))
        .collect();

    match markers.as_slice() {
        ["script"] => parse_script_test(node).map(TestElement::Script),
        ["python"] => parse_python_test(node).map(TestElement::Python),
        ["downstream"] => parse_downstream_test(node).map(TestElement::Downstream),
        ["package_contents"] => parse_package_contents_test(node).map(TestElement::PackageContents),
        [] => Err(ParseError::no_matching_alternative(
            "tests",
            "expected one of the keys `script`, `python`, `downstream` or `package_contents`",
            get_span(node),
        )),
        keys => Err(ParseError::no_matching_alternative(
            "tests",
            format!(
                "the keys {} select conflicting test types; only one may be present",
                keys.iter()
                    .map(|k| format!("`{k}`"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            get_span(node),
        )),
    }
}

fn parse_script_test(node: &MarkedNode) -> ParseResult<ScriptTest> {
    let mapping = node.as_mapping().expect("checked by parse_test_element");
    validate_mapping_fields(mapping, "tests", SCRIPT_TEST_FIELDS)?;

    let script_node = mapping.get("script").expect("marker key present");
    let script = parse_script(script_node, "tests.script")?;

    let requirements = match mapping.get("requirements") {
        Some(requirements) if !is_null(requirements) => {
            Some(parse_test_requirements(requirements)?)
        }
        _ => None,
    };
    let files = match mapping.get("files") {
        Some(files) if !is_null(files) => Some(parse_test_files(files)?),
        _ => None,
    };

    Ok(ScriptTest {
        script,
        requirements,
        files,
    })
}

fn parse_test_requirements(node: &MarkedNode) -> ParseResult<TestRequirements> {
    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;
    validate_mapping_fields(mapping, "tests.requirements", TEST_REQUIREMENTS_FIELDS)?;

    Ok(TestRequirements {
        build: node
            .try_get_conditional_list_or_item("build")?
            .unwrap_or_default(),
        run: node
            .try_get_conditional_list_or_item("run")?
            .unwrap_or_default(),
    })
}

fn parse_test_files(node: &MarkedNode) -> ParseResult<TestFiles> {
    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;
    validate_mapping_fields(mapping, "tests.files", TEST_FILES_FIELDS)?;

    Ok(TestFiles {
        source: node
            .try_get_conditional_list_or_item("source")?
            .unwrap_or_default(),
        recipe: node
            .try_get_conditional_list_or_item("recipe")?
            .unwrap_or_default(),
    })
}

fn parse_python_test(node: &MarkedNode) -> ParseResult<PythonTest> {
    let mapping = node.as_mapping().expect("checked by parse_test_element");
    validate_mapping_fields(mapping, "tests", &["python"])?;

    let python_node = mapping.get("python").expect("marker key present");
    let python_mapping = python_node.as_mapping().ok_or_else(|| {
        ParseError::expected_type("mapping", node_kind(python_node), get_span(python_node))
    })?;
    validate_mapping_fields(python_mapping, "tests.python", PYTHON_TEST_FIELDS)?;

    Ok(PythonTest {
        python: PythonTestInner {
            imports: python_node
                .try_get_conditional_list_or_item("imports")?
                .unwrap_or_default(),
            pip_check: python_node.try_get_value("pip_check")?,
        },
    })
}

fn parse_downstream_test(node: &MarkedNode) -> ParseResult<DownstreamTest> {
    let mapping = node.as_mapping().expect("checked by parse_test_element");
    validate_mapping_fields(mapping, "tests", DOWNSTREAM_TEST_FIELDS)?;

    let downstream = node
        .try_get_value("downstream")?
        .ok_or_else(|| ParseError::missing_field("tests.downstream", get_span(node)))?;

    Ok(DownstreamTest { downstream })
}

fn parse_package_contents_test(node: &MarkedNode) -> ParseResult<PackageContentsTest> {
    let mapping = node.as_mapping().expect("checked by parse_test_element");
    validate_mapping_fields(mapping, "tests", &["package_contents"])?;

    let contents_node = mapping.get("package_contents").expect("marker key present");
    let contents_mapping = contents_node.as_mapping().ok_or_else(|| {
        ParseError::expected_type("mapping", node_kind(contents_node), get_span(contents_node))
    })?;
    validate_mapping_fields(
        contents_mapping,
        "tests.package_contents",
        PACKAGE_CONTENTS_TEST_FIELDS,
    )?;

    Ok(PackageContentsTest {
        package_contents: PackageContentsTestInner {
            files: contents_node
                .try_get_conditional_list_or_item("files")?
                .unwrap_or_default(),
            include: contents_node
                .try_get_conditional_list_or_item("include")?
                .unwrap_or_default(),
            site_packages: contents_node
                .try_get_conditional_list_or_item("site_packages")?
                .unwrap_or_default(),
            bin: contents_node
                .try_get_conditional_list_or_item("bin")?
                .unwrap_or_default(),
            lib: contents_node
                .try_get_conditional_list_or_item("lib")?
                .unwrap_or_default(),
        },
    })
}
