//! The `build` section and its nested option blocks

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use marked_yaml::Node as MarkedNode;
use recipe_schema_yaml::{
    ConditionalList, Expression, NonEmptyStr, ParseError, ParseMapping, ParseNode, ParseResult,
    RelativePath, Value, get_span, is_conditional, is_null, node_kind,
    parse_conditional_list_or_item, validate_mapping_fields,
};
use serde::Serialize;

pub const BUILD_FIELDS: &[&str] = &[
    "number",
    "string",
    "skip",
    "script",
    "noarch",
    "merge_build_and_host_envs",
    "always_include_files",
    "always_copy_files",
    "variant",
    "python",
    "dynamic_linking",
    "link_options",
    "prefix_detection",
    "files",
];
pub const OUTPUT_BUILD_FIELDS: &[&str] = &[
    "number",
    "string",
    "skip",
    "script",
    "noarch",
    "merge_build_and_host_envs",
    "always_include_files",
    "always_copy_files",
    "variant",
    "python",
    "dynamic_linking",
    "link_options",
    "prefix_detection",
    "files",
    "cache_only",
    "cache_from",
];
pub const SCRIPT_FIELDS: &[&str] = &["interpreter", "env", "secrets", "content", "file"];
pub const VARIANT_HINTS_FIELDS: &[&str] = &["use_keys", "ignore_keys", "down_prioritize_variant"];
pub const PYTHON_BUILD_FIELDS: &[&str] = &[
    "entry_points",
    "use_python_app_entrypoint",
    "preserve_egg_dir",
    "skip_pyc_compilation",
    "disable_pip",
];
pub const DYNAMIC_LINKING_FIELDS: &[&str] = &[
    "rpaths",
    "binary_relocation",
    "missing_dso_allowlist",
    "rpath_allowlist",
    "overdepending_behavior",
    "overlinking_behavior",
];
pub const LINK_OPTIONS_FIELDS: &[&str] =
    &["post_link_script", "pre_unlink_script", "pre_link_message"];
pub const PREFIX_DETECTION_FIELDS: &[&str] = &["force_file_type", "ignore", "ignore_binary_files"];
pub const FORCE_FILE_TYPE_FIELDS: &[&str] = &["text", "binary"];
pub const GLOB_FILTER_FIELDS: &[&str] = &["include", "exclude"];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Build {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<Value<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string: Option<Value<NonEmptyStr>>,
    /// Conditions under which the build is skipped entirely; expression
    /// text is carried opaque, `true`/`false` literals included
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub skip: ConditionalList<Expression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<Script>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noarch: Option<Value<NoArchKind>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_build_and_host_envs: Option<Value<bool>>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub always_include_files: ConditionalList<NonEmptyStr>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub always_copy_files: ConditionalList<NonEmptyStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<VariantHints>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python: Option<PythonBuild>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic_linking: Option<DynamicLinking>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_options: Option<LinkOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_detection: Option<PrefixDetection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<GlobSelect>,
}

/// The `build` section of a multi-output output, which can additionally
/// interact with the build cache
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputBuild {
    #[serde(flatten)]
    pub build: Build,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_only: Option<Value<bool>>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub cache_from: ConditionalList<NonEmptyStr>,
}

/// Target architecture handling of the produced package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoArchKind {
    Generic,
    Python,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("expected `generic` or `python`, got `{0}`")]
pub struct NoArchKindError(String);

impl FromStr for NoArchKind {
    type Err = NoArchKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generic" => Ok(Self::Generic),
            "python" => Ok(Self::Python),
            other => Err(NoArchKindError(other.to_string())),
        }
    }
}

impl fmt::Display for NoArchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic => write!(f, "generic"),
            Self::Python => write!(f, "python"),
        }
    }
}

/// What to do when a linking check trips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkingCheckBehavior {
    Ignore,
    Error,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("expected `ignore` or `error`, got `{0}`")]
pub struct LinkingCheckBehaviorError(String);

impl FromStr for LinkingCheckBehavior {
    type Err = LinkingCheckBehaviorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ignore" => Ok(Self::Ignore),
            "error" => Ok(Self::Error),
            other => Err(LinkingCheckBehaviorError(other.to_string())),
        }
    }
}

impl fmt::Display for LinkingCheckBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignore => write!(f, "ignore"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A build or test script.
///
/// The wire format allows a plain string or a list of lines as shorthand;
/// both normalize into `content`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Script {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<Value<NonEmptyStr>>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub env: IndexMap<String, Value<String>>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub secrets: ConditionalList<NonEmptyStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ConditionalList<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<Value<RelativePath>>,
}

/// A plain glob list, or an include/exclude filter pair
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GlobSelect {
    Globs(ConditionalList<NonEmptyStr>),
    Filter(GlobFilter),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobFilter {
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub include: ConditionalList<NonEmptyStr>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub exclude: ConditionalList<NonEmptyStr>,
}

/// A blanket boolean toggle, or a glob list narrowing the toggle to
/// matching files
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BoolOrGlobs {
    Bool(Value<bool>),
    Globs(ConditionalList<NonEmptyStr>),
}

/// Hints for the variant computation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VariantHints {
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub use_keys: ConditionalList<NonEmptyStr>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub ignore_keys: ConditionalList<NonEmptyStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub down_prioritize_variant: Option<Value<i64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PythonBuild {
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub entry_points: ConditionalList<NonEmptyStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_python_app_entrypoint: Option<Value<bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preserve_egg_dir: Option<Value<bool>>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub skip_pyc_compilation: ConditionalList<NonEmptyStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_pip: Option<Value<bool>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DynamicLinking {
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub rpaths: ConditionalList<NonEmptyStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary_relocation: Option<BoolOrGlobs>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub missing_dso_allowlist: ConditionalList<NonEmptyStr>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub rpath_allowlist: ConditionalList<NonEmptyStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overdepending_behavior: Option<Value<LinkingCheckBehavior>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlinking_behavior: Option<Value<LinkingCheckBehavior>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_link_script: Option<Value<NonEmptyStr>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_unlink_script: Option<Value<NonEmptyStr>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_link_message: Option<Value<NonEmptyStr>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PrefixDetection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_file_type: Option<ForceFileType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore: Option<BoolOrGlobs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_binary_files: Option<BoolOrGlobs>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ForceFileType {
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub text: ConditionalList<NonEmptyStr>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub binary: ConditionalList<NonEmptyStr>,
}

pub(crate) fn parse_build(node: &MarkedNode) -> ParseResult<Build> {
    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;
    validate_mapping_fields(mapping, "build", BUILD_FIELDS)?;
    parse_build_fields(node)
}

pub(crate) fn parse_output_build(node: &MarkedNode) -> ParseResult<OutputBuild> {
    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;
    validate_mapping_fields(mapping, "build", OUTPUT_BUILD_FIELDS)?;

    Ok(OutputBuild {
        build: parse_build_fields(node)?,
        cache_only: node.try_get_value("cache_only")?,
        cache_from: node
            .try_get_conditional_list_or_item("cache_from")?
            .unwrap_or_default(),
    })
}

/// Field closure is validated by the caller, which knows whether the cache
/// keys are in scope.
fn parse_build_fields(node: &MarkedNode) -> ParseResult<Build> {
    let mapping = node.as_mapping().expect("checked by caller");

    let script = match mapping.get("script") {
        Some(script) if !is_null(script) => Some(parse_script(script, "build.script")?),
        _ => None,
    };
    let variant = match mapping.get("variant") {
        Some(variant) if !is_null(variant) => Some(parse_variant_hints(variant)?),
        _ => None,
    };
    let python = match mapping.get("python") {
        Some(python) if !is_null(python) => Some(parse_python_build(python)?),
        _ => None,
    };
    let dynamic_linking = match mapping.get("dynamic_linking") {
        Some(linking) if !is_null(linking) => Some(parse_dynamic_linking(linking)?),
        _ => None,
    };
    let link_options = match mapping.get("link_options") {
        Some(options) if !is_null(options) => Some(parse_link_options(options)?),
        _ => None,
    };
    let prefix_detection = match mapping.get("prefix_detection") {
        Some(detection) if !is_null(detection) => Some(parse_prefix_detection(detection)?),
        _ => None,
    };
    let files = match mapping.get("files") {
        Some(files) if !is_null(files) => Some(parse_glob_select(files, "build.files")?),
        _ => None,
    };

    Ok(Build {
        number: node.try_get_value("number")?,
        string: node.try_get_value("string")?,
        skip: node
            .try_get_conditional_list_or_item("skip")?
            .unwrap_or_default(),
        script,
        noarch: node.try_get_value("noarch")?,
        merge_build_and_host_envs: node.try_get_value("merge_build_and_host_envs")?,
        always_include_files: node
            .try_get_conditional_list_or_item("always_include_files")?
            .unwrap_or_default(),
        always_copy_files: node
            .try_get_conditional_list_or_item("always_copy_files")?
            .unwrap_or_default(),
        variant,
        python,
        dynamic_linking,
        link_options,
        prefix_detection,
        files,
    })
}

/// Parse a script in any of its three spellings: a command string, a list
/// of lines, or the structured mapping.
pub(crate) fn parse_script(node: &MarkedNode, section: &str) -> ParseResult<Script> {
    if node.as_scalar().is_some() || node.as_sequence().is_some() {
        let content = node.parse_conditional_list_or_item(section)?;
        return Ok(Script {
            content: Some(content),
            ..Script::default()
        });
    }

    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;
    validate_mapping_fields(mapping, section, SCRIPT_FIELDS)?;

    let content = match mapping.get("content") {
        Some(content) if !is_null(content) => {
            Some(content.parse_conditional_list_or_item(&format!("{section}.content"))?)
        }
        _ => None,
    };
    let file: Option<Value<RelativePath>> = node.try_get_value("file")?;

    match (&content, &file) {
        (Some(_), Some(_)) => {
            return Err(ParseError::no_matching_alternative(
                section,
                "`content` and `file` are mutually exclusive",
                get_span(node),
            ));
        }
        (None, None) => {
            return Err(ParseError::no_matching_alternative(
                section,
                "expected one of `content` or `file`",
                get_span(node),
            ));
        }
        _ => {}
    }

    Ok(Script {
        interpreter: node.try_get_value("interpreter")?,
        env: parse_env(node, section)?,
        secrets: node
            .try_get_conditional_list_or_item("secrets")?
            .unwrap_or_default(),
        content,
        file,
    })
}

fn parse_env(node: &MarkedNode, section: &str) -> ParseResult<IndexMap<String, Value<String>>> {
    let mapping = node.as_mapping().expect("checked by parse_script");
    let mut env = IndexMap::new();
    let Some(env_node) = mapping.get("env").filter(|node| !is_null(node)) else {
        return Ok(env);
    };
    let env_mapping = env_node.as_mapping().ok_or_else(|| {
        ParseError::expected_type("mapping", node_kind(env_node), get_span(env_node))
    })?;
    for (key, value) in env_mapping.iter() {
        let parsed = value.parse_value(&format!("{section}.env.{}", key.as_str()))?;
        env.insert(key.as_str().to_string(), parsed);
    }
    Ok(env)
}

fn parse_variant_hints(node: &MarkedNode) -> ParseResult<VariantHints> {
    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;
    validate_mapping_fields(mapping, "build.variant", VARIANT_HINTS_FIELDS)?;

    Ok(VariantHints {
        use_keys: node
            .try_get_conditional_list_or_item("use_keys")?
            .unwrap_or_default(),
        ignore_keys: node
            .try_get_conditional_list_or_item("ignore_keys")?
            .unwrap_or_default(),
        down_prioritize_variant: node.try_get_value("down_prioritize_variant")?,
    })
}

fn parse_python_build(node: &MarkedNode) -> ParseResult<PythonBuild> {
    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;
    validate_mapping_fields(mapping, "build.python", PYTHON_BUILD_FIELDS)?;

    Ok(PythonBuild {
        entry_points: node
            .try_get_conditional_list_or_item("entry_points")?
            .unwrap_or_default(),
        use_python_app_entrypoint: node.try_get_value("use_python_app_entrypoint")?,
        preserve_egg_dir: node.try_get_value("preserve_egg_dir")?,
        skip_pyc_compilation: node
            .try_get_conditional_list_or_item("skip_pyc_compilation")?
            .unwrap_or_default(),
        disable_pip: node.try_get_value("disable_pip")?,
    })
}

fn parse_dynamic_linking(node: &MarkedNode) -> ParseResult<DynamicLinking> {
    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;
    validate_mapping_fields(mapping, "build.dynamic_linking", DYNAMIC_LINKING_FIELDS)?;

    let binary_relocation = match mapping.get("binary_relocation") {
        Some(relocation) if !is_null(relocation) => Some(parse_bool_or_globs(
            relocation,
            "dynamic_linking.binary_relocation",
        )?),
        _ => None,
    };

    Ok(DynamicLinking {
        rpaths: node
            .try_get_conditional_list_or_item("rpaths")?
            .unwrap_or_default(),
        binary_relocation,
        missing_dso_allowlist: node
            .try_get_conditional_list_or_item("missing_dso_allowlist")?
            .unwrap_or_default(),
        rpath_allowlist: node
            .try_get_conditional_list_or_item("rpath_allowlist")?
            .unwrap_or_default(),
        overdepending_behavior: node.try_get_value("overdepending_behavior")?,
        overlinking_behavior: node.try_get_value("overlinking_behavior")?,
    })
}

fn parse_link_options(node: &MarkedNode) -> ParseResult<LinkOptions> {
    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;
    validate_mapping_fields(mapping, "build.link_options", LINK_OPTIONS_FIELDS)?;

    Ok(LinkOptions {
        post_link_script: node.try_get_value("post_link_script")?,
        pre_unlink_script: node.try_get_value("pre_unlink_script")?,
        pre_link_message: node.try_get_value("pre_link_message")?,
    })
}

fn parse_prefix_detection(node: &MarkedNode) -> ParseResult<PrefixDetection> {
    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;
    validate_mapping_fields(mapping, "build.prefix_detection", PREFIX_DETECTION_FIELDS)?;

    let force_file_type = match mapping.get("force_file_type") {
        Some(force) if !is_null(force) => Some(parse_force_file_type(force)?),
        _ => None,
    };
    let ignore = match mapping.get("ignore") {
        Some(ignore) if !is_null(ignore) => {
            Some(parse_bool_or_globs(ignore, "prefix_detection.ignore")?)
        }
        _ => None,
    };
    let ignore_binary_files = match mapping.get("ignore_binary_files") {
        Some(ignore) if !is_null(ignore) => Some(parse_bool_or_globs(
            ignore,
            "prefix_detection.ignore_binary_files",
        )?),
        _ => None,
    };

    Ok(PrefixDetection {
        force_file_type,
        ignore,
        ignore_binary_files,
    })
}

fn parse_force_file_type(node: &MarkedNode) -> ParseResult<ForceFileType> {
    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;
    validate_mapping_fields(
        mapping,
        "build.prefix_detection.force_file_type",
        FORCE_FILE_TYPE_FIELDS,
    )?;

    Ok(ForceFileType {
        text: node
            .try_get_conditional_list_or_item("text")?
            .unwrap_or_default(),
        binary: node
            .try_get_conditional_list_or_item("binary")?
            .unwrap_or_default(),
    })
}

pub(crate) fn parse_glob_select(node: &MarkedNode, section: &str) -> ParseResult<GlobSelect> {
    match node.as_mapping() {
        Some(mapping) if !is_conditional(node) => {
            validate_mapping_fields(mapping, section, GLOB_FILTER_FIELDS)?;
            Ok(GlobSelect::Filter(GlobFilter {
                include: node
                    .try_get_conditional_list_or_item("include")?
                    .unwrap_or_default(),
                exclude: node
                    .try_get_conditional_list_or_item("exclude")?
                    .unwrap_or_default(),
            }))
        }
        _ => Ok(GlobSelect::Globs(parse_conditional_list_or_item(
            node, section,
        )?)),
    }
}

fn parse_bool_or_globs(node: &MarkedNode, field: &str) -> ParseResult<BoolOrGlobs> {
    if node.as_sequence().is_some() || is_conditional(node) {
        Ok(BoolOrGlobs::Globs(parse_conditional_list_or_item(
            node, field,
        )?))
    } else {
        Ok(BoolOrGlobs::Bool(node.parse_value(field)?))
    }
}
