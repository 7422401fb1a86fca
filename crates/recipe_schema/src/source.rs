//! The `source` section: url, git and path sources

use marked_yaml::Node as MarkedNode;
use recipe_schema_yaml::{
    ConditionalList, ListOrItem, Md5Hex, NodeConverter, NonEmptyStr, ParseError, ParseMapping,
    ParseNode, ParseResult, RelativePath, Sha256Hex, SourceUrl, Value, get_span, node_kind,
    parse_conditional_list_or_item_with_converter, parse_list_or_item, validate_mapping_fields,
};
use serde::Serialize;

use crate::about::HttpUrl;

/// `folder` is the deprecated spelling of `target_directory`. It stays in
/// the accepted field set so old recipes keep validating, with a warning.
pub const URL_SOURCE_FIELDS: &[&str] = &[
    "url",
    "sha256",
    "md5",
    "file_name",
    "patches",
    "target_directory",
    "folder",
];
pub const GIT_SOURCE_FIELDS: &[&str] = &[
    "git",
    "rev",
    "tag",
    "branch",
    "depth",
    "lfs",
    "patches",
    "target_directory",
    "folder",
];
pub const PATH_SOURCE_FIELDS: &[&str] = &[
    "path",
    "sha256",
    "md5",
    "use_gitignore",
    "file_name",
    "patches",
    "target_directory",
    "folder",
];

/// A single source entry, discriminated by the `url`, `git` or `path` key
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Source {
    Url(UrlSource),
    Git(GitSource),
    Path(PathSource),
}

/// An archive fetched over HTTP, with optional mirror URLs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlSource {
    pub url: ListOrItem<Value<HttpUrl>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<Value<Sha256Hex>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md5: Option<Value<Md5Hex>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<Value<NonEmptyStr>>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub patches: ConditionalList<RelativePath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_directory: Option<Value<NonEmptyStr>>,
}

/// A checkout of a git repository.
///
/// At most one of `rev`, `tag` and `branch` may be given; without any of
/// them the checkout follows HEAD.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GitSource {
    pub git: Value<SourceUrl>,
    #[serde(flatten)]
    pub reference: GitReference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<Value<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lfs: Option<Value<bool>>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub patches: ConditionalList<RelativePath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_directory: Option<Value<NonEmptyStr>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum GitReference {
    Rev(Value<NonEmptyStr>),
    Tag(Value<NonEmptyStr>),
    Branch(Value<NonEmptyStr>),
    #[default]
    Head,
}

// Serialized as a map so it can flatten into `GitSource`; `Head` is the
// absence of a checkout-target key.
impl Serialize for GitReference {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(None)?;
        match self {
            GitReference::Rev(rev) => map.serialize_entry("rev", rev)?,
            GitReference::Tag(tag) => map.serialize_entry("tag", tag)?,
            GitReference::Branch(branch) => map.serialize_entry("branch", branch)?,
            GitReference::Head => {}
        }
        map.end()
    }
}

/// Files taken from the local filesystem
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathSource {
    pub path: Value<NonEmptyStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<Value<Sha256Hex>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md5: Option<Value<Md5Hex>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_gitignore: Option<Value<bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<Value<NonEmptyStr>>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub patches: ConditionalList<RelativePath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_directory: Option<Value<NonEmptyStr>>,
}

/// Parse the `source` section: a single source, a conditional, or a list
/// mixing both.
pub(crate) fn parse_sources(node: &MarkedNode) -> ParseResult<ConditionalList<Source>> {
    parse_conditional_list_or_item_with_converter(node, "source", &SourceConverter)
}

pub(crate) struct SourceConverter;

impl NodeConverter<Source> for SourceConverter {
    fn convert(&self, node: &MarkedNode, _field: &str) -> ParseResult<Source> {
        parse_source(node)
    }

    // Source entries are mappings; a scalar here is an error, not a template.
    fn is_template(&self, _text: &str) -> bool {
        false
    }
}

fn parse_source(node: &MarkedNode) -> ParseResult<Source> {
    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;

    let discriminants: Vec<&str> = ["url", "git", "path"]
        .into_iter()
        .filter(|key| mapping.contains_key(*key))
        .collect();

    match discriminants.as_slice() {
        ["url"] => parse_url_source(node).map(Source::Url),
        ["git"] => parse_git_source(node).map(Source::Git),
        ["path"] => parse_path_source(node).map(Source::Path),
        [] => Err(ParseError::no_matching_alternative(
            "source",
            "expected one of the keys `url`, `git` or `path`",
            get_span(node),
        )),
        keys => Err(ParseError::no_matching_alternative(
            "source",
            format!(
                "the keys {} select conflicting source types; only one may be present",
                format_keys(keys)
            ),
            get_span(node),
        )),
    }
}

fn format_keys(keys: &[&str]) -> String {
    keys.iter()
        .map(|k| format!("`{k}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_url_source(node: &MarkedNode) -> ParseResult<UrlSource> {
    let mapping = node.as_mapping().expect("checked by parse_source");
    validate_mapping_fields(mapping, "source", URL_SOURCE_FIELDS)?;

    let url_node = mapping
        .get("url")
        .ok_or_else(|| ParseError::missing_field("source.url", get_span(node)))?;

    Ok(UrlSource {
        url: parse_list_or_item(url_node, "source.url")?,
        sha256: node.try_get_value("sha256")?,
        md5: node.try_get_value("md5")?,
        file_name: node.try_get_value("file_name")?,
        patches: parse_patches(node)?,
        target_directory: parse_target_directory(node)?,
    })
}

fn parse_git_source(node: &MarkedNode) -> ParseResult<GitSource> {
    let mapping = node.as_mapping().expect("checked by parse_source");
    validate_mapping_fields(mapping, "source", GIT_SOURCE_FIELDS)?;

    let git = node
        .try_get_value("git")?
        .ok_or_else(|| ParseError::missing_field("source.git", get_span(node)))?;

    // a null-valued key is no checkout target, same as an absent one
    let reference_keys: Vec<&str> = ["rev", "tag", "branch"]
        .into_iter()
        .filter(|key| {
            mapping
                .get(*key)
                .is_some_and(|value| !recipe_schema_yaml::is_null(value))
        })
        .collect();
    let reference = match reference_keys.as_slice() {
        [] => GitReference::Head,
        ["rev"] => GitReference::Rev(node.try_get_value("rev")?.expect("key present")),
        ["tag"] => GitReference::Tag(node.try_get_value("tag")?.expect("key present")),
        ["branch"] => GitReference::Branch(node.try_get_value("branch")?.expect("key present")),
        keys => {
            return Err(ParseError::no_matching_alternative(
                "source",
                format!(
                    "at most one of `rev`, `tag` and `branch` may be given, found {}",
                    format_keys(keys)
                ),
                get_span(node),
            ));
        }
    };

    Ok(GitSource {
        git,
        reference,
        depth: node.try_get_value("depth")?,
        lfs: node.try_get_value("lfs")?,
        patches: parse_patches(node)?,
        target_directory: parse_target_directory(node)?,
    })
}

fn parse_path_source(node: &MarkedNode) -> ParseResult<PathSource> {
    let mapping = node.as_mapping().expect("checked by parse_source");
    validate_mapping_fields(mapping, "source", PATH_SOURCE_FIELDS)?;

    let path = node
        .try_get_value("path")?
        .ok_or_else(|| ParseError::missing_field("source.path", get_span(node)))?;

    Ok(PathSource {
        path,
        sha256: node.try_get_value("sha256")?,
        md5: node.try_get_value("md5")?,
        use_gitignore: node.try_get_value("use_gitignore")?,
        file_name: node.try_get_value("file_name")?,
        patches: parse_patches(node)?,
        target_directory: parse_target_directory(node)?,
    })
}

/// `patches` must be a sequence; a bare value or bare if/then/else is
/// rejected here, unlike most list-typed fields.
fn parse_patches(node: &MarkedNode) -> ParseResult<ConditionalList<RelativePath>> {
    let mapping = node.as_mapping().expect("checked by parse_source");
    match mapping.get("patches") {
        Some(patches) if !recipe_schema_yaml::is_null(patches) => {
            patches.parse_conditional_list("source.patches")
        }
        _ => Ok(ConditionalList::default()),
    }
}

fn parse_target_directory(node: &MarkedNode) -> ParseResult<Option<Value<NonEmptyStr>>> {
    if let Some(directory) = node.try_get_value("target_directory")? {
        return Ok(Some(directory));
    }
    let folder = node.try_get_value("folder")?;
    if folder.is_some() {
        tracing::warn!("`source.folder` is deprecated, use `source.target_directory`");
    }
    Ok(folder)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> ParseResult<ConditionalList<Source>> {
        let node = recipe_schema_yaml::parse_yaml(yaml).unwrap();
        let source = node.as_mapping().unwrap().get("source").unwrap();
        parse_sources(source)
    }

    fn first_url_source(sources: &ConditionalList<Source>) -> &UrlSource {
        match sources.iter().next().and_then(|i| i.as_value()?.as_concrete()) {
            Some(Source::Url(url)) => url,
            other => panic!("expected a concrete url source, got {other:?}"),
        }
    }

    #[test]
    fn test_url_source() {
        let sources = parse(
            r#"
source:
  url: https://example.com/xtensor-0.24.0.tar.gz
  sha256: 37738aa0865350b39f048e638735c05b78b1ea27a5e09f73d14bb8f3b0247eaa
"#,
        )
        .unwrap();
        assert_eq!(sources.len(), 1);
        let url = first_url_source(&sources);
        assert!(url.sha256.is_some());
    }

    #[test]
    fn test_url_mirror_list() {
        let sources = parse(
            r#"
source:
  url:
    - https://mirror-a.example.com/pkg.tar.gz
    - https://mirror-b.example.com/pkg.tar.gz
"#,
        )
        .unwrap();
        assert_eq!(first_url_source(&sources).url.len(), 2);
    }

    #[test]
    fn test_invalid_digest_rejected() {
        let err = parse(
            r#"
source:
  url: https://example.com/pkg.tar.gz
  sha256: not-a-digest
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::ConstraintViolation { .. }));
    }

    #[test]
    fn test_git_source_with_tag() {
        let sources = parse(
            r#"
source:
  git: https://github.com/xtensor-stack/xtensor.git
  tag: 0.24.0
  depth: 1
"#,
        )
        .unwrap();
        match sources.iter().next().and_then(|i| i.as_value()?.as_concrete()) {
            Some(Source::Git(git)) => assert!(matches!(git.reference, GitReference::Tag(_))),
            other => panic!("expected a concrete git source, got {other:?}"),
        }
    }

    #[test]
    fn test_null_checkout_target_reads_as_head() {
        let sources = parse(
            r#"
source:
  git: https://github.com/xtensor-stack/xtensor.git
  rev:
"#,
        )
        .unwrap();
        match sources.iter().next().and_then(|i| i.as_value()?.as_concrete()) {
            Some(Source::Git(git)) => assert!(matches!(git.reference, GitReference::Head)),
            other => panic!("expected a concrete git source, got {other:?}"),
        }
    }

    #[test]
    fn test_git_rev_and_branch_conflict() {
        let err = parse(
            r#"
source:
  git: https://github.com/xtensor-stack/xtensor.git
  rev: abc123
  branch: main
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::NoMatchingAlternative { .. }));
    }

    #[test]
    fn test_conflicting_discriminants_rejected() {
        let err = parse(
            r#"
source:
  git: https://github.com/xtensor-stack/xtensor.git
  path: ./local-checkout
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::NoMatchingAlternative { .. }));
    }

    #[test]
    fn test_no_discriminant_rejected() {
        let err = parse("source: {file_name: pkg.tar.gz}").unwrap_err();
        assert!(matches!(err, ParseError::NoMatchingAlternative { .. }));
    }

    #[test]
    fn test_source_list_with_conditional() {
        let sources = parse(
            r#"
source:
  - url: https://example.com/pkg.tar.gz
  - if: unix
    then:
      path: ./vendored
"#,
        )
        .unwrap();
        assert_eq!(sources.len(), 2);
        assert!(sources.iter().nth(1).unwrap().is_conditional());
    }

    #[test]
    fn test_patches_as_listed_conditional() {
        let sources = parse(
            r#"
source:
  url: https://example.com/pkg.tar.gz
  patches:
    - if: win
      then: win.patch
"#,
        )
        .unwrap();
        assert_eq!(first_url_source(&sources).patches.len(), 1);
    }

    #[test]
    fn test_bare_conditional_patches_rejected() {
        let err = parse(
            r#"
source:
  url: https://example.com/pkg.tar.gz
  patches:
    if: win
    then: win.patch
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::ConditionalShapeMismatch { .. }));
    }

    #[test]
    fn test_backslash_in_patch_path_rejected() {
        let err = parse(
            r#"
source:
  url: https://example.com/pkg.tar.gz
  patches:
    - patches\win.patch
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::ConstraintViolation { .. }));
    }

    #[test]
    fn test_folder_alias() {
        let sources = parse(
            r#"
source:
  url: https://example.com/pkg.tar.gz
  folder: vendored
"#,
        )
        .unwrap();
        let url = first_url_source(&sources);
        assert_eq!(
            url.target_directory.as_ref().map(|d| d.to_string()),
            Some("vendored".to_string())
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = parse(
            r#"
source:
  url: https://example.com/pkg.tar.gz
  checksum: abc
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::UnrecognizedField { .. }));
    }
}
