//! The `about` section: package metadata

use std::fmt;
use std::str::FromStr;

use marked_yaml::Node as MarkedNode;
use recipe_schema_yaml::{
    ConditionalList, NonEmptyStr, ParseError, ParseMapping, ParseResult, RelativePath, Value,
    get_span, node_kind, validate_mapping_fields,
};
use serde::Serialize;
use url::Url;

pub const ABOUT_FIELDS: &[&str] = &[
    "homepage",
    "repository",
    "documentation",
    "license",
    "license_file",
    "license_url",
    "summary",
    "description",
    "prelink_message",
];

const DESCRIPTION_FIELDS: &[&str] = &["file"];

/// A URL restricted to the http and https schemes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct HttpUrl(Url);

impl HttpUrl {
    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("{0}")]
    Invalid(#[from] url::ParseError),
    #[error("unsupported scheme `{0}`, expected http or https")]
    UnsupportedScheme(String),
}

impl FromStr for HttpUrl {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(s)?;
        match url.scheme() {
            "http" | "https" => Ok(Self(url)),
            other => Err(UrlError::UnsupportedScheme(other.to_string())),
        }
    }
}

impl fmt::Display for HttpUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct About {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<Value<HttpUrl>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<Value<HttpUrl>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<Value<HttpUrl>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<Value<NonEmptyStr>>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub license_file: ConditionalList<RelativePath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_url: Option<Value<HttpUrl>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Value<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Description>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prelink_message: Option<Value<NonEmptyStr>>,
}

/// Free text, or a `{ file: ... }` mapping pointing at a file in the source
/// directory
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Description {
    Text(Value<String>),
    File { file: Value<RelativePath> },
}

pub(crate) fn parse_about(node: &MarkedNode) -> ParseResult<About> {
    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;

    validate_mapping_fields(mapping, "about", ABOUT_FIELDS)?;

    let description = match mapping.get("description") {
        Some(description) if !recipe_schema_yaml::is_null(description) => {
            Some(parse_description(description)?)
        }
        _ => None,
    };

    Ok(About {
        homepage: node.try_get_value("homepage")?,
        repository: node.try_get_value("repository")?,
        documentation: node.try_get_value("documentation")?,
        license: node.try_get_value("license")?,
        license_file: node
            .try_get_conditional_list_or_item("license_file")?
            .unwrap_or_default(),
        license_url: node.try_get_value("license_url")?,
        summary: node.try_get_value("summary")?,
        description,
        prelink_message: node.try_get_value("prelink_message")?,
    })
}

fn parse_description(node: &MarkedNode) -> ParseResult<Description> {
    if let Some(mapping) = node.as_mapping() {
        validate_mapping_fields(mapping, "about.description", DESCRIPTION_FIELDS)?;
        let file = node
            .try_get_value("file")?
            .ok_or_else(|| ParseError::missing_field("about.description.file", get_span(node)))?;
        return Ok(Description::File { file });
    }
    use recipe_schema_yaml::ParseNode;
    Ok(Description::Text(node.parse_value("about.description")?))
}
