//! Refinement scalars used throughout the recipe schema.
//!
//! Each type wraps a `String` and enforces its constraint in `FromStr`, so
//! the generic value/list parsers can construct them uniformly. The failing
//! literal is always part of the error message.

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

lazy_static! {
    static ref SOURCE_URL_RE: Regex =
        Regex::new(r"((git|ssh|http(s)?)|(git@[\w\.]+))(:(\/\/)?)([\w\.@:\/\\-~]+)").unwrap();
}

/// Constraint failures for refinement scalars
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScalarError {
    #[error("expected a non-empty string")]
    Empty,

    #[error("expected exactly {expected} hexadecimal characters, got '{value}'")]
    InvalidDigest { expected: usize, value: String },

    #[error("path '{0}' must not contain a backslash")]
    Backslash(String),

    #[error("'{0}' is not a template expression (expected `${{{{ ... }}}}` delimiters)")]
    NotATemplate(String),

    #[error("'{0}' is not a valid source control URL (expected git, ssh, http(s) or user@host form)")]
    InvalidSourceUrl(String),
}

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_newtype! {
    /// A string with at least one character
    NonEmptyStr
}

impl FromStr for NonEmptyStr {
    type Err = ScalarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            Err(ScalarError::Empty)
        } else {
            Ok(Self(s.to_string()))
        }
    }
}

string_newtype! {
    /// An MD5 digest: exactly 32 hexadecimal characters
    Md5Hex
}

impl FromStr for Md5Hex {
    type Err = ScalarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_digest(s, 32).map(Self)
    }
}

string_newtype! {
    /// A SHA256 digest: exactly 64 hexadecimal characters
    Sha256Hex
}

impl FromStr for Sha256Hex {
    type Err = ScalarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_digest(s, 64).map(Self)
    }
}

fn parse_digest(s: &str, expected: usize) -> Result<String, ScalarError> {
    if s.len() != expected || hex::decode(s).is_err() {
        return Err(ScalarError::InvalidDigest {
            expected,
            value: s.to_string(),
        });
    }
    Ok(s.to_string())
}

string_newtype! {
    /// A non-empty relative path without backslashes
    RelativePath
}

impl FromStr for RelativePath {
    type Err = ScalarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            Err(ScalarError::Empty)
        } else if s.contains('\\') {
            Err(ScalarError::Backslash(s.to_string()))
        } else {
            Ok(Self(s.to_string()))
        }
    }
}

string_newtype! {
    /// An opaque dependency string; resolution semantics live outside this crate
    MatchSpec
}

impl FromStr for MatchSpec {
    type Err = ScalarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            Err(ScalarError::Empty)
        } else {
            Ok(Self(s.to_string()))
        }
    }
}

string_newtype! {
    /// A templated string: contains a `${{ ... }}` expression.
    ///
    /// The expression text is never evaluated here; it is carried verbatim
    /// for the templating collaborator.
    Template
}

impl Template {
    /// Wrap a string that already passed [`Template::is_template`]
    pub(crate) fn new_unchecked(s: &str) -> Self {
        Self(s.to_string())
    }

    /// Check whether a string contains the template delimiters
    pub fn is_template(s: &str) -> bool {
        match s.find("${{") {
            Some(open) => s[open..].contains("}}"),
            None => false,
        }
    }
}

impl FromStr for Template {
    type Err = ScalarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if Self::is_template(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(ScalarError::NotATemplate(s.to_string()))
        }
    }
}

string_newtype! {
    /// An opaque condition expression from an `if:` key.
    ///
    /// Only structurally recognized, never evaluated.
    Expression
}

impl FromStr for Expression {
    type Err = ScalarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            Err(ScalarError::Empty)
        } else {
            Ok(Self(s.to_string()))
        }
    }
}

string_newtype! {
    /// A source control URL: git, ssh, http(s) or the `user@host:` form
    SourceUrl
}

impl SourceUrl {
    /// The pattern accepted by this scalar, as used in the derived schema
    pub const PATTERN: &'static str =
        r"((git|ssh|http(s)?)|(git@[\w\.]+))(:(\/\/)?)([\w\.@:\/\\-~]+)";
}

impl FromStr for SourceUrl {
    type Err = ScalarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if SOURCE_URL_RE.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(ScalarError::InvalidSourceUrl(s.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty() {
        assert!("x".parse::<NonEmptyStr>().is_ok());
        assert_eq!("".parse::<NonEmptyStr>(), Err(ScalarError::Empty));
    }

    #[test]
    fn test_digests() {
        let sha = "a".repeat(64);
        assert!(sha.parse::<Sha256Hex>().is_ok());
        assert!("a".repeat(63).parse::<Sha256Hex>().is_err());
        assert!("g".repeat(64).parse::<Sha256Hex>().is_err());

        let md5 = "0123456789abcdef0123456789abcdef";
        assert!(md5.parse::<Md5Hex>().is_ok());
        assert!(md5.to_uppercase().parse::<Md5Hex>().is_ok());
        assert!("xyz".parse::<Md5Hex>().is_err());
    }

    #[test]
    fn test_relative_path() {
        assert!("a/b/c.patch".parse::<RelativePath>().is_ok());
        assert_eq!(
            r"a\b".parse::<RelativePath>(),
            Err(ScalarError::Backslash(r"a\b".to_string()))
        );
    }

    #[test]
    fn test_template_delimiters() {
        assert!(Template::is_template("${{ version }}"));
        assert!(Template::is_template("prefix-${{ name }}-suffix"));
        assert!(!Template::is_template("{{ version }}"));
        // closing braces before the opening delimiter do not count
        assert!(!Template::is_template("}} ${{"));
        assert!("${{ hash }}".parse::<Template>().is_ok());
        assert!("plain".parse::<Template>().is_err());
    }

    #[test]
    fn test_source_url() {
        assert!("https://github.com/mamba-org/mamba.git".parse::<SourceUrl>().is_ok());
        assert!("git@github.com:mamba-org/mamba.git".parse::<SourceUrl>().is_ok());
        assert!("ssh://git@example.com/repo".parse::<SourceUrl>().is_ok());
        assert!("just-a-name".parse::<SourceUrl>().is_err());
    }
}
