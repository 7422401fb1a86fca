//! Typed model, validation and JSON-schema derivation for recipe
//! documents.
//!
//! A recipe declares how to build a package: where the sources come from,
//! how the build runs, what it depends on, how the result is tested, and
//! the metadata shipped with it. Documents come in two kinds, resolved by
//! the presence of the `outputs` key: a single-output recipe with a
//! required `package` section, or a multi-output recipe whose artifacts
//! are declared per output.
//!
//! Validation is direct typed construction from a `marked_yaml` tree;
//! every field that may vary per build condition goes through the
//! conditional container algebra of [`recipe_schema_yaml`]. The same
//! entity definitions also derive a standalone JSON Schema document via
//! [`derive_schema`], and the two views share their field tables.
//!
//! ```rust
//! use recipe_schema::{Recipe, validate_from_source};
//!
//! let recipe = validate_from_source(r#"
//! package:
//!   name: xtensor
//!   version: 0.24.0
//!
//! requirements:
//!   host:
//!     - xtl >=0.7,<0.8
//! "#).unwrap();
//!
//! assert!(matches!(recipe, Recipe::Simple(_)));
//! ```

pub mod about;
pub mod build;
pub mod extra;
pub mod output;
pub mod package;
pub mod recipe;
pub mod requirements;
pub mod schema;
pub mod source;
pub mod test_elements;

pub use about::{About, Description, HttpUrl};
pub use build::{
    BoolOrGlobs, Build, DynamicLinking, ForceFileType, GlobFilter, GlobSelect, LinkOptions,
    LinkingCheckBehavior, NoArchKind, OutputBuild, PrefixDetection, PythonBuild, Script,
    VariantHints,
};
pub use output::Output;
pub use package::{Package, PackageIdentifier};
pub use recipe::{
    ComplexRecipe, Recipe, SUPPORTED_SCHEMA_VERSIONS, SimpleRecipe, validate,
    validate_from_source,
};
pub use requirements::{IgnoreRunExports, Requirements, RunExportBuckets, RunExports};
pub use schema::{derive_schema, derive_variant_schema, schema_json};
pub use source::{GitReference, GitSource, PathSource, Source, UrlSource};
pub use test_elements::{
    DownstreamTest, PackageContentsTest, PythonTest, ScriptTest, TestElement, TestFiles,
    TestRequirements,
};

// The error and container types are part of this crate's API surface;
// re-export them so downstream users need a single dependency.
pub use recipe_schema_yaml::{
    Conditional, ConditionalList, Expression, Item, ListOrItem, MatchSpec, Md5Hex, NonEmptyStr,
    ParseError, ParseResult, RelativePath, Sha256Hex, SourceUrl, Template, Value,
};
#[cfg(feature = "miette")]
pub use recipe_schema_yaml::ParseErrorWithSource;

/// Validate a variant configuration tree
pub fn validate_variant_config(
    node: &marked_yaml::Node,
) -> Result<recipe_schema_variant_config::VariantConfig, Vec<ParseError>> {
    recipe_schema_variant_config::parse_variant_config(node).map_err(|error| vec![error])
}

pub use recipe_schema_variant_config::{PinSpec, VariantConfig, parse_variant_config_from_source};
