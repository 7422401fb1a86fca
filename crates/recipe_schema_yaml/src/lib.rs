//! Shared parsing layer for recipe and variant-configuration documents.
//!
//! This crate provides the conditional container algebra used pervasively
//! by the recipe schema: a value of type `T`, OR an if/then/else node whose
//! branches are `T` or a list of `T`, OR a list mixing plain values and
//! if/then/else nodes. It also carries the refinement scalars (digests,
//! paths, templates, source URLs) and the error type shared by every layer.
//!
//! # Core types
//!
//! - [`Value<T>`] - a concrete value or an unevaluated template
//! - [`Conditional<T>`] - an if/then/else node with opaque condition text
//! - [`Item<T>`] - an element of a conditional list
//! - [`ConditionalList<T>`] - a list mixing values and conditionals
//! - [`ListOrItem<T>`] - the `T | List<T>` shape of then/else branches
//!
//! # Example
//!
//! ```rust
//! use recipe_schema_yaml::{ConditionalList, parse_conditional_list};
//!
//! let yaml = recipe_schema_yaml::parse_yaml(r#"
//! python:
//!   - "3.9"
//!   - "3.10"
//!   - if: win
//!     then: "3.8"
//! "#).unwrap();
//!
//! let node = yaml.as_mapping().unwrap().get("python").unwrap();
//! let list: ConditionalList<String> = parse_conditional_list(node, "python").unwrap();
//! assert_eq!(list.len(), 3);
//! ```

pub mod conditional;
pub mod converter;
pub mod error;
pub mod helpers;
pub mod list;
pub mod node_ext;
pub mod scalars;
pub mod schema;
pub mod types;
pub mod value;
pub mod yaml;

pub use conditional::{
    is_conditional, parse_conditional_list, parse_conditional_list_or_item,
    parse_conditional_list_or_item_with_converter, parse_conditional_list_with_converter,
    parse_item_with_converter,
};
pub use converter::{FromStrConverter, NodeConverter};
pub use error::{ParseError, ParseResult, format_span};
#[cfg(feature = "miette")]
pub use error::ParseErrorWithSource;
pub use helpers::{get_span, node_kind, validate_mapping_fields};
pub use list::{parse_list_or_item, parse_list_or_item_with_converter};
pub use node_ext::{ParseMapping, ParseNode, is_null};
pub use scalars::{
    Expression, MatchSpec, Md5Hex, NonEmptyStr, RelativePath, ScalarError, Sha256Hex, SourceUrl,
    Template,
};
pub use types::{Conditional, ConditionalList, Item, ListOrItem, Value, ValueInner};
pub use value::{parse_value, parse_value_with_converter};
pub use yaml::parse_yaml;
