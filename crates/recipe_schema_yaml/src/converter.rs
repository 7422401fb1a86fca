//! Node conversion trait used by the generic value and list parsers.
//!
//! Scalar fields go through [`FromStrConverter`]. Entities that appear as
//! conditional-list elements (sources, outputs, test elements) implement
//! their own [`NodeConverter`] so the same list algebra applies to them.

use marked_yaml::Node as MarkedNode;

use crate::{
    error::{ParseError, ParseResult},
    helpers::{get_span, node_kind},
    scalars::Template,
};

/// Converts a YAML node into a concrete `T`
pub trait NodeConverter<T> {
    /// Convert a node to a concrete value.
    ///
    /// `field` names the location for error messages (e.g. "build.number").
    fn convert(&self, node: &MarkedNode, field: &str) -> ParseResult<T>;

    /// Whether a scalar string should be treated as a template instead of
    /// being converted
    fn is_template(&self, s: &str) -> bool {
        Template::is_template(s)
    }
}

/// Default converter: scalars only, parsed with `FromStr`
pub struct FromStrConverter<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> FromStrConverter<T> {
    pub fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T> Default for FromStrConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NodeConverter<T> for FromStrConverter<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    fn convert(&self, node: &MarkedNode, field: &str) -> ParseResult<T> {
        let scalar = node
            .as_scalar()
            .ok_or_else(|| ParseError::expected_type("scalar", node_kind(node), get_span(node)))?;

        scalar
            .as_str()
            .parse::<T>()
            .map_err(|e| ParseError::constraint_violation(field, e.to_string(), *scalar.span()))
    }
}
