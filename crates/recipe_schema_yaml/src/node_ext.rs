//! Extension traits over `marked_yaml` nodes for concise entity parsers

use marked_yaml::Node as MarkedNode;

use crate::{
    conditional::{parse_conditional_list_or_item_with_converter, parse_conditional_list_with_converter},
    converter::{FromStrConverter, NodeConverter},
    error::{ParseError, ParseResult},
    helpers::{get_span, node_kind},
    types::{ConditionalList, Value},
    value::parse_value_with_converter,
};

/// Parsing methods available on every node
pub trait ParseNode {
    /// Parse this node as a single value with the default converter
    fn parse_value<T>(&self, field: &str) -> ParseResult<Value<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display;

    /// Parse this node as a strict conditional list (sequence required)
    fn parse_conditional_list<T>(&self, field: &str) -> ParseResult<ConditionalList<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display;

    /// Parse this node as the full conditional union (bare value, bare
    /// if/then/else, or list)
    fn parse_conditional_list_or_item<T>(&self, field: &str) -> ParseResult<ConditionalList<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display;

    /// Parse this node as a sequence of plain scalars
    fn parse_sequence<T>(&self, field: &str) -> ParseResult<Vec<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display;
}

impl ParseNode for MarkedNode {
    fn parse_value<T>(&self, field: &str) -> ParseResult<Value<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        parse_value_with_converter(self, field, &FromStrConverter::new())
    }

    fn parse_conditional_list<T>(&self, field: &str) -> ParseResult<ConditionalList<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        parse_conditional_list_with_converter(self, field, &FromStrConverter::new())
    }

    fn parse_conditional_list_or_item<T>(&self, field: &str) -> ParseResult<ConditionalList<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        parse_conditional_list_or_item_with_converter(self, field, &FromStrConverter::new())
    }

    fn parse_sequence<T>(&self, field: &str) -> ParseResult<Vec<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let sequence = self
            .as_sequence()
            .ok_or_else(|| ParseError::expected_type("sequence", node_kind(self), get_span(self)))?;

        let converter = FromStrConverter::new();
        sequence
            .iter()
            .map(|item| converter.convert(item, field))
            .collect()
    }
}

/// Field-access methods for mappings
pub trait ParseMapping {
    /// Get and parse an optional scalar field
    fn try_get_value<T>(&self, field: &str) -> ParseResult<Option<Value<T>>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display;

    /// Get and parse an optional strict conditional-list field.
    ///
    /// An empty or explicit-null value counts as absent.
    fn try_get_conditional_list<T>(&self, field: &str) -> ParseResult<Option<ConditionalList<T>>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display;

    /// Get and parse an optional field typed as the full conditional union
    fn try_get_conditional_list_or_item<T>(
        &self,
        field: &str,
    ) -> ParseResult<Option<ConditionalList<T>>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display;
}

/// YAML spells null as an empty scalar, `null` or `~`
pub fn is_null(node: &MarkedNode) -> bool {
    node.as_scalar()
        .is_some_and(|s| matches!(s.as_str(), "" | "null" | "~"))
}

impl ParseMapping for MarkedNode {
    fn try_get_value<T>(&self, field: &str) -> ParseResult<Option<Value<T>>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let mapping = self
            .as_mapping()
            .ok_or_else(|| ParseError::expected_type("mapping", node_kind(self), get_span(self)))?;

        match mapping.get(field) {
            Some(node) if !is_null(node) => Ok(Some(node.parse_value(field)?)),
            _ => Ok(None),
        }
    }

    fn try_get_conditional_list<T>(&self, field: &str) -> ParseResult<Option<ConditionalList<T>>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let mapping = self
            .as_mapping()
            .ok_or_else(|| ParseError::expected_type("mapping", node_kind(self), get_span(self)))?;

        match mapping.get(field) {
            Some(node) if !is_null(node) => Ok(Some(node.parse_conditional_list(field)?)),
            _ => Ok(None),
        }
    }

    fn try_get_conditional_list_or_item<T>(
        &self,
        field: &str,
    ) -> ParseResult<Option<ConditionalList<T>>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let mapping = self
            .as_mapping()
            .ok_or_else(|| ParseError::expected_type("mapping", node_kind(self), get_span(self)))?;

        match mapping.get(field) {
            Some(node) if !is_null(node) => Ok(Some(node.parse_conditional_list_or_item(field)?)),
            _ => Ok(None),
        }
    }
}
