//! The conditional container algebra.
//!
//! Every field of a recipe that may vary per build condition is expressed
//! with these types: a [`Value<T>`] is either concrete or a template; an
//! [`Item<T>`] is a value or an if/then/else [`Conditional<T>`]; a
//! [`ConditionalList<T>`] is a list of items. Condition expressions are
//! carried as opaque text and never evaluated here.

use std::fmt;

use marked_yaml::Span;
use serde::Serialize;

use crate::scalars::{Expression, Template};

/// A value that is either concrete or a template to be substituted later
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Value<T> {
    inner: ValueInner<T>,
    #[serde(skip)]
    span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ValueInner<T> {
    Concrete(T),
    Template(Template),
}

impl<T> Value<T> {
    pub fn new_concrete(value: T, span: Option<Span>) -> Self {
        Self {
            inner: ValueInner::Concrete(value),
            span,
        }
    }

    pub fn new_template(template: Template, span: Option<Span>) -> Self {
        Self {
            inner: ValueInner::Template(template),
            span,
        }
    }

    pub fn is_template(&self) -> bool {
        matches!(self.inner, ValueInner::Template(_))
    }

    pub fn is_concrete(&self) -> bool {
        matches!(self.inner, ValueInner::Concrete(_))
    }

    pub fn as_concrete(&self) -> Option<&T> {
        match &self.inner {
            ValueInner::Concrete(v) => Some(v),
            ValueInner::Template(_) => None,
        }
    }

    pub fn as_template(&self) -> Option<&Template> {
        match &self.inner {
            ValueInner::Concrete(_) => None,
            ValueInner::Template(t) => Some(t),
        }
    }

    pub fn span(&self) -> Option<&Span> {
        self.span.as_ref()
    }

    pub fn into_concrete(self) -> Option<T> {
        match self.inner {
            ValueInner::Concrete(v) => Some(v),
            ValueInner::Template(_) => None,
        }
    }

    pub fn inner(&self) -> &ValueInner<T> {
        &self.inner
    }
}

impl<T: fmt::Display> fmt::Display for Value<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            ValueInner::Concrete(v) => write!(f, "{}", v),
            ValueInner::Template(t) => write!(f, "{}", t),
        }
    }
}

/// A single item or a list of items.
///
/// This is the shape of `then`/`else` branches: serialized as the bare item
/// when it holds exactly one element.
#[derive(Debug, Clone, PartialEq)]
pub struct ListOrItem<T>(Vec<T>);

impl<T: Serialize> Serialize for ListOrItem<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self.0.as_slice() {
            [single] => single.serialize(serializer),
            multiple => multiple.serialize(serializer),
        }
    }
}

impl<T> ListOrItem<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self(items)
    }

    pub fn single(item: T) -> Self {
        Self(vec![item])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.0
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }
}

impl<T> IntoIterator for ListOrItem<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a ListOrItem<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// An if/then/else node.
///
/// The recursion through `T` goes via `Vec`, so no explicit boxing is
/// needed to keep the type finite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conditional<T> {
    /// The condition, carried as opaque expression text
    #[serde(rename = "if")]
    pub condition: Expression,
    /// Value(s) when the condition holds
    pub then: ListOrItem<Value<T>>,
    /// Value(s) when it does not
    #[serde(rename = "else", skip_serializing_if = "Option::is_none")]
    pub else_value: Option<ListOrItem<Value<T>>>,
}

/// An element of a conditional list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Item<T> {
    Conditional(Conditional<T>),
    Value(Value<T>),
}

impl<T> Item<T> {
    pub fn is_value(&self) -> bool {
        matches!(self, Item::Value(_))
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self, Item::Conditional(_))
    }

    pub fn as_value(&self) -> Option<&Value<T>> {
        match self {
            Item::Value(v) => Some(v),
            Item::Conditional(_) => None,
        }
    }

    pub fn as_conditional(&self) -> Option<&Conditional<T>> {
        match self {
            Item::Value(_) => None,
            Item::Conditional(c) => Some(c),
        }
    }
}

/// A list whose elements are plain values or if/then/else nodes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ConditionalList<T> {
    items: Vec<Item<T>>,
}

impl<T> Default for ConditionalList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> ConditionalList<T> {
    pub fn new(items: Vec<Item<T>>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item<T>> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Item<T>> {
        self.items
    }

    pub fn as_slice(&self) -> &[Item<T>] {
        &self.items
    }
}

impl<T> IntoIterator for ConditionalList<T> {
    type Item = Item<T>;
    type IntoIter = std::vec::IntoIter<Item<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a ConditionalList<T> {
    type Item = &'a Item<T>;
    type IntoIter = std::slice::Iter<'a, Item<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> FromIterator<Item<T>> for ConditionalList<T> {
    fn from_iter<I: IntoIterator<Item = Item<T>>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
