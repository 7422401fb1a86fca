//! JSON-schema fragments for the conditional container and the refinement
//! scalars.
//!
//! Entity crates assemble their schema documents from these builders so
//! that the derived schema and the typed parsers express the same shapes.
//! All output goes through `serde_json::Value`, whose map ordering is
//! stable, making the rendered document deterministic.

use serde_json::{Value, json};

use crate::scalars::SourceUrl;

/// `anyOf` over the given alternatives
pub fn any_of(alternatives: Vec<Value>) -> Value {
    json!({ "anyOf": alternatives })
}

/// A string with at least one character
pub fn non_empty_string() -> Value {
    json!({ "type": "string", "minLength": 1 })
}

/// A string carrying a `${{ ... }}` template
pub fn template_string() -> Value {
    json!({ "type": "string", "pattern": r"\$\{\{.*\}\}" })
}

/// An opaque condition expression
pub fn expression_string() -> Value {
    non_empty_string()
}

/// A path without backslashes
pub fn path_no_backslash() -> Value {
    json!({ "type": "string", "minLength": 1, "pattern": r"^[^\\]+$" })
}

/// An opaque dependency string
pub fn match_spec() -> Value {
    non_empty_string()
}

/// A hex digest of exactly `len` characters
pub fn hex_digest(len: usize) -> Value {
    json!({ "type": "string", "pattern": format!("^[a-fA-F0-9]{{{len}}}$") })
}

/// A source control URL
pub fn source_url() -> Value {
    json!({ "type": "string", "pattern": SourceUrl::PATTERN })
}

/// A non-negative integer
pub fn unsigned_int() -> Value {
    json!({ "type": "integer", "minimum": 0 })
}

/// A boolean
pub fn boolean() -> Value {
    json!({ "type": "boolean" })
}

/// The shape of `Value<T>`: the concrete type or a template
pub fn templated(inner: Value) -> Value {
    any_of(vec![inner, template_string()])
}

/// The if/then/else node over a branch item
pub fn if_then_else(item: &Value) -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["if", "then"],
        "properties": {
            "if": expression_string(),
            "then": list_or_item(item),
            "else": list_or_item(item),
        }
    })
}

/// A branch value: the item or a list of items
pub fn list_or_item(item: &Value) -> Value {
    any_of(vec![item.clone(), json!({ "type": "array", "items": item })])
}

/// A strict conditional list: an array whose elements are items or
/// if/then/else nodes
pub fn conditional_list(item: &Value) -> Value {
    json!({
        "type": "array",
        "items": any_of(vec![item.clone(), if_then_else(item)]),
    })
}

/// The full three-shape conditional union: a bare item, a bare
/// if/then/else, or a list of either
pub fn conditional_list_or_item(item: &Value) -> Value {
    any_of(vec![item.clone(), if_then_else(item), conditional_list(item)])
}

/// The given shape, or an explicit null. YAML spells absent optional
/// fields as `key:` or `key: null`; the typed parsers read those as
/// absent, so the schema must admit them too.
pub fn nullable(inner: Value) -> Value {
    any_of(vec![inner, json!({ "type": "null" })])
}

/// A closed object: exhaustive property list, nothing else allowed.
/// Optional properties additionally accept an explicit null.
pub fn strict_object(properties: Value, required: &[&str]) -> Value {
    let properties = match properties {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, schema)| {
                    if required.contains(&key.as_str()) {
                        (key, schema)
                    } else {
                        (key, nullable(schema))
                    }
                })
                .collect(),
        ),
        other => other,
    };
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": required,
        "properties": properties,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_conditional_union_has_three_shapes() {
        let schema = conditional_list_or_item(&non_empty_string());
        let alternatives = schema["anyOf"].as_array().unwrap();
        assert_eq!(alternatives.len(), 3);
        // bare item, if/then/else object, array
        assert_eq!(alternatives[0]["type"], "string");
        assert_eq!(alternatives[1]["type"], "object");
        assert_eq!(alternatives[2]["type"], "array");
    }

    #[test]
    fn test_strict_object_closed() {
        let schema = strict_object(json!({ "name": non_empty_string() }), &["name"]);
        assert_eq!(schema["additionalProperties"], json!(false));
        assert_eq!(schema["required"], json!(["name"]));
    }

    #[test]
    fn test_optional_properties_accept_null() {
        let schema = strict_object(
            json!({ "name": non_empty_string(), "flag": boolean() }),
            &["name"],
        );
        // required fields keep their shape, optional ones gain a null arm
        assert_eq!(schema["properties"]["name"], non_empty_string());
        let alternatives = schema["properties"]["flag"]["anyOf"].as_array().unwrap();
        assert_eq!(alternatives[0], boolean());
        assert_eq!(alternatives[1], json!({ "type": "null" }));
    }
}
