//! JSON-schema fragment for variant configuration documents

use recipe_schema_yaml::schema::{
    any_of, conditional_list, conditional_list_or_item, if_then_else, non_empty_string, nullable,
    templated,
};
use serde_json::{Value, json};

/// An axis value as written in YAML: axis values are opaque, and unquoted
/// numbers or booleans are as legal as strings.
fn axis_value() -> Value {
    any_of(vec![
        non_empty_string(),
        json!({ "type": "number" }),
        json!({ "type": "boolean" }),
    ])
}

fn zip_group() -> Value {
    conditional_list(&non_empty_string())
}

fn pin_spec() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "min_pin": templated(non_empty_string()),
            "max_pin": templated(non_empty_string()),
        },
        "anyOf": [
            { "required": ["min_pin"] },
            { "required": ["max_pin"] },
        ],
    })
}

/// The schema of a variant configuration document.
///
/// Open by design of the document format: unknown keys are axes, so
/// `additionalProperties` carries the axis shape instead of `false`.
/// Every key may also be explicitly null; the typed parser reads a null
/// reserved key as absent and a null axis as an empty axis.
pub fn variant_config_schema() -> Value {
    let group = zip_group();
    json!({
        "type": "object",
        "properties": {
            "zip_keys": nullable(any_of(vec![
                group.clone(),
                if_then_else(&group),
                json!({
                    "type": "array",
                    "items": any_of(vec![group.clone(), if_then_else(&group)]),
                }),
            ])),
            "pin_run_as_build": nullable(json!({
                "type": "object",
                "additionalProperties": pin_spec(),
            })),
        },
        "additionalProperties": nullable(conditional_list_or_item(&axis_value())),
    })
}
