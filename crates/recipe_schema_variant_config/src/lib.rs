//! Variant configuration documents.
//!
//! A variant configuration declares the build matrix axes: each top-level
//! key is an axis with one or more values, except for the two reserved
//! keys `zip_keys` (axes that advance in lockstep) and `pin_run_as_build`
//! (version pin widths per package). Unlike recipes the document is open;
//! unknown keys are new axes, not errors.

pub mod config;
pub mod schema;

pub use config::{
    PIN_SPEC_FIELDS, PinSpec, RESERVED_KEYS, VariantConfig, parse_variant_config,
    parse_variant_config_from_source,
};
pub use schema::variant_config_schema;
