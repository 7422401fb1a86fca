//! JSON-schema derivation.
//!
//! The derived document expresses exactly the shapes the typed parsers
//! accept: one `$defs` entry per entity, `anyOf` for every union and for
//! the three-shape conditional wrapper, and `additionalProperties: false`
//! for closed entities. The builders share the entity field tables with
//! the parsers so the two views cannot drift apart silently.

use lazy_static::lazy_static;
use recipe_schema_yaml::schema::{
    any_of, boolean, conditional_list, conditional_list_or_item, hex_digest, if_then_else,
    list_or_item, match_spec, non_empty_string, path_no_backslash, strict_object, template_string,
    templated, unsigned_int,
};
use recipe_schema_variant_config::variant_config_schema;
use serde_json::{Value, json};

/// Derive the schema for variant configuration documents
pub fn derive_variant_schema() -> Value {
    variant_config_schema()
}

/// Derive the recipe schema.
///
/// Walks the entity definitions only; no document is needed. The output
/// is deterministic: `serde_json::Map` keeps keys sorted, so repeated
/// renders are byte-identical.
pub fn derive_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://raw.githubusercontent.com/prefix-dev/recipe-format/main/schema.json",
        "title": "recipe schema",
        "anyOf": [def_ref("SimpleRecipe"), def_ref("ComplexRecipe")],
        "$defs": {
            "Package": package_schema(),
            "PackageIdentifier": package_identifier_schema(),
            "Source": any_of(vec![
                def_ref("UrlSource"),
                def_ref("GitSource"),
                def_ref("PathSource"),
            ]),
            "UrlSource": url_source_schema(),
            "GitSource": git_source_schema(),
            "PathSource": path_source_schema(),
            "Build": build_schema(),
            "OutputBuild": output_build_schema(),
            "Script": script_schema(),
            "GlobFilter": glob_filter_schema(),
            "VariantHints": variant_hints_schema(),
            "PythonBuild": python_build_schema(),
            "DynamicLinking": dynamic_linking_schema(),
            "LinkOptions": link_options_schema(),
            "PrefixDetection": prefix_detection_schema(),
            "ForceFileType": force_file_type_schema(),
            "Requirements": requirements_schema(),
            "RunExportBuckets": run_export_buckets_schema(),
            "IgnoreRunExports": ignore_run_exports_schema(),
            "TestElement": any_of(vec![
                def_ref("ScriptTest"),
                def_ref("PythonTest"),
                def_ref("DownstreamTest"),
                def_ref("PackageContentsTest"),
            ]),
            "ScriptTest": script_test_schema(),
            "PythonTest": python_test_schema(),
            "DownstreamTest": downstream_test_schema(),
            "PackageContentsTest": package_contents_test_schema(),
            "About": about_schema(),
            "Output": output_schema(),
            "SimpleRecipe": simple_recipe_schema(),
            "ComplexRecipe": complex_recipe_schema(),
            "VariantConfig": variant_config_schema(),
        },
    })
}

lazy_static! {
    static ref SCHEMA_JSON: String = serde_json::to_string_pretty(&derive_schema())
        .expect("schema document serializes");
}

/// The rendered schema document, cached after the first call
pub fn schema_json() -> &'static str {
    &SCHEMA_JSON
}

fn def_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/$defs/{name}") })
}

/// A scalar as YAML writes it: unquoted numbers and booleans are as legal
/// as strings where the typed side keeps opaque text. An explicit null
/// reads as the empty string on the typed side.
fn scalar_value() -> Value {
    any_of(vec![
        json!({ "type": "string" }),
        json!({ "type": "number" }),
        json!({ "type": "boolean" }),
        json!({ "type": "null" }),
    ])
}

fn http_url() -> Value {
    json!({ "type": "string", "pattern": "^https?://" })
}

fn git_url() -> Value {
    recipe_schema_yaml::schema::source_url()
}

fn glob() -> Value {
    non_empty_string()
}

fn glob_list() -> Value {
    conditional_list_or_item(&glob())
}

fn open_object() -> Value {
    json!({ "type": "object" })
}

fn package_schema() -> Value {
    strict_object(
        json!({
            "name": templated(non_empty_string()),
            "version": templated(non_empty_string()),
        }),
        &["name", "version"],
    )
}

fn package_identifier_schema() -> Value {
    strict_object(
        json!({
            "name": templated(non_empty_string()),
            "version": templated(non_empty_string()),
        }),
        &[],
    )
}

fn source_common_properties() -> serde_json::Map<String, Value> {
    let common = json!({
        "patches": conditional_list(&path_no_backslash()),
        "target_directory": templated(non_empty_string()),
        "folder": templated(non_empty_string()),
    });
    match common {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn url_source_schema() -> Value {
    let mut properties = source_common_properties();
    properties.insert("url".into(), list_or_item(&templated(http_url())));
    properties.insert("sha256".into(), templated(hex_digest(64)));
    properties.insert("md5".into(), templated(hex_digest(32)));
    properties.insert("file_name".into(), templated(non_empty_string()));
    strict_object(Value::Object(properties), &["url"])
}

fn git_source_schema() -> Value {
    let mut properties = source_common_properties();
    properties.insert("git".into(), templated(git_url()));
    properties.insert("rev".into(), templated(non_empty_string()));
    properties.insert("tag".into(), templated(non_empty_string()));
    properties.insert("branch".into(), templated(non_empty_string()));
    properties.insert("depth".into(), templated(unsigned_int()));
    properties.insert("lfs".into(), templated(boolean()));
    let mut schema = strict_object(Value::Object(properties), &["git"]);
    // rev, tag and branch are pairwise exclusive
    schema["not"] = json!({
        "anyOf": [
            { "required": ["rev", "tag"] },
            { "required": ["rev", "branch"] },
            { "required": ["tag", "branch"] },
        ]
    });
    schema
}

fn path_source_schema() -> Value {
    let mut properties = source_common_properties();
    properties.insert("path".into(), templated(non_empty_string()));
    properties.insert("sha256".into(), templated(hex_digest(64)));
    properties.insert("md5".into(), templated(hex_digest(32)));
    properties.insert("use_gitignore".into(), templated(boolean()));
    properties.insert("file_name".into(), templated(non_empty_string()));
    strict_object(Value::Object(properties), &["path"])
}

fn source_field() -> Value {
    conditional_list_or_item(&def_ref("Source"))
}

fn noarch_kind() -> Value {
    any_of(vec![json!({ "enum": ["generic", "python"] }), template_string()])
}

fn linking_check_behavior() -> Value {
    any_of(vec![json!({ "enum": ["ignore", "error"] }), template_string()])
}

fn skip_expression() -> Value {
    // `skip: true` is legal; the literal parses as expression text
    any_of(vec![non_empty_string(), boolean()])
}

fn script_field() -> Value {
    any_of(vec![
        json!({ "type": "string" }),
        json!({
            "type": "array",
            "items": any_of(vec![
                json!({ "type": "string" }),
                if_then_else(&json!({ "type": "string" })),
            ]),
        }),
        def_ref("Script"),
    ])
}

fn bool_or_globs() -> Value {
    any_of(vec![templated(boolean()), glob_list()])
}

fn build_properties() -> serde_json::Map<String, Value> {
    let properties = json!({
        "number": templated(unsigned_int()),
        "string": templated(non_empty_string()),
        "skip": conditional_list_or_item(&skip_expression()),
        "script": script_field(),
        "noarch": noarch_kind(),
        "merge_build_and_host_envs": templated(boolean()),
        "always_include_files": glob_list(),
        "always_copy_files": glob_list(),
        "variant": def_ref("VariantHints"),
        "python": def_ref("PythonBuild"),
        "dynamic_linking": def_ref("DynamicLinking"),
        "link_options": def_ref("LinkOptions"),
        "prefix_detection": def_ref("PrefixDetection"),
        "files": any_of(vec![glob_list(), def_ref("GlobFilter")]),
    });
    match properties {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn build_schema() -> Value {
    strict_object(Value::Object(build_properties()), &[])
}

fn output_build_schema() -> Value {
    let mut properties = build_properties();
    properties.insert("cache_only".into(), templated(boolean()));
    properties.insert("cache_from".into(), glob_list());
    strict_object(Value::Object(properties), &[])
}

fn script_schema() -> Value {
    let mut schema = strict_object(
        json!({
            "interpreter": templated(non_empty_string()),
            "env": { "type": "object", "additionalProperties": scalar_value() },
            "secrets": conditional_list_or_item(&non_empty_string()),
            "content": conditional_list_or_item(&json!({ "type": "string" })),
            "file": templated(path_no_backslash()),
        }),
        &[],
    );
    // content xor file
    schema["allOf"] = json!([
        { "not": { "required": ["content", "file"] } },
        { "anyOf": [{ "required": ["content"] }, { "required": ["file"] }] },
    ]);
    schema
}

fn glob_filter_schema() -> Value {
    strict_object(
        json!({
            "include": glob_list(),
            "exclude": glob_list(),
        }),
        &[],
    )
}

fn variant_hints_schema() -> Value {
    strict_object(
        json!({
            "use_keys": conditional_list_or_item(&non_empty_string()),
            "ignore_keys": conditional_list_or_item(&non_empty_string()),
            "down_prioritize_variant": templated(json!({ "type": "integer" })),
        }),
        &[],
    )
}

fn python_build_schema() -> Value {
    strict_object(
        json!({
            "entry_points": conditional_list_or_item(&non_empty_string()),
            "use_python_app_entrypoint": templated(boolean()),
            "preserve_egg_dir": templated(boolean()),
            "skip_pyc_compilation": glob_list(),
            "disable_pip": templated(boolean()),
        }),
        &[],
    )
}

fn dynamic_linking_schema() -> Value {
    strict_object(
        json!({
            "rpaths": conditional_list_or_item(&non_empty_string()),
            "binary_relocation": bool_or_globs(),
            "missing_dso_allowlist": glob_list(),
            "rpath_allowlist": glob_list(),
            "overdepending_behavior": linking_check_behavior(),
            "overlinking_behavior": linking_check_behavior(),
        }),
        &[],
    )
}

fn link_options_schema() -> Value {
    strict_object(
        json!({
            "post_link_script": templated(non_empty_string()),
            "pre_unlink_script": templated(non_empty_string()),
            "pre_link_message": templated(non_empty_string()),
        }),
        &[],
    )
}

fn prefix_detection_schema() -> Value {
    strict_object(
        json!({
            "force_file_type": def_ref("ForceFileType"),
            "ignore": bool_or_globs(),
            "ignore_binary_files": bool_or_globs(),
        }),
        &[],
    )
}

fn force_file_type_schema() -> Value {
    strict_object(
        json!({
            "text": glob_list(),
            "binary": glob_list(),
        }),
        &[],
    )
}

fn spec_list() -> Value {
    conditional_list_or_item(&match_spec())
}

fn requirements_schema() -> Value {
    strict_object(
        json!({
            "build": spec_list(),
            "host": spec_list(),
            "run": spec_list(),
            "run_constraints": spec_list(),
            "run_exports": any_of(vec![spec_list(), def_ref("RunExportBuckets")]),
            "ignore_run_exports": def_ref("IgnoreRunExports"),
        }),
        &[],
    )
}

fn run_export_buckets_schema() -> Value {
    strict_object(
        json!({
            "weak": spec_list(),
            "strong": spec_list(),
            "noarch": spec_list(),
            "weak_constraints": spec_list(),
            "strong_constraints": spec_list(),
        }),
        &[],
    )
}

fn ignore_run_exports_schema() -> Value {
    strict_object(
        json!({
            "by_name": conditional_list_or_item(&non_empty_string()),
            "from_package": conditional_list_or_item(&non_empty_string()),
        }),
        &[],
    )
}

fn tests_field() -> Value {
    conditional_list_or_item(&def_ref("TestElement"))
}

fn script_test_schema() -> Value {
    strict_object(
        json!({
            "script": script_field(),
            "requirements": strict_object(
                json!({
                    "build": spec_list(),
                    "run": spec_list(),
                }),
                &[],
            ),
            "files": strict_object(
                json!({
                    "source": glob_list(),
                    "recipe": glob_list(),
                }),
                &[],
            ),
        }),
        &["script"],
    )
}

fn python_test_schema() -> Value {
    strict_object(
        json!({
            "python": strict_object(
                json!({
                    "imports": conditional_list_or_item(&non_empty_string()),
                    "pip_check": templated(boolean()),
                }),
                &[],
            ),
        }),
        &["python"],
    )
}

fn downstream_test_schema() -> Value {
    strict_object(
        json!({ "downstream": templated(match_spec()) }),
        &["downstream"],
    )
}

fn package_contents_test_schema() -> Value {
    strict_object(
        json!({
            "package_contents": strict_object(
                json!({
                    "files": glob_list(),
                    "include": glob_list(),
                    "site_packages": glob_list(),
                    "bin": glob_list(),
                    "lib": glob_list(),
                }),
                &[],
            ),
        }),
        &["package_contents"],
    )
}

fn about_schema() -> Value {
    strict_object(
        json!({
            "homepage": templated(http_url()),
            "repository": templated(http_url()),
            "documentation": templated(http_url()),
            "license": templated(non_empty_string()),
            "license_file": conditional_list_or_item(&path_no_backslash()),
            "license_url": templated(http_url()),
            "summary": { "type": "string" },
            "description": any_of(vec![
                json!({ "type": "string" }),
                strict_object(
                    json!({ "file": templated(path_no_backslash()) }),
                    &["file"],
                ),
            ]),
            "prelink_message": templated(non_empty_string()),
        }),
        &[],
    )
}

fn context_schema() -> Value {
    json!({ "type": "object", "additionalProperties": scalar_value() })
}

fn schema_version_schema() -> Value {
    json!({ "type": "integer", "minimum": 1, "maximum": 1 })
}

fn output_schema() -> Value {
    strict_object(
        json!({
            "package": def_ref("PackageIdentifier"),
            "source": source_field(),
            "build": def_ref("OutputBuild"),
            "requirements": def_ref("Requirements"),
            "tests": tests_field(),
            "test": tests_field(),
            "about": def_ref("About"),
            "extra": open_object(),
        }),
        &[],
    )
}

fn simple_recipe_schema() -> Value {
    strict_object(
        json!({
            "schema_version": schema_version_schema(),
            "context": context_schema(),
            "package": def_ref("Package"),
            "source": source_field(),
            "build": def_ref("Build"),
            "requirements": def_ref("Requirements"),
            "tests": tests_field(),
            "test": tests_field(),
            "about": def_ref("About"),
            "extra": open_object(),
        }),
        &["package"],
    )
}

fn complex_recipe_schema() -> Value {
    strict_object(
        json!({
            "schema_version": schema_version_schema(),
            "context": context_schema(),
            "recipe": def_ref("PackageIdentifier"),
            "source": source_field(),
            "build": def_ref("Build"),
            "outputs": conditional_list_or_item(&def_ref("Output")),
            "about": def_ref("About"),
            "extra": open_object(),
        }),
        &["outputs"],
    )
}
