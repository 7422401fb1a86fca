//! The `requirements` section: dependencies per environment plus run-export
//! handling

use marked_yaml::Node as MarkedNode;
use recipe_schema_yaml::{
    ConditionalList, MatchSpec, NonEmptyStr, ParseError, ParseMapping, ParseNode, ParseResult,
    get_span, is_null, node_kind, validate_mapping_fields,
};
use serde::Serialize;

pub const REQUIREMENTS_FIELDS: &[&str] = &[
    "build",
    "host",
    "run",
    "run_constraints",
    "run_exports",
    "ignore_run_exports",
];
pub const RUN_EXPORTS_FIELDS: &[&str] = &[
    "weak",
    "strong",
    "noarch",
    "weak_constraints",
    "strong_constraints",
];
pub const IGNORE_RUN_EXPORTS_FIELDS: &[&str] = &["by_name", "from_package"];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Requirements {
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub build: ConditionalList<MatchSpec>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub host: ConditionalList<MatchSpec>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub run: ConditionalList<MatchSpec>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub run_constraints: ConditionalList<MatchSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_exports: Option<RunExports>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_run_exports: Option<IgnoreRunExports>,
}

/// Run exports: either a plain list of specs (shorthand for `weak`) or a
/// mapping bucketed by export strength.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RunExports {
    Specs(ConditionalList<MatchSpec>),
    Buckets(RunExportBuckets),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunExportBuckets {
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub weak: ConditionalList<MatchSpec>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub strong: ConditionalList<MatchSpec>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub noarch: ConditionalList<MatchSpec>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub weak_constraints: ConditionalList<MatchSpec>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub strong_constraints: ConditionalList<MatchSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IgnoreRunExports {
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub by_name: ConditionalList<NonEmptyStr>,
    #[serde(skip_serializing_if = "ConditionalList::is_empty")]
    pub from_package: ConditionalList<NonEmptyStr>,
}

pub(crate) fn parse_requirements(node: &MarkedNode) -> ParseResult<Requirements> {
    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;

    // The flat spelling was folded into the nested mapping; point old
    // recipes at the new shape instead of the generic field list.
    if mapping.contains_key("ignore_run_exports_from") {
        return Err(ParseError::unrecognized_field(
            "requirements",
            "ignore_run_exports_from",
            get_span(node),
        )
        .with_suggestion("use `ignore_run_exports` with a `from_package` list"));
    }

    validate_mapping_fields(mapping, "requirements", REQUIREMENTS_FIELDS)?;

    let run_exports = match mapping.get("run_exports") {
        Some(exports) if !is_null(exports) => Some(parse_run_exports(exports)?),
        _ => None,
    };
    let ignore_run_exports = match mapping.get("ignore_run_exports") {
        Some(ignore) if !is_null(ignore) => Some(parse_ignore_run_exports(ignore)?),
        _ => None,
    };

    Ok(Requirements {
        build: node
            .try_get_conditional_list_or_item("build")?
            .unwrap_or_default(),
        host: node
            .try_get_conditional_list_or_item("host")?
            .unwrap_or_default(),
        run: node
            .try_get_conditional_list_or_item("run")?
            .unwrap_or_default(),
        run_constraints: node
            .try_get_conditional_list_or_item("run_constraints")?
            .unwrap_or_default(),
        run_exports,
        ignore_run_exports,
    })
}

fn parse_run_exports(node: &MarkedNode) -> ParseResult<RunExports> {
    match node.as_mapping() {
        Some(mapping) if !recipe_schema_yaml::is_conditional(node) => {
            validate_mapping_fields(mapping, "requirements.run_exports", RUN_EXPORTS_FIELDS)?;
            Ok(RunExports::Buckets(RunExportBuckets {
                weak: node
                    .try_get_conditional_list_or_item("weak")?
                    .unwrap_or_default(),
                strong: node
                    .try_get_conditional_list_or_item("strong")?
                    .unwrap_or_default(),
                noarch: node
                    .try_get_conditional_list_or_item("noarch")?
                    .unwrap_or_default(),
                weak_constraints: node
                    .try_get_conditional_list_or_item("weak_constraints")?
                    .unwrap_or_default(),
                strong_constraints: node
                    .try_get_conditional_list_or_item("strong_constraints")?
                    .unwrap_or_default(),
            }))
        }
        _ => Ok(RunExports::Specs(
            node.parse_conditional_list_or_item("requirements.run_exports")?,
        )),
    }
}

fn parse_ignore_run_exports(node: &MarkedNode) -> ParseResult<IgnoreRunExports> {
    let mapping = node
        .as_mapping()
        .ok_or_else(|| ParseError::expected_type("mapping", node_kind(node), get_span(node)))?;

    validate_mapping_fields(
        mapping,
        "requirements.ignore_run_exports",
        IGNORE_RUN_EXPORTS_FIELDS,
    )?;

    Ok(IgnoreRunExports {
        by_name: node
            .try_get_conditional_list_or_item("by_name")?
            .unwrap_or_default(),
        from_package: node
            .try_get_conditional_list_or_item("from_package")?
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> ParseResult<Requirements> {
        let node = recipe_schema_yaml::parse_yaml(yaml).unwrap();
        let requirements = node.as_mapping().unwrap().get("requirements").unwrap();
        parse_requirements(requirements)
    }

    #[test]
    fn test_parse_requirements() {
        let requirements = parse(
            r#"
requirements:
  build:
    - ${{ compiler('cxx') }}
    - cmake
  host:
    - xtl >=0.7,<0.8
  run:
    - xtl >=0.7,<0.8
"#,
        )
        .unwrap();
        assert_eq!(requirements.build.len(), 2);
        assert_eq!(requirements.host.len(), 1);
        assert!(requirements.run_exports.is_none());
    }

    #[test]
    fn test_conditional_dependency() {
        let requirements = parse(
            r#"
requirements:
  run:
    - if: win
      then: vs2019_win-64
      else: gxx
"#,
        )
        .unwrap();
        assert!(requirements.run.iter().next().unwrap().is_conditional());
    }

    #[test]
    fn test_run_exports_shorthand_list() {
        let requirements = parse(
            r#"
requirements:
  run_exports:
    - xtensor >=0.24
"#,
        )
        .unwrap();
        assert!(matches!(
            requirements.run_exports,
            Some(RunExports::Specs(_))
        ));
    }

    #[test]
    fn test_run_exports_buckets() {
        let requirements = parse(
            r#"
requirements:
  run_exports:
    weak:
      - xtensor >=0.24
    strong_constraints:
      - xsimd <10
"#,
        )
        .unwrap();
        let Some(RunExports::Buckets(buckets)) = requirements.run_exports else {
            panic!("expected bucketed run exports");
        };
        assert_eq!(buckets.weak.len(), 1);
        assert_eq!(buckets.strong_constraints.len(), 1);
    }

    #[test]
    fn test_run_exports_unknown_bucket_rejected() {
        let err = parse(
            r#"
requirements:
  run_exports:
    feeble:
      - xtensor
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::UnrecognizedField { .. }));
    }

    #[test]
    fn test_ignore_run_exports() {
        let requirements = parse(
            r#"
requirements:
  ignore_run_exports:
    by_name:
      - libstdcxx
    from_package:
      - zlib
"#,
        )
        .unwrap();
        let ignore = requirements.ignore_run_exports.unwrap();
        assert_eq!(ignore.by_name.len(), 1);
        assert_eq!(ignore.from_package.len(), 1);
    }

    #[test]
    fn test_flat_ignore_run_exports_rejected_with_hint() {
        let err = parse(
            r#"
requirements:
  ignore_run_exports_from:
    - zlib
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::UnrecognizedField { .. }));
        assert!(err.suggestion().unwrap().contains("from_package"));
    }
}
