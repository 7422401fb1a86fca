//! End-to-end validation scenarios

use pretty_assertions::assert_eq;
use recipe_schema::{
    ParseError, Recipe, Source, validate_from_source, parse_variant_config_from_source,
};

#[test]
fn accepts_a_full_single_output_recipe() {
    let recipe = validate_from_source(
        r#"
schema_version: 1

context:
  version: 0.24.0

package:
  name: xtensor
  version: ${{ version }}

source:
  url: https://github.com/xtensor-stack/xtensor/archive/${{ version }}.tar.gz
  sha256: 37738aa0865350b39f048e638735c05b78b1ea27a5e09f73d14bb8f3b0247eaa

build:
  number: 0
  script:
    - if: win
      then: |
        cmake -G "NMake Makefiles" ..
      else: |
        cmake ..

requirements:
  build:
    - ${{ compiler('cxx') }}
    - cmake
    - if: unix
      then: make
  host:
    - xtl >=0.7,<0.8
  run:
    - xtl >=0.7,<0.8
  run_exports:
    weak:
      - xtensor >=0.24

tests:
  - package_contents:
      include:
        - xtensor/xtensor.hpp
  - downstream: xtensor-python

about:
  homepage: https://github.com/xtensor-stack/xtensor
  license: BSD-3-Clause
  license_file: LICENSE
  summary: The C++ tensor algebra library

extra:
  recipe-maintainers:
    - some-maintainer
"#,
    )
    .unwrap();

    let Recipe::Simple(recipe) = recipe else {
        panic!("expected a single-output recipe");
    };
    assert_eq!(recipe.schema_version, 1);
    assert_eq!(recipe.package.name.to_string(), "xtensor");
    assert!(recipe.package.version.is_template());
    assert_eq!(recipe.requirements.build.len(), 3);
    assert_eq!(recipe.tests.len(), 2);
    assert_eq!(recipe.extra.len(), 1);
}

#[test]
fn accepts_a_multi_output_recipe() {
    let recipe = validate_from_source(
        r#"
context:
  version: 1.2.3

recipe:
  name: foo-split
  version: ${{ version }}

source:
  git: https://github.com/example/foo.git
  tag: v${{ version }}

outputs:
  - package:
      name: libfoo
    build:
      script: build_lib.sh
  - package:
      name: foo
    build:
      cache_from:
        - libfoo
    requirements:
      run:
        - if: linux
          then: patchelf
  - if: unix
    then:
      package:
        name: foo-devel
"#,
    )
    .unwrap();

    let Recipe::Complex(recipe) = recipe else {
        panic!("expected a multi-output recipe");
    };
    assert_eq!(recipe.outputs.len(), 3);
    assert!(recipe.outputs.iter().nth(2).unwrap().is_conditional());
}

// The fixed regression pair: a conditional inside the patches list is
// fine, the same conditional as the whole field value is not.
#[test]
fn listed_conditional_patches_accepted() {
    let recipe = validate_from_source(
        r#"
package: {name: foo, version: '1.0'}
source:
  url: https://example.com/foo.tar.gz
  patches:
    - always.patch
    - if: win
      then: win.patch
"#,
    )
    .unwrap();

    let Recipe::Simple(recipe) = recipe else {
        panic!("expected a single-output recipe");
    };
    let Some(Source::Url(url)) = recipe
        .source
        .iter()
        .next()
        .and_then(|i| i.as_value()?.as_concrete())
    else {
        panic!("expected a url source");
    };
    assert_eq!(url.patches.len(), 2);
}

#[test]
fn bare_conditional_patches_rejected() {
    let errors = validate_from_source(
        r#"
package: {name: foo, version: '1.0'}
source:
  url: https://example.com/foo.tar.gz
  patches:
    if: win
    then: win.patch
"#,
    )
    .unwrap_err();

    assert!(errors
        .iter()
        .any(|e| matches!(e, ParseError::ConditionalShapeMismatch { .. })));
}

#[test]
fn mixing_recipe_kinds_rejected() {
    let errors = validate_from_source(
        r#"
package:
  name: foo
  version: '1.0'
outputs:
  - package:
      name: libfoo
"#,
    )
    .unwrap_err();

    let unrecognized = errors
        .iter()
        .find_map(|e| match e {
            ParseError::UnrecognizedField { field, .. } => Some(field.as_str()),
            _ => None,
        })
        .unwrap();
    assert_eq!(unrecognized, "package");
}

#[test]
fn ambiguous_source_rejected() {
    let errors = validate_from_source(
        r#"
package: {name: foo, version: '1.0'}
source:
  git: https://github.com/example/foo.git
  path: ./foo
"#,
    )
    .unwrap_err();

    assert!(errors
        .iter()
        .any(|e| matches!(e, ParseError::NoMatchingAlternative { .. })));
}

#[test]
fn all_section_errors_reported_together() {
    let errors = validate_from_source(
        r#"
package:
  name: foo

source:
  url: https://example.com/foo.tar.gz
  md5: nothex

build:
  noarch: both

requirements:
  run_exports:
    feeble:
      - foo

about:
  homepage: not a url
"#,
    )
    .unwrap_err();

    assert_eq!(errors.len(), 5);
}

#[test]
fn variant_config_with_custom_axis() {
    let config = parse_variant_config_from_source(
        r#"
python:
  - "3.9"
  - "3.10"

custom_axis:
  - low
  - high

zip_keys:
  - [python, numpy]

pin_run_as_build:
  boost:
    max_pin: x.x
"#,
    )
    .unwrap();

    assert_eq!(config.variants.len(), 2);
    assert_eq!(config.variants["custom_axis"].len(), 2);
    assert_eq!(config.zip_keys.len(), 1);
    assert!(config.pin_run_as_build.contains_key("boost"));
}

#[test]
fn recipe_serializes_back_to_wire_names() {
    let recipe = validate_from_source(
        r#"
package: {name: foo, version: '1.0'}
requirements:
  run:
    - if: win
      then: vc
"#,
    )
    .unwrap();

    let json = serde_json::to_value(&recipe).unwrap();
    let conditional = &json["requirements"]["run"][0];
    assert_eq!(conditional["if"], "win");
    assert_eq!(conditional["then"], "vc");
}
