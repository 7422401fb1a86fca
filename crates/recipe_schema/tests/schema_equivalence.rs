//! The derived schema and the typed validator must agree: for every
//! corpus document, generic JSON-schema validation and typed construction
//! either both accept or both reject.

use recipe_schema::{derive_schema, derive_variant_schema, validate_from_source};

const VALID_RECIPES: &[&str] = &[
    // minimal
    "package: {name: foo, version: '1.0'}\n",
    // templates and conditionals everywhere
    r#"
context:
  version: 0.24.0
package:
  name: xtensor
  version: ${{ version }}
source:
  - url: https://github.com/xtensor-stack/xtensor/archive/${{ version }}.tar.gz
    sha256: 37738aa0865350b39f048e638735c05b78b1ea27a5e09f73d14bb8f3b0247eaa
  - if: unix
    then:
      path: ./vendored
build:
  number: 0
  skip:
    - win
requirements:
  build:
    - cmake
    - if: unix
      then: make
      else: ninja
tests:
  - python:
      imports:
        - xtensor
about:
  homepage: https://github.com/xtensor-stack/xtensor
  license: BSD-3-Clause
"#,
    // multi-output
    r#"
recipe:
  name: split
  version: '1.0'
outputs:
  - package:
      name: liba
    build:
      script: build.sh
  - package:
      name: a
    requirements:
      run:
        - liba
"#,
    // deprecated aliases
    r#"
package: {name: foo, version: '1.0'}
source:
  url: https://example.com/foo.tar.gz
  folder: vendored
test:
  - downstream: bar
"#,
    // empty sections: an explicit null section reads as absent
    r#"
package: {name: foo, version: '1.0'}
source:
build:
requirements:
about:
"#,
    // null-valued optional fields read as absent too
    r#"
package: {name: foo, version: '1.0'}
source:
  url: https://example.com/foo.tar.gz
  sha256: null
  file_name: ~
build:
  number: 0
  string: null
about:
  license: null
  homepage:
"#,
    // structured script, run export buckets, prefix detection
    r#"
package: {name: foo, version: '1.0'}
build:
  script:
    interpreter: bash
    env:
      CFLAGS: "-O2"
    file: build.sh
  prefix_detection:
    ignore:
      - bin/foo
requirements:
  run_exports:
    weak:
      - foo >=1
  ignore_run_exports:
    by_name:
      - libstdcxx
"#,
];

const INVALID_RECIPES: &[&str] = &[
    // unknown field
    "package: {name: foo, version: '1.0', vendor: acme}\n",
    // missing required version
    "package: {name: foo}\n",
    // malformed digest
    r#"
package: {name: foo, version: '1.0'}
source:
  url: https://example.com/foo.tar.gz
  sha256: nothex
"#,
    // bare conditional where a list is required
    r#"
package: {name: foo, version: '1.0'}
source:
  url: https://example.com/foo.tar.gz
  patches:
    if: win
    then: win.patch
"#,
    // conflicting source discriminants
    r#"
package: {name: foo, version: '1.0'}
source:
  git: https://github.com/example/foo.git
  path: ./foo
"#,
    // conflicting git checkout targets
    r#"
package: {name: foo, version: '1.0'}
source:
  git: https://github.com/example/foo.git
  rev: abc123
  branch: main
"#,
    // both recipe kinds at once
    r#"
package: {name: foo, version: '1.0'}
outputs:
  - package: {name: libfoo}
"#,
    // unsupported schema version
    "schema_version: 2\npackage: {name: foo, version: '1.0'}\n",
    // conflicting test markers
    r#"
package: {name: foo, version: '1.0'}
tests:
  - script: check.sh
    downstream: bar
"#,
    // unknown key inside an if/then/else
    r#"
package: {name: foo, version: '1.0'}
requirements:
  run:
    - if: win
      then: vc
      otherwise: gcc
"#,
];

fn schema_accepts(schema: &serde_json::Value, document: &str) -> bool {
    let validator = jsonschema::validator_for(schema).expect("schema compiles");
    let instance: serde_json::Value = serde_yaml::from_str(document).expect("corpus yaml parses");
    validator.is_valid(&instance)
}

#[test]
fn typed_and_generic_validation_agree_on_valid_documents() {
    let schema = derive_schema();
    for document in VALID_RECIPES {
        assert!(
            validate_from_source(document).is_ok(),
            "typed validation rejected:\n{document}"
        );
        assert!(
            schema_accepts(&schema, document),
            "schema validation rejected:\n{document}"
        );
    }
}

#[test]
fn typed_and_generic_validation_agree_on_invalid_documents() {
    let schema = derive_schema();
    for document in INVALID_RECIPES {
        assert!(
            validate_from_source(document).is_err(),
            "typed validation accepted:\n{document}"
        );
        assert!(
            !schema_accepts(&schema, document),
            "schema validation accepted:\n{document}"
        );
    }
}

#[test]
fn variant_schema_accepts_open_axes() {
    let schema = derive_variant_schema();
    let accepted = r#"
python:
  - "3.9"
custom_axis:
  - low
empty_axis:
zip_keys:
  - [python, numpy]
pin_run_as_build:
  boost:
    max_pin: x.x
"#;
    assert!(schema_accepts(&schema, accepted));

    let rejected = r#"
pin_run_as_build:
  boost:
    exact_pin: x.x
"#;
    assert!(!schema_accepts(&schema, rejected));
}

#[test]
fn schema_rendering_is_stable() {
    let first = serde_json::to_vec(&derive_schema()).unwrap();
    let second = serde_json::to_vec(&derive_schema()).unwrap();
    assert_eq!(first, second);
}
