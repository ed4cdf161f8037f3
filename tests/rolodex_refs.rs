//! Cross-document reference resolution through the rolodex.

use std::fs;

use indoc::indoc;
use oasdoc::{DiagnosticKind, DocumentConfig};
use pretty_assertions::assert_eq;

#[test]
fn file_references_resolve_and_build() {
    let dir = tempfile::tempdir().unwrap();

    fs::write(
        dir.path().join("shared.yaml"),
        indoc! {"
            Pet:
              type: object
              properties:
                name: {type: string}
        "},
    )
    .unwrap();

    let source = indoc! {"
        openapi: 3.0.0
        paths: {}
        components:
          schemas:
            Pet: {$ref: 'shared.yaml#/Pet'}
    "};

    let config = DocumentConfig {
        base_path: Some(dir.path().to_path_buf()),
        allow_file_references: true,
        ..DocumentConfig::default()
    };

    let result = oasdoc::create_document(source, config).unwrap();
    assert!(!result.has_errors(), "{:?}", result.diagnostics);

    let components = result.document.components.as_ref().unwrap();
    let (_, proxy) = components.value.schemas.first().unwrap();
    assert_eq!(proxy.value.reference(), Some("shared.yaml#/Pet"));

    let schema = proxy.value.schema().unwrap();
    let keys: Vec<_> = schema
        .properties
        .keys()
        .map(|key| key.value.as_str())
        .collect();
    assert_eq!(keys, vec!["name"]);
}

#[test]
fn from_path_seeds_base_path_for_siblings() {
    let dir = tempfile::tempdir().unwrap();

    fs::write(
        dir.path().join("defs.yaml"),
        "Id:\n  type: integer\n",
    )
    .unwrap();

    let root = dir.path().join("api.yaml");
    fs::write(
        &root,
        indoc! {"
            openapi: 3.0.0
            paths: {}
            components:
              schemas:
                Id: {$ref: 'defs.yaml#/Id'}
        "},
    )
    .unwrap();

    let result = oasdoc::from_path(&root).unwrap();
    assert!(!result.has_errors(), "{:?}", result.diagnostics);
}

#[test]
fn dangling_pointer_in_partial_file_is_a_warning() {
    let dir = tempfile::tempdir().unwrap();

    fs::write(
        dir.path().join("partial.yaml"),
        "Pet:\n  allOf:\n    - {$ref: '#/Missing'}\n",
    )
    .unwrap();

    let source = indoc! {"
        openapi: 3.0.0
        paths: {}
        components:
          schemas:
            Pet: {$ref: 'partial.yaml#/Pet'}
    "};

    let config = DocumentConfig {
        base_path: Some(dir.path().to_path_buf()),
        allow_file_references: true,
        ..DocumentConfig::default()
    };

    let result = oasdoc::create_document(source, config).unwrap();

    let unresolved: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.kind == DiagnosticKind::UnresolvedReference)
        .collect();

    assert_eq!(unresolved.len(), 1);
    assert!(!unresolved[0].is_fatal());
}

#[test]
fn disabled_file_lookups_surface_as_disallowed() {
    let result = oasdoc::from_str(indoc! {"
        openapi: 3.0.0
        paths: {}
        components:
          schemas:
            Pet: {$ref: 'shared.yaml#/Pet'}
    "})
    .unwrap();

    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(
        result.diagnostics[0].kind,
        DiagnosticKind::DisallowedReference
    );
    assert!(result.has_errors());
}

#[test]
fn file_filter_limits_reachable_documents() {
    let dir = tempfile::tempdir().unwrap();

    fs::write(dir.path().join("allowed.yaml"), "A: {type: string}\n").unwrap();
    fs::write(dir.path().join("blocked.yaml"), "B: {type: string}\n").unwrap();

    let source = indoc! {"
        openapi: 3.0.0
        paths: {}
        components:
          schemas:
            A: {$ref: 'allowed.yaml#/A'}
            B: {$ref: 'blocked.yaml#/B'}
    "};

    let config = DocumentConfig {
        base_path: Some(dir.path().to_path_buf()),
        allow_file_references: true,
        file_filter: Some(vec!["allowed.yaml".to_owned()]),
        ..DocumentConfig::default()
    };

    let result = oasdoc::create_document(source, config).unwrap();

    let disallowed: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.kind == DiagnosticKind::DisallowedReference)
        .collect();

    assert_eq!(disallowed.len(), 1);
    assert!(disallowed[0].message.contains("blocked.yaml"));
}

#[test]
fn cross_file_cycles_are_detected() {
    let dir = tempfile::tempdir().unwrap();

    fs::write(
        dir.path().join("a.yaml"),
        "A:\n  properties:\n    b: {$ref: 'b.yaml#/B'}\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("b.yaml"),
        "B:\n  properties:\n    a: {$ref: 'a.yaml#/A'}\n",
    )
    .unwrap();

    let source = indoc! {"
        openapi: 3.0.0
        paths: {}
        components:
          schemas:
            A: {$ref: 'a.yaml#/A'}
    "};

    let config = DocumentConfig {
        base_path: Some(dir.path().to_path_buf()),
        allow_file_references: true,
        ..DocumentConfig::default()
    };

    let result = oasdoc::create_document(source, config).unwrap();

    let cycles: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|diagnostic| {
            matches!(diagnostic.kind, DiagnosticKind::CircularReference(_))
        })
        .collect();

    assert_eq!(cycles.len(), 1);
    assert!(cycles[0]
        .cycle
        .iter()
        .any(|member| member.contains("a.yaml")));
}
