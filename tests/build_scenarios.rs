//! End-to-end builds of literal documents.

use indoc::indoc;
use oasdoc::{
    hash::StableHash,
    low::{PathItem, TypeSet},
    CircularKind, DiagnosticKind, SpecVersion,
};
use pretty_assertions::assert_eq;

fn path_item<'doc>(document: &'doc oasdoc::low::Document, path: &str) -> &'doc PathItem {
    document
        .paths
        .iter()
        .find(|(key, _)| key.value == path)
        .map(|(_, item)| &item.value)
        .unwrap_or_else(|| panic!("path `{path}` not built"))
}

#[test]
fn minimal_three_zero_document() {
    let result = oasdoc::from_str(indoc! {"
        openapi: 3.0.0
        info: {title: T, version: '1'}
        paths: {}
    "})
    .unwrap();

    assert_eq!(result.diagnostics, vec![]);

    let document = &result.document;
    assert_eq!(document.version.value, "3.0.0");
    assert_eq!(document.spec_version, SpecVersion::V30);
    assert!(document.paths.is_empty());

    let info = document.info.as_ref().unwrap();
    assert_eq!(info.value.title.as_ref().unwrap().value, "T");
    assert_eq!(info.value.version.as_ref().unwrap().value, "1");
}

#[test]
fn referenced_path_item_records_pointer_and_hashes_as_inlined() {
    let referenced = oasdoc::from_str(indoc! {r#"
        openapi: 3.1.0
        paths:
          /a: {$ref: '#/components/pathItems/shared'}
        components:
          pathItems:
            shared: {get: {description: "ok", responses: {"200": {description: ok}}}}
    "#})
    .unwrap();

    assert!(!referenced.has_errors(), "{:?}", referenced.diagnostics);

    let document = &referenced.document;
    let entry = document.paths.first().unwrap().1;
    assert_eq!(
        entry.reference.as_deref(),
        Some("#/components/pathItems/shared")
    );

    let item = path_item(document, "/a");
    let get = item.get.as_ref().unwrap();
    assert_eq!(get.value.description.as_ref().unwrap().value, "ok");

    let inlined = oasdoc::from_str(indoc! {r#"
        openapi: 3.1.0
        paths:
          /a: {get: {description: "ok", responses: {"200": {description: ok}}}}
    "#})
    .unwrap();

    assert_eq!(
        item.stable_hash(),
        path_item(&inlined.document, "/a").stable_hash(),
    );
}

#[test]
fn tolerated_self_referencing_schema() {
    let result = oasdoc::from_str(indoc! {"
        openapi: 3.0.0
        paths: {}
        components:
          schemas:
            Node:
              type: object
              properties: {next: {$ref: '#/components/schemas/Node'}}
    "})
    .unwrap();

    assert_eq!(result.diagnostics.len(), 1);

    let diagnostic = &result.diagnostics[0];
    assert_eq!(
        diagnostic.kind,
        DiagnosticKind::CircularReference(CircularKind::Object)
    );
    assert!(!diagnostic.is_fatal());
    assert_eq!(
        diagnostic.cycle,
        vec![
            "#/components/schemas/Node".to_owned(),
            "#/components/schemas/Node".to_owned(),
        ]
    );

    // The document still materialises, with the back-edge as a stub.
    let components = result.document.components.as_ref().unwrap();
    let (_, node_schema) = components.value.schemas.first().unwrap();
    let schema = node_schema.value.schema().unwrap();
    let (_, next) = schema.properties.first().unwrap();
    assert_eq!(next.value.reference(), Some("#/components/schemas/Node"));
}

#[test]
fn unknown_reference_is_reported_exactly_once() {
    let result = oasdoc::from_str(indoc! {"
        openapi: 3.0.0
        paths: {}
        components:
          schemas:
            A: {$ref: '#/nowhere'}
    "})
    .unwrap();

    let unresolved: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.kind == DiagnosticKind::UnresolvedReference)
        .collect();

    assert_eq!(unresolved.len(), 1);
    assert!(unresolved[0].message.contains("#/nowhere"));
    assert!(unresolved[0].is_fatal());
    assert!(unresolved[0].line > 0);
}

#[test]
fn sibling_key_reordering_keeps_components_hash() {
    let forward = oasdoc::from_str(indoc! {"
        openapi: 3.0.0
        paths: {}
        components:
          schemas:
            Pet:
              type: object
              properties:
                name: {type: string}
                age: {type: integer}
    "})
    .unwrap();

    let backward = oasdoc::from_str(indoc! {"
        openapi: 3.0.0
        paths: {}
        components:
          schemas:
            Pet:
              type: object
              properties:
                age: {type: integer}
                name: {type: string}
    "})
    .unwrap();

    let forward_components = forward.document.components.as_ref().unwrap();
    let backward_components = backward.document.components.as_ref().unwrap();

    assert_eq!(
        forward_components.value.stable_hash(),
        backward_components.value.stable_hash(),
    );
}

#[test]
fn three_one_multi_type_stays_in_source_order() {
    let result = oasdoc::from_str(indoc! {r#"
        openapi: 3.1.0
        paths: {}
        components:
          schemas:
            Name:
              type: [string, "null"]
    "#})
    .unwrap();

    let components = result.document.components.as_ref().unwrap();
    let (_, proxy) = components.value.schemas.first().unwrap();
    let schema = proxy.value.schema().unwrap();

    assert_eq!(
        schema.schema_type.as_ref().unwrap().value,
        TypeSet::Multi(vec!["string".to_owned(), "null".to_owned()])
    );
}

#[test]
fn ordered_maps_follow_source_order() {
    let result = oasdoc::from_str(indoc! {"
        openapi: 3.0.0
        paths:
          /zebra: {get: {description: z}}
          /apple: {post: {description: a}}
          /mango: {put: {description: m}}
    "})
    .unwrap();

    let paths: Vec<_> = result
        .document
        .paths
        .keys()
        .map(|key| key.value.as_str())
        .collect();

    assert_eq!(paths, vec!["/zebra", "/apple", "/mango"]);
}

#[test]
fn operation_level_reference_is_tolerated() {
    let result = oasdoc::from_str(indoc! {"
        openapi: 3.0.0
        paths:
          /a:
            get: {$ref: '#/x-shared/list'}
        x-shared:
          list:
            description: shared op
            responses:
              '200': {description: ok}
    "})
    .unwrap();

    assert!(!result.has_errors(), "{:?}", result.diagnostics);

    let item = path_item(&result.document, "/a");
    let get = item.get.as_ref().unwrap();
    assert_eq!(get.reference.as_deref(), Some("#/x-shared/list"));
    assert_eq!(get.value.description.as_ref().unwrap().value, "shared op");
}

#[test]
fn swagger_two_zero_document_keys() {
    let result = oasdoc::from_str(indoc! {"
        swagger: '2.0'
        info: {title: Legacy, version: '1'}
        host: api.example.com
        basePath: /v1
        schemes: [https, http]
        consumes: [application/json]
        produces: [application/json]
        paths:
          /pets:
            get:
              responses:
                '200':
                  description: ok
                  schema: {$ref: '#/definitions/Pets'}
        definitions:
          Pets:
            type: array
            items: {$ref: '#/definitions/Pet'}
          Pet:
            type: object
            properties:
              name: {type: string}
        securityDefinitions:
          key: {type: apiKey, name: X-Key, in: header}
    "})
    .unwrap();

    assert!(!result.has_errors(), "{:?}", result.diagnostics);

    let document = &result.document;
    assert_eq!(document.spec_version, SpecVersion::V2);
    assert_eq!(document.host.as_ref().unwrap().value, "api.example.com");
    assert_eq!(document.base_path.as_ref().unwrap().value, "/v1");

    let schemes: Vec<_> = document
        .schemes
        .iter()
        .map(|scheme| scheme.value.as_str())
        .collect();
    assert_eq!(schemes, vec!["https", "http"]);

    // 2.0 definition containers populate the unified components registries.
    let components = document.components.as_ref().unwrap();
    assert_eq!(components.value.schemas.len(), 2);
    assert_eq!(components.value.security_schemes.len(), 1);

    let response = path_item(document, "/pets")
        .get
        .as_ref()
        .unwrap()
        .value
        .responses
        .first()
        .unwrap()
        .1;
    let schema = response.value.schema.as_ref().unwrap();
    assert_eq!(schema.value.reference(), Some("#/definitions/Pets"));

    let pets = schema.value.schema().unwrap();
    let items = pets.items.as_ref().unwrap();
    assert_eq!(items.value.reference(), Some("#/definitions/Pet"));
}

#[test]
fn merge_keys_expand_before_extraction() {
    let result = oasdoc::from_str(indoc! {"
        openapi: 3.0.0
        x-defaults: &defaults
          description: shared description
        paths:
          /a:
            get:
              <<: *defaults
              responses:
                '200': {description: ok}
    "})
    .unwrap();

    assert!(!result.has_errors(), "{:?}", result.diagnostics);

    let get = path_item(&result.document, "/a").get.as_ref().unwrap();
    assert_eq!(
        get.value.description.as_ref().unwrap().value,
        "shared description"
    );
}

#[test]
fn extensions_are_captured_in_order_and_kept_out_of_maps() {
    let result = oasdoc::from_str(indoc! {"
        openapi: 3.0.0
        x-vendor-b: {flag: true}
        x-vendor-a: 7
        paths:
          /a: {get: {responses: {'200': {description: ok}}}}
          x-path-extension: ignored
    "})
    .unwrap();

    let document = &result.document;

    let extension_keys: Vec<_> = document
        .extensions
        .keys()
        .map(|key| key.value.as_str())
        .collect();
    assert_eq!(extension_keys, vec!["x-vendor-b", "x-vendor-a"]);

    let paths: Vec<_> = document
        .paths
        .keys()
        .map(|key| key.value.as_str())
        .collect();
    assert_eq!(paths, vec!["/a"]);
}

#[test]
fn missing_version_key_fails_fast() {
    assert!(matches!(
        oasdoc::from_str("info: {title: T}\n"),
        Err(oasdoc::Error::MissingRoot)
    ));
}

#[test]
fn positions_survive_into_the_model() {
    let result = oasdoc::from_str(indoc! {"
        openapi: 3.0.0
        info:
          title: T
          version: '1'
        paths: {}
    "})
    .unwrap();

    let info = result.document.info.as_ref().unwrap();
    let title = info.value.title.as_ref().unwrap();
    assert_eq!(title.value_node.line, 3);
    assert_eq!(title.key_node.as_ref().unwrap().line, 3);
    assert_eq!(title.value_node.column, 10);
}
