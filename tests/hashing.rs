//! Hash stability and concurrency determinism properties.

use indoc::indoc;
use oasdoc::{clear_hash_cache, hash::StableHash, DocumentConfig};
use pretty_assertions::assert_eq;

const SPEC: &str = indoc! {r#"
    openapi: 3.1.0
    info: {title: Petstore, version: '2'}
    servers:
      - url: https://api.example.com/v1
        description: production
    tags:
      - {name: pets, description: pet things}
    paths:
      /pets:
        get:
          operationId: listPets
          parameters:
            - name: limit
              in: query
              schema: {type: integer, format: int32}
          responses:
            '200':
              description: ok
              content:
                application/json:
                  schema: {$ref: '#/components/schemas/Pets'}
        post:
          operationId: createPet
          requestBody:
            required: true
            content:
              application/json:
                schema: {$ref: '#/components/schemas/Pet'}
          responses:
            '201': {description: created}
    webhooks:
      newPet:
        post:
          responses:
            '200': {description: ok}
    components:
      schemas:
        Pet:
          type: object
          required: [id, name]
          properties:
            id: {type: integer, format: int64}
            name: {type: string}
            tag: {type: [string, "null"]}
        Pets:
          type: array
          items: {$ref: '#/components/schemas/Pet'}
      securitySchemes:
        api_key: {type: apiKey, name: X-Key, in: header}
    security:
      - api_key: []
    x-vendor: {audit: true}
"#};

#[test]
fn repeated_builds_hash_identically() {
    let first = oasdoc::from_str(SPEC).unwrap();
    clear_hash_cache();
    let second = oasdoc::from_str(SPEC).unwrap();

    assert!(!first.has_errors(), "{:?}", first.diagnostics);
    assert_eq!(
        first.document.stable_hash(),
        second.document.stable_hash()
    );
}

#[test]
fn differing_values_hash_differently() {
    let original = oasdoc::from_str(SPEC).unwrap();
    let tweaked = oasdoc::from_str(&SPEC.replace("Petstore", "Petstore v2")).unwrap();

    assert_ne!(
        original.document.stable_hash(),
        tweaked.document.stable_hash()
    );
}

#[test]
fn worker_pool_size_does_not_change_results() {
    let serial = oasdoc::create_document(
        SPEC,
        DocumentConfig {
            max_workers: 1,
            ..DocumentConfig::default()
        },
    )
    .unwrap();

    clear_hash_cache();

    let parallel = oasdoc::create_document(
        SPEC,
        DocumentConfig {
            max_workers: 8,
            ..DocumentConfig::default()
        },
    )
    .unwrap();

    assert_eq!(serial.diagnostics, parallel.diagnostics);
    assert_eq!(
        serial.document.stable_hash(),
        parallel.document.stable_hash()
    );

    let serial_paths: Vec<_> = serial
        .document
        .paths
        .keys()
        .map(|key| key.value.clone())
        .collect();
    let parallel_paths: Vec<_> = parallel
        .document
        .paths
        .keys()
        .map(|key| key.value.clone())
        .collect();
    assert_eq!(serial_paths, parallel_paths);
}

#[test]
fn reference_hashes_match_their_targets() {
    let result = oasdoc::from_str(SPEC).unwrap();

    let components = result.document.components.as_ref().unwrap();
    let pets = components
        .value
        .schemas
        .iter()
        .find(|(key, _)| key.value == "Pets")
        .map(|(_, proxy)| &proxy.value)
        .unwrap();
    let pet = components
        .value
        .schemas
        .iter()
        .find(|(key, _)| key.value == "Pet")
        .map(|(_, proxy)| &proxy.value)
        .unwrap();

    let items = pets.schema().unwrap().items.as_ref().unwrap().value.clone();
    assert_eq!(items.reference(), Some("#/components/schemas/Pet"));
    assert_eq!(items.stable_hash(), pet.stable_hash());
}

#[test]
fn high_level_facade_reads_the_same_build() {
    let result = oasdoc::from_str(SPEC).unwrap();
    let api = result.openapi();

    assert_eq!(api.version(), "3.1.0");
    assert_eq!(api.title(), Some("Petstore"));
    assert_eq!(api.api_version(), Some("2"));
    assert_eq!(api.validate_version().unwrap().minor, 1);

    let server = api.primary_server().unwrap();
    assert_eq!(
        server.url.as_ref().unwrap().value,
        "https://api.example.com/v1"
    );

    let list = api.operation(&http::Method::GET, "/pets").unwrap();
    assert_eq!(list.operation_id.as_ref().unwrap().value, "listPets");

    let by_id = api.operation_by_id("createPet").unwrap();
    assert_eq!(by_id.summary, None);

    assert_eq!(api.operations().count(), 2);
    assert_eq!(api.schema_names(), vec!["Pet", "Pets"]);
    assert!(api.schema("Pet").is_some());

    let extensions = api.extensions();
    assert_eq!(
        extensions.get("vendor"),
        Some(&serde_json::json!({"audit": true}))
    );
}
