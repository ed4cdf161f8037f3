//! The root document object and its build orchestration.

use std::{sync::Arc, thread};

use crate::{
    build::{
        extract_array, extract_extensions, extract_map, extract_object, string_field, string_list,
        BuildContext, BuildError,
    },
    diagnostic::Diagnostic,
    hash::{
        hash_fields, list_part, map_part, node_map_part, object_part, scalar_list_part,
        scalar_part, HashBytes, StableHash,
    },
    index::SpecIndex,
    low::{Components, ExternalDoc, Info, PathItem, SecurityRequirement, Server, Tag},
    node::Node,
    refs::{Extensions, Fields, NodeReference, ValueReference},
    version::SpecVersion,
};

/// The root object of an OpenAPI or Swagger document.
///
/// Construction never fails outright once the version key has been found:
/// fatal section failures are reported as diagnostics and the affected
/// sections are left empty, so callers can always inspect what did build.
#[derive(Debug)]
pub struct Document {
    /// Flavour the document was interpreted as.
    pub spec_version: SpecVersion,

    /// The raw `openapi`/`swagger` version field.
    pub version: NodeReference<String>,

    /// 3.1: the default `$schema` dialect for schema objects.
    pub json_schema_dialect: Option<NodeReference<String>>,

    /// 3.2: the base URI of the document itself.
    pub self_uri: Option<NodeReference<String>>,

    /// Metadata about the API.
    pub info: Option<NodeReference<Info>>,

    /// Connectivity information, in source order.
    pub servers: Vec<ValueReference<Server>>,

    /// Relative paths to endpoints, in source order.
    pub paths: Fields<PathItem>,

    /// 3.1: incoming webhooks, in source order.
    pub webhooks: Fields<PathItem>,

    /// Reusable objects; populated from `components` in 3.x documents and
    /// from the root definition containers in 2.0 documents.
    pub components: Option<NodeReference<Components>>,

    /// Security mechanisms usable across the API.
    pub security: Vec<ValueReference<SecurityRequirement>>,

    /// Tags with additional metadata, in source order.
    pub tags: Vec<ValueReference<Tag>>,

    /// Additional external documentation.
    pub external_docs: Option<NodeReference<ExternalDoc>>,

    /// 2.0: host serving the API.
    pub host: Option<NodeReference<String>>,

    /// 2.0: base path on which the API is served.
    pub base_path: Option<NodeReference<String>>,

    /// 2.0: transfer protocols of the API.
    pub schemes: Vec<ValueReference<String>>,

    /// 2.0: MIME types the API can consume.
    pub consumes: Vec<ValueReference<String>>,

    /// 2.0: MIME types the API can produce.
    pub produces: Vec<ValueReference<String>>,

    /// Specification extensions.
    pub extensions: Extensions,

    index: Arc<SpecIndex>,
    root_node: Arc<Node>,
}

impl Document {
    /// The index built over this document.
    pub fn index(&self) -> &Arc<SpecIndex> {
        &self.index
    }

    /// The document's root mapping node.
    pub fn root_node(&self) -> &Arc<Node> {
        &self.root_node
    }

    /// Builds the document by dispatching each top-level section to its own
    /// worker; the fan-out within sections goes through the shared pipeline.
    /// Returns the document plus any fatal section diagnostics.
    pub(crate) fn build(
        ctx: &BuildContext,
        version: SpecVersion,
        version_key: Arc<Node>,
        version_value: Arc<Node>,
    ) -> (Document, Vec<Diagnostic>) {
        let root = Arc::clone(
            ctx.index()
                .document()
                .root
                .content
                .first()
                .expect("version detection implies a root mapping"),
        );

        let mut fatals = Vec::new();

        let (info, servers, tags, security, external_docs, paths, webhooks, components) =
            thread::scope(|scope| {
                let info = scope.spawn(|| extract_object::<Info>("info", &root, ctx));
                let servers = scope.spawn(|| extract_array::<Server>("servers", &root, ctx));
                let tags = scope.spawn(|| extract_array::<Tag>("tags", &root, ctx));
                let security =
                    scope.spawn(|| extract_array::<SecurityRequirement>("security", &root, ctx));
                let external_docs =
                    scope.spawn(|| extract_object::<ExternalDoc>("externalDocs", &root, ctx));
                let paths = scope.spawn(|| extract_map::<PathItem>("paths", &root, ctx));
                let webhooks = scope.spawn(|| extract_map::<PathItem>("webhooks", &root, ctx));
                let components = scope.spawn(|| {
                    if version.is_v3() {
                        extract_object::<Components>("components", &root, ctx)
                    } else {
                        Components::build_v2(&root, ctx).map(Some)
                    }
                });

                (
                    settle(info.join().expect("info section"), &mut fatals),
                    settle(servers.join().expect("servers section"), &mut fatals),
                    settle(tags.join().expect("tags section"), &mut fatals),
                    settle(security.join().expect("security section"), &mut fatals),
                    settle(external_docs.join().expect("externalDocs section"), &mut fatals),
                    settle(paths.join().expect("paths section"), &mut fatals),
                    settle(webhooks.join().expect("webhooks section"), &mut fatals),
                    settle(components.join().expect("components section"), &mut fatals),
                )
            });

        let document = Document {
            spec_version: version,
            version: NodeReference::new(
                version_value.value.clone(),
                Some(version_key),
                version_value,
            ),
            json_schema_dialect: string_field("jsonSchemaDialect", &root),
            self_uri: string_field("$self", &root),
            info,
            servers,
            paths,
            webhooks,
            components,
            security,
            tags,
            external_docs,
            host: string_field("host", &root),
            base_path: string_field("basePath", &root),
            schemes: string_list("schemes", &root),
            consumes: string_list("consumes", &root),
            produces: string_list("produces", &root),
            extensions: extract_extensions(&root),
            index: Arc::clone(ctx.index()),
            root_node: root,
        };

        (document, fatals)
    }
}

fn settle<T: Default>(result: Result<T, BuildError>, fatals: &mut Vec<Diagnostic>) -> T {
    match result {
        Ok(section) => section,
        Err(BuildError::Fatal(diagnostic)) => {
            fatals.push(diagnostic);
            T::default()
        }
        Err(BuildError::Skip) => T::default(),
    }
}

impl StableHash for Document {
    // Hash field order: version, jsonSchemaDialect, $self, info, servers,
    // paths, webhooks, components, security, tags, externalDocs, host,
    // basePath, schemes, consumes, produces, extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            self.version.value.clone(),
            scalar_part(&self.json_schema_dialect),
            scalar_part(&self.self_uri),
            object_part(&self.info),
            list_part(&self.servers),
            map_part(&self.paths),
            map_part(&self.webhooks),
            object_part(&self.components),
            list_part(&self.security),
            list_part(&self.tags),
            object_part(&self.external_docs),
            scalar_part(&self.host),
            scalar_part(&self.base_path),
            scalar_list_part(&self.schemes),
            scalar_list_part(&self.consumes),
            scalar_list_part(&self.produces),
            node_map_part(&self.extensions),
        ])
    }
}
