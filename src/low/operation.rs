use std::sync::Arc;

use crate::{
    build::{
        bool_field, extract_array, extract_extensions, extract_map, extract_object, malformed,
        prepare_root, string_field, string_list, Build, BuildContext, BuildError,
    },
    hash::{
        hash_fields, list_part, map_part, node_map_part, object_part, scalar_list_part,
        scalar_part, HashBytes, StableHash,
    },
    low::{
        Callback, ExternalDoc, Parameter, RequestBody, Response, SecurityRequirement, Server,
    },
    node::{Node, NodeKind},
    refs::{Extensions, Fields, NodeReference, ValueReference},
};

/// Describes a single API operation on a path.
///
/// See <https://spec.openapis.org/oas/v3.1.1#operation-object>.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// A list of tags for API documentation control.
    ///
    /// Tags can be used for logical grouping of operations by resources or
    /// any other qualifier.
    pub tags: Vec<ValueReference<String>>,

    /// A short summary of what the operation does.
    pub summary: Option<NodeReference<String>>,

    /// A verbose explanation of the operation behavior.
    pub description: Option<NodeReference<String>>,

    /// Additional external documentation for this operation.
    pub external_docs: Option<NodeReference<ExternalDoc>>,

    /// String used to uniquely identify the operation within this document.
    pub operation_id: Option<NodeReference<String>>,

    /// A list of parameters that are applicable for this operation.
    pub parameters: Vec<ValueReference<Parameter>>,

    /// The request body applicable for this operation.
    pub request_body: Option<NodeReference<RequestBody>>,

    /// The possible responses, keyed by status code or `default`.
    pub responses: Fields<Response>,

    /// A map of possible out-of-band callbacks related to the parent
    /// operation, keyed by a unique identifier.
    pub callbacks: Fields<Callback>,

    /// Declares this operation to be deprecated.
    pub deprecated: Option<NodeReference<bool>>,

    /// A declaration of which security mechanisms can be used for this
    /// operation.
    pub security: Vec<ValueReference<SecurityRequirement>>,

    /// An alternative `servers` array to service this operation.
    pub servers: Vec<ValueReference<Server>>,

    /// 2.0: MIME types the operation can consume.
    pub consumes: Vec<ValueReference<String>>,

    /// 2.0: MIME types the operation can produce.
    pub produces: Vec<ValueReference<String>>,

    /// 2.0: transfer protocols for the operation.
    pub schemes: Vec<ValueReference<String>>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Build for Operation {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        // Operation-level `$ref` is outside the specification but common in
        // the wild; it resolves like any other reference.
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for Operation", &root));
        }

        let operation = Operation {
            tags: string_list("tags", &root),
            summary: string_field("summary", &root),
            description: string_field("description", &root),
            external_docs: extract_object("externalDocs", &root, ctx)?,
            operation_id: string_field("operationId", &root),
            parameters: extract_array("parameters", &root, ctx)?,
            request_body: extract_object("requestBody", &root, ctx)?,
            responses: extract_map("responses", &root, ctx)?,
            callbacks: extract_map("callbacks", &root, ctx)?,
            deprecated: bool_field("deprecated", &root, ctx),
            security: extract_array("security", &root, ctx)?,
            servers: extract_array("servers", &root, ctx)?,
            consumes: string_list("consumes", &root),
            produces: string_list("produces", &root),
            schemes: string_list("schemes", &root),
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(operation, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for Operation {
    // Hash field order: tags, summary, description, externalDocs,
    // operationId, parameters, requestBody, responses, callbacks,
    // deprecated, security, servers, consumes, produces, schemes,
    // extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            scalar_list_part(&self.tags),
            scalar_part(&self.summary),
            scalar_part(&self.description),
            object_part(&self.external_docs),
            scalar_part(&self.operation_id),
            list_part(&self.parameters),
            object_part(&self.request_body),
            map_part(&self.responses),
            map_part(&self.callbacks),
            scalar_part(&self.deprecated),
            list_part(&self.security),
            list_part(&self.servers),
            scalar_list_part(&self.consumes),
            scalar_list_part(&self.produces),
            scalar_list_part(&self.schemes),
            node_map_part(&self.extensions),
        ])
    }
}
