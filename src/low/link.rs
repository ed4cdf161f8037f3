use std::sync::Arc;

use crate::{
    build::{
        any_field, extract_extensions, extract_object, find_any_map, malformed, prepare_root,
        string_field, Build, BuildContext, BuildError,
    },
    hash::{
        hash_fields, node_map_part, node_part, object_part, scalar_part, HashBytes, StableHash,
    },
    low::Server,
    node::{Node, NodeKind},
    refs::{Extensions, Fields, NodeReference},
};

/// Represents a possible design-time link for a response.
///
/// The presence of a link does not guarantee the caller's ability to
/// successfully invoke it, rather it provides a known relationship and
/// traversal mechanism between responses and other operations.
///
/// See <https://spec.openapis.org/oas/v3.1.1#link-object>.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// A URI reference to an OAS operation.
    ///
    /// Mutually exclusive with `operationId`.
    pub operation_ref: Option<NodeReference<String>>,

    /// The name of an existing, resolvable OAS operation, as defined with a
    /// unique `operationId`.
    pub operation_id: Option<NodeReference<String>>,

    /// A map representing parameters to pass to an operation. Values are
    /// kept as opaque nodes since they may be any value or a runtime
    /// expression.
    pub parameters: Fields<Arc<Node>>,

    /// A literal value or runtime expression to use as a request body when
    /// calling the target operation.
    pub request_body: Option<NodeReference<Arc<Node>>>,

    /// A description of the link.
    pub description: Option<NodeReference<String>>,

    /// A server object to be used by the target operation.
    pub server: Option<NodeReference<Server>>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Build for Link {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for Link", &root));
        }

        let link = Link {
            operation_ref: string_field("operationRef", &root),
            operation_id: string_field("operationId", &root),
            parameters: find_any_map("parameters", &root),
            request_body: any_field("requestBody", &root),
            description: string_field("description", &root),
            server: extract_object("server", &root, ctx)?,
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(link, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for Link {
    // Hash field order: operationRef, operationId, parameters, requestBody,
    // description, server, extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            scalar_part(&self.operation_ref),
            scalar_part(&self.operation_id),
            node_map_part(&self.parameters),
            node_part(&self.request_body),
            scalar_part(&self.description),
            object_part(&self.server),
            node_map_part(&self.extensions),
        ])
    }
}
