use std::sync::Arc;

use crate::{
    build::{
        bool_field, extract_extensions, extract_map, malformed, prepare_root, string_field, Build,
        BuildContext, BuildError,
    },
    hash::{hash_fields, map_part, node_map_part, scalar_part, HashBytes, StableHash},
    low::MediaType,
    node::{Node, NodeKind},
    refs::{Extensions, Fields, NodeReference},
};

/// Describes a single request body.
///
/// See <https://spec.openapis.org/oas/v3.1.1#request-body-object>.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBody {
    /// A brief description of the request body.
    pub description: Option<NodeReference<String>>,

    /// The content of the request body, keyed by media type or media type
    /// range.
    pub content: Fields<MediaType>,

    /// Determines if the request body is required in the request.
    pub required: Option<NodeReference<bool>>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Build for RequestBody {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for Request Body", &root));
        }

        let request_body = RequestBody {
            description: string_field("description", &root),
            content: extract_map("content", &root, ctx)?,
            required: bool_field("required", &root, ctx),
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(request_body, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for RequestBody {
    // Hash field order: description, content, required, extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            scalar_part(&self.description),
            map_part(&self.content),
            scalar_part(&self.required),
            node_map_part(&self.extensions),
        ])
    }
}
