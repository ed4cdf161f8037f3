use std::sync::Arc;

use crate::{
    build::{
        extract_extensions, malformed, prepare_root, string_field, Build, BuildContext, BuildError,
    },
    hash::{hash_fields, node_map_part, scalar_part, HashBytes, StableHash},
    node::{Node, NodeKind},
    refs::{Extensions, NodeReference},
};

/// Allows referencing an external resource for extended documentation.
///
/// See <https://spec.openapis.org/oas/v3.1.1#external-documentation-object>.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalDoc {
    /// A description of the target documentation.
    pub description: Option<NodeReference<String>>,

    /// The URL for the target documentation.
    pub url: Option<NodeReference<String>>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Build for ExternalDoc {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for External Documentation", &root));
        }

        let doc = ExternalDoc {
            description: string_field("description", &root),
            url: string_field("url", &root),
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(doc, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for ExternalDoc {
    // Hash field order: description, url, extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            scalar_part(&self.description),
            scalar_part(&self.url),
            node_map_part(&self.extensions),
        ])
    }
}
