use std::sync::Arc;

use crate::{
    build::{
        extract_extensions, extract_object, malformed, prepare_root, string_field, Build,
        BuildContext, BuildError,
    },
    hash::{hash_fields, node_map_part, object_part, scalar_part, HashBytes, StableHash},
    low::ExternalDoc,
    node::{Node, NodeKind},
    refs::{Extensions, NodeReference},
};

/// Adds metadata to a single tag that is used by the
/// [Operation Object](crate::low::Operation).
///
/// See <https://spec.openapis.org/oas/v3.1.1#tag-object>.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    /// The name of the tag.
    pub name: Option<NodeReference<String>>,

    /// A description for the tag.
    pub description: Option<NodeReference<String>>,

    /// Additional external documentation for this tag.
    pub external_docs: Option<NodeReference<ExternalDoc>>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Build for Tag {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for Tag", &root));
        }

        let tag = Tag {
            name: string_field("name", &root),
            description: string_field("description", &root),
            external_docs: extract_object("externalDocs", &root, ctx)?,
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(tag, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for Tag {
    // Hash field order: name, description, externalDocs, extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            scalar_part(&self.name),
            scalar_part(&self.description),
            object_part(&self.external_docs),
            node_map_part(&self.extensions),
        ])
    }
}
