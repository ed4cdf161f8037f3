use std::sync::Arc;

use crate::{
    build::{
        extract_extensions, malformed, prepare_root, string_field, string_map, Build, BuildContext,
        BuildError,
    },
    hash::{hash_fields, node_map_part, scalar_part, string_map_part, HashBytes, StableHash},
    node::{Node, NodeKind},
    refs::{Extensions, Fields, NodeReference},
};

/// Aids in serialization, deserialization, and validation when request
/// bodies or response payloads may be one of a number of different schemas.
///
/// See <https://spec.openapis.org/oas/v3.1.1#discriminator-object>.
#[derive(Debug, Clone, PartialEq)]
pub struct Discriminator {
    /// The name of the property in the payload that will hold the
    /// discriminating value.
    pub property_name: Option<NodeReference<String>>,

    /// Mappings between payload values and schema names or URI references.
    pub mapping: Fields<String>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Build for Discriminator {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for Discriminator", &root));
        }

        let discriminator = Discriminator {
            property_name: string_field("propertyName", &root),
            mapping: string_map("mapping", &root),
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(discriminator, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for Discriminator {
    // Hash field order: propertyName, mapping, extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            scalar_part(&self.property_name),
            string_map_part(&self.mapping),
            node_map_part(&self.extensions),
        ])
    }
}
