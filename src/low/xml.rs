use std::sync::Arc;

use crate::{
    build::{
        bool_field, extract_extensions, malformed, prepare_root, string_field, Build, BuildContext,
        BuildError,
    },
    hash::{hash_fields, node_map_part, scalar_part, HashBytes, StableHash},
    node::{Node, NodeKind},
    refs::{Extensions, NodeReference},
};

/// A metadata object that allows for more fine-tuned XML model definitions.
///
/// See <https://spec.openapis.org/oas/v3.1.1#xml-object>.
#[derive(Debug, Clone, PartialEq)]
pub struct Xml {
    /// Replaces the name of the element/attribute used for the described
    /// schema property.
    pub name: Option<NodeReference<String>>,

    /// The URI of the namespace definition.
    pub namespace: Option<NodeReference<String>>,

    /// The prefix to be used for the name.
    pub prefix: Option<NodeReference<String>>,

    /// Declares whether the property definition translates to an attribute
    /// instead of an element.
    pub attribute: Option<NodeReference<bool>>,

    /// Signifies whether the array is wrapped. Only takes effect on arrays.
    pub wrapped: Option<NodeReference<bool>>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Build for Xml {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for XML", &root));
        }

        let xml = Xml {
            name: string_field("name", &root),
            namespace: string_field("namespace", &root),
            prefix: string_field("prefix", &root),
            attribute: bool_field("attribute", &root, ctx),
            wrapped: bool_field("wrapped", &root, ctx),
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(xml, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for Xml {
    // Hash field order: name, namespace, prefix, attribute, wrapped,
    // extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            scalar_part(&self.name),
            scalar_part(&self.namespace),
            scalar_part(&self.prefix),
            scalar_part(&self.attribute),
            scalar_part(&self.wrapped),
            node_map_part(&self.extensions),
        ])
    }
}
