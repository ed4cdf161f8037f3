use std::sync::Arc;

use crate::{
    build::{
        any_field, extract_extensions, malformed, prepare_root, string_field, Build, BuildContext,
        BuildError,
    },
    hash::{hash_fields, node_map_part, node_part, scalar_part, HashBytes, StableHash},
    node::{Node, NodeKind},
    refs::{Extensions, NodeReference},
};

/// An example of a schema, parameter, or media type value. The value is kept
/// as an opaque node since examples carry arbitrary YAML.
///
/// See <https://spec.openapis.org/oas/v3.1.1#example-object>.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    /// Short description for the example.
    pub summary: Option<NodeReference<String>>,

    /// Long description for the example.
    pub description: Option<NodeReference<String>>,

    /// Embedded literal example value.
    pub value: Option<NodeReference<Arc<Node>>>,

    /// A URI that identifies the literal example, for values that cannot
    /// easily be included in the document.
    pub external_value: Option<NodeReference<String>>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Build for Example {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for Example", &root));
        }

        let example = Example {
            summary: string_field("summary", &root),
            description: string_field("description", &root),
            value: any_field("value", &root),
            external_value: string_field("externalValue", &root),
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(example, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for Example {
    // Hash field order: summary, description, value, externalValue,
    // extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            scalar_part(&self.summary),
            scalar_part(&self.description),
            node_part(&self.value),
            scalar_part(&self.external_value),
            node_map_part(&self.extensions),
        ])
    }
}
