use std::sync::Arc;

use crate::{
    build::{build_fields, extract_extensions, malformed, prepare_root, Build, BuildContext, BuildError},
    hash::{hash_fields, map_part, node_map_part, HashBytes, StableHash},
    low::PathItem,
    node::{Node, NodeKind},
    refs::{Extensions, Fields, NodeReference},
};

/// A map of possible out-of-band callbacks related to the parent operation.
///
/// Each key is a runtime expression, evaluated at runtime against the parent
/// request, that identifies a URL for the callback; expressions are opaque
/// to the builder. Each value is a [Path Item](PathItem) describing the set
/// of requests that may be initiated by the API provider and the expected
/// responses.
///
/// See <https://spec.openapis.org/oas/v3.1.1#callback-object>.
#[derive(Debug, Clone, PartialEq)]
pub struct Callback {
    /// Runtime expression to the path item it triggers, in source order.
    pub expressions: Fields<PathItem>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Build for Callback {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for Callback", &root));
        }

        let callback = Callback {
            expressions: build_fields(&root, ctx)?,
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(callback, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for Callback {
    // Hash field order: expressions, extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            map_part(&self.expressions),
            node_map_part(&self.extensions),
        ])
    }
}
