use std::sync::Arc;

use crate::{
    build::{
        extract_array, extract_extensions, extract_object, malformed, prepare_root, string_field,
        Build, BuildContext, BuildError,
    },
    hash::{hash_fields, list_part, node_map_part, object_part, scalar_part, HashBytes, StableHash},
    low::{Operation, Parameter, Server},
    node::{Node, NodeKind},
    refs::{Extensions, NodeReference, ValueReference},
};

/// Describes the operations available on a single path.
///
/// A Path Item MAY be empty, due to ACL constraints. The path itself is
/// still exposed to the documentation viewer but they will not know which
/// operations and parameters are available. A path item may also be a
/// `$ref`, in which case the built value records the pointer and carries the
/// resolved content.
///
/// See <https://spec.openapis.org/oas/v3.1.1#path-item-object>.
#[derive(Debug, Clone, PartialEq)]
pub struct PathItem {
    /// An optional string summary, intended to apply to all operations in
    /// this path.
    pub summary: Option<NodeReference<String>>,

    /// An optional string description, intended to apply to all operations
    /// in this path.
    pub description: Option<NodeReference<String>>,

    /// A definition of a GET operation on this path.
    pub get: Option<NodeReference<Operation>>,

    /// A definition of a PUT operation on this path.
    pub put: Option<NodeReference<Operation>>,

    /// A definition of a POST operation on this path.
    pub post: Option<NodeReference<Operation>>,

    /// A definition of a DELETE operation on this path.
    pub delete: Option<NodeReference<Operation>>,

    /// A definition of an OPTIONS operation on this path.
    pub options: Option<NodeReference<Operation>>,

    /// A definition of a HEAD operation on this path.
    pub head: Option<NodeReference<Operation>>,

    /// A definition of a PATCH operation on this path.
    pub patch: Option<NodeReference<Operation>>,

    /// A definition of a TRACE operation on this path.
    pub trace: Option<NodeReference<Operation>>,

    /// 3.2: a definition of a QUERY operation on this path.
    pub query: Option<NodeReference<Operation>>,

    /// An alternative `servers` array to service all operations in this
    /// path.
    pub servers: Vec<ValueReference<Server>>,

    /// A list of parameters applicable to all operations described under
    /// this path.
    pub parameters: Vec<ValueReference<Parameter>>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl PathItem {
    /// Iterates the defined operations with their lowercase verb names, in
    /// specification order.
    pub fn operations(&self) -> impl Iterator<Item = (&'static str, &NodeReference<Operation>)> {
        [
            ("get", &self.get),
            ("put", &self.put),
            ("post", &self.post),
            ("delete", &self.delete),
            ("options", &self.options),
            ("head", &self.head),
            ("patch", &self.patch),
            ("trace", &self.trace),
            ("query", &self.query),
        ]
        .into_iter()
        .filter_map(|(verb, operation)| operation.as_ref().map(|op| (verb, op)))
    }
}

impl Build for PathItem {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for Path Item", &root));
        }

        let path_item = PathItem {
            summary: string_field("summary", &root),
            description: string_field("description", &root),
            get: extract_object("get", &root, ctx)?,
            put: extract_object("put", &root, ctx)?,
            post: extract_object("post", &root, ctx)?,
            delete: extract_object("delete", &root, ctx)?,
            options: extract_object("options", &root, ctx)?,
            head: extract_object("head", &root, ctx)?,
            patch: extract_object("patch", &root, ctx)?,
            trace: extract_object("trace", &root, ctx)?,
            query: extract_object("query", &root, ctx)?,
            servers: extract_array("servers", &root, ctx)?,
            parameters: extract_array("parameters", &root, ctx)?,
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(path_item, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for PathItem {
    // Hash field order: summary, description, get, put, post, delete,
    // options, head, patch, trace, query, servers, parameters, extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            scalar_part(&self.summary),
            scalar_part(&self.description),
            object_part(&self.get),
            object_part(&self.put),
            object_part(&self.post),
            object_part(&self.delete),
            object_part(&self.options),
            object_part(&self.head),
            object_part(&self.patch),
            object_part(&self.trace),
            object_part(&self.query),
            list_part(&self.servers),
            list_part(&self.parameters),
            node_map_part(&self.extensions),
        ])
    }
}
