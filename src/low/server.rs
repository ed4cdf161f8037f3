use std::sync::Arc;

use crate::{
    build::{
        extract_extensions, extract_map, malformed, prepare_root, string_field, string_list, Build,
        BuildContext, BuildError,
    },
    hash::{
        hash_fields, map_part, node_map_part, scalar_list_part, scalar_part, HashBytes, StableHash,
    },
    node::{Node, NodeKind},
    refs::{Extensions, Fields, NodeReference, ValueReference},
};

/// An object representing an API server.
///
/// See <https://spec.openapis.org/oas/v3.1.1#server-object>.
#[derive(Debug, Clone, PartialEq)]
pub struct Server {
    /// A URL to the target host, supporting server variable substitutions in
    /// `{brackets}`.
    pub url: Option<NodeReference<String>>,

    /// A description of the host designated by the URL.
    pub description: Option<NodeReference<String>>,

    /// A map between a variable name and its value.
    ///
    /// The value is used for substitution in the server's URL template.
    pub variables: Fields<ServerVariable>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Build for Server {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for Server", &root));
        }

        let server = Server {
            url: string_field("url", &root),
            description: string_field("description", &root),
            variables: extract_map("variables", &root, ctx)?,
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(server, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for Server {
    // Hash field order: url, description, variables, extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            scalar_part(&self.url),
            scalar_part(&self.description),
            map_part(&self.variables),
            node_map_part(&self.extensions),
        ])
    }
}

/// An object representing a Server Variable for server URL template
/// substitution.
///
/// See <https://spec.openapis.org/oas/v3.1.1#server-variable-object>.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerVariable {
    /// An enumeration of string values to be used if the substitution
    /// options are from a limited set.
    pub enum_values: Vec<ValueReference<String>>,

    /// The default value to use for substitution.
    pub default: Option<NodeReference<String>>,

    /// A description for the server variable.
    pub description: Option<NodeReference<String>>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Build for ServerVariable {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for Server Variable", &root));
        }

        let variable = ServerVariable {
            enum_values: string_list("enum", &root),
            default: string_field("default", &root),
            description: string_field("description", &root),
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(variable, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for ServerVariable {
    // Hash field order: enum, default, description, extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            scalar_list_part(&self.enum_values),
            scalar_part(&self.default),
            scalar_part(&self.description),
            node_map_part(&self.extensions),
        ])
    }
}
