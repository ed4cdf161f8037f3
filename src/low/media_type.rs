use std::sync::Arc;

use crate::{
    build::{
        any_field, bool_field, extract_extensions, extract_map, extract_object, malformed,
        prepare_root, string_field, Build, BuildContext, BuildError,
    },
    hash::{
        hash_fields, map_part, node_map_part, node_part, object_part, scalar_part, HashBytes,
        StableHash,
    },
    low::{Example, Header, SchemaProxy},
    node::{Node, NodeKind},
    refs::{Extensions, Fields, NodeReference},
};

/// Provides schema and examples for the media type identified by its key.
///
/// See <https://spec.openapis.org/oas/v3.1.1#media-type-object>.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaType {
    /// The schema defining the content.
    pub schema: Option<NodeReference<SchemaProxy>>,

    /// Example of the media type, kept as an opaque node.
    pub example: Option<NodeReference<Arc<Node>>>,

    /// Examples of the media type, keyed by name.
    pub examples: Fields<Example>,

    /// Maps between a property name and its encoding information.
    pub encoding: Fields<Encoding>,

    /// 3.2: schema applied to each item of a sequential media type.
    pub item_schema: Option<NodeReference<SchemaProxy>>,

    /// 3.2: encoding applied to each item of a sequential media type.
    pub item_encoding: Fields<Encoding>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Build for MediaType {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for Media Type", &root));
        }

        let media_type = MediaType {
            schema: extract_object("schema", &root, ctx)?,
            example: any_field("example", &root),
            examples: extract_map("examples", &root, ctx)?,
            encoding: extract_map("encoding", &root, ctx)?,
            item_schema: extract_object("itemSchema", &root, ctx)?,
            item_encoding: extract_map("itemEncoding", &root, ctx)?,
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(media_type, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for MediaType {
    // Hash field order: schema, example, examples, encoding, itemSchema,
    // itemEncoding, extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            object_part(&self.schema),
            node_part(&self.example),
            map_part(&self.examples),
            map_part(&self.encoding),
            object_part(&self.item_schema),
            map_part(&self.item_encoding),
            node_map_part(&self.extensions),
        ])
    }
}

/// A single encoding definition applied to a single schema property.
///
/// See <https://spec.openapis.org/oas/v3.1.1#encoding-object>.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoding {
    /// The `Content-Type` for encoding a specific property.
    pub content_type: Option<NodeReference<String>>,

    /// Additional headers, for example `Content-Disposition`.
    pub headers: Fields<Header>,

    /// Describes how a specific property value will be serialized depending
    /// on its type.
    pub style: Option<NodeReference<String>>,

    /// Whether property values of array or object type generate separate
    /// parameters for each item or property.
    pub explode: Option<NodeReference<bool>>,

    /// Whether the parameter value SHOULD allow reserved characters to be
    /// sent as-is.
    pub allow_reserved: Option<NodeReference<bool>>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Build for Encoding {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for Encoding", &root));
        }

        let encoding = Encoding {
            content_type: string_field("contentType", &root),
            headers: extract_map("headers", &root, ctx)?,
            style: string_field("style", &root),
            explode: bool_field("explode", &root, ctx),
            allow_reserved: bool_field("allowReserved", &root, ctx),
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(encoding, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for Encoding {
    // Hash field order: contentType, headers, style, explode,
    // allowReserved, extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            scalar_part(&self.content_type),
            map_part(&self.headers),
            scalar_part(&self.style),
            scalar_part(&self.explode),
            scalar_part(&self.allow_reserved),
            node_map_part(&self.extensions),
        ])
    }
}
