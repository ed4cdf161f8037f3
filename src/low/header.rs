use std::sync::Arc;

use crate::{
    build::{
        any_field, bool_field, extract_extensions, extract_map, extract_object, malformed,
        node_list, prepare_root, string_field, Build, BuildContext, BuildError,
    },
    hash::{
        hash_fields, map_part, node_list_part, node_map_part, node_part, object_part, scalar_part,
        HashBytes, StableHash,
    },
    low::{Example, MediaType, SchemaProxy},
    node::{Node, NodeKind},
    refs::{Extensions, Fields, NodeReference, ValueReference},
};

/// Describes a single header for HTTP responses and for individual parts in
/// multipart representations.
///
/// Follows the structure of the [Parameter Object](crate::low::Parameter),
/// with the name supplied by the containing map key and the location fixed
/// to `header`.
///
/// See <https://spec.openapis.org/oas/v3.1.1#header-object>.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// A brief description of the header.
    pub description: Option<NodeReference<String>>,

    /// Whether this header is mandatory.
    pub required: Option<NodeReference<bool>>,

    /// Specifies that the header is deprecated.
    pub deprecated: Option<NodeReference<bool>>,

    /// Sets the ability to pass empty-valued headers.
    pub allow_empty_value: Option<NodeReference<bool>>,

    /// Describes how the header value will be serialized.
    pub style: Option<NodeReference<String>>,

    /// Whether array or object values generate separate headers for each
    /// item or property.
    pub explode: Option<NodeReference<bool>>,

    /// Whether the header value SHOULD allow reserved characters.
    pub allow_reserved: Option<NodeReference<bool>>,

    /// The schema defining the type used for the header.
    pub schema: Option<NodeReference<SchemaProxy>>,

    /// Example of the header's potential value, kept as an opaque node.
    pub example: Option<NodeReference<Arc<Node>>>,

    /// Examples of the header's potential value, keyed by name.
    pub examples: Fields<Example>,

    /// A map containing the representations for the header.
    pub content: Fields<MediaType>,

    /// 2.0: the header's primitive type.
    pub header_type: Option<NodeReference<String>>,

    /// 2.0: the extending format for the type.
    pub format: Option<NodeReference<String>>,

    /// 2.0: items definition for array headers.
    pub items: Option<NodeReference<SchemaProxy>>,

    /// 2.0: array collection format.
    pub collection_format: Option<NodeReference<String>>,

    /// 2.0: default value, kept as an opaque node.
    pub default: Option<NodeReference<Arc<Node>>>,

    /// 2.0: whether array items must be unique.
    pub unique_items: Option<NodeReference<bool>>,

    /// 2.0: permitted values, kept as opaque nodes.
    pub enum_values: Vec<ValueReference<Arc<Node>>>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Build for Header {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for Header", &root));
        }

        let header = Header {
            description: string_field("description", &root),
            required: bool_field("required", &root, ctx),
            deprecated: bool_field("deprecated", &root, ctx),
            allow_empty_value: bool_field("allowEmptyValue", &root, ctx),
            style: string_field("style", &root),
            explode: bool_field("explode", &root, ctx),
            allow_reserved: bool_field("allowReserved", &root, ctx),
            schema: extract_object("schema", &root, ctx)?,
            example: any_field("example", &root),
            examples: extract_map("examples", &root, ctx)?,
            content: extract_map("content", &root, ctx)?,
            header_type: string_field("type", &root),
            format: string_field("format", &root),
            items: extract_object("items", &root, ctx)?,
            collection_format: string_field("collectionFormat", &root),
            default: any_field("default", &root),
            unique_items: bool_field("uniqueItems", &root, ctx),
            enum_values: node_list("enum", &root),
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(header, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for Header {
    // Hash field order: description, required, deprecated, allowEmptyValue,
    // style, explode, allowReserved, schema, example, examples, content,
    // type, format, items, collectionFormat, default, uniqueItems, enum,
    // extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            scalar_part(&self.description),
            scalar_part(&self.required),
            scalar_part(&self.deprecated),
            scalar_part(&self.allow_empty_value),
            scalar_part(&self.style),
            scalar_part(&self.explode),
            scalar_part(&self.allow_reserved),
            object_part(&self.schema),
            node_part(&self.example),
            map_part(&self.examples),
            map_part(&self.content),
            scalar_part(&self.header_type),
            scalar_part(&self.format),
            object_part(&self.items),
            scalar_part(&self.collection_format),
            node_part(&self.default),
            scalar_part(&self.unique_items),
            node_list_part(&self.enum_values),
            node_map_part(&self.extensions),
        ])
    }
}
