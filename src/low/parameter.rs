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

/// Describes a single operation parameter.
///
/// A unique parameter is defined by a combination of a name and location.
///
/// See <https://spec.openapis.org/oas/v3.1.1#parameter-object>.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// The name of the parameter, case sensitive.
    pub name: Option<NodeReference<String>>,

    /// The location of the parameter: `query`, `header`, `path`, or
    /// `cookie` (2.0 adds `formData` and `body`).
    pub location: Option<NodeReference<String>>,

    /// A brief description of the parameter.
    pub description: Option<NodeReference<String>>,

    /// Whether this parameter is mandatory. Always required for `path`
    /// parameters.
    pub required: Option<NodeReference<bool>>,

    /// Specifies that a parameter is deprecated.
    pub deprecated: Option<NodeReference<bool>>,

    /// Sets the ability to pass empty-valued parameters.
    pub allow_empty_value: Option<NodeReference<bool>>,

    /// Describes how the parameter value will be serialized.
    pub style: Option<NodeReference<String>>,

    /// Whether array or object values generate separate parameters for each
    /// item or property.
    pub explode: Option<NodeReference<bool>>,

    /// Whether the parameter value SHOULD allow reserved characters.
    pub allow_reserved: Option<NodeReference<bool>>,

    /// The schema defining the type used for the parameter.
    pub schema: Option<NodeReference<SchemaProxy>>,

    /// Example of the parameter's potential value, kept as an opaque node.
    pub example: Option<NodeReference<Arc<Node>>>,

    /// Examples of the parameter's potential value, keyed by name.
    pub examples: Fields<Example>,

    /// A map containing the representations for the parameter, for complex
    /// serialisation scenarios.
    pub content: Fields<MediaType>,

    /// 2.0: the parameter's primitive type.
    pub param_type: Option<NodeReference<String>>,

    /// 2.0: the extending format for the type.
    pub format: Option<NodeReference<String>>,

    /// 2.0: items definition for array parameters.
    pub items: Option<NodeReference<SchemaProxy>>,

    /// 2.0: array collection format (`csv`, `ssv`, `tsv`, `pipes`,
    /// `multi`).
    pub collection_format: Option<NodeReference<String>>,

    /// 2.0: default value, kept as an opaque node.
    pub default: Option<NodeReference<Arc<Node>>>,

    /// 2.0: whether array items must be unique.
    pub unique_items: Option<NodeReference<bool>>,

    /// 2.0: exclusive lower bound flag.
    pub exclusive_minimum: Option<NodeReference<bool>>,

    /// 2.0: exclusive upper bound flag.
    pub exclusive_maximum: Option<NodeReference<bool>>,

    /// 2.0: permitted values, kept as opaque nodes.
    pub enum_values: Vec<ValueReference<Arc<Node>>>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Build for Parameter {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for Parameter", &root));
        }

        let parameter = Parameter {
            name: string_field("name", &root),
            location: string_field("in", &root),
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
            param_type: string_field("type", &root),
            format: string_field("format", &root),
            items: extract_object("items", &root, ctx)?,
            collection_format: string_field("collectionFormat", &root),
            default: any_field("default", &root),
            unique_items: bool_field("uniqueItems", &root, ctx),
            exclusive_minimum: bool_field("exclusiveMinimum", &root, ctx),
            exclusive_maximum: bool_field("exclusiveMaximum", &root, ctx),
            enum_values: node_list("enum", &root),
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(parameter, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for Parameter {
    // Hash field order: name, in, description, required, deprecated,
    // allowEmptyValue, style, explode, allowReserved, schema, example,
    // examples, content, type, format, items, collectionFormat, default,
    // uniqueItems, exclusiveMinimum, exclusiveMaximum, enum, extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            scalar_part(&self.name),
            scalar_part(&self.location),
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
            scalar_part(&self.param_type),
            scalar_part(&self.format),
            object_part(&self.items),
            scalar_part(&self.collection_format),
            node_part(&self.default),
            scalar_part(&self.unique_items),
            scalar_part(&self.exclusive_minimum),
            scalar_part(&self.exclusive_maximum),
            node_list_part(&self.enum_values),
            node_map_part(&self.extensions),
        ])
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::build::test_support::test_context;

    #[test]
    fn swagger_fields_copy_verbatim_from_source() {
        let ctx = test_context(indoc! {"
            swagger: '2.0'
            paths:
              /pets:
                get:
                  parameters:
                    - name: tags
                      in: query
                      type: array
                      format: csv-ish
                      uniqueItems: false
                      exclusiveMinimum: false
                      items: {type: string}
        "});

        let node = ctx
            .index()
            .find_by_pointer("/paths/~1pets/get/parameters/0")
            .unwrap();
        let built = Parameter::build(None, node, &ctx).unwrap();
        let parameter = built.value;

        assert_eq!(parameter.param_type.as_ref().unwrap().value, "array");
        // `format` comes from the format key, never from `type`.
        assert_eq!(parameter.format.as_ref().unwrap().value, "csv-ish");
        // Booleans copy as stored, including explicit `false`.
        assert_eq!(parameter.unique_items.as_ref().unwrap().value, false);
        assert_eq!(parameter.exclusive_minimum.as_ref().unwrap().value, false);
        assert!(parameter.items.is_some());
    }
}
