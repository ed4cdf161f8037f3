use std::sync::Arc;

use crate::{
    build::{
        extract_extensions, extract_map, extract_object, find_any_map, malformed, prepare_root,
        string_field, Build, BuildContext, BuildError,
    },
    hash::{
        hash_fields, map_part, node_map_part, object_part, scalar_part, HashBytes, StableHash,
    },
    low::{Header, Link, MediaType, SchemaProxy},
    node::{Node, NodeKind},
    refs::{Extensions, Fields, NodeReference},
};

/// Describes a single response from an API operation.
///
/// See <https://spec.openapis.org/oas/v3.1.1#response-object>.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// A description of the response.
    pub description: Option<NodeReference<String>>,

    /// Maps a header name to its definition. `Content-Type` headers are
    /// ignored per the specification.
    pub headers: Fields<Header>,

    /// A map containing descriptions of potential response payloads, keyed
    /// by media type or media type range.
    pub content: Fields<MediaType>,

    /// A map of operations links that can be followed from the response.
    pub links: Fields<Link>,

    /// 2.0: schema of the response body.
    pub schema: Option<NodeReference<SchemaProxy>>,

    /// 2.0: example payloads keyed by media type, kept as opaque nodes.
    pub examples: Fields<Arc<Node>>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Build for Response {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for Response", &root));
        }

        let response = Response {
            description: string_field("description", &root),
            headers: extract_map("headers", &root, ctx)?,
            content: extract_map("content", &root, ctx)?,
            links: extract_map("links", &root, ctx)?,
            schema: extract_object("schema", &root, ctx)?,
            examples: find_any_map("examples", &root),
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(response, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for Response {
    // Hash field order: description, headers, content, links, schema,
    // examples, extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            scalar_part(&self.description),
            map_part(&self.headers),
            map_part(&self.content),
            map_part(&self.links),
            object_part(&self.schema),
            node_map_part(&self.examples),
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
    fn built_headers_land_on_the_response() {
        let ctx = test_context(indoc! {"
            swagger: '2.0'
            paths:
              /pets:
                get:
                  responses:
                    '200':
                      description: ok
                      headers:
                        X-Rate-Limit: {type: integer}
                        X-Expires-After: {type: string}
        "});

        let node = ctx
            .index()
            .find_by_pointer("/paths/~1pets/get/responses/200")
            .unwrap();
        let built = Response::build(None, node, &ctx).unwrap();

        let names: Vec<_> = built
            .value
            .headers
            .keys()
            .map(|key| key.value.as_str())
            .collect();
        assert_eq!(names, vec!["X-Rate-Limit", "X-Expires-After"]);
    }
}
