use std::sync::Arc;

use crate::{
    build::{extract_extensions, extract_map, malformed, prepare_root, Build, BuildContext, BuildError},
    hash::{hash_fields, map_part, node_map_part, HashBytes, StableHash},
    low::{
        Callback, Example, Header, Link, MediaType, Parameter, PathItem, RequestBody, Response,
        SchemaProxy, SecurityScheme,
    },
    node::{Node, NodeKind},
    refs::{Extensions, Fields, NodeReference},
};

/// Holds a set of reusable objects for different aspects of the OAS.
///
/// All objects defined within the components object will have no effect on
/// the API unless they are explicitly referenced from properties outside the
/// components object. In Swagger 2.0 documents the same registries are
/// populated from the root-level `definitions`, `parameters`, `responses`,
/// and `securityDefinitions` containers.
///
/// See <https://spec.openapis.org/oas/v3.1.1#components-object>.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Components {
    /// Reusable [Schema Objects](crate::low::Schema), lazily built.
    pub schemas: Fields<SchemaProxy>,

    /// Reusable [Response Objects](Response).
    pub responses: Fields<Response>,

    /// Reusable [Parameter Objects](Parameter).
    pub parameters: Fields<Parameter>,

    /// Reusable [Example Objects](Example).
    pub examples: Fields<Example>,

    /// Reusable [Request Body Objects](RequestBody).
    pub request_bodies: Fields<RequestBody>,

    /// Reusable [Header Objects](Header).
    pub headers: Fields<Header>,

    /// Reusable [Security Scheme Objects](SecurityScheme).
    pub security_schemes: Fields<SecurityScheme>,

    /// Reusable [Link Objects](Link).
    pub links: Fields<Link>,

    /// Reusable [Callback Objects](Callback).
    pub callbacks: Fields<Callback>,

    /// 3.1: reusable [Path Item Objects](PathItem).
    pub path_items: Fields<PathItem>,

    /// 3.2: reusable [Media Type Objects](MediaType).
    pub media_types: Fields<MediaType>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Components {
    /// Populates the registries from a Swagger 2.0 document root, where the
    /// reusable containers are top-level keys.
    pub(crate) fn build_v2(
        root: &Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let components = Components {
            schemas: extract_map("definitions", root, ctx)?,
            responses: extract_map("responses", root, ctx)?,
            parameters: extract_map("parameters", root, ctx)?,
            security_schemes: extract_map("securityDefinitions", root, ctx)?,
            ..Components::default()
        };

        Ok(NodeReference::new(components, None, Arc::clone(root)))
    }
}

impl Build for Components {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for Components", &root));
        }

        let components = Components {
            schemas: extract_map("schemas", &root, ctx)?,
            responses: extract_map("responses", &root, ctx)?,
            parameters: extract_map("parameters", &root, ctx)?,
            examples: extract_map("examples", &root, ctx)?,
            request_bodies: extract_map("requestBodies", &root, ctx)?,
            headers: extract_map("headers", &root, ctx)?,
            security_schemes: extract_map("securitySchemes", &root, ctx)?,
            links: extract_map("links", &root, ctx)?,
            callbacks: extract_map("callbacks", &root, ctx)?,
            path_items: extract_map("pathItems", &root, ctx)?,
            media_types: extract_map("mediaTypes", &root, ctx)?,
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(components, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for Components {
    // Hash field order: schemas, responses, parameters, examples,
    // requestBodies, headers, securitySchemes, links, callbacks, pathItems,
    // mediaTypes, extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            map_part(&self.schemas),
            map_part(&self.responses),
            map_part(&self.parameters),
            map_part(&self.examples),
            map_part(&self.request_bodies),
            map_part(&self.headers),
            map_part(&self.security_schemes),
            map_part(&self.links),
            map_part(&self.callbacks),
            map_part(&self.path_items),
            map_part(&self.media_types),
            node_map_part(&self.extensions),
        ])
    }
}
