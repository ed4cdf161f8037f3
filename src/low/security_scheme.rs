use std::sync::Arc;

use crate::{
    build::{
        extract_extensions, extract_object, malformed, prepare_root, string_field, string_map,
        Build, BuildContext, BuildError,
    },
    hash::{
        hash_entries, hash_fields, hash_sequence, hash_str, node_map_part, object_part,
        scalar_part, string_map_part, HashBytes, StableHash,
    },
    node::{node_alias, Node, NodeKind},
    refs::{Extensions, Fields, KeyReference, NodeReference, ValueReference},
};

/// Defines a security scheme that can be used by the operations.
///
/// Supported schemes are HTTP authentication, an API key (either as a
/// header, a cookie parameter, or as a query parameter), mutual TLS, OAuth2's
/// common flows, and OpenID Connect Discovery.
///
/// See <https://spec.openapis.org/oas/v3.1.1#security-scheme-object>.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityScheme {
    /// The type of the security scheme: `apiKey`, `http`, `mutualTLS`,
    /// `oauth2`, `openIdConnect` (2.0 uses `basic` instead of `http`).
    pub scheme_type: Option<NodeReference<String>>,

    /// A description for security scheme.
    pub description: Option<NodeReference<String>>,

    /// The name of the header, query or cookie parameter to be used, for
    /// `apiKey` schemes.
    pub name: Option<NodeReference<String>>,

    /// The location of the API key: `query`, `header` or `cookie`.
    pub location: Option<NodeReference<String>>,

    /// The name of the HTTP Authentication scheme to be used.
    pub scheme: Option<NodeReference<String>>,

    /// A hint to the client to identify how the bearer token is formatted.
    pub bearer_format: Option<NodeReference<String>>,

    /// Configuration information for the flow types supported.
    pub flows: Option<NodeReference<OAuthFlows>>,

    /// Well-known URL to discover the OpenID Connect provider metadata.
    pub open_id_connect_url: Option<NodeReference<String>>,

    /// 2.0: the authorization URL for `oauth2` schemes.
    pub authorization_url: Option<NodeReference<String>>,

    /// 2.0: the token URL for `oauth2` schemes.
    pub token_url: Option<NodeReference<String>>,

    /// 2.0: the flow name for `oauth2` schemes.
    pub flow: Option<NodeReference<String>>,

    /// 2.0: available scopes for `oauth2` schemes.
    pub scopes: Fields<String>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Build for SecurityScheme {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for Security Scheme", &root));
        }

        let scheme = SecurityScheme {
            scheme_type: string_field("type", &root),
            description: string_field("description", &root),
            name: string_field("name", &root),
            location: string_field("in", &root),
            scheme: string_field("scheme", &root),
            bearer_format: string_field("bearerFormat", &root),
            flows: extract_object("flows", &root, ctx)?,
            open_id_connect_url: string_field("openIdConnectUrl", &root),
            authorization_url: string_field("authorizationUrl", &root),
            token_url: string_field("tokenUrl", &root),
            flow: string_field("flow", &root),
            scopes: string_map("scopes", &root),
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(scheme, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for SecurityScheme {
    // Hash field order: type, description, name, in, scheme, bearerFormat,
    // flows, openIdConnectUrl, authorizationUrl, tokenUrl, flow, scopes,
    // extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            scalar_part(&self.scheme_type),
            scalar_part(&self.description),
            scalar_part(&self.name),
            scalar_part(&self.location),
            scalar_part(&self.scheme),
            scalar_part(&self.bearer_format),
            object_part(&self.flows),
            scalar_part(&self.open_id_connect_url),
            scalar_part(&self.authorization_url),
            scalar_part(&self.token_url),
            scalar_part(&self.flow),
            string_map_part(&self.scopes),
            node_map_part(&self.extensions),
        ])
    }
}

/// Allows configuration of the supported OAuth Flows.
///
/// See <https://spec.openapis.org/oas/v3.1.1#oauth-flows-object>.
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthFlows {
    /// Configuration for the OAuth Implicit flow.
    pub implicit: Option<NodeReference<OAuthFlow>>,

    /// Configuration for the OAuth Resource Owner Password flow.
    pub password: Option<NodeReference<OAuthFlow>>,

    /// Configuration for the OAuth Client Credentials flow.
    pub client_credentials: Option<NodeReference<OAuthFlow>>,

    /// Configuration for the OAuth Authorization Code flow.
    pub authorization_code: Option<NodeReference<OAuthFlow>>,

    /// Configuration for the OAuth Device Authorization flow.
    pub device: Option<NodeReference<OAuthFlow>>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Build for OAuthFlows {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for OAuth Flows", &root));
        }

        let flows = OAuthFlows {
            implicit: extract_object("implicit", &root, ctx)?,
            password: extract_object("password", &root, ctx)?,
            client_credentials: extract_object("clientCredentials", &root, ctx)?,
            authorization_code: extract_object("authorizationCode", &root, ctx)?,
            device: extract_object("device", &root, ctx)?,
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(flows, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for OAuthFlows {
    // Hash field order: implicit, password, clientCredentials,
    // authorizationCode, device, extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            object_part(&self.implicit),
            object_part(&self.password),
            object_part(&self.client_credentials),
            object_part(&self.authorization_code),
            object_part(&self.device),
            node_map_part(&self.extensions),
        ])
    }
}

/// Configuration details for a supported OAuth Flow.
///
/// See <https://spec.openapis.org/oas/v3.1.1#oauth-flow-object>.
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthFlow {
    /// The authorization URL to be used for this flow.
    pub authorization_url: Option<NodeReference<String>>,

    /// The token URL to be used for this flow.
    pub token_url: Option<NodeReference<String>>,

    /// The URL to be used for obtaining refresh tokens.
    pub refresh_url: Option<NodeReference<String>>,

    /// The available scopes for the OAuth2 security scheme, mapped to short
    /// descriptions.
    pub scopes: Fields<String>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Build for OAuthFlow {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for OAuth Flow", &root));
        }

        let flow = OAuthFlow {
            authorization_url: string_field("authorizationUrl", &root),
            token_url: string_field("tokenUrl", &root),
            refresh_url: string_field("refreshUrl", &root),
            scopes: string_map("scopes", &root),
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(flow, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for OAuthFlow {
    // Hash field order: authorizationUrl, tokenUrl, refreshUrl, scopes,
    // extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            scalar_part(&self.authorization_url),
            scalar_part(&self.token_url),
            scalar_part(&self.refresh_url),
            string_map_part(&self.scopes),
            node_map_part(&self.extensions),
        ])
    }
}

/// Lists the required security schemes to execute an operation.
///
/// Each name maps to a list of scope names required for execution; the list
/// may be empty for schemes that do not use scopes.
///
/// See <https://spec.openapis.org/oas/v3.1.1#security-requirement-object>.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SecurityRequirement {
    /// Scheme name to required scopes.
    pub requirements: Fields<Vec<ValueReference<String>>>,
}

impl Build for SecurityRequirement {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for Security Requirement", &root));
        }

        let mut requirements = Fields::default();

        for (name, scopes_node) in root.pairs() {
            let scopes_node = node_alias(scopes_node);

            let scopes = if scopes_node.kind == NodeKind::Sequence {
                scopes_node
                    .content
                    .iter()
                    .map(node_alias)
                    .filter(|scope| scope.kind == NodeKind::Scalar)
                    .map(|scope| ValueReference::new(scope.value.clone(), scope))
                    .collect()
            } else {
                Vec::new()
            };

            requirements.insert(
                KeyReference::new(name.value.clone(), Arc::clone(name)),
                ValueReference::new(scopes, scopes_node),
            );
        }

        let requirement = SecurityRequirement { requirements };

        Ok(NodeReference::new(requirement, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for SecurityRequirement {
    // Hash field order: requirements only.
    fn stable_hash(&self) -> HashBytes {
        hash_entries(
            self.requirements
                .iter()
                .map(|(key, scopes)| {
                    let scope_hash = hash_sequence(
                        scopes
                            .value
                            .iter()
                            .map(|scope| hash_str(&scope.value))
                            .collect(),
                    );
                    (key.value.clone(), scope_hash)
                })
                .collect(),
        )
    }
}
