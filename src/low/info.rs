use std::sync::Arc;

use crate::{
    build::{
        extract_extensions, extract_object, malformed, prepare_root, string_field, Build,
        BuildContext, BuildError,
    },
    hash::{hash_fields, node_map_part, object_part, scalar_part, HashBytes, StableHash},
    node::{Node, NodeKind},
    refs::{Extensions, NodeReference},
};

/// Provides metadata about the API.
///
/// The metadata MAY be used by the clients if needed, and MAY be presented
/// in editing or documentation generation tools for convenience.
///
/// See <https://spec.openapis.org/oas/v3.1.1#info-object>.
#[derive(Debug, Clone, PartialEq)]
pub struct Info {
    /// The title of the API.
    pub title: Option<NodeReference<String>>,

    /// A short summary of the API.
    pub summary: Option<NodeReference<String>>,

    /// A description of the API.
    ///
    /// [CommonMark syntax](https://spec.commonmark.org) MAY be used for rich
    /// text representation.
    pub description: Option<NodeReference<String>>,

    /// A URL for the Terms of Service for the API.
    pub terms_of_service: Option<NodeReference<String>>,

    /// The contact information for the exposed API.
    pub contact: Option<NodeReference<Contact>>,

    /// The license information for the exposed API.
    pub license: Option<NodeReference<License>>,

    /// The version of this OpenAPI document, distinct from the specification
    /// version it is written against.
    pub version: Option<NodeReference<String>>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Build for Info {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for Info", &root));
        }

        let info = Info {
            title: string_field("title", &root),
            summary: string_field("summary", &root),
            description: string_field("description", &root),
            terms_of_service: string_field("termsOfService", &root),
            contact: extract_object("contact", &root, ctx)?,
            license: extract_object("license", &root, ctx)?,
            version: string_field("version", &root),
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(info, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for Info {
    // Hash field order: title, summary, description, termsOfService,
    // contact, license, version, extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            scalar_part(&self.title),
            scalar_part(&self.summary),
            scalar_part(&self.description),
            scalar_part(&self.terms_of_service),
            object_part(&self.contact),
            object_part(&self.license),
            scalar_part(&self.version),
            node_map_part(&self.extensions),
        ])
    }
}

/// Contact information for the exposed API.
///
/// See <https://spec.openapis.org/oas/v3.1.1#contact-object>.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    /// The identifying name of the contact person or organization.
    pub name: Option<NodeReference<String>>,

    /// The URL pointing to the contact information.
    pub url: Option<NodeReference<String>>,

    /// The email address of the contact person or organization.
    pub email: Option<NodeReference<String>>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Build for Contact {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for Contact", &root));
        }

        let contact = Contact {
            name: string_field("name", &root),
            url: string_field("url", &root),
            email: string_field("email", &root),
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(contact, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for Contact {
    // Hash field order: name, url, email, extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            scalar_part(&self.name),
            scalar_part(&self.url),
            scalar_part(&self.email),
            node_map_part(&self.extensions),
        ])
    }
}

/// License information for the exposed API.
///
/// See <https://spec.openapis.org/oas/v3.1.1#license-object>.
#[derive(Debug, Clone, PartialEq)]
pub struct License {
    /// The license name used for the API.
    pub name: Option<NodeReference<String>>,

    /// An SPDX license expression for the API.
    ///
    /// Mutually exclusive with `url`.
    pub identifier: Option<NodeReference<String>>,

    /// A URL to the license used for the API.
    pub url: Option<NodeReference<String>>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Build for License {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let prepared = prepare_root(&root, ctx)?;
        let root = prepared.root;

        if root.kind != NodeKind::Mapping {
            return Err(malformed("a mapping for License", &root));
        }

        let license = License {
            name: string_field("name", &root),
            identifier: string_field("identifier", &root),
            url: string_field("url", &root),
            extensions: extract_extensions(&root),
        };

        Ok(NodeReference::new(license, key, root).with_reference(prepared.reference))
    }
}

impl StableHash for License {
    // Hash field order: name, identifier, url, extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            scalar_part(&self.name),
            scalar_part(&self.identifier),
            scalar_part(&self.url),
            node_map_part(&self.extensions),
        ])
    }
}
