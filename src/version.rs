//! Specification version detection.

use std::sync::Arc;

use derive_more::derive::Display;

use crate::node::{find_key_node_top, Node, NodeKind};

/// Specification flavours this crate models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SpecVersion {
    /// Swagger 2.0.
    #[display("2.0")]
    V2,

    /// OpenAPI 3.0.x.
    #[display("3.0")]
    V30,

    /// OpenAPI 3.1.x.
    #[display("3.1")]
    V31,

    /// OpenAPI 3.2.x.
    #[display("3.2")]
    V32,
}

impl SpecVersion {
    /// Whether this is an OpenAPI 3 flavour.
    pub fn is_v3(&self) -> bool {
        !matches!(self, SpecVersion::V2)
    }
}

/// Finds the document's version key, returning the flavour along with the
/// key and value nodes. `None` when neither `openapi` nor `swagger` is
/// present, which callers treat as a missing root.
pub fn detect(root: &Arc<Node>) -> Option<(SpecVersion, Arc<Node>, Arc<Node>)> {
    let mapping = if root.kind == NodeKind::Document {
        Arc::clone(root.content.first()?)
    } else {
        Arc::clone(root)
    };

    if mapping.kind != NodeKind::Mapping {
        return None;
    }

    if let Some((key, value)) = find_key_node_top("openapi", &mapping.content) {
        let version = match semver::Version::parse(&value.value) {
            Ok(parsed) if parsed.major == 3 && parsed.minor == 0 => SpecVersion::V30,
            Ok(parsed) if parsed.major == 3 && parsed.minor == 1 => SpecVersion::V31,
            Ok(parsed) if parsed.major == 3 => SpecVersion::V32,
            // Tolerate shorthand like `3.1`; anything else reads as 3.0.
            _ if value.value.starts_with("3.1") => SpecVersion::V31,
            _ if value.value.starts_with("3.2") => SpecVersion::V32,
            _ => SpecVersion::V30,
        };
        return Some((version, key, value));
    }

    if let Some((key, value)) = find_key_node_top("swagger", &mapping.content) {
        return Some((SpecVersion::V2, key, value));
    }

    None
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::node::parse_source;

    #[test]
    fn openapi_versions_map_to_flavours() {
        for (source, expected) in [
            ("openapi: 3.0.3\n", SpecVersion::V30),
            ("openapi: 3.1.0\n", SpecVersion::V31),
            ("openapi: 3.2.0\n", SpecVersion::V32),
            ("swagger: '2.0'\n", SpecVersion::V2),
        ] {
            let root = parse_source(source).unwrap();
            let (version, _, value) = detect(&root).unwrap();
            assert_eq!(version, expected, "source: {source}");
            assert!(!value.value.is_empty());
        }
    }

    #[test]
    fn missing_version_key_is_none() {
        let root = parse_source("info: {title: T}\n").unwrap();
        assert!(detect(&root).is_none());

        let root = parse_source("").unwrap();
        assert!(detect(&root).is_none());
    }
}
