//! RFC 6901 JSON Pointer handling.
//!
//! Reference strings take the form `source#fragment`, where the source names
//! a file or URL (empty for the current document) and the fragment is a JSON
//! Pointer with `~0`/`~1` tilde escapes.

use std::sync::Arc;

use derive_more::derive::{Display, Error};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::node::{find_key_node_top, node_alias, Node, NodeKind};

static POINTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:/(?:[^~/]|~[01])*)*$").expect("valid pointer pattern"));

/// Problems parsing a reference string.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum PointerError {
    /// Reference string was empty.
    #[display("empty reference string")]
    Empty,

    /// Fragment is not a valid RFC 6901 pointer.
    #[display("malformed JSON pointer: `{_0}`")]
    Malformed(#[error(not(source))] String),
}

/// A parsed `source#fragment` reference string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    /// File path or URL of the target document; empty for the current one.
    pub source: String,

    /// JSON Pointer fragment, normalised; empty points at the root.
    pub fragment: String,
}

impl Reference {
    /// Parses a raw reference string.
    pub fn parse(raw: &str) -> Result<Self, PointerError> {
        if raw.is_empty() {
            return Err(PointerError::Empty);
        }

        let (source, fragment) = match raw.split_once('#') {
            Some((source, fragment)) => (source, fragment),
            None => (raw, ""),
        };

        if !POINTER_RE.is_match(fragment) {
            return Err(PointerError::Malformed(raw.to_owned()));
        }

        Ok(Reference {
            source: source.to_owned(),
            fragment: normalize(fragment),
        })
    }

    /// Whether the reference stays within its containing document.
    pub fn is_local(&self) -> bool {
        self.source.is_empty()
    }

    /// Whether the source names a remote document.
    pub fn is_remote(&self) -> bool {
        self.source.starts_with("http://") || self.source.starts_with("https://")
    }
}

/// Decodes one pointer segment (`~1` then `~0`, per RFC 6901).
pub fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Encodes one pointer segment.
pub fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Splits a pointer fragment into decoded segments.
pub fn segments(fragment: &str) -> Vec<String> {
    fragment
        .split('/')
        .skip(1)
        .map(unescape)
        .collect()
}

/// Renders a pointer from decoded segments.
pub fn join(segments: &[String]) -> String {
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        out.push_str(&escape(segment));
    }
    out
}

/// Normalises a fragment to its canonical escaped form. Comparison always
/// uses this form.
pub fn normalize(fragment: &str) -> String {
    if fragment.is_empty() {
        return String::new();
    }
    join(&segments(fragment))
}

/// Walks a node tree by pointer fragment, returning the target node.
///
/// Document wrappers are transparent; mapping segments match key scalars and
/// sequence segments parse as zero-based indices.
pub fn walk(root: &Arc<Node>, fragment: &str) -> Option<Arc<Node>> {
    let mut current = if root.kind == NodeKind::Document {
        Arc::clone(root.content.first()?)
    } else {
        Arc::clone(root)
    };

    for segment in segments(fragment) {
        current = node_alias(&current);

        current = match current.kind {
            NodeKind::Mapping => {
                let (_, value) = find_key_node_top(&segment, &current.content)?;
                value
            }
            NodeKind::Sequence => {
                let index: usize = segment.parse().ok()?;
                Arc::clone(current.content.get(index)?)
            }
            _ => return None,
        };
    }

    Some(current)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::node::parse_source;

    #[test]
    fn parse_splits_source_and_fragment() {
        let reference = Reference::parse("#/components/schemas/Pet").unwrap();
        assert!(reference.is_local());
        assert_eq!(reference.fragment, "/components/schemas/Pet");

        let reference = Reference::parse("shared/defs.yaml#/Pet").unwrap();
        assert_eq!(reference.source, "shared/defs.yaml");
        assert_eq!(reference.fragment, "/Pet");

        let reference = Reference::parse("https://example.com/defs.yaml").unwrap();
        assert!(reference.is_remote());
        assert_eq!(reference.fragment, "");
    }

    #[test]
    fn empty_and_malformed_references_error() {
        assert_eq!(Reference::parse(""), Err(PointerError::Empty));
        assert!(matches!(
            Reference::parse("#/bad~2escape"),
            Err(PointerError::Malformed(_))
        ));
        assert!(matches!(
            Reference::parse("#no-leading-slash"),
            Err(PointerError::Malformed(_))
        ));
    }

    #[test]
    fn tilde_escapes_round_trip() {
        assert_eq!(unescape("a~1b~0c"), "a/b~c");
        assert_eq!(escape("a/b~c"), "a~1b~0c");
        assert_eq!(normalize("/paths/~1pets~1{id}"), "/paths/~1pets~1{id}");
    }

    #[test]
    fn walk_traverses_maps_and_sequences() {
        let doc = parse_source("a:\n  b:\n    - x\n    - y\n").unwrap();

        let hit = walk(&doc, "/a/b/1").unwrap();
        assert_eq!(hit.value, "y");

        assert!(walk(&doc, "/a/missing").is_none());
        assert!(walk(&doc, "/a/b/9").is_none());
        assert!(walk(&doc, "/a/b/x").is_none());
    }

    #[test]
    fn walk_decodes_escaped_segments() {
        let doc = parse_source("paths:\n  /pets: ok\n").unwrap();

        let hit = walk(&doc, "/paths/~1pets").unwrap();
        assert_eq!(hit.value, "ok");
    }

    #[test]
    fn empty_fragment_walks_to_root_value() {
        let doc = parse_source("a: 1\n").unwrap();
        let hit = walk(&doc, "").unwrap();
        assert_eq!(hit.kind, NodeKind::Mapping);
    }
}
