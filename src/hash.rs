//! Deterministic content hashing.
//!
//! Every constructed object exposes a 32-byte SHA-256 digest over a
//! canonical serialisation, used for equality checks and change detection.
//! Canonicalisation rules:
//!
//! - scalars hash their string value, the empty string when absent;
//! - ordered maps hash `key + "-" + hex(value_hash)` entries joined by `|`
//!   in sorted-key order;
//! - sequences hash each entry, sort the hex digests, and concatenate, so
//!   sibling order does not affect the digest;
//! - composite objects hash their fields in a fixed order documented on each
//!   [`StableHash`] impl, joined by `|`;
//! - referenced values hash their resolved target, never the pointer.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};

use crate::{
    node::{Node, NodeKind},
    refs::{Fields, NodeReference, ValueReference},
};

/// A 32-byte content digest.
pub type HashBytes = [u8; 32];

/// Types with a stable content hash.
pub trait StableHash {
    /// Computes the digest of this value's canonical serialisation.
    fn stable_hash(&self) -> HashBytes;
}

/// Sub-hash memoisation keyed by node identity. Cleared by tests for
/// determinism across builds of distinct documents at the same address.
static NODE_HASHES: Lazy<DashMap<usize, HashBytes>> = Lazy::new(DashMap::new);

/// Empties the node hash cache.
pub fn clear_hash_cache() {
    NODE_HASHES.clear();
}

/// Hashes a string.
pub fn hash_str(value: &str) -> HashBytes {
    Sha256::digest(value.as_bytes()).into()
}

/// Hashes composite fields joined by `|`.
pub fn hash_fields(parts: &[String]) -> HashBytes {
    hash_str(&parts.join("|"))
}

/// Hashes an ordered map of pre-hashed entries in sorted-key order.
pub fn hash_entries(mut entries: Vec<(String, HashBytes)>) -> HashBytes {
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let parts: Vec<String> = entries
        .into_iter()
        .map(|(key, digest)| format!("{key}-{}", hex::encode(digest)))
        .collect();

    hash_fields(&parts)
}

/// Hashes a sequence of pre-hashed entries, order-independently.
pub fn hash_sequence(entries: Vec<HashBytes>) -> HashBytes {
    let mut digests: Vec<String> = entries.into_iter().map(hex::encode).collect();
    digests.sort();
    hash_str(&digests.concat())
}

/// Hashes an opaque node subtree, memoising by node identity.
pub fn hash_node(node: &Arc<Node>) -> HashBytes {
    let identity = node.identity();

    if let Some(cached) = NODE_HASHES.get(&identity) {
        return *cached;
    }

    let digest = match node.kind {
        NodeKind::Scalar => hash_str(&node.value),
        NodeKind::Mapping => hash_entries(
            node.pairs()
                .map(|(key, value)| (key.value.clone(), hash_node(value)))
                .collect(),
        ),
        NodeKind::Sequence => hash_sequence(node.content.iter().map(hash_node).collect()),
        NodeKind::Document | NodeKind::Alias => node
            .content
            .first()
            .map(hash_node)
            .unwrap_or_else(|| hash_str("")),
    };

    NODE_HASHES.insert(identity, digest);
    digest
}

/// Canonical scalar rendering of an optional field: the value's textual
/// form, or the empty string when absent.
pub fn scalar_part<V: ToString>(field: &Option<NodeReference<V>>) -> String {
    field
        .as_ref()
        .map(|reference| reference.value.to_string())
        .unwrap_or_default()
}

/// Canonical rendering of a nested hashable field.
pub fn object_part<V: StableHash>(field: &Option<NodeReference<V>>) -> String {
    field
        .as_ref()
        .map(|reference| hex::encode(reference.value.stable_hash()))
        .unwrap_or_default()
}

/// Canonical rendering of an ordered map of hashable values.
pub fn map_part<V: StableHash>(fields: &Fields<V>) -> String {
    hex::encode(hash_entries(
        fields
            .iter()
            .map(|(key, value)| (key.value.clone(), value.value.stable_hash()))
            .collect(),
    ))
}

/// Canonical rendering of an ordered map of opaque nodes.
pub fn node_map_part(fields: &Fields<Arc<Node>>) -> String {
    hex::encode(hash_entries(
        fields
            .iter()
            .map(|(key, value)| (key.value.clone(), hash_node(&value.value)))
            .collect(),
    ))
}

/// Canonical rendering of an optional opaque-node field.
pub fn node_part(field: &Option<NodeReference<Arc<Node>>>) -> String {
    field
        .as_ref()
        .map(|reference| hex::encode(hash_node(&reference.value)))
        .unwrap_or_default()
}

/// Canonical rendering of an ordered map of scalar strings.
pub fn string_map_part(fields: &Fields<String>) -> String {
    hex::encode(hash_entries(
        fields
            .iter()
            .map(|(key, value)| (key.value.clone(), hash_str(&value.value)))
            .collect(),
    ))
}

/// Canonical rendering of a sequence of hashable values.
pub fn list_part<V: StableHash>(items: &[ValueReference<V>]) -> String {
    hex::encode(hash_sequence(
        items.iter().map(|item| item.value.stable_hash()).collect(),
    ))
}

/// Canonical rendering of a sequence of opaque nodes.
pub fn node_list_part(items: &[ValueReference<Arc<Node>>]) -> String {
    hex::encode(hash_sequence(
        items.iter().map(|item| hash_node(&item.value)).collect(),
    ))
}

/// Canonical rendering of a sequence of scalar values.
pub fn scalar_list_part<V: ToString>(items: &[ValueReference<V>]) -> String {
    hex::encode(hash_sequence(
        items
            .iter()
            .map(|item| hash_str(&item.value.to_string()))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::node::parse_source;

    fn root_of(source: &str) -> Arc<Node> {
        let doc = parse_source(source).unwrap();
        Arc::clone(&doc.content[0])
    }

    #[test]
    fn node_hash_ignores_sibling_key_order() {
        let a = root_of("x: 1\ny: 2\n");
        let b = root_of("y: 2\nx: 1\n");

        assert_eq!(hash_node(&a), hash_node(&b));
    }

    #[test]
    fn node_hash_distinguishes_values() {
        let a = root_of("x: 1\n");
        let b = root_of("x: 2\n");

        assert_ne!(hash_node(&a), hash_node(&b));
    }

    #[test]
    fn sequence_hash_is_order_independent() {
        let forward = hash_sequence(vec![hash_str("a"), hash_str("b")]);
        let backward = hash_sequence(vec![hash_str("b"), hash_str("a")]);

        assert_eq!(forward, backward);
    }

    #[test]
    fn entries_hash_sorts_keys() {
        let forward = hash_entries(vec![
            ("a".to_owned(), hash_str("1")),
            ("b".to_owned(), hash_str("2")),
        ]);
        let backward = hash_entries(vec![
            ("b".to_owned(), hash_str("2")),
            ("a".to_owned(), hash_str("1")),
        ]);

        assert_eq!(forward, backward);
    }

    #[test]
    fn cache_is_clearable() {
        let node = root_of("x: 1\n");
        let before = hash_node(&node);

        clear_hash_cache();

        assert_eq!(before, hash_node(&node));
    }
}
