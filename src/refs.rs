//! Generic containers pairing parsed values with their source nodes and
//! `$ref` provenance.

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use indexmap::IndexMap;

use crate::node::Node;

/// A map key together with the node it was parsed from.
///
/// Equality and hashing consider the value only; the key node is metadata.
/// Insertion order inside a [`Fields`] map follows source order.
#[derive(Debug, Clone)]
pub struct KeyReference<K> {
    /// Parsed key value.
    pub value: K,

    /// Node the key was read from.
    pub key_node: Arc<Node>,
}

impl<K> KeyReference<K> {
    /// Pairs a parsed key with its node.
    pub fn new(value: K, key_node: Arc<Node>) -> Self {
        KeyReference { value, key_node }
    }
}

impl<K: PartialEq> PartialEq for KeyReference<K> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<K: Eq> Eq for KeyReference<K> {}

impl<K: Hash> Hash for KeyReference<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<K: fmt::Display> fmt::Display for KeyReference<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

/// A parsed value together with the node it was built from and, when it was
/// reached through a `$ref`, the original pointer string.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueReference<V> {
    /// Parsed value.
    pub value: V,

    /// Node the value was built from. For referenced values this is the
    /// resolved target, not the `$ref` mapping.
    pub value_node: Arc<Node>,

    /// Original pointer string when the value came through a `$ref`.
    pub reference: Option<String>,
}

impl<V> ValueReference<V> {
    /// Wraps a directly-parsed value.
    pub fn new(value: V, value_node: Arc<Node>) -> Self {
        ValueReference {
            value,
            value_node,
            reference: None,
        }
    }

    /// Wraps a value reached through the given pointer.
    pub fn referenced(value: V, value_node: Arc<Node>, reference: String) -> Self {
        ValueReference {
            value,
            value_node,
            reference: Some(reference),
        }
    }

    /// Whether this value originated from a `$ref`.
    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }
}

/// A parsed value carrying both its key and value nodes; used for top-level
/// fields where both positions matter.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeReference<V> {
    /// Parsed value.
    pub value: V,

    /// Node of the field's key, absent for synthesised values.
    pub key_node: Option<Arc<Node>>,

    /// Node the value was built from.
    pub value_node: Arc<Node>,

    /// Original pointer string when the value came through a `$ref`.
    pub reference: Option<String>,
}

impl<V> NodeReference<V> {
    /// Pairs a parsed value with its key and value nodes.
    pub fn new(value: V, key_node: Option<Arc<Node>>, value_node: Arc<Node>) -> Self {
        NodeReference {
            value,
            key_node,
            value_node,
            reference: None,
        }
    }

    /// Records the pointer this value was reached through.
    pub fn with_reference(mut self, reference: Option<String>) -> Self {
        self.reference = reference;
        self
    }

    /// Whether this value originated from a `$ref`.
    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }
}

/// Ordered map used for every keyed collection in the low-level model.
/// Iteration order equals source order.
pub type Fields<V> = IndexMap<KeyReference<String>, ValueReference<V>>;

/// Specification extensions: `x-` keys mapped to their raw nodes, in source
/// order.
pub type Extensions = Fields<Arc<Node>>;

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn key_reference_equality_ignores_node_metadata() {
        let a = KeyReference::new("pet".to_owned(), Node::scalar("pet"));
        let b = KeyReference::new("pet".to_owned(), Node::scalar("pet"));

        assert_eq!(a, b);
        assert!(!Arc::ptr_eq(&a.key_node, &b.key_node));
    }

    #[test]
    fn fields_preserve_insertion_order() {
        let mut fields: Fields<u32> = Fields::default();

        for (index, name) in ["zebra", "apple", "mango"].iter().enumerate() {
            fields.insert(
                KeyReference::new((*name).to_owned(), Node::scalar(*name)),
                ValueReference::new(index as u32, Node::scalar("")),
            );
        }

        let keys: Vec<_> = fields.keys().map(|key| key.value.as_str()).collect();
        assert_eq!(keys, vec!["zebra", "apple", "mango"]);
    }
}
