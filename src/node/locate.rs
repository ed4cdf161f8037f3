//! Locator utilities for traversing parsed node trees.
//!
//! Builders receive raw nodes and use these helpers to find keyed children,
//! classify node kinds, spot `$ref` mappings, and normalise YAML aliases and
//! `<<` merge keys before extracting fields.

use std::sync::Arc;

use super::{Node, NodeKind};

/// Key that introduces a YAML merge.
const MERGE_KEY: &str = "<<";

/// Key that introduces a reference mapping.
pub(crate) const REF_KEY: &str = "$ref";

/// Scans a mapping's child pairs for `label`, top level only.
///
/// Returns the key and value nodes of the first match.
pub fn find_key_node_top(label: &str, content: &[Arc<Node>]) -> Option<(Arc<Node>, Arc<Node>)> {
    content
        .chunks_exact(2)
        .find(|pair| pair[0].value == label)
        .map(|pair| (Arc::clone(&pair[0]), Arc::clone(&pair[1])))
}

/// Scans a mapping's child pairs for `label`, recursing into nested
/// collections when the top level has no match.
pub fn find_key_node_full(label: &str, content: &[Arc<Node>]) -> Option<(Arc<Node>, Arc<Node>)> {
    if let Some(found) = find_key_node_top(label, content) {
        return Some(found);
    }

    for node in content {
        match node.kind {
            NodeKind::Mapping | NodeKind::Sequence => {
                if let Some(found) = find_key_node_full(label, &node.content) {
                    return Some(found);
                }
            }
            _ => {}
        }
    }

    None
}

/// Returns `true` for mapping nodes.
pub fn is_node_map(node: &Node) -> bool {
    node.kind == NodeKind::Mapping
}

/// Returns `true` for sequence nodes.
pub fn is_node_array(node: &Node) -> bool {
    node.kind == NodeKind::Sequence
}

/// Detects a reference mapping: a mapping whose first child key is literally
/// `$ref`. Returns the value node holding the pointer and its string form.
pub fn is_node_ref_value(node: &Node) -> Option<(Arc<Node>, String)> {
    if node.kind != NodeKind::Mapping {
        return None;
    }

    let (key, value) = node.pairs().next()?;

    if key.value == REF_KEY {
        Some((Arc::clone(value), value.value.clone()))
    } else {
        None
    }
}

/// Dereferences alias nodes; other kinds pass through untouched.
pub fn node_alias(node: &Arc<Node>) -> Arc<Node> {
    if node.kind == NodeKind::Alias {
        if let Some(target) = node.content.first() {
            return Arc::clone(target);
        }
    }

    Arc::clone(node)
}

/// Expands `<<` merge keys at the top level of a mapping.
///
/// Trees are immutable, so expansion produces a rewritten node when a merge
/// key is present and returns the input unchanged otherwise. Explicit keys
/// win over merged ones; merged mappings contribute keys in source order,
/// earlier merge sources winning over later ones, appended after the
/// mapping's own keys.
pub fn check_for_merge_nodes(node: &Arc<Node>) -> Arc<Node> {
    if node.kind != NodeKind::Mapping
        || !node.pairs().any(|(key, _)| key.value == MERGE_KEY)
    {
        return Arc::clone(node);
    }

    let mut content: Vec<Arc<Node>> = Vec::with_capacity(node.content.len());
    let mut merged: Vec<(Arc<Node>, Arc<Node>)> = Vec::new();

    for (key, value) in node.pairs() {
        if key.value == MERGE_KEY {
            match value.kind {
                NodeKind::Mapping => collect_merge_pairs(value, &mut merged),
                NodeKind::Sequence => {
                    for source in &value.content {
                        collect_merge_pairs(source, &mut merged);
                    }
                }
                _ => {}
            }
        } else {
            content.push(Arc::clone(key));
            content.push(Arc::clone(value));
        }
    }

    for (key, value) in merged {
        let already_present = content
            .chunks_exact(2)
            .any(|pair| pair[0].value == key.value);
        if !already_present {
            content.push(key);
            content.push(value);
        }
    }

    Arc::new(Node {
        kind: NodeKind::Mapping,
        value: String::new(),
        tag: node.tag.clone(),
        content,
        line: node.line,
        column: node.column,
    })
}

fn collect_merge_pairs(source: &Arc<Node>, merged: &mut Vec<(Arc<Node>, Arc<Node>)>) {
    let source = node_alias(source);
    for (key, value) in source.pairs() {
        let already_merged = merged.iter().any(|(existing, _)| existing.value == key.value);
        if !already_merged {
            merged.push((Arc::clone(key), Arc::clone(value)));
        }
    }
}

/// Tests whether a mapping key names a specification extension: a
/// case-sensitive `x-` prefix, never the literal `$ref`.
pub fn is_extension_key(key: &str) -> bool {
    key != REF_KEY && key.starts_with("x-")
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::node::parse_source;

    fn root_of(source: &str) -> Arc<Node> {
        let doc = parse_source(source).unwrap();
        Arc::clone(&doc.content[0])
    }

    #[test]
    fn top_level_find_does_not_recurse() {
        let root = root_of(indoc! {"
            outer:
              inner: 1
            inner: 2
        "});

        let (_, value) = find_key_node_top("inner", &root.content).unwrap();
        assert_eq!(value.value, "2");

        assert!(find_key_node_top("missing", &root.content).is_none());
    }

    #[test]
    fn full_find_recurses_into_collections() {
        let root = root_of(indoc! {"
            outer:
              deep:
                needle: found
        "});

        let (key, value) = find_key_node_full("needle", &root.content).unwrap();
        assert_eq!(key.value, "needle");
        assert_eq!(value.value, "found");
    }

    #[test]
    fn ref_value_requires_leading_ref_key() {
        let root = root_of(indoc! {"
            a: {$ref: '#/components/schemas/Pet'}
            b: {description: first, $ref: '#/x'}
        "});

        let (_, a) = root.pairs().next().unwrap();
        let (value, pointer) = is_node_ref_value(a).unwrap();
        assert_eq!(pointer, "#/components/schemas/Pet");
        assert_eq!(value.value, "#/components/schemas/Pet");

        let (_, b) = root.pairs().nth(1).unwrap();
        assert!(is_node_ref_value(b).is_none());
    }

    #[test]
    fn merge_keys_expand_with_explicit_keys_winning() {
        let root = root_of(indoc! {"
            base: &base
              a: 1
              b: 2
            child:
              <<: *base
              b: 3
              c: 4
        "});

        let (_, child) = find_key_node_top("child", &root.content).unwrap();
        let expanded = check_for_merge_nodes(&child);

        let entries: Vec<_> = expanded
            .pairs()
            .map(|(key, value)| (key.value.clone(), value.value.clone()))
            .collect();

        assert_eq!(
            entries,
            vec![
                ("b".to_owned(), "3".to_owned()),
                ("c".to_owned(), "4".to_owned()),
                ("a".to_owned(), "1".to_owned()),
            ]
        );
    }

    #[test]
    fn merge_expansion_is_identity_without_merge_keys() {
        let root = root_of("child: {a: 1}");
        let (_, child) = find_key_node_top("child", &root.content).unwrap();

        let expanded = check_for_merge_nodes(&child);
        assert!(Arc::ptr_eq(&child, &expanded));
    }

    #[test]
    fn extension_keys_are_case_sensitive() {
        assert!(is_extension_key("x-internal"));
        assert!(!is_extension_key("X-internal"));
        assert!(!is_extension_key("ext"));
        assert!(!is_extension_key("$ref"));
    }
}
