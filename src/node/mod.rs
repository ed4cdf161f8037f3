//! Owned YAML node trees with source positions.
//!
//! Documents are tokenised by `saphyr` and converted once into an [`Node`]
//! tree that the rest of the crate owns outright. Mapping children are laid
//! out as alternating key/value pairs, which is what the locator utilities
//! and the index walker expect.

use std::sync::Arc;

use saphyr::{LoadableYamlNode, MarkedYaml, Scalar, YamlData};

mod locate;

pub use self::locate::{
    check_for_merge_nodes, find_key_node_full, find_key_node_top, is_extension_key, is_node_array,
    is_node_map, is_node_ref_value, node_alias,
};

/// Classification of a parsed YAML token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Stream document wrapper; `content` holds the single root value.
    Document,
    /// Mapping; `content` alternates key and value nodes.
    Mapping,
    /// Sequence; `content` holds the elements in order.
    Sequence,
    /// Scalar value; text lives in `value`.
    Scalar,
    /// Unresolved alias. The loader resolves aliases while parsing, so this
    /// only occurs in programmatically assembled trees.
    Alias,
}

/// A parsed YAML token with its source position.
///
/// Trees are immutable once built; shared ownership is via [`Arc`], and a
/// node's `Arc` pointer doubles as its identity for the reverse index and
/// the hash cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Token classification.
    pub kind: NodeKind,

    /// Scalar text, empty for collections.
    pub value: String,

    /// Resolved or explicit tag, e.g. `!!str` or `!custom`.
    pub tag: String,

    /// Child nodes. Mappings alternate key/value; the target of an alias
    /// node, when known, is the single child.
    pub content: Vec<Arc<Node>>,

    /// 1-based source line.
    pub line: usize,

    /// 1-based source column.
    pub column: usize,
}

impl Node {
    /// Creates a scalar node with no source position.
    pub fn scalar(value: impl Into<String>) -> Arc<Self> {
        Self::scalar_tagged(value, "!!str")
    }

    /// Creates a tagged scalar node with no source position.
    pub fn scalar_tagged(value: impl Into<String>, tag: impl Into<String>) -> Arc<Self> {
        Arc::new(Node {
            kind: NodeKind::Scalar,
            value: value.into(),
            tag: tag.into(),
            content: Vec::new(),
            line: 0,
            column: 0,
        })
    }

    /// Creates a mapping node from alternating key/value children.
    pub fn mapping(content: Vec<Arc<Node>>) -> Arc<Self> {
        debug_assert!(content.len() % 2 == 0, "mapping content must be key/value pairs");
        Arc::new(Node {
            kind: NodeKind::Mapping,
            value: String::new(),
            tag: "!!map".to_owned(),
            content,
            line: 0,
            column: 0,
        })
    }

    /// Creates a sequence node from its elements.
    pub fn sequence(content: Vec<Arc<Node>>) -> Arc<Self> {
        Arc::new(Node {
            kind: NodeKind::Sequence,
            value: String::new(),
            tag: "!!seq".to_owned(),
            content,
            line: 0,
            column: 0,
        })
    }

    /// Stable identity of this node within its tree.
    pub fn identity(self: &Arc<Self>) -> usize {
        Arc::as_ptr(self) as usize
    }

    /// Iterates a mapping's `(key, value)` node pairs in source order.
    pub fn pairs(&self) -> impl Iterator<Item = (&Arc<Node>, &Arc<Node>)> {
        self.content.chunks_exact(2).map(|pair| (&pair[0], &pair[1]))
    }

    /// Converts this subtree into a JSON value, dropping positions.
    ///
    /// Used by the high-level façade to hand opaque nodes (extensions,
    /// examples, defaults) to callers in a serde-friendly shape.
    pub fn to_json(&self) -> serde_json::Value {
        match self.kind {
            NodeKind::Document => self
                .content
                .first()
                .map(|node| node.to_json())
                .unwrap_or(serde_json::Value::Null),
            NodeKind::Mapping => serde_json::Value::Object(
                self.pairs()
                    .map(|(key, value)| (key.value.clone(), value.to_json()))
                    .collect(),
            ),
            NodeKind::Sequence => serde_json::Value::Array(
                self.content.iter().map(|node| node.to_json()).collect(),
            ),
            NodeKind::Scalar => match self.tag.as_str() {
                "!!null" => serde_json::Value::Null,
                "!!bool" => self
                    .value
                    .parse::<bool>()
                    .map(serde_json::Value::Bool)
                    .unwrap_or_else(|_| serde_json::Value::String(self.value.clone())),
                "!!int" => self
                    .value
                    .parse::<i64>()
                    .map(serde_json::Value::from)
                    .unwrap_or_else(|_| serde_json::Value::String(self.value.clone())),
                "!!float" => self
                    .value
                    .parse::<f64>()
                    .ok()
                    .and_then(|float| serde_json::Number::from_f64(float))
                    .map(serde_json::Value::Number)
                    .unwrap_or_else(|| serde_json::Value::String(self.value.clone())),
                _ => serde_json::Value::String(self.value.clone()),
            },
            NodeKind::Alias => self
                .content
                .first()
                .map(|node| node.to_json())
                .unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Parses a YAML or JSON source into a document node.
///
/// JSON goes through the same YAML 1.2 loader so positions are reported
/// identically for both formats. Only the first document of a multi-document
/// stream is kept.
pub fn parse_source(source: &str) -> Result<Arc<Node>, saphyr::ScanError> {
    let documents = MarkedYaml::load_from_str(source)?;

    let root = documents.first().map(convert);

    Ok(Arc::new(Node {
        kind: NodeKind::Document,
        value: String::new(),
        tag: String::new(),
        content: root.into_iter().collect(),
        line: 1,
        column: 1,
    }))
}

fn convert(yaml: &MarkedYaml<'_>) -> Arc<Node> {
    let line = yaml.span.start.line();
    let column = yaml.span.start.col() + 1;

    let node = match &yaml.data {
        YamlData::Value(scalar) => {
            let (value, tag) = scalar_parts(scalar);
            Node {
                kind: NodeKind::Scalar,
                value,
                tag: tag.to_owned(),
                content: Vec::new(),
                line,
                column,
            }
        }

        YamlData::Mapping(mapping) => {
            let mut content = Vec::with_capacity(mapping.len() * 2);
            for (key, value) in mapping {
                content.push(convert(key));
                content.push(convert(value));
            }
            Node {
                kind: NodeKind::Mapping,
                value: String::new(),
                tag: "!!map".to_owned(),
                content,
                line,
                column,
            }
        }

        YamlData::Sequence(sequence) => Node {
            kind: NodeKind::Sequence,
            value: String::new(),
            tag: "!!seq".to_owned(),
            content: sequence.iter().map(convert).collect(),
            line,
            column,
        },

        YamlData::Tagged(tag, inner) => {
            let inner = convert(inner);
            Node {
                kind: inner.kind,
                value: inner.value.clone(),
                tag: format!("{}{}", tag.handle, tag.suffix),
                content: inner.content.clone(),
                line,
                column,
            }
        }

        YamlData::Representation(text, _, _) => Node {
            kind: NodeKind::Scalar,
            value: text.to_string(),
            tag: "!!str".to_owned(),
            content: Vec::new(),
            line,
            column,
        },

        // The loader substitutes alias targets while parsing, so these only
        // show up for malformed input.
        YamlData::Alias(_) | YamlData::BadValue => Node {
            kind: NodeKind::Scalar,
            value: String::new(),
            tag: "!!null".to_owned(),
            content: Vec::new(),
            line,
            column,
        },
    };

    Arc::new(node)
}

fn scalar_parts(scalar: &Scalar<'_>) -> (String, &'static str) {
    match scalar {
        Scalar::Null => (String::new(), "!!null"),
        Scalar::Boolean(value) => (value.to_string(), "!!bool"),
        Scalar::Integer(value) => (value.to_string(), "!!int"),
        Scalar::FloatingPoint(value) => (value.to_string(), "!!float"),
        Scalar::String(value) => (value.to_string(), "!!str"),
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;

    fn root_of(source: &str) -> Arc<Node> {
        let doc = parse_source(source).unwrap();
        Arc::clone(&doc.content[0])
    }

    #[test]
    fn scalar_positions_are_one_based() {
        let root = root_of(indoc! {"
            title: Example
            version: '1.0'
        "});

        assert_eq!(root.kind, NodeKind::Mapping);

        let (key, value) = root.pairs().next().unwrap();
        assert_eq!(key.value, "title");
        assert_eq!(key.line, 1);
        assert_eq!(key.column, 1);
        assert_eq!(value.value, "Example");
        assert_eq!(value.column, 8);
    }

    #[test]
    fn mapping_content_alternates_pairs_in_source_order() {
        let root = root_of(indoc! {"
            b: 1
            a: 2
            c: 3
        "});

        let keys: Vec<_> = root.pairs().map(|(key, _)| key.value.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn scalar_tags_follow_yaml_core_schema() {
        let root = root_of("values: [true, 1, 1.5, null, text]");

        let (_, seq) = root.pairs().next().unwrap();
        let tags: Vec<_> = seq.content.iter().map(|node| node.tag.as_str()).collect();
        assert_eq!(tags, vec!["!!bool", "!!int", "!!float", "!!null", "!!str"]);
    }

    #[test]
    fn json_input_parses_with_positions() {
        let root = root_of(r#"{"openapi": "3.1.0", "paths": {}}"#);

        let (key, value) = root.pairs().next().unwrap();
        assert_eq!(key.value, "openapi");
        assert_eq!(value.value, "3.1.0");
        assert_eq!(key.line, 1);
    }

    #[test]
    fn to_json_round_trips_scalars() {
        let root = root_of("count: 3\nratio: 0.5\nok: true\nnothing: null\n");

        let json = root.to_json();
        assert_eq!(json["count"], serde_json::json!(3));
        assert_eq!(json["ratio"], serde_json::json!(0.5));
        assert_eq!(json["ok"], serde_json::json!(true));
        assert_eq!(json["nothing"], serde_json::Value::Null);
    }

    #[test]
    fn empty_stream_yields_empty_document() {
        let doc = parse_source("").unwrap();
        assert_eq!(doc.kind, NodeKind::Document);
        assert!(doc.content.is_empty());
    }
}
