//! The schema engine.
//!
//! Schemas are the one recursive, self-referencing construct in a document,
//! so their children are modelled as lazy [`SchemaProxy`] thunks. A proxy
//! holds its raw node and the build context; the actual [`Schema`] is built
//! on first access and memoised. Reference cycles never recurse: the
//! resolver marks the back-edge site of every cycle, and a proxy wrapping a
//! marked site materialises to an empty stub that records the pointer
//! instead of descending.

use std::{fmt, sync::Arc};

use once_cell::sync::OnceCell;

use crate::{
    build::{
        any_field, bool_field, build_fields, extract_array, extract_extensions, extract_object,
        int_field, node_list, number_field, string_field, string_list, Build, BuildContext,
        BuildError,
    },
    diagnostic::{Diagnostic, DiagnosticKind, Severity},
    hash::{
        hash_fields, hash_node, hash_str, list_part, map_part, node_list_part, node_map_part,
        node_part, object_part, scalar_list_part, scalar_part, HashBytes, StableHash,
    },
    low::{Discriminator, ExternalDoc, Xml},
    node::{
        check_for_merge_nodes, find_key_node_top, is_node_ref_value, node_alias, Node, NodeKind,
    },
    refs::{Extensions, Fields, NodeReference, ValueReference},
    resolver::Resolution,
};

/// The `type` keyword: a single type name, or (3.1) a set of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSet {
    /// One type name, e.g. `object`.
    Single(String),

    /// Several acceptable types in source order, e.g. `[string, "null"]`.
    Multi(Vec<String>),
}

impl TypeSet {
    /// Whether the set admits the given type name.
    pub fn contains(&self, name: &str) -> bool {
        match self {
            TypeSet::Single(single) => single == name,
            TypeSet::Multi(names) => names.iter().any(|entry| entry == name),
        }
    }

    fn hash_part(&self) -> String {
        match self {
            TypeSet::Single(single) => single.clone(),
            TypeSet::Multi(names) => {
                let mut sorted = names.clone();
                sorted.sort();
                sorted.join(",")
            }
        }
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSet::Single(single) => f.write_str(single),
            TypeSet::Multi(names) => write!(f, "[{}]", names.join(", ")),
        }
    }
}

/// `exclusiveMinimum`/`exclusiveMaximum`: boolean in 3.0 and 2.0, numeric
/// in 3.1.
#[derive(Debug, Clone, PartialEq)]
pub enum ExclusiveBound {
    /// 3.0-style flag modifying the sibling bound.
    Flag(bool),

    /// 3.1-style standalone numeric bound.
    Value(f64),
}

impl fmt::Display for ExclusiveBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusiveBound::Flag(flag) => flag.fmt(f),
            ExclusiveBound::Value(value) => value.fmt(f),
        }
    }
}

/// `additionalProperties`: a schema or a blanket boolean.
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalProperties {
    /// Additional properties validate against this schema.
    Schema(SchemaProxy),

    /// Additional properties allowed or banned outright.
    Boolean(bool),
}

impl StableHash for AdditionalProperties {
    fn stable_hash(&self) -> HashBytes {
        match self {
            AdditionalProperties::Schema(proxy) => proxy.stable_hash(),
            AdditionalProperties::Boolean(flag) => hash_str(&flag.to_string()),
        }
    }
}

/// The Schema Object allows the definition of input and output data types.
///
/// These types can be objects, but also primitives and arrays. The object
/// is a superset of the
/// [JSON Schema Specification Draft 2020-12](https://json-schema.org).
///
/// See <https://spec.openapis.org/oas/v3.1.1#schema-object>.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    /// Schema title.
    pub title: Option<NodeReference<String>>,

    /// Schema description.
    pub description: Option<NodeReference<String>>,

    /// The `type` keyword; a sequence of types in 3.1.
    pub schema_type: Option<NodeReference<TypeSet>>,

    /// The `format` keyword, further narrowing the type.
    pub format: Option<NodeReference<String>>,

    /// 3.0 `nullable` flag; folded into `type` in 3.1 documents.
    pub nullable: Option<NodeReference<bool>>,

    /// Declares the schema deprecated.
    pub deprecated: Option<NodeReference<bool>>,

    /// Relevant only for schemas sent in a request body.
    pub read_only: Option<NodeReference<bool>>,

    /// Relevant only for schemas returned in a response body.
    pub write_only: Option<NodeReference<bool>>,

    /// Required property names.
    pub required: Vec<ValueReference<String>>,

    /// Permitted values, kept as opaque nodes.
    pub enum_values: Vec<ValueReference<Arc<Node>>>,

    /// 3.1 `const` keyword, kept as an opaque node.
    pub const_value: Option<NodeReference<Arc<Node>>>,

    /// Numeric `multipleOf` constraint.
    pub multiple_of: Option<NodeReference<f64>>,

    /// Inclusive lower bound.
    pub minimum: Option<NodeReference<f64>>,

    /// Inclusive upper bound.
    pub maximum: Option<NodeReference<f64>>,

    /// Exclusive lower bound; flag or number depending on dialect.
    pub exclusive_minimum: Option<NodeReference<ExclusiveBound>>,

    /// Exclusive upper bound; flag or number depending on dialect.
    pub exclusive_maximum: Option<NodeReference<ExclusiveBound>>,

    /// Minimum string length.
    pub min_length: Option<NodeReference<i64>>,

    /// Maximum string length.
    pub max_length: Option<NodeReference<i64>>,

    /// Regular expression constraint on string values.
    pub pattern: Option<NodeReference<String>>,

    /// Minimum array length.
    pub min_items: Option<NodeReference<i64>>,

    /// Maximum array length.
    pub max_items: Option<NodeReference<i64>>,

    /// Whether array items must be unique.
    pub unique_items: Option<NodeReference<bool>>,

    /// Minimum property count.
    pub min_properties: Option<NodeReference<i64>>,

    /// Maximum property count.
    pub max_properties: Option<NodeReference<i64>>,

    /// Named properties, in source order. Values are lazy.
    pub properties: Fields<SchemaProxy>,

    /// Schema or boolean governing undeclared properties.
    pub additional_properties: Option<NodeReference<AdditionalProperties>>,

    /// Array item schema.
    pub items: Option<NodeReference<SchemaProxy>>,

    /// 3.1 positional item schemas.
    pub prefix_items: Vec<ValueReference<SchemaProxy>>,

    /// `allOf` composition.
    pub all_of: Vec<ValueReference<SchemaProxy>>,

    /// `oneOf` composition.
    pub one_of: Vec<ValueReference<SchemaProxy>>,

    /// `anyOf` composition.
    pub any_of: Vec<ValueReference<SchemaProxy>>,

    /// Negated schema.
    pub not: Option<NodeReference<SchemaProxy>>,

    /// Polymorphism discriminator.
    pub discriminator: Option<NodeReference<Discriminator>>,

    /// XML model metadata.
    pub xml: Option<NodeReference<Xml>>,

    /// Additional external documentation.
    pub external_docs: Option<NodeReference<ExternalDoc>>,

    /// Default value, kept as an opaque node.
    pub default: Option<NodeReference<Arc<Node>>>,

    /// Example value, kept as an opaque node.
    pub example: Option<NodeReference<Arc<Node>>>,

    /// 3.1 `examples` sequence, kept as opaque nodes.
    pub examples: Vec<ValueReference<Arc<Node>>>,

    /// Specification extensions.
    pub extensions: Extensions,
}

impl Schema {
    fn from_node(root: &Arc<Node>, ctx: &BuildContext) -> Result<Schema, Diagnostic> {
        let fatal = |err: BuildError| match err {
            BuildError::Fatal(diagnostic) => diagnostic,
            BuildError::Skip => Diagnostic::new(
                DiagnosticKind::BuildFailure,
                "schema child could not be built",
                root.line,
                root.column,
                Severity::Error,
            ),
        };

        Ok(Schema {
            title: string_field("title", root),
            description: string_field("description", root),
            schema_type: type_set(root),
            format: string_field("format", root),
            nullable: bool_field("nullable", root, ctx),
            deprecated: bool_field("deprecated", root, ctx),
            read_only: bool_field("readOnly", root, ctx),
            write_only: bool_field("writeOnly", root, ctx),
            required: string_list("required", root),
            enum_values: node_list("enum", root),
            const_value: any_field("const", root),
            multiple_of: number_field("multipleOf", root, ctx),
            minimum: number_field("minimum", root, ctx),
            maximum: number_field("maximum", root, ctx),
            exclusive_minimum: exclusive_bound("exclusiveMinimum", root, ctx),
            exclusive_maximum: exclusive_bound("exclusiveMaximum", root, ctx),
            min_length: int_field("minLength", root, ctx),
            max_length: int_field("maxLength", root, ctx),
            pattern: string_field("pattern", root),
            min_items: int_field("minItems", root, ctx),
            max_items: int_field("maxItems", root, ctx),
            unique_items: bool_field("uniqueItems", root, ctx),
            min_properties: int_field("minProperties", root, ctx),
            max_properties: int_field("maxProperties", root, ctx),
            properties: properties_map(root, ctx).map_err(fatal)?,
            additional_properties: additional_properties(root, ctx),
            items: extract_object("items", root, ctx).map_err(fatal)?,
            prefix_items: extract_array("prefixItems", root, ctx).map_err(fatal)?,
            all_of: extract_array("allOf", root, ctx).map_err(fatal)?,
            one_of: extract_array("oneOf", root, ctx).map_err(fatal)?,
            any_of: extract_array("anyOf", root, ctx).map_err(fatal)?,
            not: extract_object("not", root, ctx).map_err(fatal)?,
            discriminator: extract_object("discriminator", root, ctx).map_err(fatal)?,
            xml: extract_object("xml", root, ctx).map_err(fatal)?,
            external_docs: extract_object("externalDocs", root, ctx).map_err(fatal)?,
            default: any_field("default", root),
            example: any_field("example", root),
            examples: node_list("examples", root),
            extensions: extract_extensions(root),
        })
    }
}

fn type_set(root: &Arc<Node>) -> Option<NodeReference<TypeSet>> {
    let (key, value) = find_key_node_top("type", &root.content)?;
    let value = node_alias(&value);

    match value.kind {
        NodeKind::Scalar => Some(NodeReference::new(
            TypeSet::Single(value.value.clone()),
            Some(key),
            value,
        )),
        NodeKind::Sequence => {
            let names = value
                .content
                .iter()
                .map(node_alias)
                .filter(|entry| entry.kind == NodeKind::Scalar)
                .map(|entry| entry.value.clone())
                .collect();

            Some(NodeReference::new(TypeSet::Multi(names), Some(key), value))
        }
        _ => None,
    }
}

fn exclusive_bound(
    label: &str,
    root: &Arc<Node>,
    ctx: &BuildContext,
) -> Option<NodeReference<ExclusiveBound>> {
    let (key, value) = find_key_node_top(label, &root.content)?;
    let value = node_alias(&value);

    if value.tag == "!!bool" {
        let flag = value.value.parse().unwrap_or_default();
        return Some(NodeReference::new(
            ExclusiveBound::Flag(flag),
            Some(key),
            value,
        ));
    }

    match value.value.parse::<f64>() {
        Ok(bound) => Some(NodeReference::new(
            ExclusiveBound::Value(bound),
            Some(key),
            value,
        )),
        Err(_) => {
            ctx.push_diagnostic(Diagnostic::warning(
                DiagnosticKind::MalformedNode,
                format!("expected a boolean or number for `{label}`"),
                &value,
            ));
            None
        }
    }
}

fn properties_map(root: &Arc<Node>, ctx: &BuildContext) -> Result<Fields<SchemaProxy>, BuildError> {
    let Some((_, value)) = find_key_node_top("properties", &root.content) else {
        return Ok(Fields::default());
    };

    let value = check_for_merge_nodes(&node_alias(&value));
    build_fields(&value, ctx)
}

fn additional_properties(
    root: &Arc<Node>,
    ctx: &BuildContext,
) -> Option<NodeReference<AdditionalProperties>> {
    let (key, value) = find_key_node_top("additionalProperties", &root.content)?;
    let value = node_alias(&value);

    match value.kind {
        NodeKind::Scalar => {
            let flag = value.value.parse().unwrap_or_default();
            Some(NodeReference::new(
                AdditionalProperties::Boolean(flag),
                Some(key),
                value,
            ))
        }
        NodeKind::Mapping => {
            let proxy = SchemaProxy::wrap(None, &value, ctx);
            let reference = proxy.reference().map(str::to_owned);
            Some(
                NodeReference::new(AdditionalProperties::Schema(proxy), Some(key), value)
                    .with_reference(reference),
            )
        }
        _ => None,
    }
}

impl StableHash for Schema {
    // Hash field order: title, description, type, format, nullable,
    // deprecated, readOnly, writeOnly, required, enum, const, multipleOf,
    // minimum, maximum, exclusiveMinimum, exclusiveMaximum, minLength,
    // maxLength, pattern, minItems, maxItems, uniqueItems, minProperties,
    // maxProperties, properties, additionalProperties, items, prefixItems,
    // allOf, oneOf, anyOf, not, discriminator, xml, externalDocs, default,
    // example, examples, extensions.
    fn stable_hash(&self) -> HashBytes {
        hash_fields(&[
            scalar_part(&self.title),
            scalar_part(&self.description),
            self.schema_type
                .as_ref()
                .map(|set| set.value.hash_part())
                .unwrap_or_default(),
            scalar_part(&self.format),
            scalar_part(&self.nullable),
            scalar_part(&self.deprecated),
            scalar_part(&self.read_only),
            scalar_part(&self.write_only),
            scalar_list_part(&self.required),
            node_list_part(&self.enum_values),
            node_part(&self.const_value),
            scalar_part(&self.multiple_of),
            scalar_part(&self.minimum),
            scalar_part(&self.maximum),
            scalar_part(&self.exclusive_minimum),
            scalar_part(&self.exclusive_maximum),
            scalar_part(&self.min_length),
            scalar_part(&self.max_length),
            scalar_part(&self.pattern),
            scalar_part(&self.min_items),
            scalar_part(&self.max_items),
            scalar_part(&self.unique_items),
            scalar_part(&self.min_properties),
            scalar_part(&self.max_properties),
            map_part(&self.properties),
            object_part(&self.additional_properties),
            object_part(&self.items),
            list_part(&self.prefix_items),
            list_part(&self.all_of),
            list_part(&self.one_of),
            list_part(&self.any_of),
            object_part(&self.not),
            object_part(&self.discriminator),
            object_part(&self.xml),
            object_part(&self.external_docs),
            node_part(&self.default),
            node_part(&self.example),
            node_list_part(&self.examples),
            node_map_part(&self.extensions),
        ])
    }
}

/// A lazy handle on a schema node.
///
/// Building is deferred until [`schema`](SchemaProxy::schema) is first
/// called, then memoised: every call returns the same `Arc` (or the same
/// error). Deferral lets the index and resolver finish before any schema is
/// descended, which is what makes cyclic schemas safe to model.
#[derive(Clone)]
pub struct SchemaProxy {
    key_node: Option<Arc<Node>>,
    node: Arc<Node>,
    reference: Option<String>,
    ctx: BuildContext,
    cell: Arc<OnceCell<Result<Arc<Schema>, Diagnostic>>>,
}

impl SchemaProxy {
    fn wrap(key_node: Option<Arc<Node>>, node: &Arc<Node>, ctx: &BuildContext) -> Self {
        let node = node_alias(node);
        let reference = is_node_ref_value(&node).map(|(_, raw)| raw);

        SchemaProxy {
            key_node,
            node,
            reference,
            ctx: ctx.clone(),
            cell: Arc::new(OnceCell::new()),
        }
    }

    /// The raw node this proxy wraps; a `$ref` mapping for referenced
    /// schemas.
    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    /// Key node of the field this proxy was built under, if any.
    pub fn key_node(&self) -> Option<&Arc<Node>> {
        self.key_node.as_ref()
    }

    /// The `$ref` string, when this proxy wraps a reference.
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    /// Whether this proxy sits on the back-edge of a reference cycle.
    pub fn is_circular(&self) -> bool {
        matches!(
            self.ctx.resolutions().lookup(&self.node),
            Some(Resolution::Resolved { circular: true, .. })
        )
    }

    /// Builds the schema on first call and memoises the outcome; both
    /// success and failure are cached and re-returned.
    pub fn schema(&self) -> Result<Arc<Schema>, Diagnostic> {
        self.cell.get_or_init(|| self.materialise()).clone()
    }

    fn materialise(&self) -> Result<Arc<Schema>, Diagnostic> {
        let mut current = Arc::clone(&self.node);

        // Follow the reference chain. Back-edges of cycles were marked by
        // the resolver and materialise to an empty stub, which is what stops
        // walks and hashes of cyclic schemas from recursing forever.
        for _ in 0..64 {
            let Some((ref_node, raw)) = is_node_ref_value(&current) else {
                break;
            };

            match self.ctx.resolutions().lookup(&current) {
                Some(Resolution::Resolved {
                    target,
                    circular: false,
                    ..
                }) => current = node_alias(target),
                Some(Resolution::Resolved { circular: true, .. }) => {
                    return Ok(Arc::new(Schema::default()));
                }
                Some(Resolution::Failed) | None => {
                    return Err(Diagnostic::new(
                        DiagnosticKind::BuildFailure,
                        format!("unresolved schema reference `{raw}`"),
                        ref_node.line,
                        ref_node.column,
                        Severity::Error,
                    ));
                }
            }
        }

        let current = check_for_merge_nodes(&current);

        match current.kind {
            NodeKind::Mapping => Schema::from_node(&current, &self.ctx).map(Arc::new),
            // A bare boolean is a valid 3.1 schema; model it as empty.
            NodeKind::Scalar if current.tag == "!!bool" => Ok(Arc::new(Schema::default())),
            _ => Err(Diagnostic::new(
                DiagnosticKind::MalformedNode,
                "expected a mapping for Schema",
                current.line,
                current.column,
                Severity::Error,
            )),
        }
    }
}

impl fmt::Debug for SchemaProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaProxy")
            .field("reference", &self.reference)
            .field("built", &self.cell.get().is_some())
            .finish_non_exhaustive()
    }
}

impl PartialEq for SchemaProxy {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

impl Build for SchemaProxy {
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError> {
        let proxy = SchemaProxy::wrap(key.clone(), &root, ctx);
        let reference = proxy.reference.clone();
        let node = Arc::clone(&proxy.node);

        Ok(NodeReference::new(proxy, key, node).with_reference(reference))
    }
}

impl StableHash for SchemaProxy {
    // References hash their resolved content; only unresolvable ones fall
    // back to the raw node.
    fn stable_hash(&self) -> HashBytes {
        match self.schema() {
            Ok(schema) => schema.stable_hash(),
            Err(_) => hash_node(&self.node),
        }
    }
}
