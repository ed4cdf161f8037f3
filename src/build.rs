//! The generic low-level builder primitive.
//!
//! Every model object is produced by a [`Build`] impl that receives its key
//! node, its root node, and a shared [`BuildContext`]. The helpers here do
//! the repetitive work: following `$ref`s through the resolver's map,
//! normalising aliases and merge keys, harvesting extensions, and fanning
//! map/array children out through the translate pipeline while keeping
//! source order.

use std::{
    fmt,
    sync::{Arc, Mutex},
};

use crate::{
    diagnostic::{Diagnostic, DiagnosticKind},
    index::{IndexRegistry, SpecIndex},
    node::{
        check_for_merge_nodes, find_key_node_top, is_extension_key, is_node_ref_value, node_alias,
        Node, NodeKind,
    },
    pipeline,
    refs::{Extensions, Fields, KeyReference, NodeReference, ValueReference},
    resolver::{Resolution, ResolutionMap},
    version::SpecVersion,
};

/// Error channel of a per-object build.
#[derive(Debug)]
pub enum BuildError {
    /// Fatal diagnostic; cancels sibling tasks and aborts the enclosing
    /// build.
    Fatal(Diagnostic),

    /// The child is dropped. Whatever went wrong has already been recorded,
    /// so extraction helpers substitute nothing and move on.
    Skip,
}

impl From<pipeline::Cancelled> for BuildError {
    fn from(cancelled: pipeline::Cancelled) -> Self {
        BuildError::Fatal(cancelled.into())
    }
}

/// Shared state threaded through every builder.
#[derive(Clone)]
pub struct BuildContext {
    registry: Arc<IndexRegistry>,
    root_index: Arc<SpecIndex>,
    resolutions: Arc<ResolutionMap>,
    pipeline: pipeline::Context,
    diagnostics: Arc<Mutex<Vec<Diagnostic>>>,
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("version", &self.root_index.version())
            .finish_non_exhaustive()
    }
}

impl BuildContext {
    /// Wires a context over a frozen index registry and resolution map.
    pub fn new(registry: Arc<IndexRegistry>, resolutions: Arc<ResolutionMap>) -> Self {
        let root_index = registry.root_index();
        let max_workers = registry.rolodex().config().max_workers;

        BuildContext {
            registry,
            root_index,
            resolutions,
            pipeline: pipeline::Context::new(max_workers),
            diagnostics: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The root document's index.
    pub fn index(&self) -> &Arc<SpecIndex> {
        &self.root_index
    }

    /// The index registry covering every loaded document.
    pub fn registry(&self) -> &Arc<IndexRegistry> {
        &self.registry
    }

    /// Resolution map produced by the resolver.
    pub fn resolutions(&self) -> &Arc<ResolutionMap> {
        &self.resolutions
    }

    /// Pipeline context shared by every fan-out in this build.
    pub fn pipeline(&self) -> &pipeline::Context {
        &self.pipeline
    }

    /// Specification flavour being built.
    pub fn version(&self) -> SpecVersion {
        self.root_index.version()
    }

    /// Records a non-fatal issue.
    pub fn push_diagnostic(&self, diagnostic: Diagnostic) {
        log::warn!("{diagnostic}");
        self.diagnostics
            .lock()
            .expect("diagnostics lock")
            .push(diagnostic);
    }

    /// Drains everything recorded so far.
    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock().expect("diagnostics lock"))
    }
}

/// A per-object build function.
pub trait Build: Sized + Send {
    /// Builds one value from its key and root nodes.
    ///
    /// Implementations begin by calling [`prepare_root`], which dereferences
    /// aliases, expands merge keys, and follows `$ref`s through the
    /// resolution map.
    fn build(
        key: Option<Arc<Node>>,
        root: Arc<Node>,
        ctx: &BuildContext,
    ) -> Result<NodeReference<Self>, BuildError>;
}

/// A root node with aliases dereferenced, `$ref`s followed, and merge keys
/// expanded, plus the original pointer when the node came through a ref.
#[derive(Debug, Clone)]
pub struct Prepared {
    /// The node to extract fields from.
    pub root: Arc<Node>,

    /// The original `$ref` string, when one was followed.
    pub reference: Option<String>,
}

/// Normalises a builder's input: alias deref, `$ref` chase, merge-key
/// expansion, in that order.
///
/// Circular and failed references return [`BuildError::Skip`]; the resolver
/// has already recorded their diagnostics. Schema builds do not come through
/// here — the schema engine tolerates cycles through its proxy.
pub fn prepare_root(root: &Arc<Node>, ctx: &BuildContext) -> Result<Prepared, BuildError> {
    let mut current = node_alias(root);
    let mut reference = None;

    // Chains are finite once the resolver has vetted them; the guard keeps
    // a malfunctioning resolution map from hanging a build.
    for _ in 0..64 {
        if is_node_ref_value(&current).is_none() {
            let root = check_for_merge_nodes(&current);
            return Ok(Prepared { root, reference });
        }

        match ctx.resolutions().lookup(&current) {
            Some(Resolution::Resolved {
                target,
                circular: false,
                ..
            }) => {
                if reference.is_none() {
                    reference = is_node_ref_value(&current).map(|(_, raw)| raw);
                }
                current = node_alias(target);
            }
            Some(Resolution::Resolved { circular: true, .. })
            | Some(Resolution::Failed)
            | None => return Err(BuildError::Skip),
        }
    }

    Err(BuildError::Skip)
}

/// Fatal wrong-kind diagnostic with the node's position.
pub fn malformed(expected: &str, node: &Node) -> BuildError {
    BuildError::Fatal(Diagnostic::error(
        DiagnosticKind::MalformedNode,
        format!("expected {expected}"),
        node,
    ))
}

/// Builds one `T` from `root[label]`, if present.
pub fn extract_object<T: Build>(
    label: &str,
    root: &Arc<Node>,
    ctx: &BuildContext,
) -> Result<Option<NodeReference<T>>, BuildError> {
    let Some((key, value)) = find_key_node_top(label, &root.content) else {
        return Ok(None);
    };

    match T::build(Some(key), value, ctx) {
        Ok(built) => Ok(Some(built)),
        Err(BuildError::Skip) => Ok(None),
        Err(fatal) => Err(fatal),
    }
}

/// Builds one `T` per value of the mapping at `root[label]`, in source
/// order, fanning children out through the pipeline.
pub fn extract_map<T: Build>(
    label: &str,
    root: &Arc<Node>,
    ctx: &BuildContext,
) -> Result<Fields<T>, BuildError> {
    let Some((_, value)) = find_key_node_top(label, &root.content) else {
        return Ok(Fields::default());
    };

    let prepared = match prepare_root(&value, ctx) {
        Ok(prepared) => prepared,
        Err(BuildError::Skip) => return Ok(Fields::default()),
        Err(fatal) => return Err(fatal),
    };

    build_fields(&prepared.root, ctx)
}

/// Builds one `T` per entry of a mapping node, in source order.
pub fn build_fields<T: Build>(
    map_node: &Arc<Node>,
    ctx: &BuildContext,
) -> Result<Fields<T>, BuildError> {
    if map_node.kind != NodeKind::Mapping {
        return Err(malformed("a mapping", map_node));
    }

    let entries: Vec<(Arc<Node>, Arc<Node>)> = map_node
        .pairs()
        .filter(|(key, _)| !is_extension_key(&key.value))
        .map(|(key, value)| (Arc::clone(key), Arc::clone(value)))
        .collect();

    let built = pipeline::translate(entries, ctx.pipeline(), |_, (key, value)| {
        match T::build(Some(Arc::clone(&key)), value, ctx) {
            Ok(built) => Ok(Some((key, built))),
            Err(BuildError::Skip) => Ok(None),
            Err(fatal) => Err(fatal),
        }
    })?;

    let mut fields = Fields::with_capacity(built.len());

    for (key, value) in built.into_iter().flatten() {
        fields.insert(
            KeyReference::new(key.value.clone(), key),
            ValueReference {
                value: value.value,
                value_node: value.value_node,
                reference: value.reference,
            },
        );
    }

    Ok(fields)
}

/// Builds one `T` per element of the sequence at `root[label]`, in source
/// order.
pub fn extract_array<T: Build>(
    label: &str,
    root: &Arc<Node>,
    ctx: &BuildContext,
) -> Result<Vec<ValueReference<T>>, BuildError> {
    let Some((_, value)) = find_key_node_top(label, &root.content) else {
        return Ok(Vec::new());
    };

    let value = node_alias(&value);

    if value.kind != NodeKind::Sequence {
        return Err(malformed(&format!("a sequence for `{label}`"), &value));
    }

    let elements: Vec<Arc<Node>> = value.content.iter().map(Arc::clone).collect();

    let built = pipeline::translate(elements, ctx.pipeline(), |_, element| {
        match T::build(None, element, ctx) {
            Ok(built) => Ok(Some(built)),
            Err(BuildError::Skip) => Ok(None),
            Err(fatal) => Err(fatal),
        }
    })?;

    Ok(built
        .into_iter()
        .flatten()
        .map(|built| ValueReference {
            value: built.value,
            value_node: built.value_node,
            reference: built.reference,
        })
        .collect())
}

/// Harvests every `x-` key of a mapping into an ordered map of raw nodes.
pub fn extract_extensions(root: &Arc<Node>) -> Extensions {
    let mut extensions = Extensions::default();

    if root.kind != NodeKind::Mapping {
        return extensions;
    }

    for (key, value) in root.pairs() {
        if is_extension_key(&key.value) {
            extensions.insert(
                KeyReference::new(key.value.clone(), Arc::clone(key)),
                ValueReference::new(Arc::clone(value), Arc::clone(value)),
            );
        }
    }

    extensions
}

/// Pulls a scalar string field.
pub fn string_field(label: &str, root: &Arc<Node>) -> Option<NodeReference<String>> {
    let (key, value) = find_key_node_top(label, &root.content)?;
    let value = node_alias(&value);

    if value.kind != NodeKind::Scalar {
        return None;
    }

    Some(NodeReference::new(value.value.clone(), Some(key), value))
}

/// Pulls a boolean field, warning and skipping on non-boolean scalars.
pub fn bool_field(
    label: &str,
    root: &Arc<Node>,
    ctx: &BuildContext,
) -> Option<NodeReference<bool>> {
    let (key, value) = find_key_node_top(label, &root.content)?;
    let value = node_alias(&value);

    match value.value.parse::<bool>() {
        Ok(parsed) => Some(NodeReference::new(parsed, Some(key), value)),
        Err(_) => {
            ctx.push_diagnostic(Diagnostic::warning(
                DiagnosticKind::MalformedNode,
                format!("expected a boolean for `{label}`, found `{}`", value.value),
                &value,
            ));
            None
        }
    }
}

/// Pulls a numeric field, warning and skipping on non-numeric scalars.
pub fn number_field(
    label: &str,
    root: &Arc<Node>,
    ctx: &BuildContext,
) -> Option<NodeReference<f64>> {
    let (key, value) = find_key_node_top(label, &root.content)?;
    let value = node_alias(&value);

    match value.value.parse::<f64>() {
        Ok(parsed) => Some(NodeReference::new(parsed, Some(key), value)),
        Err(_) => {
            ctx.push_diagnostic(Diagnostic::warning(
                DiagnosticKind::MalformedNode,
                format!("expected a number for `{label}`, found `{}`", value.value),
                &value,
            ));
            None
        }
    }
}

/// Pulls an integer field, warning and skipping on non-integer scalars.
pub fn int_field(
    label: &str,
    root: &Arc<Node>,
    ctx: &BuildContext,
) -> Option<NodeReference<i64>> {
    let (key, value) = find_key_node_top(label, &root.content)?;
    let value = node_alias(&value);

    match value.value.parse::<i64>() {
        Ok(parsed) => Some(NodeReference::new(parsed, Some(key), value)),
        Err(_) => {
            ctx.push_diagnostic(Diagnostic::warning(
                DiagnosticKind::MalformedNode,
                format!("expected an integer for `{label}`, found `{}`", value.value),
                &value,
            ));
            None
        }
    }
}

/// Pulls a field as an opaque node, whatever its kind.
pub fn any_field(label: &str, root: &Arc<Node>) -> Option<NodeReference<Arc<Node>>> {
    let (key, value) = find_key_node_top(label, &root.content)?;
    let value = node_alias(&value);

    Some(NodeReference::new(Arc::clone(&value), Some(key), value))
}

/// Builds an ordered map of opaque nodes from the mapping at `root[label]`,
/// for fields whose values stay uninterpreted (link parameters, 2.0
/// response examples).
pub fn find_any_map(label: &str, root: &Arc<Node>) -> Fields<Arc<Node>> {
    let Some((_, value)) = find_key_node_top(label, &root.content) else {
        return Fields::default();
    };

    let value = check_for_merge_nodes(&node_alias(&value));
    let mut fields = Fields::default();

    if value.kind != NodeKind::Mapping {
        return fields;
    }

    for (key, entry) in value.pairs() {
        let entry = node_alias(entry);
        fields.insert(
            KeyReference::new(key.value.clone(), Arc::clone(key)),
            ValueReference::new(Arc::clone(&entry), entry),
        );
    }

    fields
}

/// Builds an ordered map of scalar strings from the mapping at
/// `root[label]`, e.g. discriminator mappings and OAuth scope tables.
pub fn string_map(label: &str, root: &Arc<Node>) -> Fields<String> {
    let Some((_, value)) = find_key_node_top(label, &root.content) else {
        return Fields::default();
    };

    let value = check_for_merge_nodes(&node_alias(&value));
    let mut fields = Fields::default();

    if value.kind != NodeKind::Mapping {
        return fields;
    }

    for (key, entry) in value.pairs() {
        let entry = node_alias(entry);
        if entry.kind == NodeKind::Scalar {
            fields.insert(
                KeyReference::new(key.value.clone(), Arc::clone(key)),
                ValueReference::new(entry.value.clone(), entry),
            );
        }
    }

    fields
}

/// Pulls a sequence of scalar strings.
pub fn string_list(label: &str, root: &Arc<Node>) -> Vec<ValueReference<String>> {
    let Some((_, value)) = find_key_node_top(label, &root.content) else {
        return Vec::new();
    };

    let value = node_alias(&value);

    if value.kind != NodeKind::Sequence {
        return Vec::new();
    }

    value
        .content
        .iter()
        .map(node_alias)
        .filter(|element| element.kind == NodeKind::Scalar)
        .map(|element| ValueReference::new(element.value.clone(), element))
        .collect()
}

/// Pulls a sequence of opaque nodes.
pub fn node_list(label: &str, root: &Arc<Node>) -> Vec<ValueReference<Arc<Node>>> {
    let Some((_, value)) = find_key_node_top(label, &root.content) else {
        return Vec::new();
    };

    let value = node_alias(&value);

    if value.kind != NodeKind::Sequence {
        return Vec::new();
    }

    value
        .content
        .iter()
        .map(node_alias)
        .map(|element| ValueReference::new(Arc::clone(&element), element))
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::{
        index::IndexRegistry,
        resolver::Resolver,
        rolodex::{DocumentConfig, Rolodex},
        version,
    };

    /// Wires a full context over an inline source for builder tests.
    pub(crate) fn test_context(source: &str) -> BuildContext {
        let rolodex = Arc::new(
            Rolodex::new(source, DocumentConfig::default()).expect("parseable source"),
        );
        let (version, _, _) =
            version::detect(&rolodex.root().root).expect("source with a version key");
        let registry = Arc::new(IndexRegistry::new(rolodex, version));
        let outcome = Resolver::run(Arc::clone(&registry));
        BuildContext::new(registry, Arc::new(outcome.resolutions))
    }
}
