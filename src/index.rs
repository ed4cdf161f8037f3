//! The spec index: a per-document directory of every referenceable
//! construct, built in one walk and frozen before any build dispatches.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use derive_more::derive::Display;
use log::debug;

use crate::{
    diagnostic::{Diagnostic, DiagnosticKind},
    node::{is_extension_key, is_node_ref_value, Node, NodeKind},
    pointer::{self, Reference},
    rolodex::{DocumentOrigin, LoadedDocument, Rolodex},
    version::SpecVersion,
};

/// Definition classes the index catalogues per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ComponentClass {
    /// `components/schemas` or 2.0 `definitions`.
    #[display("schemas")]
    Schema,

    /// `components/responses` or 2.0 `responses`.
    #[display("responses")]
    Response,

    /// `components/parameters` or 2.0 `parameters`.
    #[display("parameters")]
    Parameter,

    /// `components/examples`.
    #[display("examples")]
    Example,

    /// `components/requestBodies`.
    #[display("requestBodies")]
    RequestBody,

    /// `components/headers`.
    #[display("headers")]
    Header,

    /// `components/securitySchemes` or 2.0 `securityDefinitions`.
    #[display("securitySchemes")]
    SecurityScheme,

    /// `components/links`.
    #[display("links")]
    Link,

    /// `components/callbacks`.
    #[display("callbacks")]
    Callback,

    /// `paths`, `webhooks`, and `components/pathItems` entries.
    #[display("pathItems")]
    PathItem,

    /// HTTP verb entries under path items.
    #[display("operations")]
    Operation,
}

const COMPONENT_CLASSES: &[(&str, ComponentClass)] = &[
    ("schemas", ComponentClass::Schema),
    ("responses", ComponentClass::Response),
    ("parameters", ComponentClass::Parameter),
    ("examples", ComponentClass::Example),
    ("requestBodies", ComponentClass::RequestBody),
    ("headers", ComponentClass::Header),
    ("securitySchemes", ComponentClass::SecurityScheme),
    ("links", ComponentClass::Link),
    ("callbacks", ComponentClass::Callback),
    ("pathItems", ComponentClass::PathItem),
];

const HTTP_VERBS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace", "query",
];

/// One catalogued definition.
#[derive(Debug, Clone)]
pub struct ComponentEntry {
    /// Definition name (map key).
    pub name: String,

    /// Absolute pointer of the definition node.
    pub pointer: String,

    /// The definition node.
    pub node: Arc<Node>,
}

/// One `$ref` usage recorded during the index walk.
#[derive(Debug, Clone)]
pub struct RefSite {
    /// Absolute pointer of the mapping holding the `$ref` key.
    pub pointer: String,

    /// The mapping node holding the `$ref` key.
    pub node: Arc<Node>,

    /// The scalar node carrying the pointer string.
    pub ref_node: Arc<Node>,

    /// Parsed reference.
    pub reference: Reference,

    /// Raw reference string as written.
    pub raw: String,

    /// Decoded ancestor key segments of the site, innermost last. Drives
    /// cycle-kind classification.
    pub ancestry: Vec<String>,
}

/// Per-document directory: pointer lookups, per-class definition lists, a
/// reverse node-identity index, and every recorded `$ref` site.
#[derive(Debug)]
pub struct SpecIndex {
    document: Arc<LoadedDocument>,
    version: SpecVersion,
    pointers: HashMap<String, Arc<Node>>,
    reverse: HashMap<usize, String>,
    components: HashMap<ComponentClass, Vec<ComponentEntry>>,
    ref_sites: Vec<RefSite>,
    errors: Vec<Diagnostic>,
}

impl SpecIndex {
    /// Walks the document once and catalogues it.
    pub fn build(document: Arc<LoadedDocument>, version: SpecVersion) -> Self {
        let mut index = SpecIndex {
            document,
            version,
            pointers: HashMap::new(),
            reverse: HashMap::new(),
            components: HashMap::new(),
            ref_sites: Vec::new(),
            errors: Vec::new(),
        };

        let root = Arc::clone(&index.document.root);
        if let Some(value) = root.content.first() {
            let mut segments = Vec::new();
            index.walk(&Arc::clone(value), &mut segments);
        }

        debug!(
            "indexed {} pointers, {} ref sites",
            index.pointers.len(),
            index.ref_sites.len()
        );

        index
    }

    /// The document this index catalogues.
    pub fn document(&self) -> &Arc<LoadedDocument> {
        &self.document
    }

    /// Specification flavour the document was read as.
    pub fn version(&self) -> SpecVersion {
        self.version
    }

    /// Pure pointer lookup; the fragment is normalised before comparison.
    pub fn find_by_pointer(&self, fragment: &str) -> Option<Arc<Node>> {
        self.pointers
            .get(&pointer::normalize(fragment))
            .map(Arc::clone)
    }

    /// Short-form lookup of a named definition.
    pub fn find_component(&self, class: ComponentClass, name: &str) -> Option<Arc<Node>> {
        self.components(class)
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| Arc::clone(&entry.node))
    }

    /// All catalogued definitions of a class, in source order.
    pub fn components(&self, class: ComponentClass) -> &[ComponentEntry] {
        self.components
            .get(&class)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Absolute pointer of a node, by identity.
    pub fn pointer_of(&self, node: &Arc<Node>) -> Option<&str> {
        self.reverse.get(&node.identity()).map(String::as_str)
    }

    /// Every recorded `$ref` site, in source order.
    pub fn ref_sites(&self) -> &[RefSite] {
        &self.ref_sites
    }

    /// `$ref` sites whose pointer sits inside `fragment`'s subtree.
    pub fn ref_sites_under<'a>(&'a self, fragment: &str) -> Vec<&'a RefSite> {
        let normalized = pointer::normalize(fragment);
        let prefix = format!("{normalized}/");

        self.ref_sites
            .iter()
            .filter(|site| site.pointer == normalized || site.pointer.starts_with(&prefix))
            .collect()
    }

    /// Issues accumulated during construction: malformed pointers, sibling
    /// keys next to `$ref`, non-scalar reference values.
    pub fn reference_errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    fn walk(&mut self, node: &Arc<Node>, segments: &mut Vec<String>) {
        self.register(node, segments);

        match node.kind {
            NodeKind::Mapping => {
                if self.record_ref_site(node, segments) {
                    // Nothing meaningful below a reference mapping.
                    return;
                }

                for (key, value) in node.pairs() {
                    segments.push(key.value.clone());
                    // Key nodes share the value's pointer but only occupy
                    // the reverse index; the pointer map holds the value.
                    self.reverse.insert(key.identity(), pointer::join(segments));
                    self.walk(value, segments);
                    segments.pop();
                }
            }
            NodeKind::Sequence => {
                for (position, child) in node.content.iter().enumerate() {
                    segments.push(position.to_string());
                    self.walk(child, segments);
                    segments.pop();
                }
            }
            _ => {}
        }
    }

    fn register(&mut self, node: &Arc<Node>, segments: &[String]) {
        let fragment = pointer::join(segments);

        self.reverse.insert(node.identity(), fragment.clone());

        if let Some((class, name)) = self.classify(segments) {
            self.components.entry(class).or_default().push(ComponentEntry {
                name,
                pointer: fragment.clone(),
                node: Arc::clone(node),
            });
        }

        self.pointers.entry(fragment).or_insert_with(|| Arc::clone(node));
    }

    fn record_ref_site(&mut self, node: &Arc<Node>, segments: &[String]) -> bool {
        let Some((ref_node, raw)) = is_node_ref_value(node) else {
            return false;
        };

        let fragment = pointer::join(segments);

        if ref_node.kind != NodeKind::Scalar {
            self.errors.push(
                Diagnostic::error(
                    DiagnosticKind::UnresolvedReference,
                    "`$ref` value must be a string",
                    &ref_node,
                )
                .at_path(fragment),
            );
            return true;
        }

        let reference = match Reference::parse(&raw) {
            Ok(reference) => reference,
            Err(err) => {
                self.errors.push(
                    Diagnostic::error(
                        DiagnosticKind::UnresolvedReference,
                        format!("invalid reference `{raw}`: {err}"),
                        &ref_node,
                    )
                    .at_path(fragment),
                );
                return true;
            }
        };

        let siblings: Vec<String> = node
            .pairs()
            .skip(1)
            .filter(|(key, _)| !is_extension_key(&key.value))
            .map(|(key, _)| key.value.clone())
            .collect();

        if !siblings.is_empty() {
            self.errors.push(
                Diagnostic::warning(
                    DiagnosticKind::MalformedNode,
                    format!(
                        "keys [{}] beside `$ref` are ignored",
                        siblings.join(", ")
                    ),
                    node,
                )
                .at_path(fragment.clone()),
            );
        }

        self.ref_sites.push(RefSite {
            pointer: fragment,
            node: Arc::clone(node),
            ref_node,
            reference,
            raw,
            ancestry: segments.to_vec(),
        });

        true
    }

    fn classify(&self, segments: &[String]) -> Option<(ComponentClass, String)> {
        let parts: Vec<&str> = segments.iter().map(String::as_str).collect();

        match (self.version, parts.as_slice()) {
            (version, ["components", container, name]) if version.is_v3() => COMPONENT_CLASSES
                .iter()
                .find(|(label, _)| label == container)
                .map(|(_, class)| (*class, (*name).to_owned())),

            (SpecVersion::V2, ["definitions", name]) => {
                Some((ComponentClass::Schema, (*name).to_owned()))
            }
            (SpecVersion::V2, ["parameters", name]) => {
                Some((ComponentClass::Parameter, (*name).to_owned()))
            }
            (SpecVersion::V2, ["responses", name]) => {
                Some((ComponentClass::Response, (*name).to_owned()))
            }
            (SpecVersion::V2, ["securityDefinitions", name]) => {
                Some((ComponentClass::SecurityScheme, (*name).to_owned()))
            }

            (_, ["paths", path]) => Some((ComponentClass::PathItem, (*path).to_owned())),
            (_, ["webhooks", name]) => Some((ComponentClass::PathItem, (*name).to_owned())),

            (_, ["paths", path, verb]) if HTTP_VERBS.contains(verb) => {
                Some((ComponentClass::Operation, format!("{path}:{verb}")))
            }
            (_, ["webhooks", name, verb]) if HTTP_VERBS.contains(verb) => {
                Some((ComponentClass::Operation, format!("{name}:{verb}")))
            }
            (_, ["components", "pathItems", name, verb]) if HTTP_VERBS.contains(verb) => {
                Some((ComponentClass::Operation, format!("{name}:{verb}")))
            }

            _ => None,
        }
    }
}

/// Lazily-populated set of indexes over every document in the rolodex. The
/// root index is built eagerly; sub-document indexes appear as the resolver
/// first touches them.
#[derive(Debug)]
pub struct IndexRegistry {
    rolodex: Arc<Rolodex>,
    version: SpecVersion,
    indexes: Mutex<HashMap<String, Arc<SpecIndex>>>,
}

impl IndexRegistry {
    /// Creates the registry and eagerly indexes the root document.
    pub fn new(rolodex: Arc<Rolodex>, version: SpecVersion) -> Self {
        let registry = IndexRegistry {
            rolodex,
            version,
            indexes: Mutex::new(HashMap::new()),
        };

        registry.index_for(&Arc::clone(registry.rolodex.root()));
        registry
    }

    /// The rolodex feeding this registry.
    pub fn rolodex(&self) -> &Arc<Rolodex> {
        &self.rolodex
    }

    /// The root document's index.
    pub fn root_index(&self) -> Arc<SpecIndex> {
        self.index_for(&Arc::clone(self.rolodex.root()))
    }

    /// Every index built so far, the root document's first.
    pub fn indexes(&self) -> Vec<Arc<SpecIndex>> {
        let indexes = self.indexes.lock().expect("indexes lock");

        let mut all: Vec<Arc<SpecIndex>> = Vec::with_capacity(indexes.len());
        if let Some(root) = indexes.get("") {
            all.push(Arc::clone(root));
        }
        all.extend(
            indexes
                .iter()
                .filter(|(key, _)| !key.is_empty())
                .map(|(_, index)| Arc::clone(index)),
        );
        all
    }

    /// Index for `document`, building it on first request.
    pub fn index_for(&self, document: &Arc<LoadedDocument>) -> Arc<SpecIndex> {
        let key = origin_key(&document.origin);

        let mut indexes = self.indexes.lock().expect("indexes lock");
        if let Some(index) = indexes.get(&key) {
            return Arc::clone(index);
        }

        let index = Arc::new(SpecIndex::build(Arc::clone(document), self.version));
        indexes.insert(key, Arc::clone(&index));
        index
    }
}

/// Stable cache key for a document origin.
pub fn origin_key(origin: &DocumentOrigin) -> String {
    match origin {
        DocumentOrigin::Root => String::new(),
        DocumentOrigin::File(path) => path.display().to_string(),
        DocumentOrigin::Remote(url) => url.to_string(),
    }
}
