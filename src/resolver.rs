//! The reference resolver: walks every recorded `$ref` site, follows chains
//! across documents, detects cycles, and leaves behind a resolution map the
//! builders consult.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use log::warn;

use crate::{
    diagnostic::{CircularKind, Diagnostic, DiagnosticKind, Severity},
    index::{origin_key, IndexRegistry, RefSite, SpecIndex},
    node::Node,
    pointer,
    rolodex::{DocumentOrigin, LoadedDocument, RolodexError},
    version,
};

/// Outcome of resolving one `$ref` site.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// The pointer locates a concrete node. `circular` marks sites whose
    /// expansion closed a cycle; builders record the pointer on the built
    /// object but stop descending.
    Resolved {
        /// The resolved target node.
        target: Arc<Node>,
        /// Document the target lives in.
        document: Arc<LoadedDocument>,
        /// Whether this site closes a reference cycle.
        circular: bool,
    },

    /// The pointer could not be resolved; a diagnostic has been recorded
    /// and builders substitute nothing.
    Failed,
}

/// Resolutions keyed by the identity of the mapping node holding `$ref`.
#[derive(Debug, Default)]
pub struct ResolutionMap {
    entries: HashMap<usize, Resolution>,
}

impl ResolutionMap {
    /// Resolution for a reference mapping node, if the resolver saw it.
    pub fn lookup(&self, node: &Arc<Node>) -> Option<&Resolution> {
        self.entries.get(&node.identity())
    }

    /// Number of resolved or failed sites.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no sites were recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolution map plus every diagnostic the walk produced.
#[derive(Debug)]
pub struct ResolverOutcome {
    /// Per-site resolutions for the builders.
    pub resolutions: ResolutionMap,

    /// Circular, unresolved, disallowed, and fetch diagnostics.
    pub diagnostics: Vec<Diagnostic>,
}

struct StackEntry {
    key: String,
    display: String,
}

/// Depth-first resolver over an index registry.
pub struct Resolver {
    registry: Arc<IndexRegistry>,
    resolutions: HashMap<usize, Resolution>,
    completed: HashSet<usize>,
    in_flight: HashSet<usize>,
    diagnostics: Vec<Diagnostic>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("resolved", &self.resolutions.len())
            .field("diagnostics", &self.diagnostics.len())
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Resolves every site reachable from the root document.
    pub fn run(registry: Arc<IndexRegistry>) -> ResolverOutcome {
        let mut resolver = Resolver {
            registry: Arc::clone(&registry),
            resolutions: HashMap::new(),
            completed: HashSet::new(),
            in_flight: HashSet::new(),
            diagnostics: Vec::new(),
        };

        let root = registry.root_index();
        let mut stack = Vec::new();

        for site in root.ref_sites() {
            resolver.visit(site, &root, &mut stack);
        }

        ResolverOutcome {
            resolutions: ResolutionMap {
                entries: resolver.resolutions,
            },
            diagnostics: resolver.diagnostics,
        }
    }

    fn visit(&mut self, site: &RefSite, index: &Arc<SpecIndex>, stack: &mut Vec<StackEntry>) {
        let id = site.node.identity();

        if self.completed.contains(&id) {
            return;
        }

        let located = self
            .registry
            .rolodex()
            .locate(&site.reference, index.document());

        let (document, target) = match located {
            Ok(found) => found,
            Err(err) => {
                self.record_failure(site, index, err);
                return;
            }
        };

        let key = format!(
            "{}#{}",
            origin_key(&document.origin),
            site.reference.fragment
        );

        if let Some(position) = stack.iter().position(|entry| {
            entry.key == key || entry.key.starts_with(&format!("{key}/"))
        }) {
            self.record_cycle(site, &key, &stack[position..]);
            self.resolutions.insert(
                id,
                Resolution::Resolved {
                    target,
                    document,
                    circular: true,
                },
            );
            self.completed.insert(id);
            return;
        }

        if self.in_flight.contains(&id) {
            return;
        }
        self.in_flight.insert(id);

        let target_index = self.registry.index_for(&document);

        stack.push(StackEntry {
            display: key.clone(),
            key,
        });

        let sub_sites: Vec<RefSite> = target_index
            .ref_sites_under(&site.reference.fragment)
            .into_iter()
            .cloned()
            .collect();

        for sub_site in &sub_sites {
            self.visit(sub_site, &target_index, stack);
        }

        stack.pop();
        self.in_flight.remove(&id);
        self.completed.insert(id);

        // A cycle recorded mid-expansion wins over the plain resolution.
        self.resolutions.entry(id).or_insert(Resolution::Resolved {
            target,
            document,
            circular: false,
        });
    }

    fn record_failure(&mut self, site: &RefSite, index: &Arc<SpecIndex>, err: RolodexError) {
        let id = site.node.identity();

        let kind = match &err {
            RolodexError::LookupDisallowed { .. } => DiagnosticKind::DisallowedReference,
            RolodexError::FetchFailed { .. } | RolodexError::ParseFailed { .. } => {
                DiagnosticKind::FetchFailure
            }
            RolodexError::NotFound { .. } => DiagnosticKind::UnresolvedReference,
        };

        // Dangling pointers inside partial sub-documents (fragment files
        // with no version key) demote to warnings with a null substitution.
        let document = index.document();
        let partial = !matches!(document.origin, DocumentOrigin::Root)
            && version::detect(&document.root).is_none();

        let severity = if partial && kind == DiagnosticKind::UnresolvedReference {
            Severity::Warning
        } else {
            Severity::Error
        };

        if severity == Severity::Warning {
            warn!("unresolved reference `{}` in partial document", site.raw);
        }

        self.diagnostics.push(
            Diagnostic::new(
                kind,
                err.to_string(),
                site.ref_node.line,
                site.ref_node.column,
                severity,
            )
            .at_path(site.pointer.clone()),
        );

        self.resolutions.insert(id, Resolution::Failed);
        self.completed.insert(id);
    }

    fn record_cycle(&mut self, site: &RefSite, closing: &str, looped: &[StackEntry]) {
        let mut members: Vec<String> = looped.iter().map(|entry| entry.display.clone()).collect();
        members.push(closing.to_owned());

        let kind = classify_cycle(site, &members);

        let config = self.registry.rolodex().config();
        let tolerated = match kind {
            CircularKind::ArrayItems => config.ignore_array_circular,
            CircularKind::Polymorphic => config.ignore_polymorphic_circular,
            // Direct self-references are tolerable without opting in; longer
            // object loops are not.
            CircularKind::Object => members.len() == 2,
        };

        let severity = if tolerated {
            Severity::Warning
        } else {
            Severity::Error
        };

        self.diagnostics.push(
            Diagnostic::new(
                DiagnosticKind::CircularReference(kind),
                format!("`{}` closes a reference cycle: {}", site.raw, members.join(" -> ")),
                site.ref_node.line,
                site.ref_node.column,
                severity,
            )
            .at_path(site.pointer.clone())
            .with_cycle(members),
        );
    }
}

/// Derives a cycle's kind from the back-edge's enclosing context, innermost
/// key first, falling back to the cycle members' own pointer segments.
fn classify_cycle(site: &RefSite, members: &[String]) -> CircularKind {
    let member_segments = members.iter().flat_map(|member| {
        let fragment = member.split_once('#').map(|(_, frag)| frag).unwrap_or("");
        pointer::segments(fragment)
    });

    let candidates = site
        .ancestry
        .iter()
        .rev()
        .cloned()
        .chain(member_segments);

    for segment in candidates {
        match segment.as_str() {
            "items" | "prefixItems" => return CircularKind::ArrayItems,
            "allOf" | "oneOf" | "anyOf" | "not" => return CircularKind::Polymorphic,
            _ => {}
        }
    }

    CircularKind::Object
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        rolodex::{DocumentConfig, Rolodex},
        version::SpecVersion,
    };

    fn resolve(source: &str) -> ResolverOutcome {
        resolve_with(source, DocumentConfig::default())
    }

    fn resolve_with(source: &str, config: DocumentConfig) -> ResolverOutcome {
        let rolodex = Arc::new(Rolodex::new(source, config).unwrap());
        let registry = Arc::new(IndexRegistry::new(rolodex, SpecVersion::V30));
        Resolver::run(registry)
    }

    #[test]
    fn local_references_resolve_to_their_targets() {
        let outcome = resolve(indoc! {"
            openapi: 3.0.0
            paths:
              /a:
                get:
                  responses:
                    '200': {$ref: '#/components/responses/Ok'}
            components:
              responses:
                Ok: {description: fine}
        "});

        assert!(outcome.diagnostics.is_empty());
        assert_eq!(outcome.resolutions.len(), 1);
    }

    #[test]
    fn chained_references_resolve_transitively() {
        let outcome = resolve(indoc! {"
            openapi: 3.0.0
            components:
              schemas:
                A: {$ref: '#/components/schemas/B'}
                B: {$ref: '#/components/schemas/C'}
                C: {type: string}
        "});

        assert!(outcome.diagnostics.is_empty());
        assert_eq!(outcome.resolutions.len(), 2);
    }

    #[test]
    fn unknown_targets_produce_one_unresolved_diagnostic() {
        let outcome = resolve(indoc! {"
            openapi: 3.0.0
            paths: {}
            components:
              schemas:
                A: {$ref: '#/nowhere'}
        "});

        assert_eq!(outcome.diagnostics.len(), 1);
        let diagnostic = &outcome.diagnostics[0];
        assert_eq!(diagnostic.kind, DiagnosticKind::UnresolvedReference);
        assert!(diagnostic.message.contains("#/nowhere"));
        assert!(diagnostic.is_fatal());
        assert_eq!(diagnostic.line, 5);
    }

    #[test]
    fn direct_self_reference_is_a_tolerated_object_cycle() {
        let outcome = resolve(indoc! {"
            openapi: 3.0.0
            paths: {}
            components:
              schemas:
                Node:
                  type: object
                  properties:
                    next: {$ref: '#/components/schemas/Node'}
        "});

        assert_eq!(outcome.diagnostics.len(), 1);
        let diagnostic = &outcome.diagnostics[0];
        assert_eq!(
            diagnostic.kind,
            DiagnosticKind::CircularReference(CircularKind::Object)
        );
        assert!(!diagnostic.is_fatal());
        assert_eq!(
            diagnostic.cycle,
            vec![
                "#/components/schemas/Node".to_owned(),
                "#/components/schemas/Node".to_owned(),
            ]
        );
    }

    #[test]
    fn mutual_object_cycles_are_fatal() {
        let outcome = resolve(indoc! {"
            openapi: 3.0.0
            components:
              schemas:
                A:
                  properties:
                    b: {$ref: '#/components/schemas/B'}
                B:
                  properties:
                    a: {$ref: '#/components/schemas/A'}
        "});

        let cycles: Vec<_> = outcome
            .diagnostics
            .iter()
            .filter(|diagnostic| {
                matches!(diagnostic.kind, DiagnosticKind::CircularReference(_))
            })
            .collect();

        assert_eq!(cycles.len(), 1);
        assert!(cycles[0].is_fatal());
        assert_eq!(cycles[0].cycle.len(), 3);
    }

    #[test]
    fn polymorphic_cycles_follow_their_ignore_flag() {
        let source = indoc! {"
            openapi: 3.0.0
            components:
              schemas:
                Shape:
                  oneOf:
                    - {$ref: '#/components/schemas/Shape'}
        "};

        let strict = resolve(source);
        assert_eq!(strict.diagnostics.len(), 1);
        assert_eq!(
            strict.diagnostics[0].kind,
            DiagnosticKind::CircularReference(CircularKind::Polymorphic)
        );
        assert!(strict.diagnostics[0].is_fatal());

        let tolerant = resolve_with(
            source,
            DocumentConfig {
                ignore_polymorphic_circular: true,
                ..DocumentConfig::default()
            },
        );
        assert!(!tolerant.diagnostics[0].is_fatal());
    }

    #[test]
    fn items_cycles_classify_as_array_kind() {
        let outcome = resolve_with(
            indoc! {"
                openapi: 3.0.0
                components:
                  schemas:
                    List:
                      type: array
                      items: {$ref: '#/components/schemas/List'}
            "},
            DocumentConfig {
                ignore_array_circular: true,
                ..DocumentConfig::default()
            },
        );

        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(
            outcome.diagnostics[0].kind,
            DiagnosticKind::CircularReference(CircularKind::ArrayItems)
        );
        assert!(!outcome.diagnostics[0].is_fatal());
    }

    #[test]
    fn disallowed_file_reference_is_reported() {
        let outcome = resolve(indoc! {"
            openapi: 3.0.0
            components:
              schemas:
                A: {$ref: 'shared.yaml#/Pet'}
        "});

        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(
            outcome.diagnostics[0].kind,
            DiagnosticKind::DisallowedReference
        );
    }
}
