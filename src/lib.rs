//! Low-level, source-faithful models and tools to parse, index, and resolve
//! [OpenAPI](https://spec.openapis.org) and Swagger documents.
//!
//! A document is ingested as YAML or JSON and built into two coordinated
//! representations: the [`low`]-level model, which keeps every source
//! token's line/column position, ordering, and `$ref` provenance, and the
//! thin [`high`]-level façade for idiomatic typed access. Along the way the
//! crate indexes every referenceable construct, follows reference chains
//! across documents, detects cycles, and computes stable content hashes for
//! diffing.
//!
//! # Examples
//!
//! ```
//! let result = oasdoc::from_str(
//!     "openapi: 3.0.0\ninfo: {title: Example, version: '1'}\npaths: {}\n",
//! )?;
//!
//! assert!(result.diagnostics.is_empty());
//! assert_eq!(result.document.version.value, "3.0.0");
//! # Ok::<(), oasdoc::Error>(())
//! ```
//!
//! Reference resolution across files and hosts is opt-in through
//! [`DocumentConfig`]; cycles and dangling pointers surface as structured
//! [`Diagnostic`]s rather than panics.

use std::{path::Path, sync::Arc};

mod build;
mod diagnostic;
mod error;
pub mod hash;
pub mod high;
mod index;
pub mod low;
pub mod node;
mod pipeline;
pub mod pointer;
mod refs;
mod resolver;
mod rolodex;
mod version;

pub use self::{
    build::{Build, BuildContext, BuildError},
    diagnostic::{CircularKind, Diagnostic, DiagnosticKind, Severity},
    error::Error,
    hash::{clear_hash_cache, HashBytes, StableHash},
    index::{ComponentClass, ComponentEntry, IndexRegistry, RefSite, SpecIndex},
    pipeline::{translate, Cancelled, Context as PipelineContext},
    refs::{Extensions, Fields, KeyReference, NodeReference, ValueReference},
    resolver::{Resolution, ResolutionMap, Resolver, ResolverOutcome},
    rolodex::{
        DocumentConfig, DocumentOrigin, FileProvider, LoadedDocument, RemoteFetcher, Rolodex,
        RolodexError, StdFs,
    },
    version::SpecVersion,
};

#[cfg(feature = "client")]
pub use self::rolodex::UreqFetcher;

/// Outcome of building a document: the (possibly partial) document plus
/// every diagnostic raised along the way, fatal ones included.
#[derive(Debug)]
pub struct BuildResult {
    /// The built document.
    pub document: low::Document,

    /// Index, resolver, and builder diagnostics in the order they arose.
    pub diagnostics: Vec<Diagnostic>,
}

impl BuildResult {
    /// Whether any fatal diagnostic was raised.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_fatal)
    }

    /// Wraps the document in the high-level façade.
    pub fn openapi(self) -> high::OpenApi {
        high::OpenApi::new(Arc::new(self.document))
    }
}

/// Builds a document from UTF-8 YAML or JSON source.
///
/// Fails only when the source cannot be scanned or carries neither an
/// `openapi` nor a `swagger` version key; everything else is reported
/// through the result's diagnostics list, with fatal section failures
/// leaving their sections empty.
pub fn create_document(source: &str, config: DocumentConfig) -> Result<BuildResult, Error> {
    let rolodex = Arc::new(Rolodex::new(source, config)?);

    let Some((spec_version, version_key, version_value)) = version::detect(&rolodex.root().root)
    else {
        return Err(Error::MissingRoot);
    };

    // Strict phase barrier: index, then resolve, then build.
    let registry = Arc::new(IndexRegistry::new(rolodex, spec_version));
    let outcome = Resolver::run(Arc::clone(&registry));

    let ctx = BuildContext::new(Arc::clone(&registry), Arc::new(outcome.resolutions));
    let (document, fatals) =
        low::Document::build(&ctx, spec_version, version_key, version_value);

    let mut diagnostics = Vec::new();
    for index in registry.indexes() {
        diagnostics.extend(index.reference_errors().iter().cloned());
    }
    diagnostics.extend(outcome.diagnostics);
    diagnostics.extend(ctx.take_diagnostics());
    diagnostics.extend(fatals);

    Ok(BuildResult {
        document,
        diagnostics,
    })
}

/// Builds a document from source with the default configuration: no file or
/// remote lookups, strict circular-reference handling.
pub fn from_str(source: &str) -> Result<BuildResult, Error> {
    create_document(source, DocumentConfig::default())
}

/// Reads and builds a document from a file.
///
/// The file's parent directory seeds `base_path` and file references are
/// enabled, so sibling documents resolve the way editors lay them out.
pub fn from_path<P: AsRef<Path>>(path: P) -> Result<BuildResult, Error> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)?;

    let config = DocumentConfig {
        base_path: path.parent().map(Path::to_path_buf),
        allow_file_references: true,
        ..DocumentConfig::default()
    };

    create_document(&source, config)
}
