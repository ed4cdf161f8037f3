//! The rolodex: a registry of every document loaded while resolving
//! references.
//!
//! The root document plus any file- or HTTP-resolved sub-documents live
//! here. The rolodex owns each sub-document's source text and node tree;
//! everything else holds [`Arc`]s into it. IO is pluggable so tests and
//! embedders can supply their own filesystem and fetcher.

use std::{
    fmt, fs, io,
    path::{Component, Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use derive_more::derive::{Display, Error};
use indexmap::IndexMap;
use log::debug;
use url::Url;

use crate::{
    node::{parse_source, Node},
    pointer::Reference,
};

/// Pluggable filesystem access for file references.
pub trait FileProvider: Send + Sync {
    /// Reads the file at `path` to a string.
    fn read(&self, path: &Path) -> io::Result<String>;
}

/// Default provider backed by [`std::fs`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFs;

impl FileProvider for StdFs {
    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

/// Pluggable HTTP access for remote references.
pub trait RemoteFetcher: Send + Sync {
    /// Fetches `url`, honouring `timeout`, returning the response body.
    fn fetch(&self, url: &Url, timeout: Duration) -> Result<String, String>;
}

/// Fetcher used when no HTTP client is configured; always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFetcher;

impl RemoteFetcher for NoFetcher {
    fn fetch(&self, url: &Url, _timeout: Duration) -> Result<String, String> {
        Err(format!(
            "no remote fetcher configured for `{url}`; enable the `client` \
             feature or supply one"
        ))
    }
}

/// Blocking fetcher backed by `ureq`.
#[cfg(feature = "client")]
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqFetcher;

#[cfg(feature = "client")]
impl RemoteFetcher for UreqFetcher {
    fn fetch(&self, url: &Url, timeout: Duration) -> Result<String, String> {
        ureq::get(url.as_str())
            .timeout(timeout)
            .call()
            .map_err(|err| err.to_string())?
            .into_string()
            .map_err(|err| err.to_string())
    }
}

/// Options governing reference resolution and build behaviour, passed at
/// document construction.
#[derive(Clone)]
pub struct DocumentConfig {
    /// Directory for resolving relative file references.
    pub base_path: Option<PathBuf>,

    /// Base for resolving relative remote references.
    pub base_url: Option<Url>,

    /// Permit references into other files.
    pub allow_file_references: bool,

    /// Permit references to remote documents.
    pub allow_remote_references: bool,

    /// Demote array-kind reference cycles to warnings.
    pub ignore_array_circular: bool,

    /// Demote composition-kind reference cycles to warnings.
    pub ignore_polymorphic_circular: bool,

    /// Allow-list of file names permitted as file references.
    pub file_filter: Option<Vec<String>>,

    /// Per-fetch HTTP timeout.
    pub fetch_timeout: Duration,

    /// Worker cap for the build pipeline; `0` means hardware concurrency.
    pub max_workers: usize,

    /// Filesystem used for file references.
    pub local_fs: Arc<dyn FileProvider>,

    /// HTTP client used for remote references.
    pub remote_fetcher: Arc<dyn RemoteFetcher>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        DocumentConfig {
            base_path: None,
            base_url: None,
            allow_file_references: false,
            allow_remote_references: false,
            ignore_array_circular: false,
            ignore_polymorphic_circular: false,
            file_filter: None,
            fetch_timeout: Duration::from_secs(60),
            max_workers: 0,
            local_fs: Arc::new(StdFs),
            remote_fetcher: default_fetcher(),
        }
    }
}

impl fmt::Debug for DocumentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentConfig")
            .field("base_path", &self.base_path)
            .field("base_url", &self.base_url)
            .field("allow_file_references", &self.allow_file_references)
            .field("allow_remote_references", &self.allow_remote_references)
            .field("ignore_array_circular", &self.ignore_array_circular)
            .field("ignore_polymorphic_circular", &self.ignore_polymorphic_circular)
            .field("file_filter", &self.file_filter)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("max_workers", &self.max_workers)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "client")]
fn default_fetcher() -> Arc<dyn RemoteFetcher> {
    Arc::new(UreqFetcher)
}

#[cfg(not(feature = "client"))]
fn default_fetcher() -> Arc<dyn RemoteFetcher> {
    Arc::new(NoFetcher)
}

/// Where a loaded document came from.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentOrigin {
    /// The document handed to [`create_document`](crate::create_document).
    Root,

    /// Loaded from the filesystem.
    File(PathBuf),

    /// Fetched over HTTP.
    Remote(Url),
}

impl DocumentOrigin {
    fn directory(&self) -> Option<&Path> {
        match self {
            DocumentOrigin::File(path) => path.parent(),
            _ => None,
        }
    }

    fn url(&self) -> Option<&Url> {
        match self {
            DocumentOrigin::Remote(url) => Some(url),
            _ => None,
        }
    }
}

/// One loaded document: its origin, source text, and parsed node tree.
#[derive(Debug)]
pub struct LoadedDocument {
    /// Where the document came from.
    pub origin: DocumentOrigin,

    /// Raw source text.
    pub source: String,

    /// Parsed document node.
    pub root: Arc<Node>,
}

/// Failures while locating a referenced document or node.
#[derive(Debug, Clone, PartialEq, Display, Error)]
pub enum RolodexError {
    /// File or remote lookups are disabled, or the file filter rejected the
    /// reference.
    #[display("lookup of `{reference}` is disallowed: {detail}")]
    LookupDisallowed {
        /// Offending reference string.
        reference: String,
        /// Which restriction applied.
        detail: String,
    },

    /// IO or HTTP failure loading a sub-document.
    #[display("failed to fetch `{reference}`: {detail}")]
    FetchFailed {
        /// Offending reference string.
        reference: String,
        /// Underlying IO/HTTP message.
        detail: String,
    },

    /// A sub-document was not well-formed YAML or JSON.
    #[display("failed to parse `{reference}`: {detail}")]
    ParseFailed {
        /// Offending reference string.
        reference: String,
        /// Scanner message.
        detail: String,
    },

    /// The pointer fragment does not locate a node in the target document.
    #[display("`{reference}` does not locate a node")]
    NotFound {
        /// Offending reference string.
        reference: String,
    },
}

/// Registry of the root document and every resolved sub-document.
#[derive(Debug)]
pub struct Rolodex {
    config: DocumentConfig,
    root: Arc<LoadedDocument>,
    files: Mutex<IndexMap<PathBuf, Arc<LoadedDocument>>>,
    remotes: Mutex<IndexMap<String, Arc<LoadedDocument>>>,
}

impl Rolodex {
    /// Parses the root source and seeds the registry with it.
    pub fn new(source: impl Into<String>, config: DocumentConfig) -> Result<Self, crate::Error> {
        let source = source.into();
        let root = parse_source(&source)?;

        Ok(Rolodex {
            config,
            root: Arc::new(LoadedDocument {
                origin: DocumentOrigin::Root,
                source,
                root,
            }),
            files: Mutex::new(IndexMap::new()),
            remotes: Mutex::new(IndexMap::new()),
        })
    }

    /// Build configuration this rolodex was created with.
    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    /// The root document.
    pub fn root(&self) -> &Arc<LoadedDocument> {
        &self.root
    }

    /// Resolves a reference to its containing document and pointer-local
    /// node, loading and caching the document if it is new.
    pub fn locate(
        &self,
        reference: &Reference,
        from: &Arc<LoadedDocument>,
    ) -> Result<(Arc<LoadedDocument>, Arc<Node>), RolodexError> {
        // A relative source inside a remote document stays remote.
        let document = if reference.is_local() {
            Arc::clone(from)
        } else if reference.is_remote() || from.origin.url().is_some() {
            self.load_remote(reference, from)?
        } else {
            self.load_file(reference, from)?
        };

        let node = crate::pointer::walk(&document.root, &reference.fragment).ok_or_else(|| {
            RolodexError::NotFound {
                reference: display_reference(reference),
            }
        })?;

        Ok((document, node))
    }

    /// Every document loaded so far: the root first, then files, then
    /// remotes, in load order.
    pub fn all_documents(&self) -> Vec<Arc<LoadedDocument>> {
        let mut documents = vec![Arc::clone(&self.root)];
        documents.extend(self.files.lock().expect("files lock").values().cloned());
        documents.extend(self.remotes.lock().expect("remotes lock").values().cloned());
        documents
    }

    fn load_remote(
        &self,
        reference: &Reference,
        from: &LoadedDocument,
    ) -> Result<Arc<LoadedDocument>, RolodexError> {
        let shown = display_reference(reference);

        if !self.config.allow_remote_references {
            return Err(RolodexError::LookupDisallowed {
                reference: shown,
                detail: "remote references are disabled".to_owned(),
            });
        }

        let url = self.resolve_url(reference, from)?;
        let key = url.to_string();

        if let Some(cached) = self.remotes.lock().expect("remotes lock").get(&key) {
            debug!("rolodex cache hit for {key}");
            return Ok(Arc::clone(cached));
        }

        // Fetch outside the lock; a racing load of the same URL is resolved
        // by the second check below.
        let body = self
            .config
            .remote_fetcher
            .fetch(&url, self.config.fetch_timeout)
            .map_err(|detail| RolodexError::FetchFailed {
                reference: shown.clone(),
                detail,
            })?;

        let root = parse_source(&body).map_err(|err| RolodexError::ParseFailed {
            reference: shown,
            detail: err.to_string(),
        })?;

        let document = Arc::new(LoadedDocument {
            origin: DocumentOrigin::Remote(url),
            source: body,
            root,
        });

        let mut remotes = self.remotes.lock().expect("remotes lock");
        let entry = remotes.entry(key).or_insert_with(|| Arc::clone(&document));
        Ok(Arc::clone(entry))
    }

    fn load_file(
        &self,
        reference: &Reference,
        from: &LoadedDocument,
    ) -> Result<Arc<LoadedDocument>, RolodexError> {
        let shown = display_reference(reference);

        if !self.config.allow_file_references {
            return Err(RolodexError::LookupDisallowed {
                reference: shown,
                detail: "file references are disabled".to_owned(),
            });
        }

        let path = self.resolve_path(reference, from);

        if let Some(filter) = &self.config.file_filter {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            if !filter.iter().any(|allowed| allowed == &name) {
                return Err(RolodexError::LookupDisallowed {
                    reference: shown,
                    detail: format!("`{name}` is not in the file filter"),
                });
            }
        }

        if let Some(cached) = self.files.lock().expect("files lock").get(&path) {
            debug!("rolodex cache hit for {}", path.display());
            return Ok(Arc::clone(cached));
        }

        let body = self
            .config
            .local_fs
            .read(&path)
            .map_err(|err| RolodexError::FetchFailed {
                reference: shown.clone(),
                detail: err.to_string(),
            })?;

        let root = parse_source(&body).map_err(|err| RolodexError::ParseFailed {
            reference: shown,
            detail: err.to_string(),
        })?;

        let document = Arc::new(LoadedDocument {
            origin: DocumentOrigin::File(path.clone()),
            source: body,
            root,
        });

        let mut files = self.files.lock().expect("files lock");
        let entry = files.entry(path).or_insert_with(|| Arc::clone(&document));
        Ok(Arc::clone(entry))
    }

    fn resolve_url(
        &self,
        reference: &Reference,
        from: &LoadedDocument,
    ) -> Result<Url, RolodexError> {
        if let Ok(absolute) = Url::parse(&reference.source) {
            return Ok(absolute);
        }

        let base = from
            .origin
            .url()
            .or(self.config.base_url.as_ref())
            .ok_or_else(|| RolodexError::FetchFailed {
                reference: display_reference(reference),
                detail: "relative remote reference with no base URL".to_owned(),
            })?;

        base.join(&reference.source)
            .map_err(|err| RolodexError::FetchFailed {
                reference: display_reference(reference),
                detail: err.to_string(),
            })
    }

    fn resolve_path(&self, reference: &Reference, from: &LoadedDocument) -> PathBuf {
        let raw = Path::new(&reference.source);

        if raw.is_absolute() {
            return lexical_clean(raw);
        }

        let base = from
            .origin
            .directory()
            .map(Path::to_path_buf)
            .or_else(|| self.config.base_path.clone());

        match base {
            Some(base) => lexical_clean(&base.join(raw)),
            None => lexical_clean(raw),
        }
    }
}

fn display_reference(reference: &Reference) -> String {
    format!("{}#{}", reference.source, reference.fragment)
}

/// Normalises `.` and `..` components without touching the filesystem, so
/// cache keys are canonical even under a pluggable provider.
fn lexical_clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    cleaned.push("..");
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Debug, Default)]
    struct MapFs(HashMap<PathBuf, String>);

    impl FileProvider for MapFs {
        fn read(&self, path: &Path) -> io::Result<String> {
            self.0
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "missing"))
        }
    }

    fn file_config(files: &[(&str, &str)]) -> DocumentConfig {
        let map = files
            .iter()
            .map(|(path, body)| (PathBuf::from(path), (*body).to_owned()))
            .collect();

        DocumentConfig {
            allow_file_references: true,
            base_path: Some(PathBuf::from("/specs")),
            local_fs: Arc::new(MapFs(map)),
            ..DocumentConfig::default()
        }
    }

    #[test]
    fn local_references_walk_the_current_document() {
        let rolodex =
            Rolodex::new("components:\n  schemas:\n    Pet: {type: object}\n", DocumentConfig::default())
                .unwrap();

        let reference = Reference::parse("#/components/schemas/Pet").unwrap();
        let (document, node) = rolodex.locate(&reference, rolodex.root()).unwrap();

        assert_eq!(document.origin, DocumentOrigin::Root);
        assert!(crate::node::is_node_map(&node));
    }

    #[test]
    fn file_references_load_relative_to_base_path() {
        let config = file_config(&[("/specs/shared.yaml", "Pet:\n  type: object\n")]);
        let rolodex = Rolodex::new("paths: {}\n", config).unwrap();

        let reference = Reference::parse("shared.yaml#/Pet").unwrap();
        let (document, node) = rolodex.locate(&reference, rolodex.root()).unwrap();

        assert_eq!(
            document.origin,
            DocumentOrigin::File(PathBuf::from("/specs/shared.yaml"))
        );
        assert!(crate::node::is_node_map(&node));

        // Second hit comes from the cache: same Arc.
        let (again, _) = rolodex.locate(&reference, rolodex.root()).unwrap();
        assert!(Arc::ptr_eq(&document, &again));
    }

    #[test]
    fn nested_file_references_resolve_against_the_referring_document() {
        let config = file_config(&[
            ("/specs/a/first.yaml", "inner: {$ref: 'second.yaml#/Pet'}\n"),
            ("/specs/a/second.yaml", "Pet: {type: object}\n"),
        ]);
        let rolodex = Rolodex::new("paths: {}\n", config).unwrap();

        let first = Reference::parse("a/first.yaml#/inner").unwrap();
        let (first_doc, _) = rolodex.locate(&first, rolodex.root()).unwrap();

        let second = Reference::parse("second.yaml#/Pet").unwrap();
        let (second_doc, _) = rolodex.locate(&second, &first_doc).unwrap();

        assert_eq!(
            second_doc.origin,
            DocumentOrigin::File(PathBuf::from("/specs/a/second.yaml"))
        );
    }

    #[test]
    fn disabled_lookups_are_rejected() {
        let rolodex = Rolodex::new("paths: {}\n", DocumentConfig::default()).unwrap();

        let file = Reference::parse("shared.yaml#/Pet").unwrap();
        assert!(matches!(
            rolodex.locate(&file, rolodex.root()),
            Err(RolodexError::LookupDisallowed { .. })
        ));

        let remote = Reference::parse("https://example.com/api.yaml#/Pet").unwrap();
        assert!(matches!(
            rolodex.locate(&remote, rolodex.root()),
            Err(RolodexError::LookupDisallowed { .. })
        ));
    }

    #[test]
    fn file_filter_rejects_unlisted_names() {
        let mut config = file_config(&[("/specs/other.yaml", "Pet: {}\n")]);
        config.file_filter = Some(vec!["allowed.yaml".to_owned()]);

        let rolodex = Rolodex::new("paths: {}\n", config).unwrap();

        let reference = Reference::parse("other.yaml#/Pet").unwrap();
        assert!(matches!(
            rolodex.locate(&reference, rolodex.root()),
            Err(RolodexError::LookupDisallowed { .. })
        ));
    }

    #[test]
    fn missing_pointer_targets_are_not_found() {
        let rolodex = Rolodex::new("a: 1\n", DocumentConfig::default()).unwrap();

        let reference = Reference::parse("#/nowhere").unwrap();
        assert!(matches!(
            rolodex.locate(&reference, rolodex.root()),
            Err(RolodexError::NotFound { reference }) if reference == "#/nowhere"
        ));
    }

    #[test]
    fn lexical_clean_normalises_dot_segments() {
        assert_eq!(
            lexical_clean(Path::new("/specs/a/../b/./c.yaml")),
            PathBuf::from("/specs/b/c.yaml")
        );
    }
}
