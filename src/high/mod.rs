//! High-level typed façade over the low-level model.
//!
//! Views here copy scalars out and hold `Arc` back-references into the
//! [`low`](crate::low) tree; nothing is rebuilt. Hashing is shared with the
//! low level via [`StableHash`](crate::hash::StableHash).

use std::{collections::BTreeMap, sync::Arc};

use http::Method;
use log::debug;

use crate::{
    index::ComponentClass,
    low::{Document, Operation, PathItem, SchemaProxy, Server},
};

/// A navigable view over a built document.
#[derive(Debug, Clone)]
pub struct OpenApi {
    document: Arc<Document>,
}

impl OpenApi {
    /// Wraps a built low-level document.
    pub fn new(document: Arc<Document>) -> Self {
        OpenApi { document }
    }

    /// The underlying low-level document.
    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    /// The raw `openapi`/`swagger` version string.
    pub fn version(&self) -> &str {
        &self.document.version.value
    }

    /// Parses the version field as a semantic version.
    ///
    /// Swagger 2.0 documents carry the two-segment `2.0`, which is padded
    /// before parsing.
    pub fn validate_version(&self) -> Result<semver::Version, semver::Error> {
        let raw = self.version();

        if raw.chars().filter(|ch| *ch == '.').count() < 2 {
            semver::Version::parse(&format!("{raw}.0"))
        } else {
            semver::Version::parse(raw)
        }
    }

    /// The API title, when `info` was present.
    pub fn title(&self) -> Option<&str> {
        let info = self.document.info.as_ref()?;
        Some(info.value.title.as_ref()?.value.as_str())
    }

    /// The API's own version string from `info`.
    pub fn api_version(&self) -> Option<&str> {
        let info = self.document.info.as_ref()?;
        Some(info.value.version.as_ref()?.value.as_str())
    }

    /// Returns a reference to the primary (first) server definition.
    pub fn primary_server(&self) -> Option<&Server> {
        self.document.servers.first().map(|server| &server.value)
    }

    /// Looks up a path item by its exact path template.
    pub fn path_item(&self, path: &str) -> Option<&PathItem> {
        self.document.paths.iter().find_map(|(key, item)| {
            if key.value == path {
                Some(&item.value)
            } else {
                None
            }
        })
    }

    /// Returns a reference to the operation with given `method` and `path`,
    /// or `None` if not found.
    pub fn operation(&self, method: &Method, path: &str) -> Option<&Operation> {
        let item = self.path_item(path)?;

        let operation = match *method {
            Method::GET => item.get.as_ref(),
            Method::PUT => item.put.as_ref(),
            Method::POST => item.post.as_ref(),
            Method::PATCH => item.patch.as_ref(),
            Method::DELETE => item.delete.as_ref(),
            Method::HEAD => item.head.as_ref(),
            Method::OPTIONS => item.options.as_ref(),
            Method::TRACE => item.trace.as_ref(),
            _ => match method.as_str() {
                "QUERY" => item.query.as_ref(),
                _ => None,
            },
        };

        operation.map(|operation| &operation.value)
    }

    /// Returns a reference to the operation with given `operation_id`, or
    /// `None` if not found.
    pub fn operation_by_id(&self, operation_id: &str) -> Option<&Operation> {
        self.operations()
            .find(|(_, _, op)| {
                op.operation_id
                    .as_ref()
                    .is_some_and(|id| id.value == operation_id)
            })
            .map(|(_, _, op)| op)
    }

    /// Returns an iterator over all the operations defined on paths, as
    /// `(path, method, operation)` triples in source order.
    pub fn operations(&self) -> impl Iterator<Item = (String, Method, &Operation)> {
        let paths = &self.document.paths;

        debug!("num paths: {}", paths.len());

        let ops = paths
            .iter()
            .flat_map(|(path, item)| {
                item.value.operations().filter_map(move |(verb, op)| {
                    Method::from_bytes(verb.to_ascii_uppercase().as_bytes())
                        .ok()
                        .map(|method| (path.value.clone(), method, &op.value))
                })
            })
            .collect::<Vec<_>>();

        debug!("num ops: {}", ops.len());

        ops.into_iter()
    }

    /// Looks up a reusable schema by component name.
    pub fn schema(&self, name: &str) -> Option<&SchemaProxy> {
        let components = self.document.components.as_ref()?;
        components
            .value
            .schemas
            .iter()
            .find_map(|(key, proxy)| {
                if key.value == name {
                    Some(&proxy.value)
                } else {
                    None
                }
            })
    }

    /// Names of every reusable schema catalogued by the index, in source
    /// order.
    pub fn schema_names(&self) -> Vec<String> {
        self.document
            .index()
            .components(ComponentClass::Schema)
            .iter()
            .map(|entry| entry.name.clone())
            .collect()
    }

    /// Root-level specification extensions as JSON values, with the `x-`
    /// prefix stripped.
    pub fn extensions(&self) -> BTreeMap<String, serde_json::Value> {
        self.document
            .extensions
            .iter()
            .filter_map(|(key, node)| {
                key.value
                    .strip_prefix("x-")
                    .map(|name| (name.to_owned(), node.value.to_json()))
            })
            .collect()
    }
}
