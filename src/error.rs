//! Error types.

use std::io;

use derive_more::derive::{Display, Error, From};

/// Top-level errors: failures that prevent producing any document at all.
///
/// Everything recoverable is reported as a [`Diagnostic`](crate::Diagnostic)
/// on the build result instead.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// I/O error.
    #[display("I/O error")]
    Io(io::Error),

    /// Source is not well-formed YAML or JSON.
    #[display("scan error")]
    Scan(saphyr::ScanError),

    /// Neither `openapi` nor `swagger` found at the document root.
    #[display("document has no `openapi` or `swagger` version key")]
    #[from(ignore)]
    MissingRoot,
}
