//! Structured issue records produced while building a document.

use std::fmt;

use derive_more::derive::Display;

use crate::node::Node;

/// What a detected reference cycle passes through, which decides how the
/// configuration flags treat it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CircularKind {
    /// A back-edge traverses an `items` key.
    #[display("array_items")]
    ArrayItems,

    /// The closest enclosing context is a composition keyword.
    #[display("polymorphic")]
    Polymorphic,

    /// Anything else: a plain object self-reference.
    #[display("object")]
    Object,
}

/// Whether a diagnostic aborts the build or merely annotates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Severity {
    /// Fatal; aggregated and returned to the caller.
    #[display("error")]
    Error,

    /// Non-fatal; recorded on the document and logged.
    #[display("warning")]
    Warning,
}

/// Semantic category of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DiagnosticKind {
    /// Top-level version key (`openapi`/`swagger`) absent.
    #[display("missing root")]
    MissingRoot,

    /// Wrong node kind, e.g. a sequence where a mapping was expected.
    #[display("malformed node")]
    MalformedNode,

    /// A `$ref` pointer does not locate a node.
    #[display("unresolved reference")]
    UnresolvedReference,

    /// File or remote reference attempted with lookups disabled.
    #[display("disallowed reference")]
    DisallowedReference,

    /// A `$ref` chain closes a cycle.
    #[display("circular reference ({_0})")]
    CircularReference(CircularKind),

    /// IO or HTTP failure while loading a sub-document.
    #[display("fetch failure")]
    FetchFailure,

    /// A per-field builder failed; the message carries the inner issue and
    /// the path carries the breadcrumb.
    #[display("build failure")]
    BuildFailure,
}

/// A single issue with its source position and pointer breadcrumb.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Semantic category.
    pub kind: DiagnosticKind,

    /// Human-readable description.
    pub message: String,

    /// JSON Pointer of the construct the issue belongs to.
    pub path: String,

    /// 1-based source line, 0 when unknown.
    pub line: usize,

    /// 1-based source column, 0 when unknown.
    pub column: usize,

    /// Fatal or not.
    pub severity: Severity,

    /// Pointer chain of a detected cycle, in traversal order. Empty for
    /// non-circular diagnostics.
    pub cycle: Vec<String>,
}

impl Diagnostic {
    /// Creates a fatal diagnostic positioned at `node`.
    pub fn error(kind: DiagnosticKind, message: impl Into<String>, node: &Node) -> Self {
        Self::new(kind, message, node.line, node.column, Severity::Error)
    }

    /// Creates a non-fatal diagnostic positioned at `node`.
    pub fn warning(kind: DiagnosticKind, message: impl Into<String>, node: &Node) -> Self {
        Self::new(kind, message, node.line, node.column, Severity::Warning)
    }

    /// Creates a diagnostic with an explicit position.
    pub fn new(
        kind: DiagnosticKind,
        message: impl Into<String>,
        line: usize,
        column: usize,
        severity: Severity,
    ) -> Self {
        Diagnostic {
            kind,
            message: message.into(),
            path: String::new(),
            line,
            column,
            severity,
            cycle: Vec::new(),
        }
    }

    /// Attaches the pointer breadcrumb of the owning construct.
    pub fn at_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Attaches the member chain of a detected cycle.
    pub fn with_cycle(mut self, cycle: Vec<String>) -> Self {
        self.cycle = cycle;
        self
    }

    /// Whether this diagnostic aborts the build.
    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl From<crate::pipeline::Cancelled> for Diagnostic {
    fn from(_: crate::pipeline::Cancelled) -> Self {
        Diagnostic::new(
            DiagnosticKind::BuildFailure,
            "build cancelled after a sibling task failed",
            0,
            0,
            Severity::Error,
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;

        if !self.path.is_empty() {
            write!(f, " at {}", self.path)?;
        }

        if self.line > 0 {
            write!(f, " (line {}, column {})", self.line, self.column)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::diagnostic::CircularKind::Object;

    #[test]
    fn display_carries_kind_path_and_position() {
        let diagnostic = Diagnostic::new(
            DiagnosticKind::UnresolvedReference,
            "`#/nowhere` does not exist",
            4,
            8,
            Severity::Error,
        )
        .at_path("/components/schemas/A");

        assert_eq!(
            diagnostic.to_string(),
            "unresolved reference: `#/nowhere` does not exist \
             at /components/schemas/A (line 4, column 8)"
        );
    }

    #[test]
    fn circular_kind_renders_in_display() {
        let diagnostic = Diagnostic::new(
            DiagnosticKind::CircularReference(Object),
            "cycle",
            0,
            0,
            Severity::Warning,
        );

        assert_eq!(diagnostic.to_string(), "circular reference (object): cycle");
        assert!(!diagnostic.is_fatal());
    }
}
