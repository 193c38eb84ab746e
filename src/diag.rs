//! Diagnostics and the ordered report handed to the renderer.
//!
//! Every check pushes into a [`Diagnostics`] collector in discovery order.
//! Once a run is complete the collector is turned into a [`Report`], which
//! yields the findings sorted by `(file, line, column)`. Ties keep the order
//! in which they were discovered.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    /// Single-letter tag used by the line formats.
    pub fn letter(self) -> char {
        match self {
            Severity::Error => 'E',
            Severity::Warning => 'W',
        }
    }
}

/// Source position of a node. Line and column are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(file: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Position used for whole-file findings.
    pub fn start_of(file: &Path) -> Self {
        Self::new(file, 1, 1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub position: Position,
    pub message: String,
    /// Opcode name as written; absent for header- and file-level findings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opcode: Option<String>,
}

impl Diagnostic {
    pub fn error(position: Position, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            position,
            message: message.into(),
            opcode: None,
        }
    }

    pub fn warning(position: Position, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            position,
            message: message.into(),
            opcode: None,
        }
    }

    pub fn with_opcode(mut self, name: impl Into<String>) -> Self {
        self.opcode = Some(name.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.opcode {
            Some(name) => write!(f, "{} ({})", self.message, name),
            None => f.write_str(&self.message),
        }
    }
}

/// Append-only collector; order of `push` calls is the discovery order.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    /// Freeze the collection into its reporting order.
    pub fn into_report(self) -> Report {
        let mut items = self.items;
        // stable: equal positions keep discovery order
        items.sort_by(|a, b| a.position.cmp(&b.position));
        Report {
            inner: items.into_iter(),
        }
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            items: vec![diagnostic],
        }
    }
}

/// Finite, single-pass sequence of diagnostics for one validation run.
#[derive(Debug)]
pub struct Report {
    inner: std::vec::IntoIter<Diagnostic>,
}

impl Report {
    /// Diagnostics not yet consumed.
    pub fn remaining(&self) -> &[Diagnostic] {
        self.inner.as_slice()
    }

    pub fn has_errors(&self) -> bool {
        self.remaining().iter().any(Diagnostic::is_error)
    }
}

impl Iterator for Report {
    type Item = Diagnostic;

    fn next(&mut self) -> Option<Diagnostic> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Report {}
