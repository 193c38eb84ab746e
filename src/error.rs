//! Error types for the parser, the opcode table loader and file loading.
//!
//! These are the fatal failures. Everything recoverable is a
//! [`Diagnostic`](crate::diag::Diagnostic) instead.

use std::path::PathBuf;
use thiserror::Error;

/// Surface-syntax failure. Aborts validation of the file it occurs in.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{line}:{column}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

/// Problems found while loading the opcode table.
#[derive(Error, Debug)]
pub enum SpecError {
    #[error("cannot read opcode table {}: {}", path.display(), source)]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed opcode table: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("opcode template is empty")]
    EmptyTemplate,

    #[error("duplicate opcode template {0}")]
    Duplicate(String),

    #[error("template {template}: slot {slot} touches a literal digit or another slot")]
    AmbiguousSlot { template: String, slot: char },

    #[error("template {template}: index range declared for {slot} which is not a slot")]
    UnknownSlot { template: String, slot: String },

    #[error("template {template}: range {min} to {max} is inverted")]
    InvertedRange {
        template: String,
        min: String,
        max: String,
    },

    #[error("enum opcode {0} declares no options")]
    EnumWithoutOptions(String),

    #[error("template {0} declares cc spellings but has no controller slot")]
    NoControllerSlot(String),

    #[error("template {template}: unknown cc spelling {spelling}")]
    UnknownSpelling { template: String, spelling: String },
}

/// Failure to load the root document of a run.
#[derive(Error, Debug)]
pub enum LintError {
    #[error("cannot read {}: {}", path.display(), source)]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}:{}", path.display(), source)]
    Syntax { path: PathBuf, source: SyntaxError },
}
