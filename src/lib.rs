//! Linter for sfz sample-instrument files.
//!
//! Pipeline per root file: [`syntax`] scans text into nodes, [`resolve`]
//! expands macros and splices includes into a [`model::Document`], [`check`]
//! validates it against the opcode table in [`spec`], and the findings come
//! back as an ordered [`diag::Report`].

pub mod catalog;
pub mod check;
pub mod config;
pub mod diag;
pub mod error;
pub mod lint;
pub mod model;
pub mod render;
pub mod resolve;
pub mod spec;
pub mod syntax;

pub type Result<T> = anyhow::Result<T>;

pub use config::LintConfig;
pub use diag::{Diagnostic, Position, Report, Severity};
pub use lint::{FileReport, Linter, find_sfz_files};
pub use spec::Registry;
