//! Output formats for diagnostics and opcode listings.

pub mod entry;

use crate::diag::{Diagnostic, Severity};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// `path:line:col:S message (opcode)`
    #[default]
    Default,
    /// Same, with the file name instead of the full path.
    Nopath,
    /// One JSON object per line.
    Json,
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    path: String,
    line: usize,
    column: usize,
    severity: Severity,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    opcode: Option<&'a str>,
}

pub fn render_diagnostic(d: &Diagnostic, format: Format) -> serde_json::Result<String> {
    let file = &d.position.file;
    let line = match format {
        Format::Default => format!(
            "{}:{}:{}:{} {}",
            file.display(),
            d.position.line,
            d.position.column,
            d.severity.letter(),
            d
        ),
        Format::Nopath => {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());
            format!(
                "{}:{}:{}:{} {}",
                name,
                d.position.line,
                d.position.column,
                d.severity.letter(),
                d
            )
        }
        Format::Json => serde_json::to_string(&JsonDiagnostic {
            path: file.display().to_string(),
            line: d.position.line,
            column: d.position.column,
            severity: d.severity,
            message: &d.message,
            opcode: d.opcode.as_deref(),
        })?,
    };
    Ok(line)
}
