//! Lint driver: one file at a time, or a whole tree in parallel.

use crate::Result;
use crate::check;
use crate::config::LintConfig;
use crate::diag::{Diagnostic, Diagnostics, Position, Report};
use crate::error::LintError;
use crate::resolve::{MacroTable, resolve};
use crate::spec::Registry;
use crate::syntax::Parser;

use anyhow::Context;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use walkdir::WalkDir;

/// Findings for one root file.
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub report: Report,
}

/// Parser, opcode table and settings shared read-only by every run.
#[derive(Debug)]
pub struct Linter {
    parser: Parser,
    registry: Registry,
    config: LintConfig,
}

impl Linter {
    pub fn new(registry: Registry, config: LintConfig) -> Result<Self> {
        let parser = Parser::new().context("compile sfz grammar")?;
        Ok(Self {
            parser,
            registry,
            config,
        })
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &LintConfig {
        &self.config
    }

    /// Resolve and validate one file. A fatal error on the root file becomes
    /// the only diagnostic of the report.
    pub fn lint_file(&self, path: &Path) -> Report {
        let _span = tracing::info_span!("lint", file = %path.display()).entered();

        let mut macros = MacroTable::new();
        let mut diags = Diagnostics::new();
        match resolve(&self.parser, path, self.config.rel_path.as_deref(), &mut macros) {
            Ok(resolved) => {
                diags.extend(resolved.diagnostics);
                check::validate(&resolved.document, &self.registry, &self.config, &mut diags);
            }
            Err(err) => diags.push(fatal(path, err)),
        }

        tracing::info!(findings = diags.len(), errors = diags.has_errors(), "linted");
        diags.into_report()
    }

    /// Lint files in parallel, keeping input order in the output.
    ///
    /// Once `cancel` is set no new file is started; files already in flight
    /// finish. With `fail_fast` the first file with an error sets it.
    pub fn lint_files(&self, files: &[PathBuf], cancel: &AtomicBool) -> Vec<FileReport> {
        files
            .par_iter()
            .filter_map(|path| {
                if cancel.load(Ordering::Relaxed) {
                    tracing::debug!(file = %path.display(), "skipped after cancel");
                    return None;
                }
                let report = self.lint_file(path);
                if self.config.fail_fast && report.has_errors() {
                    cancel.store(true, Ordering::Relaxed);
                }
                Some(FileReport {
                    path: path.clone(),
                    report,
                })
            })
            .collect()
    }
}

fn fatal(path: &Path, err: LintError) -> Diagnostic {
    match err {
        LintError::Syntax { path, source } => Diagnostic::error(
            Position::new(path, source.line, source.column),
            source.message,
        ),
        LintError::Io { source, .. } => Diagnostic::error(
            Position::start_of(path),
            format!("cannot read file: {}", source),
        ),
    }
}

/// `path` itself if it is a file, else every `*.sfz` below it, sorted.
/// Symlinked directories are not descended into.
pub fn find_sfz_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut found = Vec::new();
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry.with_context(|| format!("walk directory {}", path.display()))?;
        let file_type = entry.file_type();
        let is_file = file_type.is_file() || (file_type.is_symlink() && entry.path().is_file());
        if is_file && is_sfz(entry.path()) {
            found.push(entry.into_path());
        }
    }
    found.sort();
    Ok(found)
}

fn is_sfz(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("sfz"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn linter(config: LintConfig) -> Linter {
        Linter::new(Registry::builtin().unwrap(), config).unwrap()
    }

    #[test]
    fn syntax_error_is_a_single_diagnostic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.sfz");
        fs::write(&path, "<region> key=1\n<bogus>\n").unwrap();

        let report: Vec<Diagnostic> = linter(LintConfig::default()).lint_file(&path).collect();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].position, Position::new(&path, 2, 1));
        assert_eq!(report[0].message, "unknown header <bogus>");
    }

    #[test]
    fn unreadable_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.sfz");
        let report: Vec<Diagnostic> = linter(LintConfig::default()).lint_file(&path).collect();
        assert_eq!(report.len(), 1);
        assert!(report[0].message.starts_with("cannot read file"));
    }

    #[test]
    fn finds_sfz_files_recursively() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/b/deep.SFZ"), "").unwrap();
        fs::write(dir.path().join("top.sfz"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let found = find_sfz_files(dir.path()).unwrap();
        assert_eq!(
            found,
            vec![dir.path().join("a/b/deep.SFZ"), dir.path().join("top.sfz")]
        );
        assert_eq!(
            find_sfz_files(&dir.path().join("top.sfz")).unwrap(),
            vec![dir.path().join("top.sfz")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directory_loop_is_not_followed() {
        let dir = TempDir::new().unwrap();
        let inst = dir.path().join("inst");
        fs::create_dir(&inst).unwrap();
        fs::write(inst.join("a.sfz"), "<region> key=1\n").unwrap();
        std::os::unix::fs::symlink(dir.path(), inst.join("loop")).unwrap();

        let found = find_sfz_files(dir.path()).unwrap();
        assert_eq!(found, vec![inst.join("a.sfz")]);
    }

    #[test]
    fn cancelled_run_starts_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.sfz");
        fs::write(&path, "<region> key=1\n").unwrap();
        let cancel = AtomicBool::new(true);
        let reports = linter(LintConfig::default()).lint_files(&[path], &cancel);
        assert!(reports.is_empty());
    }

    #[test]
    fn reports_keep_input_order() {
        let dir = TempDir::new().unwrap();
        let files: Vec<PathBuf> = (0..8)
            .map(|i| {
                let path = dir.path().join(format!("{i}.sfz"));
                fs::write(&path, "<region> key=1 nope=2\n").unwrap();
                path
            })
            .collect();
        let reports = linter(LintConfig::default()).lint_files(&files, &AtomicBool::new(false));
        let paths: Vec<PathBuf> = reports.iter().map(|r| r.path.clone()).collect();
        assert_eq!(paths, files);
        assert!(reports.iter().all(|r| r.report.len() == 1));
    }
}
