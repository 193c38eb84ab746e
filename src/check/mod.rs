//! Semantic checks over a resolved document.
//!
//! Order of the passes:
//! 1. headers: revision filter, single-instance headers, duplicate opcodes
//! 2. per assignment: undefined macros, opcode matching, revision filter, value
//! 3. structure: curve references, inverted key/velocity ranges
//! 4. files: every path-typed value, unless disabled

pub mod files;
pub mod structure;
pub mod value;

use crate::config::LintConfig;
use crate::diag::{Diagnostic, Diagnostics};
use crate::model::{Assignment, Document, HeaderId};
use crate::spec::{Registry, ValueType, version_list};
use files::{FileChecker, FileStatus, with_default_path};
use std::path::{Path, PathBuf};

pub fn validate(doc: &Document, registry: &Registry, config: &LintConfig, diags: &mut Diagnostics) {
    let allowed = config.allowed_versions();

    structure::check_headers(doc, allowed.as_ref(), &config.spec_versions, diags);
    structure::check_duplicates(doc, diags);

    let mut paths: Vec<(HeaderId, &Assignment)> = Vec::new();
    for (id, assignment) in doc.assignments() {
        let undefined = undefined_macros(&assignment.value);
        for _ in 0..undefined {
            diags.push(
                Diagnostic::error(assignment.position.clone(), "undefined macro")
                    .with_opcode(&assignment.name),
            );
        }

        let Some(found) = registry.lookup(&assignment.name) else {
            diags.push(
                Diagnostic::warning(assignment.position.clone(), "unknown opcode")
                    .with_opcode(&assignment.name),
            );
            continue;
        };

        if let (Some(allowed), Some(version)) = (&allowed, found.entry.version) {
            if !allowed.contains(&version) {
                diags.push(
                    Diagnostic::error(
                        assignment.position.clone(),
                        format!(
                            "opcode spec {} is not one of {}",
                            version,
                            version_list(&config.spec_versions)
                        ),
                    )
                    .with_opcode(&assignment.name),
                );
            }
        }

        if undefined > 0 {
            continue;
        }
        if let Some(d) = value::check_value(found.entry, &assignment.value, &assignment.position) {
            diags.push(d.with_opcode(&assignment.name));
        }
        if found.entry.value_type == ValueType::Path {
            paths.push((id, assignment));
        }
    }

    structure::check_curves(doc, diags);
    structure::check_ranges(doc, diags);

    if config.check_files {
        check_paths(doc, &paths, config.rel_path.as_deref(), diags);
    }
}

fn check_paths(
    doc: &Document,
    paths: &[(HeaderId, &Assignment)],
    rel_path: Option<&Path>,
    diags: &mut Diagnostics,
) {
    let mut checker = FileChecker::new();
    for (id, assignment) in paths {
        if assignment.value.starts_with('*') {
            continue;
        }
        let default_path = doc
            .control_of(*id)
            .and_then(|c| c.get("default_path"))
            .map(|a| a.value.as_str());
        let value = with_default_path(default_path, &assignment.value);
        let base = match rel_path {
            Some(dir) => dir.to_path_buf(),
            None => assignment
                .position
                .file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };

        let finding = match checker.check(&base, &value) {
            FileStatus::Found | FileStatus::Virtual => continue,
            FileStatus::Missing => {
                Diagnostic::error(assignment.position.clone(), "file not found")
            }
            FileStatus::CaseMismatch(actual) => Diagnostic::warning(
                assignment.position.clone(),
                format!("case mismatch: found {}", actual),
            ),
        };
        diags.push(finding.with_opcode(&assignment.name));
    }
}

/// `$` sigils still followed by an identifier after expansion.
fn undefined_macros(value: &str) -> usize {
    value
        .match_indices('$')
        .filter(|(at, _)| {
            value[at + 1..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{MacroTable, resolve};
    use crate::spec::Version;
    use crate::syntax::Parser;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn lint(dir: &TempDir, text: &str, config: &LintConfig) -> Vec<String> {
        let root = dir.path().join("x.sfz");
        fs::write(&root, text).unwrap();
        let parser = Parser::new().unwrap();
        let registry = Registry::builtin().unwrap();
        let resolved = resolve(&parser, &root, None, &mut MacroTable::new()).unwrap();
        let mut diags = resolved.diagnostics;
        validate(&resolved.document, &registry, config, &mut diags);
        diags
            .into_report()
            .map(|d| format!("{}:{} {}:{}", d.position.line, d.position.column, d.severity.letter(), d))
            .collect()
    }

    #[test]
    fn clean_document_has_no_findings() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("kick.wav"), b"").unwrap();
        let text = "#define $pitch_keycenter 24\n<control> default_path=\n<global> amplitude_oncc140=50\n<group> loopmode=one_shot\n<region> sample=kick.wav pitch_keycenter=$pitch_keycenter bend_up=1200 hikey=-1\n";
        assert_eq!(lint(&dir, text, &LintConfig::default()), Vec::<String>::new());
    }

    #[test]
    fn unknown_and_out_of_range() {
        let dir = TempDir::new().unwrap();
        let text = "<region> sample=*sine bend_up=96000 amplitude_oncc420=1 tune=x\n";
        assert_eq!(
            lint(&dir, text, &LintConfig::default()),
            vec![
                "1:23 W:96000 not in range -9600 to 9600 (bend_up)",
                "1:37 W:unknown opcode (amplitude_oncc420)",
                "1:57 E:expected integer got x (tune)",
            ]
        );
    }

    #[test]
    fn alias_findings_name_the_alias() {
        let dir = TempDir::new().unwrap();
        let text = "<region> sample=*sine loopmode=forever\n";
        assert_eq!(
            lint(&dir, text, &LintConfig::default()),
            vec!["1:23 W:forever not one of [no_loop, one_shot, loop_continuous, loop_sustain] (loopmode)"]
        );
    }

    #[test]
    fn undefined_macro_in_value_is_reported_per_occurrence() {
        let dir = TempDir::new().unwrap();
        let text = "<region> sample=*sine master_label=$a and $b\n";
        assert_eq!(
            lint(&dir, text, &LintConfig::default()),
            vec![
                "1:23 E:undefined macro (master_label)",
                "1:23 E:undefined macro (master_label)",
            ]
        );
    }

    #[test]
    fn version_filter() {
        let dir = TempDir::new().unwrap();
        let config = LintConfig {
            spec_versions: vec![Version::V1],
            ..LintConfig::default()
        };
        let text = "<group> amplitude=50\n<region> sample=*noise\n";
        assert_eq!(
            lint(&dir, text, &config),
            vec!["1:9 E:opcode spec aria is not one of [v1] (amplitude)"]
        );
    }

    #[test]
    fn missing_and_miscased_samples() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("arco")).unwrap();
        fs::write(dir.path().join("arco").join("Arco_C1_pp_down.wav"), b"").unwrap();
        let text = "<region> sample=arco/arco_c1_pp_down.wav\n<region> sample=arco/gone.wav\n";
        assert_eq!(
            lint(&dir, text, &LintConfig::default()),
            vec![
                "1:10 W:case mismatch: found arco/Arco_C1_pp_down.wav (sample)",
                "2:10 E:file not found (sample)",
            ]
        );

        let skipped = LintConfig {
            check_files: false,
            ..LintConfig::default()
        };
        assert_eq!(lint(&dir, text, &skipped), Vec::<String>::new());
    }

    #[test]
    fn default_path_prefixes_samples() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("samples")).unwrap();
        fs::write(dir.path().join("samples").join("snare.wav"), b"").unwrap();
        let text = "<control> default_path=samples/\n<region> sample=snare.wav\n";
        assert_eq!(lint(&dir, text, &LintConfig::default()), Vec::<String>::new());
    }
}
