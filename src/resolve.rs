//! Macro expansion and include splicing.
//!
//! Turns one root file plus everything it includes into a single
//! [`Document`]. The macro table is owned by the caller of [`resolve`] and
//! threaded by reference through every nested include, so definitions made in
//! an included file stay visible to whatever follows the include point.

use crate::diag::{Diagnostic, Diagnostics, Position};
use crate::error::LintError;
use crate::model::{Assignment, Document, DocumentBuilder, Macro};
use crate::syntax::{Node, Parser, Span};

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Run-wide `#define` table. Redefinition overwrites.
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    defs: HashMap<String, String>,
}

/// Result of one substitution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub text: String,
    /// Identifier runs that matched no definition, in order of appearance.
    pub undefined: Vec<String>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.defs.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.defs.get(name).map(String::as_str)
    }

    /// Substitute every `$name` once. The identifier run after `$` is looked
    /// up whole; failing that, the longest defined prefix of the run is used
    /// and the remainder is kept as literal text. Replacement text is not
    /// rescanned.
    pub fn expand(&self, text: &str) -> Expansion {
        let mut out = String::with_capacity(text.len());
        let mut undefined = Vec::new();
        let mut rest = text;

        while let Some(at) = rest.find('$') {
            out.push_str(&rest[..at]);
            let after = &rest[at + 1..];
            let run_len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            let run = &after[..run_len];

            match self.longest_defined(run) {
                Some((len, value)) => {
                    out.push_str(value);
                    out.push_str(&run[len..]);
                }
                None => {
                    out.push('$');
                    out.push_str(run);
                    if !run.is_empty() {
                        undefined.push(run.to_string());
                    }
                }
            }
            rest = &after[run_len..];
        }
        out.push_str(rest);

        Expansion {
            text: out,
            undefined,
        }
    }

    fn longest_defined<'a>(&'a self, run: &str) -> Option<(usize, &'a str)> {
        (1..=run.len())
            .rev()
            .filter(|&len| run.is_char_boundary(len))
            .find_map(|len| self.get(&run[..len]).map(|value| (len, value)))
    }
}

/// A resolved document plus the diagnostics raised while resolving it.
#[derive(Debug)]
pub struct Resolved {
    pub document: Document,
    pub diagnostics: Diagnostics,
}

/// Resolve `root` and its include tree.
///
/// `rel_path` replaces the root file's directory as the base for the root
/// file's own includes. Nested includes are always relative to the file that
/// contains them.
///
/// Only failures on the root file itself are fatal; every include problem is
/// reported as a diagnostic and the rest of the tree is still resolved.
pub fn resolve(
    parser: &Parser,
    root: &Path,
    rel_path: Option<&Path>,
    macros: &mut MacroTable,
) -> Result<Resolved, LintError> {
    let nodes = read_nodes(parser, root)?;

    let base = match rel_path {
        Some(dir) => dir.to_path_buf(),
        None => parent_dir(root),
    };

    let mut resolver = Resolver {
        parser,
        builder: DocumentBuilder::new(root),
        diagnostics: Diagnostics::new(),
        chain: vec![canonical(root)],
    };
    resolver.splice(root, &base, nodes, macros);

    let document = resolver.builder.finish();
    tracing::debug!(
        root = %root.display(),
        headers = document.headers().len(),
        diagnostics = resolver.diagnostics.len(),
        "resolved document"
    );

    Ok(Resolved {
        document,
        diagnostics: resolver.diagnostics,
    })
}

struct Resolver<'p> {
    parser: &'p Parser,
    builder: DocumentBuilder,
    diagnostics: Diagnostics,
    /// Canonical paths of the files currently being spliced.
    chain: Vec<PathBuf>,
}

impl Resolver<'_> {
    fn splice(&mut self, file: &Path, base: &Path, nodes: Vec<Node>, macros: &mut MacroTable) {
        for node in nodes {
            match node {
                Node::Header { kind, span } => {
                    self.builder.open(kind, position(file, span));
                }
                Node::Define { name, value, span } => {
                    macros.define(name.clone(), value.clone());
                    self.builder.define(Macro {
                        name,
                        value,
                        position: position(file, span),
                    });
                }
                Node::Opcode { name, value, span } => {
                    self.assign(file, &name, &value, span, macros);
                }
                Node::Include { path, span } => {
                    self.include(file, base, &path, span, macros);
                }
            }
        }
    }

    fn assign(&mut self, file: &Path, raw: &str, value: &str, span: Span, macros: &MacroTable) {
        let at = position(file, span);

        let name = macros.expand(raw);
        for _ in &name.undefined {
            self.diagnostics
                .push(Diagnostic::error(at.clone(), "undefined macro").with_opcode(raw));
        }
        let name = name.text.to_lowercase();
        let value = macros.expand(value).text;

        match self.builder.current() {
            Some(header) => header.opcodes.push(Assignment {
                name,
                value,
                position: at,
            }),
            None => self
                .diagnostics
                .push(Diagnostic::error(at, "opcode outside of header").with_opcode(name)),
        }
    }

    fn include(
        &mut self,
        file: &Path,
        base: &Path,
        raw: &str,
        span: Span,
        macros: &mut MacroTable,
    ) {
        let at = position(file, span);

        let expanded = macros.expand(raw);
        if let Some(name) = expanded.undefined.first() {
            self.diagnostics
                .push(Diagnostic::error(at, format!("undefined macro ${}", name)));
            return;
        }
        let written = expanded.text.replace('\\', "/");
        let target = base.join(&written);

        if !target.is_file() {
            self.diagnostics
                .push(Diagnostic::error(at, format!("include not found: {}", written)));
            return;
        }

        let key = canonical(&target);
        if self.chain.contains(&key) {
            tracing::debug!(path = %target.display(), "include cycle");
            self.diagnostics.push(Diagnostic::error(
                at,
                format!("include cycle detected at {}", written),
            ));
            return;
        }

        let nodes = match read_nodes(self.parser, &target) {
            Ok(nodes) => nodes,
            Err(err) => {
                self.diagnostics.push(Diagnostic::error(at, err.to_string()));
                return;
            }
        };

        tracing::debug!(path = %target.display(), depth = self.chain.len(), "including");
        self.chain.push(key);
        let nested_base = parent_dir(&target);
        self.splice(&target, &nested_base, nodes, macros);
        self.chain.pop();
    }
}

fn read_nodes(parser: &Parser, path: &Path) -> Result<Vec<Node>, LintError> {
    let text = fs::read_to_string(path).map_err(|source| LintError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parser.parse(&text).map_err(|source| LintError::Syntax {
        path: path.to_path_buf(),
        source,
    })
}

fn position(file: &Path, span: Span) -> Position {
    Position::new(file, span.line, span.column)
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::HeaderKind;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, text).unwrap();
        path
    }

    fn run(root: &Path, rel_path: Option<&Path>) -> Resolved {
        let parser = Parser::new().unwrap();
        resolve(&parser, root, rel_path, &mut MacroTable::new()).unwrap()
    }

    fn values(doc: &Document) -> Vec<(String, String)> {
        doc.assignments()
            .map(|(_, a)| (a.name.clone(), a.value.clone()))
            .collect()
    }

    fn messages(diags: &Diagnostics) -> Vec<String> {
        diags.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn expansion_prefers_whole_run_then_longest_prefix() {
        let mut table = MacroTable::new();
        table.define("KICK", "36");
        table.define("KICKTUNE", "40");
        table.define("K", "1");

        assert_eq!(table.expand("set_cc$KICKTUNE").text, "set_cc40");
        assert_eq!(table.expand("$KICKS").text, "36S");
        assert_eq!(table.expand("a $nope b"), Expansion {
            text: "a $nope b".to_string(),
            undefined: vec!["nope".to_string()],
        });
        assert_eq!(table.expand("cost $ 5").text, "cost $ 5");
    }

    #[test]
    fn expansion_is_single_pass() {
        let mut table = MacroTable::new();
        table.define("a", "$b");
        table.define("b", "2");
        assert_eq!(table.expand("x=$a").text, "x=$b");

        let mut plain = MacroTable::new();
        plain.define("pitch", "24");
        plain.define("name", "kick drum");
        let once = plain.expand("$pitch and $name").text;
        assert_eq!(plain.expand(&once).text, once);
    }

    #[test]
    fn defines_apply_to_later_assignments() {
        let dir = TempDir::new().unwrap();
        let root = write(
            dir.path(),
            "main.sfz",
            "#define $pitch_keycenter 24\n#define $KICKTUNE 40\n<control>\n<region> pitch_keycenter=$pitch_keycenter Set_CC$KICKTUNE=1\n",
        );
        let resolved = run(&root, None);
        assert!(resolved.diagnostics.is_empty());
        assert_eq!(
            values(&resolved.document),
            vec![
                ("pitch_keycenter".to_string(), "24".to_string()),
                ("set_cc40".to_string(), "1".to_string()),
            ]
        );
        assert_eq!(resolved.document.macros().len(), 2);
    }

    #[test]
    fn undefined_macro_in_name_is_reported() {
        let dir = TempDir::new().unwrap();
        let root = write(dir.path(), "main.sfz", "<region> set_cc$LATER=1 pan=$alsolater\n#define $LATER 7\n");
        let resolved = run(&root, None);
        assert_eq!(
            messages(&resolved.diagnostics),
            vec!["undefined macro (set_cc$LATER)"]
        );
        // values keep the sigil for the value checks
        assert_eq!(values(&resolved.document)[1].1, "$alsolater");
    }

    #[test]
    fn includes_splice_into_the_open_header() {
        let dir = TempDir::new().unwrap();
        let root = write(
            dir.path(),
            "main.sfz",
            "<group> lovel=1\n#include \"parts/body.sfz\"\n<region> sample=b.wav\n",
        );
        write(dir.path(), "parts/body.sfz", "hivel=64\n#define $key 60\n#include \"deeper.sfz\"\n");
        write(dir.path(), "parts/deeper.sfz", "<region> key=$key\n");

        let resolved = run(&root, None);
        assert!(resolved.diagnostics.is_empty(), "{:?}", resolved.diagnostics);

        let doc = &resolved.document;
        let kinds: Vec<HeaderKind> = doc.headers().iter().map(|h| h.kind).collect();
        assert_eq!(kinds, vec![HeaderKind::Group, HeaderKind::Region, HeaderKind::Region]);
        assert_eq!(doc.headers()[0].opcodes.len(), 2);
        assert_eq!(doc.headers()[1].opcodes[0].value, "60");
        assert_eq!(
            doc.headers()[1].position.file,
            dir.path().join("parts").join("deeper.sfz")
        );
    }

    #[test]
    fn include_cycle_is_reported_once() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a.sfz", "<region> key=1\n#include \"b.sfz\"\n");
        write(dir.path(), "b.sfz", "<region> key=2\n#include \"a.sfz\"\n");

        let resolved = run(&a, None);
        assert_eq!(messages(&resolved.diagnostics), vec!["include cycle detected at a.sfz"]);
        assert_eq!(resolved.document.headers().len(), 2);
        let d = resolved.diagnostics.iter().next().unwrap();
        assert_eq!(d.position, Position::new(dir.path().join("b.sfz"), 2, 1));
    }

    #[test]
    fn missing_include_does_not_stop_resolution() {
        let dir = TempDir::new().unwrap();
        let root = write(dir.path(), "main.sfz", "#include \"gone.sfz\"\n<region> key=1\n");
        let resolved = run(&root, None);
        assert_eq!(messages(&resolved.diagnostics), vec!["include not found: gone.sfz"]);
        assert_eq!(resolved.document.headers().len(), 1);
    }

    #[test]
    fn broken_include_is_reported_at_the_directive() {
        let dir = TempDir::new().unwrap();
        let root = write(dir.path(), "main.sfz", "<region> key=1\n#include \"bad.sfz\"\n");
        write(dir.path(), "bad.sfz", "<nope>\n");
        let resolved = run(&root, None);
        let d = resolved.diagnostics.iter().next().unwrap();
        assert!(d.is_error());
        assert_eq!(d.position.line, 2);
        assert!(d.message.ends_with("1:1: unknown header <nope>"), "{}", d.message);
    }

    #[test]
    fn rel_path_only_applies_to_root_includes() {
        let dir = TempDir::new().unwrap();
        let root = write(dir.path(), "sfz/main.sfz", "<region>\n#include \"shared/inc.sfz\"\n");
        write(dir.path(), "lib/shared/inc.sfz", "key=1\n#include \"next.sfz\"\n");
        write(dir.path(), "lib/shared/next.sfz", "pan=2\n");

        let resolved = run(&root, Some(&dir.path().join("lib")));
        assert!(resolved.diagnostics.is_empty(), "{:?}", resolved.diagnostics);
        assert_eq!(resolved.document.headers()[0].opcodes.len(), 2);
    }

    #[test]
    fn opcode_before_any_header_is_dropped() {
        let dir = TempDir::new().unwrap();
        let root = write(dir.path(), "main.sfz", "volume=1\n<region> key=1\n");
        let resolved = run(&root, None);
        assert_eq!(
            messages(&resolved.diagnostics),
            vec!["opcode outside of header (volume)"]
        );
        assert_eq!(values(&resolved.document).len(), 1);
    }

    #[test]
    fn root_syntax_error_is_fatal() {
        let dir = TempDir::new().unwrap();
        let root = write(dir.path(), "main.sfz", "<region>\n  what\n");
        let parser = Parser::new().unwrap();
        let err = resolve(&parser, &root, None, &mut MacroTable::new()).unwrap_err();
        assert!(matches!(err, LintError::Syntax { .. }));
    }
}
