//! Checks that span several assignments or headers.

use crate::check::value::{parse_integer, parse_key};
use crate::diag::{Diagnostic, Diagnostics};
use crate::model::{Document, HeaderId};
use crate::spec::{Version, version_list};
use crate::syntax::HeaderKind;
use std::collections::{BTreeSet, HashSet};

/// Curve indices below this are built into every player.
pub const FIRST_CUSTOM_CURVE: i64 = 8;

/// Header revisions and headers that may only appear once.
pub fn check_headers(
    doc: &Document,
    allowed: Option<&BTreeSet<Version>>,
    selected: &[Version],
    diags: &mut Diagnostics,
) {
    let mut seen: HashSet<HeaderKind> = HashSet::new();
    for header in doc.headers() {
        if let Some(allowed) = allowed {
            let version = header.kind.version();
            if !allowed.contains(&version) {
                diags.push(Diagnostic::error(
                    header.position.clone(),
                    format!("header spec {} not in {}", version, version_list(selected)),
                ));
            }
        }
        if header.kind.is_single() && !seen.insert(header.kind) {
            diags.push(Diagnostic::warning(
                header.position.clone(),
                format!("only one {} header allowed", header.kind),
            ));
        }
    }
}

/// Same opcode assigned twice inside one header.
pub fn check_duplicates(doc: &Document, diags: &mut Diagnostics) {
    for header in doc.headers() {
        let mut seen: HashSet<&str> = HashSet::new();
        for assignment in &header.opcodes {
            if !seen.insert(assignment.name.as_str()) {
                diags.push(
                    Diagnostic::warning(assignment.position.clone(), "duplicate opcode")
                        .with_opcode(&assignment.name),
                );
            }
        }
    }
}

/// `*_curveccN=<index>` needs a `<curve>` header for custom indices and may
/// not be negative.
pub fn check_curves(doc: &Document, diags: &mut Diagnostics) {
    let defined = doc.curve_indices();
    for (_, assignment) in doc.assignments() {
        if !references_curve(&assignment.name) {
            continue;
        }
        let Some(index) = parse_integer(assignment.value.trim()) else {
            continue;
        };
        if index < 0 {
            diags.push(
                Diagnostic::warning(assignment.position.clone(), "negative curve_index")
                    .with_opcode(&assignment.name),
            );
            continue;
        }
        if index < FIRST_CUSTOM_CURVE {
            continue;
        }
        let declared = u32::try_from(index).is_ok_and(|i| defined.contains(&i));
        if !declared {
            diags.push(
                Diagnostic::warning(
                    assignment.position.clone(),
                    format!("curve {} referenced but not defined", index),
                )
                .with_opcode(&assignment.name),
            );
        }
    }
}

fn references_curve(name: &str) -> bool {
    name.match_indices("curvecc").any(|(at, m)| {
        name[at + m.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
    })
}

/// Inverted key and velocity ranges, using inherited values.
pub fn check_ranges(doc: &Document, diags: &mut Diagnostics) {
    for (id, header) in doc.headers().iter().enumerate() {
        if header.kind != HeaderKind::Region {
            continue;
        }
        if header.parent.is_none() {
            tracing::trace!(
                root = %doc.root().display(),
                line = header.position.line,
                "region without enclosing scope"
            );
        }
        for (lo, hi) in [("lokey", "hikey"), ("lovel", "hivel")] {
            if let Some(message) = inverted(doc, id, lo, hi) {
                diags.push(Diagnostic::warning(header.position.clone(), message));
            }
        }
    }
}

fn inverted(doc: &Document, id: HeaderId, lo: &str, hi: &str) -> Option<String> {
    let low = doc.lookup(id, lo)?;
    let high = doc.lookup(id, hi)?;
    let (l, h) = (parse_key(&low.value)?, parse_key(&high.value)?);
    // a negative upper bound disables the range
    (h >= 0 && l > h).then(|| format!("{} {} greater than {} {}", lo, low.value, hi, high.value))
}
