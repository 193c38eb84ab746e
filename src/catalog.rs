//! Opcode catalog queries behind `sfzlint list`.

use crate::resolve::{MacroTable, resolve};
use crate::spec::{Registry, SpecEntry};
use crate::syntax::Parser;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKey {
    Version,
    Type,
    Modulates,
}

/// `key=value` restriction on listed entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub key: FilterKey,
    pub value: String,
}

impl FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got {}", s))?;
        let key = match key.trim() {
            "version" => FilterKey::Version,
            "type" => FilterKey::Type,
            "modulates" => FilterKey::Modulates,
            other => {
                return Err(format!(
                    "unknown filter key {}, expected version, type or modulates",
                    other
                ));
            }
        };
        Ok(Filter {
            key,
            value: value.trim().to_string(),
        })
    }
}

impl Filter {
    pub fn accepts(&self, entry: &SpecEntry) -> bool {
        match self.key {
            FilterKey::Version => entry.version.is_some_and(|v| v.as_str() == self.value),
            FilterKey::Type => entry.value_type.name() == self.value,
            FilterKey::Modulates => entry.modulates.as_deref() == Some(self.value.as_str()),
        }
    }
}

/// Entries whose name or aliases contain `search` and that pass every filter,
/// in table order.
pub fn select<'r>(
    registry: &'r Registry,
    search: Option<&str>,
    filters: &[Filter],
) -> Vec<&'r SpecEntry> {
    registry
        .entries()
        .iter()
        .filter(|entry| {
            search.is_none_or(|needle| {
                entry.name.contains(needle) || entry.aliases.iter().any(|a| a.contains(needle))
            })
        })
        .filter(|entry| filters.iter().all(|f| f.accepts(entry)))
        .collect()
}

/// Distinct opcode names used across `files`. Files that fail to resolve are
/// skipped.
pub fn used_opcodes(parser: &Parser, files: &[PathBuf]) -> BTreeSet<String> {
    let mut used = BTreeSet::new();
    for file in files {
        match resolve(parser, file, None, &mut MacroTable::new()) {
            Ok(resolved) => {
                used.extend(resolved.document.assignments().map(|(_, a)| a.name.clone()));
            }
            Err(err) => tracing::warn!(file = %file.display(), error = %err, "skipping"),
        }
    }
    used
}
