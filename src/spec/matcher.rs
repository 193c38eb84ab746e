//! Opcode name matching.
//!
//! A concrete name is looked up by exact text and by digit skeleton; every
//! candidate pattern is tried and the lowest precedence tier wins, with table
//! order breaking ties. At most one entry is ever returned.

use crate::spec::registry::{Pattern, Registry};
use crate::spec::SpecEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Template,
    CcVariant,
    Alias,
}

impl MatchKind {
    fn of(pattern: &Pattern) -> Self {
        match pattern {
            Pattern::Exact(_) => MatchKind::Exact,
            Pattern::IndexedTemplate(_) => MatchKind::Template,
            Pattern::CcVariantTemplate(_) => MatchKind::CcVariant,
            Pattern::AliasOf(_) => MatchKind::Alias,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpcodeMatch<'r> {
    pub entry: &'r SpecEntry,
    pub kind: MatchKind,
    /// Slot values captured from the name, in template order.
    pub slots: Vec<(char, u32)>,
}

/// Resolve `name` (already lowercased) to its entry.
pub fn match_opcode<'r>(registry: &'r Registry, name: &str) -> Option<OpcodeMatch<'r>> {
    let mut best: Option<(u8, OpcodeMatch<'r>)> = None;
    for rule in registry.candidates(name) {
        let tier = rule.pattern.tier();
        if best.as_ref().is_some_and(|(t, _)| *t <= tier) {
            continue;
        }
        let Some(slots) = rule.pattern.matches(name) else {
            continue;
        };
        let Some(entry) = registry.entry(rule.entry) else {
            continue;
        };
        best = Some((
            tier,
            OpcodeMatch {
                entry,
                kind: MatchKind::of(&rule.pattern),
                slots,
            },
        ));
    }
    best.map(|(_, found)| found)
}

impl Registry {
    pub fn lookup(&self, name: &str) -> Option<OpcodeMatch<'_>> {
        match_opcode(self, name)
    }
}
