//! Opcode table (YAML) and the indexed registry built from it.
//!
//! YAML shape:
//! ```yaml
//! controller_range: [0, 255]     # default range for a slot right after "cc"
//! opcodes:
//!   - name: pitchlfo_depthccN    # uppercase letters are integer slots
//!     type: float                # integer | float | enum | string | note | path
//!     min: -1200
//!     max: 1200
//!     index: { N: [0, 255] }     # optional per-slot ranges
//!     cc_spellings: [cc, _oncc]  # optional, legal controller infixes
//!     aliases: [pitchlfo_depth_onccN]
//!     modulates: pitchlfo_depth
//!     version: v1
//! ```
//!
//! Rows are validated (unique names, well-formed templates, consistent bounds)
//! and compiled into [`Pattern`]s indexed by exact name or by digit skeleton.

use crate::error::SpecError;
use crate::spec::template::{self, CC_SPELLINGS, SlotRanges, Template};
use crate::spec::{Bounds, SpecEntry, ValueType, Version, format_number};

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

const BUILTIN_TABLE: &str = include_str!("../../data/opcodes.yml");

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTable {
    #[serde(default = "default_controller_range")]
    pub controller_range: [u32; 2],

    #[serde(default)]
    pub opcodes: Vec<RawEntry>,
}

fn default_controller_range() -> [u32; 2] {
    [0, 255]
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawType {
    Integer,
    Float,
    Enum,
    #[default]
    String,
    Note,
    Path,
}

/// Row shape as it appears in the table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawEntry {
    pub name: String,

    #[serde(rename = "type", default)]
    pub value_type: RawType,

    #[serde(default)]
    pub min: Option<f64>,

    #[serde(default)]
    pub max: Option<f64>,

    #[serde(default)]
    pub options: Vec<String>,

    #[serde(default)]
    pub index: BTreeMap<String, [u32; 2]>,

    #[serde(default)]
    pub cc_spellings: Vec<String>,

    #[serde(default)]
    pub aliases: Vec<String>,

    #[serde(default)]
    pub modulates: Option<String>,

    #[serde(default)]
    pub version: Option<Version>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(usize);

/// How a concrete name can reach an entry.
#[derive(Debug, Clone)]
pub enum Pattern {
    Exact(String),
    IndexedTemplate(Template),
    /// The entry's template with a non-canonical controller infix.
    CcVariantTemplate(Template),
    AliasOf(Box<Pattern>),
}

impl Pattern {
    /// Precedence tier; lower wins.
    pub fn tier(&self) -> u8 {
        match self {
            Pattern::Exact(_) => 0,
            Pattern::IndexedTemplate(_) => 1,
            Pattern::CcVariantTemplate(_) => 2,
            Pattern::AliasOf(inner) => 3 + inner.tier(),
        }
    }

    pub fn matches(&self, name: &str) -> Option<Vec<(char, u32)>> {
        match self {
            Pattern::Exact(text) => (text == name).then(Vec::new),
            Pattern::IndexedTemplate(t) | Pattern::CcVariantTemplate(t) => t.matches(name),
            Pattern::AliasOf(inner) => inner.matches(name),
        }
    }

    fn index_key(&self) -> IndexKey {
        match self {
            Pattern::Exact(text) => IndexKey::Exact(text.clone()),
            Pattern::IndexedTemplate(t) | Pattern::CcVariantTemplate(t) => {
                IndexKey::Skeleton(t.skeleton())
            }
            Pattern::AliasOf(inner) => inner.index_key(),
        }
    }
}

enum IndexKey {
    Exact(String),
    Skeleton(String),
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub entry: EntryId,
    pub pattern: Pattern,
}

/// Read-only opcode registry. Built once, shared by every run.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<SpecEntry>,
    rules: Vec<Rule>,
    exact: HashMap<String, Vec<usize>>,
    skeletons: HashMap<String, Vec<usize>>,
}

impl Registry {
    /// The table shipped with the crate.
    pub fn builtin() -> Result<Self, SpecError> {
        Self::from_yaml(BUILTIN_TABLE)
    }

    pub fn load(path: &Path) -> Result<Self, SpecError> {
        let text = fs::read_to_string(path).map_err(|source| SpecError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, SpecError> {
        let raw: RawTable = serde_yaml::from_str(text)?;
        let registry = raw.validate_and_build()?;
        tracing::debug!(
            entries = registry.entries.len(),
            patterns = registry.rules.len(),
            "loaded opcode table"
        );
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SpecEntry] {
        &self.entries
    }

    pub fn entry(&self, id: EntryId) -> Option<&SpecEntry> {
        self.entries.get(id.0)
    }

    /// Entry by canonical template text.
    pub fn get(&self, name: &str) -> Option<&SpecEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Rules that could match `name`, in table order.
    pub(crate) fn candidates<'r>(&'r self, name: &str) -> impl Iterator<Item = &'r Rule> + 'r {
        let exact = self.exact.get(name).into_iter().flatten();
        let shaped = self
            .skeletons
            .get(&template::skeleton(name))
            .into_iter()
            .flatten();
        exact.chain(shaped).filter_map(|&i| self.rules.get(i))
    }

    fn insert(&mut self, entry: EntryId, pattern: Pattern) {
        let index = self.rules.len();
        match pattern.index_key() {
            IndexKey::Exact(text) => self.exact.entry(text).or_default().push(index),
            IndexKey::Skeleton(key) => self.skeletons.entry(key).or_default().push(index),
        }
        self.rules.push(Rule { entry, pattern });
    }

    fn insert_family(
        &mut self,
        entry: EntryId,
        template: &Template,
        spellings: &[String],
        alias: bool,
    ) -> Result<(), SpecError> {
        let wrap = |pattern: Pattern| {
            if alias {
                Pattern::AliasOf(Box::new(pattern))
            } else {
                pattern
            }
        };

        let base = if template.is_literal() {
            Pattern::Exact(template.text().to_string())
        } else {
            Pattern::IndexedTemplate(template.clone())
        };
        self.insert(entry, wrap(base));

        if spellings.is_empty() {
            return Ok(());
        }
        let slot = match template.controller_slot() {
            Some(slot) => slot,
            // an alias may legitimately spell the family without a controller
            None if alias => return Ok(()),
            None => return Err(SpecError::NoControllerSlot(template.text().to_string())),
        };
        for spelling in spellings {
            if spelling != slot.spelling {
                let variant = template.respelled(slot, spelling);
                self.insert(entry, wrap(Pattern::CcVariantTemplate(variant)));
            }
        }
        Ok(())
    }
}

impl RawTable {
    /// Validate every row and compile the registry.
    pub fn validate_and_build(self) -> Result<Registry, SpecError> {
        let [cc_min, cc_max] = self.controller_range;
        if cc_min > cc_max {
            return Err(SpecError::InvertedRange {
                template: "controller_range".to_string(),
                min: cc_min.to_string(),
                max: cc_max.to_string(),
            });
        }

        let mut registry = Registry::default();
        let mut seen: HashSet<String> = HashSet::new();

        for raw in self.opcodes {
            if !seen.insert(raw.name.clone()) {
                return Err(SpecError::Duplicate(raw.name));
            }

            let mut declared = BTreeMap::new();
            for (slot, [min, max]) in &raw.index {
                let mut letters = slot.chars();
                let letter = match (letters.next(), letters.next()) {
                    (Some(c), None) if c.is_ascii_uppercase() => c,
                    _ => {
                        return Err(SpecError::UnknownSlot {
                            template: raw.name.clone(),
                            slot: slot.clone(),
                        });
                    }
                };
                if min > max {
                    return Err(SpecError::InvertedRange {
                        template: raw.name.clone(),
                        min: min.to_string(),
                        max: max.to_string(),
                    });
                }
                declared.insert(letter, (*min, *max));
            }
            let ranges = SlotRanges {
                declared,
                controller: (cc_min, cc_max),
            };

            let template = Template::parse(&raw.name, &ranges)?;

            if let (Some(min), Some(max)) = (raw.min, raw.max) {
                if min > max {
                    return Err(SpecError::InvertedRange {
                        template: raw.name.clone(),
                        min: format_number(min),
                        max: format_number(max),
                    });
                }
            }

            let value_type = match raw.value_type {
                RawType::Integer => ValueType::Integer,
                RawType::Float => ValueType::Float,
                RawType::Enum if raw.options.is_empty() => {
                    return Err(SpecError::EnumWithoutOptions(raw.name));
                }
                RawType::Enum => ValueType::Enum(raw.options.clone()),
                RawType::String => ValueType::String,
                RawType::Note => ValueType::Note,
                RawType::Path => ValueType::Path,
            };

            for spelling in &raw.cc_spellings {
                if !CC_SPELLINGS.contains(&spelling.as_str()) {
                    return Err(SpecError::UnknownSpelling {
                        template: raw.name.clone(),
                        spelling: spelling.clone(),
                    });
                }
            }

            let id = EntryId(registry.entries.len());
            registry.insert_family(id, &template, &raw.cc_spellings, false)?;
            for alias in &raw.aliases {
                let alias_ranges = SlotRanges {
                    declared: ranges
                        .declared
                        .iter()
                        .filter(|(letter, _)| alias.contains(**letter))
                        .map(|(letter, range)| (*letter, *range))
                        .collect(),
                    controller: ranges.controller,
                };
                let alias_template = Template::parse(alias, &alias_ranges)?;
                registry.insert_family(id, &alias_template, &raw.cc_spellings, true)?;
            }

            registry.entries.push(SpecEntry {
                name: raw.name,
                value_type,
                bounds: Bounds {
                    min: raw.min,
                    max: raw.max,
                },
                aliases: raw.aliases,
                cc_spellings: raw.cc_spellings,
                modulates: raw.modulates,
                version: raw.version,
            });
        }

        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_table_loads() {
        let registry = Registry::builtin().unwrap();
        assert!(registry.len() > 100);
        let bend_up = registry.get("bend_up").unwrap();
        assert_eq!(bend_up.value_type, ValueType::Integer);
        assert_eq!(bend_up.bounds, Bounds { min: Some(-9600.0), max: Some(9600.0) });
        assert_eq!(registry.get("sample").unwrap().value_type, ValueType::Path);
    }

    #[test]
    fn rows_default_to_string() {
        let registry = Registry::from_yaml("opcodes:\n  - name: md5\n").unwrap();
        let md5 = registry.get("md5").unwrap();
        assert_eq!(md5.value_type, ValueType::String);
        assert_eq!(md5.version, None);
    }

    #[test]
    fn duplicate_rows_are_rejected() {
        let err = Registry::from_yaml("opcodes:\n  - name: pan\n  - name: pan\n").unwrap_err();
        assert!(matches!(err, SpecError::Duplicate(name) if name == "pan"));
    }

    #[test]
    fn enum_needs_options() {
        let err = Registry::from_yaml("opcodes:\n  - { name: trigger, type: enum }\n").unwrap_err();
        assert!(matches!(err, SpecError::EnumWithoutOptions(_)));
    }

    #[test]
    fn spellings_need_a_controller_slot() {
        let err = Registry::from_yaml(
            "opcodes:\n  - { name: lfoN_freq, type: float, cc_spellings: [_oncc] }\n",
        )
        .unwrap_err();
        assert!(matches!(err, SpecError::NoControllerSlot(_)));

        let err = Registry::from_yaml(
            "opcodes:\n  - { name: pitch_onccN, type: float, cc_spellings: [_on] }\n",
        )
        .unwrap_err();
        assert!(matches!(err, SpecError::UnknownSpelling { .. }));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let err = Registry::from_yaml(
            "opcodes:\n  - { name: lfoN_freq, type: float, index: { N: [4, 1] } }\n",
        )
        .unwrap_err();
        assert!(matches!(err, SpecError::InvertedRange { .. }));

        let err =
            Registry::from_yaml("opcodes:\n  - { name: pan, type: float, min: 5, max: 1 }\n")
                .unwrap_err();
        assert_eq!(err.to_string(), "template pan: range 5 to 1 is inverted");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(matches!(
            Registry::from_yaml("opcodes:\n  - { name: pan, typo: 1 }\n"),
            Err(SpecError::Yaml(_))
        ));
    }
}
