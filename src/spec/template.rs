//! Opcode name templates.
//!
//! Uppercase letters in a template are integer slots: `eqN_bwccX` matches
//! `eq2_bwcc64`. A run of the same letter (`varNN_mod`) is one slot. Each
//! slot consumes exactly one maximal digit run of the concrete name, and the
//! parsed value must lie inside the slot's range.

use crate::error::SpecError;
use std::collections::BTreeMap;

/// Controller infixes, longest first.
pub const CC_SPELLINGS: [&str; 3] = ["_oncc", "_cc", "cc"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot { letter: char, min: u32, max: u32 },
}

/// Ranges applied to slots while compiling a template.
#[derive(Debug, Clone, Default)]
pub struct SlotRanges {
    /// Ranges declared by the table row, keyed by slot letter.
    pub declared: BTreeMap<char, (u32, u32)>,
    /// Default for a slot that directly follows `cc`.
    pub controller: (u32, u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    text: String,
    segments: Vec<Segment>,
}

/// Where the controller infix sits inside a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSlot {
    segment: usize,
    pub spelling: &'static str,
}

impl Template {
    pub fn parse(text: &str, ranges: &SlotRanges) -> Result<Self, SpecError> {
        if text.is_empty() {
            return Err(SpecError::EmptyTemplate);
        }

        let mut segments: Vec<Segment> = Vec::new();
        let mut literal = String::new();
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if !c.is_ascii_uppercase() {
                literal.push(c);
                continue;
            }
            while chars.peek() == Some(&c) {
                chars.next();
            }

            let follows_cc = literal.ends_with("cc");
            let starts_ambiguous = literal.ends_with(|p: char| p.is_ascii_digit())
                || (literal.is_empty() && matches!(segments.last(), Some(Segment::Slot { .. })));
            if starts_ambiguous {
                return Err(SpecError::AmbiguousSlot {
                    template: text.to_string(),
                    slot: c,
                });
            }
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }

            let (min, max) = match ranges.declared.get(&c) {
                Some(range) => *range,
                None if follows_cc => ranges.controller,
                None => (0, u32::MAX),
            };
            segments.push(Segment::Slot { letter: c, min, max });
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        // A slot may not run straight into a literal digit.
        for pair in segments.windows(2) {
            if let [Segment::Slot { letter, .. }, Segment::Literal(next)] = pair {
                if next.starts_with(|c: char| c.is_ascii_digit()) {
                    return Err(SpecError::AmbiguousSlot {
                        template: text.to_string(),
                        slot: *letter,
                    });
                }
            }
        }

        for letter in ranges.declared.keys() {
            let known = segments
                .iter()
                .any(|s| matches!(s, Segment::Slot { letter: l, .. } if l == letter));
            if !known {
                return Err(SpecError::UnknownSlot {
                    template: text.to_string(),
                    slot: letter.to_string(),
                });
            }
        }

        Ok(Self {
            text: text.to_string(),
            segments,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// True when the template has no slots.
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Index key shared by the template and every name it can match.
    pub fn skeleton(&self) -> String {
        let mut rendered = String::with_capacity(self.text.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Slot { .. } => rendered.push('0'),
            }
        }
        skeleton(&rendered)
    }

    /// Match a concrete name, returning the slot values in template order.
    pub fn matches(&self, name: &str) -> Option<Vec<(char, u32)>> {
        let mut rest = name;
        let mut captured = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => {
                    rest = rest.strip_prefix(text.as_str())?;
                }
                Segment::Slot { letter, min, max } => {
                    let run = rest
                        .find(|c: char| !c.is_ascii_digit())
                        .unwrap_or(rest.len());
                    if run == 0 {
                        return None;
                    }
                    let value: u32 = rest[..run].parse().ok()?;
                    if value < *min || value > *max {
                        return None;
                    }
                    captured.push((*letter, value));
                    rest = &rest[run..];
                }
            }
        }
        rest.is_empty().then_some(captured)
    }

    /// Locate the slot preceded by a controller infix.
    pub fn controller_slot(&self) -> Option<ControllerSlot> {
        for (index, pair) in self.segments.windows(2).enumerate() {
            if let [Segment::Literal(text), Segment::Slot { .. }] = pair {
                if let Some(spelling) = CC_SPELLINGS.into_iter().find(|s| text.ends_with(s)) {
                    return Some(ControllerSlot {
                        segment: index,
                        spelling,
                    });
                }
            }
        }
        None
    }

    /// The same template with the controller infix spelled differently.
    pub fn respelled(&self, slot: ControllerSlot, spelling: &str) -> Template {
        let mut segments = self.segments.clone();
        if let Some(Segment::Literal(text)) = segments.get_mut(slot.segment) {
            text.truncate(text.len() - slot.spelling.len());
            text.push_str(spelling);
        }
        let text = segments
            .iter()
            .map(|s| match s {
                Segment::Literal(text) => text.clone(),
                Segment::Slot { letter, .. } => letter.to_string(),
            })
            .collect();
        Template { text, segments }
    }
}

/// Collapse every maximal digit run of `name` to a single `#`.
pub fn skeleton(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_digits = false;
    for c in name.chars() {
        if c.is_ascii_digit() {
            if !in_digits {
                out.push('#');
            }
            in_digits = true;
        } else {
            out.push(c);
            in_digits = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ranges(declared: &[(char, (u32, u32))]) -> SlotRanges {
        SlotRanges {
            declared: declared.iter().copied().collect(),
            controller: (0, 255),
        }
    }

    #[test]
    fn slots_capture_maximal_digit_runs() {
        let t = Template::parse("egN_timeX_onccY", &ranges(&[])).unwrap();
        assert_eq!(
            t.matches("eg12_time3_oncc64"),
            Some(vec![('N', 12), ('X', 3), ('Y', 64)])
        );
        assert_eq!(t.matches("eg12_time_oncc64"), None);
        assert_eq!(t.matches("eg12_time3_oncc64x"), None);
    }

    #[test]
    fn declared_range_bounds_the_slot() {
        let t = Template::parse("lfoN_freq", &ranges(&[('N', (1, 4))])).unwrap();
        for n in 1..=4 {
            assert!(t.matches(&format!("lfo{n}_freq")).is_some());
        }
        assert_eq!(t.matches("lfo0_freq"), None);
        assert_eq!(t.matches("lfo5_freq"), None);
    }

    #[test]
    fn controller_slots_default_to_controller_range() {
        let t = Template::parse("amplitude_onccN", &ranges(&[])).unwrap();
        assert!(t.matches("amplitude_oncc140").is_some());
        assert_eq!(t.matches("amplitude_oncc420"), None);
    }

    #[test]
    fn literal_digits_stay_literal() {
        let t = Template::parse("cutoff2_onccN", &ranges(&[])).unwrap();
        assert!(t.matches("cutoff2_oncc1").is_some());
        assert_eq!(t.matches("cutoff3_oncc1"), None);
        assert_eq!(t.skeleton(), skeleton("cutoff2_oncc1"));
    }

    #[test]
    fn repeated_letter_is_one_slot() {
        let t = Template::parse("varNN_mod", &ranges(&[])).unwrap();
        assert_eq!(t.matches("var01_mod"), Some(vec![('N', 1)]));
    }

    #[test]
    fn ambiguous_slots_are_rejected() {
        assert!(matches!(
            Template::parse("x2N", &ranges(&[])),
            Err(SpecError::AmbiguousSlot { slot: 'N', .. })
        ));
        assert!(matches!(
            Template::parse("xN2", &ranges(&[])),
            Err(SpecError::AmbiguousSlot { slot: 'N', .. })
        ));
        assert!(matches!(
            Template::parse("xNX", &ranges(&[])),
            Err(SpecError::AmbiguousSlot { slot: 'X', .. })
        ));
        assert!(matches!(
            Template::parse("lfoN_freq", &ranges(&[('X', (1, 2))])),
            Err(SpecError::UnknownSlot { .. })
        ));
    }

    #[test]
    fn respelling_moves_the_controller_infix() {
        let t = Template::parse("pitchlfo_depthccN", &ranges(&[])).unwrap();
        let slot = t.controller_slot().unwrap();
        assert_eq!(slot.spelling, "cc");
        let v = t.respelled(slot, "_oncc");
        assert_eq!(v.text(), "pitchlfo_depth_onccN");
        assert!(v.matches("pitchlfo_depth_oncc17").is_some());
        assert_eq!(v.matches("pitchlfo_depthcc17"), None);
    }

    #[test]
    fn skeleton_collapses_digit_runs() {
        assert_eq!(skeleton("eq12_bwcc7"), "eq#_bwcc#");
        assert_eq!(skeleton("sample"), "sample");
    }
}
