//! Value checks against a matched entry.

use crate::diag::{Diagnostic, Position};
use crate::spec::{Bounds, SpecEntry, ValueType, format_number};

/// Check `value` against `entry`. Path, string and unconstrained values
/// always pass here.
pub fn check_value(entry: &SpecEntry, value: &str, at: &Position) -> Option<Diagnostic> {
    let number = match &entry.value_type {
        ValueType::Integer => match integer_value(value).or_else(|| note_value(value)) {
            Some(n) => n,
            None => return Some(Diagnostic::error(at.clone(), format!("expected integer got {}", value))),
        },
        ValueType::Note => match note_value(value).or_else(|| integer_value(value)) {
            Some(n) => n,
            None => return Some(Diagnostic::error(at.clone(), format!("expected note got {}", value))),
        },
        ValueType::Float => match parse_float(value) {
            Some(n) => n,
            None => return Some(Diagnostic::error(at.clone(), format!("expected float got {}", value))),
        },
        ValueType::Enum(options) => {
            if options.iter().any(|o| o == value) {
                return None;
            }
            return Some(Diagnostic::warning(
                at.clone(),
                format!("{} not one of [{}]", value, options.join(", ")),
            ));
        }
        ValueType::String | ValueType::Path => return None,
    };

    check_bounds(entry.bounds, value, number).map(|message| Diagnostic::warning(at.clone(), message))
}

fn check_bounds(bounds: Bounds, written: &str, number: f64) -> Option<String> {
    match (bounds.min, bounds.max) {
        (Some(min), Some(max)) if number < min || number > max => Some(format!(
            "{} not in range {} to {}",
            written,
            format_number(min),
            format_number(max)
        )),
        (Some(min), None) if number < min => Some(format!(
            "{} less than minimum of {}",
            written,
            format_number(min)
        )),
        (None, Some(max)) if number > max => Some(format!(
            "{} greater than maximum of {}",
            written,
            format_number(max)
        )),
        _ => None,
    }
}

/// Base-10 integer with an optional leading `-`.
pub fn parse_integer(value: &str) -> Option<i64> {
    is_integer_text(value).then(|| value.parse().ok()).flatten()
}

// Integers past i64 still compare against bounds.
fn integer_value(value: &str) -> Option<f64> {
    if !is_integer_text(value) {
        return None;
    }
    match value.parse::<i64>() {
        Ok(n) => Some(n as f64),
        Err(_) => value.parse::<f64>().ok(),
    }
}

fn note_value(value: &str) -> Option<f64> {
    parse_note(value).map(|n| n as f64)
}

fn is_integer_text(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Decimal number: `-?(\d+(\.\d*)?|\.\d+)`.
pub fn parse_float(value: &str) -> Option<f64> {
    let unsigned = value.strip_prefix('-').unwrap_or(value);
    let (whole, frac) = match unsigned.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (unsigned, None),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    let well_formed = all_digits(whole)
        && frac.is_none_or(all_digits)
        && (!whole.is_empty() || frac.is_some_and(|f| !f.is_empty()));
    if !well_formed {
        return None;
    }
    value.parse().ok()
}

/// MIDI note name to note number: `c-1` is 0, `c1` is 24, `a#4`/`bb4` is 70.
pub fn parse_note(value: &str) -> Option<i64> {
    let lower = value.to_ascii_lowercase();
    let mut chars = lower.chars();
    let pitch_class = match chars.next()? {
        'c' => 0,
        'd' => 2,
        'e' => 4,
        'f' => 5,
        'g' => 7,
        'a' => 9,
        'b' => 11,
        _ => return None,
    };
    let rest = chars.as_str();
    let (accidental, octave) = if let Some(o) = rest.strip_prefix('#') {
        (1, o)
    } else if let Some(o) = rest.strip_prefix('b').filter(|o| !o.is_empty()) {
        (-1, o)
    } else {
        (0, rest)
    };
    let octave = parse_integer(octave)?;
    if !(-1..=9).contains(&octave) {
        return None;
    }
    let number = (octave + 1) * 12 + pitch_class + accidental;
    (0..=127).contains(&number).then_some(number)
}

/// Integer or note name, as accepted by key-like opcodes.
pub fn parse_key(value: &str) -> Option<i64> {
    parse_integer(value).or_else(|| parse_note(value))
}
